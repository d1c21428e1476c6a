//! Candidate validation gates.
//!
//! A generated file body must clear four independent gates, evaluated in a
//! fixed order and short-circuiting on the first failure:
//!
//! 1. `non-forbidden-construct`: no denylisted lookup construct
//! 2. `non-deletion`: every structural marker of the original survives
//! 3. `completeness`: no elision placeholders, not blank
//! 4. `contract`: the required construction idiom is present

use serde::{Deserialize, Serialize};

use crate::domain::{Gate, PatchmendError, Result, ValidationResult};

/// Substring sets the gates check against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    /// Lookup constructs the storage layer cannot execute.
    pub forbidden_constructs: Vec<String>,
    /// Declarations that must not disappear if the original had them.
    pub structural_markers: Vec<String>,
    /// Placeholder comments that mean content was omitted.
    pub elision_markers: Vec<String>,
    /// Exact idiom the task requires.
    pub required_idiom: String,
}

impl ValidationRules {
    /// An empty idiom would be contained in every candidate.
    pub fn validate(&self) -> Result<()> {
        if self.required_idiom.trim().is_empty() {
            return Err(PatchmendError::Config(
                "validation.required_idiom must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            forbidden_constructs: strings(&["= ANY(", "=ANY(", "= any(", "=any("]),
            structural_markers: strings(&["class Batch", "class ImportItem", "class Stats"]),
            elision_markers: strings(&[
                "# ...",
                "# rest of",
                "# Rest of",
                "...existing code",
                "... existing code",
                "# (unchanged)",
                "<rest of",
            ]),
            required_idiom: "ia_id in $ids".to_string(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Gate chain over a fixed rule set.
#[derive(Debug, Clone, Default)]
pub struct PatchValidator {
    rules: ValidationRules,
}

impl PatchValidator {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Run all gates in order against `candidate`, using `original` as the
    /// reference for the non-deletion gate.
    pub fn validate(&self, candidate: &str, original: &str) -> ValidationResult {
        if let Some(detail) = self.forbidden_construct(candidate) {
            return ValidationResult::rejected(Gate::NonForbiddenConstruct, detail);
        }
        if let Some(detail) = self.deleted_marker(candidate, original) {
            return ValidationResult::rejected(Gate::NonDeletion, detail);
        }
        if let Some(detail) = self.elision(candidate) {
            return ValidationResult::rejected(Gate::Completeness, detail);
        }
        if let Some(detail) = self.missing_idiom(candidate) {
            return ValidationResult::rejected(Gate::Contract, detail);
        }
        ValidationResult::accepted()
    }

    fn forbidden_construct(&self, candidate: &str) -> Option<String> {
        self.rules
            .forbidden_constructs
            .iter()
            .find(|needle| !needle.is_empty() && candidate.contains(needle.as_str()))
            .map(|needle| format!("contains forbidden construct {needle:?}"))
    }

    fn deleted_marker(&self, candidate: &str, original: &str) -> Option<String> {
        self.rules
            .structural_markers
            .iter()
            .filter(|marker| !marker.is_empty())
            .find(|marker| original.contains(marker.as_str()) && !candidate.contains(marker.as_str()))
            .map(|marker| format!("structural marker {marker:?} was removed"))
    }

    fn elision(&self, candidate: &str) -> Option<String> {
        if candidate.trim().is_empty() {
            return Some("candidate body is empty".to_string());
        }
        self.rules
            .elision_markers
            .iter()
            .find(|marker| !marker.is_empty() && candidate.contains(marker.as_str()))
            .map(|marker| format!("contains elision marker {marker:?}"))
    }

    fn missing_idiom(&self, candidate: &str) -> Option<String> {
        let idiom = &self.rules.required_idiom;
        if idiom.trim().is_empty() {
            return Some("no required idiom configured".to_string());
        }
        if candidate.contains(idiom.as_str()) {
            None
        } else {
            Some(format!("required idiom {idiom:?} is missing"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "import logging\n\nclass Batch(web.storage):\n    pass\n\nclass ImportItem(web.storage):\n    pass\n";

    fn good_candidate() -> String {
        format!(
            "{ORIGINAL}\nSTAGED_SOURCES = ('amazon', 'idb')\n# lookup\n    where=\"ia_id in $ids\"\n"
        )
    }

    #[test]
    fn test_accepts_complete_candidate() {
        let v = PatchValidator::default();
        let result = v.validate(&good_candidate(), ORIGINAL);
        assert!(result.accepted);
        assert_eq!(result.failed_gate, None);
    }

    #[test]
    fn test_forbidden_construct_is_first_gate() {
        let v = PatchValidator::default();
        // Also missing markers and idiom; the first gate wins.
        let result = v.validate("rows = db.query('ia_id = ANY($ids)')", ORIGINAL);
        assert!(!result.accepted);
        assert_eq!(result.failed_gate, Some(Gate::NonForbiddenConstruct));
    }

    #[test]
    fn test_marker_only_enforced_when_original_had_it() {
        let v = PatchValidator::default();
        // `class Stats` never existed in ORIGINAL, so its absence is fine.
        assert!(v.validate(&good_candidate(), ORIGINAL).accepted);

        let dropped = good_candidate().replace("class Batch(web.storage):\n    pass\n", "");
        let result = v.validate(&dropped, ORIGINAL);
        assert_eq!(result.failed_gate, Some(Gate::NonDeletion));
        assert!(result.detail.unwrap().contains("class Batch"));
    }

    #[test]
    fn test_elision_placeholder_rejected() {
        let v = PatchValidator::default();
        let elided = format!("{}\n    # ... existing methods\n", good_candidate());
        assert_eq!(v.validate(&elided, ORIGINAL).failed_gate, Some(Gate::Completeness));
    }

    #[test]
    fn test_blank_candidate_rejected_as_incomplete() {
        let v = PatchValidator::default();
        assert_eq!(v.validate("  \n\t", "").failed_gate, Some(Gate::Completeness));
    }

    #[test]
    fn test_missing_idiom_rejected_by_contract_gate() {
        let v = PatchValidator::default();
        let result = v.validate(&format!("{ORIGINAL}\nids = ia_id_in(ids)\n"), ORIGINAL);
        assert_eq!(result.failed_gate, Some(Gate::Contract));
    }

    #[test]
    fn test_custom_rules() {
        let v = PatchValidator::new(ValidationRules {
            forbidden_constructs: vec![],
            structural_markers: vec!["fn main".into()],
            elision_markers: vec!["// ...".into()],
            required_idiom: "lookup(".into(),
        });
        assert!(v.validate("fn main() { lookup(1); }", "fn main() {}").accepted);
        assert_eq!(
            v.validate("fn other() { lookup(1); }", "fn main() {}").failed_gate,
            Some(Gate::NonDeletion)
        );
    }

    #[test]
    fn test_blank_idiom_never_accepts() {
        let rules = ValidationRules {
            required_idiom: " ".into(),
            ..ValidationRules::default()
        };
        assert!(rules.validate().is_err());
        assert!(ValidationRules::default().validate().is_ok());

        let result = PatchValidator::new(rules).validate(ORIGINAL, ORIGINAL);
        assert_eq!(result.failed_gate, Some(Gate::Contract));
    }
}
