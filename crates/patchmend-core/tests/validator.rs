//! Validation gates against realistic candidates.

use patchmend_core::{Gate, PatchValidator, ValidationRules};

const ORIGINAL: &str = r#"class Batch(web.storage):
    pass


class ImportItem(web.storage):
    @staticmethod
    def find_pending(limit=1000):
        return db.where("import_item", status="pending", limit=limit)


class Stats:
    pass
"#;

fn with_lookup(where_clause: &str) -> String {
    format!(
        "STAGED_SOURCES = ('amazon', 'idb')\n\n{ORIGINAL}\n    @staticmethod\n    def find_staged_or_pending(identifiers, sources=STAGED_SOURCES):\n        return db.select(\"import_item\", where=\"{where_clause}\")\n"
    )
}

#[test]
fn test_complete_rewrite_is_accepted() {
    let result = PatchValidator::default().validate(&with_lookup("ia_id in $ids"), ORIGINAL);
    assert!(result.accepted);
    assert!(result.detail.is_none());
}

#[test]
fn test_array_comparison_is_forbidden() {
    let result = PatchValidator::default().validate(&with_lookup("ia_id = ANY($ids)"), ORIGINAL);
    assert_eq!(result.failed_gate, Some(Gate::NonForbiddenConstruct));
}

#[test]
fn test_forbidden_construct_wins_over_later_gates() {
    // Also drops a class and omits the idiom; only the first gate reports.
    let candidate = "class Batch:\n    x = db.query('id = ANY($ids)')\n";
    let result = PatchValidator::default().validate(candidate, ORIGINAL);
    assert_eq!(result.failed_gate, Some(Gate::NonForbiddenConstruct));
}

#[test]
fn test_dropped_class_is_a_deletion() {
    let candidate = with_lookup("ia_id in $ids").replace("class Stats:\n    pass\n", "");
    let result = PatchValidator::default().validate(&candidate, ORIGINAL);
    assert_eq!(result.failed_gate, Some(Gate::NonDeletion));
    assert!(result.detail.unwrap().contains("class Stats"));
}

#[test]
fn test_marker_absent_from_original_is_not_required() {
    let original = ORIGINAL.replace("class Stats:\n    pass\n", "");
    let candidate = with_lookup("ia_id in $ids").replace("class Stats:\n    pass\n", "");
    assert!(PatchValidator::default().validate(&candidate, &original).accepted);
}

#[test]
fn test_elided_body_is_incomplete() {
    let candidate = with_lookup("ia_id in $ids").replace(
        "    def find_pending(limit=1000):\n",
        "    # ... existing methods unchanged\n    def find_pending(limit=1000):\n",
    );
    let result = PatchValidator::default().validate(&candidate, ORIGINAL);
    assert_eq!(result.failed_gate, Some(Gate::Completeness));
}

#[test]
fn test_missing_idiom_breaks_the_contract() {
    let result = PatchValidator::default().validate(&with_lookup("ia_id IN $ids"), ORIGINAL);
    assert_eq!(result.failed_gate, Some(Gate::Contract));
}

#[test]
fn test_custom_rules_replace_defaults() {
    let rules = ValidationRules {
        forbidden_constructs: vec!["eval(".to_string()],
        structural_markers: vec!["def main".to_string()],
        elision_markers: vec!["pass  # TODO".to_string()],
        required_idiom: "logger".to_string(),
    };
    let v = PatchValidator::new(rules);
    let original = "def main():\n    run()\n";

    assert!(v.validate("import logging\nlogger = 1\ndef main():\n    run()\n", original).accepted);
    assert_eq!(
        v.validate("logger = 1\ndef main():\n    eval(x)\n", original).failed_gate,
        Some(Gate::NonForbiddenConstruct)
    );
    assert_eq!(
        v.validate("logger = 1\n", original).failed_gate,
        Some(Gate::NonDeletion)
    );
}
