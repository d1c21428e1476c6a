//! Validation verdicts and terminal run outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One validation gate, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gate {
    NonForbiddenConstruct,
    NonDeletion,
    Completeness,
    Contract,
}

impl Gate {
    pub fn name(&self) -> &'static str {
        match self {
            Gate::NonForbiddenConstruct => "non-forbidden-construct",
            Gate::NonDeletion => "non-deletion",
            Gate::Completeness => "completeness",
            Gate::Contract => "contract",
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Verdict of the gate chain for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub accepted: bool,
    /// First failing gate (None when accepted).
    pub failed_gate: Option<Gate>,
    /// What tripped the gate.
    pub detail: Option<String>,
}

impl ValidationResult {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            failed_gate: None,
            detail: None,
        }
    }

    pub fn rejected(gate: Gate, detail: impl Into<String>) -> Self {
        Self {
            accepted: false,
            failed_gate: Some(gate),
            detail: Some(detail.into()),
        }
    }
}

/// Why a fallback application is only partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// The lookup method was needed but its class anchor was not found.
    ClassAnchorMissing,
}

/// Terminal state of a run. Exactly one per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PatchOutcome {
    AppliedByService,
    AppliedByFallback { degradation: Option<Degradation> },
    Failed { reason: String },
}

impl PatchOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, PatchOutcome::Failed { .. })
    }

    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            PatchOutcome::AppliedByFallback {
                degradation: Some(_)
            }
        )
    }

    /// Short mode label used in events and reports.
    pub fn mode(&self) -> &'static str {
        match self {
            PatchOutcome::AppliedByService => "service",
            PatchOutcome::AppliedByFallback { .. } => "fallback",
            PatchOutcome::Failed { .. } => "failed",
        }
    }
}

/// Summary of one orchestrated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRun {
    pub run_id: Uuid,
    pub outcome: PatchOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_names_match_serde() {
        for gate in [
            Gate::NonForbiddenConstruct,
            Gate::NonDeletion,
            Gate::Completeness,
            Gate::Contract,
        ] {
            let json = serde_json::to_string(&gate).unwrap();
            assert_eq!(json, format!("\"{}\"", gate.name()));
        }
    }

    #[test]
    fn test_outcome_predicates() {
        assert!(PatchOutcome::AppliedByService.is_applied());
        assert!(!PatchOutcome::AppliedByService.is_degraded());

        let degraded = PatchOutcome::AppliedByFallback {
            degradation: Some(Degradation::ClassAnchorMissing),
        };
        assert!(degraded.is_applied());
        assert!(degraded.is_degraded());
        assert_eq!(degraded.mode(), "fallback");

        let failed = PatchOutcome::Failed {
            reason: "permission denied".into(),
        };
        assert!(!failed.is_applied());
        assert_eq!(failed.mode(), "failed");
    }

    #[test]
    fn test_outcome_tagging() {
        let json = serde_json::to_value(PatchOutcome::Failed {
            reason: "disk full".into(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["reason"], "disk full");
    }
}
