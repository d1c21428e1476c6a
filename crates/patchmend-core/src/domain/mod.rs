//! Domain models for patchmend.
//!
//! Canonical definitions for the core entities:
//! - `PatchRequest`: immutable input of one run
//! - `PatchCandidate`: raw service response and its extracted body
//! - `ValidationResult`: verdict of the validation gates
//! - `PatchOutcome`: terminal state of a run
//! - `Event`: one auditable record in the event log

pub mod digest;
pub mod error;
pub mod event;
pub mod outcome;
pub mod request;

pub use digest::content_digest;
pub use error::{PatchmendError, Result, ServiceError};
pub use event::{Event, EventKind};
pub use outcome::{Degradation, Gate, PatchOutcome, PatchRun, ValidationResult};
pub use request::{PatchCandidate, PatchRequest};
