//! Error taxonomy and repair outcomes.
//!
//! Only structurally invalid input is surfaced to the caller as an error.
//! Every constraint-repair failure kind is a value of [`RepairOutcome`],
//! recovered locally by the repair runner's deterministic fallback —
//! the pipeline always returns a feasible schedule for valid input.

use thiserror::Error;

use crate::models::Schedule;
use crate::validation::ValidationError;

/// Errors surfaced to the caller.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Input failed structural validation (non-positive durations,
    /// duplicate or gapped `op_seq` values).
    #[error("input validation failed: {}", format_errors(.0))]
    InvalidInput(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result of one constraint-repair attempt.
///
/// Consumed by the repair runner via exhaustive matching; only
/// `Success` carries a schedule, every other variant triggers the
/// time-shift fallback.
#[derive(Debug, Clone)]
pub enum RepairOutcome {
    /// The solver produced a feasible (possibly optimal) schedule.
    Success(Schedule),
    /// The constraint model admits no solution.
    Infeasible,
    /// The wall-clock budget elapsed before any feasible solution.
    Timeout,
    /// The row-count guard refused the problem before modeling.
    TooLarge,
    /// The solver backend failed unexpectedly.
    SolverError(String),
}

impl RepairOutcome {
    /// Whether this outcome carries a repaired schedule.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Infeasible => "infeasible",
            Self::Timeout => "timeout",
            Self::TooLarge => "too-large",
            Self::SolverError(_) => "solver-error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{ValidationError, ValidationErrorKind};

    #[test]
    fn test_error_display_joins_messages() {
        let err = ScheduleError::InvalidInput(vec![
            ValidationError::new(ValidationErrorKind::NonPositiveDuration, "bad duration"),
            ValidationError::new(ValidationErrorKind::DuplicateOperation, "dup op"),
        ]);
        let text = err.to_string();
        assert!(text.contains("bad duration"));
        assert!(text.contains("dup op"));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(RepairOutcome::Success(Schedule::new()).label(), "success");
        assert_eq!(RepairOutcome::Infeasible.label(), "infeasible");
        assert_eq!(RepairOutcome::Timeout.label(), "timeout");
        assert_eq!(RepairOutcome::TooLarge.label(), "too-large");
        assert_eq!(
            RepairOutcome::SolverError("boom".into()).label(),
            "solver-error"
        );
        assert!(RepairOutcome::Success(Schedule::new()).is_success());
        assert!(!RepairOutcome::Timeout.is_success());
    }
}
