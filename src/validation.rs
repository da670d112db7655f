//! Input validation for scheduling problems.
//!
//! Checks structural integrity of the operation list before
//! optimization. Detects:
//! - Non-positive durations
//! - Duplicate `(order_id, op_seq)` pairs
//! - `op_seq` gaps within an order (no valid precedence chain)
//! - Empty resource codes
//!
//! An empty operation list is NOT an error: the pipeline returns a
//! well-defined empty result for it.

use std::collections::HashMap;

use crate::models::Operation;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// An operation's duration is zero or negative.
    NonPositiveDuration,
    /// Two operations share the same `(order_id, op_seq)`.
    DuplicateOperation,
    /// An order's `op_seq` values are not contiguous from 0.
    SequenceGap,
    /// An operation has an empty resource code.
    MissingResource,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the operation list.
///
/// Checks:
/// 1. Every duration is strictly positive.
/// 2. Every resource code is non-empty.
/// 3. No `(order_id, op_seq)` pair appears twice.
/// 4. Each order's `op_seq` values form `0..n` with no gaps, so the
///    precedence chain is well-defined.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_operations(operations: &[Operation]) -> ValidationResult {
    let mut errors = Vec::new();

    for op in operations {
        if op.duration_minutes <= 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveDuration,
                format!(
                    "operation ({}, {}) has non-positive duration {}",
                    op.order_id, op.op_seq, op.duration_minutes
                ),
            ));
        }
        if op.resource_code.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingResource,
                format!("operation ({}, {}) has no resource code", op.order_id, op.op_seq),
            ));
        }
    }

    // Group op_seq values per order
    let mut seqs_by_order: HashMap<&str, Vec<u32>> = HashMap::new();
    for op in operations {
        seqs_by_order
            .entry(op.order_id.as_str())
            .or_default()
            .push(op.op_seq);
    }

    let mut order_ids: Vec<&str> = seqs_by_order.keys().copied().collect();
    order_ids.sort_unstable();

    for order_id in order_ids {
        let seqs = seqs_by_order.get_mut(order_id).expect("order just grouped");
        seqs.sort_unstable();

        let mut duplicate = false;
        for pair in seqs.windows(2) {
            if pair[0] == pair[1] {
                duplicate = true;
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateOperation,
                    format!("order '{order_id}' has duplicate op_seq {}", pair[0]),
                ));
            }
        }

        // Gap detection only makes sense on duplicate-free orders
        if !duplicate {
            let contiguous = seqs
                .iter()
                .enumerate()
                .all(|(i, &seq)| seq == i as u32);
            if !contiguous {
                errors.push(ValidationError::new(
                    ValidationErrorKind::SequenceGap,
                    format!(
                        "order '{order_id}' op_seq values {:?} are not contiguous from 0",
                        seqs
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
