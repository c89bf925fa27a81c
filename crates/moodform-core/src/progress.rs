#![forbid(unsafe_code)]

//! Completion progress over the currently relevant fields.
//!
//! Both the numerator and the denominator depend on the current
//! [`VisibilitySet`]: hiding a block shrinks `total` (and drops any of its
//! filled members from `filled`), so progress must be recomputed after every
//! value mutation *and* after every visibility recomputation.
//!
//! # Invariants
//!
//! 1. `0 <= percentage <= 100`.
//! 2. `percentage == 0` whenever `total == 0` (never divides by zero).
//! 3. A choice group contributes exactly one to `total`, not one per member
//!    element (the registry already deduplicates names).
//! 4. Meta-excluded fields never count.

use crate::condition::{ConditionSet, VisibilitySet};
use crate::field::FieldStore;
use crate::registry::FieldRegistry;

/// Filled/total counts restricted to visible, non-meta fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[must_use]
pub struct ProgressReport {
    /// Visible, non-meta fields with a non-empty value.
    pub filled: usize,
    /// Visible, non-meta fields.
    pub total: usize,
    /// `round(filled / total * 100)`, or 0 when `total == 0`.
    pub percentage: u8,
}

/// Compute completion progress for the current values and visibility.
pub fn compute(
    registry: &FieldRegistry,
    store: &dyn FieldStore,
    conditions: &ConditionSet,
    vis: &VisibilitySet,
) -> ProgressReport {
    let mut filled = 0usize;
    let mut total = 0usize;
    for desc in registry.descriptors() {
        if desc.meta_excluded || !conditions.field_visible(vis, &desc.name) {
            continue;
        }
        total += 1;
        match registry.resolve(store, &desc.name) {
            Ok(v) if !v.is_empty() => filled += 1,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(field = %desc.name, error = %e, "progress treated unresolvable field as unfilled");
            }
        }
    }
    let percentage = if total == 0 {
        0
    } else {
        // Integer rounding to nearest; filled <= total keeps this <= 100.
        ((filled * 100 + total / 2) / total) as u8
    };
    ProgressReport {
        filled,
        total,
        percentage,
    }
}
