//! Validity windows and their evaluation
//!
//! A [`ValidityPeriod`] bounds when a permission's configured grant class
//! applies. A [`TrackingValidityChecker`] evaluates periods against a single
//! time reference and remembers the earliest future instant at which any of
//! the periods it has seen would flip between active and inactive. That
//! instant is what a scheduler waits for before running the next pass.

use crate::error::PeriodError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Time window during which a permission applies as configured.
///
/// A missing bound is unbounded in that direction. When both bounds are set,
/// `not_valid_before` strictly precedes `not_valid_after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ValidityPeriod {
    #[serde(skip_serializing_if = "Option::is_none")]
    not_valid_before: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    not_valid_after: Option<DateTime<Utc>>,
}

impl ValidityPeriod {
    /// Create a period, rejecting bounds that are out of order
    pub fn new(
        not_valid_before: Option<DateTime<Utc>>,
        not_valid_after: Option<DateTime<Utc>>,
    ) -> Result<Self, PeriodError> {
        if let (Some(before), Some(after)) = (not_valid_before, not_valid_after)
            && before >= after
        {
            return Err(PeriodError::IllDefined {
                not_valid_before: before,
                not_valid_after: after,
            });
        }
        Ok(Self {
            not_valid_before,
            not_valid_after,
        })
    }

    /// Period that is always active
    pub const fn unbounded() -> Self {
        Self {
            not_valid_before: None,
            not_valid_after: None,
        }
    }

    /// Period active from `not_valid_before` on
    pub fn starting(not_valid_before: DateTime<Utc>) -> Self {
        Self {
            not_valid_before: Some(not_valid_before),
            not_valid_after: None,
        }
    }

    /// Period active up to and including `not_valid_after`
    pub fn ending(not_valid_after: DateTime<Utc>) -> Self {
        Self {
            not_valid_before: None,
            not_valid_after: Some(not_valid_after),
        }
    }

    pub fn not_valid_before(&self) -> Option<DateTime<Utc>> {
        self.not_valid_before
    }

    pub fn not_valid_after(&self) -> Option<DateTime<Utc>> {
        self.not_valid_after
    }

    /// Check if neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.not_valid_before.is_none() && self.not_valid_after.is_none()
    }
}

/// Decides whether a validity period is currently active
pub trait ValidityChecker {
    /// Check if `period` is active
    fn check(&mut self, period: &ValidityPeriod) -> bool;
}

/// Checker that evaluates against a fixed instant and tracks the next
/// transition across every period it checks.
///
/// Scope one instance to one resolution pass; instances built for disjoint
/// sets of users can be combined with [`merge`](Self::merge).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingValidityChecker {
    time_ref: DateTime<Utc>,
    next_transition: Option<DateTime<Utc>>,
}

impl TrackingValidityChecker {
    /// Checker evaluating at `time_ref`, with no transition recorded yet
    pub fn new(time_ref: DateTime<Utc>) -> Self {
        Self {
            time_ref,
            next_transition: None,
        }
    }

    /// Instant every period is evaluated at
    pub fn time_ref(&self) -> DateTime<Utc> {
        self.time_ref
    }

    /// Earliest instant at which some checked period changes state, or
    /// `None` if no checked period has a boundary ahead of it
    pub fn next_transition(&self) -> Option<DateTime<Utc>> {
        self.next_transition
    }

    /// Fold another checker's transition into this one
    pub fn merge(&mut self, other: &TrackingValidityChecker) {
        if let Some(candidate) = other.next_transition {
            self.record(candidate);
        }
    }

    fn record(&mut self, candidate: DateTime<Utc>) {
        match self.next_transition {
            Some(current) if current <= candidate => {}
            _ => self.next_transition = Some(candidate),
        }
    }
}

impl ValidityChecker for TrackingValidityChecker {
    fn check(&mut self, period: &ValidityPeriod) -> bool {
        if let Some(before) = period.not_valid_before
            && self.time_ref < before
        {
            // Not yet active; becomes active at `before`.
            self.record(before);
            return false;
        }
        if let Some(after) = period.not_valid_after {
            if self.time_ref > after {
                return false;
            }
            self.record(after);
        }
        true
    }
}
