//! Allocation lifecycle status
//!
//! The status of an allocation is a pure function of its ceiling and its
//! usage total, with one exception: `closed` is set only by an explicit
//! administrative action and is terminal. Once closed, an allocation is
//! never re-derived back into a balance-based status.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    /// No usage recorded yet.
    Allocated,
    /// Some usage recorded, balance remains.
    InUse,
    /// Usage has reached the ceiling.
    Depleted,
    /// Administratively closed. Terminal.
    Closed,
}

impl AllocationStatus {
    /// Whether new usage may be recorded in this status.
    ///
    /// Both `depleted` and `closed` reject usage outright, independent of
    /// the requested amount.
    pub fn accepts_usage(&self) -> bool {
        matches!(self, AllocationStatus::Allocated | AllocationStatus::InUse)
    }

    /// Returns the wire-format string
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStatus::Allocated => "allocated",
            AllocationStatus::InUse => "in_use",
            AllocationStatus::Depleted => "depleted",
            AllocationStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derive the balance-based status from the ceiling and the usage total.
///
/// `closed` is never returned here; callers that cache a closed status must
/// preserve it instead of re-deriving.
pub fn resolve_status(allocated: Decimal, used: Decimal) -> AllocationStatus {
    if used <= Decimal::ZERO {
        AllocationStatus::Allocated
    } else if used < allocated {
        AllocationStatus::InUse
    } else {
        AllocationStatus::Depleted
    }
}
