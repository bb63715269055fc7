//! Budget allocations
//!
//! An allocation is a grant of a fixed amount to a school for a fiscal year
//! and category. The ceiling is immutable outside the validated update path;
//! `status`, `used` and `remaining` are caches of values derived from the
//! usage total and are rewritten together whenever that total changes.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scope::SchoolId;

use super::category::BudgetCategory;
use super::errors::{LedgerError, LedgerResult};
use super::status::{resolve_status, AllocationStatus};

/// Lowest fiscal year accepted at the boundary.
pub const MIN_FISCAL_YEAR: i32 = 2000;
/// Highest fiscal year accepted at the boundary.
pub const MAX_FISCAL_YEAR: i32 = 2100;

/// Allocation identifier, server-assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationId(Uuid);

impl AllocationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for AllocationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for AllocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A budget allocation with its derived balance fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub school_id: SchoolId,
    pub fiscal_year: i32,
    pub category: BudgetCategory,
    pub amount: Decimal,
    pub description: Option<String>,
    pub status: AllocationStatus,
    #[serde(rename = "used")]
    pub used_total: Decimal,
    pub remaining: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Allocation {
    pub(crate) fn create(new: NewAllocation) -> Self {
        let NewAllocation {
            school_id,
            fiscal_year,
            category,
            amount,
            description,
        } = new;

        Self {
            id: AllocationId::new(),
            school_id,
            fiscal_year,
            category,
            amount,
            description: normalize_text(description),
            status: AllocationStatus::Allocated,
            used_total: Decimal::ZERO,
            remaining: amount,
            created_at: Utc::now(),
        }
    }

    /// Rewrite the usage total and every field derived from it.
    ///
    /// A closed allocation stays closed; the balance-based status is only
    /// derived for open allocations.
    pub(crate) fn apply_usage_total(&mut self, used: Decimal) {
        self.used_total = used;
        self.remaining = self.amount - used;
        if self.status != AllocationStatus::Closed {
            self.status = resolve_status(self.amount, used);
        }
    }

    /// Replace the ceiling and re-derive the balance fields.
    ///
    /// The caller is responsible for checking the new ceiling against the
    /// current usage total first.
    pub(crate) fn set_amount(&mut self, amount: Decimal) {
        self.amount = amount;
        self.apply_usage_total(self.used_total);
    }

    /// Terminal transition. There is no way back out of `closed`.
    pub(crate) fn close(&mut self) {
        self.status = AllocationStatus::Closed;
    }
}

/// Validated input for creating an allocation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewAllocation {
    pub school_id: SchoolId,
    pub fiscal_year: i32,
    pub category: BudgetCategory,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewAllocation {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::invalid("amount must be positive"));
        }
        if !(MIN_FISCAL_YEAR..=MAX_FISCAL_YEAR).contains(&self.fiscal_year) {
            return Err(LedgerError::invalid(format!(
                "fiscal_year must be between {} and {}",
                MIN_FISCAL_YEAR, MAX_FISCAL_YEAR
            )));
        }
        Ok(())
    }
}

/// Fields an administrator may change after creation.
///
/// The ceiling may be raised freely and lowered only down to the current
/// usage total. `close` is terminal.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AllocationUpdate {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<BudgetCategory>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub close: bool,
}

impl AllocationUpdate {
    pub fn validate(&self) -> LedgerResult<()> {
        if let Some(amount) = self.amount {
            if amount <= Decimal::ZERO {
                return Err(LedgerError::invalid("amount must be positive"));
            }
        }
        Ok(())
    }

    /// Whether the update changes anything beyond the close flag.
    pub fn touches_fields(&self) -> bool {
        self.description.is_some() || self.category.is_some() || self.amount.is_some()
    }
}

/// Trim free text; empty strings collapse to absent.
pub(crate) fn normalize_text(text: Option<String>) -> Option<String> {
    text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_input() -> NewAllocation {
        NewAllocation {
            school_id: SchoolId::new(),
            fiscal_year: 2025,
            category: BudgetCategory::General,
            amount: Decimal::from(1000),
            description: Some("  library refresh  ".to_string()),
        }
    }

    #[test]
    fn test_create_starts_allocated_with_full_balance() {
        let allocation = Allocation::create(create_test_input());

        assert_eq!(allocation.status, AllocationStatus::Allocated);
        assert_eq!(allocation.used_total, Decimal::ZERO);
        assert_eq!(allocation.remaining, Decimal::from(1000));
        assert_eq!(allocation.description.as_deref(), Some("library refresh"));
    }

    #[test]
    fn test_apply_usage_total_rewrites_derived_fields() {
        let mut allocation = Allocation::create(create_test_input());

        allocation.apply_usage_total(Decimal::from(400));
        assert_eq!(allocation.status, AllocationStatus::InUse);
        assert_eq!(allocation.remaining, Decimal::from(600));

        allocation.apply_usage_total(Decimal::from(1000));
        assert_eq!(allocation.status, AllocationStatus::Depleted);
        assert_eq!(allocation.remaining, Decimal::ZERO);

        allocation.apply_usage_total(Decimal::ZERO);
        assert_eq!(allocation.status, AllocationStatus::Allocated);
    }

    #[test]
    fn test_closed_survives_usage_total_changes() {
        let mut allocation = Allocation::create(create_test_input());
        allocation.close();

        allocation.apply_usage_total(Decimal::from(10));
        assert_eq!(allocation.status, AllocationStatus::Closed);
    }

    #[test]
    fn test_set_amount_re_derives_status() {
        let mut allocation = Allocation::create(create_test_input());
        allocation.apply_usage_total(Decimal::from(400));

        // Lowering the ceiling to the usage total depletes the allocation.
        allocation.set_amount(Decimal::from(400));
        assert_eq!(allocation.status, AllocationStatus::Depleted);
        assert_eq!(allocation.remaining, Decimal::ZERO);
    }

    #[test]
    fn test_validate_rejects_non_positive_amount() {
        let mut input = create_test_input();
        input.amount = Decimal::ZERO;
        assert!(matches!(
            input.validate(),
            Err(LedgerError::InvalidArgument(_))
        ));

        input.amount = Decimal::from(-5);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_fiscal_year() {
        let mut input = create_test_input();
        input.fiscal_year = 1999;
        assert!(input.validate().is_err());

        input.fiscal_year = 2101;
        assert!(input.validate().is_err());

        input.fiscal_year = 2025;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_update_validate() {
        let update = AllocationUpdate {
            amount: Some(Decimal::from(-1)),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = AllocationUpdate {
            close: true,
            ..Default::default()
        };
        assert!(update.validate().is_ok());
        assert!(!update.touches_fields());
    }
}
