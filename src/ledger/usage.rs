//! Usage records
//!
//! A usage record is one expenditure debited against an allocation. Records
//! are immutable once written; the only mutation is deletion, which reverses
//! their effect on the allocation's balance.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::allocation::{normalize_text, AllocationId};
use super::errors::{LedgerError, LedgerResult};

/// Usage record identifier, server-assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageId(Uuid);

impl UsageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for UsageId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for UsageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UsageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One expenditure against an allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: UsageId,
    pub allocation_id: AllocationId,
    pub amount: Decimal,
    pub purpose: String,
    pub date: NaiveDate,
    pub receipt_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub(crate) fn create(new: NewUsage) -> Self {
        let NewUsage {
            allocation_id,
            amount,
            purpose,
            date,
            receipt_number,
        } = new;

        Self {
            id: UsageId::new(),
            allocation_id,
            amount,
            purpose: purpose.trim().to_string(),
            date,
            receipt_number: normalize_text(receipt_number),
            created_at: Utc::now(),
        }
    }
}

/// Validated input for recording usage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewUsage {
    pub allocation_id: AllocationId,
    pub amount: Decimal,
    pub purpose: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub receipt_number: Option<String>,
}

impl NewUsage {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::invalid("amount must be positive"));
        }
        if self.purpose.trim().is_empty() {
            return Err(LedgerError::invalid("purpose must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_input() -> NewUsage {
        NewUsage {
            allocation_id: AllocationId::new(),
            amount: Decimal::from(400),
            purpose: " books ".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            receipt_number: Some("".to_string()),
        }
    }

    #[test]
    fn test_create_normalizes_text_fields() {
        let record = UsageRecord::create(create_test_input());
        assert_eq!(record.purpose, "books");
        assert_eq!(record.receipt_number, None);
    }

    #[test]
    fn test_validate_rejects_non_positive_amount() {
        let mut input = create_test_input();
        input.amount = Decimal::ZERO;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_purpose() {
        let mut input = create_test_input();
        input.purpose = "   ".to_string();
        assert!(matches!(
            input.validate(),
            Err(LedgerError::InvalidArgument(_))
        ));
    }
}
