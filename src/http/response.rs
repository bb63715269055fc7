//! # Response Formatting
//!
//! Standard response types for the ledger API.

use serde::Serialize;

use crate::ledger::{Allocation, DeleteOutcome, UsageRecord};

/// List response
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub data: Vec<T>,
    pub count: usize,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        let count = data.len();
        Self { data, count }
    }
}

/// Single record response
#[derive(Debug, Clone, Serialize)]
pub struct SingleResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> SingleResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Response to a successful usage commit: the new record plus the updated
/// allocation, so the caller never needs a second read for the new balance.
#[derive(Debug, Clone, Serialize)]
pub struct UsageCommitResponse {
    pub usage: UsageRecord,
    pub allocation: Allocation,
}

/// Response to an allocation delete
#[derive(Debug, Clone, Serialize)]
pub struct DeleteAllocationResponse {
    #[serde(flatten)]
    pub outcome: DeleteOutcome,
}
