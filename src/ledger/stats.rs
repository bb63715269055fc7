//! Budget statistics
//!
//! Read-only rollups over the allocations in a scope. Never mutates, never
//! locks more than one allocation at a time; the result reflects each
//! allocation at some instant during the request, which is all a reporting
//! view needs.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::scope::SchoolId;

use super::category::BudgetCategory;
use super::errors::LedgerResult;
use super::store::AllocationStore;

/// Rollup for a single category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryStats {
    pub allocated: Decimal,
    pub used: Decimal,
    pub remaining: Decimal,
}

/// Aggregate statistics for a scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStats {
    pub total_allocated: Decimal,
    pub total_used: Decimal,
    pub remaining_budget: Decimal,
    pub usage_percentage: f64,
    pub budgets_by_category: BTreeMap<BudgetCategory, CategoryStats>,
}

impl BudgetStats {
    fn empty() -> Self {
        Self {
            total_allocated: Decimal::ZERO,
            total_used: Decimal::ZERO,
            remaining_budget: Decimal::ZERO,
            usage_percentage: 0.0,
            budgets_by_category: BTreeMap::new(),
        }
    }
}

/// Computes rollups over the allocation store.
pub struct StatsAggregator {
    store: Arc<AllocationStore>,
}

impl StatsAggregator {
    pub fn new(store: Arc<AllocationStore>) -> Self {
        Self { store }
    }

    /// Compute statistics over every allocation belonging to the given
    /// schools. Categories without allocations in scope are absent from the
    /// per-category map.
    pub fn compute(&self, schools: &HashSet<SchoolId>) -> LedgerResult<BudgetStats> {
        let allocations = self
            .store
            .list_where(|a| schools.contains(&a.school_id))?;

        let mut stats = BudgetStats::empty();
        for allocation in &allocations {
            stats.total_allocated += allocation.amount;
            stats.total_used += allocation.used_total;

            let entry = stats
                .budgets_by_category
                .entry(allocation.category)
                .or_default();
            entry.allocated += allocation.amount;
            entry.used += allocation.used_total;
            entry.remaining = entry.allocated - entry.used;
        }

        stats.remaining_budget = stats.total_allocated - stats.total_used;
        stats.usage_percentage = if stats.total_allocated.is_zero() {
            0.0
        } else {
            (stats.total_used / stats.total_allocated * Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or(0.0)
        };

        Ok(stats)
    }
}
