//! Ledger service facade
//!
//! The single point every mutation passes through. Validates the caller's
//! scope against the target allocation's school, routes to the stores and
//! the aggregator, and emits one log event and one counter increment per
//! mutation outcome. External callers never touch the stores directly.

use std::collections::HashSet;
use std::sync::Arc;

use crate::observability::{LedgerMetrics, Logger};
use crate::scope::{Scope, SchoolDirectory, SchoolId};

use super::allocation::{Allocation, AllocationId, AllocationUpdate, NewAllocation};
use super::errors::{LedgerError, LedgerResult};
use super::stats::{BudgetStats, StatsAggregator};
use super::store::AllocationStore;
use super::usage::{NewUsage, UsageId, UsageRecord};
use super::usage_ledger::{DeleteOutcome, DeletePolicy, UsageLedger};

/// Tunables for a ledger instance.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// Policy for deleting allocations that have usage records.
    pub delete_policy: DeletePolicy,
    /// Retry budget for acquiring an allocation's write lock.
    pub lock_attempts: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            delete_policy: DeletePolicy::Block,
            lock_attempts: 65536,
        }
    }
}

/// The budget ledger service.
pub struct LedgerService<D: SchoolDirectory> {
    store: Arc<AllocationStore>,
    usage: UsageLedger,
    stats: StatsAggregator,
    directory: Arc<D>,
    delete_policy: DeletePolicy,
    metrics: Arc<LedgerMetrics>,
}

impl<D: SchoolDirectory> LedgerService<D> {
    pub fn new(directory: Arc<D>, settings: LedgerSettings) -> Self {
        let store = Arc::new(AllocationStore::new(settings.lock_attempts));
        Self {
            usage: UsageLedger::new(store.clone()),
            stats: StatsAggregator::new(store.clone()),
            store,
            directory,
            delete_policy: settings.delete_policy,
            metrics: Arc::new(LedgerMetrics::new()),
        }
    }

    /// Operation counters for this instance.
    pub fn metrics(&self) -> Arc<LedgerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Create an allocation. District scope only.
    pub fn create_allocation(
        &self,
        scope: &Scope,
        new: NewAllocation,
    ) -> LedgerResult<Allocation> {
        if !self.directory.school_exists(new.school_id) {
            return Err(LedgerError::invalid("unknown school"));
        }
        self.ensure_district_over(scope, new.school_id)?;

        let allocation = self.store.create(new)?;
        self.metrics.increment_allocations_created();
        Logger::info(
            "ALLOCATION_CREATED",
            &[
                ("allocation_id", &allocation.id.to_string()),
                ("school_id", &allocation.school_id.to_string()),
                ("category", allocation.category.as_str()),
                ("amount", &allocation.amount.to_string()),
                ("fiscal_year", &allocation.fiscal_year.to_string()),
            ],
        );
        Ok(allocation)
    }

    /// Read one allocation within the caller's scope.
    pub fn get_allocation(&self, scope: &Scope, id: AllocationId) -> LedgerResult<Allocation> {
        let allocation = self.store.get(id)?;
        self.ensure_covers(scope, allocation.school_id)?;
        Ok(allocation)
    }

    /// All allocations visible to the caller, newest first.
    pub fn list_allocations(&self, scope: &Scope) -> LedgerResult<Vec<Allocation>> {
        let schools = self.scope_schools(scope);
        self.store.list_where(|a| schools.contains(&a.school_id))
    }

    /// Administrative update. District scope only.
    pub fn update_allocation(
        &self,
        scope: &Scope,
        id: AllocationId,
        update: AllocationUpdate,
    ) -> LedgerResult<Allocation> {
        let current = self.store.get(id)?;
        self.ensure_district_over(scope, current.school_id)?;

        let closing = update.close;
        let updated = self.store.update(id, update)?;

        self.metrics.increment_allocations_updated();
        if closing {
            self.metrics.increment_allocations_closed();
            Logger::info(
                "ALLOCATION_CLOSED",
                &[("allocation_id", &updated.id.to_string())],
            );
        } else {
            Logger::info(
                "ALLOCATION_UPDATED",
                &[
                    ("allocation_id", &updated.id.to_string()),
                    ("status", updated.status.as_str()),
                ],
            );
        }
        Ok(updated)
    }

    /// Delete an allocation per the configured policy. District scope only.
    pub fn delete_allocation(
        &self,
        scope: &Scope,
        id: AllocationId,
    ) -> LedgerResult<DeleteOutcome> {
        let current = self.store.get(id)?;
        self.ensure_district_over(scope, current.school_id)?;

        let outcome = self.usage.delete_allocation(id, self.delete_policy)?;
        match outcome {
            DeleteOutcome::Deleted { removed_usage } => {
                self.metrics.increment_allocations_deleted();
                Logger::info(
                    "ALLOCATION_DELETED",
                    &[
                        ("allocation_id", &id.to_string()),
                        ("removed_usage", &removed_usage.to_string()),
                    ],
                );
            }
            DeleteOutcome::Closed => {
                self.metrics.increment_allocations_closed();
                Logger::info(
                    "ALLOCATION_CLOSED",
                    &[("allocation_id", &id.to_string()), ("via", "delete_policy")],
                );
            }
        }
        Ok(outcome)
    }

    /// Record usage against an allocation in the caller's scope.
    pub fn record_usage(
        &self,
        scope: &Scope,
        new: NewUsage,
    ) -> LedgerResult<(UsageRecord, Allocation)> {
        let current = self.store.get(new.allocation_id)?;
        self.ensure_covers(scope, current.school_id)?;

        match self.usage.record(new) {
            Ok((record, allocation)) => {
                self.metrics.increment_usage_recorded();
                Logger::info(
                    "USAGE_RECORDED",
                    &[
                        ("usage_id", &record.id.to_string()),
                        ("allocation_id", &allocation.id.to_string()),
                        ("amount", &record.amount.to_string()),
                        ("remaining", &allocation.remaining.to_string()),
                        ("status", allocation.status.as_str()),
                    ],
                );
                Ok((record, allocation))
            }
            Err(err) => {
                self.note_rejected_usage(&err);
                Err(err)
            }
        }
    }

    /// Delete a usage record in the caller's scope.
    pub fn delete_usage(&self, scope: &Scope, id: UsageId) -> LedgerResult<Allocation> {
        let record = self.usage.get(id)?;
        let current = self.store.get(record.allocation_id)?;
        self.ensure_covers(scope, current.school_id)?;

        let allocation = self.usage.delete(id)?;
        self.metrics.increment_usage_deleted();
        Logger::info(
            "USAGE_DELETED",
            &[
                ("usage_id", &id.to_string()),
                ("allocation_id", &allocation.id.to_string()),
                ("remaining", &allocation.remaining.to_string()),
                ("status", allocation.status.as_str()),
            ],
        );
        Ok(allocation)
    }

    /// All usage for an allocation in the caller's scope.
    pub fn list_usage(
        &self,
        scope: &Scope,
        allocation_id: AllocationId,
    ) -> LedgerResult<Vec<UsageRecord>> {
        let allocation = self.store.get(allocation_id)?;
        self.ensure_covers(scope, allocation.school_id)?;
        self.usage.list(allocation_id)
    }

    /// Aggregate statistics over the caller's scope.
    pub fn compute_stats(&self, scope: &Scope) -> LedgerResult<BudgetStats> {
        let schools = self.scope_schools(scope);
        self.metrics.increment_stats_computed();
        self.stats.compute(&schools)
    }

    fn scope_schools(&self, scope: &Scope) -> HashSet<SchoolId> {
        scope
            .schools(self.directory.as_ref())
            .into_iter()
            .collect()
    }

    fn ensure_covers(&self, scope: &Scope, school: SchoolId) -> LedgerResult<()> {
        if scope.covers(school, self.directory.as_ref()) {
            Ok(())
        } else {
            Err(LedgerError::Forbidden)
        }
    }

    /// Allocation administration (create, update, delete) is reserved for a
    /// district scope covering the school.
    fn ensure_district_over(&self, scope: &Scope, school: SchoolId) -> LedgerResult<()> {
        if !scope.is_district() {
            return Err(LedgerError::Forbidden);
        }
        self.ensure_covers(scope, school)
    }

    fn note_rejected_usage(&self, err: &LedgerError) {
        match err {
            LedgerError::InsufficientFunds {
                available,
                requested,
            } => {
                self.metrics.increment_usage_rejected();
                Logger::warn(
                    "USAGE_REJECTED",
                    &[
                        ("reason", "insufficient_funds"),
                        ("available", &available.to_string()),
                        ("requested", &requested.to_string()),
                    ],
                );
            }
            LedgerError::Closed { status } => {
                self.metrics.increment_usage_rejected();
                Logger::warn(
                    "USAGE_REJECTED",
                    &[("reason", "blocking_status"), ("status", status.as_str())],
                );
            }
            LedgerError::TransientConflict => {
                self.metrics.increment_write_conflicts();
                Logger::warn("USAGE_CONFLICT", &[("reason", "lock_contention")]);
            }
            _ => {}
        }
    }
}
