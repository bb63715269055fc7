//! Usage ledger
//!
//! Durable record of usage transactions. This module owns the balance
//! safety invariant: for every allocation, the sum of its usage amounts
//! never exceeds its ceiling, at any observable instant. The bounds check
//! and the write happen under one slot write lock, so two concurrent
//! writes that are individually affordable but jointly over the ceiling
//! can never both commit.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::allocation::{Allocation, AllocationId};
use super::errors::{LedgerError, LedgerResult};
use super::store::AllocationStore;
use super::usage::{NewUsage, UsageId, UsageRecord};

/// What to do when an allocation with usage records is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Refuse the delete while usage records exist.
    #[default]
    Block,
    /// Keep the allocation and its history, close it instead.
    AutoClose,
    /// Delete the allocation and every usage record under it.
    Cascade,
}

/// Result of deleting an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The allocation is gone, along with `removed_usage` usage records.
    Deleted { removed_usage: usize },
    /// The allocation was closed in place, history kept.
    Closed,
}

/// Ledger of usage records, tied to the allocation store.
pub struct UsageLedger {
    store: Arc<AllocationStore>,
    records: RwLock<HashMap<UsageId, UsageRecord>>,
    by_allocation: RwLock<HashMap<AllocationId, Vec<UsageId>>>,
}

impl UsageLedger {
    pub fn new(store: Arc<AllocationStore>) -> Self {
        Self {
            store,
            records: RwLock::new(HashMap::new()),
            by_allocation: RwLock::new(HashMap::new()),
        }
    }

    /// Record one expenditure against an allocation.
    ///
    /// Atomic as a unit: status check, bounds check, row insert and the
    /// rewrite of the allocation's derived fields all happen under the
    /// allocation's write lock. Returns the new record together with the
    /// updated allocation.
    pub fn record(&self, new: NewUsage) -> LedgerResult<(UsageRecord, Allocation)> {
        new.validate()?;

        let slot = self.store.slot(new.allocation_id)?;
        let mut guard = self.store.write_slot(&slot)?;
        if !guard.live {
            return Err(LedgerError::AllocationNotFound);
        }

        let status = guard.allocation.status;
        if !status.accepts_usage() {
            return Err(LedgerError::Closed { status });
        }

        let available = guard.allocation.remaining;
        if new.amount > available {
            return Err(LedgerError::InsufficientFunds {
                available,
                requested: new.amount,
            });
        }

        let record = UsageRecord::create(new);
        self.insert_record(&record)?;

        let used = guard.allocation.used_total + record.amount;
        guard.allocation.apply_usage_total(used);

        Ok((record, guard.allocation.clone()))
    }

    /// Delete a usage record, reversing its effect on the balance.
    ///
    /// May transition `depleted` back to `in_use` or `in_use` back to
    /// `allocated`. A closed allocation stays closed, but its balance still
    /// reflects the removal.
    pub fn delete(&self, id: UsageId) -> LedgerResult<Allocation> {
        let allocation_id = self
            .read_records()?
            .get(&id)
            .map(|r| r.allocation_id)
            .ok_or(LedgerError::UsageNotFound)?;

        let slot = self.store.slot(allocation_id)?;
        let mut guard = self.store.write_slot(&slot)?;

        // The record may have been deleted while we waited for the slot.
        let removed = self
            .write_records()?
            .remove(&id)
            .ok_or(LedgerError::UsageNotFound)?;
        if let Some(ids) = self.write_index()?.get_mut(&allocation_id) {
            ids.retain(|u| *u != id);
        }

        let used = guard.allocation.used_total - removed.amount;
        guard.allocation.apply_usage_total(used);

        Ok(guard.allocation.clone())
    }

    /// Read one usage record.
    pub fn get(&self, id: UsageId) -> LedgerResult<UsageRecord> {
        self.read_records()?
            .get(&id)
            .cloned()
            .ok_or(LedgerError::UsageNotFound)
    }

    /// All usage for an allocation, newest expenditure date first.
    pub fn list(&self, allocation_id: AllocationId) -> LedgerResult<Vec<UsageRecord>> {
        // Unknown allocations are a 404, not an empty list.
        self.store.get(allocation_id)?;

        let ids = self
            .read_index()?
            .get(&allocation_id)
            .cloned()
            .unwrap_or_default();

        let mut out: Vec<UsageRecord> = {
            let records = self.read_records()?;
            ids.iter().filter_map(|u| records.get(u).cloned()).collect()
        };

        out.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(out)
    }

    /// Number of usage records under an allocation.
    pub fn usage_count(&self, allocation_id: AllocationId) -> LedgerResult<usize> {
        Ok(self
            .read_index()?
            .get(&allocation_id)
            .map(|ids| ids.len())
            .unwrap_or(0))
    }

    /// Delete an allocation according to policy.
    ///
    /// Lives here rather than on the store because the decision depends on
    /// the usage rows and, under `cascade`, removes them in the same
    /// critical section.
    pub fn delete_allocation(
        &self,
        id: AllocationId,
        policy: DeletePolicy,
    ) -> LedgerResult<DeleteOutcome> {
        let slot = self.store.slot(id)?;
        let mut guard = self.store.write_slot(&slot)?;
        if !guard.live {
            return Err(LedgerError::AllocationNotFound);
        }

        let count = self
            .read_index()?
            .get(&id)
            .map(|ids| ids.len())
            .unwrap_or(0);

        match policy {
            DeletePolicy::Block if count > 0 => {
                Err(LedgerError::DeleteBlocked { usage_count: count })
            }
            DeletePolicy::AutoClose if count > 0 => {
                guard.allocation.close();
                Ok(DeleteOutcome::Closed)
            }
            DeletePolicy::Cascade if count > 0 => {
                let ids = self.write_index()?.remove(&id).unwrap_or_default();
                {
                    let mut records = self.write_records()?;
                    for usage_id in &ids {
                        records.remove(usage_id);
                    }
                }
                guard.live = false;
                self.store.remove_slot(id)?;
                Ok(DeleteOutcome::Deleted {
                    removed_usage: ids.len(),
                })
            }
            _ => {
                guard.live = false;
                self.store.remove_slot(id)?;
                Ok(DeleteOutcome::Deleted { removed_usage: 0 })
            }
        }
    }

    fn insert_record(&self, record: &UsageRecord) -> LedgerResult<()> {
        self.write_records()?.insert(record.id, record.clone());
        self.write_index()?
            .entry(record.allocation_id)
            .or_default()
            .push(record.id);
        Ok(())
    }

    fn read_records(
        &self,
    ) -> LedgerResult<std::sync::RwLockReadGuard<'_, HashMap<UsageId, UsageRecord>>> {
        self.records
            .read()
            .map_err(|_| LedgerError::internal("usage records poisoned"))
    }

    fn write_records(
        &self,
    ) -> LedgerResult<std::sync::RwLockWriteGuard<'_, HashMap<UsageId, UsageRecord>>> {
        self.records
            .write()
            .map_err(|_| LedgerError::internal("usage records poisoned"))
    }

    fn read_index(
        &self,
    ) -> LedgerResult<std::sync::RwLockReadGuard<'_, HashMap<AllocationId, Vec<UsageId>>>> {
        self.by_allocation
            .read()
            .map_err(|_| LedgerError::internal("usage index poisoned"))
    }

    fn write_index(
        &self,
    ) -> LedgerResult<std::sync::RwLockWriteGuard<'_, HashMap<AllocationId, Vec<UsageId>>>> {
        self.by_allocation
            .write()
            .map_err(|_| LedgerError::internal("usage index poisoned"))
    }
}
