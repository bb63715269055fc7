//! Allocation store
//!
//! In-process store of allocations. Each allocation lives in its own slot
//! behind its own lock, so writers contend per allocation and never across
//! the whole ledger. The slot map lock is held only for lookup, insert and
//! remove, never across a balance check.
//!
//! Lock order, everywhere in this crate: slot before slot map, slot before
//! usage maps, never two slots at once. The slot map read lock is always
//! dropped before a slot lock is taken.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard, TryLockError};

use super::allocation::{Allocation, AllocationId, AllocationUpdate, NewAllocation};
use super::errors::{LedgerError, LedgerResult};
use super::status::AllocationStatus;

/// A stored allocation plus its liveness flag.
///
/// `live` goes false exactly once, under the slot write lock, when the
/// allocation is deleted. Writers that acquired the slot `Arc` before the
/// removal re-check it after locking and bail out with `NotFound`, so a
/// delete racing a write can never resurrect the allocation.
#[derive(Debug)]
pub(crate) struct AllocationSlot {
    pub allocation: Allocation,
    pub live: bool,
}

/// Store of all allocations, one lock per allocation.
pub struct AllocationStore {
    slots: RwLock<HashMap<AllocationId, Arc<RwLock<AllocationSlot>>>>,
    lock_attempts: u32,
}

impl AllocationStore {
    /// Create an empty store.
    ///
    /// `lock_attempts` bounds how long a writer spins for a slot write lock
    /// before giving up with `TransientConflict`.
    pub fn new(lock_attempts: u32) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            lock_attempts: lock_attempts.max(1),
        }
    }

    /// Validate and persist a new allocation.
    pub fn create(&self, new: NewAllocation) -> LedgerResult<Allocation> {
        new.validate()?;
        let allocation = Allocation::create(new);

        let mut slots = self
            .slots
            .write()
            .map_err(|_| LedgerError::internal("slot map poisoned"))?;
        slots.insert(
            allocation.id,
            Arc::new(RwLock::new(AllocationSlot {
                allocation: allocation.clone(),
                live: true,
            })),
        );
        Ok(allocation)
    }

    /// Read one allocation.
    pub fn get(&self, id: AllocationId) -> LedgerResult<Allocation> {
        let slot = self.slot(id)?;
        let guard = slot
            .read()
            .map_err(|_| LedgerError::internal("allocation slot poisoned"))?;
        if !guard.live {
            return Err(LedgerError::AllocationNotFound);
        }
        Ok(guard.allocation.clone())
    }

    /// Read every allocation the filter keeps, newest first.
    ///
    /// Each allocation is read under its own lock; the result is a
    /// per-allocation snapshot, not a global one.
    pub fn list_where<F>(&self, keep: F) -> LedgerResult<Vec<Allocation>>
    where
        F: Fn(&Allocation) -> bool,
    {
        let arcs: Vec<Arc<RwLock<AllocationSlot>>> = {
            let slots = self
                .slots
                .read()
                .map_err(|_| LedgerError::internal("slot map poisoned"))?;
            slots.values().cloned().collect()
        };

        let mut out = Vec::new();
        for arc in arcs {
            let guard = arc
                .read()
                .map_err(|_| LedgerError::internal("allocation slot poisoned"))?;
            if guard.live && keep(&guard.allocation) {
                out.push(guard.allocation.clone());
            }
        }

        out.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(out)
    }

    /// Apply an administrative update under the slot write lock.
    ///
    /// The ceiling check against the current usage total happens inside the
    /// same critical section that rewrites it, so a concurrent usage write
    /// can never slip a total past a lowered ceiling.
    pub fn update(&self, id: AllocationId, update: AllocationUpdate) -> LedgerResult<Allocation> {
        update.validate()?;

        let slot = self.slot(id)?;
        let mut guard = self.write_slot(&slot)?;
        if !guard.live {
            return Err(LedgerError::AllocationNotFound);
        }

        if guard.allocation.status == AllocationStatus::Closed {
            if update.close && !update.touches_fields() {
                // Closing twice is a no-op, not an error.
                return Ok(guard.allocation.clone());
            }
            return Err(LedgerError::Closed {
                status: AllocationStatus::Closed,
            });
        }

        if let Some(amount) = update.amount {
            if amount < guard.allocation.used_total {
                return Err(LedgerError::invalid(format!(
                    "amount {} is below the recorded usage total {}",
                    amount, guard.allocation.used_total
                )));
            }
            guard.allocation.set_amount(amount);
        }
        if let Some(category) = update.category {
            guard.allocation.category = category;
        }
        if let Some(description) = update.description {
            guard.allocation.description =
                super::allocation::normalize_text(Some(description));
        }
        if update.close {
            guard.allocation.close();
        }

        Ok(guard.allocation.clone())
    }

    /// Look up a slot by id. The map lock is released before returning.
    pub(crate) fn slot(&self, id: AllocationId) -> LedgerResult<Arc<RwLock<AllocationSlot>>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| LedgerError::internal("slot map poisoned"))?;
        slots
            .get(&id)
            .cloned()
            .ok_or(LedgerError::AllocationNotFound)
    }

    /// Acquire a slot write lock with a bounded spin.
    ///
    /// Critical sections under this lock are short; exhausting the budget
    /// means pathological contention, surfaced as `TransientConflict` so the
    /// caller can retry the whole operation.
    pub(crate) fn write_slot<'a>(
        &self,
        slot: &'a RwLock<AllocationSlot>,
    ) -> LedgerResult<RwLockWriteGuard<'a, AllocationSlot>> {
        for _ in 0..self.lock_attempts {
            match slot.try_write() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::WouldBlock) => std::thread::yield_now(),
                Err(TryLockError::Poisoned(_)) => {
                    return Err(LedgerError::internal("allocation slot poisoned"))
                }
            }
        }
        Err(LedgerError::TransientConflict)
    }

    /// Remove a slot from the map. The caller must hold the slot's write
    /// lock and have already flipped `live` to false.
    pub(crate) fn remove_slot(&self, id: AllocationId) -> LedgerResult<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| LedgerError::internal("slot map poisoned"))?;
        slots.remove(&id);
        Ok(())
    }

    /// Number of live allocations.
    pub fn len(&self) -> usize {
        self.list_where(|_| true).map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
