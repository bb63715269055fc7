//! Concurrency properties
//!
//! The one property that matters most: for every allocation, at every
//! observable instant, the sum of its usage never exceeds its ceiling,
//! no matter how writes interleave.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use school_ledger::ledger::{
    AllocationId, AllocationStatus, BudgetCategory, LedgerError, LedgerService, LedgerSettings,
    NewAllocation, NewUsage,
};
use school_ledger::scope::{DistrictId, Scope, SchoolId, StaticDirectory};

fn create_test_service() -> (Arc<LedgerService<StaticDirectory>>, Scope, SchoolId) {
    let district = DistrictId::new();
    let school = SchoolId::new();

    let mut directory = StaticDirectory::new();
    directory.add_school(district, school);

    let service = LedgerService::new(Arc::new(directory), LedgerSettings::default());
    (Arc::new(service), Scope::District(district), school)
}

fn allocation_of(
    service: &LedgerService<StaticDirectory>,
    scope: &Scope,
    school: SchoolId,
    amount: i64,
) -> AllocationId {
    service
        .create_allocation(
            scope,
            NewAllocation {
                school_id: school,
                fiscal_year: 2025,
                category: BudgetCategory::General,
                amount: Decimal::from(amount),
                description: None,
            },
        )
        .unwrap()
        .id
}

fn usage(allocation_id: AllocationId, amount: i64) -> NewUsage {
    NewUsage {
        allocation_id,
        amount: Decimal::from(amount),
        purpose: "concurrent entry".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        receipt_number: None,
    }
}

// =============================================================================
// Two racing writers
// =============================================================================

/// Two concurrent 500s against a remaining 600: exactly one commits, and
/// the loser sees the post-commit balance in its rejection.
#[test]
fn test_two_racing_writers_one_commits() {
    let (service, scope, school) = create_test_service();
    let allocation_id = allocation_of(&service, &scope, school, 1000);

    service.record_usage(&scope, usage(allocation_id, 400)).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for _ in 0..2 {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        let scope = scope;
        handles.push(thread::spawn(move || {
            barrier.wait();
            service.record_usage(&scope, usage(allocation_id, 500))
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let failure = results
        .into_iter()
        .find_map(|r| r.err())
        .expect("one call must fail");
    assert_eq!(
        failure,
        LedgerError::InsufficientFunds {
            available: Decimal::from(100),
            requested: Decimal::from(500),
        }
    );

    let final_state = service.get_allocation(&scope, allocation_id).unwrap();
    assert_eq!(final_state.remaining, Decimal::from(100));
    assert_eq!(final_state.used_total, Decimal::from(900));
}

// =============================================================================
// N writers against one ceiling
// =============================================================================

/// Ten concurrent 100s against a 500 ceiling: exactly five commit, the
/// rest fail with insufficient funds, and the total never exceeds 500.
#[test]
fn test_n_writers_fill_exactly_to_ceiling() {
    let (service, scope, school) = create_test_service();
    let allocation_id = allocation_of(&service, &scope, school, 500);

    let writers = 10;
    let barrier = Arc::new(Barrier::new(writers));
    let mut handles = Vec::new();
    for _ in 0..writers {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        let scope = scope;
        handles.push(thread::spawn(move || {
            barrier.wait();
            service.record_usage(&scope, usage(allocation_id, 100))
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let rejections = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. })))
        .count();

    assert_eq!(successes, 5);
    assert_eq!(rejections, 5);

    let final_state = service.get_allocation(&scope, allocation_id).unwrap();
    assert_eq!(final_state.used_total, Decimal::from(500));
    assert_eq!(final_state.remaining, Decimal::ZERO);
    assert_eq!(final_state.status, AllocationStatus::Depleted);
    assert_eq!(service.list_usage(&scope, allocation_id).unwrap().len(), 5);
}

/// Jointly-overcommitting writers: any interleaving must keep the sum of
/// committed usage at or below the ceiling, and the stored total equal to
/// the sum of the surviving rows.
#[test]
fn test_mixed_amounts_never_exceed_ceiling() {
    let (service, scope, school) = create_test_service();
    let allocation_id = allocation_of(&service, &scope, school, 700);

    let amounts = [300, 300, 300, 200, 100];
    let barrier = Arc::new(Barrier::new(amounts.len()));
    let mut handles = Vec::new();
    for amount in amounts {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        let scope = scope;
        handles.push(thread::spawn(move || {
            barrier.wait();
            service.record_usage(&scope, usage(allocation_id, amount))
        }));
    }
    for handle in handles {
        handle.join().unwrap().ok();
    }

    let final_state = service.get_allocation(&scope, allocation_id).unwrap();
    assert!(final_state.used_total <= Decimal::from(700));
    assert!(final_state.remaining >= Decimal::ZERO);

    let row_sum: Decimal = service
        .list_usage(&scope, allocation_id)
        .unwrap()
        .iter()
        .map(|r| r.amount)
        .sum();
    assert_eq!(row_sum, final_state.used_total);
}

// =============================================================================
// Writers and reversals interleaved
// =============================================================================

/// Concurrent records and deletes settle to a total equal to the sum of
/// the surviving rows, with a correctly derived status.
#[test]
fn test_interleaved_records_and_deletes_stay_consistent() {
    let (service, scope, school) = create_test_service();
    let allocation_id = allocation_of(&service, &scope, school, 10_000);

    let seeded: Vec<_> = (0..8)
        .map(|_| {
            service
                .record_usage(&scope, usage(allocation_id, 50))
                .unwrap()
                .0
                .id
        })
        .collect();

    let barrier = Arc::new(Barrier::new(seeded.len() + 4));
    let mut handles = Vec::new();

    for usage_id in seeded {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        let scope = scope;
        handles.push(thread::spawn(move || {
            barrier.wait();
            service.delete_usage(&scope, usage_id).map(|_| ())
        }));
    }
    for _ in 0..4 {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        let scope = scope;
        handles.push(thread::spawn(move || {
            barrier.wait();
            service.record_usage(&scope, usage(allocation_id, 75)).map(|_| ())
        }));
    }
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    // All 8 seeds deleted, 4 fresh 75s recorded.
    let final_state = service.get_allocation(&scope, allocation_id).unwrap();
    assert_eq!(final_state.used_total, Decimal::from(300));

    let row_sum: Decimal = service
        .list_usage(&scope, allocation_id)
        .unwrap()
        .iter()
        .map(|r| r.amount)
        .sum();
    assert_eq!(row_sum, final_state.used_total);
    assert_eq!(final_state.status, AllocationStatus::InUse);
}

// =============================================================================
// Independent allocations do not contend
// =============================================================================

/// Writers on different allocations all commit; one allocation's ceiling
/// never throttles another's.
#[test]
fn test_independent_allocations_commit_in_parallel() {
    let (service, scope, school) = create_test_service();

    let allocations: Vec<_> = (0..4)
        .map(|_| allocation_of(&service, &scope, school, 100))
        .collect();

    let barrier = Arc::new(Barrier::new(allocations.len()));
    let mut handles = Vec::new();
    for allocation_id in allocations.clone() {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        let scope = scope;
        handles.push(thread::spawn(move || {
            barrier.wait();
            service.record_usage(&scope, usage(allocation_id, 100))
        }));
    }

    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
    for allocation_id in allocations {
        let state = service.get_allocation(&scope, allocation_id).unwrap();
        assert_eq!(state.status, AllocationStatus::Depleted);
    }
}
