//! Multi-threaded stress tests for locking and atomicity.

use account_ledger::{
    create_tracker, Address, Amount, InMemoryCustody, LedgerEngine, LedgerError, ManualClock,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;
const ROUNDS: usize = 500;

fn addr(s: &str) -> Address {
    Address::from(s)
}

#[test]
fn test_opposing_transfers_do_not_deadlock_and_conserve() {
    let ledger = Arc::new(create_tracker());
    ledger.create_account(&addr("alice"), 0).unwrap();
    ledger.create_account(&addr("bob"), 0).unwrap();
    ledger.deposit(&addr("alice"), Amount::new(1_000), 1).unwrap();
    ledger.deposit(&addr("bob"), Amount::new(1_000), 1).unwrap();

    let workers: Vec<_> = (0..THREADS)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                let (from, to) = if i % 2 == 0 {
                    (addr("alice"), addr("bob"))
                } else {
                    (addr("bob"), addr("alice"))
                };
                for round in 0..ROUNDS {
                    match ledger.transfer(&from, &to, Amount::new(3), round as u64) {
                        Ok(()) | Err(LedgerError::InsufficientBalance { .. }) => {}
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(ledger.total_balance(), 2_000);
}

#[test]
fn test_observers_never_see_half_applied_transfer() {
    let names = ["a", "b", "c", "d"];
    let ledger = Arc::new(create_tracker());
    for name in names {
        ledger.create_account(&addr(name), 0).unwrap();
        ledger.deposit(&addr(name), Amount::new(250), 1).unwrap();
    }

    let done = Arc::new(AtomicBool::new(false));

    let observer = {
        let ledger = Arc::clone(&ledger);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut checks = 0;
            while !done.load(Ordering::SeqCst) {
                assert_eq!(ledger.total_balance(), 1_000);
                let snapshot = ledger.snapshot();
                let sum: u64 = snapshot.accounts.values().map(|r| r.balance.value()).sum();
                assert_eq!(sum, 1_000);
                checks += 1;
            }
            checks
        })
    };

    let workers: Vec<_> = (0..THREADS)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    let from = addr(names[(i + round) % names.len()]);
                    let to = addr(names[(i + round + 1 + i % 3) % names.len()]);
                    if from == to {
                        continue;
                    }
                    let _ = ledger.transfer(&from, &to, Amount::new((round % 7) as u64), 2);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    observer.join().unwrap();

    assert_eq!(ledger.total_balance(), 1_000);
}

#[test]
fn test_concurrent_withdrawals_never_overdraw() {
    let ledger = Arc::new(create_tracker());
    ledger.create_account(&addr("alice"), 0).unwrap();
    ledger.deposit(&addr("alice"), Amount::new(100), 1).unwrap();

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                (0..ROUNDS)
                    .filter(|_| ledger.withdraw(&addr("alice"), Amount::new(1), 2).is_ok())
                    .count()
            })
        })
        .collect();

    let succeeded: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();

    assert_eq!(succeeded, 100);
    assert_eq!(ledger.account_balance(&addr("alice")).unwrap(), Amount::ZERO);
    assert_eq!(ledger.transactions_count(&addr("alice")).unwrap(), 101);
}

#[test]
fn test_concurrent_creation_of_same_address_admits_one() {
    let ledger = Arc::new(create_tracker());

    let workers: Vec<_> = (0..THREADS)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.create_account(&addr("shared"), i as u64).is_ok())
        })
        .collect();

    let created = workers
        .into_iter()
        .map(|w| w.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(created, 1);
    assert_eq!(ledger.size(), 1);
}

#[test]
fn test_engine_stays_fully_backed_under_load() {
    let engine = Arc::new(LedgerEngine::new(ManualClock::new(1), InMemoryCustody::new()));
    let names: Vec<Address> = (0..4).map(|i| addr(&format!("user{}", i))).collect();
    for name in &names {
        engine.create_account(name).unwrap();
    }

    let workers: Vec<_> = names
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, caller)| {
            let engine = Arc::clone(&engine);
            let peer = addr(&format!("user{}", (i + 1) % 4));
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    let coin = engine.custody().mint(Amount::new(10));
                    engine.deposit(&caller, coin).unwrap();
                    let _ = engine.transfer(&caller, &peer, Amount::new(4));
                    let _ = engine.withdraw(&caller, Amount::new((round % 9) as u64));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert!(engine.is_fully_backed());
    let released: u64 = names
        .iter()
        .map(|n| engine.custody().released_to(n).value())
        .sum();
    assert_eq!(
        u128::from(engine.reserve_value().value()) + u128::from(released),
        4 * ROUNDS as u128 * 10
    );
}
