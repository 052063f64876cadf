//! Store-level tests against a live PostgreSQL instance.
//!
//! These are ignored by default; provision a database and run with
//! `TEST_DATABASE_URL=postgresql://... cargo test -- --ignored`.

mod helpers;

use helpers::{unique_account, TestDatabase, TEST_SEED_BALANCE};
use iopn_ledger::error::LedgerError;
use iopn_ledger::models::TransactionKind;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn fresh_account_gets_seed_balance_and_bonus_transaction() {
    let db = TestDatabase::new().await;
    let account = unique_account("0xABC");

    let first = db.ledger.balance(&account).await.unwrap();
    assert_eq!(first.balance, TEST_SEED_BALANCE);
    assert_eq!(first.total_earned, TEST_SEED_BALANCE);
    assert_eq!(first.total_spent, 0);
    assert!(first.is_consistent());

    // The seed grant is itself audited as a bonus transaction
    let history = db.ledger.transactions(&account, None, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind(), Some(TransactionKind::Bonus));
    assert_eq!(history[0].amount, TEST_SEED_BALANCE);
    assert_eq!(history[0].source, "system");

    // A second read must not grant again
    let second = db.ledger.balance(&account).await.unwrap();
    assert_eq!(second.balance, TEST_SEED_BALANCE);
    let history = db.ledger.transactions(&account, None, None).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn credit_updates_balance_and_lifetime_earned() {
    let db = TestDatabase::new().await;
    let account = unique_account("0xABC");

    db.ledger.balance(&account).await.unwrap();
    let updated = db
        .ledger
        .credit(&account, 200, "event reward", "system")
        .await
        .unwrap();

    assert_eq!(updated.balance, TEST_SEED_BALANCE + 200);
    assert_eq!(updated.total_earned, TEST_SEED_BALANCE + 200);
    assert_eq!(updated.total_spent, 0);
    assert!(updated.is_consistent());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn debit_beyond_balance_is_rejected_and_leaves_balance_intact() {
    let db = TestDatabase::new().await;
    let account = unique_account("0xABC");

    db.ledger.balance(&account).await.unwrap();
    let err = db
        .ledger
        .debit(&account, TEST_SEED_BALANCE + 500, "Badge purchase", "marketplace")
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    assert!(err.to_string().contains("Insufficient balance"));

    let account = db.ledger.balance(&account).await.unwrap();
    assert_eq!(account.balance, TEST_SEED_BALANCE);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn zero_and_negative_amounts_never_touch_the_store() {
    let db = TestDatabase::new().await;
    let account = unique_account("0xABC");

    for amount in [0, -10] {
        let err = db
            .ledger
            .credit(&account, amount, "noop", "test")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let err = db
            .ledger
            .debit(&account, amount, "noop", "test")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    // The rejected calls must not even have provisioned the account
    assert!(db.repo.get(&account).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn transfer_conserves_tokens_and_writes_both_legs() {
    let db = TestDatabase::new().await;
    let alice = unique_account("alice");
    let bob = unique_account("bob");

    db.ledger.balance(&alice).await.unwrap();
    db.ledger.balance(&bob).await.unwrap();
    let total_before = 2 * TEST_SEED_BALANCE;

    let receipt = db
        .ledger
        .transfer(&alice, &bob, 300, "Badge purchase")
        .await
        .unwrap();

    assert_eq!(receipt.from.balance, TEST_SEED_BALANCE - 300);
    assert_eq!(receipt.to.balance, TEST_SEED_BALANCE + 300);
    assert_eq!(receipt.from.balance + receipt.to.balance, total_before);
    assert!(receipt.from.is_consistent());
    assert!(receipt.to.is_consistent());

    // One spent leg on the sender, one earned leg on the receiver,
    // both carrying the same amount and correlated by the transfer id
    let sender_history = db.ledger.transactions(&alice, None, None).await.unwrap();
    assert_eq!(sender_history[0].kind(), Some(TransactionKind::Spent));
    assert_eq!(sender_history[0].amount, 300);
    assert_eq!(sender_history[0].source, "transfer");
    assert!(sender_history[0]
        .description
        .contains(&receipt.transfer_id.to_string()));

    let receiver_history = db.ledger.transactions(&bob, None, None).await.unwrap();
    assert_eq!(receiver_history[0].kind(), Some(TransactionKind::Earned));
    assert_eq!(receiver_history[0].amount, 300);
    assert_eq!(receiver_history[0].source, "transfer");
    assert!(receiver_history[0]
        .description
        .contains(&receipt.transfer_id.to_string()));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn transfer_with_insufficient_sender_has_no_side_effects() {
    let db = TestDatabase::new().await;
    let alice = unique_account("alice");
    let bob = unique_account("bob");

    db.ledger.balance(&alice).await.unwrap();
    db.ledger.balance(&bob).await.unwrap();

    let err = db
        .ledger
        .transfer(&alice, &bob, TEST_SEED_BALANCE * 2, "Transfer")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

    assert_eq!(
        db.ledger.balance(&alice).await.unwrap().balance,
        TEST_SEED_BALANCE
    );
    assert_eq!(
        db.ledger.balance(&bob).await.unwrap().balance,
        TEST_SEED_BALANCE
    );
    // No transfer legs were recorded
    assert_eq!(db.ledger.transactions(&alice, None, None).await.unwrap().len(), 1);
    assert_eq!(db.ledger.transactions(&bob, None, None).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn concurrent_debits_never_overspend() {
    let db = TestDatabase::new().await;
    let account = unique_account("race");

    // Seed 1000, spend down to exactly 50
    db.ledger.balance(&account).await.unwrap();
    db.ledger
        .debit(&account, TEST_SEED_BALANCE - 50, "setup", "test")
        .await
        .unwrap();

    let ledger = Arc::clone(&db.ledger);
    let mut handles = Vec::new();
    for _ in 0..100 {
        let ledger = Arc::clone(&ledger);
        let account = account.clone();
        handles.push(tokio::spawn(async move {
            ledger.debit(&account, 1, "Spend", "test").await
        }));
    }

    let mut successes = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(LedgerError::InsufficientBalance { .. }) => insufficient += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 50);
    assert_eq!(insufficient, 50);

    let final_account = db.ledger.balance(&account).await.unwrap();
    assert_eq!(final_account.balance, 0);
    assert!(final_account.is_consistent());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn history_pagination_is_newest_first() {
    let db = TestDatabase::new().await;
    let account = unique_account("pager");

    db.ledger.balance(&account).await.unwrap();
    for i in 1..=5 {
        db.ledger
            .credit(&account, i * 10, &format!("reward {}", i), "missions")
            .await
            .unwrap();
    }

    let page = db
        .ledger
        .transactions(&account, Some(2), Some(0))
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].amount, 50);
    assert_eq!(page[1].amount, 40);

    let next = db
        .ledger
        .transactions(&account, Some(2), Some(2))
        .await
        .unwrap();
    assert_eq!(next.len(), 2);
    assert_eq!(next[0].amount, 30);
    assert_eq!(next[1].amount, 20);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn get_or_create_is_race_safe_and_grants_once() {
    let db = TestDatabase::new().await;
    let account = unique_account("race-create");

    let mut handles = Vec::new();
    for _ in 0..10 {
        let repo = Arc::clone(&db.repo);
        let account = account.clone();
        handles.push(tokio::spawn(async move {
            repo.get_or_create(&account, TEST_SEED_BALANCE).await
        }));
    }

    let mut created_count = 0;
    for handle in handles {
        let (acct, created) = handle.await.unwrap().unwrap();
        assert_eq!(acct.balance, TEST_SEED_BALANCE);
        if created {
            created_count += 1;
        }
    }
    assert_eq!(created_count, 1);

    // Exactly one welcome bonus row despite the racing creators
    let history = db.ledger.transactions(&account, None, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind(), Some(TransactionKind::Bonus));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn transfer_id_is_unique_per_transfer() {
    let db = TestDatabase::new().await;
    let alice = unique_account("alice");
    let bob = unique_account("bob");

    db.ledger.balance(&alice).await.unwrap();
    db.ledger.balance(&bob).await.unwrap();

    let first = db.ledger.transfer(&alice, &bob, 100, "Transfer").await.unwrap();
    let second = db.ledger.transfer(&alice, &bob, 100, "Transfer").await.unwrap();
    assert_ne!(first.transfer_id, second.transfer_id);
    assert_ne!(first.transfer_id, Uuid::nil());
}
