//! End-to-end checks of the reconciliation and correction transactions
//! against a real SQLite database.

use chrono::NaiveDate;
use reparto_core::settlement::{fold_log, SettlementKey};
use reparto_core::{
    CoreError, NewCustomer, ProductCode, ValidationError, VisitCorrection, VisitEvent,
    VisitLogEntry,
};
use reparto_db::{Database, DbConfig, DbError, DedupScope};
use uuid::Uuid;

const AGENT: i64 = 2;
const ZONE: i64 = 7;

fn visit_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 14).unwrap()
}

fn key() -> SettlementKey {
    SettlementKey::new(AGENT, visit_day(), ZONE)
}

fn event(customer_code: i64, product: ProductCode, units: i64, cash: i64, ccte: i64) -> VisitEvent {
    VisitEvent {
        customer_code,
        product,
        units_sold: units,
        cash_collected: cash,
        on_account_collected: ccte,
        agent_code: AGENT,
        zone_code: ZONE,
        empties_returned: 0,
        reason: None,
        visit_date: visit_day(),
        idempotency_key: None,
    }
}

fn correction(customer_code: i64, units: i64, cash: i64, ccte: i64) -> VisitCorrection {
    VisitCorrection {
        agent_code: AGENT,
        zone_code: ZONE,
        customer_code,
        product: ProductCode::A4,
        visit_date: visit_day(),
        units_sold: units,
        cash_collected: cash,
        on_account_collected: ccte,
        empties_returned: 1,
        reason: Some("recount".to_string()),
    }
}

/// Adds a customer with a provisioned A4 line and the given A4 balance.
async fn add_customer(db: &Database, customer_code: i64, balance_a4: i64) {
    db.ledger()
        .create_customer(&NewCustomer {
            customer_code,
            name: format!("Cliente {customer_code}"),
            address: None,
            locality: None,
            phone: None,
            zone_code: ZONE,
            route_sequence: customer_code % 100,
            balance_a3: 0,
            balance_a4,
        })
        .await
        .unwrap();
    db.ledger()
        .provision_line_item(customer_code, ProductCode::A4, AGENT, ZONE)
        .await
        .unwrap();
}

async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn log_for_day(db: &Database) -> Vec<VisitLogEntry> {
    db.visit_log()
        .entries_for_day(AGENT, ZONE, visit_day())
        .await
        .unwrap()
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn test_visit_updates_balance_aggregate_and_log() {
    let db = memory_db().await;
    add_customer(&db, 42, 10).await;

    let outcome = db
        .reconciler()
        .reconcile_visit(&event(42, ProductCode::A4, 5, 3, 2))
        .await
        .unwrap();
    assert!(!outcome.replayed);
    assert_eq!(outcome.receipt.new_balance, 10);

    let customer = db.ledger().get_customer(42).await.unwrap().unwrap();
    assert_eq!(customer.balance_a4, 10);
    assert!(customer.visited);

    let item = db.ledger().get_line_item(42, ProductCode::A4).await.unwrap().unwrap();
    assert_eq!((item.units_sold, item.cash_collected, item.on_account_collected), (5, 3, 2));

    let row = db.settlements().get(&key()).await.unwrap().unwrap();
    assert_eq!((row.units_sold_a4, row.cash_a4, row.on_account_a4), (5, 3, 2));
    assert_eq!((row.units_sold_a3, row.cash_a3, row.on_account_a3), (0, 0, 0));

    let log = log_for_day(&db).await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].id, outcome.receipt.visit_log_id);
    assert_eq!(log[0].prior_balance, 10);
    assert_eq!(log[0].route_order, 42);
}

#[tokio::test]
async fn test_balance_recurrence_with_zero_and_negative_inputs() {
    let db = memory_db().await;
    add_customer(&db, 42, 0).await;

    // Collection with no sale
    let outcome = db
        .reconciler()
        .reconcile_visit(&event(42, ProductCode::A4, 0, 4, 0))
        .await
        .unwrap();
    assert_eq!(outcome.receipt.new_balance, -4);

    // Negative adjustment on units
    let outcome = db
        .reconciler()
        .reconcile_visit(&event(42, ProductCode::A4, -2, 0, 1))
        .await
        .unwrap();
    assert_eq!(outcome.receipt.new_balance, -7);

    // All zero leaves the balance where it was
    let outcome = db
        .reconciler()
        .reconcile_visit(&event(42, ProductCode::A4, 0, 0, 0))
        .await
        .unwrap();
    assert_eq!(outcome.receipt.new_balance, -7);
}

#[tokio::test]
async fn test_missing_line_item_writes_nothing() {
    let db = memory_db().await;
    add_customer(&db, 42, 10).await;

    let err = db
        .reconciler()
        .reconcile_visit(&event(42, ProductCode::A3, 5, 3, 2))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::LineItemNotFound { customer_code: 42, product: ProductCode::A3 })
    ));

    assert!(db.settlements().get(&key()).await.unwrap().is_none());
    assert!(log_for_day(&db).await.is_empty());
    let customer = db.ledger().get_customer(42).await.unwrap().unwrap();
    assert!(!customer.visited);
    assert_eq!(customer.balance_a4, 10);
}

#[tokio::test]
async fn test_overflow_rolls_back_every_step() {
    let db = memory_db().await;
    add_customer(&db, 42, i64::MAX).await;

    let err = db
        .reconciler()
        .reconcile_visit(&event(42, ProductCode::A4, 1, 0, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::ArithmeticOverflow { .. })));

    // Steps 1-3 ran before the failure and must all be undone
    let item = db.ledger().get_line_item(42, ProductCode::A4).await.unwrap().unwrap();
    assert_eq!(item.units_sold, 0);
    assert!(db.settlements().get(&key()).await.unwrap().is_none());
    assert!(log_for_day(&db).await.is_empty());
    let customer = db.ledger().get_customer(42).await.unwrap().unwrap();
    assert!(!customer.visited);
    assert_eq!(customer.balance_a4, i64::MAX);
}

#[tokio::test]
async fn test_aggregate_sums_many_visits() {
    let db = memory_db().await;
    let mut expected = (0, 0, 0);
    for code in 1..=8 {
        add_customer(&db, code, 0).await;
        let (u, c, o) = (code, code / 2, code % 3);
        db.reconciler()
            .reconcile_visit(&event(code, ProductCode::A4, u, c, o))
            .await
            .unwrap();
        expected = (expected.0 + u, expected.1 + c, expected.2 + o);
    }

    let row = db.settlements().get(&key()).await.unwrap().unwrap();
    assert_eq!((row.units_sold_a4, row.cash_a4, row.on_account_a4), expected);
}

// =============================================================================
// Idempotency
// =============================================================================

#[tokio::test]
async fn test_replayed_key_has_no_side_effects() {
    let db = memory_db().await;
    add_customer(&db, 42, 10).await;

    let mut visit = event(42, ProductCode::A4, 5, 1, 0);
    visit.idempotency_key = Some(Uuid::new_v4().to_string());

    let first = db.reconciler().reconcile_visit(&visit).await.unwrap();
    let second = db.reconciler().reconcile_visit(&visit).await.unwrap();

    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(second.receipt.visit_log_id, first.receipt.visit_log_id);
    assert_eq!(second.receipt.new_balance, 14);

    assert_eq!(log_for_day(&db).await.len(), 1);
    let row = db.settlements().get(&key()).await.unwrap().unwrap();
    assert_eq!(row.units_sold_a4, 5);
    let customer = db.ledger().get_customer(42).await.unwrap().unwrap();
    assert_eq!(customer.balance_a4, 14);
}

#[tokio::test]
async fn test_reused_key_for_another_visit_is_rejected() {
    let db = memory_db().await;
    add_customer(&db, 42, 10).await;
    add_customer(&db, 43, 0).await;

    let mut visit = event(42, ProductCode::A4, 5, 1, 0);
    visit.idempotency_key = Some("visit-42-a4".to_string());
    db.reconciler().reconcile_visit(&visit).await.unwrap();

    let mut other = event(43, ProductCode::A4, 7, 0, 0);
    other.idempotency_key = Some("visit-42-a4".to_string());
    let err = db.reconciler().reconcile_visit(&other).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::Validation(ValidationError::InvalidFormat { ref field, .. }))
            if field == "idempotency_key"
    ));

    // Nothing was written for customer 43
    assert_eq!(log_for_day(&db).await.len(), 1);
    let customer = db.ledger().get_customer(43).await.unwrap().unwrap();
    assert_eq!(customer.balance_a4, 0);
    let row = db.settlements().get(&key()).await.unwrap().unwrap();
    assert_eq!(row.units_sold_a4, 5);
}

#[tokio::test]
async fn test_failed_visit_does_not_consume_key() {
    let db = memory_db().await;
    add_customer(&db, 42, 0).await;

    let mut visit = event(42, ProductCode::A3, 5, 0, 0);
    visit.idempotency_key = Some("visit-42-a3".to_string());
    assert!(db.reconciler().reconcile_visit(&visit).await.is_err());

    // Once the line exists the same key goes through for real
    db.ledger()
        .provision_line_item(42, ProductCode::A3, AGENT, ZONE)
        .await
        .unwrap();
    let outcome = db.reconciler().reconcile_visit(&visit).await.unwrap();
    assert!(!outcome.replayed);
    assert_eq!(outcome.receipt.new_balance, 5);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_visits_never_lose_an_update() {
    let path = std::env::temp_dir().join(format!("reparto-{}.db", Uuid::new_v4()));
    let db = Database::new(DbConfig::new(path.clone()).max_connections(4))
        .await
        .unwrap();
    add_customer(&db, 41, 0).await;
    add_customer(&db, 42, 0).await;

    let (a, b) = (db.reconciler(), db.reconciler());
    let first = event(41, ProductCode::A4, 5, 0, 0);
    let second = event(42, ProductCode::A4, 5, 0, 0);
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.reconcile_visit(&first).await }),
        tokio::spawn(async move { b.reconcile_visit(&second).await }),
    );
    ra.unwrap().unwrap();
    rb.unwrap().unwrap();

    let row = db.settlements().get(&key()).await.unwrap().unwrap();
    assert_eq!(row.units_sold_a4, 10);
    assert_eq!(log_for_day(&db).await.len(), 2);

    db.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

// =============================================================================
// Corrections
// =============================================================================

#[tokio::test]
async fn test_correction_keeps_aggregate_equal_to_deduplicated_log() {
    let db = memory_db().await;
    add_customer(&db, 41, 0).await;
    add_customer(&db, 42, 0).await;

    db.reconciler()
        .reconcile_visit(&event(41, ProductCode::A4, 3, 3, 0))
        .await
        .unwrap();
    let visit = db
        .reconciler()
        .reconcile_visit(&event(42, ProductCode::A4, 5, 3, 2))
        .await
        .unwrap();

    let fixed = db
        .reconciler()
        .correct_visit(&correction(42, 6, 2, 2))
        .await
        .unwrap();
    assert_eq!(fixed.replaced_id, visit.receipt.visit_log_id);
    assert_eq!(fixed.delta.units_sold, 1);
    assert_eq!(fixed.delta.cash_collected, -1);
    assert_eq!(fixed.new_balance, 2);
    assert_eq!(fixed.entry.prior_balance, 0);
    assert_eq!(fixed.entry.reason.as_deref(), Some("recount"));

    // A second correction builds on the first
    let again = db
        .reconciler()
        .correct_visit(&correction(42, 4, 2, 2))
        .await
        .unwrap();
    assert_eq!(again.replaced_id, fixed.entry.id);
    assert_eq!(again.new_balance, 0);

    db.visit_log()
        .dedup(Some(DedupScope {
            agent_code: AGENT,
            zone_code: ZONE,
            visit_date: visit_day(),
        }))
        .await
        .unwrap();
    let log = log_for_day(&db).await;
    assert_eq!(log.len(), 2);

    let stored = db.settlements().get(&key()).await.unwrap().unwrap();
    assert_eq!(stored, fold_log(key(), &log).unwrap());
    assert_eq!(stored.units_sold_a4, 7);

    let item = db.ledger().get_line_item(42, ProductCode::A4).await.unwrap().unwrap();
    assert_eq!(item.units_sold, 4);
}

#[tokio::test]
async fn test_correcting_unlogged_visit_writes_nothing() {
    let db = memory_db().await;
    add_customer(&db, 42, 3).await;

    let err = db
        .reconciler()
        .correct_visit(&correction(42, 6, 2, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::VisitNotLogged { .. })));

    let item = db.ledger().get_line_item(42, ProductCode::A4).await.unwrap().unwrap();
    assert_eq!(item.units_sold, 0);
    assert!(db.settlements().get(&key()).await.unwrap().is_none());
    assert_eq!(db.ledger().get_customer(42).await.unwrap().unwrap().balance_a4, 3);
}
