//! Reports and stock rollforward over reconciled visits.

use chrono::NaiveDate;
use reparto_core::{Money, NewCustomer, ProductCode, StockLevel, VisitEvent};
use reparto_db::{Database, DbConfig};

const AGENT: i64 = 3;
const ZONE: i64 = 9;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
}

async fn route(db: &Database, customers: &[(i64, i64)]) {
    for (code, seq) in customers {
        db.ledger()
            .create_customer(&NewCustomer {
                customer_code: *code,
                name: format!("Cliente {code}"),
                address: None,
                locality: None,
                phone: None,
                zone_code: ZONE,
                route_sequence: *seq,
                balance_a3: 0,
                balance_a4: 0,
            })
            .await
            .unwrap();
        for product in ProductCode::ALL {
            db.ledger()
                .provision_line_item(*code, product, AGENT, ZONE)
                .await
                .unwrap();
        }
    }
}

async fn visit(db: &Database, customer_code: i64, product: ProductCode, date: NaiveDate, u: i64, c: i64, o: i64) {
    db.reconciler()
        .reconcile_visit(&VisitEvent {
            customer_code,
            product,
            units_sold: u,
            cash_collected: c,
            on_account_collected: o,
            agent_code: AGENT,
            zone_code: ZONE,
            empties_returned: 0,
            reason: None,
            visit_date: date,
            idempotency_key: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_day_results_balance_against_log() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    route(&db, &[(10, 1), (20, 2)]).await;

    visit(&db, 10, ProductCode::A4, day(5), 4, 4, 0).await;
    visit(&db, 20, ProductCode::A3, day(5), 2, 0, 2).await;
    visit(&db, 20, ProductCode::A4, day(6), 9, 9, 0).await;

    let results = db.reports().day_results(AGENT, ZONE, day(5)).await.unwrap();
    assert!(results.in_balance);
    assert_eq!(results.visits, 2);
    assert_eq!(results.settlement.units_sold_a4, 4);
    assert_eq!(results.settlement.on_account_a3, 2);

    let empty = db.reports().day_results(AGENT, ZONE, day(7)).await.unwrap();
    assert!(empty.in_balance);
    assert_eq!(empty.visits, 0);
}

#[tokio::test]
async fn test_day_movements_follow_route_order() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    route(&db, &[(10, 3), (20, 1), (30, 2)]).await;

    visit(&db, 10, ProductCode::A4, day(5), 1, 1, 0).await;
    visit(&db, 20, ProductCode::A4, day(5), 2, 2, 0).await;
    visit(&db, 20, ProductCode::A3, day(5), 1, 0, 0).await;

    let grouped = db.reports().day_movements(AGENT, ZONE, day(5)).await.unwrap();
    let codes: Vec<i64> = grouped.iter().map(|g| g.customer.customer_code).collect();
    assert_eq!(codes, vec![20, 10]);
    assert_eq!(grouped[0].movements.len(), 2);
    assert!(grouped[0].movements[0].id < grouped[0].movements[1].id);
}

#[tokio::test]
async fn test_monthly_summary_prices_collections() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    route(&db, &[(10, 1)]).await;
    db.prices().set_price(ProductCode::A4, 1_000).await.unwrap();
    db.prices().set_price(ProductCode::A3, 500).await.unwrap();

    visit(&db, 10, ProductCode::A4, day(5), 3, 2, 1).await;
    visit(&db, 10, ProductCode::A3, day(12), 4, 4, 0).await;
    // Outside the month
    visit(&db, 10, ProductCode::A4, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), 5, 5, 0).await;

    let summary = db.reports().monthly_summary(AGENT, 2025, 5).await.unwrap();
    assert_eq!(summary.rows.len(), 2);
    assert_eq!(summary.rows[0].settlement_date, day(5));
    assert_eq!(summary.rows[0].cash_a4, Money::from_cents(2_000));
    assert_eq!(summary.rows[0].on_account_a4, Money::from_cents(1_000));
    assert_eq!(summary.rows[1].cash_a3, Money::from_cents(2_000));
    assert_eq!(summary.totals.grand_total, Money::from_cents(5_000));

    assert!(db.reports().monthly_summary(AGENT, 2025, 13).await.is_err());
}

#[tokio::test]
async fn test_rollforward_after_a_route_day() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    route(&db, &[(10, 1), (20, 2)]).await;
    db.stock()
        .insert_level(&StockLevel {
            stock_date: day(2),
            caps: 300,
            bottles_a4: 90,
            bottles_a3: 60,
            bases: 20,
        })
        .await
        .unwrap();

    visit(&db, 10, ProductCode::A4, day(5), 6, 6, 0).await;
    visit(&db, 20, ProductCode::A3, day(5), 4, 0, 4).await;

    let rolled = db.stock().rollforward(day(5), AGENT, ZONE).await.unwrap();
    assert!(rolled.created);
    assert_eq!(rolled.stock.caps, 290);

    let again = db.stock().rollforward(day(5), AGENT, ZONE).await.unwrap();
    assert!(!again.created);
    assert!(!again.applied);
    assert_eq!(again.stock.caps, 290);
}
