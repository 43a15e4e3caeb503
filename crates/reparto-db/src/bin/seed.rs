//! # Seed Data Generator
//!
//! Provisions a demo route for development: one agent, two zones, a
//! handful of customers per zone with line items for both products, a price
//! list, expense categories and a stock baseline dated yesterday.
//!
//! ## Usage
//! ```bash
//! # Default: ./reparto_dev.db, 12 customers per zone
//! cargo run -p reparto-db --bin seed
//!
//! # Custom size and path
//! cargo run -p reparto-db --bin seed -- --customers 40 --db ./data/reparto.db
//! ```
//!
//! The demo agent logs in as `demo` / `demo`.

use chrono::{Duration, Utc};
use reparto_core::{NewCustomer, ProductCode, StockLevel};
use reparto_db::{Database, DbConfig};
use std::env;

const DEMO_AGENT_CODE: i64 = 1;
const DEMO_ZONES: &[i64] = &[7, 8];

const STREETS: &[&str] = &[
    "San Martin",
    "Belgrano",
    "Rivadavia",
    "Moreno",
    "Sarmiento",
    "Mitre",
    "Lavalle",
    "Urquiza",
];

const BUSINESSES: &[&str] = &[
    "Almacen",
    "Kiosco",
    "Despensa",
    "Panaderia",
    "Taller",
    "Oficina",
    "Club",
    "Farmacia",
];

const EXPENSE_CATEGORIES: &[(i64, &str)] = &[
    (1, "Combustible"),
    (2, "Peajes"),
    (3, "Mantenimiento"),
    (4, "Viaticos"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut per_zone: i64 = 12;
    let mut db_path = String::from("./reparto_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--customers" | "-c" => {
                if i + 1 < args.len() {
                    per_zone = args[i + 1].parse().unwrap_or(12);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Reparto Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --customers <N>  Customers per zone (default: 12)");
                println!("  -d, --db <PATH>      Database file path (default: ./reparto_dev.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Reparto Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!("Customers per zone: {}", per_zone);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.agents().get(DEMO_AGENT_CODE).await?.is_some() {
        println!("⚠ Demo agent already exists");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    db.agents().create(DEMO_AGENT_CODE, "demo", "demo").await?;
    for zone in DEMO_ZONES {
        db.agents().assign_zone(DEMO_AGENT_CODE, *zone).await?;
    }
    println!("✓ Agent 'demo' serving zones {:?}", DEMO_ZONES);

    let mut created = 0;
    for (zone_idx, zone) in DEMO_ZONES.iter().enumerate() {
        for seq in 1..=per_zone {
            let seed = zone_idx as i64 * 1000 + seq;
            let customer = demo_customer(*zone, seq, seed);

            if let Err(e) = db.ledger().create_customer(&customer).await {
                eprintln!("Failed to insert customer {}: {}", customer.customer_code, e);
                continue;
            }
            for product in ProductCode::ALL {
                db.ledger()
                    .provision_line_item(customer.customer_code, product, DEMO_AGENT_CODE, *zone)
                    .await?;
            }
            created += 1;
        }
    }
    println!("✓ {} customers with A3/A4 line items", created);

    db.prices().set_price(ProductCode::A3, 95_000).await?;
    db.prices().set_price(ProductCode::A4, 120_000).await?;
    println!("✓ Price list");

    for (code, description) in EXPENSE_CATEGORIES {
        db.expenses().create_category(*code, description).await?;
    }
    println!("✓ {} expense categories", EXPENSE_CATEGORIES.len());

    let yesterday = (Utc::now() - Duration::days(1)).date_naive();
    db.stock()
        .insert_level(&StockLevel {
            stock_date: yesterday,
            caps: 2_000,
            bottles_a4: 400,
            bottles_a3: 250,
            bases: 120,
        })
        .await?;
    println!("✓ Stock baseline for {}", yesterday);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds a customer with deterministic, plausible data.
fn demo_customer(zone_code: i64, route_sequence: i64, seed: i64) -> NewCustomer {
    let idx = seed as usize;
    let business = BUSINESSES[idx % BUSINESSES.len()];
    let street = STREETS[(idx / 3) % STREETS.len()];

    NewCustomer {
        customer_code: zone_code * 1000 + route_sequence,
        name: format!("{} {}", business, street),
        address: Some(format!("{} {}", street, 100 + (seed * 37) % 1900)),
        locality: Some("Rafaela".to_string()),
        phone: Some(format!("3492-{:06}", 400_000 + (seed * 7919) % 99_999)),
        zone_code,
        route_sequence,
        // A few customers start owing bottles
        balance_a3: seed % 3,
        balance_a4: (seed * 5) % 7,
    }
}
