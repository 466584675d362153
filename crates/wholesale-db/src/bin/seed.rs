//! # Seed Data Generator
//!
//! Populates a development database with one purchasing cycle: a window is
//! opened, sale orders arrive on both sides of the cutoff, and most of them
//! are confirmed.
//!
//! ## Usage
//! ```bash
//! # 40 orders (default)
//! cargo run -p wholesale-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p wholesale-db --bin seed -- --orders 200 --db ./data/engine.db
//! ```
//!
//! ## Generated Cycle
//! - Window opened 8 hours ago, closed 2 hours ago by `seed`
//! - Orders spread evenly across the last 8 hours: the early ones are
//!   `regular`, the last quarter `additional`
//! - Every fifth order is left `placed`, the rest are `confirmed`

use chrono::{Duration, FixedOffset, Utc};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wholesale_core::cutoff::{cycle_date, CutoffWindow};
use wholesale_core::{BuyerSnapshot, Money, OrderItem, SaleOrder, SaleOrderStatus};
use wholesale_db::{Database, DbConfig};

/// Demo products: (product id, name, spec, unit price)
const PRODUCTS: &[(&str, &str, &str, i64)] = &[
    ("VEG-001", "Napa Cabbage", "10kg box", 12_000),
    ("VEG-002", "Green Onion", "1kg bundle", 3_500),
    ("VEG-003", "Carrot", "20kg sack", 18_000),
    ("FRT-001", "Fuji Apple", "5kg box", 25_000),
    ("FRT-002", "Mandarin", "10kg box", 30_000),
    ("MEAT-001", "Pork Belly", "1kg pack", 21_000),
];

/// Demo buyers: (name, buyer type)
const BUYERS: &[(&str, &str)] = &[
    ("Corner Mart", "retail"),
    ("Hanok Kitchen", "restaurant"),
    ("Sunrise Cafeteria", "institution"),
    ("Daily Fresh", "retail"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,wholesale=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 40;
    let mut db_path = String::from("./wholesale_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--orders" | "-n" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
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
                println!("Wholesale Cutoff Engine Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --orders <N>   Number of sale orders to generate (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: ./wholesale_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let db = Database::new(DbConfig::new(&db_path)).await?;
    info!(path = %db_path, "Connected to database");

    let existing = db.sale_orders().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has sale orders, skipping seed");
        return Ok(());
    }

    let now = Utc::now();
    let opened_at = now - Duration::hours(8);
    let closed_at = now - Duration::hours(2);
    let utc = FixedOffset::east_opt(0).ok_or("invalid offset")?;

    let window = CutoffWindow::opened(opened_at);
    db.cutoff_windows().insert_open(&window).await?;
    let closed = window.close("seed", closed_at)?;
    db.cutoff_windows().close_current(&closed).await?;
    info!(%opened_at, %closed_at, "Cutoff window seeded");

    let step = Duration::hours(8) / (count.max(1) as i32);
    let mut confirmed = 0;

    for n in 0..count {
        let placed_at = opened_at + step * (n as i32);
        let order = generate_order(n, placed_at, &closed)?;

        let stored = db
            .sale_orders()
            .insert_numbered("SO", cycle_date(placed_at, utc), order)
            .await?;

        if n % 5 != 4 {
            let mut next = stored.clone();
            next.status = stored.status.transition_to(SaleOrderStatus::Confirmed)?;
            next.processed_by = Some("seed".to_string());
            next.processed_at = Some(placed_at);
            db.sale_orders().update_status(&next, stored.version).await?;
            confirmed += 1;
        }
    }

    info!(orders = count, confirmed, "Seed complete");
    Ok(())
}

/// Builds one demo order with two or three lines.
fn generate_order(
    seed: usize,
    placed_at: chrono::DateTime<Utc>,
    window: &CutoffWindow,
) -> Result<SaleOrder, Box<dyn std::error::Error>> {
    let (buyer_name, buyer_type) = BUYERS[seed % BUYERS.len()];
    let lines = 2 + seed % 2;

    let mut items = Vec::with_capacity(lines);
    for k in 0..lines {
        let (id, name, spec, price) = PRODUCTS[(seed + k * 2) % PRODUCTS.len()];
        let quantity = 1 + ((seed * 7 + k * 3) % 12) as i64;
        items.push(OrderItem::new(id, name, spec, quantity, Money::from_minor(price))?);
    }

    Ok(SaleOrder {
        order_number: String::new(),
        buyer: BuyerSnapshot {
            name: buyer_name.to_string(),
            buyer_type: buyer_type.to_string(),
        },
        final_amount: items.iter().map(|i| i.line_total).sum(),
        item_count: items.len() as i64,
        items,
        status: SaleOrderStatus::Placed,
        order_phase: window.classify(placed_at),
        placed_at,
        pended_reason: None,
        rejected_reason: None,
        processed_by: None,
        processed_at: None,
        version: 0,
    })
}
