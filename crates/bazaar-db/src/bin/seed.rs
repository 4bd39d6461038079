//! # Seed Data Generator
//!
//! Populates a database with demo checkout data for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./bazaar_dev.db with the demo catalog
//! cargo run -p bazaar-db --bin seed
//!
//! # Give the demo shopper a custom points balance
//! cargo run -p bazaar-db --bin seed -- --points 1500
//!
//! # Specify database path
//! cargo run -p bazaar-db --bin seed -- --db ./data/bazaar.db
//! ```
//!
//! ## Generated Data
//! - Stock for a small apparel catalog, one row per product + size
//! - Coupons:
//!   - `FLAT500`: ₹500 off carts of ₹2,000 or more, once per user
//!   - `FEST20`: 20% off up to ₹300, no minimum, three times per user
//!   - `OLDSALE`: expired, for trying out rejections
//! - Reward points for the demo shopper
//! - Delivery fee of ₹100

use bazaar_core::{Coupon, CouponCode, DiscountRule, Money};
use bazaar_db::{Database, DbConfig, DbError};
use chrono::{Duration, Utc};
use std::env;

/// Demo shopper that receives the points balance.
const DEMO_USER: &str = "demo-shopper";

/// (product_id, sizes, stock per size)
const CATALOG: &[(&str, &[&str], i64)] = &[
    ("kurta-cotton-01", &["S", "M", "L", "XL"], 12),
    ("kurta-silk-02", &["M", "L"], 3),
    ("saree-banarasi-07", &["Free"], 5),
    ("dupatta-chiffon-03", &["Free"], 40),
    ("jutti-leather-11", &["6", "7", "8", "9"], 2),
    ("sherwani-brocade-04", &["M", "L", "XL"], 1),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut points: i64 = 750;
    let mut db_path = String::from("./bazaar_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--points" | "-p" => {
                if i + 1 < args.len() {
                    points = args[i + 1].parse().unwrap_or(750);
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
                println!("Bazaar Checkout Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --points <N>   Points for the demo shopper (default: 750)");
                println!("  -d, --db <PATH>    Database file path (default: ./bazaar_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Bazaar Checkout Seed Data Generator");
    println!("======================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Inventory (upserts, safe to re-run)
    let mut rows = 0;
    for (product_id, sizes, stock) in CATALOG {
        for size in sizes.iter() {
            db.inventory().set_stock(product_id, size, *stock).await?;
            rows += 1;
        }
    }
    println!("✓ Stocked {} product/size rows", rows);

    // Coupons
    let mut inserted = 0;
    for coupon in demo_coupons() {
        match db.coupons().insert(&coupon).await {
            Ok(()) => inserted += 1,
            Err(DbError::UniqueViolation { .. }) => {
                println!("  Coupon {} already exists, skipping", coupon.code);
            }
            Err(e) => return Err(e.into()),
        }
    }
    println!("✓ Inserted {} coupons", inserted);

    // Points
    if points > 0 {
        let balance = db.rewards().credit(DEMO_USER, points).await?;
        println!("✓ {} now has {} points", DEMO_USER, balance);
    }

    // Delivery fee
    db.settings().set_delivery_fee(Money::from_rupees(100)).await?;
    println!("✓ Delivery fee set to {}", Money::from_rupees(100));

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// The demo coupon set.
fn demo_coupons() -> Vec<Coupon> {
    let now = Utc::now();

    vec![
        Coupon {
            code: CouponCode::normalize("FLAT500"),
            rule: DiscountRule::Flat {
                amount: Money::from_rupees(500),
            },
            min_cart_total: Money::from_rupees(2000),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(90),
            per_user_limit: Some(1),
            is_active: true,
        },
        Coupon {
            code: CouponCode::normalize("FEST20"),
            rule: DiscountRule::Percentage {
                bps: 2000,
                cap: Some(Money::from_rupees(300)),
            },
            min_cart_total: Money::zero(),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(30),
            per_user_limit: Some(3),
            is_active: true,
        },
        Coupon {
            code: CouponCode::normalize("OLDSALE"),
            rule: DiscountRule::Flat {
                amount: Money::from_rupees(200),
            },
            min_cart_total: Money::zero(),
            valid_from: now - Duration::days(60),
            valid_until: now - Duration::days(30),
            per_user_limit: None,
            is_active: true,
        },
    ]
}
