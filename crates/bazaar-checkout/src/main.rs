//! # Bazaar Checkout CLI
//!
//! Prices a cart from the command line against the configured database.
//! Handy for checking coupon and points setups after running `seed`.
//!
//! ## Usage
//! ```bash
//! # Quote a cart for the demo shopper with a coupon and max points
//! cargo run -p bazaar-checkout -- \
//!     --user demo-shopper \
//!     --line saree-banarasi-07:Free:2500:1 \
//!     --coupon flat500 --points max
//!
//! # Same cart, and place the order
//! cargo run -p bazaar-checkout -- --user demo-shopper \
//!     --line saree-banarasi-07:Free:2500:1 --order
//! ```
//!
//! `--line` is `product:size:unit_price_rupees:quantity` and may repeat.
//! The quote (or placed order) is printed as JSON.

use std::env;

use bazaar_checkout::{init_tracing, CheckoutConfig, CheckoutService};
use bazaar_core::{CheckoutSession, Money};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CheckoutConfig::from_env()?;
    init_tracing(&config.log_filter);

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut user: Option<String> = None;
    let mut lines: Vec<String> = Vec::new();
    let mut coupon: Option<String> = None;
    let mut points: Option<String> = None;
    let mut place = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--user" | "-u" if i + 1 < args.len() => {
                user = Some(args[i + 1].clone());
                i += 1;
            }
            "--line" | "-l" if i + 1 < args.len() => {
                lines.push(args[i + 1].clone());
                i += 1;
            }
            "--coupon" | "-c" if i + 1 < args.len() => {
                coupon = Some(args[i + 1].clone());
                i += 1;
            }
            "--points" | "-p" if i + 1 < args.len() => {
                points = Some(args[i + 1].clone());
                i += 1;
            }
            "--order" => place = true,
            "--help" | "-h" => {
                println!("Bazaar Checkout");
                println!();
                println!("Usage: bazaar-checkout [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -u, --user <ID>        Shopper id (omit for guest checkout)");
                println!("  -l, --line <P:S:R:Q>   Cart line: product:size:price_rupees:qty");
                println!("  -c, --coupon <CODE>    Coupon code to apply");
                println!("  -p, --points <N|max>   Reward points to redeem");
                println!("      --order            Place the order after pricing");
                println!("  -h, --help             Show this help message");
                println!();
                println!("Environment: BAZAAR_DB_PATH, BAZAAR_DELIVERY_FEE, BAZAAR_LOG");
                return Ok(());
            }
            other => return Err(format!("Unknown argument: {}", other).into()),
        }
        i += 1;
    }

    let service = CheckoutService::connect(&config).await?;

    let mut session = CheckoutSession::new(user);
    for raw in &lines {
        let (product_id, size, price, qty) = parse_line(raw)?;
        session.cart_mut().add_line(&product_id, &size, price, qty)?;
    }

    if let Some(code) = coupon {
        let result = service.apply_coupon(&mut session, &code).await?;
        println!("{}", result.message);
    }

    match points.as_deref() {
        Some("max") => match service.use_max_points(&mut session).await? {
            Some(applied) => println!("Redeemed {} points", applied.points_used),
            None => println!("No points to redeem"),
        },
        Some(n) => {
            let requested: i64 = n.parse().map_err(|_| format!("Invalid points: {}", n))?;
            service.apply_points(&mut session, requested).await?;
        }
        None => {}
    }

    if place {
        let order = service.place_order(&mut session).await?;
        info!(order_id = %order.id, "Order placed from CLI");
        println!("{}", serde_json::to_string_pretty(&order)?);
    } else {
        let quote = service.quote(&mut session).await?;
        println!("{}", serde_json::to_string_pretty(&quote)?);
        println!("Payable: {}", config.format_amount(quote.breakdown.payable));
    }

    Ok(())
}

/// Parses `product:size:unit_price_rupees:quantity`.
fn parse_line(raw: &str) -> Result<(String, String, Money, i64), String> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [product_id, size, price, qty] = parts.as_slice() else {
        return Err(format!("Expected product:size:price:qty, got {}", raw));
    };

    let price: i64 = price
        .parse()
        .map_err(|_| format!("Invalid price in {}", raw))?;
    let price = Money::checked_from_rupees(price)
        .ok_or_else(|| format!("Price too large in {}", raw))?;
    let qty: i64 = qty
        .parse()
        .map_err(|_| format!("Invalid quantity in {}", raw))?;

    Ok((product_id.to_string(), size.to_string(), price, qty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let (product, size, price, qty) = parse_line("kurta-01:M:799:2").unwrap();
        assert_eq!((product.as_str(), size.as_str(), qty), ("kurta-01", "M", 2));
        assert_eq!(price, Money::from_rupees(799));

        assert!(parse_line("kurta-01:M:799").is_err());
        assert!(parse_line(&format!("kurta-01:M:{}:1", i64::MAX / 10)).is_err());
    }
}
