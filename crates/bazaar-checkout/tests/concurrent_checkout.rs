//! Shoppers racing for the last unit of stock.
//!
//! These run against a real database file with several pooled
//! connections, so orders can overlap instead of queueing on one
//! connection.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use bazaar_checkout::{CheckoutService, ErrorCode};
use bazaar_core::{CheckoutSession, Money};
use bazaar_db::{Database, DbConfig};

const POOL_SIZE: u32 = 4;

/// A database file under the temp dir, removed with its WAL files on drop.
struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new(name: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "bazaar-{}-{}-{}.db",
            name,
            std::process::id(),
            nanos
        ));
        TempDb { path }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

async fn service_with_last_kurta(file: &TempDb) -> CheckoutService {
    let config = DbConfig::new(&file.path).pool_size(POOL_SIZE);
    let db = Database::new(config).await.unwrap();
    db.inventory().set_stock("kurta-silk-02", "L", 1).await.unwrap();
    CheckoutService::new(db).with_delivery_fee(Money::from_rupees(100))
}

fn shopper(id: &str) -> CheckoutSession {
    let mut session = CheckoutSession::new(Some(id.to_string()));
    session
        .cart_mut()
        .add_line("kurta-silk-02", "L", Money::from_rupees(1800), 1)
        .unwrap();
    session
}

#[tokio::test]
async fn test_second_buyer_loses_the_last_unit() {
    let file = TempDb::new("last-unit");
    let service = service_with_last_kurta(&file).await;
    let mut first = shopper("asha");
    let mut second = shopper("ravi");

    // Both see it in stock.
    assert!(!service.quote(&mut first).await.unwrap().has_shortfall);
    assert!(!service.quote(&mut second).await.unwrap().has_shortfall);

    let order = service.place_order(&mut first).await.unwrap();
    assert_eq!(order.breakdown.payable, Money::from_rupees(1900));

    // Re-pricing now finds nothing fulfillable, so the order is empty.
    let err = service.place_order(&mut second).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::EmptyCart);

    let quote = service.quote(&mut second).await.unwrap();
    assert!(quote.has_shortfall);
    assert_eq!(quote.breakdown.subtotal, Money::zero());
    assert_eq!(quote.breakdown.payable, Money::from_rupees(100));

    service.database().close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_orders_never_oversell() {
    let file = TempDb::new("parallel");
    let service = service_with_last_kurta(&file).await;

    let shoppers = ["asha", "ravi", "meera", "kabir", "zoya", "dev"];
    let handles: Vec<_> = shoppers
        .iter()
        .map(|id| {
            let service = service.clone();
            let id = id.to_string();
            tokio::spawn(async move {
                let mut session = shopper(&id);
                service.place_order(&mut session).await
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    let placed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 1);

    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(err.code, ErrorCode::Conflict | ErrorCode::EmptyCart),
            "unexpected failure: {}",
            err
        );
    }

    let stock = service
        .database()
        .inventory()
        .get_stock("kurta-silk-02", "L")
        .await
        .unwrap();
    assert_eq!(stock, Some(0));

    service.database().close().await;
}
