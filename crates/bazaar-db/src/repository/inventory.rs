//! # Inventory Repository
//!
//! Stock per product + size.
//!
//! Reads produce an [`InventorySnapshot`] for the reconciler. Writes happen
//! only when an order is placed, through a conditional decrement that can
//! never drive stock below zero:
//!
//! ```sql
//! UPDATE inventory SET stock = stock - :qty
//! WHERE product_id = :p AND size = :s AND stock >= :qty
//! ```

use bazaar_core::{CartLine, InventorySnapshot};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// Repository for inventory database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Sets the stock for a product + size, creating the row if needed.
    pub async fn set_stock(&self, product_id: &str, size: &str, stock: i64) -> DbResult<()> {
        debug!(product_id, size, stock, "Setting stock");

        sqlx::query(
            r#"
            INSERT INTO inventory (product_id, size, stock, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (product_id, size) DO UPDATE SET
                stock = excluded.stock,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(product_id)
        .bind(size)
        .bind(stock.max(0))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Current stock, or `None` if the pair has never been stocked.
    pub async fn get_stock(&self, product_id: &str, size: &str) -> DbResult<Option<i64>> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock FROM inventory WHERE product_id = ?1 AND size = ?2")
                .bind(product_id)
                .bind(size)
                .fetch_optional(&self.pool)
                .await?;

        Ok(stock)
    }

    /// Reads stock for the given pairs into a snapshot.
    ///
    /// Pairs with no row are left out, which the reconciler reads as zero
    /// stock. All pairs are read inside one transaction, so a concurrent
    /// order commit is seen either entirely or not at all.
    pub async fn snapshot(&self, pairs: &[(String, String)]) -> DbResult<InventorySnapshot> {
        let mut tx = self.pool.begin().await?;
        let mut snapshot = InventorySnapshot::new();

        for (product_id, size) in pairs {
            let stock: Option<i64> = sqlx::query_scalar(
                "SELECT stock FROM inventory WHERE product_id = ?1 AND size = ?2",
            )
            .bind(product_id)
            .bind(size)
            .fetch_optional(&mut *tx)
            .await?;

            match stock {
                Some(stock) => snapshot.insert(product_id.as_str(), size.as_str(), stock),
                None => warn!(%product_id, %size, "No inventory row; treating as out of stock"),
            }
        }

        tx.commit().await?;

        debug!(requested = pairs.len(), found = snapshot.len(), "Inventory snapshot read");
        Ok(snapshot)
    }

    /// Snapshot covering every line of a cart.
    pub async fn snapshot_for(&self, lines: &[CartLine]) -> DbResult<InventorySnapshot> {
        let pairs: Vec<(String, String)> = lines
            .iter()
            .map(|l| (l.product_id.clone(), l.size.clone()))
            .collect();
        self.snapshot(&pairs).await
    }

    /// Decrements stock by `quantity`, failing if not enough is left.
    pub async fn decrement_stock(&self, product_id: &str, size: &str, quantity: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        decrement_stock_on(&mut conn, product_id, size, quantity).await
    }
}

/// Conditional decrement on an existing connection (used inside the order
/// transaction).
pub(crate) async fn decrement_stock_on(
    conn: &mut SqliteConnection,
    product_id: &str,
    size: &str,
    quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE inventory SET
            stock = stock - ?3,
            updated_at = ?4
        WHERE product_id = ?1 AND size = ?2 AND stock >= ?3
        "#,
    )
    .bind(product_id)
    .bind(size)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(product_id, size, quantity, "Stock decrement refused");
        return Err(DbError::InsufficientStock {
            product_id: product_id.to_string(),
            size: size.to_string(),
            requested: quantity,
        });
    }

    Ok(())
}
