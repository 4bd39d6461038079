//! # Order Repository
//!
//! Writes confirmed orders and everything that must change with them.
//!
//! ## place_order Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   ├── INSERT orders        (TotalBreakdown frozen as columns + JSON)    │
//! │   ├── for each fulfillable line:                                        │
//! │   │     ├── INSERT order_lines                                          │
//! │   │     └── UPDATE inventory ... WHERE stock >= qty   ── 0 rows? ─┐     │
//! │   ├── coupon + signed-in user:                                    │     │
//! │   │     ├── re-count redemptions vs per_user_limit ── reached? ───┤     │
//! │   │     └── INSERT coupon_redemptions                             │     │
//! │   ├── points_used > 0:                                            │     │
//! │   │     └── UPDATE reward_ledgers ... WHERE points >= used ── 0? ─┤     │
//! │  COMMIT                                                           │     │
//! │                                                  ROLLBACK ◄───────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pricing reads are not atomic with this write, so every limit the
//! shopper was quoted against is checked again here.

use bazaar_core::{Money, ReconciledLine, TotalBreakdown};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::coupon::{count_redemptions_on, per_user_limit_on};
use crate::repository::inventory::decrement_stock_on;
use crate::repository::reward::debit_points_on;

// =============================================================================
// Types
// =============================================================================

/// An order ready to be written.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// `None` for guest checkout.
    pub user_id: Option<String>,
    /// Reconciled lines; lines with nothing fulfillable are skipped.
    pub lines: Vec<ReconciledLine>,
    /// The breakdown the shopper confirmed.
    pub breakdown: TotalBreakdown,
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: Option<String>,
    pub status: String,
    pub breakdown: TotalBreakdown,
    pub created_at: DateTime<Utc>,
}

/// A stored order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub line_no: i64,
    pub product_id: String,
    pub size: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: String,
    user_id: Option<String>,
    status: String,
    breakdown_json: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            breakdown: serde_json::from_str(&row.breakdown_json)?,
            id: row.id,
            user_id: row.user_id,
            status: row.status,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderLineRow {
    id: String,
    order_id: String,
    line_no: i64,
    product_id: String,
    size: String,
    unit_price_paise: i64,
    quantity: i64,
    line_total_paise: i64,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            id: row.id,
            order_id: row.order_id,
            line_no: row.line_no,
            product_id: row.product_id,
            size: row.size,
            unit_price: Money::from_paise(row.unit_price_paise),
            quantity: row.quantity,
            line_total: Money::from_paise(row.line_total_paise),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Writes an order and applies its stock, coupon and points effects
    /// atomically.
    ///
    /// ## Errors
    /// - `EmptyOrder` if no line has a fulfillable quantity
    /// - `InsufficientStock` / `InsufficientPoints` / `CouponLimitReached`
    ///   when a concurrent checkout got there first; nothing is written
    pub async fn place_order(&self, order: &NewOrder) -> DbResult<Order> {
        let lines: Vec<&ReconciledLine> = order
            .lines
            .iter()
            .filter(|l| l.fulfillable_quantity > 0)
            .collect();
        if lines.is_empty() {
            return Err(DbError::EmptyOrder);
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let b = &order.breakdown;
        let breakdown_json = serde_json::to_string(b)?;

        debug!(id = %id, lines = lines.len(), payable = %b.payable, "Placing order");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, status,
                subtotal_paise, coupon_code, coupon_discount_paise,
                points_used, points_discount_paise, total_discount_paise,
                delivery_fee_paise, payable_paise, breakdown_json, created_at
            ) VALUES (?1, ?2, 'placed', ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&id)
        .bind(order.user_id.as_deref())
        .bind(b.subtotal.paise())
        .bind(b.coupon_code.as_ref().map(|c| c.as_str()))
        .bind(b.coupon_discount.paise())
        .bind(b.points_used)
        .bind(b.points_discount.paise())
        .bind(b.total_discount.paise())
        .bind(b.delivery_fee.paise())
        .bind(b.payable.paise())
        .bind(&breakdown_json)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (line_no, line) in lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (
                    id, order_id, line_no, product_id, size,
                    unit_price_paise, quantity, line_total_paise
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(line_no as i64)
            .bind(&line.product_id)
            .bind(&line.size)
            .bind(line.unit_price.paise())
            .bind(line.fulfillable_quantity)
            .bind(line.line_total.paise())
            .execute(&mut *tx)
            .await?;

            decrement_stock_on(&mut tx, &line.product_id, &line.size, line.fulfillable_quantity).await?;
        }

        if let (Some(code), Some(user_id)) = (&b.coupon_code, &order.user_id) {
            if let Some(limit) = per_user_limit_on(&mut tx, code).await? {
                let used = count_redemptions_on(&mut tx, user_id, code).await?;
                if used >= limit {
                    warn!(code = %code, user_id = %user_id, used, limit, "Coupon limit reached at order time");
                    return Err(DbError::CouponLimitReached {
                        code: code.to_string(),
                        user_id: user_id.clone(),
                        limit,
                    });
                }
            }

            sqlx::query(
                r#"
                INSERT INTO coupon_redemptions (id, coupon_code, user_id, order_id, redeemed_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(code.as_str())
            .bind(user_id)
            .bind(&id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        if b.points_used > 0 {
            let user_id = order.user_id.as_deref().ok_or_else(|| DbError::InsufficientPoints {
                user_id: "guest".to_string(),
                requested: b.points_used,
            })?;
            debit_points_on(&mut tx, user_id, b.points_used).await?;
        }

        tx.commit().await?;

        info!(id = %id, payable = %b.payable, "Order placed");

        Ok(Order {
            id,
            user_id: order.user_id.clone(),
            status: "placed".to_string(),
            breakdown: b.clone(),
            created_at: now,
        })
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, status, breakdown_json, created_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// Gets the lines of an order in their original order.
    pub async fn get_lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let rows: Vec<OrderLineRow> = sqlx::query_as(
            r#"
            SELECT
                id, order_id, line_no, product_id, size,
                unit_price_paise, quantity, line_total_paise
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderLine::from).collect())
    }

    /// Most recent orders of a user, newest first.
    pub async fn list_for_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, status, breakdown_json, created_at
            FROM orders
            WHERE user_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
