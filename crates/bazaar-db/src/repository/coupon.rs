//! # Coupon Repository
//!
//! Coupon definitions and per-user redemption counts.
//!
//! ## Storage Shape
//! ```text
//! coupons                         coupon_redemptions
//! ┌──────────┬──────────┐         ┌─────────┬──────────┬──────────┐
//! │ code (PK)│ kind     │ ◄────── │ code    │ user_id  │ order_id │
//! │ FLAT500  │ flat     │         │ FLAT500 │ u-1      │ o-9      │
//! │ FEST20   │ percentage         └─────────┴──────────┴──────────┘
//! └──────────┴──────────┘
//! ```
//!
//! Checkout only reads here; redemptions are written by
//! [`OrderRepository::place_order`](crate::repository::order::OrderRepository::place_order).

use bazaar_core::lookup::UsageHistory;
use bazaar_core::validation::validate_coupon;
use bazaar_core::{Coupon, CouponCode, DiscountKind, DiscountRule, Money};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Raw `coupons` row.
#[derive(Debug, FromRow)]
struct CouponRow {
    code: String,
    kind: DiscountKind,
    amount_paise: Option<i64>,
    percent_bps: Option<i64>,
    cap_paise: Option<i64>,
    min_cart_total_paise: i64,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    per_user_limit: Option<i64>,
    is_active: bool,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = DbError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let rule = match row.kind {
            DiscountKind::Flat => DiscountRule::Flat {
                amount: Money::from_paise(
                    row.amount_paise
                        .ok_or_else(|| DbError::corrupt("coupon", format!("{} has no amount", row.code)))?,
                ),
            },
            DiscountKind::Percentage => {
                let bps = row
                    .percent_bps
                    .ok_or_else(|| DbError::corrupt("coupon", format!("{} has no percentage", row.code)))?;
                DiscountRule::Percentage {
                    bps: u32::try_from(bps)
                        .map_err(|_| DbError::corrupt("coupon", format!("{} percentage out of range", row.code)))?,
                    cap: row.cap_paise.map(Money::from_paise),
                }
            }
        };

        let per_user_limit = row
            .per_user_limit
            .map(|limit| stored_u32(limit, "coupon usage limit"))
            .transpose()?;

        let coupon = Coupon {
            code: CouponCode::normalize(&row.code),
            rule,
            min_cart_total: Money::from_paise(row.min_cart_total_paise),
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            per_user_limit,
            is_active: row.is_active,
        };
        validate_coupon(&coupon).map_err(|e| DbError::corrupt("coupon", format!("{}: {}", row.code, e)))?;
        Ok(coupon)
    }
}

/// Narrows a stored count or limit, refusing values a `u32` cannot hold.
fn stored_u32(value: i64, what: &str) -> DbResult<u32> {
    u32::try_from(value).map_err(|_| DbError::corrupt(what, format!("{} out of range", value)))
}

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Looks up a coupon by normalized code.
    pub async fn find_by_code(&self, code: &CouponCode) -> DbResult<Option<Coupon>> {
        debug!(code = %code, "Looking up coupon");

        let row: Option<CouponRow> = sqlx::query_as(
            r#"
            SELECT
                code, kind, amount_paise, percent_bps, cap_paise,
                min_cart_total_paise, valid_from, valid_until,
                per_user_limit, is_active
            FROM coupons
            WHERE code = ?1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Inserts a coupon definition.
    ///
    /// ## Errors
    /// - `Invalid` if the definition fails [`validate_coupon`]
    /// - `UniqueViolation` if the code already exists
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        validate_coupon(coupon).map_err(|e| DbError::invalid("coupon", e))?;
        debug!(code = %coupon.code, kind = ?coupon.rule.kind(), "Inserting coupon");

        let (amount, bps, cap) = match coupon.rule {
            DiscountRule::Flat { amount } => (Some(amount.paise()), None, None),
            DiscountRule::Percentage { bps, cap } => (None, Some(i64::from(bps)), cap.map(|c| c.paise())),
        };

        sqlx::query(
            r#"
            INSERT INTO coupons (
                code, kind, amount_paise, percent_bps, cap_paise,
                min_cart_total_paise, valid_from, valid_until,
                per_user_limit, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(coupon.code.as_str())
        .bind(coupon.rule.kind())
        .bind(amount)
        .bind(bps)
        .bind(cap)
        .bind(coupon.min_cart_total.paise())
        .bind(coupon.valid_from)
        .bind(coupon.valid_until)
        .bind(coupon.per_user_limit.map(i64::from))
        .bind(coupon.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: coupon.code.to_string(),
            },
            other => other,
        })?;

        Ok(())
    }

    /// Switches a coupon on or off.
    pub async fn set_active(&self, code: &CouponCode, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE coupons SET is_active = ?2 WHERE code = ?1")
            .bind(code.as_str())
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", code.as_str()));
        }
        Ok(())
    }

    /// Number of completed redemptions of `code` by `user_id`.
    pub async fn count_user_redemptions(&self, user_id: &str, code: &CouponCode) -> DbResult<u32> {
        let mut conn = self.pool.acquire().await?;
        count_redemptions_on(&mut conn, user_id, code).await
    }

    /// Loads every redemption count for `user_id` as a core
    /// [`UsageHistory`].
    pub async fn usage_history(&self, user_id: &str) -> DbResult<UsageHistory> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT coupon_code, COUNT(*)
            FROM coupon_redemptions
            WHERE user_id = ?1
            GROUP BY coupon_code
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut history = UsageHistory::new();
        for (code, count) in rows {
            history.set(user_id, &CouponCode::normalize(&code), stored_u32(count, "redemption count")?);
        }
        Ok(history)
    }
}

/// Counts redemptions on an existing connection, so the order transaction
/// can re-check the limit.
pub(crate) async fn count_redemptions_on(
    conn: &mut SqliteConnection,
    user_id: &str,
    code: &CouponCode,
) -> DbResult<u32> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM coupon_redemptions WHERE user_id = ?1 AND coupon_code = ?2",
    )
    .bind(user_id)
    .bind(code.as_str())
    .fetch_one(&mut *conn)
    .await?;

    stored_u32(count, "redemption count")
}

/// Reads a coupon's per-user limit on an existing connection.
pub(crate) async fn per_user_limit_on(
    conn: &mut SqliteConnection,
    code: &CouponCode,
) -> DbResult<Option<u32>> {
    let limit: Option<Option<i64>> =
        sqlx::query_scalar("SELECT per_user_limit FROM coupons WHERE code = ?1")
            .bind(code.as_str())
            .fetch_optional(&mut *conn)
            .await?;

    let limit = limit.ok_or_else(|| DbError::not_found("Coupon", code.as_str()))?;
    limit.map(|l| stored_u32(l, "coupon usage limit")).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use bazaar_core::lookup::UsageLookup;
    use chrono::Duration;

    fn sample(code: &str, rule: DiscountRule) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: CouponCode::normalize(code),
            rule,
            min_cart_total: Money::from_rupees(999),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(30),
            per_user_limit: Some(2),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.coupons();

        let flat = sample("flat500", DiscountRule::Flat { amount: Money::from_rupees(500) });
        let pct = sample(
            "fest20",
            DiscountRule::Percentage {
                bps: 2000,
                cap: Some(Money::from_rupees(300)),
            },
        );
        repo.insert(&flat).await.unwrap();
        repo.insert(&pct).await.unwrap();

        let found = repo
            .find_by_code(&CouponCode::normalize("FLAT500"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.rule, flat.rule);
        assert_eq!(found.per_user_limit, Some(2));
        assert_eq!(found.min_cart_total, Money::from_rupees(999));

        let found = repo
            .find_by_code(&CouponCode::normalize("fest20"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.rule, pct.rule);

        assert!(repo
            .find_by_code(&CouponCode::normalize("NOPE"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coupon = sample("dup", DiscountRule::Flat { amount: Money::from_rupees(10) });

        db.coupons().insert(&coupon).await.unwrap();
        let err = db.coupons().insert(&coupon).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "DUP"));
    }

    #[tokio::test]
    async fn test_invalid_definition_is_refused_before_insert() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let free = sample("zero", DiscountRule::Flat { amount: Money::zero() });
        let err = db.coupons().insert(&free).await.unwrap_err();
        assert!(matches!(err, DbError::Invalid { ref entity, .. } if entity == "coupon"));

        let mut backwards = sample("back", DiscountRule::Flat { amount: Money::from_rupees(10) });
        std::mem::swap(&mut backwards.valid_from, &mut backwards.valid_until);
        assert!(matches!(
            db.coupons().insert(&backwards).await,
            Err(DbError::Invalid { .. })
        ));

        assert!(db.coupons().find_by_code(&free.code).await.unwrap().is_none());
        assert!(db.coupons().find_by_code(&backwards.code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_usage_limit_reads_as_corrupt() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coupon = sample("BIG", DiscountRule::Flat { amount: Money::from_rupees(10) });
        db.coupons().insert(&coupon).await.unwrap();

        sqlx::query("UPDATE coupons SET per_user_limit = 8589934592 WHERE code = 'BIG'")
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.coupons().find_by_code(&coupon.code).await.unwrap_err();
        assert!(matches!(err, DbError::CorruptRow { .. }));

        let mut conn = db.pool().acquire().await.unwrap();
        let err = per_user_limit_on(&mut conn, &coupon.code).await.unwrap_err();
        assert!(matches!(err, DbError::CorruptRow { .. }));
    }

    #[tokio::test]
    async fn test_set_active() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coupon = sample("OFF", DiscountRule::Flat { amount: Money::from_rupees(10) });
        db.coupons().insert(&coupon).await.unwrap();

        db.coupons().set_active(&coupon.code, false).await.unwrap();
        let found = db.coupons().find_by_code(&coupon.code).await.unwrap().unwrap();
        assert!(!found.is_active);

        assert!(db
            .coupons()
            .set_active(&CouponCode::normalize("missing"), true)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_redemption_counts_start_at_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let code = CouponCode::normalize("FLAT500");

        assert_eq!(db.coupons().count_user_redemptions("u-1", &code).await.unwrap(), 0);

        let history = db.coupons().usage_history("u-1").await.unwrap();
        assert_eq!(history.redemptions("u-1", &code), 0);
    }
}
