//! # Reward Points Repository
//!
//! Point balances per user. Checkout reads balances to price redemptions;
//! the balance is debited only when the order is written.

use bazaar_core::validation::{validate_points, validate_user_id};
use bazaar_core::RewardPointsLedger;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// Repository for reward ledger operations.
#[derive(Debug, Clone)]
pub struct RewardRepository {
    pool: SqlitePool,
}

impl RewardRepository {
    /// Creates a new RewardRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RewardRepository { pool }
    }

    /// Redeemable balance; zero for users with no ledger yet.
    pub async fn available_points(&self, user_id: &str) -> DbResult<i64> {
        let points: Option<i64> =
            sqlx::query_scalar("SELECT available_points FROM reward_ledgers WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let points = points.unwrap_or(0);
        validate_points(points).map_err(|e| DbError::corrupt("reward ledger", format!("{}: {}", user_id, e)))?;
        Ok(points)
    }

    /// Balance as a core ledger value.
    pub async fn ledger(&self, user_id: &str) -> DbResult<RewardPointsLedger> {
        Ok(RewardPointsLedger {
            user_id: user_id.to_string(),
            available_points: self.available_points(user_id).await?,
        })
    }

    /// Adds points, creating the ledger if needed.
    ///
    /// ## Errors
    /// - `Invalid` for a malformed user id or a non-positive amount
    pub async fn credit(&self, user_id: &str, points: i64) -> DbResult<i64> {
        validate_user_id(user_id).map_err(|e| DbError::invalid("reward credit", e))?;
        if points <= 0 {
            return Err(DbError::invalid(
                "reward credit",
                format!("credit must be positive, got {}", points),
            ));
        }

        debug!(user_id, points, "Crediting reward points");

        sqlx::query(
            r#"
            INSERT INTO reward_ledgers (user_id, available_points, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id) DO UPDATE SET
                available_points = available_points + excluded.available_points,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(points)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.available_points(user_id).await
    }

    /// Removes points if the balance covers them.
    pub async fn debit(&self, user_id: &str, points: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        debit_points_on(&mut conn, user_id, points).await
    }
}

/// Conditional debit on an existing connection (used inside the order
/// transaction).
pub(crate) async fn debit_points_on(
    conn: &mut SqliteConnection,
    user_id: &str,
    points: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE reward_ledgers SET
            available_points = available_points - ?2,
            updated_at = ?3
        WHERE user_id = ?1 AND available_points >= ?2
        "#,
    )
    .bind(user_id)
    .bind(points)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(user_id, points, "Points debit refused");
        return Err(DbError::InsufficientPoints {
            user_id: user_id.to_string(),
            requested: points,
        });
    }

    Ok(())
}
