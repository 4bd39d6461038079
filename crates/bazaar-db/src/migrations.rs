//! # Database Migrations
//!
//! The schema ships inside the binary; files under `migrations/sqlite/`
//! at the workspace root are compiled in by `sqlx::migrate!`.
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   coupons, inventory, reward_ledgers,
//!                              orders, order_lines, coupon_redemptions,
//!                              settings
//! ```
//!
//! New schema changes go in a new numbered file. Applied files are
//! checksummed by sqlx, so editing one breaks existing databases.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations. Safe to call repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(known = MIGRATOR.migrations.len(), "Applying migrations");
    MIGRATOR.run(pool).await?;
    info!("Schema up to date");
    Ok(())
}

/// `(known, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let known = MIGRATOR.migrations.len();

    // The bookkeeping table only exists after the first run.
    let applied: Option<i64> =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .ok();

    let applied = usize::try_from(applied.unwrap_or(0))
        .map_err(|_| DbError::corrupt("migration history", "negative applied count"))?;
    Ok((known, applied))
}
