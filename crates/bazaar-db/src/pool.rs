//! # Database Pool Management
//!
//! Opens the SQLite file checkout runs on and hands out repositories.
//!
//! ## Readers and Writers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   quote / apply_coupon / apply_points        place_order                │
//! │   (many, short reads)                        (one write transaction)    │
//! │          │   │   │                                  │                   │
//! │          ▼   ▼   ▼                                  ▼                   │
//! │   ┌──────────────────────── SqlitePool ───────────────────────────┐    │
//! │   │  conn  conn  conn  conn  conn        (pool_size, default 5)   │    │
//! │   └────────────────────────────────────────────────────────────────┘    │
//! │          │                                          │                   │
//! │          ▼                                          ▼                   │
//! │   WAL: readers see the last commit      busy_timeout: a second writer   │
//! │   while an order is being written       waits instead of failing        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tests use [`DbConfig::in_memory`], a private database that lives as long
//! as its single pooled connection.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::coupon::CouponRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::order::OrderRepository;
use crate::repository::reward::RewardRepository;
use crate::repository::settings::SettingsRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    /// A file on disk, created on first use.
    File(PathBuf),
    /// A private in-memory database.
    Memory,
}

/// Database configuration.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/bazaar/bazaar.db")
///     .pool_size(8)
///     .busy_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub location: DbLocation,

    /// Maximum pooled connections. Default: 5
    pub pool_size: u32,

    /// How long a caller waits for a free connection. Default: 30 seconds
    pub acquire_timeout: Duration,

    /// How long a writer waits on SQLite's lock. Default: 5 seconds
    pub busy_timeout: Duration,

    /// Apply pending migrations when connecting. Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed configuration.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            location: DbLocation::File(path.into()),
            pool_size: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// In-memory configuration for tests.
    ///
    /// Pinned to one connection: each new SQLite connection to `:memory:`
    /// would open a different, empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            location: DbLocation::Memory,
            pool_size: 1,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(1),
            run_migrations: true,
        }
    }

    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size.max(1);
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.location == DbLocation::Memory
    }

    /// Human-readable location for logs.
    pub fn describe(&self) -> String {
        match &self.location {
            DbLocation::File(path) => path.display().to_string(),
            DbLocation::Memory => ":memory:".to_string(),
        }
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let (options, journal) = match &self.location {
            DbLocation::File(path) => (
                SqliteConnectOptions::new().filename(path).create_if_missing(true),
                SqliteJournalMode::Wal,
            ),
            DbLocation::Memory => (
                SqliteConnectOptions::from_str("sqlite::memory:")
                    .map_err(|e| DbError::ConnectionFailed(e.to_string()))?,
                SqliteJournalMode::Memory,
            ),
        };

        Ok(options
            .journal_mode(journal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.busy_timeout)
            // Off by default in SQLite; order lines and redemptions rely on them
            .foreign_keys(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Database handle. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and applies migrations unless disabled.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(location = %config.describe(), "Opening checkout database");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.acquire_timeout);
        if config.is_in_memory() {
            // Closing the only connection would drop the data.
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(pool_size = config.pool_size, "Pool ready");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Applies pending migrations.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool, for callers that need their own queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn coupons(&self) -> CouponRepository {
        CouponRepository::new(self.pool.clone())
    }

    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone())
    }

    pub fn rewards(&self) -> RewardRepository {
        RewardRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    /// Closes the pool. Repository calls fail afterwards.
    pub async fn close(&self) {
        info!("Closing checkout database");
        self.pool.close().await;
    }

    /// Whether the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
