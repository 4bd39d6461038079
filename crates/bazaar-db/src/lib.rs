//! # bazaar-db: Database Layer for Bazaar Checkout
//!
//! SQLite persistence for the pricing inputs (coupons, stock, reward
//! balances, delivery fee) and for confirmed orders.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Bazaar Checkout Data Flow                          │
//! │                                                                         │
//! │  CheckoutService (bazaar-checkout)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    bazaar-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ CouponRepo     │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InventoryRepo  │   │ 001_initial  │  │   │
//! │  │   │ WAL, FKs on   │    │ RewardRepo     │   │   _schema    │  │   │
//! │  │   │               │    │ OrderRepo      │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (default: platform data dir / bazaar.db)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bazaar_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("bazaar.db")).await?;
//!
//! let coupon = db.coupons().find_by_code(&CouponCode::normalize("flat500")).await?;
//! let stock = db.inventory().snapshot_for(cart.lines()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, DbLocation};

// Repository re-exports for convenience
pub use repository::coupon::CouponRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::order::{NewOrder, Order, OrderLine, OrderRepository};
pub use repository::reward::RewardRepository;
pub use repository::settings::SettingsRepository;
