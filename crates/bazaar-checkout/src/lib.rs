//! # bazaar-checkout: Checkout Orchestration
//!
//! Wires the pricing core ([`bazaar_core`]) to persistence ([`bazaar_db`]).
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Storefront handler                                                     │
//! │       │  service.apply_coupon(&mut session, "flat500")                  │
//! │       ▼                                                                 │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │                bazaar-checkout (THIS CRATE)                       │ │
//! │  │                                                                   │ │
//! │  │   CheckoutConfig ──► CheckoutService ──► ApiError                 │ │
//! │  │   (env vars)         (fetch, price,      (code + message          │ │
//! │  │                       persist)            for the UI)             │ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! │       │                              │                                  │
//! │       ▼                              ▼                                  │
//! │  bazaar-core (pure rules)      bazaar-db (SQLite)                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing
//! 2. Load [`CheckoutConfig`] from the environment
//! 3. [`CheckoutService::connect`] opens the database and runs migrations

pub mod config;
pub mod error;
pub mod service;

pub use config::{CheckoutConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use service::CheckoutService;

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `BAZAAR_LOG=debug` - Show debug messages
/// - `BAZAAR_LOG=bazaar_db=trace` - Show trace for the database crate only
/// - Default: `info,bazaar=debug,sqlx=warn`
///
/// Unparsable directives fall back to the default. Calling this twice is
/// harmless; the second call is ignored.
pub fn init_tracing(directives: &str) {
    let filter = EnvFilter::try_new(directives)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
