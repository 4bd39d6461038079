//! Checkout configuration.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults.
//!
//! | Variable              | Default                              |
//! |-----------------------|--------------------------------------|
//! | `BAZAAR_DB_PATH`      | platform data dir / `bazaar.db`      |
//! | `BAZAAR_DELIVERY_FEE` | unset: use the stored setting        |
//! | `BAZAAR_CURRENCY`     | `₹`                                  |
//! | `BAZAAR_LOG`          | `info,bazaar=debug,sqlx=warn`        |

use std::env;
use std::path::PathBuf;

use bazaar_core::Money;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "info,bazaar=debug,sqlx=warn";

/// Checkout configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Delivery fee override; `None` reads the fee from the settings table
    pub delivery_fee: Option<Money>,

    /// Symbol shown next to amounts
    pub currency_symbol: String,

    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_path = match lookup("BAZAAR_DB_PATH") {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_database_path()?,
        };

        let delivery_fee = match lookup("BAZAAR_DELIVERY_FEE") {
            Some(raw) => Some(
                parse_rupees(&raw)
                    .ok_or_else(|| ConfigError::InvalidValue("BAZAAR_DELIVERY_FEE".to_string()))?,
            ),
            None => None,
        };

        Ok(CheckoutConfig {
            database_path,
            delivery_fee,
            currency_symbol: lookup("BAZAAR_CURRENCY").unwrap_or_else(|| "₹".to_string()),
            log_filter: lookup("BAZAAR_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }

    /// Formats an amount with the configured symbol.
    pub fn format_amount(&self, amount: Money) -> String {
        let sign = if amount.is_negative() { "-" } else { "" };
        let abs = amount.abs();
        format!(
            "{}{}{}.{:02}",
            sign,
            self.currency_symbol,
            abs.rupees(),
            abs.paise_part()
        )
    }
}

/// Platform data directory path for the database.
///
/// - **macOS**: `~/Library/Application Support/com.bazaar.checkout/bazaar.db`
/// - **Linux**: `~/.local/share/checkout/bazaar.db`
fn default_database_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("com", "bazaar", "checkout").ok_or(ConfigError::NoDataDir)?;
    Ok(dirs.data_dir().join("bazaar.db"))
}

/// Parses "100", "49.5" or "49.50" into an amount. Negative and
/// sub-paisa values are refused.
fn parse_rupees(raw: &str) -> Option<Money> {
    let raw = raw.trim();
    let (rupees, paise) = match raw.split_once('.') {
        Some((r, p)) => (r, p),
        None => (raw, ""),
    };

    if rupees.is_empty() || !rupees.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if paise.len() > 2 || !paise.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let rupees: i64 = rupees.parse().ok()?;
    let paise: i64 = match paise.len() {
        0 => 0,
        1 => paise.parse::<i64>().ok()? * 10,
        _ => paise.parse().ok()?,
    };

    Some(Money::from_major_minor(rupees, paise))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),

    #[error("Could not determine app data directory")]
    NoDataDir,
}
