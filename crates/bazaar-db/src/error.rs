//! # Database Errors
//!
//! ```text
//! sqlx::Error ───────────────┐
//!                            ├──► DbError ──► ApiError (bazaar-checkout)
//! guarded UPDATE, 0 rows ────┘
//!   InsufficientStock / InsufficientPoints / CouponLimitReached
//! ```
//!
//! The three guarded-update variants are expected at checkout: they mean
//! another order got there first. Everything else is a real failure.

use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Raised e.g. when a coupon code is inserted twice.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Stock dropped below the order quantity after the quote.
    #[error("Insufficient stock for product {product_id} (size {size}): requested {requested}")]
    InsufficientStock {
        product_id: String,
        size: String,
        requested: i64,
    },

    /// The points balance no longer covers the redemption.
    #[error("Insufficient reward points for user {user_id}: requested {requested}")]
    InsufficientPoints { user_id: String, requested: i64 },

    /// A concurrent order used up the per-user coupon limit.
    #[error("Coupon {code} usage limit ({limit}) reached for user {user_id}")]
    CouponLimitReached {
        code: String,
        user_id: String,
        limit: u32,
    },

    #[error("Order has no fulfillable lines")]
    EmptyOrder,

    /// Refused before any SQL ran.
    #[error("Invalid {entity}: {reason}")]
    Invalid { entity: String, reason: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored value did not convert back into a domain type.
    #[error("Corrupt {entity} row: {reason}")]
    CorruptRow { entity: String, reason: String },

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn invalid(entity: impl Into<String>, reason: impl ToString) -> Self {
        DbError::Invalid {
            entity: entity.into(),
            reason: reason.to_string(),
        }
    }

    pub fn corrupt(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        DbError::CorruptRow {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// A lost race at order time; re-pricing the cart resolves it.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DbError::InsufficientStock { .. }
                | DbError::InsufficientPoints { .. }
                | DbError::CouponLimitReached { .. }
        )
    }
}

/// Constraint failures are told apart by `ErrorKind`; SQLite reports the
/// offending column as `table.column` after a colon in the message.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),

            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => {
                        let field = message
                            .rsplit_once(": ")
                            .map(|(_, column)| column.to_string())
                            .unwrap_or_else(|| "unknown".to_string());
                        DbError::duplicate(field, "unknown")
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    _ => DbError::QueryFailed(message),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),

            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Only the frozen order breakdown is stored as JSON.
impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::corrupt("order breakdown", err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        assert!(DbError::InsufficientStock {
            product_id: "p".into(),
            size: "M".into(),
            requested: 2,
        }
        .is_conflict());
        assert!(DbError::CouponLimitReached {
            code: "FLAT500".into(),
            user_id: "u".into(),
            limit: 1,
        }
        .is_conflict());
        assert!(!DbError::not_found("Order", "x").is_conflict());
        assert!(!DbError::EmptyOrder.is_conflict());
    }

    #[test]
    fn test_pool_errors() {
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::NotFound { .. }
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::PoolExhausted
        ));
    }

    #[test]
    fn test_bad_json_is_corrupt_row() {
        let err = serde_json::from_str::<i64>("nope").unwrap_err();
        assert!(matches!(DbError::from(err), DbError::CorruptRow { .. }));
    }
}
