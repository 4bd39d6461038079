//! # Checkout Errors
//!
//! Every service call returns [`ApiResult`]. Lower layers keep their own
//! error enums; they are folded into one serializable shape here.
//!
//! ```text
//!   CoreError ─────────┐   InvalidPointsRequest ─► INVALID_POINTS
//!                      │   InvalidQuantity      ─► VALIDATION_ERROR
//!   CouponRejection ───┼─► COUPON_REJECTED  + reason "COUPON_EXPIRED", ...
//!                      │
//!   DbError ───────────┘   InsufficientStock    ─► CONFLICT + "INSUFFICIENT_STOCK"
//!                          EmptyOrder           ─► EMPTY_CART
//!                          QueryFailed, ...     ─► DATABASE_ERROR (details logged)
//! ```
//!
//! Coupon rejections normally travel as a `CouponResult` rather than an
//! error; the conversion below exists for callers that want `?`.

use bazaar_core::{CoreError, CouponRejection};
use bazaar_db::DbError;
use serde::Serialize;

/// What the storefront receives when a checkout call fails.
///
/// ```json
/// {
///   "code": "COUPON_REJECTED",
///   "message": "Coupon FLAT500 expired on 31 Mar 2026",
///   "reason": "COUPON_EXPIRED"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: ErrorCode,

    /// Shown to the shopper as is.
    pub message: String,

    /// Which rule failed, when `code` alone is too coarse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    /// Storage failed; the message is generic and the cause is logged.
    DatabaseError,
    Internal,
    /// Cart is full or the line is not in it.
    CartError,
    CouponRejected,
    InvalidPoints,
    /// Stock, points or coupon usage changed since the quote. Re-quote.
    Conflict,
    /// Nothing left to order.
    EmptyCart,
    ConfigError,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    fn storage(message: &str) -> Self {
        ApiError::new(ErrorCode::DatabaseError, message)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ApiError::new(ErrorCode::NotFound, format!("No {} with id {}", entity, id))
            }
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} {} is already taken", field, value),
            ),
            DbError::InsufficientStock {
                product_id,
                size,
                requested,
            } => ApiError::new(
                ErrorCode::Conflict,
                format!(
                    "Only part of {} (size {}) is still in stock; {} could not be reserved",
                    product_id, size, requested
                ),
            )
            .with_reason("INSUFFICIENT_STOCK"),
            DbError::InsufficientPoints { requested, .. } => ApiError::new(
                ErrorCode::Conflict,
                format!("Your points balance no longer covers {} points", requested),
            )
            .with_reason("INSUFFICIENT_POINTS"),
            DbError::CouponLimitReached { code, limit, .. } => ApiError::new(
                ErrorCode::Conflict,
                format!("Coupon {} can only be used {} time(s) per customer", code, limit),
            )
            .with_reason("COUPON_USAGE_LIMIT_EXCEEDED"),
            DbError::Invalid { entity, reason } => {
                ApiError::new(ErrorCode::ValidationError, format!("Invalid {}: {}", entity, reason))
            }
            DbError::EmptyOrder => {
                ApiError::new(ErrorCode::EmptyCart, "Nothing in the cart is in stock")
            }
            DbError::ConnectionFailed(cause) | DbError::MigrationFailed(cause) => {
                tracing::error!(%cause, "Checkout database unavailable");
                ApiError::storage("Checkout is temporarily unavailable")
            }
            DbError::PoolExhausted => {
                tracing::warn!("All database connections busy");
                ApiError::storage("Checkout is busy, please retry")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!(%message, "Order references a missing row");
                ApiError::new(ErrorCode::ValidationError, "Order references unknown data")
            }
            DbError::CorruptRow { entity, reason } => {
                tracing::error!(%entity, %reason, "Corrupt row");
                ApiError::storage("Stored data could not be read")
            }
            DbError::QueryFailed(cause) | DbError::Internal(cause) => {
                tracing::error!(%cause, "Checkout query failed");
                ApiError::storage("Checkout could not be saved")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidQuantity { .. } | CoreError::QuantityTooLarge { .. } => {
                ApiError::new(ErrorCode::ValidationError, err.to_string())
            }
            CoreError::InvalidPointsRequest { .. } => {
                ApiError::new(ErrorCode::InvalidPoints, err.to_string())
            }
            CoreError::CartTooLarge { .. } | CoreError::LineNotInCart { .. } => {
                ApiError::new(ErrorCode::CartError, err.to_string())
            }
            CoreError::Validation(e) => ApiError::new(ErrorCode::ValidationError, e.to_string()),
        }
    }
}

/// Keeps the rejection's reason code for the storefront.
impl From<CouponRejection> for ApiError {
    fn from(rejection: CouponRejection) -> Self {
        ApiError::new(ErrorCode::CouponRejected, rejection.to_string())
            .with_reason(rejection.reason_code())
    }
}

impl From<crate::config::ConfigError> for ApiError {
    fn from(err: crate::config::ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{:?}/{}: {}", self.code, reason, self.message),
            None => write!(f, "{:?}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::Money;

    #[test]
    fn test_serialized_shape() {
        let err: ApiError = CouponRejection::MinimumNotMet {
            code: "FLAT500".to_string(),
            minimum: Money::from_rupees(3000),
            subtotal: Money::from_rupees(2500),
        }
        .into();

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "COUPON_REJECTED");
        assert_eq!(json["reason"], "COUPON_MINIMUM_NOT_MET");
        assert!(json["message"].as_str().unwrap().contains("minimum"));
    }

    #[test]
    fn test_reason_is_omitted_when_absent() {
        let json = serde_json::to_value(ApiError::internal("boom")).unwrap();
        assert!(json.get("reason").is_none());
    }

    #[test]
    fn test_points_errors() {
        let err: ApiError = CoreError::InvalidPointsRequest {
            requested: 200,
            reason: "exceeds cart subtotal of ₹150.00".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::InvalidPoints);
    }

    #[test]
    fn test_order_time_races_are_conflicts() {
        let err: ApiError = DbError::InsufficientStock {
            product_id: "kurta-01".to_string(),
            size: "M".to_string(),
            requested: 2,
        }
        .into();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.reason.as_deref(), Some("INSUFFICIENT_STOCK"));

        let err: ApiError = DbError::EmptyOrder.into();
        assert_eq!(err.code, ErrorCode::EmptyCart);
    }
}
