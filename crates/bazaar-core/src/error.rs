//! # Pricing Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  bad input ──► ValidationError ──┐                                      │
//! │                                  ├──► CoreError ──► ApiError (checkout) │
//! │  cart / points rule broken ──────┘                                      │
//! │                                                                         │
//! │  coupon refused ─────► CouponRejection ──► CouponResult::Rejected       │
//! │                        (one variant per rule, stable reason_code())     │
//! │                                                                         │
//! │  storage, stock races ─► DbError lives in bazaar-db                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A discount larger than the subtotal is not an error here. The Total
//! Calculator floors it.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and reward-point rule violations.
///
/// All of these are local and recoverable: a failed operation leaves the
/// cart and the discount selection exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A cart line requests a non-positive quantity.
    ///
    /// ## When This Occurs
    /// - A UI defect sends `0` or a negative quantity
    /// - Persisted cart data was tampered with
    ///
    /// The line is never silently clamped to zero.
    #[error("Invalid quantity {quantity} for product {product_id} (size {size})")]
    InvalidQuantity {
        product_id: String,
        size: String,
        quantity: i64,
    },

    /// A reward-point redemption request cannot be honoured.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart subtotal: ₹150, balance: 500 points
    ///      │
    ///      ▼
    /// "Use 200 points"
    ///      │
    ///      ▼
    /// InvalidPointsRequest { requested: 200, reason: "exceeds cart subtotal of ₹150.00" }
    ///      │
    ///      ▼
    /// UI offers "Use maximum (150)"
    /// ```
    #[error("Cannot redeem {requested} points: {reason}")]
    InvalidPointsRequest { requested: i64, reason: String },

    /// Cart has reached the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds the per-line maximum.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// The referenced product + size is not in the cart.
    #[error("Product {product_id} (size {size}) is not in the cart")]
    LineNotInCart { product_id: String, size: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Coupon Rejection
// =============================================================================

/// Why a coupon was not applied.
///
/// Checks run in a fixed order and stop at the first failure, so exactly
/// one of these is reported per attempt:
///
/// ```text
/// NotFound → Inactive → NotStarted / Expired → MinimumNotMet → UsageLimitExceeded
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    /// No coupon with this (normalized) code exists.
    #[error("Coupon {code} does not exist")]
    NotFound { code: String },

    /// The coupon was switched off by an administrator.
    #[error("Coupon {code} is no longer active")]
    Inactive { code: String },

    /// The validity window has not opened yet.
    #[error("Coupon {code} is not valid until {}", .starts_at.format("%d %b %Y"))]
    NotStarted {
        code: String,
        starts_at: DateTime<Utc>,
    },

    /// The validity window has closed.
    #[error("Coupon {code} expired on {}", .expired_at.format("%d %b %Y"))]
    Expired {
        code: String,
        expired_at: DateTime<Utc>,
    },

    /// The reconciled cart subtotal is below the coupon's minimum.
    #[error("Coupon {code} requires a minimum cart total of {minimum} (current total {subtotal})")]
    MinimumNotMet {
        code: String,
        minimum: Money,
        subtotal: Money,
    },

    /// The user already redeemed this coupon as often as allowed.
    #[error("Coupon {code} can only be used {limit} time(s) per customer")]
    UsageLimitExceeded { code: String, limit: u32 },
}

impl CouponRejection {
    /// Machine-readable reason, stable across message wording changes.
    pub fn reason_code(&self) -> &'static str {
        match self {
            CouponRejection::NotFound { .. } => "COUPON_NOT_FOUND",
            CouponRejection::Inactive { .. } => "COUPON_INACTIVE",
            CouponRejection::NotStarted { .. } => "COUPON_NOT_STARTED",
            CouponRejection::Expired { .. } => "COUPON_EXPIRED",
            CouponRejection::MinimumNotMet { .. } => "COUPON_MINIMUM_NOT_MET",
            CouponRejection::UsageLimitExceeded { .. } => "COUPON_USAGE_LIMIT_EXCEEDED",
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised where external data (UI payloads, database rows) enters the
/// core, before any pricing logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, bad coupon characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidQuantity {
            product_id: "kurta-01".to_string(),
            size: "M".to_string(),
            quantity: -1,
        };
        assert_eq!(
            err.to_string(),
            "Invalid quantity -1 for product kurta-01 (size M)"
        );
    }

    #[test]
    fn test_coupon_rejection_messages() {
        let err = CouponRejection::MinimumNotMet {
            code: "FLAT500".to_string(),
            minimum: Money::from_rupees(3000),
            subtotal: Money::from_rupees(2500),
        };
        assert_eq!(
            err.to_string(),
            "Coupon FLAT500 requires a minimum cart total of ₹3000.00 (current total ₹2500.00)"
        );

        let expired_at = Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).unwrap();
        let err = CouponRejection::Expired {
            code: "HOLI20".to_string(),
            expired_at,
        };
        assert_eq!(err.to_string(), "Coupon HOLI20 expired on 31 Mar 2026");
    }

    #[test]
    fn test_reason_codes_are_distinct() {
        let code = || "X".to_string();
        let now = Utc::now();
        let reasons = [
            CouponRejection::NotFound { code: code() }.reason_code(),
            CouponRejection::Inactive { code: code() }.reason_code(),
            CouponRejection::NotStarted { code: code(), starts_at: now }.reason_code(),
            CouponRejection::Expired { code: code(), expired_at: now }.reason_code(),
            CouponRejection::MinimumNotMet {
                code: code(),
                minimum: Money::zero(),
                subtotal: Money::zero(),
            }
            .reason_code(),
            CouponRejection::UsageLimitExceeded { code: code(), limit: 1 }.reason_code(),
        ];
        let mut unique = reasons.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), reasons.len());
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "size".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
