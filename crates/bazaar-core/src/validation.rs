//! # Validation Module
//!
//! Boundary validation for data entering the pricing core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront UI                                                │
//! │  ├── Quantity pickers, coupon input box                                │
//! │  └── Immediate feedback                                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Checkout service (Rust)                                      │
//! │  └── THIS MODULE: reject malformed input before pricing runs           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (stock >= 0, points >= 0)                       │
//! │  └── Conditional updates at order time                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bazaar_core::validation::{validate_coupon_code, validate_quantity};
//!
//! assert!(validate_coupon_code("FLAT500").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CartLine, Coupon, DiscountRule};
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest coupon code accepted.
pub const MAX_COUPON_CODE_LEN: usize = 32;

/// Longest size label accepted.
pub const MAX_SIZE_LEN: usize = 16;

/// Longest user id accepted.
pub const MAX_USER_ID_LEN: usize = 64;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a user-typed coupon code (before normalization).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 32 characters
/// - Letters, digits, hyphens and underscores only
///
/// ```rust
/// use bazaar_core::validation::validate_coupon_code;
///
/// assert!(validate_coupon_code("diwali-25").is_ok());
/// assert!(validate_coupon_code("").is_err());
/// assert!(validate_coupon_code("NO SPACES").is_err());
/// ```
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "coupon code".to_string(),
        });
    }

    if code.chars().count() > MAX_COUPON_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "coupon code".to_string(),
            max: MAX_COUPON_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "coupon code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a size label.
pub fn validate_size(size: &str) -> ValidationResult<()> {
    let size = size.trim();

    if size.is_empty() {
        return Err(ValidationError::Required {
            field: "size".to_string(),
        });
    }

    if size.chars().count() > MAX_SIZE_LEN {
        return Err(ValidationError::TooLong {
            field: "size".to_string(),
            max: MAX_SIZE_LEN,
        });
    }

    Ok(())
}

/// Validates an opaque product identifier.
pub fn validate_product_id(product_id: &str) -> ValidationResult<()> {
    if product_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product id".to_string(),
        });
    }

    Ok(())
}

/// Validates an opaque user id issued by the auth provider.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 64 characters
/// - ASCII letters, digits and `- _ . @ :` only (no whitespace)
///
/// ```rust
/// use bazaar_core::validation::validate_user_id;
///
/// assert!(validate_user_id("demo-shopper").is_ok());
/// assert!(validate_user_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_user_id("two words").is_err());
/// ```
pub fn validate_user_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "user id".to_string(),
        });
    }

    if id.chars().count() > MAX_USER_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "user id".to_string(),
            max: MAX_USER_ID_LEN,
        });
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | ':'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "user id".to_string(),
            reason: "must contain only letters, numbers and - _ . @ :".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (10)
///
/// ## User Workflow
/// ```text
/// Shopper taps "+" on a line showing 10
///      │
///      ▼
/// validate_quantity(11) ← THIS FUNCTION
///      │
///      ├── qty <= 0?  → "quantity must be positive"
///      ├── qty > 10?  → "quantity must be between 1 and 10"
///      └── OK         → cart updated
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (free gift lines).
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "unit price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a points figure read from a ledger or typed by the shopper.
pub fn validate_points(points: i64) -> ValidationResult<()> {
    if points < 0 {
        return Err(ValidationError::OutOfRange {
            field: "points".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a percentage in basis points (0% to 100%).
pub fn validate_percentage_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "percentage".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a cart line arriving from the UI.
///
/// The quantity is checked for shape here only; a non-positive quantity
/// is reported by the reconciler as `InvalidQuantity`.
pub fn validate_cart_line(line: &CartLine) -> ValidationResult<()> {
    validate_product_id(&line.product_id)?;
    validate_size(&line.size)?;
    validate_unit_price(line.unit_price)?;
    Ok(())
}

/// Validates a coupon definition coming from the admin collaborator.
pub fn validate_coupon(coupon: &Coupon) -> ValidationResult<()> {
    validate_coupon_code(coupon.code.as_str())?;

    match coupon.rule {
        DiscountRule::Flat { amount } => {
            if !amount.is_positive() {
                return Err(ValidationError::MustBePositive {
                    field: "discount amount".to_string(),
                });
            }
        }
        DiscountRule::Percentage { bps, cap } => {
            validate_percentage_bps(bps)?;
            if let Some(cap) = cap {
                if !cap.is_positive() {
                    return Err(ValidationError::MustBePositive {
                        field: "discount cap".to_string(),
                    });
                }
            }
        }
    }

    if coupon.min_cart_total.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "minimum cart total".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    if coupon.valid_until < coupon.valid_from {
        return Err(ValidationError::InvalidFormat {
            field: "validity window".to_string(),
            reason: "end is before start".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
