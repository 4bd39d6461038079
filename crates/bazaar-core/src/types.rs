//! # Domain Types
//!
//! Core domain types shared by the reconciler, the discount resolver and
//! the total calculator.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    CartLine     │   │  ReconciledLine │   │     Coupon      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id     │──►│  fulfillable    │   │  code (UPPER)   │       │
//! │  │  size           │   │  is_short       │   │  rule           │       │
//! │  │  unit_price     │   │  line_total     │   │  min_cart_total │       │
//! │  │  requested_qty  │   └─────────────────┘   │  window, limit  │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DiscountRule   │   │ RewardPoints    │   │ DeliveryFee     │       │
//! │  │  Flat / Percent │   │ Ledger          │   │ Policy          │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::POINT_VALUE_PAISE;

// =============================================================================
// Cart Line
// =============================================================================

/// One product + size + quantity selection in the shopper's cart.
///
/// `unit_price` is captured when the shopper selects the size, so the
/// cart keeps showing the price they saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Opaque catalog identifier.
    pub product_id: String,

    /// Size label ("S", "M", "XL", "UK 9", ...).
    pub size: String,

    /// Price per unit.
    pub unit_price: Money,

    /// Quantity the shopper asked for. Must be >= 1.
    pub requested_quantity: i64,
}

impl CartLine {
    /// Creates a cart line.
    pub fn new(
        product_id: impl Into<String>,
        size: impl Into<String>,
        unit_price: Money,
        requested_quantity: i64,
    ) -> Self {
        CartLine {
            product_id: product_id.into(),
            size: size.into(),
            unit_price,
            requested_quantity,
        }
    }

    /// Total the shopper *asked* for. Never use this for discounts or
    /// payment; only the reconciled subtotal is trustworthy.
    pub fn requested_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.requested_quantity)
    }

    /// Whether this line refers to the given product + size.
    pub fn matches(&self, product_id: &str, size: &str) -> bool {
        self.product_id == product_id && self.size == size
    }
}

// =============================================================================
// Reconciled Line
// =============================================================================

/// A cart line after it has been checked against live stock.
///
/// ## Invariants
/// - `fulfillable_quantity = min(requested_quantity, available_stock)`
/// - `is_short = fulfillable_quantity < requested_quantity`
/// - `line_total = unit_price × fulfillable_quantity`, never negative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledLine {
    pub product_id: String,
    pub size: String,
    pub unit_price: Money,
    pub requested_quantity: i64,
    /// Stock seen in the snapshot (0 when the snapshot had no entry).
    pub available_stock: i64,
    pub fulfillable_quantity: i64,
    pub is_short: bool,
    pub line_total: Money,
}

impl ReconciledLine {
    /// How many units the shopper will not receive.
    pub fn shortfall(&self) -> i64 {
        self.requested_quantity - self.fulfillable_quantity
    }

    /// Whether nothing of this line can be fulfilled.
    pub fn is_out_of_stock(&self) -> bool {
        self.fulfillable_quantity == 0
    }
}

// =============================================================================
// Coupon Code
// =============================================================================

/// A coupon code normalized for lookup: trimmed and uppercased.
///
/// Matching is case-insensitive, so `"save10"`, `" Save10 "` and
/// `"SAVE10"` all normalize to the same code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct CouponCode(String);

impl CouponCode {
    /// Normalizes a raw, user-typed code.
    ///
    /// ```rust
    /// use bazaar_core::CouponCode;
    ///
    /// assert_eq!(CouponCode::normalize("  save10 ").as_str(), "SAVE10");
    /// ```
    pub fn normalize(raw: &str) -> Self {
        CouponCode(raw.trim().to_uppercase())
    }

    /// Returns the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the normalized code is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CouponCode {
    fn from(raw: &str) -> Self {
        CouponCode::normalize(raw)
    }
}

// =============================================================================
// Discount Rule
// =============================================================================

/// Storage discriminator for [`DiscountRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Flat,
    Percentage,
}

/// How a coupon computes its discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountRule {
    /// Fixed amount off ("₹500 off").
    Flat { amount: Money },

    /// Percentage off in basis points, optionally capped
    /// ("20% off, up to ₹300").
    Percentage { bps: u32, cap: Option<Money> },
}

impl DiscountRule {
    /// Returns the storage discriminator.
    pub fn kind(&self) -> DiscountKind {
        match self {
            DiscountRule::Flat { .. } => DiscountKind::Flat,
            DiscountRule::Percentage { .. } => DiscountKind::Percentage,
        }
    }

    /// Computes the discount for a reconciled subtotal.
    ///
    /// The result is never negative and never greater than `subtotal`.
    ///
    /// ```rust
    /// use bazaar_core::{DiscountRule, Money};
    ///
    /// let rule = DiscountRule::Percentage { bps: 2000, cap: Some(Money::from_rupees(300)) };
    /// assert_eq!(rule.discount_for(Money::from_rupees(1000)), Money::from_rupees(200));
    /// assert_eq!(rule.discount_for(Money::from_rupees(5000)), Money::from_rupees(300));
    /// ```
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let subtotal = subtotal.floor_at_zero();
        let raw = match *self {
            DiscountRule::Flat { amount } => amount,
            DiscountRule::Percentage { bps, cap } => {
                let pct = subtotal.percentage_of(bps);
                match cap {
                    Some(cap) => pct.min(cap),
                    None => pct,
                }
            }
        };
        raw.floor_at_zero().min(subtotal)
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// A coupon definition as configured by an administrator.
///
/// Read-only from the pricing core's perspective; redemption counts are
/// kept by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: CouponCode,
    pub rule: DiscountRule,
    /// Minimum reconciled subtotal required.
    pub min_cart_total: Money,
    /// Start of the validity window (inclusive).
    #[ts(as = "String")]
    pub valid_from: DateTime<Utc>,
    /// End of the validity window (inclusive).
    #[ts(as = "String")]
    pub valid_until: DateTime<Utc>,
    /// Maximum redemptions per user; `None` means unlimited.
    pub per_user_limit: Option<u32>,
    pub is_active: bool,
}

impl Coupon {
    /// Whether `now` falls inside the validity window.
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now <= self.valid_until
    }
}

// =============================================================================
// Reward Points
// =============================================================================

/// A user's redeemable reward-point balance.
///
/// The balance is only ever decremented by the order writer once an order
/// is confirmed; pricing merely proposes a redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RewardPointsLedger {
    pub user_id: String,
    pub available_points: i64,
}

impl RewardPointsLedger {
    /// Monetary value of the whole balance.
    pub fn value(&self) -> Money {
        points_to_money(self.available_points)
    }
}

/// Converts points to money at the fixed exchange rate, saturating for
/// balances too large to represent.
#[inline]
pub fn points_to_money(points: i64) -> Money {
    Money::from_paise(points.saturating_mul(POINT_VALUE_PAISE))
}

/// Like [`points_to_money`], but `None` on overflow.
#[inline]
pub fn checked_points_to_money(points: i64) -> Option<Money> {
    points.checked_mul(POINT_VALUE_PAISE).map(Money::from_paise)
}

/// How many whole points an amount is worth (rounded down).
#[inline]
pub fn money_to_points(amount: Money) -> i64 {
    amount.floor_at_zero().paise() / POINT_VALUE_PAISE
}

// =============================================================================
// Delivery Fee Policy
// =============================================================================

/// Delivery fee configured for the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryFeePolicy {
    /// No delivery charge.
    #[default]
    Free,

    /// Fixed charge per order.
    Flat { fee: Money },
}

impl DeliveryFeePolicy {
    /// Builds a policy from a configured amount; zero or less means free.
    pub fn from_amount(fee: Money) -> Self {
        if fee.is_positive() {
            DeliveryFeePolicy::Flat { fee }
        } else {
            DeliveryFeePolicy::Free
        }
    }

    /// The fee to add to an order.
    pub fn fee(&self) -> Money {
        match *self {
            DeliveryFeePolicy::Free => Money::zero(),
            DeliveryFeePolicy::Flat { fee } => fee,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(rule: DiscountRule) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: CouponCode::normalize("test"),
            rule,
            min_cart_total: Money::zero(),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            per_user_limit: None,
            is_active: true,
        }
    }

    #[test]
    fn test_coupon_code_normalization() {
        assert_eq!(CouponCode::normalize("save10"), CouponCode::normalize("SAVE10"));
        assert_eq!(CouponCode::from(" Flat500\t").as_str(), "FLAT500");
        assert!(CouponCode::normalize("   ").is_empty());
    }

    #[test]
    fn test_flat_discount_never_exceeds_subtotal() {
        let rule = DiscountRule::Flat {
            amount: Money::from_rupees(500),
        };
        assert_eq!(rule.discount_for(Money::from_rupees(2500)), Money::from_rupees(500));
        assert_eq!(rule.discount_for(Money::from_rupees(300)), Money::from_rupees(300));
        assert_eq!(rule.discount_for(Money::zero()), Money::zero());
    }

    #[test]
    fn test_percentage_discount_with_and_without_cap() {
        let uncapped = DiscountRule::Percentage { bps: 1000, cap: None };
        assert_eq!(uncapped.discount_for(Money::from_rupees(2500)), Money::from_rupees(250));

        let capped = DiscountRule::Percentage {
            bps: 5000,
            cap: Some(Money::from_rupees(400)),
        };
        assert_eq!(capped.discount_for(Money::from_rupees(600)), Money::from_rupees(300));
        assert_eq!(capped.discount_for(Money::from_rupees(2000)), Money::from_rupees(400));
    }

    #[test]
    fn test_rule_kind() {
        assert_eq!(
            DiscountRule::Flat { amount: Money::zero() }.kind(),
            DiscountKind::Flat
        );
        assert_eq!(
            DiscountRule::Percentage { bps: 1, cap: None }.kind(),
            DiscountKind::Percentage
        );
    }

    #[test]
    fn test_validity_window_is_inclusive() {
        let c = coupon(DiscountRule::Flat { amount: Money::zero() });
        assert!(c.is_within_window(c.valid_from));
        assert!(c.is_within_window(c.valid_until));
        assert!(!c.is_within_window(c.valid_until + Duration::seconds(1)));
        assert!(!c.is_within_window(c.valid_from - Duration::seconds(1)));
    }

    #[test]
    fn test_points_conversion() {
        assert_eq!(points_to_money(150), Money::from_rupees(150));
        assert_eq!(money_to_points(Money::from_paise(15_099)), 150);
        assert_eq!(money_to_points(Money::from_paise(-100)), 0);

        // Balances near the top of i64 must not wrap negative.
        let huge = i64::MAX / 100 + 1;
        assert_eq!(checked_points_to_money(huge), None);
        assert_eq!(checked_points_to_money(huge - 1), Some(Money::from_rupees(huge - 1)));
        assert_eq!(points_to_money(huge).paise(), i64::MAX);
    }

    #[test]
    fn test_delivery_fee_policy() {
        assert_eq!(DeliveryFeePolicy::default().fee(), Money::zero());
        assert_eq!(
            DeliveryFeePolicy::from_amount(Money::from_rupees(100)).fee(),
            Money::from_rupees(100)
        );
        assert_eq!(
            DeliveryFeePolicy::from_amount(Money::zero()),
            DeliveryFeePolicy::Free
        );
    }

    #[test]
    fn test_discount_rule_serialization_shape() {
        let rule = DiscountRule::Percentage {
            bps: 1000,
            cap: None,
        };
        let json = serde_json::to_value(rule).unwrap();
        assert_eq!(json["kind"], "percentage");
        assert_eq!(json["bps"], 1000);
    }
}
