//! # Total Calculator
//!
//! Folds the reconciled subtotal, the chosen discounts and the delivery fee
//! into the amount the shopper pays.
//!
//! ## Formula
//! ```text
//! total_discount = min(coupon_discount + points_discount, subtotal)
//! payable        = max(0, subtotal - total_discount) + delivery_fee
//! ```
//!
//! Eligibility is decided upstream by the Discount Resolver; this module
//! trusts its inputs and only floors.
//! The delivery fee is added after the floor, so discounts never reduce it.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::selection::DiscountSelection;
use crate::types::CouponCode;

/// The full price breakdown shown at checkout and frozen into an order.
///
/// `coupon_discount` and `points_discount` are what was *granted*;
/// `total_discount` is what was actually taken off after capping at the
/// subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TotalBreakdown {
    pub subtotal: Money,
    pub coupon_code: Option<CouponCode>,
    pub coupon_discount: Money,
    pub points_used: i64,
    pub points_discount: Money,
    pub total_discount: Money,
    pub delivery_fee: Money,
    pub payable: Money,
}

/// Computes a breakdown from raw amounts.
///
/// Negative inputs are treated as zero.
pub fn compute_total(
    subtotal: Money,
    coupon_discount: Money,
    points_discount: Money,
    delivery_fee: Money,
) -> TotalBreakdown {
    let subtotal = subtotal.floor_at_zero();
    let coupon_discount = coupon_discount.floor_at_zero();
    let points_discount = points_discount.floor_at_zero();
    let delivery_fee = delivery_fee.floor_at_zero();

    let total_discount = (coupon_discount + points_discount).min(subtotal);
    let payable = (subtotal - total_discount).floor_at_zero() + delivery_fee;

    TotalBreakdown {
        subtotal,
        coupon_code: None,
        coupon_discount,
        points_used: 0,
        points_discount,
        total_discount,
        delivery_fee,
        payable,
    }
}

impl TotalBreakdown {
    /// Computes a breakdown for the current discount selection.
    pub fn from_selection(subtotal: Money, selection: &DiscountSelection, delivery_fee: Money) -> Self {
        let mut breakdown = compute_total(
            subtotal,
            selection.coupon_discount(),
            selection.points_discount(),
            delivery_fee,
        );
        breakdown.coupon_code = selection.coupon().map(|c| c.code.clone());
        breakdown.points_used = selection.points().map(|p| p.points_used).unwrap_or(0);
        breakdown
    }

    /// Whether any discount was taken off.
    pub fn has_discount(&self) -> bool {
        self.total_discount.is_positive()
    }

    /// Subtotal after discounts, before delivery.
    pub fn discounted_subtotal(&self) -> Money {
        self.subtotal - self.total_discount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discount::{CouponApplication, PointsApplication};
    use crate::types::DiscountRule;

    #[test]
    fn test_coupon_and_fee() {
        let b = compute_total(
            Money::from_rupees(2500),
            Money::from_rupees(500),
            Money::zero(),
            Money::from_rupees(100),
        );
        assert_eq!(b.total_discount, Money::from_rupees(500));
        assert_eq!(b.discounted_subtotal(), Money::from_rupees(2000));
        assert_eq!(b.payable, Money::from_rupees(2100));
    }

    #[test]
    fn test_combined_discount_is_capped_but_fee_is_kept() {
        let b = compute_total(
            Money::from_rupees(300),
            Money::from_rupees(250),
            Money::from_rupees(200),
            Money::from_rupees(49),
        );
        assert_eq!(b.total_discount, Money::from_rupees(300));
        assert_eq!(b.payable, Money::from_rupees(49));
    }

    #[test]
    fn test_payable_never_negative() {
        for subtotal in [0, 1, 150, 2500] {
            for coupon in [0, 100, 5000] {
                for points in [0, 150, 9999] {
                    for fee in [0, 100] {
                        let b = compute_total(
                            Money::from_rupees(subtotal),
                            Money::from_rupees(coupon),
                            Money::from_rupees(points),
                            Money::from_rupees(fee),
                        );
                        assert!(!b.payable.is_negative());
                        assert!(b.payable >= b.delivery_fee);
                        assert!(b.total_discount <= b.subtotal);
                    }
                }
            }
        }
    }

    #[test]
    fn test_negative_inputs_read_as_zero() {
        let b = compute_total(
            Money::from_rupees(-10),
            Money::from_rupees(-5),
            Money::zero(),
            Money::from_rupees(-1),
        );
        assert_eq!(b.payable, Money::zero());
        assert!(!b.has_discount());
    }

    #[test]
    fn test_from_selection_carries_code_and_points() {
        let mut selection = DiscountSelection::new();
        selection.apply_coupon(CouponApplication {
            code: CouponCode::normalize("flat500"),
            discount: Money::from_rupees(500),
            message: String::new(),
            rule: DiscountRule::Flat {
                amount: Money::from_rupees(500),
            },
            min_cart_total: Money::zero(),
        });
        selection.apply_points(PointsApplication {
            points_used: 200,
            discount: Money::from_rupees(200),
        });

        let b = TotalBreakdown::from_selection(Money::from_rupees(2500), &selection, Money::from_rupees(100));
        assert_eq!(b.coupon_code.as_ref().map(|c| c.as_str()), Some("FLAT500"));
        assert_eq!(b.points_used, 200);
        assert_eq!(b.total_discount, Money::from_rupees(700));
        assert_eq!(b.payable, Money::from_rupees(1900));
    }
}
