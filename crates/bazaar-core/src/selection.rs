//! # Discount Selection
//!
//! What the shopper has chosen to apply during one checkout session.
//!
//! ## States
//! ```text
//!                 apply_coupon                    apply_points
//!      ┌──────┐ ─────────────► ┌────────────┐ ─────────────► ┌─────────────────┐
//!      │ None │                │ CouponOnly │                │ CouponAndPoints │
//!      └──────┘ ◄───────────── └────────────┘ ◄───────────── └─────────────────┘
//!        │  ▲    remove_coupon                  remove_points      │  ▲
//!        │  │                                                      │  │
//!        │  │ remove_points   ┌────────────┐   apply_coupon        │  │
//!        │  └──────────────── │ PointsOnly │ ──────────────────────┘  │
//!        └──────────────────► └────────────┘ ◄────────────────────────┘
//!          apply_points                        remove_coupon
//! ```
//!
//! The coupon and points flags are independent. Applying replaces the
//! previous choice of the same kind; removing something that is not
//! applied is a no-op.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::discount::{CouponApplication, PointsApplication};
use crate::money::Money;

/// Which discounts are currently applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SelectionState {
    None,
    CouponOnly,
    PointsOnly,
    CouponAndPoints,
}

/// At most one coupon and at most one points redemption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountSelection {
    coupon: Option<CouponApplication>,
    points: Option<PointsApplication>,
}

impl DiscountSelection {
    pub fn new() -> Self {
        DiscountSelection::default()
    }

    /// Applies a coupon, returning the one it replaced.
    pub fn apply_coupon(&mut self, coupon: CouponApplication) -> Option<CouponApplication> {
        self.coupon.replace(coupon)
    }

    /// Removes the coupon, if any.
    pub fn remove_coupon(&mut self) -> Option<CouponApplication> {
        self.coupon.take()
    }

    /// Applies a points redemption, returning the one it replaced.
    pub fn apply_points(&mut self, points: PointsApplication) -> Option<PointsApplication> {
        self.points.replace(points)
    }

    /// Removes the points redemption, if any.
    pub fn remove_points(&mut self) -> Option<PointsApplication> {
        self.points.take()
    }

    /// Drops both discounts (cart cleared or order placed).
    pub fn clear(&mut self) {
        self.coupon = None;
        self.points = None;
    }

    pub fn coupon(&self) -> Option<&CouponApplication> {
        self.coupon.as_ref()
    }

    pub fn points(&self) -> Option<&PointsApplication> {
        self.points.as_ref()
    }

    /// Granted coupon discount, zero when no coupon is applied.
    pub fn coupon_discount(&self) -> Money {
        self.coupon.as_ref().map(|c| c.discount).unwrap_or_default()
    }

    /// Granted points discount, zero when no points are applied.
    pub fn points_discount(&self) -> Money {
        self.points.as_ref().map(|p| p.discount).unwrap_or_default()
    }

    pub fn state(&self) -> SelectionState {
        match (self.coupon.is_some(), self.points.is_some()) {
            (false, false) => SelectionState::None,
            (true, false) => SelectionState::CouponOnly,
            (false, true) => SelectionState::PointsOnly,
            (true, true) => SelectionState::CouponAndPoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CouponCode, DiscountRule};

    fn coupon(code: &str, rupees: i64) -> CouponApplication {
        CouponApplication {
            code: CouponCode::normalize(code),
            discount: Money::from_rupees(rupees),
            message: String::new(),
            rule: DiscountRule::Flat {
                amount: Money::from_rupees(rupees),
            },
            min_cart_total: Money::zero(),
        }
    }

    fn points(n: i64) -> PointsApplication {
        PointsApplication {
            points_used: n,
            discount: Money::from_rupees(n),
        }
    }

    #[test]
    fn test_transitions() {
        let mut s = DiscountSelection::new();
        assert_eq!(s.state(), SelectionState::None);

        s.apply_coupon(coupon("SAVE10", 100));
        assert_eq!(s.state(), SelectionState::CouponOnly);

        s.apply_points(points(50));
        assert_eq!(s.state(), SelectionState::CouponAndPoints);

        s.remove_coupon();
        assert_eq!(s.state(), SelectionState::PointsOnly);

        s.remove_points();
        assert_eq!(s.state(), SelectionState::None);
    }

    #[test]
    fn test_second_coupon_replaces_first() {
        let mut s = DiscountSelection::new();
        s.apply_coupon(coupon("SAVE10", 100));
        let previous = s.apply_coupon(coupon("FLAT500", 500));

        assert_eq!(previous.map(|c| c.code), Some(CouponCode::normalize("SAVE10")));
        assert_eq!(s.coupon_discount(), Money::from_rupees(500));
    }

    #[test]
    fn test_removal_is_idempotent_and_restores_prior_state() {
        let mut s = DiscountSelection::new();
        s.apply_points(points(40));
        let before = s.clone();

        s.apply_coupon(coupon("SAVE10", 100));
        s.remove_coupon();
        assert_eq!(s, before);

        assert!(s.remove_coupon().is_none());
        assert_eq!(s, before);

        s.remove_points();
        s.remove_points();
        assert_eq!(s, DiscountSelection::new());
    }

    #[test]
    fn test_empty_selection_has_zero_discounts() {
        let s = DiscountSelection::new();
        assert_eq!(s.coupon_discount(), Money::zero());
        assert_eq!(s.points_discount(), Money::zero());
    }
}
