//! # Checkout Session
//!
//! One shopper's checkout context: who they are, what is in their cart,
//! and which discounts they picked.
//!
//! Every pricing call gets the session passed in explicitly; nothing is
//! kept in globals, so two shoppers never see each other's selections.
//!
//! ## Page Flow
//! ```text
//! page load ──► quote()          reconcile + re-price coupon + total
//! "Apply"   ──► apply_coupon()   selection.coupon = Some(..)  (or rejection)
//! "Use pts" ──► apply_points()   selection.points = Some(..)  (or error)
//! "Remove"  ──► remove_*()       back to the previous state
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::discount::{apply_points, CouponApplication, DiscountResolver, PointsApplication};
use crate::error::{CoreResult, CouponRejection};
use crate::lookup::{CouponCatalog, UsageLookup};
use crate::money::Money;
use crate::reconcile::{reconcile, InventorySnapshot, Reconciliation};
use crate::selection::{DiscountSelection, SelectionState};
use crate::total::TotalBreakdown;
use crate::types::{money_to_points, ReconciledLine};

/// Priced view of the cart, returned to the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub lines: Vec<ReconciledLine>,
    pub breakdown: TotalBreakdown,
    pub selection: SelectionState,
    pub has_shortfall: bool,
    /// Points the subtotal can absorb, before the shopper's balance is
    /// taken into account.
    pub max_redeemable_points: i64,
    /// A coupon whose minimum the new subtotal no longer meets, removed.
    pub dropped_coupon: Option<CouponApplication>,
    /// A points redemption that no longer fit the subtotal and was removed.
    pub dropped_points: Option<PointsApplication>,
}

/// Discounts [`CheckoutSession::revalidate`] had to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Revalidation {
    pub dropped_coupon: Option<CouponApplication>,
    pub dropped_points: Option<PointsApplication>,
}

impl Revalidation {
    pub fn dropped_anything(&self) -> bool {
        self.dropped_coupon.is_some() || self.dropped_points.is_some()
    }
}

/// Per-shopper checkout context.
#[derive(Debug, Clone, Default)]
pub struct CheckoutSession {
    user_id: Option<String>,
    cart: Cart,
    selection: DiscountSelection,
}

impl CheckoutSession {
    /// Starts a session. `None` is guest checkout.
    pub fn new(user_id: Option<String>) -> Self {
        CheckoutSession {
            user_id,
            cart: Cart::new(),
            selection: DiscountSelection::new(),
        }
    }

    pub fn with_cart(user_id: Option<String>, cart: Cart) -> Self {
        CheckoutSession {
            user_id,
            cart,
            selection: DiscountSelection::new(),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    pub fn selection(&self) -> &DiscountSelection {
        &self.selection
    }

    /// Reconciles the cart against `inventory`.
    pub fn reconcile(&self, inventory: &InventorySnapshot) -> CoreResult<Reconciliation> {
        reconcile(self.cart.lines(), inventory)
    }

    /// Brings the selection in line with a new `subtotal`.
    ///
    /// Needed after the cart changes (line removed, stock ran out). The
    /// coupon is re-priced, or removed once the subtotal falls below its
    /// minimum. A points redemption worth more than `subtotal` is removed.
    pub fn revalidate(&mut self, subtotal: Money) -> Revalidation {
        let mut dropped = Revalidation::default();

        match self.selection.coupon().map(|c| c.reprice(subtotal)) {
            Some(Ok(repriced)) => {
                self.selection.apply_coupon(repriced);
            }
            Some(Err(_)) => dropped.dropped_coupon = self.selection.remove_coupon(),
            None => {}
        }

        let exceeds = self
            .selection
            .points()
            .is_some_and(|p| p.discount > subtotal);
        if exceeds {
            dropped.dropped_points = self.selection.remove_points();
        }

        dropped
    }

    /// Reconciles, revalidates and totals in one call.
    pub fn quote(&mut self, inventory: &InventorySnapshot, delivery_fee: Money) -> CoreResult<Quote> {
        let reconciliation = self.reconcile(inventory)?;
        let subtotal = reconciliation.subtotal();
        let Revalidation {
            dropped_coupon,
            dropped_points,
        } = self.revalidate(subtotal);

        let breakdown = TotalBreakdown::from_selection(subtotal, &self.selection, delivery_fee);
        let has_shortfall = reconciliation.has_shortfall();

        Ok(Quote {
            lines: reconciliation.into_lines(),
            breakdown,
            selection: self.selection.state(),
            has_shortfall,
            max_redeemable_points: money_to_points(subtotal),
            dropped_coupon,
            dropped_points,
        })
    }

    /// Validates a coupon and, on success, makes it the session's coupon.
    ///
    /// On rejection the previous selection is kept.
    pub fn apply_coupon<C: CouponCatalog>(
        &mut self,
        resolver: &DiscountResolver<C>,
        code: &str,
        subtotal: Money,
        usage: Option<&dyn UsageLookup>,
    ) -> Result<CouponApplication, CouponRejection> {
        let applied = resolver.apply_coupon(code, subtotal, self.user_id.as_deref(), usage)?;
        self.selection.apply_coupon(applied.clone());
        Ok(applied)
    }

    /// Validates a points redemption and, on success, records it.
    pub fn apply_points(
        &mut self,
        requested: i64,
        available_points: i64,
        subtotal: Money,
    ) -> CoreResult<PointsApplication> {
        let applied = apply_points(requested, available_points, subtotal)?;
        self.selection.apply_points(applied);
        Ok(applied)
    }

    /// Applies a coupon that was validated elsewhere (e.g. asynchronously).
    pub fn set_coupon(&mut self, applied: CouponApplication) {
        self.selection.apply_coupon(applied);
    }

    pub fn remove_coupon(&mut self) -> Option<CouponApplication> {
        self.selection.remove_coupon()
    }

    pub fn remove_points(&mut self) -> Option<PointsApplication> {
        self.selection.remove_points()
    }

    /// Empties the cart and the selection once an order is placed.
    pub fn reset(&mut self) {
        self.cart.clear();
        self.selection.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::CouponBook;
    use crate::types::{Coupon, CouponCode, DiscountRule};
    use chrono::{Duration, Utc};

    fn session_with(lines: &[(&str, &str, i64, i64)]) -> CheckoutSession {
        let mut s = CheckoutSession::new(Some("550e8400-e29b-41d4-a716-446655440000".to_string()));
        for (p, size, rupees, qty) in lines {
            s.cart_mut()
                .add_line(p, size, Money::from_rupees(*rupees), *qty)
                .unwrap();
        }
        s
    }

    fn resolver() -> DiscountResolver<CouponBook> {
        let now = Utc::now();
        DiscountResolver::new(CouponBook::new().with(Coupon {
            code: CouponCode::normalize("FLAT500"),
            rule: DiscountRule::Flat {
                amount: Money::from_rupees(500),
            },
            min_cart_total: Money::from_rupees(2000),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            per_user_limit: None,
            is_active: true,
        }))
    }

    #[test]
    fn test_quote_with_coupon() {
        let mut s = session_with(&[("saree-07", "Free", 2500, 1)]);
        let stock = InventorySnapshot::new().with_stock("saree-07", "Free", 3);

        let subtotal = s.reconcile(&stock).unwrap().subtotal();
        s.apply_coupon(&resolver(), "flat500", subtotal, None).unwrap();

        let quote = s.quote(&stock, Money::from_rupees(100)).unwrap();
        assert_eq!(quote.breakdown.payable, Money::from_rupees(2100));
        assert_eq!(quote.selection, SelectionState::CouponOnly);
        assert!(!quote.has_shortfall);
        assert_eq!(quote.max_redeemable_points, 2500);
    }

    #[test]
    fn test_rejected_coupon_keeps_selection() {
        let mut s = session_with(&[("tee", "S", 300, 1)]);
        s.apply_points(100, 500, Money::from_rupees(300)).unwrap();
        let before = s.selection().clone();

        let err = s
            .apply_coupon(&resolver(), "FLAT500", Money::from_rupees(300), None)
            .unwrap_err();
        assert_eq!(err.reason_code(), "COUPON_MINIMUM_NOT_MET");
        assert_eq!(s.selection(), &before);
    }

    #[test]
    fn test_quote_drops_points_when_stock_shrinks_subtotal() {
        let mut s = session_with(&[("kurta-01", "M", 500, 4)]);
        s.apply_points(1500, 2000, Money::from_rupees(2000)).unwrap();

        let stock = InventorySnapshot::new().with_stock("kurta-01", "M", 2);
        let quote = s.quote(&stock, Money::zero()).unwrap();

        assert!(quote.has_shortfall);
        assert_eq!(quote.dropped_points.map(|p| p.points_used), Some(1500));
        assert_eq!(quote.selection, SelectionState::None);
        assert_eq!(quote.breakdown.payable, Money::from_rupees(1000));
    }

    #[test]
    fn test_quote_reprices_percentage_coupon_when_stock_shrinks() {
        let now = Utc::now();
        let resolver = DiscountResolver::new(CouponBook::new().with(Coupon {
            code: CouponCode::normalize("FEST20"),
            rule: DiscountRule::Percentage { bps: 2000, cap: None },
            min_cart_total: Money::from_rupees(1500),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            per_user_limit: None,
            is_active: true,
        }));
        let mut s = session_with(&[("kurta-01", "M", 1000, 4)]);

        let full = InventorySnapshot::new().with_stock("kurta-01", "M", 4);
        let subtotal = s.reconcile(&full).unwrap().subtotal();
        let applied = s.apply_coupon(&resolver, "fest20", subtotal, None).unwrap();
        assert_eq!(applied.discount, Money::from_rupees(800));

        // Two left: 20% of ₹2000.
        let two = InventorySnapshot::new().with_stock("kurta-01", "M", 2);
        let quote = s.quote(&two, Money::zero()).unwrap();
        assert_eq!(quote.breakdown.coupon_discount, Money::from_rupees(400));
        assert_eq!(quote.breakdown.payable, Money::from_rupees(1600));
        assert!(quote.dropped_coupon.is_none());
        assert_eq!(s.selection().coupon_discount(), Money::from_rupees(400));

        // One left: ₹1000 is under the ₹1500 minimum.
        let one = InventorySnapshot::new().with_stock("kurta-01", "M", 1);
        let quote = s.quote(&one, Money::zero()).unwrap();
        assert_eq!(quote.dropped_coupon.map(|c| c.code.to_string()), Some("FEST20".to_string()));
        assert_eq!(quote.selection, SelectionState::None);
        assert_eq!(quote.breakdown.coupon_discount, Money::zero());
        assert_eq!(quote.breakdown.payable, Money::from_rupees(1000));
    }

    #[test]
    fn test_revalidate_keeps_selection_when_subtotal_holds() {
        let mut s = session_with(&[("saree-07", "Free", 2500, 1)]);
        s.apply_coupon(&resolver(), "FLAT500", Money::from_rupees(2500), None)
            .unwrap();
        s.apply_points(200, 500, Money::from_rupees(2500)).unwrap();
        let before = s.selection().clone();

        let dropped = s.revalidate(Money::from_rupees(2500));
        assert!(!dropped.dropped_anything());
        assert_eq!(s.selection(), &before);
    }

    #[test]
    fn test_reset_clears_cart_and_selection() {
        let mut s = session_with(&[("tee", "S", 300, 1)]);
        s.apply_points(100, 500, Money::from_rupees(300)).unwrap();
        s.reset();

        assert!(s.cart().is_empty());
        assert_eq!(s.selection().state(), SelectionState::None);
    }
}
