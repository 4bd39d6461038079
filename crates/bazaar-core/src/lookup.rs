//! # Lookup Contracts
//!
//! The pricing core reads coupon definitions and redemption history from
//! collaborators it does not own. These traits are the narrow, synchronous
//! shape of those reads; the database layer fetches data asynchronously and
//! hands it over through the in-memory implementations below.
//!
//! Both lookups must be side-effect free from the core's point of view.

use std::collections::HashMap;

use crate::types::{Coupon, CouponCode};

// =============================================================================
// Traits
// =============================================================================

/// Finds coupon definitions by normalized code.
pub trait CouponCatalog {
    /// Returns the coupon for `code`, or `None` when it does not exist.
    fn find_coupon(&self, code: &CouponCode) -> Option<Coupon>;
}

/// Reports how often a user has already redeemed a coupon.
///
/// Reads are not atomic with order placement: two concurrent checkouts can
/// both see a count below the limit. The order writer re-checks the count
/// inside its transaction.
pub trait UsageLookup {
    /// Completed redemptions of `code` by `user_id`.
    fn redemptions(&self, user_id: &str, code: &CouponCode) -> u32;
}

impl<T: CouponCatalog + ?Sized> CouponCatalog for &T {
    fn find_coupon(&self, code: &CouponCode) -> Option<Coupon> {
        (**self).find_coupon(code)
    }
}

// =============================================================================
// In-Memory Implementations
// =============================================================================

/// A set of coupons keyed by normalized code.
#[derive(Debug, Clone, Default)]
pub struct CouponBook {
    coupons: HashMap<CouponCode, Coupon>,
}

impl CouponBook {
    pub fn new() -> Self {
        CouponBook::default()
    }

    /// Adds or replaces a coupon. The key is re-normalized so a coupon
    /// built with a lowercase code is still found.
    pub fn insert(&mut self, coupon: Coupon) {
        let key = CouponCode::normalize(coupon.code.as_str());
        self.coupons.insert(key, coupon);
    }

    pub fn with(mut self, coupon: Coupon) -> Self {
        self.insert(coupon);
        self
    }

    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }
}

impl CouponCatalog for CouponBook {
    fn find_coupon(&self, code: &CouponCode) -> Option<Coupon> {
        self.coupons.get(code).cloned()
    }
}

impl CouponCatalog for HashMap<CouponCode, Coupon> {
    fn find_coupon(&self, code: &CouponCode) -> Option<Coupon> {
        self.get(code).cloned()
    }
}

impl FromIterator<Coupon> for CouponBook {
    fn from_iter<I: IntoIterator<Item = Coupon>>(iter: I) -> Self {
        let mut book = CouponBook::new();
        for coupon in iter {
            book.insert(coupon);
        }
        book
    }
}

/// Redemption counts keyed by user and code.
#[derive(Debug, Clone, Default)]
pub struct UsageHistory {
    counts: HashMap<(String, CouponCode), u32>,
}

impl UsageHistory {
    pub fn new() -> Self {
        UsageHistory::default()
    }

    /// Records one completed redemption.
    pub fn record(&mut self, user_id: impl Into<String>, code: &CouponCode) {
        *self
            .counts
            .entry((user_id.into(), code.clone()))
            .or_insert(0) += 1;
    }

    /// Sets the count outright (used when loading from storage).
    pub fn set(&mut self, user_id: impl Into<String>, code: &CouponCode, count: u32) {
        self.counts.insert((user_id.into(), code.clone()), count);
    }
}

impl UsageLookup for UsageHistory {
    fn redemptions(&self, user_id: &str, code: &CouponCode) -> u32 {
        self.counts
            .get(&(user_id.to_string(), code.clone()))
            .copied()
            .unwrap_or(0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::DiscountRule;
    use chrono::{Duration, Utc};

    fn coupon(code: &str) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: CouponCode::normalize(code),
            rule: DiscountRule::Flat {
                amount: Money::from_rupees(100),
            },
            min_cart_total: Money::zero(),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            per_user_limit: None,
            is_active: true,
        }
    }

    #[test]
    fn test_coupon_book_lookup_is_by_normalized_code() {
        let book: CouponBook = vec![coupon("save10"), coupon("FLAT500")].into_iter().collect();

        assert_eq!(book.len(), 2);
        assert!(book.find_coupon(&CouponCode::normalize("Save10")).is_some());
        assert!(book.find_coupon(&CouponCode::normalize("nope")).is_none());
    }

    #[test]
    fn test_usage_history_counts() {
        let code = CouponCode::normalize("FIRST");
        let mut history = UsageHistory::new();

        assert_eq!(history.redemptions("u1", &code), 0);
        history.record("u1", &code);
        history.record("u1", &code);
        assert_eq!(history.redemptions("u1", &code), 2);
        assert_eq!(history.redemptions("u2", &code), 0);

        history.set("u2", &code, 5);
        assert_eq!(history.redemptions("u2", &code), 5);
    }

    #[test]
    fn test_plain_hash_map_is_a_catalog() {
        let mut map = HashMap::new();
        map.insert(CouponCode::normalize("WELCOME"), coupon("WELCOME"));

        assert!(map.find_coupon(&CouponCode::normalize("welcome")).is_some());
        assert!(map.find_coupon(&CouponCode::normalize("other")).is_none());
    }
}
