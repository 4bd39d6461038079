//! # Discount Resolver
//!
//! Validates coupon codes and reward-point redemptions against the
//! reconciled cart subtotal.
//!
//! ## Coupon Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Shopper types "flat500" and taps Apply                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  normalize → "FLAT500"                                                  │
//! │       │                                                                 │
//! │       ├── (a) exists?              no  → NotFound                       │
//! │       ├── (a) active?              no  → Inactive                       │
//! │       ├── (b) inside window?       no  → NotStarted / Expired           │
//! │       ├── (c) subtotal >= minimum? no  → MinimumNotMet                  │
//! │       ├── (d) user under limit?    no  → UsageLimitExceeded             │
//! │       │        (only when a user id is known)                           │
//! │       ▼                                                                 │
//! │  CouponApplication { code, discount <= subtotal, message }              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Points Path
//! One point is worth ₹1. A redemption must be positive, within the
//! balance, and within the subtotal. [`max_usable_points`] is the
//! "Use maximum" action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, CouponRejection};
use crate::lookup::{CouponCatalog, UsageLookup};
use crate::money::Money;
use crate::types::{checked_points_to_money, money_to_points, Coupon, CouponCode, DiscountRule};

// =============================================================================
// Results
// =============================================================================

/// A coupon that passed every check.
///
/// Carries the rule and minimum it was priced with, so the discount can
/// follow the subtotal when the cart changes after the coupon was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CouponApplication {
    pub code: CouponCode,
    pub discount: Money,
    pub message: String,
    pub rule: DiscountRule,
    pub min_cart_total: Money,
}

impl CouponApplication {
    fn priced(code: &CouponCode, rule: DiscountRule, min_cart_total: Money, subtotal: Money) -> Self {
        let discount = rule.discount_for(subtotal);
        CouponApplication {
            code: code.clone(),
            discount,
            message: format!("Coupon {} applied: you save {}", code, discount),
            rule,
            min_cart_total,
        }
    }

    /// Prices the same coupon against a new subtotal.
    ///
    /// Only the minimum is re-checked; window, status and usage limit need
    /// the catalog and go through [`evaluate_coupon`] again.
    ///
    /// ```rust
    /// use bazaar_core::lookup::CouponBook;
    /// use bazaar_core::{Coupon, CouponCode, DiscountResolver, DiscountRule, Money};
    /// use chrono::{Duration, Utc};
    ///
    /// let now = Utc::now();
    /// let book = CouponBook::new().with(Coupon {
    ///     code: CouponCode::normalize("FEST20"),
    ///     rule: DiscountRule::Percentage { bps: 2000, cap: None },
    ///     min_cart_total: Money::from_rupees(1000),
    ///     valid_from: now - Duration::days(1),
    ///     valid_until: now + Duration::days(1),
    ///     per_user_limit: None,
    ///     is_active: true,
    /// });
    /// let applied = DiscountResolver::new(book)
    ///     .apply_coupon("FEST20", Money::from_rupees(4000), None, None)
    ///     .unwrap();
    ///
    /// let smaller = applied.reprice(Money::from_rupees(2000)).unwrap();
    /// assert_eq!(smaller.discount, Money::from_rupees(400));
    /// assert!(applied.reprice(Money::from_rupees(500)).is_err());
    /// ```
    pub fn reprice(&self, subtotal: Money) -> Result<CouponApplication, CouponRejection> {
        if subtotal < self.min_cart_total {
            return Err(CouponRejection::MinimumNotMet {
                code: self.code.to_string(),
                minimum: self.min_cart_total,
                subtotal,
            });
        }
        Ok(CouponApplication::priced(&self.code, self.rule, self.min_cart_total, subtotal))
    }
}

/// A validated reward-point redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PointsApplication {
    pub points_used: i64,
    pub discount: Money,
}

/// Flat `{valid, discount, message}` view of a coupon attempt for the UI.
///
/// ```json
/// { "valid": false, "code": "FLAT500", "discount": 0,
///   "message": "Coupon FLAT500 requires a minimum cart total of ₹3000.00 ...",
///   "reason": "COUPON_MINIMUM_NOT_MET" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CouponResult {
    pub valid: bool,
    pub code: String,
    pub discount: Money,
    pub message: String,
    /// Machine-readable rejection reason; `None` when valid.
    pub reason: Option<String>,
}

impl CouponResult {
    /// Builds the UI view of a coupon attempt.
    pub fn from_outcome(code: &CouponCode, outcome: &Result<CouponApplication, CouponRejection>) -> Self {
        match outcome {
            Ok(applied) => CouponResult {
                valid: true,
                code: applied.code.to_string(),
                discount: applied.discount,
                message: applied.message.clone(),
                reason: None,
            },
            Err(rejection) => CouponResult {
                valid: false,
                code: code.to_string(),
                discount: Money::zero(),
                message: rejection.to_string(),
                reason: Some(rejection.reason_code().to_string()),
            },
        }
    }
}

// =============================================================================
// Coupon Evaluation
// =============================================================================

/// Runs the ordered coupon checks against an already-fetched definition.
///
/// This is the whole coupon rule set; [`DiscountResolver`] only adds the
/// lookup in front of it. Callers that fetch coupons and usage counts
/// asynchronously call this directly.
///
/// `prior_redemptions` is `None` for guest checkout, which skips the
/// per-user limit.
pub fn evaluate_coupon(
    code: &CouponCode,
    coupon: Option<&Coupon>,
    subtotal: Money,
    prior_redemptions: Option<u32>,
    now: DateTime<Utc>,
) -> Result<CouponApplication, CouponRejection> {
    let name = code.to_string();

    let coupon = coupon.ok_or_else(|| CouponRejection::NotFound { code: name.clone() })?;

    if !coupon.is_active {
        return Err(CouponRejection::Inactive { code: name });
    }

    if now < coupon.valid_from {
        return Err(CouponRejection::NotStarted {
            code: name,
            starts_at: coupon.valid_from,
        });
    }
    if now > coupon.valid_until {
        return Err(CouponRejection::Expired {
            code: name,
            expired_at: coupon.valid_until,
        });
    }

    if subtotal < coupon.min_cart_total {
        return Err(CouponRejection::MinimumNotMet {
            code: name,
            minimum: coupon.min_cart_total,
            subtotal,
        });
    }

    if let (Some(limit), Some(used)) = (coupon.per_user_limit, prior_redemptions) {
        if used >= limit {
            return Err(CouponRejection::UsageLimitExceeded { code: name, limit });
        }
    }

    Ok(CouponApplication::priced(code, coupon.rule, coupon.min_cart_total, subtotal))
}

/// Coupon validation backed by a [`CouponCatalog`].
///
/// ## Usage
/// ```rust
/// use bazaar_core::lookup::CouponBook;
/// use bazaar_core::{Coupon, CouponCode, DiscountResolver, DiscountRule, Money};
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let book = CouponBook::new().with(Coupon {
///     code: CouponCode::normalize("FLAT500"),
///     rule: DiscountRule::Flat { amount: Money::from_rupees(500) },
///     min_cart_total: Money::from_rupees(2000),
///     valid_from: now - Duration::days(1),
///     valid_until: now + Duration::days(1),
///     per_user_limit: None,
///     is_active: true,
/// });
///
/// let resolver = DiscountResolver::new(book);
/// let applied = resolver
///     .apply_coupon("flat500", Money::from_rupees(2500), None, None)
///     .unwrap();
/// assert_eq!(applied.discount, Money::from_rupees(500));
/// ```
#[derive(Debug, Clone)]
pub struct DiscountResolver<C> {
    catalog: C,
}

impl<C: CouponCatalog> DiscountResolver<C> {
    pub fn new(catalog: C) -> Self {
        DiscountResolver { catalog }
    }

    /// Validates a coupon at the current time.
    pub fn apply_coupon(
        &self,
        code: &str,
        subtotal: Money,
        user_id: Option<&str>,
        usage: Option<&dyn UsageLookup>,
    ) -> Result<CouponApplication, CouponRejection> {
        self.apply_coupon_at(code, subtotal, user_id, usage, Utc::now())
    }

    /// Validates a coupon at an explicit instant.
    ///
    /// The per-user limit is only enforced when both `user_id` and `usage`
    /// are supplied.
    pub fn apply_coupon_at(
        &self,
        code: &str,
        subtotal: Money,
        user_id: Option<&str>,
        usage: Option<&dyn UsageLookup>,
        now: DateTime<Utc>,
    ) -> Result<CouponApplication, CouponRejection> {
        let code = CouponCode::normalize(code);
        let coupon = self.catalog.find_coupon(&code);

        let prior = match (user_id, usage) {
            (Some(user), Some(usage)) => Some(usage.redemptions(user, &code)),
            _ => None,
        };

        evaluate_coupon(&code, coupon.as_ref(), subtotal, prior, now)
    }

    /// Same as [`apply_coupon`](Self::apply_coupon), flattened for the UI.
    pub fn check_coupon(
        &self,
        code: &str,
        subtotal: Money,
        user_id: Option<&str>,
        usage: Option<&dyn UsageLookup>,
    ) -> CouponResult {
        let outcome = self.apply_coupon(code, subtotal, user_id, usage);
        CouponResult::from_outcome(&CouponCode::normalize(code), &outcome)
    }
}

// =============================================================================
// Points
// =============================================================================

/// Largest redemption the shopper can make: `min(balance, subtotal)`,
/// with the subtotal counted in whole rupees.
///
/// ```rust
/// use bazaar_core::discount::max_usable_points;
/// use bazaar_core::Money;
///
/// assert_eq!(max_usable_points(500, Money::from_rupees(150)), 150);
/// assert_eq!(max_usable_points(80, Money::from_rupees(150)), 80);
/// ```
pub fn max_usable_points(available_points: i64, subtotal: Money) -> i64 {
    available_points.max(0).min(money_to_points(subtotal))
}

/// Validates a points redemption.
///
/// ## Rejections
/// - `requested <= 0`
/// - `requested > available_points`
/// - `requested` worth more than `subtotal`
///
/// All surface as [`CoreError::InvalidPointsRequest`].
pub fn apply_points(
    requested: i64,
    available_points: i64,
    subtotal: Money,
) -> CoreResult<PointsApplication> {
    let reject = |reason: String| CoreError::InvalidPointsRequest { requested, reason };

    if requested <= 0 {
        return Err(reject("points to use must be greater than zero".to_string()));
    }

    if requested > available_points.max(0) {
        return Err(reject(format!(
            "exceeds available balance of {} points",
            available_points.max(0)
        )));
    }

    let discount = checked_points_to_money(requested)
        .ok_or_else(|| reject("too many points to convert".to_string()))?;
    if discount > subtotal {
        return Err(reject(format!("exceeds cart subtotal of {}", subtotal)));
    }

    Ok(PointsApplication {
        points_used: requested,
        discount,
    })
}

/// Applies the largest possible redemption, or `None` when nothing can be
/// redeemed (empty balance or empty cart).
pub fn apply_max_points(available_points: i64, subtotal: Money) -> Option<PointsApplication> {
    let max = max_usable_points(available_points, subtotal);
    if max <= 0 {
        return None;
    }
    apply_points(max, available_points, subtotal).ok()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{CouponBook, UsageHistory};
    use chrono::Duration;

    fn flat500(min_rupees: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: CouponCode::normalize("FLAT500"),
            rule: DiscountRule::Flat {
                amount: Money::from_rupees(500),
            },
            min_cart_total: Money::from_rupees(min_rupees),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            per_user_limit: Some(1),
            is_active: true,
        }
    }

    fn resolver(coupon: Coupon) -> DiscountResolver<CouponBook> {
        DiscountResolver::new(CouponBook::new().with(coupon))
    }

    #[test]
    fn test_valid_coupon_yields_discount() {
        let r = resolver(flat500(2000));
        let applied = r
            .apply_coupon("FLAT500", Money::from_rupees(2500), None, None)
            .unwrap();

        assert_eq!(applied.discount, Money::from_rupees(500));
        assert_eq!(applied.code.as_str(), "FLAT500");
        assert!(applied.message.contains("₹500.00"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let r = resolver(flat500(2000));
        let lower = r.apply_coupon("flat500", Money::from_rupees(2500), None, None);
        let upper = r.apply_coupon("FLAT500", Money::from_rupees(2500), None, None);
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_unknown_coupon() {
        let r = resolver(flat500(2000));
        let err = r
            .apply_coupon("nothing", Money::from_rupees(2500), None, None)
            .unwrap_err();
        assert_eq!(
            err,
            CouponRejection::NotFound {
                code: "NOTHING".to_string()
            }
        );
    }

    #[test]
    fn test_inactive_checked_before_window() {
        let mut c = flat500(2000);
        c.is_active = false;
        c.valid_until = Utc::now() - Duration::days(30);

        let err = resolver(c)
            .apply_coupon("FLAT500", Money::from_rupees(2500), None, None)
            .unwrap_err();
        assert_eq!(err.reason_code(), "COUPON_INACTIVE");
    }

    #[test]
    fn test_window_edges() {
        let c = flat500(0);
        let r = resolver(c.clone());

        let before = r.apply_coupon_at("FLAT500", Money::from_rupees(100), None, None, c.valid_from - Duration::seconds(1));
        assert_eq!(before.unwrap_err().reason_code(), "COUPON_NOT_STARTED");

        let after = r.apply_coupon_at("FLAT500", Money::from_rupees(100), None, None, c.valid_until + Duration::seconds(1));
        assert_eq!(after.unwrap_err().reason_code(), "COUPON_EXPIRED");

        assert!(r
            .apply_coupon_at("FLAT500", Money::from_rupees(100), None, None, c.valid_until)
            .is_ok());
    }

    #[test]
    fn test_minimum_not_met_mentions_minimum() {
        let result = resolver(flat500(3000)).check_coupon("FLAT500", Money::from_rupees(2500), None, None);

        assert!(!result.valid);
        assert_eq!(result.discount, Money::zero());
        assert!(result.message.contains("minimum"));
        assert!(result.message.contains("₹3000.00"));
        assert_eq!(result.reason.as_deref(), Some("COUPON_MINIMUM_NOT_MET"));
    }

    #[test]
    fn test_usage_limit_only_with_user() {
        let r = resolver(flat500(0));
        let code = CouponCode::normalize("FLAT500");
        let mut history = UsageHistory::new();
        history.record("user-1", &code);

        let err = r
            .apply_coupon("FLAT500", Money::from_rupees(900), Some("user-1"), Some(&history))
            .unwrap_err();
        assert_eq!(err, CouponRejection::UsageLimitExceeded { code: "FLAT500".to_string(), limit: 1 });

        // Another user, and guests, are not limited by user-1's history.
        assert!(r
            .apply_coupon("FLAT500", Money::from_rupees(900), Some("user-2"), Some(&history))
            .is_ok());
        assert!(r.apply_coupon("FLAT500", Money::from_rupees(900), None, Some(&history)).is_ok());
        assert!(r.apply_coupon("FLAT500", Money::from_rupees(900), Some("user-1"), None).is_ok());
    }

    #[test]
    fn test_flat_discount_capped_at_subtotal() {
        let applied = resolver(flat500(0))
            .apply_coupon("FLAT500", Money::from_rupees(200), None, None)
            .unwrap();
        assert_eq!(applied.discount, Money::from_rupees(200));
    }

    #[test]
    fn test_percentage_coupon_with_cap() {
        let mut c = flat500(0);
        c.code = CouponCode::normalize("FEST20");
        c.rule = DiscountRule::Percentage {
            bps: 2000,
            cap: Some(Money::from_rupees(300)),
        };
        let r = resolver(c);

        let small = r.apply_coupon("fest20", Money::from_rupees(1000), None, None).unwrap();
        assert_eq!(small.discount, Money::from_rupees(200));

        let large = r.apply_coupon("fest20", Money::from_rupees(4000), None, None).unwrap();
        assert_eq!(large.discount, Money::from_rupees(300));
    }

    #[test]
    fn test_points_rejections() {
        let subtotal = Money::from_rupees(150);

        for requested in [0, -5] {
            assert!(matches!(
                apply_points(requested, 500, subtotal),
                Err(CoreError::InvalidPointsRequest { .. })
            ));
        }

        let over_balance = apply_points(60, 50, subtotal).unwrap_err();
        assert!(over_balance.to_string().contains("available balance of 50"));

        let over_subtotal = apply_points(200, 500, subtotal).unwrap_err();
        assert_eq!(
            over_subtotal,
            CoreError::InvalidPointsRequest {
                requested: 200,
                reason: "exceeds cart subtotal of ₹150.00".to_string(),
            }
        );
    }

    #[test]
    fn test_reprice_follows_subtotal() {
        let mut c = flat500(3000);
        c.code = CouponCode::normalize("FEST20");
        c.rule = DiscountRule::Percentage { bps: 2000, cap: None };
        let applied = resolver(c)
            .apply_coupon("FEST20", Money::from_rupees(4000), None, None)
            .unwrap();
        assert_eq!(applied.discount, Money::from_rupees(800));

        let again = applied.reprice(Money::from_rupees(3500)).unwrap();
        assert_eq!(again.discount, Money::from_rupees(700));
        assert!(again.message.contains("₹700.00"));

        let err = applied.reprice(Money::from_rupees(1000)).unwrap_err();
        assert_eq!(err.reason_code(), "COUPON_MINIMUM_NOT_MET");
    }

    #[test]
    fn test_points_near_i64_max_are_rejected_not_wrapped() {
        let huge = i64::MAX / 100 + 1;
        let err = apply_points(huge, i64::MAX, Money::from_paise(i64::MAX)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPointsRequest { .. }));

        // Fits in paise, still far above any subtotal.
        let err = apply_points(huge - 1, i64::MAX, Money::from_rupees(100)).unwrap_err();
        assert!(err.to_string().contains("subtotal"));
    }

    #[test]
    fn test_points_success() {
        let applied = apply_points(120, 500, Money::from_rupees(150)).unwrap();
        assert_eq!(applied.points_used, 120);
        assert_eq!(applied.discount, Money::from_rupees(120));
    }

    #[test]
    fn test_max_usable_points_is_always_accepted() {
        for available in [0_i64, 1, 80, 150, 500] {
            for rupees in [0_i64, 1, 99, 150, 2500] {
                let subtotal = Money::from_rupees(rupees);
                let max = max_usable_points(available, subtotal);
                assert_eq!(max, available.min(rupees));

                if max > 0 {
                    let applied = apply_points(max, available, subtotal).unwrap();
                    assert!(applied.discount <= subtotal);
                    assert_eq!(apply_max_points(available, subtotal), Some(applied));
                } else {
                    assert_eq!(apply_max_points(available, subtotal), None);
                }
            }
        }
    }

    #[test]
    fn test_max_points_rounds_fractional_subtotal_down() {
        assert_eq!(max_usable_points(500, Money::from_paise(15_050)), 150);
        assert_eq!(max_usable_points(-10, Money::from_rupees(150)), 0);
    }
}
