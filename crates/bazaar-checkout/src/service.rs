//! # Checkout Service
//!
//! Glue between the pricing core and the database: every method fetches
//! what the core needs, calls the core, and hands the result back.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  apply_coupon(session, "flat500")                                       │
//! │       │                                                                 │
//! │       ├── inventory().snapshot_for(cart)  ──► reconcile ──► subtotal    │
//! │       ├── coupons().find_by_code(FLAT500)                               │
//! │       ├── coupons().count_user_redemptions(user, FLAT500)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  evaluate_coupon(..)  (pure, bazaar-core)                               │
//! │       │                                                                 │
//! │       ├── Ok  ──► session.set_coupon(..)                                │
//! │       └── Err ──► selection untouched, rejection reported               │
//! │                                                                         │
//! │  place_order(session)                                                   │
//! │       │                                                                 │
//! │       ├── re-price (coupon re-checked against the fresh subtotal)       │
//! │       └── orders().place_order(..)  (one transaction, see bazaar-db)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The service holds no per-shopper state. Sessions are owned by the
//! caller and passed in on every call.

use bazaar_core::discount::{evaluate_coupon, max_usable_points};
use bazaar_core::validation::{validate_coupon_code, validate_user_id};
use bazaar_core::{
    CheckoutSession, CouponApplication, CouponCode, CouponRejection, CouponResult, InventorySnapshot,
    Money, PointsApplication, Quote,
};
use bazaar_db::{Database, DbConfig, NewOrder, Order};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::CheckoutConfig;
use crate::error::{ApiError, ApiResult, ErrorCode};

/// Checkout operations over a [`Database`].
#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
    delivery_fee_override: Option<Money>,
}

impl CheckoutService {
    /// Creates a service that reads the delivery fee from the settings table.
    pub fn new(db: Database) -> Self {
        CheckoutService {
            db,
            delivery_fee_override: None,
        }
    }

    /// Uses a fixed delivery fee instead of the stored setting.
    pub fn with_delivery_fee(mut self, fee: Money) -> Self {
        self.delivery_fee_override = Some(fee.floor_at_zero());
        self
    }

    /// Opens the configured database and builds a service on it.
    pub async fn connect(config: &CheckoutConfig) -> ApiResult<Self> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ApiError::internal(format!("Cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let db = Database::new(DbConfig::new(&config.database_path)).await?;
        let service = CheckoutService {
            db,
            delivery_fee_override: config.delivery_fee,
        };

        info!(path = %config.database_path.display(), "Checkout service ready");
        Ok(service)
    }

    /// Underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The fee added to every order.
    pub async fn delivery_fee(&self) -> ApiResult<Money> {
        match self.delivery_fee_override {
            Some(fee) => Ok(fee),
            None => Ok(self.db.settings().delivery_fee().await?),
        }
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    /// Prices the session's cart against current stock.
    ///
    /// A coupon that no longer qualifies (e.g. the cart fell below its
    /// minimum) is dropped; a points redemption larger than the new
    /// subtotal is dropped too and reported on the quote.
    pub async fn quote(&self, session: &mut CheckoutSession) -> ApiResult<Quote> {
        let inventory = self.snapshot(session).await?;
        let subtotal = session.reconcile(&inventory)?.subtotal();

        if let Err(rejection) = self.refresh_coupon(session, subtotal).await? {
            warn!(reason = rejection.reason_code(), "Dropping coupon that no longer applies");
            session.remove_coupon();
        }

        let fee = self.delivery_fee().await?;
        let quote = session.quote(&inventory, fee)?;

        if quote.has_shortfall {
            warn!(user_id = ?session.user_id(), "Cart has lines short on stock");
        }
        if let Some(dropped) = &quote.dropped_coupon {
            warn!(code = %dropped.code, "Dropped coupon below its minimum");
        }
        if let Some(dropped) = &quote.dropped_points {
            warn!(points = dropped.points_used, "Dropped points redemption above subtotal");
        }

        debug!(
            subtotal = %quote.breakdown.subtotal,
            payable = %quote.breakdown.payable,
            state = ?quote.selection,
            "Quoted cart"
        );
        Ok(quote)
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// Validates a coupon code for the session and applies it when valid.
    ///
    /// Rejections are not errors: they come back as a [`CouponResult`] with
    /// `valid == false` and the session keeps its previous selection.
    pub async fn apply_coupon(
        &self,
        session: &mut CheckoutSession,
        raw_code: &str,
    ) -> ApiResult<CouponResult> {
        let code = CouponCode::normalize(raw_code);
        let subtotal = self.subtotal(session).await?;

        let outcome = self.evaluate(shopper(session)?, &code, subtotal).await?;
        let result = CouponResult::from_outcome(&code, &outcome);

        match outcome {
            Ok(applied) => {
                info!(code = %applied.code, discount = %applied.discount, "Coupon applied");
                session.set_coupon(applied);
            }
            Err(rejection) => {
                warn!(code = %code, reason = rejection.reason_code(), "Coupon rejected");
            }
        }

        Ok(result)
    }

    /// Removes the applied coupon. Removing nothing is a no-op.
    pub fn remove_coupon(&self, session: &mut CheckoutSession) -> Option<CouponApplication> {
        let removed = session.remove_coupon();
        if let Some(coupon) = &removed {
            debug!(code = %coupon.code, "Coupon removed");
        }
        removed
    }

    // =========================================================================
    // Reward Points
    // =========================================================================

    /// Points the shopper could redeem right now.
    pub async fn max_usable_points(&self, session: &CheckoutSession) -> ApiResult<i64> {
        let Some(user_id) = shopper(session)? else {
            return Ok(0);
        };
        let available = self.db.rewards().available_points(user_id).await?;
        let subtotal = self.subtotal(session).await?;
        Ok(max_usable_points(available, subtotal))
    }

    /// Redeems `requested` points against the cart.
    pub async fn apply_points(
        &self,
        session: &mut CheckoutSession,
        requested: i64,
    ) -> ApiResult<PointsApplication> {
        let user_id = signed_in(session)?.to_string();
        let available = self.db.rewards().available_points(&user_id).await?;
        let subtotal = self.subtotal(session).await?;

        let applied = session.apply_points(requested, available, subtotal)?;
        info!(%user_id, points = applied.points_used, discount = %applied.discount, "Points applied");
        Ok(applied)
    }

    /// Redeems as many points as the balance and the subtotal allow.
    ///
    /// Returns `None` when nothing can be redeemed (guest, empty balance or
    /// empty cart); the selection is left unchanged then.
    pub async fn use_max_points(
        &self,
        session: &mut CheckoutSession,
    ) -> ApiResult<Option<PointsApplication>> {
        let Some(user_id) = shopper(session)?.map(str::to_string) else {
            return Ok(None);
        };
        let available = self.db.rewards().available_points(&user_id).await?;
        let subtotal = self.subtotal(session).await?;

        let max = max_usable_points(available, subtotal);
        if max <= 0 {
            debug!(%user_id, available, "No points redeemable");
            return Ok(None);
        }

        let applied = session.apply_points(max, available, subtotal)?;
        info!(%user_id, points = applied.points_used, "Max points applied");
        Ok(Some(applied))
    }

    /// Removes the points redemption. Removing nothing is a no-op.
    pub fn remove_points(&self, session: &mut CheckoutSession) -> Option<PointsApplication> {
        let removed = session.remove_points();
        if let Some(points) = &removed {
            debug!(points = points.points_used, "Points removed");
        }
        removed
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Re-prices the cart and writes the order.
    ///
    /// Unlike [`quote`](Self::quote), a coupon that stopped qualifying or
    /// points that no longer fit the subtotal are an error here: the
    /// shopper must see the new total before paying it. The stale discount
    /// is removed from the session and nothing is written.
    /// On success the session's cart and selection are cleared.
    pub async fn place_order(&self, session: &mut CheckoutSession) -> ApiResult<Order> {
        if session.cart().is_empty() {
            return Err(ApiError::new(ErrorCode::EmptyCart, "Your cart is empty"));
        }
        let user_id = shopper(session)?.map(str::to_string);

        let inventory = self.snapshot(session).await?;
        let subtotal = session.reconcile(&inventory)?.subtotal();

        if let Err(rejection) = self.refresh_coupon(session, subtotal).await? {
            session.remove_coupon();
            return Err(rejection.into());
        }

        let fee = self.delivery_fee().await?;
        let quote = session.quote(&inventory, fee)?;

        if let Some(dropped) = quote.dropped_points {
            warn!(points = dropped.points_used, subtotal = %quote.breakdown.subtotal, "Refusing order with stale points");
            return Err(ApiError::new(
                ErrorCode::InvalidPoints,
                format!(
                    "Your cart total is now {}; {} points no longer fit. Review the new total and apply points again",
                    quote.breakdown.subtotal, dropped.points_used
                ),
            )
            .with_reason("POINTS_EXCEED_SUBTOTAL"));
        }

        let new_order = NewOrder {
            user_id,
            lines: quote.lines,
            breakdown: quote.breakdown,
        };

        let order = self.db.orders().place_order(&new_order).await?;
        session.reset();

        info!(order_id = %order.id, payable = %order.breakdown.payable, "Checkout complete");
        Ok(order)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn snapshot(&self, session: &CheckoutSession) -> ApiResult<InventorySnapshot> {
        Ok(self.db.inventory().snapshot_for(session.cart().lines()).await?)
    }

    async fn subtotal(&self, session: &CheckoutSession) -> ApiResult<Money> {
        let inventory = self.snapshot(session).await?;
        Ok(session.reconcile(&inventory)?.subtotal())
    }

    /// Fetches the coupon and usage count, then runs the coupon rules.
    async fn evaluate(
        &self,
        user_id: Option<&str>,
        code: &CouponCode,
        subtotal: Money,
    ) -> ApiResult<Result<CouponApplication, CouponRejection>> {
        // Malformed codes can't exist in the table; skip the lookup.
        let coupon = if validate_coupon_code(code.as_str()).is_ok() {
            self.db.coupons().find_by_code(code).await?
        } else {
            None
        };

        let prior = match (user_id, &coupon) {
            (Some(user_id), Some(_)) => {
                Some(self.db.coupons().count_user_redemptions(user_id, code).await?)
            }
            _ => None,
        };

        Ok(evaluate_coupon(code, coupon.as_ref(), subtotal, prior, Utc::now()))
    }

    /// Re-runs the coupon rules for the selected coupon at `subtotal` and
    /// stores the fresh discount. `Ok(Ok(()))` when nothing is selected.
    async fn refresh_coupon(
        &self,
        session: &mut CheckoutSession,
        subtotal: Money,
    ) -> ApiResult<Result<(), CouponRejection>> {
        let Some(code) = session.selection().coupon().map(|c| c.code.clone()) else {
            return Ok(Ok(()));
        };

        match self.evaluate(shopper(session)?, &code, subtotal).await? {
            Ok(applied) => {
                session.set_coupon(applied);
                Ok(Ok(()))
            }
            Err(rejection) => Ok(Err(rejection)),
        }
    }
}

/// The session's user id, checked before it reaches a query. Guests are `None`.
fn shopper(session: &CheckoutSession) -> ApiResult<Option<&str>> {
    match session.user_id() {
        Some(user_id) => {
            validate_user_id(user_id).map_err(|e| ApiError::new(ErrorCode::ValidationError, e.to_string()))?;
            Ok(Some(user_id))
        }
        None => Ok(None),
    }
}

fn signed_in(session: &CheckoutSession) -> ApiResult<&str> {
    shopper(session)?.ok_or_else(|| {
        ApiError::new(ErrorCode::InvalidPoints, "Sign in to redeem reward points")
            .with_reason("GUEST_CHECKOUT")
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
