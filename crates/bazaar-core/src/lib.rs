//! # bazaar-core: Pure Checkout Pricing for Bazaar
//!
//! This crate is the pricing heart of the Bazaar storefront. It reconciles
//! carts against stock, validates coupons and reward points, and folds the
//! results into a payable total, all as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bazaar Checkout Flow                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Storefront UI (event handlers)                  │   │
//! │  │   Page load ──► "Apply coupon" ──► "Use points" ──► Place order │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bazaar-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────┐   ┌────────────┐   ┌────────────┐             │   │
//! │  │   │ reconcile  │──►│  discount  │──►│   total    │             │   │
//! │  │   │ stock caps │   │ coupon/pts │   │  payable   │             │   │
//! │  │   └────────────┘   └────────────┘   └────────────┘             │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            bazaar-db (coupons, stock, points, orders)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer paise arithmetic
//! - [`types`] - Domain types (CartLine, Coupon, DeliveryFeePolicy, ...)
//! - [`cart`] - Shopper-side cart manipulation
//! - [`reconcile`] - Cart Reconciler (stock-aware quantities)
//! - [`discount`] - Discount Resolver (coupons and reward points)
//! - [`total`] - Total Calculator
//! - [`selection`] - Per-session discount selection state
//! - [`session`] - Explicit checkout session context
//! - [`lookup`] - Contracts for coupon and usage lookups
//! - [`validation`] - Boundary input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use bazaar_core::money::Money;
//! use bazaar_core::total::compute_total;
//!
//! let breakdown = compute_total(
//!     Money::from_rupees(2500),
//!     Money::from_rupees(500),
//!     Money::zero(),
//!     Money::from_rupees(100),
//! );
//! assert_eq!(breakdown.payable, Money::from_rupees(2100));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod discount;
pub mod error;
pub mod lookup;
pub mod money;
pub mod reconcile;
pub mod selection;
pub mod session;
pub mod total;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, StockAdjustment};
pub use discount::{CouponApplication, CouponResult, DiscountResolver, PointsApplication};
pub use error::{CoreError, CoreResult, CouponRejection, ValidationError};
pub use money::Money;
pub use reconcile::{reconcile, InventorySnapshot, Reconciliation};
pub use selection::{DiscountSelection, SelectionState};
pub use session::{CheckoutSession, Quote, Revalidation};
pub use total::{compute_total, TotalBreakdown};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Value of one reward point in paise (1 point = ₹1).
pub const POINT_VALUE_PAISE: i64 = 100;

/// Maximum distinct lines (product + size) allowed in a cart.
pub const MAX_CART_LINES: usize = 50;

/// Maximum quantity of a single product + size in the cart.
///
/// ## Business Reason
/// Storefront quantity pickers stop at 10; anything above is a bulk order.
pub const MAX_LINE_QUANTITY: i64 = 10;
