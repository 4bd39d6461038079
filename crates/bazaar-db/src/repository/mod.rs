//! # Repository Module
//!
//! Database repositories for checkout.
//!
//! ## Read Side vs Write Side
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Pricing (read only)                 Order placement (one transaction)  │
//! │  ───────────────────                 ──────────────────────────────────  │
//! │  db.coupons().find_by_code()         db.orders().place_order()          │
//! │  db.coupons().count_user_...()         ├── inventory: decrement_stock_on│
//! │  db.inventory().snapshot_for()         ├── coupon: count_redemptions_on │
//! │  db.rewards().available_points()       └── reward: debit_points_on      │
//! │  db.settings().delivery_fee()                                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`coupon::CouponRepository`] - Coupon definitions and redemption counts
//! - [`inventory::InventoryRepository`] - Stock per product + size
//! - [`reward::RewardRepository`] - Reward point balances
//! - [`order::OrderRepository`] - Atomic order placement and lookup
//! - [`settings::SettingsRepository`] - Storefront settings (delivery fee)

pub mod coupon;
pub mod inventory;
pub mod order;
pub mod reward;
pub mod settings;
