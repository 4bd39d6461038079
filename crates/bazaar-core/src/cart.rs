//! # Cart
//!
//! The shopper's cart as they build it, before any reconciliation.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Storefront Action        Method                  Cart Change           │
//! │  ─────────────────        ──────                  ───────────           │
//! │                                                                         │
//! │  Pick size + Add ───────► add_line() ───────────► push or merge qty    │
//! │                                                                         │
//! │  Tap "+" / "-" ─────────► increment()/decrement()► qty ± 1 (0 drops)   │
//! │                                                                         │
//! │  Type a quantity ───────► set_quantity() ───────► qty = n              │
//! │                                                                         │
//! │  Tap Remove ────────────► remove_line() ────────► line dropped         │
//! │                                                                         │
//! │  Page load ─────────────► clamp_to_stock() ─────► qty capped at stock  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed operation leaves the cart untouched.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::reconcile::InventorySnapshot;
use crate::types::CartLine;
use crate::validation::{
    validate_cart_line, validate_product_id, validate_quantity, validate_size, validate_unit_price,
};
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

/// A quantity change made by [`Cart::clamp_to_stock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub product_id: String,
    pub size: String,
    pub previous_quantity: i64,
    /// Zero when the line was dropped.
    pub new_quantity: i64,
}

impl StockAdjustment {
    pub fn was_removed(&self) -> bool {
        self.new_quantity == 0
    }
}

/// The shopping cart.
///
/// ## Invariants
/// - Lines are unique by product + size (adding again merges quantities)
/// - Every quantity is between 1 and `MAX_LINE_QUANTITY`
/// - At most `MAX_CART_LINES` lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<CartLine>,

    /// When the cart was created or last cleared.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Builds a cart from previously stored lines, e.g. a persisted cart.
    ///
    /// Stored lines are held to the same rules as [`add_line`](Self::add_line):
    /// well-formed ids and prices, quantities within `1..=MAX_LINE_QUANTITY`,
    /// no more than `MAX_CART_LINES` lines and no repeated product + size.
    pub fn from_lines(lines: Vec<CartLine>) -> CoreResult<Self> {
        if lines.len() > MAX_CART_LINES {
            return Err(CoreError::CartTooLarge { max: MAX_CART_LINES });
        }

        let mut seen = HashSet::with_capacity(lines.len());
        for line in &lines {
            validate_cart_line(line)?;
            validate_quantity(line.requested_quantity)?;
            if !seen.insert((line.product_id.as_str(), line.size.as_str())) {
                return Err(ValidationError::InvalidFormat {
                    field: "cart".to_string(),
                    reason: format!("{} (size {}) appears twice", line.product_id, line.size),
                }
                .into());
            }
        }

        Ok(Cart {
            lines,
            created_at: Utc::now(),
        })
    }

    /// Adds a product + size, or increases the quantity if already present.
    ///
    /// The unit price of an existing line is kept: the shopper keeps the
    /// price they first saw.
    pub fn add_line(
        &mut self,
        product_id: &str,
        size: &str,
        unit_price: Money,
        quantity: i64,
    ) -> CoreResult<()> {
        validate_product_id(product_id)?;
        validate_size(size)?;
        validate_unit_price(unit_price)?;
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity {
                product_id: product_id.to_string(),
                size: size.to_string(),
                quantity,
            });
        }

        if let Some(line) = self.find_mut(product_id, size) {
            let new_qty = line.requested_quantity + quantity;
            if new_qty > MAX_LINE_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_LINE_QUANTITY,
                });
            }
            line.requested_quantity = new_qty;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge { max: MAX_CART_LINES });
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_LINE_QUANTITY,
            });
        }

        self.lines
            .push(CartLine::new(product_id, size, unit_price, quantity));
        Ok(())
    }

    /// "+" button.
    pub fn increment(&mut self, product_id: &str, size: &str) -> CoreResult<i64> {
        let current = self.quantity_of(product_id, size)?;
        self.set_quantity(product_id, size, current + 1)?;
        Ok(current + 1)
    }

    /// "-" button. Going below one removes the line; returns the new
    /// quantity (0 when removed).
    pub fn decrement(&mut self, product_id: &str, size: &str) -> CoreResult<i64> {
        let current = self.quantity_of(product_id, size)?;
        self.set_quantity(product_id, size, current - 1)?;
        Ok(current - 1)
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn set_quantity(&mut self, product_id: &str, size: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_line(product_id, size);
        }
        if quantity < 0 {
            return Err(CoreError::InvalidQuantity {
                product_id: product_id.to_string(),
                size: size.to_string(),
                quantity,
            });
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_LINE_QUANTITY,
            });
        }

        let line = self
            .find_mut(product_id, size)
            .ok_or_else(|| not_in_cart(product_id, size))?;
        line.requested_quantity = quantity;
        Ok(())
    }

    /// Removes a line.
    pub fn remove_line(&mut self, product_id: &str, size: &str) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| !l.matches(product_id, size));

        if self.lines.len() == initial_len {
            Err(not_in_cart(product_id, size))
        } else {
            Ok(())
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.created_at = Utc::now();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.requested_quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Caps every line at the stock in `inventory`, dropping lines with
    /// nothing left, and reports what changed.
    ///
    /// Used when the cart page loads so the quantity pickers never show
    /// more than can be shipped.
    pub fn clamp_to_stock(&mut self, inventory: &InventorySnapshot) -> Vec<StockAdjustment> {
        let mut adjustments = Vec::new();

        for line in &mut self.lines {
            let stock = inventory.available(&line.product_id, &line.size);
            if line.requested_quantity > stock {
                adjustments.push(StockAdjustment {
                    product_id: line.product_id.clone(),
                    size: line.size.clone(),
                    previous_quantity: line.requested_quantity,
                    new_quantity: stock.max(0),
                });
                line.requested_quantity = stock.max(0);
            }
        }

        self.lines.retain(|l| l.requested_quantity > 0);
        adjustments
    }

    fn find_mut(&mut self, product_id: &str, size: &str) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.matches(product_id, size))
    }

    fn quantity_of(&self, product_id: &str, size: &str) -> CoreResult<i64> {
        self.lines
            .iter()
            .find(|l| l.matches(product_id, size))
            .map(|l| l.requested_quantity)
            .ok_or_else(|| not_in_cart(product_id, size))
    }
}

fn not_in_cart(product_id: &str, size: &str) -> CoreError {
    CoreError::LineNotInCart {
        product_id: product_id.to_string(),
        size: size.to_string(),
    }
}
