//! # Cart Reconciler
//!
//! Checks cart lines against a point-in-time inventory snapshot and works
//! out how much of each line can actually be fulfilled.
//!
//! ## Where It Sits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart (requested)            Inventory snapshot                         │
//! │  kurta-01 / M  × 5           (kurta-01, M) → 2                          │
//! │  saree-07 / Free × 1         (saree-07, Free) → 9                       │
//! │        │                            │                                   │
//! │        └───────────┬────────────────┘                                   │
//! │                    ▼                                                    │
//! │              reconcile() ← THIS MODULE                                  │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │  kurta-01 / M    fulfillable 2 (short by 3)                             │
//! │  saree-07 / Free fulfillable 1                                          │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │  subtotal ── the ONLY basis for coupons, points and totals             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The snapshot is never written back: stock is decremented by the order
//! writer at confirmation time, not while the shopper is browsing.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CartLine, ReconciledLine};
use crate::validation::validate_cart_line;

// =============================================================================
// Inventory Snapshot
// =============================================================================

/// Available stock per `(product_id, size)`, read once per reconciliation.
///
/// Unknown pairs read as zero stock so the storefront never oversells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySnapshot {
    stock: HashMap<(String, String), i64>,
}

impl InventorySnapshot {
    /// Creates an empty snapshot (everything out of stock).
    pub fn new() -> Self {
        InventorySnapshot::default()
    }

    /// Records the stock for a product + size. Negative values are stored
    /// as zero.
    pub fn insert(&mut self, product_id: impl Into<String>, size: impl Into<String>, stock: i64) {
        self.stock
            .insert((product_id.into(), size.into()), stock.max(0));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_stock(
        mut self,
        product_id: impl Into<String>,
        size: impl Into<String>,
        stock: i64,
    ) -> Self {
        self.insert(product_id, size, stock);
        self
    }

    /// Stock for a product + size; zero when the snapshot has no entry.
    pub fn available(&self, product_id: &str, size: &str) -> i64 {
        self.stock
            .get(&(product_id.to_string(), size.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Whether the snapshot holds an entry for the pair.
    pub fn contains(&self, product_id: &str, size: &str) -> bool {
        self.stock
            .contains_key(&(product_id.to_string(), size.to_string()))
    }

    /// Number of pairs in the snapshot.
    pub fn len(&self) -> usize {
        self.stock.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }
}

impl<P, S> FromIterator<(P, S, i64)> for InventorySnapshot
where
    P: Into<String>,
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (P, S, i64)>>(iter: I) -> Self {
        let mut snapshot = InventorySnapshot::new();
        for (product_id, size, stock) in iter {
            snapshot.insert(product_id, size, stock);
        }
        snapshot
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Output of [`reconcile`]: one line per input line, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    lines: Vec<ReconciledLine>,
    subtotal: Money,
}

impl Reconciliation {
    /// The reconciled lines.
    pub fn lines(&self) -> &[ReconciledLine] {
        &self.lines
    }

    /// Consumes the reconciliation, returning its lines.
    pub fn into_lines(self) -> Vec<ReconciledLine> {
        self.lines
    }

    /// Sum of fulfillable line totals.
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    /// Total units that can be shipped.
    pub fn fulfillable_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.fulfillable_quantity).sum()
    }

    /// Lines that cannot be fully fulfilled.
    pub fn shortfalls(&self) -> impl Iterator<Item = &ReconciledLine> {
        self.lines.iter().filter(|l| l.is_short)
    }

    /// Whether any line is short.
    pub fn has_shortfall(&self) -> bool {
        self.lines.iter().any(|l| l.is_short)
    }

    /// Whether the cart was empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Reconciles cart lines against an inventory snapshot.
///
/// ## Rules
/// - `fulfillable = min(requested, stock)`, stock 0 for unknown pairs
/// - Lines sharing a product + size draw from the same stock, earlier
///   lines first, so the combined fulfillable quantity never exceeds it
/// - Empty input yields an empty reconciliation
/// - A non-positive requested quantity is rejected with
///   [`CoreError::InvalidQuantity`]; it is a caller defect, not a shortage
/// - A negative unit price, a blank product id or size, or a line total
///   too large for i64 is rejected with [`CoreError::Validation`]
///
/// ## Example
/// ```rust
/// use bazaar_core::{reconcile, CartLine, InventorySnapshot, Money};
///
/// let lines = vec![CartLine::new("kurta-01", "M", Money::from_rupees(500), 5)];
/// let stock = InventorySnapshot::new().with_stock("kurta-01", "M", 2);
///
/// let result = reconcile(&lines, &stock).unwrap();
/// assert_eq!(result.lines()[0].fulfillable_quantity, 2);
/// assert!(result.lines()[0].is_short);
/// assert_eq!(result.subtotal(), Money::from_rupees(1000));
/// ```
pub fn reconcile(lines: &[CartLine], inventory: &InventorySnapshot) -> CoreResult<Reconciliation> {
    let mut consumed: HashMap<(&str, &str), i64> = HashMap::new();
    let mut reconciled = Vec::with_capacity(lines.len());
    let mut subtotal = Money::zero();

    for line in lines {
        if line.requested_quantity <= 0 {
            return Err(CoreError::InvalidQuantity {
                product_id: line.product_id.clone(),
                size: line.size.clone(),
                quantity: line.requested_quantity,
            });
        }
        validate_cart_line(line)?;

        let key = (line.product_id.as_str(), line.size.as_str());
        let stock = inventory.available(&line.product_id, &line.size);
        let already_taken = consumed.get(&key).copied().unwrap_or(0);
        let remaining = (stock - already_taken).max(0);

        let fulfillable = line.requested_quantity.min(remaining);
        *consumed.entry(key).or_insert(0) += fulfillable;

        let line_total = line
            .unit_price
            .checked_multiply_quantity(fulfillable)
            .ok_or_else(|| too_large("line total"))?;
        subtotal = subtotal
            .checked_add(line_total)
            .ok_or_else(|| too_large("subtotal"))?;

        reconciled.push(ReconciledLine {
            product_id: line.product_id.clone(),
            size: line.size.clone(),
            unit_price: line.unit_price,
            requested_quantity: line.requested_quantity,
            available_stock: stock,
            fulfillable_quantity: fulfillable,
            is_short: fulfillable < line.requested_quantity,
            line_total,
        });
    }

    Ok(Reconciliation {
        lines: reconciled,
        subtotal,
    })
}

fn too_large(field: &str) -> CoreError {
    CoreError::Validation(ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
