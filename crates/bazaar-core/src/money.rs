//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Paise?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In the browser:                                                        │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  A 12.5% coupon on ₹999 is ₹124.875. Where does the half paisa go?     │
//! │                                                                         │
//! │  OUR SOLUTION: Integer paise                                            │
//! │    99900 paise × 1250 bps = 12487.5 → 12488 paise (half up)            │
//! │    The rounding happens in exactly one place: percentage_of()          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bazaar_core::money::Money;
//!
//! let price = Money::from_rupees(499);     // ₹499.00
//! let line = price * 3;                    // ₹1497.00
//! let total = line + Money::from_paise(50); // ₹1497.50
//! assert_eq!(total.paise(), 149_750);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 of a rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate results such as `subtotal - discount`
///   may dip below zero before the Total Calculator floors them
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Saturating operators**: overflow clamps at the i64 bounds, so a
///   huge amount never wraps into a negative one. The `checked_*` forms
///   report overflow to callers that must reject the input
///
/// ## Where Money Flows
/// ```text
/// CartLine.unit_price ──► ReconciledLine.line_total ──► subtotal
///                                                          │
///        coupon discount, points discount, delivery fee ───┤
///                                                          ▼
///                                               TotalBreakdown.payable
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let price = Money::from_paise(49_950); // ₹499.50
    /// assert_eq!(price.paise(), 49_950);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    ///
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees(2500).paise(), 250_000);
    /// ```
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees.saturating_mul(100))
    }

    /// Like [`from_rupees`](Self::from_rupees), but `None` when the amount
    /// does not fit in paise. Use for figures typed by a person.
    ///
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// assert_eq!(Money::checked_from_rupees(12), Some(Money::from_paise(1200)));
    /// assert_eq!(Money::checked_from_rupees(i64::MAX / 10), None);
    /// ```
    #[inline]
    pub const fn checked_from_rupees(rupees: i64) -> Option<Self> {
        match rupees.checked_mul(100) {
            Some(paise) => Some(Money(paise)),
            None => None,
        }
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// For negative amounts only the rupee part should be negative:
    /// `from_major_minor(-5, 50)` is -₹5.50.
    #[inline]
    pub const fn from_major_minor(rupees: i64, paise: i64) -> Self {
        let whole = rupees.saturating_mul(100);
        if rupees < 0 {
            Money(whole.saturating_sub(paise))
        } else {
            Money(whole.saturating_add(paise))
        }
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion, truncated toward zero.
    ///
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(15_099).rupees(), 150);
    /// assert_eq!(Money::from_paise(-550).rupees(), -5);
    /// ```
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.saturating_abs())
    }

    /// Clamps negative values to zero.
    ///
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(-300).floor_at_zero(), Money::zero());
    /// assert_eq!(Money::from_paise(300).floor_at_zero().paise(), 300);
    /// ```
    #[inline]
    pub const fn floor_at_zero(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Multiplies money by a quantity, saturating at the i64 bounds.
    ///
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let line_total = Money::from_rupees(499).multiply_quantity(2);
    /// assert_eq!(line_total, Money::from_rupees(998));
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// `None` when `self × qty` overflows.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(paise) => Some(Money(paise)),
            None => None,
        }
    }

    /// `None` when the sum overflows.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(paise) => Some(Money(paise)),
            None => None,
        }
    }

    /// Returns `bps` basis points of this amount, rounded half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, widened to i128 so
    /// large carts cannot overflow.
    ///
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let subtotal = Money::from_rupees(999);
    /// // 12.5% of ₹999 = ₹124.875 → ₹124.88
    /// assert_eq!(subtotal.percentage_of(1250).paise(), 12_488);
    /// ```
    pub fn percentage_of(&self, bps: u32) -> Money {
        let part = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money::from_paise(part.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Displays money as `₹1234.50`. Locale-aware grouping is left to the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

/// Same as [`Money::multiply_quantity`].
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rupees_and_paise() {
        let money = Money::from_paise(15_099);
        assert_eq!(money.rupees(), 150);
        assert_eq!(money.paise_part(), 99);
        assert_eq!(Money::from_rupees(150), Money::from_paise(15_000));
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).paise(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).paise(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_rupees(2100).to_string(), "₹2100.00");
        assert_eq!(Money::from_paise(505).to_string(), "₹5.05");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_rupees(10);
        let b = Money::from_rupees(5);

        assert_eq!(a + b, Money::from_rupees(15));
        assert_eq!(a - b, Money::from_rupees(5));
        assert_eq!(a * 3, Money::from_rupees(30));
    }

    #[test]
    fn test_overflow_saturates_instead_of_wrapping() {
        let near_max = i64::MAX / 100;

        assert_eq!(Money::from_rupees(near_max).paise(), near_max * 100);
        assert_eq!(Money::from_rupees(near_max + 1).paise(), i64::MAX);
        assert_eq!(Money::checked_from_rupees(near_max + 1), None);

        let big = Money::from_rupees(near_max);
        assert_eq!((big * 3).paise(), i64::MAX);
        assert!((big + big).is_positive());
        assert_eq!(big.checked_multiply_quantity(3), None);
        assert_eq!(big.checked_add(big), None);
        assert_eq!(Money::from_paise(i64::MIN).abs().paise(), i64::MAX);
        assert_eq!(Money::from_paise(i64::MAX).percentage_of(20_000).paise(), i64::MAX);
    }

    #[test]
    fn test_sum() {
        let lines = [Money::from_rupees(100), Money::from_rupees(250), Money::from_paise(50)];
        let total: Money = lines.iter().sum();
        assert_eq!(total.paise(), 35_050);

        let empty: Vec<Money> = Vec::new();
        assert_eq!(empty.into_iter().sum::<Money>(), Money::zero());
    }

    #[test]
    fn test_percentage_of_rounds_half_up() {
        assert_eq!(Money::from_rupees(1000).percentage_of(1000), Money::from_rupees(100));
        assert_eq!(Money::from_paise(5).percentage_of(1000).paise(), 1); // 0.5 → 1
        assert_eq!(Money::from_rupees(500).percentage_of(0), Money::zero());
    }

    #[test]
    fn test_floor_at_zero() {
        assert_eq!(Money::from_rupees(-20).floor_at_zero(), Money::zero());
        assert_eq!(Money::zero().floor_at_zero(), Money::zero());
        assert_eq!(Money::from_rupees(20).floor_at_zero(), Money::from_rupees(20));
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_paise(1).is_positive());
        assert!(Money::from_paise(-1).is_negative());
        assert_eq!(Money::from_paise(-1).abs().paise(), 1);
    }
}
