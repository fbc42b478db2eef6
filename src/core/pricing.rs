//! Pricing rules shared by the cart page and checkout.
//!
//! All amounts are integer minor units (cents/paise) so totals add up exactly.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// Flat shipping surcharge waived above a subtotal threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingPolicy {
    /// Subtotals strictly above this ship free
    pub free_shipping_threshold_cents: i64,
    /// Fee charged when the subtotal is at or below the threshold
    pub flat_fee_cents: i64,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold_cents: 50_00,
            flat_fee_cents: 5_99,
        }
    }
}

impl ShippingPolicy {
    /// Shipping charged for an order with the given subtotal.
    #[must_use]
    pub const fn shipping_for(&self, subtotal_cents: i64) -> i64 {
        if subtotal_cents > self.free_shipping_threshold_cents {
            0
        } else {
            self.flat_fee_cents
        }
    }

    /// Subtotal, shipping and grand total for a set of line subtotals.
    pub fn quote(&self, line_subtotals: impl IntoIterator<Item = i64>) -> Result<Quote> {
        let subtotal_cents = checked_sum(line_subtotals)?;
        let shipping_cents = self.shipping_for(subtotal_cents);
        let total_cents = subtotal_cents
            .checked_add(shipping_cents)
            .ok_or_else(|| Error::invalid_input("Order total is too large"))?;
        Ok(Quote {
            subtotal_cents,
            shipping_cents,
            total_cents,
        })
    }
}

/// The amounts shown on the cart page and stored on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Quote {
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
}

/// `quantity * unit_price_cents`, refusing to wrap.
pub fn line_subtotal(unit_price_cents: i64, quantity: i32) -> Result<i64> {
    unit_price_cents
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| Error::invalid_input("Order line amount is too large"))
}

/// Adds up amounts, refusing to wrap.
pub fn checked_sum(amounts: impl IntoIterator<Item = i64>) -> Result<i64> {
    amounts
        .into_iter()
        .try_fold(0_i64, i64::checked_add)
        .ok_or_else(|| Error::invalid_input("Order total is too large"))
}

/// Formats a minor-unit amount for display, e.g. `Rs 45.99` or `Rs -3.50`.
#[must_use]
pub fn format_amount(currency: &str, cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{currency} {sign}{}.{:02}", abs / 100, abs % 100)
}
