//! Price arithmetic: product discounts, coupons and VAT.
//!
//! All amounts are `Decimal` in the store currency (USD) and are rounded to
//! cents only at the points where a customer would see them.

use rust_decimal::{Decimal, RoundingStrategy};

/// VAT rate applied on invoices.
pub const VAT_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Round a money amount to cents, half away from zero.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Price a customer actually pays for one unit of a product.
///
/// A percentage discount wins over a fixed discount price; a fixed discount
/// price is only honoured when it is positive.
///
/// ```
/// use bazaar_core::pricing::final_price;
/// use rust_decimal::Decimal;
///
/// let price = Decimal::new(1000_00, 2);
/// assert_eq!(final_price(price, Decimal::new(15, 0), None), Decimal::new(850_00, 2));
/// assert_eq!(final_price(price, Decimal::ZERO, Some(Decimal::new(899_00, 2))), Decimal::new(899_00, 2));
/// assert_eq!(final_price(price, Decimal::ZERO, None), price);
/// ```
#[must_use]
pub fn final_price(
    price: Decimal,
    discount_percentage: Decimal,
    discount_price: Option<Decimal>,
) -> Decimal {
    if discount_percentage > Decimal::ZERO {
        return round_cents(price - price * discount_percentage / Decimal::ONE_HUNDRED);
    }
    match discount_price {
        Some(p) if p > Decimal::ZERO => p,
        _ => price,
    }
}

/// Sale price shown to the sales assistant, if the product is discounted.
#[must_use]
pub fn sale_price(
    price: Decimal,
    discount_percentage: Decimal,
    discount_price: Option<Decimal>,
) -> Option<Decimal> {
    match discount_price {
        Some(p) if p > Decimal::ZERO => Some(p),
        _ if discount_percentage > Decimal::ZERO => Some(final_price(
            price,
            discount_percentage,
            None,
        )),
        _ => None,
    }
}

/// Apply a fractional coupon (`0.1` = 10% off) to a subtotal.
#[must_use]
pub fn apply_coupon(subtotal: Decimal, fraction: Decimal) -> Decimal {
    let fraction = fraction.clamp(Decimal::ZERO, Decimal::ONE);
    round_cents(subtotal - subtotal * fraction)
}

/// Totals printed at the bottom of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    /// Sum of `unit price * quantity` over all lines.
    pub subtotal: Decimal,
    /// VAT on the subtotal.
    pub vat: Decimal,
    /// Subtotal plus VAT.
    pub grand_total: Decimal,
}

impl InvoiceTotals {
    /// Compute invoice totals from `(unit_price, quantity)` lines.
    #[must_use]
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (Decimal, i32)>,
    {
        let subtotal = round_cents(
            lines
                .into_iter()
                .map(|(unit, qty)| unit * Decimal::from(qty))
                .sum(),
        );
        let vat = round_cents(subtotal * VAT_RATE);
        Self {
            subtotal,
            vat,
            grand_total: subtotal + vat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(units: i64, scale: u32) -> Decimal {
        Decimal::new(units, scale)
    }

    #[test]
    fn test_percentage_discount_beats_fixed_price() {
        let got = final_price(d(200, 0), d(25, 0), Some(d(190, 0)));
        assert_eq!(got, d(150, 0));
    }

    #[test]
    fn test_percentage_discount_rounds_to_cents() {
        // 33.33 * (1 - 0.07) = 30.9969
        assert_eq!(final_price(d(3333, 2), d(7, 0), None), d(3100, 2));
    }

    #[test]
    fn test_zero_discount_price_is_ignored() {
        assert_eq!(final_price(d(50, 0), Decimal::ZERO, Some(Decimal::ZERO)), d(50, 0));
    }

    #[test]
    fn test_sale_price_none_without_discount() {
        assert_eq!(sale_price(d(50, 0), Decimal::ZERO, None), None);
        assert_eq!(sale_price(d(50, 0), d(10, 0), None), Some(d(45, 0)));
        assert_eq!(sale_price(d(50, 0), d(10, 0), Some(d(40, 0))), Some(d(40, 0)));
    }

    #[test]
    fn test_apply_coupon_clamps_fraction() {
        assert_eq!(apply_coupon(d(120, 0), d(1, 1)), d(108, 0));
        assert_eq!(apply_coupon(d(120, 0), d(5, 0)), Decimal::ZERO);
        assert_eq!(apply_coupon(d(120, 0), d(-1, 0)), d(120, 0));
    }

    #[test]
    fn test_invoice_totals() {
        let totals = InvoiceTotals::from_lines([(d(1999, 2), 2), (d(500, 2), 1)]);
        assert_eq!(totals.subtotal, d(4498, 2));
        assert_eq!(totals.vat, d(450, 2));
        assert_eq!(totals.grand_total, d(4948, 2));
    }

    #[test]
    fn test_invoice_totals_empty() {
        let totals = InvoiceTotals::from_lines(std::iter::empty());
        assert_eq!(totals.grand_total, Decimal::ZERO);
    }
}
