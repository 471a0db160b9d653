use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::line_item::BillableLine;

/// Subtotal / tax / total of one line-item set, each at 2 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
}

/// Round an amount to 2 decimal places, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute subtotal, tax and total for an ordered line-item set.
///
/// - `subtotal`: sum of `quantity × unit_price` over non-tax lines, rounded
///   to 2 decimal places.
/// - `tax_total`: each tax line contributes `subtotal × rate / 100`, rounded
///   to 2 decimal places **per line** before summation. With multiple tax
///   lines this differs from rounding once at the end by up to a penny per
///   line, and the per-line result is the contractual one.
/// - `total = subtotal + tax_total`, rounded to 2 decimal places.
///
/// Pure and deterministic; no side effects, no IO. Tax lines never feed the
/// subtotal regardless of their (normalized) quantity/price.
pub fn totals<L: BillableLine>(lines: &[L]) -> Totals {
    let subtotal = round_money(
        lines
            .iter()
            .filter(|l| !l.is_tax_line())
            .map(|l| l.quantity() * l.unit_price())
            .sum(),
    );

    let tax_total: Decimal = lines
        .iter()
        .filter(|l| l.is_tax_line())
        .map(|l| {
            let rate = l.tax_rate().unwrap_or(Decimal::ZERO);
            round_money(subtotal * rate / Decimal::ONE_HUNDRED)
        })
        .sum();

    let total = round_money(subtotal + tax_total);

    Totals {
        subtotal,
        tax_total,
        total,
    }
}
