//! Price formatting for the storefront.
//!
//! Prices are plain [`Decimal`] amounts in Brazilian reais. The catalog
//! sends them as JSON numbers, so catalog types serialize them with
//! `rust_decimal::serde::float`.

use rust_decimal::{Decimal, RoundingStrategy};

/// Format an amount the way the storefront displays it, e.g. `R$ 1.234,56`.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .abs();
    let plain = format!("{rounded:.2}");
    let (units, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}R$ {grouped},{cents}")
}
