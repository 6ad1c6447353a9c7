//! Price handling for checkout amounts
//!
//! Plan prices are stored as display strings ("R$ 99 / mês", "R$ 1.299,90")
//! and must become a positive BRL amount before reaching a payment provider.

use crate::error::AppError;

/// Amounts are charged in cents precision.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Extracts the first numeric amount of a display price.
///
/// A comma marks Brazilian formatting (`.` thousands, `,` decimals). Without
/// a comma, a dot followed by exactly three digits is a thousands separator.
pub fn parse_display_price(display: &str) -> Option<f64> {
    let start = display.find(|c: char| c.is_ascii_digit())?;
    let number: String = display[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let number = number.trim_end_matches(['.', ',']);

    let normalized = if number.contains(',') {
        number.replace('.', "").replace(',', ".")
    } else if number
        .rsplit_once('.')
        .is_some_and(|(_, fraction)| fraction.len() == 3)
    {
        number.replace('.', "")
    } else {
        number.to_string()
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Validates a checkout amount is a positive, finite BRL value.
pub fn validate_checkout_amount(amount: f64, operation_name: &str) -> Result<f64, AppError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::BadRequest(format!(
            "{} amount must be a positive number: {}",
            operation_name, amount
        )));
    }

    let rounded = round_to_cents(amount);
    if rounded <= 0.0 {
        return Err(AppError::BadRequest(format!(
            "{} amount rounds to zero: {}",
            operation_name, amount
        )));
    }
    Ok(rounded)
}
