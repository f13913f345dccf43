use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, Zero};

use super::errors::DomainError;

/// Number of fractional digits every stored amount carries.
pub const MONEY_SCALE: i64 = 2;

/// Round to cents, ties away from zero.
pub fn round_money(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(MONEY_SCALE, RoundingMode::HalfUp)
}

/// Parse a decimal string supplied by a caller, e.g. `"9.99"`.
pub fn parse_money(raw: &str) -> Result<BigDecimal, DomainError> {
    let amount = BigDecimal::from_str(raw.trim())
        .map_err(|e| DomainError::InvalidInput(format!("Invalid amount '{}': {}", raw, e)))?;
    if amount < BigDecimal::zero() {
        return Err(DomainError::InvalidInput(format!(
            "Amount '{}' must not be negative",
            raw
        )));
    }
    Ok(amount)
}

/// Render an amount with exactly two fractional digits.
pub fn format_money(amount: &BigDecimal) -> String {
    round_money(amount).to_string()
}
