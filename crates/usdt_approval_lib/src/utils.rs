use rust_decimal::Decimal;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use web3::types::U256;

#[derive(Debug, Clone)]
pub struct ConversionError {
    pub msg: String,
}

impl ConversionError {
    pub fn from(msg: String) -> Self {
        Self { msg }
    }
}

impl Display for ConversionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error during conversion: {}", self.msg)
    }
}

impl Error for ConversionError {
    fn description(&self) -> &str {
        "Conversion error"
    }
}

/// Parse a user-entered token amount. Plain decimal notation only,
/// no exponents, no sign.
pub fn parse_token_amount(amount: &str) -> Result<Decimal, ConversionError> {
    let dec = Decimal::from_str(amount)
        .map_err(|err| ConversionError::from(format!("Invalid decimal amount {amount}: {err}")))?;
    if dec.is_sign_negative() {
        return Err(ConversionError::from(format!(
            "Amount cannot be negative: {amount}"
        )));
    }
    Ok(dec)
}

/// Convert a token amount to its integer base-unit representation
/// (amount * 10^decimals). The conversion is exact: amounts with more
/// fractional digits than the token supports are an error, never truncated
/// or rounded.
pub fn token_amount_to_base_units(amount: Decimal, decimals: u8) -> Result<U256, ConversionError> {
    if amount.is_sign_negative() {
        return Err(ConversionError::from(format!(
            "Amount cannot be negative: {amount}"
        )));
    }
    let amount = amount.normalize();
    if amount.scale() > decimals as u32 {
        return Err(ConversionError::from(format!(
            "Amount {amount} has more fractional digits than token decimals {decimals}"
        )));
    }
    let exponent = decimals as u32 - amount.scale();
    let scale = U256::from(10u8)
        .checked_pow(U256::from(exponent))
        .ok_or_else(|| ConversionError::from(format!("Overflow scaling by 10^{exponent}")))?;
    U256::from(amount.mantissa().unsigned_abs())
        .checked_mul(scale)
        .ok_or_else(|| ConversionError::from(format!("Overflow during conversion of {amount}")))
}

/// Render a base-unit amount as a decimal string, exact over the full U256
/// range. Precision is capped at the token's decimals.
pub fn base_units_to_decimal_string(
    amount: U256,
    decimals: u8,
    precision: Option<usize>,
) -> String {
    let digits = amount.to_string();
    let decimals = decimals as usize;
    let (int_part, frac_part) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{digits:0>decimals$}"))
    };
    let mut frac = frac_part.trim_end_matches('0').to_string();
    if let Some(precision) = precision {
        let precision = std::cmp::min(precision, decimals);
        while frac.len() < precision {
            frac.push('0');
        }
        frac.truncate(precision);
    }
    if frac.is_empty() {
        int_part
    } else {
        format!("{int_part}.{frac}")
    }
}

pub trait DecimalConvExt {
    fn to_u256_from_gwei(&self) -> Result<U256, ConversionError>;
}

impl DecimalConvExt for Decimal {
    fn to_u256_from_gwei(&self) -> Result<U256, ConversionError> {
        token_amount_to_base_units(*self, 9)
    }
}
