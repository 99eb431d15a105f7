//! Decimal amount handling.
//!
//! Human-entered amounts are converted to exact integers of minimal units
//! (satoshi, wei, token base units) by string manipulation; no floating
//! point arithmetic happens after parsing.

use std::fmt;

use alloy_primitives::U256;
use tracing::debug;

use crate::error::WalletError;

/// Largest precision any supported asset declares.
pub const MAX_PRECISION: u8 = 18;

/// An amount in minimal units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScaledAmount(U256);

impl ScaledAmount {
    pub const ZERO: ScaledAmount = ScaledAmount(U256::ZERO);

    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_u64(&self) -> Result<u64, WalletError> {
        u64::try_from(self.0)
            .map_err(|_| WalletError::AmountPrecision(format!("{} does not fit in 64 bits", self.0)))
    }

    pub fn to_u128(&self) -> Result<u128, WalletError> {
        u128::try_from(self.0)
            .map_err(|_| WalletError::AmountPrecision(format!("{} does not fit in 128 bits", self.0)))
    }
}

impl From<u64> for ScaledAmount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for ScaledAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl fmt::Display for ScaledAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An amount as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum AmountInput {
    /// Decimal text such as `"12.5"`.
    Text(String),
    /// A whole number of display units.
    Integer(u64),
    /// A float; rendered through its shortest round-trip decimal form.
    Float(f64),
}

impl From<&str> for AmountInput {
    fn from(s: &str) -> Self {
        AmountInput::Text(s.to_string())
    }
}

impl From<String> for AmountInput {
    fn from(s: String) -> Self {
        AmountInput::Text(s)
    }
}

impl From<&String> for AmountInput {
    fn from(s: &String) -> Self {
        AmountInput::Text(s.clone())
    }
}

impl From<u64> for AmountInput {
    fn from(n: u64) -> Self {
        AmountInput::Integer(n)
    }
}

impl From<u32> for AmountInput {
    fn from(n: u32) -> Self {
        AmountInput::Integer(u64::from(n))
    }
}

impl From<f64> for AmountInput {
    fn from(x: f64) -> Self {
        AmountInput::Float(x)
    }
}

impl From<&AmountInput> for AmountInput {
    fn from(a: &AmountInput) -> Self {
        a.clone()
    }
}

impl AmountInput {
    fn to_text(&self) -> Result<String, WalletError> {
        match self {
            AmountInput::Text(s) => Ok(s.trim().to_string()),
            AmountInput::Integer(n) => Ok(n.to_string()),
            AmountInput::Float(x) => {
                if !x.is_finite() {
                    return Err(WalletError::AmountPrecision(format!("{x} is not a finite amount")));
                }
                debug!(amount = %x, "converting float amount through its decimal form");
                // `Display` for f64 never uses exponent notation.
                Ok(format!("{x}"))
            }
        }
    }
}

/// Splits decimal text into its integer and fractional digit runs.
fn split_decimal(text: &str) -> Result<(&str, &str), WalletError> {
    if text.is_empty() {
        return Err(WalletError::AmountPrecision("amount is empty".into()));
    }

    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (text, ""),
    };

    if let Some(bad) = text.chars().find(|c| !c.is_ascii_digit() && *c != '.') {
        let reason = match bad {
            '-' | '+' => "signs are not allowed".to_string(),
            'e' | 'E' => "exponent notation is not allowed".to_string(),
            ',' | '_' | ' ' => "digit separators are not allowed".to_string(),
            other => format!("unexpected character '{other}'"),
        };
        return Err(WalletError::AmountPrecision(format!("'{text}': {reason}")));
    }
    if frac_part.contains('.') {
        return Err(WalletError::AmountPrecision(format!(
            "'{text}': more than one decimal point"
        )));
    }
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(WalletError::AmountPrecision(format!("'{text}': no digits")));
    }

    Ok((int_part, frac_part))
}

/// Validates amount syntax without a precision.
pub fn check_syntax(amount: impl Into<AmountInput>) -> Result<(), WalletError> {
    let text = amount.into().to_text()?;
    split_decimal(&text).map(|_| ())
}

/// Converts a decimal amount to minimal units at `precision` decimals.
///
/// Fractional digits beyond `precision` are truncated, never rounded.
pub fn normalize(
    amount: impl Into<AmountInput>,
    precision: u8,
) -> Result<ScaledAmount, WalletError> {
    if precision > MAX_PRECISION {
        return Err(WalletError::AmountPrecision(format!(
            "precision {precision} exceeds {MAX_PRECISION}"
        )));
    }

    let text = amount.into().to_text()?;
    let (int_part, frac_part) = split_decimal(&text)?;

    let precision = usize::from(precision);
    let kept = &frac_part[..frac_part.len().min(precision)];
    let padding = precision - kept.len();

    let overflow = || WalletError::AmountPrecision(format!("'{text}' overflows 256 bits"));
    let ten = U256::from(10u8);

    let mut value = U256::ZERO;
    for digit in int_part.bytes().chain(kept.bytes()) {
        value = value
            .checked_mul(ten)
            .and_then(|v| v.checked_add(U256::from(digit - b'0')))
            .ok_or_else(overflow)?;
    }
    for _ in 0..padding {
        value = value.checked_mul(ten).ok_or_else(overflow)?;
    }

    Ok(ScaledAmount(value))
}

/// Renders minimal units as a decimal string with exactly `precision`
/// fractional digits.
pub fn denormalize(amount: ScaledAmount, precision: u8) -> String {
    let digits = amount.0.to_string();
    let precision = usize::from(precision);
    if precision == 0 {
        return digits;
    }

    let padded = if digits.len() <= precision {
        format!("{}{digits}", "0".repeat(precision + 1 - digits.len()))
    } else {
        digits
    };
    let split = padded.len() - precision;
    format!("{}.{}", &padded[..split], &padded[split..])
}
