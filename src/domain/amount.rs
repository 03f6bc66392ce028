//! Money types
//!
//! Domain primitives for monetary values with business rule validation.
//! All values carry at most two fractional digits and are rendered as
//! decimal strings with exactly two fractional digits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest value a NUMERIC(14,2) column can hold
const MAX_AMOUNT: &str = "999999999999.99";

/// Maximum decimal places (currency minor unit)
const MAX_SCALE: u32 = 2;

fn max_amount() -> Decimal {
    // Constant literal, always parses.
    Decimal::from_str(MAX_AMOUNT).unwrap_or(Decimal::MAX)
}

/// Amount represents a validated, strictly positive transfer value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - At most 2 decimal places
/// - Fits the storage column
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use aptitude_ledger::domain::Amount;
///
/// let amount = Amount::new(Decimal::new(5000, 2)).unwrap();
/// assert_eq!(amount.to_string(), "50.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

/// Errors that can occur when creating money values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Amount must not be negative (got {0})")]
    Negative(Decimal),

    #[error("Amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value ({MAX_AMOUNT})")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

/// Parse a decimal from user input, accepting plain and scientific notation
/// (JSON numbers such as `1e2` arrive in the latter form).
pub fn parse_decimal(input: &str) -> Result<Decimal, AmountError> {
    let trimmed = input.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map(|d| d.normalize())
        .map_err(|e| AmountError::ParseError(e.to_string()))
}

fn check_scale_and_range(value: Decimal) -> Result<Decimal, AmountError> {
    let value = value.normalize();
    if value.scale() > MAX_SCALE {
        return Err(AmountError::TooManyDecimals(value.scale()));
    }
    if value.abs() > max_amount() {
        return Err(AmountError::Overflow);
    }
    Ok(value)
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 2 decimal places
    /// - `AmountError::Overflow` if value does not fit the storage column
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }
        Ok(Self(check_scale_and_range(value)?))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::new(parse_decimal(s)?)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

/// Balance represents an account balance.
///
/// Balances entered by an administrator are never negative; a balance may
/// only drop below zero through a settlement when overdraft is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Balance(Decimal);

impl Balance {
    /// Create a new non-negative balance
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::Negative(value));
        }
        Ok(Self(check_scale_and_range(value)?))
    }

    /// Create a zero balance
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Wrap a stored balance without validation.
    /// Stored balances may be negative when overdraft was allowed.
    pub fn from_stored(value: Decimal) -> Self {
        Self(value)
    }

    /// Get the underlying value
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check if balance covers the amount
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add amount to balance
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        let new_value = self.0 + amount.value();
        if new_value > max_amount() {
            return Err(AmountError::Overflow);
        }
        Ok(Self(new_value))
    }

    /// Subtract amount from balance.
    ///
    /// With `allow_overdraft` the result may be negative.
    pub fn debit(&self, amount: &Amount, allow_overdraft: bool) -> Result<Balance, AmountError> {
        let new_value = self.0 - amount.value();
        if new_value < Decimal::ZERO && !allow_overdraft {
            return Err(AmountError::Negative(new_value));
        }
        if new_value < -max_amount() {
            return Err(AmountError::Overflow);
        }
        Ok(Self(new_value))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Balance {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Balance::new(parse_decimal(s)?)
    }
}

impl TryFrom<String> for Balance {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        // Serialized balances may be negative; only scale/range are checked.
        let value = parse_decimal(&value)?;
        Ok(Self(check_scale_and_range(value)?))
    }
}

impl From<Balance> for String {
    fn from(balance: Balance) -> Self {
        balance.to_string()
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

/// Serde helper rendering a raw `Decimal` as a two-fractional-digit string.
pub mod money_string {
    use rust_decimal::Decimal;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:.2}", value))
    }
}
