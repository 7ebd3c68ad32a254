//! Money type with decimal precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Represents a monetary amount with currency.
///
/// Uses `Decimal` internally to avoid floating-point precision errors.
/// Amounts in different currencies are never combined; cross-currency
/// arithmetic returns `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in major currency units (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code (e.g., "USD", "EUR").
    pub currency: Currency,
}

/// ISO 4217 currency codes supported by the system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US Dollar
    #[default]
    Usd,
    /// Euro
    Eur,
    /// British Pound
    Gbp,
    /// Canadian Dollar
    Cad,
    /// Singapore Dollar
    Sgd,
    /// Japanese Yen
    Jpy,
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Returns the absolute value, keeping the currency.
    #[must_use]
    pub fn abs(&self) -> Self {
        Self::new(self.amount.abs(), self.currency)
    }

    /// Adds two amounts of the same currency.
    ///
    /// Returns `None` when the currencies differ or the sum overflows.
    #[must_use]
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        if self.currency != other.currency {
            return None;
        }
        self.amount
            .checked_add(other.amount)
            .map(|amount| Self::new(amount, self.currency))
    }

    /// Subtracts an amount of the same currency.
    ///
    /// Returns `None` when the currencies differ or the result overflows.
    #[must_use]
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        if self.currency != other.currency {
            return None;
        }
        self.amount
            .checked_sub(other.amount)
            .map(|amount| Self::new(amount, self.currency))
    }

    /// Rounds the amount to two decimal places (banker's rounding).
    #[must_use]
    pub fn round_cents(&self) -> Self {
        Self::new(self.amount.round_dp(2), self.currency)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount.round_dp(2), self.currency)
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usd => write!(f, "USD"),
            Self::Eur => write!(f, "EUR"),
            Self::Gbp => write!(f, "GBP"),
            Self::Cad => write!(f, "CAD"),
            Self::Sgd => write!(f, "SGD"),
            Self::Jpy => write!(f, "JPY"),
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            "CAD" => Ok(Self::Cad),
            "SGD" => Ok(Self::Sgd),
            "JPY" => Ok(Self::Jpy),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_money_new() {
        let amount = dec!(100.00);
        let money = Money::new(amount, Currency::Usd);
        assert_eq!(money.amount, amount);
        assert_eq!(money.currency, Currency::Usd);
    }

    #[test]
    fn test_money_zero() {
        let money = Money::zero(Currency::Eur);
        assert!(money.is_zero());
        assert_eq!(money.amount, Decimal::ZERO);
        assert_eq!(money.currency, Currency::Eur);
    }

    #[test]
    fn test_money_is_negative() {
        assert!(!Money::new(dec!(10), Currency::Usd).is_negative());
        assert!(Money::new(dec!(-10), Currency::Usd).is_negative());
        assert!(!Money::new(dec!(0), Currency::Usd).is_negative());
        assert!(!Money::new(dec!(-0.00), Currency::Usd).is_negative());
    }

    #[test]
    fn test_checked_add_same_currency() {
        let a = Money::new(dec!(100.50), Currency::Usd);
        let b = Money::new(dec!(49.50), Currency::Usd);
        assert_eq!(a.checked_add(&b), Some(Money::new(dec!(150.00), Currency::Usd)));
        assert_eq!(a.checked_sub(&b), Some(Money::new(dec!(51.00), Currency::Usd)));
    }

    #[test]
    fn test_checked_add_rejects_cross_currency() {
        let usd = Money::new(dec!(100), Currency::Usd);
        let eur = Money::new(dec!(100), Currency::Eur);
        assert_eq!(usd.checked_add(&eur), None);
        assert_eq!(usd.checked_sub(&eur), None);
    }

    #[test]
    fn test_abs_and_round() {
        let money = Money::new(dec!(-12.345), Currency::Usd);
        assert_eq!(money.abs().amount, dec!(12.345));
        assert_eq!(money.round_cents().amount, dec!(-12.34));
    }

    #[test]
    fn test_money_display() {
        let money = Money::new(dec!(1500), Currency::Usd);
        assert_eq!(money.to_string(), "1500 USD");
    }

    #[test]
    fn test_currency_default_is_usd() {
        assert_eq!(Currency::default(), Currency::Usd);
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!(Currency::from_str("USD").unwrap(), Currency::Usd);
        assert_eq!(Currency::from_str("usd").unwrap(), Currency::Usd);
        assert_eq!(Currency::from_str(" gbp ").unwrap(), Currency::Gbp);
        assert_eq!(Currency::from_str("JPY").unwrap(), Currency::Jpy);

        assert!(Currency::from_str("XXX").is_err());
        assert!(Currency::from_str("").is_err());
    }
}
