//! Fixed-point money with a scale of two decimal places.
//!
//! Amounts are held as integer minor units (cents) and every conversion from
//! an arbitrary decimal goes through [`round_money`], which rounds half away
//! from zero. Nothing in here ever touches `f32`/`f64`.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// Number of decimal places carried by every stored amount.
pub const MONEY_SCALE: u32 = 2;

const ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid amount '{0}'")]
    InvalidFormat(String),

    #[error("amount out of range")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Rounds `value` to two places (half-up) and stores it as cents.
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        let mut rounded = round_money(value);
        rounded.rescale(MONEY_SCALE);
        i64::try_from(rounded.mantissa())
            .map(Money)
            .map_err(|_| MoneyError::Overflow)
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, MONEY_SCALE)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// `self × factor`, rounded half-up to cents.
    pub fn multiply(self, factor: Decimal) -> Result<Self, MoneyError> {
        let product = self
            .to_decimal()
            .checked_mul(factor)
            .ok_or(MoneyError::Overflow)?;
        Money::from_decimal(product)
    }

    /// Line total for `quantity` units of this unit price.
    pub fn times(self, quantity: i32) -> Result<Self, MoneyError> {
        self.multiply(Decimal::from(quantity))
    }

    pub fn checked_add(self, other: Money) -> Result<Self, MoneyError> {
        self.0.checked_add(other.0).map(Money).ok_or(MoneyError::Overflow)
    }

    /// Display form: `$` prefix, thousands grouped, always two decimals.
    pub fn format_price(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        let major = group_thousands(cents / 100);
        format!("{sign}${major}.{:02}", cents % 100)
    }
}

/// Exact decimal addition; the result keeps the larger input scale.
pub fn add(a: Decimal, b: Decimal) -> Result<Decimal, MoneyError> {
    a.checked_add(b).ok_or(MoneyError::Overflow)
}

/// Exact decimal multiplication rounded half-up to `scale` places.
pub fn multiply(a: Decimal, b: Decimal, scale: u32) -> Result<Decimal, MoneyError> {
    a.checked_mul(b)
        .map(|product| product.round_dp_with_strategy(scale, ROUNDING))
        .ok_or(MoneyError::Overflow)
}

/// Decimal division rounded half-up to `scale` places.
pub fn divide(a: Decimal, b: Decimal, scale: u32) -> Result<Decimal, MoneyError> {
    if b.is_zero() {
        return Err(MoneyError::DivisionByZero);
    }
    a.checked_div(b)
        .map(|quotient| quotient.round_dp_with_strategy(scale, ROUNDING))
        .ok_or(MoneyError::Overflow)
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, ROUNDING)
}

/// Formats a decimal amount string for display, e.g. `"1234.56"` → `"$1,234.56"`.
pub fn format_price(amount: &str) -> Result<String, MoneyError> {
    amount.parse::<Money>().map(Money::format_price)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = Decimal::from_str_exact(trimmed)
            .map_err(|_| MoneyError::InvalidFormat(trimmed.to_string()))?;
        Money::from_decimal(value)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

// JSON carries money as an exact decimal string ("10.99").
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
