use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// An amount in major units of some currency (yen, dollars, euros).
///
/// `Money` carries no currency tag of its own: inside a reconciliation pass
/// every `Money` value is already in the reporting currency, and the
/// currency-aware entry points (`from_minor`, `to_minor`) take the ISO
/// minor-unit exponent explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    pub fn from_major(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Builds an amount from integer minor units, e.g. `from_minor(1999, 2)`
    /// is 19.99 and `from_minor(1999, 0)` is 1999.
    pub fn from_minor(minor: i64, exponent: u32) -> Self {
        Money(Decimal::from_i128_with_scale(minor as i128, exponent))
    }

    /// Converts back to integer minor units, rounding half away from zero.
    /// Returns `None` if the value does not fit in an `i64`.
    pub fn to_minor(self, exponent: u32) -> Option<i64> {
        let scale = Decimal::from(10i64.checked_pow(exponent)?);
        self.0
            .checked_mul(scale)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    /// Rounds to `exponent` decimal places, half away from zero.
    pub fn round_to(self, exponent: u32) -> Self {
        Money(
            self.0
                .round_dp_with_strategy(exponent, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// `self / other` as a plain ratio, or `None` when `other` is zero.
    pub fn ratio(self, other: Money) -> Option<Decimal> {
        self.0.checked_div(other.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;
    fn mul(self, rhs: Decimal) -> Self {
        Money(self.0 * rhs)
    }
}

/// Panics on a zero divisor like any `Decimal` division; callers guard.
impl Div<Decimal> for Money {
    type Output = Self;
    fn div(self, rhs: Decimal) -> Self {
        Money(self.0 / rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
