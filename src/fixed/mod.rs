//! Deterministic fixed-point numbers.
//!
//! [`Fixed18`] carries prices, volatilities, greeks and contract amounts at
//! 18 decimal places. [`Fixed6`] carries collateral-currency amounts at 6
//! decimal places. Both wrap [`rust_decimal::Decimal`] and truncate toward
//! zero whenever a result has more digits than the target scale, so the same
//! inputs always produce bit-identical outputs.
//!
//! Addition and subtraction are exact at these scales and use the standard
//! operators. Multiplication, division and the transcendental functions can
//! lose digits or fail, so they return [`Result`] and truncate exactly once.

mod math;

use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{PricerError, Result};

const SCALE_18: u32 = 18;
const SCALE_6: u32 = 6;

fn truncate(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::ToZero)
}

/// Signed fixed-point number with 18 decimal places.
///
/// # Examples
/// ```
/// use dhv_pricer::fixed::Fixed18;
///
/// let two = Fixed18::from_int(2);
/// let third = Fixed18::ONE.div_down(Fixed18::from_int(3))?;
/// assert_eq!(third.to_string(), "0.333333333333333333");
/// assert_eq!(two.mul_down(third)?.to_string(), "0.666666666666666666");
/// # Ok::<(), dhv_pricer::PricerError>(())
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Fixed18(Decimal);

impl Fixed18 {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    /// Wrap a decimal that already has at most 18 places. Usable in constants.
    pub(crate) const fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    pub fn from_int(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Build from an 18-decimal integer representation (`1e18` = 1.0).
    ///
    /// # Errors
    /// Returns [`PricerError::NumericalError`] if the value exceeds the
    /// 96-bit mantissa.
    pub fn from_raw(raw: i128) -> Result<Self> {
        Decimal::try_from_i128_with_scale(raw, SCALE_18)
            .map(Self)
            .map_err(|e| PricerError::numerical(format!("raw value {raw} out of range: {e}")))
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    /// Lossy projection for diagnostics and test assertions.
    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Integer part rounded toward negative infinity, as an index.
    ///
    /// # Errors
    /// Returns [`PricerError::NumericalError`] for negative values or values
    /// that do not fit a `usize`.
    pub fn floor_to_usize(self) -> Result<usize> {
        self.0
            .floor()
            .to_usize()
            .ok_or_else(|| PricerError::numerical(format!("{self} is not a valid index")))
    }

    /// `self · rhs`, truncated to 18 decimals.
    pub fn mul_down(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_mul(rhs.0)
            .map(Self::from)
            .ok_or_else(|| PricerError::numerical(format!("overflow in {self} * {rhs}")))
    }

    /// `self / rhs`, truncated to 18 decimals.
    ///
    /// # Errors
    /// Returns [`PricerError::NumericalError`] on division by zero or overflow.
    pub fn div_down(self, rhs: Self) -> Result<Self> {
        if rhs.is_zero() {
            return Err(PricerError::numerical(format!("division of {self} by zero")));
        }
        self.0
            .checked_div(rhs.0)
            .map(Self::from)
            .ok_or_else(|| PricerError::numerical(format!("overflow in {self} / {rhs}")))
    }

    pub fn sqrt(self) -> Result<Self> {
        math::sqrt(self.0).map(Self::from)
    }

    pub fn ln(self) -> Result<Self> {
        math::ln(self.0).map(Self::from)
    }

    pub fn exp(self) -> Result<Self> {
        math::exp(self.0).map(Self::from)
    }

    /// `self^exponent` for a positive base, evaluated as `exp(exponent · ln self)`.
    ///
    /// A zero base is accepted for positive exponents and yields zero.
    pub fn pow(self, exponent: Self) -> Result<Self> {
        if exponent.is_zero() {
            return Ok(Self::ONE);
        }
        if self.is_zero() && exponent.is_positive() {
            return Ok(Self::ZERO);
        }
        let log = math::ln(self.0)?;
        let scaled = log
            .checked_mul(exponent.0)
            .ok_or_else(|| PricerError::numerical(format!("overflow in {self}^{exponent}")))?;
        math::exp(scaled).map(Self::from)
    }

    /// Standard normal cumulative distribution Φ(self).
    pub fn norm_cdf(self) -> Result<Self> {
        math::norm_cdf(self.0).map(Self::from)
    }

    /// Truncate to the 6-decimal collateral precision.
    pub fn to_fixed6(self) -> Fixed6 {
        Fixed6(truncate(self.0, SCALE_6))
    }

    /// Truncate to `decimals` places, never exceeding 18.
    pub fn truncate_to(self, decimals: u32) -> Self {
        Self(truncate(self.0, decimals.min(SCALE_18)))
    }
}

impl From<Decimal> for Fixed18 {
    fn from(value: Decimal) -> Self {
        Self(truncate(value, SCALE_18))
    }
}

impl From<Fixed18> for Decimal {
    fn from(value: Fixed18) -> Self {
        value.0
    }
}

impl FromStr for Fixed18 {
    type Err = PricerError;

    fn from_str(s: &str) -> Result<Self> {
        Decimal::from_str(s)
            .map(Self::from)
            .map_err(|e| PricerError::invalid_input(format!("cannot parse {s:?}: {e}")))
    }
}

impl fmt::Display for Fixed18 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Add for Fixed18 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Fixed18 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Fixed18 {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl std::iter::Sum for Fixed18 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Signed fixed-point number with 6 decimal places, the collateral precision.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Fixed6(Decimal);

impl Fixed6 {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn from_int(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    /// Build from a 6-decimal integer representation (`1e6` = 1.0).
    pub fn from_raw(raw: i64) -> Self {
        Self(Decimal::new(raw, SCALE_6))
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Widen to 18 decimals. Exact.
    pub fn to_fixed18(self) -> Fixed18 {
        Fixed18(self.0)
    }
}

impl From<Decimal> for Fixed6 {
    fn from(value: Decimal) -> Self {
        Self(truncate(value, SCALE_6))
    }
}

impl From<Fixed6> for Decimal {
    fn from(value: Fixed6) -> Self {
        value.0
    }
}

impl FromStr for Fixed6 {
    type Err = PricerError;

    fn from_str(s: &str) -> Result<Self> {
        Decimal::from_str(s)
            .map(Self::from)
            .map_err(|e| PricerError::invalid_input(format!("cannot parse {s:?}: {e}")))
    }
}

impl fmt::Display for Fixed6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Add for Fixed6 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Fixed6 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}
