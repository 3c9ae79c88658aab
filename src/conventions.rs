//! Market conventions shared by the surface and the pricer.
//!
//! Time is measured in unix seconds and annualized with the Julian year.
//! Forwards are continuously compounded from spot at the per-expiry
//! interest rate stored alongside the SABR parameters.

use crate::error::{PricerError, Result};
use crate::fixed::Fixed18;

/// Seconds in a Julian year (365.25 days).
pub const SECONDS_PER_YEAR: u64 = 31_557_600;

/// Decimal places of strikes in series identity.
pub const STRIKE_DECIMALS: u32 = 8;

/// Seconds remaining until `expiration`.
///
/// # Errors
/// Returns [`PricerError::ExpiredSeries`] when `expiration <= now`.
pub fn seconds_to_expiry(now: u64, expiration: u64) -> Result<u64> {
    if expiration <= now {
        return Err(PricerError::ExpiredSeries { expiration, now });
    }
    Ok(expiration - now)
}

/// Year fraction `t = (expiration − now) / 31_557_600`.
pub fn years_to_expiry(now: u64, expiration: u64) -> Result<Fixed18> {
    let seconds = seconds_to_expiry(now, expiration)?;
    Fixed18::from_u64(seconds).div_down(Fixed18::from_u64(SECONDS_PER_YEAR))
}

/// Compute forward price from spot: F = S · exp(r · T).
pub fn forward_price(spot: Fixed18, rate: Fixed18, years: Fixed18) -> Result<Fixed18> {
    spot.mul_down(rate.mul_down(years)?.exp()?)
}

/// Convert a strike to log-moneyness: k = ln(K / F).
pub fn log_moneyness(strike: Fixed18, forward: Fixed18) -> Result<Fixed18> {
    strike.div_down(forward)?.ln()
}

/// Strike truncated to the 8 decimals used to identify a series.
pub fn format_strike(strike: Fixed18) -> Fixed18 {
    strike.truncate_to(STRIKE_DECIMALS)
}
