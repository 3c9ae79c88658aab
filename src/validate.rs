//! Configuration validation helpers.
//!
//! Every helper returns [`PricerError::InvalidConfiguration`] with the
//! offending parameter named, so setters read as a list of checks.

use crate::error::{PricerError, Result};
use crate::fixed::Fixed18;

/// Validate that a value is strictly positive.
pub(crate) fn validate_positive(value: Fixed18, name: &str) -> Result<Fixed18> {
    if !value.is_positive() {
        return Err(PricerError::invalid_configuration(format!(
            "{name} must be positive, got {value}"
        )));
    }
    Ok(value)
}

/// Validate that a value is zero or positive.
pub(crate) fn validate_non_negative(value: Fixed18, name: &str) -> Result<Fixed18> {
    if value.is_negative() {
        return Err(PricerError::invalid_configuration(format!(
            "{name} must be non-negative, got {value}"
        )));
    }
    Ok(value)
}

/// Validate that a value lies in the closed interval `[lo, hi]`.
pub(crate) fn validate_in_range(
    value: Fixed18,
    lo: Fixed18,
    hi: Fixed18,
    name: &str,
) -> Result<Fixed18> {
    if value < lo || value > hi {
        return Err(PricerError::invalid_configuration(format!(
            "{name} must be in [{lo}, {hi}], got {value}"
        )));
    }
    Ok(value)
}

/// Validate that every element of a multiplier array is strictly positive.
pub(crate) fn validate_multipliers(values: &[Fixed18], name: &str) -> Result<()> {
    if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !v.is_positive()) {
        return Err(PricerError::invalid_configuration(format!(
            "{name}[{i}] must be positive, got {v}"
        )));
    }
    Ok(())
}
