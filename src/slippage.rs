//! Inventory-skew slippage.
//!
//! The marginal price of one more contract is scaled by `g^(−E)`, where `E`
//! is the vault's net exposure (positive = net long) and
//! `g = 1 + slippage_gradient × grid multiplier`. Integrating the marginal
//! price over the order and dividing by its size gives the average factor
//! applied to the per-contract premium:
//!
//! ```text
//! sale:     (g^(−E) − g^(−(E+S))) / (ln g · S)
//! purchase: (g^(−(E−S)) − g^(−E)) / (ln g · S)
//! ```
//!
//! The integral only depends on the start and end exposure, so splitting an
//! order into pieces and quoting them one after another gives the same total.

use serde::{Deserialize, Serialize};

use crate::error::{self, PricerError};
use crate::fixed::Fixed18;
use crate::validate::validate_non_negative;

/// Exposure once a trade of `amount` has settled.
///
/// A sale to the vault adds to its long position; a purchase from the vault
/// reduces it.
pub fn exposure_after_trade(exposure: Fixed18, amount: Fixed18, is_sell: bool) -> Fixed18 {
    if is_sell {
        exposure + amount
    } else {
        exposure - amount
    }
}

/// Base slippage gradient, before the tenor/delta multiplier is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageModel {
    gradient: Fixed18,
}

impl SlippageModel {
    /// # Errors
    /// Returns [`PricerError::InvalidConfiguration`] for a negative gradient.
    pub fn new(gradient: Fixed18) -> error::Result<Self> {
        validate_non_negative(gradient, "slippage_gradient")?;
        Ok(Self { gradient })
    }

    pub fn gradient(&self) -> Fixed18 {
        self.gradient
    }

    /// Average slippage factor for a trade of `amount` contracts.
    ///
    /// Returns exactly `1` when the modified gradient is zero.
    ///
    /// # Errors
    /// - [`PricerError::InvalidInput`] for a non-positive amount.
    /// - [`PricerError::NumericalError`] if `g^(−E)` overflows.
    pub fn multiplier(
        &self,
        grid_multiplier: Fixed18,
        exposure: Fixed18,
        amount: Fixed18,
        is_sell: bool,
    ) -> error::Result<Fixed18> {
        if !amount.is_positive() {
            return Err(PricerError::invalid_input(format!(
                "trade amount must be positive, got {amount}"
            )));
        }

        let modified_gradient = self.gradient.mul_down(grid_multiplier)?;
        if modified_gradient.is_zero() {
            return Ok(Fixed18::ONE);
        }

        let ln_g = (Fixed18::ONE + modified_gradient).ln()?;
        let decay = |e: Fixed18| -> error::Result<Fixed18> { (-e).mul_down(ln_g)?.exp() };

        let post = exposure_after_trade(exposure, amount, is_sell);
        let (pre_term, post_term) = (decay(exposure)?, decay(post)?);
        let numerator = if is_sell {
            pre_term - post_term
        } else {
            post_term - pre_term
        };
        let factor = numerator.div_down(ln_g.mul_down(amount)?)?;

        #[cfg(feature = "logging")]
        tracing::debug!(
            modified_gradient = %modified_gradient,
            exposure = %exposure,
            amount = %amount,
            is_sell,
            factor = %factor,
            "slippage evaluated"
        );

        Ok(factor)
    }
}
