//! Cost-of-capital spread.
//!
//! Two costs are charged on top of the slipped premium:
//!
//! - **Collateral lending**, purchases only. Contracts the vault must write
//!   beyond its current long inventory have to be collateralised; the
//!   collateral is assumed borrowed at `collateral_lending_rate` for the life
//!   of the option.
//! - **Delta borrow**, both directions. Hedging the trade's dollar delta
//!   costs the rate matching the hedge direction.
//!
//! Both premiums compound annually over the year fraction to expiry and are
//! scaled by the tenor/delta grid multipliers. The total is floored at zero.

use serde::{Deserialize, Serialize};

use crate::error::{self, PricerError};
use crate::fixed::{Fixed18, Fixed6};
use crate::validate::validate_non_negative;

/// Annual borrow rates for delta hedging.
///
/// | trade            | option delta | hedge | rate         |
/// |------------------|--------------|-------|--------------|
/// | sale to vault    | < 0 (put)    | long  | `sell_long`  |
/// | sale to vault    | ≥ 0 (call)   | short | `sell_short` |
/// | purchase         | ≥ 0 (call)   | long  | `buy_long`   |
/// | purchase         | < 0 (put)    | short | `buy_short`  |
///
/// Rates may be negative (a rebate) but must stay above −1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaBorrowRates {
    pub sell_long: Fixed18,
    pub sell_short: Fixed18,
    pub buy_long: Fixed18,
    pub buy_short: Fixed18,
}

impl DeltaBorrowRates {
    pub fn rate_for(&self, unit_delta: Fixed18, is_sell: bool) -> Fixed18 {
        match (unit_delta.is_negative(), is_sell) {
            (true, true) => self.sell_long,
            (true, false) => self.buy_short,
            (false, true) => self.sell_short,
            (false, false) => self.buy_long,
        }
    }

    pub(crate) fn validate(&self) -> error::Result<()> {
        let floor = -Fixed18::ONE;
        for (rate, name) in [
            (self.sell_long, "sell_long"),
            (self.sell_short, "sell_short"),
            (self.buy_long, "buy_long"),
            (self.buy_short, "buy_short"),
        ] {
            if rate <= floor {
                return Err(PricerError::invalid_configuration(format!(
                    "delta borrow rate {name} must be greater than -1, got {rate}"
                )));
            }
        }
        Ok(())
    }
}

/// Inputs for one spread evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpreadRequest {
    pub is_sell: bool,
    pub amount: Fixed18,
    /// Instrument delta of one contract, not flipped for direction.
    pub unit_delta: Fixed18,
    pub spot: Fixed18,
    pub years: Fixed18,
    /// Margin for the net short contracts; ignored for sales.
    pub collateral: Fixed6,
    pub collateral_multiplier: Fixed18,
    pub delta_multiplier: Fixed18,
}

/// Components of the spread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadBreakdown {
    pub collateral_lending: Fixed18,
    pub delta_borrow: Fixed18,
    /// `max(0, collateral_lending + delta_borrow)`.
    pub total: Fixed18,
}

/// Lending and borrow rates behind the spread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadModel {
    collateral_lending_rate: Fixed18,
    delta_borrow_rates: DeltaBorrowRates,
}

/// `(1 + rate)^years − 1`.
fn compounded_rate(rate: Fixed18, years: Fixed18) -> error::Result<Fixed18> {
    Ok((Fixed18::ONE + rate).pow(years)? - Fixed18::ONE)
}

impl SpreadModel {
    /// # Errors
    /// Returns [`PricerError::InvalidConfiguration`] for a negative lending
    /// rate or a borrow rate at or below −1.
    pub fn new(
        collateral_lending_rate: Fixed18,
        delta_borrow_rates: DeltaBorrowRates,
    ) -> error::Result<Self> {
        validate_non_negative(collateral_lending_rate, "collateral_lending_rate")?;
        delta_borrow_rates.validate()?;
        Ok(Self {
            collateral_lending_rate,
            delta_borrow_rates,
        })
    }

    pub fn collateral_lending_rate(&self) -> Fixed18 {
        self.collateral_lending_rate
    }

    pub fn delta_borrow_rates(&self) -> DeltaBorrowRates {
        self.delta_borrow_rates
    }

    /// Contracts the vault must newly write: `max(0, S − max(0, E))`.
    pub fn net_short_contracts(amount: Fixed18, exposure: Fixed18) -> Fixed18 {
        (amount - exposure.max(Fixed18::ZERO)).max(Fixed18::ZERO)
    }

    /// `collateral · ((1 + r)^t − 1) · multiplier`.
    pub fn collateral_lending_premium(
        &self,
        collateral: Fixed6,
        years: Fixed18,
        multiplier: Fixed18,
    ) -> error::Result<Fixed18> {
        let collateral = collateral.to_fixed18();
        if collateral.is_zero() {
            return Ok(Fixed18::ZERO);
        }
        collateral
            .mul_down(compounded_rate(self.collateral_lending_rate, years)?)?
            .mul_down(multiplier)
    }

    /// `|delta| · S · spot · ((1 + r)^t − 1) · multiplier`.
    pub fn delta_borrow_premium(
        &self,
        unit_delta: Fixed18,
        amount: Fixed18,
        spot: Fixed18,
        years: Fixed18,
        is_sell: bool,
        multiplier: Fixed18,
    ) -> error::Result<Fixed18> {
        let dollar_delta = unit_delta.abs().mul_down(amount)?.mul_down(spot)?;
        let rate = self.delta_borrow_rates.rate_for(unit_delta, is_sell);
        dollar_delta
            .mul_down(compounded_rate(rate, years)?)?
            .mul_down(multiplier)
    }

    pub fn spread(&self, req: &SpreadRequest) -> error::Result<SpreadBreakdown> {
        let collateral_lending = if req.is_sell {
            Fixed18::ZERO
        } else {
            self.collateral_lending_premium(req.collateral, req.years, req.collateral_multiplier)?
        };
        let delta_borrow = self.delta_borrow_premium(
            req.unit_delta,
            req.amount,
            req.spot,
            req.years,
            req.is_sell,
            req.delta_multiplier,
        )?;
        let total = (collateral_lending + delta_borrow).max(Fixed18::ZERO);

        #[cfg(feature = "logging")]
        tracing::debug!(
            is_sell = req.is_sell,
            collateral_lending = %collateral_lending,
            delta_borrow = %delta_borrow,
            total = %total,
            "spread evaluated"
        );

        Ok(SpreadBreakdown {
            collateral_lending,
            delta_borrow,
            total,
        })
    }
}
