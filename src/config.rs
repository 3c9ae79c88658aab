//! Pricer configuration.
//!
//! [`PricerConfig`] owns every parameter a quote reads: the SABR surface,
//! the multiplier grid, rates, the low-delta policy and the fee. Each setter
//! validates before writing, so a config is always usable and a rejected
//! update leaves it unchanged.
//!
//! ```
//! use dhv_pricer::config::PricerConfigBuilder;
//! use dhv_pricer::fixed::Fixed18;
//! use dhv_pricer::grid::TenorGrid;
//!
//! let grid = TenorGrid::uniform(Fixed18::from_int(10), 5, Fixed18::from_int(2800), Fixed18::ONE)?;
//! let config = PricerConfigBuilder::new()
//!     .tenor_grid(grid)
//!     .slippage_gradient("0.0001".parse()?)
//!     .collateral_lending_rate("0.04".parse()?)
//!     .fee_per_contract("0.5".parse()?)
//!     .build()?;
//! assert_eq!(config.low_delta_threshold(), "0.05".parse::<Fixed18>()?);
//! # Ok::<(), dhv_pricer::PricerError>(())
//! ```

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{self, PricerError};
use crate::fixed::{Fixed18, Fixed6};
use crate::grid::{MultiplierKind, TenorGrid, TenorPricingParams};
use crate::slippage::SlippageModel;
use crate::spread::{DeltaBorrowRates, SpreadModel};
use crate::surface::{SabrParameters, SabrVolatilityFeed};
use crate::validate::{validate_in_range, validate_non_negative, validate_positive};

/// Default `|delta|` below which sales are priced at the flat IV.
pub const DEFAULT_LOW_DELTA_THRESHOLD: Fixed18 = Fixed18::from_decimal(dec!(0.05));

/// Default flat IV for low-delta sales.
pub const DEFAULT_LOW_DELTA_SELL_OPTION_FLAT_IV: Fixed18 = Fixed18::from_decimal(dec!(0.3));

/// Everything a quote reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PricerConfigRaw", into = "PricerConfigRaw")]
pub struct PricerConfig {
    volatility: SabrVolatilityFeed,
    tenor_grid: TenorGrid,
    slippage: SlippageModel,
    spread: SpreadModel,
    low_delta_threshold: Fixed18,
    low_delta_sell_option_flat_iv: Fixed18,
    risk_free_rate: Fixed18,
    fee_per_contract: Fixed6,
}

#[derive(Serialize, Deserialize)]
struct PricerConfigRaw {
    volatility: SabrVolatilityFeed,
    tenor_grid: TenorGrid,
    slippage_gradient: Fixed18,
    collateral_lending_rate: Fixed18,
    delta_borrow_rates: DeltaBorrowRates,
    low_delta_threshold: Fixed18,
    low_delta_sell_option_flat_iv: Fixed18,
    risk_free_rate: Fixed18,
    fee_per_contract: Fixed6,
}

impl TryFrom<PricerConfigRaw> for PricerConfig {
    type Error = PricerError;
    fn try_from(raw: PricerConfigRaw) -> Result<Self, Self::Error> {
        let mut config = Self::new(raw.tenor_grid);
        config.volatility = raw.volatility;
        config.set_slippage_gradient(raw.slippage_gradient)?;
        config.spread = SpreadModel::new(raw.collateral_lending_rate, raw.delta_borrow_rates)?;
        config.set_low_delta_threshold(raw.low_delta_threshold)?;
        config.set_low_delta_sell_option_flat_iv(raw.low_delta_sell_option_flat_iv)?;
        config.set_risk_free_rate(raw.risk_free_rate)?;
        config.set_fee_per_contract(raw.fee_per_contract)?;
        Ok(config)
    }
}

impl From<PricerConfig> for PricerConfigRaw {
    fn from(c: PricerConfig) -> Self {
        Self {
            volatility: c.volatility,
            tenor_grid: c.tenor_grid,
            slippage_gradient: c.slippage.gradient(),
            collateral_lending_rate: c.spread.collateral_lending_rate(),
            delta_borrow_rates: c.spread.delta_borrow_rates(),
            low_delta_threshold: c.low_delta_threshold,
            low_delta_sell_option_flat_iv: c.low_delta_sell_option_flat_iv,
            risk_free_rate: c.risk_free_rate,
            fee_per_contract: c.fee_per_contract,
        }
    }
}

impl PricerConfig {
    /// Config with the given grid, no SABR data, zero rates, zero slippage,
    /// zero fee and the default low-delta policy.
    pub fn new(tenor_grid: TenorGrid) -> Self {
        Self {
            volatility: SabrVolatilityFeed::new(),
            tenor_grid,
            slippage: SlippageModel::default(),
            spread: SpreadModel::default(),
            low_delta_threshold: DEFAULT_LOW_DELTA_THRESHOLD,
            low_delta_sell_option_flat_iv: DEFAULT_LOW_DELTA_SELL_OPTION_FLAT_IV,
            risk_free_rate: Fixed18::ZERO,
            fee_per_contract: Fixed6::ZERO,
        }
    }

    // --- Readers ---

    pub fn volatility(&self) -> &SabrVolatilityFeed {
        &self.volatility
    }

    pub fn sabr_parameters(&self, expiration: u64) -> Option<&SabrParameters> {
        self.volatility.sabr_parameters(expiration)
    }

    pub fn tenor_grid(&self) -> &TenorGrid {
        &self.tenor_grid
    }

    pub fn slippage(&self) -> &SlippageModel {
        &self.slippage
    }

    pub fn spread(&self) -> &SpreadModel {
        &self.spread
    }

    pub fn low_delta_threshold(&self) -> Fixed18 {
        self.low_delta_threshold
    }

    pub fn low_delta_sell_option_flat_iv(&self) -> Fixed18 {
        self.low_delta_sell_option_flat_iv
    }

    pub fn risk_free_rate(&self) -> Fixed18 {
        self.risk_free_rate
    }

    pub fn fee_per_contract(&self) -> Fixed6 {
        self.fee_per_contract
    }

    // --- Setters ---

    pub fn set_sabr_parameters(
        &mut self,
        params: SabrParameters,
        expiration: u64,
    ) -> error::Result<()> {
        self.volatility.set_sabr_parameters(params, expiration)
    }

    /// Replace the whole multiplier grid.
    ///
    /// # Errors
    /// Returns [`PricerError::InvalidConfiguration`] if `params.len()` differs
    /// from `number_of_tenors` or the grid itself is invalid.
    pub fn initialize_tenor_params(
        &mut self,
        delta_band_width: Fixed18,
        number_of_tenors: usize,
        max_tenor_value: Fixed18,
        params: Vec<TenorPricingParams>,
    ) -> error::Result<()> {
        if params.len() != number_of_tenors {
            return Err(PricerError::invalid_configuration(format!(
                "expected {number_of_tenors} tenor parameter sets, got {}",
                params.len()
            )));
        }
        self.tenor_grid = TenorGrid::new(delta_band_width, max_tenor_value, params)?;

        #[cfg(feature = "logging")]
        tracing::debug!(
            delta_band_width = %delta_band_width,
            number_of_tenors,
            max_tenor_value = %max_tenor_value,
            "tenor params initialized"
        );

        Ok(())
    }

    pub fn set_slippage_gradient_multipliers(
        &mut self,
        tenor_index: usize,
        call: Vec<Fixed18>,
        put: Vec<Fixed18>,
    ) -> error::Result<()> {
        self.tenor_grid
            .set_multipliers(tenor_index, MultiplierKind::SlippageGradient, call, put)
    }

    pub fn set_spread_collateral_multipliers(
        &mut self,
        tenor_index: usize,
        call: Vec<Fixed18>,
        put: Vec<Fixed18>,
    ) -> error::Result<()> {
        self.tenor_grid
            .set_multipliers(tenor_index, MultiplierKind::SpreadCollateral, call, put)
    }

    pub fn set_spread_delta_multipliers(
        &mut self,
        tenor_index: usize,
        call: Vec<Fixed18>,
        put: Vec<Fixed18>,
    ) -> error::Result<()> {
        self.tenor_grid
            .set_multipliers(tenor_index, MultiplierKind::SpreadDelta, call, put)
    }

    pub fn set_collateral_lending_rate(&mut self, rate: Fixed18) -> error::Result<()> {
        self.spread = SpreadModel::new(rate, self.spread.delta_borrow_rates())?;

        #[cfg(feature = "logging")]
        tracing::debug!(rate = %rate, "collateral lending rate set");

        Ok(())
    }

    pub fn set_delta_borrow_rates(&mut self, rates: DeltaBorrowRates) -> error::Result<()> {
        self.spread = SpreadModel::new(self.spread.collateral_lending_rate(), rates)?;

        #[cfg(feature = "logging")]
        tracing::debug!(
            sell_long = %rates.sell_long,
            sell_short = %rates.sell_short,
            buy_long = %rates.buy_long,
            buy_short = %rates.buy_short,
            "delta borrow rates set"
        );

        Ok(())
    }

    /// `|delta|` threshold in `[0, 1]`.
    pub fn set_low_delta_threshold(&mut self, threshold: Fixed18) -> error::Result<()> {
        self.low_delta_threshold =
            validate_in_range(threshold, Fixed18::ZERO, Fixed18::ONE, "low_delta_threshold")?;
        Ok(())
    }

    pub fn set_low_delta_sell_option_flat_iv(&mut self, iv: Fixed18) -> error::Result<()> {
        self.low_delta_sell_option_flat_iv =
            validate_positive(iv, "low_delta_sell_option_flat_iv")?;
        Ok(())
    }

    pub fn set_slippage_gradient(&mut self, gradient: Fixed18) -> error::Result<()> {
        self.slippage = SlippageModel::new(gradient)?;

        #[cfg(feature = "logging")]
        tracing::debug!(gradient = %gradient, "slippage gradient set");

        Ok(())
    }

    /// Any sign is accepted; the rate only discounts the strike.
    pub fn set_risk_free_rate(&mut self, rate: Fixed18) -> error::Result<()> {
        self.risk_free_rate = rate;
        Ok(())
    }

    pub fn set_fee_per_contract(&mut self, fee: Fixed6) -> error::Result<()> {
        validate_non_negative(fee.to_fixed18(), "fee_per_contract")?;
        self.fee_per_contract = fee;
        Ok(())
    }
}

/// Fluent assembly of a [`PricerConfig`].
///
/// Values are validated in [`build`](Self::build), by the same setters a
/// live config uses.
#[derive(Debug, Default)]
pub struct PricerConfigBuilder {
    tenor_grid: Option<TenorGrid>,
    sabr: Vec<(u64, SabrParameters)>,
    slippage_gradient: Option<Fixed18>,
    collateral_lending_rate: Option<Fixed18>,
    delta_borrow_rates: Option<DeltaBorrowRates>,
    low_delta_threshold: Option<Fixed18>,
    low_delta_sell_option_flat_iv: Option<Fixed18>,
    risk_free_rate: Option<Fixed18>,
    fee_per_contract: Option<Fixed6>,
}

impl PricerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Required.
    pub fn tenor_grid(mut self, grid: TenorGrid) -> Self {
        self.tenor_grid = Some(grid);
        self
    }

    /// Add a SABR set; may be called once per expiration.
    pub fn sabr_parameters(mut self, expiration: u64, params: SabrParameters) -> Self {
        self.sabr.push((expiration, params));
        self
    }

    pub fn slippage_gradient(mut self, gradient: Fixed18) -> Self {
        self.slippage_gradient = Some(gradient);
        self
    }

    pub fn collateral_lending_rate(mut self, rate: Fixed18) -> Self {
        self.collateral_lending_rate = Some(rate);
        self
    }

    pub fn delta_borrow_rates(mut self, rates: DeltaBorrowRates) -> Self {
        self.delta_borrow_rates = Some(rates);
        self
    }

    pub fn low_delta_threshold(mut self, threshold: Fixed18) -> Self {
        self.low_delta_threshold = Some(threshold);
        self
    }

    pub fn low_delta_sell_option_flat_iv(mut self, iv: Fixed18) -> Self {
        self.low_delta_sell_option_flat_iv = Some(iv);
        self
    }

    pub fn risk_free_rate(mut self, rate: Fixed18) -> Self {
        self.risk_free_rate = Some(rate);
        self
    }

    pub fn fee_per_contract(mut self, fee: Fixed6) -> Self {
        self.fee_per_contract = Some(fee);
        self
    }

    /// # Errors
    /// Returns [`PricerError::InvalidConfiguration`] if no tenor grid was
    /// given or any value fails its setter's validation.
    pub fn build(self) -> error::Result<PricerConfig> {
        let grid = self
            .tenor_grid
            .ok_or_else(|| PricerError::invalid_configuration("tenor grid is required"))?;
        let mut config = PricerConfig::new(grid);

        for (expiration, params) in self.sabr {
            config.set_sabr_parameters(params, expiration)?;
        }
        if let Some(g) = self.slippage_gradient {
            config.set_slippage_gradient(g)?;
        }
        if let Some(r) = self.collateral_lending_rate {
            config.set_collateral_lending_rate(r)?;
        }
        if let Some(r) = self.delta_borrow_rates {
            config.set_delta_borrow_rates(r)?;
        }
        if let Some(t) = self.low_delta_threshold {
            config.set_low_delta_threshold(t)?;
        }
        if let Some(iv) = self.low_delta_sell_option_flat_iv {
            config.set_low_delta_sell_option_flat_iv(iv)?;
        }
        if let Some(r) = self.risk_free_rate {
            config.set_risk_free_rate(r)?;
        }
        if let Some(fee) = self.fee_per_contract {
            config.set_fee_per_contract(fee)?;
        }
        Ok(config)
    }
}
