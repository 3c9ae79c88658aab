//! In-memory collaborators for tests, simulations and off-chain quoting.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{self, PricerError};
use crate::feeds::{ExposureLedger, MarginCalculator, PriceFeed};
use crate::fixed::{Fixed18, Fixed6};
use crate::types::{AssetId, OptionSeries, SeriesId};
use crate::validate::validate_non_negative;

/// Fixed spot prices keyed by `(underlying, strike_asset)`.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceFeed {
    rates: HashMap<(AssetId, AssetId), Fixed18>,
}

impl StaticPriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) a price. Non-positive prices are rejected.
    pub fn set_rate(
        &mut self,
        underlying: AssetId,
        strike_asset: AssetId,
        price: Fixed18,
    ) -> error::Result<()> {
        if !price.is_positive() {
            return Err(PricerError::invalid_input(format!(
                "price for {underlying}/{strike_asset} must be positive, got {price}"
            )));
        }
        self.rates.insert((underlying, strike_asset), price);
        Ok(())
    }

    /// Builder-style [`set_rate`](Self::set_rate).
    pub fn with_rate(
        mut self,
        underlying: AssetId,
        strike_asset: AssetId,
        price: Fixed18,
    ) -> error::Result<Self> {
        self.set_rate(underlying, strike_asset, price)?;
        Ok(self)
    }
}

impl PriceFeed for StaticPriceFeed {
    fn normalized_rate(
        &self,
        underlying: &AssetId,
        strike_asset: &AssetId,
    ) -> error::Result<Fixed18> {
        self.rates
            .get(&(underlying.clone(), strike_asset.clone()))
            .copied()
            .ok_or_else(|| PricerError::Feed {
                message: format!("no price for {underlying}/{strike_asset}"),
            })
    }
}

/// Exposure ledger backed by a map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExposureLedger {
    exposures: HashMap<SeriesId, Fixed18>,
}

impl InMemoryExposureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_exposure(&mut self, series: SeriesId, exposure: Fixed18) {
        self.exposures.insert(series, exposure);
    }

    /// Apply a settled trade: sales to the vault add, purchases subtract.
    pub fn record_trade(&mut self, series: SeriesId, amount: Fixed18, is_sell: bool) {
        let entry = self.exposures.entry(series).or_insert(Fixed18::ZERO);
        *entry = crate::slippage::exposure_after_trade(*entry, amount, is_sell);
    }
}

impl ExposureLedger for InMemoryExposureLedger {
    fn net_exposure(&self, series: &SeriesId) -> Fixed18 {
        self.exposures.get(series).copied().unwrap_or(Fixed18::ZERO)
    }
}

/// Margin as a fixed fraction of notional: `spot · call_spot_fraction` per
/// call, `strike · put_strike_fraction` per put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProportionalMarginCalculator {
    call_spot_fraction: Fixed18,
    put_strike_fraction: Fixed18,
}

impl ProportionalMarginCalculator {
    pub fn new(call_spot_fraction: Fixed18, put_strike_fraction: Fixed18) -> error::Result<Self> {
        validate_non_negative(call_spot_fraction, "call_spot_fraction")?;
        validate_non_negative(put_strike_fraction, "put_strike_fraction")?;
        Ok(Self {
            call_spot_fraction,
            put_strike_fraction,
        })
    }

    /// Fully collateralised: one underlying per call, one strike per put.
    pub fn fully_collateralised() -> Self {
        Self {
            call_spot_fraction: Fixed18::ONE,
            put_strike_fraction: Fixed18::ONE,
        }
    }
}

impl MarginCalculator for ProportionalMarginCalculator {
    fn naked_margin_required(
        &self,
        series: &OptionSeries,
        amount: Fixed18,
        spot: Fixed18,
        _now: u64,
    ) -> error::Result<Fixed6> {
        let per_contract = if series.is_put {
            series.strike.mul_down(self.put_strike_fraction)?
        } else {
            spot.mul_down(self.call_spot_fraction)?
        };
        Ok(per_contract.mul_down(amount)?.to_fixed6())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn weth() -> AssetId {
        AssetId::new("WETH")
    }

    fn usdc() -> AssetId {
        AssetId::new("USDC")
    }

    fn series(is_put: bool) -> OptionSeries {
        OptionSeries {
            expiration: 1_700_000_000,
            strike: Fixed18::from_int(1800),
            is_put,
            underlying: weth(),
            strike_asset: usdc(),
            collateral: usdc(),
        }
    }

    // --- Price feed ---

    #[test]
    fn price_feed_lookup() {
        let feed = StaticPriceFeed::new()
            .with_rate(weth(), usdc(), Fixed18::from_int(2000))
            .unwrap();
        assert_eq!(feed.normalized_rate(&weth(), &usdc()).unwrap(), Fixed18::from_int(2000));
        assert!(matches!(
            feed.normalized_rate(&usdc(), &weth()),
            Err(PricerError::Feed { .. })
        ));
    }

    #[test]
    fn price_feed_rejects_zero_price() {
        let mut feed = StaticPriceFeed::new();
        assert!(feed.set_rate(weth(), usdc(), Fixed18::ZERO).is_err());
    }

    // --- Exposure ledger ---

    #[test]
    fn unknown_series_has_zero_exposure() {
        let ledger = InMemoryExposureLedger::new();
        assert_eq!(ledger.net_exposure(&series(false).id()), Fixed18::ZERO);
    }

    #[test]
    fn record_trade_accumulates() {
        let mut ledger = InMemoryExposureLedger::new();
        let id = series(true).id();
        ledger.record_trade(id, Fixed18::from_int(5), true);
        ledger.record_trade(id, Fixed18::from_int(8), false);
        assert_eq!(ledger.net_exposure(&id), Fixed18::from_int(-3));
        ledger.set_exposure(id, Fixed18::from_int(12));
        assert_eq!(ledger.net_exposure(&id), Fixed18::from_int(12));
    }

    // --- Margin ---

    #[test]
    fn margin_for_calls_and_puts() {
        let calc =
            ProportionalMarginCalculator::new(Fixed18::from(dec!(0.5)), Fixed18::from(dec!(0.25)))
                .unwrap();
        let spot = Fixed18::from_int(2000);
        let call = calc
            .naked_margin_required(&series(false), Fixed18::from_int(3), spot, 0)
            .unwrap();
        assert_eq!(call, Fixed6::from_int(3000));
        let put = calc
            .naked_margin_required(&series(true), Fixed18::from_int(3), spot, 0)
            .unwrap();
        assert_eq!(put, Fixed6::from_int(1350));
    }

    #[test]
    fn margin_truncates_to_six_decimals() {
        let calc = ProportionalMarginCalculator::fully_collateralised();
        let m = calc
            .naked_margin_required(
                &series(false),
                Fixed18::from(dec!(0.0000001)),
                Fixed18::from(dec!(1999.99)),
                0,
            )
            .unwrap();
        assert_eq!(m, Fixed6::from(dec!(0.000199)));
    }
}
