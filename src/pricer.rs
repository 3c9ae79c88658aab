//! Quote aggregation.
//!
//! [`Pricer`] borrows a [`PricerConfig`] and three collaborators and turns a
//! trade request into a [`Quote`]:
//!
//! 1. reject expired series and non-positive sizes;
//! 2. read spot and exposure once into a [`MarketSnapshot`];
//! 3. SABR vol → Black-Scholes premium and delta, substituting the flat IV
//!    for low-delta sales;
//! 4. scale by the slippage factor;
//! 5. subtract (sale) or add (purchase) the spread, floored at zero;
//! 6. convert totals to collateral precision and charge the fee.
//!
//! The config is borrowed immutably for the pricer's whole lifetime, so it
//! cannot change while a quote is being computed.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::PricerConfig;
use crate::conventions::years_to_expiry;
use crate::error::{self, PricerError};
use crate::feeds::{ExposureLedger, MarginCalculator, PriceFeed};
use crate::fixed::{Fixed18, Fixed6};
use crate::grid::MultiplierKind;
use crate::pricing::black_scholes::premium_and_delta;
use crate::spread::{SpreadBreakdown, SpreadModel, SpreadRequest};
use crate::types::OptionSeries;

/// Spot and exposure as read at the start of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub spot: Fixed18,
    /// Vault net exposure for the series. Positive = net long.
    pub exposure: Fixed18,
}

/// One entry of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub series: OptionSeries,
    pub amount: Fixed18,
    pub is_sell: bool,
    pub exposure_override: Option<Fixed18>,
}

/// Intermediate values behind a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteBreakdown {
    /// Surface vol at the strike, even when the flat IV priced the trade.
    pub implied_vol: Fixed18,
    pub forward: Fixed18,
    /// Per-contract Black-Scholes premium actually used.
    pub vanilla_premium: Fixed18,
    pub slippage_multiplier: Fixed18,
    pub spread: SpreadBreakdown,
    pub used_flat_iv: bool,
    /// Instrument delta of one contract.
    pub unit_delta: Fixed18,
}

/// Price of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Total premium for the whole amount, never negative.
    pub premium: Fixed18,
    /// `premium` truncated to collateral precision.
    pub total_premium: Fixed6,
    /// `unit_delta × amount`, negated for sales.
    pub total_delta: Fixed18,
    /// `fee_per_contract × amount`, truncated.
    pub total_fees: Fixed6,
    pub breakdown: QuoteBreakdown,
}

/// Quote engine over a borrowed configuration.
#[derive(Clone, Copy)]
pub struct Pricer<'a> {
    config: &'a PricerConfig,
    price_feed: &'a dyn PriceFeed,
    exposure_ledger: &'a dyn ExposureLedger,
    margin: &'a dyn MarginCalculator,
}

impl std::fmt::Debug for Pricer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pricer")
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> Pricer<'a> {
    pub fn new(
        config: &'a PricerConfig,
        price_feed: &'a dyn PriceFeed,
        exposure_ledger: &'a dyn ExposureLedger,
        margin: &'a dyn MarginCalculator,
    ) -> Self {
        Self {
            config,
            price_feed,
            exposure_ledger,
            margin,
        }
    }

    pub fn config(&self) -> &'a PricerConfig {
        self.config
    }

    /// Read spot and exposure for a series. An override replaces the ledger.
    pub fn snapshot(
        &self,
        series: &OptionSeries,
        exposure_override: Option<Fixed18>,
    ) -> error::Result<MarketSnapshot> {
        let spot = self
            .price_feed
            .normalized_rate(&series.underlying, &series.strike_asset)?;
        if !spot.is_positive() {
            return Err(PricerError::Feed {
                message: format!(
                    "non-positive spot {spot} for {}/{}",
                    series.underlying, series.strike_asset
                ),
            });
        }
        let exposure = match exposure_override {
            Some(e) => e,
            None => self.exposure_ledger.net_exposure(&series.id()),
        };
        Ok(MarketSnapshot { spot, exposure })
    }

    /// Quote `amount` contracts of `series`.
    ///
    /// `is_sell` is from the counterparty's side: `true` means the vault
    /// buys. `now` is the unix time of the quote.
    ///
    /// # Errors
    /// - [`PricerError::ExpiredSeries`] when `series.expiration <= now`.
    /// - [`PricerError::InvalidInput`] for a non-positive amount.
    /// - [`PricerError::MissingVolatilityData`] without SABR data for the
    ///   expiration.
    /// - [`PricerError::OutOfRangeTenor`] beyond the last interpolable tenor.
    /// - [`PricerError::Feed`] if spot or margin cannot be read.
    pub fn quote_option_price(
        &self,
        series: &OptionSeries,
        amount: Fixed18,
        is_sell: bool,
        exposure_override: Option<Fixed18>,
        now: u64,
    ) -> error::Result<Quote> {
        check_request(series, amount, now)?;
        let snapshot = self.snapshot(series, exposure_override)?;
        self.quote_checked(series, amount, is_sell, snapshot, now)
    }

    /// Quote against spot and exposure supplied by the caller.
    pub fn quote_with_snapshot(
        &self,
        series: &OptionSeries,
        amount: Fixed18,
        is_sell: bool,
        snapshot: MarketSnapshot,
        now: u64,
    ) -> error::Result<Quote> {
        check_request(series, amount, now)?;
        self.quote_checked(series, amount, is_sell, snapshot, now)
    }

    /// Pricing steps for a request that already passed `check_request`.
    fn quote_checked(
        &self,
        series: &OptionSeries,
        amount: Fixed18,
        is_sell: bool,
        snapshot: MarketSnapshot,
        now: u64,
    ) -> error::Result<Quote> {
        let config = self.config;
        let option_type = series.option_type();
        let MarketSnapshot { spot, exposure } = snapshot;

        #[cfg(feature = "logging")]
        tracing::debug!(
            series = %series.id(),
            amount = %amount,
            is_sell,
            spot = %spot,
            exposure = %exposure,
            "quote started"
        );

        let years = years_to_expiry(now, series.expiration)?;
        let point = config.volatility().implied_volatility(
            option_type,
            spot,
            series.strike,
            series.expiration,
            now,
        )?;
        let surface = premium_and_delta(
            option_type,
            spot,
            series.strike,
            years,
            point.vol,
            config.risk_free_rate(),
        )?;
        let unit_delta = surface.delta;

        let used_flat_iv = is_sell && unit_delta.abs() < config.low_delta_threshold();
        let vanilla_premium = if used_flat_iv {
            premium_and_delta(
                option_type,
                spot,
                series.strike,
                years,
                config.low_delta_sell_option_flat_iv(),
                config.risk_free_rate(),
            )?
            .premium
        } else {
            surface.premium
        };

        let grid = config.tenor_grid();
        let position = grid.tenor_position(now, series.expiration)?;
        let band = grid.delta_band(unit_delta)?;

        let slippage_multiplier = config.slippage().multiplier(
            grid.interpolate(MultiplierKind::SlippageGradient, position, band)?,
            exposure,
            amount,
            is_sell,
        )?;
        let slipped = vanilla_premium
            .mul_down(amount)?
            .mul_down(slippage_multiplier)?;

        // Only purchases can leave the vault net short.
        let collateral = if is_sell {
            Fixed6::ZERO
        } else {
            let net_short = SpreadModel::net_short_contracts(amount, exposure);
            if net_short.is_positive() {
                self.margin
                    .naked_margin_required(series, net_short, spot, now)?
            } else {
                Fixed6::ZERO
            }
        };
        let spread = config.spread().spread(&SpreadRequest {
            is_sell,
            amount,
            unit_delta,
            spot,
            years,
            collateral,
            collateral_multiplier: grid.interpolate(
                MultiplierKind::SpreadCollateral,
                position,
                band,
            )?,
            delta_multiplier: grid.interpolate(MultiplierKind::SpreadDelta, position, band)?,
        })?;

        let premium = if is_sell {
            (slipped - spread.total).max(Fixed18::ZERO)
        } else {
            slipped + spread.total
        };

        let total_delta = unit_delta.mul_down(amount)?;
        let total_fees = config
            .fee_per_contract()
            .to_fixed18()
            .mul_down(amount)?
            .to_fixed6();

        let quote = Quote {
            premium,
            total_premium: premium.to_fixed6(),
            total_delta: if is_sell { -total_delta } else { total_delta },
            total_fees,
            breakdown: QuoteBreakdown {
                implied_vol: point.vol,
                forward: point.forward,
                vanilla_premium,
                slippage_multiplier,
                spread,
                used_flat_iv,
                unit_delta,
            },
        };

        #[cfg(feature = "logging")]
        tracing::debug!(
            series = %series.id(),
            premium = %quote.premium,
            total_delta = %quote.total_delta,
            used_flat_iv,
            "quote finished"
        );

        Ok(quote)
    }

    /// Quote several requests against the same configuration.
    ///
    /// Each request takes its own market snapshot; one failing request does
    /// not affect the others.
    pub fn quote_batch(
        &self,
        requests: &[QuoteRequest],
        now: u64,
    ) -> Vec<error::Result<Quote>> {
        let quote_one = |r: &QuoteRequest| {
            self.quote_option_price(&r.series, r.amount, r.is_sell, r.exposure_override, now)
        };

        #[cfg(feature = "parallel")]
        let quotes = requests.par_iter().map(quote_one).collect();
        #[cfg(not(feature = "parallel"))]
        let quotes = requests.iter().map(quote_one).collect();

        quotes
    }
}

fn check_request(series: &OptionSeries, amount: Fixed18, now: u64) -> error::Result<()> {
    if series.expiration <= now {
        return Err(PricerError::ExpiredSeries {
            expiration: series.expiration,
            now,
        });
    }
    if !amount.is_positive() {
        return Err(PricerError::invalid_input(format!(
            "trade amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::{InMemoryExposureLedger, ProportionalMarginCalculator, StaticPriceFeed};
    use crate::grid::TenorGrid;
    use crate::spread::DeltaBorrowRates;
    use crate::types::AssetId;
    use rust_decimal_macros::dec;

    const NOW: u64 = 1_700_000_000;
    const EXPIRY: u64 = NOW + 30 * 86_400;

    fn d(v: rust_decimal::Decimal) -> Fixed18 {
        Fixed18::from(v)
    }

    fn series(strike: i64, is_put: bool) -> OptionSeries {
        OptionSeries {
            expiration: EXPIRY,
            strike: Fixed18::from_int(strike),
            is_put,
            underlying: AssetId::new("WETH"),
            strike_asset: AssetId::new("USDC"),
            collateral: AssetId::new("USDC"),
        }
    }

    fn config() -> PricerConfig {
        let grid =
            TenorGrid::uniform(Fixed18::from_int(10), 5, Fixed18::from_int(2800), Fixed18::ONE)
                .unwrap();
        let mut c = PricerConfig::new(grid);
        c.set_sabr_parameters(
            "0.25,1,-0.3,1.5,0.25,1,-0.3,1.5,-0.001".parse().unwrap(),
            EXPIRY,
        )
        .unwrap();
        c
    }

    fn feed() -> StaticPriceFeed {
        StaticPriceFeed::new()
            .with_rate(AssetId::new("WETH"), AssetId::new("USDC"), Fixed18::from_int(2600))
            .unwrap()
    }

    struct Fixture {
        config: PricerConfig,
        feed: StaticPriceFeed,
        ledger: InMemoryExposureLedger,
        margin: ProportionalMarginCalculator,
    }

    impl Fixture {
        fn new(config: PricerConfig) -> Self {
            Self {
                config,
                feed: feed(),
                ledger: InMemoryExposureLedger::new(),
                margin: ProportionalMarginCalculator::fully_collateralised(),
            }
        }

        fn pricer(&self) -> Pricer<'_> {
            Pricer::new(&self.config, &self.feed, &self.ledger, &self.margin)
        }
    }

    // --- Request validation ---

    #[test]
    fn expired_series_rejected_before_feeds() {
        let f = Fixture::new(config());
        let r = f
            .pricer()
            .quote_option_price(&series(3000, false), Fixed18::ONE, false, None, EXPIRY);
        assert!(matches!(r, Err(PricerError::ExpiredSeries { .. })));
    }

    #[test]
    fn snapshot_quotes_are_validated_too() {
        let f = Fixture::new(config());
        let snapshot = MarketSnapshot {
            spot: Fixed18::from_int(2600),
            exposure: Fixed18::ZERO,
        };
        let p = f.pricer();
        let s = series(3000, false);
        assert!(matches!(
            p.quote_with_snapshot(&s, Fixed18::ONE, false, snapshot, EXPIRY),
            Err(PricerError::ExpiredSeries { .. })
        ));
        assert!(matches!(
            p.quote_with_snapshot(&s, -Fixed18::ONE, false, snapshot, NOW),
            Err(PricerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn non_positive_amount_rejected() {
        let f = Fixture::new(config());
        let r = f
            .pricer()
            .quote_option_price(&series(3000, false), Fixed18::ZERO, true, None, NOW);
        assert!(matches!(r, Err(PricerError::InvalidInput { .. })));
    }

    #[test]
    fn missing_price_is_feed_error() {
        let f = Fixture::new(config());
        let mut s = series(3000, false);
        s.underlying = AssetId::new("WBTC");
        let r = f.pricer().quote_option_price(&s, Fixed18::ONE, false, None, NOW);
        assert!(matches!(r, Err(PricerError::Feed { .. })));
    }

    #[test]
    fn missing_sabr_data() {
        let f = Fixture::new(config());
        let mut s = series(3000, false);
        s.expiration = EXPIRY + 86_400;
        let r = f.pricer().quote_option_price(&s, Fixed18::ONE, false, None, NOW);
        assert!(matches!(r, Err(PricerError::MissingVolatilityData { .. })));
    }

    // --- Snapshot ---

    #[test]
    fn snapshot_prefers_override() {
        let mut f = Fixture::new(config());
        let s = series(3000, false);
        f.ledger.set_exposure(s.id(), Fixed18::from_int(7));
        let p = f.pricer();
        assert_eq!(p.snapshot(&s, None).unwrap().exposure, Fixed18::from_int(7));
        assert_eq!(
            p.snapshot(&s, Some(Fixed18::from_int(-3))).unwrap().exposure,
            Fixed18::from_int(-3)
        );
        assert_eq!(p.snapshot(&s, None).unwrap().spot, Fixed18::from_int(2600));
    }

    // --- Composition ---

    #[test]
    fn plain_purchase_is_black_scholes_times_amount() {
        let f = Fixture::new(config());
        let q = f
            .pricer()
            .quote_option_price(&series(2600, false), Fixed18::from_int(3), false, None, NOW)
            .unwrap();
        assert!(!q.breakdown.used_flat_iv);
        assert_eq!(q.breakdown.slippage_multiplier, Fixed18::ONE);
        assert_eq!(q.breakdown.spread.total, Fixed18::ZERO);
        assert_eq!(
            q.premium,
            q.breakdown.vanilla_premium.mul_down(Fixed18::from_int(3)).unwrap()
        );
        assert_eq!(q.total_premium, q.premium.to_fixed6());
    }

    #[test]
    fn delta_sign_follows_direction() {
        let f = Fixture::new(config());
        let p = f.pricer();
        let buy = p
            .quote_option_price(&series(2500, true), Fixed18::from_int(2), false, None, NOW)
            .unwrap();
        let sell = p
            .quote_option_price(&series(2500, true), Fixed18::from_int(2), true, None, NOW)
            .unwrap();
        assert!(buy.breakdown.unit_delta.is_negative());
        assert_eq!(
            buy.total_delta,
            buy.breakdown.unit_delta.mul_down(Fixed18::from_int(2)).unwrap()
        );
        assert_eq!(sell.total_delta, -buy.total_delta);
    }

    #[test]
    fn fees_scale_with_amount() {
        let mut c = config();
        c.set_fee_per_contract(Fixed6::from(dec!(0.5))).unwrap();
        let f = Fixture::new(c);
        let q = f
            .pricer()
            .quote_option_price(&series(2600, false), d(dec!(2.5)), false, None, NOW)
            .unwrap();
        assert_eq!(q.total_fees, Fixed6::from(dec!(1.25)));
    }

    #[test]
    fn low_delta_sale_uses_flat_iv_purchase_does_not() {
        let mut c = config();
        c.set_low_delta_sell_option_flat_iv(d(dec!(0.25))).unwrap();
        let f = Fixture::new(c);
        let p = f.pricer();
        let sell = p
            .quote_option_price(&series(3000, false), Fixed18::ONE, true, None, NOW)
            .unwrap();
        let buy = p
            .quote_option_price(&series(3000, false), Fixed18::ONE, false, None, NOW)
            .unwrap();
        assert!(sell.breakdown.used_flat_iv);
        assert!(!buy.breakdown.used_flat_iv);
        assert_ne!(sell.breakdown.vanilla_premium, buy.breakdown.vanilla_premium);
        assert_eq!(sell.breakdown.implied_vol, buy.breakdown.implied_vol);
    }

    #[test]
    fn purchase_spread_charges_collateral_for_net_short() {
        let mut c = config();
        c.set_collateral_lending_rate(d(dec!(0.04))).unwrap();
        let f = Fixture::new(c);
        let p = f.pricer();
        let s = series(2600, false);
        let flat = p
            .quote_option_price(&s, Fixed18::from_int(2), false, Some(Fixed18::ZERO), NOW)
            .unwrap();
        let covered = p
            .quote_option_price(&s, Fixed18::from_int(2), false, Some(Fixed18::from_int(5)), NOW)
            .unwrap();
        assert!(flat.breakdown.spread.collateral_lending.is_positive());
        assert_eq!(covered.breakdown.spread.collateral_lending, Fixed18::ZERO);
        assert!(flat.premium > covered.premium);
    }

    #[test]
    fn sale_spread_reduces_premium_floored_at_zero() {
        let mut c = config();
        c.set_delta_borrow_rates(DeltaBorrowRates {
            sell_long: d(dec!(0.5)),
            sell_short: Fixed18::from_int(50),
            buy_long: Fixed18::ZERO,
            buy_short: Fixed18::ZERO,
        })
        .unwrap();
        let f = Fixture::new(c);
        let q = f
            .pricer()
            .quote_option_price(&series(2600, false), Fixed18::ONE, true, None, NOW)
            .unwrap();
        assert!(q.breakdown.spread.total > Fixed18::ZERO);
        assert_eq!(q.premium, Fixed18::ZERO);
        assert_eq!(q.total_premium, Fixed6::ZERO);
    }

    /// Margin source that is never available.
    struct UnavailableMargin;

    impl MarginCalculator for UnavailableMargin {
        fn naked_margin_required(
            &self,
            _series: &OptionSeries,
            _amount: Fixed18,
            _spot: Fixed18,
            _now: u64,
        ) -> error::Result<Fixed6> {
            Err(PricerError::Feed {
                message: "margin unavailable".into(),
            })
        }
    }

    #[test]
    fn margin_is_only_read_for_net_short_purchases() {
        let c = config();
        let (feed, ledger) = (feed(), InMemoryExposureLedger::new());
        let p = Pricer::new(&c, &feed, &ledger, &UnavailableMargin);
        let s = series(2600, false);
        let amount = Fixed18::from_int(3);

        assert!(p.quote_option_price(&s, amount, true, None, NOW).is_ok());
        assert!(p
            .quote_option_price(&s, amount, false, Some(Fixed18::from_int(3)), NOW)
            .is_ok());
        assert!(matches!(
            p.quote_option_price(&s, amount, false, None, NOW),
            Err(PricerError::Feed { .. })
        ));
    }

    #[test]
    fn vanishing_flat_iv_prices_otm_sale_at_zero() {
        let mut c = config();
        c.set_low_delta_sell_option_flat_iv(d(dec!(0.000000000000001))).unwrap();
        let f = Fixture::new(c);
        let q = f
            .pricer()
            .quote_option_price(&series(3000, false), Fixed18::ONE, true, None, NOW)
            .unwrap();
        assert!(q.breakdown.used_flat_iv);
        assert_eq!(q.breakdown.vanilla_premium, Fixed18::ZERO);
        assert_eq!(q.premium, Fixed18::ZERO);
    }

    // --- Batch ---

    #[test]
    fn batch_quotes_independently() {
        let f = Fixture::new(config());
        let ok = QuoteRequest {
            series: series(2600, false),
            amount: Fixed18::ONE,
            is_sell: false,
            exposure_override: None,
        };
        let bad = QuoteRequest {
            amount: Fixed18::ZERO,
            ..ok.clone()
        };
        let results = f.pricer().quote_batch(&[ok.clone(), bad, ok], NOW);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(results[0].as_ref().unwrap(), results[2].as_ref().unwrap());
    }
}
