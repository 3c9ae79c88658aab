//! # dhv-pricer
//!
//! Quote engine for a delta-hedged options vault.
//!
//! Turns a trade request (series, size, direction) into a premium, a delta
//! and a fee: SABR implied vol → Black-Scholes fair value → inventory-skew
//! slippage → cost-of-capital spread.
//!
//! ## Architecture
//!
//! - **`fixed`**: 18- and 6-decimal fixed-point numbers with truncating arithmetic
//! - **`smile`**: Single-expiry SABR smile (Hagan lognormal approximation)
//! - **`surface`**: SABR parameter sets per expiration, call and put wings
//! - **`pricing`**: Black-Scholes premium and delta
//! - **`grid`**: Tenor × delta-band multiplier grid with linear interpolation
//! - **`slippage`**, **`spread`**: Premium adjustments
//! - **`feeds`**: Spot, exposure and margin collaborators
//! - **`pricer`**: Quote aggregation
//!
//! ## Design
//!
//! - **Deterministic arithmetic.** All money and rate values are [`Fixed18`]
//!   or [`Fixed6`]. Every multiplication and division truncates toward zero,
//!   so a quote is reproducible bit for bit.
//! - **No panics.** Every fallible operation returns [`Result`]. Library code
//!   never calls `unwrap()` or `expect()`.
//! - **Read-only quoting.** [`Pricer`] borrows its [`PricerConfig`]; the
//!   configuration cannot change while quotes are computed against it.
//! - **Thread-safe.** Collaborator traits require `Send + Sync`. With the
//!   `parallel` feature, [`Pricer::quote_batch`] quotes on the rayon pool.
//! - **Serializable.** Configuration types implement Serde `Serialize` /
//!   `Deserialize` with validation on deserialization.
//!
//! ## Example
//!
//! ```
//! use dhv_pricer::{
//!     AssetId, Fixed18, InMemoryExposureLedger, OptionSeries, Pricer, PricerConfig,
//!     ProportionalMarginCalculator, StaticPriceFeed, TenorGrid,
//! };
//!
//! let now = 1_700_000_000;
//! let expiration = now + 30 * 86_400;
//!
//! let grid = TenorGrid::uniform(Fixed18::from_int(10), 5, Fixed18::from_int(2800), Fixed18::ONE)?;
//! let mut config = PricerConfig::new(grid);
//! config.set_sabr_parameters("0.25,1,-0.3,1.5,0.25,1,-0.3,1.5,0".parse()?, expiration)?;
//!
//! let feed = StaticPriceFeed::new().with_rate(
//!     AssetId::new("WETH"),
//!     AssetId::new("USDC"),
//!     Fixed18::from_int(2600),
//! )?;
//! let ledger = InMemoryExposureLedger::new();
//! let margin = ProportionalMarginCalculator::fully_collateralised();
//! let pricer = Pricer::new(&config, &feed, &ledger, &margin);
//!
//! let series = OptionSeries {
//!     expiration,
//!     strike: Fixed18::from_int(2600),
//!     is_put: false,
//!     underlying: AssetId::new("WETH"),
//!     strike_asset: AssetId::new("USDC"),
//!     collateral: AssetId::new("USDC"),
//! };
//! let quote = pricer.quote_option_price(&series, Fixed18::ONE, false, None, now)?;
//! assert!(quote.premium.is_positive());
//! # Ok::<(), dhv_pricer::PricerError>(())
//! ```

pub mod config;
pub mod conventions;
pub mod error;
pub mod feeds;
pub mod fixed;
pub mod grid;
pub mod pricer;
pub mod pricing;
pub mod slippage;
pub mod smile;
pub mod spread;
pub mod surface;
pub mod types;
mod validate;

#[doc(inline)]
pub use config::{PricerConfig, PricerConfigBuilder};
#[doc(inline)]
pub use error::{PricerError, Result};
#[doc(inline)]
pub use feeds::{
    ExposureLedger, InMemoryExposureLedger, MarginCalculator, PriceFeed,
    ProportionalMarginCalculator, StaticPriceFeed,
};
#[doc(inline)]
pub use fixed::{Fixed18, Fixed6};
#[doc(inline)]
pub use grid::{MultiplierKind, TenorGrid, TenorPricingParams};
#[doc(inline)]
pub use pricer::{MarketSnapshot, Pricer, Quote, QuoteBreakdown, QuoteRequest};
#[doc(inline)]
pub use slippage::SlippageModel;
#[doc(inline)]
pub use smile::{SabrSmile, SmileSection};
#[doc(inline)]
pub use spread::{DeltaBorrowRates, SpreadBreakdown, SpreadModel};
#[doc(inline)]
pub use surface::{SabrParameters, SabrVolatilityFeed, SurfacePoint};
#[doc(inline)]
pub use types::{AssetId, OptionSeries, OptionType, SeriesId};
