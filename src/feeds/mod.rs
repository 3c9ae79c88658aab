//! Collaborators consulted while quoting.
//!
//! The pricer never owns market data or vault state. It reads them through
//! these traits, once per quote, so callers can plug in live oracles, the
//! vault's accounting, or the in-memory versions in [`memory`].

pub mod memory;

pub use memory::{InMemoryExposureLedger, ProportionalMarginCalculator, StaticPriceFeed};

use crate::error;
use crate::fixed::{Fixed18, Fixed6};
use crate::types::{AssetId, OptionSeries, SeriesId};

/// Spot price source.
pub trait PriceFeed: Send + Sync {
    /// Price of one `underlying` in units of `strike_asset`.
    fn normalized_rate(
        &self,
        underlying: &AssetId,
        strike_asset: &AssetId,
    ) -> error::Result<Fixed18>;
}

/// Net exposure of the vault per series. Positive = net long.
pub trait ExposureLedger: Send + Sync {
    /// Unknown series have zero exposure.
    fn net_exposure(&self, series: &SeriesId) -> Fixed18;
}

/// Margin required to write uncovered contracts.
pub trait MarginCalculator: Send + Sync {
    fn naked_margin_required(
        &self,
        series: &OptionSeries,
        amount: Fixed18,
        spot: Fixed18,
        now: u64,
    ) -> error::Result<Fixed6>;
}
