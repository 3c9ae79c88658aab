//! Core domain types: option series and their identity.
//!
//! An [`OptionSeries`] is immutable once built. Its [`SeriesId`] is the key
//! under which the vault's net exposure is recorded, so two series that
//! differ only beyond the eighth decimal of the strike share an identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conventions::format_strike;
use crate::fixed::Fixed18;

/// Option type: call or put.
///
/// Selects the SABR parameter set, the Black-Scholes branch and the
/// multiplier arrays of the tenor grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionType {
    /// Right to buy at strike price.
    Call,
    /// Right to sell at strike price.
    Put,
}

impl OptionType {
    pub fn from_is_put(is_put: bool) -> Self {
        if is_put {
            Self::Put
        } else {
            Self::Call
        }
    }

    pub fn is_put(self) -> bool {
        matches!(self, Self::Put)
    }
}

/// Opaque asset identifier (token address or ticker).
///
/// # Examples
/// ```
/// use dhv_pricer::types::AssetId;
/// let weth = AssetId::new("WETH");
/// assert_eq!(weth.as_str(), "WETH");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A standardized option contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSeries {
    /// Unix timestamp in seconds.
    pub expiration: u64,
    pub strike: Fixed18,
    pub is_put: bool,
    pub underlying: AssetId,
    pub strike_asset: AssetId,
    pub collateral: AssetId,
}

impl OptionSeries {
    pub fn option_type(&self) -> OptionType {
        OptionType::from_is_put(self.is_put)
    }

    /// Identity used to key exposure.
    pub fn id(&self) -> SeriesId {
        SeriesId {
            expiration: self.expiration,
            strike: format_strike(self.strike),
            is_put: self.is_put,
        }
    }
}

/// Identity of a series: expiration, strike at 8 decimals, put flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesId {
    pub expiration: u64,
    pub strike: Fixed18,
    pub is_put: bool,
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_put { "P" } else { "C" };
        write!(f, "{}-{}-{}", self.expiration, self.strike, kind)
    }
}
