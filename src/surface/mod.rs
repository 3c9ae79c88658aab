//! Multi-expiry SABR volatility surface.
//!
//! The surface stores one [`SabrParameters`] set per expiration. Each set
//! holds separate call and put calibrations plus the interest rate used to
//! roll spot forward to that expiry. Evaluation builds a [`SabrSmile`] on
//! the fly for the requested wing and reads the vol at the strike.
//!
//! ```
//! use dhv_pricer::fixed::Fixed18;
//! use dhv_pricer::surface::{SabrParameters, SabrVolatilityFeed};
//! use dhv_pricer::types::OptionType;
//!
//! let params: SabrParameters = "0.25,1,-0.3,1.5,0.25,1,-0.3,1.5,-0.001".parse()?;
//! let mut feed = SabrVolatilityFeed::new();
//! feed.set_sabr_parameters(params, 1_702_592_000)?;
//!
//! let point = feed.implied_volatility(
//!     OptionType::Call,
//!     Fixed18::from_int(2600),
//!     Fixed18::from_int(3000),
//!     1_702_592_000,
//!     1_700_000_000,
//! )?;
//! assert!(point.vol > Fixed18::ZERO);
//! assert!(point.forward < Fixed18::from_int(2600));
//! # Ok::<(), dhv_pricer::PricerError>(())
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::conventions::{forward_price, years_to_expiry};
use crate::error::{self, PricerError};
use crate::fixed::Fixed18;
use crate::smile::sabr::validate_sabr;
use crate::smile::{SabrSmile, SmileSection};
use crate::types::OptionType;

/// SABR calibration for one expiration: call wing, put wing, forward rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SabrParametersRaw", into = "SabrParametersRaw")]
pub struct SabrParameters {
    call_alpha: Fixed18,
    call_beta: Fixed18,
    call_rho: Fixed18,
    call_volvol: Fixed18,
    put_alpha: Fixed18,
    put_beta: Fixed18,
    put_rho: Fixed18,
    put_volvol: Fixed18,
    /// Continuously compounded rate rolling spot to the forward. May be negative.
    interest_rate: Fixed18,
}

#[derive(Serialize, Deserialize)]
struct SabrParametersRaw {
    call_alpha: Fixed18,
    call_beta: Fixed18,
    call_rho: Fixed18,
    call_volvol: Fixed18,
    put_alpha: Fixed18,
    put_beta: Fixed18,
    put_rho: Fixed18,
    put_volvol: Fixed18,
    interest_rate: Fixed18,
}

impl TryFrom<SabrParametersRaw> for SabrParameters {
    type Error = PricerError;
    fn try_from(raw: SabrParametersRaw) -> Result<Self, Self::Error> {
        Self::new(
            [raw.call_alpha, raw.call_beta, raw.call_rho, raw.call_volvol],
            [raw.put_alpha, raw.put_beta, raw.put_rho, raw.put_volvol],
            raw.interest_rate,
        )
    }
}

impl From<SabrParameters> for SabrParametersRaw {
    fn from(p: SabrParameters) -> Self {
        Self {
            call_alpha: p.call_alpha,
            call_beta: p.call_beta,
            call_rho: p.call_rho,
            call_volvol: p.call_volvol,
            put_alpha: p.put_alpha,
            put_beta: p.put_beta,
            put_rho: p.put_rho,
            put_volvol: p.put_volvol,
            interest_rate: p.interest_rate,
        }
    }
}

impl SabrParameters {
    /// Build from `[alpha, beta, rho, volvol]` for each wing.
    ///
    /// # Errors
    /// Returns [`PricerError::InvalidConfiguration`] if either wing violates
    /// α > 0, β ∈ \[0, 1\], ρ ∈ (−1, 1), ν ≥ 0.
    pub fn new(
        call: [Fixed18; 4],
        put: [Fixed18; 4],
        interest_rate: Fixed18,
    ) -> error::Result<Self> {
        let [call_alpha, call_beta, call_rho, call_volvol] = call;
        let [put_alpha, put_beta, put_rho, put_volvol] = put;
        validate_sabr(call_alpha, call_beta, call_rho, call_volvol)?;
        validate_sabr(put_alpha, put_beta, put_rho, put_volvol)?;
        Ok(Self {
            call_alpha,
            call_beta,
            call_rho,
            call_volvol,
            put_alpha,
            put_beta,
            put_rho,
            put_volvol,
            interest_rate,
        })
    }

    /// The same calibration on both wings.
    pub fn symmetric(
        alpha: Fixed18,
        beta: Fixed18,
        rho: Fixed18,
        volvol: Fixed18,
        interest_rate: Fixed18,
    ) -> error::Result<Self> {
        let wing = [alpha, beta, rho, volvol];
        Self::new(wing, wing, interest_rate)
    }

    pub fn interest_rate(&self) -> Fixed18 {
        self.interest_rate
    }

    /// `[alpha, beta, rho, volvol]` for the requested wing.
    pub fn wing(&self, option_type: OptionType) -> [Fixed18; 4] {
        match option_type {
            OptionType::Call => [self.call_alpha, self.call_beta, self.call_rho, self.call_volvol],
            OptionType::Put => [self.put_alpha, self.put_beta, self.put_rho, self.put_volvol],
        }
    }

    /// Smile for one wing at the given forward and year fraction.
    pub fn smile(
        &self,
        option_type: OptionType,
        forward: Fixed18,
        years: Fixed18,
    ) -> error::Result<SabrSmile> {
        let [alpha, beta, rho, nu] = self.wing(option_type);
        SabrSmile::new(forward, years, alpha, beta, rho, nu)
    }
}

/// Comma-separated `call_alpha,call_beta,call_rho,call_volvol,put_alpha,
/// put_beta,put_rho,put_volvol,interest_rate`.
impl FromStr for SabrParameters {
    type Err = PricerError;

    fn from_str(s: &str) -> error::Result<Self> {
        let values = s
            .split(',')
            .map(|field| field.trim().parse::<Fixed18>())
            .collect::<error::Result<Vec<_>>>()?;
        let [ca, cb, cr, cv, pa, pb, pr, pv, r]: [Fixed18; 9] =
            values.try_into().map_err(|v: Vec<Fixed18>| {
                PricerError::invalid_configuration(format!(
                    "expected 9 SABR fields, got {}",
                    v.len()
                ))
            })?;
        Self::new([ca, cb, cr, cv], [pa, pb, pr, pv], r)
    }
}

/// Vol and forward at one point of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfacePoint {
    pub vol: Fixed18,
    pub forward: Fixed18,
}

/// Per-expiration SABR parameter store and surface evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SabrVolatilityFeed {
    params: BTreeMap<u64, SabrParameters>,
}

impl SabrVolatilityFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the calibration for `expiration`.
    ///
    /// Parameters are validated at construction, so the only check left is
    /// the expiration itself.
    pub fn set_sabr_parameters(
        &mut self,
        params: SabrParameters,
        expiration: u64,
    ) -> error::Result<()> {
        if expiration == 0 {
            return Err(PricerError::invalid_configuration(
                "expiration must be a positive unix timestamp",
            ));
        }

        #[cfg(feature = "logging")]
        tracing::debug!(
            expiration,
            interest_rate = %params.interest_rate,
            replaced = self.params.contains_key(&expiration),
            "sabr parameters set"
        );

        self.params.insert(expiration, params);
        Ok(())
    }

    pub fn sabr_parameters(&self, expiration: u64) -> Option<&SabrParameters> {
        self.params.get(&expiration)
    }

    /// Configured expirations in ascending order.
    pub fn expirations(&self) -> impl Iterator<Item = u64> + '_ {
        self.params.keys().copied()
    }

    /// Implied vol and forward for a strike at an expiration.
    ///
    /// # Errors
    /// - [`PricerError::MissingVolatilityData`] when no set is stored for
    ///   `expiration`.
    /// - [`PricerError::ExpiredSeries`] when `expiration <= now`.
    pub fn implied_volatility(
        &self,
        option_type: OptionType,
        spot: Fixed18,
        strike: Fixed18,
        expiration: u64,
        now: u64,
    ) -> error::Result<SurfacePoint> {
        let params = self
            .sabr_parameters(expiration)
            .ok_or(PricerError::MissingVolatilityData { expiration })?;
        let years = years_to_expiry(now, expiration)?;
        let forward = forward_price(spot, params.interest_rate, years)?;
        let smile = params.smile(option_type, forward, years)?;
        let vol = smile.vol(strike)?;

        #[cfg(feature = "logging")]
        tracing::debug!(
            expiration,
            option_type = ?option_type,
            strike = %strike,
            forward = %forward,
            vol = %vol,
            "surface evaluated"
        );

        Ok(SurfacePoint { vol, forward })
    }
}
