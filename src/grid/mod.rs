//! Tenor × delta-band multiplier grids.
//!
//! The pricer scales three quantities by a multiplier that depends on how
//! far the option is from expiry and how deep in the money it is:
//!
//! - the slippage gradient,
//! - the collateral-lending spread,
//! - the delta-borrow spread.
//!
//! Each tenor carries a call and a put array for each of those, indexed by
//! delta band. Tenors are spaced evenly in `√(seconds to expiry)` from 0 to
//! `max_tenor_value`; lookups interpolate linearly between the two tenors
//! bracketing the expiry and select the band from `|delta|`.
//!
//! ```
//! use dhv_pricer::fixed::Fixed18;
//! use dhv_pricer::grid::{MultiplierKind, TenorGrid};
//!
//! // 10 delta bands of width 10, 5 tenors spanning √τ ∈ [0, 2800].
//! let grid = TenorGrid::uniform(Fixed18::from_int(10), 5, Fixed18::from_int(2800), Fixed18::ONE)?;
//! assert_eq!(grid.number_of_delta_bands(), 10);
//!
//! let m = grid.multiplier(MultiplierKind::SlippageGradient, 0, 2_592_000, Fixed18::ONE)?;
//! assert_eq!(m, Fixed18::ONE);
//! # Ok::<(), dhv_pricer::PricerError>(())
//! ```

mod interp;

use serde::{Deserialize, Serialize};

use crate::conventions::seconds_to_expiry;
use crate::error::{self, PricerError};
use crate::fixed::Fixed18;
use crate::types::OptionType;
use crate::validate::{validate_in_range, validate_multipliers, validate_positive};

/// Which of the three multiplier families to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MultiplierKind {
    SlippageGradient,
    SpreadCollateral,
    SpreadDelta,
}

impl MultiplierKind {
    fn name(self) -> &'static str {
        match self {
            Self::SlippageGradient => "slippage gradient",
            Self::SpreadCollateral => "spread collateral",
            Self::SpreadDelta => "spread delta",
        }
    }
}

/// Multiplier arrays for one tenor, each indexed by delta band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenorPricingParams {
    pub call_slippage_gradient_multipliers: Vec<Fixed18>,
    pub put_slippage_gradient_multipliers: Vec<Fixed18>,
    pub call_spread_collateral_multipliers: Vec<Fixed18>,
    pub put_spread_collateral_multipliers: Vec<Fixed18>,
    pub call_spread_delta_multipliers: Vec<Fixed18>,
    pub put_spread_delta_multipliers: Vec<Fixed18>,
}

impl TenorPricingParams {
    /// Every array filled with `value`.
    pub fn uniform(number_of_delta_bands: usize, value: Fixed18) -> Self {
        let row = vec![value; number_of_delta_bands];
        Self {
            call_slippage_gradient_multipliers: row.clone(),
            put_slippage_gradient_multipliers: row.clone(),
            call_spread_collateral_multipliers: row.clone(),
            put_spread_collateral_multipliers: row.clone(),
            call_spread_delta_multipliers: row.clone(),
            put_spread_delta_multipliers: row,
        }
    }

    pub fn multipliers(&self, kind: MultiplierKind, option_type: OptionType) -> &[Fixed18] {
        use MultiplierKind::{SlippageGradient, SpreadCollateral, SpreadDelta};
        match (kind, option_type) {
            (SlippageGradient, OptionType::Call) => &self.call_slippage_gradient_multipliers,
            (SlippageGradient, OptionType::Put) => &self.put_slippage_gradient_multipliers,
            (SpreadCollateral, OptionType::Call) => &self.call_spread_collateral_multipliers,
            (SpreadCollateral, OptionType::Put) => &self.put_spread_collateral_multipliers,
            (SpreadDelta, OptionType::Call) => &self.call_spread_delta_multipliers,
            (SpreadDelta, OptionType::Put) => &self.put_spread_delta_multipliers,
        }
    }

    fn set(&mut self, kind: MultiplierKind, call: Vec<Fixed18>, put: Vec<Fixed18>) {
        let (c, p) = match kind {
            MultiplierKind::SlippageGradient => (
                &mut self.call_slippage_gradient_multipliers,
                &mut self.put_slippage_gradient_multipliers,
            ),
            MultiplierKind::SpreadCollateral => (
                &mut self.call_spread_collateral_multipliers,
                &mut self.put_spread_collateral_multipliers,
            ),
            MultiplierKind::SpreadDelta => (
                &mut self.call_spread_delta_multipliers,
                &mut self.put_spread_delta_multipliers,
            ),
        };
        *c = call;
        *p = put;
    }

    fn validate(&self, number_of_delta_bands: usize, tenor: usize) -> error::Result<()> {
        for kind in [
            MultiplierKind::SlippageGradient,
            MultiplierKind::SpreadCollateral,
            MultiplierKind::SpreadDelta,
        ] {
            for option_type in [OptionType::Call, OptionType::Put] {
                check_row(
                    self.multipliers(kind, option_type),
                    number_of_delta_bands,
                    tenor,
                    kind,
                    option_type,
                )?;
            }
        }
        Ok(())
    }
}

fn check_row(
    row: &[Fixed18],
    number_of_delta_bands: usize,
    tenor: usize,
    kind: MultiplierKind,
    option_type: OptionType,
) -> error::Result<()> {
    let name = format!("tenor {tenor} {option_type:?} {} multipliers", kind.name());
    if row.len() != number_of_delta_bands {
        return Err(PricerError::invalid_configuration(format!(
            "{name}: length {} != {number_of_delta_bands} delta bands",
            row.len()
        )));
    }
    validate_multipliers(row, &name)
}

/// Bracketing tenor and the fractional distance towards the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenorPosition {
    pub index: usize,
    /// In `[0, 1)`.
    pub remainder: Fixed18,
}

/// Delta band and the option wing it reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaBand {
    pub index: usize,
    pub option_type: OptionType,
}

/// Multiplier grid over tenors and delta bands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TenorGridRaw", into = "TenorGridRaw")]
pub struct TenorGrid {
    /// Width of one delta band in delta percentage points, in `(0, 100]`.
    delta_band_width: Fixed18,
    /// `√(seconds to expiry)` of the last tenor.
    max_tenor_value: Fixed18,
    tenors: Vec<TenorPricingParams>,
}

#[derive(Serialize, Deserialize)]
struct TenorGridRaw {
    delta_band_width: Fixed18,
    max_tenor_value: Fixed18,
    tenors: Vec<TenorPricingParams>,
}

impl TryFrom<TenorGridRaw> for TenorGrid {
    type Error = PricerError;
    fn try_from(raw: TenorGridRaw) -> Result<Self, Self::Error> {
        Self::new(raw.delta_band_width, raw.max_tenor_value, raw.tenors)
    }
}

impl From<TenorGrid> for TenorGridRaw {
    fn from(g: TenorGrid) -> Self {
        Self {
            delta_band_width: g.delta_band_width,
            max_tenor_value: g.max_tenor_value,
            tenors: g.tenors,
        }
    }
}

fn bands_for_width(delta_band_width: Fixed18) -> error::Result<usize> {
    validate_in_range(
        delta_band_width,
        Fixed18::ZERO,
        Fixed18::from_int(100),
        "delta_band_width",
    )?;
    validate_positive(delta_band_width, "delta_band_width")?;
    Fixed18::from_int(100)
        .div_down(delta_band_width)?
        .floor_to_usize()
}

impl TenorGrid {
    /// Build a grid from per-tenor parameters.
    ///
    /// # Errors
    /// Returns [`PricerError::InvalidConfiguration`] if the band width is not
    /// in `(0, 100]`, fewer than two tenors are given, `max_tenor_value` is
    /// not positive, or any array has the wrong length or a non-positive
    /// entry.
    pub fn new(
        delta_band_width: Fixed18,
        max_tenor_value: Fixed18,
        tenors: Vec<TenorPricingParams>,
    ) -> error::Result<Self> {
        let bands = bands_for_width(delta_band_width)?;
        validate_positive(max_tenor_value, "max_tenor_value")?;
        if tenors.len() < 2 {
            return Err(PricerError::invalid_configuration(format!(
                "at least 2 tenors required, got {}",
                tenors.len()
            )));
        }
        for (i, tenor) in tenors.iter().enumerate() {
            tenor.validate(bands, i)?;
        }
        Ok(Self {
            delta_band_width,
            max_tenor_value,
            tenors,
        })
    }

    /// Grid whose every multiplier equals `value`.
    pub fn uniform(
        delta_band_width: Fixed18,
        number_of_tenors: usize,
        max_tenor_value: Fixed18,
        value: Fixed18,
    ) -> error::Result<Self> {
        let bands = bands_for_width(delta_band_width)?;
        let tenors = vec![TenorPricingParams::uniform(bands, value); number_of_tenors];
        Self::new(delta_band_width, max_tenor_value, tenors)
    }

    pub fn delta_band_width(&self) -> Fixed18 {
        self.delta_band_width
    }

    pub fn max_tenor_value(&self) -> Fixed18 {
        self.max_tenor_value
    }

    pub fn number_of_tenors(&self) -> usize {
        self.tenors.len()
    }

    pub fn number_of_delta_bands(&self) -> usize {
        self.tenors
            .first()
            .map_or(0, |t| t.call_slippage_gradient_multipliers.len())
    }

    pub fn tenor_params(&self, tenor_index: usize) -> Option<&TenorPricingParams> {
        self.tenors.get(tenor_index)
    }

    /// Replace the call and put arrays of one family at one tenor.
    ///
    /// # Errors
    /// Returns [`PricerError::InvalidConfiguration`] for an unknown tenor,
    /// a length mismatch or a non-positive entry. The grid is unchanged on
    /// error.
    pub fn set_multipliers(
        &mut self,
        tenor_index: usize,
        kind: MultiplierKind,
        call: Vec<Fixed18>,
        put: Vec<Fixed18>,
    ) -> error::Result<()> {
        let bands = self.number_of_delta_bands();
        let number_of_tenors = self.tenors.len();
        let tenor = self.tenors.get_mut(tenor_index).ok_or_else(|| {
            PricerError::invalid_configuration(format!(
                "tenor index {tenor_index} out of range for {number_of_tenors} tenors"
            ))
        })?;
        check_row(&call, bands, tenor_index, kind, OptionType::Call)?;
        check_row(&put, bands, tenor_index, kind, OptionType::Put)?;
        tenor.set(kind, call, put);
        Ok(())
    }

    /// Locate an expiry on the tenor axis.
    ///
    /// `√τ` is taken over seconds to expiry; tenors sit at multiples of
    /// `max_tenor_value / (number_of_tenors − 1)`.
    ///
    /// # Errors
    /// - [`PricerError::ExpiredSeries`] when `expiration <= now`.
    /// - [`PricerError::OutOfRangeTenor`] when the expiry lies at or beyond
    ///   the last tenor, leaving no upper neighbour to interpolate with.
    pub fn tenor_position(&self, now: u64, expiration: u64) -> error::Result<TenorPosition> {
        let sqrt_tau = Fixed18::from_u64(seconds_to_expiry(now, expiration)?).sqrt()?;
        let intervals = self.tenors.len().saturating_sub(1);
        let unrounded = sqrt_tau
            .mul_down(Fixed18::from_u64(intervals as u64))?
            .div_down(self.max_tenor_value)?;
        let index = unrounded.floor_to_usize()?;
        if index + 1 >= self.tenors.len() {
            return Err(PricerError::OutOfRangeTenor {
                sqrt_tau,
                max_tenor_value: self.max_tenor_value,
            });
        }
        let remainder = unrounded - Fixed18::from_u64(index as u64);
        Ok(TenorPosition { index, remainder })
    }

    /// Band for an instrument delta: `floor(|delta| · 100 / width)`, clamped
    /// to the last band. Negative deltas read the put arrays.
    pub fn delta_band(&self, delta: Fixed18) -> error::Result<DeltaBand> {
        let option_type = OptionType::from_is_put(delta.is_negative());
        let raw = delta
            .abs()
            .mul_down(Fixed18::from_int(100))?
            .div_down(self.delta_band_width)?
            .floor_to_usize()?;
        let last = self.number_of_delta_bands().saturating_sub(1);
        Ok(DeltaBand {
            index: raw.min(last),
            option_type,
        })
    }

    /// Multiplier interpolated between the bracketing tenors.
    pub fn interpolate(
        &self,
        kind: MultiplierKind,
        position: TenorPosition,
        band: DeltaBand,
    ) -> error::Result<Fixed18> {
        let lookup = |tenor: usize| -> error::Result<Fixed18> {
            self.tenors
                .get(tenor)
                .and_then(|t| t.multipliers(kind, band.option_type).get(band.index))
                .copied()
                .ok_or_else(|| {
                    PricerError::numerical(format!(
                        "no {} multiplier at tenor {tenor}, band {}",
                        kind.name(),
                        band.index
                    ))
                })
        };
        let y1 = lookup(position.index)?;
        let y2 = lookup(position.index + 1)?;
        interp::lerp(y1, y2, position.remainder)
    }

    /// Position, band and interpolation in one call.
    pub fn multiplier(
        &self,
        kind: MultiplierKind,
        now: u64,
        expiration: u64,
        delta: Fixed18,
    ) -> error::Result<Fixed18> {
        let position = self.tenor_position(now, expiration)?;
        let band = self.delta_band(delta)?;
        self.interpolate(kind, position, band)
    }
}
