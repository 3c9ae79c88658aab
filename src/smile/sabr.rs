//! SABR (Stochastic Alpha Beta Rho) smile model.
//!
//! SABR models the forward price as a CEV process with stochastic volatility:
//!
//! ```text
//! dF = σ · F^β · dW₁
//! dσ = ν · σ · dW₂
//! dW₁·dW₂ = ρ dt
//! ```
//!
//! The Hagan formula provides a closed-form approximation for Black implied
//! volatility as a function of strike.
//!
//! # References
//! - Hagan, P. et al. "Managing Smile Risk" (2002)

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::conventions::log_moneyness;
use crate::error::{self, PricerError};
use crate::fixed::Fixed18;
use crate::smile::SmileSection;
use crate::validate::{validate_in_range, validate_non_negative, validate_positive};

/// Below this |z| the `z / x(z)` factor is replaced by its limit 1.
const Z_EPSILON: Decimal = dec!(0.0000001);

/// SABR volatility smile with 4 parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SabrSmileRaw", into = "SabrSmileRaw")]
pub struct SabrSmile {
    forward: Fixed18,
    expiry: Fixed18,
    /// ATM vol scale α > 0.
    alpha: Fixed18,
    /// CEV exponent β ∈ \[0, 1\].
    beta: Fixed18,
    /// Spot-vol correlation ρ ∈ (−1, 1).
    rho: Fixed18,
    /// Vol-of-vol ν ≥ 0 (ν = 0 reduces to CEV model).
    nu: Fixed18,
}

#[derive(Serialize, Deserialize)]
struct SabrSmileRaw {
    forward: Fixed18,
    expiry: Fixed18,
    alpha: Fixed18,
    beta: Fixed18,
    rho: Fixed18,
    nu: Fixed18,
}

impl TryFrom<SabrSmileRaw> for SabrSmile {
    type Error = PricerError;
    fn try_from(raw: SabrSmileRaw) -> Result<Self, Self::Error> {
        Self::new(raw.forward, raw.expiry, raw.alpha, raw.beta, raw.rho, raw.nu)
    }
}

impl From<SabrSmile> for SabrSmileRaw {
    fn from(s: SabrSmile) -> Self {
        Self {
            forward: s.forward,
            expiry: s.expiry,
            alpha: s.alpha,
            beta: s.beta,
            rho: s.rho,
            nu: s.nu,
        }
    }
}

/// Check SABR parameter ranges: α > 0, β ∈ \[0, 1\], ρ ∈ (−1, 1), ν ≥ 0.
pub(crate) fn validate_sabr(
    alpha: Fixed18,
    beta: Fixed18,
    rho: Fixed18,
    nu: Fixed18,
) -> error::Result<()> {
    validate_positive(alpha, "alpha")?;
    validate_in_range(beta, Fixed18::ZERO, Fixed18::ONE, "beta")?;
    if rho.abs() >= Fixed18::ONE {
        return Err(PricerError::invalid_configuration(format!(
            "rho must be in (-1, 1), got {rho}"
        )));
    }
    validate_non_negative(nu, "nu")?;
    Ok(())
}

impl SabrSmile {
    /// Create a SABR smile from calibrated parameters.
    ///
    /// # Errors
    /// Returns [`PricerError::InvalidConfiguration`] if parameters are out of range.
    pub fn new(
        forward: Fixed18,
        expiry: Fixed18,
        alpha: Fixed18,
        beta: Fixed18,
        rho: Fixed18,
        nu: Fixed18,
    ) -> error::Result<Self> {
        validate_positive(forward, "forward")?;
        validate_positive(expiry, "expiry")?;
        validate_sabr(alpha, beta, rho, nu)?;

        Ok(Self {
            forward,
            expiry,
            alpha,
            beta,
            rho,
            nu,
        })
    }

    /// Returns the alpha (ATM vol scale) parameter.
    pub fn alpha(&self) -> Fixed18 {
        self.alpha
    }

    /// Returns the beta (CEV exponent) parameter.
    pub fn beta(&self) -> Fixed18 {
        self.beta
    }

    /// Returns the rho (spot-vol correlation) parameter.
    pub fn rho(&self) -> Fixed18 {
        self.rho
    }

    /// Returns the nu (vol-of-vol) parameter.
    pub fn nu(&self) -> Fixed18 {
        self.nu
    }

    /// `x(z) = ln((√(1 − 2ρz + z²) + z − ρ) / (1 − ρ))`.
    fn x(&self, z: Fixed18) -> error::Result<Fixed18> {
        let rho = self.rho;
        let two = Fixed18::from_int(2);
        let radicand = Fixed18::ONE - two.mul_down(rho)?.mul_down(z)? + z.mul_down(z)?;
        let numerator = radicand.sqrt()? + z - rho;
        numerator.div_down(Fixed18::ONE - rho)?.ln()
    }
}

impl SmileSection for SabrSmile {
    fn vol(&self, strike: Fixed18) -> error::Result<Fixed18> {
        validate_positive(strike, "strike")?;

        let (f, t) = (self.forward, self.expiry);
        let (alpha, beta, rho, nu) = (self.alpha, self.beta, self.rho, self.nu);
        let one = Fixed18::ONE;

        let log_fk = -log_moneyness(strike, f)?;
        let one_minus_beta = one - beta;
        let omb2 = one_minus_beta.mul_down(one_minus_beta)?;
        let fk_beta = f.mul_down(strike)?.pow(one_minus_beta)?;
        let fk_beta_sqrt = fk_beta.sqrt()?;
        let log_fk2 = log_fk.mul_down(log_fk)?;

        let a = omb2
            .mul_down(alpha.mul_down(alpha)?)?
            .div_down(Fixed18::from_int(24).mul_down(fk_beta)?)?;
        let b = Fixed18::from(dec!(0.25))
            .mul_down(rho)?
            .mul_down(beta)?
            .mul_down(nu)?
            .mul_down(alpha)?
            .div_down(fk_beta_sqrt)?;
        let c = (Fixed18::from_int(2) - Fixed18::from_int(3).mul_down(rho.mul_down(rho)?)?)
            .mul_down(nu.mul_down(nu)?)?
            .div_down(Fixed18::from_int(24))?;
        let v = omb2.mul_down(log_fk2)?.div_down(Fixed18::from_int(24))?;
        let w = omb2
            .mul_down(omb2)?
            .mul_down(log_fk2.mul_down(log_fk2)?)?
            .div_down(Fixed18::from_int(1920))?;
        let z = nu.mul_down(fk_beta_sqrt)?.mul_down(log_fk)?.div_down(alpha)?;

        let numerator = alpha.mul_down(one + (a + b + c).mul_down(t)?)?;
        let denominator = fk_beta_sqrt.mul_down(one + v + w)?;

        let vol = if z.abs().as_decimal() > Z_EPSILON {
            numerator
                .mul_down(z)?
                .div_down(denominator.mul_down(self.x(z)?)?)?
        } else {
            numerator.div_down(denominator)?
        };

        if !vol.is_positive() {
            return Err(PricerError::numerical(format!(
                "SABR vol {vol} is not positive at strike {strike}"
            )));
        }
        Ok(vol)
    }

    fn forward(&self) -> Fixed18 {
        self.forward
    }

    fn expiry(&self) -> Fixed18 {
        self.expiry
    }
}
