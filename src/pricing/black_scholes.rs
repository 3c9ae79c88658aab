//! Black-Scholes premium and delta in 18-decimal fixed point.
//!
//! ```text
//! d1 = (ln(S/K) + (r + σ²/2)·t) / (σ·√t),   d2 = d1 − σ·√t
//! call = S·N(d1) − K·e^(−rt)·N(d2)            delta = N(d1)
//! put  = K·e^(−rt)·N(−d2) − S·N(−d1)          delta = N(d1) − 1
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{self, PricerError};
use crate::fixed::Fixed18;
use crate::types::OptionType;

/// Per-contract premium and instrument delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackScholesOutput {
    /// Floored at zero.
    pub premium: Fixed18,
    /// In `[0, 1]` for calls, `[−1, 0]` for puts.
    pub delta: Fixed18,
}

fn d1_d2(
    spot: Fixed18,
    strike: Fixed18,
    years: Fixed18,
    vol: Fixed18,
    rate: Fixed18,
) -> error::Result<(Fixed18, Fixed18)> {
    let sig_sqrt_t = vol.mul_down(years.sqrt()?)?;
    let half_var = vol.mul_down(vol)?.div_down(Fixed18::from_int(2))?;
    let drift = (rate + half_var).mul_down(years)?;
    let d1 = (spot.div_down(strike)?.ln()? + drift).div_down(sig_sqrt_t)?;
    Ok((d1, d1 - sig_sqrt_t))
}

/// Premium and delta of one contract.
///
/// # Errors
/// Returns [`PricerError::InvalidInput`] for non-positive spot, strike,
/// time or vol.
pub fn premium_and_delta(
    option_type: OptionType,
    spot: Fixed18,
    strike: Fixed18,
    years: Fixed18,
    vol: Fixed18,
    rate: Fixed18,
) -> error::Result<BlackScholesOutput> {
    for (value, name) in [(spot, "spot"), (strike, "strike"), (years, "time"), (vol, "vol")] {
        if !value.is_positive() {
            return Err(PricerError::invalid_input(format!(
                "black-scholes {name} must be positive, got {value}"
            )));
        }
    }

    let (d1, d2) = d1_d2(spot, strike, years, vol, rate)?;
    let discounted_strike = strike.mul_down((-rate.mul_down(years)?).exp()?)?;
    let n_d1 = d1.norm_cdf()?;

    let (premium, delta) = match option_type {
        OptionType::Call => {
            let p = spot.mul_down(n_d1)? - discounted_strike.mul_down(d2.norm_cdf()?)?;
            (p, n_d1)
        }
        OptionType::Put => {
            let p = discounted_strike.mul_down((-d2).norm_cdf()?)?
                - spot.mul_down((-d1).norm_cdf()?)?;
            (p, n_d1 - Fixed18::ONE)
        }
    };

    Ok(BlackScholesOutput {
        premium: premium.max(Fixed18::ZERO),
        delta,
    })
}

/// Premium only.
pub fn premium(
    option_type: OptionType,
    spot: Fixed18,
    strike: Fixed18,
    years: Fixed18,
    vol: Fixed18,
    rate: Fixed18,
) -> error::Result<Fixed18> {
    premium_and_delta(option_type, spot, strike, years, vol, rate).map(|out| out.premium)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fx(v: f64) -> Fixed18 {
        Fixed18::from(rust_decimal::Decimal::try_from(v).unwrap())
    }

    fn thirty_days() -> Fixed18 {
        crate::conventions::years_to_expiry(0, 30 * 86_400).unwrap()
    }

    #[test]
    fn otm_call_reference() {
        let out = premium_and_delta(
            OptionType::Call,
            Fixed18::from_int(2600),
            Fixed18::from_int(3000),
            thirty_days(),
            Fixed18::from(dec!(0.25)),
            Fixed18::ZERO,
        )
        .unwrap();
        assert!((out.premium.to_f64() - 1.7106196302524026).abs() < 1e-9);
        assert!((out.delta.to_f64() - 0.024913545225451805).abs() < 1e-12);
    }

    #[test]
    fn put_call_parity() {
        let (s, k, t, v, r) = (fx(100.0), fx(105.0), fx(0.5), fx(0.3), fx(0.04));
        let call = premium(OptionType::Call, s, k, t, v, r).unwrap();
        let put = premium(OptionType::Put, s, k, t, v, r).unwrap();
        // C − P = S − K·e^(−rT)
        let rhs = 100.0 - 105.0 * (-0.04f64 * 0.5).exp();
        assert!(((call - put).to_f64() - rhs).abs() < 1e-12);
    }

    #[test]
    fn put_delta_is_call_delta_minus_one() {
        let (s, k, t, v, r) = (fx(100.0), fx(95.0), fx(0.25), fx(0.2), fx(0.01));
        let c = premium_and_delta(OptionType::Call, s, k, t, v, r).unwrap();
        let p = premium_and_delta(OptionType::Put, s, k, t, v, r).unwrap();
        assert_eq!(p.delta, c.delta - Fixed18::ONE);
        assert!(p.delta.is_negative());
    }

    #[test]
    fn deep_otm_premium_floored_at_zero() {
        let out = premium_and_delta(
            OptionType::Call,
            Fixed18::from_int(100),
            Fixed18::from_int(10_000),
            fx(0.01),
            fx(0.1),
            Fixed18::ZERO,
        )
        .unwrap();
        assert_eq!(out.premium, Fixed18::ZERO);
        assert!(!out.delta.is_negative());
    }

    #[test]
    fn rejects_non_positive_inputs() {
        let ok = (fx(100.0), fx(100.0), fx(1.0), fx(0.2));
        for (s, k, t, v) in [
            (Fixed18::ZERO, ok.1, ok.2, ok.3),
            (ok.0, Fixed18::ZERO, ok.2, ok.3),
            (ok.0, ok.1, Fixed18::ZERO, ok.3),
            (ok.0, ok.1, ok.2, Fixed18::ZERO),
        ] {
            let r = premium_and_delta(OptionType::Call, s, k, t, v, Fixed18::ZERO);
            assert!(matches!(r, Err(PricerError::InvalidInput { .. })));
        }
    }
}
