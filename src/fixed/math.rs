//! Decimal kernels for the transcendental functions used by pricing.
//!
//! Kernels work on raw [`Decimal`] at full 28-digit precision. Callers
//! truncate the result to their target scale exactly once.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{PricerError, Result};

const LN_2: Decimal = dec!(0.6931471805599453094172321215);

/// Largest accepted exponent; e^60 ≈ 1.1e26 still fits a `Decimal`.
const MAX_EXP_ARG: Decimal = dec!(60);

/// e^-42 ≈ 5.7e-19 truncates to zero at 18 decimals.
const MIN_EXP_ARG: Decimal = dec!(-42);

const MAX_SERIES_TERMS: u32 = 96;
const MAX_NEWTON_STEPS: usize = 64;

// West (2005) double-precision rational approximation of the normal tail,
// highest-order coefficient first.
const HART_NUMERATOR: [Decimal; 7] = [
    dec!(0.0352624965998911),
    dec!(0.700383064443688),
    dec!(6.37396220353165),
    dec!(33.912866078383),
    dec!(112.079291497871),
    dec!(221.213596169931),
    dec!(220.206867912376),
];

const HART_DENOMINATOR: [Decimal; 8] = [
    dec!(0.0883883476483184),
    dec!(1.75566716318264),
    dec!(16.064177579207),
    dec!(86.7807322029461),
    dec!(296.564248779674),
    dec!(637.333633378831),
    dec!(793.826512519948),
    dec!(440.413735824752),
];

const HART_BREAKPOINT: Decimal = dec!(7.07106781186547);
const SQRT_2PI: Decimal = dec!(2.506628274631000502415765285);
const NORM_CDF_CUTOFF: Decimal = dec!(40);

/// e^x with range reduction `x = k·ln2 + r`, `|r| ≤ ln2/2`.
pub(crate) fn exp(x: Decimal) -> Result<Decimal> {
    if x < MIN_EXP_ARG {
        return Ok(Decimal::ZERO);
    }
    if x > MAX_EXP_ARG {
        return Err(PricerError::numerical(format!(
            "exp overflow for argument {x}"
        )));
    }

    let k = (x / LN_2).round();
    let r = x - k * LN_2;

    let mut sum = Decimal::ONE;
    let mut term = Decimal::ONE;
    for n in 1..=MAX_SERIES_TERMS {
        term = term * r / Decimal::from(n);
        if term.is_zero() {
            break;
        }
        sum += term;
    }

    let k = k
        .to_i64()
        .ok_or_else(|| PricerError::numerical(format!("exp reduction failed for {x}")))?;
    let scale = Decimal::try_from_i128_with_scale(1i128 << k.unsigned_abs(), 0)
        .map_err(|e| PricerError::numerical(format!("exp scale 2^{k}: {e}")))?;
    if k >= 0 {
        Ok(sum * scale)
    } else {
        Ok(sum / scale)
    }
}

/// ln(x) for x > 0 via `x = m·2^k`, `m ∈ [0.75, 1.5)`, then the atanh series.
pub(crate) fn ln(x: Decimal) -> Result<Decimal> {
    if x <= Decimal::ZERO {
        return Err(PricerError::numerical(format!(
            "ln of non-positive value {x}"
        )));
    }

    let mut m = x;
    let mut k: i64 = 0;
    while m >= dec!(1.5) {
        m /= Decimal::TWO;
        k += 1;
    }
    while m < dec!(0.75) {
        m *= Decimal::TWO;
        k -= 1;
    }

    let s = (m - Decimal::ONE) / (m + Decimal::ONE);
    let s2 = s * s;
    let mut power = s;
    let mut sum = s;
    for n in 1..=MAX_SERIES_TERMS {
        power *= s2;
        let term = power / Decimal::from(2 * n + 1);
        if term.is_zero() {
            break;
        }
        sum += term;
    }

    Ok(sum * Decimal::TWO + Decimal::from(k) * LN_2)
}

/// Square root by Newton iteration seeded from the `f64` estimate.
pub(crate) fn sqrt(x: Decimal) -> Result<Decimal> {
    if x.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if x.is_sign_negative() {
        return Err(PricerError::numerical(format!(
            "sqrt of negative value {x}"
        )));
    }

    let mut guess = x
        .to_f64()
        .map(f64::sqrt)
        .and_then(Decimal::from_f64)
        .filter(|g| *g > Decimal::ZERO)
        .unwrap_or(Decimal::ONE);

    for _ in 0..MAX_NEWTON_STEPS {
        let next = (guess + x / guess) / Decimal::TWO;
        if next == guess {
            break;
        }
        guess = next;
    }
    Ok(guess)
}

/// Standard normal CDF Φ(x).
///
/// Beyond `|x| = 40` the tail is below 1e-340 and is returned as exactly
/// zero.
pub(crate) fn norm_cdf(x: Decimal) -> Result<Decimal> {
    let abs = x.abs();
    let tail = if abs > NORM_CDF_CUTOFF {
        Decimal::ZERO
    } else {
        normal_tail(abs)?
    };

    if x > Decimal::ZERO {
        Ok(Decimal::ONE - tail)
    } else {
        Ok(tail)
    }
}

/// Φ(−a) for `0 ≤ a ≤ NORM_CDF_CUTOFF`.
fn normal_tail(abs: Decimal) -> Result<Decimal> {
    let square = abs
        .checked_mul(abs)
        .ok_or_else(|| PricerError::numerical(format!("overflow squaring {abs}")))?;
    let gaussian = exp(-square / Decimal::TWO)?;

    if gaussian.is_zero() {
        Ok(Decimal::ZERO)
    } else if abs < HART_BREAKPOINT {
        Ok(gaussian * horner(&HART_NUMERATOR, abs) / horner(&HART_DENOMINATOR, abs))
    } else {
        let mut build = abs + dec!(0.65);
        build = abs + dec!(4) / build;
        build = abs + dec!(3) / build;
        build = abs + dec!(2) / build;
        build = abs + Decimal::ONE / build;
        Ok(gaussian / build / SQRT_2PI)
    }
}

fn horner(coefficients: &[Decimal], x: Decimal) -> Decimal {
    coefficients
        .iter()
        .fold(Decimal::ZERO, |acc, c| acc * x + *c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() <= tol
    }

    // --- exp ---

    #[test]
    fn exp_of_zero_is_one() {
        assert_eq!(exp(Decimal::ZERO).unwrap(), Decimal::ONE);
    }

    #[test]
    fn exp_of_one_is_e() {
        let e = dec!(2.718281828459045235360287471);
        assert!(close(exp(Decimal::ONE).unwrap(), e, dec!(1e-24)));
    }

    #[test]
    fn exp_negative_argument() {
        // e^-5
        let expected = dec!(0.006737946999085467096636048);
        assert!(close(exp(dec!(-5)).unwrap(), expected, dec!(1e-24)));
    }

    #[test]
    fn exp_large_negative_underflows_to_zero() {
        assert_eq!(exp(dec!(-100)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn exp_rejects_overflow() {
        assert!(matches!(
            exp(dec!(61)),
            Err(PricerError::NumericalError { .. })
        ));
    }

    // --- ln ---

    #[test]
    fn ln_of_one_is_zero() {
        assert_eq!(ln(Decimal::ONE).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn ln_of_two() {
        assert!(close(ln(Decimal::TWO).unwrap(), LN_2, dec!(1e-26)));
    }

    #[test]
    fn ln_inverts_exp() {
        for x in [dec!(-7.5), dec!(-0.001), dec!(0.3), dec!(12.25)] {
            let roundtrip = ln(exp(x).unwrap()).unwrap();
            assert!(close(roundtrip, x, dec!(1e-20)), "x = {x}, got {roundtrip}");
        }
    }

    #[test]
    fn ln_small_argument() {
        // ln(1e-6) = -13.815510557964274...
        let expected = dec!(-13.81551055796427410410794873);
        assert!(close(ln(dec!(0.000001)).unwrap(), expected, dec!(1e-22)));
    }

    #[test]
    fn ln_rejects_non_positive() {
        assert!(ln(Decimal::ZERO).is_err());
        assert!(ln(dec!(-1)).is_err());
    }

    // --- sqrt ---

    #[test]
    fn sqrt_perfect_square() {
        assert_eq!(sqrt(dec!(2592000)).unwrap().round_dp(12), dec!(1609.968943799849));
        assert_eq!(sqrt(dec!(144)).unwrap(), dec!(12));
    }

    #[test]
    fn sqrt_rejects_negative() {
        assert!(sqrt(dec!(-4)).is_err());
    }

    // --- norm_cdf ---

    #[test]
    fn norm_cdf_at_zero_is_half() {
        assert_eq!(norm_cdf(Decimal::ZERO).unwrap(), dec!(0.5));
    }

    #[test]
    fn norm_cdf_reference_points() {
        // Φ(1.96) = 0.9750021048517795
        assert!(close(
            norm_cdf(dec!(1.96)).unwrap(),
            dec!(0.9750021048517795),
            dec!(1e-13)
        ));
        // Φ(-2.5) = 0.006209665325776132
        assert!(close(
            norm_cdf(dec!(-2.5)).unwrap(),
            dec!(0.006209665325776132),
            dec!(1e-13)
        ));
        // far tail uses the continued fraction branch
        // Φ(-8) = 6.22096057427178e-16
        assert!(close(
            norm_cdf(dec!(-8)).unwrap(),
            dec!(0.000000000000000622096057427178),
            dec!(1e-22)
        ));
    }

    #[test]
    fn norm_cdf_symmetry() {
        for x in [dec!(0.1), dec!(0.75), dec!(2.2), dec!(4)] {
            let sum = norm_cdf(x).unwrap() + norm_cdf(-x).unwrap();
            assert!(close(sum, Decimal::ONE, dec!(1e-20)));
        }
    }

    #[test]
    fn norm_cdf_saturates_for_huge_arguments() {
        for x in [dec!(41), dec!(1e20), Decimal::MAX] {
            assert_eq!(norm_cdf(x).unwrap(), Decimal::ONE);
            assert_eq!(norm_cdf(-x).unwrap(), Decimal::ZERO);
        }
    }
}
