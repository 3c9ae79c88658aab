//! Linear interpolation between adjacent tenors of the multiplier grid.

use crate::error::Result;
use crate::fixed::Fixed18;

/// Linear interpolation `y1 + w·(y2 − y1)` for a weight `w ∈ [0, 1)`.
///
/// At `w = 0` the result is exactly `y1`; the truncated product is the only
/// rounding step.
pub(crate) fn lerp(y1: Fixed18, y2: Fixed18, weight: Fixed18) -> Result<Fixed18> {
    Ok(y1 + weight.mul_down(y2 - y1)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn endpoints_and_midpoint() {
        let (a, b) = (Fixed18::ONE, Fixed18::from_int(3));
        assert_eq!(lerp(a, b, Fixed18::ZERO).unwrap(), a);
        assert_eq!(lerp(a, b, Fixed18::from(dec!(0.5))).unwrap(), Fixed18::from_int(2));
    }

    #[test]
    fn decreasing_segment() {
        let v = lerp(Fixed18::from_int(2), Fixed18::ONE, Fixed18::from(dec!(0.25))).unwrap();
        assert_eq!(v, Fixed18::from(dec!(1.75)));
    }
}
