//! Conversion from linear RGB channel levels into the CIE xy chromaticity
//! plus brightness encoding that the bridge protocol expects.

use number::UnipolarFloat;

/// A color in the bridge's native encoding: xy chromaticity coordinates
/// plus brightness (the Y tristimulus value).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XyBri {
    pub x: f64,
    pub y: f64,
    pub bri: f64,
}

impl XyBri {
    pub const BLACK: Self = Self {
        x: 0.,
        y: 0.,
        bri: 0.,
    };

    /// Return true if this color should render as "off".
    pub fn is_black(&self) -> bool {
        self.bri == 0.
    }
}

/// Convert unit-range RGB channel levels into xy chromaticity plus brightness.
///
/// Each channel is gamma-expanded and then run through a linear transform
/// tuned to the bridge's device gamut rather than exact sRGB primaries.
/// Chromaticity is undefined when all channels expand to zero, so that case
/// returns black rather than dividing by zero.
pub fn rgb_to_xy_bri(r: UnipolarFloat, g: UnipolarFloat, b: UnipolarFloat) -> XyBri {
    let r = gamma_expand(r.val());
    let g = gamma_expand(g.val());
    let b = gamma_expand(b.val());

    let x = r * 0.649926 + g * 0.103455 + b * 0.197109;
    let y = r * 0.234327 + g * 0.743075 + b * 0.022598;
    let z = g * 0.053077 + b * 1.035763;

    let sum = x + y + z;
    if sum == 0. {
        return XyBri::BLACK;
    }
    XyBri {
        x: x / sum,
        y: y / sum,
        bri: y,
    }
}

/// Expand a gamma-compressed channel level to linear light.
fn gamma_expand(c: f64) -> f64 {
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_close(expected: f64, actual: f64) {
        assert!(
            (expected - actual).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_black() {
        assert_eq!(
            XyBri::BLACK,
            rgb_to_xy_bri(UnipolarFloat::ZERO, UnipolarFloat::ZERO, UnipolarFloat::ZERO)
        );
        assert!(XyBri::BLACK.is_black());
    }

    #[test]
    fn test_pure_red() {
        let color = rgb_to_xy_bri(UnipolarFloat::ONE, UnipolarFloat::ZERO, UnipolarFloat::ZERO);
        assert_close(0.735, color.x);
        assert_close(0.265, color.y);
        assert_close(0.2343, color.bri);
    }

    #[test]
    fn test_full_white() {
        let color = rgb_to_xy_bri(UnipolarFloat::ONE, UnipolarFloat::ONE, UnipolarFloat::ONE);
        // Full output on all channels produces Y = 1 exactly.
        assert_close(1.0, color.bri);
        assert!(!color.is_black());
    }

    /// Chromaticity coordinates must stay on the simplex for the full
    /// input domain.
    #[test]
    fn test_chromaticity_in_range() {
        let steps = (0..=10).map(|i| UnipolarFloat::new(f64::from(i) / 10.));
        for r in steps.clone() {
            for g in steps.clone() {
                for b in steps.clone() {
                    let color = rgb_to_xy_bri(r, g, b);
                    assert!((0. ..=1.).contains(&color.x), "x out of range: {color:?}");
                    assert!((0. ..=1.).contains(&color.y), "y out of range: {color:?}");
                    assert!(color.x + color.y <= 1. + 1e-9, "off simplex: {color:?}");
                    assert!(color.bri >= 0., "negative brightness: {color:?}");
                }
            }
        }
    }

    /// The two halves of the gamma curve must agree at the breakpoint.
    #[test]
    fn test_gamma_continuous_at_breakpoint() {
        let below = gamma_expand(0.04045);
        let above = gamma_expand(0.04045 + 1e-6);
        assert!((below - above).abs() < 1e-4, "{below} vs {above}");
    }
}
