//! Convolution opportunity model: the probability that a traveler has been
//! captured by the time `x` opportunities have been considered, where each
//! opportunity's placement is blurred by a uniform kernel of width `conv_b`
//! starting at offset `conv_a`.
//!
//! The CDF is a piecewise antiderivative, not an approximation. Each branch
//! below is exact; the within-kernel and tail branches anchor themselves with
//! a recursive evaluation at the branch boundary (depth ≤ 2, O(1) arithmetic).

use crate::error::{ModelError, Result};

/// Cumulative capture probability after `x` opportunities under an
/// exponential opportunity model convolved with a uniform kernel.
///
/// With `conv_a = conv_b = 0` this reduces to the classic intervening
/// opportunities CDF `1 - exp(-selectivity * x)`.
pub fn convolution_cdf(x: f64, selectivity: f64, conv_a: f64, conv_b: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }

    // A negative kernel offset folds into the nonnegative-offset formula via
    // a reflection identity around zero.
    if conv_a < 0.0 {
        let offset = convolution_cdf(-conv_a, selectivity, 0.0, conv_b);
        return (convolution_cdf(x - conv_a, selectivity, 0.0, conv_b) - offset)
            + (offset - convolution_cdf(-x - conv_a, selectivity, 0.0, conv_b));
    }

    // Before the kernel starts, or no kernel at all: pure exponential.
    if x <= conv_a || conv_b == 0.0 {
        return 1.0 - (-selectivity * x).exp();
    }

    // Inside the kernel window, anchored at x = conv_a.
    if x <= conv_a + conv_b {
        return convolution_cdf(conv_a, selectivity, conv_a, conv_b)
            + ((-selectivity * (conv_a + x)).exp()
                * ((selectivity * x).exp()
                    * (-conv_a * selectivity + x * selectivity - 1.0)
                    + (conv_a * selectivity).exp()))
                / (conv_b * selectivity);
    }

    // Beyond the kernel, anchored at x = conv_a + conv_b; matches the
    // exponential tail asymptotically.
    convolution_cdf(conv_a + conv_b, selectivity, conv_a, conv_b)
        + ((1.0 - (conv_b * selectivity).exp())
            * (-selectivity * (conv_a + conv_b + x)).exp()
            * ((selectivity * (conv_a + conv_b)).exp() - (selectivity * x).exp()))
            / (conv_b * selectivity)
}

/// Blend of the convolved CDF (weight `alpha`) and the pure exponential model
/// (weight `1 - alpha`).
///
/// `alpha` outside [0, 1] is a precondition error. At `alpha == 0` the
/// convolution branch is skipped entirely; behaviorally identical to passing
/// zero through the general formula.
pub fn convolution_mix(
    x: f64,
    selectivity: f64,
    conv_a: f64,
    conv_b: f64,
    alpha: f64,
) -> Result<f64> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(ModelError::Precondition(format!(
            "mixing weight must lie in [0, 1], got {alpha}"
        )));
    }
    if alpha > 0.0 {
        return Ok(convolution_cdf(x, selectivity, conv_a, conv_b) * alpha
            + convolution_cdf(x, selectivity, 0.0, 0.0) * (1.0 - alpha));
    }
    Ok(convolution_cdf(x, selectivity, 0.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const S: f64 = 0.002;

    #[test]
    fn test_zero_opportunities() {
        assert_eq!(convolution_cdf(0.0, S, 0.0, 0.0), 0.0);
        assert_eq!(convolution_cdf(0.0, S, 50.0, 100.0), 0.0);
        assert_eq!(convolution_cdf(-10.0, S, -5.0, 100.0), 0.0);
    }

    #[test]
    fn test_pure_exponential_reduction() {
        for x in [1.0, 10.0, 500.0, 10_000.0] {
            assert_relative_eq!(
                convolution_cdf(x, S, 0.0, 0.0),
                1.0 - (-S * x).exp(),
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_before_kernel_is_exponential() {
        // x <= conv_a: kernel has not started, exponential applies unchanged
        let cdf = convolution_cdf(40.0, S, 50.0, 100.0);
        assert_relative_eq!(cdf, 1.0 - (-S * 40.0).exp(), max_relative = 1e-12);
    }

    #[test]
    fn test_continuity_at_kernel_start() {
        let a = 50.0;
        let b = 100.0;
        let below = convolution_cdf(a - 1e-9, S, a, b);
        let above = convolution_cdf(a + 1e-9, S, a, b);
        assert!(
            (above - below).abs() < 1e-6,
            "discontinuity at conv_a: {below} vs {above}"
        );
    }

    #[test]
    fn test_continuity_at_kernel_end() {
        let a = 50.0;
        let b = 100.0;
        let below = convolution_cdf(a + b - 1e-9, S, a, b);
        let above = convolution_cdf(a + b + 1e-9, S, a, b);
        assert!(
            (above - below).abs() < 1e-6,
            "discontinuity at conv_a + conv_b: {below} vs {above}"
        );
    }

    #[test]
    fn test_negative_offset_at_zero() {
        // Reflection identity must preserve the x = 0 base case
        assert_eq!(convolution_cdf(0.0, S, -30.0, 60.0), 0.0);
    }

    #[test]
    fn test_negative_offset_bounded() {
        for x in [1.0, 100.0, 1000.0, 100_000.0] {
            let cdf = convolution_cdf(x, S, -30.0, 60.0);
            assert!(
                (0.0..=1.0 + 1e-9).contains(&cdf),
                "cdf({x}) out of range: {cdf}"
            );
        }
    }

    #[test]
    fn test_tail_approaches_one() {
        let cdf = convolution_cdf(2.0e5, S, 50.0, 100.0);
        assert_relative_eq!(cdf, 1.0, max_relative = 1e-9);
    }

    #[test]
    fn test_mix_alpha_zero_is_pure_exponential() {
        let got = convolution_mix(500.0, S, 50.0, 100.0, 0.0).unwrap();
        assert_relative_eq!(
            got,
            convolution_cdf(500.0, S, 0.0, 0.0),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_mix_alpha_one_is_full_convolution() {
        let got = convolution_mix(500.0, S, 50.0, 100.0, 1.0).unwrap();
        assert_relative_eq!(
            got,
            convolution_cdf(500.0, S, 50.0, 100.0),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_mix_blends_linearly() {
        let pure = convolution_cdf(500.0, S, 0.0, 0.0);
        let conv = convolution_cdf(500.0, S, 50.0, 100.0);
        let mixed = convolution_mix(500.0, S, 50.0, 100.0, 0.25).unwrap();
        assert_relative_eq!(mixed, 0.25 * conv + 0.75 * pure, max_relative = 1e-12);
    }

    #[test]
    fn test_mix_rejects_bad_alpha() {
        assert!(convolution_mix(500.0, S, 50.0, 100.0, -0.1).is_err());
        assert!(convolution_mix(500.0, S, 50.0, 100.0, 1.1).is_err());
    }

    proptest! {
        #[test]
        fn prop_cdf_within_unit_interval(
            x in 0.0f64..5.0e5,
            a in 0.0f64..1.0e3,
            b in 0.0f64..1.0e3,
        ) {
            let cdf = convolution_cdf(x, 0.001, a, b);
            prop_assert!(cdf >= -1e-7 && cdf <= 1.0 + 1e-7, "cdf = {}", cdf);
        }

        #[test]
        fn prop_cdf_monotone_in_x(
            x in 0.0f64..1.0e5,
            dx in 0.0f64..1.0e4,
            a in 0.0f64..500.0,
            b in 0.0f64..500.0,
        ) {
            let lo = convolution_cdf(x, 0.001, a, b);
            let hi = convolution_cdf(x + dx, 0.001, a, b);
            prop_assert!(hi >= lo - 1e-7, "cdf not monotone: {} > {}", lo, hi);
        }
    }
}
