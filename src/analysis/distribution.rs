//! Closed-form p-value approximations
//!
//! These are deliberate approximations, not exact F / chi-squared CDFs:
//! the test statistic is mapped to an approximately standard normal
//! deviate with a cube-root transform and the upper normal tail is taken
//! from the Abramowitz-Stegun polynomial (26.2.17, |error| < 7.5e-8).
//!
//! - chi-squared: Wilson-Hilferty (1931)
//! - F: Paulson (1942), the Wilson-Hilferty transform applied to F

use std::f64::consts::PI;

/// Upper tail `P(Z > z)` of the standard normal distribution.
#[must_use]
pub fn normal_survival(z: f64) -> f64 {
    if z.is_nan() {
        return 1.0;
    }
    if z == f64::INFINITY {
        return 0.0;
    }
    if z < 0.0 {
        return 1.0 - normal_survival(-z);
    }
    let t = 1.0 / (1.0 + 0.231_641_9 * z);
    let poly = t
        * (0.319_381_530
            + t * (-0.356_563_782
                + t * (1.781_477_937 + t * (-1.821_255_978 + t * 1.330_274_429))));
    let pdf = (-0.5 * z * z).exp() / (2.0 * PI).sqrt();
    (pdf * poly).clamp(0.0, 1.0)
}

/// Standard normal CDF `P(Z ≤ z)`.
#[must_use]
pub fn normal_cdf(z: f64) -> f64 {
    1.0 - normal_survival(z)
}

/// Approximate upper-tail p-value of a chi-squared statistic with `df` degrees of freedom.
///
/// Returns 1 for `df == 0` or a non-positive / non-finite statistic.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn chi_squared_p_value(statistic: f64, df: usize) -> f64 {
    if df == 0 || !statistic.is_finite() || statistic <= 0.0 {
        return 1.0;
    }
    let k = df as f64;
    let variance = 2.0 / (9.0 * k);
    let z = ((statistic / k).cbrt() - (1.0 - variance)) / variance.sqrt();
    normal_survival(z)
}

/// Approximate upper-tail p-value of an F statistic with (`df1`, `df2`) degrees of freedom.
///
/// Returns 1 when either df is zero or the statistic is non-positive / non-finite.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn f_p_value(statistic: f64, df1: usize, df2: usize) -> f64 {
    if df1 == 0 || df2 == 0 || !statistic.is_finite() || statistic <= 0.0 {
        return 1.0;
    }
    let a = 2.0 / (9.0 * df1 as f64);
    let b = 2.0 / (9.0 * df2 as f64);
    let cube = statistic.cbrt();
    let z = ((1.0 - b) * cube - (1.0 - a)) / (b * cube * cube + a).sqrt();
    normal_survival(z)
}
