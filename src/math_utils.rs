/// Numeric helpers shared by the climate and convergence code.

/// Assert that the percentage deviation between two values is below a threshold.
///
/// ```
/// use planet_synth_rust::assert_deviation;
/// assert_deviation!(101.0, 100.0, 2.0);
/// ```
#[macro_export]
macro_rules! assert_deviation {
    ($actual:expr, $expected:expr, $max_deviation:expr) => {
        {
            let actual_val = $actual;
            let expected_val = $expected;
            let max_dev = $max_deviation;
            let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

            if actual_deviation >= max_dev {
                panic!(
                    "assertion failed: deviation {:.2}% >= {:.2}%\n  actual: {:?},\n  expected: {:?}",
                    actual_deviation, max_dev, actual_val, expected_val
                );
            }
        }
    };
    ($actual:expr, $expected:expr, $max_deviation:expr, $($arg:tt)+) => {
        {
            let actual_val = $actual;
            let expected_val = $expected;
            let max_dev = $max_deviation;
            let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

            if actual_deviation >= max_dev {
                panic!(
                    "assertion failed: deviation {:.2}% >= {:.2}%: {}\n  actual: {:?},\n  expected: {:?}",
                    actual_deviation, max_dev, format_args!($($arg)+), actual_val, expected_val
                );
            }
        }
    };
}

/// Percentage deviation of `actual` from `expected`.
pub fn deviation(actual: f64, expected: f64) -> f64 {
    if expected == 0.0 {
        if actual == 0.0 { 0.0 } else { 100.0 }
    } else {
        ((actual - expected) / expected).abs() * 100.0
    }
}

/// Linear interpolation between two values
///
/// ```
/// use planet_synth_rust::math_utils::lerp;
/// assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
/// assert_eq!(lerp(100.0, 200.0, 0.25), 125.0);
/// ```
pub fn lerp(a: f64, b: f64, ratio: f64) -> f64 {
    a + (b - a) * ratio
}

/// Volume of a sphere of radius `r`.
pub fn sphere_volume(r: f64) -> f64 {
    4.0 / 3.0 * std::f64::consts::PI * r.powi(3)
}

/// Volume of a spherical shell between `inner` and `outer`.
pub fn shell_volume(inner: f64, outer: f64) -> f64 {
    sphere_volume(outer) - sphere_volume(inner)
}
