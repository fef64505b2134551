//! Temperature conversions and radiative-balance helpers.

use crate::constants::{STEFAN_BOLTZMANN, TO_KELVIN};
use std::f64::consts::PI;

/// Converts Kelvin to Celsius.
pub fn kelvin_to_celsius(temp_k: f64) -> f64 {
    temp_k - TO_KELVIN
}

/// Stellar flux (W/m²) at `distance_m` from a star of `luminosity_w`.
pub fn flux_at(luminosity_w: f64, distance_m: f64) -> f64 {
    luminosity_w / (4.0 * PI * distance_m * distance_m)
}

/// Radiative equilibrium temperature of a fast-rotating body with bond
/// albedo `albedo`: T = (L(1-A) / (16πσd²))^¼.
pub fn equilibrium_temperature(luminosity_w: f64, distance_m: f64, albedo: f64) -> f64 {
    if distance_m <= 0.0 || luminosity_w <= 0.0 {
        return 0.0;
    }
    let absorbed = luminosity_w * (1.0 - albedo.clamp(0.0, 1.0));
    (absorbed / (16.0 * PI * STEFAN_BOLTZMANN * distance_m * distance_m)).powf(0.25)
}

/// Distance at which `equilibrium_temperature` returns `temp_k`.
pub fn distance_for_equilibrium(luminosity_w: f64, albedo: f64, temp_k: f64) -> f64 {
    let absorbed = luminosity_w * (1.0 - albedo.clamp(0.0, 1.0));
    (absorbed / (16.0 * PI * STEFAN_BOLTZMANN * temp_k.powi(4))).sqrt()
}

/// Combine a stellar equilibrium temperature with internal heat: the surface
/// must radiate both, so T⁴ adds.
pub fn combine_internal_heat(equilibrium_k: f64, internal_k: f64) -> f64 {
    (equilibrium_k.powi(4) + internal_k.powi(4)).powf(0.25)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{AU_M, SOLAR_LUMINOSITY_W};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_kelvin_to_celsius() {
        assert_abs_diff_eq!(kelvin_to_celsius(273.15), 0.0);
        assert_abs_diff_eq!(kelvin_to_celsius(288.15), 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_earth_equilibrium() {
        let t = equilibrium_temperature(SOLAR_LUMINOSITY_W, AU_M, 0.3);
        assert_abs_diff_eq!(t, 255.0, epsilon = 1.5);
    }

    #[test]
    fn test_distance_inverts_temperature() {
        let d = distance_for_equilibrium(SOLAR_LUMINOSITY_W, 0.3, 255.0);
        let t = equilibrium_temperature(SOLAR_LUMINOSITY_W, d, 0.3);
        assert_abs_diff_eq!(t, 255.0, epsilon = 1e-9);
    }

    #[test]
    fn test_internal_heat_dominates_far_out() {
        let t = combine_internal_heat(40.0, 100.0);
        assert!(t > 100.0 && t < 101.0);
        assert_abs_diff_eq!(combine_internal_heat(255.0, 0.0), 255.0);
    }
}
