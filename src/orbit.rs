//! Orbit and star collaborators.
//!
//! The synthesizer only needs periapsis/apoapsis distances and the star's
//! output. Anything richer (N-body, system hierarchy) plugs in behind
//! these traits.

use crate::constants::{
    AU_M, GRAVITATIONAL_CONSTANT, SOLAR_LUMINOSITY_W, SOLAR_MASS_KG, SOLAR_TEMPERATURE_K,
};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitGeometry {
    pub semi_major_axis_m: f64,
    pub eccentricity: f64,
    pub periapsis_m: f64,
    pub apoapsis_m: f64,
    pub period_s: f64,
}

impl OrbitGeometry {
    pub fn new(semi_major_axis_m: f64, eccentricity: f64, star_mass_kg: f64) -> Self {
        let e = eccentricity.clamp(0.0, 0.99);
        let a = semi_major_axis_m.max(0.0);
        let mu = GRAVITATIONAL_CONSTANT * star_mass_kg;
        let period_s = if mu > 0.0 { TAU * (a.powi(3) / mu).sqrt() } else { 0.0 };
        Self {
            semi_major_axis_m: a,
            eccentricity: e,
            periapsis_m: a * (1.0 - e),
            apoapsis_m: a * (1.0 + e),
            period_s,
        }
    }
}

/// Orbit bookkeeping owned by the caller.
pub trait OrbitSource {
    /// Current geometry, if the orbit has been placed.
    fn geometry(&self) -> Option<OrbitGeometry>;

    /// Move the body to a new semi-major axis and return the resulting geometry.
    fn recompute(&mut self, semi_major_axis_m: f64) -> OrbitGeometry;
}

/// Keplerian two-body orbit about a star of fixed mass.
#[derive(Debug, Clone, PartialEq)]
pub struct KeplerOrbit {
    pub eccentricity: f64,
    pub star_mass_kg: f64,
    current: Option<OrbitGeometry>,
    /// Number of times `recompute` has been called.
    pub recomputations: usize,
}

impl KeplerOrbit {
    pub fn new(eccentricity: f64, star_mass_kg: f64) -> Self {
        Self {
            eccentricity,
            star_mass_kg,
            current: None,
            recomputations: 0,
        }
    }

    /// An orbit already placed at `semi_major_axis_m`.
    pub fn placed(semi_major_axis_m: f64, eccentricity: f64, star_mass_kg: f64) -> Self {
        Self {
            current: Some(OrbitGeometry::new(semi_major_axis_m, eccentricity, star_mass_kg)),
            ..Self::new(eccentricity, star_mass_kg)
        }
    }
}

impl OrbitSource for KeplerOrbit {
    fn geometry(&self) -> Option<OrbitGeometry> {
        self.current
    }

    fn recompute(&mut self, semi_major_axis_m: f64) -> OrbitGeometry {
        let geometry = OrbitGeometry::new(semi_major_axis_m, self.eccentricity, self.star_mass_kg);
        self.current = Some(geometry);
        self.recomputations += 1;
        geometry
    }
}

pub trait StarSource {
    fn luminosity_w(&self) -> f64;
    fn effective_temperature_k(&self) -> f64;
    fn mass_kg(&self) -> f64;
    fn position(&self) -> DVec3;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Star {
    pub luminosity_w: f64,
    pub temperature_k: f64,
    pub mass_kg: f64,
    pub position: [f64; 3],
}

impl Star {
    pub fn sun() -> Self {
        Self {
            luminosity_w: SOLAR_LUMINOSITY_W,
            temperature_k: SOLAR_TEMPERATURE_K,
            mass_kg: SOLAR_MASS_KG,
            position: [0.0; 3],
        }
    }

    /// Snapshot any star source.
    pub fn from_source(source: &dyn StarSource) -> Self {
        let p = source.position();
        Self {
            luminosity_w: source.luminosity_w(),
            temperature_k: source.effective_temperature_k(),
            mass_kg: source.mass_kg(),
            position: [p.x, p.y, p.z],
        }
    }

    /// Distance at which this star delivers Earth's insolation.
    pub fn earth_equivalent_distance_m(&self) -> f64 {
        AU_M * (self.luminosity_w / SOLAR_LUMINOSITY_W).sqrt()
    }
}

impl StarSource for Star {
    fn luminosity_w(&self) -> f64 {
        self.luminosity_w
    }

    fn effective_temperature_k(&self) -> f64 {
        self.temperature_k
    }

    fn mass_kg(&self) -> f64 {
        self.mass_kg
    }

    fn position(&self) -> DVec3 {
        DVec3::from_array(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_earth_orbit_period() {
        let geometry = OrbitGeometry::new(AU_M, 0.0167, SOLAR_MASS_KG);
        let days = geometry.period_s / 86_400.0;
        assert_abs_diff_eq!(days, 365.25, epsilon = 0.5);
        assert_abs_diff_eq!(geometry.periapsis_m, AU_M * 0.9833, epsilon = 1.0);
        assert_abs_diff_eq!(geometry.apoapsis_m, AU_M * 1.0167, epsilon = 1.0);
    }

    #[test]
    fn test_recompute_updates_geometry() {
        let mut orbit = KeplerOrbit::new(0.1, SOLAR_MASS_KG);
        assert!(orbit.geometry().is_none());
        let g = orbit.recompute(2.0 * AU_M);
        assert_eq!(orbit.geometry(), Some(g));
        assert_eq!(orbit.recomputations, 1);
        assert_abs_diff_eq!(g.periapsis_m, 1.8 * AU_M, epsilon = 1.0);
    }

    #[test]
    fn test_sun_snapshot() {
        let sun = Star::sun();
        let copy = Star::from_source(&sun);
        assert_eq!(sun, copy);
        assert_abs_diff_eq!(sun.earth_equivalent_distance_m(), AU_M);
    }
}
