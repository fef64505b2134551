//! Oceans, ice caps and buried oceans.
//!
//! Sea level is found on a hypsometric curve: the sorted elevations of 1024
//! evenly spread surface samples. Coverage picks a quantile of that curve,
//! and mass is the water volume below it. Going the other way, a mass is
//! turned back into a sea level by bisection.

use crate::constants::{
    FREEZING_POINT_K, ICE_CONDUCTIVITY_W_M_K, ICE_DENSITY_KGM3, NO_WATER_SEA_LEVEL_FACTOR,
    STEFAN_BOLTZMANN, WATER_DENSITY_KGM3,
};
use crate::noise_field::{PlanetNoise, fibonacci_sphere};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const HYPSOMETRY_SAMPLES: usize = 1024;
const BISECTION_STEPS: usize = 64;

/// Sorted surface elevations standing in for the whole sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct Hypsometry {
    elevations: Vec<f64>,
    pub radius_m: f64,
    pub max_elevation_m: f64,
}

impl Hypsometry {
    pub fn from_noise(noise: &PlanetNoise, radius_m: f64) -> Self {
        let elevations = fibonacci_sphere(HYPSOMETRY_SAMPLES)
            .into_iter()
            .map(|dir| noise.elevation_m(dir))
            .collect();
        Self::from_elevations(elevations, radius_m, noise.max_elevation_m)
    }

    pub fn from_elevations(mut elevations: Vec<f64>, radius_m: f64, max_elevation_m: f64) -> Self {
        elevations.retain(|e| e.is_finite());
        elevations.sort_by(f64::total_cmp);
        Self {
            elevations,
            radius_m,
            max_elevation_m,
        }
    }

    pub fn surface_area_m2(&self) -> f64 {
        4.0 * PI * self.radius_m * self.radius_m
    }

    fn area_per_sample(&self) -> f64 {
        self.surface_area_m2() / self.elevations.len().max(1) as f64
    }

    pub fn lowest(&self) -> f64 {
        self.elevations.first().copied().unwrap_or(0.0)
    }

    pub fn highest(&self) -> f64 {
        self.elevations.last().copied().unwrap_or(0.0)
    }

    /// Sea level at which `coverage` of the samples lie below water.
    pub fn level_for_coverage(&self, coverage: f64) -> f64 {
        let n = self.elevations.len();
        if n == 0 {
            return 0.0;
        }
        let k = (coverage.clamp(0.0, 1.0) * n as f64).round() as usize;
        match k {
            0 => self.lowest(),
            k if k >= n => self.highest() + 1.0,
            k => (self.elevations[k - 1] + self.elevations[k]) / 2.0,
        }
    }

    /// Fraction of the surface below `level`.
    pub fn coverage_at(&self, level: f64) -> f64 {
        if self.elevations.is_empty() {
            return 0.0;
        }
        let below = self.elevations.partition_point(|e| *e < level);
        below as f64 / self.elevations.len() as f64
    }

    /// Water volume (m³) needed to fill the basins up to `level`.
    pub fn volume_below(&self, level: f64) -> f64 {
        let depth_sum: f64 = self
            .elevations
            .iter()
            .take_while(|e| **e < level)
            .map(|e| level - e)
            .sum();
        depth_sum * self.area_per_sample()
    }

    /// Inverse of `volume_below`. Above the highest sample the ocean is global
    /// and rises linearly.
    pub fn level_for_volume(&self, volume_m3: f64) -> f64 {
        let top = self.highest();
        let full = self.volume_below(top);
        if volume_m3 >= full {
            return top + (volume_m3 - full) / self.surface_area_m2();
        }
        let (mut lo, mut hi) = (self.lowest(), top);
        for _ in 0..BISECTION_STEPS {
            let mid = (lo + hi) / 2.0;
            if self.volume_below(mid) < volume_m3 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        (lo + hi) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HydroLayerKind {
    Surface,
    /// Liquid water under an ice shell.
    Subsurface,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydroLayer {
    pub kind: HydroLayerKind,
    pub liquid_kg: f64,
    pub ice_kg: f64,
    /// Depth of the layer top below the surface.
    pub depth_m: f64,
    pub thickness_m: f64,
    pub temperature_k: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hydrosphere {
    /// Liquid plus ice.
    pub mass_kg: f64,
    /// Relative to the mean surface elevation.
    pub sea_level_m: f64,
    pub layers: Vec<HydroLayer>,
    hypsometry: Hypsometry,
}

impl Hydrosphere {
    /// A dry world on this terrain.
    pub fn dry(hypsometry: Hypsometry) -> Self {
        Self {
            mass_kg: 0.0,
            sea_level_m: NO_WATER_SEA_LEVEL_FACTOR * hypsometry.max_elevation_m,
            layers: Vec::new(),
            hypsometry,
        }
    }

    /// Flood the terrain until `coverage` of it is under water.
    pub fn from_coverage(hypsometry: Hypsometry, coverage: f64) -> Self {
        if coverage <= 0.0 {
            return Self::dry(hypsometry);
        }
        let level = hypsometry.level_for_coverage(coverage);
        let mass = hypsometry.volume_below(level) * WATER_DENSITY_KGM3;
        if mass <= 0.0 {
            return Self::dry(hypsometry);
        }
        let mut hydro = Self {
            mass_kg: mass,
            sea_level_m: level,
            layers: Vec::new(),
            hypsometry,
        };
        hydro.stratify(0.0, FREEZING_POINT_K + 15.0, 0.0);
        hydro
    }

    pub fn hypsometry(&self) -> &Hypsometry {
        &self.hypsometry
    }

    pub fn is_dry(&self) -> bool {
        self.mass_kg <= 0.0
    }

    /// Replace the water mass and re-solve sea level.
    pub fn set_mass(&mut self, mass_kg: f64) {
        if mass_kg <= 0.0 {
            self.mass_kg = 0.0;
            self.sea_level_m = NO_WATER_SEA_LEVEL_FACTOR * self.hypsometry.max_elevation_m;
            self.layers.clear();
            return;
        }
        self.mass_kg = mass_kg;
        self.sea_level_m = self.hypsometry.level_for_volume(mass_kg / WATER_DENSITY_KGM3);
        self.rescale_layers();
    }

    pub fn add_mass(&mut self, kg: f64) {
        if kg > 0.0 {
            self.set_mass(self.mass_kg + kg);
        }
    }

    /// Remove up to `kg`; returns what was removed.
    pub fn remove_mass(&mut self, kg: f64) -> f64 {
        let taken = kg.clamp(0.0, self.mass_kg);
        if taken > 0.0 {
            self.set_mass(self.mass_kg - taken);
        }
        taken
    }

    /// Fraction of the surface under water or sea ice.
    pub fn coverage(&self) -> f64 {
        if self.is_dry() {
            0.0
        } else {
            self.hypsometry.coverage_at(self.sea_level_m)
        }
    }

    pub fn liquid_kg(&self) -> f64 {
        self.layers.iter().map(|l| l.liquid_kg).sum()
    }

    pub fn ice_kg(&self) -> f64 {
        self.layers.iter().map(|l| l.ice_kg).sum()
    }

    /// True when open liquid water sits on the surface.
    pub fn has_surface_liquid(&self) -> bool {
        self.layers
            .iter()
            .any(|l| l.kind == HydroLayerKind::Surface && l.liquid_kg > 0.0)
    }

    /// Split the water into ice and liquid shells. `ice_fraction` is the
    /// frozen share of the surface; a fully frozen world keeps a buried ocean
    /// wherever its internal heat flux can hold the ice shell thinner than the water.
    pub fn stratify(&mut self, ice_fraction: f64, surface_temp_k: f64, internal_heat_k: f64) {
        self.layers.clear();
        if self.is_dry() {
            return;
        }

        let ocean_area = (self.coverage() * self.hypsometry.surface_area_m2()).max(1.0);
        let mean_depth = self.mass_kg / WATER_DENSITY_KGM3 / ocean_area;
        let ice_fraction = ice_fraction.clamp(0.0, 1.0);

        if ice_fraction < 1.0 && surface_temp_k >= FREEZING_POINT_K - 40.0 {
            self.layers.push(HydroLayer {
                kind: HydroLayerKind::Surface,
                liquid_kg: self.mass_kg * (1.0 - ice_fraction),
                ice_kg: self.mass_kg * ice_fraction,
                depth_m: 0.0,
                thickness_m: mean_depth,
                temperature_k: surface_temp_k.max(FREEZING_POINT_K),
            });
            return;
        }

        let heat_flux = STEFAN_BOLTZMANN * internal_heat_k.powi(4);
        let shell_m = if heat_flux > 0.0 {
            ICE_CONDUCTIVITY_W_M_K * (FREEZING_POINT_K - surface_temp_k).max(0.0) / heat_flux
        } else {
            f64::INFINITY
        };
        let ice_depth_equivalent = self.mass_kg / ICE_DENSITY_KGM3 / ocean_area;

        if shell_m < ice_depth_equivalent {
            let ice_kg = shell_m * ocean_area * ICE_DENSITY_KGM3;
            let liquid_kg = self.mass_kg - ice_kg;
            self.layers.push(HydroLayer {
                kind: HydroLayerKind::Surface,
                liquid_kg: 0.0,
                ice_kg,
                depth_m: 0.0,
                thickness_m: shell_m,
                temperature_k: surface_temp_k,
            });
            self.layers.push(HydroLayer {
                kind: HydroLayerKind::Subsurface,
                liquid_kg,
                ice_kg: 0.0,
                depth_m: shell_m,
                thickness_m: liquid_kg / WATER_DENSITY_KGM3 / ocean_area,
                temperature_k: FREEZING_POINT_K,
            });
        } else {
            self.layers.push(HydroLayer {
                kind: HydroLayerKind::Surface,
                liquid_kg: 0.0,
                ice_kg: self.mass_kg,
                depth_m: 0.0,
                thickness_m: ice_depth_equivalent,
                temperature_k: surface_temp_k,
            });
        }
    }

    /// Keep the liquid/ice split proportional after a mass change.
    fn rescale_layers(&mut self) {
        let current: f64 = self.liquid_kg() + self.ice_kg();
        if current <= 0.0 {
            return;
        }
        let scale = self.mass_kg / current;
        for layer in &mut self.layers {
            layer.liquid_kg *= scale;
            layer.ice_kg *= scale;
            layer.thickness_m *= scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use more_asserts::{assert_gt, assert_lt};

    fn ramp() -> Hypsometry {
        Hypsometry::from_elevations(
            (0..HYPSOMETRY_SAMPLES)
                .map(|i| -4000.0 + 8000.0 * i as f64 / (HYPSOMETRY_SAMPLES - 1) as f64)
                .collect(),
            6.371e6,
            8000.0,
        )
    }

    #[test]
    fn test_coverage_quantile() {
        let hydro = Hydrosphere::from_coverage(ramp(), 0.71);
        assert_abs_diff_eq!(hydro.coverage(), 0.71, epsilon = 1.0 / HYPSOMETRY_SAMPLES as f64);
        assert_gt!(hydro.mass_kg, 0.0);
    }

    #[test]
    fn test_no_water() {
        let hydro = Hydrosphere::from_coverage(ramp(), 0.0);
        assert_eq!(hydro.mass_kg, 0.0);
        assert_abs_diff_eq!(hydro.sea_level_m, -1.1 * 8000.0);
        assert_eq!(hydro.coverage(), 0.0);
        assert!(hydro.layers.is_empty());
    }

    #[test]
    fn test_set_mass_recovers_sea_level() {
        let mut hydro = Hydrosphere::from_coverage(ramp(), 0.5);
        let level = hydro.sea_level_m;
        let mass = hydro.mass_kg;
        hydro.set_mass(mass * 0.5);
        assert_lt!(hydro.sea_level_m, level);
        hydro.set_mass(mass);
        assert_abs_diff_eq!(hydro.sea_level_m, level, epsilon = 1e-3);
    }

    #[test]
    fn test_removing_all_water_pins_sea_level() {
        let mut hydro = Hydrosphere::from_coverage(ramp(), 0.3);
        let taken = hydro.remove_mass(f64::MAX);
        assert_gt!(taken, 0.0);
        assert!(hydro.is_dry());
        assert_abs_diff_eq!(hydro.sea_level_m, -8800.0);
    }

    #[test]
    fn test_global_ocean_rises_linearly() {
        let hyps = ramp();
        let full = hyps.volume_below(hyps.highest());
        let extra = hyps.surface_area_m2() * 100.0;
        assert_abs_diff_eq!(hyps.level_for_volume(full + extra), hyps.highest() + 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_partial_ice() {
        let mut hydro = Hydrosphere::from_coverage(ramp(), 0.7);
        hydro.stratify(0.2, 280.0, 35.0);
        assert_eq!(hydro.layers.len(), 1);
        assert_abs_diff_eq!(hydro.ice_kg(), 0.2 * hydro.mass_kg, epsilon = 1.0);
        assert!(hydro.has_surface_liquid());
    }

    #[test]
    fn test_buried_ocean_under_ice_shell() {
        let mut hydro = Hydrosphere::from_coverage(ramp(), 0.9);
        // europa-like: 100 K surface, strong tidal heat
        hydro.stratify(1.0, 100.0, 60.0);
        assert_eq!(hydro.layers.len(), 2);
        assert_eq!(hydro.layers[1].kind, HydroLayerKind::Subsurface);
        assert_gt!(hydro.layers[1].liquid_kg, 0.0);
        assert!(!hydro.has_surface_liquid());
        assert_abs_diff_eq!(hydro.liquid_kg() + hydro.ice_kg(), hydro.mass_kg, epsilon = hydro.mass_kg * 1e-9);
    }

    #[test]
    fn test_frozen_solid_without_heat() {
        let mut hydro = Hydrosphere::from_coverage(ramp(), 0.9);
        hydro.stratify(1.0, 100.0, 0.0);
        assert_eq!(hydro.layers.len(), 1);
        assert_eq!(hydro.liquid_kg(), 0.0);
    }
}
