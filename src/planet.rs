//! The synthesized body and the wish list it is built from.

use crate::archetype::{Archetype, Chemistry};
use crate::atmosphere::{Atmosphere, AtmosphereHint, SurfaceVolatiles};
use crate::climate::ClimateModel;
use crate::composition::{MaterialLayer, Shape, SizeTarget, gravity_at};
use crate::constants::{
    EARTH_AVERAGE_TEMP_K, EARTH_AXIAL_TILT_DEG, EARTH_ECCENTRICITY, EARTH_MASS_KG, EARTH_PRESSURE_KPA,
    EARTH_RADIUS_M, EARTH_ROTATION_S, EARTH_WATER_COVERAGE, GRAVITATIONAL_CONSTANT, JUPITER_MASS_KG,
};
use crate::habitability::HabitabilityRequirements;
use crate::hydrosphere::Hydrosphere;
use crate::math_utils::sphere_volume;
use crate::noise_field::PlanetNoise;
use crate::orbit::{OrbitGeometry, Star};
use crate::projection::ProjectionModel;
use crate::raster::{Grid, RasterCache, RasterContext, RasterEncoding, RasterKey, RasterStore, ScalarField, rasterize};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use tracing::{debug, warn};

/// A sparse wish list. Anything left `None` is filled in by [`PlanetParams::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanetParams {
    pub name: Option<String>,
    pub seed: Option<u64>,
    pub archetype: Option<Archetype>,
    pub chemistry: Option<Chemistry>,
    pub mass_kg: Option<f64>,
    pub radius_m: Option<f64>,
    pub gravity_ms2: Option<f64>,
    pub density_kg_m3: Option<f64>,
    pub rotation_period_s: Option<f64>,
    pub axial_tilt_deg: Option<f64>,
    pub eccentricity: Option<f64>,
    /// Pins the orbit; the synthesizer then adjusts albedo instead of distance.
    pub semi_major_axis_m: Option<f64>,
    pub surface_pressure_kpa: Option<f64>,
    /// Fraction of the surface under water.
    pub water_coverage: Option<f64>,
    pub average_temp_k: Option<f64>,
    pub habitability: Option<HabitabilityRequirements>,
    /// Bare-land albedo override.
    pub surface_albedo: Option<f64>,
    pub star: Option<Star>,
}

/// Every field of [`PlanetParams`] with its default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    pub name: String,
    pub seed: u64,
    pub archetype: Archetype,
    pub chemistry: Chemistry,
    pub size: SizeTarget,
    pub density_hint_kg_m3: Option<f64>,
    pub rotation_period_s: f64,
    pub axial_tilt_rad: f64,
    pub eccentricity: f64,
    pub semi_major_axis_m: Option<f64>,
    pub atmosphere_hint: AtmosphereHint,
    pub water_coverage: f64,
    pub average_temp_k: Option<f64>,
    pub habitability: Option<HabitabilityRequirements>,
    pub base_albedo: f64,
    pub star: Star,
}

impl ResolvedParams {
    /// Best guess at the surface temperature before anything is computed.
    pub fn temperature_estimate_k(&self) -> f64 {
        if let Some(t) = self.average_temp_k {
            t
        } else if let Some(req) = &self.habitability {
            (req.min_temp_k + req.max_temp_k) / 2.0
        } else {
            EARTH_AVERAGE_TEMP_K
        }
    }
}

impl PlanetParams {
    /// The reference Earth: Earth's size, air and oceans, held at 289 K.
    pub fn earthlike() -> Self {
        Self {
            name: Some("Earthlike".to_string()),
            seed: Some(42),
            archetype: Some(Archetype::Terrestrial),
            chemistry: Some(Chemistry::Silicate),
            mass_kg: Some(EARTH_MASS_KG),
            radius_m: Some(EARTH_RADIUS_M),
            rotation_period_s: Some(EARTH_ROTATION_S),
            axial_tilt_deg: Some(EARTH_AXIAL_TILT_DEG),
            eccentricity: Some(EARTH_ECCENTRICITY),
            surface_pressure_kpa: Some(EARTH_PRESSURE_KPA),
            water_coverage: Some(EARTH_WATER_COVERAGE),
            average_temp_k: Some(EARTH_AVERAGE_TEMP_K),
            habitability: Some(HabitabilityRequirements::human()),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> crate::error::SynthResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply defaults. Exactly one size dimension ends up authoritative:
    /// mass, then radius, then gravity. When both mass and radius are given
    /// without a density they fix the density.
    pub fn resolve(&self) -> ResolvedParams {
        let archetype = self.archetype.unwrap_or(Archetype::Terrestrial);
        let rules = archetype.rules();
        let positive = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0);

        let mass = positive(self.mass_kg);
        let radius = positive(self.radius_m);
        let gravity = positive(self.gravity_ms2);

        let mut density_hint = positive(self.density_kg_m3);
        if density_hint.is_none() {
            if let (Some(m), Some(r)) = (mass, radius) {
                density_hint = Some(m / sphere_volume(r));
            }
        }
        if [mass.is_some(), radius.is_some(), gravity.is_some()].iter().filter(|b| **b).count() > 1 {
            debug!("several size targets given; mass wins over radius over gravity");
        }

        let size = match (mass, radius, gravity) {
            (Some(m), _, _) => SizeTarget::Mass(m),
            (None, Some(r), _) => SizeTarget::Radius(r),
            (None, None, Some(g)) => SizeTarget::Gravity(g),
            (None, None, None) => SizeTarget::Mass(default_mass_kg(archetype)),
        };

        let atmosphere_hint = match (positive(self.surface_pressure_kpa), &self.habitability) {
            (Some(p), _) => AtmosphereHint::Pressure(p),
            (None, Some(req)) => AtmosphereHint::Habitable(req.clone()),
            (None, None) => AtmosphereHint::Unspecified,
        };

        let water_coverage = match self.water_coverage {
            Some(w) => {
                let clamped = w.clamp(0.0, 1.0);
                if clamped != w {
                    warn!(requested = w, clamped, "water coverage outside [0, 1]");
                }
                clamped
            }
            None if archetype == Archetype::Terrestrial => EARTH_WATER_COVERAGE,
            None => 0.0,
        };

        ResolvedParams {
            name: self.name.clone().unwrap_or_else(|| archetype.as_str().to_string()),
            seed: self.seed.unwrap_or(0),
            archetype,
            chemistry: self.chemistry.unwrap_or_default(),
            size,
            density_hint_kg_m3: density_hint,
            rotation_period_s: self.rotation_period_s.unwrap_or_else(|| default_rotation_s(archetype)),
            axial_tilt_rad: self.axial_tilt_deg.unwrap_or(EARTH_AXIAL_TILT_DEG).to_radians(),
            eccentricity: self.eccentricity.unwrap_or(0.0).clamp(0.0, 0.99),
            semi_major_axis_m: positive(self.semi_major_axis_m),
            atmosphere_hint,
            water_coverage,
            average_temp_k: positive(self.average_temp_k),
            habitability: self.habitability.clone(),
            base_albedo: self.surface_albedo.map(|a| a.clamp(0.0, 0.95)).unwrap_or(rules.base_albedo),
            star: self.star.unwrap_or_else(Star::sun),
        }
    }
}

fn default_mass_kg(archetype: Archetype) -> f64 {
    match archetype {
        Archetype::Terrestrial => EARTH_MASS_KG,
        Archetype::Giant => JUPITER_MASS_KG,
        Archetype::Dwarf => 0.01 * EARTH_MASS_KG,
        Archetype::Asteroid => 1.0e18,
        Archetype::Comet => 1.0e13,
    }
}

fn default_rotation_s(archetype: Archetype) -> f64 {
    match archetype {
        Archetype::Terrestrial => EARTH_ROTATION_S,
        Archetype::Giant => 35_730.0,
        Archetype::Dwarf => 550_000.0,
        Archetype::Asteroid => 20_000.0,
        Archetype::Comet => 45_000.0,
    }
}

#[derive(Debug, Clone)]
pub struct Planet {
    pub name: String,
    pub seed: u64,
    pub archetype: Archetype,
    pub chemistry: Chemistry,
    pub mass_kg: f64,
    pub density_kg_m3: f64,
    pub shape: Shape,
    pub rotation_period_s: f64,
    pub axial_tilt_rad: f64,
    pub orbit: Option<OrbitGeometry>,
    pub star: Star,
    pub periapsis_temp_k: f64,
    pub apoapsis_temp_k: f64,
    /// Bare land, ocean and ice without clouds.
    pub surface_albedo: f64,
    /// Surface and clouds together.
    pub total_albedo: f64,
    pub ice_fraction: f64,
    pub internal_heat_k: f64,
    pub layers: Vec<MaterialLayer>,
    pub atmosphere: Atmosphere,
    pub volatiles: SurfaceVolatiles,
    pub hydrosphere: Hydrosphere,
    pub noise: PlanetNoise,
    rasters: RasterCache,
}

impl Planet {
    /// Assemble a planet from converged parts; rasters start empty.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        seed: u64,
        archetype: Archetype,
        chemistry: Chemistry,
        mass_kg: f64,
        density_kg_m3: f64,
        shape: Shape,
        rotation_period_s: f64,
        axial_tilt_rad: f64,
        star: Star,
        layers: Vec<MaterialLayer>,
        atmosphere: Atmosphere,
        volatiles: SurfaceVolatiles,
        hydrosphere: Hydrosphere,
        noise: PlanetNoise,
    ) -> Self {
        let internal_heat_k = archetype.rules().internal_heat_k(mass_kg);
        Self {
            name,
            seed,
            archetype,
            chemistry,
            mass_kg,
            density_kg_m3,
            shape,
            rotation_period_s,
            axial_tilt_rad,
            orbit: None,
            star,
            periapsis_temp_k: 0.0,
            apoapsis_temp_k: 0.0,
            surface_albedo: archetype.rules().base_albedo,
            total_albedo: archetype.rules().base_albedo,
            ice_fraction: 0.0,
            internal_heat_k,
            layers,
            atmosphere,
            volatiles,
            hydrosphere,
            noise,
            rasters: RasterCache::default(),
        }
    }

    pub fn radius_m(&self) -> f64 {
        self.shape.mean_radius_m
    }

    pub fn surface_gravity_ms2(&self) -> f64 {
        gravity_at(self.mass_kg, self.radius_m())
    }

    pub fn escape_velocity_ms(&self) -> f64 {
        (2.0 * GRAVITATIONAL_CONSTANT * self.mass_kg / self.radius_m()).sqrt()
    }

    pub fn average_temp_k(&self) -> f64 {
        (self.periapsis_temp_k + self.apoapsis_temp_k) / 2.0
    }

    pub fn has_surface(&self) -> bool {
        self.archetype != Archetype::Giant
    }

    pub fn max_elevation_m(&self) -> f64 {
        self.noise.max_elevation_m
    }

    pub fn semi_major_axis_m(&self) -> Option<f64> {
        self.orbit.map(|o| o.semi_major_axis_m)
    }

    pub fn climate(&self) -> ClimateModel {
        ClimateModel {
            periapsis_temp_k: self.periapsis_temp_k,
            apoapsis_temp_k: self.apoapsis_temp_k,
            pressure_kpa: self.atmosphere.pressure_kpa,
            axial_tilt_rad: self.axial_tilt_rad,
            rotation_period_s: self.rotation_period_s,
            gravity_ms2: self.surface_gravity_ms2(),
            air_mass_ratio: (self.atmosphere.scale_height_m > 0.0)
                .then(|| self.radius_m() / self.atmosphere.scale_height_m),
        }
    }

    pub fn raster_context(&self) -> RasterContext {
        RasterContext::from_planet(self)
    }

    /// Materialize a raster, reusing one generated earlier for the same inputs.
    pub fn raster(
        &mut self,
        field: ScalarField,
        resolution: usize,
        projection: &ProjectionModel,
        season: Option<f64>,
    ) -> &Grid<f32> {
        let key = RasterKey::new(field, resolution, projection, season);
        if self.rasters.get(&key).is_none() {
            let grid = rasterize(&self.raster_context(), field, resolution, projection, season);
            self.rasters.insert(key, grid);
        }
        self.rasters.get_or_insert_with(key, || Grid::new(0, 0, 0.0))
    }

    pub fn encoding_for(&self, field: ScalarField) -> RasterEncoding {
        RasterEncoding::for_field(field, self.max_elevation_m())
    }

    /// Hash of the converged state the rasters are derived from. Two planets
    /// that share a name and seed but converged differently hash apart.
    pub fn state_fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.archetype.hash(&mut hasher);
        self.chemistry.hash(&mut hasher);
        for value in [
            self.mass_kg,
            self.radius_m(),
            self.axial_tilt_rad,
            self.rotation_period_s,
            self.periapsis_temp_k,
            self.apoapsis_temp_k,
            self.total_albedo,
            self.ice_fraction,
            self.atmosphere.pressure_kpa,
            self.hydrosphere.mass_kg,
            self.hydrosphere.sea_level_m,
            self.max_elevation_m(),
        ] {
            value.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Store key for one of this planet's rasters.
    pub fn store_key(&self, key: &RasterKey) -> String {
        key.store_key(&self.name, self.seed, self.state_fingerprint())
    }

    /// Raster backed by `store`: a hit is decoded, a miss is generated and
    /// saved. Either way the values carry the 16-bit quantization of
    /// [`Planet::encoding_for`], so the result does not depend on whether the
    /// store already held the file. Use [`Planet::raster`] for full precision.
    pub fn raster_via_store(
        &self,
        store: &dyn RasterStore,
        field: ScalarField,
        resolution: usize,
        projection: &ProjectionModel,
        season: Option<f64>,
    ) -> Grid<f32> {
        let key = RasterKey::new(field, resolution, projection, season);
        let encoding = self.encoding_for(field);
        let store_key = self.store_key(&key);
        let (width, height) = projection.dimensions(resolution);

        let stored = store
            .load(&store.path_for(&store_key))
            .filter(|g| g.width() == width && g.height() == height);
        let encoded = match stored {
            Some(encoded) => encoded,
            None => {
                debug!(key = %store_key, "raster store miss");
                let grid = rasterize(&self.raster_context(), field, resolution, projection, season);
                let encoded = encoding.encode_grid(&grid);
                store.save(&encoded, &store_key);
                encoded
            }
        };
        encoding.decode_grid(&encoded)
    }

    pub fn cached_raster_count(&self) -> usize {
        self.rasters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_earthlike_resolves_density_from_mass_and_radius() {
        let resolved = PlanetParams::earthlike().resolve();
        assert_eq!(resolved.size, SizeTarget::Mass(EARTH_MASS_KG));
        let density = resolved.density_hint_kg_m3.unwrap();
        assert_abs_diff_eq!(density, 5515.0, epsilon = 10.0);
        assert_eq!(resolved.atmosphere_hint, AtmosphereHint::Pressure(EARTH_PRESSURE_KPA));
        assert!(resolved.semi_major_axis_m.is_none());
    }

    #[test]
    fn test_empty_params_get_defaults() {
        let resolved = PlanetParams::default().resolve();
        assert_eq!(resolved.archetype, Archetype::Terrestrial);
        assert_eq!(resolved.size, SizeTarget::Mass(EARTH_MASS_KG));
        assert_eq!(resolved.atmosphere_hint, AtmosphereHint::Unspecified);
        assert_eq!(resolved.water_coverage, EARTH_WATER_COVERAGE);
        assert_eq!(resolved.temperature_estimate_k(), EARTH_AVERAGE_TEMP_K);
    }

    #[test]
    fn test_habitability_hint_without_pressure() {
        let params = PlanetParams {
            habitability: Some(HabitabilityRequirements::human()),
            ..PlanetParams::default()
        };
        let resolved = params.resolve();
        assert!(matches!(resolved.atmosphere_hint, AtmosphereHint::Habitable(_)));
        assert_abs_diff_eq!(resolved.temperature_estimate_k(), 286.5);
    }

    #[test]
    fn test_params_from_sparse_json() {
        let params = PlanetParams::from_json(r#"{ "archetype": "Giant", "average_temp_k": 150.0 }"#).unwrap();
        let resolved = params.resolve();
        assert_eq!(resolved.archetype, Archetype::Giant);
        assert_eq!(resolved.size, SizeTarget::Mass(JUPITER_MASS_KG));
        assert_eq!(resolved.water_coverage, 0.0);
        assert_eq!(resolved.average_temp_k, Some(150.0));
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let params = PlanetParams {
            water_coverage: Some(1.7),
            surface_albedo: Some(2.0),
            radius_m: Some(-5.0),
            ..PlanetParams::default()
        };
        let resolved = params.resolve();
        assert_eq!(resolved.water_coverage, 1.0);
        assert_eq!(resolved.base_albedo, 0.95);
        assert_eq!(resolved.size, SizeTarget::Mass(EARTH_MASS_KG));
    }
}
