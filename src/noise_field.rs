//! Seeded 3-D noise samplers.
//!
//! A `NoiseField` wraps one of the `noise` crate's fractal generators and is
//! sampled on the unit sphere, so maps have no seams at the antimeridian.
//! `PlanetNoise` bundles the independently seeded fields a planet owns.

use crate::projection::lat_lon_to_dir;
use glam::{DQuat, DVec3};
use noise::{Billow, Fbm, MultiFractal, NoiseFn, Perlin, RidgedMulti, Simplex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoiseMode {
    /// Fractal Brownian motion over simplex noise: broad continents.
    Fractal,
    /// Billowed Perlin: puffy, mostly-positive blobs. Used as a mask.
    Billow,
    /// Ridged multifractal Perlin: sharp mountain chains.
    Ridge,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    pub seed: u32,
    pub octaves: usize,
    pub frequency: f64,
    pub lacunarity: f64,
    pub persistence: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 6,
            frequency: 1.0,
            lacunarity: 2.0,
            persistence: 0.5,
        }
    }
}

#[derive(Clone)]
enum Sampler {
    Fractal(Fbm<Simplex>),
    Billow(Billow<Perlin>),
    Ridge(RidgedMulti<Perlin>),
}

/// Immutable after construction; clone it to hand a copy to another thread.
#[derive(Clone)]
pub struct NoiseField {
    mode: NoiseMode,
    params: NoiseParams,
    sampler: Sampler,
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField")
            .field("mode", &self.mode)
            .field("params", &self.params)
            .finish()
    }
}

impl NoiseField {
    pub fn new(mode: NoiseMode, params: NoiseParams) -> Self {
        let sampler = match mode {
            NoiseMode::Fractal => Sampler::Fractal(
                Fbm::<Simplex>::new(params.seed)
                    .set_octaves(params.octaves)
                    .set_frequency(params.frequency)
                    .set_lacunarity(params.lacunarity)
                    .set_persistence(params.persistence),
            ),
            NoiseMode::Billow => Sampler::Billow(
                Billow::<Perlin>::new(params.seed)
                    .set_octaves(params.octaves)
                    .set_frequency(params.frequency)
                    .set_lacunarity(params.lacunarity)
                    .set_persistence(params.persistence),
            ),
            NoiseMode::Ridge => Sampler::Ridge(
                RidgedMulti::<Perlin>::new(params.seed)
                    .set_octaves(params.octaves)
                    .set_frequency(params.frequency)
                    .set_lacunarity(params.lacunarity)
                    .set_persistence(params.persistence),
            ),
        };
        Self {
            mode,
            params,
            sampler,
        }
    }

    pub fn mode(&self) -> NoiseMode {
        self.mode
    }

    pub fn params(&self) -> &NoiseParams {
        &self.params
    }

    /// Sample at a point, roughly in `[-1, 1]`.
    pub fn sample(&self, point: DVec3) -> f64 {
        let p = [point.x, point.y, point.z];
        match &self.sampler {
            Sampler::Fractal(n) => n.get(p),
            Sampler::Billow(n) => n.get(p),
            Sampler::Ridge(n) => n.get(p),
        }
    }
}

// Per-field salts so each field draws an independent seed from the planet seed.
const SALT_ELEVATION_BASE: u64 = 0x9E37_79B9_7F4A_7C15;
const SALT_ELEVATION_RIDGE: u64 = 0xC2B2_AE3D_27D4_EB4F;
const SALT_ELEVATION_MASK: u64 = 0x1656_67B1_9E37_79F9;
const SALT_PRECIPITATION: u64 = 0x27D4_EB2F_1656_67C5;
const SALT_TEMPERATURE: u64 = 0x85EB_CA77_C2B2_AE63;

const BASE_WEIGHT: f64 = 0.65;
const RIDGE_WEIGHT: f64 = 0.35;
const TEMPERATURE_JITTER_K: f64 = 2.0;

fn salted_seed(seed: u64, salt: u64) -> u32 {
    let mixed = (seed ^ salt).wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    (mixed >> 32) as u32 ^ mixed as u32
}

/// The noise a planet owns: terrain, precipitation and temperature jitter.
#[derive(Debug, Clone)]
pub struct PlanetNoise {
    pub seed: u64,
    pub max_elevation_m: f64,
    tilt: DQuat,
    elevation_base: NoiseField,
    elevation_ridge: NoiseField,
    elevation_mask: NoiseField,
    precipitation: NoiseField,
    temperature: NoiseField,
}

impl PlanetNoise {
    pub fn new(seed: u64, axial_tilt_rad: f64, max_elevation_m: f64) -> Self {
        let field = |mode, salt, octaves, frequency| {
            NoiseField::new(mode, NoiseParams {
                seed: salted_seed(seed, salt),
                octaves,
                frequency,
                ..NoiseParams::default()
            })
        };

        Self {
            seed,
            max_elevation_m,
            tilt: DQuat::from_rotation_x(axial_tilt_rad),
            elevation_base: field(NoiseMode::Fractal, SALT_ELEVATION_BASE, 8, 1.2),
            elevation_ridge: field(NoiseMode::Ridge, SALT_ELEVATION_RIDGE, 6, 2.5),
            elevation_mask: field(NoiseMode::Billow, SALT_ELEVATION_MASK, 3, 1.5),
            precipitation: field(NoiseMode::Fractal, SALT_PRECIPITATION, 4, 2.0),
            temperature: field(NoiseMode::Fractal, SALT_TEMPERATURE, 3, 3.0),
        }
    }

    /// Unit vector in the planet frame for a latitude/longitude.
    pub fn direction(&self, lat: f64, lon: f64) -> DVec3 {
        self.tilt * lat_lon_to_dir(lat, lon)
    }

    /// Normalized relief in `[-1, 1]`.
    pub fn relief(&self, dir: DVec3) -> f64 {
        let base = self.elevation_base.sample(dir);
        let ridge = (self.elevation_ridge.sample(dir) + 1.0) * 0.5;
        let mask = self.elevation_mask.sample(dir).max(0.0);
        (BASE_WEIGHT * base + RIDGE_WEIGHT * ridge * mask).clamp(-1.0, 1.0)
    }

    /// Elevation in metres relative to the mean surface.
    pub fn elevation_m(&self, dir: DVec3) -> f64 {
        self.relief(dir) * self.max_elevation_m
    }

    /// Multiplier around 1.0 applied to zonal precipitation.
    pub fn precipitation_factor(&self, dir: DVec3) -> f64 {
        (1.0 + 0.5 * self.precipitation.sample(dir)).max(0.0)
    }

    pub fn temperature_jitter_k(&self, dir: DVec3) -> f64 {
        TEMPERATURE_JITTER_K * self.temperature.sample(dir)
    }
}

/// `count` points spread evenly over the unit sphere (Fibonacci lattice).
pub fn fibonacci_sphere(count: usize) -> Vec<DVec3> {
    let golden_angle = std::f64::consts::PI * (3.0 - 5f64.sqrt());
    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f64 + 0.5) / count as f64;
            let r = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f64;
            DVec3::new(r * theta.cos(), y, r * theta.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::{assert_ge, assert_le};

    #[test]
    fn test_same_seed_same_samples() {
        let a = NoiseField::new(NoiseMode::Fractal, NoiseParams { seed: 7, ..Default::default() });
        let b = a.clone();
        let p = DVec3::new(0.3, -0.2, 0.9);
        assert_eq!(a.sample(p).to_bits(), b.sample(p).to_bits());
    }

    #[test]
    fn test_field_seeds_differ() {
        let seeds = [
            SALT_ELEVATION_BASE,
            SALT_ELEVATION_RIDGE,
            SALT_ELEVATION_MASK,
            SALT_PRECIPITATION,
            SALT_TEMPERATURE,
        ]
        .map(|salt| salted_seed(42, salt));
        for i in 0..seeds.len() {
            for j in (i + 1)..seeds.len() {
                assert_ne!(seeds[i], seeds[j]);
            }
        }
    }

    #[test]
    fn test_elevation_bounded() {
        let noise = PlanetNoise::new(3, 0.4, 8000.0);
        for dir in fibonacci_sphere(500) {
            let e = noise.elevation_m(dir);
            assert_ge!(e, -8000.0);
            assert_le!(e, 8000.0);
            assert_ge!(noise.precipitation_factor(dir), 0.0);
        }
    }

    #[test]
    fn test_fibonacci_points_are_unit() {
        for p in fibonacci_sphere(64) {
            approx::assert_abs_diff_eq!(p.length(), 1.0, epsilon = 1e-12);
        }
    }
}
