//! Climate rasters: elevation, temperature, precipitation and snowfall on a
//! projected grid, plus a categorical surface-cover map.
//!
//! Everything per row (latitude, insolation, Hadley band, diurnal range) is
//! computed once; pixels then only sample noise. Rows never share state, so
//! they are filled in parallel and the result is identical run to run.

use crate::atmosphere::Atmosphere;
use crate::climate::{ClimateModel, ICE_LINE_K, precipitation_band, solar_declination};
use crate::constants::{FREEZING_POINT_K, MAX_ENCODED_TEMP_K};
use crate::error::{SynthError, SynthResult};
use crate::noise_field::PlanetNoise;
use crate::planet::Planet;
use crate::projection::ProjectionModel;
use crate::raster::grid::Grid;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScalarField {
    Elevation = 0,
    Temperature = 1,
    Precipitation = 2,
    Snowfall = 3,
}

impl ScalarField {
    pub const COUNT: usize = 4;

    pub const ALL: [ScalarField; ScalarField::COUNT] = [
        ScalarField::Elevation,
        ScalarField::Temperature,
        ScalarField::Precipitation,
        ScalarField::Snowfall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarField::Elevation => "elevation",
            ScalarField::Temperature => "temperature",
            ScalarField::Precipitation => "precipitation",
            ScalarField::Snowfall => "snowfall",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceCover {
    Ocean,
    SeaIce,
    Ice,
    Tundra,
    Desert,
    Grassland,
    Forest,
    /// Land with no air to carry rain.
    Barren,
    /// No solid surface.
    Gas,
}

/// Everything rasterization reads from a planet. Cheap to clone; each
/// parallel worker takes its own copy of the noise samplers.
#[derive(Debug, Clone)]
pub struct RasterContext {
    pub noise: PlanetNoise,
    pub climate: ClimateModel,
    pub atmosphere: Atmosphere,
    pub sea_level_m: f64,
    pub has_ocean: bool,
    pub has_surface: bool,
    max_capacity_kpa: f64,
}

impl RasterContext {
    pub fn new(
        noise: PlanetNoise,
        climate: ClimateModel,
        atmosphere: Atmosphere,
        sea_level_m: f64,
        has_ocean: bool,
        has_surface: bool,
    ) -> Self {
        let max_capacity_kpa = atmosphere.precipitation_capacity_kpa(climate.hottest_k());
        Self {
            noise,
            climate,
            atmosphere,
            sea_level_m,
            has_ocean,
            has_surface,
            max_capacity_kpa,
        }
    }

    pub fn from_planet(planet: &Planet) -> Self {
        Self::new(
            planet.noise.clone(),
            planet.climate(),
            planet.atmosphere.clone(),
            planet.hydrosphere.sea_level_m,
            !planet.hydrosphere.is_dry(),
            planet.has_surface(),
        )
    }
}

/// Latitude terms shared by a whole row.
struct RowTerms {
    lat: f64,
    base_temp_k: f64,
    band: f64,
    diurnal_half_range_k: f64,
}

impl RowTerms {
    fn new(ctx: &RasterContext, lat: f64, season: Option<f64>) -> Self {
        let declination = season
            .map(|f| solar_declination(ctx.climate.axial_tilt_rad, f))
            .unwrap_or(0.0);
        Self {
            lat,
            base_temp_k: ctx.climate.temperature_at(lat, season),
            band: precipitation_band(lat, declination),
            diurnal_half_range_k: ctx.climate.diurnal_half_range_k(lat, declination),
        }
    }
}

/// One pixel's worth of climate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    elevation_m: f64,
    temperature_k: f64,
    precipitation: f64,
    snowfall: f64,
}

fn sample(ctx: &RasterContext, row: &RowTerms, lon: f64) -> Sample {
    let dir = ctx.noise.direction(row.lat, lon);
    let elevation_m = ctx.noise.elevation_m(dir);
    let above_sea = (elevation_m - ctx.sea_level_m).max(0.0);
    let temperature_k =
        row.base_temp_k - ctx.climate.lapse_rate_k_per_m() * above_sea + ctx.noise.temperature_jitter_k(dir);

    let precipitation = if ctx.max_capacity_kpa > 0.0 {
        let capacity = ctx.atmosphere.precipitation_capacity_kpa(temperature_k) / ctx.max_capacity_kpa;
        (row.band * capacity * ctx.noise.precipitation_factor(dir)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let snowfall = if temperature_k - row.diurnal_half_range_k < FREEZING_POINT_K {
        precipitation
    } else {
        0.0
    };

    Sample {
        elevation_m,
        temperature_k,
        precipitation,
        snowfall,
    }
}

fn fill<T: Send>(
    ctx: &RasterContext,
    resolution: usize,
    projection: &ProjectionModel,
    season: Option<f64>,
    fill_value: T,
    pick: impl Fn(&RasterContext, &RowTerms, f64) -> T + Sync,
) -> Grid<T>
where
    T: Clone + Sync,
{
    let (width, height) = projection.dimensions(resolution);
    let mut grid = Grid::new(width, height, fill_value);
    grid.cells_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let terms = RowTerms::new(ctx, projection.row_latitude(y, height), season);
            for (x, cell) in row.iter_mut().enumerate() {
                let (_, lon) = projection.pixel_to_lat_lon(x, y, resolution);
                *cell = pick(ctx, &terms, lon);
            }
        });
    grid
}

/// Scalar field on a projected grid. `season` is a fraction of the year from
/// the northern spring equinox; `None` gives annual means.
pub fn rasterize(
    ctx: &RasterContext,
    field: ScalarField,
    resolution: usize,
    projection: &ProjectionModel,
    season: Option<f64>,
) -> Grid<f32> {
    debug!(field = field.as_str(), resolution, ?season, "rasterizing");
    fill(ctx, resolution, projection, season, 0.0f32, |ctx, row, lon| {
        let s = sample(ctx, row, lon);
        let value = match field {
            ScalarField::Elevation => s.elevation_m,
            ScalarField::Temperature => s.temperature_k,
            ScalarField::Precipitation => s.precipitation,
            ScalarField::Snowfall => s.snowfall,
        };
        value as f32
    })
}

pub fn surface_cover(
    ctx: &RasterContext,
    resolution: usize,
    projection: &ProjectionModel,
    season: Option<f64>,
) -> Grid<SurfaceCover> {
    fill(ctx, resolution, projection, season, SurfaceCover::Gas, |ctx, row, lon| {
        if !ctx.has_surface {
            return SurfaceCover::Gas;
        }
        let s = sample(ctx, row, lon);
        if ctx.has_ocean && s.elevation_m < ctx.sea_level_m {
            return if s.temperature_k < FREEZING_POINT_K - 2.0 {
                SurfaceCover::SeaIce
            } else {
                SurfaceCover::Ocean
            };
        }
        match s.temperature_k {
            t if t < ICE_LINE_K => SurfaceCover::Ice,
            _ if ctx.atmosphere.is_vacuum() => SurfaceCover::Barren,
            t if t < FREEZING_POINT_K + 5.0 => SurfaceCover::Tundra,
            _ if s.precipitation < 0.15 => SurfaceCover::Desert,
            _ if s.precipitation < 0.45 => SurfaceCover::Grassland,
            _ => SurfaceCover::Forest,
        }
    })
}

/// How a scalar field maps onto 16-bit luminosity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RasterEncoding {
    /// Linear in `[-max, +max]`, sea-level zero at the midpoint.
    Elevation { max_elevation_m: f64 },
    /// Absolute kelvin in `[0, 2000]`.
    Temperature,
    /// Already relative to capacity, `[0, 1]`.
    Relative,
}

impl RasterEncoding {
    pub fn for_field(field: ScalarField, max_elevation_m: f64) -> Self {
        match field {
            ScalarField::Elevation => RasterEncoding::Elevation { max_elevation_m },
            ScalarField::Temperature => RasterEncoding::Temperature,
            ScalarField::Precipitation | ScalarField::Snowfall => RasterEncoding::Relative,
        }
    }

    fn normalize(&self, value: f64) -> f64 {
        match self {
            RasterEncoding::Elevation { max_elevation_m } if *max_elevation_m > 0.0 => {
                (value / max_elevation_m + 1.0) / 2.0
            }
            RasterEncoding::Elevation { .. } => 0.5,
            RasterEncoding::Temperature => value / MAX_ENCODED_TEMP_K,
            RasterEncoding::Relative => value,
        }
    }

    fn denormalize(&self, n: f64) -> f64 {
        match self {
            RasterEncoding::Elevation { max_elevation_m } => (2.0 * n - 1.0) * max_elevation_m,
            RasterEncoding::Temperature => n * MAX_ENCODED_TEMP_K,
            RasterEncoding::Relative => n,
        }
    }

    pub fn encode(&self, value: f32) -> u16 {
        let n = self.normalize(value as f64).clamp(0.0, 1.0);
        (n * u16::MAX as f64).round() as u16
    }

    pub fn decode(&self, value: u16) -> f32 {
        self.denormalize(value as f64 / u16::MAX as f64) as f32
    }

    pub fn encode_grid(&self, grid: &Grid<f32>) -> Grid<u16> {
        grid.map(|v| self.encode(*v))
    }

    pub fn decode_grid(&self, grid: &Grid<u16>) -> Grid<f32> {
        grid.map(|v| self.decode(*v))
    }
}

/// A field sampled at evenly spaced points of the year.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalSeries {
    pub field: ScalarField,
    steps: Vec<Grid<f32>>,
}

impl SeasonalSeries {
    /// Generate `steps` rasters in parallel. Each step checks `cancel` before
    /// it starts; a cancelled step fails the whole series.
    pub fn generate(
        ctx: &RasterContext,
        field: ScalarField,
        resolution: usize,
        projection: &ProjectionModel,
        steps: usize,
        cancel: &AtomicBool,
    ) -> SynthResult<Self> {
        let n = steps.max(1);
        let steps = (0..n)
            .into_par_iter()
            .map(|i| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(SynthError::Cancelled(i));
                }
                let local = ctx.clone();
                Ok(rasterize(&local, field, resolution, projection, Some(i as f64 / n as f64)))
            })
            .collect::<SynthResult<Vec<_>>>()?;
        Ok(Self { field, steps })
    }

    pub fn steps(&self) -> &[Grid<f32>] {
        &self.steps
    }

    /// Linear blend of the two steps around `year_fraction`, wrapping at year end.
    pub fn interpolate(&self, year_fraction: f64) -> Option<Grid<f32>> {
        let n = self.steps.len();
        if n == 0 {
            return None;
        }
        let pos = year_fraction.rem_euclid(1.0) * n as f64;
        let i0 = (pos.floor() as usize) % n;
        let i1 = (i0 + 1) % n;
        let t = (pos - pos.floor()) as f32;

        let a = &self.steps[i0];
        let b = &self.steps[i1];
        let cells = a
            .cells()
            .iter()
            .zip(b.cells())
            .map(|(va, vb)| va + (vb - va) * t)
            .collect();
        Grid::from_vec(a.width(), a.height(), cells).ok()
    }
}
