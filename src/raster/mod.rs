pub mod grid;
pub mod store;
pub mod synth;
pub mod writer;

pub use grid::Grid;
pub use store::{PngRasterStore, RasterStore};
pub use synth::{RasterContext, RasterEncoding, ScalarField, SeasonalSeries, SurfaceCover, rasterize, surface_cover};
pub use writer::BackgroundRasterWriter;

use crate::projection::{ProjectionKind, ProjectionModel};
use std::collections::HashMap;

/// Identifies one materialized raster of a planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterKey {
    pub field: ScalarField,
    pub resolution: usize,
    pub projection: ProjectionKind,
    central_meridian_bits: u64,
    standard_parallel_bits: u64,
    season_bits: Option<u64>,
}

impl RasterKey {
    pub fn new(field: ScalarField, resolution: usize, projection: &ProjectionModel, season: Option<f64>) -> Self {
        Self {
            field,
            resolution,
            projection: projection.kind,
            central_meridian_bits: projection.central_meridian.to_bits(),
            standard_parallel_bits: projection.standard_parallel.to_bits(),
            season_bits: season.map(f64::to_bits),
        }
    }

    pub fn season(&self) -> Option<f64> {
        self.season_bits.map(f64::from_bits)
    }

    /// Store key for a planet identity and its state fingerprint.
    pub fn store_key(&self, planet_name: &str, seed: u64, fingerprint: u64) -> String {
        let projection = match self.projection {
            ProjectionKind::Equirectangular => "eqr",
            ProjectionKind::CylindricalEqualArea => "cea",
        };
        let season = match self.season() {
            Some(f) => format!("{:.4}", f),
            None => "annual".to_string(),
        };
        format!(
            "{}-{}-{:016x}-{}-{}-{}-{:.4}-{:.4}-{}",
            planet_name,
            seed,
            fingerprint,
            self.field.as_str(),
            self.resolution,
            projection,
            f64::from_bits(self.central_meridian_bits),
            f64::from_bits(self.standard_parallel_bits),
            season
        )
    }
}

/// Rasters a planet has materialized so far.
#[derive(Debug, Clone, Default)]
pub(crate) struct RasterCache {
    grids: HashMap<RasterKey, Grid<f32>>,
}

impl RasterCache {
    pub fn get(&self, key: &RasterKey) -> Option<&Grid<f32>> {
        self.grids.get(key)
    }

    pub fn get_or_insert_with(&mut self, key: RasterKey, make: impl FnOnce() -> Grid<f32>) -> &Grid<f32> {
        self.grids.entry(key).or_insert_with(make)
    }

    pub fn insert(&mut self, key: RasterKey, grid: Grid<f32>) {
        self.grids.insert(key, grid);
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }
}
