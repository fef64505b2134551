use more_asserts::{assert_gt, assert_le};
use planet_synth_rust::error::SynthError;
use planet_synth_rust::projection::{ProjectionKind, ProjectionModel};
use planet_synth_rust::raster::{
    BackgroundRasterWriter, Grid, PngRasterStore, RasterKey, RasterStore, ScalarField, SeasonalSeries, SurfaceCover,
    rasterize, surface_cover,
};
use planet_synth_rust::{Planet, PlanetParams, PlanetSynthesizer};
use std::sync::atomic::AtomicBool;

const RESOLUTION: usize = 24;

fn earthlike() -> Planet {
    PlanetSynthesizer::default()
        .synthesize_standalone(&PlanetParams::earthlike())
        .planet
}

#[test]
fn test_rasters_are_bit_identical_across_calls() {
    let mut planet = earthlike();
    let projection = ProjectionModel::equirectangular();

    for field in ScalarField::ALL {
        let cached = planet.raster(field, RESOLUTION, &projection, None).clone();
        let fresh = rasterize(&planet.raster_context(), field, RESOLUTION, &projection, None);
        println!("🗺️ {:<13} {}x{}", field.as_str(), fresh.width(), fresh.height());
        assert_eq!(cached.cells().len(), fresh.cells().len());
        for (a, b) in cached.cells().iter().zip(fresh.cells()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
    assert_eq!(planet.cached_raster_count(), ScalarField::COUNT);

    // a second request is served from the cache
    planet.raster(ScalarField::Elevation, RESOLUTION, &projection, None);
    assert_eq!(planet.cached_raster_count(), ScalarField::COUNT);
}

#[test]
fn test_earthlike_surface_has_oceans_and_land() {
    let planet = earthlike();
    let cover = surface_cover(&planet.raster_context(), RESOLUTION, &ProjectionModel::equirectangular(), None);
    let ocean = cover.cells().iter().filter(|c| **c == SurfaceCover::Ocean).count();
    let land = cover
        .cells()
        .iter()
        .filter(|c| !matches!(c, SurfaceCover::Ocean | SurfaceCover::SeaIce))
        .count();
    println!("🌊 ocean cells {}, land cells {}", ocean, land);
    assert_gt!(ocean, 0);
    assert_gt!(land, 0);
}

#[test]
fn test_store_round_trip_and_regeneration() {
    let dir = tempfile::tempdir().unwrap();
    let store = PngRasterStore::new(dir.path());
    let projection = ProjectionModel::cylindrical_equal_area(0.0);
    let mut planet = earthlike();

    let generated = planet.raster_via_store(&store, ScalarField::Temperature, RESOLUTION, &projection, None);
    let key = planet.store_key(&RasterKey::new(ScalarField::Temperature, RESOLUTION, &projection, None));
    let path = store.path_for(&key);
    assert!(path.exists(), "expected {} to be written", path.display());

    // a hit decodes to exactly what the miss returned
    let loaded = planet.raster_via_store(&store, ScalarField::Temperature, RESOLUTION, &projection, None);
    assert_eq!(loaded, generated);

    let exact = planet.raster(ScalarField::Temperature, RESOLUTION, &projection, None);
    let max_err = generated
        .cells()
        .iter()
        .zip(exact.cells())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    println!("💾 temperature quantization max error {:.4} K", max_err);
    assert_le!(max_err, 0.05);

    // a corrupt file is a miss: regenerate and overwrite
    std::fs::write(&path, b"not a png").unwrap();
    let regenerated = planet.raster_via_store(&store, ScalarField::Temperature, RESOLUTION, &projection, None);
    assert_eq!(regenerated, generated);
    assert!(store.load(&path).is_some());
}

#[test]
fn test_store_keeps_planets_with_same_name_and_seed_apart() {
    let dir = tempfile::tempdir().unwrap();
    let store = PngRasterStore::new(dir.path());
    let projection = ProjectionModel::equirectangular();
    let at = |temp: f64| {
        PlanetSynthesizer::default()
            .synthesize_standalone(&PlanetParams {
                average_temp_k: Some(temp),
                ..PlanetParams::default()
            })
            .planet
    };
    let cold = at(250.0);
    let hot = at(320.0);
    assert_eq!((cold.name.as_str(), cold.seed), (hot.name.as_str(), hot.seed));
    assert_ne!(cold.state_fingerprint(), hot.state_fingerprint());

    let mean = |g: &Grid<f32>| g.cells().iter().map(|c| *c as f64).sum::<f64>() / g.len() as f64;
    let cold_grid = cold.raster_via_store(&store, ScalarField::Temperature, RESOLUTION, &projection, None);
    let hot_grid = hot.raster_via_store(&store, ScalarField::Temperature, RESOLUTION, &projection, None);
    println!("🧊 cold mean {:.1} K, 🔥 hot mean {:.1} K", mean(&cold_grid), mean(&hot_grid));
    assert_gt!(mean(&hot_grid), mean(&cold_grid) + 30.0);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn test_background_writer_persists_encoded_rasters() {
    let dir = tempfile::tempdir().unwrap();
    let store = PngRasterStore::new(dir.path());
    let mut planet = earthlike();
    let projection = ProjectionModel::equirectangular();
    let encoding = planet.encoding_for(ScalarField::Elevation);
    let grid = planet.raster(ScalarField::Elevation, RESOLUTION, &projection, None).clone();

    let mut writer = BackgroundRasterWriter::new(Box::new(store.clone()));
    let pending = writer.submit(encoding.encode_grid(&grid), "earthlike-elevation").unwrap();
    let path = pending.recv().unwrap().unwrap();
    writer.shutdown();

    let decoded = encoding.decode_grid(&store.load(&path).unwrap());
    let step = 2.0 * planet.max_elevation_m() as f32 / u16::MAX as f32;
    for (a, b) in grid.cells().iter().zip(decoded.cells()) {
        assert_le!((a - b).abs(), step);
    }
}

#[test]
fn test_seasonal_series_interpolates_between_steps() {
    let planet = earthlike();
    let ctx = planet.raster_context();
    let projection = ProjectionModel::equirectangular();
    let cancel = AtomicBool::new(false);

    let series = SeasonalSeries::generate(&ctx, ScalarField::Temperature, RESOLUTION, &projection, 4, &cancel).unwrap();
    assert_eq!(series.steps().len(), 4);

    let mid = series.interpolate(0.125).unwrap();
    let (s0, s1) = (&series.steps()[0], &series.steps()[1]);
    for ((m, a), b) in mid.cells().iter().zip(s0.cells()).zip(s1.cells()) {
        assert_le!((m - (a + b) / 2.0).abs(), 1e-3);
    }

    // the year wraps back onto the first step
    let wrapped = series.interpolate(1.0).unwrap();
    assert_eq!(&wrapped, s0);
}

#[test]
fn test_cancelled_series_fails() {
    let planet = earthlike();
    let cancel = AtomicBool::new(true);
    let result = SeasonalSeries::generate(
        &planet.raster_context(),
        ScalarField::Snowfall,
        RESOLUTION,
        &ProjectionModel::equirectangular(),
        3,
        &cancel,
    );
    assert!(matches!(result, Err(SynthError::Cancelled(_))));
}

#[test]
fn test_projection_round_trip_within_one_pixel() {
    for kind in [ProjectionKind::Equirectangular, ProjectionKind::CylindricalEqualArea] {
        let projection = ProjectionModel::from_kind(kind).with_central_meridian(0.7);
        let (width, height) = projection.dimensions(RESOLUTION);
        for y in 0..height {
            let (lat_span, lon_span) = projection.pixel_angular_span(y, RESOLUTION);
            for x in (0..width).step_by(5) {
                let (lat, lon) = projection.pixel_to_lat_lon(x, y, RESOLUTION);
                assert_eq!(projection.lat_lon_to_pixel(lat, lon, RESOLUTION), (x, y));
                // a nudge of a quarter pixel stays in the pixel
                let nudged = projection.lat_lon_to_pixel(lat + 0.25 * lat_span, lon - 0.25 * lon_span, RESOLUTION);
                assert_eq!(nudged, (x, y));
            }
        }
    }
}
