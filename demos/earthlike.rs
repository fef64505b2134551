//! Synthesize the Earthlike preset, print its report and write its rasters.
//!
//! cargo run --example earthlike [config_dir]

use planet_synth_rust::config::SynthConfig;
use planet_synth_rust::logging::init_logging;
use planet_synth_rust::projection::ProjectionModel;
use planet_synth_rust::raster::{BackgroundRasterWriter, PngRasterStore, RasterKey, ScalarField, SeasonalSeries};
use planet_synth_rust::report::print_report;
use planet_synth_rust::{PlanetParams, PlanetSynthesizer, SynthResult};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

fn main() -> SynthResult<()> {
    let config_dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let config = SynthConfig::load_or_create(&config_dir)?;
    init_logging(Some(&config));

    let synthesizer = PlanetSynthesizer::new(config.clone());
    let mut result = synthesizer.synthesize_standalone(&PlanetParams::earthlike());
    print_report(&result);

    let planet = &mut result.planet;
    let projection = ProjectionModel::from_kind(config.raster.projection);
    let resolution = config.raster.resolution;
    let store = PngRasterStore::new(config.raster.store_dir.clone());
    let mut writer = BackgroundRasterWriter::new(Box::new(store));

    let mut pending = Vec::new();
    for field in ScalarField::ALL {
        let encoding = planet.encoding_for(field);
        let key = planet.store_key(&RasterKey::new(field, resolution, &projection, None));
        let grid = planet.raster(field, resolution, &projection, None);
        pending.push((field, writer.submit(encoding.encode_grid(grid), key)?));
    }

    let cancel = AtomicBool::new(false);
    let series = SeasonalSeries::generate(
        &planet.raster_context(),
        ScalarField::Temperature,
        resolution,
        &projection,
        config.raster.season_steps,
        &cancel,
    )?;
    let encoding = planet.encoding_for(ScalarField::Temperature);
    for (i, step) in series.steps().iter().enumerate() {
        let season = i as f64 / series.steps().len() as f64;
        let key = planet.store_key(&RasterKey::new(ScalarField::Temperature, resolution, &projection, Some(season)));
        pending.push((ScalarField::Temperature, writer.submit(encoding.encode_grid(step), key)?));
    }

    for (field, rx) in pending {
        match rx.recv().ok().flatten() {
            Some(path) => println!("✅ {} -> {}", field.as_str(), path.display()),
            None => println!("⚠️ {} raster was not written", field.as_str()),
        }
    }
    writer.shutdown();
    Ok(())
}
