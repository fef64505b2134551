//! Tunables for the synthesizer, loaded from `synth_config.json`.
//!
//! Every section has defaults matching the built-in constants, so a missing or
//! partial file still yields a usable configuration.

use crate::constants::{
    CONVERGENCE_TOLERANCE_K, EQUILIBRATION_TOLERANCE_K, MAX_CONVERGENCE_PASSES,
    MAX_EQUILIBRATION_PASSES,
};
use crate::error::SynthResult;
use crate::projection::ProjectionKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_FILE_NAME: &str = "synth_config.json";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SynthConfig {
    pub convergence: ConvergenceConfig,
    pub equilibration: EquilibrationConfig,
    pub raster: RasterConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    pub tolerance_k: f64,
    pub max_passes: usize,
    /// Upper bound on a single secant step, as a ratio of the free parameter.
    pub max_step_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EquilibrationConfig {
    pub tolerance_k: f64,
    pub max_passes: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Height of generated rasters in pixels; width follows the projection.
    pub resolution: usize,
    pub projection: ProjectionKind,
    pub season_steps: usize,
    pub store_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            convergence: ConvergenceConfig::default(),
            equilibration: EquilibrationConfig::default(),
            raster: RasterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            tolerance_k: CONVERGENCE_TOLERANCE_K,
            max_passes: MAX_CONVERGENCE_PASSES,
            max_step_ratio: 5.0,
        }
    }
}

impl Default for EquilibrationConfig {
    fn default() -> Self {
        Self {
            tolerance_k: EQUILIBRATION_TOLERANCE_K,
            max_passes: MAX_EQUILIBRATION_PASSES,
        }
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            resolution: 256,
            projection: ProjectionKind::Equirectangular,
            season_steps: 12,
            store_dir: PathBuf::from("rasters"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl SynthConfig {
    /// Read a config from an explicit JSON file.
    pub fn load(path: &Path) -> SynthResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: SynthConfig = serde_json::from_str(&contents)?;
        info!("Loaded synth config from {}", path.display());
        Ok(config)
    }

    /// Load `synth_config.json` from `config_dir`, writing the defaults there
    /// when it does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> SynthResult<Self> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let config = SynthConfig::default();
            config.save(config_dir)?;
            info!("Created default synth config at {}", config_path.display());
            Ok(config)
        }
    }

    pub fn save(&self, config_dir: &Path) -> SynthResult<()> {
        std::fs::create_dir_all(config_dir)?;
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(config_dir.join(CONFIG_FILE_NAME), serialized)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = SynthConfig::default();
        assert_eq!(config.convergence.tolerance_k, CONVERGENCE_TOLERANCE_K);
        assert_eq!(config.convergence.max_passes, MAX_CONVERGENCE_PASSES);
        assert_eq!(config.equilibration.tolerance_k, EQUILIBRATION_TOLERANCE_K);
        assert_eq!(config.equilibration.max_passes, MAX_EQUILIBRATION_PASSES);
    }

    #[test]
    fn test_load_or_create_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        let created = SynthConfig::load_or_create(dir.path()).unwrap();
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());

        let mut edited = created.clone();
        edited.raster.resolution = 64;
        edited.convergence.max_passes = 4;
        edited.save(dir.path()).unwrap();

        let reloaded = SynthConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(reloaded, edited);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "raster": { "resolution": 32 } }"#).unwrap();

        let config = SynthConfig::load(&path).unwrap();
        assert_eq!(config.raster.resolution, 32);
        assert_eq!(config.raster.season_steps, 12);
        assert_eq!(config.convergence, ConvergenceConfig::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "not json").unwrap();
        assert!(SynthConfig::load(&path).is_err());
    }
}
