pub mod archetype;
pub mod atmosphere;
pub mod climate;
pub mod composition;
pub mod config;
pub mod constants;
pub mod convergence;
pub mod error;
pub mod habitability;
pub mod hydrosphere;
pub mod logging;
pub mod material;
pub mod math_utils;
pub mod noise_field;
pub mod orbit;
pub mod phase_transition;
pub mod planet;
pub mod projection;
pub mod raster;
pub mod report;
pub mod synthesizer;
pub mod temp_utils;

pub use error::{SynthError, SynthResult};
pub use planet::{Planet, PlanetParams};
pub use synthesizer::{PlanetSynthesizer, SynthesisResult};
