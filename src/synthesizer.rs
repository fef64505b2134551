//! Entry point: wish list in, stabilized planet out.

use crate::config::SynthConfig;
use crate::convergence::{ConvergenceController, ConvergenceReport};
use crate::habitability::{UninhabitabilityReasons, is_habitable};
use crate::orbit::{KeplerOrbit, OrbitSource};
use crate::planet::{Planet, PlanetParams};
use tracing::info;

pub struct SynthesisResult {
    pub planet: Planet,
    pub report: ConvergenceReport,
    /// Failed habitability checks; `NONE` when no requirements were given.
    pub reasons: UninhabitabilityReasons,
}

impl SynthesisResult {
    pub fn is_habitable(&self) -> bool {
        self.reasons.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanetSynthesizer {
    pub config: SynthConfig,
}

impl PlanetSynthesizer {
    pub fn new(config: SynthConfig) -> Self {
        Self { config }
    }

    /// Synthesize against a caller-owned orbit. Distance changes are pushed
    /// to `orbit` as the controller moves the planet.
    pub fn synthesize(&self, params: &PlanetParams, orbit: &mut dyn OrbitSource) -> SynthesisResult {
        let resolved = params.resolve();
        let mut controller = ConvergenceController::new(&self.config);
        let outcome = controller.run(&resolved, orbit);

        let reasons = match &resolved.habitability {
            Some(requirements) => is_habitable(&outcome.planet, requirements),
            None => UninhabitabilityReasons::NONE,
        };
        info!(
            planet = %resolved.name,
            converged = outcome.report.converged,
            passes = outcome.report.passes,
            habitability = %reasons,
            "synthesized"
        );

        SynthesisResult {
            planet: outcome.planet,
            report: outcome.report,
            reasons,
        }
    }

    /// Synthesize with a fresh Keplerian orbit around the requested star.
    pub fn synthesize_standalone(&self, params: &PlanetParams) -> SynthesisResult {
        let resolved = params.resolve();
        let mut orbit = KeplerOrbit::new(resolved.eccentricity, resolved.star.mass_kg);
        self.synthesize(params, &mut orbit)
    }
}
