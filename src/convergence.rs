//! Outer convergence loop.
//!
//! Temperature depends on distance, greenhouse, phase state and albedo, and
//! each of those feeds back into the others. The controller iterates one free
//! parameter (orbital distance, or bare-surface albedo when the orbit is
//! pinned) through a damped secant search in log space, re-running the
//! atmosphere and hydrosphere each pass, until the governing temperature
//! lands within tolerance or the pass budget runs out. It always returns the
//! best state it saw.

use crate::archetype::Archetype;
use crate::atmosphere::{
    Atmosphere, AtmosphereRequest, AtmosphereSolver, RadiativeEnvironment, Reservoirs, SurfaceConditions,
    SurfaceState, SurfaceVolatiles,
};
use crate::climate::ClimateModel;
use crate::composition::{Composition, CompositionBuilder, CompositionRequest};
use crate::config::{ConvergenceConfig, SynthConfig};
use crate::hydrosphere::{Hydrosphere, Hypsometry};
use crate::noise_field::PlanetNoise;
use crate::orbit::{OrbitGeometry, OrbitSource};
use crate::planet::{Planet, ResolvedParams};
use crate::temp_utils::distance_for_equilibrium;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Initial d(ln T)/d(ln a): insolation temperature falls as a^-½.
const DISTANCE_SENSITIVITY: f64 = -0.5;
/// Initial d(ln T)/d(ln(1-A)): absorbed flux enters as (1-A)^¼.
const ALBEDO_SENSITIVITY: f64 = 0.25;
const MAX_ALBEDO: f64 = 0.95;
/// Learned sensitivity stays within this factor band of the initial one.
const SENSITIVITY_BAND: (f64, f64) = (0.1, 5.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceState {
    Initial,
    CompositionBuilt,
    AtmosphereGenerated,
    TemperatureEvaluated,
    Adjusting,
    Converged,
}

/// Which temperature the loop steers, and to what.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TemperatureTarget {
    /// Orbit-averaged surface temperature.
    Average(f64),
    /// Coldest equatorial temperature of the year, from a habitability minimum.
    ColdestEquatorial(f64),
    /// Hottest polar temperature of the year, from a habitability maximum.
    HottestPolar(f64),
    Unconstrained,
}

impl TemperatureTarget {
    /// An explicit average wins; otherwise the habitability minimum governs,
    /// then the maximum. Bounds are pulled inside by one tolerance.
    pub fn governing(params: &ResolvedParams, tolerance_k: f64) -> Self {
        if let Some(t) = params.average_temp_k {
            return TemperatureTarget::Average(t);
        }
        match &params.habitability {
            Some(req) if req.min_temp_k > 0.0 => TemperatureTarget::ColdestEquatorial(req.min_temp_k + tolerance_k),
            Some(req) if req.max_temp_k.is_finite() && req.max_temp_k > 0.0 => {
                TemperatureTarget::HottestPolar(req.max_temp_k - tolerance_k)
            }
            _ => TemperatureTarget::Unconstrained,
        }
    }

    pub fn target_k(&self) -> Option<f64> {
        match *self {
            TemperatureTarget::Average(t)
            | TemperatureTarget::ColdestEquatorial(t)
            | TemperatureTarget::HottestPolar(t) => Some(t),
            TemperatureTarget::Unconstrained => None,
        }
    }

    pub fn measure(&self, climate: &ClimateModel) -> f64 {
        match self {
            TemperatureTarget::ColdestEquatorial(_) => climate.coldest_equatorial_k(),
            TemperatureTarget::HottestPolar(_) => climate.hottest_polar_k(),
            TemperatureTarget::Average(_) | TemperatureTarget::Unconstrained => climate.average_temp_k(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureTarget::Average(_) => "average temperature",
            TemperatureTarget::ColdestEquatorial(_) => "habitable minimum",
            TemperatureTarget::HottestPolar(_) => "habitable maximum",
            TemperatureTarget::Unconstrained => "unconstrained",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreeParameter {
    /// Semi-major axis in metres.
    Distance,
    /// Bare-surface albedo.
    Albedo,
}

impl FreeParameter {
    fn initial_sensitivity(self) -> f64 {
        match self {
            FreeParameter::Distance => DISTANCE_SENSITIVITY,
            FreeParameter::Albedo => ALBEDO_SENSITIVITY,
        }
    }

    /// Log-space coordinate the secant search walks in.
    fn to_log(self, value: f64) -> f64 {
        match self {
            FreeParameter::Distance => value.max(1.0).ln(),
            FreeParameter::Albedo => (1.0 - value.clamp(0.0, MAX_ALBEDO)).ln(),
        }
    }

    fn from_log(self, x: f64) -> f64 {
        match self {
            FreeParameter::Distance => x.exp(),
            FreeParameter::Albedo => (1.0 - x.exp()).clamp(0.0, MAX_ALBEDO),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FreeParameter::Distance => "distance",
            FreeParameter::Albedo => "albedo",
        }
    }
}

/// One evaluated pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassRecord {
    pub pass: usize,
    /// Free parameter value this pass was evaluated at.
    pub parameter: f64,
    pub achieved_k: f64,
    pub delta_k: f64,
    pub gain: f64,
    /// The pass diverged and its state was thrown away.
    pub discarded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub passes: usize,
    pub converged: bool,
    pub governing: TemperatureTarget,
    pub free_parameter: FreeParameter,
    /// Parameter value of the returned state.
    pub parameter: f64,
    pub first_delta_k: f64,
    /// Delta of the returned state, i.e. the smallest seen.
    pub final_delta_k: f64,
    pub trace: Vec<PassRecord>,
}

impl ConvergenceReport {
    /// True when the result is the closest state found rather than a converged one.
    pub fn is_approximate(&self) -> bool {
        !self.converged
    }
}

pub struct ConvergenceOutcome {
    pub planet: Planet,
    pub report: ConvergenceReport,
}

/// Everything one pass produces; the best one becomes the planet.
#[derive(Debug, Clone)]
struct Candidate {
    parameter: f64,
    geometry: OrbitGeometry,
    atmosphere: Atmosphere,
    hydrosphere: Hydrosphere,
    volatiles: SurfaceVolatiles,
    surface: SurfaceState,
    achieved_k: f64,
    delta_k: f64,
}

/// Mutable state that carries from pass to pass until a discard.
struct WorkingState {
    atmosphere: Option<Atmosphere>,
    hydrosphere: Hydrosphere,
    volatiles: SurfaceVolatiles,
    last_temp_k: Option<f64>,
}

impl WorkingState {
    fn pristine(hydrosphere: &Hydrosphere) -> Self {
        Self {
            atmosphere: None,
            hydrosphere: hydrosphere.clone(),
            volatiles: SurfaceVolatiles::default(),
            last_temp_k: None,
        }
    }
}

/// Fixed inputs shared by every pass.
struct Fixture<'a> {
    params: &'a ResolvedParams,
    composition: Composition,
    noise: PlanetNoise,
    pristine_hydrosphere: Hydrosphere,
    internal_heat_k: f64,
}

/// Damped secant step in log space, clamped to `ln(max_step_ratio)`.
pub fn secant_step(gain: f64, target_k: f64, achieved_k: f64, sensitivity: f64, max_step_ratio: f64) -> f64 {
    if sensitivity == 0.0 || target_k <= 0.0 {
        return 0.0;
    }
    let limit = max_step_ratio.max(1.0 + 1e-6).ln();
    let step = gain * (target_k / achieved_k.max(1.0)).ln() / sensitivity;
    step.clamp(-limit, limit)
}

/// Keep a learned sensitivity on the same side and within a band of the initial guess.
fn bound_sensitivity(learned: f64, initial: f64) -> f64 {
    let magnitude = learned.abs().clamp(SENSITIVITY_BAND.0 * initial.abs(), SENSITIVITY_BAND.1 * initial.abs());
    if learned.signum() == initial.signum() {
        magnitude * initial.signum()
    } else {
        initial
    }
}

/// Gain and sensitivity bookkeeping of the outer search, in log space.
#[derive(Debug, Clone)]
struct Stepper {
    initial_sensitivity: f64,
    sensitivity: f64,
    gain: f64,
    max_step_ratio: f64,
    /// (x, ln achieved, delta) of the last kept pass.
    previous: Option<(f64, f64, f64)>,
}

impl Stepper {
    fn new(initial_sensitivity: f64, max_step_ratio: f64) -> Self {
        Self {
            initial_sensitivity,
            sensitivity: initial_sensitivity,
            gain: 1.0,
            max_step_ratio,
            previous: None,
        }
    }

    /// Next `x` after measuring `achieved_k` at `x`. `None` means |delta| grew:
    /// the gain is halved, history is dropped and the caller restarts.
    fn advance(&mut self, x: f64, target_k: f64, achieved_k: f64) -> Option<f64> {
        let delta = target_k - achieved_k;
        if self.previous.is_some_and(|(_, _, prev_delta)| delta.abs() > prev_delta.abs()) {
            self.gain *= 0.5;
            self.previous = None;
            return None;
        }

        let ln_achieved = achieved_k.max(1.0).ln();
        if let Some((prev_x, prev_ln, prev_delta)) = self.previous {
            if delta.signum() != prev_delta.signum() {
                self.gain *= 0.5;
            } else {
                self.gain = (self.gain * 2.0).min(1.0);
            }
            if (x - prev_x).abs() > 1e-9 {
                self.sensitivity = bound_sensitivity((ln_achieved - prev_ln) / (x - prev_x), self.initial_sensitivity);
            }
        }
        self.previous = Some((x, ln_achieved, delta));
        Some(x + self.step(target_k, achieved_k))
    }

    fn step(&self, target_k: f64, achieved_k: f64) -> f64 {
        secant_step(self.gain, target_k, achieved_k, self.sensitivity, self.max_step_ratio)
    }
}

pub struct ConvergenceController {
    pub config: ConvergenceConfig,
    solver: AtmosphereSolver,
    state: ConvergenceState,
}

impl ConvergenceController {
    pub fn new(config: &SynthConfig) -> Self {
        Self {
            config: config.convergence.clone(),
            solver: AtmosphereSolver::new(config.equilibration.clone()),
            state: ConvergenceState::Initial,
        }
    }

    pub fn state(&self) -> ConvergenceState {
        self.state
    }

    fn transition(&mut self, to: ConvergenceState) {
        if self.state != to {
            debug!(from = ?self.state, to = ?to, "convergence state");
            self.state = to;
        }
    }

    /// Build and stabilize a planet. Never fails: an unconverged run returns
    /// the closest state with `converged == false`.
    pub fn run(&mut self, params: &ResolvedParams, orbit: &mut dyn OrbitSource) -> ConvergenceOutcome {
        self.state = ConvergenceState::Initial;
        let fixture = self.build_fixture(params);
        let governing = TemperatureTarget::governing(params, self.config.tolerance_k);

        match governing.target_k() {
            None => self.evaluate_once(fixture, governing, orbit),
            Some(target_k) => self.search(fixture, governing, target_k, orbit),
        }
    }

    fn build_fixture<'a>(&mut self, params: &'a ResolvedParams) -> Fixture<'a> {
        let rules = params.archetype.rules();
        let composition = CompositionBuilder::new().build(&CompositionRequest {
            archetype: params.archetype,
            chemistry: params.chemistry,
            size: params.size,
            density_hint_kg_m3: params.density_hint_kg_m3,
            rotation_period_s: params.rotation_period_s,
            surface_temp_k: params.temperature_estimate_k(),
            seed: params.seed,
        });
        self.transition(ConvergenceState::CompositionBuilt);

        let noise = PlanetNoise::new(params.seed, params.axial_tilt_rad, rules.max_elevation_m);
        let hypsometry = Hypsometry::from_noise(&noise, composition.radius_m());
        let pristine_hydrosphere = if params.archetype == Archetype::Giant {
            Hydrosphere::dry(hypsometry)
        } else {
            Hydrosphere::from_coverage(hypsometry, params.water_coverage)
        };

        Fixture {
            params,
            internal_heat_k: rules.internal_heat_k(composition.mass_kg),
            composition,
            noise,
            pristine_hydrosphere,
        }
    }

    fn environment(&self, fixture: &Fixture<'_>, geometry: &OrbitGeometry, base_albedo: f64) -> RadiativeEnvironment {
        let params = fixture.params;
        RadiativeEnvironment {
            luminosity_w: params.star.luminosity_w,
            periapsis_m: geometry.periapsis_m,
            apoapsis_m: geometry.apoapsis_m,
            base_albedo,
            internal_heat_k: fixture.internal_heat_k,
            axial_tilt_rad: params.axial_tilt_rad,
            rotation_period_s: params.rotation_period_s,
            has_surface: params.archetype != Archetype::Giant,
        }
    }

    fn generate_atmosphere(&mut self, fixture: &Fixture<'_>, state: &WorkingState) -> Atmosphere {
        let params = fixture.params;
        let atmosphere = self.solver.generate(&AtmosphereRequest {
            archetype: params.archetype,
            chemistry: params.chemistry,
            mass_kg: fixture.composition.mass_kg,
            radius_m: fixture.composition.radius_m(),
            temperature_estimate_k: state.last_temp_k.unwrap_or_else(|| params.temperature_estimate_k()),
            has_water: !state.hydrosphere.is_dry(),
            hint: params.atmosphere_hint.clone(),
        });
        self.transition(ConvergenceState::AtmosphereGenerated);
        atmosphere
    }

    /// Equilibrate the working state at one orbit and albedo and measure it.
    fn evaluate(
        &mut self,
        fixture: &Fixture<'_>,
        state: &mut WorkingState,
        geometry: OrbitGeometry,
        base_albedo: f64,
        governing: TemperatureTarget,
    ) -> (SurfaceState, f64) {
        let mut atmosphere = match state.atmosphere.take() {
            Some(atmosphere) => atmosphere,
            None => self.generate_atmosphere(fixture, state),
        };

        let env = self.environment(fixture, &geometry, base_albedo);
        let conditions = SurfaceConditions {
            gravity_ms2: fixture.composition.surface_gravity_ms2(),
            radius_m: fixture.composition.radius_m(),
            chemistry: fixture.params.chemistry,
            liquid_water_coverage: state.hydrosphere.coverage(),
        };
        let mut reservoirs = Reservoirs {
            hydrosphere: &mut state.hydrosphere,
            volatiles: &mut state.volatiles,
        };
        let surface = match state.last_temp_k {
            Some(start) => self.solver.equilibrate_from(&mut atmosphere, &mut reservoirs, &conditions, &env, start),
            None => self.solver.equilibrate(&mut atmosphere, &mut reservoirs, &conditions, &env),
        };
        state
            .hydrosphere
            .stratify(surface.ice_fraction, surface.average_temp_k, fixture.internal_heat_k);

        let climate = ClimateModel {
            periapsis_temp_k: surface.periapsis_temp_k,
            apoapsis_temp_k: surface.apoapsis_temp_k,
            pressure_kpa: atmosphere.pressure_kpa,
            axial_tilt_rad: fixture.params.axial_tilt_rad,
            rotation_period_s: fixture.params.rotation_period_s,
            gravity_ms2: conditions.gravity_ms2,
            air_mass_ratio: (atmosphere.scale_height_m > 0.0).then(|| conditions.radius_m / atmosphere.scale_height_m),
        };
        let achieved = governing.measure(&climate);

        state.atmosphere = Some(atmosphere);
        state.last_temp_k = Some(surface.average_temp_k);
        self.transition(ConvergenceState::TemperatureEvaluated);
        (surface, achieved)
    }

    fn evaluate_once(
        &mut self,
        fixture: Fixture<'_>,
        governing: TemperatureTarget,
        orbit: &mut dyn OrbitSource,
    ) -> ConvergenceOutcome {
        let params = fixture.params;
        let geometry = match (params.semi_major_axis_m, orbit.geometry()) {
            (Some(a), _) => orbit.recompute(a),
            (None, Some(existing)) => existing,
            (None, None) => orbit.recompute(params.star.earth_equivalent_distance_m()),
        };

        let mut state = WorkingState::pristine(&fixture.pristine_hydrosphere);
        let (surface, achieved) = self.evaluate(&fixture, &mut state, geometry, params.base_albedo, governing);
        self.transition(ConvergenceState::Converged);
        info!(
            planet = %params.name,
            temp_k = surface.average_temp_k,
            "no temperature target; single evaluation"
        );

        let candidate = Candidate {
            parameter: geometry.semi_major_axis_m,
            geometry,
            atmosphere: state.atmosphere.unwrap_or_else(Atmosphere::vacuum),
            hydrosphere: state.hydrosphere,
            volatiles: state.volatiles,
            surface,
            achieved_k: achieved,
            delta_k: 0.0,
        };
        let report = ConvergenceReport {
            passes: 1,
            converged: true,
            governing,
            free_parameter: FreeParameter::Distance,
            parameter: candidate.parameter,
            first_delta_k: 0.0,
            final_delta_k: 0.0,
            trace: vec![PassRecord {
                pass: 1,
                parameter: candidate.parameter,
                achieved_k: achieved,
                delta_k: 0.0,
                gain: 1.0,
                discarded: false,
            }],
        };
        ConvergenceOutcome {
            planet: assemble(fixture, candidate),
            report,
        }
    }

    fn search(
        &mut self,
        fixture: Fixture<'_>,
        governing: TemperatureTarget,
        target_k: f64,
        orbit: &mut dyn OrbitSource,
    ) -> ConvergenceOutcome {
        let params = fixture.params;
        let luminosity = params.star.luminosity_w;
        let free = if params.semi_major_axis_m.is_some() {
            FreeParameter::Albedo
        } else {
            FreeParameter::Distance
        };

        let mut state = WorkingState::pristine(&fixture.pristine_hydrosphere);
        let pinned_geometry = params.semi_major_axis_m.map(|a| orbit.recompute(a));

        let initial_value = match free {
            FreeParameter::Albedo => params.base_albedo,
            FreeParameter::Distance => {
                // first guess from the generated atmosphere's greenhouse factor
                let atmosphere = self.generate_atmosphere(&fixture, &state);
                let greenhouse = atmosphere.greenhouse_factor.max(1.0);
                state.atmosphere = Some(atmosphere);
                distance_for_equilibrium(luminosity, params.base_albedo, target_k / greenhouse)
            }
        };

        let mut stepper = Stepper::new(free.initial_sensitivity(), self.config.max_step_ratio);
        let mut x = free.to_log(initial_value);
        let mut best: Option<Candidate> = None;
        let mut trace = Vec::new();
        let mut converged = false;

        for pass in 1..=self.config.max_passes.max(1) {
            let value = free.from_log(x);
            let (geometry, base_albedo) = match (free, pinned_geometry) {
                (FreeParameter::Albedo, Some(geometry)) => (geometry, value),
                _ => (orbit.recompute(value), params.base_albedo),
            };

            let (surface, achieved) = self.evaluate(&fixture, &mut state, geometry, base_albedo, governing);
            let delta = target_k - achieved;
            debug!(
                pass,
                parameter = free.as_str(),
                value,
                achieved_k = achieved,
                delta_k = delta,
                gain = stepper.gain,
                "convergence pass"
            );

            let improved = best.as_ref().is_none_or(|b| delta.abs() < b.delta_k.abs());
            if improved {
                best = Some(Candidate {
                    parameter: value,
                    geometry,
                    atmosphere: state.atmosphere.clone().unwrap_or_else(Atmosphere::vacuum),
                    hydrosphere: state.hydrosphere.clone(),
                    volatiles: state.volatiles.clone(),
                    surface,
                    achieved_k: achieved,
                    delta_k: delta,
                });
            }

            let mut record = PassRecord {
                pass,
                parameter: value,
                achieved_k: achieved,
                delta_k: delta,
                gain: stepper.gain,
                discarded: false,
            };

            if delta.abs() <= self.config.tolerance_k {
                trace.push(record);
                converged = true;
                self.transition(ConvergenceState::Converged);
                break;
            }
            if pass == self.config.max_passes.max(1) {
                trace.push(record);
                break;
            }
            self.transition(ConvergenceState::Adjusting);

            match stepper.advance(x, target_k, achieved) {
                Some(next) => {
                    x = next;
                    if free == FreeParameter::Albedo {
                        x = free.to_log(free.from_log(x));
                    }
                }
                None => {
                    // throw away the partial state and restart from the best pass seen
                    record.discarded = true;
                    state = WorkingState::pristine(&fixture.pristine_hydrosphere);
                    if let Some(b) = &best {
                        x = match free {
                            FreeParameter::Distance => {
                                let desired_avg = (b.surface.average_temp_k + b.delta_k).max(1.0);
                                let greenhouse = b.surface.greenhouse_ratio.max(1e-3);
                                let distance = distance_for_equilibrium(
                                    luminosity,
                                    b.surface.total_albedo,
                                    desired_avg / greenhouse,
                                );
                                free.to_log(distance)
                            }
                            FreeParameter::Albedo => free.to_log(b.parameter) + stepper.step(target_k, b.achieved_k),
                        };
                    }
                    debug!(pass, "diverging pass discarded");
                }
            }
            trace.push(record);
        }

        let Some(best) = best else {
            // unreachable with at least one pass; fall back to a single evaluation
            return self.evaluate_once(fixture, governing, orbit);
        };

        if free == FreeParameter::Distance {
            orbit.recompute(best.geometry.semi_major_axis_m);
        }

        let first_delta_k = trace.first().map(|r| r.delta_k).unwrap_or(best.delta_k);
        if converged {
            info!(
                planet = %params.name,
                passes = trace.len(),
                parameter = free.as_str(),
                value = best.parameter,
                temp_k = best.surface.average_temp_k,
                "converged"
            );
        } else {
            warn!(
                planet = %params.name,
                passes = trace.len(),
                delta_k = best.delta_k,
                "pass budget exhausted; returning the closest state"
            );
        }

        let report = ConvergenceReport {
            passes: trace.len(),
            converged,
            governing,
            free_parameter: free,
            parameter: best.parameter,
            first_delta_k,
            final_delta_k: best.delta_k,
            trace,
        };
        ConvergenceOutcome {
            planet: assemble(fixture, best),
            report,
        }
    }
}

fn assemble(fixture: Fixture<'_>, best: Candidate) -> Planet {
    let params = fixture.params;
    let mut composition = fixture.composition;
    composition.set_surface_temperature(best.surface.average_temp_k);

    let mut planet = Planet::new(
        params.name.clone(),
        params.seed,
        params.archetype,
        params.chemistry,
        composition.mass_kg,
        composition.density_kg_m3,
        composition.shape,
        params.rotation_period_s,
        params.axial_tilt_rad,
        params.star,
        composition.layers,
        best.atmosphere,
        best.volatiles,
        best.hydrosphere,
        fixture.noise,
    );
    planet.orbit = Some(best.geometry);
    planet.periapsis_temp_k = best.surface.periapsis_temp_k;
    planet.apoapsis_temp_k = best.surface.apoapsis_temp_k;
    planet.surface_albedo = best.surface.surface_albedo;
    planet.total_albedo = best.surface.total_albedo;
    planet.ice_fraction = best.surface.ice_fraction;
    planet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habitability::HabitabilityRequirements;
    use crate::orbit::KeplerOrbit;
    use crate::planet::PlanetParams;
    use approx::assert_abs_diff_eq;
    use more_asserts::{assert_ge, assert_gt, assert_le, assert_lt};

    #[test]
    fn test_governing_target_priority() {
        let tol = 0.5;
        let mut params = PlanetParams {
            average_temp_k: Some(300.0),
            habitability: Some(HabitabilityRequirements::human()),
            ..PlanetParams::default()
        };
        assert_eq!(TemperatureTarget::governing(&params.resolve(), tol), TemperatureTarget::Average(300.0));

        params.average_temp_k = None;
        assert_eq!(
            TemperatureTarget::governing(&params.resolve(), tol),
            TemperatureTarget::ColdestEquatorial(250.5)
        );

        if let Some(req) = params.habitability.as_mut() {
            req.min_temp_k = 0.0;
        }
        assert_eq!(TemperatureTarget::governing(&params.resolve(), tol), TemperatureTarget::HottestPolar(322.5));

        params.habitability = None;
        assert_eq!(TemperatureTarget::governing(&params.resolve(), tol), TemperatureTarget::Unconstrained);
    }

    #[test]
    fn test_secant_step_direction_and_clamp() {
        // too cold: move inward
        assert_lt!(secant_step(1.0, 300.0, 250.0, DISTANCE_SENSITIVITY, 5.0), 0.0);
        // too cold with albedo free: darken, i.e. raise ln(1-A)
        assert_ge!(secant_step(1.0, 300.0, 250.0, ALBEDO_SENSITIVITY, 5.0), 0.0);
        let huge = secant_step(1.0, 1000.0, 10.0, DISTANCE_SENSITIVITY, 5.0);
        assert_abs_diff_eq!(huge, -(5.0f64.ln()), epsilon = 1e-12);
        assert_eq!(secant_step(1.0, 300.0, 300.0, DISTANCE_SENSITIVITY, 5.0), 0.0);
    }

    #[test]
    fn test_sensitivity_bounds() {
        assert_eq!(bound_sensitivity(0.3, DISTANCE_SENSITIVITY), DISTANCE_SENSITIVITY);
        assert_abs_diff_eq!(bound_sensitivity(-100.0, DISTANCE_SENSITIVITY), -2.5);
        assert_abs_diff_eq!(bound_sensitivity(0.001, ALBEDO_SENSITIVITY), 0.025);
    }

    #[test]
    fn test_stepper_halves_gain_on_sign_flip_then_recovers() {
        let mut stepper = Stepper::new(DISTANCE_SENSITIVITY, 5.0);
        let x1 = stepper.advance(0.0, 300.0, 250.0).unwrap();
        assert_eq!(stepper.gain, 1.0);
        assert_lt!(x1, 0.0);

        // overshoot to the hot side with a smaller error
        let x2 = stepper.advance(x1, 300.0, 320.0).unwrap();
        assert_eq!(stepper.gain, 0.5);
        assert_gt!(x2, x1);

        stepper.advance(x2, 300.0, 310.0).unwrap();
        assert_eq!(stepper.gain, 1.0);
    }

    #[test]
    fn test_stepper_drops_history_when_delta_grows() {
        let mut stepper = Stepper::new(DISTANCE_SENSITIVITY, 5.0);
        let x1 = stepper.advance(0.0, 300.0, 250.0).unwrap();
        assert!(stepper.advance(x1, 300.0, 240.0).is_none());
        assert_eq!(stepper.gain, 0.5);
        assert!(stepper.previous.is_none());
        assert_eq!(stepper.sensitivity, DISTANCE_SENSITIVITY);

        // the next pass is compared against nothing, so it is kept
        assert!(stepper.advance(0.0, 300.0, 260.0).is_some());
        assert_eq!(stepper.gain, 0.5);
    }

    #[test]
    fn test_stepper_settles_a_stiff_response() {
        // the true response is three times steeper than the initial guess, so the
        // first step overshoots badly
        let response = |x: f64| 300.0 * (-1.6 * x).exp();
        let target = 330.0;
        let mut stepper = Stepper::new(DISTANCE_SENSITIVITY, 5.0);
        let mut x = 0.0;
        let mut best: Option<(f64, f64)> = None;
        let mut gains = Vec::new();
        let mut discarded = Vec::new();

        for pass in 1..=crate::constants::MAX_CONVERGENCE_PASSES {
            let achieved = response(x);
            let delta = target - achieved;
            if best.is_none_or(|(_, b)| delta.abs() < (target - b).abs()) {
                best = Some((x, achieved));
            }
            gains.push(stepper.gain);
            println!("🔁 pass {} x {:+.4} achieved {:.2} K gain {}", pass, x, achieved, stepper.gain);
            if delta.abs() <= 0.5 {
                break;
            }
            x = match stepper.advance(x, target, achieved) {
                Some(next) => next,
                None => {
                    discarded.push(pass);
                    let (bx, ba) = best.unwrap();
                    bx + stepper.step(target, ba)
                }
            };
        }

        assert_eq!(discarded, vec![2]);
        assert_eq!(gains, vec![1.0, 1.0, 0.5, 0.5, 0.25, 0.5, 1.0]);
        let (bx, ba) = best.unwrap();
        assert_le!((target - ba).abs(), 0.5);
        assert_eq!(bx, x);
    }

    #[test]
    fn test_free_parameter_log_mapping() {
        let a = 1.5e11;
        assert_abs_diff_eq!(FreeParameter::Distance.from_log(FreeParameter::Distance.to_log(a)), a, epsilon = 1.0);
        assert_abs_diff_eq!(FreeParameter::Albedo.from_log(FreeParameter::Albedo.to_log(0.3)), 0.3, epsilon = 1e-12);
        assert_eq!(FreeParameter::Albedo.from_log(f64::NEG_INFINITY), MAX_ALBEDO);
    }

    #[test]
    fn test_unconstrained_runs_once_at_earth_equivalent_distance() {
        let params = PlanetParams {
            archetype: Some(Archetype::Asteroid),
            seed: Some(7),
            ..PlanetParams::default()
        }
        .resolve();
        let mut orbit = KeplerOrbit::new(0.0, params.star.mass_kg);
        let mut controller = ConvergenceController::new(&SynthConfig::default());
        let outcome = controller.run(&params, &mut orbit);

        assert!(outcome.report.converged);
        assert_eq!(outcome.report.passes, 1);
        assert_eq!(controller.state(), ConvergenceState::Converged);
        let a = outcome.planet.semi_major_axis_m().unwrap();
        assert_abs_diff_eq!(a, params.star.earth_equivalent_distance_m(), epsilon = 1.0);
        assert_eq!(orbit.recomputations, 1);
    }

    #[test]
    fn test_unconstrained_keeps_an_existing_orbit() {
        let params = PlanetParams {
            archetype: Some(Archetype::Comet),
            seed: Some(2),
            ..PlanetParams::default()
        }
        .resolve();
        let a = 5.2 * crate::constants::AU_M;
        let mut orbit = KeplerOrbit::placed(a, 0.05, params.star.mass_kg);
        let outcome = ConvergenceController::new(&SynthConfig::default()).run(&params, &mut orbit);

        assert!(!outcome.report.is_approximate());
        assert_eq!(orbit.recomputations, 0);
        assert_eq!(outcome.planet.semi_major_axis_m(), Some(a));
        assert_eq!(outcome.planet.orbit.map(|o| o.eccentricity), Some(0.05));
    }

    #[test]
    fn test_best_state_never_worse_than_first() {
        let params = PlanetParams {
            average_temp_k: Some(260.0),
            seed: Some(3),
            ..PlanetParams::default()
        }
        .resolve();
        let mut orbit = KeplerOrbit::new(0.0, params.star.mass_kg);
        let outcome = ConvergenceController::new(&SynthConfig::default()).run(&params, &mut orbit);

        let report = &outcome.report;
        assert_le!(report.final_delta_k.abs(), report.first_delta_k.abs());
        let smallest = report.trace.iter().map(|r| r.delta_k.abs()).fold(f64::INFINITY, f64::min);
        assert_eq!(report.final_delta_k.abs(), smallest);
        assert_eq!(report.passes, report.trace.len());
        assert_le!(report.passes, crate::constants::MAX_CONVERGENCE_PASSES);
        assert_eq!(report.free_parameter, FreeParameter::Distance);
    }

    #[test]
    fn test_pinned_orbit_adjusts_albedo() {
        let params = PlanetParams {
            average_temp_k: Some(250.0),
            semi_major_axis_m: Some(crate::constants::AU_M),
            water_coverage: Some(0.0),
            surface_pressure_kpa: Some(1.0),
            seed: Some(11),
            ..PlanetParams::default()
        }
        .resolve();
        let mut orbit = KeplerOrbit::new(0.0, params.star.mass_kg);
        let outcome = ConvergenceController::new(&SynthConfig::default()).run(&params, &mut orbit);

        assert_eq!(outcome.report.free_parameter, FreeParameter::Albedo);
        assert_eq!(orbit.recomputations, 1);
        assert_abs_diff_eq!(outcome.planet.semi_major_axis_m().unwrap(), crate::constants::AU_M, epsilon = 1.0);
        assert_ge!(outcome.report.parameter, 0.0);
        assert_le!(outcome.report.parameter, MAX_ALBEDO);
    }
}
