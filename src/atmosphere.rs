//! Atmosphere generation and phase equilibration.
//!
//! Partial pressures are the working currency: a species' column mass is
//! `p · A / g`, so moving gas between the air and a surface reservoir
//! conserves mass exactly, and the total pressure follows Dalton's law.

use crate::archetype::{Archetype, Chemistry};
use crate::climate::ClimateModel;
use crate::config::EquilibrationConfig;
use crate::constants::{
    CLOSURE_EPSILON, EARTH_GRAVITY_MS2, EARTH_MASS_KG, EARTH_PRESSURE_KPA, GAS_CONSTANT,
    GRAVITATIONAL_CONSTANT, HUMIDITY_THRESHOLD, MAX_BREATHABLE_O2_FRACTION,
    MAX_EVAPORATION_PER_PASS, TRACE_CO2_FRACTION,
};
use crate::habitability::HabitabilityRequirements;
use crate::hydrosphere::Hydrosphere;
use crate::material::Substance;
use crate::phase_transition::vapor_pressure_kpa;
use crate::temp_utils::{combine_internal_heat, equilibrium_temperature};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Pressure of the thin exosphere left on bodies that cannot hold gas.
pub const TRACE_PRESSURE_KPA: f64 = 1e-9;

const OCEAN_ALBEDO: f64 = 0.06;
const ICE_ALBEDO: f64 = 0.6;
const CLOUD_ALBEDO: f64 = 0.5;
const CLOUD_HALF_COVER_KPA: f64 = 1.5;
const MAX_CLOUD_COVER: f64 = 0.9;
const EARTH_WATER_COVERAGE_REF: f64 = 0.71;
const EQUILIBRATION_DAMPING: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atmosphere {
    pub pressure_kpa: f64,
    /// Mole fractions; sums to one unless the atmosphere is a vacuum.
    pub composition: BTreeMap<Substance, f64>,
    pub greenhouse_factor: f64,
    pub scale_height_m: f64,
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self::vacuum()
    }
}

impl Atmosphere {
    pub fn vacuum() -> Self {
        Self {
            pressure_kpa: 0.0,
            composition: BTreeMap::new(),
            greenhouse_factor: 1.0,
            scale_height_m: 0.0,
        }
    }

    /// Build from a recipe of mole fractions; the recipe is normalized.
    pub fn from_recipe(pressure_kpa: f64, recipe: &[(Substance, f64)]) -> Self {
        let partials: BTreeMap<Substance, f64> = recipe
            .iter()
            .map(|(s, f)| (*s, f * pressure_kpa))
            .collect();
        Self::from_partials(&partials)
    }

    /// Build from partial pressures. Non-positive entries are dropped; nothing left is a vacuum.
    pub fn from_partials(partials: &BTreeMap<Substance, f64>) -> Self {
        let mut atmo = Self::vacuum();
        atmo.set_partials(partials);
        atmo
    }

    fn set_partials(&mut self, partials: &BTreeMap<Substance, f64>) {
        let total: f64 = partials.values().filter(|p| **p > 0.0).sum();
        self.composition.clear();
        if total <= 0.0 || !total.is_finite() {
            self.pressure_kpa = 0.0;
            return;
        }
        self.pressure_kpa = total;
        for (s, p) in partials {
            if *p > 0.0 {
                self.composition.insert(*s, p / total);
            }
        }
    }

    pub fn partials(&self) -> BTreeMap<Substance, f64> {
        self.composition
            .iter()
            .map(|(s, f)| (*s, f * self.pressure_kpa))
            .collect()
    }

    pub fn is_vacuum(&self) -> bool {
        self.pressure_kpa <= 0.0 || self.composition.is_empty()
    }

    pub fn fraction(&self, substance: Substance) -> f64 {
        self.composition.get(&substance).copied().unwrap_or(0.0)
    }

    pub fn partial_pressure(&self, substance: Substance) -> f64 {
        self.fraction(substance) * self.pressure_kpa
    }

    /// Sum of mole fractions.
    pub fn closure(&self) -> f64 {
        self.composition.values().sum()
    }

    /// True when fractions sum to one within tolerance, or the atmosphere is a vacuum.
    pub fn is_closed(&self) -> bool {
        if self.is_vacuum() {
            self.composition.is_empty() || self.pressure_kpa <= 0.0
        } else {
            (self.closure() - 1.0).abs() <= CLOSURE_EPSILON
        }
    }

    pub fn mean_molar_mass(&self) -> f64 {
        self.composition
            .iter()
            .map(|(s, f)| s.profile().molar_mass_kg_mol * f)
            .sum()
    }

    /// Single-layer grey optical depth: τ = Σ kᵢ √pᵢ.
    pub fn optical_depth(&self) -> f64 {
        self.composition
            .iter()
            .map(|(s, f)| s.profile().greenhouse_coefficient * (f * self.pressure_kpa).sqrt())
            .sum()
    }

    /// Recompute greenhouse factor and scale height at a surface temperature.
    pub fn refresh_derived(&mut self, surface_temp_k: f64, gravity_ms2: f64) {
        self.greenhouse_factor = greenhouse_factor(self.optical_depth());
        self.scale_height_m = if self.is_vacuum() {
            0.0
        } else {
            scale_height(surface_temp_k, self.mean_molar_mass(), gravity_ms2)
        };
    }

    /// Fraction of the sky covered by water clouds.
    pub fn cloud_cover(&self) -> f64 {
        let p = self.partial_pressure(Substance::Water);
        (p / (p + CLOUD_HALF_COVER_KPA)).min(MAX_CLOUD_COVER)
    }

    /// Water vapour the air could hold at `temp_k`, in kPa. Zero without water.
    pub fn precipitation_capacity_kpa(&self, temp_k: f64) -> f64 {
        if self.is_vacuum() {
            0.0
        } else {
            vapor_pressure_kpa(Substance::Water, temp_k).min(self.pressure_kpa)
        }
    }
}

/// Surface warming factor from an optical depth: `(1 + 0.75τ)^¼`.
pub fn greenhouse_factor(optical_depth: f64) -> f64 {
    (1.0 + 0.75 * optical_depth.max(0.0)).powf(0.25)
}

/// Isothermal scale height `RT / (M g)`.
pub fn scale_height(temp_k: f64, molar_mass_kg_mol: f64, gravity_ms2: f64) -> f64 {
    if molar_mass_kg_mol <= 0.0 || gravity_ms2 <= 0.0 {
        0.0
    } else {
        GAS_CONSTANT * temp_k / (molar_mass_kg_mol * gravity_ms2)
    }
}

/// Direct-beam transmission at solar zenith angle `zenith`, relative to an
/// overhead sun. `radius_over_scale_height` sets the curvature of the air
/// column; the Meinel fit gives the attenuation.
pub fn insolation_factor(radius_over_scale_height: f64, zenith: f64) -> f64 {
    let r = radius_over_scale_height.max(1.0);
    let rc = r * zenith.cos();
    let air_mass = (rc * rc + 2.0 * r + 1.0).sqrt() - rc;
    0.7f64.powf(air_mass.powf(0.678)) / 0.7
}

/// Condensed volatiles (kg) held on or in the surface, water excluded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceVolatiles {
    pub reservoirs: BTreeMap<Substance, f64>,
}

impl SurfaceVolatiles {
    pub fn mass_kg(&self, substance: Substance) -> f64 {
        self.reservoirs.get(&substance).copied().unwrap_or(0.0)
    }

    pub fn total_kg(&self) -> f64 {
        self.reservoirs.values().sum()
    }

    pub fn deposit(&mut self, substance: Substance, kg: f64) {
        if kg > 0.0 {
            *self.reservoirs.entry(substance).or_insert(0.0) += kg;
        }
    }

    /// Take up to `kg`; returns what was actually taken.
    pub fn withdraw(&mut self, substance: Substance, kg: f64) -> f64 {
        let held = self.mass_kg(substance);
        let taken = kg.clamp(0.0, held);
        if taken > 0.0 {
            let left = held - taken;
            if left > 0.0 {
                self.reservoirs.insert(substance, left);
            } else {
                self.reservoirs.remove(&substance);
            }
        }
        taken
    }
}

/// Where condensed gas goes: water to the hydrosphere, everything else to the surface.
pub struct Reservoirs<'a> {
    pub hydrosphere: &'a mut Hydrosphere,
    pub volatiles: &'a mut SurfaceVolatiles,
}

impl Reservoirs<'_> {
    fn available(&self, substance: Substance) -> f64 {
        match substance {
            Substance::Water => self.hydrosphere.mass_kg,
            s => self.volatiles.mass_kg(s),
        }
    }

    fn deposit(&mut self, substance: Substance, kg: f64) {
        match substance {
            Substance::Water => self.hydrosphere.add_mass(kg),
            s => self.volatiles.deposit(s, kg),
        }
    }

    fn withdraw(&mut self, substance: Substance, kg: f64) -> f64 {
        match substance {
            Substance::Water => self.hydrosphere.remove_mass(kg),
            s => self.volatiles.withdraw(s, kg),
        }
    }

    pub fn total_kg(&self) -> f64 {
        self.hydrosphere.mass_kg + self.volatiles.total_kg()
    }
}

/// Surface facts equilibration needs besides temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceConditions {
    pub gravity_ms2: f64,
    pub radius_m: f64,
    pub chemistry: Chemistry,
    /// Fraction of the whole surface covered by liquid water.
    pub liquid_water_coverage: f64,
}

impl SurfaceConditions {
    /// Column mass (kg) of one kPa of partial pressure over the whole planet.
    pub fn kg_per_kpa(&self) -> f64 {
        if self.gravity_ms2 <= 0.0 {
            0.0
        } else {
            1000.0 * 4.0 * PI * self.radius_m * self.radius_m / self.gravity_ms2
        }
    }
}

/// What the caller wants from the atmosphere, if anything.
#[derive(Debug, Clone, PartialEq)]
pub enum AtmosphereHint {
    Unspecified,
    Pressure(f64),
    Habitable(HabitabilityRequirements),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtmosphereRequest {
    pub archetype: Archetype,
    pub chemistry: Chemistry,
    pub mass_kg: f64,
    pub radius_m: f64,
    pub temperature_estimate_k: f64,
    pub has_water: bool,
    pub hint: AtmosphereHint,
}

impl AtmosphereRequest {
    pub fn gravity_ms2(&self) -> f64 {
        GRAVITATIONAL_CONSTANT * self.mass_kg / (self.radius_m * self.radius_m)
    }

    /// Escape velocity in km/s.
    pub fn escape_velocity_kms(&self) -> f64 {
        (2.0 * GRAVITATIONAL_CONSTANT * self.mass_kg / self.radius_m).sqrt() / 1000.0
    }
}

/// Escape velocity (km/s) a body needs to keep an atmosphere at `temp_k`.
pub fn retention_threshold_kms(temp_k: f64) -> f64 {
    match temp_k {
        t if t < 50.0 => 1.0,
        t if t < 150.0 => 2.0,
        t if t < 400.0 => 5.0,
        _ => 7.0,
    }
}

/// Result of equilibrating an atmosphere against the star.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceState {
    pub average_temp_k: f64,
    pub periapsis_temp_k: f64,
    pub apoapsis_temp_k: f64,
    pub surface_albedo: f64,
    pub total_albedo: f64,
    pub ice_fraction: f64,
    /// Surface temperature over the airless equilibrium temperature.
    pub greenhouse_ratio: f64,
    pub passes: usize,
}

/// Radiative inputs that stay fixed for one equilibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiativeEnvironment {
    pub luminosity_w: f64,
    pub periapsis_m: f64,
    pub apoapsis_m: f64,
    /// Albedo of bare land.
    pub base_albedo: f64,
    pub internal_heat_k: f64,
    pub axial_tilt_rad: f64,
    pub rotation_period_s: f64,
    /// Giants have no solid surface to freeze or flood.
    pub has_surface: bool,
}

impl RadiativeEnvironment {
    pub fn temperatures(&self, albedo: f64, greenhouse: f64) -> (f64, f64) {
        let at = |d| {
            combine_internal_heat(
                equilibrium_temperature(self.luminosity_w, d, albedo) * greenhouse,
                self.internal_heat_k,
            )
        };
        (at(self.periapsis_m), at(self.apoapsis_m))
    }

    pub fn average_temperature(&self, albedo: f64, greenhouse: f64) -> f64 {
        let (peri, apo) = self.temperatures(albedo, greenhouse);
        (peri + apo) / 2.0
    }

    /// Airless equilibrium temperature averaged over the orbit.
    pub fn equilibrium_average(&self, albedo: f64) -> f64 {
        (equilibrium_temperature(self.luminosity_w, self.periapsis_m, albedo)
            + equilibrium_temperature(self.luminosity_w, self.apoapsis_m, albedo))
            / 2.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct AtmosphereSolver {
    pub config: EquilibrationConfig,
}

impl AtmosphereSolver {
    pub fn new(config: EquilibrationConfig) -> Self {
        Self { config }
    }

    /// Fabricate a starting atmosphere for a body.
    pub fn generate(&self, request: &AtmosphereRequest) -> Atmosphere {
        let temp = request.temperature_estimate_k;
        let gravity = request.gravity_ms2();
        let gravity_scale = (gravity / EARTH_GRAVITY_MS2).powi(2);

        let mut atmo = match request.archetype {
            Archetype::Asteroid | Archetype::Comet => Atmosphere::from_recipe(
                TRACE_PRESSURE_KPA,
                &[
                    (Substance::Water, 0.6),
                    (Substance::CarbonDioxide, 0.25),
                    (Substance::CarbonMonoxide, 0.15),
                ],
            ),
            _ if !self.retains_atmosphere(request) => {
                if request.mass_kg < 1e-3 * EARTH_MASS_KG || temp >= 400.0 {
                    Atmosphere::vacuum()
                } else {
                    Atmosphere::from_recipe(
                        TRACE_PRESSURE_KPA,
                        &[(Substance::Argon, 0.5), (Substance::Helium, 0.5)],
                    )
                }
            }
            Archetype::Giant => Atmosphere::from_recipe(
                self.hinted_pressure(&request.hint, 100.0),
                &[
                    (Substance::Hydrogen, 0.86),
                    (Substance::Helium, 0.136),
                    (Substance::Methane, 0.003),
                    (Substance::Ammonia, 0.001),
                ],
            ),
            Archetype::Dwarf => match &request.hint {
                AtmosphereHint::Habitable(req) => Self::breathable(req),
                hint => Atmosphere::from_recipe(
                    self.hinted_pressure(hint, 0.01),
                    &[
                        (Substance::Nitrogen, 0.9),
                        (Substance::Methane, 0.05),
                        (Substance::CarbonMonoxide, 0.05),
                    ],
                ),
            },
            Archetype::Terrestrial => match &request.hint {
                AtmosphereHint::Habitable(req) => Self::breathable(req),
                _ if temp >= 1000.0 => Atmosphere::from_recipe(
                    1e-3,
                    &[(Substance::Hydrogen, 0.7), (Substance::Helium, 0.3)],
                ),
                hint if request.has_water && temp < 400.0 => Atmosphere::from_recipe(
                    self.hinted_pressure(hint, EARTH_PRESSURE_KPA * gravity_scale),
                    &[
                        (Substance::Nitrogen, 0.95),
                        (Substance::CarbonDioxide, 0.04),
                        (Substance::Argon, 0.01),
                    ],
                ),
                hint => {
                    let default_kpa = if temp >= 400.0 { 9200.0 } else { 4.2 };
                    Atmosphere::from_recipe(
                        self.hinted_pressure(hint, default_kpa * gravity_scale),
                        &[
                            (Substance::CarbonDioxide, 0.965),
                            (Substance::Nitrogen, 0.0348),
                            (Substance::SulfurDioxide, 0.0002),
                        ],
                    )
                }
            },
        };

        atmo.refresh_derived(temp, gravity);
        debug!(
            archetype = request.archetype.as_str(),
            pressure_kpa = atmo.pressure_kpa,
            "generated atmosphere"
        );
        atmo
    }

    fn retains_atmosphere(&self, request: &AtmosphereRequest) -> bool {
        let v_esc = request.escape_velocity_kms();
        let needed = retention_threshold_kms(request.temperature_estimate_k);
        if v_esc < needed {
            warn!(
                escape_velocity_kms = v_esc,
                needed_kms = needed,
                "body too light to hold an atmosphere"
            );
            false
        } else {
            true
        }
    }

    fn hinted_pressure(&self, hint: &AtmosphereHint, default_kpa: f64) -> f64 {
        match hint {
            AtmosphereHint::Pressure(p) => p.max(0.0),
            _ => default_kpa,
        }
    }

    /// N₂/O₂ air at the log-middle of the allowed pressure range.
    fn breathable(req: &HabitabilityRequirements) -> Atmosphere {
        let pressure = (req.min_pressure_kpa.max(1e-3) * req.max_pressure_kpa).sqrt();
        let o2_kpa = (req.min_o2_kpa.max(1e-3) * req.max_o2_kpa).sqrt();
        let o2 = (o2_kpa / pressure).min(0.5);
        let co2 = TRACE_CO2_FRACTION.min(req.max_co2_kpa / pressure);
        let argon = 0.01;
        Atmosphere::from_recipe(
            pressure,
            &[
                (Substance::Oxygen, o2),
                (Substance::CarbonDioxide, co2),
                (Substance::Argon, argon),
                (Substance::Nitrogen, 1.0 - o2 - co2 - argon),
            ],
        )
    }

    /// One equilibration pass at a fixed surface temperature. Condensable
    /// species settle against their vapour-pressure curve, exchanging mass
    /// with the reservoirs. Returns the adjusted total pressure.
    pub fn equilibrate_at(
        &self,
        atmo: &mut Atmosphere,
        surface_temp_k: f64,
        reservoirs: &mut Reservoirs<'_>,
        surface: &SurfaceConditions,
    ) -> f64 {
        let kg_per_kpa = surface.kg_per_kpa();
        let mut partials = atmo.partials();

        for substance in Substance::CONDENSABLES {
            let profile = substance.profile();
            let p = partials.get(&substance).copied().unwrap_or(0.0);

            if surface_temp_k < profile.melting_point_k {
                if p > 0.0 {
                    reservoirs.deposit(substance, p * kg_per_kpa);
                    partials.remove(&substance);
                }
                continue;
            }

            let p_sat = vapor_pressure_kpa(substance, surface_temp_k);
            if p > p_sat {
                reservoirs.deposit(substance, (p - p_sat) * kg_per_kpa);
                partials.insert(substance, p_sat);
                continue;
            }

            let target = profile.humidity_target * p_sat;
            let held = reservoirs.available(substance);
            if p < target && held > 0.0 && kg_per_kpa > 0.0 {
                let wanted_kg = (target - p) * kg_per_kpa;
                let taken = reservoirs.withdraw(substance, wanted_kg.min(held * MAX_EVAPORATION_PER_PASS));
                partials.insert(substance, p + taken / kg_per_kpa);
            }
        }

        self.apply_water_chemistry(&mut partials, surface_temp_k, reservoirs, surface);

        atmo.set_partials(&partials);
        atmo.pressure_kpa
    }

    /// Water-driven chemistry: oxygen alongside open oceans on silicate worlds,
    /// and carbonate weathering pulling CO₂ down to trace once the air is humid.
    fn apply_water_chemistry(
        &self,
        partials: &mut BTreeMap<Substance, f64>,
        surface_temp_k: f64,
        reservoirs: &mut Reservoirs<'_>,
        surface: &SurfaceConditions,
    ) {
        let kg_per_kpa = surface.kg_per_kpa();
        let total: f64 = partials.values().sum();
        if total <= 0.0 {
            return;
        }

        if surface.chemistry == Chemistry::Silicate && surface.liquid_water_coverage > 0.0 {
            let target_fraction = (MAX_BREATHABLE_O2_FRACTION * surface.liquid_water_coverage
                / EARTH_WATER_COVERAGE_REF)
                .min(MAX_BREATHABLE_O2_FRACTION);
            let current = partials.get(&Substance::Oxygen).copied().unwrap_or(0.0);
            let wanted = target_fraction * total - current;
            if wanted > 0.0 {
                // carve the oxygen out of the inert background so total pressure holds
                let background = [Substance::Nitrogen, Substance::Argon];
                let available: f64 = background
                    .iter()
                    .filter_map(|s| partials.get(s))
                    .sum();
                let taken = wanted.min(available);
                if taken > 0.0 {
                    for s in background {
                        if let Some(p) = partials.get_mut(&s) {
                            *p -= taken * (*p / available);
                        }
                    }
                    *partials.entry(Substance::Oxygen).or_insert(0.0) += taken;
                }
            }
        }

        let p_water = partials.get(&Substance::Water).copied().unwrap_or(0.0);
        let humid = p_water > HUMIDITY_THRESHOLD * vapor_pressure_kpa(Substance::Water, surface_temp_k);
        if humid {
            let total: f64 = partials.values().sum();
            if let Some(p_co2) = partials.get_mut(&Substance::CarbonDioxide) {
                // cap the mole fraction of the air left after the drawdown
                let others = total - *p_co2;
                let cap = TRACE_CO2_FRACTION * others / (1.0 - TRACE_CO2_FRACTION);
                if *p_co2 > cap {
                    reservoirs.deposit(Substance::CarbonDioxide, (*p_co2 - cap) * kg_per_kpa);
                    *p_co2 = cap;
                }
            }
        }
    }

    /// Iterate `equilibrate_at` with recomputed greenhouse, albedo and
    /// temperature until the surface temperature settles.
    pub fn equilibrate(
        &self,
        atmo: &mut Atmosphere,
        reservoirs: &mut Reservoirs<'_>,
        surface: &SurfaceConditions,
        env: &RadiativeEnvironment,
    ) -> SurfaceState {
        let start = env.average_temperature(env.base_albedo, atmo.greenhouse_factor);
        self.equilibrate_from(atmo, reservoirs, surface, env, start)
    }

    /// `equilibrate` starting from a known surface temperature, typically the
    /// result of a previous equilibration of the same atmosphere.
    pub fn equilibrate_from(
        &self,
        atmo: &mut Atmosphere,
        reservoirs: &mut Reservoirs<'_>,
        surface: &SurfaceConditions,
        env: &RadiativeEnvironment,
        start_temp_k: f64,
    ) -> SurfaceState {
        let mut conditions = *surface;
        let mut albedo = env.base_albedo;
        let mut surface_albedo = env.base_albedo;
        let mut ice_fraction = 0.0;
        let mut temp = if start_temp_k.is_finite() && start_temp_k > 0.0 {
            start_temp_k
        } else {
            env.average_temperature(albedo, atmo.greenhouse_factor)
        };
        let mut computed = temp;
        let mut passes = 0;

        while passes < self.config.max_passes.max(1) {
            passes += 1;
            self.equilibrate_at(atmo, temp, reservoirs, &conditions);
            atmo.refresh_derived(temp, surface.gravity_ms2);

            let climate = self.climate_for(atmo, env, temp, surface);
            ice_fraction = if env.has_surface { climate.ice_fraction() } else { 0.0 };
            let coverage = reservoirs.hydrosphere.coverage();
            surface_albedo = surface_albedo_for(env, coverage, ice_fraction);
            albedo = total_albedo(surface_albedo, atmo.cloud_cover());
            conditions.liquid_water_coverage = liquid_coverage(coverage, ice_fraction, temp, atmo);

            computed = env.average_temperature(albedo, atmo.greenhouse_factor);
            let delta = computed - temp;
            debug!(pass = passes, temp_k = computed, delta_k = delta, "equilibration pass");
            if delta.abs() < self.config.tolerance_k {
                break;
            }
            temp += EQUILIBRATION_DAMPING * delta;
        }

        let (periapsis_temp_k, apoapsis_temp_k) = env.temperatures(albedo, atmo.greenhouse_factor);
        let bare = env.equilibrium_average(albedo);
        SurfaceState {
            average_temp_k: computed,
            periapsis_temp_k,
            apoapsis_temp_k,
            surface_albedo,
            total_albedo: albedo,
            ice_fraction,
            greenhouse_ratio: if bare > 0.0 { computed / bare } else { 1.0 },
            passes,
        }
    }

    fn climate_for(
        &self,
        atmo: &Atmosphere,
        env: &RadiativeEnvironment,
        temp: f64,
        surface: &SurfaceConditions,
    ) -> ClimateModel {
        let (peri, apo) = env.temperatures(env.base_albedo, atmo.greenhouse_factor);
        let shift = temp - (peri + apo) / 2.0;
        ClimateModel {
            periapsis_temp_k: peri + shift,
            apoapsis_temp_k: apo + shift,
            pressure_kpa: atmo.pressure_kpa,
            axial_tilt_rad: env.axial_tilt_rad,
            rotation_period_s: env.rotation_period_s,
            gravity_ms2: surface.gravity_ms2,
            air_mass_ratio: (atmo.scale_height_m > 0.0).then(|| surface.radius_m / atmo.scale_height_m),
        }
    }
}

/// Bare-surface albedo from ocean, land and ice shares.
pub fn surface_albedo_for(env: &RadiativeEnvironment, water_coverage: f64, ice_fraction: f64) -> f64 {
    if !env.has_surface {
        return env.base_albedo;
    }
    let ice = ice_fraction.clamp(0.0, 1.0);
    let water = water_coverage.clamp(0.0, 1.0);
    let open = 1.0 - ice;
    OCEAN_ALBEDO * water * open + env.base_albedo * (1.0 - water) * open + ICE_ALBEDO * ice
}

/// Blend surface and cloud albedo by cloud cover.
pub fn total_albedo(surface_albedo: f64, cloud_cover: f64) -> f64 {
    let c = cloud_cover.clamp(0.0, 1.0);
    surface_albedo * (1.0 - c) + CLOUD_ALBEDO * c
}

fn liquid_coverage(coverage: f64, ice_fraction: f64, temp: f64, atmo: &Atmosphere) -> f64 {
    let boiling = atmo.pressure_kpa > 0.0 && vapor_pressure_kpa(Substance::Water, temp) >= atmo.pressure_kpa;
    if boiling || atmo.is_vacuum() {
        0.0
    } else {
        (coverage * (1.0 - ice_fraction)).max(0.0)
    }
}
