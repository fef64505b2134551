//! Phase state of volatiles at a surface temperature and pressure.

use crate::constants::{EARTH_PRESSURE_KPA, GAS_CONSTANT};
use crate::material::Substance;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MaterialPhase {
    Solid = 0,
    Liquid = 1,
    Gas = 2,
}

/// Saturation vapour pressure (kPa) from the Clausius–Clapeyron relation,
/// anchored at the one-atmosphere boiling point.
pub fn vapor_pressure_kpa(substance: Substance, temp_k: f64) -> f64 {
    let profile = substance.profile();
    if temp_k <= 0.0 || profile.boiling_point_k <= 0.0 {
        return 0.0;
    }
    let exponent = -(profile.latent_heat_j_kg * profile.molar_mass_kg_mol / GAS_CONSTANT)
        * (1.0 / temp_k - 1.0 / profile.boiling_point_k);
    EARTH_PRESSURE_KPA * exponent.exp()
}

/// Phase of a substance held at `temp_k` under an ambient pressure of `pressure_kpa`.
pub fn phase_at(substance: Substance, temp_k: f64, pressure_kpa: f64) -> MaterialPhase {
    let profile = substance.profile();
    if temp_k < profile.melting_point_k {
        MaterialPhase::Solid
    } else if vapor_pressure_kpa(substance, temp_k) >= pressure_kpa {
        MaterialPhase::Gas
    } else {
        MaterialPhase::Liquid
    }
}

/// True when liquid water can persist on a surface at this temperature and pressure.
pub fn supports_liquid_water(temp_k: f64, pressure_kpa: f64) -> bool {
    phase_at(Substance::Water, temp_k, pressure_kpa) == MaterialPhase::Liquid
}
