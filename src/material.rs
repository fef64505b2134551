// src/material.rs - Substances with the physical properties the synthesizer needs

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Substance {
    // volatiles
    Water = 0,
    Methane = 1,
    CarbonMonoxide = 2,
    CarbonDioxide = 3,
    Nitrogen = 4,
    Oxygen = 5,
    SulfurDioxide = 6,
    Hydrogen = 7,
    Helium = 8,
    Argon = 9,
    Ammonia = 10,
    // solids
    Iron = 11,
    Nickel = 12,
    Peridotite = 13,
    Basalt = 14,
    Granite = 15,
    Graphite = 16,
    Diamond = 17,
    SiliconCarbide = 18,
    MetallicHydrogen = 19,
    Dust = 20,
}

impl Substance {
    pub const COUNT: usize = 21;

    pub const ALL: [Substance; Substance::COUNT] = [
        Substance::Water,
        Substance::Methane,
        Substance::CarbonMonoxide,
        Substance::CarbonDioxide,
        Substance::Nitrogen,
        Substance::Oxygen,
        Substance::SulfurDioxide,
        Substance::Hydrogen,
        Substance::Helium,
        Substance::Argon,
        Substance::Ammonia,
        Substance::Iron,
        Substance::Nickel,
        Substance::Peridotite,
        Substance::Basalt,
        Substance::Granite,
        Substance::Graphite,
        Substance::Diamond,
        Substance::SiliconCarbide,
        Substance::MetallicHydrogen,
        Substance::Dust,
    ];

    /// Species that can condense out of an atmosphere onto the surface.
    pub const CONDENSABLES: [Substance; 7] = [
        Substance::Water,
        Substance::Methane,
        Substance::CarbonMonoxide,
        Substance::CarbonDioxide,
        Substance::Nitrogen,
        Substance::Oxygen,
        Substance::SulfurDioxide,
    ];

    pub fn as_index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        get_profile_fast(self).name
    }

    pub fn is_condensable(self) -> bool {
        Self::CONDENSABLES.contains(&self)
    }

    pub fn profile(self) -> &'static SubstanceProfile {
        get_profile_fast(&self)
    }
}

#[derive(Debug, Clone)]
pub struct SubstanceProfile {
    pub kind: Substance,
    pub name: &'static str,
    pub formula: &'static str,
    pub molar_mass_kg_mol: f64,
    /// Condensed-phase density at surface conditions.
    pub density_kg_m3: f64,
    pub melting_point_k: f64,
    /// Boiling (or sublimation) point at one atmosphere.
    pub boiling_point_k: f64,
    /// Latent heat of vaporization (or sublimation) used for vapour pressure.
    pub latent_heat_j_kg: f64,
    /// Optical-depth weight per √kPa of partial pressure; zero for transparent gases.
    pub greenhouse_coefficient: f64,
    /// Fraction of saturation that evaporation drives the partial pressure toward.
    pub humidity_target: f64,
}

pub static SUBSTANCE_PROFILES: Lazy<HashMap<Substance, SubstanceProfile>> = Lazy::new(|| {
    use Substance::*;
    let mut m = HashMap::new();

    let mut add = |kind, name, formula, molar_mass, density, melt, boil, latent, greenhouse, humidity| {
        m.insert(kind, SubstanceProfile {
            kind,
            name,
            formula,
            molar_mass_kg_mol: molar_mass,
            density_kg_m3: density,
            melting_point_k: melt,
            boiling_point_k: boil,
            latent_heat_j_kg: latent,
            greenhouse_coefficient: greenhouse,
            humidity_target: humidity,
        });
    };

    add(Water, "water", "H2O", 0.018015, 1000.0, 273.15, 373.15, 2.26e6, 0.55, 0.5);
    add(Methane, "methane", "CH4", 0.01604, 422.0, 90.7, 111.7, 5.1e5, 0.3, 0.5);
    add(CarbonMonoxide, "carbon monoxide", "CO", 0.02801, 789.0, 68.1, 81.6, 2.16e5, 0.0, 0.5);
    // CO2 sublimates at one atmosphere; the triple point stands in for melting
    add(CarbonDioxide, "carbon dioxide", "CO2", 0.04401, 1562.0, 216.6, 194.7, 5.71e5, 1.2, 0.5);
    add(Nitrogen, "nitrogen", "N2", 0.028014, 808.0, 63.15, 77.36, 1.99e5, 0.0, 0.5);
    add(Oxygen, "oxygen", "O2", 0.031998, 1141.0, 54.36, 90.19, 2.13e5, 0.0, 0.5);
    add(SulfurDioxide, "sulfur dioxide", "SO2", 0.064066, 1460.0, 197.7, 263.1, 3.9e5, 0.4, 0.5);
    add(Hydrogen, "hydrogen", "H2", 0.002016, 71.0, 14.0, 20.3, 4.5e5, 0.02, 0.0);
    add(Helium, "helium", "He", 0.004003, 125.0, 0.95, 4.22, 2.1e4, 0.0, 0.0);
    add(Argon, "argon", "Ar", 0.039948, 1395.0, 83.8, 87.3, 1.61e5, 0.0, 0.0);
    add(Ammonia, "ammonia", "NH3", 0.017031, 682.0, 195.4, 239.8, 1.37e6, 0.35, 0.0);

    add(Iron, "iron", "Fe", 0.055845, 7874.0, 1811.0, 3134.0, 6.09e6, 0.0, 0.0);
    add(Nickel, "nickel", "Ni", 0.058693, 8908.0, 1728.0, 3186.0, 6.4e6, 0.0, 0.0);
    add(Peridotite, "peridotite", "(Mg,Fe)2SiO4", 0.1407, 3300.0, 1400.0, 3000.0, 5.0e6, 0.0, 0.0);
    add(Basalt, "basalt", "basalt", 0.1, 2900.0, 1350.0, 2900.0, 5.0e6, 0.0, 0.0);
    add(Granite, "granite", "granite", 0.1, 2700.0, 1215.0, 2800.0, 5.0e6, 0.0, 0.0);
    add(Graphite, "graphite", "C", 0.012011, 2260.0, 3900.0, 4100.0, 5.98e7, 0.0, 0.0);
    add(Diamond, "diamond", "C", 0.012011, 3510.0, 3823.0, 4100.0, 5.98e7, 0.0, 0.0);
    add(SiliconCarbide, "silicon carbide", "SiC", 0.0401, 3210.0, 3003.0, 3100.0, 1.5e7, 0.0, 0.0);
    add(MetallicHydrogen, "metallic hydrogen", "H", 0.001008, 1000.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    add(Dust, "dust", "dust", 0.1, 2500.0, 1400.0, 3000.0, 5.0e6, 0.0, 0.0);

    m
});

/// Flat lookup indexed by `Substance::as_index`.
pub static PROFILE_LOOKUP_TABLE: Lazy<Vec<&'static SubstanceProfile>> = Lazy::new(|| {
    Substance::ALL
        .iter()
        .map(|s| &SUBSTANCE_PROFILES[s])
        .collect()
});

pub fn get_profile(kind: Substance) -> Option<&'static SubstanceProfile> {
    SUBSTANCE_PROFILES.get(&kind)
}

pub fn get_profile_fast(kind: &Substance) -> &'static SubstanceProfile {
    PROFILE_LOOKUP_TABLE[kind.as_index()]
}
