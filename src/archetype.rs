//! Body archetypes and the per-archetype rules the builders consult.
//!
//! Everything that varies by archetype (density range, interior layout,
//! whether hydrostatic equilibrium applies, relief, bare-surface albedo and
//! internal heat) lives in one table so the builders stay branch-free.

use crate::constants::{EARTH_MASS_KG, JUPITER_MASS_KG};
use crate::material::Substance;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Archetype {
    Terrestrial = 0,
    Giant = 1,
    Dwarf = 2,
    Asteroid = 3,
    Comet = 4,
}

/// Bulk chemistry. Carbon worlds swap silicates for carbides and graphite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Chemistry {
    #[default]
    Silicate,
    Carbon,
}

impl Archetype {
    pub const COUNT: usize = 5;

    pub const ALL: [Archetype; Archetype::COUNT] = [
        Archetype::Terrestrial,
        Archetype::Giant,
        Archetype::Dwarf,
        Archetype::Asteroid,
        Archetype::Comet,
    ];

    pub fn as_index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Terrestrial => "terrestrial",
            Archetype::Giant => "giant",
            Archetype::Dwarf => "dwarf",
            Archetype::Asteroid => "asteroid",
            Archetype::Comet => "comet",
        }
    }

    pub fn rules(self) -> &'static ArchetypeRules {
        &ARCHETYPE_RULES[&self]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LayerKind {
    Core,
    Mantle,
    Crust,
    /// Gaseous outer shell of a giant.
    Envelope,
    /// Single undifferentiated shell.
    Bulk,
}

/// How a layer's share of the bulk mass is decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerShare {
    /// A fixed mass fraction.
    Fixed(f64),
    /// Solved from the bulk density by the mixing equation.
    Solved,
    /// Whatever is left after the fixed and solved layers.
    Remainder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub kind: LayerKind,
    /// Reference (compressed) density used for the mixing equation.
    pub density_kg_m3: f64,
    pub share: LayerShare,
    pub composition: Vec<(Substance, f64)>,
}

impl LayerSpec {
    fn new(kind: LayerKind, density_kg_m3: f64, share: LayerShare, composition: &[(Substance, f64)]) -> Self {
        Self {
            kind,
            density_kg_m3,
            share,
            composition: composition.to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArchetypeRules {
    pub kind: Archetype,
    pub density_range_kg_m3: (f64, f64),
    /// Hydrostatic bodies must be large enough to pull themselves round.
    pub hydrostatic: bool,
    /// Rocky minimum radius for hydrostatic equilibrium.
    pub min_radius_rocky_m: f64,
    /// Icy (density < 2000 kg/m³) minimum radius.
    pub min_radius_icy_m: f64,
    pub max_elevation_m: f64,
    /// Bare-surface albedo before ice, ocean and cloud adjustments.
    pub base_albedo: f64,
    /// Irregular bodies draw their flattening from this range.
    pub irregular_flattening: Option<(f64, f64)>,
    /// Core temperature at the reference mass (Jupiter for giants, Earth otherwise).
    pub core_temp_k: f64,
}

impl ArchetypeRules {
    /// Temperature the body's own heat flow would hold the surface at, by mass.
    pub fn internal_heat_k(&self, mass_kg: f64) -> f64 {
        let earth_masses = mass_kg / EARTH_MASS_KG;
        match self.kind {
            Archetype::Giant => 100.0 * (mass_kg / JUPITER_MASS_KG).powf(0.3),
            Archetype::Terrestrial if earth_masses >= 0.1 => 35.0 * earth_masses.powf(0.25),
            _ => 0.0,
        }
    }

    /// Core temperature of a body of `mass_kg`, never below the surface.
    pub fn core_temperature_k(&self, mass_kg: f64, surface_temp_k: f64) -> f64 {
        let reference = match self.kind {
            Archetype::Giant => JUPITER_MASS_KG,
            _ => EARTH_MASS_KG,
        };
        let scale = (mass_kg.max(0.0) / reference).powf(0.25).clamp(0.05, 3.0);
        (self.core_temp_k * scale).max(surface_temp_k)
    }

    pub fn min_radius_m(&self, density_kg_m3: f64) -> f64 {
        if !self.hydrostatic {
            0.0
        } else if density_kg_m3 < 2000.0 {
            self.min_radius_icy_m
        } else {
            self.min_radius_rocky_m
        }
    }

    pub fn clamp_density(&self, density_kg_m3: f64) -> f64 {
        density_kg_m3.clamp(self.density_range_kg_m3.0, self.density_range_kg_m3.1)
    }
}

pub static ARCHETYPE_RULES: Lazy<HashMap<Archetype, ArchetypeRules>> = Lazy::new(|| {
    use Archetype::*;
    let mut m = HashMap::new();

    m.insert(Terrestrial, ArchetypeRules {
        kind: Terrestrial,
        density_range_kg_m3: (4000.0, 6000.0),
        hydrostatic: true,
        min_radius_rocky_m: 3.0e5,
        min_radius_icy_m: 2.0e5,
        max_elevation_m: 10_000.0,
        base_albedo: 0.25,
        irregular_flattening: None,
        core_temp_k: 5400.0,
    });

    m.insert(Giant, ArchetypeRules {
        kind: Giant,
        density_range_kg_m3: (600.0, 1700.0),
        hydrostatic: true,
        min_radius_rocky_m: 3.0e5,
        min_radius_icy_m: 2.0e5,
        max_elevation_m: 0.0,
        base_albedo: 0.34,
        irregular_flattening: None,
        core_temp_k: 20_000.0,
    });

    m.insert(Dwarf, ArchetypeRules {
        kind: Dwarf,
        density_range_kg_m3: (3750.0, 6000.0),
        hydrostatic: true,
        min_radius_rocky_m: 3.0e5,
        min_radius_icy_m: 2.0e5,
        max_elevation_m: 20_000.0,
        base_albedo: 0.3,
        irregular_flattening: None,
        core_temp_k: 1500.0,
    });

    m.insert(Asteroid, ArchetypeRules {
        kind: Asteroid,
        density_range_kg_m3: (1200.0, 5300.0),
        hydrostatic: false,
        min_radius_rocky_m: 0.0,
        min_radius_icy_m: 0.0,
        max_elevation_m: 5_000.0,
        base_albedo: 0.1,
        irregular_flattening: Some((0.05, 0.35)),
        core_temp_k: 200.0,
    });

    m.insert(Comet, ArchetypeRules {
        kind: Comet,
        density_range_kg_m3: (300.0, 700.0),
        hydrostatic: false,
        min_radius_rocky_m: 0.0,
        min_radius_icy_m: 0.0,
        max_elevation_m: 2_000.0,
        base_albedo: 0.04,
        irregular_flattening: Some((0.05, 0.35)),
        core_temp_k: 100.0,
    });

    m
});

/// Interior layout for an archetype, innermost layer first.
pub fn layer_plan(archetype: Archetype, chemistry: Chemistry, density_kg_m3: f64) -> Vec<LayerSpec> {
    use LayerKind::*;
    use LayerShare::*;
    use Substance::*;

    match (archetype, chemistry) {
        (Archetype::Terrestrial | Archetype::Dwarf, Chemistry::Silicate) => vec![
            LayerSpec::new(Core, 11_000.0, Solved, &[(Iron, 0.88), (Nickel, 0.12)]),
            LayerSpec::new(Mantle, 4_500.0, Remainder, &[(Peridotite, 1.0)]),
            LayerSpec::new(Crust, 2_800.0, Fixed(0.005), &[(Basalt, 0.6), (Granite, 0.4)]),
        ],
        (Archetype::Terrestrial | Archetype::Dwarf, Chemistry::Carbon) => vec![
            LayerSpec::new(Core, 11_000.0, Solved, &[(Iron, 0.9), (Nickel, 0.1)]),
            LayerSpec::new(Mantle, 4_000.0, Remainder, &[(SiliconCarbide, 1.0)]),
            LayerSpec::new(Crust, 2_600.0, Fixed(0.005), &[(Graphite, 0.8), (Diamond, 0.2)]),
        ],
        (Archetype::Giant, _) => vec![
            LayerSpec::new(Core, 10_000.0, Fixed(0.05), &[(Iron, 0.5), (Peridotite, 0.5)]),
            LayerSpec::new(Mantle, 2_000.0, Solved, &[(MetallicHydrogen, 0.8), (Helium, 0.2)]),
            LayerSpec::new(
                Envelope,
                300.0,
                Remainder,
                &[(Hydrogen, 0.74), (Helium, 0.24), (Methane, 0.02)],
            ),
        ],
        (Archetype::Asteroid, _) => {
            let composition: &[(Substance, f64)] = if density_kg_m3 >= 4500.0 {
                &[(Iron, 0.85), (Nickel, 0.1), (Peridotite, 0.05)]
            } else if chemistry == Chemistry::Carbon || density_kg_m3 < 2500.0 {
                &[(Peridotite, 0.6), (Graphite, 0.25), (Water, 0.15)]
            } else {
                &[(Peridotite, 0.8), (Iron, 0.2)]
            };
            vec![LayerSpec::new(Bulk, density_kg_m3, Fixed(1.0), composition)]
        }
        (Archetype::Comet, _) => vec![LayerSpec::new(
            Bulk,
            density_kg_m3,
            Fixed(1.0),
            &[
                (Water, 0.4),
                (Dust, 0.4),
                (CarbonDioxide, 0.1),
                (CarbonMonoxide, 0.05),
                (Methane, 0.05),
            ],
        )],
    }
}
