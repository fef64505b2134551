//! Habitability checks against a set of survival limits.

use crate::material::Substance;
use crate::phase_transition::supports_liquid_water;
use crate::planet::Planet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Bitset of the reasons a planet fails a set of requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UninhabitabilityReasons(pub u16);

impl UninhabitabilityReasons {
    pub const NONE: Self = Self(0);
    pub const TOO_COLD: Self = Self(1 << 0);
    pub const TOO_HOT: Self = Self(1 << 1);
    pub const LOW_PRESSURE: Self = Self(1 << 2);
    pub const HIGH_PRESSURE: Self = Self(1 << 3);
    pub const LOW_GRAVITY: Self = Self(1 << 4);
    pub const HIGH_GRAVITY: Self = Self(1 << 5);
    pub const NO_WATER: Self = Self(1 << 6);
    pub const UNBREATHABLE: Self = Self(1 << 7);
    pub const INHOSPITABLE_STAR: Self = Self(1 << 8);

    const NAMES: [(Self, &'static str); 9] = [
        (Self::TOO_COLD, "too cold"),
        (Self::TOO_HOT, "too hot"),
        (Self::LOW_PRESSURE, "low pressure"),
        (Self::HIGH_PRESSURE, "high pressure"),
        (Self::LOW_GRAVITY, "low gravity"),
        (Self::HIGH_GRAVITY, "high gravity"),
        (Self::NO_WATER, "no water"),
        (Self::UNBREATHABLE, "unbreathable"),
        (Self::INHOSPITABLE_STAR, "inhospitable star"),
    ];

    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for UninhabitabilityReasons {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for UninhabitabilityReasons {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for UninhabitabilityReasons {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for UninhabitabilityReasons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "habitable")
        } else {
            write!(f, "{}", self.names().join(", "))
        }
    }
}

/// Survival limits. Gravity is in m/s², pressures in kPa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitabilityRequirements {
    pub min_temp_k: f64,
    pub max_temp_k: f64,
    pub min_pressure_kpa: f64,
    pub max_pressure_kpa: f64,
    pub min_gravity_ms2: f64,
    pub max_gravity_ms2: f64,
    pub min_o2_kpa: f64,
    pub max_o2_kpa: f64,
    pub max_co2_kpa: f64,
    pub requires_liquid_water: bool,
    pub min_star_temp_k: f64,
    pub max_star_temp_k: f64,
}

impl HabitabilityRequirements {
    /// Unassisted human survival.
    pub fn human() -> Self {
        Self {
            min_temp_k: 250.0,
            max_temp_k: 323.0,
            min_pressure_kpa: 25.0,
            max_pressure_kpa: 1000.0,
            min_gravity_ms2: 1.0,
            max_gravity_ms2: 14.7,
            min_o2_kpa: 16.0,
            max_o2_kpa: 50.0,
            max_co2_kpa: 1.0,
            requires_liquid_water: true,
            min_star_temp_k: 3700.0,
            max_star_temp_k: 7200.0,
        }
    }
}

/// Every reason `planet` fails `requirements`; `NONE` when it passes.
pub fn is_habitable(planet: &Planet, requirements: &HabitabilityRequirements) -> UninhabitabilityReasons {
    let mut reasons = UninhabitabilityReasons::NONE;
    let climate = planet.climate();

    if climate.coldest_equatorial_k() < requirements.min_temp_k {
        reasons |= UninhabitabilityReasons::TOO_COLD;
    }
    if climate.hottest_polar_k() > requirements.max_temp_k {
        reasons |= UninhabitabilityReasons::TOO_HOT;
    }

    let pressure = planet.atmosphere.pressure_kpa;
    if pressure < requirements.min_pressure_kpa {
        reasons |= UninhabitabilityReasons::LOW_PRESSURE;
    }
    if pressure > requirements.max_pressure_kpa {
        reasons |= UninhabitabilityReasons::HIGH_PRESSURE;
    }

    let gravity = planet.surface_gravity_ms2();
    if gravity < requirements.min_gravity_ms2 {
        reasons |= UninhabitabilityReasons::LOW_GRAVITY;
    }
    if gravity > requirements.max_gravity_ms2 {
        reasons |= UninhabitabilityReasons::HIGH_GRAVITY;
    }

    // open water must exist and be stable somewhere at surface pressure
    let liquid_possible = supports_liquid_water(climate.hottest_k(), pressure);
    if requirements.requires_liquid_water && (!planet.hydrosphere.has_surface_liquid() || !liquid_possible) {
        reasons |= UninhabitabilityReasons::NO_WATER;
    }

    let o2 = planet.atmosphere.partial_pressure(Substance::Oxygen);
    let co2 = planet.atmosphere.partial_pressure(Substance::CarbonDioxide);
    if o2 < requirements.min_o2_kpa || o2 > requirements.max_o2_kpa || co2 > requirements.max_co2_kpa {
        reasons |= UninhabitabilityReasons::UNBREATHABLE;
    }

    let star = planet.star.temperature_k;
    if star < requirements.min_star_temp_k || star > requirements.max_star_temp_k {
        reasons |= UninhabitabilityReasons::INHOSPITABLE_STAR;
    }

    reasons
}
