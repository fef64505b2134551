//! Zonal climate: insolation by latitude and season, heat transport, ice,
//! precipitation belts and diurnal range.
//!
//! Insolation is expressed relative to the global annual mean, so a planet
//! with no atmosphere and perfect heat transport sits at its average
//! temperature everywhere.

use crate::atmosphere::insolation_factor;
use crate::constants::{
    EARTH_GRAVITY_MS2, EARTH_PRESSURE_KPA, FREEZING_POINT_K, HEAT_TRANSPORT_PRESSURE_KPA,
    LAPSE_RATE_K_PER_M, SEASON_DECLINATION_SAMPLES,
};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Mean annual temperature below which a latitude band holds permanent ice.
pub const ICE_LINE_K: f64 = FREEZING_POINT_K - 10.0;

const ZONAL_BANDS: usize = 90;
/// Bands within this many kelvin of the ice line count as partly frozen.
const ICE_LINE_SOFTNESS_K: f64 = 2.0;
const MAX_NOON_ZENITH: f64 = 85.0 * PI / 180.0;

/// Solar declination at a fraction of the year, measured from the northern spring equinox.
pub fn solar_declination(axial_tilt_rad: f64, year_fraction: f64) -> f64 {
    axial_tilt_rad * (TAU * year_fraction).sin()
}

/// Half-day length in radians of hour angle (0 for polar night, π for polar day).
pub fn sunset_hour_angle(lat: f64, declination: f64) -> f64 {
    (-lat.tan() * declination.tan()).clamp(-1.0, 1.0).acos()
}

/// Fraction of the day the sun is up.
pub fn daylight_fraction(lat: f64, declination: f64) -> f64 {
    sunset_hour_angle(lat, declination) / PI
}

/// Daily-mean top-of-atmosphere insolation relative to the global annual mean.
pub fn daily_insolation(lat: f64, declination: f64) -> f64 {
    let h0 = sunset_hour_angle(lat, declination);
    let q = 4.0 / PI
        * (h0 * lat.sin() * declination.sin() + lat.cos() * declination.cos() * h0.sin());
    q.max(0.0)
}

/// Daily insolation averaged over the orbit.
pub fn annual_insolation(lat: f64, axial_tilt_rad: f64) -> f64 {
    let n = SEASON_DECLINATION_SAMPLES;
    (0..n)
        .map(|i| daily_insolation(lat, solar_declination(axial_tilt_rad, i as f64 / n as f64)))
        .sum::<f64>()
        / n as f64
}

/// Share of absorbed heat the atmosphere spreads evenly around the globe.
pub fn heat_transport(pressure_kpa: f64) -> f64 {
    let p = pressure_kpa.max(0.0);
    p / (p + HEAT_TRANSPORT_PRESSURE_KPA)
}

/// Relative precipitation from the Hadley circulation: an ITCZ that follows the
/// sun, dry subtropics, and mid-latitude storm tracks. Peaks near 1.
pub fn precipitation_band(lat: f64, declination: f64) -> f64 {
    let deg = lat.to_degrees();
    let itcz = (-((deg - 0.4 * declination.to_degrees()) / 12.0).powi(2)).exp();
    let storm = 0.6 * (-((deg.abs() - 50.0) / 12.0).powi(2)).exp();
    let polar = 0.1 * (1.0 - lat.abs() / FRAC_PI_2);
    (itcz + storm + polar).min(1.0)
}

/// Inputs of the zonal model, captured from a stabilized planet.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateModel {
    pub periapsis_temp_k: f64,
    pub apoapsis_temp_k: f64,
    pub pressure_kpa: f64,
    pub axial_tilt_rad: f64,
    pub rotation_period_s: f64,
    pub gravity_ms2: f64,
    /// Planet radius over atmospheric scale height; `None` for airless bodies.
    pub air_mass_ratio: Option<f64>,
}

impl ClimateModel {
    pub fn average_temp_k(&self) -> f64 {
        (self.periapsis_temp_k + self.apoapsis_temp_k) / 2.0
    }

    /// Global mean temperature at a point in the year; periapsis falls at 0.
    pub fn seasonal_average_k(&self, year_fraction: f64) -> f64 {
        let swing = (self.periapsis_temp_k - self.apoapsis_temp_k) / 2.0;
        self.average_temp_k() + swing * (TAU * year_fraction).cos()
    }

    fn air_transmission(&self, lat: f64, declination: f64) -> f64 {
        let zenith = (lat - declination).abs().min(MAX_NOON_ZENITH);
        match self.air_mass_ratio {
            Some(ratio) => insolation_factor(ratio, zenith),
            None => 1.0,
        }
    }

    fn temperature_from(&self, average_k: f64, insolation: f64, transmission: f64) -> f64 {
        let h = heat_transport(self.pressure_kpa);
        average_k * (h + (1.0 - h) * insolation * transmission).max(0.0).powf(0.25)
    }

    /// Mean sea-level temperature at `lat`; `None` averages over the year.
    pub fn temperature_at(&self, lat: f64, year_fraction: Option<f64>) -> f64 {
        match year_fraction {
            Some(f) => {
                let declination = solar_declination(self.axial_tilt_rad, f);
                self.temperature_from(
                    self.seasonal_average_k(f),
                    daily_insolation(lat, declination),
                    self.air_transmission(lat, declination),
                )
            }
            None => self.temperature_from(
                self.average_temp_k(),
                annual_insolation(lat, self.axial_tilt_rad),
                self.air_transmission(lat, 0.0),
            ),
        }
    }

    /// Coldest mean temperature the equator sees over the year.
    pub fn coldest_equatorial_k(&self) -> f64 {
        self.seasonal_extreme(0.0, f64::min, f64::INFINITY)
    }

    /// Warmest mean temperature either pole sees over the year.
    pub fn hottest_polar_k(&self) -> f64 {
        let north = self.seasonal_extreme(FRAC_PI_2, f64::max, f64::NEG_INFINITY);
        let south = self.seasonal_extreme(-FRAC_PI_2, f64::max, f64::NEG_INFINITY);
        north.max(south)
    }

    /// Warmest mean temperature anywhere over the year.
    pub fn hottest_k(&self) -> f64 {
        (0..=ZONAL_BANDS)
            .map(|i| -FRAC_PI_2 + PI * i as f64 / ZONAL_BANDS as f64)
            .map(|lat| self.seasonal_extreme(lat, f64::max, f64::NEG_INFINITY))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn seasonal_extreme(&self, lat: f64, pick: fn(f64, f64) -> f64, init: f64) -> f64 {
        let n = SEASON_DECLINATION_SAMPLES;
        (0..n)
            .map(|i| self.temperature_at(lat, Some(i as f64 / n as f64)))
            .fold(init, pick)
    }

    /// Area fraction of the surface whose annual mean sits below the ice line.
    pub fn ice_fraction(&self) -> f64 {
        let band = PI / ZONAL_BANDS as f64;
        let mut iced = 0.0;
        let mut total = 0.0;
        for i in 0..ZONAL_BANDS {
            let lat = -FRAC_PI_2 + band * (i as f64 + 0.5);
            let weight = lat.cos();
            total += weight;
            let t = self.temperature_at(lat, None);
            let frozen = (0.5 + (ICE_LINE_K - t) / (2.0 * ICE_LINE_SOFTNESS_K)).clamp(0.0, 1.0);
            iced += weight * frozen;
        }
        if total > 0.0 { iced / total } else { 0.0 }
    }

    /// Half the day-night temperature swing. Slow rotation widens it, a thick
    /// atmosphere damps it.
    pub fn diurnal_half_range_k(&self, lat: f64, declination: f64) -> f64 {
        let hours = (self.rotation_period_s / 3600.0).abs().max(1e-3);
        let daylight = daylight_fraction(lat, declination);
        // polar day or night has no diurnal cycle
        let cycle = (PI * daylight).sin();
        10.0 * (hours / 24.0).sqrt() / (1.0 + self.pressure_kpa / EARTH_PRESSURE_KPA) * cycle
    }

    /// Cooling with height above sea level.
    pub fn lapse_rate_k_per_m(&self) -> f64 {
        if self.pressure_kpa <= 0.0 {
            0.0
        } else {
            LAPSE_RATE_K_PER_M * self.gravity_ms2 / EARTH_GRAVITY_MS2
        }
    }
}
