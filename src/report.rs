//! Terminal summary of a synthesized planet.

use crate::synthesizer::SynthesisResult;
use crate::constants::AU_M;
use crate::temp_utils::{flux_at, kelvin_to_celsius};
use colored::Colorize;
use std::fmt::Write;

pub fn format_report(result: &SynthesisResult) -> String {
    let planet = &result.planet;
    let report = &result.report;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} ({}, {:?}, seed {})",
        planet.name.bold(),
        planet.archetype.as_str(),
        planet.chemistry,
        planet.seed
    );

    let status = if report.is_approximate() {
        format!("approximate after {} passes", report.passes).yellow()
    } else {
        format!("converged in {} passes", report.passes).green()
    };
    let _ = writeln!(
        out,
        "  convergence: {} ({}, {} free), |delta| {:.2} K -> {:.2} K",
        status,
        report.governing.as_str(),
        report.free_parameter.as_str(),
        report.first_delta_k.abs(),
        report.final_delta_k.abs()
    );

    let _ = writeln!(
        out,
        "  body: mass {:.3e} kg, radius {:.0} km, density {:.0} kg/m³, gravity {:.2} m/s², flattening {:.4}",
        planet.mass_kg,
        planet.radius_m() / 1000.0,
        planet.density_kg_m3,
        planet.surface_gravity_ms2(),
        planet.shape.flattening
    );
    for layer in &planet.layers {
        let _ = writeln!(
            out,
            "    {:<9} {:>7.0}-{:<7.0} km  {:>6.0} kg/m³  {:>6.0} K",
            format!("{:?}", layer.kind),
            layer.inner_radius_m / 1000.0,
            layer.outer_radius_m / 1000.0,
            layer.density_kg_m3,
            layer.temperature_k
        );
    }

    if let Some(orbit) = planet.orbit {
        let _ = writeln!(
            out,
            "  orbit: a = {:.3} AU, e = {:.4}, period {:.1} d, insolation {:.0} W/m²",
            orbit.semi_major_axis_m / AU_M,
            orbit.eccentricity,
            orbit.period_s / 86_400.0,
            flux_at(planet.star.luminosity_w, orbit.semi_major_axis_m)
        );
    }

    let _ = writeln!(
        out,
        "  temperature: {:.1} K ({:.1} °C), periapsis {:.1} K, apoapsis {:.1} K",
        planet.average_temp_k(),
        kelvin_to_celsius(planet.average_temp_k()),
        planet.periapsis_temp_k,
        planet.apoapsis_temp_k
    );
    let _ = writeln!(
        out,
        "  albedo: surface {:.3}, total {:.3}, ice {:.1}%",
        planet.surface_albedo,
        planet.total_albedo,
        planet.ice_fraction * 100.0
    );

    if planet.atmosphere.is_vacuum() {
        let _ = writeln!(out, "  atmosphere: {}", "vacuum".dimmed());
    } else {
        let _ = writeln!(
            out,
            "  atmosphere: {:.2} kPa, greenhouse x{:.3}, scale height {:.1} km",
            planet.atmosphere.pressure_kpa,
            planet.atmosphere.greenhouse_factor,
            planet.atmosphere.scale_height_m / 1000.0
        );
        let mut gases: Vec<_> = planet.atmosphere.composition.iter().collect();
        gases.sort_by(|a, b| b.1.total_cmp(a.1));
        for (substance, fraction) in gases.into_iter().filter(|(_, f)| **f >= 1e-5) {
            let _ = writeln!(out, "    {:<16} {:>8.4}%", substance.as_str(), fraction * 100.0);
        }
    }

    let hydro = &planet.hydrosphere;
    if hydro.is_dry() {
        let _ = writeln!(out, "  hydrosphere: {} (sea level {:.0} m)", "dry".dimmed(), hydro.sea_level_m);
    } else {
        let _ = writeln!(
            out,
            "  hydrosphere: {:.3e} kg, coverage {:.1}%, sea level {:.0} m, {} layer(s)",
            hydro.mass_kg,
            hydro.coverage() * 100.0,
            hydro.sea_level_m,
            hydro.layers.len()
        );
    }

    let habitability = if result.reasons.is_empty() {
        result.reasons.to_string().green()
    } else {
        result.reasons.to_string().red()
    };
    let _ = writeln!(out, "  habitability: {}", habitability);
    out
}

pub fn print_report(result: &SynthesisResult) {
    print!("{}", format_report(result));
}
