use more_asserts::{assert_ge, assert_gt, assert_le, assert_lt};
use planet_synth_rust::assert_deviation;
use planet_synth_rust::archetype::Archetype;
use planet_synth_rust::constants::{AU_M, NO_WATER_SEA_LEVEL_FACTOR};
use planet_synth_rust::convergence::FreeParameter;
use planet_synth_rust::habitability::UninhabitabilityReasons;
use planet_synth_rust::orbit::KeplerOrbit;
use planet_synth_rust::report::format_report;
use planet_synth_rust::{PlanetParams, PlanetSynthesizer};

fn synthesizer() -> PlanetSynthesizer {
    PlanetSynthesizer::default()
}

#[test]
fn test_earthlike_converges_and_is_habitable() {
    let result = synthesizer().synthesize_standalone(&PlanetParams::earthlike());
    println!("{}", format_report(&result));

    let report = &result.report;
    println!(
        "🌍 passes {} first delta {:.2} K final delta {:.2} K",
        report.passes, report.first_delta_k, report.final_delta_k
    );
    assert!(report.converged, "earthlike did not converge: {:?}", report.trace);
    assert_le!((result.planet.average_temp_k() - 289.0).abs(), 0.5);
    assert_eq!(result.reasons, UninhabitabilityReasons::NONE, "reasons: {}", result.reasons);

    let a_au = result.planet.semi_major_axis_m().unwrap() / AU_M;
    println!("   distance {:.3} AU, pressure {:.1} kPa", a_au, result.planet.atmosphere.pressure_kpa);
    assert_gt!(a_au, 0.7);
    assert_lt!(a_au, 1.4);
    assert_deviation!(result.planet.surface_gravity_ms2(), 9.8, 1.0);
    assert!(result.planet.atmosphere.is_closed());
}

#[test]
fn test_layer_masses_sum_to_planet_mass() {
    for archetype in Archetype::ALL {
        let params = PlanetParams {
            archetype: Some(archetype),
            seed: Some(5),
            ..PlanetParams::default()
        };
        let planet = synthesizer().synthesize_standalone(&params).planet;
        let layer_mass: f64 = planet.layers.iter().map(|l| l.mass_kg).sum();
        let rel = (layer_mass - planet.mass_kg).abs() / planet.mass_kg;
        println!("🪨 {:<12} {} layers, relative mass error {:.2e}", archetype.as_str(), planet.layers.len(), rel);
        assert_le!(rel, 1e-6);
    }
}

#[test]
fn test_final_delta_no_worse_than_first_for_most_seeds() {
    let seeds = 20;
    let mut monotone = 0;
    for seed in 0..seeds {
        let params = PlanetParams {
            seed: Some(seed),
            average_temp_k: Some(240.0 + 5.0 * seed as f64),
            ..PlanetParams::default()
        };
        let report = synthesizer().synthesize_standalone(&params).report;
        if report.final_delta_k.abs() <= report.first_delta_k.abs() {
            monotone += 1;
        }
        println!(
            "🌡️ seed {:>2}: {} passes, |delta| {:.2} -> {:.2}",
            seed,
            report.passes,
            report.first_delta_k.abs(),
            report.final_delta_k.abs()
        );
    }
    assert_ge!(monotone as f64 / seeds as f64, 0.9);
}

#[test]
fn test_dry_terrestrial_has_no_hydrosphere() {
    let params = PlanetParams {
        water_coverage: Some(0.0),
        average_temp_k: Some(280.0),
        seed: Some(9),
        ..PlanetParams::default()
    };
    let planet = synthesizer().synthesize_standalone(&params).planet;
    println!("🏜️ sea level {:.0} m, max elevation {:.0} m", planet.hydrosphere.sea_level_m, planet.max_elevation_m());
    assert_eq!(planet.hydrosphere.mass_kg, 0.0);
    assert!(planet.hydrosphere.layers.is_empty());
    assert_eq!(planet.hydrosphere.sea_level_m, NO_WATER_SEA_LEVEL_FACTOR * planet.max_elevation_m());
}

#[test]
fn test_hotter_target_moves_planet_inward() {
    let base = PlanetParams::earthlike();
    let hotter = PlanetParams {
        average_temp_k: Some(339.0),
        ..PlanetParams::earthlike()
    };

    let mut near_orbit = KeplerOrbit::new(0.0167, base.resolve().star.mass_kg);
    let mut far_orbit = near_orbit.clone();
    let cool = synthesizer().synthesize(&base, &mut far_orbit);
    let warm = synthesizer().synthesize(&hotter, &mut near_orbit);

    let a_cool = cool.planet.semi_major_axis_m().unwrap();
    let a_warm = warm.planet.semi_major_axis_m().unwrap();
    println!("🔭 289 K at {:.3} AU, 339 K at {:.3} AU", a_cool / AU_M, a_warm / AU_M);
    assert_lt!(a_warm, a_cool);
    assert_gt!(near_orbit.recomputations, 0);
}

#[test]
fn test_hotter_target_darkens_pinned_planet() {
    let pinned = |temp: f64| PlanetParams {
        semi_major_axis_m: Some(AU_M),
        water_coverage: Some(0.0),
        surface_pressure_kpa: Some(1.0),
        average_temp_k: Some(temp),
        seed: Some(21),
        ..PlanetParams::default()
    };

    let cold = synthesizer().synthesize_standalone(&pinned(240.0));
    let warm = synthesizer().synthesize_standalone(&pinned(290.0));
    println!(
        "🪞 albedo {:.3} for 240 K, {:.3} for 290 K",
        cold.report.parameter, warm.report.parameter
    );
    assert_eq!(cold.report.free_parameter, FreeParameter::Albedo);
    assert_eq!(warm.report.free_parameter, FreeParameter::Albedo);
    assert_lt!(warm.report.parameter, cold.report.parameter);
    assert_eq!(cold.planet.semi_major_axis_m(), warm.planet.semi_major_axis_m());
}

#[test]
fn test_airless_body_reports_vacuum() {
    let params = PlanetParams {
        archetype: Some(Archetype::Asteroid),
        semi_major_axis_m: Some(2.5 * AU_M),
        seed: Some(1),
        ..PlanetParams::default()
    };
    let result = synthesizer().synthesize_standalone(&params);
    println!("☄️ asteroid pressure {:.2e} kPa", result.planet.atmosphere.pressure_kpa);
    assert!(result.report.converged);
    assert_lt!(result.planet.atmosphere.pressure_kpa, 1e-3);
    assert_eq!(result.report.passes, 1);
}
