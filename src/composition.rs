//! Bulk composition: size, density, interior layers, shape and thermal profile.
//!
//! One size dimension is authoritative (mass, radius or surface gravity) and
//! the others are derived through the bulk density. Layer shares come from
//! the archetype's layer plan; a share solved from the bulk density can come
//! out non-positive, in which case that layer is dropped and its share is
//! spread over the survivors so no mass is lost.

use crate::archetype::{Archetype, Chemistry, LayerKind, LayerShare, LayerSpec, layer_plan};
use crate::constants::GRAVITATIONAL_CONSTANT;
use crate::material::Substance;
use crate::math_utils::{lerp, shell_volume, sphere_volume};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use tracing::{debug, warn};

/// Rotational flattening never exceeds this; faster spinners would break up.
const MAX_ROTATIONAL_FLATTENING: f64 = 0.5;
const MIN_RADIUS_M: f64 = 1.0;

/// The one size dimension the caller cares about.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SizeTarget {
    Mass(f64),
    Radius(f64),
    Gravity(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionRequest {
    pub archetype: Archetype,
    pub chemistry: Chemistry,
    pub size: SizeTarget,
    pub density_hint_kg_m3: Option<f64>,
    pub rotation_period_s: f64,
    /// Starting surface temperature for the thermal profile.
    pub surface_temp_k: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLayer {
    pub kind: LayerKind,
    pub mass_kg: f64,
    pub density_kg_m3: f64,
    pub inner_radius_m: f64,
    pub outer_radius_m: f64,
    /// Substance mass fractions.
    pub composition: Vec<(Substance, f64)>,
    pub temperature_k: f64,
}

impl MaterialLayer {
    pub fn thickness_m(&self) -> f64 {
        self.outer_radius_m - self.inner_radius_m
    }

    pub fn volume_m3(&self) -> f64 {
        shell_volume(self.inner_radius_m, self.outer_radius_m)
    }
}

/// Oblate spheroid with the volume of a sphere of `mean_radius_m`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub mean_radius_m: f64,
    pub flattening: f64,
}

impl Shape {
    pub fn sphere(radius_m: f64) -> Self {
        Self {
            mean_radius_m: radius_m,
            flattening: 0.0,
        }
    }

    pub fn equatorial_radius_m(&self) -> f64 {
        self.mean_radius_m / (1.0 - self.flattening).cbrt()
    }

    pub fn polar_radius_m(&self) -> f64 {
        self.equatorial_radius_m() * (1.0 - self.flattening)
    }

    pub fn volume_m3(&self) -> f64 {
        sphere_volume(self.mean_radius_m)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub archetype: Archetype,
    pub chemistry: Chemistry,
    pub mass_kg: f64,
    pub density_kg_m3: f64,
    pub shape: Shape,
    /// Innermost first.
    pub layers: Vec<MaterialLayer>,
}

impl Composition {
    pub fn radius_m(&self) -> f64 {
        self.shape.mean_radius_m
    }

    pub fn surface_gravity_ms2(&self) -> f64 {
        gravity_at(self.mass_kg, self.radius_m())
    }

    pub fn layer_mass_kg(&self) -> f64 {
        self.layers.iter().map(|l| l.mass_kg).sum()
    }

    pub fn layer(&self, kind: LayerKind) -> Option<&MaterialLayer> {
        self.layers.iter().find(|l| l.kind == kind)
    }

    /// Re-run the thermal profile for a new surface temperature.
    pub fn set_surface_temperature(&mut self, surface_temp_k: f64) {
        apply_thermal_profile(self.archetype, self.mass_kg, surface_temp_k, &mut self.layers);
    }
}

pub fn gravity_at(mass_kg: f64, radius_m: f64) -> f64 {
    if radius_m <= 0.0 {
        0.0
    } else {
        GRAVITATIONAL_CONSTANT * mass_kg / (radius_m * radius_m)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompositionBuilder;

impl CompositionBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, request: &CompositionRequest) -> Composition {
        let rules = request.archetype.rules();
        let mut rng = ChaCha8Rng::seed_from_u64(request.seed);

        let density = match request.density_hint_kg_m3 {
            Some(hint) if hint.is_finite() && hint > 0.0 => {
                let clamped = rules.clamp_density(hint);
                if clamped != hint {
                    warn!(
                        archetype = request.archetype.as_str(),
                        requested = hint,
                        clamped,
                        "density outside archetype range"
                    );
                }
                clamped
            }
            _ => {
                let (lo, hi) = rules.density_range_kg_m3;
                rng.random_range(lo..=hi)
            }
        };

        let (mass_kg, radius_m) = self.resolve_size(request, density);

        let shape = match rules.irregular_flattening {
            Some((lo, hi)) => Shape {
                mean_radius_m: radius_m,
                flattening: rng.random_range(lo..=hi),
            },
            None => Shape {
                mean_radius_m: radius_m,
                flattening: rotational_flattening(mass_kg, radius_m, request.rotation_period_s),
            },
        };

        let plan = layer_plan(request.archetype, request.chemistry, density);
        let mut layers = split_layers(&plan, mass_kg, density, radius_m);
        apply_thermal_profile(request.archetype, mass_kg, request.surface_temp_k, &mut layers);

        debug!(
            archetype = request.archetype.as_str(),
            mass_kg,
            radius_m,
            density,
            layers = layers.len(),
            "built composition"
        );

        Composition {
            archetype: request.archetype,
            chemistry: request.chemistry,
            mass_kg,
            density_kg_m3: density,
            shape,
            layers,
        }
    }

    /// Mass and radius from the authoritative size target, clamped to the
    /// hydrostatic minimum.
    fn resolve_size(&self, request: &CompositionRequest, density: f64) -> (f64, f64) {
        let rules = request.archetype.rules();
        let radius_for_mass = |m: f64| (3.0 * m / (4.0 * PI * density)).cbrt();

        let radius = match request.size {
            SizeTarget::Mass(m) => radius_for_mass(m.max(0.0)),
            SizeTarget::Radius(r) => r,
            SizeTarget::Gravity(g) => 3.0 * g.max(0.0) / (4.0 * PI * GRAVITATIONAL_CONSTANT * density),
        };

        let min_radius = rules.min_radius_m(density).max(MIN_RADIUS_M);
        if !(radius >= min_radius) {
            warn!(
                archetype = request.archetype.as_str(),
                requested_radius_m = radius,
                min_radius_m = min_radius,
                "radius below hydrostatic minimum; clamping"
            );
            return (density * sphere_volume(min_radius), min_radius);
        }

        match request.size {
            SizeTarget::Mass(m) => (m, radius),
            _ => (density * sphere_volume(radius), radius),
        }
    }
}

/// Maclaurin flattening `5/4 · ω²r³/(GM)`.
pub fn rotational_flattening(mass_kg: f64, radius_m: f64, rotation_period_s: f64) -> f64 {
    if rotation_period_s <= 0.0 || mass_kg <= 0.0 {
        return 0.0;
    }
    let omega = TAU / rotation_period_s;
    let f = 1.25 * omega * omega * radius_m.powi(3) / (GRAVITATIONAL_CONSTANT * mass_kg);
    f.clamp(0.0, MAX_ROTATIONAL_FLATTENING)
}

/// Mass shares for a plan. A `Solved` layer takes whatever share makes the
/// mixed density match `bulk_density`.
fn layer_shares(plan: &[LayerSpec], bulk_density: f64) -> Vec<f64> {
    let fixed: f64 = plan
        .iter()
        .filter_map(|l| match l.share {
            LayerShare::Fixed(f) => Some(f),
            _ => None,
        })
        .sum();
    let fixed_volume: f64 = plan
        .iter()
        .filter_map(|l| match l.share {
            LayerShare::Fixed(f) => Some(f / l.density_kg_m3),
            _ => None,
        })
        .sum();

    let solved = plan.iter().find(|l| l.share == LayerShare::Solved);
    let remainder = plan.iter().find(|l| l.share == LayerShare::Remainder);
    let open = 1.0 - fixed;

    let solved_share = match (solved, remainder) {
        (Some(s), Some(r)) => {
            let denom = 1.0 / s.density_kg_m3 - 1.0 / r.density_kg_m3;
            if denom.abs() < f64::EPSILON {
                open / 2.0
            } else {
                (1.0 / bulk_density - fixed_volume - open / r.density_kg_m3) / denom
            }
        }
        (Some(_), None) => open,
        _ => 0.0,
    };

    plan.iter()
        .map(|l| match l.share {
            LayerShare::Fixed(f) => f,
            LayerShare::Solved => solved_share,
            LayerShare::Remainder => {
                if solved.is_some() {
                    open - solved_share
                } else {
                    open
                }
            }
        })
        .collect()
}

/// Distribute `mass_kg` over the plan and stack the shells out to `radius_m`.
fn split_layers(plan: &[LayerSpec], mass_kg: f64, bulk_density: f64, radius_m: f64) -> Vec<MaterialLayer> {
    let shares = layer_shares(plan, bulk_density);

    let mut kept: Vec<(&LayerSpec, f64)> = Vec::with_capacity(plan.len());
    for (spec, share) in plan.iter().zip(shares) {
        if share > 0.0 && share.is_finite() {
            kept.push((spec, share));
        } else {
            debug!(layer = ?spec.kind, share, "dropping layer with non-positive share");
        }
    }

    if kept.is_empty() {
        return vec![MaterialLayer {
            kind: LayerKind::Bulk,
            mass_kg,
            density_kg_m3: bulk_density,
            inner_radius_m: 0.0,
            outer_radius_m: radius_m,
            composition: plan.first().map(|l| l.composition.clone()).unwrap_or_default(),
            temperature_k: 0.0,
        }];
    }

    // survivors keep their relative proportions
    let total_share: f64 = kept.iter().map(|(_, s)| s).sum();
    let masses: Vec<f64> = kept.iter().map(|(_, s)| mass_kg * s / total_share).collect();

    // reference volumes, scaled so the stack fills the planet exactly
    let reference_volume: f64 = kept
        .iter()
        .zip(&masses)
        .map(|((spec, _), m)| m / spec.density_kg_m3)
        .sum();
    let scale = if reference_volume > 0.0 {
        sphere_volume(radius_m) / reference_volume
    } else {
        1.0
    };

    let last = kept.len() - 1;
    let mut inner = 0.0;
    let mut cumulative_volume = 0.0;
    kept.iter()
        .zip(masses)
        .enumerate()
        .map(|(i, ((spec, _), mass))| {
            let volume = mass / spec.density_kg_m3 * scale;
            cumulative_volume += volume;
            let outer = if i == last {
                radius_m
            } else {
                (3.0 * cumulative_volume / (4.0 * PI)).cbrt()
            };
            let layer = MaterialLayer {
                kind: spec.kind,
                mass_kg: mass,
                density_kg_m3: if volume > 0.0 { mass / volume } else { spec.density_kg_m3 },
                inner_radius_m: inner,
                outer_radius_m: outer,
                composition: spec.composition.clone(),
                temperature_k: 0.0,
            };
            inner = outer;
            layer
        })
        .collect()
}

/// Core at the archetype's mass-scaled core temperature, outermost layer at
/// the surface, anything between interpolated by mid-shell radius.
fn apply_thermal_profile(archetype: Archetype, mass_kg: f64, surface_temp_k: f64, layers: &mut [MaterialLayer]) {
    let core = archetype.rules().core_temperature_k(mass_kg, surface_temp_k);
    let radius = layers.last().map(|l| l.outer_radius_m).unwrap_or(0.0);
    let n = layers.len();
    for (i, layer) in layers.iter_mut().enumerate() {
        layer.temperature_k = if i + 1 == n {
            surface_temp_k
        } else if i == 0 {
            core
        } else {
            let mid = (layer.inner_radius_m + layer.outer_radius_m) / 2.0;
            lerp(core, surface_temp_k, if radius > 0.0 { mid / radius } else { 1.0 })
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{EARTH_MASS_KG, EARTH_RADIUS_M, EARTH_ROTATION_S, JUPITER_MASS_KG};
    use approx::assert_abs_diff_eq;
    use more_asserts::{assert_ge, assert_gt, assert_lt};

    fn request(archetype: Archetype, size: SizeTarget) -> CompositionRequest {
        CompositionRequest {
            archetype,
            chemistry: Chemistry::Silicate,
            size,
            density_hint_kg_m3: None,
            rotation_period_s: EARTH_ROTATION_S,
            surface_temp_k: 288.0,
            seed: 7,
        }
    }

    fn assert_mass_conserved(c: &Composition) {
        let relative = (c.layer_mass_kg() - c.mass_kg).abs() / c.mass_kg;
        assert_lt!(relative, 1e-6, "layers {} vs bulk {}", c.layer_mass_kg(), c.mass_kg);
    }

    fn assert_radii_increase(c: &Composition) {
        let mut previous = 0.0;
        for layer in &c.layers {
            assert_abs_diff_eq!(layer.inner_radius_m, previous, epsilon = 1e-6);
            assert_gt!(layer.outer_radius_m, layer.inner_radius_m);
            previous = layer.outer_radius_m;
        }
        assert_abs_diff_eq!(previous, c.radius_m(), epsilon = 1e-6);
    }

    #[test]
    fn test_earth_core_share() {
        let mut req = request(Archetype::Terrestrial, SizeTarget::Mass(EARTH_MASS_KG));
        req.density_hint_kg_m3 = Some(5514.0);
        let c = CompositionBuilder::new().build(&req);

        assert_abs_diff_eq!(c.radius_m(), EARTH_RADIUS_M, epsilon = 20_000.0);
        let core = c.layer(LayerKind::Core).unwrap();
        let share = core.mass_kg / c.mass_kg;
        assert_gt!(share, 0.25);
        assert_lt!(share, 0.4);
        assert_mass_conserved(&c);
        assert_radii_increase(&c);
        assert_gt!(core.temperature_k, 5000.0);
        assert_eq!(c.layers.last().unwrap().temperature_k, 288.0);
    }

    #[test]
    fn test_light_terrestrial_drops_core() {
        let mut req = request(Archetype::Terrestrial, SizeTarget::Mass(EARTH_MASS_KG));
        req.density_hint_kg_m3 = Some(4000.0);
        let c = CompositionBuilder::new().build(&req);
        assert!(c.layer(LayerKind::Core).is_none());
        assert_eq!(c.layers.len(), 2);
        assert_mass_conserved(&c);
        assert_radii_increase(&c);
    }

    #[test]
    fn test_mass_conserved_across_archetypes_and_seeds() {
        let sizes = [
            (Archetype::Terrestrial, SizeTarget::Mass(EARTH_MASS_KG)),
            (Archetype::Giant, SizeTarget::Mass(JUPITER_MASS_KG)),
            (Archetype::Dwarf, SizeTarget::Radius(6.0e5)),
            (Archetype::Asteroid, SizeTarget::Radius(5.0e4)),
            (Archetype::Comet, SizeTarget::Radius(5.0e3)),
        ];
        for (archetype, size) in sizes {
            for chemistry in [Chemistry::Silicate, Chemistry::Carbon] {
                for seed in 0..10 {
                    let req = CompositionRequest {
                        chemistry,
                        seed,
                        ..request(archetype, size)
                    };
                    let c = CompositionBuilder::new().build(&req);
                    let (lo, hi) = archetype.rules().density_range_kg_m3;
                    assert!(c.density_kg_m3 >= lo && c.density_kg_m3 <= hi);
                    assert_mass_conserved(&c);
                    assert_radii_increase(&c);
                    let implied = c.density_kg_m3 * c.shape.volume_m3();
                    assert_lt!((implied - c.mass_kg).abs() / c.mass_kg, 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_size_targets_agree() {
        let builder = CompositionBuilder::new();
        let mut by_mass = request(Archetype::Terrestrial, SizeTarget::Mass(EARTH_MASS_KG));
        by_mass.density_hint_kg_m3 = Some(5500.0);
        let a = builder.build(&by_mass);

        let by_radius = CompositionRequest { size: SizeTarget::Radius(a.radius_m()), ..by_mass.clone() };
        let b = builder.build(&by_radius);
        assert_abs_diff_eq!(b.mass_kg / a.mass_kg, 1.0, epsilon = 1e-9);

        let by_gravity = CompositionRequest { size: SizeTarget::Gravity(a.surface_gravity_ms2()), ..by_mass };
        let c = builder.build(&by_gravity);
        assert_abs_diff_eq!(c.radius_m() / a.radius_m(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tiny_dwarf_is_clamped_to_hydrostatic_minimum() {
        let c = CompositionBuilder::new().build(&request(Archetype::Dwarf, SizeTarget::Radius(1.0e4)));
        assert_eq!(c.radius_m(), 3.0e5);
        assert_mass_conserved(&c);
    }

    #[test]
    fn test_asteroid_is_irregular_and_exempt() {
        let c = CompositionBuilder::new().build(&request(Archetype::Asteroid, SizeTarget::Radius(1.0e3)));
        assert_eq!(c.radius_m(), 1.0e3);
        assert_ge!(c.shape.flattening, 0.05);
        assert_lt!(c.shape.flattening, 0.35 + 1e-12);
        assert_eq!(c.layers.len(), 1);
        assert_eq!(c.layers[0].kind, LayerKind::Bulk);
    }

    #[test]
    fn test_same_seed_same_body() {
        let req = request(Archetype::Giant, SizeTarget::Mass(JUPITER_MASS_KG));
        let builder = CompositionBuilder::new();
        assert_eq!(builder.build(&req), builder.build(&req));
    }

    #[test]
    fn test_earth_flattening() {
        let f = rotational_flattening(EARTH_MASS_KG, EARTH_RADIUS_M, EARTH_ROTATION_S);
        assert_gt!(f, 0.003);
        assert_lt!(f, 0.005);
        let shape = Shape { mean_radius_m: EARTH_RADIUS_M, flattening: f };
        assert_gt!(shape.equatorial_radius_m(), shape.mean_radius_m);
        assert_lt!(shape.polar_radius_m(), shape.mean_radius_m);
    }

    #[test]
    fn test_thermal_profile_follows_surface() {
        let mut c = CompositionBuilder::new().build(&request(Archetype::Terrestrial, SizeTarget::Mass(EARTH_MASS_KG)));
        c.set_surface_temperature(250.0);
        assert_eq!(c.layers.last().unwrap().temperature_k, 250.0);
        let temps: Vec<f64> = c.layers.iter().map(|l| l.temperature_k).collect();
        assert!(temps.windows(2).all(|w| w[0] >= w[1]));
    }
}
