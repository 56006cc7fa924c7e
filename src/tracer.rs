//! Propagates rays through a scene, splitting them at every element and
//! booking where their intensity ends up.

use std::collections::VecDeque;

use anyhow::Result;
use log::{debug, info, trace, warn};
use rayon::prelude::*;

use crate::basis::PolarizationBasis;
use crate::coherency::CoherencyMatrix;
use crate::ray::{LightRay, RayId, SourceSpec};
use crate::result::{RayFate, RayRecord, Segment, TraceResult};
use crate::scene::Scene;
use crate::settings::Settings;
use crate::surface::{Emission, Surface};

#[cfg(test)]
mod tests {

    use super::*;
    use crate::ray::SourcePolarization;
    use crate::scene::SceneElement;
    use nalgebra::{Point3, Vector3};
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn source(polarization: SourcePolarization) -> SourceSpec {
        SourceSpec {
            position: Point3::origin(),
            direction: Vector3::z(),
            intensity: 1.0,
            wavelength: None,
            polarization,
        }
    }

    fn element(id: &str, z: f64, surface: Surface) -> SceneElement {
        SceneElement {
            id: id.to_string(),
            position: Point3::new(0.0, 0.0, z),
            surface,
            aperture: None,
        }
    }

    fn horizontal() -> LightRay {
        source(SourcePolarization::Linear { angle: 0.0 })
            .to_ray(RayId(0), 0, 550.0)
            .unwrap()
    }

    #[test]
    fn empty_scene_lets_light_escape() {
        let tracer = Tracer::new(Scene::default(), Settings::default());
        let result = tracer
            .trace(&[source(SourcePolarization::Unpolarized)])
            .unwrap();
        assert!(result.complete);
        assert_eq!(result.terminal(RayFate::Escaped).count(), 1);
        assert!((result.powers.output - 1.0).abs() < 1e-12);
        assert!(result.powers.missing().abs() < 1e-12);
    }

    #[test]
    fn crossed_polarizers_absorb_everything() {
        let scene = Scene::new(vec![
            element("first", 1.0, Surface::polarizer(0.0)),
            element("second", 2.0, Surface::polarizer(FRAC_PI_2)),
        ]);
        let tracer = Tracer::new(scene, Settings::default());
        let result = tracer
            .trace(&[source(SourcePolarization::Linear { angle: 0.0 })])
            .unwrap();
        assert_eq!(result.terminal(RayFate::Absorbed).count(), 1);
        assert!(result.powers.output < 1e-12);
        assert!((result.powers.absorbed - 1.0).abs() < 1e-9);
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[1].element, "second");
    }

    #[test]
    fn beam_splitter_spawns_two_children() {
        let scene = Scene::new(vec![element("pbs", 1.0, Surface::beam_splitter(1.0))]);
        let tracer = Tracer::new(scene, Settings::default());
        let result = tracer
            .trace(&[source(SourcePolarization::Linear { angle: FRAC_PI_4 })])
            .unwrap();
        let escaped: Vec<_> = result.terminal(RayFate::Escaped).collect();
        assert_eq!(escaped.len(), 2);
        for record in &escaped {
            assert_eq!(record.parent, Some(RayId(0)));
            assert_eq!(record.bounces, 1);
            assert!((record.state.intensity - 0.5).abs() < 1e-6);
        }
        assert!(result.powers.missing().abs() < 1e-9);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn facing_mirrors_hit_the_bounce_ceiling() {
        let facing_back = Surface::mirror(0.0).with_normal(-Vector3::z());
        let scene = Scene::new(vec![
            element("front", 1.0, facing_back),
            element("back", -1.0, Surface::mirror(0.0)),
        ]);
        let settings = Settings {
            max_bounces: 5,
            ..Settings::default()
        };
        let result = Tracer::new(scene, settings)
            .trace(&[source(SourcePolarization::Unpolarized)])
            .unwrap();
        assert!(!result.complete);
        let truncated: Vec<_> = result.terminal(RayFate::BounceLimit).collect();
        assert_eq!(truncated.len(), 1);
        assert_eq!(truncated[0].bounces, 5);
        assert!((result.powers.trnc_bounce - 1.0).abs() < 1e-9);
        assert!(result.powers.missing().abs() < 1e-9);
    }

    #[test]
    fn iteration_ceiling_books_the_worklist() {
        let scene = Scene::new(vec![element("pbs", 1.0, Surface::beam_splitter(1.0))]);
        let settings = Settings {
            max_iterations: 1,
            ..Settings::default()
        };
        let result = Tracer::new(scene, settings)
            .trace(&[source(SourcePolarization::Unpolarized)])
            .unwrap();
        assert!(!result.complete);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.terminal(RayFate::IterationLimit).count(), 2);
        assert!((result.powers.trnc_iter - 1.0).abs() < 1e-9);
    }

    #[test]
    fn dim_sources_are_truncated() {
        let mut dim = source(SourcePolarization::Unpolarized);
        dim.intensity = 1e-9;
        let result = Tracer::new(Scene::default(), Settings::default())
            .trace(&[dim])
            .unwrap();
        assert_eq!(result.terminal(RayFate::BelowThreshold).count(), 1);
        assert!((result.powers.trnc_energy - 1e-9).abs() < 1e-15);
    }

    #[test]
    fn parallel_matches_serial() {
        let scene = Scene::new(vec![
            element("qwp", 1.0, Surface::quarter_wave(FRAC_PI_4)),
            element("pbs", 2.0, Surface::beam_splitter(0.9)),
        ]);
        let tracer = Tracer::new(scene, Settings::default());
        let sources = [
            source(SourcePolarization::Linear { angle: 0.0 }),
            source(SourcePolarization::Circular { right: true }),
            source(SourcePolarization::Partial {
                dop: 0.5,
                angle: 0.3,
            }),
        ];
        let serial = tracer.trace(&sources).unwrap();
        let parallel = tracer.trace_parallel(&sources).unwrap();
        assert_eq!(serial.rays.len(), parallel.rays.len());
        assert!((serial.powers.output - parallel.powers.output).abs() < 1e-12);
        assert!((serial.powers.absorbed - parallel.powers.absorbed).abs() < 1e-12);
        assert_eq!(serial.complete, parallel.complete);
    }

    #[test]
    fn linear_chain_follows_malus() {
        let trace = trace_linear(&horizontal(), &[Surface::polarizer(FRAC_PI_4)]);
        let output = trace.output.unwrap();
        assert!((output.state.intensity() - 0.5).abs() < 1e-12);
        assert_eq!(trace.steps.len(), 1);
        assert_eq!(trace.steps[0].element, "polarizer");
    }

    #[test]
    fn linear_chain_stops_when_dark() {
        let trace = trace_linear(
            &horizontal(),
            &[
                Surface::polarizer(FRAC_PI_2),
                Surface::half_wave(0.0),
            ],
        );
        assert!(trace.output.is_none());
        assert_eq!(trace.absorbed_at, Some(0));
        assert_eq!(trace.steps.len(), 1);
        assert!(trace.final_state().intensity() < 1e-12);
    }
}

/// One element acting on the ray in a linear chain.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearStep {
    pub element: &'static str,
    pub intensity_in: f64,
    pub intensity_out: f64,
}

/// Outcome of pushing one ray through an ordered list of surfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTrace {
    pub steps: Vec<LinearStep>,
    /// Final state and frame, or `None` when an element absorbed the ray.
    pub output: Option<Emission>,
    /// Index of the surface that absorbed the ray.
    pub absorbed_at: Option<usize>,
}

impl LinearTrace {
    /// The outgoing state, dark if the ray was absorbed.
    pub fn final_state(&self) -> CoherencyMatrix {
        self.output.map(|e| e.state).unwrap_or_else(CoherencyMatrix::zero)
    }

    pub fn final_basis(&self) -> Option<PolarizationBasis> {
        self.output.map(|e| e.basis)
    }
}

/// Pushes `ray` through `surfaces` in order without any geometry. Each
/// element passes on its transmitted branch, or its reflected one when it
/// only reflects.
pub fn trace_linear(ray: &LightRay, surfaces: &[Surface]) -> LinearTrace {
    let mut steps = Vec::with_capacity(surfaces.len());
    let mut current = Emission {
        state: ray.state,
        basis: ray.basis,
    };

    for (index, surface) in surfaces.iter().enumerate() {
        let interaction = surface.interact(&current.state, &current.basis, ray.wavelength);
        let next = interaction.transmitted.or(interaction.reflected);
        steps.push(LinearStep {
            element: interaction.element,
            intensity_in: current.state.intensity(),
            intensity_out: next.map_or(0.0, |e| e.state.intensity()),
        });
        match next {
            Some(emission) => current = emission,
            None => {
                trace!("ray {} absorbed by surface {} ({})", ray.id.0, index, interaction.element);
                return LinearTrace {
                    steps,
                    output: None,
                    absorbed_at: Some(index),
                };
            }
        }
    }

    LinearTrace {
        steps,
        output: Some(current),
        absorbed_at: None,
    }
}

/// Traces sources through a scene under a set of limits.
#[derive(Debug, Clone)]
pub struct Tracer {
    pub scene: Scene,
    pub settings: Settings,
}

impl Tracer {
    pub fn new(scene: Scene, settings: Settings) -> Self {
        Self { scene, settings }
    }

    /// Traces the scene's own sources.
    pub fn trace_scene(&self) -> Result<TraceResult> {
        if self.settings.parallel {
            self.trace_parallel(&self.scene.sources)
        } else {
            self.trace(&self.scene.sources)
        }
    }

    /// Traces all sources on a single worklist.
    pub fn trace(&self, sources: &[SourceSpec]) -> Result<TraceResult> {
        let rays = sources
            .iter()
            .enumerate()
            .map(|(i, source)| source.to_ray(RayId(i as u64), i, self.settings.wavelength))
            .collect::<Result<Vec<_>>>()?;
        let first_free = rays.len() as u64;
        let result = self.trace_rays(rays, first_free);
        log_summary(&result);
        Ok(result)
    }

    /// Traces each source on its own worklist in parallel and merges the
    /// results. Ray ids are unique across sources.
    pub fn trace_parallel(&self, sources: &[SourceSpec]) -> Result<TraceResult> {
        let mut result = sources
            .par_iter()
            .enumerate()
            .map(|(i, source)| -> Result<TraceResult> {
                let base = (i as u64) << 32;
                let ray = source.to_ray(RayId(base), i, self.settings.wavelength)?;
                Ok(self.trace_rays(vec![ray], base + 1))
            })
            .try_reduce(TraceResult::default, |acc, item| Ok(acc.merge(item)))?;
        result.rays.sort_by_key(|r| r.id);
        log_summary(&result);
        Ok(result)
    }

    /// Runs the worklist to exhaustion or until a limit is reached. Child
    /// rays get ids counting up from `next_id`.
    pub fn trace_rays(&self, rays: Vec<LightRay>, mut next_id: u64) -> TraceResult {
        let settings = &self.settings;
        let mut result = TraceResult::default();
        result.powers.input = rays.iter().map(LightRay::intensity).sum();
        let mut queue: VecDeque<LightRay> = rays.into();

        while let Some(mut ray) = queue.pop_front() {
            if result.iterations >= settings.max_iterations {
                warn!(
                    "iteration ceiling of {} reached with {} rays pending",
                    settings.max_iterations,
                    queue.len() + 1
                );
                result.complete = false;
                for pending in std::iter::once(ray).chain(queue.drain(..)) {
                    result.powers.trnc_iter += pending.intensity();
                    result.rays.push(RayRecord::new(&pending, RayFate::IterationLimit));
                }
                break;
            }
            result.iterations += 1;

            let intensity = ray.intensity();
            if intensity < settings.intensity_threshold {
                trace!("ray {} below threshold ({:e})", ray.id.0, intensity);
                result.powers.trnc_energy += intensity;
                ray.deactivate();
                result.rays.push(RayRecord::new(&ray, RayFate::BelowThreshold));
                continue;
            }
            if ray.bounces >= settings.max_bounces {
                debug!("ray {} reached {} bounces", ray.id.0, ray.bounces);
                result.complete = false;
                result.powers.trnc_bounce += intensity;
                ray.deactivate();
                result.rays.push(RayRecord::new(&ray, RayFate::BounceLimit));
                continue;
            }

            let Some(hit) = self.scene.nearest_hit(&ray, settings.min_hit_distance) else {
                result.powers.output += intensity;
                ray.deactivate();
                result.rays.push(RayRecord::new(&ray, RayFate::Escaped));
                continue;
            };

            let element = &self.scene.elements[hit.element];
            let start = ray.position;
            ray.advance(hit.distance);
            result.segments.push(Segment {
                ray: ray.id,
                start,
                end: ray.position,
                element: element.id.clone(),
                intensity,
            });

            let local = element.surface.local_basis(&ray.basis);
            let state = ray.basis.transform_coherency(&ray.state, &local);
            let interaction = element.surface.interact_local(&state, &local, ray.wavelength);
            debug!(
                "ray {} hit '{}' ({}) at {:.6?}: {:.6} -> {:.6}",
                ray.id.0,
                element.id,
                interaction.element,
                ray.position.coords.as_slice(),
                intensity,
                interaction.total_intensity()
            );

            if let Err(violation) =
                interaction.check_conservation(intensity, settings.conservation_tolerance, true)
            {
                warn!("'{}': {}", element.id, violation);
                result.violations.push(violation);
            }

            let mut emitted = 0.0;
            for emission in [interaction.transmitted, interaction.reflected]
                .into_iter()
                .flatten()
                .filter(|e| e.state.intensity() > settings.absorption_threshold)
            {
                emitted += emission.state.intensity();
                let child = ray.spawn_child(RayId(next_id), &emission);
                next_id += 1;
                trace!("queued ray {} from {}", child.id.0, ray.id.0);
                queue.push_back(child);
            }
            result.powers.absorbed += intensity - emitted;

            ray.deactivate();
            if emitted == 0.0 {
                result.rays.push(RayRecord::new(&ray, RayFate::Absorbed));
            }
        }

        result
    }
}

fn log_summary(result: &TraceResult) {
    info!(
        "traced {} rays in {} iterations ({})",
        result.rays.len(),
        result.iterations,
        if result.complete { "complete" } else { "truncated" }
    );
    let missing = result.powers.missing();
    if missing.abs() > 1e-6 * result.powers.input.max(1.0) {
        warn!("energy ledger does not close: {:e} unaccounted", missing);
    }
    let truncated = result.powers.truncated();
    if truncated > 0.0 {
        info!(
            "{:e} of {:e} input intensity cut off by trace limits",
            truncated, result.powers.input
        );
    }
    debug!("{}", result.powers);
}
