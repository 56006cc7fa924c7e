use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::powers::Powers;
use crate::ray::{LightRay, RayId};
use crate::state::{PolarizationState, StateRecord};
use crate::surface::ConservationViolation;

#[cfg(test)]
mod tests {

    use super::*;
    use crate::coherency::CoherencyMatrix;

    fn ray(id: u64) -> LightRay {
        LightRay::new(
            RayId(id),
            0,
            Point3::origin(),
            Vector3::z(),
            CoherencyMatrix::linear(1.0, 0.0),
            550.0,
        )
        .unwrap()
    }

    #[test]
    fn merge_combines_everything() {
        let mut a = TraceResult::default();
        a.powers.input = 1.0;
        a.iterations = 3;
        a.rays.push(RayRecord::new(&ray(2), RayFate::Escaped));
        let mut b = TraceResult::default();
        b.powers.input = 2.0;
        b.iterations = 4;
        b.complete = false;
        b.rays.push(RayRecord::new(&ray(1), RayFate::Absorbed));

        let merged = a.merge(b);
        assert!((merged.powers.input - 3.0).abs() < 1e-12);
        assert_eq!(merged.iterations, 7);
        assert!(!merged.complete);
        assert_eq!(merged.rays.len(), 2);
        assert_eq!(merged.terminal(RayFate::Escaped).count(), 1);
    }

    #[test]
    fn records_serialize() {
        let record = RayRecord::new(&ray(5), RayFate::BounceLimit);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("bounce_limit"));
        assert!(json.contains("\"id\":5"));
    }
}

/// Why a ray stopped propagating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RayFate {
    /// Left the scene without hitting anything else.
    Escaped,
    /// An element let no light through on any branch.
    Absorbed,
    /// Fell below the intensity threshold.
    BelowThreshold,
    BounceLimit,
    IterationLimit,
}

/// Terminal snapshot of a ray.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RayRecord {
    pub id: RayId,
    pub parent: Option<RayId>,
    pub source_id: usize,
    pub bounces: usize,
    pub path_length: f64,
    pub wavelength: f64,
    pub position: Point3<f64>,
    pub direction: Vector3<f64>,
    pub fate: RayFate,
    pub state: StateRecord,
}

impl RayRecord {
    pub fn new(ray: &LightRay, fate: RayFate) -> Self {
        Self {
            id: ray.id,
            parent: ray.parent,
            source_id: ray.source_id,
            bounces: ray.bounces,
            path_length: ray.path_length,
            wavelength: ray.wavelength,
            position: ray.position,
            direction: ray.direction,
            fate,
            state: PolarizationState::new(ray.state).to_record(),
        }
    }
}

/// A straight piece of a ray's path between two events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub ray: RayId,
    pub start: Point3<f64>,
    pub end: Point3<f64>,
    /// Scene element hit at `end`.
    pub element: String,
    pub intensity: f64,
}

/// Everything a trace produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceResult {
    pub rays: Vec<RayRecord>,
    pub segments: Vec<Segment>,
    pub powers: Powers,
    pub iterations: usize,
    /// `false` when a bounce or iteration ceiling cut the trace short.
    pub complete: bool,
    pub violations: Vec<ConservationViolation>,
}

impl Default for TraceResult {
    fn default() -> Self {
        Self {
            rays: Vec::new(),
            segments: Vec::new(),
            powers: Powers::new(),
            iterations: 0,
            complete: true,
            violations: Vec::new(),
        }
    }
}

impl TraceResult {
    /// Combines the results of independent traces.
    pub fn merge(mut self, other: TraceResult) -> Self {
        self.rays.extend(other.rays);
        self.segments.extend(other.segments);
        self.powers += other.powers;
        self.iterations += other.iterations;
        self.complete &= other.complete;
        self.violations.extend(other.violations);
        self
    }

    /// Terminal records with the given fate.
    pub fn terminal(&self, fate: RayFate) -> impl Iterator<Item = &RayRecord> {
        self.rays.iter().filter(move |r| r.fate == fate)
    }
}
