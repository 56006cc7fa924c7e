//! Rays and the sources that emit them.

use anyhow::Result;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::basis::PolarizationBasis;
use crate::coherency::CoherencyMatrix;
use crate::surface::Emission;
use crate::vector::VectorExt;

#[cfg(test)]
mod tests {

    use super::*;
    use std::f64::consts::PI;

    fn source() -> SourceSpec {
        SourceSpec {
            position: Point3::origin(),
            direction: Vector3::z(),
            intensity: 2.0,
            wavelength: None,
            polarization: SourcePolarization::Linear { angle: 0.0 },
        }
    }

    #[test]
    fn new_ray_frame_follows_direction() {
        let ray = source().to_ray(RayId(0), 0, 550.0).unwrap();
        assert!(ray.basis.k().approx_eq(&ray.direction, 1e-12));
        assert!(ray.basis.is_valid(1e-12));
        assert_eq!(ray.wavelength, 550.0);
        assert!(ray.active);
        assert_eq!(ray.parent, None);
        assert!((ray.intensity() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_direction_is_rejected() {
        let mut desc = source();
        desc.direction = Vector3::zeros();
        assert!(desc.to_ray(RayId(0), 0, 550.0).is_err());
    }

    #[test]
    fn advance_accumulates_path() {
        let mut ray = source().to_ray(RayId(0), 0, 550.0).unwrap();
        ray.advance(2.5);
        ray.advance(0.5);
        assert!((ray.path_length - 3.0).abs() < 1e-12);
        assert!((ray.position.z - 3.0).abs() < 1e-12);
        ray.deactivate();
        assert!(!ray.active);
    }

    #[test]
    fn child_inherits_provenance() {
        let mut parent = source().to_ray(RayId(4), 7, 633.0).unwrap();
        parent.advance(1.0);
        let reflected = parent.basis.reflected(&Vector3::z());
        let emission = Emission {
            state: CoherencyMatrix::linear(0.5, 0.0),
            basis: reflected,
        };
        let child = parent.spawn_child(RayId(9), &emission);
        assert_eq!(child.id, RayId(9));
        assert_eq!(child.parent, Some(RayId(4)));
        assert_eq!(child.source_id, 7);
        assert_eq!(child.bounces, 1);
        assert_eq!(child.wavelength, 633.0);
        assert!((child.path_length - 1.0).abs() < 1e-12);
        assert!(child.direction.approx_eq(&-Vector3::z(), 1e-12));
        assert!((child.intensity() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn source_polarizations() {
        let cases = [
            SourcePolarization::Linear { angle: PI / 3.0 },
            SourcePolarization::Circular { right: false },
            SourcePolarization::Elliptical {
                orientation: 0.2,
                ellipticity: 0.3,
            },
            SourcePolarization::Unpolarized,
            SourcePolarization::Partial {
                dop: 0.4,
                angle: 0.1,
            },
        ];
        for polarization in cases {
            let state = polarization.to_state(3.0);
            assert!((state.intensity() - 3.0).abs() < 1e-12);
            assert!(state.is_physical());
        }
        assert!(SourcePolarization::Unpolarized.to_state(1.0).is_unpolarized());
        assert!((SourcePolarization::Partial { dop: 0.4, angle: 0.1 }.to_state(1.0).dop() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn source_from_toml() {
        let desc: SourceSpec = toml::from_str(
            r#"
            position = [0.0, 0.0, -1.0]
            direction = [0.0, 0.0, 1.0]
            intensity = 1.0
            polarization = { type = "partial", dop = 0.5, angle = 0.0 }
            "#,
        )
        .unwrap();
        assert!(desc.wavelength.is_none());
        assert!(matches!(desc.polarization, SourcePolarization::Partial { .. }));
    }
}

/// Unique identity of a ray within one trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RayId(pub u64);

/// A ray carrying a polarization state and the frame it is expressed in.
#[derive(Debug, Clone, PartialEq)]
pub struct LightRay {
    pub id: RayId,
    pub source_id: usize,
    pub position: Point3<f64>,
    /// Unit propagation direction, always equal to `basis.k()`.
    pub direction: Vector3<f64>,
    pub state: CoherencyMatrix,
    pub basis: PolarizationBasis,
    pub path_length: f64,
    /// Vacuum wavelength in nm.
    pub wavelength: f64,
    pub bounces: usize,
    pub parent: Option<RayId>,
    pub active: bool,
}

impl LightRay {
    /// Creates a source ray whose frame is derived from its direction.
    pub fn new(
        id: RayId,
        source_id: usize,
        position: Point3<f64>,
        direction: Vector3<f64>,
        state: CoherencyMatrix,
        wavelength: f64,
    ) -> Result<Self> {
        let basis = PolarizationBasis::from_direction(&direction).ok_or_else(|| {
            anyhow::anyhow!("ray direction must be non-zero, got {:?}", direction)
        })?;
        Ok(Self {
            id,
            source_id,
            position,
            direction: basis.k(),
            state,
            basis,
            path_length: 0.0,
            wavelength,
            bounces: 0,
            parent: None,
            active: true,
        })
    }

    /// Spawns the ray leaving an interaction along one branch. The child
    /// starts where the parent is, keeps its source and path length, and has
    /// one more bounce.
    pub fn spawn_child(&self, id: RayId, emission: &Emission) -> Self {
        Self {
            id,
            source_id: self.source_id,
            position: self.position,
            direction: emission.basis.k(),
            state: emission.state,
            basis: emission.basis,
            path_length: self.path_length,
            wavelength: self.wavelength,
            bounces: self.bounces + 1,
            parent: Some(self.id),
            active: true,
        }
    }

    /// Moves the ray `distance` along its direction.
    pub fn advance(&mut self, distance: f64) {
        self.position += self.direction * distance;
        self.path_length += distance;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn intensity(&self) -> f64 {
        self.state.intensity()
    }
}

/// Polarization of a source. Angles are in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourcePolarization {
    Linear { angle: f64 },
    Circular { right: bool },
    Elliptical { orientation: f64, ellipticity: f64 },
    Unpolarized,
    Partial { dop: f64, angle: f64 },
}

impl SourcePolarization {
    pub fn to_state(&self, intensity: f64) -> CoherencyMatrix {
        match *self {
            SourcePolarization::Linear { angle } => CoherencyMatrix::linear(intensity, angle),
            SourcePolarization::Circular { right } => CoherencyMatrix::circular(intensity, right),
            SourcePolarization::Elliptical {
                orientation,
                ellipticity,
            } => CoherencyMatrix::elliptical(intensity, orientation, ellipticity),
            SourcePolarization::Unpolarized => CoherencyMatrix::unpolarized(intensity),
            SourcePolarization::Partial { dop, angle } => {
                CoherencyMatrix::partial(intensity, dop, angle)
            }
        }
    }
}

/// A light source as described in a scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub position: Point3<f64>,
    pub direction: Vector3<f64>,
    pub intensity: f64,
    /// Overrides the trace's default wavelength (nm).
    #[serde(default)]
    pub wavelength: Option<f64>,
    pub polarization: SourcePolarization,
}

impl SourceSpec {
    /// Emits the source ray.
    pub fn to_ray(&self, id: RayId, source_id: usize, default_wavelength: f64) -> Result<LightRay> {
        if self.intensity < 0.0 {
            return Err(anyhow::anyhow!(
                "source intensity must be non-negative, got {}",
                self.intensity
            ));
        }
        let direction = self.direction.safe_normalize().ok_or_else(|| {
            anyhow::anyhow!("source direction must be non-zero, got {:?}", self.direction)
        })?;
        LightRay::new(
            id,
            source_id,
            self.position,
            direction,
            self.polarization.to_state(self.intensity),
            self.wavelength.unwrap_or(default_wavelength),
        )
    }
}
