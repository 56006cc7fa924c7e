//! Scene geometry: optical elements placed on planes in 3D space.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::ray::{LightRay, SourceSpec};
use crate::surface::Surface;
use crate::vector::VectorExt;

#[cfg(test)]
mod tests {

    use super::*;
    use crate::basis::PolarizationBasis;
    use crate::coherency::CoherencyMatrix;
    use crate::ray::RayId;

    fn ray_along_z() -> LightRay {
        LightRay::new(
            RayId(0),
            0,
            Point3::origin(),
            Vector3::z(),
            CoherencyMatrix::unpolarized(1.0),
            550.0,
        )
        .unwrap()
    }

    fn element(id: &str, z: f64) -> SceneElement {
        SceneElement {
            id: id.to_string(),
            position: Point3::new(0.0, 0.0, z),
            surface: Surface::polarizer(0.0),
            aperture: None,
        }
    }

    #[test]
    fn plane_intersection() {
        let hit = element("a", 2.0).intersect(&ray_along_z(), 1e-9).unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-12);
        assert!((hit.point - Point3::new(0.0, 0.0, 2.0)).norm() < 1e-12);
    }

    #[test]
    fn behind_and_parallel_planes_are_missed() {
        assert!(element("a", -1.0).intersect(&ray_along_z(), 1e-9).is_none());
        let mut sideways = element("b", 1.0);
        sideways.surface = sideways.surface.with_normal(Vector3::x());
        sideways.position = Point3::new(0.0, 1.0, 0.0);
        // ray runs inside a plane parallel to it
        assert!(sideways.intersect(&ray_along_z(), 1e-9).is_none());
        // a hit closer than the minimum distance is ignored
        assert!(element("c", 0.0).intersect(&ray_along_z(), 1e-6).is_none());
    }

    #[test]
    fn aperture_limits_hits() {
        let mut ray = ray_along_z();
        ray.position = Point3::new(0.4, 0.0, 0.0);
        let mut small = element("a", 1.0);
        small.aperture = Some(0.3);
        assert!(small.intersect(&ray, 1e-9).is_none());
        small.aperture = Some(0.5);
        assert!(small.intersect(&ray, 1e-9).is_some());
    }

    #[test]
    fn nearest_hit_picks_closest() {
        let scene = Scene::new(vec![element("far", 5.0), element("near", 1.0), element("mid", 3.0)]);
        let hit = scene.nearest_hit(&ray_along_z(), 1e-9).unwrap();
        assert_eq!(scene.elements[hit.element].id, "near");
        assert!(Scene::default().nearest_hit(&ray_along_z(), 1e-9).is_none());
    }

    #[test]
    fn parses_scene_toml() {
        let scene = Scene::from_toml_str(
            r#"
            [[sources]]
            position = [0.0, 0.0, 0.0]
            direction = [0.0, 0.0, 1.0]
            intensity = 1.0
            polarization = { type = "linear", angle = 0.0 }

            [[elements]]
            id = "analyzer"
            position = [0.0, 0.0, 1.0]
            aperture = 2.0
            [elements.surface]
            normal = [0.0, 0.0, 2.0]
            element = { kind = "polarizer", angle = 0.7853981633974483 }
            "#,
        )
        .unwrap();
        assert_eq!(scene.elements.len(), 1);
        assert_eq!(scene.sources.len(), 1);
        // normals are normalised on load
        assert!((scene.elements[0].surface.normal.norm() - 1.0).abs() < 1e-12);
        let basis = PolarizationBasis::standard();
        let out = scene.elements[0]
            .surface
            .interact(&CoherencyMatrix::linear(1.0, 0.0), &basis, 550.0);
        assert!((out.total_intensity() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_scenes() {
        let zero_normal = r#"
            [[elements]]
            id = "x"
            position = [0.0, 0.0, 1.0]
            [elements.surface]
            normal = [0.0, 0.0, 0.0]
            element = { kind = "mirror", phase = 0.0 }
            "#;
        assert!(Scene::from_toml_str(zero_normal).is_err());

        let bad_element = r#"
            [[elements]]
            id = "x"
            position = [0.0, 0.0, 1.0]
            [elements.surface]
            element = { kind = "attenuator", transmission = 2.0 }
            "#;
        assert!(Scene::from_toml_str(bad_element).is_err());
        assert!(Scene::from_file("does/not/exist.toml").is_err());
    }
}

/// Where a ray meets an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Index into [`Scene::elements`].
    pub element: usize,
    pub distance: f64,
    pub point: Point3<f64>,
}

/// An optical element placed in the scene on the plane through `position`
/// perpendicular to its surface normal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneElement {
    pub id: String,
    pub position: Point3<f64>,
    pub surface: Surface,
    /// Radius of the circular clear aperture; unbounded when absent.
    #[serde(default)]
    pub aperture: Option<f64>,
}

impl SceneElement {
    /// Ray-plane intersection at least `min_distance` ahead of the ray.
    pub fn intersect(&self, ray: &LightRay, min_distance: f64) -> Option<Hit> {
        let normal = &self.surface.normal;
        let denom = ray.direction.dot(normal);
        if denom.abs() < config::GEOMETRIC_EPSILON {
            return None;
        }
        let distance = (self.position - ray.position).dot(normal) / denom;
        if !distance.is_finite() || distance < min_distance {
            return None;
        }
        let point = ray.position + ray.direction * distance;
        if let Some(radius) = self.aperture {
            if (point - self.position).norm() > radius {
                return None;
            }
        }
        Some(Hit {
            element: 0,
            distance,
            point,
        })
    }
}

/// The elements and sources making up an optical bench.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub elements: Vec<SceneElement>,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl Scene {
    pub fn new(elements: Vec<SceneElement>) -> Self {
        Self {
            elements,
            sources: Vec::new(),
        }
    }

    /// The closest element the ray reaches, if any.
    pub fn nearest_hit(&self, ray: &LightRay, min_distance: f64) -> Option<Hit> {
        self.elements
            .iter()
            .enumerate()
            .filter_map(|(index, element)| {
                element
                    .intersect(ray, min_distance)
                    .map(|hit| Hit { element: index, ..hit })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Parses and validates a scene description.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut scene: Scene = toml::from_str(contents).context("could not parse scene")?;
        scene.normalize()?;
        Ok(scene)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("could not read scene file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("invalid scene file {}", path.display()))
    }

    /// Normalises surface normals and checks every element.
    fn normalize(&mut self) -> Result<()> {
        for element in &mut self.elements {
            let normal: Vector3<f64> = element.surface.normal;
            element.surface.normal = normal.safe_normalize().ok_or_else(|| {
                anyhow::anyhow!("element '{}' has a degenerate normal {:?}", element.id, normal)
            })?;
            element
                .surface
                .element
                .validate()
                .with_context(|| format!("element '{}'", element.id))?;
            if let Some(radius) = element.aperture {
                if radius <= 0.0 {
                    return Err(anyhow::anyhow!(
                        "element '{}' has a non-positive aperture {}",
                        element.id,
                        radius
                    ));
                }
            }
        }
        for (index, source) in self.sources.iter().enumerate() {
            if source.direction.safe_normalize().is_none() {
                return Err(anyhow::anyhow!("source {} has no direction", index));
            }
        }
        log::debug!(
            "loaded scene with {} elements and {} sources",
            self.elements.len(),
            self.sources.len()
        );
        Ok(())
    }
}
