//! Local polarization frames attached to rays.
//!
//! A [`PolarizationBasis`] is a right-handed orthonormal triple `(s, p, k)`
//! with `s x p = k`. Jones components and coherency matrices only have
//! meaning relative to such a frame, so every surface interaction rebuilds it
//! and every hand-over between frames goes through [`PolarizationBasis::rotation_to`].

use anyhow::Result;
use nalgebra::Vector3;

use crate::coherency::CoherencyMatrix;
use crate::config;
use crate::jones::JonesMatrix;
use crate::vector::VectorExt;


/// A right-handed orthonormal polarization frame `(s, p, k)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarizationBasis {
    s: Vector3<f64>,
    p: Vector3<f64>,
    k: Vector3<f64>,
}

impl PolarizationBasis {
    /// Creates a basis from explicit axes, checking unit length,
    /// orthogonality and handedness.
    pub fn new(s: Vector3<f64>, p: Vector3<f64>, k: Vector3<f64>) -> Result<Self> {
        let basis = Self { s, p, k };
        for (name, axis) in [("s", &s), ("p", &p), ("k", &k)] {
            if (axis.norm() - 1.0).abs() >= config::BASIS_TOLERANCE {
                return Err(anyhow::anyhow!("{} is not normalised: {:?}", name, axis));
            }
        }
        let dots = [s.dot(&p), s.dot(&k), p.dot(&k)];
        if dots.iter().any(|d| d.abs() >= config::BASIS_TOLERANCE) {
            return Err(anyhow::anyhow!(
                "axes are not mutually orthogonal, dot products are: {:?}",
                dots
            ));
        }
        if !s.cross(&p).approx_eq(&k, config::BASIS_TOLERANCE) {
            return Err(anyhow::anyhow!(
                "basis is not right-handed: s x p = {:?}, k = {:?}",
                s.cross(&p),
                k
            ));
        }
        Ok(basis)
    }

    /// The lab frame `(x, y, z)`.
    pub fn standard() -> Self {
        Self {
            s: Vector3::x(),
            p: Vector3::y(),
            k: Vector3::z(),
        }
    }

    /// Builds the frame for a ray travelling along `k` with `s` derived from
    /// the coordinate axis least aligned with `k`.
    pub fn from_direction(k: &Vector3<f64>) -> Option<Self> {
        let k = k.safe_normalize()?;
        let s = Self::perpendicular_from_axis(&k, &k)?;
        Some(Self::complete(s, k))
    }

    /// The s-p frame of a ray travelling along `k` meeting a surface with
    /// normal `n`. `s = (k x n) / |k x n|`; at normal incidence the plane of
    /// incidence is undefined and `s` is synthesized deterministically from
    /// the coordinate axis least aligned with `n`.
    pub fn interface(k: &Vector3<f64>, n: &Vector3<f64>) -> Option<Self> {
        let k = k.safe_normalize()?;
        let n = n.safe_normalize()?;
        let cross = k.cross(&n);
        let s = if cross.norm() < config::GEOMETRIC_EPSILON {
            Self::perpendicular_from_axis(&n, &k)?
        } else {
            cross.normalize()
        };
        Some(Self::complete(s, k))
    }

    /// The interface frame for this ray's direction at a surface with normal `n`.
    pub fn interface_for(&self, n: &Vector3<f64>) -> Self {
        Self::interface(&self.k, n).unwrap_or(*self)
    }

    /// Frame of the reflected ray: `s` is kept, `k` is mirrored and `p` rebuilt.
    pub fn reflected(&self, n: &Vector3<f64>) -> Self {
        let k_new = self.k.reflect(n);
        let k_new = k_new.safe_normalize().unwrap_or(k_new);
        self.with_direction(k_new).unwrap_or(*self)
    }

    /// Frame of the refracted ray for relative index `eta = n1 / n2`.
    /// `None` under total internal reflection.
    pub fn refracted(&self, n: &Vector3<f64>, eta: f64) -> Option<Self> {
        let k_new = self.k.refract(n, eta)?;
        self.with_direction(k_new)
    }

    /// Rotates the frame about `k` by `theta`.
    pub fn rotated(&self, theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        let s = self.s * cos + self.p * sin;
        Self::complete(s, self.k)
    }

    /// Parallel-transports the frame onto a new propagation direction by the
    /// minimal rotation taking `k` to `k_new`.
    pub fn transported_to(&self, k_new: &Vector3<f64>) -> Option<Self> {
        let k_new = k_new.safe_normalize()?;
        let cos = self.k.dot(&k_new).clamp(-1.0, 1.0);
        if cos > 1.0 - config::GEOMETRIC_EPSILON {
            return Some(Self::complete(self.s, k_new));
        }
        if cos < -1.0 + config::GEOMETRIC_EPSILON {
            // half turn about s
            return Some(Self::complete(self.s, k_new));
        }
        let axis = self.k.cross(&k_new).normalize();
        let angle = cos.acos();
        let s = rodrigues(&self.s, &axis, angle);
        Some(Self::complete(s, k_new))
    }

    pub fn s(&self) -> Vector3<f64> {
        self.s
    }

    pub fn p(&self) -> Vector3<f64> {
        self.p
    }

    pub fn k(&self) -> Vector3<f64> {
        self.k
    }

    /// Unit axes, mutual orthogonality and `s x p = k`, all within `tol`.
    pub fn is_valid(&self, tol: f64) -> bool {
        let unit = [self.s, self.p, self.k]
            .iter()
            .all(|v| (v.norm() - 1.0).abs() <= tol);
        let orthogonal = self.s.dot(&self.p).abs() <= tol
            && self.s.dot(&self.k).abs() <= tol
            && self.p.dot(&self.k).abs() <= tol;
        unit && orthogonal && self.s.cross(&self.p).approx_eq(&self.k, tol)
    }

    /// Returns the 2x2 matrix re-expressing Jones components given in this
    /// frame in the frame `other`, normalised to unit determinant.
    pub fn rotation_to(&self, other: &PolarizationBasis) -> JonesMatrix {
        let m00 = self.s.dot(&other.s);
        let m01 = self.p.dot(&other.s);
        let m10 = self.s.dot(&other.p);
        let m11 = self.p.dot(&other.p);
        let det = m00 * m11 - m01 * m10;
        if det.abs() < config::GEOMETRIC_EPSILON {
            log::warn!("degenerate frame hand-over (det = {:e}), keeping components", det);
            return JonesMatrix::identity();
        }
        let norm = det.abs().sqrt();
        JonesMatrix::from_real(m00 / norm, m01 / norm, m10 / norm, m11 / norm)
    }

    /// Re-expresses `state`, given in this frame, in the frame `target`.
    pub fn transform_coherency(
        &self,
        state: &CoherencyMatrix,
        target: &PolarizationBasis,
    ) -> CoherencyMatrix {
        state.apply_operator(&self.rotation_to(target))
    }

    /// Keeps `s` (re-orthogonalised against the new direction) and rebuilds `p`.
    fn with_direction(&self, k_new: Vector3<f64>) -> Option<Self> {
        let k_new = k_new.safe_normalize()?;
        let s = (self.s - self.s.dot(&k_new) * k_new).safe_normalize()?;
        Some(Self::complete(s, k_new))
    }

    /// Right-handed completion `p = k x s`.
    fn complete(s: Vector3<f64>, k: Vector3<f64>) -> Self {
        let p = k.cross(&s);
        Self { s, p, k }
    }

    /// Projects the coordinate axis least aligned with `reference` onto the
    /// plane perpendicular to `reference`, then makes it perpendicular to `k`.
    fn perpendicular_from_axis(reference: &Vector3<f64>, k: &Vector3<f64>) -> Option<Vector3<f64>> {
        let axis = reference.least_aligned_axis();
        let in_plane = (axis - axis.dot(reference) * reference).safe_normalize()?;
        (in_plane - in_plane.dot(k) * k).safe_normalize()
    }
}

/// Rotates `v` about the unit `axis` by `angle`.
fn rodrigues(v: &Vector3<f64>, axis: &Vector3<f64>, angle: f64) -> Vector3<f64> {
    let (sin, cos) = angle.sin_cos();
    v * cos + axis.cross(v) * sin + axis * axis.dot(v) * (1.0 - cos)
}
