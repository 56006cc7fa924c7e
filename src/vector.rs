//! Real 3-vector operations used for ray geometry.

use nalgebra::Vector3;

use crate::config;


/// Geometric operations on propagation directions and normals.
pub trait VectorExt: Sized {
    /// Unit vector in the same direction, or `None` for a degenerate vector.
    fn safe_normalize(&self) -> Option<Self>;
    /// Mirror reflection about the plane with normal `normal`.
    fn reflect(&self, normal: &Self) -> Self;
    /// Refraction through an interface with relative index `eta = n1 / n2`.
    /// Returns `None` under total internal reflection.
    fn refract(&self, normal: &Self, eta: f64) -> Option<Self>;
    /// Spherical interpolation between two directions.
    fn slerp_to(&self, other: &Self, t: f64) -> Self;
    /// The coordinate axis least aligned with this vector.
    fn least_aligned_axis(&self) -> Self;
    fn approx_eq(&self, other: &Self, tol: f64) -> bool;
}

impl VectorExt for Vector3<f64> {
    fn safe_normalize(&self) -> Option<Self> {
        let norm = self.norm();
        if norm < config::VEC_LENGTH_THRESHOLD {
            None
        } else {
            Some(self / norm)
        }
    }

    fn reflect(&self, normal: &Self) -> Self {
        let n = normal.safe_normalize().unwrap_or(*normal);
        let w = self.dot(&n);
        self - 2.0 * w * n
    }

    fn refract(&self, normal: &Self, eta: f64) -> Option<Self> {
        let d = self.safe_normalize()?;
        let n = normal.safe_normalize()?;
        // normal facing against the incident direction
        let n = if d.dot(&n) > 0.0 { -n } else { n };
        let cos_i = -d.dot(&n);
        let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
        if k < 0.0 {
            return None;
        }
        (eta * d + (eta * cos_i - k.sqrt()) * n).safe_normalize()
    }

    fn slerp_to(&self, other: &Self, t: f64) -> Self {
        let (Some(a), Some(b)) = (self.safe_normalize(), other.safe_normalize()) else {
            return *self;
        };
        let cos_omega = a.dot(&b).clamp(-1.0, 1.0);
        let omega = cos_omega.acos();
        let sin_omega = omega.sin();
        if sin_omega.abs() < config::GEOMETRIC_EPSILON {
            let lerp = a * (1.0 - t) + b * t;
            return lerp.safe_normalize().unwrap_or(a);
        }
        a * (((1.0 - t) * omega).sin() / sin_omega) + b * ((t * omega).sin() / sin_omega)
    }

    fn least_aligned_axis(&self) -> Self {
        let abs = self.abs();
        if abs.x <= abs.y && abs.x <= abs.z {
            Vector3::x()
        } else if abs.y <= abs.z {
            Vector3::y()
        } else {
            Vector3::z()
        }
    }

    fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        (self - other).amax() <= tol
    }
}
