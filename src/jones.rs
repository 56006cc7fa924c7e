//! Jones calculus: complex 2-vectors and 2x2 complex operators.
//!
//! Components are always expressed in a local (s, p) basis. An element whose
//! optic axis sits at angle `theta` from `s` is built by the sandwich
//! `R(-theta) * M0 * R(theta)` with `R(theta) = [[cos, sin], [-sin, cos]]`.

use std::fmt;
use std::ops::{Add, Mul};

use nalgebra::{Matrix2, Vector2};

use crate::complex::{expi, ComplexExt, C64};
use crate::config;


/// A fully polarized field `(E_s, E_p)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JonesVector {
    pub s: C64,
    pub p: C64,
}

impl JonesVector {
    pub fn new(s: C64, p: C64) -> Self {
        Self { s, p }
    }

    /// Unit-intensity linear polarization at `angle` from the s axis.
    pub fn linear(angle: f64) -> Self {
        Self::new(C64::new(angle.cos(), 0.0), C64::new(angle.sin(), 0.0))
    }

    /// Unit-intensity circular polarization. Right-handed has `S3 > 0`.
    pub fn circular(right: bool) -> Self {
        let a = std::f64::consts::FRAC_1_SQRT_2;
        let sign = if right { 1.0 } else { -1.0 };
        Self::new(C64::new(a, 0.0), C64::new(0.0, sign * a))
    }

    /// Unit-intensity elliptical polarization with major axis at `orientation`
    /// and ellipticity angle `ellipticity` (`pi/4` is right circular).
    pub fn elliptical(orientation: f64, ellipticity: f64) -> Self {
        let base = Self::new(
            C64::new(ellipticity.cos(), 0.0),
            C64::new(0.0, ellipticity.sin()),
        );
        JonesMatrix::rotation(-orientation).apply(&base)
    }

    pub fn intensity(&self) -> f64 {
        self.s.norm_sqr() + self.p.norm_sqr()
    }

    /// Returns the vector scaled to unit intensity, or `None` for a dark field.
    pub fn normalized(&self) -> Option<Self> {
        let norm = self.intensity().sqrt();
        if norm < config::VEC_LENGTH_THRESHOLD {
            return None;
        }
        Some(Self::new(self.s / norm, self.p / norm))
    }

    pub fn scale(&self, factor: C64) -> Self {
        Self::new(self.s * factor, self.p * factor)
    }

    pub fn as_vector(&self) -> Vector2<C64> {
        Vector2::new(self.s, self.p)
    }
}

/// A 2x2 complex operator acting on Jones vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JonesMatrix(pub Matrix2<C64>);

impl JonesMatrix {
    /// Builds a matrix from its entries in row-major order.
    pub fn new(m00: C64, m01: C64, m10: C64, m11: C64) -> Self {
        Self(Matrix2::new(m00, m01, m10, m11))
    }

    pub fn from_real(m00: f64, m01: f64, m10: f64, m11: f64) -> Self {
        Self::new(
            C64::new(m00, 0.0),
            C64::new(m01, 0.0),
            C64::new(m10, 0.0),
            C64::new(m11, 0.0),
        )
    }

    pub fn identity() -> Self {
        Self(Matrix2::identity())
    }

    pub fn zero() -> Self {
        Self(Matrix2::zeros())
    }

    pub fn diagonal(d0: C64, d1: C64) -> Self {
        Self(Matrix2::from_diagonal(&Vector2::new(d0, d1)))
    }

    /// Uniform phase shift `e^{i phase}` on both axes.
    pub fn phase(phase: f64) -> Self {
        let e = expi(phase);
        Self::diagonal(e, e)
    }

    /// Frame rotation `R(theta) = [[cos, sin], [-sin, cos]]`.
    pub fn rotation(theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        Self::from_real(c, s, -s, c)
    }

    /// Ideal linear polarizer with transmission axis at `theta`.
    pub fn linear_polarizer(theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        Self::from_real(c * c, c * s, c * s, s * s)
    }

    /// Linear retarder of retardance `delta` with its fast axis at `theta`.
    pub fn retarder(delta: f64, theta: f64) -> Self {
        let core = Self::diagonal(C64::new(1.0, 0.0), expi(delta));
        Self::rotation(-theta) * core * Self::rotation(theta)
    }

    pub fn quarter_wave(theta: f64) -> Self {
        Self::retarder(std::f64::consts::FRAC_PI_2, theta)
    }

    pub fn half_wave(theta: f64) -> Self {
        Self::retarder(std::f64::consts::PI, theta)
    }

    /// Optical rotator turning the polarization by `theta` without loss.
    pub fn rotator(theta: f64) -> Self {
        Self::rotation(-theta)
    }

    /// Diattenuator passing the axis at `theta` fully and the orthogonal axis
    /// with intensity transmission `1 - diattenuation`.
    pub fn partial_polarizer(diattenuation: f64, theta: f64) -> Self {
        let t_perp = (1.0 - diattenuation.clamp(0.0, 1.0)).sqrt();
        let core = Self::diagonal(C64::new(1.0, 0.0), C64::new(t_perp, 0.0));
        Self::rotation(-theta) * core * Self::rotation(theta)
    }

    pub fn scale(&self, factor: C64) -> Self {
        Self(self.0 * factor)
    }

    pub fn get(&self, row: usize, col: usize) -> C64 {
        self.0[(row, col)]
    }

    pub fn apply(&self, v: &JonesVector) -> JonesVector {
        let out = self.0 * v.as_vector();
        JonesVector::new(out[0], out[1])
    }

    /// Conjugate transpose.
    pub fn adjoint(&self) -> Self {
        Self(self.0.map(|z| z.conj()).transpose())
    }

    pub fn trace(&self) -> C64 {
        self.0[(0, 0)] + self.0[(1, 1)]
    }

    pub fn determinant(&self) -> C64 {
        self.0[(0, 0)] * self.0[(1, 1)] - self.0[(0, 1)] * self.0[(1, 0)]
    }

    /// Returns the inverse, or `None` when the matrix is numerically singular.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.norm() < config::SINGULAR_DET_EPSILON {
            return None;
        }
        let m = &self.0;
        Some(Self::new(
            m[(1, 1)] / det,
            -m[(0, 1)] / det,
            -m[(1, 0)] / det,
            m[(0, 0)] / det,
        ))
    }

    /// Real diagonal and conjugate-symmetric off-diagonal within `tol`.
    pub fn is_hermitian(&self, tol: f64) -> bool {
        let m = &self.0;
        m[(0, 0)].im.abs() <= tol
            && m[(1, 1)].im.abs() <= tol
            && m[(0, 1)].approx_eq(m[(1, 0)].conj(), tol)
    }

    /// Hermitian and positive semi-definite, via the 2x2 closed form
    /// (trace and determinant both non-negative).
    pub fn is_physical_density(&self, tol: f64) -> bool {
        self.is_hermitian(tol) && self.trace().re >= -tol && self.determinant().re >= -tol
    }

    pub fn is_unitary(&self, tol: f64) -> bool {
        (*self * self.adjoint()).approx_eq(&Self::identity(), tol)
    }

    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| a.approx_eq(*b, tol))
    }

    /// Compares two operators while ignoring a global phase factor.
    pub fn approx_eq_up_to_phase(&self, other: &Self, tol: f64) -> bool {
        let (index, pivot) = self
            .0
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .map(|(i, z)| (i, *z))
            .unwrap_or((0, C64::new(0.0, 0.0)));

        if pivot.norm() < config::VEC_LENGTH_THRESHOLD {
            return other.0.iter().all(|z| z.norm() <= tol);
        }

        let target = other.0.iter().nth(index).copied().unwrap_or_default();
        if target.norm() < config::VEC_LENGTH_THRESHOLD {
            return false;
        }
        let ratio = target / pivot;
        let phase = ratio / ratio.norm();
        self.scale(phase).approx_eq(other, tol)
    }
}

impl Mul for JonesMatrix {
    type Output = JonesMatrix;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Add for JonesMatrix {
    type Output = JonesMatrix;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for JonesMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        writeln!(f, "[{:.6} {:.6}]", m[(0, 0)], m[(0, 1)])?;
        write!(f, "[{:.6} {:.6}]", m[(1, 0)], m[(1, 1)])
    }
}
