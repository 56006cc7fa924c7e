//! The coherency (polarization density) matrix.
//!
//! `J = <E E^†>` is the ground truth for every light state in the engine. It
//! represents fully, partially and un-polarized light alike, transforms under
//! any Jones operator as `J' = M J M^†`, and superposes incoherently by plain
//! addition. Values are immutable: every operation returns a new matrix.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use crate::complex::C64;
use crate::config;
use crate::jones::{JonesMatrix, JonesVector};
use crate::stokes::StokesVector;


/// A 2x2 Hermitian, positive semi-definite polarization state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoherencyMatrix {
    j: JonesMatrix,
}

impl CoherencyMatrix {
    /// Wraps raw matrix entries. No validation is performed; use
    /// [`CoherencyMatrix::is_physical`] to check the result.
    pub fn from_matrix(j: JonesMatrix) -> Self {
        Self { j }
    }

    /// Builds the Hermitian matrix `[[jss, jsp], [conj(jsp), jpp]]`.
    pub fn from_parts(jss: f64, jsp: C64, jpp: f64) -> Self {
        Self::from_matrix(JonesMatrix::new(
            C64::new(jss, 0.0),
            jsp,
            jsp.conj(),
            C64::new(jpp, 0.0),
        ))
    }

    pub fn zero() -> Self {
        Self::from_matrix(JonesMatrix::zero())
    }

    /// Outer product `E E^†` of a fully polarized field.
    pub fn from_jones_vector(v: &JonesVector) -> Self {
        Self::from_matrix(JonesMatrix::new(
            v.s * v.s.conj(),
            v.s * v.p.conj(),
            v.p * v.s.conj(),
            v.p * v.p.conj(),
        ))
    }

    pub fn from_stokes(stokes: &StokesVector) -> Self {
        let StokesVector { s0, s1, s2, s3 } = *stokes;
        Self::from_matrix(JonesMatrix::new(
            C64::new(0.5 * (s0 + s1), 0.0),
            C64::new(0.5 * s2, -0.5 * s3),
            C64::new(0.5 * s2, 0.5 * s3),
            C64::new(0.5 * (s0 - s1), 0.0),
        ))
    }

    /// Fully polarized linear light at `angle` from the s axis.
    pub fn linear(intensity: f64, angle: f64) -> Self {
        Self::from_jones_vector(&JonesVector::linear(angle)).scale(intensity)
    }

    pub fn circular(intensity: f64, right: bool) -> Self {
        Self::from_jones_vector(&JonesVector::circular(right)).scale(intensity)
    }

    pub fn elliptical(intensity: f64, orientation: f64, ellipticity: f64) -> Self {
        Self::from_jones_vector(&JonesVector::elliptical(orientation, ellipticity)).scale(intensity)
    }

    pub fn unpolarized(intensity: f64) -> Self {
        Self::from_matrix(JonesMatrix::identity()).scale(0.5 * intensity)
    }

    /// Partially polarized light: a linear component at `angle` carrying the
    /// fraction `dop` of the intensity, the rest unpolarized.
    pub fn partial(intensity: f64, dop: f64, angle: f64) -> Self {
        let dop = dop.clamp(0.0, 1.0);
        Self::linear(intensity * dop, angle) + Self::unpolarized(intensity * (1.0 - dop))
    }

    pub fn matrix(&self) -> &JonesMatrix {
        &self.j
    }

    pub fn intensity(&self) -> f64 {
        self.j.trace().re
    }

    pub fn determinant(&self) -> f64 {
        self.j.determinant().re
    }

    /// Degree of polarization `sqrt(1 - 4 det / tr^2)`, clamped to `[0, 1]`
    /// and defined as zero for dark light.
    pub fn dop(&self) -> f64 {
        let intensity = self.intensity();
        if intensity < config::INTENSITY_EPSILON {
            return 0.0;
        }
        let ratio = 4.0 * self.determinant() / (intensity * intensity);
        (1.0 - ratio).clamp(0.0, 1.0).sqrt().clamp(0.0, 1.0)
    }

    pub fn polarized_intensity(&self) -> f64 {
        self.dop() * self.intensity()
    }

    pub fn stokes(&self) -> StokesVector {
        let m = &self.j;
        let j00 = m.get(0, 0).re;
        let j11 = m.get(1, 1).re;
        let j01 = m.get(0, 1);
        StokesVector::new(j00 + j11, j00 - j11, 2.0 * j01.re, -2.0 * j01.im)
    }

    /// Orientation angle of the polarized part in radians.
    pub fn orientation(&self) -> f64 {
        self.stokes().orientation()
    }

    /// Ellipticity angle of the polarized part in radians.
    pub fn ellipticity(&self) -> f64 {
        self.stokes().ellipticity()
    }

    /// Similarity transform `M J M^†`.
    pub fn apply_operator(&self, m: &JonesMatrix) -> Self {
        Self::from_matrix(*m * self.j * m.adjoint())
    }

    /// Blends toward the unpolarized state of equal intensity. `fraction` is
    /// clamped to `[0, 1]`; 1 yields fully unpolarized light.
    pub fn depolarize(&self, fraction: f64) -> Self {
        let f = fraction.clamp(0.0, 1.0);
        let target = Self::unpolarized(self.intensity());
        Self::from_matrix(self.j.scale(C64::new(1.0 - f, 0.0)) + target.j.scale(C64::new(f, 0.0)))
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self::from_matrix(self.j.scale(C64::new(factor, 0.0)))
    }

    /// Splits into a fully polarized part and an unpolarized part.
    pub fn decompose(&self) -> (CoherencyMatrix, CoherencyMatrix) {
        let unpolarized = Self::unpolarized(self.intensity() * (1.0 - self.dop()));
        let polarized =
            Self::from_matrix(self.j + unpolarized.j.scale(C64::new(-1.0, 0.0)));
        (polarized, unpolarized)
    }

    pub fn is_linear(&self) -> bool {
        self.is_linear_with(config::CLASSIFY_TOLERANCE)
    }

    /// The polarized part is present and carries no circular component.
    pub fn is_linear_with(&self, tol: f64) -> bool {
        let s = self.stokes();
        s.s0 >= config::INTENSITY_EPSILON && s.dop() > tol && s.docp() <= tol
    }

    pub fn is_circular(&self) -> bool {
        self.is_circular_with(config::CLASSIFY_TOLERANCE)
    }

    /// The polarized part is present and carries no linear component.
    pub fn is_circular_with(&self, tol: f64) -> bool {
        let s = self.stokes();
        s.s0 >= config::INTENSITY_EPSILON && s.dop() > tol && s.dolp() <= tol
    }

    pub fn is_unpolarized(&self) -> bool {
        self.is_unpolarized_with(config::CLASSIFY_TOLERANCE)
    }

    pub fn is_unpolarized_with(&self, tol: f64) -> bool {
        self.dop() <= tol
    }

    pub fn is_fully_polarized(&self) -> bool {
        self.is_fully_polarized_with(config::CLASSIFY_TOLERANCE)
    }

    pub fn is_fully_polarized_with(&self, tol: f64) -> bool {
        self.intensity() >= config::INTENSITY_EPSILON && self.dop() >= 1.0 - tol
    }

    pub fn is_hermitian(&self) -> bool {
        self.j.is_hermitian(config::HERMITIAN_TOLERANCE)
    }

    /// Hermitian and positive semi-definite within the default tolerance.
    pub fn is_physical(&self) -> bool {
        self.is_physical_with(config::HERMITIAN_TOLERANCE)
    }

    pub fn is_physical_with(&self, tol: f64) -> bool {
        self.j.is_physical_density(tol)
    }

    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        self.j.approx_eq(&other.j, tol)
    }
}

impl Default for CoherencyMatrix {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for CoherencyMatrix {
    type Output = Self;

    /// Incoherent superposition.
    fn add(self, other: Self) -> Self {
        Self::from_matrix(self.j + other.j)
    }
}

impl Sum for CoherencyMatrix {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, j| acc + j)
    }
}

impl fmt::Display for CoherencyMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "I = {:.6}, DoP = {:.6}, S = {}",
            self.intensity(),
            self.dop(),
            self.stokes()
        )
    }
}
