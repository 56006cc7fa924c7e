//! Mueller matrices for Stokes-space descriptions of optical elements.
//!
//! A Jones operator maps onto a non-depolarizing Mueller matrix through
//! `M_ij = 1/2 tr(sigma_i J sigma_j J^†)`, where the Pauli basis is ordered to
//! match the Stokes convention of [`crate::stokes`]. Depolarizing elements
//! have no Jones form and are built directly.

use nalgebra::{Matrix4, Vector4};

use crate::complex::C64;
use crate::jones::JonesMatrix;
use crate::stokes::StokesVector;


/// A 4x4 real matrix acting on Stokes vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuellerMatrix(pub Matrix4<f64>);

/// Pauli matrices ordered as (I, S1, S2, S3) generators.
fn pauli(index: usize) -> JonesMatrix {
    let zero = C64::new(0.0, 0.0);
    let one = C64::new(1.0, 0.0);
    let i = C64::new(0.0, 1.0);
    match index {
        0 => JonesMatrix::identity(),
        1 => JonesMatrix::new(one, zero, zero, -one),
        2 => JonesMatrix::new(zero, one, one, zero),
        _ => JonesMatrix::new(zero, -i, i, zero),
    }
}

impl MuellerMatrix {
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    /// Non-depolarizing Mueller matrix of a Jones operator.
    pub fn from_jones(jones: &JonesMatrix) -> Self {
        let adjoint = jones.adjoint();
        let mut m = Matrix4::zeros();
        for row in 0..4 {
            for col in 0..4 {
                let product = pauli(row) * *jones * pauli(col) * adjoint;
                m[(row, col)] = 0.5 * product.trace().re;
            }
        }
        Self(m)
    }

    /// Ideal depolarizer reducing the polarized part by `1 - depolarization`.
    pub fn depolarizer(depolarization: f64) -> Self {
        let keep = 1.0 - depolarization.clamp(0.0, 1.0);
        Self(Matrix4::from_diagonal(&Vector4::new(1.0, keep, keep, keep)))
    }

    /// Stokes-frame rotation matching [`JonesMatrix::rotation`].
    #[rustfmt::skip]
    pub fn rotation(theta: f64) -> Self {
        let (s2, c2) = (2.0 * theta).sin_cos();
        Self(Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, c2, s2, 0.0,
            0.0, -s2, c2, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ))
    }

    /// The same element physically rotated to `theta`.
    pub fn rotated(&self, theta: f64) -> Self {
        Self(Self::rotation(-theta).0 * self.0 * Self::rotation(theta).0)
    }

    pub fn apply(&self, stokes: &StokesVector) -> StokesVector {
        let v = self.0 * Vector4::from(stokes.as_array());
        StokesVector::new(v[0], v[1], v[2], v[3])
    }

    /// Cascade: light passes through `self` first, then `next`.
    pub fn then(&self, next: &MuellerMatrix) -> Self {
        Self(next.0 * self.0)
    }

    /// `sqrt(M01^2 + M02^2 + M03^2) / M00`, clamped to `[0, 1]`.
    pub fn diattenuation(&self) -> f64 {
        let m = &self.0;
        if m[(0, 0)] <= 0.0 {
            return 0.0;
        }
        (m[(0, 1)].hypot(m[(0, 2)]).hypot(m[(0, 3)]) / m[(0, 0)]).min(1.0)
    }

    /// `sqrt(M10^2 + M20^2 + M30^2) / M00`, clamped to `[0, 1]`.
    pub fn polarizance(&self) -> f64 {
        let m = &self.0;
        if m[(0, 0)] <= 0.0 {
            return 0.0;
        }
        (m[(1, 0)].hypot(m[(2, 0)]).hypot(m[(3, 0)]) / m[(0, 0)]).min(1.0)
    }

    /// Depolarization index: 0 for non-depolarizing, 1 for an ideal depolarizer.
    pub fn depolarization_index(&self) -> f64 {
        let m = &self.0;
        let m00 = m[(0, 0)];
        if m00 <= 0.0 {
            return 1.0;
        }
        let frobenius_sq = m.iter().map(|x| x * x).sum::<f64>();
        let numerator = (frobenius_sq - m00 * m00).max(0.0).sqrt();
        (1.0 - numerator / (3.0_f64.sqrt() * m00)).clamp(0.0, 1.0)
    }
}
