//! Stokes parameters and the polarization ellipse.
//!
//! The four Stokes parameters are the measurable, real-valued readout of a
//! coherency matrix. Right-handed light has `S3 > 0`.

use std::fmt;
use std::ops::{Add, Mul};

use anyhow::Result;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config;


/// Handedness of the polarization ellipse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Linear,
    Right,
    Left,
}

/// Geometric description of the polarized part of a state. Angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    /// Major axis angle from the s axis, in `(-pi/2, pi/2]`.
    pub orientation: f64,
    /// Ellipticity angle in `[-pi/4, pi/4]`.
    pub ellipticity: f64,
    pub semi_major: f64,
    pub semi_minor: f64,
    pub handedness: Handedness,
}

/// A set of Stokes parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StokesVector {
    pub s0: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl StokesVector {
    pub fn new(s0: f64, s1: f64, s2: f64, s3: f64) -> Self {
        Self { s0, s1, s2, s3 }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Builds Stokes parameters from six analyzer readings: horizontal,
    /// vertical, +45, -45, right and left circular. `S0` averages the three
    /// independent estimates.
    pub fn from_intensities(h: f64, v: f64, d: f64, a: f64, r: f64, l: f64) -> Self {
        Self {
            s0: (h + v + d + a + r + l) / 3.0,
            s1: h - v,
            s2: d - a,
            s3: r - l,
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.s0, self.s1, self.s2, self.s3]
    }

    /// Intensity of the fully polarized part, `|(S1, S2, S3)|`.
    pub fn polarized_intensity(&self) -> f64 {
        self.s1.hypot(self.s2).hypot(self.s3)
    }

    /// Degree of polarization, zero for dark light.
    pub fn dop(&self) -> f64 {
        if self.s0 < config::INTENSITY_EPSILON {
            return 0.0;
        }
        (self.polarized_intensity() / self.s0).clamp(0.0, 1.0)
    }

    /// Degree of linear polarization.
    pub fn dolp(&self) -> f64 {
        if self.s0 < config::INTENSITY_EPSILON {
            return 0.0;
        }
        (self.s1.hypot(self.s2) / self.s0).clamp(0.0, 1.0)
    }

    /// Degree of circular polarization.
    pub fn docp(&self) -> f64 {
        if self.s0 < config::INTENSITY_EPSILON {
            return 0.0;
        }
        (self.s3.abs() / self.s0).clamp(0.0, 1.0)
    }

    /// Normalised Poincaré sphere coordinates. The radius equals the DoP.
    pub fn poincare(&self) -> Vector3<f64> {
        if self.s0 < config::INTENSITY_EPSILON {
            return Vector3::zeros();
        }
        Vector3::new(self.s1, self.s2, self.s3) / self.s0
    }

    /// Orientation angle `0.5 * atan2(S2, S1)`, zero when undefined.
    pub fn orientation(&self) -> f64 {
        if self.s1.hypot(self.s2) < config::INTENSITY_EPSILON {
            return 0.0;
        }
        0.5 * self.s2.atan2(self.s1)
    }

    /// Ellipticity angle of the polarized part, zero when undefined.
    pub fn ellipticity(&self) -> f64 {
        let p = self.polarized_intensity();
        if p < config::INTENSITY_EPSILON {
            return 0.0;
        }
        0.5 * (self.s3 / p).clamp(-1.0, 1.0).asin()
    }

    pub fn ellipse(&self) -> Ellipse {
        let orientation = self.orientation();
        let ellipticity = self.ellipticity();
        let amplitude = self.polarized_intensity().sqrt();

        let handedness = if ellipticity.to_degrees().abs() < 0.1 {
            Handedness::Linear
        } else if ellipticity > 0.0 {
            Handedness::Right
        } else {
            Handedness::Left
        };

        Ellipse {
            orientation,
            ellipticity,
            semi_major: amplitude * ellipticity.cos(),
            semi_minor: amplitude * ellipticity.sin().abs(),
            handedness,
        }
    }

    /// Splits the state into its fully polarized and unpolarized parts.
    pub fn decompose(&self) -> (StokesVector, StokesVector) {
        let p = self.polarized_intensity().min(self.s0.max(0.0));
        let scale = if self.polarized_intensity() > 0.0 {
            p / self.polarized_intensity()
        } else {
            0.0
        };
        let polarized = Self::new(p, self.s1 * scale, self.s2 * scale, self.s3 * scale);
        let unpolarized = Self::new(self.s0 - p, 0.0, 0.0, 0.0);
        (polarized, unpolarized)
    }

    /// Non-negative intensity and `|S| <= S0` within `tol`.
    pub fn is_physical(&self, tol: f64) -> bool {
        self.s0 >= -tol && self.polarized_intensity() <= self.s0 * (1.0 + tol) + tol
    }

    /// Checks physical realizability, describing the violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.s0 < 0.0 {
            return Err(anyhow::anyhow!("S0 must be non-negative, got {}", self.s0));
        }
        if !self.is_physical(config::HERMITIAN_TOLERANCE) {
            return Err(anyhow::anyhow!(
                "invalid Stokes vector: |(S1, S2, S3)| = {:.6} exceeds S0 = {:.6}",
                self.polarized_intensity(),
                self.s0
            ));
        }
        Ok(())
    }
}

impl Add for StokesVector {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            s0: self.s0 + other.s0,
            s1: self.s1 + other.s1,
            s2: self.s2 + other.s2,
            s3: self.s3 + other.s3,
        }
    }
}

impl Mul<f64> for StokesVector {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self {
            s0: self.s0 * rhs,
            s1: self.s1 * rhs,
            s2: self.s2 * rhs,
            s3: self.s3 * rhs,
        }
    }
}

impl fmt::Display for StokesVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}, {:.6}, {:.6}]",
            self.s0, self.s1, self.s2, self.s3
        )
    }
}
