//! Discrete light representation used by older level data.
//!
//! Conversion in either direction is lossy: intensity is quantized to
//! sixteen levels, orientation to multiples of 45 degrees, and the degree of
//! polarization to a single sign.

use std::fmt;

use anyhow::Result;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::coherency::CoherencyMatrix;


/// Highest quantized intensity.
pub const MAX_LEVEL: u8 = 15;

/// Grid direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyDirection {
    North,
    East,
    South,
    West,
}

impl LegacyDirection {
    /// Direction in the scene plane, with north along `+y`.
    pub fn to_vector(self) -> Vector3<f64> {
        match self {
            LegacyDirection::North => Vector3::y(),
            LegacyDirection::East => Vector3::x(),
            LegacyDirection::South => -Vector3::y(),
            LegacyDirection::West => -Vector3::x(),
        }
    }
}

/// Orientation of the polarization axis in 45 degree steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum LegacyAngle {
    Deg0,
    Deg45,
    Deg90,
    Deg135,
}

impl LegacyAngle {
    pub fn from_degrees(degrees: u16) -> Result<Self> {
        match degrees {
            0 => Ok(LegacyAngle::Deg0),
            45 => Ok(LegacyAngle::Deg45),
            90 => Ok(LegacyAngle::Deg90),
            135 => Ok(LegacyAngle::Deg135),
            _ => Err(anyhow::anyhow!(
                "polarization angle must be 0, 45, 90 or 135 degrees, got {}",
                degrees
            )),
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            LegacyAngle::Deg0 => 0,
            LegacyAngle::Deg45 => 45,
            LegacyAngle::Deg90 => 90,
            LegacyAngle::Deg135 => 135,
        }
    }

    pub fn radians(self) -> f64 {
        f64::from(self.degrees()).to_radians()
    }

    /// Closest step to an orientation in radians, modulo 180 degrees.
    pub fn nearest(orientation: f64) -> Self {
        let degrees = orientation.to_degrees().rem_euclid(180.0);
        match ((degrees / 45.0).round() as u32) % 4 {
            0 => LegacyAngle::Deg0,
            1 => LegacyAngle::Deg45,
            2 => LegacyAngle::Deg90,
            _ => LegacyAngle::Deg135,
        }
    }
}

impl TryFrom<u16> for LegacyAngle {
    type Error = anyhow::Error;

    fn try_from(degrees: u16) -> Result<Self> {
        Self::from_degrees(degrees)
    }
}

impl From<LegacyAngle> for u16 {
    fn from(angle: LegacyAngle) -> Self {
        angle.degrees()
    }
}

/// A light beam as older level data stores it. Decoding goes through
/// [`LegacyLight::new`], so stored records are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLegacyLight")]
pub struct LegacyLight {
    pub direction: LegacyDirection,
    /// Quantized intensity, `0..=15`.
    pub intensity: u8,
    pub polarization: LegacyAngle,
    /// `+1` polarized, `-1` unpolarized.
    pub phase: i8,
}

#[derive(Deserialize)]
struct RawLegacyLight {
    direction: LegacyDirection,
    intensity: u8,
    polarization: u16,
    phase: i8,
}

impl TryFrom<RawLegacyLight> for LegacyLight {
    type Error = anyhow::Error;

    fn try_from(raw: RawLegacyLight) -> Result<Self> {
        Self::new(raw.direction, raw.intensity, raw.polarization, raw.phase)
    }
}

impl LegacyLight {
    /// Validates raw fields.
    pub fn new(direction: LegacyDirection, intensity: u8, degrees: u16, phase: i8) -> Result<Self> {
        if intensity > MAX_LEVEL {
            return Err(anyhow::anyhow!(
                "intensity level must be at most {}, got {}",
                MAX_LEVEL,
                intensity
            ));
        }
        if phase != 1 && phase != -1 {
            return Err(anyhow::anyhow!("phase must be +1 or -1, got {}", phase));
        }
        Ok(Self {
            direction,
            intensity,
            polarization: LegacyAngle::from_degrees(degrees)?,
            phase,
        })
    }

    /// Quantizes a state. Intensity is read on a `0..=1` scale.
    pub fn from_state(state: &CoherencyMatrix, direction: LegacyDirection) -> Self {
        let level = (state.intensity() * f64::from(MAX_LEVEL))
            .round()
            .clamp(0.0, f64::from(MAX_LEVEL));
        Self {
            direction,
            intensity: level as u8,
            polarization: LegacyAngle::nearest(state.orientation()),
            phase: if state.dop() > 0.5 { 1 } else { -1 },
        }
    }

    /// Expands back to a coherency matrix: fully polarized linear light for
    /// phase `+1`, unpolarized light otherwise.
    pub fn to_state(&self) -> CoherencyMatrix {
        let intensity = f64::from(self.intensity) / f64::from(MAX_LEVEL);
        if self.phase > 0 {
            CoherencyMatrix::linear(intensity, self.polarization.radians())
        } else {
            CoherencyMatrix::unpolarized(intensity)
        }
    }
}

impl fmt::Display for LegacyLight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {}/{} at {} deg (phase {:+})",
            self.direction,
            self.intensity,
            MAX_LEVEL,
            self.polarization.degrees(),
            self.phase
        )
    }
}
