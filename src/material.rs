//! Dispersion models and material presets.
//!
//! Wavelengths are vacuum wavelengths in nanometres throughout. Cauchy
//! coefficients use micrometres, so `B` is in µm².

use serde::{Deserialize, Serialize};

use crate::config;


/// Two-term Cauchy model `n = A + B / lambda^2` with lambda in micrometres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CauchyModel {
    pub a: f64,
    pub b: f64,
}

impl CauchyModel {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    /// Wavelength independent index.
    pub fn constant(n: f64) -> Self {
        Self { a: n, b: 0.0 }
    }

    pub fn index(&self, wavelength_nm: f64) -> f64 {
        let lambda_um = wavelength_nm / 1000.0;
        if lambda_um.abs() < config::DIVISION_EPSILON {
            return self.a;
        }
        self.a + self.b / (lambda_um * lambda_um)
    }
}

/// Ordinary and extraordinary indices of a uniaxial crystal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Birefringence {
    pub ordinary: CauchyModel,
    pub extraordinary: CauchyModel,
}

impl Birefringence {
    pub fn new(ordinary: CauchyModel, extraordinary: CauchyModel) -> Self {
        Self {
            ordinary,
            extraordinary,
        }
    }

    /// Calcite, n_o = 1.658 and n_e = 1.486 at the sodium D line.
    pub fn calcite() -> Self {
        Self::new(CauchyModel::new(1.6384, 0.0068), CauchyModel::new(1.4774, 0.0030))
    }

    /// Crystalline quartz.
    pub fn quartz() -> Self {
        Self::new(CauchyModel::new(1.5338, 0.0036), CauchyModel::new(1.5427, 0.0037))
    }

    /// Fixed `n_e - n_o`, ignoring dispersion.
    pub fn constant(delta_n: f64) -> Self {
        Self::new(CauchyModel::constant(1.0), CauchyModel::constant(1.0 + delta_n))
    }

    /// `n_e - n_o` at the given wavelength.
    pub fn delta_n(&self, wavelength_nm: f64) -> f64 {
        self.extraordinary.index(wavelength_nm) - self.ordinary.index(wavelength_nm)
    }

    /// Phase retardance `2 pi d dn / lambda` of a plate `thickness_um` thick.
    pub fn retardance(&self, thickness_um: f64, wavelength_nm: f64) -> f64 {
        if wavelength_nm.abs() < config::DIVISION_EPSILON {
            return 0.0;
        }
        let path_difference_nm = thickness_um * 1000.0 * self.delta_n(wavelength_nm);
        2.0 * std::f64::consts::PI * path_difference_nm / wavelength_nm
    }
}

/// Medium metadata carried alongside a polarization state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub index: f64,
}

impl Material {
    pub fn new(name: impl Into<String>, index: f64) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    pub fn vacuum() -> Self {
        Self::new("vacuum", 1.0)
    }

    pub fn water() -> Self {
        Self::new("water", 1.333)
    }

    pub fn crown_glass() -> Self {
        Self::new("crown glass", 1.52)
    }
}

/// Optical rotation of a chiral solution in radians, from the specific
/// rotation in degrees per (dm g/ml), the path length in decimetres and the
/// concentration in g/ml.
pub fn specific_rotation_angle(specific_rotation_deg: f64, path_dm: f64, concentration: f64) -> f64 {
    (specific_rotation_deg * path_dm * concentration).to_radians()
}
