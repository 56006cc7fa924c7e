//! Unified view over a polarization state.
//!
//! The coherency matrix is the ground truth; Stokes parameters, the
//! polarization ellipse and (when it exists) a Jones vector are derived from
//! it on demand. A Jones vector can only describe fully polarized light, so
//! [`PolarizationState::jones`] reports the other two cases explicitly.

use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::coherency::CoherencyMatrix;
use crate::complex::{C64, ComplexExt};
use crate::config;
use crate::jones::{JonesMatrix, JonesVector};
use crate::material::Material;
use crate::output::round_to;
use crate::stokes::{Ellipse, StokesVector};

#[cfg(test)]
mod tests {

    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn jones_view_three_outcomes() {
        let polarized = PolarizationState::linear(1.0, 0.3);
        match polarized.jones() {
            JonesView::Available(v) => {
                let rebuilt = CoherencyMatrix::from_jones_vector(&v);
                assert!(rebuilt.approx_eq(polarized.coherency(), 1e-12));
            }
            other => panic!("expected a Jones vector, got {:?}", other),
        }

        let partial = PolarizationState::partial(1.0, 0.5, 0.0);
        match partial.jones() {
            JonesView::PartiallyPolarized { dop } => assert!((dop - 0.5).abs() < 1e-12),
            other => panic!("expected partial polarization, got {:?}", other),
        }

        assert_eq!(PolarizationState::dark().jones(), JonesView::Dark);
    }

    #[test]
    fn jones_of_vertical_light() {
        let state = PolarizationState::linear(2.0, PI / 2.0);
        let JonesView::Available(v) = state.jones() else {
            panic!("vertical light is fully polarized");
        };
        assert!(v.s.norm() < 1e-9);
        assert!((v.p.norm_sqr() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn right_circular_jones_phase() {
        let state = PolarizationState::circular(1.0, true);
        let JonesView::Available(v) = state.jones() else {
            panic!("circular light is fully polarized");
        };
        assert!(CoherencyMatrix::from_jones_vector(&v).approx_eq(state.coherency(), 1e-12));
        assert!(state.stokes().s3 > 0.0);
    }

    #[test]
    fn record_rounds_and_rebuilds() {
        let state = PolarizationState::elliptical(1.234567891, 0.4, 0.2)
            .with_material(Material::crown_glass());
        let record = state.to_record();
        assert_eq!(record.intensity, 1.234568);
        assert!(record.jones.is_some());
        assert_eq!(record.material.as_ref().map(|m| m.name.as_str()), Some("crown glass"));

        let json = serde_json::to_string(&record).unwrap();
        let decoded: StateRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);

        let rebuilt = PolarizationState::from_record(&decoded).unwrap();
        assert!((rebuilt.intensity() - state.intensity()).abs() < 1e-6);
        assert!((rebuilt.orientation() - state.orientation()).abs() < 1e-5);
        assert_eq!(rebuilt.material(), state.material());
    }

    #[test]
    fn unpolarized_record_has_no_jones() {
        let record = PolarizationState::unpolarized(1.0).to_record();
        assert!(record.jones.is_none());
        assert!(record.is_unpolarized);
        assert!(!record.is_linear);
    }

    #[test]
    fn from_record_rejects_unphysical_stokes() {
        let mut record = PolarizationState::linear(1.0, 0.0).to_record();
        record.stokes = [1.0, 1.0, 1.0, 0.0];
        assert!(PolarizationState::from_record(&record).is_err());
    }

    #[test]
    fn validation_reports_issues() {
        assert!(PolarizationState::linear(1.0, 0.2).validate().is_empty());
        assert!(PolarizationState::linear(1.0, 0.2).is_valid());

        let negative = PolarizationState::new(CoherencyMatrix::unpolarized(-1.0));
        assert!(negative
            .validate()
            .iter()
            .any(|issue| matches!(issue, ValidityIssue::NegativeIntensity(_))));

        let one = C64::new(1.0, 0.0);
        let zero = C64::new(0.0, 0.0);
        let skew = PolarizationState::new(CoherencyMatrix::from_matrix(JonesMatrix::new(
            one,
            one,
            zero,
            one,
        )));
        assert!(skew.validate().contains(&ValidityIssue::NotHermitian));

        let indefinite = PolarizationState::new(CoherencyMatrix::from_matrix(JonesMatrix::new(
            one, one * 2.0, one * 2.0, one,
        )));
        assert!(indefinite
            .validate()
            .iter()
            .any(|issue| matches!(issue, ValidityIssue::NotPositiveSemidefinite { .. })));
    }

    #[test]
    fn applying_operators_keeps_material() {
        let state = PolarizationState::linear(1.0, 0.0).with_material(Material::water());
        let out = state.apply(&JonesMatrix::linear_polarizer(PI / 4.0));
        assert!((out.intensity() - 0.5).abs() < 1e-12);
        assert_eq!(out.material(), Some(&Material::water()));
    }
}

/// The Jones vector of a state, if it has one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JonesView {
    Available(JonesVector),
    /// The degree of polarization is below the fully polarized threshold.
    PartiallyPolarized { dop: f64 },
    Dark,
}

/// A physical constraint a coherency matrix fails.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidityIssue {
    NonFinite,
    NegativeIntensity(f64),
    NotHermitian,
    NotPositiveSemidefinite { determinant: f64 },
}

impl fmt::Display for ValidityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidityIssue::NonFinite => write!(f, "matrix contains non-finite entries"),
            ValidityIssue::NegativeIntensity(i) => write!(f, "negative intensity {}", i),
            ValidityIssue::NotHermitian => write!(f, "matrix is not Hermitian"),
            ValidityIssue::NotPositiveSemidefinite { determinant } => {
                write!(f, "matrix is not positive semi-definite (det = {})", determinant)
            }
        }
    }
}

/// Polarization state with optional medium metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarizationState {
    coherency: CoherencyMatrix,
    material: Option<Material>,
}

impl PolarizationState {
    pub fn new(coherency: CoherencyMatrix) -> Self {
        Self {
            coherency,
            material: None,
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn dark() -> Self {
        Self::new(CoherencyMatrix::zero())
    }

    pub fn linear(intensity: f64, angle: f64) -> Self {
        Self::new(CoherencyMatrix::linear(intensity, angle))
    }

    pub fn circular(intensity: f64, right: bool) -> Self {
        Self::new(CoherencyMatrix::circular(intensity, right))
    }

    pub fn elliptical(intensity: f64, orientation: f64, ellipticity: f64) -> Self {
        Self::new(CoherencyMatrix::elliptical(intensity, orientation, ellipticity))
    }

    pub fn unpolarized(intensity: f64) -> Self {
        Self::new(CoherencyMatrix::unpolarized(intensity))
    }

    pub fn partial(intensity: f64, dop: f64, angle: f64) -> Self {
        Self::new(CoherencyMatrix::partial(intensity, dop, angle))
    }

    pub fn from_stokes(stokes: &StokesVector) -> Self {
        Self::new(CoherencyMatrix::from_stokes(stokes))
    }

    pub fn from_jones(v: &JonesVector) -> Self {
        Self::new(CoherencyMatrix::from_jones_vector(v))
    }

    pub fn coherency(&self) -> &CoherencyMatrix {
        &self.coherency
    }

    pub fn material(&self) -> Option<&Material> {
        self.material.as_ref()
    }

    pub fn intensity(&self) -> f64 {
        self.coherency.intensity()
    }

    pub fn dop(&self) -> f64 {
        self.coherency.dop()
    }

    pub fn stokes(&self) -> StokesVector {
        self.coherency.stokes()
    }

    pub fn ellipse(&self) -> Ellipse {
        self.stokes().ellipse()
    }

    pub fn orientation(&self) -> f64 {
        self.coherency.orientation()
    }

    pub fn ellipticity(&self) -> f64 {
        self.coherency.ellipticity()
    }

    /// Jones vector of the state, with the global phase fixed so the larger
    /// component is real and positive.
    pub fn jones(&self) -> JonesView {
        if self.intensity() < config::INTENSITY_EPSILON {
            return JonesView::Dark;
        }
        let dop = self.dop();
        if dop < config::FULLY_POLARIZED_DOP {
            return JonesView::PartiallyPolarized { dop };
        }
        let (polarized, _) = self.coherency.decompose();
        let m = polarized.matrix();
        let j00 = m.get(0, 0).re.max(0.0);
        let j11 = m.get(1, 1).re.max(0.0);
        let vector = if j00 >= j11 {
            let s = j00.sqrt();
            JonesVector::new(C64::new(s, 0.0), m.get(1, 0).safe_div(C64::new(s, 0.0)))
        } else {
            let p = j11.sqrt();
            JonesVector::new(m.get(0, 1).safe_div(C64::new(p, 0.0)), C64::new(p, 0.0))
        };
        JonesView::Available(vector)
    }

    pub fn is_linear(&self) -> bool {
        self.coherency.is_linear()
    }

    pub fn is_circular(&self) -> bool {
        self.coherency.is_circular()
    }

    pub fn is_unpolarized(&self) -> bool {
        self.coherency.is_unpolarized()
    }

    pub fn is_fully_polarized(&self) -> bool {
        self.coherency.is_fully_polarized()
    }

    /// New state after the Jones operator `m`, keeping the material.
    pub fn apply(&self, m: &JonesMatrix) -> Self {
        Self {
            coherency: self.coherency.apply_operator(m),
            material: self.material.clone(),
        }
    }

    /// Lists every physical constraint the state violates.
    pub fn validate(&self) -> Vec<ValidityIssue> {
        let m = self.coherency.matrix();
        if m.0.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
            return vec![ValidityIssue::NonFinite];
        }
        let tol = config::HERMITIAN_TOLERANCE;
        let mut issues = Vec::new();
        let intensity = self.intensity();
        if intensity < -tol {
            issues.push(ValidityIssue::NegativeIntensity(intensity));
        }
        if !m.is_hermitian(tol) {
            issues.push(ValidityIssue::NotHermitian);
        }
        let determinant = self.coherency.determinant();
        if determinant < -tol {
            issues.push(ValidityIssue::NotPositiveSemidefinite { determinant });
        }
        issues
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Flat, rounded snapshot of the state.
    pub fn to_record(&self) -> StateRecord {
        let precision = config::RECORD_PRECISION;
        let r = |x: f64| round_to(x, precision);
        let stokes = self.stokes();
        let ellipse = self.ellipse();
        let jones = match self.jones() {
            JonesView::Available(v) => Some([r(v.s.re), r(v.s.im), r(v.p.re), r(v.p.im)]),
            _ => None,
        };
        StateRecord {
            intensity: r(self.intensity()),
            dop: r(self.dop()),
            stokes: stokes.as_array().map(r),
            orientation_deg: r(ellipse.orientation.to_degrees()),
            ellipticity_deg: r(ellipse.ellipticity.to_degrees()),
            jones,
            is_linear: self.is_linear(),
            is_circular: self.is_circular(),
            is_unpolarized: self.is_unpolarized(),
            is_fully_polarized: self.is_fully_polarized(),
            material: self.material.clone(),
        }
    }

    /// Rebuilds a state from the Stokes values of a record; every other
    /// field is derived and therefore ignored.
    pub fn from_record(record: &StateRecord) -> Result<Self> {
        let [s0, s1, s2, s3] = record.stokes;
        let stokes = StokesVector::new(s0, s1, s2, s3);
        // rounded records may overshoot |S| <= S0 by the rounding step
        let tol = 10f64.powi(-config::RECORD_PRECISION);
        if !stokes.is_physical(tol) {
            stokes.validate()?;
        }
        let state = Self::from_stokes(&stokes);
        Ok(match &record.material {
            Some(material) => state.with_material(material.clone()),
            None => state,
        })
    }
}

impl fmt::Display for PolarizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ellipse = self.ellipse();
        write!(
            f,
            "I={:.6} DoP={:.6} psi={:.3}° chi={:.3}° S={}",
            self.intensity(),
            self.dop(),
            ellipse.orientation.to_degrees(),
            ellipse.ellipticity.to_degrees(),
            self.stokes()
        )
    }
}

/// Serialized form of a [`PolarizationState`]. Numeric fields are rounded for
/// stable snapshot comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub intensity: f64,
    pub dop: f64,
    /// `[S0, S1, S2, S3]`
    pub stokes: [f64; 4],
    pub orientation_deg: f64,
    pub ellipticity_deg: f64,
    /// `[Re s, Im s, Re p, Im p]` when the state is fully polarized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jones: Option<[f64; 4]>,
    pub is_linear: bool,
    pub is_circular: bool,
    pub is_unpolarized: bool,
    pub is_fully_polarized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
}
