//! Verb-style operations for game code.
//!
//! A [`LightHandle`] hides its coherency matrix; the only way to obtain one
//! is through the constructors here, so every handle a caller holds is
//! backed by a real state. Angles at this boundary are in degrees. Light is
//! taken at normal incidence in the standard frame, with `0` degrees along
//! the horizontal `s` axis.

use std::f64::consts::PI;

use crate::basis::PolarizationBasis;
use crate::coherency::CoherencyMatrix;
use crate::config;
use crate::legacy::{LegacyDirection, LegacyLight};
use crate::ray::SourcePolarization;
use crate::state::{JonesView, PolarizationState, StateRecord};
use crate::stokes::StokesVector;
use crate::surface::{Element, Surface};

#[cfg(test)]
mod tests {

    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn malus_through_the_facade() {
        let light = LightHandle::create_linear(0.0, 1.0);
        for (angle, expected) in [(0.0, 1.0), (30.0, 0.75), (45.0, 0.5), (60.0, 0.25), (90.0, 0.0)] {
            assert!(close(light.apply_polarizer(angle).summary().intensity, expected));
        }
    }

    #[test]
    fn unpolarized_source_through_polarizer() {
        let light = LightHandle::create_source(SourcePolarization::Unpolarized, 1.0);
        let out = light.apply_polarizer(30.0).summary();
        assert!(close(out.intensity, 0.5));
        assert!(close(out.dop, 1.0));
        assert!((out.orientation_deg - 30.0).abs() < 1e-6);
    }

    #[test]
    fn quarter_wave_makes_circular_light() {
        let light = LightHandle::create_linear(0.0, 1.0).apply_wave_plate(45.0, 90.0);
        let stokes = light.to_stokes();
        assert!(close(stokes.s3.abs(), 1.0));
        assert!(light.state().is_circular());
        match light.to_jones() {
            JonesView::Available(v) => assert!(close(v.s.norm(), v.p.norm())),
            other => panic!("expected a Jones vector, got {:?}", other),
        }
    }

    #[test]
    fn rotator_and_mirror_preserve_intensity() {
        let light = LightHandle::create_linear(10.0, 2.0);
        let rotated = light.apply_rotator(35.0);
        assert!(close(rotated.summary().intensity, 2.0));
        assert!((rotated.summary().orientation_deg - 45.0).abs() < 1e-6);
        let reflected = rotated.apply_mirror();
        assert!(close(reflected.summary().intensity, 2.0));
        assert!((reflected.summary().orientation_deg - 45.0).abs() < 1e-6);
    }

    #[test]
    fn attenuation_scales_intensity() {
        let light = LightHandle::create_linear(0.0, 1.0).apply_attenuation(0.25);
        assert!(close(light.summary().intensity, 0.25));
        // out-of-range factors are clamped
        assert!(close(light.apply_attenuation(3.0).summary().intensity, 0.25));
    }

    #[test]
    fn beam_splitter_conserves() {
        let light = LightHandle::create_linear(45.0, 1.0);
        let (transmitted, reflected) = light.apply_beam_splitter(1.0);
        assert!(close(transmitted.summary().intensity, 0.5));
        assert!(close(reflected.summary().intensity, 0.5));
        assert!((transmitted.summary().orientation_deg.abs() - 90.0).abs() < 1e-6);
        assert!(reflected.summary().orientation_deg.abs() < 1e-6);

        let (dark, all) = LightHandle::create_linear(0.0, 1.0).apply_beam_splitter(1.0);
        assert!(dark.summary().intensity < 1e-12);
        assert!(close(all.summary().intensity, 1.0));
    }

    #[test]
    fn partial_light_has_no_jones_vector() {
        let light = LightHandle::create_source(SourcePolarization::Partial { dop: 0.5, angle: 0.0 }, 1.0);
        assert!(matches!(light.to_jones(), JonesView::PartiallyPolarized { .. }));
        let legacy = light.to_legacy(LegacyDirection::North);
        assert_eq!(legacy.phase, -1);
        assert_eq!(legacy.intensity, 15);
    }

    #[test]
    fn legacy_light_enters_the_facade() {
        let legacy = LegacyLight::new(LegacyDirection::East, 15, 90, 1).unwrap();
        let light = LightHandle::from_legacy(&legacy);
        assert!(close(light.apply_polarizer(0.0).summary().intensity, 0.0));
        assert!(close(light.to_record().stokes[1], -1.0));
    }
}

/// The fields level logic checks against its targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSummary {
    pub intensity: f64,
    pub dop: f64,
    pub orientation_deg: f64,
}

/// Opaque light state produced and consumed by the verbs below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightHandle {
    coherency: CoherencyMatrix,
}

impl LightHandle {
    fn wrap(coherency: CoherencyMatrix) -> Self {
        Self { coherency }
    }

    /// Creates a source. Angles inside `polarization` are radians, as in
    /// scene files.
    pub fn create_source(polarization: SourcePolarization, intensity: f64) -> Self {
        Self::wrap(polarization.to_state(intensity.max(0.0)))
    }

    /// Fully polarized linear source at `angle_deg`.
    pub fn create_linear(angle_deg: f64, intensity: f64) -> Self {
        Self::create_source(
            SourcePolarization::Linear {
                angle: angle_deg.to_radians(),
            },
            intensity,
        )
    }

    pub fn from_legacy(light: &LegacyLight) -> Self {
        Self::wrap(light.to_state())
    }

    fn apply_element(&self, element: Element) -> Self {
        match element.jones_matrix(config::DEFAULT_WAVELENGTH) {
            Some(m) => Self::wrap(self.coherency.apply_operator(&m)),
            None => *self,
        }
    }

    pub fn apply_polarizer(&self, angle_deg: f64) -> Self {
        self.apply_element(Element::Polarizer {
            angle: angle_deg.to_radians(),
        })
    }

    /// Wave plate with its fast axis at `fast_axis_deg` and retardance
    /// `retardance_deg` (90 for a quarter-wave plate).
    pub fn apply_wave_plate(&self, fast_axis_deg: f64, retardance_deg: f64) -> Self {
        let Surface { element, .. } =
            Surface::wave_plate(fast_axis_deg.to_radians(), retardance_deg.to_radians());
        self.apply_element(element)
    }

    pub fn apply_rotator(&self, angle_deg: f64) -> Self {
        self.apply_element(Element::Rotator {
            angle: angle_deg.to_radians(),
        })
    }

    /// Ideal metallic mirror at normal incidence.
    pub fn apply_mirror(&self) -> Self {
        self.apply_element(Element::Mirror { phase: PI })
    }

    pub fn apply_attenuation(&self, transmission: f64) -> Self {
        self.apply_element(Element::Attenuator { transmission })
    }

    /// Splits into the transmitted (vertical) and reflected (horizontal)
    /// parts. A branch that carries no light comes back dark.
    pub fn apply_beam_splitter(&self, efficiency: f64) -> (Self, Self) {
        let splitter = Surface::beam_splitter(efficiency.clamp(0.0, 1.0));
        let interaction = splitter.interact_local(
            &self.coherency,
            &PolarizationBasis::standard(),
            config::DEFAULT_WAVELENGTH,
        );
        let branch = |emission: Option<crate::surface::Emission>| {
            Self::wrap(emission.map_or_else(CoherencyMatrix::zero, |e| e.state))
        };
        (branch(interaction.transmitted), branch(interaction.reflected))
    }

    pub fn state(&self) -> PolarizationState {
        PolarizationState::new(self.coherency)
    }

    pub fn to_stokes(&self) -> StokesVector {
        self.coherency.stokes()
    }

    pub fn to_jones(&self) -> JonesView {
        self.state().jones()
    }

    pub fn to_legacy(&self, direction: LegacyDirection) -> LegacyLight {
        LegacyLight::from_state(&self.coherency, direction)
    }

    pub fn to_record(&self) -> StateRecord {
        self.state().to_record()
    }

    pub fn summary(&self) -> LightSummary {
        LightSummary {
            intensity: self.coherency.intensity(),
            dop: self.coherency.dop(),
            orientation_deg: self.coherency.orientation().to_degrees(),
        }
    }
}
