//! Optical elements and their interaction with polarized light.
//!
//! Every element acts in the local interface frame of the surface it sits on:
//! the incoming state is re-expressed in that frame, the element's Jones
//! operator (built from its own angles, measured from the local `s` axis) is
//! applied, and each outgoing branch is tagged with the frame it now lives in.
//!
//! Branches whose intensity falls to the absorption threshold are dropped,
//! so a single interaction may yield transmission only, reflection only,
//! both, or nothing at all.

use std::fmt;

use anyhow::Result;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::basis::PolarizationBasis;
use crate::coherency::CoherencyMatrix;
use crate::complex::C64;
use crate::config;
use crate::fresnel::{FresnelCoefficients, FresnelSolver, ThinFilmSolver};
use crate::jones::JonesMatrix;
use crate::material::{specific_rotation_angle, Birefringence};
use crate::mueller::MuellerMatrix;
use crate::vector::VectorExt;


/// Retardance of a wave plate, fixed or derived from the crystal's dispersion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Retardance {
    Fixed {
        radians: f64,
    },
    Dispersive {
        thickness_um: f64,
        birefringence: Birefringence,
    },
}

impl Retardance {
    pub fn at(&self, wavelength_nm: f64) -> f64 {
        match self {
            Retardance::Fixed { radians } => *radians,
            Retardance::Dispersive {
                thickness_um,
                birefringence,
            } => birefringence.retardance(*thickness_um, wavelength_nm),
        }
    }
}

/// The closed set of optical element kinds. Angles are in radians, measured
/// from the `s` axis of the surface's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    /// Ideal linear polarizer with transmission axis at `angle`.
    Polarizer { angle: f64 },
    WavePlate {
        fast_axis: f64,
        retardance: Retardance,
    },
    /// Perfect reflector adding a uniform `phase` to both components.
    Mirror { phase: f64 },
    /// Optically active medium rotating the polarization by `angle`. In a
    /// trace the rotation is carried by the outgoing frame; `jones_matrix`
    /// gives the same rotation acting on the components.
    Rotator { angle: f64 },
    /// Transmits p and reflects s with the given `efficiency`.
    PolarizingBeamSplitter { efficiency: f64 },
    /// Neutral density filter with intensity `transmission`.
    Attenuator { transmission: f64 },
    /// Blends toward unpolarized light by `factor`.
    Depolarizer { factor: f64 },
    /// Bare interface; the surface normal points into `n_front`.
    Dielectric { n_front: f64, n_back: f64 },
    PartialPolarizer { diattenuation: f64, angle: f64 },
    /// Single-layer coating on a substrate of index `n_back`.
    ThinFilm {
        n_front: f64,
        n_film: f64,
        thickness_nm: f64,
        n_back: f64,
    },
}

impl Element {
    pub fn name(&self) -> &'static str {
        match self {
            Element::Polarizer { .. } => "polarizer",
            Element::WavePlate { .. } => "wave plate",
            Element::Mirror { .. } => "mirror",
            Element::Rotator { .. } => "rotator",
            Element::PolarizingBeamSplitter { .. } => "polarizing beam splitter",
            Element::Attenuator { .. } => "attenuator",
            Element::Depolarizer { .. } => "depolarizer",
            Element::Dielectric { .. } => "dielectric",
            Element::PartialPolarizer { .. } => "partial polarizer",
            Element::ThinFilm { .. } => "thin film",
        }
    }

    /// Checks that the parameters describe a passive, physical element.
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f64| -> Result<()> {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow::anyhow!(
                    "{} {} must be in [0, 1], got {}",
                    self.name(),
                    name,
                    value
                ));
            }
            Ok(())
        };
        let index = |name: &str, value: f64| -> Result<()> {
            if value <= 0.0 || !value.is_finite() {
                return Err(anyhow::anyhow!(
                    "{} {} must be a positive refractive index, got {}",
                    self.name(),
                    name,
                    value
                ));
            }
            Ok(())
        };
        match *self {
            Element::PolarizingBeamSplitter { efficiency } => unit("efficiency", efficiency),
            Element::Attenuator { transmission } => unit("transmission", transmission),
            Element::Depolarizer { factor } => unit("factor", factor),
            Element::PartialPolarizer { diattenuation, .. } => unit("diattenuation", diattenuation),
            Element::Dielectric { n_front, n_back } => {
                index("n_front", n_front)?;
                index("n_back", n_back)
            }
            Element::ThinFilm {
                n_front,
                n_film,
                thickness_nm,
                n_back,
            } => {
                index("n_front", n_front)?;
                index("n_film", n_film)?;
                index("n_back", n_back)?;
                if thickness_nm < 0.0 {
                    return Err(anyhow::anyhow!(
                        "thin film thickness must be non-negative, got {}",
                        thickness_nm
                    ));
                }
                Ok(())
            }
            Element::WavePlate {
                retardance: Retardance::Dispersive { thickness_um, .. },
                ..
            } if thickness_um < 0.0 => Err(anyhow::anyhow!(
                "wave plate thickness must be non-negative, got {}",
                thickness_um
            )),
            _ => Ok(()),
        }
    }

    /// Jones operator of an in-line element at `wavelength_nm`. `None` for
    /// elements that split, reflect or depolarize.
    pub fn jones_matrix(&self, wavelength_nm: f64) -> Option<JonesMatrix> {
        match *self {
            Element::Polarizer { angle } => Some(JonesMatrix::linear_polarizer(angle)),
            Element::WavePlate {
                fast_axis,
                retardance,
            } => Some(JonesMatrix::retarder(retardance.at(wavelength_nm), fast_axis)),
            Element::Rotator { angle } => Some(JonesMatrix::rotator(angle)),
            Element::Attenuator { transmission } => Some(
                JonesMatrix::identity().scale(C64::new(transmission.clamp(0.0, 1.0).sqrt(), 0.0)),
            ),
            Element::PartialPolarizer {
                diattenuation,
                angle,
            } => Some(JonesMatrix::partial_polarizer(diattenuation, angle)),
            Element::Mirror { phase } => Some(JonesMatrix::phase(phase)),
            _ => None,
        }
    }

    /// Mueller matrix of the element's primary branch, including the
    /// depolarizer which has no Jones form.
    pub fn mueller(&self, wavelength_nm: f64) -> Option<MuellerMatrix> {
        match *self {
            Element::Depolarizer { factor } => Some(MuellerMatrix::depolarizer(factor)),
            _ => self
                .jones_matrix(wavelength_nm)
                .map(|jones| MuellerMatrix::from_jones(&jones)),
        }
    }
}

/// One outgoing branch: the state and the frame it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    pub state: CoherencyMatrix,
    pub basis: PolarizationBasis,
}

/// Result of one element acting on one incoming state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    pub element: &'static str,
    pub transmitted: Option<Emission>,
    pub reflected: Option<Emission>,
}

impl Interaction {
    fn absorbed(element: &'static str) -> Self {
        Self {
            element,
            transmitted: None,
            reflected: None,
        }
    }

    pub fn has_output(&self) -> bool {
        self.transmitted.is_some() || self.reflected.is_some()
    }

    /// Summed intensity of both branches.
    pub fn total_intensity(&self) -> f64 {
        [self.transmitted, self.reflected]
            .iter()
            .flatten()
            .map(|e| e.state.intensity())
            .sum()
    }

    /// Returns the output to input intensity ratio, or a violation report
    /// when a passive element gained energy beyond `tol`.
    pub fn check_conservation(
        &self,
        input_intensity: f64,
        tol: f64,
        passive: bool,
    ) -> std::result::Result<f64, ConservationViolation> {
        if input_intensity < config::INTENSITY_EPSILON {
            return Ok(0.0);
        }
        let ratio = self.total_intensity() / input_intensity;
        if passive && ratio > 1.0 + tol {
            return Err(ConservationViolation {
                element: self.element.to_string(),
                ratio,
                message: format!(
                    "output intensity {:.9} exceeds input {:.9} on a passive {}",
                    self.total_intensity(),
                    input_intensity,
                    self.element
                ),
            });
        }
        Ok(ratio)
    }
}

/// A passive element that produced more light than it received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConservationViolation {
    pub element: String,
    pub ratio: f64,
    pub message: String,
}

impl fmt::Display for ConservationViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "energy conservation violated by {} (ratio {:.9}): {}",
            self.element, self.ratio, self.message
        )
    }
}

impl std::error::Error for ConservationViolation {}

/// An element placed on a plane with the given normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub element: Element,
    #[serde(default = "default_normal")]
    pub normal: Vector3<f64>,
}

fn default_normal() -> Vector3<f64> {
    Vector3::z()
}

impl Surface {
    /// Wraps an element on a surface facing `+z`.
    pub fn new(element: Element) -> Self {
        Self {
            element,
            normal: default_normal(),
        }
    }

    /// Places the element on a plane with the given normal; a zero normal
    /// keeps the default `+z`.
    pub fn with_normal(mut self, normal: Vector3<f64>) -> Self {
        self.normal = normal.safe_normalize().unwrap_or_else(default_normal);
        self
    }

    pub fn polarizer(angle: f64) -> Self {
        Self::new(Element::Polarizer { angle })
    }

    pub fn wave_plate(fast_axis: f64, retardance: f64) -> Self {
        Self::new(Element::WavePlate {
            fast_axis,
            retardance: Retardance::Fixed {
                radians: retardance,
            },
        })
    }

    pub fn quarter_wave(fast_axis: f64) -> Self {
        Self::wave_plate(fast_axis, std::f64::consts::FRAC_PI_2)
    }

    pub fn half_wave(fast_axis: f64) -> Self {
        Self::wave_plate(fast_axis, std::f64::consts::PI)
    }

    pub fn dispersive_wave_plate(
        fast_axis: f64,
        thickness_um: f64,
        birefringence: Birefringence,
    ) -> Self {
        Self::new(Element::WavePlate {
            fast_axis,
            retardance: Retardance::Dispersive {
                thickness_um,
                birefringence,
            },
        })
    }

    pub fn mirror(phase: f64) -> Self {
        Self::new(Element::Mirror { phase })
    }

    pub fn rotator(angle: f64) -> Self {
        Self::new(Element::Rotator { angle })
    }

    /// Rotator for a cell of chiral solution, see [`specific_rotation_angle`].
    pub fn optical_activity(specific_rotation_deg: f64, path_dm: f64, concentration: f64) -> Self {
        Self::rotator(specific_rotation_angle(
            specific_rotation_deg,
            path_dm,
            concentration,
        ))
    }

    pub fn beam_splitter(efficiency: f64) -> Self {
        Self::new(Element::PolarizingBeamSplitter { efficiency })
    }

    pub fn attenuator(transmission: f64) -> Self {
        Self::new(Element::Attenuator { transmission })
    }

    pub fn depolarizer(factor: f64) -> Self {
        Self::new(Element::Depolarizer { factor })
    }

    pub fn dielectric(n_front: f64, n_back: f64) -> Self {
        Self::new(Element::Dielectric { n_front, n_back })
    }

    pub fn partial_polarizer(diattenuation: f64, angle: f64) -> Self {
        Self::new(Element::PartialPolarizer {
            diattenuation,
            angle,
        })
    }

    pub fn thin_film(n_front: f64, n_film: f64, thickness_nm: f64, n_back: f64) -> Self {
        Self::new(Element::ThinFilm {
            n_front,
            n_film,
            thickness_nm,
            n_back,
        })
    }

    /// Local interface frame for light arriving with the given frame.
    pub fn local_basis(&self, incoming: &PolarizationBasis) -> PolarizationBasis {
        incoming.interface_for(&self.normal)
    }

    /// Acts on `state`, expressed in `basis`, at `wavelength_nm`.
    pub fn interact(
        &self,
        state: &CoherencyMatrix,
        basis: &PolarizationBasis,
        wavelength_nm: f64,
    ) -> Interaction {
        let local = self.local_basis(basis);
        let state = basis.transform_coherency(state, &local);
        self.interact_local(&state, &local, wavelength_nm)
    }

    /// Acts on a state already expressed in this surface's local frame.
    pub fn interact_local(
        &self,
        state: &CoherencyMatrix,
        local: &PolarizationBasis,
        wavelength_nm: f64,
    ) -> Interaction {
        let name = self.element.name();
        let normal = &self.normal;

        match self.element {
            Element::Mirror { phase } => Interaction {
                element: name,
                transmitted: None,
                reflected: Some(Emission {
                    state: state.apply_operator(&JonesMatrix::phase(phase)),
                    basis: local.reflected(normal),
                }),
            },
            Element::PolarizingBeamSplitter { efficiency } => {
                let eta = efficiency.clamp(0.0, 1.0);
                let pass = JonesMatrix::from_real((1.0 - eta).sqrt(), 0.0, 0.0, eta.sqrt());
                let divert = JonesMatrix::from_real(eta.sqrt(), 0.0, 0.0, (1.0 - eta).sqrt());
                Interaction {
                    element: name,
                    transmitted: emit(state.apply_operator(&pass), *local),
                    reflected: emit(state.apply_operator(&divert), local.reflected(normal)),
                }
            }
            Element::Depolarizer { factor } => Interaction {
                element: name,
                transmitted: emit(state.depolarize(factor), *local),
                reflected: None,
            },
            Element::Dielectric { n_front, n_back } => {
                let (n1, n2) = self.sides(local, n_front, n_back);
                let cos_i = local.k().dot(normal).abs().min(1.0);
                let coefficients = FresnelSolver::solve(n1, n2, cos_i.acos());
                self.split(state, local, n1 / n2, &coefficients)
            }
            Element::ThinFilm {
                n_front,
                n_film,
                thickness_nm,
                n_back,
            } => {
                let (n1, n2) = self.sides(local, n_front, n_back);
                let cos_i = local.k().dot(normal).abs().min(1.0);
                let coefficients = ThinFilmSolver::solve(
                    n1,
                    n_film,
                    thickness_nm,
                    n2,
                    cos_i.acos(),
                    wavelength_nm,
                );
                self.split(state, local, n1 / n2, &coefficients)
            }
            Element::Rotator { angle } => Interaction {
                element: name,
                transmitted: emit(*state, local.rotated(angle)),
                reflected: None,
            },
            _ => match self.element.jones_matrix(wavelength_nm) {
                Some(jones) => Interaction {
                    element: name,
                    transmitted: emit(state.apply_operator(&jones), *local),
                    reflected: None,
                },
                None => Interaction::absorbed(name),
            },
        }
    }

    /// Indices on the incident and exit sides; the normal points to the front.
    fn sides(&self, local: &PolarizationBasis, n_front: f64, n_back: f64) -> (f64, f64) {
        if local.k().dot(&self.normal) < 0.0 {
            (n_front, n_back)
        } else {
            (n_back, n_front)
        }
    }

    fn split(
        &self,
        state: &CoherencyMatrix,
        local: &PolarizationBasis,
        eta: f64,
        coefficients: &FresnelCoefficients,
    ) -> Interaction {
        let transmitted = if coefficients.tir {
            None
        } else {
            local
                .refracted(&self.normal, eta)
                .and_then(|basis| emit(state.apply_operator(&coefficients.transmission_matrix()), basis))
        };
        let reflected = emit(
            state.apply_operator(&coefficients.reflection_matrix()),
            local.reflected(&self.normal),
        );
        log::trace!(
            "{} split: R_s={:.6} R_p={:.6} tir={}",
            self.element.name(),
            coefficients.reflectance_s,
            coefficients.reflectance_p,
            coefficients.tir
        );
        Interaction {
            element: self.element.name(),
            transmitted,
            reflected,
        }
    }
}

/// Keeps a branch only if it carries more than the absorption threshold.
fn emit(state: CoherencyMatrix, basis: PolarizationBasis) -> Option<Emission> {
    if state.intensity() <= config::ABSORPTION_THRESHOLD {
        None
    } else {
        Some(Emission { state, basis })
    }
}
