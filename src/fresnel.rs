//! Fresnel equations for dielectric boundaries.
//!
//! Amplitude coefficients follow
//! `r_s = (n1 cos_i - n2 cos_t) / (n1 cos_i + n2 cos_t)` and
//! `r_p = (n2 cos_i - n1 cos_t) / (n2 cos_i + n1 cos_t)`.
//! Under total internal reflection `cos_t` is taken purely imaginary, so the
//! reflection coefficients stay complex with unit modulus and carry the
//! Goos-Hänchen phase into any downstream composition.
//!
//! [`ThinFilmSolver`] layers two such interfaces around a single film and sums
//! the internal reflections with the Airy formula.

use std::f64::consts::PI;

use crate::complex::{C64, ComplexExt};
use crate::config;
use crate::jones::JonesMatrix;
use crate::snell;


/// Amplitude and power coefficients for one interface (or film stack) at one
/// angle of incidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FresnelCoefficients {
    pub r_s: C64,
    pub r_p: C64,
    pub t_s: C64,
    pub t_p: C64,
    pub reflectance_s: f64,
    pub reflectance_p: f64,
    /// Beam-area corrected, so that `R + T = 1` for lossless media.
    pub transmittance_s: f64,
    pub transmittance_p: f64,
    /// Refraction angle in the exit medium, `None` under total internal reflection.
    pub theta_t: Option<f64>,
    pub tir: bool,
    /// `sqrt(n2 cos_t / (n1 cos_i))`, zero under total internal reflection.
    area_factor: f64,
}

impl FresnelCoefficients {
    /// Unpolarized reflectance, the mean of s and p.
    pub fn reflectance(&self) -> f64 {
        0.5 * (self.reflectance_s + self.reflectance_p)
    }

    /// Unpolarized transmittance, the mean of s and p.
    pub fn transmittance(&self) -> f64 {
        0.5 * (self.transmittance_s + self.transmittance_p)
    }

    /// `diag(r_s, r_p)` in the s-p frame.
    pub fn reflection_matrix(&self) -> JonesMatrix {
        JonesMatrix::diagonal(self.r_s, self.r_p)
    }

    /// `diag(t_s, t_p)` scaled by the beam-area factor, so applying it to a
    /// coherency matrix yields transmitted power directly.
    pub fn transmission_matrix(&self) -> JonesMatrix {
        if self.tir {
            return JonesMatrix::zero();
        }
        JonesMatrix::diagonal(self.t_s, self.t_p).scale(C64::new(self.area_factor, 0.0))
    }

    fn from_amplitudes(
        r_s: C64,
        r_p: C64,
        t_s: C64,
        t_p: C64,
        area_ratio: f64,
        theta_t: Option<f64>,
    ) -> Self {
        let tir = theta_t.is_none();
        let (transmittance_s, transmittance_p, area_factor) = if tir {
            (0.0, 0.0, 0.0)
        } else {
            let ratio = area_ratio.max(0.0);
            (ratio * t_s.norm_sqr(), ratio * t_p.norm_sqr(), ratio.sqrt())
        };
        let (reflectance_s, reflectance_p) = if tir {
            (1.0, 1.0)
        } else {
            (r_s.norm_sqr(), r_p.norm_sqr())
        };
        Self {
            r_s,
            r_p,
            t_s,
            t_p,
            reflectance_s,
            reflectance_p,
            transmittance_s,
            transmittance_p,
            theta_t,
            tir,
            area_factor,
        }
    }
}

/// Closed-form solver for a single planar dielectric interface.
pub struct FresnelSolver;

impl FresnelSolver {
    /// Solves the interface from index `n1` into `n2` at incidence `theta_i`
    /// (radians, clamped into `[0, pi/2]`).
    pub fn solve(n1: f64, n2: f64, theta_i: f64) -> FresnelCoefficients {
        let theta_i = snell::clamp_incidence(theta_i);
        let cos_i = C64::new(theta_i.cos(), 0.0);
        let theta_t = snell::theta_t(n1, n2, theta_i);

        if (n1 - n2).abs() < config::DIVISION_EPSILON {
            let zero = C64::new(0.0, 0.0);
            let one = C64::new(1.0, 0.0);
            return FresnelCoefficients::from_amplitudes(zero, zero, one, one, 1.0, theta_t);
        }

        let cos_t = snell::cos_theta_t(n1, n2, theta_i);
        let (r_s, r_p, t_s, t_p) = interface_amplitudes(
            C64::new(n1, 0.0),
            C64::new(n2, 0.0),
            cos_i,
            cos_t,
        );
        let area_ratio = safe_ratio(n2 * cos_t.re, n1 * cos_i.re);

        log::trace!(
            "fresnel n1={} n2={} theta_i={:.6} tir={}",
            n1,
            n2,
            theta_i,
            theta_t.is_none()
        );
        FresnelCoefficients::from_amplitudes(r_s, r_p, t_s, t_p, area_ratio, theta_t)
    }

    /// Angle at which p-polarized light is not reflected, `atan(n2 / n1)`.
    pub fn brewster_angle(n1: f64, n2: f64) -> f64 {
        (n2 / n1).atan()
    }

    /// Onset of total internal reflection, `asin(n2 / n1)`; NaN when `n1 <= n2`.
    pub fn critical_angle(n1: f64, n2: f64) -> f64 {
        if n1 <= n2 {
            return f64::NAN;
        }
        (n2 / n1).asin()
    }
}

/// Single-layer interference coating: ambient, film of given thickness, substrate.
pub struct ThinFilmSolver;

impl ThinFilmSolver {
    /// Solves the stack `n_ambient | n_film (thickness_nm) | n_substrate` at
    /// incidence `theta_i` for vacuum wavelength `wavelength_nm`.
    ///
    /// Layer cosines are complex, so evanescent coupling through a film
    /// beyond its own critical angle (frustrated total internal reflection)
    /// is handled by the same expression.
    pub fn solve(
        n_ambient: f64,
        n_film: f64,
        thickness_nm: f64,
        n_substrate: f64,
        theta_i: f64,
        wavelength_nm: f64,
    ) -> FresnelCoefficients {
        let theta_i = snell::clamp_incidence(theta_i);
        let n0 = C64::new(n_ambient, 0.0);
        let n1 = C64::new(n_film, 0.0);
        let n2 = C64::new(n_substrate, 0.0);

        let sin0 = C64::new(theta_i.sin(), 0.0);
        let cos0 = C64::new(theta_i.cos(), 0.0);
        let cos1 = snell::complex_cos_from_sin((n0 * sin0).safe_div(n1));
        let cos2 = snell::complex_cos_from_sin((n0 * sin0).safe_div(n2));

        let (r01_s, r01_p, t01_s, t01_p) = interface_amplitudes(n0, n1, cos0, cos1);
        let (r12_s, r12_p, t12_s, t12_p) = interface_amplitudes(n1, n2, cos1, cos2);

        // phase thickness of the film
        let beta = n1 * cos1 * (2.0 * PI * thickness_nm.max(0.0) / wavelength_nm);
        let round_trip = (C64::new(0.0, 2.0) * beta).exp();
        let single_pass = (C64::new(0.0, 1.0) * beta).exp();

        let airy = |r01: C64, r12: C64, t01: C64, t12: C64| {
            let denom = C64::new(1.0, 0.0) + r01 * r12 * round_trip;
            let r = (r01 + r12 * round_trip).safe_div(denom);
            let t = (t01 * t12 * single_pass).safe_div(denom);
            (r, t)
        };
        let (r_s, t_s) = airy(r01_s, r12_s, t01_s, t12_s);
        let (r_p, t_p) = airy(r01_p, r12_p, t01_p, t12_p);

        let theta_t = snell::theta_t(n_ambient, n_substrate, theta_i);
        let area_ratio = safe_ratio(n_substrate * cos2.re, n_ambient * cos0.re);

        FresnelCoefficients::from_amplitudes(r_s, r_p, t_s, t_p, area_ratio, theta_t)
    }
}

/// s and p amplitude coefficients for one interface with complex cosines.
fn interface_amplitudes(n1: C64, n2: C64, cos_i: C64, cos_t: C64) -> (C64, C64, C64, C64) {
    let s_denom = n1 * cos_i + n2 * cos_t;
    let p_denom = n2 * cos_i + n1 * cos_t;
    let r_s = (n1 * cos_i - n2 * cos_t).safe_div(s_denom);
    let r_p = (n2 * cos_i - n1 * cos_t).safe_div(p_denom);
    let t_s = (2.0 * n1 * cos_i).safe_div(s_denom);
    let t_p = (2.0 * n1 * cos_i).safe_div(p_denom);
    (r_s, r_p, t_s, t_p)
}

/// `num / denom`, zero for a vanishing denominator.
fn safe_ratio(num: f64, denom: f64) -> f64 {
    if denom.abs() < config::DIVISION_EPSILON {
        0.0
    } else {
        num / denom
    }
}
