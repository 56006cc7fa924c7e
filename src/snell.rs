//! Snell's law for planar dielectric interfaces.
//!
//! Beyond the critical angle the transmitted angle has no real solution. The
//! real-valued helpers report that as `None`, while [`cos_theta_t`] continues
//! analytically into the evanescent regime, giving a purely imaginary cosine
//! that the Fresnel and thin-film solvers use to keep phase information.

use crate::complex::{C64, ComplexExt};
use crate::config;


/// Clamps an angle of incidence into `[0, pi/2]`.
pub fn clamp_incidence(theta_i: f64) -> f64 {
    theta_i.clamp(0.0, std::f64::consts::FRAC_PI_2)
}

/// `sin(theta_t) = n1 / n2 * sin(theta_i)`. May exceed 1 beyond the critical angle.
pub fn sin_theta_t(n1: f64, n2: f64, theta_i: f64) -> f64 {
    if n2.abs() < config::DIVISION_EPSILON {
        return 0.0;
    }
    n1 / n2 * clamp_incidence(theta_i).sin()
}

/// Transmitted angle, or `None` under total internal reflection.
pub fn theta_t(n1: f64, n2: f64, theta_i: f64) -> Option<f64> {
    let sin_t = sin_theta_t(n1, n2, theta_i);
    if sin_t * sin_t > 1.0 {
        None
    } else {
        Some(sin_t.asin())
    }
}

/// Complex cosine of the transmitted angle, `sqrt(1 - sin^2 theta_t)`.
/// Purely imaginary with positive imaginary part under total internal reflection.
pub fn cos_theta_t(n1: f64, n2: f64, theta_i: f64) -> C64 {
    let sin_t = sin_theta_t(n1, n2, theta_i);
    complex_cos_from_sin(C64::new(sin_t, 0.0))
}

/// Principal `sqrt(1 - sin^2)` for a complex sine, used for layer angles
/// inside thin-film stacks.
pub(crate) fn complex_cos_from_sin(sin: C64) -> C64 {
    let cos = (C64::new(1.0, 0.0) - sin * sin).safe_sqrt();
    if cos.im < 0.0 {
        -cos
    } else {
        cos
    }
}
