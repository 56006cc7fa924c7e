//! Complex scalar arithmetic with physics-safe fallbacks.
//!
//! Optical scenes legitimately pass through zero-intensity states, so the
//! usual `0/0` and `ln(0)` singularities are resolved here to defined values
//! instead of letting `NaN` or `inf` leak into later matrix algebra.

use num_complex::Complex;

use crate::config;

/// Complex scalar used throughout the engine.
pub type C64 = Complex<f64>;


/// Returns the unit phasor `e^{i phase}`.
pub fn expi(phase: f64) -> C64 {
    C64::new(phase.cos(), phase.sin())
}

/// Physics-safe operations on complex scalars.
pub trait ComplexExt {
    /// Division that returns zero when the divisor is numerically zero.
    fn safe_div(self, rhs: Self) -> Self;
    /// Principal square root, exactly zero for a numerically zero argument.
    fn safe_sqrt(self) -> Self;
    /// Principal logarithm; the logarithm of zero is a large negative real.
    fn safe_ln(self) -> Self;
    /// Principal power `self^exponent`.
    fn safe_powf(self, exponent: f64) -> Self;
    /// Component-wise comparison within an absolute tolerance.
    fn approx_eq(self, other: Self, tol: f64) -> bool;
}

impl ComplexExt for C64 {
    fn safe_div(self, rhs: Self) -> Self {
        if rhs.norm() < config::DIVISION_EPSILON {
            return C64::new(0.0, 0.0);
        }
        self / rhs
    }

    fn safe_sqrt(self) -> Self {
        if self.norm() < config::ROOT_EPSILON {
            return C64::new(0.0, 0.0);
        }
        self.sqrt()
    }

    fn safe_ln(self) -> Self {
        if self.norm() < config::ROOT_EPSILON {
            return C64::new(-config::LOG_FLOOR, 0.0);
        }
        self.ln()
    }

    fn safe_powf(self, exponent: f64) -> Self {
        if exponent == 0.0 {
            return C64::new(1.0, 0.0);
        }
        if self.norm() < config::ROOT_EPSILON {
            return C64::new(0.0, 0.0);
        }
        self.powf(exponent)
    }

    fn approx_eq(self, other: Self, tol: f64) -> bool {
        (self.re - other.re).abs() <= tol && (self.im - other.im).abs() <= tol
    }
}
