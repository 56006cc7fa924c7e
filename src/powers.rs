//! Energy ledger for a ray trace.
//!
//! Every unit of source intensity ends in exactly one bucket: it escapes the
//! scene, is absorbed by an element, or is cut off by one of the trace
//! limits. Whatever is left over is reported by [`Powers::missing`] and
//! should vanish up to rounding for passive scenes.

use std::{fmt, iter::Sum, ops::*};

use serde::Serialize;


/// Intensity budget of a trace.
///
/// **Context**: Splitting elements send light down several paths, and trace
/// limits cut some of those paths short. Tracking where each share of the
/// source intensity went is the end-to-end check that no element created or
/// lost energy.
///
/// **How it Works**: The tracer adds source intensity to `input`, the
/// intensity of rays leaving the scene to `output`, element losses to
/// `absorbed`, and the intensity of rays it abandons to the matching
/// truncation bucket.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct Powers {
    pub input: f64,       // source intensity
    pub output: f64,      // intensity of rays escaping the scene
    pub absorbed: f64,    // lost inside elements
    pub trnc_bounce: f64, // truncated due to max bounces
    pub trnc_energy: f64, // truncated due to intensity threshold
    pub trnc_iter: f64,   // truncated due to the iteration ceiling
}

impl Add for Powers {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            input: self.input + other.input,
            output: self.output + other.output,
            absorbed: self.absorbed + other.absorbed,
            trnc_bounce: self.trnc_bounce + other.trnc_bounce,
            trnc_energy: self.trnc_energy + other.trnc_energy,
            trnc_iter: self.trnc_iter + other.trnc_iter,
        }
    }
}

impl AddAssign for Powers {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sum for Powers {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Powers::new(), Add::add)
    }
}

impl Powers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intensity not accounted for by any bucket.
    pub fn missing(&self) -> f64 {
        self.input
            - (self.output + self.absorbed + self.trnc_bounce + self.trnc_energy + self.trnc_iter)
    }

    /// Intensity cut off by trace limits rather than physics.
    pub fn truncated(&self) -> f64 {
        self.trnc_bounce + self.trnc_energy + self.trnc_iter
    }
}

impl fmt::Display for Powers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Powers:")?;
        writeln!(f, "  Input:            {:.6}", self.input)?;
        writeln!(f, "  Output:           {:.6}", self.output)?;
        writeln!(f, "  Absorbed:         {:.6}", self.absorbed)?;
        writeln!(f, "  Trunc. Bounce:    {:.6}", self.trnc_bounce)?;
        writeln!(f, "  Trunc. Energy:    {:.6}", self.trnc_energy)?;
        writeln!(f, "  Trunc. Iter:      {:.6}", self.trnc_iter)?;
        writeln!(f, "  Other:            {:.6}", self.missing())
    }
}
