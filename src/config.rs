//! Numeric tolerances shared across the engine.
//!
//! Every removable singularity in the engine is resolved against one of these
//! constants. They are graduated: divisions give up earlier than roots, and
//! roots earlier than geometric degeneracy checks.

/// Divisor magnitude below which complex division returns zero.
pub const DIVISION_EPSILON: f64 = 1e-15;
/// Magnitude below which a complex square root or power is taken to be zero.
pub const ROOT_EPSILON: f64 = 1e-30;
/// Magnitude returned (negated) by the logarithm of zero.
pub const LOG_FLOOR: f64 = 1e30;
/// Determinant magnitude below which a 2x2 matrix is treated as singular.
pub const SINGULAR_DET_EPSILON: f64 = 1e-12;
/// Default tolerance for Hermitian and positive semi-definite checks.
pub const HERMITIAN_TOLERANCE: f64 = 1e-9;
/// Intensity below which degree of polarization is defined as zero.
pub const INTENSITY_EPSILON: f64 = 1e-12;
/// Degree of polarization at or above which light is considered fully polarized.
pub const FULLY_POLARIZED_DOP: f64 = 0.99;
/// Default tolerance for the polarization classification predicates.
pub const CLASSIFY_TOLERANCE: f64 = 1e-3;
/// Minimum cross-product magnitude for the plane of incidence to be defined.
pub const GEOMETRIC_EPSILON: f64 = 1e-9;
/// Tolerance for unit length, orthogonality and handedness of a basis.
pub const BASIS_TOLERANCE: f64 = 1e-6;
/// Minimum vector length to be considered non-degenerate.
pub const VEC_LENGTH_THRESHOLD: f64 = 1e-12;
/// Output intensity at or below which an element is considered to absorb the ray.
pub const ABSORPTION_THRESHOLD: f64 = 1e-12;
/// Default ratio slack allowed before a passive element is reported as creating energy.
pub const CONSERVATION_TOLERANCE: f64 = 1e-6;
/// Decimal places kept by serialized state records.
pub const RECORD_PRECISION: i32 = 6;
/// Default wavelength in nanometres.
pub const DEFAULT_WAVELENGTH: f64 = 550.0;
