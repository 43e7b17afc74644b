/// Defines the largest accepted 1-norm condition estimate of a (row-scaled) local system
///
/// Interaction regions whose local system exceeds this value are reported as
/// [crate::base::Error::SingularLocalSystem] instead of producing a wrong discretization.
pub const MAX_LOCAL_CONDITION: f64 = 1e12;

/// Defines the default location of the continuity points on simplex grids
///
/// The continuity point of a sub-face is `x_face + eta (x_node - x_face)`.
pub const DEFAULT_ETA_SIMPLEX: f64 = 1.0 / 3.0;

/// Defines the default location of the continuity points on non-simplex grids
pub const DEFAULT_ETA: f64 = 0.0;

/// Defines the tolerance used to compare geometric quantities
pub const GEOMETRY_TOLERANCE: f64 = 1e-12;
