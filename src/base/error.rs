use crate::StrError;
use thiserror::Error;

/// Defines the errors raised while discretizing or assembling
///
/// Configuration errors are usage errors (reported before computing anything),
/// whereas numerical errors indicate that the input is valid but the local
/// elimination failed (e.g., degenerate geometry).
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// Malformed boundary descriptor, size mismatch, unregistered variable, etc.
    #[error("configuration error: {0}")]
    Config(StrError),

    /// The local system of an interaction region is singular or too ill-conditioned
    #[error("singular local system around node {node} (condition estimate = {condition:e})")]
    SingularLocalSystem { node: usize, condition: f64 },

    /// Failure reported by the dense or sparse linear algebra routines
    #[error("linear algebra error: {0}")]
    LinearAlgebra(StrError),
}

impl Error {
    /// Returns true if this is a usage (configuration) error
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(..))
    }

    /// Returns true if this is a computation failure
    pub fn is_numerical(&self) -> bool {
        matches!(self, Error::SingularLocalSystem { .. } | Error::LinearAlgebra(..))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn categories_work() {
        let config = Error::Config("face index is out of bounds");
        assert!(config.is_config());
        assert!(!config.is_numerical());
        let singular = Error::SingularLocalSystem {
            node: 3,
            condition: f64::INFINITY,
        };
        assert!(singular.is_numerical());
        assert!(!singular.is_config());
        assert!(Error::LinearAlgebra("cannot compute inverse").is_numerical());
    }

    #[test]
    fn display_works() {
        assert_eq!(
            format!("{}", Error::Config("face index is out of bounds")),
            "configuration error: face index is out of bounds"
        );
        assert_eq!(
            format!(
                "{}",
                Error::SingularLocalSystem {
                    node: 7,
                    condition: 1e20
                }
            ),
            "singular local system around node 7 (condition estimate = 1e20)"
        );
    }
}
