use crate::base::{Error, GridId};
use nalgebra_sparse::csr::CsrMatrix;
use std::collections::HashMap;
use std::fmt;

/// Defines the physics owning a set of discretization operators
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Physics {
    /// Pressure (MPFA and mass)
    Flow,

    /// Displacement (MPSA and Biot coupling)
    Mechanics,
}

/// Names the discretization operators stored in the cache
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Operator {
    /// Face fluxes due to cell pressures
    Flux,

    /// Face fluxes due to boundary values
    BoundFlux,

    /// Diagonal accumulation matrix
    Mass,

    /// Face tractions due to cell displacements
    Stress,

    /// Face tractions due to boundary values
    BoundStress,

    /// Face tractions due to cell pressures
    GradP,

    /// Cell divergence of the displacement due to cell displacements
    DivD,

    /// Cell divergence of the displacement due to cell pressures
    Stabilization,

    /// Cell divergence of the displacement due to boundary values
    BoundDivD,
}

impl Operator {
    /// Returns the physics computing this operator
    pub fn physics(&self) -> Physics {
        match self {
            Operator::Flux | Operator::BoundFlux | Operator::Mass => Physics::Flow,
            _ => Physics::Mechanics,
        }
    }

    /// Returns all operators of a physics
    pub fn all(physics: Physics) -> &'static [Operator] {
        match physics {
            Physics::Flow => &[Operator::Flux, Operator::BoundFlux, Operator::Mass],
            Physics::Mechanics => &[
                Operator::Stress,
                Operator::BoundStress,
                Operator::GradP,
                Operator::DivD,
                Operator::Stabilization,
                Operator::BoundDivD,
            ],
        }
    }
}

/// Holds the discretization matrices of each (grid, physics) pair
///
/// The cache is owned by the caller and mutated only by successful discretizations.
/// Operators must be invalidated explicitly when the parameters of a grid change.
///
/// # Examples
///
/// ```
/// use fvbiot::prelude::*;
/// use fvbiot::fv::mass_matrix;
///
/// fn main() -> Result<(), Error> {
///     let grid = Grid::cartesian_2d(2, 1, 2.0, 1.0)?;
///     let mut cache = MatrixCache::new();
///     cache.insert(grid.id, Operator::Mass, mass_matrix(&grid, &[1.0, 1.0], &[1.0, 1.0])?);
///     assert!(cache.contains(grid.id, Operator::Mass));
///     assert_eq!(cache.get(grid.id, Operator::Mass)?.nnz(), 2);
///     cache.invalidate(grid.id, Physics::Flow);
///     assert!(cache.is_empty());
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct MatrixCache {
    data: HashMap<(GridId, Physics), HashMap<Operator, CsrMatrix<f64>>>,
}

impl MatrixCache {
    /// Allocates an empty cache
    pub fn new() -> Self {
        MatrixCache { data: HashMap::new() }
    }

    /// Stores (or replaces) an operator
    pub fn insert(&mut self, grid: GridId, operator: Operator, matrix: CsrMatrix<f64>) {
        self.data
            .entry((grid, operator.physics()))
            .or_default()
            .insert(operator, matrix);
    }

    /// Returns an operator
    pub fn get(&self, grid: GridId, operator: Operator) -> Result<&CsrMatrix<f64>, Error> {
        self.data
            .get(&(grid, operator.physics()))
            .and_then(|ops| ops.get(&operator))
            .ok_or(Error::Config("operator has not been discretized"))
    }

    /// Returns true if the operator is stored
    pub fn contains(&self, grid: GridId, operator: Operator) -> bool {
        self.get(grid, operator).is_ok()
    }

    /// Returns true if all operators of a physics are stored
    pub fn contains_physics(&self, grid: GridId, physics: Physics) -> bool {
        Operator::all(physics).iter().all(|op| self.contains(grid, *op))
    }

    /// Removes all operators of a (grid, physics) pair
    pub fn invalidate(&mut self, grid: GridId, physics: Physics) {
        self.data.remove(&(grid, physics));
    }

    /// Removes all operators
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Moves all operators of another cache into this one (replacing existing ones)
    pub fn merge(&mut self, other: MatrixCache) {
        for ((grid, _), ops) in other.data {
            for (op, matrix) in ops {
                self.insert(grid, op, matrix);
            }
        }
    }

    /// Returns the number of stored operators
    pub fn len(&self) -> usize {
        self.data.values().map(|ops| ops.len()).sum()
    }

    /// Returns true if no operator is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for MatrixCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.data.keys().collect();
        keys.sort();
        write!(f, "Cached operators\n").unwrap();
        write!(f, "================\n").unwrap();
        for key in keys {
            let mut ops: Vec<_> = self.data[key].iter().collect();
            ops.sort_by_key(|(op, _)| **op);
            for (op, matrix) in ops {
                write!(
                    f,
                    "grid {} {:?} {:?}: {} × {} (nnz = {})\n",
                    key.0 .0,
                    key.1,
                    op,
                    matrix.nrows(),
                    matrix.ncols(),
                    matrix.nnz()
                )
                .unwrap();
            }
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{MatrixCache, Operator, Physics};
    use crate::base::{Error, GridId};
    use crate::fv::Triplets;
    use nalgebra_sparse::csr::CsrMatrix;

    fn identity(n: usize) -> CsrMatrix<f64> {
        let mut t = Triplets::new(n, n);
        for i in 0..n {
            t.put(i, i, 1.0);
        }
        t.to_csr().unwrap()
    }

    #[test]
    fn operator_physics_works() {
        assert_eq!(Operator::Flux.physics(), Physics::Flow);
        assert_eq!(Operator::Mass.physics(), Physics::Flow);
        assert_eq!(Operator::Stabilization.physics(), Physics::Mechanics);
        assert_eq!(Operator::all(Physics::Flow).len(), 3);
        assert_eq!(Operator::all(Physics::Mechanics).len(), 6);
        assert!(Operator::all(Physics::Mechanics)
            .iter()
            .all(|op| op.physics() == Physics::Mechanics));
    }

    #[test]
    fn insert_get_and_invalidate_work() {
        let (g0, g1) = (GridId(1000), GridId(1001));
        let mut cache = MatrixCache::new();
        assert!(cache.is_empty());
        assert_eq!(
            cache.get(g0, Operator::Flux).err(),
            Some(Error::Config("operator has not been discretized"))
        );
        cache.insert(g0, Operator::Flux, identity(2));
        cache.insert(g0, Operator::Stress, identity(4));
        cache.insert(g1, Operator::Flux, identity(3));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(g1, Operator::Flux).unwrap().nrows(), 3);
        assert!(cache.contains(g0, Operator::Stress));
        assert!(!cache.contains(g1, Operator::Stress));
        assert!(!cache.contains_physics(g0, Physics::Flow));

        cache.invalidate(g0, Physics::Flow);
        assert!(!cache.contains(g0, Operator::Flux));
        assert!(cache.contains(g0, Operator::Stress));
        assert!(cache.contains(g1, Operator::Flux));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn merge_works() {
        let g = GridId(1002);
        let mut staging = MatrixCache::new();
        for op in Operator::all(Physics::Flow) {
            staging.insert(g, *op, identity(2));
        }
        let mut cache = MatrixCache::new();
        cache.insert(g, Operator::Flux, identity(5));
        cache.merge(staging);
        assert!(cache.contains_physics(g, Physics::Flow));
        assert_eq!(cache.get(g, Operator::Flux).unwrap().nrows(), 2);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn display_works() {
        let mut cache = MatrixCache::new();
        cache.insert(GridId(1003), Operator::Mass, identity(2));
        assert_eq!(
            format!("{}", cache),
            "Cached operators\n\
             ================\n\
             grid 1003 Flow Mass: 2 × 2 (nnz = 2)\n"
        );
    }
}
