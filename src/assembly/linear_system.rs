use crate::base::Error;
use crate::fv::Triplets;
use nalgebra_sparse::csr::CsrMatrix;
use russell_lab::{solve_lin_sys, Matrix, Vector};
use russell_sparse::{CooMatrix, Sym};

/// Holds the assembled global system `matrix ⋅ x = rhs`
pub struct LinearSystem {
    /// Global (square) matrix
    pub matrix: CsrMatrix<f64>,

    /// Global right-hand side
    pub rhs: Vector,
}

impl LinearSystem {
    /// Allocates a new instance
    pub fn new(matrix: CsrMatrix<f64>, rhs: Vector) -> Result<Self, Error> {
        if matrix.nrows() != matrix.ncols() {
            return Err(Error::Config("the global matrix must be square"));
        }
        if rhs.dim() != matrix.nrows() {
            return Err(Error::Config("the right-hand side must have one entry per equation"));
        }
        Ok(LinearSystem { matrix, rhs })
    }

    /// Returns the number of equations
    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// Converts the matrix to the COO format used by the sparse solvers
    pub fn to_coo(&self) -> Result<CooMatrix, Error> {
        let n = self.dim();
        let max_nnz = usize::max(self.matrix.nnz(), 1);
        let mut coo = CooMatrix::new(n, n, max_nnz, Sym::No).map_err(Error::LinearAlgebra)?;
        for (i, j, v) in self.matrix.triplet_iter() {
            coo.put(i, j, *v).map_err(Error::LinearAlgebra)?;
        }
        Ok(coo)
    }

    /// Converts the matrix to a dense matrix
    pub fn to_dense(&self) -> Matrix {
        let n = self.dim();
        let mut dense = Matrix::new(n, n);
        for (i, j, v) in self.matrix.triplet_iter() {
            dense.set(i, j, dense.get(i, j) + v);
        }
        dense
    }

    /// Solves the system with a dense factorization (small systems only)
    pub fn solve_dense(&self) -> Result<Vector, Error> {
        let mut a = self.to_dense();
        let mut x = self.rhs.clone();
        solve_lin_sys(&mut x, &mut a).map_err(Error::LinearAlgebra)?;
        Ok(x)
    }

    /// Returns a new system with the equations and unknowns renumbered
    ///
    /// `perm[i]` is the new number of the old equation `i` (see [crate::assembly::DofManager::permutation_to]).
    pub fn permute(&self, perm: &[usize]) -> Result<LinearSystem, Error> {
        let n = self.dim();
        if perm.len() != n {
            return Err(Error::Config("the permutation must have one entry per equation"));
        }
        let mut seen = vec![false; n];
        for p in perm {
            if *p >= n || seen[*p] {
                return Err(Error::Config("the permutation is invalid"));
            }
            seen[*p] = true;
        }
        let mut triplets = Triplets::new(n, n);
        for (i, j, v) in self.matrix.triplet_iter() {
            triplets.put(perm[i], perm[j], *v);
        }
        let mut rhs = Vector::new(n);
        for i in 0..n {
            rhs[perm[i]] = self.rhs[i];
        }
        LinearSystem::new(triplets.to_csr()?, rhs)
    }
}

/// Adds a block matrix to the global triplets at the given offsets
pub(crate) fn place_block(triplets: &mut Triplets, block: &CsrMatrix<f64>, row_offset: usize, col_offset: usize) {
    for (i, j, v) in block.triplet_iter() {
        triplets.put(row_offset + i, col_offset + j, *v);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{place_block, LinearSystem};
    use crate::base::Error;
    use crate::fv::Triplets;
    use russell_lab::{vec_approx_eq, Vector};

    fn sample() -> LinearSystem {
        // [2 1 0]       [3]
        // [1 3 1] x  =  [5]
        // [0 1 4]       [5]
        let mut t = Triplets::new(3, 3);
        t.put(0, 0, 2.0);
        t.put(0, 1, 1.0);
        t.put(1, 0, 1.0);
        t.put(1, 1, 3.0);
        t.put(1, 2, 1.0);
        t.put(2, 1, 1.0);
        t.put(2, 2, 4.0);
        LinearSystem::new(t.to_csr().unwrap(), Vector::from(&[3.0, 5.0, 5.0])).unwrap()
    }

    #[test]
    fn new_captures_errors() {
        let t = Triplets::new(2, 3);
        assert_eq!(
            LinearSystem::new(t.to_csr().unwrap(), Vector::new(2)).err(),
            Some(Error::Config("the global matrix must be square"))
        );
        let t = Triplets::new(2, 2);
        assert_eq!(
            LinearSystem::new(t.to_csr().unwrap(), Vector::new(3)).err(),
            Some(Error::Config("the right-hand side must have one entry per equation"))
        );
    }

    #[test]
    fn conversions_work() {
        let sys = sample();
        assert_eq!(sys.dim(), 3);
        let dense = sys.to_dense();
        assert_eq!(dense.get(1, 2), 1.0);
        assert_eq!(dense.get(2, 0), 0.0);
        let coo = sys.to_coo().unwrap();
        assert_eq!(coo.as_dense().as_data(), dense.as_data());
    }

    #[test]
    fn solve_dense_works() {
        let x = sample().solve_dense().unwrap();
        vec_approx_eq(&x, &[1.0, 1.0, 1.0], 1e-14);
    }

    #[test]
    fn permute_works() {
        let sys = sample();
        let perm = [2, 0, 1];
        let permuted = sys.permute(&perm).unwrap();
        let (a, b) = (sys.to_dense(), permuted.to_dense());
        for i in 0..3 {
            assert_eq!(permuted.rhs[perm[i]], sys.rhs[i]);
            for j in 0..3 {
                assert_eq!(b.get(perm[i], perm[j]), a.get(i, j));
            }
        }
        let x = permuted.solve_dense().unwrap();
        vec_approx_eq(&x, &[1.0, 1.0, 1.0], 1e-14);
        assert_eq!(
            sys.permute(&[0, 0, 1]).err(),
            Some(Error::Config("the permutation is invalid"))
        );
        assert_eq!(
            sys.permute(&[0, 1]).err(),
            Some(Error::Config("the permutation must have one entry per equation"))
        );
    }

    #[test]
    fn place_block_works() {
        let sys = sample();
        let mut t = Triplets::new(5, 5);
        place_block(&mut t, &sys.matrix, 2, 1);
        let global = t.to_csr().unwrap();
        assert_eq!(global.nnz(), 7);
        let row = global.row(3);
        assert_eq!(row.col_indices(), &[1, 2, 3]);
        assert_eq!(row.values(), &[1.0, 3.0, 1.0]);
    }
}
