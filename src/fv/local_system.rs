use crate::base::{Error, MAX_LOCAL_CONDITION};
use log::{trace, warn};
use russell_lab::{mat_inverse, mat_mat_mul, mat_norm, mat_svd, Matrix, Norm, Vector};

/// Holds the dense system `A g = Σ_k B_k v_k` of one interaction region
///
/// The unknowns `g` are the sub-cell gradients and the `v_k` are the cell values,
/// boundary values, etc. that the gradients depend on.
pub struct LocalSystem {
    /// Coefficient matrix (square)
    pub a: Matrix,

    /// Right-hand side blocks
    pub rhs: Vec<Matrix>,
}

impl LocalSystem {
    /// Allocates a new (zeroed) instance
    ///
    /// # Input
    ///
    /// * `n` -- number of equations and unknowns
    /// * `rhs_columns` -- number of columns of each right-hand side block
    pub fn new(n: usize, rhs_columns: &[usize]) -> Self {
        LocalSystem {
            a: Matrix::new(n, n),
            rhs: rhs_columns.iter().map(|m| Matrix::new(n, *m)).collect(),
        }
    }

    /// Adds a value to the coefficient matrix
    #[inline]
    pub fn add_a(&mut self, i: usize, j: usize, value: f64) {
        self.a.set(i, j, self.a.get(i, j) + value);
    }

    /// Adds a value to a right-hand side block
    #[inline]
    pub fn add_rhs(&mut self, block: usize, i: usize, j: usize, value: f64) {
        let b = &mut self.rhs[block];
        b.set(i, j, b.get(i, j) + value);
    }

    /// Eliminates the unknowns and returns `A⁻¹ B_k` for each block
    ///
    /// The rows are equilibrated (scaled by their largest coefficient) before inversion.
    /// The local system is rejected if a row vanishes, the inversion fails, or the
    /// 1-norm condition estimate exceeds [MAX_LOCAL_CONDITION].
    pub fn solve(mut self, node: usize) -> Result<Vec<Matrix>, Error> {
        let n = self.equilibrate(node)?;
        let mut ai = Matrix::new(n, n);
        if mat_inverse(&mut ai, &self.a).is_err() {
            return Err(Error::SingularLocalSystem {
                node,
                condition: f64::INFINITY,
            });
        }
        let condition = mat_norm(&self.a, Norm::One) * mat_norm(&ai, Norm::One);
        trace!("node {}: local system of size {} with condition estimate {:e}", node, n, condition);
        if !condition.is_finite() || condition > MAX_LOCAL_CONDITION {
            return Err(Error::SingularLocalSystem { node, condition });
        }
        self.multiply(&ai)
    }

    /// Eliminates the unknowns in the least-squares sense and returns `A⁺ B_k` for each block
    ///
    /// This is used where the equations leave part of the unknowns undetermined by
    /// construction (e.g., the rotation of sub-cells bounded by traction conditions only).
    /// The minimum-norm solution sets the undetermined part to zero.
    ///
    /// Singular values below `σ_max / MAX_LOCAL_CONDITION` span the null space. A null space
    /// larger than `max_null_space` (the number of undetermined rotations) means that the
    /// region is degenerate; it is then solved anyway but reported with a warning.
    pub fn solve_minimum_norm(mut self, node: usize, max_null_space: usize) -> Result<Vec<Matrix>, Error> {
        let n = self.equilibrate(node)?;
        let mut s = Vector::new(n);
        let mut u = Matrix::new(n, n);
        let mut vt = Matrix::new(n, n);
        let mut a = self.a.clone();
        if mat_svd(&mut s, &mut u, &mut vt, &mut a).is_err() {
            return Err(Error::SingularLocalSystem {
                node,
                condition: f64::INFINITY,
            });
        }
        let sv_max = s.as_data().iter().fold(0.0, |m: f64, v| m.max(*v));
        if !sv_max.is_finite() || sv_max == 0.0 {
            return Err(Error::SingularLocalSystem {
                node,
                condition: f64::INFINITY,
            });
        }
        let cutoff = sv_max / MAX_LOCAL_CONDITION;
        let kept: Vec<usize> = (0..n).filter(|k| s[*k] > cutoff).collect();
        let null_space = n - kept.len();
        trace!(
            "node {}: minimum-norm local system of size {} with null space dimension {}",
            node,
            n,
            null_space
        );
        if null_space > max_null_space {
            let sv_min = s.as_data().iter().fold(f64::INFINITY, |m: f64, v| m.min(*v));
            warn!(
                "node {}: local system has {} null modes (at most {} expected); σ_min/σ_max = {:e}",
                node,
                null_space,
                max_null_space,
                sv_min / sv_max
            );
        }

        // A⁺ = V Σ⁺ Uᵀ
        let mut ai = Matrix::new(n, n);
        for i in 0..n {
            for j in 0..n {
                let v: f64 = kept.iter().map(|k| vt.get(*k, i) * u.get(j, *k) / s[*k]).sum();
                ai.set(i, j, v);
            }
        }
        let norm = mat_norm(&ai, Norm::One);
        if !norm.is_finite() {
            return Err(Error::SingularLocalSystem { node, condition: norm });
        }
        self.multiply(&ai)
    }

    /// Scales each row by its largest coefficient and returns the size of the system
    fn equilibrate(&mut self, node: usize) -> Result<usize, Error> {
        let (n, _) = self.a.dims();
        for i in 0..n {
            let mut scale = 0.0;
            for j in 0..n {
                scale = f64::max(scale, f64::abs(self.a.get(i, j)));
            }
            if scale == 0.0 {
                return Err(Error::SingularLocalSystem {
                    node,
                    condition: f64::INFINITY,
                });
            }
            for j in 0..n {
                self.a.set(i, j, self.a.get(i, j) / scale);
            }
            for b in self.rhs.iter_mut() {
                for j in 0..b.dims().1 {
                    b.set(i, j, b.get(i, j) / scale);
                }
            }
        }
        Ok(n)
    }

    /// Returns `ai ⋅ B_k` for each block
    fn multiply(&self, ai: &Matrix) -> Result<Vec<Matrix>, Error> {
        let (n, _) = ai.dims();
        let mut results = Vec::with_capacity(self.rhs.len());
        for b in &self.rhs {
            let mut g = Matrix::new(n, b.dims().1);
            if b.dims().1 > 0 {
                mat_mat_mul(&mut g, 1.0, ai, b, 0.0).map_err(Error::LinearAlgebra)?;
            }
            results.push(g);
        }
        Ok(results)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
