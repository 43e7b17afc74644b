use crate::base::{Error, Grid};
use nalgebra_sparse::coo::CooMatrix as SparseTriplets;
use nalgebra_sparse::csr::CsrMatrix;

/// Accumulates (row, col, value) triplets and converts them to CSR
///
/// Duplicates are summed during conversion.
pub struct Triplets {
    nrow: usize,
    ncol: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl Triplets {
    /// Allocates a new instance
    pub fn new(nrow: usize, ncol: usize) -> Self {
        Triplets {
            nrow,
            ncol,
            rows: Vec::new(),
            cols: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Adds a value at (row, col); zero values are skipped
    #[inline]
    pub fn put(&mut self, row: usize, col: usize, value: f64) {
        if value != 0.0 {
            self.rows.push(row);
            self.cols.push(col);
            self.values.push(value);
        }
    }

    /// Returns the number of stored triplets
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Converts to CSR (summing duplicates)
    pub fn to_csr(self) -> Result<CsrMatrix<f64>, Error> {
        let coo = SparseTriplets::try_from_triplets(self.nrow, self.ncol, self.rows, self.cols, self.values)
            .map_err(|_| Error::LinearAlgebra("triplet index is out of bounds"))?;
        Ok(CsrMatrix::from(&coo))
    }
}

/// Computes the matrix-vector product `a ⋅ x`
pub fn mat_vec(a: &CsrMatrix<f64>, x: &[f64]) -> Result<Vec<f64>, Error> {
    if x.len() != a.ncols() {
        return Err(Error::Config("vector length must equal the number of matrix columns"));
    }
    let mut y = vec![0.0; a.nrows()];
    for (i, row) in a.row_iter().enumerate() {
        y[i] = row.col_indices().iter().zip(row.values()).map(|(j, v)| v * x[*j]).sum();
    }
    Ok(y)
}

/// Computes the matrix-matrix product `a ⋅ b`
pub fn mat_mat(a: &CsrMatrix<f64>, b: &CsrMatrix<f64>) -> Result<CsrMatrix<f64>, Error> {
    if a.ncols() != b.nrows() {
        return Err(Error::Config("operator shapes are incompatible"));
    }
    Ok(a * b)
}

/// Computes `α a + β b`
pub fn mat_add(alpha: f64, a: &CsrMatrix<f64>, beta: f64, b: &CsrMatrix<f64>) -> Result<CsrMatrix<f64>, Error> {
    if a.nrows() != b.nrows() || a.ncols() != b.ncols() {
        return Err(Error::Config("operator shapes are incompatible"));
    }
    let mut sum = Triplets::new(a.nrows(), a.ncols());
    for (i, j, v) in a.triplet_iter() {
        sum.put(i, j, alpha * v);
    }
    for (i, j, v) in b.triplet_iter() {
        sum.put(i, j, beta * v);
    }
    sum.to_csr()
}

/// Returns `α a` (keeping the sparsity pattern of `a`)
pub fn mat_scale(alpha: f64, a: &CsrMatrix<f64>) -> CsrMatrix<f64> {
    let mut res = a.clone();
    res.values_mut().iter_mut().for_each(|v| *v *= alpha);
    res
}

/// Returns the scalar divergence (num_cells × num_faces) with the signed cell-face incidence
pub fn scalar_divergence(grid: &Grid) -> Result<CsrMatrix<f64>, Error> {
    let mut div = Triplets::new(grid.num_cells, grid.num_faces);
    for c in 0..grid.num_cells {
        for (f, sign) in &grid.cell_faces[c] {
            div.put(c, *f, *sign);
        }
    }
    div.to_csr()
}

/// Returns the vector divergence (num_cells·dim × num_faces·dim) acting per component
pub fn vector_divergence(grid: &Grid) -> Result<CsrMatrix<f64>, Error> {
    let d = grid.dim;
    let mut div = Triplets::new(grid.num_cells * d, grid.num_faces * d);
    for c in 0..grid.num_cells {
        for (f, sign) in &grid.cell_faces[c] {
            for i in 0..d {
                div.put(c * d + i, f * d + i, *sign);
            }
        }
    }
    div.to_csr()
}

/// Returns the matrix (num_faces × num_faces·nd) summing the nd components of each face
pub fn face_vector_to_scalar(num_faces: usize, nd: usize) -> Result<CsrMatrix<f64>, Error> {
    let mut mat = Triplets::new(num_faces, num_faces * nd);
    for f in 0..num_faces {
        for k in 0..nd {
            mat.put(f, f * nd + k, 1.0);
        }
    }
    mat.to_csr()
}

/// Returns the diagonal mass matrix `mass_weight · volume · aperture`
pub fn mass_matrix(grid: &Grid, mass_weight: &[f64], aperture: &[f64]) -> Result<CsrMatrix<f64>, Error> {
    grid.check_cells_len(mass_weight.len(), "mass_weight must have num_cells entries")?;
    grid.check_cells_len(aperture.len(), "aperture must have num_cells entries")?;
    let mut mass = Triplets::new(grid.num_cells, grid.num_cells);
    for c in 0..grid.num_cells {
        mass.put(c, c, mass_weight[c] * grid.cell_volumes[c] * aperture[c]);
    }
    mass.to_csr()
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
