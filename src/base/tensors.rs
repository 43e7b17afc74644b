use super::Error;
use serde::{Deserialize, Serialize};

/// Holds a second-order tensor per cell (e.g., permeability)
///
/// The `dim × dim` components of each cell are stored row-major and contiguously.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecondOrderTensor {
    /// Space dimension (2 or 3)
    pub dim: usize,

    /// Components (num_cells · dim²)
    pub values: Vec<f64>,
}

/// Holds a fourth-order tensor per cell (e.g., elastic stiffness)
///
/// The `dim⁴` components `C[i][j][k][l]` of each cell are stored contiguously with `l` running fastest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FourthOrderTensor {
    /// Space dimension (2 or 3)
    pub dim: usize,

    /// Components (num_cells · dim⁴)
    pub values: Vec<f64>,
}

fn check_dim(dim: usize) -> Result<(), Error> {
    if dim != 2 && dim != 3 {
        return Err(Error::Config("dimension must be 2 or 3"));
    }
    Ok(())
}

impl SecondOrderTensor {
    /// Allocates a new instance from raw components
    pub fn new(dim: usize, values: Vec<f64>) -> Result<Self, Error> {
        check_dim(dim)?;
        if values.len() % (dim * dim) != 0 {
            return Err(Error::Config("the number of tensor components must be a multiple of dim²"));
        }
        Ok(SecondOrderTensor { dim, values })
    }

    /// Allocates an isotropic tensor `kxx δij` per cell
    pub fn isotropic(dim: usize, kxx: &[f64]) -> Result<Self, Error> {
        check_dim(dim)?;
        let mut values = vec![0.0; kxx.len() * dim * dim];
        for (c, k) in kxx.iter().enumerate() {
            for i in 0..dim {
                values[c * dim * dim + i * dim + i] = *k;
            }
        }
        Ok(SecondOrderTensor { dim, values })
    }

    /// Allocates a uniform isotropic tensor
    pub fn uniform(dim: usize, num_cells: usize, kxx: f64) -> Result<Self, Error> {
        SecondOrderTensor::isotropic(dim, &vec![kxx; num_cells])
    }

    /// Allocates a symmetric 2D tensor per cell
    pub fn anisotropic_2d(kxx: &[f64], kyy: &[f64], kxy: &[f64]) -> Result<Self, Error> {
        let nc = kxx.len();
        if kyy.len() != nc || kxy.len() != nc {
            return Err(Error::Config("all tensor components must have the same length"));
        }
        let mut values = Vec::with_capacity(4 * nc);
        for c in 0..nc {
            values.extend_from_slice(&[kxx[c], kxy[c], kxy[c], kyy[c]]);
        }
        Ok(SecondOrderTensor { dim: 2, values })
    }

    /// Allocates a symmetric 3D tensor per cell
    pub fn anisotropic_3d(
        kxx: &[f64],
        kyy: &[f64],
        kzz: &[f64],
        kxy: &[f64],
        kxz: &[f64],
        kyz: &[f64],
    ) -> Result<Self, Error> {
        let nc = kxx.len();
        if [kyy.len(), kzz.len(), kxy.len(), kxz.len(), kyz.len()].iter().any(|n| *n != nc) {
            return Err(Error::Config("all tensor components must have the same length"));
        }
        let mut values = Vec::with_capacity(9 * nc);
        for c in 0..nc {
            values.extend_from_slice(&[
                kxx[c], kxy[c], kxz[c], //
                kxy[c], kyy[c], kyz[c], //
                kxz[c], kyz[c], kzz[c],
            ]);
        }
        Ok(SecondOrderTensor { dim: 3, values })
    }

    /// Returns the number of cells
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.values.len() / (self.dim * self.dim)
    }

    /// Returns the component (i,j) of cell c
    #[inline]
    pub fn get(&self, c: usize, i: usize, j: usize) -> f64 {
        self.values[c * self.dim * self.dim + i * self.dim + j]
    }

    /// Returns a copy with each cell tensor multiplied by a factor
    pub fn scaled(&self, factors: &[f64]) -> Result<Self, Error> {
        if factors.len() != self.num_cells() {
            return Err(Error::Config("the number of scaling factors must equal the number of cells"));
        }
        let dd = self.dim * self.dim;
        let values = self.values.iter().enumerate().map(|(m, v)| v * factors[m / dd]).collect();
        Ok(SecondOrderTensor { dim: self.dim, values })
    }
}

impl FourthOrderTensor {
    /// Allocates a new instance from raw components
    pub fn new(dim: usize, values: Vec<f64>) -> Result<Self, Error> {
        check_dim(dim)?;
        if values.len() % (dim * dim * dim * dim) != 0 {
            return Err(Error::Config("the number of tensor components must be a multiple of dim⁴"));
        }
        Ok(FourthOrderTensor { dim, values })
    }

    /// Allocates the isotropic linear elastic tensor per cell
    ///
    /// ```text
    /// C[i][j][k][l] = λ δij δkl + μ (δik δjl + δil δjk)
    /// ```
    pub fn isotropic(dim: usize, mu: &[f64], lambda: &[f64]) -> Result<Self, Error> {
        check_dim(dim)?;
        if mu.len() != lambda.len() {
            return Err(Error::Config("mu and lambda must have the same length"));
        }
        let delta = |a: usize, b: usize| if a == b { 1.0 } else { 0.0 };
        let d4 = dim * dim * dim * dim;
        let mut values = vec![0.0; mu.len() * d4];
        for c in 0..mu.len() {
            for i in 0..dim {
                for j in 0..dim {
                    for k in 0..dim {
                        for l in 0..dim {
                            values[c * d4 + ((i * dim + j) * dim + k) * dim + l] = lambda[c]
                                * delta(i, j)
                                * delta(k, l)
                                + mu[c] * (delta(i, k) * delta(j, l) + delta(i, l) * delta(j, k));
                        }
                    }
                }
            }
        }
        Ok(FourthOrderTensor { dim, values })
    }

    /// Allocates a uniform isotropic elastic tensor
    pub fn uniform(dim: usize, num_cells: usize, mu: f64, lambda: f64) -> Result<Self, Error> {
        FourthOrderTensor::isotropic(dim, &vec![mu; num_cells], &vec![lambda; num_cells])
    }

    /// Returns the number of cells
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.values.len() / (self.dim * self.dim * self.dim * self.dim)
    }

    /// Returns the component (i,j,k,l) of cell c
    #[inline]
    pub fn get(&self, c: usize, i: usize, j: usize, k: usize, l: usize) -> f64 {
        let d = self.dim;
        self.values[c * d * d * d * d + ((i * d + j) * d + k) * d + l]
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
