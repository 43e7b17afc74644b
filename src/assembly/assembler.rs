use super::{discretize_physics, place_block, DofManager, GridData, LinearSystem, MatrixCache};
use crate::base::Error;
use crate::fv::{mat_add, Triplets};
use log::{debug, trace};
use nalgebra_sparse::csr::CsrMatrix;
use russell_lab::Vector;
use std::collections::BTreeMap;

/// Assembles the global system from the terms declared on each grid
///
/// The global matrix is made of blocks, one per (row variable, col variable) pair,
/// placed according to the [DofManager]. Terms targeting the same block are summed.
pub struct Assembler;

impl Assembler {
    /// Computes the operators of all physics needed by the terms and stores them in `cache`
    ///
    /// The cache is modified only if all discretizations succeed.
    pub fn discretize(grids: &[GridData], cache: &mut MatrixCache) -> Result<(), Error> {
        let staging = Assembler::stage(grids)?;
        cache.merge(staging);
        Ok(())
    }

    /// Assembles the global matrix and right-hand side
    ///
    /// # Input
    ///
    /// * `grids` -- the grids with their variables and terms
    /// * `cache` -- holds the discretization operators
    /// * `discretize` -- recompute the operators; otherwise the cached ones are reused
    ///
    /// # Output
    ///
    /// Returns the global system and the DOF numbering. The cache is modified only if
    /// the whole assembly succeeds.
    ///
    /// # Examples
    ///
    /// ```
    /// use fvbiot::prelude::*;
    ///
    /// fn main() -> Result<(), Error> {
    ///     let grid = Grid::cartesian_2d(2, 1, 2.0, 1.0)?;
    ///     let mut params = Parameters::biot(&grid)?;
    ///     params.flow_mut()?.set_bc(BoundaryCondition::all(&grid, BcKind::Dirichlet))?;
    ///     let data = GridData::new(&grid, &params)
    ///         .with_variable(Variable::new("p", 1))
    ///         .with_term(Term::diagonal("flux", "p", Discretization::Mpfa(TimeScheme::Stationary)));
    ///     let mut cache = MatrixCache::new();
    ///     let (system, dofs) = Assembler::assemble_matrix_rhs(&[data], &mut cache, true)?;
    ///     assert_eq!(dofs.n_dof(), 2);
    ///     assert_eq!(system.dim(), 2);
    ///     assert!(cache.contains(grid.id, Operator::Flux));
    ///     Ok(())
    /// }
    /// ```
    pub fn assemble_matrix_rhs(
        grids: &[GridData],
        cache: &mut MatrixCache,
        discretize: bool,
    ) -> Result<(LinearSystem, DofManager), Error> {
        let dofs = DofManager::new(grids)?;
        Assembler::check_terms(grids, &dofs)?;
        let staging = if discretize {
            Some(Assembler::stage(grids)?)
        } else {
            None
        };
        let operators = match &staging {
            Some(s) => s,
            None => &*cache,
        };

        // sum the terms of each block
        let mut blocks: BTreeMap<(usize, usize), CsrMatrix<f64>> = BTreeMap::new();
        let mut rhs_blocks: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
        for data in grids {
            for term in &data.terms {
                let row = dofs.block(data.grid.id, &term.row)?;
                let col = dofs.block(data.grid.id, &term.col)?;
                let (a, b) = term.discretization.assemble(data.grid, data.params, operators)?;
                if a.nrows() != dofs.block_sizes[row] || a.ncols() != dofs.block_sizes[col] {
                    return Err(Error::Config("operator shape does not match the variable sizes"));
                }
                trace!(
                    "grid {}: term '{}' → block ({}, {}) with nnz = {}",
                    data.grid.id.0,
                    term.name,
                    row,
                    col,
                    a.nnz()
                );
                match blocks.remove(&(row, col)) {
                    Some(previous) => blocks.insert((row, col), mat_add(1.0, &previous, 1.0, &a)?),
                    None => blocks.insert((row, col), a),
                };
                let rhs = rhs_blocks.entry(row).or_insert_with(|| vec![0.0; dofs.block_sizes[row]]);
                for (r, v) in rhs.iter_mut().zip(&b) {
                    *r += v;
                }
            }
        }

        // place the blocks in sorted order
        let n = dofs.n_dof();
        let mut triplets = Triplets::new(n, n);
        for ((row, col), block) in &blocks {
            place_block(&mut triplets, block, dofs.full_dof[*row], dofs.full_dof[*col]);
        }
        let mut rhs = Vector::new(n);
        for (row, values) in &rhs_blocks {
            for (k, v) in values.iter().enumerate() {
                rhs[dofs.full_dof[*row] + k] = *v;
            }
        }
        let system = LinearSystem::new(triplets.to_csr()?, rhs)?;
        debug!(
            "assembled {} blocks into a system with {} equations and nnz = {}",
            blocks.len(),
            n,
            system.matrix.nnz()
        );
        if let Some(s) = staging {
            cache.merge(s);
        }
        Ok((system, dofs))
    }

    /// Checks that all terms refer to declared variables
    fn check_terms(grids: &[GridData], dofs: &DofManager) -> Result<(), Error> {
        for data in grids {
            for term in &data.terms {
                if dofs.block(data.grid.id, &term.row).is_err() || dofs.block(data.grid.id, &term.col).is_err() {
                    return Err(Error::Config("term refers to an undeclared variable"));
                }
            }
        }
        Ok(())
    }

    /// Discretizes all physics needed by the terms into a new cache
    fn stage(grids: &[GridData]) -> Result<MatrixCache, Error> {
        let mut staging = MatrixCache::new();
        for data in grids {
            for physics in data.physics() {
                if !staging.contains_physics(data.grid.id, physics) {
                    discretize_physics(data.grid, data.params, physics, &mut staging)?;
                }
            }
        }
        Ok(staging)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
