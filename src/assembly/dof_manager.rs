use super::GridData;
use crate::base::{Error, GridId};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

/// Numbers the degrees of freedom of all (grid, variable) pairs
///
/// Each pair (a block) receives a contiguous range of global equation numbers.
/// Blocks are numbered following the grids in the given order and then the
/// variables in declaration order; thus, the numbering is deterministic.
///
/// # Examples
///
/// ```
/// use fvbiot::prelude::*;
///
/// fn main() -> Result<(), Error> {
///     let grid = Grid::cartesian_2d(2, 1, 2.0, 1.0)?;
///     let params = Parameters::biot(&grid)?;
///     let data = GridData::new(&grid, &params)
///         .with_variable(Variable::new("u", 2))
///         .with_variable(Variable::new("p", 1));
///     let dofs = DofManager::new(&[data])?;
///     assert_eq!(dofs.n_dof(), 6);
///     assert_eq!(dofs.dof_range(grid.id, "p")?, 4..6);
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct DofManager {
    /// Maps (grid, variable name) to the block number
    pub block_dof: HashMap<(GridId, String), usize>,

    /// Holds the first global equation of each block plus the total number of equations (num_blocks + 1)
    pub full_dof: Vec<usize>,

    /// Holds the number of equations of each block (num_blocks)
    pub block_sizes: Vec<usize>,

    /// Holds the (grid, variable name) of each block (num_blocks)
    pub blocks: Vec<(GridId, String)>,
}

impl DofManager {
    /// Allocates a new instance
    ///
    /// A variable name declared twice on the same grid is mapped to a single block;
    /// declaring it with a different number of DOFs per cell is an error.
    pub fn new(grids: &[GridData]) -> Result<Self, Error> {
        let mut block_dof = HashMap::new();
        let mut full_dof = vec![0];
        let mut block_sizes = Vec::new();
        let mut blocks = Vec::new();
        for data in grids {
            for var in &data.variables {
                if var.dofs_per_cell == 0 {
                    return Err(Error::Config("variables must have at least one DOF per cell"));
                }
                let size = var.dofs_per_cell * data.grid.num_cells;
                let key = (data.grid.id, var.name.clone());
                if let Some(b) = block_dof.get(&key) {
                    if block_sizes[*b] != size {
                        return Err(Error::Config("variable declared twice with different DOFs per cell"));
                    }
                    continue;
                }
                block_dof.insert(key.clone(), blocks.len());
                full_dof.push(full_dof[blocks.len()] + size);
                block_sizes.push(size);
                blocks.push(key);
            }
        }
        Ok(DofManager {
            block_dof,
            full_dof,
            block_sizes,
            blocks,
        })
    }

    /// Returns the total number of DOFs (equations)
    pub fn n_dof(&self) -> usize {
        self.full_dof[self.blocks.len()]
    }

    /// Returns the number of blocks
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the block number of a (grid, variable) pair
    pub fn block(&self, grid: GridId, name: &str) -> Result<usize, Error> {
        self.block_dof
            .get(&(grid, name.to_string()))
            .copied()
            .ok_or(Error::Config("variable is not registered on the grid"))
    }

    /// Returns the range of global equations of a (grid, variable) pair
    pub fn dof_range(&self, grid: GridId, name: &str) -> Result<Range<usize>, Error> {
        let b = self.block(grid, name)?;
        Ok(self.full_dof[b]..self.full_dof[b + 1])
    }

    /// Returns the map from the equations of this numbering to the equations of another one
    ///
    /// Both numberings must hold the same (grid, variable) pairs with the same sizes;
    /// `perm[i]` is the equation in `other` corresponding to equation `i` here.
    pub fn permutation_to(&self, other: &DofManager) -> Result<Vec<usize>, Error> {
        if self.n_dof() != other.n_dof() || self.num_blocks() != other.num_blocks() {
            return Err(Error::Config("DOF numberings have different blocks"));
        }
        let mut perm = vec![0; self.n_dof()];
        for (b, (grid, name)) in self.blocks.iter().enumerate() {
            let target = other.dof_range(*grid, name)?;
            if target.len() != self.block_sizes[b] {
                return Err(Error::Config("DOF numberings have different blocks"));
            }
            for (k, i) in (self.full_dof[b]..self.full_dof[b + 1]).enumerate() {
                perm[i] = target.start + k;
            }
        }
        Ok(perm)
    }
}

impl fmt::Display for DofManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blocks of equations\n").unwrap();
        write!(f, "===================\n").unwrap();
        for (b, (grid, name)) in self.blocks.iter().enumerate() {
            write!(
                f,
                "{}: grid {} '{}' → [{}, {})\n",
                b,
                grid.0,
                name,
                self.full_dof[b],
                self.full_dof[b + 1]
            )
            .unwrap();
        }
        write!(f, "total = {}\n", self.n_dof()).unwrap();
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
