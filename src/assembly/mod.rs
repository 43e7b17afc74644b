//! Implements the matrix cache, the DOF numbering and the assemblers of the global system

mod assembler;
mod biot;
mod dof_manager;
mod linear_system;
mod matrix_cache;
mod terms;
pub use crate::assembly::assembler::*;
pub use crate::assembly::biot::*;
pub use crate::assembly::dof_manager::*;
pub use crate::assembly::linear_system::*;
pub use crate::assembly::matrix_cache::*;
pub use crate::assembly::terms::*;
