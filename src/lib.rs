//! Finite volume discretization and assembly of poroelastic (Biot) problems
//!
//! The crate computes multi-point flux (MPFA) and multi-point stress (MPSA)
//! approximations on general grids and assembles them, together with the
//! flow-mechanics coupling terms, into one global sparse linear system.
//!
//! * [base] holds the grid, tensors, boundary conditions and configuration data
//! * [fv] holds the local (interaction region) discretizations
//! * [assembly] holds the cache, DOF numbering, block assembler and the monolithic Biot path

/// Defines a type alias for the error type as a static string
pub type StrError = &'static str;

pub mod assembly;
pub mod base;
pub mod fv;
pub mod prelude;
