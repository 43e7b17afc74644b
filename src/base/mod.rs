//! Implements the base structures for a finite volume discretization

mod boundary_condition;
mod config;
mod constants;
mod error;
mod grid;
mod tensors;
pub use crate::base::boundary_condition::*;
pub use crate::base::config::*;
pub use crate::base::constants::*;
pub use crate::base::error::*;
pub use crate::base::grid::*;
pub use crate::base::tensors::*;
