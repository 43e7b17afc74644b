//! Implements the local (interaction region) finite volume discretizations

mod local_system;
mod mpfa;
mod mpsa;
mod operators;
mod subcell_topology;
pub use crate::fv::local_system::*;
pub use crate::fv::mpfa::*;
pub use crate::fv::mpsa::*;
pub use crate::fv::operators::*;
pub use crate::fv::subcell_topology::*;
