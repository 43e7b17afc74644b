//! Makes available common structures needed to discretize and assemble a problem
//!
//! You may write `use fvbiot::prelude::*` in your code and obtain
//! access to commonly used functionality.

pub use crate::assembly::{Assembler, Biot, DofManager, GridData, LinearSystem, MatrixCache, Operator, Physics};
pub use crate::assembly::{Discretization, Term, Variable};
pub use crate::base::{BcKind, BoundaryCondition, Error, Grid, GridId, VectorBoundaryCondition};
pub use crate::base::{FlowConfig, MechanicsConfig, MechanicsState, Parameters, TimeScheme};
pub use crate::base::{FourthOrderTensor, SecondOrderTensor};
pub use crate::fv::{mpfa, mpsa, FluxMatrices, MechanicsMatrices};
