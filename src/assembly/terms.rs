use super::{MatrixCache, Operator, Physics};
use crate::base::{Error, Grid, Parameters, TimeScheme};
use crate::fv::{mass_matrix, mat_mat, mat_scale, mat_vec, mpfa, mpsa, scalar_divergence, vector_divergence};
use log::{debug, trace};
use nalgebra_sparse::csr::CsrMatrix;

/// Holds a primary variable of a grid
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    /// Name (unique per grid)
    pub name: String,

    /// Number of unknowns per cell (1 for pressure; dim for displacement)
    pub dofs_per_cell: usize,
}

/// Defines how a term is discretized and assembled
///
/// Each discretization yields a block matrix `A` and a right-hand side `b` such that
/// the term contributes `A ⋅ x_col` to the left-hand side and `b` to the right-hand
/// side of the `row` equations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Discretization {
    /// Flow divergence `div ⋅ flux` with rhs `-div ⋅ bound_flux ⋅ p_b` (scaled by Δt if implicit)
    Mpfa(TimeScheme),

    /// Accumulation `mass` with rhs `mass ⋅ p⁰` if implicit (zero otherwise)
    MassMatrix(TimeScheme),

    /// Mechanics divergence `div ⋅ stress` with rhs `-div ⋅ bound_stress ⋅ u_b`
    Mpsa,

    /// Pressure force in the momentum balance `α div ⋅ grad_p`
    GradP,

    /// Displacement divergence in the mass balance `α div_d` with rhs
    /// `α div_d ⋅ u⁰ - α bound_div_d ⋅ (u_b - u_b⁰)`
    DivD,

    /// Stabilization `α stab` with rhs `α stab ⋅ p⁰`
    BiotStabilization,
}

/// Holds a term of the equations of a grid
#[derive(Clone, Debug, PartialEq)]
pub struct Term {
    /// Name (for logging)
    pub name: String,

    /// Variable whose equations receive the term
    pub row: String,

    /// Variable the term acts on
    pub col: String,

    /// Discretization
    pub discretization: Discretization,
}

/// Holds the grid, parameters, variables and terms of a problem
#[derive(Clone, Debug)]
pub struct GridData<'a> {
    /// Grid
    pub grid: &'a Grid,

    /// Parameters of all physics on the grid
    pub params: &'a Parameters,

    /// Primary variables (in declaration order)
    pub variables: Vec<Variable>,

    /// Terms (terms with the same row and col are summed)
    pub terms: Vec<Term>,
}

impl Variable {
    /// Allocates a new instance
    pub fn new(name: &str, dofs_per_cell: usize) -> Self {
        Variable {
            name: name.to_string(),
            dofs_per_cell,
        }
    }
}

impl Term {
    /// Allocates a new instance
    pub fn new(name: &str, row: &str, col: &str, discretization: Discretization) -> Self {
        Term {
            name: name.to_string(),
            row: row.to_string(),
            col: col.to_string(),
            discretization,
        }
    }

    /// Allocates a new instance acting on the same variable as its equations
    pub fn diagonal(name: &str, variable: &str, discretization: Discretization) -> Self {
        Term::new(name, variable, variable, discretization)
    }
}

impl<'a> GridData<'a> {
    /// Allocates a new instance without variables and terms
    pub fn new(grid: &'a Grid, params: &'a Parameters) -> Self {
        GridData {
            grid,
            params,
            variables: Vec::new(),
            terms: Vec::new(),
        }
    }

    /// Adds a variable
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Adds a term
    pub fn with_term(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    /// Returns the physics whose operators are needed by the terms (sorted, without duplicates)
    pub fn physics(&self) -> Vec<Physics> {
        let mut all: Vec<_> = self.terms.iter().map(|t| t.discretization.physics()).collect();
        all.sort();
        all.dedup();
        all
    }
}

impl Discretization {
    /// Returns the physics computing the operators of this discretization
    pub fn physics(&self) -> Physics {
        match self {
            Discretization::Mpfa(..) | Discretization::MassMatrix(..) => Physics::Flow,
            _ => Physics::Mechanics,
        }
    }

    /// Returns the block matrix and the right-hand side of the term
    ///
    /// The operators are read from `operators`, which must hold the discretization of `grid`.
    pub fn assemble(
        &self,
        grid: &Grid,
        params: &Parameters,
        operators: &MatrixCache,
    ) -> Result<(CsrMatrix<f64>, Vec<f64>), Error> {
        let id = grid.id;
        match self {
            Discretization::Mpfa(scheme) => {
                let flow = params.flow()?;
                let div = scalar_divergence(grid)?;
                let a = mat_mat(&div, operators.get(id, Operator::Flux)?)?;
                let div_bound = mat_mat(&div, operators.get(id, Operator::BoundFlux)?)?;
                let b = mat_vec(&div_bound, &flow.bc_values)?;
                let factor = match scheme {
                    TimeScheme::Stationary => 1.0,
                    TimeScheme::ImplicitEuler => flow.time_step,
                };
                Ok((mat_scale(factor, &a), b.iter().map(|v| -factor * v).collect()))
            }
            Discretization::MassMatrix(scheme) => {
                let flow = params.flow()?;
                let mass = operators.get(id, Operator::Mass)?;
                let b = match scheme {
                    TimeScheme::Stationary => vec![0.0; mass.nrows()],
                    TimeScheme::ImplicitEuler => mat_vec(mass, &flow.state)?,
                };
                Ok((mass.clone(), b))
            }
            Discretization::Mpsa => {
                let mech = params.mechanics()?;
                let div = vector_divergence(grid)?;
                let a = mat_mat(&div, operators.get(id, Operator::Stress)?)?;
                let div_bound = mat_mat(&div, operators.get(id, Operator::BoundStress)?)?;
                let b = mat_vec(&div_bound, &mech.bc_values)?;
                Ok((a, b.iter().map(|v| -v).collect()))
            }
            Discretization::GradP => {
                let alpha = params.mechanics()?.biot_alpha;
                let div = vector_divergence(grid)?;
                let a = mat_mat(&div, operators.get(id, Operator::GradP)?)?;
                let b = vec![0.0; a.nrows()];
                Ok((mat_scale(alpha, &a), b))
            }
            Discretization::DivD => {
                let mech = params.mechanics()?;
                let alpha = mech.biot_alpha;
                let div_d = operators.get(id, Operator::DivD)?;
                let bound_div_d = operators.get(id, Operator::BoundDivD)?;
                let jump: Vec<_> = mech
                    .bc_values
                    .iter()
                    .zip(&mech.state.bc_values)
                    .map(|(now, old)| now - old)
                    .collect();
                let old = mat_vec(div_d, &mech.state.displacement)?;
                let bound = mat_vec(bound_div_d, &jump)?;
                let b = old.iter().zip(&bound).map(|(o, j)| alpha * (o - j)).collect();
                Ok((mat_scale(alpha, div_d), b))
            }
            Discretization::BiotStabilization => {
                let flow = params.flow()?;
                let stab = operators.get(id, Operator::Stabilization)?;
                let b = mat_vec(stab, &flow.state)?;
                Ok((
                    mat_scale(flow.biot_alpha, stab),
                    b.iter().map(|v| flow.biot_alpha * v).collect(),
                ))
            }
        }
    }
}

/// Computes the operators of one physics on one grid and stores them in `cache`
///
/// The flow operators use the permeability scaled by the aperture.
pub fn discretize_physics(
    grid: &Grid,
    params: &Parameters,
    physics: Physics,
    cache: &mut MatrixCache,
) -> Result<(), Error> {
    let id = grid.id;
    match physics {
        Physics::Flow => {
            let flow = params.flow()?;
            flow.validate(grid)?;
            let permeability = flow.effective_permeability()?;
            let m = mpfa(grid, &permeability, &flow.bc, flow.eta)?;
            let mass = mass_matrix(grid, &flow.mass_weight, &flow.aperture)?;
            trace!("grid {}: flux nnz = {}, bound_flux nnz = {}", id.0, m.flux.nnz(), m.bound_flux.nnz());
            cache.insert(id, Operator::Flux, m.flux);
            cache.insert(id, Operator::BoundFlux, m.bound_flux);
            cache.insert(id, Operator::Mass, mass);
        }
        Physics::Mechanics => {
            let mech = params.mechanics()?;
            mech.validate(grid)?;
            let m = mpsa(grid, &mech.stiffness, &mech.bc, mech.eta)?;
            trace!("grid {}: stress nnz = {}, grad_p nnz = {}", id.0, m.stress.nnz(), m.grad_p.nnz());
            cache.insert(id, Operator::Stress, m.stress);
            cache.insert(id, Operator::BoundStress, m.bound_stress);
            cache.insert(id, Operator::GradP, m.grad_p);
            cache.insert(id, Operator::DivD, m.div_d);
            cache.insert(id, Operator::Stabilization, m.stabilization);
            cache.insert(id, Operator::BoundDivD, m.bound_div_d);
        }
    }
    debug!("grid {}: {:?} operators discretized", id.0, physics);
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
