use super::{discretize_physics, place_block, Discretization, GridData, LinearSystem, MatrixCache, Operator, Physics};
use super::{Term, Variable};
use crate::base::{Error, Grid, Parameters, TimeScheme};
use crate::fv::{mat_add, mat_mat, mat_scale, mat_vec, scalar_divergence, vector_divergence, Triplets};
use log::debug;
use russell_lab::Vector;

/// Name of the displacement variable of the monolithic system
pub const DISPLACEMENT: &str = "u";

/// Name of the pressure variable of the monolithic system
pub const PRESSURE: &str = "p";

/// Assembles the monolithic Biot system of one grid
///
/// The unknowns are ordered with the cell displacements first (cell-major, component
/// fastest) followed by the cell pressures. The system is
///
/// ```text
/// ┌                                                  ┐ ┌   ┐   ┌    ┐
/// │ div_m ⋅ stress    α_m div_m ⋅ grad_p              │ │ u │   │ bu │
/// │ α_m div_d         mass + Δt div ⋅ flux + α_f stab │ │ p │ = │ bp │
/// └                                                  ┘ └   ┘   └    ┘
///
/// bu = - div_m ⋅ bound_stress ⋅ u_b
/// bp = α_m div_d ⋅ u⁰ - α_m bound_div_d ⋅ (u_b - u_b⁰) + mass ⋅ p⁰ + α_f stab ⋅ p⁰ - Δt div ⋅ bound_flux ⋅ p_b
/// ```
///
/// where `α_m`, `α_f` are the Biot coefficients of the mechanics and flow parameters,
/// `Δt` is the flow time step, and `u⁰`, `u_b⁰`, `p⁰` hold the previous state.
#[derive(Clone, Copy, Debug)]
pub struct Biot {
    /// Reuse the cached flow operators instead of recomputing them on every call
    pub cache_flow: bool,
}

impl Biot {
    /// Allocates a new instance
    pub fn new(cache_flow: bool) -> Self {
        Biot { cache_flow }
    }

    /// Computes and caches the mechanics operators (stress and Biot coupling)
    pub fn discretize_mechanics(&self, grid: &Grid, params: &Parameters, cache: &mut MatrixCache) -> Result<(), Error> {
        let mut staging = MatrixCache::new();
        discretize_physics(grid, params, Physics::Mechanics, &mut staging)?;
        cache.merge(staging);
        Ok(())
    }

    /// Computes and caches the flow operators (flux and mass)
    pub fn discretize_flow(&self, grid: &Grid, params: &Parameters, cache: &mut MatrixCache) -> Result<(), Error> {
        let mut staging = MatrixCache::new();
        discretize_physics(grid, params, Physics::Flow, &mut staging)?;
        cache.merge(staging);
        Ok(())
    }

    /// Assembles the monolithic system
    ///
    /// If `discretize` is true, all operators are recomputed. Otherwise, the mechanics
    /// operators are taken from the cache, and the flow operators are recomputed unless
    /// `cache_flow` is set and they are already cached. The cache is modified only on success.
    pub fn matrix_rhs(
        &self,
        grid: &Grid,
        params: &Parameters,
        cache: &mut MatrixCache,
        discretize: bool,
    ) -> Result<LinearSystem, Error> {
        let flow = params.flow()?;
        let mech = params.mechanics()?;
        flow.validate(grid)?;
        mech.validate(grid)?;

        // recomputed operators are staged; the others are borrowed from the cache
        let id = grid.id;
        let mut staging = MatrixCache::new();
        if discretize {
            discretize_physics(grid, params, Physics::Mechanics, &mut staging)?;
        }
        if discretize || !self.cache_flow || !cache.contains_physics(id, Physics::Flow) {
            discretize_physics(grid, params, Physics::Flow, &mut staging)?;
        }
        let system = self.build(grid, params, &staging, cache)?;
        cache.merge(staging);
        Ok(system)
    }

    /// Builds the monolithic system from the staged operators (or else the cached ones)
    fn build(
        &self,
        grid: &Grid,
        params: &Parameters,
        staging: &MatrixCache,
        cache: &MatrixCache,
    ) -> Result<LinearSystem, Error> {
        let (flow, mech) = (params.flow()?, params.mechanics()?);
        let id = grid.id;
        let op = move |operator: Operator| {
            if staging.contains_physics(id, operator.physics()) {
                staging.get(id, operator)
            } else {
                cache.get(id, operator)
            }
        };
        let div = scalar_divergence(grid)?;
        let div_m = vector_divergence(grid)?;
        let (alpha_m, alpha_f, dt) = (mech.biot_alpha, flow.biot_alpha, flow.time_step);

        // mechanics rows
        let a_uu = mat_mat(&div_m, op(Operator::Stress)?)?;
        let a_up = mat_scale(alpha_m, &mat_mat(&div_m, op(Operator::GradP)?)?);
        let div_bound_stress = mat_mat(&div_m, op(Operator::BoundStress)?)?;
        let b_u: Vec<_> = mat_vec(&div_bound_stress, &mech.bc_values)?.iter().map(|v| -v).collect();

        // flow rows
        let mass = op(Operator::Mass)?;
        let stab = op(Operator::Stabilization)?;
        let div_d = op(Operator::DivD)?;
        let div_flux = mat_mat(&div, op(Operator::Flux)?)?;
        let div_bound_flux = mat_mat(&div, op(Operator::BoundFlux)?)?;
        let a_pu = mat_scale(alpha_m, div_d);
        let a_pp = mat_add(1.0, &mat_add(1.0, mass, dt, &div_flux)?, alpha_f, stab)?;
        let jump: Vec<_> = mech
            .bc_values
            .iter()
            .zip(&mech.state.bc_values)
            .map(|(now, old)| now - old)
            .collect();
        let old_div = mat_vec(div_d, &mech.state.displacement)?;
        let bound_div = mat_vec(op(Operator::BoundDivD)?, &jump)?;
        let old_mass = mat_vec(mass, &flow.state)?;
        let old_stab = mat_vec(stab, &flow.state)?;
        let source = mat_vec(&div_bound_flux, &flow.bc_values)?;

        // global system
        let (nu, np) = (grid.num_cells * grid.dim, grid.num_cells);
        let mut triplets = Triplets::new(nu + np, nu + np);
        place_block(&mut triplets, &a_uu, 0, 0);
        place_block(&mut triplets, &a_up, 0, nu);
        place_block(&mut triplets, &a_pu, nu, 0);
        place_block(&mut triplets, &a_pp, nu, nu);
        let mut rhs = Vector::new(nu + np);
        for i in 0..nu {
            rhs[i] = b_u[i];
        }
        for c in 0..np {
            rhs[nu + c] = alpha_m * old_div[c] - alpha_m * bound_div[c] + old_mass[c] + alpha_f * old_stab[c]
                - dt * source[c];
        }
        let system = LinearSystem::new(triplets.to_csr()?, rhs)?;
        debug!(
            "grid {}: Biot system with {} equations and nnz = {}",
            id.0,
            nu + np,
            system.matrix.nnz()
        );
        Ok(system)
    }

    /// Returns the face fluxes `flux ⋅ p + bound_flux ⋅ p_b` (requires the cached flow operators)
    pub fn face_fluxes(
        &self,
        grid: &Grid,
        params: &Parameters,
        cache: &MatrixCache,
        pressure: &[f64],
    ) -> Result<Vec<f64>, Error> {
        let flow = params.flow()?;
        grid.check_cells_len(pressure.len(), "pressure must have num_cells entries")?;
        let cells = mat_vec(cache.get(grid.id, Operator::Flux)?, pressure)?;
        let bound = mat_vec(cache.get(grid.id, Operator::BoundFlux)?, &flow.bc_values)?;
        Ok(cells.iter().zip(&bound).map(|(a, b)| a + b).collect())
    }

    /// Returns the face tractions `stress ⋅ u + bound_stress ⋅ u_b + α_m grad_p ⋅ p`
    /// (requires the cached mechanics operators)
    pub fn face_tractions(
        &self,
        grid: &Grid,
        params: &Parameters,
        cache: &MatrixCache,
        displacement: &[f64],
        pressure: &[f64],
    ) -> Result<Vec<f64>, Error> {
        let mech = params.mechanics()?;
        grid.check_cells_len(pressure.len(), "pressure must have num_cells entries")?;
        if displacement.len() != grid.num_cells * grid.dim {
            return Err(Error::Config("displacement must have num_cells·dim entries"));
        }
        let cells = mat_vec(cache.get(grid.id, Operator::Stress)?, displacement)?;
        let bound = mat_vec(cache.get(grid.id, Operator::BoundStress)?, &mech.bc_values)?;
        let coupling = mat_vec(cache.get(grid.id, Operator::GradP)?, pressure)?;
        Ok((0..cells.len())
            .map(|k| cells[k] + bound[k] + mech.biot_alpha * coupling[k])
            .collect())
    }

    /// Splits the solution of the monolithic system into displacements and pressures
    pub fn split_state(&self, grid: &Grid, x: &[f64]) -> Result<(Vec<f64>, Vec<f64>), Error> {
        let nu = grid.num_cells * grid.dim;
        if x.len() != nu + grid.num_cells {
            return Err(Error::Config("state must have num_cells·(dim + 1) entries"));
        }
        Ok((x[..nu].to_vec(), x[nu..].to_vec()))
    }

    /// Returns the variables and terms reproducing the monolithic system with the block assembler
    pub fn grid_data<'a>(&self, grid: &'a Grid, params: &'a Parameters) -> GridData<'a> {
        let implicit = TimeScheme::ImplicitEuler;
        GridData::new(grid, params)
            .with_variable(Variable::new(DISPLACEMENT, grid.dim))
            .with_variable(Variable::new(PRESSURE, 1))
            .with_term(Term::diagonal("stress", DISPLACEMENT, Discretization::Mpsa))
            .with_term(Term::new("grad_p", DISPLACEMENT, PRESSURE, Discretization::GradP))
            .with_term(Term::new("div_u", PRESSURE, DISPLACEMENT, Discretization::DivD))
            .with_term(Term::diagonal("flux", PRESSURE, Discretization::Mpfa(implicit)))
            .with_term(Term::diagonal("mass", PRESSURE, Discretization::MassMatrix(implicit)))
            .with_term(Term::diagonal("stabilization", PRESSURE, Discretization::BiotStabilization))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Biot;
    use crate::assembly::{MatrixCache, Operator, Physics};
    use crate::base::{BcKind, BoundaryCondition, Error, Grid, Parameters, VectorBoundaryCondition};
    use russell_lab::{approx_eq, vec_approx_eq};

    fn dirichlet_params(grid: &Grid) -> Parameters {
        let mut params = Parameters::biot(grid).unwrap();
        params
            .flow_mut()
            .unwrap()
            .set_bc(BoundaryCondition::all(grid, BcKind::Dirichlet))
            .unwrap();
        params
            .mechanics_mut()
            .unwrap()
            .set_bc(VectorBoundaryCondition::all(grid, BcKind::Dirichlet))
            .unwrap();
        params
    }

    #[test]
    fn matrix_rhs_works() {
        let grid = Grid::cartesian_2d(2, 2, 1.0, 1.0).unwrap();
        let params = dirichlet_params(&grid);
        let biot = Biot::new(false);
        let mut cache = MatrixCache::new();
        let system = biot.matrix_rhs(&grid, &params, &mut cache, true).unwrap();
        assert_eq!(system.dim(), 12);
        assert!(cache.contains_physics(grid.id, Physics::Flow));
        assert!(cache.contains_physics(grid.id, Physics::Mechanics));
        // zero data gives zero rhs
        assert!(system.rhs.as_data().iter().all(|v| *v == 0.0));
        let x = system.solve_dense().unwrap();
        vec_approx_eq(&x, &[0.0; 12], 1e-12);
    }

    #[test]
    fn matrix_rhs_uses_the_cache() {
        let grid = Grid::cartesian_2d(2, 2, 1.0, 1.0).unwrap();
        let params = dirichlet_params(&grid);
        let mut cache = MatrixCache::new();
        assert_eq!(
            Biot::new(false).matrix_rhs(&grid, &params, &mut cache, false).err(),
            Some(Error::Config("operator has not been discretized"))
        );
        assert!(cache.is_empty());
        let biot = Biot::new(true);
        biot.discretize_mechanics(&grid, &params, &mut cache).unwrap();
        assert!(!cache.contains_physics(grid.id, Physics::Flow));
        let a = biot.matrix_rhs(&grid, &params, &mut cache, false).unwrap();
        assert!(cache.contains_physics(grid.id, Physics::Flow));
        let b = biot.matrix_rhs(&grid, &params, &mut cache, false).unwrap();
        assert_eq!(a.matrix.values(), b.matrix.values());

        // a stale flow cache is reused when cache_flow is set
        let mut other = params.clone();
        other.flow_mut().unwrap().set_mass_weight(&[0.5; 4]).unwrap();
        let mut stale = cache.clone();
        let c = biot.matrix_rhs(&grid, &other, &mut stale, false).unwrap();
        let d = Biot::new(false).matrix_rhs(&grid, &other, &mut cache, false).unwrap();
        assert_eq!(c.matrix.values(), a.matrix.values());
        assert_ne!(c.matrix.values(), d.matrix.values());
        stale.invalidate(grid.id, Physics::Flow);
        assert!(!stale.contains(grid.id, Operator::Mass));
        biot.discretize_flow(&grid, &other, &mut stale).unwrap();
        let e = biot.matrix_rhs(&grid, &other, &mut stale, false).unwrap();
        assert_eq!(e.matrix.values(), d.matrix.values());
    }

    #[test]
    fn matrix_rhs_borrows_the_cached_operators() {
        let grid = Grid::perturbed_2d(3, 2, 1.0, 1.0, 0.1).unwrap();
        let params = dirichlet_params(&grid);
        let biot = Biot::new(true);
        let mut cache = MatrixCache::new();
        let a = biot.matrix_rhs(&grid, &params, &mut cache, true).unwrap();
        assert_eq!(cache.len(), 9);
        let stress = cache.get(grid.id, Operator::Stress).unwrap().values().as_ptr();
        let flux = cache.get(grid.id, Operator::Flux).unwrap().values().as_ptr();
        let b = biot.matrix_rhs(&grid, &params, &mut cache, false).unwrap();
        // the stored operators were neither recomputed nor replaced
        assert_eq!(cache.len(), 9);
        assert_eq!(cache.get(grid.id, Operator::Stress).unwrap().values().as_ptr(), stress);
        assert_eq!(cache.get(grid.id, Operator::Flux).unwrap().values().as_ptr(), flux);
        assert_eq!(a.matrix.values(), b.matrix.values());
        assert_eq!(a.rhs.as_data(), b.rhs.as_data());
    }

    #[test]
    fn face_quantities_work() {
        let grid = Grid::cartesian_2d(2, 1, 2.0, 1.0).unwrap();
        let mut params = dirichlet_params(&grid);
        let nf = grid.num_faces;
        // p = 1 + x on the boundary; u = 0
        let pb: Vec<_> = (0..nf).map(|f| 1.0 + grid.face_centers[f][0]).collect();
        params.flow_mut().unwrap().set_bc_values(&pb).unwrap();
        let biot = Biot::new(false);
        let mut cache = MatrixCache::new();
        biot.discretize_flow(&grid, &params, &mut cache).unwrap();
        biot.discretize_mechanics(&grid, &params, &mut cache).unwrap();
        let p = [1.5, 2.5];
        let q = biot.face_fluxes(&grid, &params, &cache, &p).unwrap();
        for f in 0..nf {
            approx_eq(q[f], -grid.face_normals[f][0], 1e-12);
        }
        // uniform pressure with zero displacement: the tractions are -α p n
        let t = biot
            .face_tractions(&grid, &params, &cache, &[0.0; 4], &[2.0, 2.0])
            .unwrap();
        for f in 0..nf {
            approx_eq(t[2 * f], -2.0 * grid.face_normals[f][0], 1e-12);
            approx_eq(t[2 * f + 1], -2.0 * grid.face_normals[f][1], 1e-12);
        }
        assert_eq!(
            biot.face_fluxes(&grid, &params, &cache, &[1.0]).err(),
            Some(Error::Config("pressure must have num_cells entries"))
        );
        assert_eq!(
            biot.face_tractions(&grid, &params, &cache, &[0.0; 3], &p).err(),
            Some(Error::Config("displacement must have num_cells·dim entries"))
        );
    }

    #[test]
    fn split_state_works() {
        let grid = Grid::cartesian_2d(2, 1, 2.0, 1.0).unwrap();
        let biot = Biot::new(false);
        let (u, p) = biot.split_state(&grid, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(u, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(p, &[5.0, 6.0]);
        assert_eq!(
            biot.split_state(&grid, &[1.0]).err(),
            Some(Error::Config("state must have num_cells·(dim + 1) entries"))
        );
    }

    #[test]
    fn matrix_rhs_captures_errors() {
        let grid = Grid::cartesian_2d(2, 1, 2.0, 1.0).unwrap();
        let mut params = dirichlet_params(&grid);
        params.mechanics = None;
        let mut cache = MatrixCache::new();
        assert_eq!(
            Biot::new(false).matrix_rhs(&grid, &params, &mut cache, true).err(),
            Some(Error::Config("mechanics parameters are missing"))
        );
        assert!(cache.is_empty());
    }
}
