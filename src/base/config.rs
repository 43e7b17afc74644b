use super::{BcKind, BoundaryCondition, Error, FourthOrderTensor, Grid, SecondOrderTensor, VectorBoundaryCondition};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines the time discretization of the flow terms
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum TimeScheme {
    /// No accumulation from the previous state
    Stationary,

    /// Backward Euler scaled by the time step
    ///
    /// ```text
    /// (mass + Δt div·flux) pⁿ⁺¹ = mass pⁿ + Δt source
    /// ```
    ImplicitEuler,
}

/// Holds the flow (pressure) parameters of one grid
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Boundary conditions
    pub bc: BoundaryCondition,

    /// Boundary values (num_faces): pressure on Dirichlet faces; outward flux on Neumann/Robin faces
    pub bc_values: Vec<f64>,

    /// Permeability tensor (divided by viscosity)
    pub permeability: SecondOrderTensor,

    /// Aperture (scales permeability and accumulation) (num_cells)
    pub aperture: Vec<f64>,

    /// Storage coefficient multiplying the cell volume in the mass term (num_cells)
    pub mass_weight: Vec<f64>,

    /// Biot coefficient multiplying the stabilization term
    pub biot_alpha: f64,

    /// Time step
    pub time_step: f64,

    /// Pressure at the previous time (num_cells)
    pub state: Vec<f64>,

    /// Location of the continuity points (None means the grid default)
    pub eta: Option<f64>,
}

/// Holds the previous mechanics state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MechanicsState {
    /// Cell displacements (num_cells · dim)
    pub displacement: Vec<f64>,

    /// Boundary values (num_faces · dim)
    pub bc_values: Vec<f64>,
}

/// Holds the mechanics (displacement) parameters of one grid
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MechanicsConfig {
    /// Boundary conditions
    pub bc: VectorBoundaryCondition,

    /// Boundary values (num_faces · dim): displacement on Dirichlet components;
    /// outward traction on Neumann/Robin components
    pub bc_values: Vec<f64>,

    /// Elastic stiffness
    pub stiffness: FourthOrderTensor,

    /// Biot coefficient multiplying the coupling terms
    pub biot_alpha: f64,

    /// Time step
    pub time_step: f64,

    /// Displacements and boundary values at the previous time
    pub state: MechanicsState,

    /// Location of the continuity points (None means the grid default)
    pub eta: Option<f64>,
}

/// Holds the parameters of all physics on one grid
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Flow parameters
    pub flow: Option<FlowConfig>,

    /// Mechanics parameters
    pub mechanics: Option<MechanicsConfig>,
}

fn check_len(len: usize, expected: usize, message: &'static str) -> Result<(), Error> {
    if len != expected {
        return Err(Error::Config(message));
    }
    Ok(())
}

fn check_eta(eta: Option<f64>) -> Result<(), Error> {
    if let Some(value) = eta {
        if value < 0.0 || value >= 1.0 {
            return Err(Error::Config("eta must be in [0.0, 1.0)"));
        }
    }
    Ok(())
}

impl FlowConfig {
    /// Allocates a new instance with default values
    ///
    /// The defaults are: Neumann boundaries, zero boundary values, unit permeability,
    /// unit aperture, unit mass weight, biot_alpha = 1, time_step = 1 and zero state.
    pub fn new(grid: &Grid) -> Result<Self, Error> {
        Ok(FlowConfig {
            bc: BoundaryCondition::all(grid, BcKind::Neumann),
            bc_values: vec![0.0; grid.num_faces],
            permeability: SecondOrderTensor::uniform(grid.dim, grid.num_cells, 1.0)?,
            aperture: vec![1.0; grid.num_cells],
            mass_weight: vec![1.0; grid.num_cells],
            biot_alpha: 1.0,
            time_step: 1.0,
            state: vec![0.0; grid.num_cells],
            eta: None,
        })
    }

    /// Sets the boundary conditions
    pub fn set_bc(&mut self, bc: BoundaryCondition) -> Result<&mut Self, Error> {
        check_len(bc.num_faces(), self.bc_values.len(), "boundary condition must cover all faces")?;
        self.bc = bc;
        Ok(self)
    }

    /// Sets the boundary values
    pub fn set_bc_values(&mut self, values: &[f64]) -> Result<&mut Self, Error> {
        check_len(values.len(), self.bc_values.len(), "bc_values must have num_faces entries")?;
        self.bc_values.copy_from_slice(values);
        Ok(self)
    }

    /// Sets the permeability
    pub fn set_permeability(&mut self, permeability: SecondOrderTensor) -> Result<&mut Self, Error> {
        check_len(permeability.dim, self.permeability.dim, "permeability has the wrong dimension")?;
        check_len(permeability.num_cells(), self.state.len(), "permeability must have num_cells tensors")?;
        self.permeability = permeability;
        Ok(self)
    }

    /// Sets the aperture
    pub fn set_aperture(&mut self, values: &[f64]) -> Result<&mut Self, Error> {
        check_len(values.len(), self.state.len(), "aperture must have num_cells entries")?;
        if values.iter().any(|a| *a <= 0.0) {
            return Err(Error::Config("aperture must be > 0.0"));
        }
        self.aperture.copy_from_slice(values);
        Ok(self)
    }

    /// Sets the mass weight
    pub fn set_mass_weight(&mut self, values: &[f64]) -> Result<&mut Self, Error> {
        check_len(values.len(), self.state.len(), "mass_weight must have num_cells entries")?;
        if values.iter().any(|m| *m < 0.0) {
            return Err(Error::Config("mass_weight must be ≥ 0.0"));
        }
        self.mass_weight.copy_from_slice(values);
        Ok(self)
    }

    /// Sets the Biot coefficient
    pub fn set_biot_alpha(&mut self, value: f64) -> Result<&mut Self, Error> {
        self.biot_alpha = value;
        Ok(self)
    }

    /// Sets the time step
    pub fn set_time_step(&mut self, value: f64) -> Result<&mut Self, Error> {
        if value <= 0.0 {
            return Err(Error::Config("time_step must be > 0.0"));
        }
        self.time_step = value;
        Ok(self)
    }

    /// Sets the pressure at the previous time
    pub fn set_state(&mut self, pressure: &[f64]) -> Result<&mut Self, Error> {
        check_len(pressure.len(), self.state.len(), "state must have num_cells entries")?;
        self.state.copy_from_slice(pressure);
        Ok(self)
    }

    /// Sets the location of the continuity points
    pub fn set_eta(&mut self, eta: Option<f64>) -> Result<&mut Self, Error> {
        check_eta(eta)?;
        self.eta = eta;
        Ok(self)
    }

    /// Checks all array sizes against the grid
    pub fn validate(&self, grid: &Grid) -> Result<(), Error> {
        self.bc.check(grid)?;
        grid.check_faces_len(self.bc_values.len(), "bc_values must have num_faces entries")?;
        check_len(self.permeability.dim, grid.dim, "permeability has the wrong dimension")?;
        grid.check_cells_len(self.permeability.num_cells(), "permeability must have num_cells tensors")?;
        grid.check_cells_len(self.aperture.len(), "aperture must have num_cells entries")?;
        grid.check_cells_len(self.mass_weight.len(), "mass_weight must have num_cells entries")?;
        grid.check_cells_len(self.state.len(), "state must have num_cells entries")?;
        check_eta(self.eta)
    }

    /// Returns the permeability scaled by the aperture
    pub fn effective_permeability(&self) -> Result<SecondOrderTensor, Error> {
        self.permeability.scaled(&self.aperture)
    }
}

impl MechanicsConfig {
    /// Allocates a new instance with default values
    ///
    /// The defaults are: Neumann boundaries, zero boundary values, mu = lambda = 1,
    /// biot_alpha = 1, time_step = 1 and zero state.
    pub fn new(grid: &Grid) -> Result<Self, Error> {
        let (nc, nf, d) = (grid.num_cells, grid.num_faces, grid.dim);
        Ok(MechanicsConfig {
            bc: VectorBoundaryCondition::all(grid, BcKind::Neumann),
            bc_values: vec![0.0; nf * d],
            stiffness: FourthOrderTensor::uniform(d, nc, 1.0, 1.0)?,
            biot_alpha: 1.0,
            time_step: 1.0,
            state: MechanicsState {
                displacement: vec![0.0; nc * d],
                bc_values: vec![0.0; nf * d],
            },
            eta: None,
        })
    }

    /// Sets the boundary conditions
    pub fn set_bc(&mut self, bc: VectorBoundaryCondition) -> Result<&mut Self, Error> {
        check_len(bc.kinds.len(), self.bc_values.len(), "boundary condition must cover all faces")?;
        self.bc = bc;
        Ok(self)
    }

    /// Sets the boundary values (face-major, component fastest)
    pub fn set_bc_values(&mut self, values: &[f64]) -> Result<&mut Self, Error> {
        check_len(values.len(), self.bc_values.len(), "bc_values must have num_faces·dim entries")?;
        self.bc_values.copy_from_slice(values);
        Ok(self)
    }

    /// Sets the stiffness
    pub fn set_stiffness(&mut self, stiffness: FourthOrderTensor) -> Result<&mut Self, Error> {
        check_len(stiffness.dim, self.stiffness.dim, "stiffness has the wrong dimension")?;
        check_len(stiffness.num_cells(), self.stiffness.num_cells(), "stiffness must have num_cells tensors")?;
        self.stiffness = stiffness;
        Ok(self)
    }

    /// Sets the Biot coefficient
    pub fn set_biot_alpha(&mut self, value: f64) -> Result<&mut Self, Error> {
        self.biot_alpha = value;
        Ok(self)
    }

    /// Sets the time step
    pub fn set_time_step(&mut self, value: f64) -> Result<&mut Self, Error> {
        if value <= 0.0 {
            return Err(Error::Config("time_step must be > 0.0"));
        }
        self.time_step = value;
        Ok(self)
    }

    /// Sets the displacement and boundary values at the previous time
    pub fn set_state(&mut self, displacement: &[f64], bc_values: &[f64]) -> Result<&mut Self, Error> {
        check_len(
            displacement.len(),
            self.state.displacement.len(),
            "displacement must have num_cells·dim entries",
        )?;
        check_len(bc_values.len(), self.bc_values.len(), "bc_values must have num_faces·dim entries")?;
        self.state.displacement.copy_from_slice(displacement);
        self.state.bc_values.copy_from_slice(bc_values);
        Ok(self)
    }

    /// Sets the location of the continuity points
    pub fn set_eta(&mut self, eta: Option<f64>) -> Result<&mut Self, Error> {
        check_eta(eta)?;
        self.eta = eta;
        Ok(self)
    }

    /// Checks all array sizes against the grid
    pub fn validate(&self, grid: &Grid) -> Result<(), Error> {
        let (nc, nf, d) = (grid.num_cells, grid.num_faces, grid.dim);
        self.bc.check(grid)?;
        check_len(self.bc_values.len(), nf * d, "bc_values must have num_faces·dim entries")?;
        check_len(self.stiffness.dim, d, "stiffness has the wrong dimension")?;
        grid.check_cells_len(self.stiffness.num_cells(), "stiffness must have num_cells tensors")?;
        check_len(
            self.state.displacement.len(),
            nc * d,
            "displacement must have num_cells·dim entries",
        )?;
        check_len(self.state.bc_values.len(), nf * d, "bc_values must have num_faces·dim entries")?;
        check_eta(self.eta)
    }
}

impl Parameters {
    /// Allocates a new instance without any physics
    pub fn new() -> Self {
        Parameters {
            flow: None,
            mechanics: None,
        }
    }

    /// Allocates a new instance with default flow and mechanics parameters
    pub fn biot(grid: &Grid) -> Result<Self, Error> {
        Ok(Parameters {
            flow: Some(FlowConfig::new(grid)?),
            mechanics: Some(MechanicsConfig::new(grid)?),
        })
    }

    /// Returns the flow parameters
    pub fn flow(&self) -> Result<&FlowConfig, Error> {
        self.flow.as_ref().ok_or(Error::Config("flow parameters are missing"))
    }

    /// Returns the mechanics parameters
    pub fn mechanics(&self) -> Result<&MechanicsConfig, Error> {
        self.mechanics.as_ref().ok_or(Error::Config("mechanics parameters are missing"))
    }

    /// Returns the (mutable) flow parameters
    pub fn flow_mut(&mut self) -> Result<&mut FlowConfig, Error> {
        self.flow.as_mut().ok_or(Error::Config("flow parameters are missing"))
    }

    /// Returns the (mutable) mechanics parameters
    pub fn mechanics_mut(&mut self) -> Result<&mut MechanicsConfig, Error> {
        self.mechanics.as_mut().ok_or(Error::Config("mechanics parameters are missing"))
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flow parameters\n").unwrap();
        write!(f, "===============\n").unwrap();
        match &self.flow {
            Some(p) => {
                write!(f, "biot_alpha = {:?}\n", p.biot_alpha).unwrap();
                write!(f, "time_step = {:?}\n", p.time_step).unwrap();
                write!(f, "eta = {:?}\n", p.eta).unwrap();
            }
            None => write!(f, "None\n").unwrap(),
        }
        write!(f, "\nMechanics parameters\n").unwrap();
        write!(f, "====================\n").unwrap();
        match &self.mechanics {
            Some(p) => {
                write!(f, "biot_alpha = {:?}\n", p.biot_alpha).unwrap();
                write!(f, "time_step = {:?}\n", p.time_step).unwrap();
                write!(f, "eta = {:?}\n", p.eta).unwrap();
            }
            None => write!(f, "None\n").unwrap(),
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{FlowConfig, MechanicsConfig, Parameters};
    use crate::base::{BcKind, BoundaryCondition, Error, FourthOrderTensor, Grid, SecondOrderTensor};

    #[test]
    fn defaults_work() {
        let grid = Grid::cartesian_2d(2, 1, 2.0, 1.0).unwrap();
        let params = Parameters::biot(&grid).unwrap();
        let flow = params.flow().unwrap();
        assert_eq!(flow.bc.faces_of(BcKind::Neumann).len(), 6);
        assert_eq!(flow.bc_values, &[0.0; 7]);
        assert_eq!(flow.permeability.values, &[1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(flow.aperture, &[1.0, 1.0]);
        assert_eq!(flow.mass_weight, &[1.0, 1.0]);
        assert_eq!(flow.biot_alpha, 1.0);
        assert_eq!(flow.time_step, 1.0);
        assert_eq!(flow.state, &[0.0, 0.0]);
        flow.validate(&grid).unwrap();
        let mech = params.mechanics().unwrap();
        assert_eq!(mech.bc_values.len(), 14);
        assert_eq!(mech.state.displacement.len(), 4);
        assert_eq!(mech.stiffness.get(1, 0, 0, 0, 0), 3.0);
        mech.validate(&grid).unwrap();
        assert_eq!(
            format!("{}", params),
            "Flow parameters\n\
             ===============\n\
             biot_alpha = 1.0\n\
             time_step = 1.0\n\
             eta = None\n\
             \n\
             Mechanics parameters\n\
             ====================\n\
             biot_alpha = 1.0\n\
             time_step = 1.0\n\
             eta = None\n"
        );
    }

    #[test]
    fn setters_work() -> Result<(), Error> {
        let grid = Grid::cartesian_2d(2, 1, 2.0, 1.0)?;
        let mut flow = FlowConfig::new(&grid)?;
        flow.set_bc(BoundaryCondition::all(&grid, BcKind::Dirichlet))?
            .set_bc_values(&[1.0; 7])?
            .set_permeability(SecondOrderTensor::isotropic(2, &[2.0, 3.0])?)?
            .set_aperture(&[0.5, 2.0])?
            .set_mass_weight(&[0.1, 0.1])?
            .set_biot_alpha(0.6)?
            .set_time_step(0.25)?
            .set_state(&[1.0, 2.0])?
            .set_eta(Some(0.5))?;
        let k = flow.effective_permeability()?;
        assert_eq!(k.get(0, 0, 0), 1.0);
        assert_eq!(k.get(1, 1, 1), 6.0);
        let mut mech = MechanicsConfig::new(&grid)?;
        mech.set_stiffness(FourthOrderTensor::uniform(2, 2, 2.0, 0.5)?)?
            .set_time_step(0.5)?
            .set_biot_alpha(0.6)?
            .set_state(&[1.0, 2.0, 1.0, 2.0], &[0.0; 14])?
            .set_bc_values(&[1.0; 14])?;
        assert_eq!(mech.state.displacement, &[1.0, 2.0, 1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn setters_capture_errors() {
        let grid = Grid::cartesian_2d(2, 1, 2.0, 1.0).unwrap();
        let other = Grid::cartesian_2d(1, 1, 1.0, 1.0).unwrap();
        let mut flow = FlowConfig::new(&grid).unwrap();
        assert_eq!(
            flow.set_bc(BoundaryCondition::all(&other, BcKind::Dirichlet)).err(),
            Some(Error::Config("boundary condition must cover all faces"))
        );
        assert_eq!(
            flow.set_bc_values(&[0.0; 4]).err(),
            Some(Error::Config("bc_values must have num_faces entries"))
        );
        assert_eq!(
            flow.set_permeability(SecondOrderTensor::uniform(3, 2, 1.0).unwrap()).err(),
            Some(Error::Config("permeability has the wrong dimension"))
        );
        assert_eq!(
            flow.set_permeability(SecondOrderTensor::uniform(2, 3, 1.0).unwrap()).err(),
            Some(Error::Config("permeability must have num_cells tensors"))
        );
        assert_eq!(flow.set_aperture(&[0.0, 1.0]).err(), Some(Error::Config("aperture must be > 0.0")));
        assert_eq!(
            flow.set_mass_weight(&[1.0]).err(),
            Some(Error::Config("mass_weight must have num_cells entries"))
        );
        assert_eq!(flow.set_time_step(0.0).err(), Some(Error::Config("time_step must be > 0.0")));
        assert_eq!(flow.set_eta(Some(1.0)).err(), Some(Error::Config("eta must be in [0.0, 1.0)")));
        flow.state.push(0.0);
        assert_eq!(
            flow.validate(&grid).err(),
            Some(Error::Config("state must have num_cells entries"))
        );
        flow.state.pop();
        let interior = (0..grid.num_faces).find(|f| !grid.is_boundary_face(*f)).unwrap();
        flow.bc.kinds[interior] = Some(BcKind::Dirichlet);
        assert_eq!(
            flow.validate(&grid).err(),
            Some(Error::Config("boundary condition assigned to an internal face"))
        );
        let mut mech = MechanicsConfig::new(&grid).unwrap();
        assert_eq!(
            mech.set_state(&[0.0; 3], &[0.0; 14]).err(),
            Some(Error::Config("displacement must have num_cells·dim entries"))
        );
        let params = Parameters::new();
        assert_eq!(params.flow().err(), Some(Error::Config("flow parameters are missing")));
        assert_eq!(params.mechanics().err(), Some(Error::Config("mechanics parameters are missing")));
        assert!(MechanicsConfig::new(&other).unwrap().validate(&grid).is_err());
    }

    #[test]
    fn serialize_works() {
        let grid = Grid::cartesian_2d(1, 1, 1.0, 1.0).unwrap();
        let mut params = Parameters::biot(&grid).unwrap();
        params.flow_mut().unwrap().set_time_step(0.5).unwrap();
        let json = serde_json::to_string(&params).unwrap();
        let read: Parameters = serde_json::from_str(&json).unwrap();
        assert_eq!(read, params);
        assert_eq!(read.flow().unwrap().time_step, 0.5);
    }
}
