use super::{Error, Grid};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Defines the kind of boundary condition on a face
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum BcKind {
    /// Prescribed field value (pressure or displacement component)
    Dirichlet,

    /// Prescribed outward flux or traction (face-integrated)
    Neumann,

    /// Prescribed outward flux + alpha · area · field
    Robin,
}

/// Validates the face/kind lists shared by the scalar and vector descriptors
fn validate(grid: &Grid, faces: &[usize], kinds: &[BcKind]) -> Result<(), Error> {
    if faces.len() != kinds.len() {
        return Err(Error::Config("number of faces and kinds must be equal"));
    }
    let mut seen = HashSet::new();
    for f in faces {
        if *f >= grid.num_faces {
            return Err(Error::Config("face index is out of bounds"));
        }
        if !grid.is_boundary_face(*f) {
            return Err(Error::Config("boundary condition assigned to an internal face"));
        }
        if !seen.insert(*f) {
            return Err(Error::Config("face assigned more than one boundary condition"));
        }
    }
    Ok(())
}

/// Checks a Robin coefficient
fn check_robin_weight(alpha: f64) -> Result<(), Error> {
    if !alpha.is_finite() {
        return Err(Error::Config("Robin weight must be finite"));
    }
    if alpha < 0.0 {
        return Err(Error::Config("Robin weight must be ≥ 0.0"));
    }
    Ok(())
}

/// Checks that exactly the boundary face components carry a kind
fn check_descriptor(grid: &Grid, kinds: &[Option<BcKind>], robin_weight: &[f64], dim: usize) -> Result<(), Error> {
    if kinds.len() != grid.num_faces * dim || robin_weight.len() != kinds.len() {
        return Err(Error::Config("boundary condition must cover all faces"));
    }
    for (m, kind) in kinds.iter().enumerate() {
        match (kind.is_some(), grid.is_boundary_face(m / dim)) {
            (true, false) => return Err(Error::Config("boundary condition assigned to an internal face")),
            (false, true) => return Err(Error::Config("boundary face has no boundary condition")),
            _ => (),
        }
    }
    for alpha in robin_weight {
        check_robin_weight(*alpha)?;
    }
    Ok(())
}

/// Holds the boundary conditions of a scalar field (e.g., pressure)
///
/// Interior faces have no condition; boundary faces not explicitly set are Neumann.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCondition {
    /// Holds the kind of each face (None for interior faces)
    pub kinds: Vec<Option<BcKind>>,

    /// Holds the Robin coefficient (alpha) of each face
    pub robin_weight: Vec<f64>,
}

impl BoundaryCondition {
    /// Allocates a new instance
    ///
    /// # Input
    ///
    /// * `faces` -- boundary faces with a prescribed kind
    /// * `kinds` -- the kinds (same length as faces)
    pub fn new(grid: &Grid, faces: &[usize], kinds: &[BcKind]) -> Result<Self, Error> {
        validate(grid, faces, kinds)?;
        let mut bc = BoundaryCondition::all(grid, BcKind::Neumann);
        for (f, kind) in faces.iter().zip(kinds) {
            bc.kinds[*f] = Some(*kind);
        }
        Ok(bc)
    }

    /// Allocates a new instance with the same kind on all boundary faces
    pub fn all(grid: &Grid, kind: BcKind) -> Self {
        let kinds = (0..grid.num_faces)
            .map(|f| if grid.is_boundary_face(f) { Some(kind) } else { None })
            .collect();
        BoundaryCondition {
            kinds,
            robin_weight: vec![0.0; grid.num_faces],
        }
    }

    /// Sets the same Robin coefficient on all faces
    pub fn set_robin_weight(&mut self, alpha: f64) -> Result<&mut Self, Error> {
        check_robin_weight(alpha)?;
        self.robin_weight.iter_mut().for_each(|w| *w = alpha);
        Ok(self)
    }

    /// Sets the Robin coefficient of one face
    pub fn set_face_robin_weight(&mut self, face: usize, alpha: f64) -> Result<&mut Self, Error> {
        if face >= self.kinds.len() {
            return Err(Error::Config("face index is out of bounds"));
        }
        check_robin_weight(alpha)?;
        self.robin_weight[face] = alpha;
        Ok(self)
    }

    /// Checks the descriptor against the grid
    ///
    /// The fields are public (and deserializable), thus the discretizations call this
    /// before using the descriptor.
    pub fn check(&self, grid: &Grid) -> Result<(), Error> {
        check_descriptor(grid, &self.kinds, &self.robin_weight, 1)
    }

    /// Returns the kind of the face (None if interior)
    #[inline]
    pub fn kind(&self, face: usize) -> Option<BcKind> {
        self.kinds[face]
    }

    /// Returns the number of faces
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.kinds.len()
    }

    /// Returns the faces of a given kind
    pub fn faces_of(&self, kind: BcKind) -> Vec<usize> {
        (0..self.kinds.len()).filter(|f| self.kinds[*f] == Some(kind)).collect()
    }
}

impl fmt::Display for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Boundary conditions\n").unwrap();
        write!(f, "===================\n").unwrap();
        for (face, kind) in self.kinds.iter().enumerate() {
            if let Some(kind) = kind {
                match kind {
                    BcKind::Robin => write!(f, "{} : Robin(alpha = {:?})\n", face, self.robin_weight[face]).unwrap(),
                    _ => write!(f, "{} : {:?}\n", face, kind).unwrap(),
                }
            }
        }
        Ok(())
    }
}

/// Holds the boundary conditions of a vector field (e.g., displacement)
///
/// Each face and component has its own kind, thus rollers can be represented.
/// The entries are ordered face-major with the component running fastest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorBoundaryCondition {
    /// Space dimension
    pub dim: usize,

    /// Holds the kind of each face component (num_faces · dim)
    pub kinds: Vec<Option<BcKind>>,

    /// Holds the Robin coefficient of each face component (num_faces · dim)
    pub robin_weight: Vec<f64>,
}

impl VectorBoundaryCondition {
    /// Allocates a new instance with the same kind for all components of the given faces
    pub fn new(grid: &Grid, faces: &[usize], kinds: &[BcKind]) -> Result<Self, Error> {
        validate(grid, faces, kinds)?;
        let mut bc = VectorBoundaryCondition::all(grid, BcKind::Neumann);
        for (f, kind) in faces.iter().zip(kinds) {
            for i in 0..grid.dim {
                bc.kinds[f * grid.dim + i] = Some(*kind);
            }
        }
        Ok(bc)
    }

    /// Allocates a new instance with the same kind on all boundary face components
    pub fn all(grid: &Grid, kind: BcKind) -> Self {
        let d = grid.dim;
        let kinds = (0..grid.num_faces * d)
            .map(|m| if grid.is_boundary_face(m / d) { Some(kind) } else { None })
            .collect();
        VectorBoundaryCondition {
            dim: d,
            kinds,
            robin_weight: vec![0.0; grid.num_faces * d],
        }
    }

    /// Sets the kind of one component of a boundary face
    pub fn set_component(&mut self, face: usize, component: usize, kind: BcKind) -> Result<&mut Self, Error> {
        if component >= self.dim {
            return Err(Error::Config("component index is out of bounds"));
        }
        let m = face * self.dim + component;
        if m >= self.kinds.len() {
            return Err(Error::Config("face index is out of bounds"));
        }
        if self.kinds[m].is_none() {
            return Err(Error::Config("boundary condition assigned to an internal face"));
        }
        self.kinds[m] = Some(kind);
        Ok(self)
    }

    /// Sets the same Robin coefficient on all face components
    pub fn set_robin_weight(&mut self, alpha: f64) -> Result<&mut Self, Error> {
        check_robin_weight(alpha)?;
        self.robin_weight.iter_mut().for_each(|w| *w = alpha);
        Ok(self)
    }

    /// Sets the Robin coefficient of one face (all components)
    pub fn set_face_robin_weight(&mut self, face: usize, alpha: f64) -> Result<&mut Self, Error> {
        if (face + 1) * self.dim > self.kinds.len() {
            return Err(Error::Config("face index is out of bounds"));
        }
        check_robin_weight(alpha)?;
        self.robin_weight[face * self.dim..(face + 1) * self.dim].fill(alpha);
        Ok(self)
    }

    /// Sets the Robin coefficient of one face component
    pub fn set_component_robin_weight(&mut self, face: usize, component: usize, alpha: f64) -> Result<&mut Self, Error> {
        if component >= self.dim {
            return Err(Error::Config("component index is out of bounds"));
        }
        let m = face * self.dim + component;
        if m >= self.kinds.len() {
            return Err(Error::Config("face index is out of bounds"));
        }
        check_robin_weight(alpha)?;
        self.robin_weight[m] = alpha;
        Ok(self)
    }

    /// Checks the descriptor against the grid
    pub fn check(&self, grid: &Grid) -> Result<(), Error> {
        if self.dim != grid.dim {
            return Err(Error::Config("boundary condition has the wrong dimension"));
        }
        check_descriptor(grid, &self.kinds, &self.robin_weight, self.dim)
    }

    /// Returns the kind of a face component (None if interior)
    #[inline]
    pub fn kind(&self, face: usize, component: usize) -> Option<BcKind> {
        self.kinds[face * self.dim + component]
    }

    /// Returns the number of faces
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.kinds.len() / self.dim
    }

    /// Returns true if no boundary component is Neumann or Robin
    pub fn is_pure_dirichlet(&self) -> bool {
        self.kinds.iter().all(|k| matches!(k, None | Some(BcKind::Dirichlet)))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
