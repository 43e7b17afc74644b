use super::{Error, DEFAULT_ETA, DEFAULT_ETA_SIMPLEX, GEOMETRY_TOLERANCE};
use gemlab::mesh::Mesh;
use gemlab::shapes::GeoKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_GRID_ID: AtomicUsize = AtomicUsize::new(0);

/// Identifies a grid (each grid and each clone of it have their own identity)
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct GridId(pub usize);

/// Holds the topology and geometry of a (2D or 3D) polyhedral grid
///
/// The geometry is computed once by [Grid::new] and must not be changed afterwards, because
/// the identity keys the cached operators. A clone gets a new identity, thus an edited clone
/// never reuses the operators of the source grid.
///
/// **Conventions:**
///
/// 1. Face normals are scaled by the face area
/// 2. The sign in `cell_faces` is +1 if the face normal points out of the cell
/// 3. `face_cells[f][0]` is the cell for which the normal points outwards;
///    `face_cells[f][1]` is the cell for which the normal points inwards
/// 4. 2D grids use the third coordinate = 0
#[derive(Debug)]
pub struct Grid {
    /// Holds the grid identity (used as key in caches)
    pub id: GridId,

    /// Holds the space dimension (2 or 3)
    pub dim: usize,

    /// Holds the number of cells
    pub num_cells: usize,

    /// Holds the number of faces
    pub num_faces: usize,

    /// Holds the number of nodes
    pub num_nodes: usize,

    /// Holds the node coordinates (num_nodes)
    pub nodes: Vec<[f64; 3]>,

    /// Holds the nodes of each face (num_faces); 3D faces are cyclically ordered
    pub face_nodes: Vec<Vec<usize>>,

    /// Holds the (face, sign) pairs of each cell (num_cells)
    pub cell_faces: Vec<Vec<(usize, f64)>>,

    /// Holds the cells on the positive and negative sides of each face (num_faces)
    pub face_cells: Vec<[Option<usize>; 2]>,

    /// Holds the cell centroids (num_cells)
    pub cell_centers: Vec<[f64; 3]>,

    /// Holds the cell volumes (areas in 2D) (num_cells)
    pub cell_volumes: Vec<f64>,

    /// Holds the face centroids (num_faces)
    pub face_centers: Vec<[f64; 3]>,

    /// Holds the area-scaled face normals (num_faces)
    pub face_normals: Vec<[f64; 3]>,

    /// Holds the face areas (lengths in 2D) (num_faces)
    pub face_areas: Vec<f64>,

    /// Indicates that all cells are simplices (triangles or tetrahedra)
    pub simplex: bool,
}

impl Grid {
    /// Allocates a new instance from the topology and computes the geometry
    ///
    /// # Input
    ///
    /// * `dim` -- space dimension (2 or 3)
    /// * `nodes` -- node coordinates (the third component is ignored in 2D)
    /// * `face_nodes` -- nodes of each face; 2D faces have two nodes and the normal is
    ///   obtained by rotating `x1 - x0` clockwise; 3D faces are cyclically ordered and
    ///   the normal follows the right-hand rule
    /// * `cell_faces` -- faces of each cell (cells must be convex)
    pub fn new(
        dim: usize,
        nodes: Vec<[f64; 3]>,
        face_nodes: Vec<Vec<usize>>,
        cell_faces: Vec<Vec<usize>>,
    ) -> Result<Self, Error> {
        if dim != 2 && dim != 3 {
            return Err(Error::Config("dimension must be 2 or 3"));
        }
        if cell_faces.is_empty() {
            return Err(Error::Config("grid must have at least one cell"));
        }
        let num_nodes = nodes.len();
        let num_faces = face_nodes.len();
        let num_cells = cell_faces.len();

        // faces
        let mut face_centers = vec![[0.0; 3]; num_faces];
        let mut face_normals = vec![[0.0; 3]; num_faces];
        let mut face_areas = vec![0.0; num_faces];
        for f in 0..num_faces {
            let fnodes = &face_nodes[f];
            if fnodes.iter().any(|n| *n >= num_nodes) {
                return Err(Error::Config("node index is out of bounds"));
            }
            if dim == 2 {
                if fnodes.len() != 2 {
                    return Err(Error::Config("faces of 2D grids must have two nodes"));
                }
                let (a, b) = (&nodes[fnodes[0]], &nodes[fnodes[1]]);
                face_centers[f] = [0.5 * (a[0] + b[0]), 0.5 * (a[1] + b[1]), 0.0];
                face_normals[f] = [b[1] - a[1], a[0] - b[0], 0.0];
            } else {
                if fnodes.len() < 3 {
                    return Err(Error::Config("faces of 3D grids must have at least three nodes"));
                }
                let xm = mean_point(&nodes, fnodes);
                let mut total = 0.0;
                let mut center = [0.0; 3];
                let mut normal = [0.0; 3];
                let n = fnodes.len();
                for i in 0..n {
                    let (a, b) = (&nodes[fnodes[i]], &nodes[fnodes[(i + 1) % n]]);
                    let t = cross(&sub(a, &xm), &sub(b, &xm));
                    let area = 0.5 * norm(&t);
                    for k in 0..3 {
                        normal[k] += 0.5 * t[k];
                        center[k] += area * (xm[k] + a[k] + b[k]) / 3.0;
                    }
                    total += area;
                }
                if total > 0.0 {
                    for k in 0..3 {
                        center[k] /= total;
                    }
                }
                face_centers[f] = center;
                face_normals[f] = normal;
            }
            face_areas[f] = norm(&face_normals[f]);
            if face_areas[f] <= GEOMETRY_TOLERANCE {
                return Err(Error::Config("face has zero area"));
            }
        }

        // cells
        let mut cell_centers = vec![[0.0; 3]; num_cells];
        let mut cell_volumes = vec![0.0; num_cells];
        for c in 0..num_cells {
            if cell_faces[c].iter().any(|f| *f >= num_faces) {
                return Err(Error::Config("face index is out of bounds"));
            }
            let mut cnodes: Vec<usize> = cell_faces[c].iter().flat_map(|f| face_nodes[*f].iter().copied()).collect();
            cnodes.sort();
            cnodes.dedup();
            let xm = mean_point(&nodes, &cnodes);
            let mut volume = 0.0;
            let mut center = [0.0; 3];
            for f in &cell_faces[c] {
                let (v, centroid) = if dim == 2 {
                    let (a, b) = (&nodes[face_nodes[*f][0]], &nodes[face_nodes[*f][1]]);
                    let t = cross(&sub(a, &xm), &sub(b, &xm));
                    let v = 0.5 * f64::abs(t[2]);
                    (v, [(xm[0] + a[0] + b[0]) / 3.0, (xm[1] + a[1] + b[1]) / 3.0, 0.0])
                } else {
                    let xf = &face_centers[*f];
                    let v = f64::abs(dot(&face_normals[*f], &sub(xf, &xm))) / 3.0;
                    let mut centroid = [0.0; 3];
                    for k in 0..3 {
                        centroid[k] = xm[k] + 0.75 * (xf[k] - xm[k]);
                    }
                    (v, centroid)
                };
                volume += v;
                for k in 0..3 {
                    center[k] += v * centroid[k];
                }
            }
            if volume <= GEOMETRY_TOLERANCE {
                return Err(Error::Config("cell has zero volume"));
            }
            for k in 0..3 {
                center[k] /= volume;
            }
            cell_centers[c] = center;
            cell_volumes[c] = volume;
        }

        // orientation
        let mut face_cells = vec![[None, None]; num_faces];
        let mut signed_cell_faces = vec![Vec::new(); num_cells];
        for c in 0..num_cells {
            for f in &cell_faces[c] {
                let outward = dot(&face_normals[*f], &sub(&face_centers[*f], &cell_centers[c])) > 0.0;
                let (slot, sign) = if outward { (0, 1.0) } else { (1, -1.0) };
                if face_cells[*f][slot].is_some() {
                    return Err(Error::Config("face must be shared by at most two cells with opposite orientations"));
                }
                face_cells[*f][slot] = Some(c);
                signed_cell_faces[c].push((*f, sign));
            }
        }
        if face_cells.iter().any(|pair| pair[0].is_none() && pair[1].is_none()) {
            return Err(Error::Config("face does not belong to any cell"));
        }

        let simplex = cell_faces.iter().all(|faces| faces.len() == dim + 1);
        let mut nodes = nodes;
        if dim == 2 {
            nodes.iter_mut().for_each(|x| x[2] = 0.0);
        }
        Ok(Grid {
            id: GridId::next(),
            dim,
            num_cells,
            num_faces,
            num_nodes,
            nodes,
            face_nodes,
            cell_faces: signed_cell_faces,
            face_cells,
            cell_centers,
            cell_volumes,
            face_centers,
            face_normals,
            face_areas,
            simplex,
        })
    }

    /// Allocates a 2D grid from polygons given by counter-clockwise lists of nodes
    pub fn from_polygons(nodes: &[[f64; 2]], cells: &[Vec<usize>]) -> Result<Self, Error> {
        let mut edges: HashMap<(usize, usize), usize> = HashMap::new();
        let mut face_nodes = Vec::new();
        let mut cell_faces = Vec::with_capacity(cells.len());
        for polygon in cells {
            if polygon.len() < 3 {
                return Err(Error::Config("polygons must have at least three nodes"));
            }
            let n = polygon.len();
            let mut faces = Vec::with_capacity(n);
            for i in 0..n {
                let (a, b) = (polygon[i], polygon[(i + 1) % n]);
                let key = if a < b { (a, b) } else { (b, a) };
                let f = *edges.entry(key).or_insert_with(|| {
                    face_nodes.push(vec![a, b]);
                    face_nodes.len() - 1
                });
                faces.push(f);
            }
            cell_faces.push(faces);
        }
        let nodes = nodes.iter().map(|x| [x[0], x[1], 0.0]).collect();
        Grid::new(2, nodes, face_nodes, cell_faces)
    }

    /// Allocates a 3D grid from polyhedra given as lists of faces (cyclic node lists)
    pub fn from_polyhedra(nodes: &[[f64; 3]], cells: &[Vec<Vec<usize>>]) -> Result<Self, Error> {
        let mut faces_map: HashMap<Vec<usize>, usize> = HashMap::new();
        let mut face_nodes = Vec::new();
        let mut cell_faces = Vec::with_capacity(cells.len());
        for polyhedron in cells {
            let mut faces = Vec::with_capacity(polyhedron.len());
            for polygon in polyhedron {
                let mut key = polygon.clone();
                key.sort();
                let f = *faces_map.entry(key).or_insert_with(|| {
                    face_nodes.push(polygon.clone());
                    face_nodes.len() - 1
                });
                faces.push(f);
            }
            cell_faces.push(faces);
        }
        Grid::new(3, nodes.to_vec(), face_nodes, cell_faces)
    }

    /// Allocates a 2D grid from a gemlab mesh with Tri3 and Qua4 cells
    pub fn from_mesh(mesh: &Mesh) -> Result<Self, Error> {
        if mesh.ndim != 2 {
            return Err(Error::Config("only 2D meshes can be converted"));
        }
        let nodes: Vec<[f64; 2]> = mesh.points.iter().map(|p| [p.coords[0], p.coords[1]]).collect();
        let mut cells = Vec::with_capacity(mesh.cells.len());
        for cell in &mesh.cells {
            match cell.kind {
                GeoKind::Tri3 | GeoKind::Qua4 => cells.push(cell.points.clone()),
                _ => return Err(Error::Config("only Tri3 and Qua4 cells can be converted")),
            }
        }
        Grid::from_polygons(&nodes, &cells)
    }

    /// Allocates a 2D Cartesian grid on `[0,lx] × [0,ly]`
    pub fn cartesian_2d(nx: usize, ny: usize, lx: f64, ly: f64) -> Result<Self, Error> {
        Grid::perturbed_2d(nx, ny, lx, ly, 0.0)
    }

    /// Allocates a 2D Cartesian grid whose interior nodes are perturbed
    ///
    /// The perturbation is deterministic and bounded by `amplitude` times the
    /// cell size; cells remain convex for `amplitude < 0.25`.
    pub fn perturbed_2d(nx: usize, ny: usize, lx: f64, ly: f64, amplitude: f64) -> Result<Self, Error> {
        let nodes = structured_nodes_2d(nx, ny, lx, ly, amplitude)?;
        let mut cells = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let n0 = j * (nx + 1) + i;
                cells.push(vec![n0, n0 + 1, n0 + nx + 2, n0 + nx + 1]);
            }
        }
        Grid::from_polygons(&nodes, &cells)
    }

    /// Allocates a 2D triangular grid by splitting each Cartesian cell along its diagonal
    pub fn simplex_2d(nx: usize, ny: usize, lx: f64, ly: f64) -> Result<Self, Error> {
        let nodes = structured_nodes_2d(nx, ny, lx, ly, 0.0)?;
        let mut cells = Vec::with_capacity(2 * nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let n0 = j * (nx + 1) + i;
                cells.push(vec![n0, n0 + 1, n0 + nx + 2]);
                cells.push(vec![n0, n0 + nx + 2, n0 + nx + 1]);
            }
        }
        Grid::from_polygons(&nodes, &cells)
    }

    /// Allocates a 3D Cartesian grid on `[0,lx] × [0,ly] × [0,lz]`
    pub fn cartesian_3d(nx: usize, ny: usize, nz: usize, lx: f64, ly: f64, lz: f64) -> Result<Self, Error> {
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(Error::Config("the number of cells along each direction must be ≥ 1"));
        }
        let (dx, dy, dz) = (lx / nx as f64, ly / ny as f64, lz / nz as f64);
        let mut nodes = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for k in 0..(nz + 1) {
            for j in 0..(ny + 1) {
                for i in 0..(nx + 1) {
                    nodes.push([i as f64 * dx, j as f64 * dy, k as f64 * dz]);
                }
            }
        }
        let v = |i: usize, j: usize, k: usize| (k * (ny + 1) + j) * (nx + 1) + i;
        let mut cells = Vec::with_capacity(nx * ny * nz);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let (n0, n1, n2, n3) = (v(i, j, k), v(i + 1, j, k), v(i + 1, j + 1, k), v(i, j + 1, k));
                    let (n4, n5, n6, n7) = (
                        v(i, j, k + 1),
                        v(i + 1, j, k + 1),
                        v(i + 1, j + 1, k + 1),
                        v(i, j + 1, k + 1),
                    );
                    cells.push(vec![
                        vec![n0, n4, n7, n3], // x-
                        vec![n1, n2, n6, n5], // x+
                        vec![n0, n1, n5, n4], // y-
                        vec![n3, n7, n6, n2], // y+
                        vec![n0, n3, n2, n1], // z-
                        vec![n4, n5, n6, n7], // z+
                    ]);
                }
            }
        }
        Grid::from_polyhedra(&nodes, &cells)
    }

    /// Returns true if the face is on the boundary
    #[inline]
    pub fn is_boundary_face(&self, face: usize) -> bool {
        self.face_cells[face][0].is_none() || self.face_cells[face][1].is_none()
    }

    /// Returns all boundary faces (sorted)
    pub fn boundary_faces(&self) -> Vec<usize> {
        (0..self.num_faces).filter(|f| self.is_boundary_face(*f)).collect()
    }

    /// Returns the cell used to evaluate the face flux and the sign of the face w.r.t. this cell
    ///
    /// This is the positive-side cell if it exists; otherwise the (only) negative-side cell.
    #[inline]
    pub fn reference_cell(&self, face: usize) -> (usize, f64) {
        match self.face_cells[face] {
            [Some(c), _] => (c, 1.0),
            [None, Some(c)] => (c, -1.0),
            [None, None] => unreachable!("Grid::new rejects faces without cells"),
        }
    }

    /// Returns the default location of the continuity points
    pub fn default_eta(&self) -> f64 {
        if self.simplex {
            DEFAULT_ETA_SIMPLEX
        } else {
            DEFAULT_ETA
        }
    }

    /// Returns an error if `len` differs from the number of cells
    pub(crate) fn check_cells_len(&self, len: usize, message: &'static str) -> Result<(), Error> {
        if len != self.num_cells {
            return Err(Error::Config(message));
        }
        Ok(())
    }

    /// Returns an error if `len` differs from the number of faces
    pub(crate) fn check_faces_len(&self, len: usize, message: &'static str) -> Result<(), Error> {
        if len != self.num_faces {
            return Err(Error::Config(message));
        }
        Ok(())
    }
}

impl GridId {
    /// Returns a new identity
    fn next() -> Self {
        GridId(NEXT_GRID_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Clone for Grid {
    fn clone(&self) -> Self {
        Grid {
            id: GridId::next(),
            dim: self.dim,
            num_cells: self.num_cells,
            num_faces: self.num_faces,
            num_nodes: self.num_nodes,
            nodes: self.nodes.clone(),
            face_nodes: self.face_nodes.clone(),
            cell_faces: self.cell_faces.clone(),
            face_cells: self.face_cells.clone(),
            cell_centers: self.cell_centers.clone(),
            cell_volumes: self.cell_volumes.clone(),
            face_centers: self.face_centers.clone(),
            face_normals: self.face_normals.clone(),
            face_areas: self.face_areas.clone(),
            simplex: self.simplex,
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grid {:?}\n", self.id.0).unwrap();
        write!(f, "dimension = {}\n", self.dim).unwrap();
        write!(f, "number of cells = {}\n", self.num_cells).unwrap();
        write!(f, "number of faces = {}\n", self.num_faces).unwrap();
        write!(f, "number of boundary faces = {}\n", self.boundary_faces().len()).unwrap();
        write!(f, "number of nodes = {}\n", self.num_nodes).unwrap();
        write!(f, "simplex = {}\n", self.simplex).unwrap();
        Ok(())
    }
}

/// Generates the nodes of a structured 2D grid (optionally perturbing the interior nodes)
fn structured_nodes_2d(nx: usize, ny: usize, lx: f64, ly: f64, amplitude: f64) -> Result<Vec<[f64; 2]>, Error> {
    if nx == 0 || ny == 0 {
        return Err(Error::Config("the number of cells along each direction must be ≥ 1"));
    }
    let (dx, dy) = (lx / nx as f64, ly / ny as f64);
    let mut nodes = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..(ny + 1) {
        for i in 0..(nx + 1) {
            let mut x = [i as f64 * dx, j as f64 * dy];
            if i > 0 && i < nx && j > 0 && j < ny {
                let phase = (7 * i + 13 * j) as f64;
                x[0] += amplitude * dx * f64::sin(phase);
                x[1] += amplitude * dy * f64::cos(1.7 * phase);
            }
            nodes.push(x);
        }
    }
    Ok(nodes)
}

#[inline]
fn mean_point(nodes: &[[f64; 3]], ids: &[usize]) -> [f64; 3] {
    let mut xm = [0.0; 3];
    for n in ids {
        for k in 0..3 {
            xm[k] += nodes[*n][k];
        }
    }
    let den = ids.len() as f64;
    [xm[0] / den, xm[1] / den, xm[2] / den]
}

#[inline]
pub(crate) fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub(crate) fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
fn norm(a: &[f64; 3]) -> f64 {
    f64::sqrt(dot(a, a))
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
