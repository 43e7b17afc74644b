use crate::base::{dot, Error, Grid};
use std::collections::HashMap;

/// Holds the cells and faces sharing one grid node
///
/// Each (node, cell) pair is a sub-cell and each (node, face) pair is a sub-face.
/// The lists are sorted, thus the local numbering is deterministic.
#[derive(Clone, Debug)]
pub struct InteractionRegion {
    /// Grid node at the center of the region
    pub node: usize,

    /// Cells touching the node
    pub cells: Vec<usize>,

    /// Faces touching the node
    pub faces: Vec<usize>,
}

/// Holds the geometry of a sub-face (the part of a face attached to one node)
#[derive(Clone, Debug)]
pub struct SubFace {
    /// Face index
    pub face: usize,

    /// Area-scaled normal (face normal / nodes per face)
    pub normal: [f64; 3],

    /// Area (face area / nodes per face)
    pub area: f64,

    /// Number of nodes of the face
    pub nodes_per_face: f64,

    /// Continuity point
    pub point: [f64; 3],
}

/// Holds all interaction regions of a grid
#[derive(Clone, Debug)]
pub struct SubcellTopology {
    /// One region per node touched by at least one face
    pub regions: Vec<InteractionRegion>,
}

impl InteractionRegion {
    /// Returns the local index of a cell
    #[inline]
    pub fn local_cell(&self, cell: usize) -> Option<usize> {
        self.cells.binary_search(&cell).ok()
    }

    /// Returns the local index of a face
    #[inline]
    pub fn local_face(&self, face: usize) -> Option<usize> {
        self.faces.binary_search(&face).ok()
    }

    /// Returns the local index of a cell or an error if the cell is not in the region
    #[inline]
    pub fn cell_index(&self, cell: usize) -> Result<usize, Error> {
        self.local_cell(cell)
            .ok_or(Error::Config("cell does not belong to the interaction region"))
    }
}

impl SubFace {
    /// Allocates a new instance
    ///
    /// The continuity point is `x_face + eta (x_node - x_face)`; boundary sub-faces always use `eta = 0`.
    pub fn new(grid: &Grid, node: usize, face: usize, eta: f64) -> Self {
        let nn = grid.face_nodes[face].len() as f64;
        let eta = if grid.is_boundary_face(face) { 0.0 } else { eta };
        let (xf, xn) = (&grid.face_centers[face], &grid.nodes[node]);
        let n = &grid.face_normals[face];
        SubFace {
            face,
            normal: [n[0] / nn, n[1] / nn, n[2] / nn],
            area: grid.face_areas[face] / nn,
            nodes_per_face: nn,
            point: [
                xf[0] + eta * (xn[0] - xf[0]),
                xf[1] + eta * (xn[1] - xf[1]),
                xf[2] + eta * (xn[2] - xf[2]),
            ],
        }
    }

    /// Returns the distance vector from the cell center to the continuity point
    #[inline]
    pub fn distance(&self, grid: &Grid, cell: usize) -> [f64; 3] {
        let xc = &grid.cell_centers[cell];
        [self.point[0] - xc[0], self.point[1] - xc[1], self.point[2] - xc[2]]
    }

    /// Returns the projection of the normal onto a direction
    #[inline]
    pub fn normal_dot(&self, v: &[f64; 3]) -> f64 {
        dot(&self.normal, v)
    }
}

impl SubcellTopology {
    /// Allocates a new instance
    ///
    /// Returns an error if some cell does not have exactly `dim` faces meeting at one of its nodes.
    pub fn new(grid: &Grid) -> Result<Self, Error> {
        let mut node_faces: HashMap<usize, Vec<usize>> = HashMap::new();
        for f in 0..grid.num_faces {
            for n in &grid.face_nodes[f] {
                node_faces.entry(*n).or_default().push(f);
            }
        }
        let mut nodes: Vec<_> = node_faces.keys().copied().collect();
        nodes.sort();
        let mut regions = Vec::with_capacity(nodes.len());
        for node in nodes {
            let mut faces = node_faces.remove(&node).unwrap_or_default();
            faces.sort();
            faces.dedup();
            let mut count: HashMap<usize, usize> = HashMap::new();
            for f in &faces {
                for c in grid.face_cells[*f].iter().flatten() {
                    *count.entry(*c).or_insert(0) += 1;
                }
            }
            if count.values().any(|n| *n != grid.dim) {
                return Err(Error::Config("cells must have exactly dim faces meeting at each node"));
            }
            let mut cells: Vec<_> = count.into_keys().collect();
            cells.sort();
            regions.push(InteractionRegion { node, cells, faces });
        }
        Ok(SubcellTopology { regions })
    }

    /// Returns the number of sub-faces
    pub fn num_subfaces(&self) -> usize {
        self.regions.iter().map(|r| r.faces.len()).sum()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
