use super::{LocalSystem, SubFace, SubcellTopology, Triplets};
use crate::base::{BcKind, BoundaryCondition, Error, Grid, SecondOrderTensor};
use log::debug;
use nalgebra_sparse::csr::CsrMatrix;

/// Holds the MPFA discretization of a scalar flux
///
/// The face flux (integrated over the face, along the face normal) is
///
/// ```text
/// q = flux ⋅ p + bound_flux ⋅ b
/// ```
///
/// where `p` are the cell pressures and `b` the boundary values.
pub struct FluxMatrices {
    /// Dependence of the face fluxes on the cell pressures (num_faces × num_cells)
    pub flux: CsrMatrix<f64>,

    /// Dependence of the face fluxes on the boundary values (num_faces × num_faces)
    pub bound_flux: CsrMatrix<f64>,
}

/// Returns the local index of the gradient component k of local cell lc
#[inline]
fn gid(lc: usize, k: usize, dim: usize) -> usize {
    lc * dim + k
}

/// Computes `Σ_j n_j K_jk` for cell c
fn normal_times_tensor(normal: &[f64; 3], k: &SecondOrderTensor, c: usize) -> [f64; 3] {
    let mut nk = [0.0; 3];
    for col in 0..k.dim {
        for j in 0..k.dim {
            nk[col] += normal[j] * k.get(c, j, col);
        }
    }
    nk
}

/// Returns the kind of a boundary face
#[inline]
fn boundary_kind(bc: &BoundaryCondition, face: usize) -> Result<BcKind, Error> {
    bc.kind(face).ok_or(Error::Config("boundary face has no boundary condition"))
}

/// Checks the input of the flux discretization against the grid
fn validate(grid: &Grid, permeability: &SecondOrderTensor, bc: &BoundaryCondition, eta: Option<f64>) -> Result<(), Error> {
    if permeability.dim != grid.dim {
        return Err(Error::Config("permeability has the wrong dimension"));
    }
    grid.check_cells_len(permeability.num_cells(), "permeability must have num_cells tensors")?;
    bc.check(grid)?;
    if let Some(value) = eta {
        if value < 0.0 || value >= 1.0 {
            return Err(Error::Config("eta must be in [0.0, 1.0)"));
        }
    }
    Ok(())
}

/// Discretizes the flux `-K ∇p` with the multi-point flux approximation (O-method)
///
/// # Input
///
/// * `grid` -- the grid
/// * `permeability` -- the permeability tensor per cell
/// * `bc` -- the boundary conditions
/// * `eta` -- location of the continuity points (None means the grid default)
///
/// # Boundary values
///
/// * Dirichlet: the pressure on the face
/// * Neumann: the outward flux integrated over the face
/// * Robin: `outward_flux + alpha · area · p` integrated over the face
pub fn mpfa(
    grid: &Grid,
    permeability: &SecondOrderTensor,
    bc: &BoundaryCondition,
    eta: Option<f64>,
) -> Result<FluxMatrices, Error> {
    validate(grid, permeability, bc, eta)?;
    let eta = eta.unwrap_or(grid.default_eta());
    let topology = SubcellTopology::new(grid)?;
    let d = grid.dim;
    let mut flux = Triplets::new(grid.num_faces, grid.num_cells);
    let mut bound_flux = Triplets::new(grid.num_faces, grid.num_faces);

    for region in &topology.regions {
        let nlc = region.cells.len();
        let subfaces: Vec<_> = region.faces.iter().map(|f| SubFace::new(grid, region.node, *f, eta)).collect();

        // local system: A g = Bc p + Bb b
        let mut sys = LocalSystem::new(nlc * d, &[nlc, region.faces.len()]);
        let mut row = 0;
        for (lf, s) in subfaces.iter().enumerate() {
            let f = s.face;
            match grid.face_cells[f] {
                [Some(c1), Some(c2)] => {
                    let (l1, l2) = (region.cell_index(c1)?, region.cell_index(c2)?);
                    let (nk1, nk2) = (normal_times_tensor(&s.normal, permeability, c1), normal_times_tensor(&s.normal, permeability, c2));
                    let (dx1, dx2) = (s.distance(grid, c1), s.distance(grid, c2));
                    for k in 0..d {
                        sys.add_a(row, gid(l1, k, d), nk1[k]);
                        sys.add_a(row, gid(l2, k, d), -nk2[k]);
                        sys.add_a(row + 1, gid(l1, k, d), dx1[k]);
                        sys.add_a(row + 1, gid(l2, k, d), -dx2[k]);
                    }
                    sys.add_rhs(0, row + 1, l1, -1.0);
                    sys.add_rhs(0, row + 1, l2, 1.0);
                    row += 2;
                }
                _ => {
                    let (c, sign) = grid.reference_cell(f);
                    let lc = region.cell_index(c)?;
                    let nk = normal_times_tensor(&s.normal, permeability, c);
                    let dx = s.distance(grid, c);
                    match boundary_kind(bc, f)? {
                        BcKind::Dirichlet => {
                            for k in 0..d {
                                sys.add_a(row, gid(lc, k, d), dx[k]);
                            }
                            sys.add_rhs(0, row, lc, -1.0);
                            sys.add_rhs(1, row, lf, 1.0);
                        }
                        BcKind::Neumann => {
                            for k in 0..d {
                                sys.add_a(row, gid(lc, k, d), -sign * nk[k]);
                            }
                            sys.add_rhs(1, row, lf, 1.0 / s.nodes_per_face);
                        }
                        BcKind::Robin => {
                            let alpha = bc.robin_weight[f] * s.area;
                            for k in 0..d {
                                sys.add_a(row, gid(lc, k, d), -sign * nk[k] + alpha * dx[k]);
                            }
                            sys.add_rhs(0, row, lc, -alpha);
                            sys.add_rhs(1, row, lf, 1.0 / s.nodes_per_face);
                        }
                    }
                    row += 1;
                }
            }
        }
        let solution = sys.solve(region.node)?;
        let (gc, gb) = (&solution[0], &solution[1]);

        // sub-face fluxes from the reference cell
        for s in &subfaces {
            let f = s.face;
            let (c, sign) = grid.reference_cell(f);
            if grid.is_boundary_face(f) && boundary_kind(bc, f)? == BcKind::Neumann {
                bound_flux.put(f, f, sign / s.nodes_per_face);
                continue;
            }
            let lc = region.cell_index(c)?;
            let nk = normal_times_tensor(&s.normal, permeability, c);
            for (col, cell) in region.cells.iter().enumerate() {
                let v: f64 = (0..d).map(|k| nk[k] * gc.get(gid(lc, k, d), col)).sum();
                flux.put(f, *cell, -v);
            }
            for (col, face) in region.faces.iter().enumerate() {
                let v: f64 = (0..d).map(|k| nk[k] * gb.get(gid(lc, k, d), col)).sum();
                bound_flux.put(f, *face, -v);
            }
        }
    }
    debug!(
        "MPFA: {} interaction regions, {} sub-faces, eta = {}",
        topology.regions.len(),
        topology.num_subfaces(),
        eta
    );
    Ok(FluxMatrices {
        flux: flux.to_csr()?,
        bound_flux: bound_flux.to_csr()?,
    })
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
