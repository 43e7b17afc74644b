use super::{scalar_divergence, LocalSystem, SubFace, SubcellTopology, Triplets};
use crate::base::{BcKind, Error, FourthOrderTensor, Grid, VectorBoundaryCondition};
use log::debug;
use nalgebra_sparse::csr::CsrMatrix;
use russell_lab::Matrix;

/// Holds the MPSA discretization of the stress and the Biot coupling operators
///
/// The face tractions (integrated over the face, total stress times the face normal) are
///
/// ```text
/// t = stress ⋅ u + bound_stress ⋅ u_b + grad_p ⋅ p
/// ```
///
/// and the divergence of the displacement in each cell is
///
/// ```text
/// div(u) = div_d ⋅ u + bound_div_d ⋅ u_b + stabilization ⋅ p
/// ```
///
/// Vector quantities are ordered cell-major (or face-major) with the component running fastest.
pub struct MechanicsMatrices {
    /// Dependence of the face tractions on the cell displacements (num_faces·dim × num_cells·dim)
    pub stress: CsrMatrix<f64>,

    /// Dependence of the face tractions on the boundary values (num_faces·dim × num_faces·dim)
    pub bound_stress: CsrMatrix<f64>,

    /// Dependence of the face tractions on the cell pressures (num_faces·dim × num_cells)
    pub grad_p: CsrMatrix<f64>,

    /// Dependence of the cell divergence on the cell displacements (num_cells × num_cells·dim)
    pub div_d: CsrMatrix<f64>,

    /// Dependence of the cell divergence on the cell pressures (num_cells × num_cells)
    pub stabilization: CsrMatrix<f64>,

    /// Dependence of the cell divergence on the boundary values (num_cells × num_faces·dim)
    pub bound_div_d: CsrMatrix<f64>,
}

/// Returns the local index of the gradient component (i,l) of local cell lc
#[inline]
fn gid(lc: usize, i: usize, l: usize, dim: usize) -> usize {
    (lc * dim + i) * dim + l
}

/// Computes the traction operator `T[i][k][l] = Σ_j n_j C[i][j][k][l]` for cell c
fn traction_operator(normal: &[f64; 3], stiffness: &FourthOrderTensor, c: usize) -> Vec<f64> {
    let d = stiffness.dim;
    let mut t = vec![0.0; d * d * d];
    for i in 0..d {
        for k in 0..d {
            for l in 0..d {
                t[(i * d + k) * d + l] = (0..d).map(|j| normal[j] * stiffness.get(c, i, j, k, l)).sum();
            }
        }
    }
    t
}

/// Checks the input of the stress discretization against the grid
fn validate(
    grid: &Grid,
    stiffness: &FourthOrderTensor,
    bc: &VectorBoundaryCondition,
    eta: Option<f64>,
) -> Result<(), Error> {
    if stiffness.dim != grid.dim {
        return Err(Error::Config("stiffness has the wrong dimension"));
    }
    grid.check_cells_len(stiffness.num_cells(), "stiffness must have num_cells tensors")?;
    bc.check(grid)?;
    if let Some(value) = eta {
        if value < 0.0 || value >= 1.0 {
            return Err(Error::Config("eta must be in [0.0, 1.0)"));
        }
    }
    Ok(())
}

/// Discretizes the (total) stress with the multi-point stress approximation
///
/// The pressure enters through the continuity of total traction `σ n - p n` across
/// interior sub-faces and through the Neumann/Robin conditions. The coupling and
/// stabilization operators are obtained from the same local elimination.
///
/// # Input
///
/// * `grid` -- the grid
/// * `stiffness` -- the elastic stiffness per cell
/// * `bc` -- the boundary conditions per face and component
/// * `eta` -- location of the continuity points (None means the grid default)
///
/// # Boundary values
///
/// * Dirichlet: the displacement component on the face
/// * Neumann: the outward total traction component integrated over the face
/// * Robin: `outward_traction + alpha · area · u` integrated over the face
///
/// The local systems are eliminated in the minimum-norm sense: the rotational part of the
/// sub-cell gradients does not affect the tractions and is not determined on parallelogram
/// regions (e.g., Cartesian grids with `eta = 0`) or next to traction boundaries.
pub fn mpsa(
    grid: &Grid,
    stiffness: &FourthOrderTensor,
    bc: &VectorBoundaryCondition,
    eta: Option<f64>,
) -> Result<MechanicsMatrices, Error> {
    validate(grid, stiffness, bc, eta)?;
    let eta = eta.unwrap_or(grid.default_eta());
    let topology = SubcellTopology::new(grid)?;
    let (nc, nf, d) = (grid.num_cells, grid.num_faces, grid.dim);
    let kind = |f: usize, i: usize| {
        bc.kind(f, i)
            .ok_or(Error::Config("boundary face has no boundary condition"))
    };

    let mut stress = Triplets::new(nf * d, nc * d);
    let mut bound_stress = Triplets::new(nf * d, nf * d);
    let mut grad_p = Triplets::new(nf * d, nc);
    let mut disp = Triplets::new(nf, nc * d);
    let mut bound_disp = Triplets::new(nf, nf * d);
    let mut disp_p = Triplets::new(nf, nc);

    for region in &topology.regions {
        let (nlc, nlf) = (region.cells.len(), region.faces.len());
        let subfaces: Vec<_> = region.faces.iter().map(|f| SubFace::new(grid, region.node, *f, eta)).collect();

        // local system: A G = Bc u + Bb u_b + Bp p
        let mut sys = LocalSystem::new(nlc * d * d, &[nlc * d, nlf * d, nlc]);
        let mut row = 0;
        for (lf, s) in subfaces.iter().enumerate() {
            let f = s.face;
            match grid.face_cells[f] {
                [Some(c1), Some(c2)] => {
                    let (l1, l2) = (region.cell_index(c1)?, region.cell_index(c2)?);
                    let (t1, t2) = (traction_operator(&s.normal, stiffness, c1), traction_operator(&s.normal, stiffness, c2));
                    let (dx1, dx2) = (s.distance(grid, c1), s.distance(grid, c2));
                    for i in 0..d {
                        for k in 0..d {
                            for l in 0..d {
                                sys.add_a(row, gid(l1, k, l, d), t1[(i * d + k) * d + l]);
                                sys.add_a(row, gid(l2, k, l, d), -t2[(i * d + k) * d + l]);
                            }
                        }
                        sys.add_rhs(2, row, l1, s.normal[i]);
                        sys.add_rhs(2, row, l2, -s.normal[i]);
                        for l in 0..d {
                            sys.add_a(row + 1, gid(l1, i, l, d), dx1[l]);
                            sys.add_a(row + 1, gid(l2, i, l, d), -dx2[l]);
                        }
                        sys.add_rhs(0, row + 1, l1 * d + i, -1.0);
                        sys.add_rhs(0, row + 1, l2 * d + i, 1.0);
                        row += 2;
                    }
                }
                _ => {
                    let (c, sign) = grid.reference_cell(f);
                    let lc = region.cell_index(c)?;
                    let t = traction_operator(&s.normal, stiffness, c);
                    let dx = s.distance(grid, c);
                    for i in 0..d {
                        let bc_kind = kind(f, i)?;
                        if bc_kind != BcKind::Dirichlet {
                            for k in 0..d {
                                for l in 0..d {
                                    sys.add_a(row, gid(lc, k, l, d), sign * t[(i * d + k) * d + l]);
                                }
                            }
                            sys.add_rhs(2, row, lc, sign * s.normal[i]);
                            sys.add_rhs(1, row, lf * d + i, 1.0 / s.nodes_per_face);
                        }
                        match bc_kind {
                            BcKind::Dirichlet => {
                                for l in 0..d {
                                    sys.add_a(row, gid(lc, i, l, d), dx[l]);
                                }
                                sys.add_rhs(0, row, lc * d + i, -1.0);
                                sys.add_rhs(1, row, lf * d + i, 1.0);
                            }
                            BcKind::Robin => {
                                let alpha = bc.robin_weight[f * d + i] * s.area;
                                for l in 0..d {
                                    sys.add_a(row, gid(lc, i, l, d), alpha * dx[l]);
                                }
                                sys.add_rhs(0, row, lc * d + i, -alpha);
                            }
                            BcKind::Neumann => (),
                        }
                        row += 1;
                    }
                }
            }
        }
        let solution = sys.solve_minimum_norm(region.node, nlc * d * (d - 1) / 2)?;
        let (gc, gb, gp) = (&solution[0], &solution[1], &solution[2]);

        // sub-face tractions and normal displacements from the reference cell
        for s in &subfaces {
            let f = s.face;
            let boundary = grid.is_boundary_face(f);
            let (c, sign) = grid.reference_cell(f);
            let lc = region.cell_index(c)?;
            let t = traction_operator(&s.normal, stiffness, c);
            let dx = s.distance(grid, c);
            for i in 0..d {
                let r = f * d + i;
                if boundary && kind(f, i)? == BcKind::Neumann {
                    bound_stress.put(r, r, sign / s.nodes_per_face);
                } else {
                    let traction = |g: &Matrix, col: usize| -> f64 {
                        let mut v = 0.0;
                        for k in 0..d {
                            for l in 0..d {
                                v += t[(i * d + k) * d + l] * g.get(gid(lc, k, l, d), col);
                            }
                        }
                        v
                    };
                    for (lcol, cell) in region.cells.iter().enumerate() {
                        for k in 0..d {
                            stress.put(r, cell * d + k, traction(gc, lcol * d + k));
                        }
                        grad_p.put(r, *cell, traction(gp, lcol));
                    }
                    for (lcol, face) in region.faces.iter().enumerate() {
                        for k in 0..d {
                            bound_stress.put(r, face * d + k, traction(gb, lcol * d + k));
                        }
                    }
                    grad_p.put(r, c, -s.normal[i]);
                }

                // normal displacement: n_i (u_i + G_il dx_l)
                let ni = s.normal[i];
                if boundary && kind(f, i)? == BcKind::Dirichlet {
                    bound_disp.put(f, r, ni);
                    continue;
                }
                let reconstruct = |g: &Matrix, col: usize| -> f64 {
                    ni * (0..d).map(|l| dx[l] * g.get(gid(lc, i, l, d), col)).sum::<f64>()
                };
                disp.put(f, c * d + i, ni);
                for (lcol, cell) in region.cells.iter().enumerate() {
                    for k in 0..d {
                        disp.put(f, cell * d + k, reconstruct(gc, lcol * d + k));
                    }
                    disp_p.put(f, *cell, reconstruct(gp, lcol));
                }
                for (lcol, face) in region.faces.iter().enumerate() {
                    for k in 0..d {
                        bound_disp.put(f, face * d + k, reconstruct(gb, lcol * d + k));
                    }
                }
            }
        }
    }
    debug!(
        "MPSA: {} interaction regions, {} sub-faces, eta = {}",
        topology.regions.len(),
        topology.num_subfaces(),
        eta
    );

    let div = scalar_divergence(grid)?;
    Ok(MechanicsMatrices {
        stress: stress.to_csr()?,
        bound_stress: bound_stress.to_csr()?,
        grad_p: grad_p.to_csr()?,
        div_d: &div * &disp.to_csr()?,
        stabilization: &div * &disp_p.to_csr()?,
        bound_div_d: &div * &bound_disp.to_csr()?,
    })
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::mpsa;
    use crate::base::{BcKind, Error, FourthOrderTensor, Grid, VectorBoundaryCondition};
    use crate::fv::{mat_vec, vector_divergence};
    use crate::StrError;
    use nalgebra_sparse::csr::CsrMatrix;
    use russell_lab::{approx_eq, array_approx_eq, mat_approx_eq, solve_lin_sys, vec_approx_eq, Matrix, Vector};
    use std::collections::HashSet;

    fn dense(a: &CsrMatrix<f64>) -> Matrix {
        let mut m = Matrix::new(a.nrows(), a.ncols());
        for (i, j, v) in a.triplet_iter() {
            m.set(i, j, m.get(i, j) + v);
        }
        m
    }

    /// Returns the displacement u(x) = b + B x
    fn linear(x: &[f64; 3], dim: usize) -> Vec<f64> {
        let bb = [[0.1, 0.3, -0.2], [-0.4, 0.2, 0.1], [0.3, 0.0, 0.5]];
        let b = [1.0, -1.0, 0.5];
        (0..dim).map(|i| b[i] + (0..dim).map(|l| bb[i][l] * x[l]).sum::<f64>()).collect()
    }

    #[test]
    fn linear_displacement_is_reproduced() -> Result<(), StrError> {
        let grids = vec![
            Grid::cartesian_2d(3, 2, 1.0, 1.0).unwrap(),
            Grid::perturbed_2d(3, 3, 1.0, 1.0, 0.15).unwrap(),
            Grid::simplex_2d(2, 2, 1.0, 1.0).unwrap(),
            Grid::cartesian_3d(2, 2, 2, 1.0, 1.0, 1.0).unwrap(),
        ];
        for grid in &grids {
            let (nc, nf, d) = (grid.num_cells, grid.num_faces, grid.dim);
            let c = FourthOrderTensor::uniform(d, nc, 1.0, 2.0).unwrap();
            let bc = VectorBoundaryCondition::all(grid, BcKind::Dirichlet);
            let m = mpsa(grid, &c, &bc, None).unwrap();
            let div = vector_divergence(grid).unwrap();
            let mut ub = vec![0.0; nf * d];
            for f in grid.boundary_faces() {
                ub[f * d..(f + 1) * d].copy_from_slice(&linear(&grid.face_centers[f], d));
            }
            let mut a = dense(&(&div * &m.stress));
            let rhs = mat_vec(&(&div * &m.bound_stress), &ub).unwrap();
            let mut x = Vector::from(&rhs.iter().map(|v| -v).collect::<Vec<_>>());
            solve_lin_sys(&mut x, &mut a)?;
            let expected: Vec<_> = grid.cell_centers.iter().flat_map(|x| linear(x, d)).collect();
            vec_approx_eq(&x, &expected, 1e-9);

            // the divergence of the linear field is the trace of B
            let u = x.as_data().clone();
            let div_u = mat_vec(&m.div_d, &u).unwrap();
            let div_b = mat_vec(&m.bound_div_d, &ub).unwrap();
            let trace = if d == 2 { 0.3 } else { 0.8 };
            for cell in 0..nc {
                approx_eq((div_u[cell] + div_b[cell]) / grid.cell_volumes[cell], trace, 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn shapes_are_correct() {
        let grid = Grid::cartesian_2d(2, 1, 2.0, 1.0).unwrap();
        let (nc, nf) = (grid.num_cells, grid.num_faces);
        let c = FourthOrderTensor::uniform(2, nc, 1.0, 1.0).unwrap();
        let bc = VectorBoundaryCondition::all(&grid, BcKind::Dirichlet);
        let m = mpsa(&grid, &c, &bc, None).unwrap();
        assert_eq!((m.stress.nrows(), m.stress.ncols()), (nf * 2, nc * 2));
        assert_eq!((m.bound_stress.nrows(), m.bound_stress.ncols()), (nf * 2, nf * 2));
        assert_eq!((m.grad_p.nrows(), m.grad_p.ncols()), (nf * 2, nc));
        assert_eq!((m.div_d.nrows(), m.div_d.ncols()), (nc, nc * 2));
        assert_eq!((m.stabilization.nrows(), m.stabilization.ncols()), (nc, nc));
        assert_eq!((m.bound_div_d.nrows(), m.bound_div_d.ncols()), (nc, nf * 2));
    }

    #[test]
    fn stabilization_rows_sum_to_zero() {
        let grids = vec![
            Grid::cartesian_2d(3, 3, 1.0, 1.0).unwrap(),
            Grid::perturbed_2d(4, 3, 1.0, 1.0, 0.2).unwrap(),
            Grid::simplex_2d(3, 2, 1.0, 1.0).unwrap(),
            Grid::cartesian_3d(2, 2, 2, 1.0, 1.0, 1.0).unwrap(),
        ];
        for grid in &grids {
            let c = FourthOrderTensor::uniform(grid.dim, grid.num_cells, 1.0, 1.0).unwrap();
            let bc = VectorBoundaryCondition::all(grid, BcKind::Dirichlet);
            let m = mpsa(grid, &c, &bc, None).unwrap();
            let sums = mat_vec(&m.stabilization, &vec![1.0; grid.num_cells]).unwrap();
            array_approx_eq(&sums, &vec![0.0; grid.num_cells], 1e-12);
        }
    }

    /// Returns the boundary faces with the coordinate `coord` equal to `value`
    fn faces_at(grid: &Grid, coord: usize, value: f64) -> Vec<usize> {
        grid.boundary_faces()
            .into_iter()
            .filter(|f| f64::abs(grid.face_centers[*f][coord] - value) < 1e-10)
            .collect()
    }

    /// Solves div⋅(stress⋅u + bound_stress⋅u_b) = 0
    fn solve(grid: &Grid, c: &FourthOrderTensor, bc: &VectorBoundaryCondition, ub: &[f64]) -> Result<Vector, StrError> {
        let m = mpsa(grid, c, bc, None).unwrap();
        let div = vector_divergence(grid).unwrap();
        let mut a = dense(&(&div * &m.stress));
        let rhs = mat_vec(&(&div * &m.bound_stress), ub).unwrap();
        let mut x = Vector::from(&rhs.iter().map(|v| -v).collect::<Vec<_>>());
        solve_lin_sys(&mut x, &mut a)?;
        Ok(x)
    }

    #[test]
    fn stabilization_with_free_faces_is_local() {
        // traction-free top and Robin right side; the other sides are clamped
        let grid = Grid::perturbed_2d(4, 3, 1.0, 1.0, 0.2).unwrap();
        let c = FourthOrderTensor::uniform(2, grid.num_cells, 1.0, 1.0).unwrap();
        let mut free = faces_at(&grid, 1, 1.0);
        free.extend(faces_at(&grid, 0, 1.0));
        let mut bc = VectorBoundaryCondition::all(&grid, BcKind::Dirichlet);
        for f in faces_at(&grid, 1, 1.0) {
            bc.set_component(f, 0, BcKind::Neumann).unwrap();
            bc.set_component(f, 1, BcKind::Neumann).unwrap();
        }
        for f in faces_at(&grid, 0, 1.0) {
            bc.set_component(f, 0, BcKind::Robin).unwrap();
            bc.set_component(f, 1, BcKind::Robin).unwrap();
            bc.set_face_robin_weight(f, 1.0).unwrap();
        }
        let m = mpsa(&grid, &c, &bc, None).unwrap();
        let sums = mat_vec(&m.stabilization, &vec![1.0; grid.num_cells]).unwrap();

        // cells without a node on a free face see no pressure load
        let free_nodes: HashSet<_> = free.iter().flat_map(|f| grid.face_nodes[*f].iter().copied()).collect();
        let mut away = 0;
        let mut near = Vec::new();
        for cell in 0..grid.num_cells {
            let touches = grid.cell_faces[cell]
                .iter()
                .any(|(f, _)| grid.face_nodes[*f].iter().any(|n| free_nodes.contains(n)));
            if touches {
                near.push(sums[cell]);
            } else {
                approx_eq(sums[cell], 0.0, 1e-12);
                away += 1;
            }
        }
        assert_eq!(away, 6);

        // the uniform pressure expands the material next to the free faces
        assert!(near.iter().any(|s| f64::abs(*s) > 1e-8));
    }

    #[test]
    fn robin_with_zero_weight_equals_neumann() {
        let grid = Grid::perturbed_2d(3, 3, 1.0, 1.0, 0.15).unwrap();
        let c = FourthOrderTensor::uniform(2, grid.num_cells, 1.0, 2.0).unwrap();
        let mut neu = VectorBoundaryCondition::all(&grid, BcKind::Dirichlet);
        let mut rob = VectorBoundaryCondition::all(&grid, BcKind::Dirichlet);
        for f in faces_at(&grid, 0, 1.0) {
            for i in 0..2 {
                neu.set_component(f, i, BcKind::Neumann).unwrap();
                rob.set_component(f, i, BcKind::Robin).unwrap();
            }
            rob.set_face_robin_weight(f, 0.0).unwrap();
        }
        let a = mpsa(&grid, &c, &neu, None).unwrap();
        let b = mpsa(&grid, &c, &rob, None).unwrap();
        mat_approx_eq(&dense(&a.stress), &dense(&b.stress), 1e-10);
        mat_approx_eq(&dense(&a.bound_stress), &dense(&b.bound_stress), 1e-10);
        mat_approx_eq(&dense(&a.grad_p), &dense(&b.grad_p), 1e-10);
        mat_approx_eq(&dense(&a.div_d), &dense(&b.div_d), 1e-10);
        mat_approx_eq(&dense(&a.stabilization), &dense(&b.stabilization), 1e-10);
        mat_approx_eq(&dense(&a.bound_div_d), &dense(&b.bound_div_d), 1e-10);
    }

    #[test]
    fn robin_with_large_weight_approaches_dirichlet() -> Result<(), StrError> {
        let grid = Grid::cartesian_2d(3, 3, 1.0, 1.0).unwrap();
        let c = FourthOrderTensor::uniform(2, grid.num_cells, 1.0, 1.0).unwrap();
        let right = faces_at(&grid, 0, 1.0);
        let u_right = [0.1, 0.05];
        let alpha = 1e6;
        let bc_dir = VectorBoundaryCondition::all(&grid, BcKind::Dirichlet);
        let mut bc_rob = VectorBoundaryCondition::all(&grid, BcKind::Dirichlet);
        let mut ub_dir = vec![0.0; grid.num_faces * 2];
        let mut ub_rob = vec![0.0; grid.num_faces * 2];
        for f in &right {
            for i in 0..2 {
                bc_rob.set_component(*f, i, BcKind::Robin).unwrap();
                bc_rob.set_component_robin_weight(*f, i, alpha).unwrap();
                ub_dir[f * 2 + i] = u_right[i];
                ub_rob[f * 2 + i] = alpha * grid.face_areas[*f] * u_right[i];
            }
        }
        let x_dir = solve(&grid, &c, &bc_dir, &ub_dir)?;
        let x_rob = solve(&grid, &c, &bc_rob, &ub_rob)?;
        assert!(x_dir.as_data().iter().any(|v| f64::abs(*v) > 1e-3));
        vec_approx_eq(&x_rob, &x_dir, 1e-5);
        Ok(())
    }

    #[test]
    fn uniform_pressure_balances() {
        // a uniform pressure exerts no net force on any cell
        let grid = Grid::perturbed_2d(3, 3, 1.0, 1.0, 0.2).unwrap();
        let c = FourthOrderTensor::uniform(2, grid.num_cells, 1.0, 1.0).unwrap();
        let bc = VectorBoundaryCondition::all(&grid, BcKind::Dirichlet);
        let m = mpsa(&grid, &c, &bc, None).unwrap();
        let div = vector_divergence(&grid).unwrap();
        let force = mat_vec(&(&div * &m.grad_p), &vec![2.0; grid.num_cells]).unwrap();
        array_approx_eq(&force, &vec![0.0; 2 * grid.num_cells], 1e-12);
    }

    #[test]
    fn neumann_faces_are_exact() {
        let grid = Grid::cartesian_2d(2, 2, 1.0, 1.0).unwrap();
        let c = FourthOrderTensor::uniform(2, 4, 1.0, 1.0).unwrap();
        let mut bc = VectorBoundaryCondition::all(&grid, BcKind::Dirichlet);
        let top: Vec<_> = grid.boundary_faces().into_iter().filter(|f| grid.face_centers[*f][1] > 1.0 - 1e-10).collect();
        for f in &top {
            bc.set_component(*f, 0, BcKind::Neumann).unwrap();
            bc.set_component(*f, 1, BcKind::Neumann).unwrap();
        }
        let m = mpsa(&grid, &c, &bc, None).unwrap();
        for f in &top {
            for i in 0..2 {
                let r = f * 2 + i;
                assert_eq!(m.stress.row(r).nnz(), 0);
                assert_eq!(m.grad_p.row(r).nnz(), 0);
                let row = m.bound_stress.row(r);
                assert_eq!(row.col_indices(), &[r]);
                approx_eq(row.values()[0], 1.0, 1e-15);
            }
        }
    }

    #[test]
    fn roller_conditions_work() {
        // compress a column: Dirichlet bottom and top in y; free sliding sides
        let grid = Grid::cartesian_2d(2, 3, 1.0, 1.0).unwrap();
        let (nc, nf) = (grid.num_cells, grid.num_faces);
        let (mu, lambda) = (1.0, 0.5);
        let c = FourthOrderTensor::uniform(2, nc, mu, lambda).unwrap();
        let mut bc = VectorBoundaryCondition::all(&grid, BcKind::Dirichlet);
        let mut ub = vec![0.0; nf * 2];
        for f in grid.boundary_faces() {
            let x = grid.face_centers[f];
            if x[0] < 1e-10 || x[0] > 1.0 - 1e-10 {
                // sides: u_x = 0, traction-free in y
                bc.set_component(f, 1, BcKind::Neumann).unwrap();
            } else if x[1] > 1.0 - 1e-10 {
                ub[f * 2 + 1] = -0.1;
            }
        }
        let m = mpsa(&grid, &c, &bc, None).unwrap();
        let div = vector_divergence(&grid).unwrap();
        let mut a = dense(&(&div * &m.stress));
        let rhs = mat_vec(&(&div * &m.bound_stress), &ub).unwrap();
        let mut x = Vector::from(&rhs.iter().map(|v| -v).collect::<Vec<_>>());
        solve_lin_sys(&mut x, &mut a).unwrap();
        // u = (0, -0.1 y)
        for cell in 0..nc {
            approx_eq(x[cell * 2], 0.0, 1e-10);
            approx_eq(x[cell * 2 + 1], -0.1 * grid.cell_centers[cell][1], 1e-10);
        }
    }

    #[test]
    fn mpsa_captures_errors() {
        let grid = Grid::cartesian_2d(2, 2, 1.0, 1.0).unwrap();
        let bc = VectorBoundaryCondition::all(&grid, BcKind::Dirichlet);
        let c = FourthOrderTensor::uniform(2, 3, 1.0, 1.0).unwrap();
        assert_eq!(
            mpsa(&grid, &c, &bc, None).err(),
            Some(Error::Config("stiffness must have num_cells tensors"))
        );
        let c = FourthOrderTensor::uniform(3, 4, 1.0, 1.0).unwrap();
        assert_eq!(
            mpsa(&grid, &c, &bc, None).err(),
            Some(Error::Config("stiffness has the wrong dimension"))
        );
        let c = FourthOrderTensor::uniform(2, 4, 1.0, 1.0).unwrap();
        let other = Grid::cartesian_2d(1, 1, 1.0, 1.0).unwrap();
        assert_eq!(
            mpsa(&grid, &c, &VectorBoundaryCondition::all(&other, BcKind::Dirichlet), None).err(),
            Some(Error::Config("boundary condition must cover all faces"))
        );
        let zero = FourthOrderTensor::uniform(2, 4, 0.0, 0.0).unwrap();
        let free = VectorBoundaryCondition::all(&grid, BcKind::Neumann);
        assert!(mpsa(&grid, &zero, &free, None).err().unwrap().is_numerical());
    }
}
