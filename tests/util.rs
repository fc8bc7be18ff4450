#![allow(dead_code)]
//! Toy field solvers on 1-D chains embedded in the plane.
//!
//! Fluid and mesh motion live on `n_fluid` nodes at `x = 0 … n_fluid-1`;
//! the structure on `n_structure` nodes starting at the last fluid node,
//! which is the interface. The fluid wall (node 0) and the structure clamp
//! (last structure node) carry essential conditions.

use fsi_blocks::data::bc::{BcComponents, BcKind, BoundaryConditionSet, zero_function};
use fsi_blocks::data::coordinates::Coordinates;
use fsi_blocks::data::dof_set::DofSet;
use fsi_blocks::data::field_map::FieldMap;
use fsi_blocks::data::labels::LabelSet;
use fsi_blocks::field::{AleSolver, FieldSolver, FluidSolver, StructureSolver};
use fsi_blocks::fsi_error::FsiError;
use fsi_blocks::linalg::krylov::LinearSolverKind;
use fsi_blocks::precond::PreconditionerKind;
use fsi_blocks::solver::config::{FsiConfig, LineSearch};
use fsi_blocks::solver::setup::FsiProblem;
use fsi_blocks::solver::state::FieldBoundaryConditions;
use sprs::{CsMat, TriMat};

pub const INTERFACE: i32 = 1;
pub const CLAMP: i32 = 2;
pub const WALL: i32 = 3;
pub const DIM: usize = 2;

/// `scale · L + shift · I` per component, `L` the chain graph Laplacian.
pub fn chain_operator(n: usize, comps: usize, scale: f64, shift: f64) -> CsMat<f64> {
    let mut tri = TriMat::new((n * comps, n * comps));
    for d in 0..comps {
        let o = d * n;
        for i in 0..n {
            let degree = usize::from(i > 0) + usize::from(i + 1 < n);
            tri.add_triplet(o + i, o + i, scale * degree as f64 + shift);
            if i > 0 {
                tri.add_triplet(o + i, o + i - 1, -scale);
            }
            if i + 1 < n {
                tri.add_triplet(o + i, o + i + 1, -scale);
            }
        }
    }
    tri.to_csr()
}

pub fn identity(n: usize) -> CsMat<f64> {
    chain_operator(n, 1, 0.0, 1.0)
}

/// Points `(x0 + i, 0)` for `i in 0..n`.
pub fn line(x0: f64, n: usize) -> Coordinates {
    let pts: Vec<[f64; 2]> = (0..n).map(|i| [x0 + i as f64, 0.0]).collect();
    Coordinates::from_points(DIM, &pts).unwrap()
}

pub fn labeled(coords: Coordinates, marks: &[(usize, i32)]) -> DofSet {
    let mut labels = LabelSet::new();
    for &(node, marker) in marks {
        labels.mark_boundary(node, marker);
    }
    DofSet::serial(coords, DIM).unwrap().with_labels(labels).unwrap()
}

fn apply_bcs(
    operator: &mut CsMat<f64>,
    rhs: &mut [f64],
    bcs: &BoundaryConditionSet,
    time: f64,
) -> Result<(), FsiError> {
    *operator = bcs.apply_to_matrix(operator)?;
    bcs.apply_to_vector(rhs, time, 1.0)
}

/// Stokes-like chain: `F = (α/dt) I + ν(m) (L + I) + c |β|`, one pressure
/// constraint `Σ u_x = 0`. The viscosity grows with the mesh displacement:
/// `ν(m) = ν₀ (1 + κ Σ m²)`.
pub struct ToyFluid {
    n: usize,
    map: FieldMap,
    pressure_map: FieldMap,
    viscosity: f64,
    kappa: f64,
    convection: f64,
    forcing: f64,
    alpha: f64,
    dt: f64,
    mesh: Vec<f64>,
    operator: CsMat<f64>,
    rhs: Vec<f64>,
    full_gradient: CsMat<f64>,
    gradient: CsMat<f64>,
    divergence: CsMat<f64>,
    pub mesh_moves: usize,
    /// Mesh motion number that fails, counting from zero.
    pub fail_on_mesh_move: Option<usize>,
}

impl ToyFluid {
    pub fn new(n: usize, viscosity: f64, kappa: f64, forcing: f64) -> Self {
        let mut bt = TriMat::new((n * DIM, 1));
        let mut b = TriMat::new((1, n * DIM));
        for i in 0..n {
            bt.add_triplet(i, 0, 1.0);
            b.add_triplet(0, i, 1.0);
        }
        let gradient: CsMat<f64> = bt.to_csr();
        Self {
            n,
            map: FieldMap::serial(n * DIM),
            pressure_map: FieldMap::serial(1),
            viscosity,
            kappa,
            convection: 0.1,
            forcing,
            alpha: 1.0,
            dt: 1.0,
            mesh: vec![0.0; n * DIM],
            operator: identity(n * DIM),
            rhs: vec![0.0; n * DIM],
            full_gradient: gradient.clone(),
            gradient,
            divergence: b.to_csr(),
            mesh_moves: 0,
            fail_on_mesh_move: None,
        }
    }

    pub fn effective_viscosity(&self) -> f64 {
        let m2: f64 = self.mesh.iter().map(|m| m * m).sum();
        self.viscosity * (1.0 + self.kappa * m2)
    }
}

impl FieldSolver for ToyFluid {
    fn name(&self) -> &'static str {
        "toy fluid"
    }

    fn dof_map(&self) -> &FieldMap {
        &self.map
    }

    fn build_operator(&mut self) -> Result<(), FsiError> {
        let nu = self.effective_viscosity();
        self.operator = chain_operator(self.n, DIM, nu, self.alpha / self.dt + nu);
        self.gradient = self.full_gradient.clone();
        Ok(())
    }

    fn apply_boundary_conditions(
        &mut self,
        bcs: &BoundaryConditionSet,
        time: f64,
    ) -> Result<(), FsiError> {
        apply_bcs(&mut self.operator, &mut self.rhs, bcs, time)?;
        let essential = bcs.essential_dofs()?;
        let mut bt = TriMat::new(self.full_gradient.shape());
        for (row, vals) in self.full_gradient.outer_iterator().enumerate() {
            if essential.binary_search(&row).is_ok() {
                continue;
            }
            for (col, &v) in vals.iter() {
                bt.add_triplet(row, col, v);
            }
        }
        self.gradient = bt.to_csr();
        Ok(())
    }

    fn operator(&self) -> &CsMat<f64> {
        &self.operator
    }

    fn rhs(&self) -> &[f64] {
        &self.rhs
    }
}

impl FluidSolver for ToyFluid {
    fn pressure_map(&self) -> &FieldMap {
        &self.pressure_map
    }

    fn gradient(&self) -> &CsMat<f64> {
        &self.gradient
    }

    fn divergence(&self) -> &CsMat<f64> {
        &self.divergence
    }

    fn set_time_discretization(&mut self, alpha: f64, dt: f64) {
        self.alpha = alpha;
        self.dt = dt;
    }

    fn move_mesh(&mut self, displacement: &[f64]) -> Result<(), FsiError> {
        if displacement.len() != self.mesh.len() {
            return Err(FsiError::LengthMismatch {
                what: "mesh displacement",
                expected: self.mesh.len(),
                found: displacement.len(),
            });
        }
        if self.fail_on_mesh_move == Some(self.mesh_moves) {
            return Err(FsiError::FieldSolver {
                field: "toy fluid",
                message: format!("mesh motion {} rejected", self.mesh_moves),
            });
        }
        self.mesh.copy_from_slice(displacement);
        self.mesh_moves += 1;
        Ok(())
    }

    fn update_system(
        &mut self,
        convective_velocity: &[f64],
        rhs_velocity: &[f64],
    ) -> Result<(), FsiError> {
        let n = self.mesh.len();
        if convective_velocity.len() != n || rhs_velocity.len() != n {
            return Err(FsiError::LengthMismatch {
                what: "fluid history",
                expected: n,
                found: convective_velocity.len().min(rhs_velocity.len()),
            });
        }
        let mut convection = TriMat::new((n, n));
        for (i, beta) in convective_velocity.iter().enumerate() {
            convection.add_triplet(i, i, self.convection * beta.abs());
        }
        let convection: CsMat<f64> = convection.to_csr();
        self.operator = &self.operator + &convection;
        self.rhs = rhs_velocity.iter().map(|r| r + self.forcing).collect();
        Ok(())
    }
}

/// `M = I`, `K = E L`.
pub struct ToyStructure {
    n: usize,
    map: FieldMap,
    stiffness: f64,
    mass_coefficient: f64,
    mass: CsMat<f64>,
    operator: CsMat<f64>,
    rhs: Vec<f64>,
}

impl ToyStructure {
    pub fn new(n: usize, stiffness: f64) -> Self {
        Self {
            n,
            map: FieldMap::serial(n * DIM),
            stiffness,
            mass_coefficient: 0.0,
            mass: identity(n * DIM),
            operator: identity(n * DIM),
            rhs: vec![0.0; n * DIM],
        }
    }
}

impl FieldSolver for ToyStructure {
    fn name(&self) -> &'static str {
        "toy structure"
    }

    fn dof_map(&self) -> &FieldMap {
        &self.map
    }

    fn build_operator(&mut self) -> Result<(), FsiError> {
        self.operator = chain_operator(self.n, DIM, self.stiffness, self.mass_coefficient);
        Ok(())
    }

    fn apply_boundary_conditions(
        &mut self,
        bcs: &BoundaryConditionSet,
        time: f64,
    ) -> Result<(), FsiError> {
        apply_bcs(&mut self.operator, &mut self.rhs, bcs, time)
    }

    fn operator(&self) -> &CsMat<f64> {
        &self.operator
    }

    fn rhs(&self) -> &[f64] {
        &self.rhs
    }
}

impl StructureSolver for ToyStructure {
    fn set_mass_coefficient(&mut self, coefficient: f64) {
        self.mass_coefficient = coefficient;
    }

    fn mass_matrix(&self) -> &CsMat<f64> {
        &self.mass
    }
}

/// Harmonic extension `(L + I) m = 0`.
pub struct ToyAle {
    n: usize,
    map: FieldMap,
    operator: CsMat<f64>,
    rhs: Vec<f64>,
}

impl ToyAle {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            map: FieldMap::serial(n * DIM),
            operator: identity(n * DIM),
            rhs: vec![0.0; n * DIM],
        }
    }
}

impl FieldSolver for ToyAle {
    fn name(&self) -> &'static str {
        "toy ale"
    }

    fn dof_map(&self) -> &FieldMap {
        &self.map
    }

    fn build_operator(&mut self) -> Result<(), FsiError> {
        self.operator = chain_operator(self.n, DIM, 1.0, 1.0);
        Ok(())
    }

    fn apply_boundary_conditions(
        &mut self,
        bcs: &BoundaryConditionSet,
        time: f64,
    ) -> Result<(), FsiError> {
        apply_bcs(&mut self.operator, &mut self.rhs, bcs, time)
    }

    fn operator(&self) -> &CsMat<f64> {
        &self.operator
    }

    fn rhs(&self) -> &[f64] {
        &self.rhs
    }
}

impl AleSolver for ToyAle {}

#[derive(Clone, Debug)]
pub struct ToyParams {
    pub n_fluid: usize,
    pub n_structure: usize,
    pub viscosity: f64,
    pub kappa: f64,
    pub forcing: f64,
    pub stiffness: f64,
}

impl Default for ToyParams {
    fn default() -> Self {
        Self {
            n_fluid: 4,
            n_structure: 3,
            viscosity: 1.0,
            kappa: 0.0,
            forcing: 1.0,
            stiffness: 10.0,
        }
    }
}

fn clamp(name: &str, marker: i32) -> BoundaryConditionSet {
    let mut bcs = BoundaryConditionSet::new();
    bcs.add_bc(name, marker, BcKind::Essential, BcComponents::Full, zero_function());
    bcs
}

pub fn toy_problem(p: &ToyParams) -> FsiProblem<ToyFluid, ToyStructure, ToyAle> {
    let nf = p.n_fluid;
    let ns = p.n_structure;
    FsiProblem {
        fluid: ToyFluid::new(nf, p.viscosity, p.kappa, p.forcing),
        structure: ToyStructure::new(ns, p.stiffness),
        ale: ToyAle::new(nf),
        fluid_dofs: labeled(line(0.0, nf), &[(0, WALL), (nf - 1, INTERFACE)]),
        structure_dofs: labeled(
            line((nf - 1) as f64, ns),
            &[(0, INTERFACE), (ns - 1, CLAMP)],
        ),
        bcs: FieldBoundaryConditions {
            fluid: clamp("wall", WALL),
            structure: clamp("clamp", CLAMP),
            ale: clamp("fixed mesh", WALL),
        },
    }
}

pub fn toy_config() -> FsiConfig {
    let mut cfg = FsiConfig::default();
    cfg.time.dt = 0.1;
    cfg.time.end_time = 0.3;
    cfg.time.bdf_order = 2;
    cfg.interface.dimension = DIM;
    cfg.interface.flag = INTERFACE;
    cfg.interface.tolerance = 1e-8;
    cfg.newton.abs_tol = 1e-10;
    cfg.newton.rel_tol = 1e-8;
    cfg.newton.eta_max = 1e-6;
    cfg.newton.max_iterations = 20;
    cfg.newton.line_search = LineSearch::None;
    cfg.linear_solver.kind = LinearSolverKind::Gmres { restart: 60 };
    cfg.linear_solver.max_iterations = 600;
    cfg.linear_solver.abs_tol = 1e-14;
    cfg.preconditioner = PreconditionerKind::BlockGaussSeidel;
    cfg
}
