//! Field solvers consumed by the FSI core.
//!
//! Each physics (fluid, structure, mesh motion) is an external solver that
//! owns its DOF map, assembles its operator and right-hand side, and applies
//! its boundary conditions. Vectors and operators use the field's global
//! numbering.

use sprs::CsMat;

use crate::data::bc::BoundaryConditionSet;
use crate::data::field_map::FieldMap;
use crate::fsi_error::FsiError;

pub trait FieldSolver {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    fn dof_map(&self) -> &FieldMap;

    /// (Re)assemble the operator on the current geometry.
    fn build_operator(&mut self) -> Result<(), FsiError>;

    /// Apply `bcs` at `time` to the assembled operator and right-hand side.
    fn apply_boundary_conditions(
        &mut self,
        bcs: &BoundaryConditionSet,
        time: f64,
    ) -> Result<(), FsiError>;

    fn operator(&self) -> &CsMat<f64>;

    fn rhs(&self) -> &[f64];
}

/// Incompressible flow on a moving mesh.
///
/// `operator()` is the velocity block `F`; the pressure coupling is exposed
/// separately.
pub trait FluidSolver: FieldSolver {
    fn pressure_map(&self) -> &FieldMap;

    /// `Bᵀ`: velocity rows, pressure columns.
    fn gradient(&self) -> &CsMat<f64>;

    /// `B`: pressure rows, velocity columns.
    fn divergence(&self) -> &CsMat<f64>;

    /// Leading BDF coefficient and time step of the velocity derivative.
    fn set_time_discretization(&mut self, alpha: f64, dt: f64);

    /// Deform the mesh by `displacement` (mesh-displacement numbering,
    /// relative to the reference configuration).
    fn move_mesh(&mut self, displacement: &[f64]) -> Result<(), FsiError>;

    /// Linearize the convective term around `convective_velocity` and set
    /// the right-hand side from the BDF history `rhs_velocity`.
    fn update_system(
        &mut self,
        convective_velocity: &[f64],
        rhs_velocity: &[f64],
    ) -> Result<(), FsiError>;
}

/// Linear elastodynamics. `operator()` is `coefficient · M + K` once
/// [`set_mass_coefficient`](StructureSolver::set_mass_coefficient) was called.
pub trait StructureSolver: FieldSolver {
    fn set_mass_coefficient(&mut self, coefficient: f64);

    /// Unscaled mass matrix.
    fn mass_matrix(&self) -> &CsMat<f64>;
}

/// Harmonic extension of the interface displacement into the fluid domain.
pub trait AleSolver: FieldSolver {}

pub(crate) fn field_error(field: &'static str, message: impl Into<String>) -> FsiError {
    FsiError::FieldSolver {
        field,
        message: message.into(),
    }
}
