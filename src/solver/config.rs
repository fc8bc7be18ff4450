//! Run configuration.
//!
//! Every section has defaults, so a partial document deserializes. Variant
//! choices (line search, Krylov method, preconditioner, structure time
//! scheme) are closed enums.

use serde::{Deserialize, Serialize};

use crate::fsi_error::FsiError;
use crate::linalg::krylov::LinearSolverKind;
use crate::precond::PreconditionerKind;
use crate::time_advance::TimeAdvanceKind;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    pub dt: f64,
    pub initial_time: f64,
    pub end_time: f64,
    /// Order of the fluid BDF scheme (1..=3).
    pub bdf_order: usize,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            dt: 1e-3,
            initial_time: 0.0,
            end_time: 1e-2,
            bdf_order: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceConfig {
    /// Boundary marker of the fluid-structure interface on both meshes.
    pub flag: i32,
    /// Matching distance between fluid and structure interface nodes.
    pub tolerance: f64,
    /// Spatial dimension, also the number of displacement components.
    pub dimension: usize,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            flag: 1,
            tolerance: 1e-8,
            dimension: 3,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSearch {
    #[default]
    None,
    Backtracking,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonConfig {
    pub abs_tol: f64,
    pub rel_tol: f64,
    /// Upper bound of the inexact-Newton forcing term.
    pub eta_max: f64,
    pub max_iterations: usize,
    pub line_search: LineSearch,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            abs_tol: 1e-4,
            rel_tol: 1e-4,
            eta_max: 1e-4,
            max_iterations: 10,
            line_search: LineSearch::None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearSolverConfig {
    pub kind: LinearSolverKind,
    pub max_iterations: usize,
    pub abs_tol: f64,
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        Self {
            kind: LinearSolverKind::default(),
            max_iterations: 500,
            abs_tol: 1e-14,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsiConfig {
    pub time: TimeConfig,
    pub interface: InterfaceConfig,
    pub newton: NewtonConfig,
    pub structure_time_advance: TimeAdvanceKind,
    pub linear_solver: LinearSolverConfig,
    pub preconditioner: PreconditionerKind,
}

fn invalid(msg: impl Into<String>) -> FsiError {
    FsiError::InvalidConfig(msg.into())
}

fn non_negative(name: &str, value: f64) -> Result<(), FsiError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be finite and non-negative, got {value}")))
    }
}

impl FsiConfig {
    pub fn validate(&self) -> Result<(), FsiError> {
        let t = &self.time;
        if !(t.dt > 0.0 && t.dt.is_finite()) {
            return Err(invalid(format!("time step must be positive, got {}", t.dt)));
        }
        if !(1..=3).contains(&t.bdf_order) {
            return Err(invalid(format!("BDF order {} not in 1..=3", t.bdf_order)));
        }
        if t.end_time < t.initial_time {
            return Err(invalid(format!(
                "end time {} precedes initial time {}",
                t.end_time, t.initial_time
            )));
        }
        if !(1..=3).contains(&self.interface.dimension) {
            return Err(invalid(format!(
                "dimension {} not in 1..=3",
                self.interface.dimension
            )));
        }
        non_negative("interface tolerance", self.interface.tolerance)?;
        let n = &self.newton;
        non_negative("newton abs_tol", n.abs_tol)?;
        non_negative("newton rel_tol", n.rel_tol)?;
        non_negative("newton eta_max", n.eta_max)?;
        if n.eta_max >= 1.0 {
            return Err(invalid(format!("eta_max must be below 1, got {}", n.eta_max)));
        }
        non_negative("linear solver abs_tol", self.linear_solver.abs_tol)?;
        if self.linear_solver.max_iterations == 0 {
            return Err(invalid("linear solver needs at least one iteration"));
        }
        if let LinearSolverKind::Gmres { restart: 0 } = self.linear_solver.kind {
            return Err(invalid("GMRES restart length must be positive"));
        }
        match self.structure_time_advance {
            TimeAdvanceKind::Newmark { gamma, beta } => {
                if !(gamma > 0.0 && beta > 0.0) {
                    return Err(invalid(format!(
                        "Newmark parameters must be positive, got gamma {gamma}, beta {beta}"
                    )));
                }
            }
            TimeAdvanceKind::Bdf { order } => {
                if !(1..=3).contains(&order) {
                    return Err(invalid(format!("structure BDF order {order} not in 1..=3")));
                }
            }
        }
        Ok(())
    }

    /// Number of steps the time loop takes from `initial_time` to `end_time`.
    pub fn num_steps(&self) -> usize {
        self.steps_remaining(self.time.initial_time)
    }

    /// Steps left from `time` to `end_time`, rounding to the nearest step.
    pub fn steps_remaining(&self, time: f64) -> usize {
        let t = &self.time;
        ((t.end_time - time) / t.dt + 0.5).floor().max(0.0) as usize
    }
}
