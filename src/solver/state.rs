//! Mutable state of a running FSI simulation.

use crate::data::bc::BoundaryConditionSet;
use crate::data::block_map::{Block, BlockLayout};
use crate::data::block_vector::BlockVector;
use crate::fsi_error::FsiError;
use crate::solver::config::FsiConfig;
use crate::time_advance::{Bdf, TimeAdvance};

/// Boundary conditions of the three fields.
#[derive(Clone, Debug, Default)]
pub struct FieldBoundaryConditions {
    pub fluid: BoundaryConditionSet,
    pub structure: BoundaryConditionSet,
    /// Conditions of the mesh motion, on the fluid DOFs.
    pub ale: BoundaryConditionSet,
}

/// Quantities frozen for the duration of one time step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepData {
    /// `β* = u* − w*`.
    pub convective_velocity: Vec<f64>,
    /// BDF history term of the fluid velocity.
    pub rhs_velocity: Vec<f64>,
    /// `M h₂` with structure boundary conditions.
    pub structure_rhs: Vec<f64>,
    /// `h₁` restricted to the interface.
    pub coupling_rhs: Vec<f64>,
    /// Boundary values of the mesh motion, zero on the interface.
    pub mesh_rhs: Vec<f64>,
}

/// Solution, histories and boundary conditions owned by the solver.
#[derive(Clone, Debug)]
pub struct FsiState {
    pub(crate) solution: BlockVector,
    pub(crate) fluid_history: Bdf,
    pub(crate) structure_history: TimeAdvance,
    pub(crate) mesh_history: TimeAdvance,
    pub(crate) bcs: FieldBoundaryConditions,
    pub(crate) time: f64,
    pub(crate) step: Option<StepData>,
}

impl FsiState {
    /// Zero initial condition at `config.time.initial_time`.
    pub fn new(
        config: &FsiConfig,
        layout: BlockLayout,
        bcs: FieldBoundaryConditions,
    ) -> Result<Self, FsiError> {
        let dt = config.time.dt;
        let mut state = Self {
            solution: BlockVector::zeros(layout),
            fluid_history: Bdf::new(config.time.bdf_order, dt)?,
            structure_history: TimeAdvance::second_order(config.structure_time_advance, dt)?,
            mesh_history: TimeAdvance::first_order(config.structure_time_advance, dt)?,
            bcs,
            time: config.time.initial_time,
            step: None,
        };
        state.seed_histories();
        Ok(state)
    }

    /// Replace the initial condition; histories restart from it.
    pub fn with_initial_solution(mut self, solution: BlockVector) -> Result<Self, FsiError> {
        if solution.layout() != self.solution.layout() {
            return Err(FsiError::LengthMismatch {
                what: "initial solution",
                expected: self.solution.len(),
                found: solution.len(),
            });
        }
        self.solution = solution;
        self.seed_histories();
        Ok(self)
    }

    fn seed_histories(&mut self) {
        let s = &self.solution;
        self.fluid_history
            .initialize(s.block(Block::FluidVelocity).to_vec());
        self.structure_history
            .initialize(s.block(Block::StructureDisplacement).to_vec());
        self.mesh_history
            .initialize(s.block(Block::MeshDisplacement).to_vec());
    }

    pub fn solution(&self) -> &BlockVector {
        &self.solution
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn fluid_history(&self) -> &Bdf {
        &self.fluid_history
    }

    pub fn structure_history(&self) -> &TimeAdvance {
        &self.structure_history
    }

    pub fn mesh_history(&self) -> &TimeAdvance {
        &self.mesh_history
    }

    pub fn boundary_conditions(&self) -> &FieldBoundaryConditions {
        &self.bcs
    }

    pub fn step_data(&self) -> Option<&StepData> {
        self.step.as_ref()
    }

    /// Shift every history with the accepted `solution`.
    pub(crate) fn accept(&mut self, solution: BlockVector) -> Result<(), FsiError> {
        self.fluid_history
            .shift(solution.block(Block::FluidVelocity).to_vec())?;
        self.structure_history
            .shift(solution.block(Block::StructureDisplacement).to_vec())?;
        self.mesh_history
            .shift(solution.block(Block::MeshDisplacement).to_vec())?;
        self.solution = solution;
        self.step = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histories_follow_the_solution() {
        let cfg = FsiConfig::default();
        let layout = BlockLayout::new([2, 1, 2, 1, 2]);
        let state = FsiState::new(&cfg, layout, FieldBoundaryConditions::default()).unwrap();
        assert_eq!(state.fluid_history().current(), &[0.0, 0.0]);
        assert_eq!(state.time(), 0.0);

        let data: Vec<f64> = (0..8).map(f64::from).collect();
        let initial = BlockVector::from_vec(layout, data).unwrap();
        let mut state = state.with_initial_solution(initial).unwrap();
        assert_eq!(state.structure_history().current(), &[3.0, 4.0]);
        assert_eq!(state.mesh_history().current(), &[6.0, 7.0]);

        let next = BlockVector::from_vec(layout, vec![1.0; 8]).unwrap();
        state.accept(next).unwrap();
        assert_eq!(state.fluid_history().current(), &[1.0, 1.0]);
        assert_eq!(state.solution().as_slice(), &[1.0; 8]);
    }

    #[test]
    fn rejects_foreign_layout() {
        let cfg = FsiConfig::default();
        let state = FsiState::new(
            &cfg,
            BlockLayout::new([1, 1, 1, 1, 1]),
            FieldBoundaryConditions::default(),
        )
        .unwrap();
        let other = BlockVector::zeros(BlockLayout::new([2, 1, 1, 1, 1]));
        assert!(state.with_initial_solution(other).is_err());
    }
}
