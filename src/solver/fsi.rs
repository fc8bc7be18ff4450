//! Monolithic FSI solver: residual evaluation, Newton-Krylov step and time loop.
//!
//! Per time step: freeze the history terms ([`FsiSolver::update_system`]),
//! impose essential conditions on the trial solution, run Newton, then shift
//! the histories with the accepted solution. Every residual evaluation moves
//! the fluid mesh to the trial mesh displacement and re-assembles the fluid
//! blocks; the structure, geometry and coupling blocks are fixed.

use std::time::Instant;

use crate::algs::communicator::Communicator;
use crate::assembly::{BlockOperator, FluidBlocks};
use crate::data::bc::BoundaryConditionSet;
use crate::data::block_map::{Block, MonolithicMap};
use crate::data::block_vector::BlockVector;
use crate::fsi_error::FsiError;
use crate::field::{AleSolver, FluidSolver, StructureSolver, field_error};
use crate::linalg::krylov::KrylovSolver;
use crate::linalg::operator::LinearOperator;
use crate::precond::BlockPreconditioner;
use crate::solver::config::FsiConfig;
use crate::solver::exporter::Exporter;
use crate::solver::newton::{self, LinearStep, NewtonReport, NewtonStatus, NonlinearProblem};
use crate::solver::setup::{FsiProblem, FsiSetup};
use crate::solver::state::{FsiState, StepData};

pub const FLUID_VELOCITY_FIELD: &str = "fluid velocity";
pub const FLUID_PRESSURE_FIELD: &str = "fluid pressure";
pub const FLUID_DISPLACEMENT_FIELD: &str = "fluid displacement";
pub const STRUCTURE_DISPLACEMENT_FIELD: &str = "structure displacement";

/// Result of one time step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    pub time: f64,
    pub status: NewtonStatus,
    pub newton_iterations: usize,
    pub linear_iterations: usize,
    pub residual_history: Vec<f64>,
    /// Wall time in seconds.
    pub elapsed: f64,
}

impl StepReport {
    pub fn converged(&self) -> bool {
        self.status == NewtonStatus::Converged
    }
}

pub struct FsiSolver<F, S, A> {
    config: FsiConfig,
    fluid: F,
    structure: S,
    ale: A,
    setup: FsiSetup,
    precond: BlockPreconditioner,
    krylov: KrylovSolver,
    state: FsiState,
    operator: Option<BlockOperator>,
    rank: usize,
}

fn zero_essential(
    v: BlockVector,
    block: Block,
    bcs: &BoundaryConditionSet,
    time: f64,
) -> Result<BlockVector, FsiError> {
    let mut values = v.block(block).to_vec();
    bcs.apply_to_vector(&mut values, time, 0.0)?;
    v.with_block(block, &values)
}

fn impose_essential(
    v: BlockVector,
    block: Block,
    bcs: &BoundaryConditionSet,
    time: f64,
) -> Result<BlockVector, FsiError> {
    let mut values = v.block(block).to_vec();
    bcs.impose_essential(&mut values, time)?;
    v.with_block(block, &values)
}

impl<F, S, A> FsiSolver<F, S, A>
where
    F: FluidSolver,
    S: StructureSolver,
    A: AleSolver,
{
    /// Run the whole setup phase. Collective over `comm`.
    pub fn setup<C>(config: FsiConfig, comm: &C, mut problem: FsiProblem<F, S, A>) -> Result<Self, FsiError>
    where
        C: Communicator + ?Sized,
    {
        let setup = FsiSetup::build(&config, comm, &mut problem)?;
        Self::from_setup(config, problem, setup, comm.rank())
    }

    /// Assemble a solver from an already built setup.
    ///
    /// The boundary conditions in `problem` must have been updated (as
    /// [`FsiSetup::build`] does).
    pub fn from_setup(
        config: FsiConfig,
        problem: FsiProblem<F, S, A>,
        setup: FsiSetup,
        rank: usize,
    ) -> Result<Self, FsiError> {
        config.validate()?;
        let FsiProblem {
            mut fluid,
            structure,
            ale,
            bcs,
            ..
        } = problem;
        let layout = *setup.map().layout();
        let state = FsiState::new(&config, layout, bcs)?;

        fluid.set_time_discretization(state.fluid_history.alpha(), config.time.dt);
        let start = Instant::now();
        let precond = BlockPreconditioner::new(
            config.preconditioner,
            layout,
            setup.structure().matrix(),
            setup.geometry().matrix(),
            setup.coupling().clone(),
        )?;
        if rank == 0 {
            log::info!(
                "{:?} preconditioner: static blocks ready in {:?}",
                config.preconditioner,
                start.elapsed()
            );
            log::info!(
                "monolithic system: {} unknowns {:?}",
                layout.total(),
                layout.sizes()
            );
        }
        let krylov = KrylovSolver::new(
            config.linear_solver.kind,
            config.linear_solver.max_iterations,
            config.linear_solver.abs_tol,
        );

        Ok(Self {
            config,
            fluid,
            structure,
            ale,
            setup,
            precond,
            krylov,
            state,
            operator: None,
            rank,
        })
    }

    /// Replace the zero initial condition.
    pub fn set_initial_solution(&mut self, solution: BlockVector) -> Result<(), FsiError> {
        self.state = self.state.clone().with_initial_solution(solution)?;
        Ok(())
    }

    pub fn config(&self) -> &FsiConfig {
        &self.config
    }

    pub fn state(&self) -> &FsiState {
        &self.state
    }

    pub fn setup_data(&self) -> &FsiSetup {
        &self.setup
    }

    pub fn monolithic_map(&self) -> &MonolithicMap {
        self.setup.map()
    }

    pub fn fluid(&self) -> &F {
        &self.fluid
    }

    pub fn structure(&self) -> &S {
        &self.structure
    }

    pub fn ale(&self) -> &A {
        &self.ale
    }

    /// Operator assembled by the last residual evaluation.
    pub fn operator(&self) -> Option<&BlockOperator> {
        self.operator.as_ref()
    }

    fn leader(&self) -> bool {
        self.rank == 0
    }

    /// Freeze the history terms of the step ending at the current time.
    pub fn update_system(&mut self) -> Result<(), FsiError> {
        let state = &self.state;
        let time = state.time;
        let bdf_order = self.config.time.bdf_order;

        let u_star = state.fluid_history.extrapolate(bdf_order);
        let rhs_velocity = state.fluid_history.rhs_contribution();
        let w_star = state.mesh_history.extrapolate_first_derivative();
        if u_star.len() != w_star.len() {
            return Err(FsiError::LengthMismatch {
                what: "mesh velocity",
                expected: u_star.len(),
                found: w_star.len(),
            });
        }
        let convective_velocity = u_star.iter().zip(&w_star).map(|(u, w)| u - w).collect();

        let h2 = state.structure_history.rhs_second_derivative()?;
        let mut structure_rhs = self.setup.structure().mass().apply(&h2);
        state
            .bcs
            .structure
            .apply_to_vector(&mut structure_rhs, time, 1.0)?;

        let h1 = state.structure_history.rhs_first_derivative();
        let coupling_rhs = self.setup.coupling().transmission().structure_to_interface(&h1)?;

        let mut mesh_rhs = vec![0.0; self.setup.map().layout().size(Block::MeshDisplacement)];
        state.bcs.ale.apply_to_vector(&mut mesh_rhs, time, 1.0)?;
        for dof in self.setup.interface().numbering().fluid_dofs() {
            mesh_rhs[dof] = 0.0;
        }

        self.state.step = Some(StepData {
            convective_velocity,
            rhs_velocity,
            structure_rhs,
            coupling_rhs,
            mesh_rhs,
        });
        Ok(())
    }

    /// Overwrite the essential entries of every field block at the current time.
    pub fn apply_bc_solution(&self, solution: BlockVector) -> Result<BlockVector, FsiError> {
        let (bcs, time) = (&self.state.bcs, self.state.time);
        let x = impose_essential(solution, Block::FluidVelocity, &bcs.fluid, time)?;
        let x = impose_essential(x, Block::StructureDisplacement, &bcs.structure, time)?;
        impose_essential(x, Block::MeshDisplacement, &bcs.ale, time)
    }

    fn apply_bc_residual(&self, residual: BlockVector) -> Result<BlockVector, FsiError> {
        let (bcs, time) = (&self.state.bcs, self.state.time);
        let r = zero_essential(residual, Block::FluidVelocity, &bcs.fluid, time)?;
        let r = zero_essential(r, Block::StructureDisplacement, &bcs.structure, time)?;
        zero_essential(r, Block::MeshDisplacement, &bcs.ale, time)
    }

    /// Solve one time step. The state is shifted only when Newton converges.
    pub fn advance(&mut self) -> Result<StepReport, FsiError> {
        let start = Instant::now();
        let previous_time = self.state.time;
        self.state.time = previous_time + self.config.time.dt;
        let time = self.state.time;
        if self.leader() {
            log::info!("FSI: solving for time {time}");
        }

        let report = match self.solve_step() {
            Ok(report) => report,
            Err(e) => {
                self.state.time = previous_time;
                self.state.step = None;
                return Err(e);
            }
        };
        if !report.converged() {
            self.state.time = previous_time;
            self.state.step = None;
        }
        let step = StepReport {
            time,
            status: report.status,
            newton_iterations: report.iterations,
            linear_iterations: report.linear_iterations,
            residual_history: report.residual_history,
            elapsed: start.elapsed().as_secs_f64(),
        };
        if self.leader() {
            log::info!(
                "FSI: time {time} {:?} after {} Newton iterations in {:.3}s",
                step.status,
                step.newton_iterations,
                step.elapsed
            );
        }
        Ok(step)
    }

    /// Freeze the history terms, run Newton and accept a converged solution.
    fn solve_step(&mut self) -> Result<NewtonReport, FsiError> {
        self.update_system()?;
        let initial = self.apply_bc_solution(self.state.solution.clone())?;
        let newton_params = self.config.newton.clone();
        let report = newton::solve(self, initial, &newton_params)?;
        if report.converged() {
            self.state.accept(report.solution.clone())?;
        }
        Ok(report)
    }

    fn export(&self, exporter: &mut dyn Exporter) -> Result<(), FsiError> {
        let s = &self.state.solution;
        exporter.post_process(
            self.state.time,
            &[
                (FLUID_VELOCITY_FIELD, s.block(Block::FluidVelocity)),
                (FLUID_PRESSURE_FIELD, s.block(Block::FluidPressure)),
                (FLUID_DISPLACEMENT_FIELD, s.block(Block::MeshDisplacement)),
                (STRUCTURE_DISPLACEMENT_FIELD, s.block(Block::StructureDisplacement)),
            ],
        )
    }

    /// Time loop up to `end_time`. Exports the initial state and every
    /// accepted step, stops at the first step that fails.
    pub fn run(&mut self, exporter: &mut dyn Exporter) -> Result<Vec<StepReport>, FsiError> {
        let map = self.setup.map();
        exporter.add_field(FLUID_VELOCITY_FIELD, map.field_map(Block::FluidVelocity))?;
        exporter.add_field(FLUID_PRESSURE_FIELD, map.field_map(Block::FluidPressure))?;
        exporter.add_field(FLUID_DISPLACEMENT_FIELD, map.field_map(Block::MeshDisplacement))?;
        exporter.add_field(
            STRUCTURE_DISPLACEMENT_FIELD,
            map.field_map(Block::StructureDisplacement),
        )?;
        self.export(exporter)?;

        let dt = self.config.time.dt;
        let mut reports = Vec::new();
        for _ in 0..self.config.steps_remaining(self.state.time) {
            let report = self.advance()?;
            let converged = report.converged();
            reports.push(report);
            if !converged {
                if self.leader() {
                    log::warn!("FSI: stopping the time loop at t = {}", self.state.time + dt);
                }
                break;
            }
            self.export(exporter)?;
        }
        exporter.close()?;
        Ok(reports)
    }
}

impl<F, S, A> NonlinearProblem for FsiSolver<F, S, A>
where
    F: FluidSolver,
    S: StructureSolver,
    A: AleSolver,
{
    fn evaluate_residual(&mut self, solution: &BlockVector) -> Result<BlockVector, FsiError> {
        let layout = *self.setup.map().layout();
        let time = self.state.time;
        let step = self.state.step.as_ref().ok_or_else(|| {
            field_error(self.fluid.name(), "residual evaluated before update_system")
        })?;

        self.fluid.move_mesh(solution.block(Block::MeshDisplacement))?;
        self.fluid.build_operator()?;
        self.fluid
            .update_system(&step.convective_velocity, &step.rhs_velocity)?;
        self.fluid
            .apply_boundary_conditions(&self.state.bcs.fluid, time)?;

        let op = BlockOperator::fsi(
            layout,
            FluidBlocks {
                momentum: self.fluid.operator(),
                gradient: self.fluid.gradient(),
                divergence: self.fluid.divergence(),
            },
            self.setup.structure().matrix(),
            self.setup.geometry().matrix(),
            self.setup.coupling(),
        )?;
        let pressure_rhs = vec![0.0; layout.size(Block::FluidPressure)];
        let rhs = BlockVector::from_blocks(
            layout,
            [
                self.fluid.rhs(),
                &pressure_rhs,
                &step.structure_rhs,
                &step.coupling_rhs,
                &step.mesh_rhs,
            ],
        )?;
        let residual = op.residual(solution, &rhs)?;
        self.operator = Some(op);
        self.apply_bc_residual(residual)
    }

    fn solve_linear_step(
        &mut self,
        residual: &BlockVector,
        rel_tol: f64,
    ) -> Result<LinearStep, FsiError> {
        let op = self.operator.as_ref().ok_or_else(|| {
            field_error(self.fluid.name(), "linear step requested before residual evaluation")
        })?;
        self.precond.check_operator(op)?;

        let start = Instant::now();
        self.precond.update_fluid(FluidBlocks {
            momentum: self.fluid.operator(),
            gradient: self.fluid.gradient(),
            divergence: self.fluid.divergence(),
        })?;
        if self.rank == 0 {
            log::info!("fluid momentum and Schur complements approximated in {:?}", start.elapsed());
        }

        let ready = self.precond.ready()?;
        let (increment, stats) = self.krylov.solve(op, residual.as_slice(), &ready, rel_tol);
        if !stats.converged {
            return Ok(LinearStep::NotConverged(stats));
        }
        Ok(LinearStep::Increment(
            BlockVector::from_vec(*op.layout(), increment)?,
            stats,
        ))
    }

    fn is_leader(&self) -> bool {
        self.rank == 0
    }
}
