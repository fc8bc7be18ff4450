//! Setup phase of the monolithic solver.
//!
//! Each stage returns a typed handle that the next stage requires, so the
//! order interface → structure operator → geometry operator → coupling →
//! monolithic setup is enforced by the signatures:
//!
//! ```text
//!   InterfaceSetup::build ─┬─> GeometryOperator::assemble ─┐
//!                          └─> CouplingBlocks (in FsiSetup::assemble)
//!   StructureOperator::assemble ───────────────────────────┴─> FsiSetup
//! ```

use std::sync::Arc;
use std::time::Instant;

use sprs::CsMat;

use crate::algs::communicator::Communicator;
use crate::coupling::{CouplingBlocks, with_identity_rows};
use crate::data::bc::BoundaryConditionSet;
use crate::data::block_map::{Block, MonolithicMap};
use crate::data::dof_set::DofSet;
use crate::debug_invariants::{DebugInvariants, validate_all};
use crate::field::{AleSolver, FluidSolver, StructureSolver, field_error};
use crate::fsi_error::FsiError;
use crate::interface::{InterfaceDofMaps, InterfaceLocalMap, InterfaceMatcher, InterfaceNumbering};
use crate::solver::config::{FsiConfig, InterfaceConfig};
use crate::solver::state::FieldBoundaryConditions;
use crate::time_advance::TimeAdvance;

/// Everything the caller supplies: field solvers, their DOF sets and the
/// boundary conditions. Mesh motion lives on the fluid DOFs.
pub struct FsiProblem<F, S, A> {
    pub fluid: F,
    pub structure: S,
    pub ale: A,
    pub fluid_dofs: DofSet,
    pub structure_dofs: DofSet,
    pub bcs: FieldBoundaryConditions,
}

/// Matched interface, its DOF lists and the global multiplier numbering.
#[derive(Clone, Debug)]
pub struct InterfaceSetup {
    local_map: InterfaceLocalMap,
    dof_maps: InterfaceDofMaps,
    numbering: InterfaceNumbering,
}

impl InterfaceSetup {
    /// Collective over `comm`.
    pub fn build<C>(
        config: &InterfaceConfig,
        fluid: &DofSet,
        structure: &DofSet,
        comm: &C,
    ) -> Result<Self, FsiError>
    where
        C: Communicator + ?Sized,
    {
        for dofs in [fluid, structure] {
            if dofs.components() != config.dimension {
                return Err(FsiError::DimensionMismatch {
                    expected: config.dimension,
                    found: dofs.components(),
                });
            }
        }
        let local_map =
            InterfaceMatcher::new(config.flag, config.tolerance)?.match_dofs(fluid, structure)?;
        let dof_maps = InterfaceDofMaps::build(&local_map, comm)?;
        let numbering = InterfaceNumbering::build(&local_map, &dof_maps, comm)?;
        validate_all(&[&local_map, &numbering])?;
        Ok(Self {
            local_map,
            dof_maps,
            numbering,
        })
    }

    pub fn local_map(&self) -> &InterfaceLocalMap {
        &self.local_map
    }

    pub fn dof_maps(&self) -> &InterfaceDofMaps {
        &self.dof_maps
    }

    pub fn numbering(&self) -> &InterfaceNumbering {
        &self.numbering
    }
}

/// `(c₂/dt²) M + K` with boundary conditions, and the unscaled mass matrix.
#[derive(Clone, Debug)]
pub struct StructureOperator {
    matrix: CsMat<f64>,
    mass: CsMat<f64>,
}

impl StructureOperator {
    pub fn assemble<S: StructureSolver>(
        solver: &mut S,
        scheme: &TimeAdvance,
        bcs: &BoundaryConditionSet,
        time: f64,
    ) -> Result<Self, FsiError> {
        let dt = scheme.dt();
        solver.set_mass_coefficient(scheme.second_derivative_coefficient()? / (dt * dt));
        solver.build_operator()?;
        solver.apply_boundary_conditions(bcs, time)?;
        let matrix = solver.operator().clone();
        let mass = solver.mass_matrix().clone();
        if matrix.shape() != mass.shape() {
            return Err(field_error(
                solver.name(),
                format!("operator {:?} and mass {:?} differ in shape", matrix.shape(), mass.shape()),
            ));
        }
        Ok(Self { matrix, mass })
    }

    pub fn matrix(&self) -> &CsMat<f64> {
        &self.matrix
    }

    pub fn mass(&self) -> &CsMat<f64> {
        &self.mass
    }
}

/// Mesh-motion operator with identity rows on the fluid interface DOFs.
#[derive(Clone, Debug)]
pub struct GeometryOperator {
    matrix: CsMat<f64>,
}

impl GeometryOperator {
    pub fn assemble<A: AleSolver>(
        solver: &mut A,
        bcs: &BoundaryConditionSet,
        time: f64,
        interface: &InterfaceSetup,
    ) -> Result<Self, FsiError> {
        solver.build_operator()?;
        solver.apply_boundary_conditions(bcs, time)?;
        let matrix = with_identity_rows(solver.operator(), &interface.numbering().fluid_dofs())?;
        Ok(Self { matrix })
    }

    pub fn matrix(&self) -> &CsMat<f64> {
        &self.matrix
    }
}

/// Static part of the monolithic problem, fixed for the whole run.
#[derive(Clone, Debug)]
pub struct FsiSetup {
    map: MonolithicMap,
    interface: InterfaceSetup,
    structure: StructureOperator,
    geometry: GeometryOperator,
    coupling: Arc<CouplingBlocks>,
}

impl FsiSetup {
    /// Run every setup stage. Collective over `comm`.
    pub fn build<C, F, S, A>(
        config: &FsiConfig,
        comm: &C,
        problem: &mut FsiProblem<F, S, A>,
    ) -> Result<Self, FsiError>
    where
        C: Communicator + ?Sized,
        F: FluidSolver,
        S: StructureSolver,
        A: AleSolver,
    {
        config.validate()?;
        let leader = comm.rank() == 0;
        let t0 = config.time.initial_time;
        let bcs = &mut problem.bcs;
        bcs.fluid.update(&problem.fluid_dofs)?;
        bcs.structure.update(&problem.structure_dofs)?;
        bcs.ale.update(&problem.fluid_dofs)?;

        let start = Instant::now();
        let interface = InterfaceSetup::build(
            &config.interface,
            &problem.fluid_dofs,
            &problem.structure_dofs,
            comm,
        )?;
        if leader {
            log::info!(
                "interface: {} local pairs, max distance {:e}, built in {:?}",
                interface.local_map().len(),
                interface.local_map().max_distance(),
                start.elapsed()
            );
        }

        let scheme = TimeAdvance::second_order(config.structure_time_advance, config.time.dt)?;
        let start = Instant::now();
        let structure =
            StructureOperator::assemble(&mut problem.structure, &scheme, &problem.bcs.structure, t0)?;
        let geometry =
            GeometryOperator::assemble(&mut problem.ale, &problem.bcs.ale, t0, &interface)?;
        if leader {
            log::info!("structure and geometry operators assembled in {:?}", start.elapsed());
        }

        let map = MonolithicMap::new(
            problem.fluid.dof_map().clone(),
            problem.fluid.pressure_map().clone(),
            problem.structure.dof_map().clone(),
            interface.numbering().multiplier_map().clone(),
            problem.ale.dof_map().clone(),
        );
        let velocity_scale = scheme.first_derivative_coefficient() / config.time.dt;
        Self::assemble(map, interface, structure, geometry, velocity_scale)
    }

    /// Build the coupling blocks and bundle the stages.
    pub fn assemble(
        map: MonolithicMap,
        interface: InterfaceSetup,
        structure: StructureOperator,
        geometry: GeometryOperator,
        velocity_scale: f64,
    ) -> Result<Self, FsiError> {
        map.validate_invariants()?;
        let coupling = CouplingBlocks::build(
            interface.local_map(),
            interface.numbering(),
            map.layout(),
            velocity_scale,
        )?;
        let setup = Self {
            map,
            interface,
            structure,
            geometry,
            coupling: Arc::new(coupling),
        };
        setup.check_shapes()?;
        Ok(setup)
    }

    /// Replace the coupling blocks, e.g. with [`CouplingBlocks::decoupled`].
    pub fn with_coupling(mut self, coupling: CouplingBlocks) -> Result<Self, FsiError> {
        self.coupling = Arc::new(coupling);
        self.check_shapes()?;
        Ok(self)
    }

    fn check_shapes(&self) -> Result<(), FsiError> {
        let layout = self.map.layout();
        let c = &self.coupling;
        let expected = [
            (Block::StructureDisplacement, Block::StructureDisplacement, self.structure.matrix()),
            (Block::MeshDisplacement, Block::MeshDisplacement, self.geometry.matrix()),
            (Block::FluidVelocity, Block::Multiplier, c.lambda_to_fluid_momentum()),
            (Block::StructureDisplacement, Block::Multiplier, c.lambda_to_structure_momentum()),
            (Block::Multiplier, Block::StructureDisplacement, c.structure_displacement_to_lambda()),
            (Block::Multiplier, Block::FluidVelocity, c.fluid_velocity_to_lambda()),
            (Block::MeshDisplacement, Block::StructureDisplacement, c.structure_displacement_to_mesh()),
        ];
        for (row, col, m) in expected {
            let shape = (layout.size(row), layout.size(col));
            if m.shape() != shape {
                return Err(FsiError::BlockShapeMismatch {
                    row: row.index(),
                    col: col.index(),
                    expected: shape,
                    found: m.shape(),
                });
            }
        }
        Ok(())
    }

    pub fn map(&self) -> &MonolithicMap {
        &self.map
    }

    pub fn interface(&self) -> &InterfaceSetup {
        &self.interface
    }

    pub fn structure(&self) -> &StructureOperator {
        &self.structure
    }

    pub fn geometry(&self) -> &GeometryOperator {
        &self.geometry
    }

    pub fn coupling(&self) -> &Arc<CouplingBlocks> {
        &self.coupling
    }
}
