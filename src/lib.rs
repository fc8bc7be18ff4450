#![cfg_attr(docsrs, feature(doc_cfg))]
//! # fsi-blocks
//!
//! fsi-blocks is a monolithic solver for fluid–structure interaction on
//! moving meshes. Fluid, structure and mesh-motion (ALE) problems are coupled
//! through interface Lagrange multipliers into one block system, solved by an
//! inexact Newton method with block-preconditioned Krylov iterations.
//!
//! ## Features
//! - Geometric matching of non-conforming fluid and structure interface DOFs
//! - Globally consistent multiplier numbering through rank prefix sums
//! - Sparse coupling blocks and a 5×5 monolithic block operator (`sprs`)
//! - BDF and Newmark time advance for the field histories
//! - Block Jacobi / Gauss–Seidel preconditioning with Schur approximations
//! - Pluggable communication backends (serial, threads, MPI)
//!
//! ## Block order
//!
//! The monolithic unknown is always ordered as fluid velocity, fluid
//! pressure, structure displacement, interface multiplier, mesh
//! displacement; see [`data::block_map::Block`].
//!
//! ## Usage
//! Implement [`field::FluidSolver`], [`field::StructureSolver`] and
//! [`field::AleSolver`] for your discretizations, collect them in a
//! [`solver::FsiProblem`] and call [`solver::FsiSolver::setup`], then
//! [`solver::FsiSolver::run`].
//!
//! ```toml
//! [dependencies]
//! fsi-blocks = "0.3"
//! # features = ["mpi-support"]
//! ```

pub mod algs;
pub mod assembly;
pub mod coupling;
pub mod data;
pub mod debug_invariants;
pub mod field;
pub mod fsi_error;
pub mod interface;
pub mod linalg;
pub mod precond;
pub mod solver;
pub mod time_advance;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, LocalComm, NoComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::assembly::{BlockOperator, FluidBlocks};
    pub use crate::coupling::{CouplingBlocks, Transmission};
    pub use crate::data::bc::{BcComponents, BcKind, BoundaryConditionSet};
    pub use crate::data::block_map::{Block, BlockLayout, MonolithicMap};
    pub use crate::data::block_vector::BlockVector;
    pub use crate::data::coordinates::Coordinates;
    pub use crate::data::dof_set::DofSet;
    pub use crate::data::field_map::FieldMap;
    pub use crate::data::labels::LabelSet;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::field::{AleSolver, FieldSolver, FluidSolver, StructureSolver};
    pub use crate::fsi_error::FsiError;
    pub use crate::interface::{
        InterfaceDofMaps, InterfaceLocalMap, InterfaceMatcher, InterfaceNumbering,
    };
    pub use crate::linalg::{KrylovSolver, LinearOperator, LinearSolverKind, Preconditioner};
    pub use crate::precond::{BlockPreconditioner, PreconditionerKind};
    pub use crate::solver::{
        Exporter, FieldBoundaryConditions, FsiConfig, FsiProblem, FsiSetup, FsiSolver,
        MemoryExporter, NewtonStatus, StepReport,
    };
    pub use crate::time_advance::{Bdf, Newmark, TimeAdvance, TimeAdvanceKind};
}
