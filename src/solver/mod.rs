//! Monolithic FSI solver: configuration, state, setup stages, Newton driver
//! and export.

pub mod config;
pub mod exporter;
pub mod fsi;
pub mod newton;
pub mod setup;
pub mod state;

pub use config::{FsiConfig, LineSearch, NewtonConfig};
pub use exporter::{Exporter, MemoryExporter};
pub use fsi::{FsiSolver, StepReport};
pub use newton::{LinearStep, NewtonReport, NewtonStatus, NonlinearProblem};
pub use setup::{FsiProblem, FsiSetup, GeometryOperator, InterfaceSetup, StructureOperator};
pub use state::{FieldBoundaryConditions, FsiState};
