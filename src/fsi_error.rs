//! FsiError: Unified error type for fsi-blocks public APIs
//!
//! Construction-time and topology failures are reported through this type.
//! Numerical non-convergence is *not* an error; it is surfaced as a status
//! by the linear and nonlinear drivers.

use thiserror::Error;

/// Unified error type for fsi-blocks operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FsiError {
    /// No structure interface node lies within the matching tolerance of a fluid node.
    #[error(
        "Interface error: no structure partner for fluid dof {fluid_dof} within tolerance {tolerance:e} (nearest at {nearest:?})"
    )]
    InterfacePartnerNotFound {
        fluid_dof: usize,
        nearest: Option<f64>,
        tolerance: f64,
    },
    /// Two fluid nodes were paired with the same structure node.
    #[error(
        "Interface error: structure dof {structure_dof} matched by fluid dofs {first} and {second}"
    )]
    InterfaceNotInjective {
        structure_dof: usize,
        first: usize,
        second: usize,
    },
    /// Internal invariant of the global interface numbering was violated.
    #[error(
        "Numbering error on rank {rank}: local index {local_index} got id {actual}, expected {expected}"
    )]
    NumberingInconsistent {
        rank: usize,
        local_index: usize,
        expected: usize,
        actual: usize,
    },
    /// Communication failure with a peer.
    #[error("Communication error with rank {peer}: {message}")]
    CommError { peer: usize, message: String },
    /// Received buffer did not have the expected size.
    #[error("Buffer size mismatch from rank {peer}: expected {expected} bytes, got {got}")]
    BufferSizeMismatch {
        peer: usize,
        expected: usize,
        got: usize,
    },
    /// A sparse block does not fit the slot of the block operator.
    #[error("Block ({row}, {col}) has shape {found:?}, expected {expected:?}")]
    BlockShapeMismatch {
        row: usize,
        col: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// Two index spaces that must coincide differ.
    #[error("Map mismatch for {what}: expected {expected}, found {found}")]
    MapMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// A vector has the wrong length for the map it is used with.
    #[error("Length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Coordinates of a DOF set do not match the configured spatial dimension.
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    /// A node id was referenced that is not part of the DOF set.
    #[error("Unknown node {0}")]
    UnknownNode(usize),
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Invalid time-advance request (order, history length, step size).
    #[error("Invalid time advance: {0}")]
    InvalidTimeAdvance(String),
    /// Boundary condition could not be applied.
    #[error("Boundary condition '{name}': {message}")]
    BoundaryCondition { name: String, message: String },
    /// An external field solver reported a failure.
    #[error("Field solver ({field}): {message}")]
    FieldSolver {
        field: &'static str,
        message: String,
    },
}
