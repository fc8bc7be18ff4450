//! Linear algebra backend: operator and preconditioner traits, Krylov solvers.

pub mod krylov;
pub mod operator;
pub mod preconditioner;

pub use krylov::{KrylovSolver, LinearSolverKind, SolverStats};
pub use operator::LinearOperator;
pub use preconditioner::{IdentityPreconditioner, JacobiPreconditioner, Preconditioner};
