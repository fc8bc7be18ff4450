//! Fluid–structure interface: geometric matching, DOF lists and the global
//! numbering of interface multipliers.

pub mod maps;
pub mod matcher;
pub mod numbering;

pub use maps::InterfaceDofMaps;
pub use matcher::{InterfaceLocalMap, InterfaceMatcher};
pub use numbering::InterfaceNumbering;
