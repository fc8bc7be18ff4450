//! Communication layer: point-to-point communicator, wire types and the
//! collectives of the setup phase.

pub mod collective;
pub mod communicator;
pub mod wire;
