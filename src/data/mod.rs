//! Data module: field maps, block layout, DOF sets and boundary conditions.

pub mod bc;
pub mod block_map;
pub mod block_vector;
pub mod coordinates;
pub mod dof_set;
pub mod field_map;
pub mod labels;

pub use bc::{BcComponents, BcFunction, BcKind, BoundaryConditionSet};
pub use block_map::{Block, BlockLayout, MonolithicMap};
pub use block_vector::BlockVector;
pub use coordinates::Coordinates;
pub use dof_set::DofSet;
pub use field_map::FieldMap;
pub use labels::{BOUNDARY_LABEL, LabelSet};
