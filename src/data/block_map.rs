//! Block structure of the monolithic FSI unknown.
//!
//! The monolithic index space is the concatenation, in the fixed order of
//! [`Block::ALL`], of fluid velocity, fluid pressure, structure displacement,
//! interface multiplier and mesh displacement.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::data::field_map::FieldMap;
use crate::debug_invariants::DebugInvariants;
use crate::fsi_error::FsiError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Block {
    FluidVelocity,
    FluidPressure,
    StructureDisplacement,
    Multiplier,
    MeshDisplacement,
}

impl Block {
    pub const COUNT: usize = 5;
    pub const ALL: [Block; Block::COUNT] = [
        Block::FluidVelocity,
        Block::FluidPressure,
        Block::StructureDisplacement,
        Block::Multiplier,
        Block::MeshDisplacement,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Block::FluidVelocity => "fluid velocity",
            Block::FluidPressure => "fluid pressure",
            Block::StructureDisplacement => "structure displacement",
            Block::Multiplier => "interface multiplier",
            Block::MeshDisplacement => "mesh displacement",
        }
    }
}

/// Sizes and offsets of the five blocks. Zero-sized blocks are allowed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLayout {
    sizes: [usize; Block::COUNT],
}

impl BlockLayout {
    pub const fn new(sizes: [usize; Block::COUNT]) -> Self {
        Self { sizes }
    }

    #[inline]
    pub fn size(&self, block: Block) -> usize {
        self.sizes[block.index()]
    }

    pub fn offset(&self, block: Block) -> usize {
        self.sizes[..block.index()].iter().sum()
    }

    pub fn range(&self, block: Block) -> Range<usize> {
        let start = self.offset(block);
        start..start + self.size(block)
    }

    pub fn total(&self) -> usize {
        self.sizes.iter().sum()
    }

    pub fn sizes(&self) -> [usize; Block::COUNT] {
        self.sizes
    }
}

/// Field maps of all five blocks, concatenated in block order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonolithicMap {
    layout: BlockLayout,
    maps: [FieldMap; Block::COUNT],
}

impl MonolithicMap {
    pub fn new(
        velocity: FieldMap,
        pressure: FieldMap,
        structure: FieldMap,
        multiplier: FieldMap,
        mesh: FieldMap,
    ) -> Self {
        let maps = [velocity, pressure, structure, multiplier, mesh];
        let layout = BlockLayout::new([
            maps[0].global_size(),
            maps[1].global_size(),
            maps[2].global_size(),
            maps[3].global_size(),
            maps[4].global_size(),
        ]);
        let map = Self { layout, maps };
        map.debug_assert_invariants();
        map
    }

    #[inline]
    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    #[inline]
    pub fn field_map(&self, block: Block) -> &FieldMap {
        &self.maps[block.index()]
    }

    pub fn global_size(&self) -> usize {
        self.layout.total()
    }
}

impl DebugInvariants for MonolithicMap {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "MonolithicMap");
    }

    fn validate_invariants(&self) -> Result<(), FsiError> {
        for b in Block::ALL {
            let map = self.field_map(b);
            if map.global_size() != self.layout.size(b) {
                return Err(FsiError::MapMismatch {
                    what: b.name(),
                    expected: self.layout.size(b),
                    found: map.global_size(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_block_order() {
        let layout = BlockLayout::new([4, 1, 6, 0, 4]);
        assert_eq!(layout.offset(Block::FluidVelocity), 0);
        assert_eq!(layout.range(Block::StructureDisplacement), 5..11);
        assert_eq!(layout.range(Block::Multiplier), 11..11);
        assert_eq!(layout.offset(Block::MeshDisplacement), 11);
        assert_eq!(layout.total(), 15);
    }

    #[test]
    fn layout_follows_the_field_maps() {
        let map = MonolithicMap::new(
            FieldMap::serial(2),
            FieldMap::serial(1),
            FieldMap::from_owned_ids(3, vec![2]).unwrap(),
            FieldMap::serial(0),
            FieldMap::serial(2),
        );
        assert_eq!(map.layout().sizes(), [2, 1, 3, 0, 2]);
        assert_eq!(map.global_size(), 8);
        assert_eq!(map.field_map(Block::StructureDisplacement).num_owned(), 1);
        assert!(map.validate_invariants().is_ok());
    }
}
