//! Immutable monolithic vector.
//!
//! Operations return new vectors; a Newton iterate is never updated in place.

use crate::data::block_map::{Block, BlockLayout};
use crate::fsi_error::FsiError;

#[derive(Clone, Debug, PartialEq)]
pub struct BlockVector {
    layout: BlockLayout,
    data: Vec<f64>,
}

impl BlockVector {
    pub fn zeros(layout: BlockLayout) -> Self {
        Self {
            data: vec![0.0; layout.total()],
            layout,
        }
    }

    pub fn from_vec(layout: BlockLayout, data: Vec<f64>) -> Result<Self, FsiError> {
        if data.len() != layout.total() {
            return Err(FsiError::LengthMismatch {
                what: "monolithic vector",
                expected: layout.total(),
                found: data.len(),
            });
        }
        Ok(Self { layout, data })
    }

    /// Concatenate per-block values in block order.
    pub fn from_blocks(layout: BlockLayout, blocks: [&[f64]; Block::COUNT]) -> Result<Self, FsiError> {
        let mut data = Vec::with_capacity(layout.total());
        for (b, values) in Block::ALL.into_iter().zip(blocks) {
            if values.len() != layout.size(b) {
                return Err(FsiError::LengthMismatch {
                    what: b.name(),
                    expected: layout.size(b),
                    found: values.len(),
                });
            }
            data.extend_from_slice(values);
        }
        Ok(Self { layout, data })
    }

    #[inline]
    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn block(&self, block: Block) -> &[f64] {
        &self.data[self.layout.range(block)]
    }

    /// Copy of `self` with `block` replaced by `values`.
    pub fn with_block(mut self, block: Block, values: &[f64]) -> Result<Self, FsiError> {
        let range = self.layout.range(block);
        if values.len() != range.len() {
            return Err(FsiError::LengthMismatch {
                what: block.name(),
                expected: range.len(),
                found: values.len(),
            });
        }
        self.data[range].copy_from_slice(values);
        Ok(self)
    }

    /// `self + alpha * other`.
    pub fn axpy(&self, alpha: f64, other: &BlockVector) -> Result<Self, FsiError> {
        if other.layout != self.layout {
            return Err(FsiError::LengthMismatch {
                what: "block vector layout",
                expected: self.len(),
                found: other.len(),
            });
        }
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a + alpha * b)
            .collect();
        Ok(Self {
            layout: self.layout,
            data,
        })
    }

    pub fn norm(&self) -> f64 {
        self.data.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    pub fn block_norm(&self, block: Block) -> f64 {
        self.block(block).iter().map(|x| x * x).sum::<f64>().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_replacement_keeps_other_blocks() {
        let layout = BlockLayout::new([2, 1, 0, 1, 2]);
        let v = BlockVector::zeros(layout)
            .with_block(Block::MeshDisplacement, &[3.0, 4.0])
            .unwrap();
        assert_eq!(v.as_slice(), &[0.0, 0.0, 0.0, 0.0, 3.0, 4.0]);
        assert_eq!(v.block_norm(Block::MeshDisplacement), 5.0);
        assert!(v.block(Block::StructureDisplacement).is_empty());
        assert!(v.clone().with_block(Block::Multiplier, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn axpy_returns_new_value() {
        let layout = BlockLayout::new([1, 1, 1, 0, 0]);
        let x = BlockVector::from_vec(layout, vec![1.0, 2.0, 3.0]).unwrap();
        let d = BlockVector::from_blocks(layout, [&[1.0], &[1.0], &[1.0], &[], &[]]).unwrap();
        let y = x.axpy(-1.0, &d).unwrap();
        assert_eq!(y.as_slice(), &[0.0, 1.0, 2.0]);
        assert_eq!(x.as_slice(), &[1.0, 2.0, 3.0]);
    }
}
