//! Monolithic block operator.
//!
//! A 5×5 grid of optional sparse blocks over a [`BlockLayout`]. Missing
//! blocks act as zero; blocks of zero size are allowed, so a rank without
//! DOFs in some field still assembles a consistent operator.

use sprs::CsMat;

use crate::coupling::CouplingBlocks;
use crate::data::block_map::{Block, BlockLayout};
use crate::data::block_vector::BlockVector;
use crate::fsi_error::FsiError;
use crate::linalg::operator::LinearOperator;

#[derive(Clone, Debug)]
pub struct BlockOperator {
    layout: BlockLayout,
    blocks: [[Option<CsMat<f64>>; Block::COUNT]; Block::COUNT],
}

/// Fluid blocks after boundary conditions: momentum `F`, gradient `Bᵀ` and
/// divergence `B`.
#[derive(Copy, Clone, Debug)]
pub struct FluidBlocks<'a> {
    pub momentum: &'a CsMat<f64>,
    pub gradient: &'a CsMat<f64>,
    pub divergence: &'a CsMat<f64>,
}

impl BlockOperator {
    pub fn new(layout: BlockLayout) -> Self {
        Self {
            layout,
            blocks: Default::default(),
        }
    }

    /// Compose the FSI operator:
    ///
    /// ```text
    ///   [ F   Bᵀ  0    C_uλ  0 ]
    ///   [ B   0   0    0     0 ]
    ///   [ 0   0   K    C_dλ  0 ]
    ///   [ C_λu 0  C_λd 0     0 ]
    ///   [ 0   0   C_md 0     A ]
    /// ```
    pub fn fsi(
        layout: BlockLayout,
        fluid: FluidBlocks<'_>,
        structure: &CsMat<f64>,
        geometry: &CsMat<f64>,
        coupling: &CouplingBlocks,
    ) -> Result<Self, FsiError> {
        use Block::*;
        let mut op = Self::new(layout);
        op.set(FluidVelocity, FluidVelocity, fluid.momentum.clone())?;
        op.set(FluidVelocity, FluidPressure, fluid.gradient.clone())?;
        op.set(FluidVelocity, Multiplier, coupling.lambda_to_fluid_momentum().clone())?;
        op.set(FluidPressure, FluidVelocity, fluid.divergence.clone())?;
        op.set(StructureDisplacement, StructureDisplacement, structure.clone())?;
        op.set(
            StructureDisplacement,
            Multiplier,
            coupling.lambda_to_structure_momentum().clone(),
        )?;
        op.set(Multiplier, FluidVelocity, coupling.fluid_velocity_to_lambda().clone())?;
        op.set(
            Multiplier,
            StructureDisplacement,
            coupling.structure_displacement_to_lambda().clone(),
        )?;
        op.set(
            MeshDisplacement,
            StructureDisplacement,
            coupling.structure_displacement_to_mesh().clone(),
        )?;
        op.set(MeshDisplacement, MeshDisplacement, geometry.clone())?;
        Ok(op)
    }

    #[inline]
    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// Insert block `(row, col)`; its shape must match the layout.
    pub fn set(&mut self, row: Block, col: Block, block: CsMat<f64>) -> Result<(), FsiError> {
        let expected = (self.layout.size(row), self.layout.size(col));
        if block.shape() != expected {
            return Err(FsiError::BlockShapeMismatch {
                row: row.index(),
                col: col.index(),
                expected,
                found: block.shape(),
            });
        }
        self.blocks[row.index()][col.index()] = Some(block);
        Ok(())
    }

    pub fn get(&self, row: Block, col: Block) -> Option<&CsMat<f64>> {
        self.blocks[row.index()][col.index()].as_ref()
    }

    /// `A x − b` as a new block vector.
    pub fn residual(&self, x: &BlockVector, b: &BlockVector) -> Result<BlockVector, FsiError> {
        for v in [x, b] {
            if v.layout() != &self.layout {
                return Err(FsiError::LengthMismatch {
                    what: "operator domain",
                    expected: self.layout.total(),
                    found: v.len(),
                });
            }
        }
        let mut r = self.apply(x.as_slice());
        for (ri, bi) in r.iter_mut().zip(b.as_slice()) {
            *ri -= bi;
        }
        BlockVector::from_vec(self.layout, r)
    }
}

impl LinearOperator for BlockOperator {
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.layout.total()];
        for row in Block::ALL {
            let rows = self.layout.range(row);
            for col in Block::ALL {
                if let Some(block) = self.get(row, col) {
                    let cols = self.layout.range(col);
                    block.apply_add(&v[cols], &mut out[rows.clone()]);
                }
            }
        }
        out
    }

    fn rows(&self) -> usize {
        self.layout.total()
    }

    fn cols(&self) -> usize {
        self.layout.total()
    }
}
