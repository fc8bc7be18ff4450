//! Block preconditioner for the monolithic FSI operator.
//!
//! The structure and geometry approximations depend only on operators that
//! are fixed for the whole run and are built once. The fluid approximation
//! (momentum diagonal and the pressure and multiplier Schur diagonals)
//! depends on the deformed mesh and is refreshed every Newton iteration
//! through [`BlockPreconditioner::update_fluid`]. A refreshed driver hands
//! out a [`ReadyPreconditioner`] for the Krylov solve.
//!
//! Fluid blocks use a SIMPLE step: `u* = D⁻¹ r_u`,
//! `p = S_p⁻¹ (r_p − B u*)`, `u = u* − D⁻¹ Bᵀ p` with
//! `S_p = −diag(B D⁻¹ Bᵀ)`.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sprs::CsMat;

use crate::assembly::{BlockOperator, FluidBlocks};
use crate::coupling::CouplingBlocks;
use crate::data::block_map::{Block, BlockLayout};
use crate::fsi_error::FsiError;
use crate::linalg::operator::{LinearOperator, diagonal};
use crate::linalg::preconditioner::Preconditioner;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreconditionerKind {
    Identity,
    BlockJacobi,
    #[default]
    BlockGaussSeidel,
}

fn invert(diag: &[f64]) -> Vec<f64> {
    diag.iter()
        .map(|&d| if d.abs() > 1e-14 { 1.0 / d } else { 1.0 })
        .collect()
}

fn scale(inv: &[f64], r: &[f64]) -> Vec<f64> {
    inv.iter().zip(r).map(|(a, b)| a * b).collect()
}

/// `diag(L · diag(inv) · R)` for `L: m×n`, `R: n×m`.
fn triple_product_diagonal(left: &CsMat<f64>, inv: &[f64], right: &CsMat<f64>) -> Vec<f64> {
    let mut out = vec![0.0; left.rows()];
    for (i, row) in left.outer_iterator().enumerate() {
        for (j, &l) in row.iter() {
            if let Some(&r) = right.get(j, i) {
                out[i] += l * inv[j] * r;
            }
        }
    }
    out
}

fn check_shape(what: &'static str, m: &CsMat<f64>, expected: (usize, usize)) -> Result<(), FsiError> {
    if m.shape() != expected {
        return Err(FsiError::MapMismatch {
            what,
            expected: expected.0 * expected.1,
            found: m.rows() * m.cols(),
        });
    }
    Ok(())
}

#[derive(Clone, Debug)]
struct FluidApproximation {
    momentum_inv: Vec<f64>,
    pressure_schur_inv: Vec<f64>,
    multiplier_schur_inv: Vec<f64>,
    gradient: CsMat<f64>,
    divergence: CsMat<f64>,
}

#[derive(Clone, Debug)]
pub struct BlockPreconditioner {
    kind: PreconditionerKind,
    layout: BlockLayout,
    structure_inv: Vec<f64>,
    geometry_inv: Vec<f64>,
    coupling: Arc<CouplingBlocks>,
    fluid: Option<FluidApproximation>,
}

impl BlockPreconditioner {
    /// Approximate the static blocks: structure `K` and geometry `A`, both
    /// with boundary conditions already applied.
    pub fn new(
        kind: PreconditionerKind,
        layout: BlockLayout,
        structure: &CsMat<f64>,
        geometry: &CsMat<f64>,
        coupling: Arc<CouplingBlocks>,
    ) -> Result<Self, FsiError> {
        let ns = layout.size(Block::StructureDisplacement);
        let nm = layout.size(Block::MeshDisplacement);
        check_shape("structure block", structure, (ns, ns))?;
        check_shape("geometry block", geometry, (nm, nm))?;

        let start = Instant::now();
        let structure_inv = invert(&diagonal(structure));
        log::debug!("structure block approximated in {:?}", start.elapsed());
        let start = Instant::now();
        let geometry_inv = invert(&diagonal(geometry));
        log::debug!("geometry block approximated in {:?}", start.elapsed());

        Ok(Self {
            kind,
            layout,
            structure_inv,
            geometry_inv,
            coupling,
            fluid: None,
        })
    }

    pub fn kind(&self) -> PreconditionerKind {
        self.kind
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// Refresh the mesh-dependent approximations from the current fluid blocks.
    pub fn update_fluid(&mut self, fluid: FluidBlocks<'_>) -> Result<(), FsiError> {
        let nu = self.layout.size(Block::FluidVelocity);
        let np = self.layout.size(Block::FluidPressure);
        check_shape("fluid momentum block", fluid.momentum, (nu, nu))?;
        check_shape("fluid gradient block", fluid.gradient, (nu, np))?;
        check_shape("fluid divergence block", fluid.divergence, (np, nu))?;

        let start = Instant::now();
        let momentum_inv = invert(&diagonal(fluid.momentum));
        let pressure_schur: Vec<f64> =
            triple_product_diagonal(fluid.divergence, &momentum_inv, fluid.gradient)
                .into_iter()
                .map(|s| -s)
                .collect();

        let c = &self.coupling;
        let from_fluid = triple_product_diagonal(
            c.fluid_velocity_to_lambda(),
            &momentum_inv,
            c.lambda_to_fluid_momentum(),
        );
        let from_structure = triple_product_diagonal(
            c.structure_displacement_to_lambda(),
            &self.structure_inv,
            c.lambda_to_structure_momentum(),
        );
        let multiplier_schur: Vec<f64> = from_fluid
            .iter()
            .zip(&from_structure)
            .map(|(a, b)| -(a + b))
            .collect();

        self.fluid = Some(FluidApproximation {
            momentum_inv,
            pressure_schur_inv: invert(&pressure_schur),
            multiplier_schur_inv: invert(&multiplier_schur),
            gradient: fluid.gradient.clone(),
            divergence: fluid.divergence.clone(),
        });
        log::debug!("fluid block and Schur complements approximated in {:?}", start.elapsed());
        Ok(())
    }

    /// The preconditioner must act on exactly the operator's index space.
    pub fn check_operator(&self, op: &BlockOperator) -> Result<(), FsiError> {
        for b in Block::ALL {
            if op.layout().size(b) != self.layout.size(b) {
                return Err(FsiError::MapMismatch {
                    what: b.name(),
                    expected: self.layout.size(b),
                    found: op.layout().size(b),
                });
            }
        }
        Ok(())
    }

    /// Borrow a preconditioner ready for one Krylov solve.
    pub fn ready(&self) -> Result<ReadyPreconditioner<'_>, FsiError> {
        let fluid = self.fluid.as_ref().ok_or_else(|| {
            FsiError::InvalidConfig("block preconditioner used before its fluid update".into())
        })?;
        Ok(ReadyPreconditioner { prec: self, fluid })
    }
}

#[derive(Copy, Clone, Debug)]
pub struct ReadyPreconditioner<'a> {
    prec: &'a BlockPreconditioner,
    fluid: &'a FluidApproximation,
}

impl ReadyPreconditioner<'_> {
    fn fluid_step(&self, r_u: &[f64], r_p: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let f = self.fluid;
        let mut u = scale(&f.momentum_inv, r_u);
        let mut rp = r_p.to_vec();
        for (ri, bu) in rp.iter_mut().zip(f.divergence.apply(&u)) {
            *ri -= bu;
        }
        let p = scale(&f.pressure_schur_inv, &rp);
        let correction = scale(&f.momentum_inv, &f.gradient.apply(&p));
        for (ui, ci) in u.iter_mut().zip(correction) {
            *ui -= ci;
        }
        (u, p)
    }
}

impl Preconditioner for ReadyPreconditioner<'_> {
    fn apply(&self, r: &[f64]) -> Vec<f64> {
        let prec = self.prec;
        if prec.kind == PreconditionerKind::Identity {
            return r.to_vec();
        }
        let layout = &prec.layout;
        let block = |b: Block| &r[layout.range(b)];
        let gauss_seidel = prec.kind == PreconditionerKind::BlockGaussSeidel;
        let c = &prec.coupling;

        let (u, p) = if gauss_seidel {
            self.fluid_step(block(Block::FluidVelocity), block(Block::FluidPressure))
        } else {
            (
                scale(&self.fluid.momentum_inv, block(Block::FluidVelocity)),
                scale(&self.fluid.pressure_schur_inv, block(Block::FluidPressure)),
            )
        };
        let d = scale(&prec.structure_inv, block(Block::StructureDisplacement));

        let mut r_lambda = block(Block::Multiplier).to_vec();
        let mut r_mesh = block(Block::MeshDisplacement).to_vec();
        if gauss_seidel {
            let mut minus_lambda = vec![0.0; r_lambda.len()];
            c.fluid_velocity_to_lambda().apply_add(&u, &mut minus_lambda);
            c.structure_displacement_to_lambda().apply_add(&d, &mut minus_lambda);
            for (ri, mi) in r_lambda.iter_mut().zip(minus_lambda) {
                *ri -= mi;
            }
            let mut minus_mesh = vec![0.0; r_mesh.len()];
            c.structure_displacement_to_mesh().apply_add(&d, &mut minus_mesh);
            for (ri, mi) in r_mesh.iter_mut().zip(minus_mesh) {
                *ri -= mi;
            }
        }
        let lambda = scale(&self.fluid.multiplier_schur_inv, &r_lambda);
        let m = scale(&prec.geometry_inv, &r_mesh);

        let mut z = Vec::with_capacity(r.len());
        for part in [u, p, d, lambda, m] {
            z.extend(part);
        }
        z
    }
}
