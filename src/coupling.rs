//! Interface coupling operators.
//!
//! With `λ` the interface multiplier, the monolithic system carries
//!
//! ```text
//!   fluid momentum      F u + Bᵀ p + λ        = f
//!   structure momentum  K d        − λ        = M h₂
//!   velocity continuity (c₁/dt) d_Γ − u_Γ     = h₁|Γ
//!   mesh motion         A m,  with m_Γ − d_Γ  = 0 on interface rows
//! ```
//!
//! so the fluid sees the multiplier as an applied traction, the structure
//! sees its reaction, and the structure velocity `(c₁/dt) d − h₁` matches
//! the fluid velocity on the interface. The blocks cover every interface
//! point of every rank, so each rank holds the full replicated operator.

use std::collections::BTreeSet;

use sprs::{CsMat, TriMat};

use crate::data::block_map::{Block, BlockLayout};
use crate::fsi_error::FsiError;
use crate::interface::matcher::InterfaceLocalMap;
use crate::interface::numbering::InterfaceNumbering;

fn empty(rows: usize, cols: usize) -> CsMat<f64> {
    TriMat::new((rows, cols)).to_csr()
}

/// Pointwise injection between structure DOFs and multiplier DOFs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transmission {
    /// `(structure_dof, multiplier_id)` for every interface component.
    pairs: Vec<(usize, usize)>,
    structure_size: usize,
    multiplier_size: usize,
}

impl Transmission {
    pub fn new(local: &InterfaceLocalMap, numbering: &InterfaceNumbering) -> Self {
        let pairs = numbering
            .component_pairs()
            .map(|(id, _, s_dof)| (s_dof, id))
            .collect();
        Self {
            pairs,
            structure_size: local.structure_total_nodes() * local.components(),
            multiplier_size: numbering.num_multipliers(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Restrict a structure field to the interface, in multiplier numbering.
    pub fn structure_to_interface(&self, structure: &[f64]) -> Result<Vec<f64>, FsiError> {
        if structure.len() != self.structure_size {
            return Err(FsiError::LengthMismatch {
                what: "structure field",
                expected: self.structure_size,
                found: structure.len(),
            });
        }
        let mut gamma = vec![0.0; self.multiplier_size];
        for &(s, id) in &self.pairs {
            gamma[id] = structure[s];
        }
        Ok(gamma)
    }

    /// Write interface values back into the interface entries of `structure`.
    pub fn interface_to_structure(&self, gamma: &[f64], structure: &mut [f64]) -> Result<(), FsiError> {
        if gamma.len() != self.multiplier_size {
            return Err(FsiError::LengthMismatch {
                what: "interface field",
                expected: self.multiplier_size,
                found: gamma.len(),
            });
        }
        if structure.len() != self.structure_size {
            return Err(FsiError::LengthMismatch {
                what: "structure field",
                expected: self.structure_size,
                found: structure.len(),
            });
        }
        for &(s, id) in &self.pairs {
            structure[s] = gamma[id];
        }
        Ok(())
    }
}

/// The five off-diagonal blocks coupling the fields through the interface.
#[derive(Clone, Debug)]
pub struct CouplingBlocks {
    lambda_to_fluid_momentum: CsMat<f64>,
    lambda_to_structure_momentum: CsMat<f64>,
    structure_displacement_to_lambda: CsMat<f64>,
    fluid_velocity_to_lambda: CsMat<f64>,
    structure_displacement_to_mesh: CsMat<f64>,
    transmission: Transmission,
}

impl CouplingBlocks {
    /// Build the coupling for a fixed interface.
    ///
    /// `velocity_scale` is `c₁ / dt`, the coefficient of the current
    /// displacement in the structure velocity.
    pub fn build(
        local: &InterfaceLocalMap,
        numbering: &InterfaceNumbering,
        layout: &BlockLayout,
        velocity_scale: f64,
    ) -> Result<Self, FsiError> {
        let comps = local.components();
        let nu = layout.size(Block::FluidVelocity);
        let ns = layout.size(Block::StructureDisplacement);
        let nl = layout.size(Block::Multiplier);
        let nm = layout.size(Block::MeshDisplacement);
        check_size(Block::FluidVelocity, nu, local.fluid_total_nodes() * comps)?;
        check_size(Block::StructureDisplacement, ns, local.structure_total_nodes() * comps)?;
        check_size(Block::Multiplier, nl, numbering.num_multipliers())?;
        check_size(Block::MeshDisplacement, nm, nu)?;
        if !velocity_scale.is_finite() {
            return Err(FsiError::InvalidTimeAdvance(format!(
                "velocity coupling coefficient {velocity_scale}"
            )));
        }

        let mut to_fluid = TriMat::new((nu, nl));
        let mut to_structure = TriMat::new((ns, nl));
        let mut from_structure = TriMat::new((nl, ns));
        let mut from_fluid = TriMat::new((nl, nu));
        let mut to_mesh = TriMat::new((nm, ns));

        for (id, f_dof, s_dof) in numbering.component_pairs() {
            to_mesh.add_triplet(f_dof, s_dof, -1.0);
            to_fluid.add_triplet(f_dof, id, 1.0);
            to_structure.add_triplet(s_dof, id, -1.0);
            from_fluid.add_triplet(id, f_dof, -1.0);
            from_structure.add_triplet(id, s_dof, velocity_scale);
        }

        log::debug!(
            "coupling blocks: {} multiplier entries, velocity scale {:e}",
            to_fluid.nnz(),
            velocity_scale
        );
        Ok(Self {
            lambda_to_fluid_momentum: to_fluid.to_csr(),
            lambda_to_structure_momentum: to_structure.to_csr(),
            structure_displacement_to_lambda: from_structure.to_csr(),
            fluid_velocity_to_lambda: from_fluid.to_csr(),
            structure_displacement_to_mesh: to_mesh.to_csr(),
            transmission: Transmission::new(local, numbering),
        })
    }

    /// All five blocks empty: the fields are solved independently.
    pub fn decoupled(layout: &BlockLayout) -> Self {
        let nu = layout.size(Block::FluidVelocity);
        let ns = layout.size(Block::StructureDisplacement);
        let nl = layout.size(Block::Multiplier);
        let nm = layout.size(Block::MeshDisplacement);
        Self {
            lambda_to_fluid_momentum: empty(nu, nl),
            lambda_to_structure_momentum: empty(ns, nl),
            structure_displacement_to_lambda: empty(nl, ns),
            fluid_velocity_to_lambda: empty(nl, nu),
            structure_displacement_to_mesh: empty(nm, ns),
            transmission: Transmission {
                pairs: Vec::new(),
                structure_size: ns,
                multiplier_size: nl,
            },
        }
    }

    pub fn lambda_to_fluid_momentum(&self) -> &CsMat<f64> {
        &self.lambda_to_fluid_momentum
    }

    pub fn lambda_to_structure_momentum(&self) -> &CsMat<f64> {
        &self.lambda_to_structure_momentum
    }

    pub fn structure_displacement_to_lambda(&self) -> &CsMat<f64> {
        &self.structure_displacement_to_lambda
    }

    pub fn fluid_velocity_to_lambda(&self) -> &CsMat<f64> {
        &self.fluid_velocity_to_lambda
    }

    pub fn structure_displacement_to_mesh(&self) -> &CsMat<f64> {
        &self.structure_displacement_to_mesh
    }

    pub fn transmission(&self) -> &Transmission {
        &self.transmission
    }
}

fn check_size(block: Block, found: usize, expected: usize) -> Result<(), FsiError> {
    if found != expected {
        return Err(FsiError::MapMismatch {
            what: block.name(),
            expected,
            found,
        });
    }
    Ok(())
}

/// `matrix` with every row in `rows` replaced by the identity row.
pub fn with_identity_rows(matrix: &CsMat<f64>, rows: &[usize]) -> Result<CsMat<f64>, FsiError> {
    let replaced: BTreeSet<usize> = rows.iter().copied().collect();
    if let Some(&last) = replaced.last() {
        if last >= matrix.rows() || last >= matrix.cols() {
            return Err(FsiError::MapMismatch {
                what: "identity row within operator",
                expected: matrix.rows().min(matrix.cols()),
                found: last,
            });
        }
    }
    let mut tri = TriMat::new((matrix.rows(), matrix.cols()));
    for (row_idx, row) in matrix.outer_iterator().enumerate() {
        if replaced.contains(&row_idx) {
            tri.add_triplet(row_idx, row_idx, 1.0);
            continue;
        }
        for (col_idx, &val) in row.iter() {
            tri.add_triplet(row_idx, col_idx, val);
        }
    }
    let out: CsMat<f64> = tri.to_csr();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::data::coordinates::Coordinates;
    use crate::data::dof_set::DofSet;
    use crate::data::labels::LabelSet;
    use crate::interface::maps::InterfaceDofMaps;
    use crate::interface::matcher::InterfaceMatcher;

    /// Fluid nodes 0..3 on a line, interface at nodes 1 and 2; structure
    /// nodes 0..2 with the interface at nodes 0 and 1.
    fn setup() -> (InterfaceLocalMap, InterfaceNumbering, BlockLayout) {
        let fluid_pts: Vec<[f64; 2]> = (0..3).map(|i| [i as f64, 0.0]).collect();
        let mut fl = LabelSet::new();
        fl.mark_boundary(1, 1);
        fl.mark_boundary(2, 1);
        let fluid = DofSet::serial(Coordinates::from_points(2, &fluid_pts).unwrap(), 2)
            .unwrap()
            .with_labels(fl)
            .unwrap();
        let mut sl = LabelSet::new();
        sl.mark_boundary(0, 1);
        sl.mark_boundary(1, 1);
        let structure =
            DofSet::serial(Coordinates::from_points(2, &[[1.0, 0.0], [2.0, 0.0]]).unwrap(), 2)
                .unwrap()
                .with_labels(sl)
                .unwrap();
        let local = InterfaceMatcher::new(1, 1e-10).unwrap().match_dofs(&fluid, &structure).unwrap();
        let maps = InterfaceDofMaps::build(&local, &NoComm).unwrap();
        let numbering = InterfaceNumbering::build(&local, &maps, &NoComm).unwrap();
        (local, numbering, BlockLayout::new([6, 1, 4, 4, 6]))
    }

    #[test]
    fn blocks_follow_interface_pairs() {
        let (local, numbering, layout) = setup();
        let c = CouplingBlocks::build(&local, &numbering, &layout, 4.0).unwrap();
        // fluid node 2, component 1 -> dof 5; structure node 1, component 1 -> dof 3; id 3
        assert_eq!(c.lambda_to_fluid_momentum().get(5, 3), Some(&1.0));
        assert_eq!(c.lambda_to_structure_momentum().get(3, 3), Some(&-1.0));
        assert_eq!(c.fluid_velocity_to_lambda().get(3, 5), Some(&-1.0));
        assert_eq!(c.structure_displacement_to_lambda().get(3, 3), Some(&4.0));
        assert_eq!(c.structure_displacement_to_mesh().get(5, 3), Some(&-1.0));
        assert_eq!(c.lambda_to_fluid_momentum().nnz(), 4);
        assert_eq!(c.structure_displacement_to_mesh().get(0, 0), None);
    }

    #[test]
    fn transmission_round_trip_is_exact() {
        let (local, numbering, layout) = setup();
        let c = CouplingBlocks::build(&local, &numbering, &layout, 1.0).unwrap();
        let original = vec![0.1, -2.5, 3.0, 1e-13];
        let gamma = c.transmission().structure_to_interface(&original).unwrap();
        let mut back = vec![0.0; 4];
        c.transmission().interface_to_structure(&gamma, &mut back).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn wrong_layout_is_rejected() {
        let (local, numbering, _) = setup();
        let bad = BlockLayout::new([6, 1, 4, 2, 6]);
        assert!(matches!(
            CouplingBlocks::build(&local, &numbering, &bad, 1.0),
            Err(FsiError::MapMismatch { .. })
        ));
    }

    #[test]
    fn identity_rows_replace_only_listed_rows() {
        let mut tri = TriMat::new((3, 3));
        for i in 0..3 {
            for j in 0..3 {
                tri.add_triplet(i, j, 2.0);
            }
        }
        let m: CsMat<f64> = tri.to_csr();
        let out = with_identity_rows(&m, &[1]).unwrap();
        assert_eq!(out.get(1, 1), Some(&1.0));
        assert_eq!(out.get(1, 0), None);
        assert_eq!(out.get(0, 1), Some(&2.0));
        assert!(with_identity_rows(&m, &[3]).is_err());
    }

    #[test]
    fn decoupled_blocks_are_empty() {
        let layout = BlockLayout::new([6, 1, 4, 4, 6]);
        let c = CouplingBlocks::decoupled(&layout);
        assert_eq!(c.lambda_to_fluid_momentum().shape(), (6, 4));
        assert_eq!(c.structure_displacement_to_mesh().nnz(), 0);
    }
}
