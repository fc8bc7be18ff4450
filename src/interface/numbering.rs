//! Global numbering of interface points and the multiplier index space.
//!
//! Rank `k` numbers its owned interface points `offset_k, offset_k + 1, …`
//! in the traversal order of its [`InterfaceLocalMap`], where `offset_k` is
//! the exclusive prefix sum of the owned counts. Component `d` of point `p`
//! gets multiplier id `p + d * N`, `N` being the global point count.
//!
//! Every rank keeps the full point list gathered by [`InterfaceDofMaps`], so
//! replicated operators carry every multiplier row.

use std::collections::BTreeMap;

use crate::algs::collective::rank_slice;
use crate::algs::communicator::Communicator;
use crate::data::field_map::FieldMap;
use crate::debug_invariants::DebugInvariants;
use crate::fsi_error::FsiError;
use crate::interface::maps::InterfaceDofMaps;
use crate::interface::matcher::InterfaceLocalMap;

#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceNumbering {
    rank: usize,
    offset: usize,
    total_points: usize,
    components: usize,
    fluid_total_nodes: usize,
    structure_total_nodes: usize,
    /// `(fluid node, structure node)` indexed by global point id.
    points: Vec<(usize, usize)>,
    /// structure node -> global point id, all ranks.
    numeration: BTreeMap<usize, usize>,
    owned_in_order: Vec<usize>,
    multiplier_map: FieldMap,
}

impl InterfaceNumbering {
    /// Collective over `comm`.
    pub fn build<C>(
        local: &InterfaceLocalMap,
        maps: &InterfaceDofMaps,
        comm: &C,
    ) -> Result<Self, FsiError>
    where
        C: Communicator + ?Sized,
    {
        let owned_in_order: Vec<usize> = local
            .iter()
            .map(|(_, s)| s)
            .filter(|&s| maps.owns(s))
            .collect();
        let slice = rank_slice(comm, owned_in_order.len())?;
        let rank = comm.rank();

        let points: Vec<(usize, usize)> =
            maps.owned_pairs_by_rank().iter().flatten().copied().collect();
        if points.len() != slice.total {
            return Err(FsiError::MapMismatch {
                what: "gathered interface points",
                expected: slice.total,
                found: points.len(),
            });
        }
        let numeration: BTreeMap<usize, usize> =
            points.iter().enumerate().map(|(p, &(_, s))| (s, p)).collect();
        check_numeration(rank, slice.offset, &owned_in_order, &numeration)?;

        let components = local.components();
        let total_points = slice.total;
        let local_count = owned_in_order.len();
        let ids = (0..components)
            .flat_map(|d| (0..local_count).map(move |l| slice.offset + l + d * total_points))
            .collect();
        let multiplier_map = FieldMap::from_owned_ids(total_points * components, ids)?;

        let numbering = Self {
            rank,
            offset: slice.offset,
            total_points,
            components,
            fluid_total_nodes: local.fluid_total_nodes(),
            structure_total_nodes: local.structure_total_nodes(),
            points,
            numeration,
            owned_in_order,
            multiplier_map,
        };
        numbering.debug_assert_invariants();
        if rank == 0 {
            log::info!(
                "interface numbering: {} points, {} multipliers",
                total_points,
                total_points * components
            );
        }
        Ok(numbering)
    }

    /// First global point id of this rank.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Points numbered by this rank.
    pub fn local_count(&self) -> usize {
        self.owned_in_order.len()
    }

    /// Global interface point count `N`.
    pub fn total_points(&self) -> usize {
        self.total_points
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// Size of the multiplier block, `N * components`.
    pub fn num_multipliers(&self) -> usize {
        self.total_points * self.components
    }

    /// Global point id of `structure_node`, whichever rank numbered it.
    pub fn point_id(&self, structure_node: usize) -> Option<usize> {
        self.numeration.get(&structure_node).copied()
    }

    pub fn multiplier_id(&self, structure_node: usize, component: usize) -> Option<usize> {
        self.point_id(structure_node)
            .map(|p| p + component * self.total_points)
    }

    /// Structure nodes numbered here, in numbering order.
    pub fn owned_structure_nodes(&self) -> &[usize] {
        &self.owned_in_order
    }

    /// `(fluid node, structure node)` of every interface point, by point id.
    pub fn points(&self) -> &[(usize, usize)] {
        &self.points
    }

    /// `(multiplier id, fluid dof, structure dof)` for every component of
    /// every interface point, component-blocked.
    pub fn component_pairs(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        (0..self.components).flat_map(move |d| {
            self.points.iter().enumerate().map(move |(p, &(f, s))| {
                (
                    p + d * self.total_points,
                    f + d * self.fluid_total_nodes,
                    s + d * self.structure_total_nodes,
                )
            })
        })
    }

    /// Fluid velocity DOFs of the whole interface, component-blocked.
    pub fn fluid_dofs(&self) -> Vec<usize> {
        self.component_pairs().map(|(_, f, _)| f).collect()
    }

    pub fn multiplier_map(&self) -> &FieldMap {
        &self.multiplier_map
    }
}

/// Check that the `l`-th owned point of `rank` carries id `offset + l`.
pub(crate) fn check_numeration(
    rank: usize,
    offset: usize,
    owned_in_order: &[usize],
    numeration: &BTreeMap<usize, usize>,
) -> Result<(), FsiError> {
    for (l, s) in owned_in_order.iter().enumerate() {
        let expected = offset + l;
        let actual = numeration.get(s).copied().unwrap_or(usize::MAX);
        if actual != expected {
            return Err(FsiError::NumberingInconsistent {
                rank,
                local_index: l,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

impl DebugInvariants for InterfaceNumbering {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "InterfaceNumbering");
    }

    fn validate_invariants(&self) -> Result<(), FsiError> {
        check_numeration(self.rank, self.offset, &self.owned_in_order, &self.numeration)?;
        if self.points.len() != self.total_points {
            return Err(FsiError::MapMismatch {
                what: "interface points",
                expected: self.total_points,
                found: self.points.len(),
            });
        }
        if self.multiplier_map.num_owned() != self.local_count() * self.components {
            return Err(FsiError::MapMismatch {
                what: "owned multipliers",
                expected: self.local_count() * self.components,
                found: self.multiplier_map.num_owned(),
            });
        }
        Ok(())
    }
}
