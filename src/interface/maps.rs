//! Component-wise interface DOF lists and unique ownership of interface points.

use std::collections::BTreeSet;

use crate::algs::collective::allgather_lists;
use crate::algs::communicator::Communicator;
use crate::fsi_error::FsiError;
use crate::interface::matcher::InterfaceLocalMap;

/// Fluid and structure interface DOFs of one rank, plus the owned interface
/// pairs of every rank.
///
/// A structure interface node may be listed by several ranks when fluid
/// partitions share it; it is owned by the lowest such rank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceDofMaps {
    fluid_dofs: Vec<usize>,
    structure_dofs: Vec<usize>,
    /// `(fluid node, structure node)` owned by each rank, in that rank's
    /// traversal order.
    owned_pairs_by_rank: Vec<Vec<(usize, usize)>>,
    owned_structure_nodes: BTreeSet<usize>,
}

impl InterfaceDofMaps {
    /// Collective: every rank must call this in the same phase of setup.
    ///
    /// The fluid list is completed on all ranks (barrier) before the
    /// structure side is built.
    pub fn build<C>(local: &InterfaceLocalMap, comm: &C) -> Result<Self, FsiError>
    where
        C: Communicator + ?Sized,
    {
        let fluid_dofs: Vec<usize> = local.component_pairs().map(|(_, f, _)| f).collect();
        comm.barrier()?;
        let structure_dofs: Vec<usize> = local.component_pairs().map(|(_, _, s)| s).collect();

        let flat: Vec<usize> = local.iter().flat_map(|(f, s)| [f, s]).collect();
        let lists = allgather_lists(comm, &flat)?;
        let mut claimed = BTreeSet::new();
        let mut owned_pairs_by_rank = Vec::with_capacity(lists.len());
        for (peer, list) in lists.iter().enumerate() {
            if list.len() % 2 != 0 {
                return Err(FsiError::CommError {
                    peer,
                    message: format!("odd interface pair list of length {}", list.len()),
                });
            }
            let owned: Vec<(usize, usize)> = list
                .chunks_exact(2)
                .map(|c| (c[0], c[1]))
                .filter(|&(_, s)| claimed.insert(s))
                .collect();
            owned_pairs_by_rank.push(owned);
        }
        let owned_structure_nodes = owned_pairs_by_rank
            .get(comm.rank())
            .map(|pairs| pairs.iter().map(|&(_, s)| s).collect())
            .unwrap_or_default();

        Ok(Self {
            fluid_dofs,
            structure_dofs,
            owned_pairs_by_rank,
            owned_structure_nodes,
        })
    }

    /// Fluid velocity DOFs on the interface of this rank, component-blocked.
    pub fn fluid_dofs(&self) -> &[usize] {
        &self.fluid_dofs
    }

    /// Structure displacement DOFs on the interface of this rank, component-blocked.
    pub fn structure_dofs(&self) -> &[usize] {
        &self.structure_dofs
    }

    /// Whether this rank owns the interface point of `structure_node`.
    pub fn owns(&self, structure_node: usize) -> bool {
        self.owned_structure_nodes.contains(&structure_node)
    }

    pub fn num_owned_points(&self) -> usize {
        self.owned_structure_nodes.len()
    }

    /// Owned `(fluid node, structure node)` pairs of every rank, rank-ordered.
    pub fn owned_pairs_by_rank(&self) -> &[Vec<(usize, usize)>] {
        &self.owned_pairs_by_rank
    }
}
