//! Geometric matching of fluid and structure interface nodes.
//!
//! Every fluid node carrying the interface marker is paired with the nearest
//! structure node carrying the same marker, provided the distance does not
//! exceed the tolerance. Structure candidates are sorted by their first
//! coordinate, so each query only scans the slab `|x - x_f| <= tol`.
//! Equal distances resolve to the smaller structure id, which makes the
//! pairing a pure function of the inputs.

use std::collections::BTreeMap;

use crate::data::coordinates::distance;
use crate::data::dof_set::DofSet;
use crate::debug_invariants::DebugInvariants;
use crate::fsi_error::FsiError;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InterfaceMatcher {
    marker: i32,
    tolerance: f64,
}

struct Candidate<'a> {
    node: usize,
    point: &'a [f64],
}

impl InterfaceMatcher {
    pub fn new(marker: i32, tolerance: f64) -> Result<Self, FsiError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(FsiError::InvalidConfig(format!(
                "interface tolerance must be finite and non-negative, got {tolerance}"
            )));
        }
        Ok(Self { marker, tolerance })
    }

    pub fn marker(&self) -> i32 {
        self.marker
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Pair the local fluid interface nodes with structure interface nodes.
    pub fn match_dofs(
        &self,
        fluid: &DofSet,
        structure: &DofSet,
    ) -> Result<InterfaceLocalMap, FsiError> {
        let dim = fluid.spatial_dimension();
        if structure.spatial_dimension() != dim {
            return Err(FsiError::DimensionMismatch {
                expected: dim,
                found: structure.spatial_dimension(),
            });
        }
        if structure.components() != fluid.components() {
            return Err(FsiError::DimensionMismatch {
                expected: fluid.components(),
                found: structure.components(),
            });
        }

        let mut candidates = structure
            .boundary_nodes(self.marker)
            .into_iter()
            .map(|node| Ok(Candidate { node, point: structure.point(node)? }))
            .collect::<Result<Vec<_>, FsiError>>()?;
        candidates.sort_by(|a, b| a.point[0].total_cmp(&b.point[0]).then(a.node.cmp(&b.node)));

        let mut pairs = BTreeMap::new();
        let mut partner_of: BTreeMap<usize, usize> = BTreeMap::new();
        let mut max_distance = 0.0f64;
        for fluid_node in fluid.boundary_nodes(self.marker) {
            let x = fluid.point(fluid_node)?;
            let lo = candidates.partition_point(|c| c.point[0] < x[0] - self.tolerance);
            let hi = candidates.partition_point(|c| c.point[0] <= x[0] + self.tolerance);

            let mut best: Option<(f64, usize)> = None;
            for c in &candidates[lo..hi] {
                let d = distance(x, c.point);
                if d > self.tolerance {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((bd, bn)) => d < bd || (d == bd && c.node < bn),
                };
                if better {
                    best = Some((d, c.node));
                }
            }

            let Some((d, structure_node)) = best else {
                let nearest = candidates
                    .iter()
                    .map(|c| distance(x, c.point))
                    .min_by(f64::total_cmp);
                return Err(FsiError::InterfacePartnerNotFound {
                    fluid_dof: fluid_node,
                    nearest,
                    tolerance: self.tolerance,
                });
            };
            if let Some(&first) = partner_of.get(&structure_node) {
                return Err(FsiError::InterfaceNotInjective {
                    structure_dof: structure_node,
                    first,
                    second: fluid_node,
                });
            }
            partner_of.insert(structure_node, fluid_node);
            pairs.insert(fluid_node, structure_node);
            max_distance = max_distance.max(d);
        }

        log::debug!(
            "interface matcher: {} pairs on marker {}, max distance {:e}",
            pairs.len(),
            self.marker,
            max_distance
        );
        let map = InterfaceLocalMap {
            pairs,
            components: fluid.components(),
            fluid_total_nodes: fluid.total_nodes(),
            structure_total_nodes: structure.total_nodes(),
            tolerance: self.tolerance,
            max_distance,
        };
        map.debug_assert_invariants();
        Ok(map)
    }
}

/// Rank-local pairing `fluid node -> structure node`.
///
/// Traversal is in ascending fluid node id on every rank; the global
/// numbering depends on that order.
#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceLocalMap {
    pairs: BTreeMap<usize, usize>,
    components: usize,
    fluid_total_nodes: usize,
    structure_total_nodes: usize,
    tolerance: f64,
    max_distance: f64,
}

impl InterfaceLocalMap {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `(fluid_node, structure_node)` in ascending fluid id.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pairs.iter().map(|(&f, &s)| (f, s))
    }

    pub fn structure_partner(&self, fluid_node: usize) -> Option<usize> {
        self.pairs.get(&fluid_node).copied()
    }

    /// Number of vector components replicated per interface point.
    pub fn components(&self) -> usize {
        self.components
    }

    pub fn fluid_total_nodes(&self) -> usize {
        self.fluid_total_nodes
    }

    pub fn structure_total_nodes(&self) -> usize {
        self.structure_total_nodes
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Largest paired distance.
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Component DOF pairs `(d, fluid_dof, structure_dof)`, one block per component.
    pub fn component_pairs(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        (0..self.components).flat_map(move |d| {
            self.iter().map(move |(f, s)| {
                (
                    d,
                    f + d * self.fluid_total_nodes,
                    s + d * self.structure_total_nodes,
                )
            })
        })
    }
}

impl DebugInvariants for InterfaceLocalMap {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "InterfaceLocalMap");
    }

    fn validate_invariants(&self) -> Result<(), FsiError> {
        let mut seen: BTreeMap<usize, usize> = BTreeMap::new();
        for (f, s) in self.iter() {
            if let Some(first) = seen.insert(s, f) {
                return Err(FsiError::InterfaceNotInjective {
                    structure_dof: s,
                    first,
                    second: f,
                });
            }
            if f >= self.fluid_total_nodes {
                return Err(FsiError::UnknownNode(f));
            }
            if s >= self.structure_total_nodes {
                return Err(FsiError::UnknownNode(s));
            }
        }
        if self.max_distance > self.tolerance {
            return Err(FsiError::InterfacePartnerNotFound {
                fluid_dof: usize::MAX,
                nearest: Some(self.max_distance),
                tolerance: self.tolerance,
            });
        }
        Ok(())
    }
}
