//! Nodal DOF set of one field on one rank.
//!
//! A `DofSet` is the slice of a finite-element space the FSI core needs:
//! the global ids of the nodes known locally, their coordinates and boundary
//! markers, the global node count (the per-component stride of vector
//! fields) and the number of field components.

use crate::data::coordinates::Coordinates;
use crate::data::labels::{BOUNDARY_LABEL, LabelSet};
use crate::fsi_error::FsiError;

#[derive(Clone, Debug)]
pub struct DofSet {
    node_ids: Vec<usize>,
    coordinates: Coordinates,
    labels: LabelSet,
    total_nodes: usize,
    components: usize,
}

impl DofSet {
    /// `node_ids[i]` has coordinates `coordinates.point(i)`. Ids must be
    /// strictly ascending and below `total_nodes`.
    pub fn new(
        node_ids: Vec<usize>,
        coordinates: Coordinates,
        total_nodes: usize,
        components: usize,
    ) -> Result<Self, FsiError> {
        if coordinates.len() != node_ids.len() {
            return Err(FsiError::LengthMismatch {
                what: "coordinates per node",
                expected: node_ids.len(),
                found: coordinates.len(),
            });
        }
        if node_ids.windows(2).any(|w| w[0] >= w[1]) {
            return Err(FsiError::InvalidConfig(
                "dof set node ids must be strictly ascending".into(),
            ));
        }
        if let Some(&last) = node_ids.last() {
            if last >= total_nodes {
                return Err(FsiError::UnknownNode(last));
            }
        }
        if components == 0 {
            return Err(FsiError::DimensionMismatch {
                expected: 1,
                found: 0,
            });
        }
        Ok(Self {
            node_ids,
            coordinates,
            labels: LabelSet::new(),
            total_nodes,
            components,
        })
    }

    /// Serial set owning nodes `0..n` in order.
    pub fn serial(coordinates: Coordinates, components: usize) -> Result<Self, FsiError> {
        let n = coordinates.len();
        Self::new((0..n).collect(), coordinates, n, components)
    }

    /// Attach boundary markers. Labels on unknown nodes are rejected.
    pub fn with_labels(mut self, labels: LabelSet) -> Result<Self, FsiError> {
        for marker in labels.stratum_values(BOUNDARY_LABEL) {
            for node in labels.stratum_points(BOUNDARY_LABEL, marker) {
                if self.position(node).is_none() {
                    return Err(FsiError::UnknownNode(node));
                }
            }
        }
        self.labels = labels;
        Ok(self)
    }

    #[inline]
    pub fn node_ids(&self) -> &[usize] {
        &self.node_ids
    }

    #[inline]
    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    #[inline]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    #[inline]
    pub fn total_nodes(&self) -> usize {
        self.total_nodes
    }

    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    #[inline]
    pub fn spatial_dimension(&self) -> usize {
        self.coordinates.dimension()
    }

    /// Global size of the field: one DOF per node and component.
    #[inline]
    pub fn num_dofs(&self) -> usize {
        self.total_nodes * self.components
    }

    /// Local position of global node `node`.
    pub fn position(&self, node: usize) -> Option<usize> {
        self.node_ids.binary_search(&node).ok()
    }

    pub fn point(&self, node: usize) -> Result<&[f64], FsiError> {
        self.position(node)
            .map(|i| self.coordinates.point(i))
            .ok_or(FsiError::UnknownNode(node))
    }

    /// Nodes carrying boundary `marker`, ascending.
    pub fn boundary_nodes(&self, marker: i32) -> Vec<usize> {
        self.labels.stratum_points(BOUNDARY_LABEL, marker)
    }

    /// Global DOF of component `d` at `node`.
    #[inline]
    pub fn component_dof(&self, node: usize, d: usize) -> usize {
        node + d * self.total_nodes
    }
}
