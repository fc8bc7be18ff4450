//! Boundary markers of mesh nodes.
//!
//! Labels map node id → integer marker, grouped by label name. The interface
//! and every boundary condition select their nodes through a
//! `(name, value)` stratum of this set.

use std::collections::HashMap;

/// Label name under which boundary markers are stored.
pub const BOUNDARY_LABEL: &str = "boundary";

/// Named integer labels for mesh nodes.
#[derive(Clone, Debug, Default)]
pub struct LabelSet {
    labels: HashMap<String, HashMap<usize, i32>>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` for `node` under label `name`.
    ///
    /// Returns the previous value, if any.
    pub fn set_label(&mut self, node: usize, name: &str, value: i32) -> Option<i32> {
        self.labels
            .entry(name.to_string())
            .or_default()
            .insert(node, value)
    }

    /// Shorthand for a marker under [`BOUNDARY_LABEL`].
    pub fn mark_boundary(&mut self, node: usize, marker: i32) -> Option<i32> {
        self.set_label(node, BOUNDARY_LABEL, marker)
    }

    pub fn get_label(&self, node: usize, name: &str) -> Option<i32> {
        self.labels
            .get(name)
            .and_then(|map| map.get(&node).copied())
    }

    /// Number of nodes with label `name == value`.
    pub fn stratum_size(&self, name: &str, value: i32) -> usize {
        self.labels.get(name).map_or(0, |map| {
            map.values()
                .filter(|&&label_value| label_value == value)
                .count()
        })
    }

    /// All nodes with label `name == value`, ascending.
    pub fn stratum_points(&self, name: &str, value: i32) -> Vec<usize> {
        let mut nodes: Vec<usize> = self
            .labels
            .get(name)
            .into_iter()
            .flat_map(|map| {
                map.iter()
                    .filter_map(move |(&node, &v)| (v == value).then_some(node))
            })
            .collect();
        nodes.sort_unstable();
        nodes
    }

    /// Distinct values stored for label `name`, ascending.
    pub fn stratum_values(&self, name: &str) -> Vec<i32> {
        let mut values: Vec<i32> = self
            .labels
            .get(name)
            .map_or_else(Vec::new, |map| map.values().copied().collect());
        values.sort_unstable();
        values.dedup();
        values
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
