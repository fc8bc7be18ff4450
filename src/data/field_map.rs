//! Distributed index space of one physical field.
//!
//! A `FieldMap` records the global size of a field and the global ids owned
//! (uniquely) by the current rank. Contiguous maps are built with a prefix
//! sum over per-rank counts: owned ids are numbered by rank, ascending.
//! Vector fields use component-blocked numbering (`node + d * n_nodes`), so
//! their owned ids are an explicit list.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::algs::collective::rank_slice;
use crate::algs::communicator::Communicator;
use crate::fsi_error::FsiError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Owned {
    Contiguous(Range<usize>),
    Explicit(Vec<usize>),
}

/// Ownership of the global DOF numbering of one field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    global_size: usize,
    owned: Owned,
}

impl FieldMap {
    /// Map owning all `n` ids on a single rank.
    pub fn serial(n: usize) -> Self {
        Self {
            global_size: n,
            owned: Owned::Contiguous(0..n),
        }
    }

    /// Contiguous map: this rank owns `local` ids placed after those of all
    /// lower ranks.
    pub fn contiguous<C>(comm: &C, local: usize) -> Result<Self, FsiError>
    where
        C: Communicator + ?Sized,
    {
        let slice = rank_slice(comm, local)?;
        Ok(Self {
            global_size: slice.total,
            owned: Owned::Contiguous(slice.offset..slice.offset + slice.local),
        })
    }

    /// Map with an explicit list of owned ids in a space of `global_size`.
    ///
    /// Ids are stored sorted; duplicates and out-of-range ids are rejected.
    pub fn from_owned_ids(global_size: usize, mut ids: Vec<usize>) -> Result<Self, FsiError> {
        ids.sort_unstable();
        if let Some(&last) = ids.last() {
            if last >= global_size {
                return Err(FsiError::MapMismatch {
                    what: "owned id within global size",
                    expected: global_size,
                    found: last,
                });
            }
        }
        if let Some(w) = ids.windows(2).find(|w| w[0] == w[1]) {
            return Err(FsiError::MapMismatch {
                what: "unique owned id",
                expected: 1,
                found: w[0],
            });
        }
        Ok(Self {
            global_size,
            owned: Owned::Explicit(ids),
        })
    }

    /// Vector-field map: every owned node contributes one id per component.
    pub fn vector_field(
        n_nodes: usize,
        components: usize,
        owned_nodes: impl IntoIterator<Item = usize>,
    ) -> Result<Self, FsiError> {
        let nodes: Vec<usize> = owned_nodes.into_iter().collect();
        let ids = (0..components)
            .flat_map(|d| nodes.iter().map(move |&n| n + d * n_nodes))
            .collect();
        Self::from_owned_ids(n_nodes * components, ids)
    }

    #[inline]
    pub fn global_size(&self) -> usize {
        self.global_size
    }

    /// Number of ids owned by this rank.
    pub fn num_owned(&self) -> usize {
        match &self.owned {
            Owned::Contiguous(r) => r.len(),
            Owned::Explicit(ids) => ids.len(),
        }
    }

    /// Whether global id `gid` is owned by this rank.
    pub fn owns(&self, gid: usize) -> bool {
        match &self.owned {
            Owned::Contiguous(r) => r.contains(&gid),
            Owned::Explicit(ids) => ids.binary_search(&gid).is_ok(),
        }
    }

    /// Owned ids in ascending order.
    pub fn owned_ids(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        match &self.owned {
            Owned::Contiguous(r) => Box::new(r.clone()),
            Owned::Explicit(ids) => Box::new(ids.iter().copied()),
        }
    }

    pub fn is_contiguous(&self) -> bool {
        matches!(self.owned, Owned::Contiguous(_))
    }
}
