//! Sparse set of state IDs with O(1) clear.
//!
//! Based on: https://research.swtch.com/sparse
//!
//! Frontiers are rebuilt once per token and per candidate spelling, so
//! clearing has to be cheap. Membership and insertion are O(1); iteration
//! follows insertion order.

use super::arena::StateId;

/// A set of states of one automaton.
///
/// Capacity is the arena size; inserting an ID beyond it panics.
#[derive(Clone, Debug)]
pub struct StateSet {
    len: usize,
    /// IDs in insertion order.
    dense: Vec<StateId>,
    /// ID -> position in `dense`. An ID is present iff
    /// `sparse[id] < len && dense[sparse[id]] == id`.
    sparse: Vec<usize>,
}

impl StateSet {
    pub fn new(capacity: usize) -> Self {
        StateSet {
            len: 0,
            dense: vec![StateId::from_index(0); capacity],
            sparse: vec![0; capacity],
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert an ID. Returns true if it was not already present.
    #[inline]
    pub fn insert(&mut self, id: StateId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.dense[self.len] = id;
        self.sparse[id.index()] = self.len;
        self.len += 1;
        true
    }

    #[inline]
    pub fn contains(&self, id: StateId) -> bool {
        let idx = self.sparse[id.index()];
        idx < self.len && self.dense[idx] == id
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = StateId> + '_ {
        self.dense[..self.len].iter().copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[StateId] {
        &self.dense[..self.len]
    }

    /// Replace the contents with those of `other`.
    pub fn copy_from(&mut self, other: &StateSet) {
        self.clear();
        for id in other.iter() {
            self.insert(id);
        }
    }
}
