//! The order in which candidate messages are inspected.

use crate::types::Uid;

/// Which of several matching messages gets looked at first.
///
/// Search results arrive oldest first. With the default, [`SelectionOrder::FirstThenNewest`],
/// the oldest message is examined first, then the rest from newest to second-oldest.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum SelectionOrder {
    /// Index `0`, then `n-1, n-2, ..., 1`.
    #[default]
    FirstThenNewest,
    /// Search order: `0, 1, ..., n-1`.
    OldestFirst,
    /// Reverse search order: `n-1, ..., 1, 0`.
    NewestFirst,
}

impl SelectionOrder {
    /// The positions in a search result of length `len`, in visiting order.
    pub fn indices(&self, len: usize) -> Vec<usize> {
        match *self {
            SelectionOrder::FirstThenNewest => (0..len.min(1)).chain((1..len).rev()).collect(),
            SelectionOrder::OldestFirst => (0..len).collect(),
            SelectionOrder::NewestFirst => (0..len).rev().collect(),
        }
    }

    /// `uids` rearranged into visiting order.
    pub fn arrange(&self, uids: &[Uid]) -> Vec<Uid> {
        self.indices(uids.len()).into_iter().map(|i| uids[i]).collect()
    }
}
