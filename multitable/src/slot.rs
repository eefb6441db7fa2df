//! Fixed-layout values shared by every index: hash slots, chain links and probe outcomes.

/// Marks an empty slot. Occupied slots store their drift plus one, so a drift of zero is `1`.
pub const DRIFT_FOR_UNUSED: u32 = 0;

/// Terminates a chain of rows sharing a key.
pub const NO_NEXT: usize = usize::MAX;

/// Placeholder slot of a link that has not been anchored yet.
pub(crate) const NO_SLOT: usize = usize::MAX;

/// One slot of an index's hash table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashEntry {
    /// Probe distance from the ideal slot plus one, or [`DRIFT_FOR_UNUSED`].
    pub drift_plus_one: u32,
    /// Row stored in this slot. For non-unique indices this is the head of the key's chain.
    pub forward_index: usize,
}

impl HashEntry {
    pub const UNUSED: HashEntry = HashEntry {
        drift_plus_one: DRIFT_FOR_UNUSED,
        forward_index: 0,
    };

    #[inline]
    pub fn new(drift_plus_one: u32, forward_index: usize) -> Self {
        debug_assert_ne!(drift_plus_one, DRIFT_FOR_UNUSED);
        Self {
            drift_plus_one,
            forward_index,
        }
    }

    #[inline]
    pub fn is_unused(&self) -> bool {
        self.drift_plus_one == DRIFT_FOR_UNUSED
    }

    /// Number of probe steps between this entry and its ideal slot.
    #[inline]
    pub fn drift(&self) -> Option<u32> {
        self.drift_plus_one.checked_sub(1)
    }
}

impl Default for HashEntry {
    fn default() -> Self {
        Self::UNUSED
    }
}

/// Back-index of a row in a non-unique index.
///
/// Rows sharing a key form a chain. Only the head is reachable from the hash table; its
/// `previous` is the slot holding it. Subsequent links point back at the previous row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MultiIndex {
    pub is_subsequent: bool,
    pub previous: usize,
    pub next: usize,
}

impl MultiIndex {
    /// A lone chain head stored in `slot`.
    #[inline]
    pub fn head(slot: usize) -> Self {
        Self {
            is_subsequent: false,
            previous: slot,
            next: NO_NEXT,
        }
    }

    /// A chain tail following row `previous`.
    #[inline]
    pub fn subsequent(previous: usize) -> Self {
        Self {
            is_subsequent: true,
            previous,
            next: NO_NEXT,
        }
    }

    #[inline]
    pub fn is_head(&self) -> bool {
        !self.is_subsequent
    }

    #[inline]
    pub fn has_next(&self) -> bool {
        self.next != NO_NEXT
    }
}

impl Default for MultiIndex {
    fn default() -> Self {
        Self::head(NO_SLOT)
    }
}

/// Where a probe ended.
///
/// Every case carries the slot and the candidate's drift plus one at that slot, so adding after
/// a search never probes again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchResult {
    /// The key is absent and `slot` is empty.
    EmptyEntryFound { slot: usize, drift_plus_one: u32 },
    /// The key is absent and belongs in `slot`, whose occupant has to move forward.
    SearchStopped { slot: usize, drift_plus_one: u32 },
    /// The key is present. `row` is the stored row, or the chain head for non-unique indices.
    ItemFound {
        slot: usize,
        drift_plus_one: u32,
        row: usize,
    },
}

impl SearchResult {
    #[inline]
    pub fn slot(&self) -> usize {
        match *self {
            SearchResult::EmptyEntryFound { slot, .. }
            | SearchResult::SearchStopped { slot, .. }
            | SearchResult::ItemFound { slot, .. } => slot,
        }
    }

    #[inline]
    pub fn drift_plus_one(&self) -> u32 {
        match *self {
            SearchResult::EmptyEntryFound { drift_plus_one, .. }
            | SearchResult::SearchStopped { drift_plus_one, .. }
            | SearchResult::ItemFound { drift_plus_one, .. } => drift_plus_one,
        }
    }

    /// The row found by the search, if any.
    #[inline]
    pub fn found(&self) -> Option<usize> {
        match *self {
            SearchResult::ItemFound { row, .. } => Some(row),
            _ => None,
        }
    }
}
