//! Sparse record of player-caused deviations from canonical cell content.

use std::collections::BTreeMap;

use geocache_core::{CellCoord, TokenValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    content: Option<TokenValue>,
    stamp: u64,
}

/// Mapping from cell coordinate to the content the player left behind.
///
/// An entry shadows the generator for its cell for the lifetime of the save,
/// including entries that record an emptied cell. Entries are only dropped by
/// [`OverrideStore::clear`] or, when a capacity is configured, by evicting the
/// least recently modified entry.
#[derive(Clone, Debug, Default)]
pub struct OverrideStore {
    entries: BTreeMap<CellCoord, Entry>,
    by_stamp: BTreeMap<u64, CellCoord>,
    next_stamp: u64,
    capacity: Option<usize>,
}

impl OverrideStore {
    /// Creates an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that retains at most `capacity` entries when provided.
    #[must_use]
    pub fn with_capacity_limit(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Recorded override for `cell`.
    ///
    /// The outer `None` means no override exists and the caller should fall
    /// back to canonical content; `Some(None)` records an emptied cell.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<Option<TokenValue>> {
        self.entries.get(&cell).map(|entry| entry.content)
    }

    /// Creates or overwrites the override for `cell`.
    ///
    /// Returns the cell evicted to honour the capacity limit, if any.
    pub fn set(&mut self, cell: CellCoord, content: Option<TokenValue>) -> Option<CellCoord> {
        let stamp = self.next_stamp;
        self.next_stamp = self.next_stamp.wrapping_add(1);

        if let Some(previous) = self.entries.insert(cell, Entry { content, stamp }) {
            let _ = self.by_stamp.remove(&previous.stamp);
        }
        let _ = self.by_stamp.insert(stamp, cell);

        self.evict_over_capacity()
    }

    /// Number of recorded overrides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no override is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates recorded overrides in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, Option<TokenValue>)> + '_ {
        self.entries
            .iter()
            .map(|(cell, entry)| (*cell, entry.content))
    }

    /// Drops every recorded override.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_stamp.clear();
        self.next_stamp = 0;
    }

    fn evict_over_capacity(&mut self) -> Option<CellCoord> {
        let capacity = self.capacity?;
        if self.entries.len() <= capacity {
            return None;
        }

        let (_, oldest) = self.by_stamp.pop_first()?;
        let _ = self.entries.remove(&oldest);
        tracing::debug!(cell = %oldest, capacity, "evicted least recently modified override");
        Some(oldest)
    }
}
