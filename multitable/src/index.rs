//! Open-addressing hash index with Robin Hood probing and backward-shift deletion.
//!
//! An index never stores keys. Each slot forwards to a row of the data table, and the rows
//! carry a cached hash code plus a back-index into every index. Probing compares cached hashes
//! first and only then asks the caller whether the row's key matches.

use std::marker::PhantomData;
use std::mem;

use crate::kind::IndexKind;
use crate::reduce::{advance, reduce, MIN_TABLE_LENGTH};
use crate::row::{BackIndexes, BackIndexesMut};
use crate::slot::{HashEntry, SearchResult};

#[derive(Clone, Debug)]
pub struct HashIndex<K> {
    slots: Vec<HashEntry>,
    occupied: usize,
    _kind: PhantomData<K>,
}

impl<K: IndexKind> HashIndex<K> {
    /// Creates an empty index with at least `length` slots.
    pub fn with_length(length: usize) -> Self {
        Self {
            slots: vec![HashEntry::UNUSED; length.max(MIN_TABLE_LENGTH)],
            occupied: 0,
            _kind: PhantomData,
        }
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots. For non-unique indices this counts distinct keys.
    #[inline]
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    #[inline]
    pub fn slots(&self) -> &[HashEntry] {
        &self.slots
    }

    /// Whether taking one more slot would push the load factor above `max_load`.
    #[inline]
    pub fn needs_growth(&self, max_load: f32) -> bool {
        (self.occupied + 1) as f64 > self.slots.len() as f64 * max_load as f64
    }

    /// Locates the key with hash code `hash`.
    ///
    /// `matches` is called with the stored row of every probed slot whose cached hash equals
    /// `hash`, and decides whether that row holds the searched key.
    pub fn find<A, F>(&self, rows: &A, hash: u32, mut matches: F) -> SearchResult
    where
        A: BackIndexes<K::Back> + ?Sized,
        F: FnMut(usize) -> bool,
    {
        let length = self.slots.len();
        let mut slot = reduce(hash, length);
        let mut drift_plus_one = 1;

        for _ in 0..length {
            let entry = self.slots[slot];

            if entry.is_unused() {
                return SearchResult::EmptyEntryFound {
                    slot,
                    drift_plus_one,
                };
            }

            let row = entry.forward_index;
            if rows.row_hash(row) == hash && matches(row) {
                return SearchResult::ItemFound {
                    slot,
                    drift_plus_one,
                    row,
                };
            }

            if entry.drift_plus_one < drift_plus_one {
                return SearchResult::SearchStopped {
                    slot,
                    drift_plus_one,
                };
            }

            slot = advance(slot, length);
            drift_plus_one += 1;
        }

        panic!("probe visited all {length} slots without terminating; the index is corrupted");
    }

    /// Adds `row` to the index at the position found by [`find`](Self::find).
    ///
    /// # Panics
    ///
    /// Panics when a unique index is handed an [`SearchResult::ItemFound`], or when a new key
    /// is added to an index without an empty slot.
    pub fn add<A>(&mut self, rows: &mut A, result: SearchResult, row: usize)
    where
        A: BackIndexesMut<K::Back> + ?Sized,
    {
        match result {
            SearchResult::ItemFound { row: head, .. } => K::append(rows, head, row),
            SearchResult::EmptyEntryFound {
                slot,
                drift_plus_one,
            }
            | SearchResult::SearchStopped {
                slot,
                drift_plus_one,
            } => {
                let length = self.slots.len();
                assert!(
                    self.occupied < length,
                    "all {length} slots are occupied; the index has to grow before adding a key"
                );
                rows.set_back_index(row, K::Back::default());
                self.place(rows, slot, drift_plus_one, row);
                self.occupied += 1;
            }
        }
    }

    /// Removes `row` from the index using its back-index.
    pub fn remove<A>(&mut self, rows: &mut A, row: usize)
    where
        A: BackIndexesMut<K::Back> + ?Sized,
    {
        if let Some(slot) = K::unlink(&mut self.slots, rows, row) {
            self.vacate(rows, slot);
            self.occupied -= 1;
        }
    }

    /// Repairs the references to the row that was moved to position `row`.
    ///
    /// The moved row's back-index has to be intact, only the references to its old position
    /// are rewritten.
    pub fn relocate<A>(&mut self, rows: &mut A, row: usize)
    where
        A: BackIndexesMut<K::Back> + ?Sized,
    {
        K::relocate(&mut self.slots, rows, row);
    }

    /// Rebuilds the index with `length` slots.
    ///
    /// Every stored row is probed again, chains move with their head and keep their order.
    ///
    /// # Panics
    ///
    /// Panics when `length` can not hold every occupied slot plus one empty slot.
    pub fn resize<A>(&mut self, rows: &mut A, length: usize)
    where
        A: BackIndexesMut<K::Back> + ?Sized,
    {
        let length = length.max(MIN_TABLE_LENGTH);
        assert!(
            length > self.occupied,
            "can not fit {} keys into {length} slots",
            self.occupied
        );

        let old = mem::replace(&mut self.slots, vec![HashEntry::UNUSED; length]);
        for entry in old.iter().filter(|entry| !entry.is_unused()) {
            let row = entry.forward_index;
            let result = self.find(&*rows, rows.row_hash(row), |_| false);
            self.place(rows, result.slot(), result.drift_plus_one(), row);
        }
    }

    /// Drops every slot and allocates `length` empty ones.
    pub fn clear(&mut self, length: usize) {
        self.slots = vec![HashEntry::UNUSED; length.max(MIN_TABLE_LENGTH)];
        self.occupied = 0;
    }

    /// Stores `row` in `slot`, shifting the run of occupied slots starting there forward by one.
    fn place<A>(&mut self, rows: &mut A, slot: usize, drift_plus_one: u32, row: usize)
    where
        A: BackIndexesMut<K::Back> + ?Sized,
    {
        let length = self.slots.len();
        let mut slot = slot;
        let mut carry = HashEntry::new(drift_plus_one, row);

        loop {
            let displaced = mem::replace(&mut self.slots[slot], carry);
            rows.update_back_index(carry.forward_index, |back| K::anchor(back, slot));

            if displaced.is_unused() {
                return;
            }

            carry = HashEntry::new(displaced.drift_plus_one + 1, displaced.forward_index);
            slot = advance(slot, length);
        }
    }

    /// Empties `slot` and shifts the following displaced entries back into the gap.
    fn vacate<A>(&mut self, rows: &mut A, slot: usize)
    where
        A: BackIndexesMut<K::Back> + ?Sized,
    {
        let length = self.slots.len();
        let mut hole = slot;
        self.slots[hole] = HashEntry::UNUSED;

        loop {
            let next = advance(hole, length);
            let entry = self.slots[next];
            if entry.drift_plus_one <= 1 {
                break;
            }

            self.slots[hole] = HashEntry::new(entry.drift_plus_one - 1, entry.forward_index);
            self.slots[next] = HashEntry::UNUSED;
            let moved_to = hole;
            rows.update_back_index(entry.forward_index, |back| K::anchor(back, moved_to));
            hole = next;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::kind::{NonUnique, Unique};
    use crate::slot::{MultiIndex, NO_NEXT};

    /// Rows with explicit hash codes and keys, standing in for the data table.
    #[derive(Debug, Default)]
    pub(crate) struct FakeRows<B> {
        pub hashes: Vec<u32>,
        pub keys: Vec<u32>,
        pub backs: Vec<B>,
    }

    impl<B: Copy + Default> FakeRows<B> {
        pub fn push(&mut self, key: u32, hash: u32) -> usize {
            self.hashes.push(hash);
            self.keys.push(key);
            self.backs.push(B::default());
            self.keys.len() - 1
        }
    }

    impl<B: Copy> BackIndexes<B> for FakeRows<B> {
        fn row_count(&self) -> usize {
            self.keys.len()
        }

        fn row_hash(&self, row: usize) -> u32 {
            self.hashes[row]
        }

        fn back_index(&self, row: usize) -> B {
            self.backs[row]
        }
    }

    impl<B: Copy> BackIndexesMut<B> for FakeRows<B> {
        fn set_back_index(&mut self, row: usize, back: B) {
            self.backs[row] = back;
        }
    }

    fn insert<K: IndexKind>(
        index: &mut HashIndex<K>,
        rows: &mut FakeRows<K::Back>,
        key: u32,
        hash: u32,
    ) -> usize {
        let row = rows.push(key, hash);
        let result = index.find(&*rows, hash, |other| rows.keys[other] == key);
        index.add(rows, result, row);
        index.check("test", &*rows).unwrap();
        row
    }

    /// Removes `row` the way the table does: unlink, swap with the last row, repair.
    fn remove<K: IndexKind>(index: &mut HashIndex<K>, rows: &mut FakeRows<K::Back>, row: usize) {
        index.remove(rows, row);
        rows.hashes.swap_remove(row);
        rows.keys.swap_remove(row);
        rows.backs.swap_remove(row);
        if row < rows.keys.len() {
            index.relocate(rows, row);
        }
        index.check("test", &*rows).unwrap();
    }

    fn lookup<K: IndexKind>(
        index: &HashIndex<K>,
        rows: &FakeRows<K::Back>,
        key: u32,
        hash: u32,
    ) -> SearchResult {
        index.find(rows, hash, |row| rows.keys[row] == key)
    }

    fn occupied(index: &HashIndex<impl IndexKind>) -> Vec<(usize, u32, usize)> {
        index
            .slots()
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_unused())
            .map(|(slot, entry)| (slot, entry.drift_plus_one, entry.forward_index))
            .collect()
    }

    #[test]
    fn unique_probe_sequence() {
        let mut index = HashIndex::<Unique>::with_length(8);
        let mut rows = FakeRows::default();

        let a = insert(&mut index, &mut rows, 10, 1);
        let b = insert(&mut index, &mut rows, 11, 9);
        let c = insert(&mut index, &mut rows, 12, 2);

        assert_eq!(occupied(&index), vec![(1, 1, a), (2, 2, b), (3, 2, c)]);
        assert_eq!(rows.backs, vec![1, 2, 3]);
    }

    #[test]
    fn stopped_search_shifts_run_forward() {
        let mut index = HashIndex::<Unique>::with_length(8);
        let mut rows = FakeRows::default();

        let a = insert(&mut index, &mut rows, 10, 1);
        let b = insert(&mut index, &mut rows, 11, 2);
        let c = insert(&mut index, &mut rows, 12, 3);

        // Home slot 1 is taken by `a`; `b` and `c` sit at home with drift 0 and must make room.
        let result = lookup(&index, &rows, 13, 1);
        assert_eq!(
            result,
            SearchResult::SearchStopped {
                slot: 2,
                drift_plus_one: 2
            }
        );
        let d = insert(&mut index, &mut rows, 13, 1);

        assert_eq!(
            occupied(&index),
            vec![(1, 1, a), (2, 2, d), (3, 2, b), (4, 2, c)]
        );
        assert_eq!(rows.backs, vec![1, 3, 4, 2]);
    }

    #[test]
    fn probe_wraps_around_the_end() {
        let mut index = HashIndex::<Unique>::with_length(8);
        let mut rows = FakeRows::default();

        let a = insert(&mut index, &mut rows, 1, 7);
        let b = insert(&mut index, &mut rows, 2, 15);
        let c = insert(&mut index, &mut rows, 3, 0);

        assert_eq!(occupied(&index), vec![(0, 2, b), (1, 2, c), (7, 1, a)]);

        remove(&mut index, &mut rows, a);
        // `b` moved back to its home slot and `c` followed it; row `c` took the freed row index.
        assert_eq!(occupied(&index), vec![(0, 1, 0), (7, 1, 1)]);
        assert_eq!(rows.keys, vec![3, 2]);
    }

    #[test]
    fn lookups_survive_removals() {
        let mut index = HashIndex::<Unique>::with_length(16);
        let mut rows = FakeRows::default();

        for key in 0..12 {
            insert(&mut index, &mut rows, key, key % 5);
        }
        for key in [3, 7, 0, 11] {
            let row = lookup(&index, &rows, key, key % 5).found().unwrap();
            remove(&mut index, &mut rows, row);
        }

        for key in 0..12 {
            let found = lookup(&index, &rows, key, key % 5).found();
            if [3, 7, 0, 11].contains(&key) {
                assert_eq!(found, None);
            } else {
                assert_eq!(rows.keys[found.unwrap()], key);
            }
        }
    }

    #[test]
    fn removing_fresh_row_restores_slots() {
        let mut index = HashIndex::<Unique>::with_length(16);
        let mut rows = FakeRows::default();
        for key in 0..9 {
            insert(&mut index, &mut rows, key, key * 7 % 4);
        }
        let before = index.slots().to_vec();

        let row = insert(&mut index, &mut rows, 100, 1);
        remove(&mut index, &mut rows, row);

        assert_eq!(index.slots(), &before[..]);
    }

    #[test]
    #[should_panic(expected = "unique index")]
    fn unique_rejects_found_key() {
        let mut index = HashIndex::<Unique>::with_length(8);
        let mut rows = FakeRows::default();
        insert(&mut index, &mut rows, 1, 1);
        insert(&mut index, &mut rows, 1, 1);
    }

    /// Invariant: a new key never enters an index without an empty slot.
    #[test]
    #[should_panic(expected = "slots are occupied")]
    fn adding_to_full_index_panics() {
        let mut index = HashIndex::<Unique>::with_length(4);
        let mut rows = FakeRows::default();
        for key in 0..4 {
            insert(&mut index, &mut rows, key, 1);
        }
        assert_eq!(index.occupied(), 4);

        let row = rows.push(4, 0);
        let result = lookup(&index, &rows, 4, 0);
        assert_eq!(
            result,
            SearchResult::SearchStopped {
                slot: 1,
                drift_plus_one: 2
            }
        );
        index.add(&mut rows, result, row);
    }

    #[test]
    fn chain_keeps_insertion_order() {
        let mut index = HashIndex::<NonUnique>::with_length(8);
        let mut rows = FakeRows::default();

        let a = insert(&mut index, &mut rows, 5, 1);
        let b = insert(&mut index, &mut rows, 5, 1);
        let c = insert(&mut index, &mut rows, 5, 1);

        assert_eq!(lookup(&index, &rows, 5, 1).found(), Some(a));
        assert_eq!(occupied(&index), vec![(1, 1, a)]);
        assert_eq!(index.occupied(), 1);

        assert_eq!(
            rows.backs[a],
            MultiIndex {
                is_subsequent: false,
                previous: 1,
                next: b
            }
        );
        assert_eq!(
            rows.backs[b],
            MultiIndex {
                is_subsequent: true,
                previous: a,
                next: c
            }
        );
        assert_eq!(rows.backs[c], MultiIndex::subsequent(b));
    }

    #[test]
    fn removing_head_promotes_next() {
        let mut index = HashIndex::<NonUnique>::with_length(8);
        let mut rows = FakeRows::default();

        let a = insert(&mut index, &mut rows, 5, 1);
        insert(&mut index, &mut rows, 5, 1);
        insert(&mut index, &mut rows, 5, 1);

        remove(&mut index, &mut rows, a);

        // The second row is now head; the third row was moved into position 0.
        assert_eq!(rows.keys.len(), 2);
        assert_eq!(index.slots()[1].forward_index, 1);
        assert_eq!(
            rows.backs[1],
            MultiIndex {
                is_subsequent: false,
                previous: 1,
                next: 0
            }
        );
        assert_eq!(rows.backs[0], MultiIndex::subsequent(1));
    }

    #[test]
    fn removing_middle_and_tail_links() {
        let mut index = HashIndex::<NonUnique>::with_length(8);
        let mut rows = FakeRows::default();

        let a = insert(&mut index, &mut rows, 5, 3);
        let b = insert(&mut index, &mut rows, 5, 3);
        insert(&mut index, &mut rows, 5, 3);
        insert(&mut index, &mut rows, 6, 3);

        remove(&mut index, &mut rows, b);
        assert_eq!(index.occupied(), 2);
        remove(&mut index, &mut rows, a);
        let head = lookup(&index, &rows, 5, 3).found().unwrap();
        assert_eq!(rows.backs[head].next, NO_NEXT);

        remove(&mut index, &mut rows, head);
        assert_eq!(lookup(&index, &rows, 5, 3).found(), None);
        assert_eq!(index.occupied(), 1);
        let other = lookup(&index, &rows, 6, 3).found().unwrap();
        assert_eq!(index.slots()[3].forward_index, other);
        assert_eq!(index.slots()[3].drift_plus_one, 1);
    }

    #[test]
    fn resize_preserves_chains_and_lookups() {
        let mut index = HashIndex::<NonUnique>::with_length(4);
        let mut rows = FakeRows::default();

        insert(&mut index, &mut rows, 1, 17);
        insert(&mut index, &mut rows, 2, 33);
        insert(&mut index, &mut rows, 1, 17);
        insert(&mut index, &mut rows, 3, 6);

        index.resize(&mut rows, 32);
        index.check("test", &rows).unwrap();
        assert_eq!(index.len(), 32);
        assert_eq!(index.occupied(), 3);

        let head = lookup(&index, &rows, 1, 17).found().unwrap();
        assert_eq!(head, 0);
        assert_eq!(rows.backs[0].next, 2);
        assert_eq!(index.slots()[17].forward_index, 0);
        assert_eq!(lookup(&index, &rows, 2, 33).found(), Some(1));
        assert_eq!(lookup(&index, &rows, 3, 6).found(), Some(3));
    }

    #[test]
    #[should_panic(expected = "can not fit")]
    fn resize_below_occupied_panics() {
        let mut index = HashIndex::<Unique>::with_length(8);
        let mut rows = FakeRows::default();
        for key in 0..5 {
            insert(&mut index, &mut rows, key, key);
        }
        index.resize(&mut rows, 5);
    }

    #[test]
    fn growth_threshold() {
        let mut index = HashIndex::<Unique>::with_length(4);
        let mut rows = FakeRows::default();
        assert!(!index.needs_growth(0.8));
        for key in 0..3 {
            insert(&mut index, &mut rows, key, key);
        }
        assert!(index.needs_growth(0.8));
        assert!(!index.needs_growth(1.0));
    }
}
