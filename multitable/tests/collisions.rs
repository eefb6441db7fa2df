use std::hash::{BuildHasher, Hasher};

use multitable::{Error, MultiTable, SearchResult, TableOptions};

/// Hashes every key to the same code, so every key lands in one probe run.
#[derive(Clone, Copy, Debug, Default)]
struct ConstState;

struct ConstHasher;

impl Hasher for ConstHasher {
    fn finish(&self) -> u64 {
        0
    }

    fn write(&mut self, _bytes: &[u8]) {}
}

impl BuildHasher for ConstState {
    type Hasher = ConstHasher;

    fn build_hasher(&self) -> ConstHasher {
        ConstHasher
    }
}

/// Folds the written bytes into one of a few codes.
#[derive(Clone, Copy, Debug, Default)]
struct FewState;

#[derive(Default)]
struct FewHasher(u64);

impl Hasher for FewHasher {
    fn finish(&self) -> u64 {
        self.0 % 5
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 = self.0.wrapping_mul(31).wrapping_add(*byte as u64);
        }
    }
}

impl BuildHasher for FewState {
    type Hasher = FewHasher;

    fn build_hasher(&self) -> FewHasher {
        FewHasher::default()
    }
}

#[derive(Debug, Clone, PartialEq, MultiTable)]
#[multitable(index(fields(id), unique))]
#[multitable(index(fields(group)))]
pub struct Key {
    id: u32,
    group: u32,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn probe_id<H: BuildHasher>(table: &key::Table<H>, id: u32) -> SearchResult {
    let hash = table.hash_key(&id);
    table.probe::<key::Index0, _>(hash, |row| row.id == id)
}

/// Invariant: with one shared hash code, keys are placed in consecutive slots in insertion
/// order, and removal shifts the run back.
#[test]
fn shared_hash_builds_one_run() {
    init_tracing();
    let options = TableOptions::default().with_initial_length(16);
    let mut table = key::Table::with_options_and_hasher(options, ConstState).unwrap();

    for id in [10, 20, 30] {
        table.insert(Key { id, group: 0 }).unwrap();
    }
    assert_eq!(
        probe_id(&table, 30),
        SearchResult::ItemFound {
            slot: 2,
            drift_plus_one: 3,
            row: 2
        }
    );

    // Row 0 goes, row 2 moves into position 0 and the run shifts back by one slot.
    let removed = table.remove(0).unwrap();
    assert_eq!(removed.item, Key { id: 10, group: 0 });
    assert_eq!(removed.relocated_from, Some(2));
    assert_eq!(
        probe_id(&table, 30),
        SearchResult::ItemFound {
            slot: 1,
            drift_plus_one: 2,
            row: 0
        }
    );
    assert_eq!(
        probe_id(&table, 40),
        SearchResult::EmptyEntryFound {
            slot: 2,
            drift_plus_one: 3
        }
    );
    assert_eq!(table.get_by_group(&0).collect::<Vec<_>>(), [1, 0]);
    table.check().unwrap();
}

/// Invariant: every lookup stays correct when all keys collide, across growth and removals.
#[test]
fn lookups_with_colliding_hashes() {
    init_tracing();
    let mut table = key::Table::with_hasher(ConstState);

    for id in 0..64 {
        table.insert(Key { id, group: id % 4 }).unwrap();
        table.check().unwrap();
    }
    assert_eq!(
        table.insert(Key { id: 5, group: 9 }),
        Err(Error::DuplicateKey {
            index: "get_by_id",
            row: 5
        })
    );

    for id in (0..64).step_by(3) {
        let row = table.get_by_id(&id).unwrap();
        table.remove(row).unwrap();
        table.check().unwrap();
    }

    for id in 0..64 {
        let found = table.get_by_id(&id);
        assert_eq!(found.is_some(), id % 3 != 0);
        if let Some(row) = found {
            assert_eq!(table.get(row).map(|key| key.id), Some(id));
        }
    }
    for group in 0..4 {
        let mut ids: Vec<u32> = table
            .get_by_group(&group)
            .map(|row| table.get(row).unwrap().id)
            .collect();
        ids.sort();
        let expected: Vec<u32> = (0..64).filter(|id| id % 3 != 0 && id % 4 == group).collect();
        assert_eq!(ids, expected);
    }
}

/// Invariant: distinct keys sharing a hash code keep separate chains.
#[test]
fn chains_with_shared_hash_stay_apart() {
    let mut table = key::Table::with_hasher(FewState);
    for id in 0..100 {
        table.insert(Key { id, group: id % 10 }).unwrap();
    }
    table.check().unwrap();

    for group in 0..10 {
        let ids: Vec<u32> = table
            .get_by_group(&group)
            .map(|row| table.get(row).unwrap().id)
            .collect();
        let expected: Vec<u32> = (0..100).filter(|id| id % 10 == group).collect();
        assert_eq!(ids, expected);
    }
    assert_eq!(table.index::<key::Index1>().occupied(), 10);
}

/// Invariant: a row joining an existing chain takes no slot and never grows its index.
#[test]
fn chain_append_does_not_grow_index() {
    let mut table = key::Table::new();
    for group in 0..12 {
        table.insert(Key { id: group, group }).unwrap();
    }
    assert_eq!(table.index::<key::Index1>().len(), 16);
    assert_eq!(table.index::<key::Index1>().occupied(), 12);

    table.insert(Key { id: 100, group: 0 }).unwrap();
    assert_eq!(table.index::<key::Index1>().len(), 16);
    assert_eq!(table.index::<key::Index1>().occupied(), 12);
    assert_eq!(table.get_by_group(&0).collect::<Vec<_>>(), [0, 12]);

    // A new key at the same load does grow the index.
    table.insert(Key { id: 101, group: 12 }).unwrap();
    assert_eq!(table.index::<key::Index1>().len(), 32);
    assert_eq!(table.index::<key::Index1>().occupied(), 13);
    table.check().unwrap();
}

#[test]
fn reserve_prevents_growth() {
    let mut table = key::Table::new();
    table.reserve(100);
    let lengths = (
        table.index::<key::Index0>().len(),
        table.index::<key::Index1>().len(),
    );
    assert!(lengths.0 >= 125);

    for id in 0..100 {
        table.insert(Key { id, group: id }).unwrap();
    }
    assert_eq!(
        (
            table.index::<key::Index0>().len(),
            table.index::<key::Index1>().len(),
        ),
        lengths
    );
    table.check().unwrap();
}

#[test]
fn resize_never_drops_below_keys() {
    let mut table = key::Table::with_hasher(FewState);
    for id in 0..10 {
        table.insert(Key { id, group: 0 }).unwrap();
    }

    table.resize(4);
    assert_eq!(table.index::<key::Index0>().len(), 13);
    assert_eq!(table.index::<key::Index1>().len(), 4);
    table.check().unwrap();

    table.resize(64);
    assert_eq!(table.index::<key::Index0>().len(), 64);
    assert_eq!(table.get_by_group(&0).count(), 10);
    table.check().unwrap();
}

#[test]
fn clear_resets_rows_and_indices() {
    let mut table = key::Table::new();
    for id in 0..40 {
        table.insert(Key { id, group: 1 }).unwrap();
    }
    table.clear();

    assert!(table.is_empty());
    assert_eq!(table.index::<key::Index0>().len(), 16);
    assert_eq!(table.index::<key::Index0>().occupied(), 0);
    assert_eq!(table.get_by_group(&1).count(), 0);
    assert_eq!(table.insert(Key { id: 3, group: 1 }).unwrap(), 0);
    table.check().unwrap();
}

#[test]
fn invalid_options_are_rejected() {
    for options in [
        TableOptions::default().with_max_load(1.0),
        TableOptions::default().with_max_load(0.0),
        TableOptions::default().with_growth_factor(1),
        TableOptions::default().with_initial_length(0),
    ] {
        assert!(matches!(
            key::Table::with_options(options),
            Err(Error::InvalidOptions(_))
        ));
    }
}

#[test]
fn options_are_kept() {
    let options = TableOptions::default()
        .with_initial_length(8)
        .with_max_load(0.5);
    let table = key::Table::with_options(options.clone()).unwrap();
    assert_eq!(table.options(), &options);
    assert_eq!(table.index::<key::Index0>().len(), 8);
}

#[test]
fn clone_is_independent() {
    let mut table = key::Table::new();
    table.insert(Key { id: 1, group: 1 }).unwrap();
    let copy = table.clone();
    table.remove(0).unwrap();

    assert_eq!(copy.get_by_id(&1), Some(0));
    assert_eq!(table.get_by_id(&1), None);
    copy.check().unwrap();
}
