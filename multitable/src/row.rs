//! Rows of the data table and the view an index has of them.

/// One row of the data table.
///
/// The row's position in the table is its data index. `hashes` caches one hash code per
/// declared index and `back_indexes` holds one reference into every index.
#[derive(Clone, Debug, PartialEq)]
pub struct DataEntry<T, H, B> {
    pub item: T,
    pub hashes: H,
    pub back_indexes: B,
}

impl<T, H, B: Default> DataEntry<T, H, B> {
    pub fn new(item: T, hashes: H) -> Self {
        Self {
            item,
            hashes,
            back_indexes: B::default(),
        }
    }
}

/// Read access to the cached hash and back-index of each row, as seen by a single index.
pub trait BackIndexes<B> {
    fn row_count(&self) -> usize;
    fn row_hash(&self, row: usize) -> u32;
    fn back_index(&self, row: usize) -> B;
}

/// Write access to back-indexes. Inserts, removals and resizes of both index kinds go through
/// this one capability.
pub trait BackIndexesMut<B>: BackIndexes<B> {
    fn set_back_index(&mut self, row: usize, back: B);

    #[inline]
    fn update_back_index(&mut self, row: usize, f: impl FnOnce(B) -> B) {
        let back = self.back_index(row);
        self.set_back_index(row, f(back));
    }
}
