//! Static description of a table: its row type and the indices declared over it.
//!
//! The `MultiTable` derive generates these impls. The index set is a cons list of
//! [`Index`] handlers, `(Index<S, A>, (Index<S, B>, ()))`, so every operation that touches all
//! indices is unrolled at compile time without knowing how many there are.

use std::fmt;
use std::hash::BuildHasher;
use std::marker::PhantomData;

use tracing::debug;

use crate::error::ConsistencyError;
use crate::index::HashIndex;
use crate::kind::IndexKind;
use crate::options::TableOptions;
use crate::row::{BackIndexes, BackIndexesMut, DataEntry};
use crate::slot::SearchResult;

/// Row of the data table of schema `S`.
pub type Entry<S> = DataEntry<<S as Schema>::Row, <S as Schema>::Hashes, <S as Schema>::Backs>;

pub trait Schema: Sized + 'static {
    type Row;
    /// One hash code per declared index.
    type Hashes: Copy + PartialEq + fmt::Debug;
    /// One back-index per declared index.
    type Backs: Copy + Default + fmt::Debug;
    type Indices: IndexSet<Self>;

    fn hashes<H: BuildHasher>(hasher: &H, row: &Self::Row) -> Self::Hashes;
}

/// One declared index of schema `S`.
pub trait IndexDef<S: Schema>: Sized + 'static {
    type Kind: IndexKind;

    const NAME: &'static str;

    fn hash(hashes: &S::Hashes) -> u32;

    /// Whether two rows agree on the indexed columns.
    fn same_key(a: &S::Row, b: &S::Row) -> bool;

    fn back(backs: &S::Backs) -> &<Self::Kind as IndexKind>::Back;

    fn back_mut(backs: &mut S::Backs) -> &mut <Self::Kind as IndexKind>::Back;

    /// This index within the schema's index set.
    fn index(indices: &S::Indices) -> &Index<S, Self>;
}

/// The rows of a table as seen by index `D`.
pub struct Column<'a, S: Schema, D> {
    rows: &'a [Entry<S>],
    _def: PhantomData<D>,
}

impl<'a, S: Schema, D> Column<'a, S, D> {
    pub fn new(rows: &'a [Entry<S>]) -> Self {
        Self {
            rows,
            _def: PhantomData,
        }
    }
}

impl<S, D> BackIndexes<<D::Kind as IndexKind>::Back> for Column<'_, S, D>
where
    S: Schema,
    D: IndexDef<S>,
{
    #[inline]
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    fn row_hash(&self, row: usize) -> u32 {
        D::hash(&self.rows[row].hashes)
    }

    #[inline]
    fn back_index(&self, row: usize) -> <D::Kind as IndexKind>::Back {
        *D::back(&self.rows[row].back_indexes)
    }
}

/// Mutable counterpart of [`Column`].
pub struct ColumnMut<'a, S: Schema, D> {
    rows: &'a mut [Entry<S>],
    _def: PhantomData<D>,
}

impl<'a, S: Schema, D> ColumnMut<'a, S, D> {
    pub fn new(rows: &'a mut [Entry<S>]) -> Self {
        Self {
            rows,
            _def: PhantomData,
        }
    }
}

impl<S, D> BackIndexes<<D::Kind as IndexKind>::Back> for ColumnMut<'_, S, D>
where
    S: Schema,
    D: IndexDef<S>,
{
    #[inline]
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    fn row_hash(&self, row: usize) -> u32 {
        D::hash(&self.rows[row].hashes)
    }

    #[inline]
    fn back_index(&self, row: usize) -> <D::Kind as IndexKind>::Back {
        *D::back(&self.rows[row].back_indexes)
    }
}

impl<S, D> BackIndexesMut<<D::Kind as IndexKind>::Back> for ColumnMut<'_, S, D>
where
    S: Schema,
    D: IndexDef<S>,
{
    #[inline]
    fn set_back_index(&mut self, row: usize, back: <D::Kind as IndexKind>::Back) {
        *D::back_mut(&mut self.rows[row].back_indexes) = back;
    }
}

/// The handler of one declared index: its hash table bound to its definition.
pub struct Index<S: Schema, D: IndexDef<S>> {
    table: HashIndex<D::Kind>,
    _def: PhantomData<fn() -> (S, D)>,
}

impl<S: Schema, D: IndexDef<S>> Index<S, D> {
    pub fn with_length(length: usize) -> Self {
        Self {
            table: HashIndex::with_length(length),
            _def: PhantomData,
        }
    }

    #[inline]
    pub fn table(&self) -> &HashIndex<D::Kind> {
        &self.table
    }

    /// Probes for the key with hash code `hash`; `matches` tests a stored row's item.
    pub fn find<F>(&self, rows: &[Entry<S>], hash: u32, mut matches: F) -> SearchResult
    where
        F: FnMut(&S::Row) -> bool,
    {
        self.table.find(&Column::<S, D>::new(rows), hash, |row| {
            matches(&rows[row].item)
        })
    }

    fn grow(&mut self, rows: &mut [Entry<S>], length: usize) {
        let from = self.table.len();
        self.table.resize(&mut ColumnMut::<S, D>::new(rows), length);
        debug!(
            target: "multitable",
            index = D::NAME,
            from,
            to = self.table.len(),
            keys = self.table.occupied(),
            "resized index"
        );
    }
}

impl<S: Schema, D: IndexDef<S>> Clone for Index<S, D> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            _def: PhantomData,
        }
    }
}

impl<S: Schema, D: IndexDef<S>> fmt::Debug for Index<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("name", &D::NAME)
            .field("table", &self.table)
            .finish()
    }
}

/// Operations applied to every index of a schema, in declaration order.
pub trait IndexSet<S: Schema>: Clone + fmt::Debug {
    fn with_length(length: usize) -> Self;

    /// The name of the first unique index that already holds the key of `item`, with the row
    /// holding it.
    fn conflict(
        &self,
        rows: &[Entry<S>],
        item: &S::Row,
        hashes: &S::Hashes,
    ) -> Option<(&'static str, usize)>;

    /// Links the freshly appended `row` into every index. An index grows first when the row's
    /// key would take a slot past the load limit.
    fn link(&mut self, rows: &mut [Entry<S>], row: usize, options: &TableOptions);

    /// Detaches `row` from every index.
    fn unlink(&mut self, rows: &mut [Entry<S>], row: usize);

    /// Repairs references to the row that was moved into position `row`.
    fn relocate(&mut self, rows: &mut [Entry<S>], row: usize);

    /// Rebuilds every index with at least `length` slots, and never fewer than its keys need.
    fn resize(&mut self, rows: &mut [Entry<S>], length: usize, options: &TableOptions);

    /// Grows every index that could not take `keys` keys without growing.
    fn reserve(&mut self, rows: &mut [Entry<S>], keys: usize, options: &TableOptions);

    fn clear(&mut self, length: usize);

    fn check(&self, rows: &[Entry<S>]) -> Result<(), ConsistencyError>;
}

impl<S: Schema> IndexSet<S> for () {
    fn with_length(_length: usize) -> Self {}

    fn conflict(
        &self,
        _rows: &[Entry<S>],
        _item: &S::Row,
        _hashes: &S::Hashes,
    ) -> Option<(&'static str, usize)> {
        None
    }

    fn link(&mut self, _rows: &mut [Entry<S>], _row: usize, _options: &TableOptions) {}

    fn unlink(&mut self, _rows: &mut [Entry<S>], _row: usize) {}

    fn relocate(&mut self, _rows: &mut [Entry<S>], _row: usize) {}

    fn resize(&mut self, _rows: &mut [Entry<S>], _length: usize, _options: &TableOptions) {}

    fn reserve(&mut self, _rows: &mut [Entry<S>], _keys: usize, _options: &TableOptions) {}

    fn clear(&mut self, _length: usize) {}

    fn check(&self, _rows: &[Entry<S>]) -> Result<(), ConsistencyError> {
        Ok(())
    }
}

impl<S, D, T> IndexSet<S> for (Index<S, D>, T)
where
    S: Schema,
    D: IndexDef<S>,
    T: IndexSet<S>,
{
    fn with_length(length: usize) -> Self {
        (Index::with_length(length), T::with_length(length))
    }

    fn conflict(
        &self,
        rows: &[Entry<S>],
        item: &S::Row,
        hashes: &S::Hashes,
    ) -> Option<(&'static str, usize)> {
        if <D::Kind as IndexKind>::UNIQUE {
            let found = self.0.find(rows, D::hash(hashes), |other| D::same_key(other, item));
            if let Some(row) = found.found() {
                return Some((D::NAME, row));
            }
        }
        self.1.conflict(rows, item, hashes)
    }

    fn link(&mut self, rows: &mut [Entry<S>], row: usize, options: &TableOptions) {
        let index = &mut self.0;
        let hash = D::hash(&rows[row].hashes);
        let probe = |index: &Index<S, D>, rows: &[Entry<S>]| {
            let item = &rows[row].item;
            index.find(rows, hash, |other| D::same_key(other, item))
        };

        let mut result = probe(&*index, &*rows);
        // Only a new key takes a slot.
        if result.found().is_none() && index.table.needs_growth(options.max_load) {
            index.grow(rows, options.grown_length(index.table.len()));
            result = probe(&*index, &*rows);
        }
        index.table.add(&mut ColumnMut::<S, D>::new(rows), result, row);

        self.1.link(rows, row, options);
    }

    fn unlink(&mut self, rows: &mut [Entry<S>], row: usize) {
        self.0.table.remove(&mut ColumnMut::<S, D>::new(rows), row);
        self.1.unlink(rows, row);
    }

    fn relocate(&mut self, rows: &mut [Entry<S>], row: usize) {
        self.0.table.relocate(&mut ColumnMut::<S, D>::new(rows), row);
        self.1.relocate(rows, row);
    }

    fn resize(&mut self, rows: &mut [Entry<S>], length: usize, options: &TableOptions) {
        let own = length.max(options.length_for(self.0.table.occupied()));
        if own != self.0.table.len() {
            self.0.grow(rows, own);
        }
        self.1.resize(rows, length, options);
    }

    fn reserve(&mut self, rows: &mut [Entry<S>], keys: usize, options: &TableOptions) {
        let length = options.length_for(keys);
        if length > self.0.table.len() {
            self.0.grow(rows, length);
        }
        self.1.reserve(rows, keys, options);
    }

    fn clear(&mut self, length: usize) {
        self.0.table.clear(length);
        self.1.clear(length);
    }

    fn check(&self, rows: &[Entry<S>]) -> Result<(), ConsistencyError> {
        self.0.table.check(D::NAME, &Column::<S, D>::new(rows))?;

        // Cached hashes can collide; chained rows must also agree on the key itself.
        if !<D::Kind as IndexKind>::UNIQUE {
            let column = Column::<S, D>::new(rows);
            for row in 0..rows.len() {
                let Some(next) = <D::Kind as IndexKind>::next_row(column.back_index(row)) else {
                    continue;
                };
                if !D::same_key(&rows[row].item, &rows[next].item) {
                    return Err(ConsistencyError::ChainKeyMismatch {
                        index: D::NAME,
                        row,
                        neighbour: next,
                    });
                }
            }
        }

        self.1.check(rows)
    }
}
