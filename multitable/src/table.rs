use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use tracing::{debug, trace};

use crate::error::{ConsistencyError, Error, Result};
use crate::index::HashIndex;
use crate::kind::IndexKind;
use crate::options::TableOptions;
use crate::reduce::hash32;
use crate::row::DataEntry;
use crate::schema::{Entry, IndexDef, IndexSet, Schema};
use crate::slot::SearchResult;

pub type DefaultHashBuilder = ahash::RandomState;

/// A dense row store kept in sync with every index declared by `S`.
///
/// Rows are identified by their position. Positions are only stable until the next mutation:
/// an insert may grow and rebuild the indices, and a removal moves the last row into the freed
/// position.
pub struct Table<S: Schema, H = DefaultHashBuilder> {
    rows: Vec<Entry<S>>,
    indices: S::Indices,
    hasher: H,
    options: TableOptions,
}

/// A removed row, and where the row that took its position came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Removed<T> {
    pub item: T,
    /// Old position of the row that now lives at the removed position.
    pub relocated_from: Option<usize>,
}

impl<S: Schema> Table<S> {
    pub fn new() -> Self {
        Self::build(TableOptions::default(), DefaultHashBuilder::new())
    }

    pub fn with_options(options: TableOptions) -> Result<Self> {
        Self::with_options_and_hasher(options, DefaultHashBuilder::new())
    }
}

impl<S: Schema> Default for Table<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schema, H: BuildHasher> Table<S, H> {
    pub fn with_hasher(hasher: H) -> Self {
        Self::build(TableOptions::default(), hasher)
    }

    pub fn with_options_and_hasher(options: TableOptions, hasher: H) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(options, hasher))
    }

    fn build(options: TableOptions, hasher: H) -> Self {
        Self {
            rows: Vec::new(),
            indices: S::Indices::with_length(options.initial_length),
            hasher,
            options,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn get(&self, row: usize) -> Option<&S::Row> {
        self.rows.get(row).map(|entry| &entry.item)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &S::Row)> + '_ {
        self.rows.iter().map(|entry| &entry.item).enumerate()
    }

    /// The hash table of index `D`.
    #[inline]
    pub fn index<D: IndexDef<S>>(&self) -> &HashIndex<D::Kind> {
        D::index(&self.indices).table()
    }

    #[inline]
    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    /// Hash code of a key, as cached for rows holding it.
    #[inline]
    pub fn hash_key<T: Hash + ?Sized>(&self, key: &T) -> u32 {
        hash32(&self.hasher, key)
    }

    /// Runs the raw probe of index `D` for a key with hash code `hash`.
    pub fn probe<D, F>(&self, hash: u32, matches: F) -> SearchResult
    where
        D: IndexDef<S>,
        F: FnMut(&S::Row) -> bool,
    {
        D::index(&self.indices).find(&self.rows, hash, matches)
    }

    /// The row holding the key, or the first row in insertion order for non-unique indices.
    pub fn find<D, F>(&self, hash: u32, matches: F) -> Option<usize>
    where
        D: IndexDef<S>,
        F: FnMut(&S::Row) -> bool,
    {
        self.probe::<D, F>(hash, matches).found()
    }

    /// All rows holding the key in index `D`, in insertion order.
    pub fn select<D, F>(&self, hash: u32, matches: F) -> Chain<'_, S, D>
    where
        D: IndexDef<S>,
        F: FnMut(&S::Row) -> bool,
    {
        Chain {
            rows: &self.rows,
            next: self.find::<D, F>(hash, matches),
            _def: PhantomData,
        }
    }

    /// Rows of index `D` starting at `row` and following its chain to the end.
    pub fn chain<D: IndexDef<S>>(&self, row: usize) -> Chain<'_, S, D> {
        Chain {
            rows: &self.rows,
            next: (row < self.rows.len()).then_some(row),
            _def: PhantomData,
        }
    }

    /// Appends `item` and indexes it. Returns its position.
    ///
    /// Fails without modifying the table if a unique index already holds the item's key.
    pub fn insert(&mut self, item: S::Row) -> Result<usize> {
        let hashes = S::hashes(&self.hasher, &item);
        if let Some((index, row)) = self.indices.conflict(&self.rows, &item, &hashes) {
            return Err(Error::DuplicateKey { index, row });
        }

        let row = self.rows.len();
        self.rows.push(DataEntry::new(item, hashes));
        self.indices.link(&mut self.rows, row, &self.options);
        Ok(row)
    }

    /// Removes the row at position `row`.
    ///
    /// The last row moves into the freed position; [`Removed::relocated_from`] reports its old
    /// position. Returns `None` if there is no such row.
    pub fn remove(&mut self, row: usize) -> Option<Removed<S::Row>> {
        if row >= self.rows.len() {
            return None;
        }

        self.indices.unlink(&mut self.rows, row);
        let last = self.rows.len() - 1;
        let entry = self.rows.swap_remove(row);

        let relocated_from = if row != last {
            self.indices.relocate(&mut self.rows, row);
            trace!(target: "multitable", from = last, to = row, "relocated row");
            Some(last)
        } else {
            None
        };

        Some(Removed {
            item: entry.item,
            relocated_from,
        })
    }

    pub fn clear(&mut self) {
        debug!(target: "multitable", rows = self.rows.len(), "clearing table");
        self.rows.clear();
        self.indices.clear(self.options.initial_length);
    }

    /// Makes room for `additional` more rows without further growth of any index.
    pub fn reserve(&mut self, additional: usize) {
        self.rows.reserve(additional);
        let keys = self.rows.len() + additional;
        self.indices.reserve(&mut self.rows, keys, &self.options);
    }

    /// Rebuilds every index with `length` slots, or as many as its keys need if that is more.
    pub fn resize(&mut self, length: usize) {
        self.indices.resize(&mut self.rows, length, &self.options);
    }

    /// Verifies cached hashes and every index against the rows.
    pub fn check(&self) -> Result<(), ConsistencyError> {
        for (row, entry) in self.rows.iter().enumerate() {
            if S::hashes(&self.hasher, &entry.item) != entry.hashes {
                return Err(ConsistencyError::HashMismatch { row });
            }
        }
        self.indices.check(&self.rows)
    }
}

impl<S, H> Clone for Table<S, H>
where
    S: Schema,
    S::Row: Clone,
    H: Clone,
{
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            indices: self.indices.clone(),
            hasher: self.hasher.clone(),
            options: self.options.clone(),
        }
    }
}

impl<S, H> fmt::Debug for Table<S, H>
where
    S: Schema,
    S::Row: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("rows", &self.rows)
            .field("indices", &self.indices)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Rows sharing one key of index `D`, in insertion order.
pub struct Chain<'a, S: Schema, D> {
    rows: &'a [Entry<S>],
    next: Option<usize>,
    _def: PhantomData<D>,
}

impl<S: Schema, D: IndexDef<S>> Iterator for Chain<'_, S, D> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let row = self.next?;
        let back = *D::back(&self.rows[row].back_indexes);
        self.next = <D::Kind as IndexKind>::next_row(back);
        Some(row)
    }
}

impl<S: Schema, D> Clone for Chain<'_, S, D> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows,
            next: self.next,
            _def: PhantomData,
        }
    }
}
