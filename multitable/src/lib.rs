//! An in-memory table of rows with any number of hash indices.
//!
//! The `MultiTable` derive creates a table type that stores instances of a struct. Rows live in
//! a dense array and are identified by their position. Every declared index is an
//! open-addressing hash table using Robin Hood probing, so a row can be found by any declared
//! field or combination of fields. The indices are updated whenever the table is modified,
//! ensuring that they are always consistent with the rows.
//!
//! By default, an index is non-unique, meaning that multiple rows can have the same value for the
//! indexed fields. If the `unique` attribute is added to an index attribute, we ensure that the
//! value of the indexed fields is unique across all rows in the table.
//!
//! # Example
//!
//! ```
//! use multitable::MultiTable;
//!
//! #[derive(Debug, Clone, MultiTable)]
//! #[multitable(module = edge)]
//! #[multitable(index(fields(source, target), getter = find, unique))]
//! #[multitable(index(fields(source), getter = outgoing))]
//! pub struct Edge {
//!     source: u32,
//!     target: u32,
//! }
//!
//! # fn main() {
//! let mut edges = edge::Table::new();
//! let a = edges.insert(Edge { source: 0, target: 1 }).unwrap();
//! let b = edges.insert(Edge { source: 0, target: 2 }).unwrap();
//! assert!(edges.insert(Edge { source: 0, target: 1 }).is_err());
//!
//! assert_eq!(edges.find(&0, &2), Some(b));
//! assert_eq!(edges.outgoing(&0).collect::<Vec<_>>(), [a, b]);
//!
//! // Removing `a` moves the last row into its position.
//! let removed = edges.remove(a).unwrap();
//! assert_eq!(removed.relocated_from, Some(b));
//! assert_eq!(edges.find(&0, &2), Some(a));
//! # }
//! ```
//!
//! # Notes
//!
//!  - Struct fields are hashed and compared in place; indices never store keys.
//!  - Row positions are only valid until the next insertion or removal. Removing a row moves the
//!    last row into its position, and [`Removed`] reports which row moved.
//!  - Rows that share a key in a non-unique index form an intrusive chain through the rows'
//!    back-indexes, in insertion order. This avoids allocations beyond the row array and the
//!    hash tables of the indices.
//!  - Concurrent modification and durability are out of scope. Use a real database if you need those.
//!  - We use the `ahash` crate for hashing by default. Any `BuildHasher` can be supplied instead.
pub use multitable_derive::MultiTable;

mod check;
mod error;
mod index;
mod kind;
mod options;
mod reduce;
mod row;
mod schema;
mod slot;
mod table;

pub use error::{ConsistencyError, Error, Result};
pub use index::HashIndex;
pub use kind::{IndexKind, NonUnique, Unique};
pub use options::TableOptions;
pub use reduce::{advance, distance, hash32, reduce, MIN_TABLE_LENGTH};
pub use row::{BackIndexes, BackIndexesMut, DataEntry};
pub use schema::{Column, ColumnMut, Entry, Index, IndexDef, IndexSet, Schema};
pub use slot::{HashEntry, MultiIndex, SearchResult, DRIFT_FOR_UNUSED, NO_NEXT};
pub use table::{Chain, DefaultHashBuilder, Removed, Table};
