//! Error types of the table engine.
//!
//! Recoverable failures are returned as [`Error`]. Broken invariants found by the consistency
//! checker are reported as [`ConsistencyError`]. Caller bugs inside the index engine, such as
//! adding a duplicate key to a unique index directly, panic instead.

use thiserror::Error;

/// Failures of table-level operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The row's key is already held by another row of a unique index.
    #[error("key already present in unique index `{index}` (row {row})")]
    DuplicateKey { index: &'static str, row: usize },

    /// The table options can not be used to build a table.
    #[error("invalid table options: {0}")]
    InvalidOptions(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A violated table invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("row {row}: cached hashes differ from the recomputed ones")]
    HashMismatch { row: usize },

    #[error("index `{index}`: slot {slot} forwards to row {row}, but the table has {rows} rows")]
    DanglingForward {
        index: &'static str,
        slot: usize,
        row: usize,
        rows: usize,
    },

    #[error("index `{index}`: slot {slot} forwards to row {row}, which is not anchored there")]
    NotAnchored {
        index: &'static str,
        slot: usize,
        row: usize,
    },

    #[error("index `{index}`: row {row} refers to slot {slot}, which forwards to {found:?}")]
    ForwardMismatch {
        index: &'static str,
        row: usize,
        slot: usize,
        found: Option<usize>,
    },

    #[error("index `{index}`: slot {slot} stores drift {stored}, but its ideal slot is {actual} steps away")]
    DriftMismatch {
        index: &'static str,
        slot: usize,
        stored: u32,
        actual: usize,
    },

    #[error("index `{index}`: slot {slot} has drift {drift} after a slot it should have displaced")]
    UnfairDrift {
        index: &'static str,
        slot: usize,
        drift: u32,
    },

    #[error("index `{index}`: chain link between rows {row} and {neighbour} is broken")]
    BrokenChain {
        index: &'static str,
        row: usize,
        neighbour: usize,
    },

    #[error("index `{index}`: row {row} is chained to row {neighbour} with a different key")]
    ChainKeyMismatch {
        index: &'static str,
        row: usize,
        neighbour: usize,
    },

    #[error("index `{index}`: {reachable} of {rows} rows are reachable from the hash table")]
    Unreachable {
        index: &'static str,
        reachable: usize,
        rows: usize,
    },

    #[error("index `{index}`: {counted} occupied slots, but {recorded} recorded")]
    OccupiedCount {
        index: &'static str,
        counted: usize,
        recorded: usize,
    },
}
