//! Mapping 32-bit hash codes onto slots.

use std::hash::{BuildHasher, Hash};

/// Smallest length of any index's hash table.
pub const MIN_TABLE_LENGTH: usize = 4;

/// Ideal slot of `hash` in a table of `length` slots.
#[inline]
pub fn reduce(hash: u32, length: usize) -> usize {
    debug_assert!(length > 0);
    hash as usize % length
}

/// Next slot of a probe sequence, wrapping at the end of the table.
#[inline]
pub fn advance(position: usize, length: usize) -> usize {
    let next = position + 1;
    if next == length {
        0
    } else {
        next
    }
}

/// Number of probe steps from `ideal` to `slot`.
#[inline]
pub fn distance(ideal: usize, slot: usize, length: usize) -> usize {
    if slot >= ideal {
        slot - ideal
    } else {
        slot + length - ideal
    }
}

/// Hashes `value` and folds the result into the 32-bit code stored per row.
#[inline]
pub fn hash32<S, T>(hasher: &S, value: &T) -> u32
where
    S: BuildHasher,
    T: Hash + ?Sized,
{
    let hash = hasher.hash_one(value);
    (hash ^ (hash >> 32)) as u32
}
