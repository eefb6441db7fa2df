//! The two flavours of index.
//!
//! A [`Unique`] index stores at most one row per key and each row's back-index is simply the
//! slot holding it. A [`NonUnique`] index chains all rows of a key behind a head row, and each
//! row's back-index is a [`MultiIndex`] link. The probing, shifting and resizing in
//! [`HashIndex`](crate::HashIndex) are shared; everything that depends on the back-index
//! representation lives here.

use std::fmt::Debug;

use crate::error::ConsistencyError;
use crate::row::{BackIndexes, BackIndexesMut};
use crate::slot::{HashEntry, MultiIndex};

pub trait IndexKind: Copy + Debug + Default + 'static {
    type Back: Copy + Debug + Default + PartialEq;

    const UNIQUE: bool;

    /// Back-index of a row that is now directly stored in `slot`.
    fn anchor(back: Self::Back, slot: usize) -> Self::Back;

    /// The slot a back-index is anchored to, or `None` for a subsequent chain link.
    fn anchored_slot(back: Self::Back) -> Option<usize>;

    /// The row following this one under the same key.
    fn next_row(back: Self::Back) -> Option<usize>;

    /// Adds `row` to the key whose stored row is `head`.
    fn append<A: BackIndexesMut<Self::Back> + ?Sized>(rows: &mut A, head: usize, row: usize);

    /// Detaches `row` from the index. Returns the slot that became empty, if any.
    fn unlink<A: BackIndexesMut<Self::Back> + ?Sized>(
        slots: &mut [HashEntry],
        rows: &mut A,
        row: usize,
    ) -> Option<usize>;

    /// Repoints every reference to the row that was moved into position `row`.
    fn relocate<A: BackIndexesMut<Self::Back> + ?Sized>(
        slots: &mut [HashEntry],
        rows: &mut A,
        row: usize,
    );

    /// Number of rows reachable from the stored row `head`.
    fn chain_len<A: BackIndexes<Self::Back> + ?Sized>(rows: &A, head: usize) -> usize;

    fn check_row<A: BackIndexes<Self::Back> + ?Sized>(
        index: &'static str,
        slots: &[HashEntry],
        rows: &A,
        row: usize,
    ) -> Result<(), ConsistencyError>;
}

/// At most one row per key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Unique;

/// Any number of rows per key, kept in insertion order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NonUnique;

impl IndexKind for Unique {
    type Back = usize;

    const UNIQUE: bool = true;

    #[inline]
    fn anchor(_back: usize, slot: usize) -> usize {
        slot
    }

    #[inline]
    fn anchored_slot(back: usize) -> Option<usize> {
        Some(back)
    }

    #[inline]
    fn next_row(_back: usize) -> Option<usize> {
        None
    }

    fn append<A: BackIndexesMut<usize> + ?Sized>(_rows: &mut A, head: usize, row: usize) {
        panic!("row {row} duplicates the key of row {head} in a unique index");
    }

    fn unlink<A: BackIndexesMut<usize> + ?Sized>(
        _slots: &mut [HashEntry],
        rows: &mut A,
        row: usize,
    ) -> Option<usize> {
        Some(rows.back_index(row))
    }

    fn relocate<A: BackIndexesMut<usize> + ?Sized>(
        slots: &mut [HashEntry],
        rows: &mut A,
        row: usize,
    ) {
        slots[rows.back_index(row)].forward_index = row;
    }

    fn chain_len<A: BackIndexes<usize> + ?Sized>(_rows: &A, _head: usize) -> usize {
        1
    }

    fn check_row<A: BackIndexes<usize> + ?Sized>(
        index: &'static str,
        slots: &[HashEntry],
        rows: &A,
        row: usize,
    ) -> Result<(), ConsistencyError> {
        let slot = rows.back_index(row);
        check_anchor(index, slots, row, slot)
    }
}

impl IndexKind for NonUnique {
    type Back = MultiIndex;

    const UNIQUE: bool = false;

    #[inline]
    fn anchor(back: MultiIndex, slot: usize) -> MultiIndex {
        MultiIndex {
            is_subsequent: false,
            previous: slot,
            next: back.next,
        }
    }

    #[inline]
    fn anchored_slot(back: MultiIndex) -> Option<usize> {
        back.is_head().then_some(back.previous)
    }

    #[inline]
    fn next_row(back: MultiIndex) -> Option<usize> {
        back.has_next().then_some(back.next)
    }

    fn append<A: BackIndexesMut<MultiIndex> + ?Sized>(rows: &mut A, head: usize, row: usize) {
        let mut tail = head;
        while let Some(next) = Self::next_row(rows.back_index(tail)) {
            tail = next;
        }

        rows.update_back_index(tail, |link| MultiIndex { next: row, ..link });
        rows.set_back_index(row, MultiIndex::subsequent(tail));
    }

    fn unlink<A: BackIndexesMut<MultiIndex> + ?Sized>(
        slots: &mut [HashEntry],
        rows: &mut A,
        row: usize,
    ) -> Option<usize> {
        let link = rows.back_index(row);
        rows.set_back_index(row, MultiIndex::default());

        if link.is_subsequent {
            rows.update_back_index(link.previous, |prev| MultiIndex {
                next: link.next,
                ..prev
            });
            if link.has_next() {
                rows.update_back_index(link.next, |next| MultiIndex {
                    previous: link.previous,
                    ..next
                });
            }
            None
        } else if link.has_next() {
            // Promote the second row to head of the chain.
            let slot = link.previous;
            rows.update_back_index(link.next, |next| Self::anchor(next, slot));
            slots[slot].forward_index = link.next;
            None
        } else {
            Some(link.previous)
        }
    }

    fn relocate<A: BackIndexesMut<MultiIndex> + ?Sized>(
        slots: &mut [HashEntry],
        rows: &mut A,
        row: usize,
    ) {
        let link = rows.back_index(row);
        if link.is_subsequent {
            rows.update_back_index(link.previous, |prev| MultiIndex { next: row, ..prev });
        } else {
            slots[link.previous].forward_index = row;
        }
        if link.has_next() {
            rows.update_back_index(link.next, |next| MultiIndex {
                previous: row,
                ..next
            });
        }
    }

    fn chain_len<A: BackIndexes<MultiIndex> + ?Sized>(rows: &A, head: usize) -> usize {
        let limit = rows.row_count();
        let mut len = 1;
        let mut link = rows.back_index(head);
        while link.has_next() && link.next < limit && len <= limit {
            len += 1;
            link = rows.back_index(link.next);
        }
        len
    }

    fn check_row<A: BackIndexes<MultiIndex> + ?Sized>(
        index: &'static str,
        slots: &[HashEntry],
        rows: &A,
        row: usize,
    ) -> Result<(), ConsistencyError> {
        let count = rows.row_count();
        let link = rows.back_index(row);

        if link.is_subsequent {
            let prev = link.previous;
            if prev >= count || rows.back_index(prev).next != row {
                return Err(ConsistencyError::BrokenChain {
                    index,
                    row,
                    neighbour: prev,
                });
            }
        } else {
            check_anchor(index, slots, row, link.previous)?;
        }

        if link.has_next() {
            let next = link.next;
            let broken = next >= count || {
                let next_link = rows.back_index(next);
                !next_link.is_subsequent || next_link.previous != row
            };
            if broken {
                return Err(ConsistencyError::BrokenChain {
                    index,
                    row,
                    neighbour: next,
                });
            }
            if rows.row_hash(next) != rows.row_hash(row) {
                return Err(ConsistencyError::ChainKeyMismatch {
                    index,
                    row,
                    neighbour: next,
                });
            }
        }

        Ok(())
    }
}

fn check_anchor(
    index: &'static str,
    slots: &[HashEntry],
    row: usize,
    slot: usize,
) -> Result<(), ConsistencyError> {
    match slots.get(slot) {
        Some(entry) if !entry.is_unused() && entry.forward_index == row => Ok(()),
        other => Err(ConsistencyError::ForwardMismatch {
            index,
            row,
            slot,
            found: other
                .filter(|entry| !entry.is_unused())
                .map(|entry| entry.forward_index),
        }),
    }
}
