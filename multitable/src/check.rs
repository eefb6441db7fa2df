//! Consistency checks for an index and the rows it refers to.
//!
//! Not used by the table itself; tests call it after every mutation.

use crate::error::ConsistencyError;
use crate::index::HashIndex;
use crate::kind::IndexKind;
use crate::reduce::{distance, reduce};
use crate::row::BackIndexes;

impl<K: IndexKind> HashIndex<K> {
    /// Walks every slot and every row and reports the first broken invariant.
    pub fn check<A>(&self, index: &'static str, rows: &A) -> Result<(), ConsistencyError>
    where
        A: BackIndexes<K::Back> + ?Sized,
    {
        let slots = self.slots();
        let length = slots.len();
        let row_count = rows.row_count();
        let mut counted = 0;
        let mut reachable = 0;

        for (slot, entry) in slots.iter().enumerate() {
            let Some(drift) = entry.drift() else {
                continue;
            };
            counted += 1;

            let row = entry.forward_index;
            if row >= row_count {
                return Err(ConsistencyError::DanglingForward {
                    index,
                    slot,
                    row,
                    rows: row_count,
                });
            }

            if K::anchored_slot(rows.back_index(row)) != Some(slot) {
                return Err(ConsistencyError::NotAnchored { index, slot, row });
            }

            let actual = distance(reduce(rows.row_hash(row), length), slot, length);
            if actual != drift as usize {
                return Err(ConsistencyError::DriftMismatch {
                    index,
                    slot,
                    stored: drift,
                    actual,
                });
            }

            // A drifted entry follows an occupied slot drifted at most one step less.
            if drift > 0 {
                let previous = slots[(slot + length - 1) % length];
                if previous.is_unused() || previous.drift_plus_one < entry.drift_plus_one - 1 {
                    return Err(ConsistencyError::UnfairDrift {
                        index,
                        slot,
                        drift,
                    });
                }
            }

            reachable += K::chain_len(rows, row);
        }

        if counted != self.occupied() {
            return Err(ConsistencyError::OccupiedCount {
                index,
                counted,
                recorded: self.occupied(),
            });
        }

        for row in 0..row_count {
            K::check_row(index, slots, rows, row)?;
        }

        if reachable != row_count {
            return Err(ConsistencyError::Unreachable {
                index,
                reachable,
                rows: row_count,
            });
        }

        Ok(())
    }
}
