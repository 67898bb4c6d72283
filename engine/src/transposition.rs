/*
  Fiddler, a UCI-compatible chess engine.
  Copyright (C) 2022 The Fiddler Authors (see AUTHORS.md file)

  Fiddler is free software: you can redistribute it and/or modify
  it under the terms of the GNU General Public License as published by
  the Free Software Foundation, either version 3 of the License, or
  (at your option) any later version.

  Fiddler is distributed in the hope that it will be useful,
  but WITHOUT ANY WARRANTY; without even the implied warranty of
  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
  GNU General Public License for more details.

  You should have received a copy of the GNU General Public License
  along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/

//! Transposition tables.
//!
//! A transposition table is a large hash-map from the Zobrist key of a
//! position to useful information learned about it during search: to what
//! depth it was searched, what its score was, and which move was judged
//! best. If the same position is reached through multiple move orders, the
//! engine can reuse the old result instead of re-searching from scratch.
//!
//! Each table slot is indexed by the low bits of the Zobrist key. Because
//! two different positions can share those low bits, every entry also
//! stores the full key so that a probe can detect (and ignore) a collision
//! rather than return a result for the wrong position.

use zugzwang_base::{Eval, Move};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// What kind of bound a stored score represents, relative to the window it
/// was searched with.
pub enum Bound {
    /// The score is exact: the true minimax value of the position.
    Exact,
    /// The true value is at least this score (search failed high).
    LowerBound,
    /// The true value is at most this score (search failed low).
    UpperBound,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// An entry in the transposition table.
pub struct TTEntry {
    /// The full Zobrist key this entry was stored under, used to detect
    /// collisions with other positions that hash to the same slot.
    pub key: u64,
    /// The depth, in plies, to which this entry's subtree was searched.
    pub depth: i8,
    /// The score learned for this position, in centipawns.
    pub score: Eval,
    /// What kind of bound `score` represents.
    pub flag: Bound,
    /// The move judged best in this position, if any.
    pub best_move: Option<Move>,
}

#[derive(Clone, Debug)]
/// A fixed-size hash table mapping Zobrist keys to `TTEntry`s.
///
/// Replacement is depth-preferred: a new entry overwrites the one already
/// in its slot only if the existing entry was searched to a shallower or
/// equal depth.
pub struct TTable {
    slots: Vec<Option<TTEntry>>,
    mask: u64,
}

/// The default size of a freshly-constructed table, in entries (a power of
/// two).
const DEFAULT_CAPACITY: usize = 1 << 20;

impl TTable {
    #[must_use]
    /// Construct a `TTable` with the default capacity.
    pub fn new() -> TTable {
        TTable::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    /// Construct a `TTable` with room for at least `capacity` entries. The
    /// actual capacity is rounded up to the nearest power of two (with a
    /// minimum of 1).
    pub fn with_capacity(capacity: usize) -> TTable {
        let capacity = capacity.max(1).next_power_of_two();
        TTable {
            slots: vec![None; capacity],
            mask: (capacity - 1) as u64,
        }
    }

    #[inline]
    fn index_for(&self, key: u64) -> usize {
        (key & self.mask) as usize
    }

    #[must_use]
    /// Look up the entry stored for `key`, if any. Returns `None` both when
    /// the slot is empty and when it holds an entry for a different
    /// position (a hash collision) — callers cannot tell the two apart, nor
    /// do they need to: either way there is nothing usable for `key`.
    pub fn probe(&self, key: u64) -> Option<&TTEntry> {
        self.slots[self.index_for(key)]
            .as_ref()
            .filter(|entry| entry.key == key)
    }

    /// Store a result for `key`, replacing whatever is currently in that
    /// slot only if the existing entry (if any) was searched to a shallower
    /// or equal depth.
    pub fn store(
        &mut self,
        key: u64,
        depth: i8,
        score: Eval,
        flag: Bound,
        best_move: Option<Move>,
    ) {
        let idx = self.index_for(key);
        let replace = match &self.slots[idx] {
            None => true,
            Some(existing) => existing.depth <= depth,
        };
        if replace {
            self.slots[idx] = Some(TTEntry {
                key,
                depth,
                score,
                flag,
                best_move,
            });
        }
    }

    /// Remove every entry from the table.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    #[must_use]
    /// Number of slots in the table, regardless of how many are occupied.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl Default for TTable {
    fn default() -> Self {
        TTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zugzwang_base::Square;

    #[test]
    fn guaranteed_miss() {
        let tt = TTable::with_capacity(16);
        assert!(tt.probe(12345).is_none());
    }

    #[test]
    fn guaranteed_hit() {
        let mut tt = TTable::with_capacity(16);
        let m = Move::normal(Square::E2, Square::E4);
        tt.store(12, 5, Eval::DRAW, Bound::Exact, Some(m));
        let entry = tt.probe(12).unwrap();
        assert_eq!(entry.depth, 5);
        assert_eq!(entry.best_move, Some(m));
    }

    #[test]
    fn shallower_store_does_not_replace_deeper_entry() {
        let mut tt = TTable::with_capacity(16);
        let m1 = Move::normal(Square::E2, Square::E4);
        let m2 = Move::normal(Square::D2, Square::D4);
        tt.store(16, 8, Eval::centipawns(10), Bound::Exact, Some(m1));
        tt.store(16, 3, Eval::centipawns(99), Bound::Exact, Some(m2));
        assert_eq!(tt.probe(16).unwrap().best_move, Some(m1));
    }

    #[test]
    fn deeper_store_replaces_shallower_entry() {
        let mut tt = TTable::with_capacity(16);
        let m1 = Move::normal(Square::E2, Square::E4);
        let m2 = Move::normal(Square::D2, Square::D4);
        tt.store(16, 3, Eval::centipawns(10), Bound::Exact, Some(m1));
        tt.store(16, 8, Eval::centipawns(99), Bound::Exact, Some(m2));
        assert_eq!(tt.probe(16).unwrap().best_move, Some(m2));
    }

    #[test]
    fn clear_empties_every_slot() {
        let mut tt = TTable::with_capacity(16);
        tt.store(16, 3, Eval::DRAW, Bound::Exact, None);
        tt.clear();
        assert!(tt.probe(16).is_none());
    }
}
