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

//! Hash key generation for positions.
//!
//! A Zobrist key is built by XORing together one key per "fact" about a
//! position: which piece of which color sits on which square, which castling
//! rights survive, which file (if any) is open for en passant, and whose turn
//! it is to move. Because XOR is its own inverse, `make_move` and
//! `unmake_move` can update the running hash incrementally instead of
//! recomputing it from scratch.

use once_cell::sync::Lazy;

use super::{Color, Piece, Square};

/// The seed used to deterministically generate every key below. Changing this
/// would silently invalidate any persisted transposition table, so it is
/// fixed rather than derived from the clock.
const SEED: u64 = 0x7157_0d15_7e55_1234;

/// Keys XORed in for a black to move.
pub const BLACK_TO_MOVE_KEY: u64 = 0x3440_f9f4_6981_0c7b;

/// Keys for each of the four individual castling rights. Bit `i` of
/// `CastleRights` corresponds to `CASTLE_KEYS[i]`.
static CASTLE_KEYS: Lazy<[u64; 4]> = Lazy::new(|| {
    let rng = fastrand::Rng::with_seed(SEED);
    let mut keys = [0; 4];
    for key in &mut keys {
        *key = rng.u64(..);
    }
    keys
});

/// Keys for the file of an en passant square, indexed by file (0 = A).
static EP_KEYS: Lazy<[u64; 8]> = Lazy::new(|| {
    let rng = fastrand::Rng::with_seed(SEED ^ 0x55);
    let mut keys = [0; 8];
    for key in &mut keys {
        *key = rng.u64(..);
    }
    keys
});

/// Keys for a piece of a given type and color occupying a given square.
/// Indexed `[square][piece][color]`.
static SQUARE_KEYS: Lazy<[[[u64; 2]; Piece::NUM_TYPES]; 64]> = Lazy::new(|| {
    let rng = fastrand::Rng::with_seed(SEED ^ 0xA5A5);
    let mut keys = [[[0u64; 2]; Piece::NUM_TYPES]; 64];
    for sq_table in &mut keys {
        for piece_table in sq_table.iter_mut() {
            for color_key in piece_table.iter_mut() {
                *color_key = rng.u64(..);
            }
        }
    }
    keys
});

#[inline(always)]
/// Get the Zobrist key contribution of a piece of type `pt` and color `color`
/// occupying square `sq`. Returns 0 if `pt` is `None`, so this can be used
/// unconditionally when clearing or setting a square.
pub fn square_key(sq: Square, pt: Option<Piece>, color: Color) -> u64 {
    match pt {
        None => 0,
        Some(p) => SQUARE_KEYS[sq as usize][p as usize][color as usize],
    }
}

#[inline(always)]
/// Get the Zobrist key contribution of a single castling right. `right` must
/// be in `0..4`: 0 is white kingside, 1 is white queenside, 2 is black
/// kingside, and 3 is black queenside.
pub fn get_castle_key(right: u8) -> u64 {
    CASTLE_KEYS[right as usize]
}

#[inline(always)]
/// Get the Zobrist key contribution of an en passant square. Returns 0 if
/// `sq` is `None`.
pub fn ep_key(sq: Option<Square>) -> u64 {
    match sq {
        None => 0,
        Some(sq) => EP_KEYS[sq.file()],
    }
}

#[inline(always)]
/// Get the Zobrist key contribution of the side to move.
pub fn player_key(player: Color) -> u64 {
    match player {
        Color::White => 0,
        Color::Black => BLACK_TO_MOVE_KEY,
    }
}
