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

//! Static evaluation of positions.
//!
//! Of all the parts of a chess engine, static evaluation is arguably the
//! most important: every leaf of the search is statically evaluated, and
//! the comparisons of those evaluations are what drives the rest of the
//! minimax search.
//!
//! This engine's evaluation is deliberately simple: net material plus a
//! mobility bonus for the side to move. It is not tapered between midgame
//! and endgame, and it carries no positional knowledge beyond mobility.

use zugzwang_base::{
    movegen::{get_moves, ALL},
    Eval, Position,
};

use crate::material;

/// The bonus, in centipawns, given per legal move available to the side to
/// move.
const MOBILITY_WEIGHT: i16 = 2;

#[must_use]
/// Statically evaluate a position in centipawns, from White's perspective.
///
/// The score is net material (white material minus black material) plus a
/// mobility bonus proportional to the number of legal moves available to
/// whichever side is to move.
pub fn evaluate(pos: &Position) -> Eval {
    let mobility = get_moves::<ALL>(pos).len() as i16;
    material::evaluate(pos) + Eval::centipawns(MOBILITY_WEIGHT * mobility)
}
