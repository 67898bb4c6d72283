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

//! Full chess games, including history and draw-detection metadata.
//!
//! A `Position` alone has no memory of how it was reached, so it cannot tell
//! threefold repetition from a position reached for the first time. `Game`
//! layers that history on top of a `Position`, tracking the moves played and
//! a count of how many times each Zobrist key has been seen.

use super::{
    algebraic::algebraic_from_move,
    movegen::{get_moves, has_moves, is_square_attacked_by, GenMode, ALL},
    Color, Move, Piece, Position, Square,
};

use nohash_hasher::IntMap;

use std::{
    default::Default,
    fmt::{Display, Formatter},
};

#[derive(Clone, Debug, Eq, PartialEq)]
/// A struct containing game information, which unlike a `Position`, knows about
/// its history and can do things like repetition timing.
pub struct Game {
    /// The last element in `history` is the current state of the game. The
    /// first element should be the starting position of the game, and in
    /// between are sequential position states from the entire game.
    history: Vec<Position>,
    /// The list, in order, of all moves made in the game. They should all be
    /// valid moves. The length of `moves` should always be one less than the
    /// length of `history`.
    moves: Vec<Move>,
    /// Stores the number of times a position has been reached in the course of
    /// this game. It is used for threefold-repetition draws. The keys are the
    /// Zobrist hashes of the positions previously visited.
    repetitions: IntMap<u64, u64>,
}

impl Game {
    #[must_use]
    /// Construct a new `Game` in the conventional chess starting position.
    pub fn new() -> Game {
        Game {
            history: vec![Position::default()],
            moves: Vec::new(),
            repetitions: {
                let mut map = IntMap::default();
                map.insert(Position::default().hash, 1);
                map
            },
        }
    }

    /// Construct a `Game` from a FEN string, with no prior move history.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if `fen` is not a valid FEN.
    pub fn from_fen(fen: &str) -> Result<Game, &str> {
        let pos = Position::from_fen(fen)?;
        Ok(Game {
            repetitions: {
                let mut map = IntMap::default();
                map.insert(pos.hash, 1);
                map
            },
            history: vec![pos],
            moves: Vec::new(),
        })
    }

    /// Empty out the history of this game completely, but leave the original
    /// start state of the position.
    pub fn clear(&mut self) {
        self.history.truncate(1);
        let start_hash = self.history[0].hash;
        self.moves.clear();
        self.repetitions.clear();
        //since we cleared this, or_insert will always be called
        self.repetitions.entry(start_hash).or_insert(1);
    }

    /// Make a move, assuming said move is legal. If the history is empty
    /// (this should never happen if normal operations occurred), the move will
    /// be made from the default state of a `Position`.
    pub fn make_move(&mut self, m: Move) {
        let mut new_pos = self.history.last().unwrap().clone();
        new_pos.make_move(m);
        let num_reps = self.repetitions.entry(new_pos.hash).or_insert(0);
        *num_reps += 1;
        self.history.push(new_pos);
        self.moves.push(m);
    }

    /// Attempt to play a move, which may or may not be legal. If the move is
    /// legal, the move will be executed and the state will change, then
    /// `Ok(())` will be returned. If not, an `Err` will be returned to inform
    /// you that the move is illegal, and no state will be changed.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if `m` is not a legal move in the current position.
    pub fn try_move(&mut self, m: Move) -> Result<(), &'static str> {
        if self.get_moves::<ALL>().contains(&m) {
            self.make_move(m);
            Ok(())
        } else {
            Err("illegal move given!")
        }
    }

    /// Undo the most recent move. The return will be `Ok` if there are moves
    /// left to undo, with the internal value being the move that was undone,
    /// and `Err` if there are no moves to undo.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if there is no move to undo.
    pub fn undo(&mut self) -> Result<Move, &'static str> {
        let move_removed = match self.moves.pop() {
            Some(m) => m,
            None => return Err("no moves to remove"),
        };
        let pos_removed = match self.history.pop() {
            Some(p) => p,
            None => return Err("no positions in history"),
        };
        let num_reps = self.repetitions.entry(pos_removed.hash).or_insert(1);
        *num_reps -= 1;
        if *num_reps == 0 {
            self.repetitions.remove(&pos_removed.hash);
        }

        Ok(move_removed)
    }

    /// Undo a set number of moves. Returns an Err if you attempt to remove too
    /// many moves (and will not undo anything if that is the case).
    ///
    /// # Errors
    ///
    /// Returns an `Err` if `nmoves` is greater than the number of moves played
    /// so far.
    pub fn undo_n(&mut self, nmoves: usize) -> Result<(), &'static str> {
        if nmoves > self.moves.len() {
            return Err("attempted to remove more moves than are in history");
        }
        for _ in 0..nmoves {
            self.undo()?;
        }
        Ok(())
    }

    #[inline(always)]
    #[must_use]
    /// Get the position representing the current state of the game. Will panic
    /// if there is no history, but this should never happen.
    pub fn position(&self) -> &Position {
        self.history.last().unwrap()
    }

    #[must_use]
    /// In the current state, is the game complete (i.e. is there no way the
    /// game can continue)? The return type has the first type as whether the
    /// game is over, and the second is the player which has won if the game is
    /// over. It will be `None` for a draw.
    ///
    /// Checks, in order: whether the player to move has any legal moves,
    /// whether the game is drawn by threefold repetition, then whether the
    /// position is drawn by the fifty-move rule or insufficient material (the
    /// latter two delegated to `Position::is_drawn`).
    pub fn is_over(&self) -> (bool, Option<Color>) {
        let pos = self.position();

        if !has_moves(pos) {
            // either checkmate or stalemate
            // SAFETY: we trust that the position is valid, so there is exactly
            // one king for the player to move.
            let king_sq = unsafe { Square::unsafe_from(pos[Piece::King] & pos[pos.player]) };
            return match is_square_attacked_by(pos, king_sq, !pos.player) {
                true => (true, Some(!pos.player)),
                false => (true, None), // stalemate
            };
        }

        if self.is_drawn_by_repetition() || pos.is_drawn() {
            return (true, None);
        }

        (false, None)
    }

    #[must_use]
    /// Has the current position been reached three or more times over the
    /// course of this game?
    pub fn is_drawn_by_repetition(&self) -> bool {
        *self.repetitions.get(&self.position().hash).unwrap_or(&0) >= 3
    }

    #[must_use]
    /// Get the legal moves in this position. Will be empty if the game is
    /// over.
    pub fn get_moves<const M: GenMode>(&self) -> Vec<Move> {
        if self.is_drawn_by_repetition() {
            return Vec::new();
        }

        get_moves::<M>(self.position())
    }

    // no need for `is_empty` since history should always be nonempty
    #[allow(clippy::len_without_is_empty)]
    #[must_use]
    /// Get the number of total positions in this history of this game.
    pub fn len(&self) -> usize {
        self.history.len()
    }
}

impl Default for Game {
    fn default() -> Self {
        Game::new()
    }
}

impl Display for Game {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (pos, m) in self.history.iter().zip(self.moves.iter()) {
            write!(f, "{} ", algebraic_from_move(*m, pos))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Square;

    #[test]
    /// Test that we can play a simple move on a `Game` and have the position
    /// update accordingly.
    fn play_e4() {
        let mut g = Game::new();
        let m = Move::normal(Square::E2, Square::E4);
        let old_pos = g.position().clone();
        g.make_move(m);
        let new_pos = g.position().clone();
        crate::position::tests::move_result_helper(old_pos, new_pos, m);
    }

    #[test]
    /// Test that a single move can be undone correctly.
    fn undo_move() {
        let mut g = Game::new();
        let m = Move::normal(Square::E2, Square::E4);
        g.make_move(m);
        assert_eq!(g.undo(), Ok(m));
        assert_eq!(*g.position(), Position::default());
    }

    #[test]
    /// Test that an undo will fail if there is no history to undo.
    fn illegal_undo() {
        let mut g = Game::new();
        assert!(g.undo().is_err());
        assert_eq!(*g.position(), Position::default());
    }

    #[test]
    /// Test that we can undo multiple moves in a row.
    fn undo_multiple_moves() {
        let mut g = Game::new();
        let m0 = Move::normal(Square::E2, Square::E4);
        let m1 = Move::normal(Square::E7, Square::E5);
        g.make_move(m0);
        g.make_move(m1);
        assert_eq!(g.undo_n(2), Ok(()));
        assert_eq!(*g.position(), Position::default());
    }

    #[test]
    /// Test that a `Game` becomes exactly the same as what it started as if a
    /// move is undone.
    fn undo_equality() {
        let mut g = Game::new();
        g.make_move(Move::normal(Square::E2, Square::E4));
        assert!(g.undo().is_ok());
        assert_eq!(g, Game::new());
    }

    #[test]
    /// Test that undoing a move results in the previous position.
    fn undo_fried_liver() {
        // the fried liver FEN
        let fen = "r1bq1b1r/ppp2kpp/2n5/3np3/2B5/8/PPPP1PPP/RNBQK2R w KQ - 0 7";
        let mut g = Game::from_fen(fen).unwrap();
        let m = Move::normal(Square::D1, Square::F3);
        g.make_move(m);
        assert_eq!(g.undo(), Ok(m));
        assert_eq!(g, Game::from_fen(fen).unwrap());
        assert_eq!(g.position(), &Position::from_fen(fen).unwrap());
    }

    #[test]
    /// Test that undoing with no history results in an error.
    fn undo_fail() {
        let mut g = Game::new();
        assert!(g.undo().is_err());
    }

    #[test]
    /// Test that a mated position is in fact over.
    fn is_mate_over() {
        // the position from the end of Scholar's mate
        let g = Game::from_fen("rnbqk2r/pppp1Qpp/5n2/2b1p3/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 0 4")
            .unwrap();
        assert!(g.get_moves::<ALL>().is_empty());
        assert!(!has_moves(g.position()));
        assert_eq!(g.is_over(), (true, Some(Color::White)));
    }

    #[test]
    fn is_mate_over_2() {
        let g =
            Game::from_fen("r1b2b1r/ppp2kpp/8/4p3/3n4/2Q5/PP1PqPPP/RNB1K2R w KQ - 4 11").unwrap();
        assert!(g.get_moves::<ALL>().is_empty());
        assert!(!has_moves(g.position()));
        assert_eq!(g.is_over(), (true, Some(Color::Black)));
    }

    #[test]
    /// Test that making a mate found in testing results in the game being over.
    fn mate_in_1() {
        // Rb8# is the winning move
        let mut g = Game::from_fen("3k4/R7/1R6/5K2/8/8/8/8 w - - 0 1").unwrap();
        let m = Move::normal(Square::B6, Square::B8);
        assert!(g.get_moves::<ALL>().contains(&m));
        g.make_move(m);
        assert_eq!(g.is_over(), (true, Some(Color::White)));
    }

    #[test]
    /// Test that clearing a game has the same effect of replacing it with a
    /// default game, if the initial state was the initial position.
    fn clear_game() {
        let mut g = Game::new();
        g.make_move(Move::normal(Square::E2, Square::E4));
        g.clear();
        assert_eq!(g, Game::new());
    }

    #[test]
    /// Test that a king can escape check without capturing the checker.
    fn king_escape_without_capture() {
        let g = Game::from_fen("r2q1b1r/ppp3pp/2n1kn2/4p3/8/2N4Q/PPPP1PPP/R1B1K2R b KQ - 1 10")
            .unwrap();
        let moves = g.get_moves::<ALL>();
        let expected_moves = vec![
            Move::normal(Square::E6, Square::D6),
            Move::normal(Square::E6, Square::F7),
            Move::normal(Square::E6, Square::E7),
            Move::normal(Square::F6, Square::G4),
        ];
        for m in &moves {
            assert!(expected_moves.contains(m));
        }
        for em in &expected_moves {
            assert!(moves.contains(em));
        }
    }

    #[test]
    /// Test that threefold repetition is correctly detected.
    fn threefold_repetition() {
        let mut g = Game::new();
        let wiggle_out = Move::normal(Square::G1, Square::F3);
        let wiggle_back = Move::normal(Square::F3, Square::G1);
        let wiggle_out_black = Move::normal(Square::G8, Square::F6);
        let wiggle_back_black = Move::normal(Square::F6, Square::G8);

        assert!(!g.is_drawn_by_repetition());
        for _ in 0..2 {
            g.make_move(wiggle_out);
            g.make_move(wiggle_out_black);
            g.make_move(wiggle_back);
            g.make_move(wiggle_back_black);
        }
        assert!(g.is_drawn_by_repetition());
        assert_eq!(g.is_over(), (true, None));
    }
}
