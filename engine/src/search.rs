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

//! Iterative-deepening alpha-beta search.
//!
//! The tree walk below is a plain negamax: `alpha_beta` always returns a
//! score from the perspective of the player to move at the node it was
//! called on, so a child's score is negated before being compared against
//! the parent's window. `search_root` is the only place that converts back
//! to White-relative centipawns, since that is the convention the rest of
//! this crate's evaluation and material code use.

use zugzwang_base::{
    movegen::{get_moves, is_legal, ALL, CAPTURES},
    Eval, Game, Move, Position,
};

use crate::{
    config::SearchConfig,
    evaluate,
    limit::SearchController,
    material,
    pick::{order_moves, History, Killers},
    transposition::{Bound, TTable},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// The search was cancelled by its `SearchController` before it could
/// finish examining a node.
pub struct SearchError;

#[derive(Clone, Debug, PartialEq, Eq)]
/// The outcome of a completed (or cancelled-but-recovered) search.
pub struct SearchInfo {
    /// The move judged best, if any legal move exists.
    pub best_move: Option<Move>,
    /// The score of `best_move`, in centipawns, White-positive.
    pub eval: Eval,
    /// The depth, in plies, that was fully searched to produce this result.
    pub depth: u8,
    /// The number of nodes visited over the whole iterative-deepening search.
    pub nodes: u64,
    /// The principal variation, starting with `best_move`.
    pub pv: Vec<Move>,
}

type NodeResult = Result<Eval, SearchError>;

/// Run a negamax alpha-beta search to `depth` plies, returning a score in
/// the perspective of the player to move in `game`'s current position.
///
/// `game`, not a bare `Position`, is threaded through the whole tree so that
/// a repetition reached only inside the search (not necessarily in the game
/// actually played so far) is still detected as a draw.
#[allow(clippy::too_many_arguments)]
fn alpha_beta(
    game: &mut Game,
    depth: i8,
    mut alpha: Eval,
    beta: Eval,
    ply: u8,
    tt: &mut TTable,
    killers: &mut Killers,
    history: &mut History,
    controller: &SearchController,
) -> NodeResult {
    controller.add_node();
    if controller.should_stop() {
        return Err(SearchError);
    }

    // `game`, not just `pos.is_drawn()`, is consulted here so a repetition
    // reached only inside this search tree (never actually played on the
    // board) is still scored as a draw, per `Game::is_drawn_by_repetition`.
    if game.position().is_drawn() || game.is_drawn_by_repetition() {
        return Ok(Eval::DRAW);
    }

    let key = game.position().hash;
    let mut tt_move = None;
    let mut beta = beta;
    if let Some(entry) = tt.probe(key) {
        tt_move = entry.best_move;
        if entry.depth >= depth {
            match entry.flag {
                Bound::Exact => return Ok(entry.score),
                Bound::LowerBound => alpha = alpha.max(entry.score),
                Bound::UpperBound => beta = beta.min(entry.score),
            }
            if alpha >= beta {
                return Ok(entry.score);
            }
        }
    }

    if depth <= 0 {
        return quiescence(game, alpha, beta, ply, controller);
    }

    let mut moves = get_moves::<ALL>(game.position());
    if moves.is_empty() {
        return Ok(if game.position().checkers.is_empty() {
            Eval::DRAW
        } else {
            // The mover has just been mated; this is as bad as it gets from
            // their own perspective. `ply` disambiguates mate distance so
            // shorter mates are always preferred over longer ones.
            -Eval::mate_in(u16::from(ply))
        });
    }

    order_moves(
        &mut moves,
        game.position(),
        tt_move,
        killers,
        usize::from(ply),
        history,
    );

    let orig_alpha = alpha;
    let mut best_score = Eval::MIN;
    let mut best_move = moves[0];

    for m in moves {
        game.make_move(m);
        let child = alpha_beta(
            game,
            depth - 1,
            -beta,
            -alpha,
            ply + 1,
            tt,
            killers,
            history,
            controller,
        );
        game.undo()
            .expect("a move just made by this same call can always be undone");
        let score = -child?;

        if score > best_score {
            best_score = score;
            best_move = m;
        }
        if best_score > alpha {
            alpha = best_score;
        }
        if alpha >= beta {
            if !game.position().is_move_capture(m) {
                killers.record(usize::from(ply), m);
                history.record(m, depth.max(0) as u8);
            }
            tt.store(key, depth, best_score, Bound::LowerBound, Some(m));
            return Ok(best_score);
        }
    }

    let flag = if best_score > orig_alpha {
        Bound::Exact
    } else {
        Bound::UpperBound
    };
    tt.store(key, depth, best_score, flag, Some(best_move));

    Ok(best_score)
}

/// Score a capture by MVV-LVA alone, for use in quiescence, which has no TT
/// move, killers, or history to consult.
fn mvv_lva(pos: &Position, m: Move) -> i32 {
    let victim = if m.is_en_passant() {
        zugzwang_base::Piece::Pawn
    } else {
        pos.type_at_square(m.to_square())
            .expect("a capture must have a piece on its destination square")
    };
    let attacker = pos
        .type_at_square(m.from_square())
        .expect("the moving piece must occupy its own origin square");
    i32::from(material::value(victim).centipawn_val()) * 1000
        - i32::from(material::value(attacker).centipawn_val())
}

/// Extend the search along capture lines only, to avoid misjudging a
/// position that ends mid-exchange (the horizon effect).
fn quiescence(
    game: &mut Game,
    mut alpha: Eval,
    beta: Eval,
    ply: u8,
    controller: &SearchController,
) -> NodeResult {
    controller.add_node();
    if controller.should_stop() {
        return Err(SearchError);
    }

    let pos = game.position();
    let stand_pat = evaluate::evaluate(pos).in_perspective(pos.player);
    if stand_pat >= beta {
        return Ok(stand_pat);
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let mut captures = get_moves::<CAPTURES>(pos);
    captures.sort_by_cached_key(|&m| std::cmp::Reverse(mvv_lva(pos, m)));

    for m in captures {
        game.make_move(m);
        let child = quiescence(game, -beta, -alpha, ply + 1, controller);
        game.undo()
            .expect("a move just made by this same call can always be undone");
        let score = -child?;

        if score >= beta {
            return Ok(score);
        }
        if score > alpha {
            alpha = score;
        }
    }

    Ok(alpha)
}

/// Walk the transposition table forward from `pos`, following each entry's
/// recorded best move, to recover up to `max_plies` moves of principal
/// variation. Stops early at a missing entry, a missing best move, or a
/// best move that is no longer legal (a stale or colliding entry).
fn reconstruct_pv(pos: &Position, tt: &TTable, max_plies: u8) -> Vec<Move> {
    let mut pv = Vec::new();
    let mut scratch = pos.clone();

    for _ in 0..max_plies {
        let Some(entry) = tt.probe(scratch.hash) else {
            break;
        };
        let Some(m) = entry.best_move else {
            break;
        };
        if !is_legal(m, &scratch) {
            break;
        }
        scratch.make_move(m);
        pv.push(m);
    }

    pv
}

#[must_use]
/// Search `game`'s current position by iterative deepening from depth 1 to
/// `config.max_depth`, stopping early if `controller` reports the search
/// should stop.
///
/// `game` (rather than a bare `Position`) is required so the search can
/// detect threefold repetition both in the game played so far and in
/// repetitions reached only within the search tree itself, per
/// `Game::is_drawn_by_repetition`.
///
/// Every iteration searches the whole tree again from scratch, but the
/// transposition table and move-ordering tables filled in by shallower
/// iterations make each successive iteration far cheaper than it would be
/// cold, and guarantee that a well-ordered best move is ready at any depth
/// the caller chooses to stop at.
pub fn search_root(
    game: &mut Game,
    config: SearchConfig,
    tt: &mut TTable,
    controller: &SearchController,
) -> SearchInfo {
    controller.start(config.max_time_ms);
    let mut killers = Killers::new();
    let mut history = History::new();
    let mut last_complete: Option<SearchInfo> = None;

    for depth in 1..=config.max_depth {
        if controller.should_stop() {
            break;
        }

        let result = alpha_beta(
            game,
            depth as i8,
            Eval::MIN,
            Eval::MAX,
            0,
            tt,
            &mut killers,
            &mut history,
            controller,
        );

        let Ok(root_score) = result else {
            break;
        };
        if controller.should_stop() {
            break;
        }

        let best_move = tt.probe(game.position().hash).and_then(|entry| entry.best_move);
        let pv = reconstruct_pv(game.position(), tt, depth);

        last_complete = Some(SearchInfo {
            best_move: best_move.or_else(|| pv.first().copied()),
            eval: root_score.in_perspective(game.position().player),
            depth,
            nodes: controller.num_nodes(),
            pv,
        });
    }

    last_complete.unwrap_or_else(|| SearchInfo {
        best_move: None,
        eval: evaluate::evaluate(game.position()),
        depth: 0,
        nodes: controller.num_nodes(),
        pv: Vec::new(),
    })
}
