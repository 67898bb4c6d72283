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

//! Performance testing, or "perft." Perft is used for verifying the correctness
//! of move generation and benchmarking the speed of both move generation and
//! the make/unmake processes.

use std::time::Instant;

use crate::movegen::ALL;

use super::{movegen::get_moves, Position};

#[allow(dead_code)]
/// Perform a performance test on the move generator and print out facts. The
/// input fen is the FEN of the board to start from, and the depth is the depth
/// from which to generate moves.
///
/// # Panics
///
/// This function will panic if `fen` is not a legal board.
pub fn perft(fen: &str, depth: u8) -> u64 {
    let pos = Position::from_fen(fen).unwrap();
    let tic = Instant::now();
    let num_nodes = perft_search(&pos, depth, true);
    let toc = Instant::now();
    let time = toc - tic;
    let speed = (num_nodes as f64) / time.as_secs_f64();
    println!(
        "time {:.2} secs, num nodes {num_nodes}: {speed:.0} nodes/sec",
        time.as_secs_f64()
    );

    num_nodes
}

/// The core search algorithm for perft.
fn perft_search(pos: &Position, depth: u8, divide: bool) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = get_moves::<ALL>(pos);
    let mut total = 0;
    let mut pcopy;
    for m in moves {
        pcopy = pos.clone();
        pcopy.make_move(m);
        let perft_count = perft_search(&pcopy, depth - 1, false);
        if divide {
            println!("{m}, {perft_count}");
        }
        total += perft_count;
    }

    total
}
