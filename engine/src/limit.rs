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

//! Cancellation and resource limits for a search.
//!
//! A `SearchController` is polled at every node entry. Once it reports that
//! the search is over, `alpha_beta` and `quiescence` unwind with a
//! cancellation signal rather than completing their work; the
//! iterative-deepening driver in `search` catches that signal and returns
//! the best result from the last depth that finished cleanly.

use std::{
    cell::Cell,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// A soft cap on the number of nodes a single search is allowed to visit,
/// checked in addition to the wall-clock deadline.
const NODE_BUDGET: u64 = 10_000_000;

#[derive(Debug, Default)]
/// Tracks whether a search should keep running, by wall-clock deadline, node
/// budget, and an externally-settable stop flag.
pub struct SearchController {
    /// Set once the controller has decided the search is over.
    over: AtomicBool,
    /// The cumulative number of nodes which have been visited since `start`.
    num_nodes: AtomicU64,
    /// The instant at which the search must stop, if any.
    deadline: Cell<Option<Instant>>,
}

// `Cell` is not `Sync`, but this crate's search is single-threaded
// cooperative: a `SearchController` is only ever touched from the thread
// that owns the search that created it.
unsafe impl Sync for SearchController {}

impl SearchController {
    #[must_use]
    /// Construct a new `SearchController` with no deadline and no nodes
    /// visited.
    pub fn new() -> SearchController {
        SearchController {
            over: AtomicBool::new(false),
            num_nodes: AtomicU64::new(0),
            deadline: Cell::new(None),
        }
    }

    /// Reset this controller for a fresh search, optionally bounding it by a
    /// time budget in milliseconds.
    pub fn start(&self, max_time_ms: Option<u64>) {
        self.num_nodes.store(0, Ordering::Relaxed);
        self.over.store(false, Ordering::Relaxed);
        self.deadline
            .set(max_time_ms.map(|ms| Instant::now() + Duration::from_millis(ms)));
    }

    /// Ask the search to stop as soon as it next polls this controller.
    pub fn request_stop(&self) {
        self.over.store(true, Ordering::Relaxed);
    }

    #[inline]
    #[must_use]
    /// Poll whether the search must stop: either because it was explicitly
    /// told to, because the deadline has passed, or because the node budget
    /// has been exhausted.
    pub fn should_stop(&self) -> bool {
        if self.over.load(Ordering::Relaxed) {
            return true;
        }
        if let Some(deadline) = self.deadline.get() {
            if Instant::now() >= deadline {
                self.over.store(true, Ordering::Relaxed);
                return true;
            }
        }
        if self.num_nodes.load(Ordering::Relaxed) > NODE_BUDGET {
            self.over.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    #[inline]
    /// Record that one more node has been visited.
    pub fn add_node(&self) {
        self.num_nodes.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    /// Get the cumulative number of nodes visited since `start`.
    pub fn num_nodes(&self) -> u64 {
        self.num_nodes.load(Ordering::Relaxed)
    }
}
