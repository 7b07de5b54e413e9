// Copyright 2026 the palisade authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::eval::{ClassicalEvaluator, Evaluate};
use crate::move_generator::{MoveGenerator, MoveVec};
use crate::moves::Move;
use crate::position::Position;
use crate::search::{MtdSearch, SearchResult, TranspositionTable, COUNTER_MOVE_SLOTS};

pub const DEFAULT_DEPTH: u32 = 7;

const DEFAULT_CACHE_MB: usize = 256;

/// Transposition cache budget in megabytes, taken from the `CACHE_MB`
/// environment variable when set.
pub fn cache_budget_mb() -> usize {
    env::var("CACHE_MB")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_CACHE_MB)
}

struct TimerState {
    deadline: Option<Instant>,
    shutdown: bool,
}

struct TimerShared {
    state: Mutex<TimerState>,
    wakeup: Condvar,
    time_up: AtomicBool,
}

/// A per-move deadline on its own thread. `arm` schedules a deadline;
/// once it passes, the thread raises the time-up flag, which the search
/// polls between nodes. The thread sleeps on a condvar while idle and is
/// joined when the timer is dropped.
pub struct DeadlineTimer {
    shared: Arc<TimerShared>,
    handle: Option<JoinHandle<()>>,
}

impl DeadlineTimer {
    pub fn new() -> DeadlineTimer {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                deadline: None,
                shutdown: false,
            }),
            wakeup: Condvar::new(),
            time_up: AtomicBool::new(false),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("deadline-timer".to_string())
            .spawn(move || DeadlineTimer::run(&thread_shared))
            .expect("failed to spawn timer thread");

        DeadlineTimer {
            shared,
            handle: Some(handle),
        }
    }

    fn run(shared: &TimerShared) {
        let mut state = shared.state.lock().expect("timer lock poisoned");
        loop {
            if state.shutdown {
                break;
            }
            match state.deadline {
                None => {
                    state = shared.wakeup.wait(state).expect("timer lock poisoned");
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        shared.time_up.store(true, Ordering::SeqCst);
                        state.deadline = None;
                    } else {
                        let (guard, _) = shared
                            .wakeup
                            .wait_timeout(state, deadline - now)
                            .expect("timer lock poisoned");
                        state = guard;
                    }
                }
            }
        }
    }

    /// Schedules the flag to rise after `budget`, replacing any previous
    /// deadline and clearing the flag. The flag is cleared under the state
    /// lock so a previous deadline firing concurrently cannot leave it
    /// stale.
    pub fn arm(&self, budget: Duration) {
        let mut state = self.shared.state.lock().expect("timer lock poisoned");
        state.deadline = Some(Instant::now() + budget);
        self.shared.time_up.store(false, Ordering::SeqCst);
        self.shared.wakeup.notify_all();
    }

    /// Cancels any pending deadline and lowers the flag.
    pub fn disarm(&self) {
        {
            let mut state = self.shared.state.lock().expect("timer lock poisoned");
            state.deadline = None;
            self.shared.wakeup.notify_all();
        }
        self.shared.time_up.store(false, Ordering::SeqCst);
    }

    pub fn time_up(&self) -> bool {
        self.shared.time_up.load(Ordering::SeqCst)
    }
}

impl Default for DeadlineTimer {
    fn default() -> DeadlineTimer {
        DeadlineTimer::new()
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().expect("timer lock poisoned");
            state.shutdown = true;
            self.shared.wakeup.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            handle.join().expect("timer thread panicked");
        }
    }
}

/// A chess engine instance: an evaluator, an owned handle to a (possibly
/// shared) transposition cache, the counter-move table, the previous root
/// move and the deadline timer. Search state persists across `search` calls
/// within one instance.
pub struct Engine<E = ClassicalEvaluator> {
    evaluator: E,
    ttable: Arc<TranspositionTable>,
    counter_moves: Box<[Option<Move>; COUNTER_MOVE_SLOTS]>,
    prev_root_move: Option<Move>,
    max_depth: u32,
    move_time_limit: Option<Duration>,
    timer: DeadlineTimer,
}

impl<E: Evaluate + Default> Engine<E> {
    /// An engine with its own cache, sized from the `CACHE_MB` budget.
    pub fn new() -> Engine<E> {
        Engine::with_table(Arc::new(TranspositionTable::with_budget_mb(
            cache_budget_mb(),
        )))
    }

    /// An engine sharing an existing transposition cache.
    pub fn with_table(ttable: Arc<TranspositionTable>) -> Engine<E> {
        Engine {
            evaluator: E::default(),
            ttable,
            counter_moves: Box::new([None; COUNTER_MOVE_SLOTS]),
            prev_root_move: None,
            max_depth: DEFAULT_DEPTH,
            move_time_limit: None,
            timer: DeadlineTimer::new(),
        }
    }
}

impl<E: Evaluate + Default> Default for Engine<E> {
    fn default() -> Engine<E> {
        Engine::new()
    }
}

impl<E: Evaluate> Engine<E> {
    pub fn set_depth(&mut self, depth: u32) {
        self.max_depth = depth.max(1);
    }

    pub fn set_move_time_limit(&mut self, seconds: u64) {
        self.move_time_limit = Some(Duration::from_secs(seconds));
    }

    pub fn set_infinite_time(&mut self) {
        self.move_time_limit = None;
    }

    /// A handle to this engine's transposition cache, suitable for
    /// constructing further engines over the same cache.
    pub fn table(&self) -> Arc<TranspositionTable> {
        Arc::clone(&self.ttable)
    }

    /// Selects a move for the side to move. The position is mutated during
    /// the search but restored before returning; the chosen move is not
    /// applied.
    pub fn search(&mut self, pos: &mut Position) -> SearchResult {
        match self.move_time_limit {
            Some(budget) => self.timer.arm(budget),
            None => self.timer.disarm(),
        }

        let mut result = {
            let mut session = MtdSearch {
                evaluator: &self.evaluator,
                ttable: &*self.ttable,
                counter_moves: &mut *self.counter_moves,
                prev_root_move: self.prev_root_move,
                timer: &self.timer,
                nodes: 0,
            };
            session.run(pos, self.max_depth)
        };
        self.timer.disarm();

        // A cache collision can hand back a move from a different position.
        // Cross-check against the legal list and substitute its twin (whose
        // undo snapshots belong to this position); fall back to the first
        // legal move rather than ever returning a foreign one.
        let gen = MoveGenerator::new();
        let mut legal = MoveVec::default();
        gen.generate_moves(pos, &mut legal);
        let chosen = result
            .best_move
            .and_then(|best| legal.iter().find(|mv| mv.same_action(&best)).copied())
            .or_else(|| {
                if result.best_move.is_some() {
                    warn!("discarding foreign best move from a cache collision");
                }
                legal.first().copied()
            });
        result.best_move = chosen;

        if let Some(mv) = result.best_move {
            self.prev_root_move = Some(mv);
        }
        result
    }
}
