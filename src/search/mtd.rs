// Copyright 2026 the palisade authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::cmp;

use arrayvec::ArrayVec;

use crate::engine::DeadlineTimer;
use crate::eval::{piece_value, Evaluate};
use crate::move_generator::{MoveGenerator, MoveVec};
use crate::moves::Move;
use crate::position::Position;
use crate::search::{Bound, TableEntry, TranspositionTable};
use crate::types::{Color, TableIndex};

/// One slot per (piece kind, destination square) pair.
pub(crate) const COUNTER_MOVE_SLOTS: usize = 6 * 64;

/// Index into the counter-move table for the move that was just answered.
pub(crate) fn counter_move_slot(pos: &Position, prev: &Move) -> usize {
    let inner = Position::convert_outer_index(prev.to, pos.corner());
    prev.piece.kind.as_index() * 64 + inner
}

pub struct SearchResult {
    pub best_move: Option<Move>,
    pub score: i32,
    pub nodes_searched: u64,
    pub depth: u32,
}

/// One search session over a position: iterative deepening driving MTD(f),
/// which in turn drives null-window alpha-beta against the transposition
/// table. Borrows the engine's long-lived tables for the duration of the
/// search.
pub(crate) struct MtdSearch<'a, E> {
    pub evaluator: &'a E,
    pub ttable: &'a TranspositionTable,
    pub counter_moves: &'a mut [Option<Move>; COUNTER_MOVE_SLOTS],
    pub prev_root_move: Option<Move>,
    pub timer: &'a DeadlineTimer,
    pub nodes: u64,
}

impl<'a, E: Evaluate> MtdSearch<'a, E> {
    /// Searches depths 1..=max_depth, seeding each MTD(f) pass with the
    /// previous depth's score. When the deadline fires mid-iteration, the
    /// partial iteration is discarded and the last completed depth's answer
    /// stands.
    pub fn run(&mut self, pos: &mut Position, max_depth: u32) -> SearchResult {
        let mut best_move = None;
        let mut best_score = 0;
        let mut completed = 0;

        for depth in 1..=max_depth {
            let (mv, score) = self.mtd(pos, best_score, depth);
            if self.timer.time_up() {
                debug!("deadline fired during depth {}, keeping depth {}", depth, completed);
                break;
            }
            best_move = mv.or(best_move);
            best_score = score;
            completed = depth;
            info!(
                "depth {}: best {} score {} ({} nodes)",
                depth,
                best_move.map_or_else(|| "-".to_string(), |m| pos.move_text(&m)),
                best_score,
                self.nodes
            );
        }

        SearchResult {
            best_move,
            score: best_score,
            nodes_searched: self.nodes,
            depth: completed,
        }
    }

    /// MTD(f): repeated null-window alpha-beta passes that walk the
    /// [lower, upper] bracket onto the minimax value.
    fn mtd(&mut self, pos: &mut Position, first_guess: i32, depth: u32) -> (Option<Move>, i32) {
        let mut guess = first_guess;
        let mut best_move = None;
        let mut upper = i32::max_value();
        let mut lower = i32::min_value() + 1;

        while lower < upper {
            let beta = cmp::max(guess, lower + 1);
            let (mv, score) = self.alpha_beta(pos, beta - 1, beta, depth);
            if self.timer.time_up() {
                return (mv.or(best_move), score);
            }
            guess = score;
            if mv.is_some() {
                best_move = mv;
            }
            if guess < beta {
                upper = guess;
            } else {
                lower = guess;
            }
        }

        (best_move, guess)
    }

    fn alpha_beta(
        &mut self,
        pos: &mut Position,
        mut alpha: i32,
        mut beta: i32,
        depth: u32,
    ) -> (Option<Move>, i32) {
        self.nodes += 1;

        // The cached result short-circuits this node when it was searched at
        // least as deep; a shallower entry still seeds move ordering.
        let hash = pos.zobrist_hash();
        let mut pv_move = None;
        if let Some(entry) = self.ttable.probe(hash) {
            pv_move = entry.best_move;
            if entry.depth >= depth {
                match entry.bound {
                    Bound::Exact => return (entry.best_move, entry.score),
                    Bound::Lower => alpha = cmp::max(alpha, entry.score),
                    Bound::Upper => beta = cmp::min(beta, entry.score),
                }
                if alpha >= beta {
                    return (entry.best_move, entry.score);
                }
            }
        }

        if depth == 0 {
            let score = self.evaluator.evaluate(pos);
            self.record(pos, hash, None, 0, score, alpha, beta);
            return (None, score);
        }

        let gen = MoveGenerator::new();
        let mut raw = MoveVec::default();
        gen.generate_moves(pos, &mut raw);
        if raw.is_empty() {
            // Mate or stalemate; the evaluator scores the terminal state.
            let score = self.evaluator.evaluate(pos);
            self.record(pos, hash, None, depth, score, alpha, beta);
            return (None, score);
        }

        let moves = self.order_moves(pos, &raw, pv_move);

        let mut best_move = None;
        let mut best_score;
        match pos.side_to_move() {
            Color::White => {
                best_score = i32::min_value();
                let mut a = alpha;
                for mv in moves.iter() {
                    if best_score >= beta {
                        break;
                    }
                    if self.timer.time_up() {
                        return (best_move, best_score);
                    }
                    pos.make(mv);
                    let (_, score) = self.alpha_beta(pos, a, beta, depth - 1);
                    pos.unmake(mv);
                    if score > best_score {
                        best_score = score;
                        best_move = Some(*mv);
                    }
                    a = cmp::max(a, best_score);
                }
            }
            Color::Black => {
                best_score = i32::max_value();
                let mut b = beta;
                for mv in moves.iter() {
                    if best_score <= alpha {
                        break;
                    }
                    if self.timer.time_up() {
                        return (best_move, best_score);
                    }
                    pos.make(mv);
                    let (_, score) = self.alpha_beta(pos, alpha, b, depth - 1);
                    pos.unmake(mv);
                    if score < best_score {
                        best_score = score;
                        best_move = Some(*mv);
                    }
                    b = cmp::min(b, best_score);
                }
            }
        }

        self.record(pos, hash, best_move, depth, best_score, alpha, beta);
        (best_move, best_score)
    }

    /// Classifies a node result against its window and stores it. A fail
    /// high caused by a quiet move also lands in the counter-move table,
    /// keyed by the engine's previous root move.
    fn record(
        &mut self,
        pos: &Position,
        hash: u64,
        best_move: Option<Move>,
        depth: u32,
        score: i32,
        alpha: i32,
        beta: i32,
    ) {
        let bound = if score <= alpha {
            Bound::Upper
        } else if score < beta {
            Bound::Exact
        } else {
            Bound::Lower
        };
        self.ttable.store(
            hash,
            TableEntry {
                depth,
                score,
                bound,
                best_move,
            },
        );

        if bound == Bound::Lower {
            if let (Some(cut_move), Some(prev)) = (best_move, self.prev_root_move) {
                if cut_move.captured.is_none() {
                    self.counter_moves[counter_move_slot(pos, &prev)] = Some(cut_move);
                }
            }
        }
    }

    /// Move ordering: the remembered best move first, then captures by most
    /// valuable victim (ties to the least valuable attacker), then the
    /// counter-move for the opponent's previous root move, then the
    /// remaining quiet moves in generation order.
    fn order_moves(&self, pos: &Position, raw: &MoveVec, pv_move: Option<Move>) -> MoveVec {
        let mut out = MoveVec::default();

        if let Some(pv) = pv_move {
            if let Some(&found) = raw.iter().find(|mv| mv.same_action(&pv)) {
                out.push(found);
            }
        }

        let mut captures: ArrayVec<[Move; 224]> = raw
            .iter()
            .filter(|mv| mv.captured.is_some())
            .cloned()
            .collect();
        captures.sort_unstable_by_key(|mv| {
            let victim = mv.captured.map_or(0, |p| piece_value(p.kind));
            let attacker = piece_value(mv.piece.kind);
            (-victim, attacker)
        });
        for mv in captures.iter() {
            push_unique(&mut out, *mv);
        }

        if let Some(prev) = self.prev_root_move {
            if let Some(counter) = self.counter_moves[counter_move_slot(pos, &prev)] {
                if let Some(&found) = raw.iter().find(|mv| mv.same_action(&counter)) {
                    push_unique(&mut out, found);
                }
            }
        }

        for mv in raw.iter() {
            push_unique(&mut out, *mv);
        }

        debug_assert_eq!(raw.len(), out.len());
        out
    }
}

fn push_unique(out: &mut MoveVec, mv: Move) {
    if !out.iter().any(|m| m.same_action(&mv)) {
        out.push(mv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::ClassicalEvaluator;

    fn search(fen: &str, depth: u32) -> (Position, SearchResult) {
        let mut pos = Position::from_fen(fen).unwrap();
        let evaluator = ClassicalEvaluator::new();
        let ttable = TranspositionTable::with_capacity(1 << 16);
        let timer = DeadlineTimer::new();
        let mut counters = Box::new([None; COUNTER_MOVE_SLOTS]);
        let mut session = MtdSearch {
            evaluator: &evaluator,
            ttable: &ttable,
            counter_moves: &mut *counters,
            prev_root_move: None,
            timer: &timer,
            nodes: 0,
        };
        let result = session.run(&mut pos, depth);
        (pos, result)
    }

    fn best_move_text(fen: &str, depth: u32) -> String {
        let (pos, result) = search(fen, depth);
        pos.move_text(&result.best_move.expect("search found no move"))
    }

    #[test]
    fn finds_mate_in_one_as_white() {
        // Back-rank mate.
        assert_eq!("a1a8", best_move_text("6k1/5ppp/8/8/8/8/8/R3K3 w - - 0 1", 2));
    }

    #[test]
    fn finds_mate_in_one_as_black() {
        assert_eq!("a8a1", best_move_text("r3k3/8/8/8/8/8/5PPP/6K1 b - - 0 1", 2));
    }

    #[test]
    fn takes_the_hanging_queen() {
        assert_eq!("d1d8", best_move_text("3q2k1/8/8/8/8/8/8/3QK3 w - - 0 1", 2));
    }

    #[test]
    fn search_leaves_position_untouched() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let (pos, _) = search(fen, 2);
        assert_eq!(fen, pos.as_fen());
    }

    #[test]
    fn deeper_search_still_reports_result() {
        let (_, result) = search("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 3);
        assert!(result.best_move.is_some());
        assert_eq!(3, result.depth);
        assert!(result.nodes_searched > 0);
    }

    #[test]
    fn ordering_puts_pv_first_and_sorts_captures() {
        let mut pos =
            Position::from_fen("k2r4/8/8/8/3p4/2P1P3/8/K7 w - - 0 1").unwrap();
        let gen = MoveGenerator::new();
        let mut raw = MoveVec::default();
        gen.generate_moves(&mut pos, &mut raw);

        // Declare the quiet a1b1 to be the remembered best move.
        let pv = *raw
            .iter()
            .find(|mv| pos.move_text(mv) == "a1b1")
            .expect("a1b1 should be legal");

        let evaluator = ClassicalEvaluator::new();
        let ttable = TranspositionTable::with_capacity(16);
        let timer = DeadlineTimer::new();
        let mut counters = Box::new([None; COUNTER_MOVE_SLOTS]);
        let session = MtdSearch {
            evaluator: &evaluator,
            ttable: &ttable,
            counter_moves: &mut *counters,
            prev_root_move: None,
            timer: &timer,
            nodes: 0,
        };
        let ordered = session.order_moves(&pos, &raw, Some(pv));

        assert_eq!(raw.len(), ordered.len());
        assert_eq!("a1b1", pos.move_text(&ordered[0]));
        // Both pawn captures of the d4 pawn follow; no other captures exist.
        assert!(ordered[1].captured.is_some());
        assert!(ordered[2].captured.is_some());
        assert!(ordered[3..].iter().all(|mv| mv.captured.is_none()));
    }
}
