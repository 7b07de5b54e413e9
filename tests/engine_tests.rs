// Copyright 2026 the palisade authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end scenarios driving the engine, the board and the generator
//! together through full game fragments.

use std::sync::Arc;

use palisade::search::TranspositionTable;
use palisade::{Engine, GameState, Move, MoveGenerator, MoveVec, PieceKind, Position};

fn test_engine() -> Engine {
    Engine::with_table(Arc::new(TranspositionTable::with_capacity(1 << 14)))
}

fn play(pos: &mut Position, text: &str) -> Move {
    let gen = MoveGenerator::new();
    let mv = gen
        .create_move(pos, text)
        .unwrap_or_else(|| panic!("could not create {}", text));
    pos.try_make(&mv)
        .unwrap_or_else(|e| panic!("move {} rejected: {}", text, e));
    mv
}

fn legal_moves(pos: &mut Position) -> MoveVec {
    let gen = MoveGenerator::new();
    let mut moves = MoveVec::default();
    gen.generate_moves(pos, &mut moves);
    moves
}

#[test]
fn fools_mate_is_found_and_delivered() {
    let mut pos = Position::from_start_position();
    play(&mut pos, "f2f3");
    play(&mut pos, "e7e5");
    play(&mut pos, "g2g4");

    let mut engine = test_engine();
    engine.set_depth(2);
    let result = engine.search(&mut pos);
    let mv = result.best_move.expect("black must have a move");
    assert_eq!("d8h4", pos.move_text(&mv));

    pos.make(&mv);
    assert_eq!(GameState::Mate, pos.game_state());
}

#[test]
fn defends_the_scholars_mate_squeeze() {
    let mut pos = Position::from_start_position();
    play(&mut pos, "e2e4");

    let mut engine = test_engine();
    engine.set_depth(4);
    let reply = engine
        .search(&mut pos)
        .best_move
        .expect("black must have a reply to e4");
    pos.make(&reply);

    // Whatever black chose, white must not now have a forced mate delivered
    // on f7 within its next two moves. Queen sorties are the only candidate
    // first moves for that threat.
    let f7 = Position::inner_to_outer(8 + 5, pos.corner());
    let white_tries: Vec<Move> = legal_moves(&mut pos)
        .iter()
        .filter(|mv| mv.piece.kind == PieceKind::Queen)
        .copied()
        .collect();
    for w1 in white_tries {
        pos.make(&w1);
        let defenses = legal_moves(&mut pos);
        let mut all_defenses_lose = !defenses.is_empty();
        for defense in defenses.iter() {
            pos.make(defense);
            let mut mated = false;
            for finisher in legal_moves(&mut pos).iter() {
                if finisher.to != f7 {
                    continue;
                }
                pos.make(finisher);
                if pos.game_state() == GameState::Mate {
                    mated = true;
                }
                pos.unmake(finisher);
                if mated {
                    break;
                }
            }
            pos.unmake(defense);
            if !mated {
                all_defenses_lose = false;
                break;
            }
        }
        pos.unmake(&w1);
        assert!(
            !all_defenses_lose,
            "black's reply allows a forced mate on f7"
        );
    }
}

#[test]
fn fifty_move_rule_ends_the_game() {
    let mut pos = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 99 80").unwrap();
    assert_eq!(GameState::Active, pos.game_state());
    play(&mut pos, "a1b1");
    assert_eq!(GameState::Drawn, pos.game_state());
}

#[test]
fn threefold_repetition_ends_the_game() {
    let mut pos = Position::from_start_position();
    let shuffle = [
        "b1c3", "b8c6", "c3b1", "c6b8", "b1c3", "b8c6", "c3b1", "c6b8",
    ];
    for text in &shuffle {
        assert_eq!(GameState::Active, pos.game_state());
        play(&mut pos, text);
    }
    // The start position has now stood at three four-ply intervals.
    assert_eq!(GameState::Drawn, pos.game_state());
}

#[test]
fn en_passant_round_trip() {
    let fen = "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3";
    let mut pos = Position::from_fen(fen).unwrap();
    let before = pos.clone();

    let corner = pos.corner();
    let f5 = Position::inner_to_outer(3 * 8 + 5, corner);
    let f6 = Position::inner_to_outer(2 * 8 + 5, corner);
    let e5 = Position::inner_to_outer(3 * 8 + 4, corner);

    let mv = play(&mut pos, "e5f6");
    assert!(mv.is_en_passant);
    assert_eq!(None, pos.piece_at(f5), "captured pawn must be removed");
    assert_eq!("P", format!("{}", pos.piece_at(f6).unwrap()));
    assert_eq!(None, pos.piece_at(e5));
    assert_eq!(None, pos.en_passant_target());

    pos.unmake(&mv);
    assert!(pos == before, "unmake must restore the position exactly");
    assert_eq!("p", format!("{}", pos.piece_at(f5).unwrap()));
    assert_eq!("P", format!("{}", pos.piece_at(e5).unwrap()));
    assert_eq!(Some(f6), pos.en_passant_target());
    assert_eq!(fen, pos.as_fen());
}

#[test]
fn castling_through_check_is_never_offered() {
    let mut pos = Position::from_fen("4r1k1/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
    for mv in legal_moves(&mut pos).iter() {
        assert!(
            !mv.is_castle,
            "castle {} generated while the king is checked",
            pos.move_text(mv)
        );
    }

    // The same applies when only the crossing squares are covered.
    let mut pos = Position::from_fen("3r2k1/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
    let texts: Vec<String> = legal_moves(&mut pos)
        .iter()
        .map(|mv| pos.move_text(mv))
        .collect();
    assert!(!texts.contains(&"e1c1".to_string()), "queenside crosses d1");
    assert!(texts.contains(&"e1g1".to_string()), "kingside path is clear");
}

#[test]
fn engine_plays_a_short_self_game() {
    let mut white = test_engine();
    white.set_depth(2);
    let mut black: Engine = Engine::with_table(white.table());
    black.set_depth(2);

    let mut pos = Position::from_start_position();
    for _ in 0..10 {
        if pos.game_state() != GameState::Active {
            break;
        }
        let engine = match pos.side_to_move() {
            palisade::Color::White => &mut white,
            palisade::Color::Black => &mut black,
        };
        let mv = engine
            .search(&mut pos)
            .best_move
            .expect("active position must yield a move");
        pos.try_make(&mv)
            .unwrap_or_else(|e| panic!("engine chose an illegal move: {}", e));
    }
}
