// Copyright 2026 the palisade authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The interactive text surface: a small command menu, the three game
//! modes, and the perft benchmark.

use std::io::{self, Write};
use std::time::Instant;

use regex::Regex;

use crate::engine::Engine;
use crate::move_generator::MoveGenerator;
use crate::perft::perft;
use crate::position::Position;
use crate::types::{Color, GameState};

lazy_static! {
    /// Coordinate move input: two letter-digit squares or four digits.
    static ref MOVE_INPUT: Regex = Regex::new("^(?:[a-h][1-8]){2}$|^[1-8]{4}$").unwrap();
}

/// Positions with published perft node counts, exercised by `benchmark`.
static BENCHMARK_POSITIONS: [(&str, &str, u32, u64); 5] = [
    (
        "start position",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        4,
        197_281,
    ),
    (
        "kiwipete",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        3,
        97_862,
    ),
    (
        "position 3",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        4,
        43_238,
    ),
    (
        "position 4",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2pP/R2Q1RK1 w kq - 0 1",
        3,
        9467,
    ),
    (
        "position 5",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        3,
        62_379,
    ),
];

#[derive(Copy, Clone)]
struct GameConfig {
    time_limit: Option<u64>,
    depth: u32,
}

/// The top-level menu loop. Dispatches `game`, `benchmark`, `help` and
/// `exit`; anything else re-prompts.
pub struct Menu;

impl Menu {
    pub fn new() -> Menu {
        Menu
    }

    pub fn run(&self) -> io::Result<()> {
        println!("Welcome to palisade, a classical chess engine.");
        println!();
        loop {
            let input = prompt("Enter a command, or help to list the commands: ")?;
            match input.as_str() {
                "exit" => return Ok(()),
                "help" => print_help(),
                "benchmark" => run_benchmark(),
                "game" => setup_game()?,
                "" => continue,
                other => println!("Unknown command: {}", other),
            }
        }
    }
}

impl Default for Menu {
    fn default() -> Menu {
        Menu::new()
    }
}

fn print_help() {
    println!("game      - configure and play a game against another player or the engine");
    println!("benchmark - run the move generator against published perft counts");
    println!("help      - show this message");
    println!("exit      - leave the program");
}

/// Prompts for the game type and hands off to the matching loop. `cancel`
/// backs out at every step.
pub fn setup_game() -> io::Result<()> {
    loop {
        let input = prompt("Game type (1 - human vs human; 2 - human vs engine; 3 - engine vs engine): ")?;
        match input.as_str() {
            "1" => return play_human_game(),
            "2" => {
                let config = match configure_engine()? {
                    Some(config) => config,
                    None => return Ok(()),
                };
                loop {
                    let side = prompt("Should the engine play as [w]hite or as [b]lack? ")?;
                    match side.as_str() {
                        "w" => return play_mixed_game(Color::White, config),
                        "b" => return play_mixed_game(Color::Black, config),
                        "cancel" => return Ok(()),
                        _ => println!("Please answer w, b, or cancel."),
                    }
                }
            }
            "3" => {
                return match configure_engine()? {
                    Some(config) => play_engine_game(config),
                    None => Ok(()),
                };
            }
            "cancel" => return Ok(()),
            _ => println!("Please answer 1, 2, 3, or cancel."),
        }
    }
}

/// Per-move time limit (whole seconds or none) and search depth in plies.
fn configure_engine() -> io::Result<Option<GameConfig>> {
    let time_limit = loop {
        let input = prompt("Use a per-move time limit [y/n]? ")?;
        match input.as_str() {
            "y" => {
                break Some(loop {
                    let raw = prompt("Time limit in whole seconds (minimum 1): ")?;
                    match raw.parse::<u64>() {
                        Ok(secs) if secs >= 1 => break secs,
                        _ => println!("Please enter a whole number of seconds."),
                    }
                });
            }
            "n" => break None,
            "cancel" => return Ok(None),
            _ => println!("Please answer y, n, or cancel."),
        }
    };

    let depth = loop {
        let raw = prompt("Search depth in plies (minimum 1): ")?;
        match raw.parse::<u32>() {
            Ok(depth) if depth >= 1 => break depth,
            _ => println!("Please enter a ply count of at least 1."),
        }
    };

    Ok(Some(GameConfig { time_limit, depth }))
}

fn build_engine(config: GameConfig) -> Engine {
    let mut engine: Engine = Engine::new();
    engine.set_depth(config.depth);
    match config.time_limit {
        Some(secs) => engine.set_move_time_limit(secs),
        None => engine.set_infinite_time(),
    }
    engine
}

fn play_human_game() -> io::Result<()> {
    let mut pos = Position::from_start_position();
    println!("{}", pos);
    while pos.game_state() == GameState::Active {
        if human_turn(&mut pos)? {
            return Ok(());
        }
    }
    announce_result(&mut pos);
    Ok(())
}

fn play_mixed_game(engine_color: Color, config: GameConfig) -> io::Result<()> {
    let mut engine = build_engine(config);
    let mut pos = Position::from_start_position();
    println!("{}", pos);
    while pos.game_state() == GameState::Active {
        if pos.side_to_move() == engine_color {
            if !engine_turn(&mut engine, &mut pos) {
                break;
            }
        } else if human_turn(&mut pos)? {
            return Ok(());
        }
    }
    announce_result(&mut pos);
    Ok(())
}

fn play_engine_game(config: GameConfig) -> io::Result<()> {
    let mut white = build_engine(config);
    // The engines share one transposition cache; both profit from the
    // other's work.
    let mut black: Engine = Engine::with_table(white.table());
    black.set_depth(config.depth);
    if let Some(secs) = config.time_limit {
        black.set_move_time_limit(secs);
    }

    let mut pos = Position::from_start_position();
    println!("{}", pos);
    while pos.game_state() == GameState::Active {
        let engine = match pos.side_to_move() {
            Color::White => &mut white,
            Color::Black => &mut black,
        };
        if !engine_turn(engine, &mut pos) {
            break;
        }
    }
    announce_result(&mut pos);
    Ok(())
}

/// Reads and applies one human move. Returns true when the player exits.
fn human_turn(pos: &mut Position) -> io::Result<bool> {
    let gen = MoveGenerator::new();
    loop {
        let input = prompt("Enter your move: ")?;
        if input == "exit" {
            return Ok(true);
        }
        if !MOVE_INPUT.is_match(&input) {
            println!("Not a valid move format");
            continue;
        }
        let mv = match gen.create_move(pos, &input) {
            Some(mv) => mv,
            None => {
                println!("Cannot start a move on an empty square");
                continue;
            }
        };
        match pos.try_make(&mv) {
            Ok(()) => {
                println!("{}", pos);
                return Ok(false);
            }
            Err(reason) => println!("Illegal move: {}", reason),
        }
    }
}

/// Runs one engine move. Returns false if the engine had no move to make.
fn engine_turn(engine: &mut Engine, pos: &mut Position) -> bool {
    let result = engine.search(pos);
    let mv = match result.best_move {
        Some(mv) => mv,
        None => return false,
    };
    let text = pos.move_text(&mv);
    pos.make(&mv);
    println!(
        "engine plays {} (depth {}, score {}, {} nodes)",
        text, result.depth, result.score, result.nodes_searched
    );
    println!("{}", pos);
    true
}

fn announce_result(pos: &mut Position) {
    match pos.game_state() {
        GameState::Mate => {
            let winner = match pos.side_to_move() {
                Color::White => "black",
                Color::Black => "white",
            };
            println!("Checkmate - {} wins.", winner);
        }
        GameState::Drawn => println!("The game is drawn."),
        GameState::Active => {}
    }
}

/// Runs the generator against the published perft counts and reports speed.
pub fn run_benchmark() {
    for &(name, fen, depth, expected) in BENCHMARK_POSITIONS.iter() {
        let mut pos = Position::from_fen(fen).expect("benchmark FEN must parse");
        let start = Instant::now();
        let nodes = perft(&mut pos, depth);
        let elapsed = start.elapsed();
        let millis = elapsed.as_secs() * 1000 + u64::from(elapsed.subsec_millis());
        let verdict = if nodes == expected { "ok" } else { "MISMATCH" };
        println!(
            "{:16} perft({}) = {:10} [{}] ({} ms)",
            name, depth, nodes, verdict, millis
        );
    }
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        // End of input; surfaced as an error so every prompt loop unwinds.
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "end of input"));
    }
    Ok(line.trim().to_lowercase())
}
