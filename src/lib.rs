// Copyright 2026 the palisade authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
#![allow(dead_code)]

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate num_derive;

pub mod cli;
mod engine;
pub mod eval;
mod move_generator;
mod moves;
mod perft;
mod position;
pub mod search;
mod types;
mod zobrist;

pub use engine::{DeadlineTimer, Engine};
pub use move_generator::{square_attacked, MoveGenerator, MoveVec};
pub use moves::{Move, MoveError};
pub use perft::{perft, perft_divide};
pub use position::{FenParseError, Position};
pub use types::{CastleRights, Color, GameState, Piece, PieceKind, Square};
