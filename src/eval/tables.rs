// Copyright 2026 the palisade authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Piece-square tables, indexed by inner square (a8 = 0, h1 = 63). The
//! static tables are written from white's point of view; black's tables are
//! produced at startup by reversing the ranks into a fresh buffer, leaving
//! files untouched.

use crate::types::{Color, Piece, TableIndex};

pub type PieceSquareTable = [i32; 64];

#[rustfmt::skip]
pub static PAWN: PieceSquareTable = [
      0,  0,  0,  0,  0,  0,  0,  0,
     50, 50, 50, 50, 50, 50, 50, 50,
     10, 10, 20, 30, 30, 20, 10, 10,
      5,  5, 10, 25, 25, 10,  5,  5,
      0,  0,  0, 20, 20,  0,  0,  0,
      5, -5, 10,  0,  0,-10, -5,  5,
      5, 10, 10,-20,-20, 10, 10, 50,
      0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
pub static KNIGHT: PieceSquareTable = [
    -50,-40,-30,-30,-30,-30,-40,-50,
    -40,-20,  0,  0,  0,  0,-20,-40,
    -30,  0, 10, 15, 15, 10,  0,-30,
    -30,  5, 15, 20, 20, 15,  5,-30,
    -30,  0, 15, 20, 20, 15,  0,-30,
    -30,  5, 10, 15, 15, 10,  5,-30,
    -40,-20,  0,  5,  5,  0,-20, 50,
    -50,-40,-30,-30,-30,-30,-40,-50,
];

#[rustfmt::skip]
pub static BISHOP: PieceSquareTable = [
    -20,-10,-10,-10,-10,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5, 10, 10,  5,  0,-10,
    -10,  5,  5, 10, 10,  5,  5,-10,
    -10,  0, 10, 10, 10, 10,  0,-10,
    -10, 10, 10, 10, 10, 10, 10,-10,
    -10,  5,  0,  0,  0,  0,  5,-10,
    -20,-10,-10,-10,-10,-10,-10,-20,
];

#[rustfmt::skip]
pub static ROOK: PieceSquareTable = [
      0,  0,  0,  0,  0,  0,  0,  0,
      5, 10, 10, 10, 10, 10, 10,  5,
     -5,  0,  0,  0,  0,  0,  0, -5,
     -5,  0,  0,  0,  0,  0,  0, -5,
     -5,  0,  0,  0,  0,  0,  0, -5,
     -5,  0,  0,  0,  0,  0,  0, -5,
     -5,  0,  0,  0,  0,  0,  0, -5,
      0,  0,  0,  5,  5,  0,  0,  0,
];

#[rustfmt::skip]
pub static QUEEN: PieceSquareTable = [
    -20,-10,-10, -5, -5,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5,  5,  5,  5,  0,-10,
     -5,  0,  5,  5,  5,  5,  0, -5,
      0,  0,  5,  5,  5,  5,  0, -5,
    -10,  5,  5,  5,  5,  5,  0,-10,
    -10,  0,  5,  0,  0,  0,  0,-10,
    -20,-10,-10, -5, -5,-10,-10,-20,
];

#[rustfmt::skip]
pub static KING: PieceSquareTable = [
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -20,-30,-30,-40,-40,-30,-30,-20,
    -10,-20,-20,-20,-20,-20,-20,-10,
     20, 20,  0,  0,  0,  0, 20, 20,
     20, 30, 10,  0,  0, 10, 30, 20,
];

/// King table for late-game play. Not consulted by the evaluator until a
/// game-phase term exists to switch tables on.
#[rustfmt::skip]
pub static KING_ENDGAME: PieceSquareTable = [
    -50,-40,-30,-20,-20,-30,-40,-50,
    -30,-20,-10,  0,  0,-10,-20,-30,
    -30,-10, 20, 30, 30, 20,-10,-30,
    -30,-10, 30, 40, 40, 30,-10,-30,
    -30,-10, 30, 40, 40, 30,-10,-30,
    -30,-10, 20, 30, 30, 20,-10,-30,
    -30,-30,  0,  0,  0,  0,-30,-30,
    -50,-30,-30,-30,-30,-30,-30,-50,
];

pub struct PieceSquareTables {
    white: [PieceSquareTable; 6],
    black: [PieceSquareTable; 6],
}

impl PieceSquareTables {
    fn build() -> PieceSquareTables {
        // Indexed by PieceKind discriminant.
        let white = [PAWN, KNIGHT, BISHOP, ROOK, QUEEN, KING];
        let mut black = [[0; 64]; 6];
        for (mirrored, table) in black.iter_mut().zip(white.iter()) {
            *mirrored = mirror_ranks(table);
        }
        PieceSquareTables { white, black }
    }

    pub fn lookup(&self, piece: Piece, inner_square: usize) -> i32 {
        match piece.color {
            Color::White => self.white[piece.kind.as_index()][inner_square],
            Color::Black => self.black[piece.kind.as_index()][inner_square],
        }
    }
}

/// The color mirror: ranks reversed, files preserved, written to a fresh
/// buffer.
fn mirror_ranks(table: &PieceSquareTable) -> PieceSquareTable {
    let mut out = [0; 64];
    for row in 0..8 {
        for file in 0..8 {
            out[row * 8 + file] = table[(7 - row) * 8 + file];
        }
    }
    out
}

lazy_static! {
    pub static ref TABLES: PieceSquareTables = PieceSquareTables::build();
}
