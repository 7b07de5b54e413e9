// Copyright 2026 the palisade authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use num_traits::{FromPrimitive, ToPrimitive};
use std::convert::TryFrom;
use std::fmt::{self, Write};

/// Width of the playing area.
pub const INNER_SIZE: usize = 8;

/// Width of the padded grid. The inner 8x8 board floats inside a 15x15 frame
/// of sentinel squares, so that every movement direction is a constant index
/// delta and leaving the board always collides with a sentinel.
pub const OUTER_SIZE: usize = 15;

/// Total number of grid cells.
pub const GRID_SIZE: usize = OUTER_SIZE * OUTER_SIZE;

/// The anchor cell (row 7, column 7). When a piece sits here, no ray of up to
/// seven steps and no knight leap can index outside the grid, so ray walking
/// needs no bounds checks.
pub const ZERO_LOCATION: usize = 7 * OUTER_SIZE + 7;

/// Conversion between the small enums (colors, piece kinds) and the table
/// slots they select. The piece-square tables, the Zobrist key table and the
/// counter-move table are all flat arrays indexed this way, so anything with
/// numeric To/FromPrimitive conversions gets both directions for free.
pub trait TableIndex {
    /// The table slot this value selects.
    fn as_index(self) -> usize;

    /// The value selecting the given table slot. Panics if the slot is out
    /// of range for the type.
    fn from_index(idx: usize) -> Self;
}

impl<T> TableIndex for T
where
    T: FromPrimitive + ToPrimitive,
{
    fn as_index(self) -> usize {
        self.to_usize().unwrap()
    }

    fn from_index(idx: usize) -> T {
        <T as FromPrimitive>::from_usize(idx).unwrap()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn toggle(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let chr = match self {
            Color::White => 'w',
            Color::Black => 'b',
        };
        f.write_char(chr)
    }
}

pub static COLORS: [Color; 2] = [Color::White, Color::Black];

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let chr = match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };
        f.write_char(chr)
    }
}

pub static PIECE_KINDS: [PieceKind; 6] = [
    PieceKind::Pawn,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Rook,
    PieceKind::Queen,
    PieceKind::King,
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub fn new(kind: PieceKind, color: Color) -> Piece {
        Piece { kind, color }
    }

    pub fn is_sliding(&self) -> bool {
        match self.kind {
            PieceKind::Pawn | PieceKind::Knight | PieceKind::King => false,
            _ => true,
        }
    }
}

impl TryFrom<char> for Piece {
    type Error = ();

    fn try_from(c: char) -> Result<Self, Self::Error> {
        let res = match c {
            'P' => Piece::new(PieceKind::Pawn, Color::White),
            'N' => Piece::new(PieceKind::Knight, Color::White),
            'B' => Piece::new(PieceKind::Bishop, Color::White),
            'R' => Piece::new(PieceKind::Rook, Color::White),
            'Q' => Piece::new(PieceKind::Queen, Color::White),
            'K' => Piece::new(PieceKind::King, Color::White),
            'p' => Piece::new(PieceKind::Pawn, Color::Black),
            'n' => Piece::new(PieceKind::Knight, Color::Black),
            'b' => Piece::new(PieceKind::Bishop, Color::Black),
            'r' => Piece::new(PieceKind::Rook, Color::Black),
            'q' => Piece::new(PieceKind::Queen, Color::Black),
            'k' => Piece::new(PieceKind::King, Color::Black),
            _ => return Err(()),
        };
        Ok(res)
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let chr = match (self.kind, self.color) {
            (PieceKind::Pawn, Color::White) => 'P',
            (PieceKind::Knight, Color::White) => 'N',
            (PieceKind::Bishop, Color::White) => 'B',
            (PieceKind::Rook, Color::White) => 'R',
            (PieceKind::Queen, Color::White) => 'Q',
            (PieceKind::King, Color::White) => 'K',
            (PieceKind::Pawn, Color::Black) => 'p',
            (PieceKind::Knight, Color::Black) => 'n',
            (PieceKind::Bishop, Color::Black) => 'b',
            (PieceKind::Rook, Color::Black) => 'r',
            (PieceKind::Queen, Color::Black) => 'q',
            (PieceKind::King, Color::Black) => 'k',
        };
        f.write_char(chr)
    }
}

/// One cell of the padded grid. Sentinel cells form the frame around the
/// playing area; any ray that reaches one terminates there.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Square {
    Empty,
    Occupied(Piece),
    Sentinel,
}

impl Square {
    pub fn piece(self) -> Option<Piece> {
        match self {
            Square::Occupied(piece) => Some(piece),
            _ => None,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Square::Empty
    }

    pub fn is_sentinel(self) -> bool {
        self == Square::Sentinel
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GameState {
    Active,
    Drawn,
    Mate,
}

bitflags! {
    pub struct CastleRights: u8 {
        const NONE = 0;
        const WHITE_KINGSIDE = 0b0001;
        const WHITE_QUEENSIDE = 0b0010;
        const WHITE = Self::WHITE_KINGSIDE.bits | Self::WHITE_QUEENSIDE.bits;
        const BLACK_KINGSIDE = 0b0100;
        const BLACK_QUEENSIDE = 0b1000;
        const BLACK = Self::BLACK_KINGSIDE.bits | Self::BLACK_QUEENSIDE.bits;
        const ALL = Self::WHITE.bits | Self::BLACK.bits;
    }
}

impl CastleRights {
    pub fn kingside(color: Color) -> CastleRights {
        match color {
            Color::White => CastleRights::WHITE_KINGSIDE,
            Color::Black => CastleRights::BLACK_KINGSIDE,
        }
    }

    pub fn queenside(color: Color) -> CastleRights {
        match color {
            Color::White => CastleRights::WHITE_QUEENSIDE,
            Color::Black => CastleRights::BLACK_QUEENSIDE,
        }
    }

    pub fn both(color: Color) -> CastleRights {
        match color {
            Color::White => CastleRights::WHITE,
            Color::Black => CastleRights::BLACK,
        }
    }
}

// Movement deltas over the padded grid. A rank step is +-OUTER_SIZE, a file
// step +-1, diagonals +-14/+-16, knight leaps +-13/+-17/+-29/+-31. Negative
// deltas head toward the eighth rank (row zero). The +-30 entries are the
// pawn double step and the +-2 entries are the king's castling hop; both are
// walked a single step like any other leaper vector.
static WHITE_PAWN_VECTORS: [i32; 4] = [-15, -14, -16, -30];
static BLACK_PAWN_VECTORS: [i32; 4] = [15, 14, 16, 30];
static KNIGHT_VECTORS: [i32; 8] = [-31, -29, -17, -13, 13, 17, 29, 31];
static BISHOP_VECTORS: [i32; 4] = [-16, -14, 14, 16];
static ROOK_VECTORS: [i32; 4] = [-15, -1, 1, 15];
static QUEEN_VECTORS: [i32; 8] = [-16, -15, -14, -1, 1, 14, 15, 16];
static KING_VECTORS: [i32; 10] = [-16, -15, -14, -1, 1, 14, 15, 16, -2, 2];

/// Union of the sliding and knight directions, used to probe for attackers
/// from a target square outward.
pub static ATTACK_PROBE_VECTORS: [i32; 16] = [
    -16, -15, -14, -1, 1, 14, 15, 16, -31, -29, -17, -13, 13, 17, 29, 31,
];

/// The set of direction deltas a piece of the given kind and color may move
/// along.
pub fn vector_set(kind: PieceKind, color: Color) -> &'static [i32] {
    match kind {
        PieceKind::Pawn => match color {
            Color::White => &WHITE_PAWN_VECTORS,
            Color::Black => &BLACK_PAWN_VECTORS,
        },
        PieceKind::Knight => &KNIGHT_VECTORS,
        PieceKind::Bishop => &BISHOP_VECTORS,
        PieceKind::Rook => &ROOK_VECTORS,
        PieceKind::Queen => &QUEEN_VECTORS,
        PieceKind::King => &KING_VECTORS,
    }
}

/// Exclusive upper bound on the number of steps a piece may take along one of
/// its vectors: sliders walk up to seven steps, leapers a single one.
pub fn ray_length(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::King | PieceKind::Pawn | PieceKind::Knight => 2,
        _ => INNER_SIZE as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    #[test]
    fn vector_sets() {
        assert_eq!(
            vector_set(PieceKind::Pawn, Color::White),
            &[-15, -14, -16, -30]
        );
        assert_eq!(vector_set(PieceKind::Pawn, Color::Black), &[15, 14, 16, 30]);
        assert_eq!(vector_set(PieceKind::Knight, Color::White).len(), 8);
        assert_eq!(vector_set(PieceKind::Queen, Color::Black).len(), 8);
        assert!(vector_set(PieceKind::King, Color::White).contains(&2));
        assert!(vector_set(PieceKind::King, Color::White).contains(&-2));
        assert!(!vector_set(PieceKind::Queen, Color::White).contains(&2));
    }

    #[test]
    fn ray_lengths() {
        assert_eq!(2, ray_length(PieceKind::King));
        assert_eq!(2, ray_length(PieceKind::Pawn));
        assert_eq!(2, ray_length(PieceKind::Knight));
        assert_eq!(8, ray_length(PieceKind::Bishop));
        assert_eq!(8, ray_length(PieceKind::Rook));
        assert_eq!(8, ray_length(PieceKind::Queen));
    }

    #[test]
    fn castle_rights_masks() {
        assert_eq!(
            CastleRights::WHITE,
            CastleRights::kingside(Color::White) | CastleRights::queenside(Color::White)
        );
        assert_eq!(
            CastleRights::BLACK,
            CastleRights::kingside(Color::Black) | CastleRights::queenside(Color::Black)
        );
        assert_eq!(CastleRights::ALL.bits(), 0b1111);
    }

    #[test]
    fn piece_round_trip() {
        for &c in &['P', 'N', 'B', 'R', 'Q', 'K', 'p', 'n', 'b', 'r', 'q', 'k'] {
            let piece = Piece::try_from(c).unwrap();
            assert_eq!(c, format!("{}", piece).chars().next().unwrap());
        }
        assert!(Piece::try_from('x').is_err());
    }
}
