// Copyright 2026 the palisade authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::position::Position;
use crate::types::{Color, Piece, TableIndex};

// Key table layout:
//   0..768    piece keys, 12 per inner square (white pawn..king, then black)
//   768       side-to-move key, mixed in when white is to move
//   769..785  one key per castle-rights nibble combination
//   785..794  en-passant keys: "no target" plus one per file a..h
const PIECE_STATES: usize = 12;
const SIDE_TO_MOVE_INDEX: usize = PIECE_STATES * 64;
const CASTLE_RIGHTS_INDEX: usize = SIDE_TO_MOVE_INDEX + 1;
const EN_PASSANT_INDEX: usize = CASTLE_RIGHTS_INDEX + 16;
const KEY_COUNT: usize = EN_PASSANT_INDEX + 9;

pub struct ZobristKeys {
    keys: [u64; KEY_COUNT],
}

impl ZobristKeys {
    /// Draws a fresh key table from operating system entropy.
    pub fn from_entropy() -> ZobristKeys {
        ZobristKeys::from_rng(StdRng::from_entropy())
    }

    /// Draws a key table from a fixed seed, for reproducible hashing in
    /// tests and analysis runs.
    pub fn with_seed(seed: u64) -> ZobristKeys {
        ZobristKeys::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(mut rng: StdRng) -> ZobristKeys {
        let mut keys = [0u64; KEY_COUNT];
        for key in keys.iter_mut() {
            *key = rng.gen();
        }
        ZobristKeys { keys }
    }

    pub fn piece_key(&self, inner_square: usize, piece: Piece) -> u64 {
        let color_offset = match piece.color {
            Color::White => 0,
            Color::Black => 6,
        };
        self.keys[PIECE_STATES * inner_square + color_offset + piece.kind.as_index()]
    }

    pub fn side_to_move_key(&self) -> u64 {
        self.keys[SIDE_TO_MOVE_INDEX]
    }

    pub fn castle_rights_key(&self, rights_bits: u8) -> u64 {
        self.keys[CASTLE_RIGHTS_INDEX + rights_bits as usize]
    }

    pub fn en_passant_key(&self, file: Option<usize>) -> u64 {
        match file {
            Some(file) => self.keys[EN_PASSANT_INDEX + 1 + file],
            None => self.keys[EN_PASSANT_INDEX],
        }
    }

    /// Hashes a position from scratch. The incremental hash maintained by
    /// `Position::make`/`unmake` must always equal this value; the make and
    /// unmake paths assert that equivalence in debug builds.
    pub fn hash(&self, pos: &Position) -> u64 {
        let mut running = 0u64;
        let corner = pos.corner();
        for inner in 0..64 {
            let outer = Position::inner_to_outer(inner, corner);
            if let Some(piece) = pos.piece_at(outer) {
                running ^= self.piece_key(inner, piece);
            }
        }

        if pos.side_to_move() == Color::White {
            running ^= self.side_to_move_key();
        }
        running ^= self.castle_rights_key(pos.castle_rights().bits());
        if let Some(file) = pos.en_passant_file() {
            running ^= self.en_passant_key(Some(file));
        }
        running
    }
}

lazy_static! {
    static ref KEYS: ZobristKeys = ZobristKeys::from_entropy();
}

pub fn hash(pos: &Position) -> u64 {
    KEYS.hash(pos)
}

pub fn toggle_piece(hash: &mut u64, inner_square: usize, piece: Piece) {
    *hash ^= KEYS.piece_key(inner_square, piece);
}

pub fn toggle_side_to_move(hash: &mut u64) {
    *hash ^= KEYS.side_to_move_key();
}

pub fn toggle_castle_rights(hash: &mut u64, old_bits: u8, new_bits: u8) {
    if old_bits != new_bits {
        *hash ^= KEYS.castle_rights_key(old_bits);
        *hash ^= KEYS.castle_rights_key(new_bits);
    }
}

pub fn toggle_en_passant(hash: &mut u64, old_file: Option<usize>, new_file: Option<usize>) {
    if old_file == new_file {
        return;
    }
    if let Some(file) = old_file {
        *hash ^= KEYS.en_passant_key(Some(file));
    }
    if let Some(file) = new_file {
        *hash ^= KEYS.en_passant_key(Some(file));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use crate::types::PieceKind;

    #[test]
    fn seeded_keys_are_reproducible() {
        let a = ZobristKeys::with_seed(0x5eed);
        let b = ZobristKeys::with_seed(0x5eed);
        let c = ZobristKeys::with_seed(0x5eee);
        let piece = Piece::new(PieceKind::Rook, Color::Black);
        assert_eq!(a.piece_key(12, piece), b.piece_key(12, piece));
        assert_ne!(a.piece_key(12, piece), c.piece_key(12, piece));
    }

    #[test]
    fn toggles_are_involutions() {
        let pos = Position::from_start_position();
        let initial = hash(&pos);
        let mut h = initial;

        toggle_side_to_move(&mut h);
        assert_ne!(initial, h);
        toggle_side_to_move(&mut h);
        assert_eq!(initial, h);

        toggle_castle_rights(&mut h, 0b1111, 0b1110);
        toggle_castle_rights(&mut h, 0b1110, 0b1111);
        assert_eq!(initial, h);

        toggle_en_passant(&mut h, None, Some(4));
        toggle_en_passant(&mut h, Some(4), None);
        assert_eq!(initial, h);

        let piece = Piece::new(PieceKind::Pawn, Color::White);
        toggle_piece(&mut h, 52, piece);
        toggle_piece(&mut h, 52, piece);
        assert_eq!(initial, h);
    }

    #[test]
    fn distinct_positions_hash_differently() {
        let start = Position::from_start_position();
        let other =
            Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
                .unwrap();
        assert_ne!(hash(&start), hash(&other));
    }

    #[test]
    fn hash_ignores_board_shift() {
        let mut pos = Position::from_start_position();
        let before = hash(&pos);
        pos.shift(2, -1);
        assert_eq!(before, hash(&pos));
        pos.shift(-2, 1);
        assert_eq!(before, hash(&pos));
    }
}
