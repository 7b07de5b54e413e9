// Copyright 2026 the palisade authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use arrayvec::ArrayVec;

use crate::moves::{Move, MoveError};
use crate::position::Position;
use crate::types::{
    ray_length, vector_set, CastleRights, Color, Piece, PieceKind, Square, ATTACK_PROBE_VECTORS,
    GRID_SIZE, INNER_SIZE, OUTER_SIZE, ZERO_LOCATION,
};

/// MoveVec is an array vector large enough to hold every legal move from any
/// chess position, small enough to live on the stack so move generation does
/// not allocate.
pub type MoveVec = ArrayVec<[Move; 224]>;

type PieceList = ArrayVec<[(usize, Piece); 16]>;

/// Tests whether any enemy piece attacks the given grid square. Rays are
/// probed outward from the square in the eight sliding directions and the
/// eight knight offsets; the first piece met on a ray attacks iff it is an
/// enemy whose vector set contains the reversed direction and whose ray
/// length covers the distance. Pawns count only through their diagonal
/// vectors, never the pushes.
pub fn square_attacked(pos: &Position, idx: usize, friendly: Color) -> bool {
    for &probe in ATTACK_PROBE_VECTORS.iter() {
        let abs = probe.abs();
        let knight_probe = abs == 13 || abs > 16;
        let max_steps = if knight_probe { 1 } else { 7 };

        for step in 1..=max_steps {
            let target = idx as i32 + probe * step;
            if target < 0 || target >= GRID_SIZE as i32 {
                break;
            }
            match pos.square(target as usize) {
                Square::Sentinel => break,
                Square::Empty => continue,
                Square::Occupied(piece) => {
                    if piece.color != friendly && attacks_along(piece, -probe, step) {
                        return true;
                    }
                    break;
                }
            }
        }
    }
    false
}

fn attacks_along(piece: Piece, toward: i32, distance: i32) -> bool {
    if distance >= ray_length(piece.kind) {
        return false;
    }
    if piece.kind == PieceKind::Pawn && toward % OUTER_SIZE as i32 == 0 {
        // Push vectors move pawns but never attack.
        return false;
    }
    vector_set(piece.kind, piece.color).contains(&toward)
}

/// Generates the legal moves for a position's side to move.
///
/// For every friendly piece the board is shifted so that piece sits on the
/// anchor cell, from which each vector in the piece's set is walked with raw
/// index deltas until a sentinel or a piece terminates the ray. Candidates
/// then pass the full `validate_move` filter, so the emitted list contains
/// only strictly legal moves. The board is returned to its entry shift state
/// and all emitted indices are expressed in that frame.
pub struct MoveGenerator;

impl MoveGenerator {
    pub fn new() -> MoveGenerator {
        MoveGenerator
    }

    pub fn generate_moves(&self, pos: &mut Position, buf: &mut MoveVec) {
        let entry_corner = pos.corner();
        let color = pos.side_to_move();

        let mut pieces = PieceList::new();
        for inner in 0..64 {
            let outer = Position::inner_to_outer(inner, entry_corner);
            if let Some(piece) = pos.piece_at(outer) {
                if piece.color == color {
                    pieces.push((outer, piece));
                }
            }
        }

        for &(entry_idx, piece) in &pieces {
            // Earlier iterations moved the board; track the piece into the
            // current frame before anchoring it.
            let frame_delta = pos.corner() as i32 - entry_corner as i32;
            let current = (entry_idx as i32 + frame_delta) as usize;
            let row = (current / OUTER_SIZE) as i32;
            let col = (current % OUTER_SIZE) as i32;
            pos.shift(7 - col, 7 - row);

            let mark = buf.len();
            self.generate_piece_moves(pos, piece, buf);

            // Re-express this piece's moves in the frame the caller sees.
            let back = entry_corner as i32 - pos.corner() as i32;
            if back != 0 {
                for mv in &mut buf[mark..] {
                    mv.from = (mv.from as i32 + back) as usize;
                    mv.to = (mv.to as i32 + back) as usize;
                    if let Some(ep) = mv.prior_en_passant {
                        mv.prior_en_passant = Some((ep as i32 + back) as usize);
                    }
                }
            }
        }

        // Put the board back where the caller left it.
        let (row, col) = pos.corner_coords();
        let entry_row = (entry_corner / OUTER_SIZE) as i32;
        let entry_col = (entry_corner % OUTER_SIZE) as i32;
        pos.shift(entry_col - col as i32, entry_row - row as i32);
    }

    fn generate_piece_moves(&self, pos: &mut Position, piece: Piece, buf: &mut MoveVec) {
        debug_assert_eq!(Some(piece), pos.piece_at(ZERO_LOCATION));

        for &delta in vector_set(piece.kind, piece.color) {
            for step in 1..ray_length(piece.kind) {
                // From the anchor no walk of up to seven steps can leave the
                // grid, so the index needs no bounds check.
                let to = (ZERO_LOCATION as i32 + delta * step) as usize;
                let target = pos.square(to);
                if target.is_sentinel() {
                    break;
                }
                if let Some(occupant) = target.piece() {
                    if occupant.color == piece.color {
                        break;
                    }
                }

                let is_en_passant = piece.kind == PieceKind::Pawn
                    && delta % OUTER_SIZE as i32 != 0
                    && target.is_empty()
                    && pos.en_passant_target() == Some(to);
                let captured = if is_en_passant {
                    Some(Piece::new(PieceKind::Pawn, piece.color.toggle()))
                } else {
                    target.piece()
                };
                let is_castle = piece.kind == PieceKind::King && delta.abs() == 2;

                let mv = Move {
                    from: ZERO_LOCATION,
                    to,
                    piece,
                    captured,
                    promotion: None,
                    is_castle,
                    is_en_passant,
                    prior_castle_rights: pos.castle_rights(),
                    prior_en_passant: pos.en_passant_target(),
                    prior_halfmove_clock: pos.halfmove_clock(),
                    prior_ring_entry: pos.repetition_ring()[0],
                };

                if self.validate_move(pos, &mv).is_ok() {
                    let promoting = piece.kind == PieceKind::Pawn
                        && Position::convert_outer_index(to, pos.corner()) / INNER_SIZE
                            == promotion_row(piece.color);
                    if promoting {
                        for &kind in &[
                            PieceKind::Knight,
                            PieceKind::Bishop,
                            PieceKind::Rook,
                            PieceKind::Queen,
                        ] {
                            let mut promo = mv;
                            promo.promotion = Some(kind);
                            buf.push(promo);
                        }
                    } else {
                        buf.push(mv);
                    }
                }

                if !target.is_empty() {
                    break;
                }
            }
        }
    }

    /// Full legality filter. Checks that the motion matches one of the
    /// piece's vectors, that the ray is unobstructed, the pawn rules, the
    /// castling rules, and that the mover's king is not left attacked.
    /// The position is unchanged on return.
    pub fn validate_move(&self, pos: &mut Position, mv: &Move) -> Result<(), MoveError> {
        let piece = match pos.piece_at(mv.from) {
            Some(piece) => piece,
            None => return Err(MoveError::NoPieceOnFrom),
        };
        if piece.color != pos.side_to_move() {
            return Err(MoveError::WrongColorToMove);
        }
        if pos.square(mv.to).is_sentinel() {
            return Err(MoveError::BlockedRay);
        }

        // Find the vector this move travels along and how far.
        let diff = mv.to as i32 - mv.from as i32;
        let mut selected = None;
        for &delta in vector_set(piece.kind, piece.color) {
            if diff % delta == 0 {
                let steps = diff / delta;
                if steps >= 1 && steps < ray_length(piece.kind) {
                    selected = Some((delta, steps));
                    break;
                }
            }
        }
        let (delta, steps) = match selected {
            Some(found) => found,
            None => return Err(MoveError::BlockedRay),
        };

        if let Some(target) = pos.piece_at(mv.to) {
            if target.color == piece.color {
                return Err(MoveError::OwnColorOnDestination);
            }
            if target.kind == PieceKind::King {
                return Err(MoveError::KingCaptureAttempted);
            }
        }

        // Sliders may not pass through occupied squares. The pawn double
        // step walks its two component rank steps.
        let (walk_delta, walk_steps) = if delta.abs() == 2 * OUTER_SIZE as i32 {
            (delta / 2, 2)
        } else {
            (delta, steps)
        };
        for i in 1..walk_steps {
            let idx = (mv.from as i32 + walk_delta * i) as usize;
            if !pos.square(idx).is_empty() {
                return Err(MoveError::BlockedRay);
            }
        }

        if piece.kind == PieceKind::Pawn {
            if delta.abs() == 2 * OUTER_SIZE as i32 {
                // Double step only from the starting rank.
                let row = Position::convert_outer_index(mv.from, pos.corner()) / INNER_SIZE;
                let start_row = match piece.color {
                    Color::White => 6,
                    Color::Black => 1,
                };
                if row != start_row {
                    return Err(MoveError::PawnMisuse);
                }
            }
            if delta % OUTER_SIZE as i32 != 0 {
                // Diagonal steps must capture, normally or en passant.
                if pos.piece_at(mv.to).is_none() {
                    let ep_ok = pos.en_passant_target() == Some(mv.to) && {
                        let victim = Position::ep_victim_square(mv.to, piece.color);
                        pos.piece_at(victim)
                            == Some(Piece::new(PieceKind::Pawn, piece.color.toggle()))
                    };
                    if !ep_ok {
                        return Err(MoveError::PawnMisuse);
                    }
                }
            } else if pos.piece_at(mv.to).is_some() {
                // Pawns never capture straight ahead.
                return Err(MoveError::PawnMisuse);
            }
        }

        if piece.kind == PieceKind::King && delta.abs() == 2 {
            self.validate_castle(pos, mv, delta)?;
        }

        if self.leaves_king_in_check(pos, mv, piece) {
            return Err(MoveError::WouldLeaveKingInCheck);
        }
        Ok(())
    }

    fn validate_castle(&self, pos: &Position, mv: &Move, delta: i32) -> Result<(), MoveError> {
        let color = mv.piece.color;
        let kingside = delta > 0;
        let required = if kingside {
            CastleRights::kingside(color)
        } else {
            CastleRights::queenside(color)
        };
        if !pos.castle_rights().contains(required) {
            return Err(MoveError::BlockedRay);
        }

        // The rights bit implies neither king nor rook has moved, but the
        // rook may have been captured on its home square.
        let rook_home = pos.rook_home(color, kingside);
        if pos.piece_at(rook_home) != Some(Piece::new(PieceKind::Rook, color)) {
            return Err(MoveError::BlockedRay);
        }

        // No castling out of check.
        if square_attacked(pos, mv.from, color) {
            return Err(MoveError::CastleThroughCheck);
        }

        // Every square between king and rook must be empty, and the two
        // squares the king crosses must not be attacked.
        let dir: i32 = if kingside { 1 } else { -1 };
        let between = if kingside { 2 } else { 3 };
        for i in 1..=between {
            let idx = (mv.from as i32 + dir * i) as usize;
            if !pos.square(idx).is_empty() {
                return Err(MoveError::BlockedRay);
            }
            if i <= 2 && square_attacked(pos, idx, color) {
                return Err(MoveError::CastleThroughCheck);
            }
        }
        Ok(())
    }

    /// Applies the bare motion of the move to the grid, asks whether the
    /// mover's king is attacked, and restores the grid. The hash is not
    /// touched because the mutation never escapes this function.
    fn leaves_king_in_check(&self, pos: &mut Position, mv: &Move, piece: Piece) -> bool {
        let from_cell = pos.square(mv.from);
        let to_cell = pos.square(mv.to);
        pos.set_square(mv.from, Square::Empty);
        pos.set_square(mv.to, from_cell);

        let mut victim_cell = None;
        if mv.is_en_passant {
            let victim = Position::ep_victim_square(mv.to, piece.color);
            victim_cell = Some((victim, pos.square(victim)));
            pos.set_square(victim, Square::Empty);
        }

        let king = if piece.kind == PieceKind::King {
            mv.to
        } else {
            pos.king_square(piece.color)
        };
        let attacked = square_attacked(pos, king, piece.color);

        pos.set_square(mv.from, from_cell);
        pos.set_square(mv.to, to_cell);
        if let Some((victim, cell)) = victim_cell {
            pos.set_square(victim, cell);
        }
        attacked
    }

    /// Builds a move from four-character coordinate input, either letter-file
    /// form ("e2e4") or digit-file form ("5254"). Returns `None` when the
    /// input does not address a piece of any color; the structured move still
    /// has to pass `validate_move`. Promotions default to queen at this
    /// layer.
    pub fn create_move(&self, pos: &Position, input: &str) -> Option<Move> {
        let bytes = input.as_bytes();
        if bytes.len() != 4 {
            return None;
        }

        let from_file = file_of(bytes[0])?;
        let from_rank = rank_of(bytes[1])?;
        let to_file = file_of(bytes[2])?;
        let to_rank = rank_of(bytes[3])?;

        let corner = pos.corner();
        let from = Position::inner_to_outer((7 - from_rank) * INNER_SIZE + from_file, corner);
        let to = Position::inner_to_outer((7 - to_rank) * INNER_SIZE + to_file, corner);

        let piece = pos.piece_at(from)?;
        let target = pos.piece_at(to);

        let is_en_passant = piece.kind == PieceKind::Pawn
            && from_file != to_file
            && target.is_none()
            && pos.en_passant_target() == Some(to);
        let captured = if is_en_passant {
            Some(Piece::new(PieceKind::Pawn, piece.color.toggle()))
        } else {
            target
        };
        let promotion = if piece.kind == PieceKind::Pawn
            && (7 - to_rank) == promotion_row(piece.color)
        {
            Some(PieceKind::Queen)
        } else {
            None
        };

        Some(Move {
            from,
            to,
            piece,
            captured,
            promotion,
            is_castle: piece.kind == PieceKind::King
                && (to_file as i32 - from_file as i32).abs() == 2,
            is_en_passant,
            prior_castle_rights: pos.castle_rights(),
            prior_en_passant: pos.en_passant_target(),
            prior_halfmove_clock: pos.halfmove_clock(),
            prior_ring_entry: pos.repetition_ring()[0],
        })
    }
}

impl Default for MoveGenerator {
    fn default() -> MoveGenerator {
        MoveGenerator::new()
    }
}

fn promotion_row(color: Color) -> usize {
    match color {
        Color::White => 0,
        Color::Black => 7,
    }
}

fn file_of(byte: u8) -> Option<usize> {
    match byte {
        b'a'..=b'h' => Some((byte - b'a') as usize),
        b'1'..=b'8' => Some((byte - b'1') as usize),
        _ => None,
    }
}

fn rank_of(byte: u8) -> Option<usize> {
    match byte {
        b'1'..=b'8' => Some((byte - b'1') as usize),
        _ => None,
    }
}
