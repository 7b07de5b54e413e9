// Copyright 2026 the palisade authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::fmt;

use crate::types::{CastleRights, Piece, PieceKind};

/// A move as a plain value record. `from` and `to` are indices into the padded
/// grid, valid for the shift state of the position the move was created for.
/// Besides the motion itself, a move carries the irreversible state it
/// displaces: castle rights, en-passant target, half-move clock, and the
/// oldest repetition-ring entry, so `Position::unmake` can restore the
/// position byte for byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Move {
    pub from: usize,
    pub to: usize,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub promotion: Option<PieceKind>,
    pub is_castle: bool,
    pub is_en_passant: bool,
    pub prior_castle_rights: CastleRights,
    pub prior_en_passant: Option<usize>,
    pub prior_halfmove_clock: u32,
    pub prior_ring_entry: u64,
}

impl Move {
    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    pub fn is_promotion(&self) -> bool {
        self.promotion.is_some()
    }

    /// Whether two moves describe the same motion, ignoring the undo
    /// bookkeeping. Full `==` also compares the snapshot fields, which differ
    /// between moves created in different positions even when the pieces
    /// travel identically; ordering heuristics match on the motion alone.
    pub fn same_action(&self, other: &Move) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.piece == other.piece
            && self.captured == other.captured
            && self.promotion == other.promotion
            && self.is_castle == other.is_castle
            && self.is_en_passant == other.is_en_passant
    }
}

/// Reasons `validate_move` rejects a candidate move. The position is
/// guaranteed unchanged when one of these is returned.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MoveError {
    NoPieceOnFrom,
    WrongColorToMove,
    BlockedRay,
    OwnColorOnDestination,
    PawnMisuse,
    WouldLeaveKingInCheck,
    CastleThroughCheck,
    KingCaptureAttempted,
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            MoveError::NoPieceOnFrom => "no piece on the starting square",
            MoveError::WrongColorToMove => "that piece does not belong to the player to move",
            MoveError::BlockedRay => "the piece cannot reach the target square",
            MoveError::OwnColorOnDestination => "the target square holds one of your own pieces",
            MoveError::PawnMisuse => "pawns cannot move that way",
            MoveError::WouldLeaveKingInCheck => "that move would leave your king in check",
            MoveError::CastleThroughCheck => "the king cannot castle out of or through check",
            MoveError::KingCaptureAttempted => "kings cannot be captured",
        };
        f.write_str(msg)
    }
}
