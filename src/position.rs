// Copyright 2026 the palisade authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::convert::TryFrom;
use std::fmt::{self, Write};

use crate::move_generator::{square_attacked, MoveGenerator, MoveVec};
use crate::moves::{Move, MoveError};
use crate::types::{
    CastleRights, Color, GameState, Piece, PieceKind, Square, TableIndex, GRID_SIZE, INNER_SIZE,
    OUTER_SIZE,
};
use crate::zobrist;

/// Possible errors that can arise when parsing a FEN string into a `Position`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FenParseError {
    UnexpectedChar(char),
    UnexpectedEnd,
    InvalidDigit,
    FileDoesNotSumToEight,
    UnknownPiece,
    InvalidSideToMove,
    InvalidCastle,
    InvalidEnPassant,
    EmptyHalfmove,
    InvalidHalfmove,
    EmptyFullmove,
    InvalidFullmove,
}

/// Where the inner board sits when a position is created. Dead center, so
/// both shift directions have room before a shift would push the inner board
/// against the frame.
const DEFAULT_CORNER: usize = 3 * OUTER_SIZE + 3;

const RING_SIZE: usize = 9;

/// The complete, mutable state of a chess game.
///
/// The board is a 15x15 grid of `Square` cells whose inner 8x8 playing area
/// floats inside a frame of sentinels; `corner` is the grid index of the
/// inner board's top-left cell (the a8 square). The move generator translates
/// the inner board with `shift` so the piece under examination sits on the
/// anchor cell, which lets ray walking use raw index deltas.
///
/// All mutation goes through `make`/`unmake`; a make/unmake pair restores the
/// position exactly, including the incremental Zobrist hash and the
/// nine-entry repetition ring.
#[derive(Clone, PartialEq, Eq)]
pub struct Position {
    grid: [Square; GRID_SIZE],
    corner: usize,
    side_to_move: Color,
    castle_rights: CastleRights,
    en_passant_target: Option<usize>,
    halfmove_clock: u32,
    fullmove_clock: u32,
    has_castled: [bool; 2],
    repetition_ring: [u64; RING_SIZE],
    zobrist_hash: u64,
}

//
// Board state getters
//

impl Position {
    fn empty() -> Position {
        let mut grid = [Square::Sentinel; GRID_SIZE];
        for inner in 0..64 {
            grid[Position::inner_to_outer(inner, DEFAULT_CORNER)] = Square::Empty;
        }

        let mut ring = [0u64; RING_SIZE];
        for (i, entry) in ring.iter_mut().enumerate() {
            *entry = i as u64;
        }

        Position {
            grid,
            corner: DEFAULT_CORNER,
            side_to_move: Color::White,
            castle_rights: CastleRights::NONE,
            en_passant_target: None,
            halfmove_clock: 0,
            fullmove_clock: 1,
            has_castled: [false, false],
            repetition_ring: ring,
            zobrist_hash: 0,
        }
    }

    /// Grid index of the inner board's top-left square. Changes whenever the
    /// board is shifted.
    pub fn corner(&self) -> usize {
        self.corner
    }

    pub fn corner_coords(&self) -> (usize, usize) {
        (self.corner / OUTER_SIZE, self.corner % OUTER_SIZE)
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn castle_rights(&self) -> CastleRights {
        self.castle_rights
    }

    pub fn can_castle_kingside(&self, color: Color) -> bool {
        self.castle_rights.contains(CastleRights::kingside(color))
    }

    pub fn can_castle_queenside(&self, color: Color) -> bool {
        self.castle_rights.contains(CastleRights::queenside(color))
    }

    pub fn has_castled(&self, color: Color) -> bool {
        self.has_castled[color.as_index()]
    }

    pub fn en_passant_target(&self) -> Option<usize> {
        self.en_passant_target
    }

    /// File (0..8) of the en-passant target square, if one is armed.
    pub fn en_passant_file(&self) -> Option<usize> {
        self.en_passant_target
            .map(|idx| Position::convert_outer_index(idx, self.corner) % INNER_SIZE)
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_clock(&self) -> u32 {
        self.fullmove_clock
    }

    pub fn zobrist_hash(&self) -> u64 {
        self.zobrist_hash
    }

    pub fn repetition_ring(&self) -> &[u64; RING_SIZE] {
        &self.repetition_ring
    }

    pub fn square(&self, idx: usize) -> Square {
        self.grid[idx]
    }

    /// Raw cell write used by the legality filter to trial a move on the
    /// grid. Does not maintain the hash; the caller must restore every cell
    /// it touches before the position escapes.
    pub(crate) fn set_square(&mut self, idx: usize, square: Square) {
        self.grid[idx] = square;
    }

    pub fn piece_at(&self, idx: usize) -> Option<Piece> {
        self.grid[idx].piece()
    }

    /// Converts a grid index inside the playing area to its shift-invariant
    /// inner index (0..64, a8 = 0, h1 = 63).
    pub fn convert_outer_index(outer: usize, corner: usize) -> usize {
        ((outer - corner) / OUTER_SIZE) * INNER_SIZE + outer % OUTER_SIZE - corner % OUTER_SIZE
    }

    /// Inverse of `convert_outer_index`.
    pub fn inner_to_outer(inner: usize, corner: usize) -> usize {
        corner + (inner / INNER_SIZE) * OUTER_SIZE + inner % INNER_SIZE
    }

    /// Grid index of the given color's king.
    pub fn king_square(&self, color: Color) -> usize {
        for inner in 0..64 {
            let outer = Position::inner_to_outer(inner, self.corner);
            if self.grid[outer].piece() == Some(Piece::new(PieceKind::King, color)) {
                return outer;
            }
        }
        unreachable!("no {:?} king on the board", color);
    }

    pub fn in_check(&self, color: Color) -> bool {
        square_attacked(self, self.king_square(color), color)
    }

    /// Coordinate name ("e4") of a grid index inside the playing area.
    pub fn square_name(&self, idx: usize) -> String {
        let inner = Position::convert_outer_index(idx, self.corner);
        let file = (b'a' + (inner % INNER_SIZE) as u8) as char;
        let rank = (b'8' - (inner / INNER_SIZE) as u8) as char;
        format!("{}{}", file, rank)
    }

    /// Coordinate text of a move ("e2e4", "e7e8q").
    pub fn move_text(&self, mv: &Move) -> String {
        let mut text = format!("{}{}", self.square_name(mv.from), self.square_name(mv.to));
        if let Some(kind) = mv.promotion {
            write!(&mut text, "{}", kind).unwrap();
        }
        text
    }
}

//
// Board shifting
//

impl Position {
    /// Translates the inner board within the padded frame. Pieces, the corner
    /// and the en-passant target all move together, so every position-derived
    /// fact (hash, inner indices, legality) is unchanged by a shift.
    pub fn shift(&mut self, col_delta: i32, row_delta: i32) {
        if col_delta == 0 && row_delta == 0 {
            return;
        }

        let (row, col) = self.corner_coords();
        let new_row = row as i32 + row_delta;
        let new_col = col as i32 + col_delta;
        debug_assert!(
            (0..=(OUTER_SIZE - INNER_SIZE) as i32).contains(&new_row)
                && (0..=(OUTER_SIZE - INNER_SIZE) as i32).contains(&new_col),
            "shift would push the inner board out of the frame"
        );

        let mut inner = [Square::Empty; 64];
        for r in 0..INNER_SIZE {
            for c in 0..INNER_SIZE {
                let idx = (row + r) * OUTER_SIZE + col + c;
                inner[r * INNER_SIZE + c] = self.grid[idx];
                self.grid[idx] = Square::Sentinel;
            }
        }

        self.corner = (new_row as usize) * OUTER_SIZE + new_col as usize;
        for r in 0..INNER_SIZE {
            for c in 0..INNER_SIZE {
                self.grid[(new_row as usize + r) * OUTER_SIZE + new_col as usize + c] =
                    inner[r * INNER_SIZE + c];
            }
        }

        let delta = row_delta * OUTER_SIZE as i32 + col_delta;
        if let Some(ep) = self.en_passant_target {
            self.en_passant_target = Some((ep as i32 + delta) as usize);
        }
    }
}

//
// Move application
//

impl Position {
    /// Validates a move against the full legality rules and applies it.
    /// On error the position is untouched. Generated moves are already
    /// validated and can go straight to `make`.
    pub fn try_make(&mut self, mv: &Move) -> Result<(), MoveError> {
        MoveGenerator::new().validate_move(self, mv)?;
        self.make(mv);
        Ok(())
    }

    /// Applies a legal move, updating the two involved squares, the castle
    /// rights, the en-passant target, both clocks, the side to move, the
    /// repetition ring and the incremental hash. The caller is responsible
    /// for passing only validated moves.
    pub fn make(&mut self, mv: &Move) {
        let mover = mv.piece;
        let us = mover.color;
        debug_assert_eq!(us, self.side_to_move, "move by the wrong side");
        let corner = self.corner;
        let old_rights = self.castle_rights;

        // Whatever happens next, the previous en-passant opportunity expires.
        let old_ep_file = self.en_passant_file();
        self.en_passant_target = None;

        if let Some(captured) = mv.captured {
            // En-passant is the one capture whose victim is not on the
            // destination square.
            let target = if mv.is_en_passant {
                Position::ep_victim_square(mv.to, us)
            } else {
                mv.to
            };
            debug_assert_eq!(Some(captured), self.grid[target].piece());
            self.grid[target] = Square::Empty;
            zobrist::toggle_piece(
                &mut self.zobrist_hash,
                Position::convert_outer_index(target, corner),
                captured,
            );

            // Capturing a rook on its home corner strips the opponent's
            // castle right on that side, even if the rook never moved.
            if captured.kind == PieceKind::Rook {
                let them = us.toggle();
                if target == self.rook_home(them, true) {
                    self.castle_rights.remove(CastleRights::kingside(them));
                } else if target == self.rook_home(them, false) {
                    self.castle_rights.remove(CastleRights::queenside(them));
                }
            }
        }

        let placed = match mv.promotion {
            Some(kind) => Piece::new(kind, us),
            None => mover,
        };
        self.grid[mv.from] = Square::Empty;
        zobrist::toggle_piece(
            &mut self.zobrist_hash,
            Position::convert_outer_index(mv.from, corner),
            mover,
        );
        debug_assert!(self.grid[mv.to].is_empty());
        self.grid[mv.to] = Square::Occupied(placed);
        zobrist::toggle_piece(
            &mut self.zobrist_hash,
            Position::convert_outer_index(mv.to, corner),
            placed,
        );

        if mv.is_castle {
            let (rook_from, rook_to) = Position::castle_rook_squares(mv);
            let rook = self.grid[rook_from]
                .piece()
                .expect("invalid move: castle without rook");
            self.grid[rook_from] = Square::Empty;
            zobrist::toggle_piece(
                &mut self.zobrist_hash,
                Position::convert_outer_index(rook_from, corner),
                rook,
            );
            self.grid[rook_to] = Square::Occupied(rook);
            zobrist::toggle_piece(
                &mut self.zobrist_hash,
                Position::convert_outer_index(rook_to, corner),
                rook,
            );
            self.has_castled[us.as_index()] = true;
        }

        // The mover may invalidate its own castle rights.
        if mover.kind == PieceKind::King {
            self.castle_rights.remove(CastleRights::both(us));
        } else if mover.kind == PieceKind::Rook {
            if mv.from == self.rook_home(us, true) {
                self.castle_rights.remove(CastleRights::kingside(us));
            } else if mv.from == self.rook_home(us, false) {
                self.castle_rights.remove(CastleRights::queenside(us));
            }
        }
        zobrist::toggle_castle_rights(
            &mut self.zobrist_hash,
            old_rights.bits(),
            self.castle_rights.bits(),
        );

        // A double pawn push arms en passant on the skipped square.
        if mover.kind == PieceKind::Pawn {
            let diff = mv.to as i32 - mv.from as i32;
            if diff.abs() == 2 * OUTER_SIZE as i32 {
                self.en_passant_target = Some((mv.from + mv.to) / 2);
            }
        }
        let new_ep_file = self.en_passant_file();
        zobrist::toggle_en_passant(&mut self.zobrist_hash, old_ep_file, new_ep_file);

        if mv.is_capture() || mover.kind == PieceKind::Pawn {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        self.side_to_move = us.toggle();
        zobrist::toggle_side_to_move(&mut self.zobrist_hash);
        if self.side_to_move == Color::White {
            self.fullmove_clock += 1;
        }

        let displaced = self.push_repetition(self.zobrist_hash);
        debug_assert_eq!(displaced, mv.prior_ring_entry);
        debug_assert_eq!(self.zobrist_hash, zobrist::hash(self));
    }

    /// Reverses the most recent `make` of this move, restoring every field of
    /// the position including the incremental hash and the repetition ring.
    pub fn unmake(&mut self, mv: &Move) {
        let mover = mv.piece;
        let us = mover.color;
        debug_assert_eq!(us.toggle(), self.side_to_move, "unmake out of order");
        let corner = self.corner;

        self.pop_repetition(mv.prior_ring_entry);

        self.side_to_move = us;
        zobrist::toggle_side_to_move(&mut self.zobrist_hash);
        if us == Color::Black {
            self.fullmove_clock -= 1;
        }
        self.halfmove_clock = mv.prior_halfmove_clock;

        let current_ep_file = self.en_passant_file();
        self.en_passant_target = mv.prior_en_passant;
        let new_ep_file = self.en_passant_file();
        zobrist::toggle_en_passant(&mut self.zobrist_hash, current_ep_file, new_ep_file);

        if mv.is_castle {
            let (rook_from, rook_to) = Position::castle_rook_squares(mv);
            let rook = self.grid[rook_to]
                .piece()
                .expect("invalid unmake: castle without rook");
            self.grid[rook_to] = Square::Empty;
            zobrist::toggle_piece(
                &mut self.zobrist_hash,
                Position::convert_outer_index(rook_to, corner),
                rook,
            );
            self.grid[rook_from] = Square::Occupied(rook);
            zobrist::toggle_piece(
                &mut self.zobrist_hash,
                Position::convert_outer_index(rook_from, corner),
                rook,
            );
            self.has_castled[us.as_index()] = false;
        }

        let placed = match mv.promotion {
            Some(kind) => Piece::new(kind, us),
            None => mover,
        };
        debug_assert_eq!(Some(placed), self.grid[mv.to].piece());
        self.grid[mv.to] = Square::Empty;
        zobrist::toggle_piece(
            &mut self.zobrist_hash,
            Position::convert_outer_index(mv.to, corner),
            placed,
        );
        self.grid[mv.from] = Square::Occupied(mover);
        zobrist::toggle_piece(
            &mut self.zobrist_hash,
            Position::convert_outer_index(mv.from, corner),
            mover,
        );

        if let Some(captured) = mv.captured {
            let target = if mv.is_en_passant {
                Position::ep_victim_square(mv.to, us)
            } else {
                mv.to
            };
            self.grid[target] = Square::Occupied(captured);
            zobrist::toggle_piece(
                &mut self.zobrist_hash,
                Position::convert_outer_index(target, corner),
                captured,
            );
        }

        zobrist::toggle_castle_rights(
            &mut self.zobrist_hash,
            self.castle_rights.bits(),
            mv.prior_castle_rights.bits(),
        );
        self.castle_rights = mv.prior_castle_rights;

        debug_assert_eq!(self.zobrist_hash, zobrist::hash(self));
        debug_assert_eq!(self.repetition_ring[RING_SIZE - 1], self.zobrist_hash);
    }

    /// The square holding the pawn removed by an en-passant capture landing
    /// on `to`: one rank behind the destination from the mover's point of
    /// view.
    pub fn ep_victim_square(to: usize, mover: Color) -> usize {
        match mover {
            Color::White => to + OUTER_SIZE,
            Color::Black => to - OUTER_SIZE,
        }
    }

    /// Start and end squares of the rook participating in a castle move,
    /// derived from the king's trajectory.
    fn castle_rook_squares(mv: &Move) -> (usize, usize) {
        if mv.to > mv.from {
            (mv.to + 1, mv.to - 1)
        } else {
            (mv.to - 2, mv.to + 1)
        }
    }

    /// Home corner of a rook in the current shift state. `kingside` selects
    /// between the h-file and a-file rook.
    pub fn rook_home(&self, color: Color, kingside: bool) -> usize {
        let inner = match (color, kingside) {
            (Color::White, true) => 63,
            (Color::White, false) => 56,
            (Color::Black, true) => 7,
            (Color::Black, false) => 0,
        };
        Position::inner_to_outer(inner, self.corner)
    }

    fn push_repetition(&mut self, hash: u64) -> u64 {
        let displaced = self.repetition_ring[0];
        for i in 0..RING_SIZE - 1 {
            self.repetition_ring[i] = self.repetition_ring[i + 1];
        }
        self.repetition_ring[RING_SIZE - 1] = hash;
        displaced
    }

    fn pop_repetition(&mut self, oldest: u64) {
        for i in (1..RING_SIZE).rev() {
            self.repetition_ring[i] = self.repetition_ring[i - 1];
        }
        self.repetition_ring[0] = oldest;
    }

    /// Flips the side to move without touching the hash or clocks. Used by
    /// the evaluator to generate the opponent's move list; callers must flip
    /// back before the position escapes.
    pub(crate) fn swap_side_to_move(&mut self) {
        self.side_to_move = self.side_to_move.toggle();
    }
}

//
// Game termination
//

impl Position {
    /// Current state of the game: checkmate, draw (stalemate, fifty-move
    /// rule, threefold repetition, insufficient material) or still active.
    pub fn game_state(&mut self) -> GameState {
        let gen = MoveGenerator::new();
        let mut moves = MoveVec::default();
        gen.generate_moves(self, &mut moves);
        if moves.is_empty() {
            return if self.in_check(self.side_to_move) {
                GameState::Mate
            } else {
                GameState::Drawn
            };
        }
        if self.halfmove_clock >= 100 || self.threefold_repetition() || self.draw_by_material() {
            return GameState::Drawn;
        }
        GameState::Active
    }

    /// Threefold repetition as tracked by the nine-entry ring: the same hash
    /// at ring offsets 0, 4 and 8, i.e. the same position recurring every
    /// four plies.
    pub fn threefold_repetition(&self) -> bool {
        self.repetition_ring[0] == self.repetition_ring[4]
            && self.repetition_ring[4] == self.repetition_ring[8]
    }

    /// Insufficient mating material: K vs K, K+B vs K, K+N vs K, or K+B vs
    /// K+B with both bishops on the same square color.
    pub fn draw_by_material(&self) -> bool {
        let mut minors = [(Piece::new(PieceKind::King, Color::White), 0usize); 2];
        let mut count = 0;

        for inner in 0..64 {
            let outer = Position::inner_to_outer(inner, self.corner);
            let piece = match self.grid[outer].piece() {
                Some(piece) => piece,
                None => continue,
            };
            match piece.kind {
                PieceKind::King => continue,
                PieceKind::Bishop | PieceKind::Knight => {
                    if count == 2 {
                        return false;
                    }
                    minors[count] = (piece, (inner / INNER_SIZE + inner % INNER_SIZE) % 2);
                    count += 1;
                }
                _ => return false,
            }
        }

        match count {
            0 | 1 => true,
            _ => {
                let (a, shade_a) = minors[0];
                let (b, shade_b) = minors[1];
                a.kind == PieceKind::Bishop
                    && b.kind == PieceKind::Bishop
                    && a.color != b.color
                    && shade_a == shade_b
            }
        }
    }
}

//
// FEN parsing and generation
//

impl Position {
    pub fn from_start_position() -> Position {
        Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap()
    }

    /// Constructs a new position from a FEN representation of a board
    /// position.
    pub fn from_fen<S: AsRef<str>>(fen: S) -> Result<Position, FenParseError> {
        use std::iter::Peekable;
        use std::str::Chars;

        type Stream<'a> = Peekable<Chars<'a>>;

        fn eat(iter: &mut Stream, expected: char) -> Result<(), FenParseError> {
            match iter.next() {
                Some(c) if c == expected => Ok(()),
                Some(c) => Err(FenParseError::UnexpectedChar(c)),
                None => Err(FenParseError::UnexpectedEnd),
            }
        }

        fn advance(iter: &mut Stream) {
            let _ = iter.next();
        }

        fn peek(iter: &mut Stream) -> Result<char, FenParseError> {
            iter.peek().copied().ok_or(FenParseError::UnexpectedEnd)
        }

        fn eat_side_to_move(iter: &mut Stream) -> Result<Color, FenParseError> {
            let side = match peek(iter)? {
                'w' => Color::White,
                'b' => Color::Black,
                _ => return Err(FenParseError::InvalidSideToMove),
            };
            advance(iter);
            Ok(side)
        }

        fn eat_castle_rights(iter: &mut Stream) -> Result<CastleRights, FenParseError> {
            if peek(iter)? == '-' {
                advance(iter);
                return Ok(CastleRights::NONE);
            }

            let mut rights = CastleRights::NONE;
            for _ in 0..4 {
                match peek(iter)? {
                    'K' => rights |= CastleRights::WHITE_KINGSIDE,
                    'Q' => rights |= CastleRights::WHITE_QUEENSIDE,
                    'k' => rights |= CastleRights::BLACK_KINGSIDE,
                    'q' => rights |= CastleRights::BLACK_QUEENSIDE,
                    ' ' => break,
                    _ => return Err(FenParseError::InvalidCastle),
                }
                advance(iter);
            }
            Ok(rights)
        }

        fn eat_en_passant(iter: &mut Stream, corner: usize) -> Result<Option<usize>, FenParseError> {
            let c = peek(iter)?;
            if c == '-' {
                advance(iter);
                return Ok(None);
            }

            if !('a'..='h').contains(&c) {
                return Err(FenParseError::InvalidEnPassant);
            }
            advance(iter);
            let rank_c = peek(iter)?;
            if !('1'..='8').contains(&rank_c) {
                return Err(FenParseError::InvalidEnPassant);
            }
            advance(iter);

            let file = c as usize - 'a' as usize;
            let row = 8 - (rank_c as usize - '0' as usize);
            Ok(Some(Position::inner_to_outer(row * INNER_SIZE + file, corner)))
        }

        fn eat_clock(iter: &mut Stream, empty: FenParseError, invalid: FenParseError) -> Result<u32, FenParseError> {
            let mut buf = String::new();
            while let Some(c) = iter.peek().copied() {
                if !c.is_digit(10) {
                    break;
                }
                buf.push(c);
                advance(iter);
            }
            if buf.is_empty() {
                return Err(empty);
            }
            buf.parse::<u32>().map_err(|_| invalid)
        }

        let mut pos = Position::empty();
        let str_ref = fen.as_ref();
        let iter = &mut str_ref.chars().peekable();
        for row in 0..INNER_SIZE {
            let mut file = 0;
            while file < INNER_SIZE {
                let c = peek(iter)?;
                // digits 1 through 8 indicate a run of empty squares.
                if c.is_digit(10) {
                    if c < '1' || c > '8' {
                        return Err(FenParseError::InvalidDigit);
                    }
                    file += c as usize - '0' as usize;
                    if file > INNER_SIZE {
                        return Err(FenParseError::FileDoesNotSumToEight);
                    }
                    advance(iter);
                    continue;
                }

                let piece = Piece::try_from(c).map_err(|_| FenParseError::UnknownPiece)?;
                let outer = Position::inner_to_outer(row * INNER_SIZE + file, pos.corner);
                pos.grid[outer] = Square::Occupied(piece);
                advance(iter);
                file += 1;
            }

            if row != INNER_SIZE - 1 {
                eat(iter, '/')?;
            }
        }

        eat(iter, ' ')?;
        pos.side_to_move = eat_side_to_move(iter)?;
        eat(iter, ' ')?;
        pos.castle_rights = eat_castle_rights(iter)?;
        eat(iter, ' ')?;
        pos.en_passant_target = eat_en_passant(iter, pos.corner)?;
        eat(iter, ' ')?;
        pos.halfmove_clock = eat_clock(
            iter,
            FenParseError::EmptyHalfmove,
            FenParseError::InvalidHalfmove,
        )?;
        eat(iter, ' ')?;
        pos.fullmove_clock = eat_clock(
            iter,
            FenParseError::EmptyFullmove,
            FenParseError::InvalidFullmove,
        )?;

        pos.zobrist_hash = zobrist::hash(&pos);
        let hash = pos.zobrist_hash;
        pos.push_repetition(hash);
        Ok(pos)
    }

    pub fn as_fen(&self) -> String {
        let mut buf = String::new();
        for row in 0..INNER_SIZE {
            let mut empty_squares = 0;
            for file in 0..INNER_SIZE {
                let outer = Position::inner_to_outer(row * INNER_SIZE + file, self.corner);
                if let Some(piece) = self.grid[outer].piece() {
                    if empty_squares != 0 {
                        write!(&mut buf, "{}", empty_squares).unwrap();
                    }
                    write!(&mut buf, "{}", piece).unwrap();
                    empty_squares = 0;
                } else {
                    empty_squares += 1;
                }
            }
            if empty_squares != 0 {
                write!(&mut buf, "{}", empty_squares).unwrap();
            }
            if row != INNER_SIZE - 1 {
                buf.push('/');
            }
        }

        write!(&mut buf, " {} ", self.side_to_move).unwrap();
        if self.castle_rights == CastleRights::NONE {
            buf.push('-');
        } else {
            if self.can_castle_kingside(Color::White) {
                buf.push('K');
            }
            if self.can_castle_queenside(Color::White) {
                buf.push('Q');
            }
            if self.can_castle_kingside(Color::Black) {
                buf.push('k');
            }
            if self.can_castle_queenside(Color::Black) {
                buf.push('q');
            }
        }
        buf.push(' ');
        if let Some(ep) = self.en_passant_target {
            write!(&mut buf, "{}", self.square_name(ep)).unwrap();
        } else {
            buf.push('-');
        }
        write!(
            &mut buf,
            " {} {}",
            self.halfmove_clock, self.fullmove_clock
        )
        .unwrap();
        buf
    }
}

//
// Trait implementations
//

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in 0..INNER_SIZE {
            for file in 0..INNER_SIZE {
                let outer = Position::inner_to_outer(row * INNER_SIZE + file, self.corner);
                if let Some(piece) = self.grid[outer].piece() {
                    write!(f, " {} ", piece)?;
                } else {
                    write!(f, " . ")?;
                }
            }
            writeln!(f, "| {}", INNER_SIZE - row)?;
        }

        for _ in 0..INNER_SIZE {
            write!(f, "---")?;
        }
        writeln!(f)?;
        for file in 0..INNER_SIZE {
            write!(f, " {} ", (b'a' + file as u8) as char)?;
        }
        writeln!(f)?;
        Ok(())
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Position({})", self.as_fen())
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::from_start_position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::move_generator::{MoveGenerator, MoveVec};

    fn parsed(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    /// Creates, validates and applies a coordinate move, returning the
    /// applied record for a later unmake.
    fn play(pos: &mut Position, text: &str) -> Move {
        let gen = MoveGenerator::new();
        let mv = gen
            .create_move(pos, text)
            .unwrap_or_else(|| panic!("could not create {}", text));
        gen.validate_move(pos, &mv)
            .unwrap_or_else(|e| panic!("move {} rejected: {}", text, e));
        pos.make(&mv);
        mv
    }

    mod fen {
        use super::*;

        #[test]
        fn start_position_round_trip() {
            let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
            let pos = parsed(fen);
            assert_eq!(fen, pos.as_fen());
        }

        #[test]
        fn kiwipete_round_trip() {
            let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
            assert_eq!(fen, parsed(fen).as_fen());
        }

        #[test]
        fn en_passant_round_trip() {
            let fen = "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3";
            let pos = parsed(fen);
            assert_eq!(fen, pos.as_fen());
            assert_eq!(Some(5), pos.en_passant_file());
        }

        #[test]
        fn start_position_contents() {
            let pos = Position::from_start_position();
            assert_eq!(Color::White, pos.side_to_move());
            assert!(pos.can_castle_kingside(Color::White));
            assert!(pos.can_castle_queenside(Color::White));
            assert!(pos.can_castle_kingside(Color::Black));
            assert!(pos.can_castle_queenside(Color::Black));
            assert_eq!(None, pos.en_passant_target());
            assert_eq!(0, pos.halfmove_clock());
            assert_eq!(1, pos.fullmove_clock());

            let corner = pos.corner();
            let e1 = Position::inner_to_outer(7 * 8 + 4, corner);
            assert_eq!(
                Some(Piece::new(PieceKind::King, Color::White)),
                pos.piece_at(e1)
            );
            let d8 = Position::inner_to_outer(3, corner);
            assert_eq!(
                Some(Piece::new(PieceKind::Queen, Color::Black)),
                pos.piece_at(d8)
            );
        }

        #[test]
        fn empty_input() {
            assert_eq!(
                FenParseError::UnexpectedEnd,
                Position::from_fen("").unwrap_err()
            );
        }

        #[test]
        fn unknown_piece() {
            assert_eq!(
                FenParseError::UnknownPiece,
                Position::from_fen("z7/8/8/8/8/8/8/8 w - - 0 1").unwrap_err()
            );
        }

        #[test]
        fn invalid_digit() {
            assert_eq!(
                FenParseError::InvalidDigit,
                Position::from_fen("9/8/8/8/8/8/8/8 w - - 0 1").unwrap_err()
            );
        }

        #[test]
        fn file_does_not_sum() {
            assert_eq!(
                FenParseError::FileDoesNotSumToEight,
                Position::from_fen("pppp6/8/8/8/8/8/8/8 w - - 0 1").unwrap_err()
            );
        }

        #[test]
        fn bad_side_to_move() {
            assert_eq!(
                FenParseError::InvalidSideToMove,
                Position::from_fen("8/8/8/8/8/8/8/8 c - - 0 1").unwrap_err()
            );
        }

        #[test]
        fn bad_castle_rights() {
            assert_eq!(
                FenParseError::InvalidCastle,
                Position::from_fen("8/8/8/8/8/8/8/8 w a - 0 1").unwrap_err()
            );
        }

        #[test]
        fn bad_en_passant() {
            assert_eq!(
                FenParseError::InvalidEnPassant,
                Position::from_fen("8/8/8/8/8/8/8/8 w - 88 0 1").unwrap_err()
            );
        }

        #[test]
        fn empty_halfmove() {
            assert_eq!(
                FenParseError::EmptyHalfmove,
                Position::from_fen("8/8/8/8/8/8/8/8 w - - q 0").unwrap_err()
            );
        }
    }

    mod apply {
        use super::*;

        #[test]
        fn opening_pawn_push() {
            let mut pos = Position::from_start_position();
            play(&mut pos, "e2e3");

            assert_eq!(Color::Black, pos.side_to_move());
            assert_eq!(1, pos.fullmove_clock());
            assert_eq!(0, pos.halfmove_clock());

            let e3 = Position::inner_to_outer(5 * 8 + 4, pos.corner());
            assert_eq!(
                Some(Piece::new(PieceKind::Pawn, Color::White)),
                pos.piece_at(e3)
            );
            let e2 = Position::inner_to_outer(6 * 8 + 4, pos.corner());
            assert_eq!(None, pos.piece_at(e2));
        }

        #[test]
        fn double_push_arms_en_passant() {
            let mut pos = Position::from_start_position();
            play(&mut pos, "e2e4");
            assert_eq!(Some(4), pos.en_passant_file());
            play(&mut pos, "g8f6");
            assert_eq!(None, pos.en_passant_file());
        }

        #[test]
        fn capture_resets_halfmove_clock() {
            let mut pos = parsed("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 5 3");
            play(&mut pos, "e4d5");
            assert_eq!(0, pos.halfmove_clock());
        }

        #[test]
        fn quiet_piece_move_increments_halfmove_clock() {
            let mut pos = parsed("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 5 3");
            play(&mut pos, "g1f3");
            assert_eq!(6, pos.halfmove_clock());
        }

        #[test]
        fn moving_king_clears_both_rights() {
            let mut pos = parsed("4k3/8/8/8/8/8/8/4K2R w KQ - 0 1");
            play(&mut pos, "e1e2");
            assert!(!pos.can_castle_kingside(Color::White));
            assert!(!pos.can_castle_queenside(Color::White));
        }

        #[test]
        fn moving_kingside_rook_clears_kingside_right() {
            let mut pos = parsed("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1");
            play(&mut pos, "h1g1");
            assert!(!pos.can_castle_kingside(Color::White));
            assert!(pos.can_castle_queenside(Color::White));
        }

        #[test]
        fn capturing_home_rook_clears_right() {
            let mut pos = parsed("4k3/8/8/8/8/7r/4P3/R3K2R b KQ - 0 1");
            play(&mut pos, "h3h1");
            assert!(!pos.can_castle_kingside(Color::White));
            assert!(pos.can_castle_queenside(Color::White));
        }

        #[test]
        fn kingside_castle_moves_rook() {
            let mut pos = parsed("4k3/8/8/8/8/8/8/4K2R w K - 0 1");
            play(&mut pos, "e1g1");

            let f1 = Position::inner_to_outer(7 * 8 + 5, pos.corner());
            let g1 = Position::inner_to_outer(7 * 8 + 6, pos.corner());
            assert_eq!(
                Some(Piece::new(PieceKind::Rook, Color::White)),
                pos.piece_at(f1)
            );
            assert_eq!(
                Some(Piece::new(PieceKind::King, Color::White)),
                pos.piece_at(g1)
            );
            assert!(pos.has_castled(Color::White));
        }

        #[test]
        fn queenside_castle_moves_rook() {
            let mut pos = parsed("4k3/8/8/8/8/8/8/R3K3 w Q - 0 1");
            play(&mut pos, "e1c1");

            let c1 = Position::inner_to_outer(7 * 8 + 2, pos.corner());
            let d1 = Position::inner_to_outer(7 * 8 + 3, pos.corner());
            assert_eq!(
                Some(Piece::new(PieceKind::King, Color::White)),
                pos.piece_at(c1)
            );
            assert_eq!(
                Some(Piece::new(PieceKind::Rook, Color::White)),
                pos.piece_at(d1)
            );
        }

        #[test]
        fn en_passant_capture_removes_victim() {
            let mut pos = parsed("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1");
            play(&mut pos, "e5d6");

            let d5 = Position::inner_to_outer(3 * 8 + 3, pos.corner());
            assert_eq!(None, pos.piece_at(d5));
            let d6 = Position::inner_to_outer(2 * 8 + 3, pos.corner());
            assert_eq!(
                Some(Piece::new(PieceKind::Pawn, Color::White)),
                pos.piece_at(d6)
            );
        }

        #[test]
        fn promotion_replaces_pawn() {
            let mut pos = parsed("4k3/4P3/8/8/8/8/8/4K3 w - - 0 1");
            play(&mut pos, "e7e8");

            let e8 = Position::inner_to_outer(4, pos.corner());
            assert_eq!(
                Some(Piece::new(PieceKind::Queen, Color::White)),
                pos.piece_at(e8)
            );
        }
    }

    mod unmake {
        use super::*;

        fn assert_round_trip(fen: &str) {
            let mut pos = parsed(fen);
            let snapshot = pos.clone();
            let gen = MoveGenerator::new();
            let mut moves = MoveVec::default();
            gen.generate_moves(&mut pos, &mut moves);
            assert!(!moves.is_empty(), "no moves generated for {}", fen);

            for mv in &moves {
                pos.make(mv);
                pos.unmake(mv);
                assert!(
                    pos == snapshot,
                    "make/unmake of {} changed the position {}",
                    snapshot.move_text(mv),
                    fen
                );
                assert_eq!(snapshot.zobrist_hash(), pos.zobrist_hash());
            }
        }

        #[test]
        fn round_trip_start_position() {
            assert_round_trip("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        }

        #[test]
        fn round_trip_kiwipete() {
            assert_round_trip("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        }

        #[test]
        fn round_trip_with_en_passant() {
            assert_round_trip("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3");
        }

        #[test]
        fn round_trip_promotions_and_checks() {
            assert_round_trip("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2pP/R2Q1RK1 w kq - 0 1");
        }

        #[test]
        fn hash_matches_recomputation_along_a_game() {
            let mut pos = Position::from_start_position();
            for text in &["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "g8f6", "e1g1"] {
                play(&mut pos, text);
                assert_eq!(zobrist::hash(&pos), pos.zobrist_hash());
            }
        }

        #[test]
        fn castle_rights_only_decay() {
            let mut pos = parsed("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
            let mut prior = pos.castle_rights();
            for text in &["h1g1", "h8g8", "e1d1", "e8d8"] {
                play(&mut pos, text);
                let current = pos.castle_rights();
                assert_eq!(current, current & prior, "castle right reappeared");
                prior = current;
            }
            assert_eq!(CastleRights::NONE, pos.castle_rights());
        }
    }

    mod termination {
        use super::*;

        #[test]
        fn fools_mate_is_mate() {
            let mut pos = Position::from_start_position();
            for text in &["f2f3", "e7e5", "g2g4", "d8h4"] {
                play(&mut pos, text);
            }
            assert_eq!(GameState::Mate, pos.game_state());
        }

        #[test]
        fn stalemate_is_drawn() {
            let mut pos = parsed("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
            assert_eq!(GameState::Drawn, pos.game_state());
        }

        #[test]
        fn fifty_move_rule() {
            let mut pos = parsed("4k3/8/8/8/8/8/8/R3K3 w - - 99 80");
            assert_eq!(GameState::Active, pos.game_state());
            play(&mut pos, "a1b1");
            assert_eq!(100, pos.halfmove_clock());
            assert_eq!(GameState::Drawn, pos.game_state());
        }

        #[test]
        fn threefold_by_knight_shuffle() {
            let mut pos = Position::from_start_position();
            let shuffle = [
                "b1c3", "b8c6", "c3b1", "c6b8", // back to the start position
                "b1c3", "b8c6", "c3b1", "c6b8", // and again
            ];
            for (i, text) in shuffle.iter().enumerate() {
                play(&mut pos, text);
                if i < shuffle.len() - 1 {
                    assert!(!pos.threefold_repetition(), "premature draw at ply {}", i);
                }
            }
            assert!(pos.threefold_repetition());
            assert_eq!(GameState::Drawn, pos.game_state());
        }

        #[test]
        fn material_draws() {
            assert!(parsed("4k3/8/8/8/8/8/8/4K3 w - - 0 1").draw_by_material());
            assert!(parsed("4k3/8/8/8/8/8/8/4KB2 w - - 0 1").draw_by_material());
            assert!(parsed("4k3/8/8/8/8/8/8/4KN2 w - - 0 1").draw_by_material());
            // both bishops on light squares
            assert!(parsed("3bk3/8/8/8/8/8/8/2B1K3 w - - 0 1").draw_by_material());
            // opposite-shade bishops can still mate
            assert!(!parsed("2b1k3/8/8/8/8/8/8/2B1K3 w - - 0 1").draw_by_material());
            assert!(!parsed("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").draw_by_material());
            assert!(!parsed("4k3/8/8/8/8/8/8/2NBK3 w - - 0 1").draw_by_material());
        }
    }

    mod shifting {
        use super::*;

        #[test]
        fn shift_preserves_fen() {
            let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
            let mut pos = parsed(fen);
            pos.shift(-3, 2);
            assert_eq!(fen, pos.as_fen());
            pos.shift(4, -2);
            assert_eq!(fen, pos.as_fen());
        }

        #[test]
        fn shift_carries_en_passant_target() {
            let mut pos = parsed("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3");
            pos.shift(2, 1);
            assert_eq!(Some(5), pos.en_passant_file());
            assert_eq!("f6", pos.square_name(pos.en_passant_target().unwrap()));
        }

        #[test]
        fn corner_tracks_shifts() {
            let mut pos = Position::from_start_position();
            let (row, col) = pos.corner_coords();
            pos.shift(1, -2);
            assert_eq!((row - 2, col + 1), pos.corner_coords());
        }

        #[test]
        fn outer_index_conversion_is_shift_invariant() {
            let mut pos = Position::from_start_position();
            let e2_inner = 6 * 8 + 4;
            let before = Position::inner_to_outer(e2_inner, pos.corner());
            assert_eq!(
                e2_inner,
                Position::convert_outer_index(before, pos.corner())
            );
            pos.shift(3, 2);
            let after = Position::inner_to_outer(e2_inner, pos.corner());
            assert_ne!(before, after);
            assert_eq!(e2_inner, Position::convert_outer_index(after, pos.corner()));
        }
    }
}
