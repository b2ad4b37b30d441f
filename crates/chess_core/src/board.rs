use crate::types::*;
use crate::zobrist::ZOBRIST;
use thiserror::Error;

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Reasons a FEN string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("expected at least 4 fields, got {0}")]
    MissingFields(usize),
    #[error("board section must have 8 ranks")]
    RankCount,
    #[error("rank {0} does not describe exactly 8 files")]
    RankWidth(usize),
    #[error("invalid piece character '{0}'")]
    PieceChar(char),
    #[error("invalid side to move '{0}'")]
    SideToMove(String),
    #[error("invalid castling character '{0}'")]
    CastlingChar(char),
    #[error("invalid en-passant square '{0}'")]
    EnPassant(String),
    #[error("invalid move counter '{0}'")]
    Counter(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CastlingRights {
    pub wk: bool,
    pub wq: bool,
    pub bk: bool,
    pub bq: bool,
}

impl CastlingRights {
    pub fn all() -> Self {
        Self {
            wk: true,
            wq: true,
            bk: true,
            bq: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn clear_color(&mut self, c: Color) {
        match c {
            Color::White => {
                self.wk = false;
                self.wq = false;
            }
            Color::Black => {
                self.bk = false;
                self.bq = false;
            }
        }
    }

    /// Drop the right tied to a rook home square, if any.
    fn clear_rook_square(&mut self, sq: Square) {
        match sq {
            0 => self.wq = false,
            7 => self.wk = false,
            56 => self.bq = false,
            63 => self.bk = false,
            _ => {}
        }
    }

    fn to_fen(&self) -> String {
        let mut s = String::new();
        for (flag, ch) in [(self.wk, 'K'), (self.wq, 'Q'), (self.bk, 'k'), (self.bq, 'q')] {
            if flag {
                s.push(ch);
            }
        }
        if s.is_empty() {
            s.push('-');
        }
        s
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub board: [Option<Piece>; 64],
    pub side_to_move: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>, // square behind a pawn that just advanced 2
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

impl Position {
    pub fn startpos() -> Self {
        Self::with_back_rank(BACK_RANK, CastlingRights::all())
    }

    /// Empty board, white to move, no rights.
    pub fn empty() -> Self {
        Position {
            board: [None; 64],
            side_to_move: Color::White,
            castling: CastlingRights::none(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Full starting army with the given back-rank order mirrored for black.
    pub fn with_back_rank(back: [PieceKind; 8], castling: CastlingRights) -> Self {
        let mut p = Self::empty();
        p.castling = castling;
        for (f, &kind) in back.iter().enumerate() {
            p.board[f] = Some(Piece::new(Color::White, kind));
            p.board[8 + f] = Some(Piece::new(Color::White, PieceKind::Pawn));
            p.board[48 + f] = Some(Piece::new(Color::Black, PieceKind::Pawn));
            p.board[56 + f] = Some(Piece::new(Color::Black, kind));
        }
        p
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(FenError::MissingFields(parts.len()));
        }

        let ranks: Vec<&str> = parts[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::RankCount);
        }

        let mut pos = Self::empty();
        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let rank: i8 = 7 - rank_idx as i8; // FEN lists rank 8 .. 1
            let mut file: i8 = 0;
            for ch in rank_str.chars() {
                if let Some(d) = ch.to_digit(10) {
                    file += d as i8;
                } else {
                    let kind = PieceKind::from_char(ch).ok_or(FenError::PieceChar(ch))?;
                    let color = if ch.is_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    let s = sq(file, rank).ok_or(FenError::RankWidth(rank_idx))?;
                    pos.board[s as usize] = Some(Piece::new(color, kind));
                    file += 1;
                }
                if file > 8 {
                    return Err(FenError::RankWidth(rank_idx));
                }
            }
            if file != 8 {
                return Err(FenError::RankWidth(rank_idx));
            }
        }

        pos.side_to_move = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::SideToMove(other.to_string())),
        };

        if parts[2] != "-" {
            for c in parts[2].chars() {
                match c {
                    'K' => pos.castling.wk = true,
                    'Q' => pos.castling.wq = true,
                    'k' => pos.castling.bk = true,
                    'q' => pos.castling.bq = true,
                    _ => return Err(FenError::CastlingChar(c)),
                }
            }
        }

        pos.en_passant = match parts[3] {
            "-" => None,
            coord => Some(coord_to_sq(coord).ok_or_else(|| FenError::EnPassant(coord.to_string()))?),
        };

        let counter = |s: &str| s.parse::<u32>().map_err(|_| FenError::Counter(s.to_string()));
        pos.halfmove_clock = counter(parts.get(4).copied().unwrap_or("0"))?;
        pos.fullmove_number = counter(parts.get(5).copied().unwrap_or("1"))?;
        Ok(pos)
    }

    pub fn to_fen(&self) -> String {
        let mut board = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.board[(rank * 8 + file) as usize] {
                    Some(pc) => {
                        if empty > 0 {
                            board.push_str(&empty.to_string());
                            empty = 0;
                        }
                        board.push(pc.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                board.push_str(&empty.to_string());
            }
            if rank > 0 {
                board.push('/');
            }
        }
        let stm = match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        };
        let ep = self.en_passant.map(sq_to_coord).unwrap_or_else(|| "-".to_string());
        format!(
            "{board} {stm} {} {ep} {} {}",
            self.castling.to_fen(),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    pub fn king_sq(&self, c: Color) -> Option<Square> {
        self.pieces(c)
            .find(|(_, pc)| pc.kind == PieceKind::King)
            .map(|(s, _)| s)
    }

    /// All pieces of one color with their squares, a1 first.
    pub fn pieces(&self, c: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.board
            .iter()
            .enumerate()
            .filter_map(move |(i, pc)| pc.filter(|p| p.color == c).map(|p| (i as Square, p)))
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board[sq as usize]
    }
    pub fn set_piece(&mut self, sq: Square, pc: Option<Piece>) {
        self.board[sq as usize] = pc;
    }

    pub fn is_empty_at(&self, sq: Square) -> bool {
        self.board[sq as usize].is_none()
    }

    pub fn in_check(&self, c: Color) -> bool {
        match self.king_sq(c) {
            Some(ksq) => self.is_square_attacked(ksq, c.other()),
            None => false,
        }
    }

    pub fn is_square_attacked(&self, target: Square, by: Color) -> bool {
        let tf = file_of(target);
        let tr = rank_of(target);
        let holds = |s: Option<Square>, kinds: &[PieceKind]| {
            s.and_then(|s| self.piece_at(s))
                .map(|pc| pc.color == by && kinds.contains(&pc.kind))
                .unwrap_or(false)
        };

        // A pawn attacks the target from one rank behind, relative to its own direction.
        let pawn_rank = tr - by.forward();
        if [-1, 1].iter().any(|df| holds(sq(tf + df, pawn_rank), &[PieceKind::Pawn])) {
            return true;
        }
        if KNIGHT_DELTAS
            .iter()
            .any(|(df, dr)| holds(sq(tf + df, tr + dr), &[PieceKind::Knight]))
        {
            return true;
        }
        if ALL_DIRECTIONS
            .iter()
            .any(|(df, dr)| holds(sq(tf + df, tr + dr), &[PieceKind::King]))
        {
            return true;
        }

        let first_hit = |dir: (i8, i8)| ray(target, dir).find_map(|s| self.piece_at(s));
        let slides = |dirs: &[(i8, i8)], kind: PieceKind| {
            dirs.iter().any(|&dir| {
                first_hit(dir)
                    .map(|pc| pc.color == by && (pc.kind == kind || pc.kind == PieceKind::Queen))
                    .unwrap_or(false)
            })
        };
        slides(&DIAGONALS, PieceKind::Bishop) || slides(&ORTHOGONALS, PieceKind::Rook)
    }

    /// Play a move assumed to be at least pseudo-legal. Moving from an empty
    /// square is a no-op apart from passing the turn.
    pub fn make_move(&mut self, mv: Move) {
        let Some(moved) = self.piece_at(mv.from) else {
            self.pass_turn();
            return;
        };
        let mut captured = self.piece_at(mv.to);
        self.en_passant = None;

        if mv.is_en_passant {
            if let Some(cs) = sq(file_of(mv.to), rank_of(mv.to) - moved.color.forward()) {
                captured = self.piece_at(cs);
                self.set_piece(cs, None);
            }
        }

        self.set_piece(mv.from, None);
        let placed = if moved.kind == PieceKind::Pawn && rank_of(mv.to) == moved.color.promotion_rank()
        {
            Piece::new(moved.color, mv.promo.unwrap_or(PieceKind::Queen))
        } else {
            moved
        };
        self.set_piece(mv.to, Some(placed));

        if mv.is_castle && moved.kind == PieceKind::King {
            if let Some((rf, rt)) = standard_castle_rook(moved.color, mv.from, mv.to) {
                let rook = self.piece_at(rf);
                self.set_piece(rf, None);
                self.set_piece(rt, rook);
            }
        }

        if moved.kind == PieceKind::King {
            self.castling.clear_color(moved.color);
        }
        if moved.kind == PieceKind::Rook {
            self.castling.clear_rook_square(mv.from);
        }
        if captured.map(|c| c.kind == PieceKind::Rook).unwrap_or(false) {
            self.castling.clear_rook_square(mv.to);
        }

        if moved.kind == PieceKind::Pawn
            && rank_of(mv.from) == moved.color.pawn_rank()
            && rank_of(mv.to) == moved.color.pawn_rank() + 2 * moved.color.forward()
        {
            self.en_passant = sq(file_of(mv.from), moved.color.pawn_rank() + moved.color.forward());
        }

        self.halfmove_clock = if moved.kind == PieceKind::Pawn || captured.is_some() {
            0
        } else {
            self.halfmove_clock + 1
        };
        self.pass_turn();
    }

    /// Copy of the position after `mv`.
    pub fn after(&self, mv: Move) -> Position {
        let mut next = self.clone();
        next.make_move(mv);
        next
    }

    /// Hand the move to the other side without moving a piece.
    pub fn pass_turn(&mut self) {
        if self.side_to_move == Color::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = self.side_to_move.other();
    }

    /// Zobrist key of placement, side to move, castling and en passant.
    pub fn position_hash(&self) -> u64 {
        let mut h = 0u64;
        for (i, pc) in self.board.iter().enumerate() {
            if let Some(pc) = pc {
                h ^= ZOBRIST.piece_key(*pc, i as Square);
            }
        }
        if self.side_to_move == Color::Black {
            h ^= ZOBRIST.side_to_move;
        }
        let rights = [self.castling.wk, self.castling.wq, self.castling.bk, self.castling.bq];
        for (i, _) in rights.iter().enumerate().filter(|(_, r)| **r) {
            h ^= ZOBRIST.castling_key(i);
        }
        if let Some(ep) = self.en_passant {
            h ^= ZOBRIST.ep_key(file_of(ep) as u8);
        }
        h
    }

    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove_clock >= 100
    }

    /// Neither side can possibly mate: bare kings plus at most one minor
    /// piece, or only bishops that all stand on one square color.
    pub fn is_insufficient_material(&self) -> bool {
        let mut minors = 0;
        let mut knights = 0;
        let mut bishop_shades = Vec::new();
        for (i, pc) in self.board.iter().enumerate() {
            let Some(pc) = pc else { continue };
            match pc.kind {
                PieceKind::King => {}
                PieceKind::Knight => {
                    minors += 1;
                    knights += 1;
                }
                PieceKind::Bishop => {
                    minors += 1;
                    bishop_shades.push(is_dark(i as Square));
                }
                _ => return false,
            }
        }
        if minors <= 1 {
            return true;
        }
        knights == 0 && bishop_shades.windows(2).all(|w| w[0] == w[1])
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

/// Rook squares for an orthodox castle from the e-file.
fn standard_castle_rook(c: Color, from: Square, to: Square) -> Option<(Square, Square)> {
    let base = match c {
        Color::White => 0,
        Color::Black => 56,
    };
    if from != base + 4 {
        return None;
    }
    if to == base + 6 {
        Some((base + 7, base + 5))
    } else if to == base + 2 {
        Some((base, base + 3))
    } else {
        None
    }
}
