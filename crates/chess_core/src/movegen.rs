use crate::{board::Position, types::*};

/// Generate all legal moves for the side to move.
pub fn legal_moves(pos: &Position) -> Vec<Move> {
    let mut out = Vec::with_capacity(64);
    legal_moves_into(pos, &mut out);
    out
}

/// Generate all legal moves into the provided buffer, reusing it across calls.
pub fn legal_moves_into(pos: &Position, out: &mut Vec<Move>) {
    out.clear();
    pseudo_moves(pos, out);
    out.retain(|&mv| leaves_king_safe(pos, mv));
}

/// Legal moves of the piece standing on `from`.
pub fn legal_moves_from(pos: &Position, from: Square) -> Vec<Move> {
    let mut out = Vec::new();
    if let Some(pc) = pos.piece_at(from) {
        if pc.color == pos.side_to_move {
            piece_moves(pos, from, pc, &mut out);
            out.retain(|&mv| leaves_king_safe(pos, mv));
        }
    }
    out
}

pub fn has_legal_move(pos: &Position) -> bool {
    let mut out = Vec::with_capacity(32);
    pseudo_moves(pos, &mut out);
    out.into_iter().any(|mv| leaves_king_safe(pos, mv))
}

/// True when playing `mv` does not leave the mover's own king attacked.
pub fn leaves_king_safe(pos: &Position, mv: Move) -> bool {
    let mover = pos.side_to_move;
    !pos.after(mv).in_check(mover)
}

pub fn is_checkmate(pos: &Position) -> bool {
    pos.in_check(pos.side_to_move) && !has_legal_move(pos)
}

pub fn is_stalemate(pos: &Position) -> bool {
    !pos.in_check(pos.side_to_move) && !has_legal_move(pos)
}

fn pseudo_moves(pos: &Position, out: &mut Vec<Move>) {
    for (from, pc) in pos.pieces(pos.side_to_move) {
        piece_moves(pos, from, pc, out);
    }
}

fn piece_moves(pos: &Position, from: Square, pc: Piece, out: &mut Vec<Move>) {
    match pc.kind {
        PieceKind::Pawn => gen_pawn(pos, from, pc.color, out),
        PieceKind::Knight => gen_steps(pos, from, pc.color, &KNIGHT_DELTAS, out),
        PieceKind::King => {
            gen_steps(pos, from, pc.color, &ALL_DIRECTIONS, out);
            gen_castle(pos, from, pc.color, out);
        }
        kind => gen_slider(pos, from, pc.color, kind.slide_dirs(), out),
    }
}

const PROMOTIONS: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

fn push_pawn_move(from: Square, to: Square, c: Color, out: &mut Vec<Move>) {
    if rank_of(to) == c.promotion_rank() {
        out.extend(PROMOTIONS.iter().map(|&pk| Move::new(from, to).with_promo(pk)));
    } else {
        out.push(Move::new(from, to));
    }
}

fn gen_pawn(pos: &Position, from: Square, c: Color, out: &mut Vec<Move>) {
    let f = file_of(from);
    let r = rank_of(from);
    let dir = c.forward();

    if let Some(to) = sq(f, r + dir).filter(|&s| pos.is_empty_at(s)) {
        push_pawn_move(from, to, c, out);
        if r == c.pawn_rank() {
            if let Some(to2) = sq(f, r + 2 * dir).filter(|&s| pos.is_empty_at(s)) {
                out.push(Move::new(from, to2));
            }
        }
    }

    for df in [-1, 1] {
        let Some(to) = sq(f + df, r + dir) else {
            continue;
        };
        match pos.piece_at(to) {
            Some(target) if target.color != c => push_pawn_move(from, to, c, out),
            None if pos.en_passant == Some(to) => {
                let mut mv = Move::new(from, to);
                mv.is_en_passant = true;
                out.push(mv);
            }
            _ => {}
        }
    }
}

fn gen_steps(pos: &Position, from: Square, c: Color, deltas: &[(i8, i8)], out: &mut Vec<Move>) {
    let f = file_of(from);
    let r = rank_of(from);
    for (df, dr) in deltas {
        if let Some(to) = sq(f + df, r + dr) {
            match pos.piece_at(to) {
                Some(pc) if pc.color == c => {}
                _ => out.push(Move::new(from, to)),
            }
        }
    }
}

fn gen_slider(pos: &Position, from: Square, c: Color, dirs: &[(i8, i8)], out: &mut Vec<Move>) {
    for &dir in dirs {
        for to in ray(from, dir) {
            match pos.piece_at(to) {
                None => out.push(Move::new(from, to)),
                Some(pc) => {
                    if pc.color != c {
                        out.push(Move::new(from, to));
                    }
                    break;
                }
            }
        }
    }
}

/// Orthodox castling from the e-file driven by `Position::castling`.
/// Positions without rights (e.g. Chess960) never reach the square checks.
fn gen_castle(pos: &Position, from: Square, c: Color, out: &mut Vec<Move>) {
    let (base, king_side, queen_side) = match c {
        Color::White => (0u8, pos.castling.wk, pos.castling.wq),
        Color::Black => (56u8, pos.castling.bk, pos.castling.bq),
    };
    if from != base + 4 || !(king_side || queen_side) || pos.in_check(c) {
        return;
    }
    let enemy = c.other();
    let clear = |files: &[u8]| files.iter().all(|&f| pos.is_empty_at(base + f));
    let safe = |files: &[u8]| files.iter().all(|&f| !pos.is_square_attacked(base + f, enemy));

    if king_side && clear(&[5, 6]) && safe(&[5, 6]) {
        out.push(Move::castle(from, base + 6));
    }
    if queen_side && clear(&[1, 2, 3]) && safe(&[2, 3]) {
        out.push(Move::castle(from, base + 2));
    }
}

#[cfg(test)]
#[path = "movegen_tests.rs"]
mod movegen_tests;
