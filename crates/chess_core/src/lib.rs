//! Board representation and rules of orthodox chess.
//!
//! Variant-specific rules (Chess960 castling, extra win conditions) are
//! layered on top of this crate by `arena-runner`.

pub mod board;
pub mod movegen;
pub mod types;
pub mod uci;
pub mod zobrist;

pub use board::*;
pub use movegen::*;
pub use types::*;
pub use uci::*;
pub use zobrist::ZOBRIST;
