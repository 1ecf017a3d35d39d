//! Pin detection.

use std::collections::BTreeSet;

use shakmaty::{Color, Piece, Role, Square};

use crate::board::BoardQuery;

/// A piece pinned to its own king.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinRecord {
    /// Square of the pinned piece.
    pub pinned_square: Square,
    /// The pinned piece.
    pub piece: Piece,
    /// Square of the king it is pinned to.
    pub king_square: Square,
}

impl PinRecord {
    /// Deduplication key. One piece per square makes the square sufficient.
    pub fn signature(&self) -> Square {
        self.pinned_square
    }
}

/// Finds every non-king piece of `side` pinned to `side`'s king.
///
/// Records come back in square order (a1 to h8).
pub fn detect_pins<B: BoardQuery>(board: &B, side: Color) -> Vec<PinRecord> {
    let Some(king_square) = board.king_square(side) else {
        return Vec::new();
    };

    Square::ALL
        .into_iter()
        .filter_map(|square| {
            let piece = board.piece_at(square)?;
            if piece.color != side || piece.role == Role::King {
                return None;
            }
            board.is_pinned(side, square).then_some(PinRecord {
                pinned_square: square,
                piece,
                king_square,
            })
        })
        .collect()
}

/// Signature set of [`detect_pins`].
pub fn pin_signatures<B: BoardQuery>(board: &B, side: Color) -> BTreeSet<Square> {
    detect_pins(board, side)
        .iter()
        .map(PinRecord::signature)
        .collect()
}
