//! Skewer detection.
//!
//! A skewer is a slider aimed through a more valuable enemy piece at a less
//! valuable one behind it. Geometry alone over-reports: the front piece may
//! be unable to move, or every move it has may keep the line closed. Each
//! aligned candidate is therefore confirmed by playing the front piece's
//! legal moves on a trial copy and checking that the rear piece comes under
//! attack from the skewering side.
//!
//! Every slider walks all eight directions. A rook's diagonal line only
//! counts when some other piece of its side attacks the front piece.

use std::collections::BTreeSet;

use shakmaty::{Color, Piece, Role, Square};
use tracing::trace;

use crate::board::{piece_value, BoardQuery};

/// Unit steps as (file, rank) deltas: four orthogonal, four diagonal.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
];

/// An aligned attacker, front piece and rear piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkewerRecord {
    /// Square of the attacking slider.
    pub attacker_square: Square,
    /// Square of the piece directly in the line of fire.
    pub front_square: Square,
    /// The piece in the line of fire.
    pub front_piece: Piece,
    /// Square of the piece exposed once the front piece moves.
    pub rear_square: Square,
    /// The exposed piece.
    pub rear_piece: Piece,
}

/// Deduplication key of a skewer: (attacker, front, rear).
pub type SkewerSignature = (Square, Square, Square);

impl SkewerRecord {
    pub fn signature(&self) -> SkewerSignature {
        (self.attacker_square, self.front_square, self.rear_square)
    }
}

fn is_slider(role: Role) -> bool {
    matches!(role, Role::Bishop | Role::Rook | Role::Queen)
}

/// Squares from `origin` outward along `(df, dr)` up to the board edge.
fn ray(origin: Square, (df, dr): (i32, i32)) -> impl Iterator<Item = Square> {
    let index = u32::from(origin) as i32;
    let (file, rank) = (index % 8, index / 8);
    (1..8)
        .map(move |step| (file + df * step, rank + dr * step))
        .take_while(|&(f, r)| (0..8).contains(&f) && (0..8).contains(&r))
        .map(|(f, r)| Square::new((r * 8 + f) as u32))
}

/// The first two occupants along a ray, or `None` if fewer than two.
fn first_two_occupants<B: BoardQuery>(
    board: &B,
    origin: Square,
    direction: (i32, i32),
) -> Option<[(Square, Piece); 2]> {
    let mut occupants = ray(origin, direction)
        .filter_map(|square| board.piece_at(square).map(|piece| (square, piece)));
    let front = occupants.next()?;
    let rear = occupants.next()?;
    Some([front, rear])
}

/// Whether some legal move of the front piece leaves `rear_square` attacked
/// by `attacker_color`.
///
/// The front piece's side is handed the move on a trial copy, even when
/// that leaves the attacking side in check.
fn front_can_expose_rear<B: BoardQuery>(
    board: &B,
    attacker_color: Color,
    front: (Square, Piece),
    rear_square: Square,
) -> bool {
    let (front_square, front_piece) = front;
    let mut trial = board.with_turn(front_piece.color);

    for mv in trial.legal_moves(front_piece.color, Some(front_square)) {
        if trial.push(mv).is_err() {
            continue;
        }
        let exposed = trial.attacks(attacker_color, rear_square);
        trial.pop();
        if exposed {
            return true;
        }
    }
    false
}

/// Finds every validated skewer created by `attacker_color`'s sliders.
///
/// Records are ordered by attacker square, then by ray direction.
pub fn detect_skewers<B: BoardQuery>(board: &B, attacker_color: Color) -> Vec<SkewerRecord> {
    let mut skewers = Vec::new();
    let mut reported: BTreeSet<SkewerSignature> = BTreeSet::new();

    for attacker_square in Square::ALL {
        let Some(attacker) = board.piece_at(attacker_square) else {
            continue;
        };
        if attacker.color != attacker_color || !is_slider(attacker.role) {
            continue;
        }

        for direction in DIRECTIONS {
            let Some([front, rear]) = first_two_occupants(board, attacker_square, direction)
            else {
                continue;
            };
            let ((front_square, front_piece), (rear_square, rear_piece)) = (front, rear);

            if front_piece.color == attacker_color || rear_piece.color == attacker_color {
                continue;
            }
            if piece_value(front_piece.role) <= piece_value(rear_piece.role) {
                continue;
            }
            if !board.attacks(attacker_color, front_square) {
                continue;
            }
            if !front_can_expose_rear(board, attacker_color, front, rear_square) {
                continue;
            }

            let record = SkewerRecord {
                attacker_square,
                front_square,
                front_piece,
                rear_square,
                rear_piece,
            };
            if reported.insert(record.signature()) {
                trace!(
                    attacker = %attacker_square,
                    front = %front_square,
                    rear = %rear_square,
                    "skewer"
                );
                skewers.push(record);
            }
        }
    }

    skewers
}

/// Signature set of [`detect_skewers`].
pub fn skewer_signatures<B: BoardQuery>(
    board: &B,
    attacker_color: Color,
) -> BTreeSet<SkewerSignature> {
    detect_skewers(board, attacker_color)
        .iter()
        .map(SkewerRecord::signature)
        .collect()
}
