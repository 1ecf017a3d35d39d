//! Board queries used by the tactic detectors.
//!
//! The detectors never touch a rules engine directly. They talk to a
//! [`BoardQuery`], which answers piece, attack and pin questions and
//! supports scoped push/pop of trial moves. [`Board`] implements it on top
//! of [`shakmaty::Chess`].

use std::fmt;

use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{
    attacks, Bitboard, CastlingMode, Chess, Color, EnPassantMode, FromSetup, Move, Piece,
    Position, PositionError, Rank, Role, Setup, Square,
};
use thiserror::Error;

/// Errors raised by board construction and mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// The FEN string could not be parsed.
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
    /// The FEN parsed but does not describe a legal chess position.
    #[error("Invalid position: {0}")]
    InvalidPosition(String),
    /// A move was pushed that is not legal in the current position.
    #[error("Illegal move: {0}")]
    IllegalMove(String),
}

/// Query and trial-mutation interface over a chess position.
///
/// Squares and pieces use the `shakmaty` value types. Implementations must
/// answer every query from the current position only.
pub trait BoardQuery: Sized {
    /// The move type accepted by [`push`](Self::push).
    type Move: Clone + PartialEq + fmt::Debug;

    /// Side to move.
    fn turn(&self) -> Color;

    /// Piece standing on `square`, if any.
    fn piece_at(&self, square: Square) -> Option<Piece>;

    /// Square of `side`'s king, if it has one.
    fn king_square(&self, side: Color) -> Option<Square>;

    /// Whether the piece on `square` is pinned to `side`'s king.
    fn is_pinned(&self, side: Color, square: Square) -> bool;

    /// Whether any piece of `side` attacks `square`.
    fn attacks(&self, side: Color, square: Square) -> bool;

    /// Legal moves for `side`, optionally restricted to those leaving `origin`.
    ///
    /// When `side` is not to move the moves are generated as if the turn
    /// were handed over (see [`with_turn`](Self::with_turn)).
    fn legal_moves(&self, side: Color, origin: Option<Square>) -> Vec<Self::Move>;

    /// Non-destructive copy, with or without the pushed-move history.
    fn copy(&self, include_history: bool) -> Self;

    /// History-free copy with `side` to move.
    ///
    /// The handover always succeeds, even when the other side is left in
    /// check. Moves generated afterwards only need to keep `side`'s own king
    /// safe.
    fn with_turn(&self, side: Color) -> Self;

    /// Plays a legal move.
    fn push(&mut self, mv: Self::Move) -> Result<(), BoardError>;

    /// Takes back the last pushed move.
    fn pop(&mut self) -> Option<Self::Move>;
}

/// Position state behind a [`Board`].
#[derive(Debug, Clone)]
enum State {
    Legal(Chess),
    /// Turn handed to a side whose opponent is in check. `shakmaty` rejects
    /// these, so moves come from [`handed_over_moves`].
    HandedOver(Setup),
}

impl State {
    fn from_setup(setup: Setup) -> Self {
        match Chess::from_setup(setup.clone(), CastlingMode::Standard)
            .or_else(PositionError::ignore_impossible_check)
        {
            Ok(position) => State::Legal(position),
            Err(_) => State::HandedOver(setup),
        }
    }

    fn placement(&self) -> &shakmaty::Board {
        match self {
            State::Legal(position) => position.board(),
            State::HandedOver(setup) => &setup.board,
        }
    }

    fn turn(&self) -> Color {
        match self {
            State::Legal(position) => position.turn(),
            State::HandedOver(setup) => setup.turn,
        }
    }

    fn to_setup(&self) -> Setup {
        match self {
            State::Legal(position) => position.to_setup(EnPassantMode::Legal),
            State::HandedOver(setup) => setup.clone(),
        }
    }

    fn moves(&self) -> Vec<Move> {
        match self {
            State::Legal(position) => position.legal_moves().into_iter().collect(),
            State::HandedOver(setup) => handed_over_moves(&setup.board, setup.turn),
        }
    }
}

/// Moves `us` can make on a bare placement without exposing its own king.
///
/// Castling and en passant never arise after a handover and are not
/// generated. Captures of the enemy king are kept.
fn handed_over_moves(placement: &shakmaty::Board, us: Color) -> Vec<Move> {
    let promotions = [
        Some(Role::Queen),
        Some(Role::Rook),
        Some(Role::Bishop),
        Some(Role::Knight),
    ];
    let mut moves = Vec::new();

    for from in placement.by_color(us) {
        let Some(role) = placement.role_at(from) else {
            continue;
        };
        let targets = if role == Role::Pawn {
            pawn_targets(placement, us, from)
        } else {
            attacks::attacks(from, Piece { color: us, role }, placement.occupied())
                & !placement.by_color(us)
        };

        for to in targets {
            let promoting = role == Role::Pawn && to.rank() == (!us).backrank();
            let choices: &[Option<Role>] = if promoting { &promotions } else { &[None] };
            for &promotion in choices {
                let mv = Move::Normal {
                    role,
                    from,
                    capture: placement.role_at(to),
                    to,
                    promotion,
                };
                let mut after = placement.clone();
                place(&mut after, us, mv);
                let safe = after
                    .king_of(us)
                    .map_or(true, |king| !after.attacks_to(king, !us, after.occupied()).any());
                if safe {
                    moves.push(mv);
                }
            }
        }
    }
    moves
}

fn pawn_targets(placement: &shakmaty::Board, us: Color, from: Square) -> Bitboard {
    let occupied = placement.occupied();
    let mut targets = attacks::pawn_attacks(us, from) & placement.by_color(!us);
    let step = us.fold_wb(8, -8);

    if let Some(single) = from.offset(step).filter(|sq| !occupied.contains(*sq)) {
        targets.add(single);
        if from.rank() == us.fold_wb(Rank::Second, Rank::Seventh) {
            if let Some(double) = single.offset(step).filter(|sq| !occupied.contains(*sq)) {
                targets.add(double);
            }
        }
    }
    targets
}

/// Moves the piece of a [`Move::Normal`] on a bare placement.
fn place(placement: &mut shakmaty::Board, us: Color, mv: Move) {
    if let Move::Normal {
        role,
        from,
        to,
        promotion,
        ..
    } = mv
    {
        placement.discard_piece_at(from);
        placement.set_piece_at(
            to,
            Piece {
                color: us,
                role: promotion.unwrap_or(role),
            },
        );
    }
}

/// A chess position with an undo stack.
///
/// Positions reached through the rules engine are held as
/// [`shakmaty::Chess`]. A turn handover that leaves the other side in check
/// is held as a raw [`Setup`] instead.
#[derive(Debug, Clone)]
pub struct Board {
    state: State,
    history: Vec<(State, Move)>,
}

impl Default for Board {
    fn default() -> Self {
        Self::from(Chess::default())
    }
}

impl Board {
    /// Board at the standard starting position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a board from FEN.
    ///
    /// # Errors
    ///
    /// - [`BoardError::InvalidFen`] if the text is not FEN
    /// - [`BoardError::InvalidPosition`] if the position is not legal chess
    pub fn from_fen(fen: &str) -> Result<Self, BoardError> {
        let fen: Fen = fen
            .parse()
            .map_err(|e| BoardError::InvalidFen(format!("{}: {}", fen, e)))?;
        let position: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| BoardError::InvalidPosition(e.to_string()))?;
        Ok(Self::from(position))
    }

    /// The underlying position, or `None` while the turn is handed over to
    /// a side whose opponent is in check.
    pub fn position(&self) -> Option<&Chess> {
        match &self.state {
            State::Legal(position) => Some(position),
            State::HandedOver(_) => None,
        }
    }

    /// Current position as FEN.
    pub fn fen(&self) -> String {
        match &self.state {
            State::Legal(position) => Fen::from_position(position, EnPassantMode::Legal),
            State::HandedOver(setup) => {
                Fen::try_from_setup(setup.clone()).unwrap_or_else(|lossy| lossy.ignore())
            }
        }
        .to_string()
    }

    /// Number of moves on the undo stack.
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    /// Resolves a UCI move against the current position.
    ///
    /// Returns `None` if the move is not legal here.
    pub fn resolve(&self, uci: &UciMove) -> Option<Move> {
        match &self.state {
            State::Legal(position) => uci.to_move(position).ok(),
            State::HandedOver(_) => self
                .state
                .moves()
                .into_iter()
                .find(|mv| mv.to_uci(CastlingMode::Standard) == *uci),
        }
    }
}

impl From<Chess> for Board {
    fn from(position: Chess) -> Self {
        Self {
            state: State::Legal(position),
            history: Vec::new(),
        }
    }
}

/// UCI text of a move, for messages and logs.
pub fn uci_text(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

impl BoardQuery for Board {
    type Move = Move;

    fn turn(&self) -> Color {
        self.state.turn()
    }

    fn piece_at(&self, square: Square) -> Option<Piece> {
        self.state.placement().piece_at(square)
    }

    fn king_square(&self, side: Color) -> Option<Square> {
        self.state.placement().king_of(side)
    }

    fn is_pinned(&self, side: Color, square: Square) -> bool {
        let board = self.state.placement();
        let Some(king) = self.king_square(side) else {
            return false;
        };
        let snipers = (attacks::rook_attacks(king, Bitboard::EMPTY) & board.rooks_and_queens())
            | (attacks::bishop_attacks(king, Bitboard::EMPTY) & board.bishops_and_queens());

        // A sniper pins `square` when it is the only occupant between it and the king.
        (snipers & board.by_color(!side))
            .into_iter()
            .any(|sniper| {
                attacks::between(king, sniper) & board.occupied() == Bitboard::from_square(square)
            })
    }

    fn attacks(&self, side: Color, square: Square) -> bool {
        let board = self.state.placement();
        board.attacks_to(square, side, board.occupied()).any()
    }

    fn legal_moves(&self, side: Color, origin: Option<Square>) -> Vec<Move> {
        let moves = if side == self.turn() {
            self.state.moves()
        } else {
            self.with_turn(side).state.moves()
        };
        moves
            .into_iter()
            .filter(|mv| origin.map_or(true, |sq| mv.from() == Some(sq)))
            .collect()
    }

    fn copy(&self, include_history: bool) -> Self {
        if include_history {
            self.clone()
        } else {
            Self {
                state: self.state.clone(),
                history: Vec::new(),
            }
        }
    }

    fn with_turn(&self, side: Color) -> Self {
        if side == self.turn() {
            return self.copy(false);
        }
        let mut setup = self.state.to_setup();
        setup.swap_turn();
        Self {
            state: State::from_setup(setup),
            history: Vec::new(),
        }
    }

    fn push(&mut self, mv: Move) -> Result<(), BoardError> {
        let illegal = || BoardError::IllegalMove(uci_text(&mv));
        let next = match &self.state {
            State::Legal(position) => {
                State::Legal(position.clone().play(mv).map_err(|_| illegal())?)
            }
            State::HandedOver(setup) => {
                if !handed_over_moves(&setup.board, setup.turn).contains(&mv) {
                    return Err(illegal());
                }
                let mut next = setup.clone();
                place(&mut next.board, setup.turn, mv);
                next.castling_rights &= next.board.rooks();
                if mv.role() == Role::King {
                    next.castling_rights &= !Bitboard::from_rank(setup.turn.backrank());
                }
                next.swap_turn();
                State::from_setup(next)
            }
        };
        let previous = std::mem::replace(&mut self.state, next);
        self.history.push((previous, mv));
        Ok(())
    }

    fn pop(&mut self) -> Option<Move> {
        let (previous, mv) = self.history.pop()?;
        self.state = previous;
        Some(mv)
    }
}

/// Material value used to order skewer targets.
///
/// The king is never evaluated as a target and scores zero.
pub fn piece_value(role: Role) -> u8 {
    match role {
        Role::Queen => 9,
        Role::Rook => 5,
        Role::Bishop | Role::Knight => 3,
        Role::Pawn => 1,
        Role::King => 0,
    }
}
