//! Reading game records from PGN.
//!
//! [`PgnGames`] yields one [`GameRecord`] per game, in file order, reading
//! lazily from the underlying source. Only the main line is kept: variations
//! are skipped, comments and NAGs are ignored.

use std::io::Read;
use std::ops::ControlFlow;

use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Move, Position};
use thiserror::Error;

/// Errors produced while reading a game record.
#[derive(Error, Debug)]
pub enum PgnError {
    /// Failed to read from the PGN source.
    #[error("Failed to read PGN: {0}")]
    Io(#[from] std::io::Error),
    /// The `FEN` tag does not describe a playable position.
    #[error("Invalid FEN tag {fen:?}: {reason}")]
    InvalidSetup { fen: String, reason: String },
    /// A main-line move could not be played.
    #[error("Illegal move {san} at ply {ply}")]
    IllegalMove { san: String, ply: usize },
}

/// Selected PGN header values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameHeaders {
    pub event: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: Option<String>,
    pub fen: Option<String>,
}

/// A game's starting position and main-line moves.
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub headers: GameHeaders,
    pub start: Chess,
    pub moves: Vec<Move>,
}

impl GameRecord {
    /// Record from the standard starting position.
    pub fn from_moves(moves: Vec<Move>) -> Self {
        Self {
            headers: GameHeaders::default(),
            start: Chess::default(),
            moves,
        }
    }
}

/// Main-line state while a game's movetext is read.
struct MovetextState {
    headers: GameHeaders,
    start: Chess,
    position: Chess,
    moves: Vec<Move>,
    error: Option<PgnError>,
}

/// Visitor collecting one [`GameRecord`] per game.
struct GameCollector;

fn starting_position(fen: &str) -> Result<Chess, PgnError> {
    let invalid = |reason: String| PgnError::InvalidSetup {
        fen: fen.to_string(),
        reason,
    };
    let parsed: Fen = fen.parse().map_err(|e| invalid(format!("{}", e)))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| invalid(e.to_string()))
}

impl Visitor for GameCollector {
    type Tags = GameHeaders;
    type Movetext = MovetextState;
    type Output = Result<GameRecord, PgnError>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, GameHeaders> {
        ControlFlow::Continue(GameHeaders::default())
    }

    fn tag(
        &mut self,
        tags: &mut GameHeaders,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let value = value.decode_utf8_lossy().into_owned();
        match name {
            b"Event" => tags.event = Some(value),
            b"White" => tags.white = Some(value),
            b"Black" => tags.black = Some(value),
            b"Result" => tags.result = Some(value),
            b"FEN" => tags.fen = Some(value),
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, headers: GameHeaders) -> ControlFlow<Self::Output, MovetextState> {
        let (start, error) = match headers.fen.as_deref().map(starting_position) {
            None => (Chess::default(), None),
            Some(Ok(position)) => (position, None),
            Some(Err(e)) => (Chess::default(), Some(e)),
        };
        ControlFlow::Continue(MovetextState {
            headers,
            position: start.clone(),
            start,
            moves: Vec::new(),
            error,
        })
    }

    fn san(&mut self, state: &mut MovetextState, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        if state.error.is_some() {
            return ControlFlow::Continue(());
        }

        let played = san_plus
            .san
            .to_move(&state.position)
            .ok()
            .and_then(|mv| state.position.clone().play(mv.clone()).ok().map(|next| (mv, next)));
        match played {
            Some((mv, next)) => {
                state.position = next;
                state.moves.push(mv);
            }
            None => {
                state.error = Some(PgnError::IllegalMove {
                    san: san_plus.to_string(),
                    ply: state.moves.len() + 1,
                });
            }
        }
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _state: &mut MovetextState) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, state: MovetextState) -> Self::Output {
        if let Some(error) = state.error {
            return Err(error);
        }
        Ok(GameRecord {
            headers: state.headers,
            start: state.start,
            moves: state.moves,
        })
    }
}

/// Lazy iterator over the games of a PGN source.
///
/// Each call to `next` reads exactly one more game. Read failures end the
/// iteration after being yielded once.
pub struct PgnGames<R> {
    reader: Reader<R>,
    collector: GameCollector,
    done: bool,
}

impl<R: Read> PgnGames<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: Reader::new(source),
            collector: GameCollector,
            done: false,
        }
    }
}

impl<R: Read> Iterator for PgnGames<R> {
    type Item = Result<GameRecord, PgnError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_game(&mut self.collector) {
            Ok(Some(game)) => Some(game),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(PgnError::Io(e)))
            }
        }
    }
}
