//! Move-by-move tactic classification over game timelines.
//!
//! This module provides the [`TacticAnalyzer`], which replays each game's
//! main line and sorts the pins and skewers that appear into executed,
//! missed and allowed events.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use shakmaty::Move;
use thiserror::Error;
use tracing::{debug, info};

use crate::board::{uci_text, Board, BoardError, BoardQuery};
use crate::engine::{AnalysisEngine, EngineError, Oracle};
use crate::pgn::{GameRecord, PgnError, PgnGames};
use crate::report::{AnalysisResult, GameResult};
use crate::snapshot::TacticSnapshot;

/// Errors that can occur during game analysis.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Error from the analysis engine.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    /// A recorded move could not be replayed.
    #[error("Board error: {0}")]
    Board(#[from] BoardError),
    /// The game record could not be read.
    #[error("PGN error: {0}")]
    Pgn(#[from] PgnError),
}

/// Configuration for game analysis.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Search depth, in plies, for the oracle's best move.
    pub depth: u32,
    /// Games read from the record; later games are never read.
    pub max_games: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            depth: 10,
            max_games: 5,
        }
    }
}

/// Classifies pins and skewers move by move.
///
/// Uses an [`Oracle`] (normally a UCI engine like Stockfish) to decide
/// what the mover should have played.
pub struct TacticAnalyzer<O> {
    oracle: O,
    config: AnalysisConfig,
}

impl TacticAnalyzer<AnalysisEngine> {
    /// Creates an analyzer backed by the UCI engine at `engine_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be started.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use chess_tactics::{AnalysisConfig, TacticAnalyzer};
    ///
    /// let analyzer = TacticAnalyzer::new("stockfish", AnalysisConfig::default())?;
    /// ```
    pub fn new(engine_path: &str, config: AnalysisConfig) -> Result<Self, AnalyzerError> {
        let engine = AnalysisEngine::new(engine_path)?;
        Ok(Self::with_oracle(engine, config))
    }
}

impl<O: Oracle> TacticAnalyzer<O> {
    pub fn with_oracle(oracle: O, config: AnalysisConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Analyzes up to `max_games` games from `games`, numbering them from 1.
    ///
    /// # Errors
    ///
    /// The first unreadable game, unplayable move or oracle failure aborts
    /// the analysis.
    pub fn analyze<I>(&mut self, games: I) -> Result<AnalysisResult, AnalyzerError>
    where
        I: IntoIterator<Item = Result<GameRecord, PgnError>>,
    {
        let mut results = AnalysisResult::new();

        for (index, game) in games.into_iter().take(self.config.max_games).enumerate() {
            let game_id = index + 1;
            let game = game?;
            info!(
                game_id,
                white = game.headers.white.as_deref().unwrap_or("?"),
                black = game.headers.black.as_deref().unwrap_or("?"),
                plies = game.moves.len(),
                "analyzing game"
            );

            let result = self.analyze_game(&game)?;
            info!(
                game_id,
                executed = result.executed.len(),
                missed = result.missed.len(),
                allowed = result.allowed.len(),
                "game analyzed"
            );
            results.insert(game_id, result);
        }

        Ok(results)
    }

    /// Analyzes one game.
    ///
    /// For each move of the main line:
    /// 1. Snapshots both sides' tactics before the move.
    /// 2. Plays the oracle's best move on a copy, when it is legal and differs
    ///    from the recorded one, and reports its new tactics as missed.
    /// 3. Plays the recorded move and reports the mover's new tactics as
    ///    executed and the opponent's new tactics as allowed.
    pub fn analyze_game(&mut self, game: &GameRecord) -> Result<GameResult, AnalyzerError> {
        self.oracle.new_game()?;

        let mut board = Board::from(game.start.clone());
        let mut result = GameResult::default();

        for (index, played) in game.moves.iter().enumerate() {
            let move_number = index as u32 + 1;
            let mover = board.turn();
            let opponent = !mover;

            let before_mover = TacticSnapshot::capture(&board, mover);
            let before_opp = TacticSnapshot::capture(&board, opponent);

            if let Some(best) = self.alternative(&board, played)? {
                let mut trial = board.copy(false);
                trial.push(best)?;
                let oracle_snapshot = TacticSnapshot::capture(&trial, mover);
                GameResult::record(
                    &mut result.missed,
                    move_number,
                    oracle_snapshot.new_kinds(&before_mover),
                );
            }

            board.push(*played)?;

            let after_mover = TacticSnapshot::capture(&board, mover);
            GameResult::record(
                &mut result.executed,
                move_number,
                after_mover.new_kinds(&before_mover),
            );

            let after_opp = TacticSnapshot::capture(&board, opponent);
            GameResult::record(
                &mut result.allowed,
                move_number,
                after_opp.new_kinds(&before_opp),
            );
        }

        Ok(result)
    }

    /// The oracle's move when it is legal here and differs from `played`.
    fn alternative(&mut self, board: &Board, played: &Move) -> Result<Option<Move>, AnalyzerError> {
        let Some(suggestion) = self.oracle.best_move(board, self.config.depth)? else {
            return Ok(None);
        };

        match board.resolve(&suggestion) {
            Some(best) if &best == played => Ok(None),
            Some(best) => {
                debug!(played = %uci_text(played), best = %suggestion, "oracle alternative");
                Ok(Some(best))
            }
            None => {
                debug!(suggestion = %suggestion, fen = %board.fen(), "discarding illegal oracle move");
                Ok(None)
            }
        }
    }
}

/// Analyzes the PGN file at `path` with the engine at `engine_path`.
///
/// The engine is started once before the first game and shut down when this
/// function returns, whether analysis succeeded or not.
///
/// # Errors
///
/// - [`AnalyzerError::Pgn`] if the file cannot be opened or a game is malformed
/// - [`AnalyzerError::Engine`] if the engine cannot be started or fails mid-game
pub fn analyze_pgn<P: AsRef<Path>>(
    path: P,
    engine_path: &str,
    config: AnalysisConfig,
) -> Result<AnalysisResult, AnalyzerError> {
    let file = File::open(path.as_ref()).map_err(PgnError::from)?;
    let mut analyzer = TacticAnalyzer::new(engine_path, config)?;
    info!(engine = analyzer.oracle().name(), "engine started");

    analyzer.analyze(PgnGames::new(BufReader::new(file)))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use shakmaty::uci::UciMove;

    use super::*;
    use crate::report::TacticEvent;
    use crate::snapshot::TacticKind;

    /// Oracle replaying canned answers, one per position asked.
    #[derive(Default)]
    struct ScriptedOracle {
        replies: VecDeque<Option<&'static str>>,
        calls: usize,
        games: usize,
    }

    impl ScriptedOracle {
        fn new(replies: &[Option<&'static str>]) -> Self {
            Self {
                replies: replies.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl Oracle for ScriptedOracle {
        fn best_move(
            &mut self,
            _board: &Board,
            _depth: u32,
        ) -> Result<Option<UciMove>, EngineError> {
            self.calls += 1;
            Ok(self
                .replies
                .pop_front()
                .flatten()
                .map(|text| text.parse().unwrap()))
        }

        fn new_game(&mut self) -> Result<(), EngineError> {
            self.games += 1;
            Ok(())
        }
    }

    struct BrokenOracle;

    impl Oracle for BrokenOracle {
        fn best_move(&mut self, _board: &Board, _depth: u32) -> Result<Option<UciMove>, EngineError> {
            Err(EngineError::InvalidResponse(
                "Engine closed unexpectedly".to_string(),
            ))
        }
    }

    fn game(fen: Option<&str>, uci_moves: &[&str]) -> GameRecord {
        let mut board = match fen {
            Some(fen) => Board::from_fen(fen).unwrap(),
            None => Board::new(),
        };
        let start = board.position().unwrap().clone();
        let mut moves = Vec::new();
        for text in uci_moves {
            let mv = board.resolve(&text.parse().unwrap()).unwrap();
            board.push(mv).unwrap();
            moves.push(mv);
        }
        GameRecord {
            headers: Default::default(),
            start,
            moves,
        }
    }

    fn event(move_number: u32, tactic: TacticKind) -> TacticEvent {
        TacticEvent {
            move_number,
            tactic,
        }
    }

    const SKEWER_SETUP: &str = "r6k/8/8/q7/8/8/8/1R5K w - - 0 1";

    #[test]
    fn test_analysis_config_default() {
        let config = AnalysisConfig::default();
        assert_eq!(config.depth, 10);
        assert_eq!(config.max_games, 5);
    }

    #[test]
    fn test_zero_move_game_is_empty() {
        let mut analyzer =
            TacticAnalyzer::with_oracle(ScriptedOracle::default(), AnalysisConfig::default());
        let result = analyzer.analyze_game(&game(None, &[])).unwrap();
        assert!(result.is_empty());
        assert_eq!(analyzer.oracle().calls, 0);
    }

    #[test]
    fn test_executed_skewer() {
        let mut analyzer =
            TacticAnalyzer::with_oracle(ScriptedOracle::default(), AnalysisConfig::default());
        let result = analyzer
            .analyze_game(&game(Some(SKEWER_SETUP), &["b1a1"]))
            .unwrap();

        assert_eq!(result.executed, vec![event(1, TacticKind::Skewer)]);
        assert!(result.missed.is_empty());
        assert!(result.allowed.is_empty());
    }

    #[test]
    fn test_missed_skewer() {
        let oracle = ScriptedOracle::new(&[Some("b1a1")]);
        let mut analyzer = TacticAnalyzer::with_oracle(oracle, AnalysisConfig::default());
        let result = analyzer
            .analyze_game(&game(Some(SKEWER_SETUP), &["h1g2"]))
            .unwrap();

        assert_eq!(result.missed, vec![event(1, TacticKind::Skewer)]);
        assert!(result.executed.is_empty());
        assert!(result.allowed.is_empty());
    }

    #[test]
    fn test_oracle_agreeing_with_played_move_is_not_missed() {
        let oracle = ScriptedOracle::new(&[Some("b1a1")]);
        let mut analyzer = TacticAnalyzer::with_oracle(oracle, AnalysisConfig::default());
        let result = analyzer
            .analyze_game(&game(Some(SKEWER_SETUP), &["b1a1"]))
            .unwrap();

        assert!(result.missed.is_empty());
        assert_eq!(result.executed, vec![event(1, TacticKind::Skewer)]);
    }

    #[test]
    fn test_illegal_oracle_move_is_discarded() {
        let oracle = ScriptedOracle::new(&[Some("e2e4")]);
        let mut analyzer = TacticAnalyzer::with_oracle(oracle, AnalysisConfig::default());
        let result = analyzer
            .analyze_game(&game(Some(SKEWER_SETUP), &["h1g2"]))
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(analyzer.oracle().calls, 1);
    }

    #[test]
    fn test_pin_against_opponent_is_allowed() {
        // 3. Bb5 pins the c6 knight: it shows up in black's snapshot.
        let mut analyzer =
            TacticAnalyzer::with_oracle(ScriptedOracle::default(), AnalysisConfig::default());
        let result = analyzer
            .analyze_game(&game(None, &["e2e4", "d7d6", "d2d4", "b8c6", "f1b5"]))
            .unwrap();

        assert_eq!(result.allowed, vec![event(5, TacticKind::Pin)]);
        assert!(result.executed.is_empty());
        assert!(result.missed.is_empty());
        assert_eq!(analyzer.oracle().calls, 5);
    }

    #[test]
    fn test_escaping_check_keeps_existing_skewer() {
        // White starts in check with the a-file skewer already on the board.
        let mut analyzer =
            TacticAnalyzer::with_oracle(ScriptedOracle::default(), AnalysisConfig::default());
        let result = analyzer
            .analyze_game(&game(Some("r6k/8/8/q7/1b6/8/8/R3K3 w - - 0 1"), &["e1e2"]))
            .unwrap();

        assert!(result.is_empty());
    }

    #[test]
    fn test_answering_check_keeps_existing_skewer() {
        // Black's a8 rook skewers the a5 queen to the a1 rook throughout;
        // 1. Bb5+ Ke7 must not report it as new for black.
        let mut analyzer =
            TacticAnalyzer::with_oracle(ScriptedOracle::default(), AnalysisConfig::default());
        let result = analyzer
            .analyze_game(&game(Some("r3k3/8/8/Q7/8/8/8/R4BK1 w - - 0 1"), &["f1b5", "e8e7"]))
            .unwrap();

        assert!(result.is_empty());
    }

    #[test]
    fn test_max_games_bounds_reading() {
        let mut pulled = 0;
        let games = (0..5).map(|_| {
            pulled += 1;
            Ok(GameRecord::from_moves(Vec::new()))
        });

        let config = AnalysisConfig {
            max_games: 2,
            ..AnalysisConfig::default()
        };
        let mut analyzer = TacticAnalyzer::with_oracle(ScriptedOracle::default(), config);
        let results = analyzer.analyze(games).unwrap();

        assert_eq!(results.game_ids().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(analyzer.oracle().games, 2);
        assert_eq!(pulled, 2);
    }

    #[test]
    fn test_fewer_games_than_max_is_normal() {
        let games = vec![Ok(game(Some(SKEWER_SETUP), &["b1a1"]))];
        let mut analyzer =
            TacticAnalyzer::with_oracle(ScriptedOracle::default(), AnalysisConfig::default());
        let results = analyzer.analyze(games).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(
            results.get(1).unwrap().executed,
            vec![event(1, TacticKind::Skewer)]
        );
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let record = game(None, &["e2e4", "d7d6", "d2d4", "b8c6", "f1b5"]);
        let replies = [Some("g1f3"), Some("e7e5"), None, Some("g8f6"), Some("f1b5")];

        let mut first = TacticAnalyzer::with_oracle(
            ScriptedOracle::new(&replies),
            AnalysisConfig::default(),
        );
        let mut second = TacticAnalyzer::with_oracle(
            ScriptedOracle::new(&replies),
            AnalysisConfig::default(),
        );

        let a = first.analyze(vec![Ok(record.clone())]).unwrap();
        let b = second.analyze(vec![Ok(record)]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_oracle_failure_aborts() {
        let mut analyzer = TacticAnalyzer::with_oracle(BrokenOracle, AnalysisConfig::default());
        let result = analyzer.analyze(vec![Ok(game(None, &["e2e4"]))]);
        assert!(matches!(result, Err(AnalyzerError::Engine(_))));
    }

    #[test]
    fn test_unreadable_game_aborts() {
        let games = vec![
            Ok(GameRecord::from_moves(Vec::new())),
            Err(PgnError::IllegalMove {
                san: "Ke3".to_string(),
                ply: 3,
            }),
        ];
        let mut analyzer =
            TacticAnalyzer::with_oracle(ScriptedOracle::default(), AnalysisConfig::default());
        let result = analyzer.analyze(games);
        assert!(matches!(
            result,
            Err(AnalyzerError::Pgn(PgnError::IllegalMove { .. }))
        ));
    }

    #[test]
    fn test_analyze_pgn_missing_file() {
        let result = analyze_pgn(
            "/nonexistent/games.pgn",
            "stockfish",
            AnalysisConfig::default(),
        );
        assert!(matches!(result, Err(AnalyzerError::Pgn(PgnError::Io(_)))));
    }

    #[test]
    fn test_analyzer_error_display() {
        let engine_err = AnalyzerError::Engine(EngineError::NotFound("stockfish".to_string()));
        let display = engine_err.to_string();
        assert!(display.contains("Engine error"));
        assert!(display.contains("stockfish"));

        let board_err = AnalyzerError::Board(BoardError::IllegalMove("e2e5".to_string()));
        assert!(board_err.to_string().contains("e2e5"));
    }
}
