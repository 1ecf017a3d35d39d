//! Pin and skewer detection across chess game timelines.
//!
//! This crate replays games move by move and classifies the tactics that
//! appear by comparing the played move against a UCI engine's best move.
//!
//! # Overview
//!
//! - [`BoardQuery`] - Position queries the detectors need, implemented by [`Board`]
//! - [`detect_pins`] / [`detect_skewers`] - Single-position tactic detection
//! - [`TacticSnapshot`] - Pin and skewer signatures for one side at one instant
//! - [`AnalysisEngine`] - Wrapper for UCI analysis engines like Stockfish
//! - [`TacticAnalyzer`] - Sorts tactics into executed, missed and allowed events
//!
//! # Example
//!
//! ```ignore
//! use chess_tactics::{analyze_pgn, AnalysisConfig};
//!
//! let results = analyze_pgn("games.pgn", "stockfish", AnalysisConfig::default())?;
//! println!("{}", serde_json::to_string_pretty(&results)?);
//! ```

pub mod analyzer;
pub mod board;
pub mod engine;
pub mod pgn;
pub mod pins;
pub mod report;
pub mod skewers;
pub mod snapshot;

pub use analyzer::{analyze_pgn, AnalysisConfig, AnalyzerError, TacticAnalyzer};
pub use board::{Board, BoardError, BoardQuery};
pub use engine::{AnalysisEngine, EngineError, Oracle, SearchResult};
pub use pgn::{GameHeaders, GameRecord, PgnError, PgnGames};
pub use pins::{detect_pins, PinRecord};
pub use report::{AnalysisResult, GameResult, TacticEvent};
pub use skewers::{detect_skewers, SkewerRecord, SkewerSignature};
pub use snapshot::{TacticKind, TacticSnapshot};
