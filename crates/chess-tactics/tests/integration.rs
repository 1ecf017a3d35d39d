//! Integration tests for chess-tactics crate.
//!
//! Tests marked `#[ignore]` require Stockfish to be installed and available
//! in PATH. Run with: `cargo test -p chess-tactics --test integration -- --ignored`

use std::io::Write;

use chess_tactics::{
    analyze_pgn, AnalysisConfig, AnalysisEngine, AnalyzerError, Board, EngineError, Oracle,
    PgnGames, TacticAnalyzer, TacticEvent, TacticKind,
};
use shakmaty::uci::UciMove;
use tempfile::NamedTempFile;

/// Check if Stockfish is available in PATH.
fn stockfish_available() -> bool {
    std::process::Command::new("stockfish")
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

/// Oracle that never has a suggestion.
struct SilentOracle;

impl Oracle for SilentOracle {
    fn best_move(&mut self, _board: &Board, _depth: u32) -> Result<Option<UciMove>, EngineError> {
        Ok(None)
    }
}

const PIN_AND_SKEWER_GAMES: &str = r#"[Event "Pin"]
[White "Alice"]
[Black "Bob"]
[Result "*"]

1. e4 d6 2. d4 Nc6 3. Bb5 *

[Event "Skewer"]
[White "Carol"]
[Black "Dave"]
[FEN "r6k/8/8/q7/8/8/8/1R5K w - - 0 1"]
[SetUp "1"]
[Result "*"]

1. Ra1 *

[Event "Empty"]
[Result "*"]

*
"#;

fn pgn_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write PGN");
    file
}

#[test]
fn test_pgn_games_through_analyzer() {
    let mut analyzer = TacticAnalyzer::with_oracle(SilentOracle, AnalysisConfig::default());
    let results = analyzer
        .analyze(PgnGames::new(PIN_AND_SKEWER_GAMES.as_bytes()))
        .expect("Analysis failed");

    assert_eq!(results.game_ids().collect::<Vec<_>>(), vec![1, 2, 3]);

    let pin_game = results.get(1).unwrap();
    assert_eq!(
        pin_game.allowed,
        vec![TacticEvent {
            move_number: 5,
            tactic: TacticKind::Pin
        }]
    );

    let skewer_game = results.get(2).unwrap();
    assert_eq!(
        skewer_game.executed,
        vec![TacticEvent {
            move_number: 1,
            tactic: TacticKind::Skewer
        }]
    );

    assert!(results.get(3).unwrap().is_empty());
}

#[test]
fn test_json_output_shape() {
    let config = AnalysisConfig {
        max_games: 2,
        ..AnalysisConfig::default()
    };
    let mut analyzer = TacticAnalyzer::with_oracle(SilentOracle, config);
    let results = analyzer
        .analyze(PgnGames::new(PIN_AND_SKEWER_GAMES.as_bytes()))
        .expect("Analysis failed");

    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "game_1": {
                "executed": [],
                "missed": [],
                "allowed": [{"move_number": 5, "tactic": "pin"}]
            },
            "game_2": {
                "executed": [{"move_number": 1, "tactic": "skewer"}],
                "missed": [],
                "allowed": []
            }
        })
    );
}

#[test]
fn test_illegal_move_in_file_aborts() {
    let pgn = "1. e4 e5 *\n\n1. e4 e5 2. Ke3 *\n";
    let mut analyzer = TacticAnalyzer::with_oracle(SilentOracle, AnalysisConfig::default());
    let result = analyzer.analyze(PgnGames::new(pgn.as_bytes()));
    assert!(matches!(result, Err(AnalyzerError::Pgn(_))));
}

#[test]
fn test_analyze_pgn_without_engine() {
    let file = pgn_file(PIN_AND_SKEWER_GAMES);
    let result = analyze_pgn(
        file.path(),
        "/nonexistent/path/to/stockfish",
        AnalysisConfig::default(),
    );
    assert!(matches!(
        result,
        Err(AnalyzerError::Engine(EngineError::NotFound(_)))
    ));
}

#[test]
#[ignore = "requires Stockfish"]
fn test_engine_best_move() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let mut engine = AnalysisEngine::new("stockfish").expect("Failed to create AnalysisEngine");

    let name = engine.name();
    assert!(
        name.to_lowercase().contains("stockfish"),
        "Engine name should contain 'Stockfish', got: {}",
        name
    );

    let board = Board::new();
    let best = engine
        .best_move(&board, 8)
        .expect("Search failed")
        .expect("Starting position has a best move");
    assert!(board.resolve(&best).is_some(), "Engine move must be legal");
}

#[test]
#[ignore = "requires Stockfish"]
fn test_engine_has_no_move_when_mated() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let mut engine = AnalysisEngine::new("stockfish").expect("Failed to create AnalysisEngine");
    // Fool's mate, white to move and checkmated.
    let board =
        Board::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
    let search = engine.search_fen(&board.fen(), 5).expect("Search failed");
    assert!(search.best_move.is_none());
}

#[test]
#[ignore = "requires Stockfish"]
fn test_analyze_pgn_with_stockfish() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let file = pgn_file(PIN_AND_SKEWER_GAMES);
    let config = AnalysisConfig {
        depth: 8,
        max_games: 5,
    };
    let results = analyze_pgn(file.path(), "stockfish", config).expect("Analysis failed");

    assert_eq!(results.len(), 3);

    // Executed and allowed events do not depend on the engine.
    assert!(results
        .get(1)
        .unwrap()
        .allowed
        .iter()
        .any(|e| e.move_number == 5 && e.tactic == TacticKind::Pin));
    assert!(results
        .get(2)
        .unwrap()
        .executed
        .iter()
        .any(|e| e.move_number == 1 && e.tactic == TacticKind::Skewer));
    assert!(results.get(3).unwrap().is_empty());

    for (_, game) in results.iter() {
        for event in game.executed.iter().chain(&game.missed).chain(&game.allowed) {
            assert!(event.move_number >= 1);
        }
    }
}
