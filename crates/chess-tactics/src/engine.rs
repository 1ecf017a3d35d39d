//! UCI engine wrapper used as the best-move oracle.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use shakmaty::uci::UciMove;
use thiserror::Error;
use tracing::debug;

use crate::board::Board;

/// Maximum number of lines to read before giving up on a UCI response.
pub const MAX_UCI_LINES: usize = 1000;

/// Errors that can occur when working with chess engines.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to spawn the engine process.
    #[error("Failed to spawn engine: {0}")]
    SpawnError(#[from] std::io::Error),
    /// Engine executable was not found at the specified path.
    #[error("Engine not found at path: {0}")]
    NotFound(String),
    /// Engine failed to initialize properly (UCI handshake failed).
    #[error("Engine initialization failed")]
    InitFailed,
    /// Engine returned an invalid or unexpected response.
    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
}

/// Source of best-move suggestions for a position.
pub trait Oracle {
    /// Best move for the side to move on `board`, searched to `depth` plies.
    ///
    /// `Ok(None)` means the oracle has no suggestion (checkmate, stalemate).
    fn best_move(&mut self, board: &Board, depth: u32) -> Result<Option<UciMove>, EngineError>;

    /// Called before the first position of every game.
    fn new_game(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Result of a depth-limited search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// The engine's move, or `None` for `bestmove (none)`.
    pub best_move: Option<UciMove>,
    /// The deepest completed iteration reported.
    pub depth: u32,
    /// Principal variation of the deepest iteration.
    pub pv: Vec<UciMove>,
}

impl SearchResult {
    /// First move of the principal variation, the engine's suggestion.
    pub fn suggestion(&self) -> Option<UciMove> {
        self.pv.first().cloned()
    }
}

/// Wrapper for UCI-compatible analysis engines like Stockfish.
///
/// The process lives exactly as long as this value: dropping it sends
/// `quit` and reaps the child.
pub struct AnalysisEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// The engine's name (reported via UCI id).
    name: String,
}

impl AnalysisEngine {
    /// Spawns the engine and performs the UCI handshake.
    ///
    /// A bare command name such as `stockfish` is resolved through `PATH`.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if `engine_path` names a file that doesn't exist
    /// - `EngineError::SpawnError` if the engine process fails to start
    /// - `EngineError::InitFailed` if UCI initialization fails
    pub fn new(engine_path: &str) -> Result<Self, EngineError> {
        let path = Path::new(engine_path);
        if path.components().count() > 1 && !path.exists() {
            return Err(EngineError::NotFound(engine_path.to_string()));
        }

        let mut process = Command::new(engine_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EngineError::NotFound(engine_path.to_string()),
                _ => EngineError::SpawnError(e),
            })?;

        let stdin = process.stdin.take().ok_or(EngineError::InitFailed)?;
        let stdout = process.stdout.take().ok_or(EngineError::InitFailed)?;
        let stdout = BufReader::new(stdout);

        let mut engine = Self {
            process,
            stdin,
            stdout,
            name: String::new(),
        };

        engine.init_uci()?;
        debug!(engine = %engine.name, "engine ready");

        Ok(engine)
    }

    fn init_uci(&mut self) -> Result<(), EngineError> {
        self.send_command("uci")?;

        let mut name = String::new();
        let mut lines_read = 0;
        loop {
            if lines_read > MAX_UCI_LINES {
                return Err(EngineError::InitFailed);
            }
            lines_read += 1;
            let line = self.read_line()?;
            if let Some(id) = line.strip_prefix("id name ") {
                name = id.to_string();
            } else if line == "uciok" {
                break;
            }
        }

        self.name = if name.is_empty() {
            "Unknown Engine".to_string()
        } else {
            name
        };

        self.wait_ready()
    }

    /// Returns the engine's name as reported via UCI protocol.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Searches the position given in FEN to a fixed depth.
    pub fn search_fen(&mut self, fen: &str, depth: u32) -> Result<SearchResult, EngineError> {
        self.send_command(&format!("position fen {}", fen))?;
        self.send_command(&format!("go depth {}", depth))?;

        let mut best_depth: u32 = 0;
        let mut pv: Vec<UciMove> = Vec::new();

        let mut lines_read = 0;
        loop {
            if lines_read > MAX_UCI_LINES {
                return Err(EngineError::InvalidResponse(
                    "Too many lines without bestmove".to_string(),
                ));
            }
            lines_read += 1;
            let line = self.read_line()?;

            if line.starts_with("info ") {
                if let Some((d, line_pv)) = Self::parse_info_line(&line) {
                    best_depth = d;
                    pv = line_pv;
                }
            } else if let Some(rest) = line.strip_prefix("bestmove") {
                // "bestmove e2e4 ponder e7e5" or "bestmove (none)"
                let best_move = match rest.split_whitespace().next() {
                    None | Some("(none)") | Some("0000") => None,
                    Some(text) => Some(text.parse::<UciMove>().map_err(|_| {
                        EngineError::InvalidResponse(format!("Unparsable bestmove: {}", text))
                    })?),
                };
                return Ok(SearchResult {
                    best_move,
                    depth: best_depth,
                    pv,
                });
            }
        }
    }

    /// Parse depth and PV from a UCI info line.
    ///
    /// Lines without both a depth and a PV (currmove updates, strings), or
    /// with an unparsable PV move, yield `None`.
    fn parse_info_line(line: &str) -> Option<(u32, Vec<UciMove>)> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        let mut depth: Option<u32> = None;
        let mut pv: Vec<UciMove> = Vec::new();
        let mut in_pv = false;

        let mut i = 0;
        while i < parts.len() {
            match parts[i] {
                "depth" if !in_pv => {
                    if i + 1 < parts.len() {
                        depth = parts[i + 1].parse().ok();
                        i += 1;
                    }
                }
                "pv" => {
                    in_pv = true;
                }
                "string" => break,
                token => {
                    if in_pv {
                        pv.push(token.parse().ok()?);
                    }
                }
            }
            i += 1;
        }

        if pv.is_empty() {
            return None;
        }
        Some((depth?, pv))
    }

    /// Clear the engine's hash tables and prepare for a new game.
    pub fn clear_hash(&mut self) -> Result<(), EngineError> {
        self.send_command("ucinewgame")?;
        self.wait_ready()
    }

    fn wait_ready(&mut self) -> Result<(), EngineError> {
        self.send_command("isready")?;
        let mut lines_read = 0;
        loop {
            if lines_read > MAX_UCI_LINES {
                return Err(EngineError::InitFailed);
            }
            lines_read += 1;
            if self.read_line()? == "readyok" {
                return Ok(());
            }
        }
    }

    fn send_command(&mut self, command: &str) -> Result<(), EngineError> {
        debug!(command, "uci <");
        writeln!(self.stdin, "{}", command)?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        let bytes = self.stdout.read_line(&mut line)?;
        if bytes == 0 {
            return Err(EngineError::InvalidResponse(
                "Engine closed unexpectedly".to_string(),
            ));
        }
        let line = line.trim().to_string();
        debug!(line = %line, "uci >");
        Ok(line)
    }
}

impl Oracle for AnalysisEngine {
    fn best_move(&mut self, board: &Board, depth: u32) -> Result<Option<UciMove>, EngineError> {
        Ok(self.search_fen(&board.fen(), depth)?.suggestion())
    }

    fn new_game(&mut self) -> Result<(), EngineError> {
        self.clear_hash()
    }
}

impl Drop for AnalysisEngine {
    fn drop(&mut self) {
        let _ = self.send_command("quit");
        let _ = self.process.wait();
    }
}
