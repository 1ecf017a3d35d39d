//! Classified tactic events and their JSON shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::snapshot::TacticKind;

/// A tactic observed at one move of a game.
///
/// `move_number` counts plies from 1, so white's first move is 1 and
/// black's reply is 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacticEvent {
    pub move_number: u32,
    pub tactic: TacticKind,
}

/// Events of one game, each list in move order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    /// Tactics the mover created.
    pub executed: Vec<TacticEvent>,
    /// Tactics the engine's best move would have created instead.
    pub missed: Vec<TacticEvent>,
    /// Tactics the move handed to the opponent.
    pub allowed: Vec<TacticEvent>,
}

impl GameResult {
    pub fn is_empty(&self) -> bool {
        self.executed.is_empty() && self.missed.is_empty() && self.allowed.is_empty()
    }

    pub(crate) fn record(bucket: &mut Vec<TacticEvent>, move_number: u32, kinds: Vec<TacticKind>) {
        bucket.extend(
            kinds
                .into_iter()
                .map(|tactic| TacticEvent { move_number, tactic }),
        );
    }
}

/// Results of a multi-game analysis keyed by 1-based game index.
///
/// Serializes as an object keyed `game_1`, `game_2`, and so on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisResult {
    games: BTreeMap<usize, GameResult>,
}

impl AnalysisResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, game_id: usize, result: GameResult) {
        self.games.insert(game_id, result);
    }

    pub fn get(&self, game_id: usize) -> Option<&GameResult> {
        self.games.get(&game_id)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Game ids in ascending order.
    pub fn game_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.games.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &GameResult)> {
        self.games.iter().map(|(id, result)| (*id, result))
    }
}

impl Serialize for AnalysisResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.games
                .iter()
                .map(|(id, result)| (format!("game_{}", id), result)),
        )
    }
}
