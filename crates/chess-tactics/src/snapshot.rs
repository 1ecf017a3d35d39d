//! Tactic snapshots: the pin and skewer signatures present for one side.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use shakmaty::{Color, Square};

use crate::board::BoardQuery;
use crate::pins::pin_signatures;
use crate::skewers::{skewer_signatures, SkewerSignature};

/// Kind of tactic tracked across a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TacticKind {
    Pin,
    Skewer,
}

impl fmt::Display for TacticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TacticKind::Pin => write!(f, "pin"),
            TacticKind::Skewer => write!(f, "skewer"),
        }
    }
}

/// Pins against `side` and skewers by `side` at one instant.
///
/// Built from a single position query and compared only by set difference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TacticSnapshot {
    pins: BTreeSet<Square>,
    skewers: BTreeSet<SkewerSignature>,
}

impl TacticSnapshot {
    /// Takes a snapshot of `side`'s tactics in the current position.
    pub fn capture<B: BoardQuery>(board: &B, side: Color) -> Self {
        Self {
            pins: pin_signatures(board, side),
            skewers: skewer_signatures(board, side),
        }
    }

    pub fn pins(&self) -> &BTreeSet<Square> {
        &self.pins
    }

    pub fn skewers(&self) -> &BTreeSet<SkewerSignature> {
        &self.skewers
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty() && self.skewers.is_empty()
    }

    /// Kinds with at least one signature absent from `before`, pins first.
    pub fn new_kinds(&self, before: &TacticSnapshot) -> Vec<TacticKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.pins.difference(&before.pins).next().is_some() {
            kinds.push(TacticKind::Pin);
        }
        if self.skewers.difference(&before.skewers).next().is_some() {
            kinds.push(TacticKind::Skewer);
        }
        kinds
    }
}
