//! Error and warning taxonomy for the calculator.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::CardId;

/// Fatal problems with card or scenario data. Aborts a calculation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("card {card_id} effect {effect_id}: milestone array has {len} entries, expected {expected}")]
    MilestoneLength {
        card_id: CardId,
        effect_id: u16,
        len: usize,
        expected: usize,
    },
    #[error("card {card_id} effect {effect_id}: no milestone defined at mandatory level {level}")]
    MissingMilestone {
        card_id: CardId,
        effect_id: u16,
        level: u8,
    },
    #[error("card {card_id} effect {effect_id}: invalid milestone value {value} at level {level}")]
    InvalidMilestone {
        card_id: CardId,
        effect_id: u16,
        level: u8,
        value: i32,
    },
    #[error("card {card_id}: level {level} is outside 1..={max_level}")]
    LevelOutOfRange {
        card_id: CardId,
        level: u8,
        max_level: u8,
    },
    #[error("card {card_id}: limit break {limit_break} exceeds {max}")]
    InvalidLimitBreak {
        card_id: CardId,
        limit_break: u8,
        max: u8,
    },
    #[error("card {card_id}: only SSR cards may carry unique effects")]
    UniqueOnNonSsr { card_id: CardId },
    #[error("card {card_id} appears more than once in the catalog")]
    DuplicateCard { card_id: CardId },
    #[error("card {card_id} is not in the catalog")]
    UnknownCard { card_id: CardId },
    #[error("scenario {name}: facility {facility} defines {len} levels, expected 5")]
    ScenarioLevels {
        name: String,
        facility: String,
        len: usize,
    },
    #[error("scenario {name}: uses per level must be positive")]
    ScenarioUsesPerLevel { name: String },
}

/// Rejected deck edits.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("slot {index} does not exist, decks have {size} slots")]
    SlotOutOfRange { index: usize, size: usize },
    #[error("slot {index} is already occupied")]
    SlotOccupied { index: usize },
    #[error("slot {index} is empty")]
    SlotEmpty { index: usize },
    #[error("card {card_id} is already in the deck")]
    AlreadyInDeck { card_id: CardId },
    #[error("deck has no free slot")]
    Full,
    #[error("limit break {limit_break} exceeds {max}")]
    LimitBreak { limit_break: u8, max: u8 },
}

/// Invalid training context supplied by the caller.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContextError {
    #[error("{facility} facility level {level} is outside 1..=5")]
    FacilityLevel { facility: String, level: u8 },
    #[error("{stat} growth {value}% is outside 0..=100")]
    Growth { stat: String, value: f64 },
    #[error("energy {energy} exceeds max energy {max_energy}")]
    Energy { energy: u32, max_energy: u32 },
    #[error("bond gauge {value} for card {card_id} exceeds 100")]
    Bond { card_id: CardId, value: u8 },
}

/// Errors raised when simulation configuration invariants are violated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("turn count must be at least 1")]
    ZeroTurns,
    #[error("progress step {value:.2}% must be within (0, 100]")]
    ProgressStep { value: f32 },
}

/// Top-level calculator error.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CalcError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Recoverable data problems. The offending effect contributes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalcWarning {
    UnknownEffect { card_id: CardId, effect_id: u16 },
    UnknownDynamicEffect { card_id: CardId, effect_id: u16 },
    InvalidDynamicParams { card_id: CardId, effect_id: u16 },
    UnverifiedDynamicEffect { card_id: CardId, effect_id: u16 },
    UnsupportedDynamicEffect { card_id: CardId, effect_id: u16 },
}

impl CalcWarning {
    /// Emit the warning through the `log` facade.
    pub fn log(&self) {
        log::warn!("{self}");
    }

    /// Append to `sink` unless an equal warning is already there; new
    /// warnings are logged once.
    pub fn record_into(self, sink: &mut Vec<Self>) {
        if !sink.contains(&self) {
            self.log();
            sink.push(self);
        }
    }
}

impl std::fmt::Display for CalcWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownEffect { card_id, effect_id } => {
                write!(f, "card {card_id}: unknown effect {effect_id} ignored")
            }
            Self::UnknownDynamicEffect { card_id, effect_id } => {
                write!(f, "card {card_id}: unknown dynamic effect {effect_id} ignored")
            }
            Self::InvalidDynamicParams { card_id, effect_id } => {
                write!(f, "card {card_id}: dynamic effect {effect_id} has invalid parameters")
            }
            Self::UnverifiedDynamicEffect { card_id, effect_id } => write!(
                f,
                "card {card_id}: dynamic effect {effect_id} uses an unverified formula"
            ),
            Self::UnsupportedDynamicEffect { card_id, effect_id } => write!(
                f,
                "card {card_id}: dynamic effect {effect_id} needs turn history and is skipped"
            ),
        }
    }
}
