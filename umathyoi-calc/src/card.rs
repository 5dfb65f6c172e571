//! Support card records as handed over by the data layer.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::constants::{
    DYNAMIC_EFFECT_ID_THRESHOLD, LEVELS_PER_LIMIT_BREAK, MAX_LIMIT_BREAK, R_MAX_LEVEL,
    SR_MAX_LEVEL, SSR_MAX_LEVEL,
};
use crate::effects::table::Milestones;
use crate::error::DataError;
use crate::scenario::FacilityType;

/// Stable card identity used as cache key and in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rarity {
    R,
    SR,
    SSR,
}

impl Rarity {
    /// Highest level reachable at full limit break.
    #[must_use]
    pub const fn max_level(self) -> u8 {
        match self {
            Self::R => R_MAX_LEVEL,
            Self::SR => SR_MAX_LEVEL,
            Self::SSR => SSR_MAX_LEVEL,
        }
    }

    /// Level cap for a limit break tier, or `None` when the tier is invalid.
    #[must_use]
    pub const fn max_level_at(self, limit_break: u8) -> Option<u8> {
        if limit_break > MAX_LIMIT_BREAK {
            return None;
        }
        Some(self.max_level() - LEVELS_PER_LIMIT_BREAK * (MAX_LIMIT_BREAK - limit_break))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Speed,
    Stamina,
    Power,
    Guts,
    Wit,
    Pal,
    Group,
}

impl CardType {
    pub const ALL: [Self; 7] = [
        Self::Speed,
        Self::Stamina,
        Self::Power,
        Self::Guts,
        Self::Wit,
        Self::Pal,
        Self::Group,
    ];

    /// Facility this card favours during placement; Pal and Group favour none.
    #[must_use]
    pub const fn preferred_facility(self) -> Option<FacilityType> {
        match self {
            Self::Speed => Some(FacilityType::Speed),
            Self::Stamina => Some(FacilityType::Stamina),
            Self::Power => Some(FacilityType::Power),
            Self::Guts => Some(FacilityType::Guts),
            Self::Wit => Some(FacilityType::Wit),
            Self::Pal | Self::Group => None,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Speed => "Speed",
            Self::Stamina => "Stamina",
            Self::Power => "Power",
            Self::Guts => "Guts",
            Self::Wit => "Wit",
            Self::Pal => "Pal",
            Self::Group => "Group",
        };
        f.write_str(label)
    }
}

/// A normal effect: effect id followed by its milestone array.
///
/// Serialized as a flat integer array `[id, v1, v5, ..., v50]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "Vec<i32>")]
pub struct EffectEntry {
    pub id: u16,
    pub milestones: Milestones,
}

impl TryFrom<Vec<i32>> for EffectEntry {
    type Error = String;

    fn try_from(raw: Vec<i32>) -> Result<Self, Self::Error> {
        let (head, rest) = raw
            .split_first()
            .ok_or_else(|| "effect entry is empty".to_string())?;
        let id = u16::try_from(*head).map_err(|_| format!("effect id {head} is out of range"))?;
        Ok(Self {
            id,
            milestones: Milestones::new(rest.to_vec()),
        })
    }
}

impl From<EffectEntry> for Vec<i32> {
    fn from(entry: EffectEntry) -> Self {
        let mut raw = Vec::with_capacity(entry.milestones.values().len() + 1);
        raw.push(i32::from(entry.id));
        raw.extend_from_slice(entry.milestones.values());
        raw
    }
}

/// Parameter payload of a unique effect; most kinds use at most five values.
pub type UniqueParams = SmallVec<[i32; 5]>;

/// A unique effect descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueEffect {
    #[serde(rename = "type")]
    pub id: u16,
    #[serde(default)]
    pub values: UniqueParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestones: Option<Milestones>,
}

impl UniqueEffect {
    /// Whether the effect depends on live training state.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        self.id >= DYNAMIC_EFFECT_ID_THRESHOLD
    }

    /// Parameter at `index`, if present.
    #[must_use]
    pub fn param(&self, index: usize) -> Option<i64> {
        self.values.get(index).map(|value| i64::from(*value))
    }
}

/// Unique effects and the card level that unlocks them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueBlock {
    pub level: u8,
    #[serde(default)]
    pub effects: Vec<UniqueEffect>,
}

/// Immutable support card record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub rarity: Rarity,
    #[serde(rename = "type")]
    pub kind: CardType,
    #[serde(default)]
    pub effects: Vec<EffectEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<UniqueBlock>,
}

impl Card {
    #[must_use]
    pub const fn max_level(&self) -> u8 {
        self.rarity.max_level()
    }

    /// Level cap for a limit break tier.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidLimitBreak`] when the tier exceeds 4.
    pub fn max_level_at(&self, limit_break: u8) -> Result<u8, DataError> {
        self.rarity
            .max_level_at(limit_break)
            .ok_or(DataError::InvalidLimitBreak {
                card_id: self.id,
                limit_break,
                max: MAX_LIMIT_BREAK,
            })
    }

    /// Level at which unique effects switch on; `None` when the card has none.
    #[must_use]
    pub fn unique_unlock_level(&self) -> Option<u8> {
        self.unique.as_ref().map(|block| block.level)
    }

    /// Check every milestone array and the rarity rules.
    ///
    /// # Errors
    ///
    /// Returns the first [`DataError`] found.
    pub fn validate(&self) -> Result<(), DataError> {
        let max_level = self.max_level();
        for entry in &self.effects {
            entry.milestones.validate(self.id, entry.id, max_level)?;
        }
        if let Some(block) = &self.unique {
            if self.rarity != Rarity::SSR && !block.effects.is_empty() {
                return Err(DataError::UniqueOnNonSsr { card_id: self.id });
            }
            for effect in &block.effects {
                if let Some(milestones) = &effect.milestones {
                    milestones.validate(self.id, effect.id, max_level)?;
                }
            }
        }
        Ok(())
    }
}
