//! Per-request training context: trainee state the calculator holds fixed
//! across every simulated turn.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::card::CardId;
use crate::constants::{DEFAULT_BOND_GAUGE, MAX_BOND_GAUGE, MAX_FACILITY_LEVEL, MIN_FACILITY_LEVEL};
use crate::error::ContextError;
use crate::scenario::{FacilityType, StatKind};

/// Trainee mood tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Awful,
    Bad,
    Normal,
    #[default]
    Good,
    Great,
}

impl Mood {
    pub const ALL: [Self; 5] = [Self::Awful, Self::Bad, Self::Normal, Self::Good, Self::Great];

    /// Signed delta from the 100 % baseline.
    #[must_use]
    pub const fn tier(self) -> f64 {
        match self {
            Self::Awful => -0.2,
            Self::Bad => -0.1,
            Self::Normal => 0.0,
            Self::Good => 0.1,
            Self::Great => 0.2,
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Awful => "Awful",
            Self::Bad => "Bad",
            Self::Normal => "Normal",
            Self::Good => "Good",
            Self::Great => "Great",
        };
        f.write_str(label)
    }
}

/// Character growth bonus, percent per stat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Growth {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub stamina: f64,
    #[serde(default)]
    pub power: f64,
    #[serde(default)]
    pub guts: f64,
    #[serde(default)]
    pub wit: f64,
}

impl Growth {
    /// Growth percent for `stat`; skill points have none.
    #[must_use]
    pub const fn get(&self, stat: StatKind) -> f64 {
        match stat {
            StatKind::Speed => self.speed,
            StatKind::Stamina => self.stamina,
            StatKind::Power => self.power,
            StatKind::Guts => self.guts,
            StatKind::Wit => self.wit,
            StatKind::SkillPoints => 0.0,
        }
    }

    fn entries(&self) -> [(StatKind, f64); 5] {
        [
            (StatKind::Speed, self.speed),
            (StatKind::Stamina, self.stamina),
            (StatKind::Power, self.power),
            (StatKind::Guts, self.guts),
            (StatKind::Wit, self.wit),
        ]
    }
}

/// Fixed trainee state for one calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingContext {
    #[serde(default)]
    pub growth: Growth,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default = "TrainingContext::default_fan_count")]
    pub fan_count: u32,
    /// Indexed by `FacilityType::index()`.
    #[serde(default = "TrainingContext::default_facility_levels")]
    pub facility_levels: [u8; FacilityType::COUNT],
    #[serde(default = "TrainingContext::default_energy")]
    pub energy: u32,
    #[serde(default = "TrainingContext::default_max_energy")]
    pub max_energy: u32,
    /// Bond gauge overrides; cards not listed sit at the default gauge.
    #[serde(default)]
    pub bonds: BTreeMap<CardId, u8>,
    /// Acquired skill counts keyed by skill type id.
    #[serde(default)]
    pub skill_types: BTreeMap<u32, u32>,
}

impl Default for TrainingContext {
    fn default() -> Self {
        Self {
            growth: Growth::default(),
            mood: Mood::default(),
            fan_count: Self::default_fan_count(),
            facility_levels: Self::default_facility_levels(),
            energy: Self::default_energy(),
            max_energy: Self::default_max_energy(),
            bonds: BTreeMap::new(),
            skill_types: BTreeMap::new(),
        }
    }
}

impl TrainingContext {
    const fn default_fan_count() -> u32 {
        100_000
    }

    const fn default_facility_levels() -> [u8; FacilityType::COUNT] {
        [3; FacilityType::COUNT]
    }

    const fn default_energy() -> u32 {
        70
    }

    const fn default_max_energy() -> u32 {
        104
    }

    #[must_use]
    pub const fn facility_level(&self, facility: FacilityType) -> u8 {
        self.facility_levels[facility.index()]
    }

    pub fn set_facility_level(&mut self, facility: FacilityType, level: u8) {
        self.facility_levels[facility.index()] = level;
    }

    /// Sum of all five facility levels.
    #[must_use]
    pub fn combined_facility_levels(&self) -> u32 {
        self.facility_levels.iter().map(|level| u32::from(*level)).sum()
    }

    /// Bond gauge for `card_id`, falling back to the default gauge.
    #[must_use]
    pub fn bond(&self, card_id: CardId) -> u8 {
        self.bonds.get(&card_id).copied().unwrap_or(DEFAULT_BOND_GAUGE)
    }

    #[must_use]
    pub fn skill_count(&self, skill_type: u32) -> u32 {
        self.skill_types.get(&skill_type).copied().unwrap_or(0)
    }

    /// Reject states the gain formula is not defined for.
    ///
    /// # Errors
    ///
    /// Returns the first [`ContextError`] found.
    pub fn validate(&self) -> Result<(), ContextError> {
        for facility in FacilityType::ALL {
            let level = self.facility_level(facility);
            if !(MIN_FACILITY_LEVEL..=MAX_FACILITY_LEVEL).contains(&level) {
                return Err(ContextError::FacilityLevel {
                    facility: facility.to_string(),
                    level,
                });
            }
        }
        for (stat, value) in self.growth.entries() {
            if !(0.0..=100.0).contains(&value) {
                return Err(ContextError::Growth {
                    stat: stat.to_string(),
                    value,
                });
            }
        }
        if self.energy > self.max_energy {
            return Err(ContextError::Energy {
                energy: self.energy,
                max_energy: self.max_energy,
            });
        }
        if let Some((card_id, value)) = self.bonds.iter().find(|(_, value)| **value > MAX_BOND_GAUGE) {
            return Err(ContextError::Bond {
                card_id: *card_id,
                value: *value,
            });
        }
        Ok(())
    }
}
