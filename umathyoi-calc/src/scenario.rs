//! Training facilities, stats, and scenario base-gain tables.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{
    MAX_FACILITY_LEVEL, MIN_FACILITY_LEVEL, URA_FINALS_NAME, URA_USES_PER_LEVEL,
};
use crate::error::DataError;

/// The five training facilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityType {
    Speed,
    Stamina,
    Power,
    Guts,
    Wit,
}

impl FacilityType {
    pub const ALL: [Self; 5] = [
        Self::Speed,
        Self::Stamina,
        Self::Power,
        Self::Guts,
        Self::Wit,
    ];
    pub const COUNT: usize = 5;

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FacilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Speed => "Speed",
            Self::Stamina => "Stamina",
            Self::Power => "Power",
            Self::Guts => "Guts",
            Self::Wit => "Wit",
        };
        f.write_str(label)
    }
}

/// Gains produced by a training: five stats plus skill points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Speed,
    Stamina,
    Power,
    Guts,
    Wit,
    SkillPoints,
}

impl StatKind {
    pub const ALL: [Self; 6] = [
        Self::Speed,
        Self::Stamina,
        Self::Power,
        Self::Guts,
        Self::Wit,
        Self::SkillPoints,
    ];
    pub const COUNT: usize = 6;

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn is_skill_points(self) -> bool {
        matches!(self, Self::SkillPoints)
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Speed => "Speed",
            Self::Stamina => "Stamina",
            Self::Power => "Power",
            Self::Guts => "Guts",
            Self::Wit => "Wit",
            Self::SkillPoints => "Skill Pts",
        };
        f.write_str(label)
    }
}

/// One gain value per [`StatKind`], in `StatKind::ALL` order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatLine(pub [u32; StatKind::COUNT]);

impl StatLine {
    #[must_use]
    pub const fn get(&self, stat: StatKind) -> u32 {
        self.0[stat.index()]
    }

    pub fn set(&mut self, stat: StatKind, value: u32) {
        self.0[stat.index()] = value;
    }

    /// Stats this line grants (non-zero entries).
    pub fn granted(&self) -> impl Iterator<Item = StatKind> + '_ {
        StatKind::ALL
            .into_iter()
            .filter(|stat| self.get(*stat) > 0)
    }
}

type LevelTable = [StatLine; MAX_FACILITY_LEVEL as usize];

/// Base gains per facility and level for one ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScenarioRecord", into = "ScenarioRecord")]
pub struct Scenario {
    name: String,
    uses_per_level: u8,
    table: [LevelTable; FacilityType::COUNT],
}

/// Serialized shape: `facilities.<type>` holds five rows of
/// `[speed, stamina, power, guts, wit, skill_points]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScenarioRecord {
    name: String,
    #[serde(default = "ScenarioRecord::default_uses_per_level")]
    uses_per_level: u8,
    facilities: BTreeMap<FacilityType, Vec<StatLine>>,
}

impl ScenarioRecord {
    const fn default_uses_per_level() -> u8 {
        URA_USES_PER_LEVEL
    }
}

impl TryFrom<ScenarioRecord> for Scenario {
    type Error = DataError;

    fn try_from(record: ScenarioRecord) -> Result<Self, Self::Error> {
        if record.uses_per_level == 0 {
            return Err(DataError::ScenarioUsesPerLevel { name: record.name });
        }
        let mut table = [[StatLine::default(); MAX_FACILITY_LEVEL as usize]; FacilityType::COUNT];
        for facility in FacilityType::ALL {
            let rows = record
                .facilities
                .get(&facility)
                .map_or(&[][..], Vec::as_slice);
            if rows.len() != usize::from(MAX_FACILITY_LEVEL) {
                return Err(DataError::ScenarioLevels {
                    name: record.name,
                    facility: facility.to_string(),
                    len: rows.len(),
                });
            }
            table[facility.index()].copy_from_slice(rows);
        }
        Ok(Self {
            name: record.name,
            uses_per_level: record.uses_per_level,
            table,
        })
    }
}

impl From<Scenario> for ScenarioRecord {
    fn from(scenario: Scenario) -> Self {
        let facilities = FacilityType::ALL
            .into_iter()
            .map(|facility| (facility, scenario.table[facility.index()].to_vec()))
            .collect();
        Self {
            name: scenario.name,
            uses_per_level: scenario.uses_per_level,
            facilities,
        }
    }
}

const fn line(speed: u32, stamina: u32, power: u32, guts: u32, wit: u32, sp: u32) -> StatLine {
    StatLine([speed, stamina, power, guts, wit, sp])
}

impl Scenario {
    /// The URA Finals ruleset.
    #[must_use]
    pub fn ura_finals() -> Self {
        Self {
            name: URA_FINALS_NAME.to_string(),
            uses_per_level: URA_USES_PER_LEVEL,
            table: [
                [
                    line(10, 0, 5, 0, 0, 2),
                    line(11, 0, 5, 0, 0, 2),
                    line(12, 0, 5, 0, 0, 2),
                    line(13, 0, 6, 0, 0, 2),
                    line(14, 0, 7, 0, 0, 2),
                ],
                [
                    line(0, 9, 0, 5, 0, 2),
                    line(0, 10, 0, 5, 0, 2),
                    line(0, 11, 0, 5, 0, 2),
                    line(0, 12, 0, 6, 0, 2),
                    line(0, 13, 0, 7, 0, 2),
                ],
                [
                    line(0, 5, 8, 0, 0, 2),
                    line(0, 5, 9, 0, 0, 2),
                    line(0, 5, 10, 0, 0, 2),
                    line(0, 6, 11, 0, 0, 2),
                    line(0, 7, 12, 0, 0, 2),
                ],
                [
                    line(4, 0, 4, 8, 0, 2),
                    line(4, 0, 4, 9, 0, 2),
                    line(4, 0, 4, 10, 0, 2),
                    line(5, 0, 4, 11, 0, 2),
                    line(6, 0, 5, 12, 0, 2),
                ],
                [
                    line(2, 0, 0, 0, 9, 4),
                    line(2, 0, 0, 0, 10, 4),
                    line(2, 0, 0, 0, 11, 4),
                    line(3, 0, 0, 0, 12, 4),
                    line(4, 0, 0, 0, 13, 4),
                ],
            ],
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn uses_per_level(&self) -> u8 {
        self.uses_per_level
    }

    /// Base gains of `facility` at `level`; levels are clamped into 1..=5.
    #[must_use]
    pub fn base_gain(&self, facility: FacilityType, level: u8) -> StatLine {
        let level = level.clamp(MIN_FACILITY_LEVEL, MAX_FACILITY_LEVEL);
        self.table[facility.index()][usize::from(level - 1)]
    }

    /// Facility level reached after `uses` trainings on it.
    #[must_use]
    pub fn level_after_uses(&self, uses: u32) -> u8 {
        let steps = uses / u32::from(self.uses_per_level);
        let level = u32::from(MIN_FACILITY_LEVEL).saturating_add(steps);
        u8::try_from(level.min(u32::from(MAX_FACILITY_LEVEL))).unwrap_or(MAX_FACILITY_LEVEL)
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::ura_finals()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ura_levels_every_four_uses() {
        let scenario = Scenario::ura_finals();
        assert_eq!(scenario.level_after_uses(0), 1);
        assert_eq!(scenario.level_after_uses(3), 1);
        assert_eq!(scenario.level_after_uses(4), 2);
        assert_eq!(scenario.level_after_uses(15), 4);
        assert_eq!(scenario.level_after_uses(16), 5);
        assert_eq!(scenario.level_after_uses(400), 5);
    }

    #[test]
    fn power_facility_grants_power_stamina_and_skill_points() {
        let scenario = Scenario::ura_finals();
        let gain = scenario.base_gain(FacilityType::Power, 1);
        let granted: Vec<_> = gain.granted().collect();
        assert_eq!(
            granted,
            vec![StatKind::Stamina, StatKind::Power, StatKind::SkillPoints]
        );
        assert_eq!(gain.get(StatKind::Power), 8);
        assert_eq!(scenario.base_gain(FacilityType::Power, 9), scenario.base_gain(FacilityType::Power, 5));
    }

    #[test]
    fn scenario_roundtrips_through_json_shape() {
        let scenario = Scenario::ura_finals();
        let json = serde_json::to_string(&scenario).unwrap();
        assert!(json.contains("\"facilities\""));
        let parsed: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, scenario);
    }

    #[test]
    fn scenario_with_missing_levels_is_rejected() {
        let json = r#"{"name": "Short", "facilities": {"speed": [[10,0,5,0,0,2]]}}"#;
        let err = serde_json::from_str::<Scenario>(json).unwrap_err();
        assert!(err.to_string().contains("expected 5"));
    }
}
