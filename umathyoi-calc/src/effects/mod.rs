//! Effect taxonomy and per-card effect resolution.
use serde::{Deserialize, Serialize};

use crate::scenario::StatKind;

pub mod resolver;
pub mod table;

pub use resolver::{DynamicDescriptor, EffectResolver, ResolvedEffects};
pub use table::Milestones;

/// Normal (level-scaled) effects understood by the calculator.
///
/// Discriminants are the data layer's effect ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalEffect {
    FriendshipBonus = 1,
    MoodEffect = 2,
    SpeedBonus = 3,
    StaminaBonus = 4,
    PowerBonus = 5,
    GutsBonus = 6,
    WitBonus = 7,
    TrainingEffectiveness = 8,
    InitialSpeed = 9,
    InitialStamina = 10,
    InitialPower = 11,
    InitialGuts = 12,
    InitialWit = 13,
    InitialBond = 14,
    RaceBonus = 15,
    FanBonus = 16,
    HintLevels = 17,
    HintFrequency = 18,
    SpecialtyPriority = 19,
    EventRecovery = 25,
    EventEffectiveness = 26,
    FailureProtection = 27,
    EnergyCostReduction = 28,
    SkillPointBonus = 30,
    WitFriendshipRecovery = 31,
}

/// Lookup table from effect id to kind.
const NORMAL_EFFECTS: [NormalEffect; 25] = [
    NormalEffect::FriendshipBonus,
    NormalEffect::MoodEffect,
    NormalEffect::SpeedBonus,
    NormalEffect::StaminaBonus,
    NormalEffect::PowerBonus,
    NormalEffect::GutsBonus,
    NormalEffect::WitBonus,
    NormalEffect::TrainingEffectiveness,
    NormalEffect::InitialSpeed,
    NormalEffect::InitialStamina,
    NormalEffect::InitialPower,
    NormalEffect::InitialGuts,
    NormalEffect::InitialWit,
    NormalEffect::InitialBond,
    NormalEffect::RaceBonus,
    NormalEffect::FanBonus,
    NormalEffect::HintLevels,
    NormalEffect::HintFrequency,
    NormalEffect::SpecialtyPriority,
    NormalEffect::EventRecovery,
    NormalEffect::EventEffectiveness,
    NormalEffect::FailureProtection,
    NormalEffect::EnergyCostReduction,
    NormalEffect::SkillPointBonus,
    NormalEffect::WitFriendshipRecovery,
];

/// Highest normal effect id plus one; sizes [`EffectValues`].
const EFFECT_SLOTS: usize = 32;

impl NormalEffect {
    /// Resolve a data-layer id; `None` for ids the calculator does not know.
    #[must_use]
    pub fn from_id(id: u16) -> Option<Self> {
        NORMAL_EFFECTS.iter().copied().find(|effect| effect.id() == id)
    }

    #[must_use]
    pub const fn id(self) -> u16 {
        self as u16
    }

    /// Flat stat bonus effect feeding a given stat's base gain.
    #[must_use]
    pub const fn stat_bonus_for(stat: StatKind) -> Self {
        match stat {
            StatKind::Speed => Self::SpeedBonus,
            StatKind::Stamina => Self::StaminaBonus,
            StatKind::Power => Self::PowerBonus,
            StatKind::Guts => Self::GutsBonus,
            StatKind::Wit => Self::WitBonus,
            StatKind::SkillPoints => Self::SkillPointBonus,
        }
    }
}

/// Dense effect-id → value mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectValues {
    values: [f64; EFFECT_SLOTS],
}

impl Default for EffectValues {
    fn default() -> Self {
        Self {
            values: [0.0; EFFECT_SLOTS],
        }
    }
}

impl EffectValues {
    #[must_use]
    pub fn get(&self, effect: NormalEffect) -> f64 {
        self.values[usize::from(effect.id())]
    }

    pub fn add(&mut self, effect: NormalEffect, value: f64) {
        self.values[usize::from(effect.id())] += value;
    }

    pub fn set(&mut self, effect: NormalEffect, value: f64) {
        self.values[usize::from(effect.id())] = value;
    }

    /// Add every entry of `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        for (slot, value) in self.values.iter_mut().zip(other.values.iter()) {
            *slot += value;
        }
    }

    /// Non-zero entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NormalEffect, f64)> + '_ {
        NORMAL_EFFECTS
            .iter()
            .map(|&effect| (effect, self.get(effect)))
            .filter(|(_, value)| *value != 0.0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|value| *value == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_table_covers_every_variant_once() {
        for effect in NORMAL_EFFECTS {
            assert_eq!(NormalEffect::from_id(effect.id()), Some(effect));
            assert!(usize::from(effect.id()) < EFFECT_SLOTS);
        }
        assert_eq!(NormalEffect::from_id(29), None);
        assert_eq!(NormalEffect::from_id(500), None);
    }

    #[test]
    fn effect_values_accumulate_and_merge() {
        let mut a = EffectValues::default();
        a.add(NormalEffect::TrainingEffectiveness, 10.0);
        a.add(NormalEffect::TrainingEffectiveness, 5.0);
        let mut b = EffectValues::default();
        b.set(NormalEffect::MoodEffect, 30.0);
        a.merge(&b);
        assert!((a.get(NormalEffect::TrainingEffectiveness) - 15.0).abs() < f64::EPSILON);
        assert!((a.get(NormalEffect::MoodEffect) - 30.0).abs() < f64::EPSILON);
        let collected: Vec<_> = a.iter().map(|(effect, _)| effect).collect();
        assert_eq!(
            collected,
            vec![NormalEffect::MoodEffect, NormalEffect::TrainingEffectiveness]
        );
        assert!(EffectValues::default().is_empty());
    }
}
