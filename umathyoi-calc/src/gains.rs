//! Per-facility stat gain for one turn.
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::card::Card;
use crate::constants::{GAIN_FLOOR_EPSILON, PERCENTAGE_BASE, SUPPORT_BONUS_PER_CARD};
use crate::context::TrainingContext;
use crate::dynamic::{self, DeckProfile, TurnScope};
use crate::effects::{EffectValues, NormalEffect, ResolvedEffects};
use crate::error::CalcWarning;
use crate::numbers::{floor_f64_to_u32, usize_to_f64};
use crate::placement::PlacementCard;
use crate::scenario::{FacilityType, Scenario, StatKind, StatLine};

/// Multiplicative stages of the gain formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Friendship,
    Mood,
    Training,
    Support,
    Trainee,
}

impl Modifier {
    pub const ALL: [Self; 5] = [
        Self::Friendship,
        Self::Mood,
        Self::Training,
        Self::Support,
        Self::Trainee,
    ];

    /// Skill points only take flat bonuses.
    #[must_use]
    pub const fn applies_to(self, stat: StatKind) -> bool {
        !stat.is_skill_points()
    }
}

/// An active deck card resolved for the whole run.
#[derive(Debug, Clone)]
pub struct ActiveCard {
    pub card: Arc<Card>,
    pub resolved: Arc<ResolvedEffects>,
}

impl ActiveCard {
    #[must_use]
    pub fn placement(&self) -> PlacementCard {
        PlacementCard::new(self.card.kind, self.resolved.specialty_priority())
    }
}

/// Everything fixed across a run that the gain formula reads.
#[derive(Debug, Clone, Copy)]
pub struct GainInputs<'a> {
    pub scenario: &'a Scenario,
    pub context: &'a TrainingContext,
    pub profile: &'a DeckProfile,
}

/// Integer gains one facility yields this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityGain {
    pub facility: FacilityType,
    pub landed: usize,
    pub gains: StatLine,
}

/// `(1 + unique/100) * (1 + normal/100)` for one type-matching card.
#[must_use]
pub fn friendship_factor(unique: f64, normal: f64) -> f64 {
    (1.0 + unique / PERCENTAGE_BASE) * (1.0 + normal / PERCENTAGE_BASE)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Multipliers {
    friendship: f64,
    mood: f64,
    training: f64,
    support: f64,
}

impl Multipliers {
    fn value(&self, modifier: Modifier, trainee: f64) -> f64 {
        let raw = match modifier {
            Modifier::Friendship => self.friendship,
            Modifier::Mood => self.mood,
            Modifier::Training => self.training,
            Modifier::Support => self.support,
            Modifier::Trainee => trainee,
        };
        raw.max(0.0)
    }
}

/// Gains of `facility` with the deck cards at `landed` on it.
///
/// A facility nobody landed on yields its scenario base gain.
pub fn compute_gain(
    inputs: &GainInputs<'_>,
    facility: FacilityType,
    landed: &[&ActiveCard],
    warnings: &mut Vec<CalcWarning>,
) -> FacilityGain {
    let level = inputs.context.facility_level(facility);
    let base = inputs.scenario.base_gain(facility, level);
    if landed.is_empty() {
        return FacilityGain {
            facility,
            landed: 0,
            gains: base,
        };
    }

    let scope = TurnScope {
        context: inputs.context,
        profile: inputs.profile,
        facility,
        cards_on_facility: landed.len(),
    };
    let mut totals = EffectValues::default();
    let mut friendship = 1.0;
    for active in landed {
        let dynamic = dynamic::evaluate(&active.card, &active.resolved, &scope, warnings);
        if active.card.kind.preferred_facility() == Some(facility) {
            let unique = active.resolved.unique.get(NormalEffect::FriendshipBonus)
                + dynamic.get(NormalEffect::FriendshipBonus);
            let normal = active.resolved.normal.get(NormalEffect::FriendshipBonus);
            friendship *= friendship_factor(unique, normal);
        }
        totals.merge(&active.resolved.normal);
        totals.merge(&active.resolved.unique);
        totals.merge(&dynamic);
    }

    let multipliers = Multipliers {
        friendship,
        mood: 1.0
            + inputs.context.mood.tier()
                * (1.0 + totals.get(NormalEffect::MoodEffect) / PERCENTAGE_BASE),
        training: 1.0 + totals.get(NormalEffect::TrainingEffectiveness) / PERCENTAGE_BASE,
        support: 1.0 + SUPPORT_BONUS_PER_CARD * usize_to_f64(landed.len()),
    };

    let mut gains = StatLine::default();
    for stat in base.granted() {
        let flat = f64::from(base.get(stat)) + totals.get(NormalEffect::stat_bonus_for(stat));
        let trainee = 1.0 + inputs.context.growth.get(stat) / PERCENTAGE_BASE;
        let scaled = Modifier::ALL
            .into_iter()
            .filter(|modifier| modifier.applies_to(stat))
            .fold(flat, |acc, modifier| acc * multipliers.value(modifier, trainee));
        gains.set(stat, floor_f64_to_u32(scaled + GAIN_FLOOR_EPSILON));
    }

    FacilityGain {
        facility,
        landed: landed.len(),
        gains,
    }
}
