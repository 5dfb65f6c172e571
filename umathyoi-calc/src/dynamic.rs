//! Turn-state dependent unique effects (ids 101 and up).
//!
//! Every supported kind has a row in [`DYNAMIC_KINDS`] and an arm in
//! [`contribution`]. Kinds that only matter outside a single training turn
//! are listed but contribute nothing.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::card::{Card, CardId, CardType};
use crate::constants::{COMBINED_BOND_BASE_BONUS, FRIENDSHIP_BOND_THRESHOLD, LOW_ENERGY_CEILING};
use crate::context::TrainingContext;
use crate::effects::{DynamicDescriptor, EffectValues, NormalEffect, ResolvedEffects};
use crate::error::CalcWarning;
use crate::scenario::FacilityType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicKind {
    EffectBonusIfMinBond = 101,
    TrainingEffectivenessIfMinBondOffSpecialty = 102,
    TrainingEffectivenessIfMinCardTypes = 103,
    TrainingEffectivenessForFans = 104,
    StartingStatsPerCardType = 105,
    EffectBonusPerFriendshipTrainings = 106,
    EffectBonusOnLessEnergy = 107,
    EffectBonusOnMoreMaxEnergy = 108,
    EffectBonusPerCombinedBond = 109,
    EffectBonusPerCardOnFacility = 110,
    EffectBonusPerFacilityLevel = 111,
    ChanceForNoFailure = 112,
    EffectBonusIfFriendshipTraining = 113,
    EffectBonusOnMoreEnergy = 114,
    AllCardsGainEffectBonus = 115,
    EffectBonusPerSkillType = 116,
    EffectBonusPerCombinedFacilityLevel = 117,
    ExtraAppearanceIfMinBond = 118,
    CardsAppearMoreIfMinBond = 119,
    StatBonusPerCardType = 120,
    AllCardsGainBondPerTraining = 121,
    NextTurnBonusAfterTrainingTogether = 122,
}

/// Lookup table from unique effect id to kind.
pub const DYNAMIC_KINDS: [DynamicKind; 22] = [
    DynamicKind::EffectBonusIfMinBond,
    DynamicKind::TrainingEffectivenessIfMinBondOffSpecialty,
    DynamicKind::TrainingEffectivenessIfMinCardTypes,
    DynamicKind::TrainingEffectivenessForFans,
    DynamicKind::StartingStatsPerCardType,
    DynamicKind::EffectBonusPerFriendshipTrainings,
    DynamicKind::EffectBonusOnLessEnergy,
    DynamicKind::EffectBonusOnMoreMaxEnergy,
    DynamicKind::EffectBonusPerCombinedBond,
    DynamicKind::EffectBonusPerCardOnFacility,
    DynamicKind::EffectBonusPerFacilityLevel,
    DynamicKind::ChanceForNoFailure,
    DynamicKind::EffectBonusIfFriendshipTraining,
    DynamicKind::EffectBonusOnMoreEnergy,
    DynamicKind::AllCardsGainEffectBonus,
    DynamicKind::EffectBonusPerSkillType,
    DynamicKind::EffectBonusPerCombinedFacilityLevel,
    DynamicKind::ExtraAppearanceIfMinBond,
    DynamicKind::CardsAppearMoreIfMinBond,
    DynamicKind::StatBonusPerCardType,
    DynamicKind::AllCardsGainBondPerTraining,
    DynamicKind::NextTurnBonusAfterTrainingTogether,
];

impl DynamicKind {
    #[must_use]
    pub fn from_id(id: u16) -> Option<Self> {
        DYNAMIC_KINDS.iter().copied().find(|kind| kind.id() == id)
    }

    #[must_use]
    pub const fn id(self) -> u16 {
        self as u16
    }

    /// Kinds that never change a single turn's gains.
    #[must_use]
    pub const fn is_inert(self) -> bool {
        matches!(
            self,
            Self::StartingStatsPerCardType
                | Self::ChanceForNoFailure
                | Self::AllCardsGainEffectBonus
                | Self::ExtraAppearanceIfMinBond
                | Self::CardsAppearMoreIfMinBond
                | Self::AllCardsGainBondPerTraining
                | Self::NextTurnBonusAfterTrainingTogether
        )
    }

    /// Warning attached once when a card carrying this kind is resolved.
    #[must_use]
    pub const fn advisory(self, card_id: CardId) -> Option<CalcWarning> {
        let effect_id = self.id();
        match self {
            Self::EffectBonusOnMoreMaxEnergy => Some(CalcWarning::UnverifiedDynamicEffect {
                card_id,
                effect_id,
            }),
            Self::NextTurnBonusAfterTrainingTogether => {
                Some(CalcWarning::UnsupportedDynamicEffect { card_id, effect_id })
            }
            _ => None,
        }
    }
}

/// Deck-wide aggregates shared by every card's dynamic evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckProfile {
    type_counts: [u32; CardType::ALL.len()],
    combined_bond: u32,
    combined_facility_levels: u32,
}

impl DeckProfile {
    /// Profile of the active deck under `context`.
    #[must_use]
    pub fn new<'a>(cards: impl IntoIterator<Item = &'a Card>, context: &TrainingContext) -> Self {
        let mut profile = Self {
            combined_facility_levels: context.combined_facility_levels(),
            ..Self::default()
        };
        for card in cards {
            profile.type_counts[card.kind.index()] += 1;
            profile.combined_bond += u32::from(context.bond(card.id));
        }
        profile
    }

    #[must_use]
    pub const fn count_of(&self, kind: CardType) -> u32 {
        self.type_counts[kind.index()]
    }

    #[must_use]
    pub fn distinct_types(&self) -> u32 {
        let distinct = self.type_counts.iter().filter(|count| **count > 0).count();
        u32::try_from(distinct).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub const fn combined_bond(&self) -> u32 {
        self.combined_bond
    }

    #[must_use]
    pub const fn combined_facility_levels(&self) -> u32 {
        self.combined_facility_levels
    }
}

/// Live state a dynamic effect is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct TurnScope<'a> {
    pub context: &'a TrainingContext,
    pub profile: &'a DeckProfile,
    pub facility: FacilityType,
    /// Cards landed on `facility` this turn, the evaluated card included.
    pub cards_on_facility: usize,
}

/// Realized contributions of every dynamic effect `resolved` carries.
///
/// Invalid parameters and unknown target effects are recorded into
/// `warnings` and contribute nothing.
pub fn evaluate(
    card: &Card,
    resolved: &ResolvedEffects,
    scope: &TurnScope<'_>,
    warnings: &mut Vec<CalcWarning>,
) -> EffectValues {
    let mut values = EffectValues::default();
    for descriptor in &resolved.dynamic {
        if descriptor.kind.is_inert() {
            continue;
        }
        let Ok(parts) = contribution(card, descriptor, scope) else {
            CalcWarning::InvalidDynamicParams {
                card_id: card.id,
                effect_id: descriptor.kind.id(),
            }
            .record_into(warnings);
            continue;
        };
        for (target, amount) in parts {
            match u16::try_from(target).ok().and_then(NormalEffect::from_id) {
                Some(effect) => values.add(effect, amount),
                None => CalcWarning::UnknownEffect {
                    card_id: card.id,
                    effect_id: u16::try_from(target).unwrap_or(u16::MAX),
                }
                .record_into(warnings),
            }
        }
    }
    values
}

/// Missing parameter or zero divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InvalidParams;

type Contribution = SmallVec<[(i64, f64); 6]>;

fn param(descriptor: &DynamicDescriptor, index: usize) -> Result<i64, InvalidParams> {
    descriptor.param(index).ok_or(InvalidParams)
}

fn div(numerator: i64, divisor: i64) -> Result<i64, InvalidParams> {
    numerator.checked_div(divisor).ok_or(InvalidParams)
}

/// Flat grant at `index`, replaced by the level-scaled magnitude when the
/// descriptor carries milestones.
fn grant(descriptor: &DynamicDescriptor, index: usize) -> Result<f64, InvalidParams> {
    match descriptor.static_magnitude {
        Some(magnitude) => Ok(magnitude),
        None => param(descriptor, index).map(to_f64),
    }
}

fn to_f64(value: i64) -> f64 {
    i32::try_from(value).map_or_else(
        |_| if value < 0 { f64::from(i32::MIN) } else { f64::from(i32::MAX) },
        f64::from,
    )
}

fn single(target: i64, amount: f64) -> Contribution {
    let mut parts = Contribution::new();
    parts.push((target, amount));
    parts
}

const TRAINING_EFFECTIVENESS: i64 = NormalEffect::TrainingEffectiveness as i64;

fn contribution(
    card: &Card,
    descriptor: &DynamicDescriptor,
    scope: &TurnScope<'_>,
) -> Result<Contribution, InvalidParams> {
    let context = scope.context;
    let bond = i64::from(context.bond(card.id));
    let on_specialty = card.kind.preferred_facility() == Some(scope.facility);
    let gate = |condition: bool, amount: f64| if condition { amount } else { 0.0 };

    let parts = match descriptor.kind {
        DynamicKind::EffectBonusIfMinBond => single(
            param(descriptor, 1)?,
            gate(bond >= param(descriptor, 0)?, grant(descriptor, 2)?),
        ),
        DynamicKind::TrainingEffectivenessIfMinBondOffSpecialty => single(
            TRAINING_EFFECTIVENESS,
            gate(
                bond >= param(descriptor, 0)? && !on_specialty,
                grant(descriptor, 1)?,
            ),
        ),
        DynamicKind::TrainingEffectivenessIfMinCardTypes => single(
            TRAINING_EFFECTIVENESS,
            gate(
                i64::from(scope.profile.distinct_types()) >= param(descriptor, 0)?,
                grant(descriptor, 1)?,
            ),
        ),
        DynamicKind::TrainingEffectivenessForFans => {
            let earned = div(i64::from(context.fan_count), param(descriptor, 0)?)?;
            single(
                TRAINING_EFFECTIVENESS,
                to_f64(earned.min(param(descriptor, 1)?)),
            )
        }
        DynamicKind::EffectBonusPerFriendshipTrainings => {
            let total = param(descriptor, 2)?.saturating_mul(param(descriptor, 0)?);
            single(
                param(descriptor, 1)?,
                gate(
                    bond >= i64::from(FRIENDSHIP_BOND_THRESHOLD),
                    to_f64(total),
                ),
            )
        }
        DynamicKind::EffectBonusOnLessEnergy => {
            let energy = i64::from(context.energy);
            let missing = i64::from(context.max_energy) - energy.max(param(descriptor, 2)?);
            let bonus = param(descriptor, 3)?
                .min(param(descriptor, 4)? + div(missing, param(descriptor, 1)?)?);
            single(
                param(descriptor, 0)?,
                gate(energy <= LOW_ENERGY_CEILING, to_f64(bonus)),
            )
        }
        DynamicKind::EffectBonusOnMoreMaxEnergy => {
            single(param(descriptor, 0)?, to_f64(param(descriptor, 4)?))
        }
        DynamicKind::EffectBonusPerCombinedBond => {
            let scaled = div(
                i64::from(scope.profile.combined_bond()),
                param(descriptor, 1)?,
            )?;
            single(
                param(descriptor, 0)?,
                to_f64(COMBINED_BOND_BASE_BONUS + scaled),
            )
        }
        DynamicKind::EffectBonusPerCardOnFacility => {
            let others = scope.cards_on_facility.saturating_sub(1);
            let others = i64::try_from(others).unwrap_or(i64::MAX);
            single(
                param(descriptor, 0)?,
                to_f64(others) * grant(descriptor, 1)?,
            )
        }
        DynamicKind::EffectBonusPerFacilityLevel => {
            let level = context.facility_level(scope.facility);
            single(
                param(descriptor, 0)?,
                f64::from(level) * grant(descriptor, 1)?,
            )
        }
        DynamicKind::EffectBonusIfFriendshipTraining => single(
            param(descriptor, 0)?,
            gate(on_specialty, grant(descriptor, 1)?),
        ),
        DynamicKind::EffectBonusOnMoreEnergy => {
            let earned = div(i64::from(context.energy), param(descriptor, 1)?)?;
            single(
                param(descriptor, 0)?,
                to_f64(earned.min(param(descriptor, 2)?)),
            )
        }
        DynamicKind::EffectBonusPerSkillType => {
            let skill_type = u32::try_from(param(descriptor, 0)?).map_err(|_| InvalidParams)?;
            let counted = i64::from(context.skill_count(skill_type)).min(param(descriptor, 3)?);
            single(
                param(descriptor, 1)?,
                to_f64(counted.saturating_mul(param(descriptor, 2)?)),
            )
        }
        DynamicKind::EffectBonusPerCombinedFacilityLevel => {
            // Capped at v2, unlike the source formula which has no cap.
            let cap = param(descriptor, 2)?;
            let combined = i64::from(scope.profile.combined_facility_levels());
            let scaled = div(cap.saturating_mul(combined), param(descriptor, 1)?)?;
            single(param(descriptor, 0)?, to_f64(scaled.min(cap)))
        }
        DynamicKind::StatBonusPerCardType => {
            let active = bond >= param(descriptor, 1)?;
            let per_card = param(descriptor, 2)?;
            let cap = param(descriptor, 3)?;
            let per_pal = param(descriptor, 0)?;
            let mut parts = Contribution::new();
            for (kind, effect) in [
                (CardType::Speed, NormalEffect::SpeedBonus),
                (CardType::Stamina, NormalEffect::StaminaBonus),
                (CardType::Power, NormalEffect::PowerBonus),
                (CardType::Guts, NormalEffect::GutsBonus),
                (CardType::Wit, NormalEffect::WitBonus),
            ] {
                let cards = i64::from(scope.profile.count_of(kind)).min(cap);
                parts.push((
                    i64::from(effect.id()),
                    gate(active, to_f64(cards.saturating_mul(per_card))),
                ));
            }
            let pals = i64::from(scope.profile.count_of(CardType::Pal));
            parts.push((
                i64::from(NormalEffect::SkillPointBonus.id()),
                gate(active, to_f64(pals.saturating_mul(per_pal))),
            ));
            parts
        }
        DynamicKind::StartingStatsPerCardType
        | DynamicKind::ChanceForNoFailure
        | DynamicKind::AllCardsGainEffectBonus
        | DynamicKind::ExtraAppearanceIfMinBond
        | DynamicKind::CardsAppearMoreIfMinBond
        | DynamicKind::AllCardsGainBondPerTraining
        | DynamicKind::NextTurnBonusAfterTrainingTogether => Contribution::new(),
    };
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rarity, UniqueBlock, UniqueEffect, UniqueParams};
    use crate::effects::resolver::resolve;

    fn card(kind: CardType, unique_id: u16, values: &[i32]) -> Card {
        Card {
            id: CardId(30000 + u32::from(unique_id)),
            name: format!("Dynamic {unique_id}"),
            rarity: Rarity::SSR,
            kind,
            effects: Vec::new(),
            unique: Some(UniqueBlock {
                level: 30,
                effects: vec![UniqueEffect {
                    id: unique_id,
                    values: UniqueParams::from_slice(values),
                    milestones: None,
                }],
            }),
        }
    }

    struct Fixture {
        context: TrainingContext,
        profile: DeckProfile,
    }

    impl Fixture {
        fn new(deck: &[Card]) -> Self {
            let context = TrainingContext::default();
            let profile = DeckProfile::new(deck, &context);
            Self { context, profile }
        }

        fn eval(
            &self,
            card: &Card,
            facility: FacilityType,
            cards_on_facility: usize,
        ) -> (EffectValues, Vec<CalcWarning>) {
            let resolved = resolve(card, 50).unwrap();
            let scope = TurnScope {
                context: &self.context,
                profile: &self.profile,
                facility,
                cards_on_facility,
            };
            let mut warnings = Vec::new();
            let values = evaluate(card, &resolved, &scope, &mut warnings);
            (values, warnings)
        }
    }

    fn approx(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn lookup_table_is_complete_and_ordered() {
        for (offset, kind) in DYNAMIC_KINDS.iter().enumerate() {
            assert_eq!(usize::from(kind.id()), 101 + offset);
            assert_eq!(DynamicKind::from_id(kind.id()), Some(*kind));
        }
        assert_eq!(DynamicKind::from_id(123), None);
        assert_eq!(DynamicKind::from_id(100), None);
    }

    #[test]
    fn min_bond_bonus_respects_threshold() {
        let kitasan = card(CardType::Speed, 101, &[100, 8, 10]);
        let mut fixture = Fixture::new(std::slice::from_ref(&kitasan));
        let (values, _) = fixture.eval(&kitasan, FacilityType::Speed, 1);
        assert!(values.is_empty());

        fixture.context.bonds.insert(kitasan.id, 100);
        let (values, _) = fixture.eval(&kitasan, FacilityType::Speed, 1);
        approx(values.get(NormalEffect::TrainingEffectiveness), 10.0);
    }

    #[test]
    fn off_specialty_bonus_skips_preferred_facility() {
        let bakushin = card(CardType::Speed, 102, &[80, 10]);
        let fixture = Fixture::new(std::slice::from_ref(&bakushin));
        let (on, _) = fixture.eval(&bakushin, FacilityType::Speed, 1);
        let (off, _) = fixture.eval(&bakushin, FacilityType::Wit, 1);
        assert!(on.is_empty());
        approx(off.get(NormalEffect::TrainingEffectiveness), 10.0);
    }

    #[test]
    fn fan_bonus_is_truncated_and_capped() {
        let top_road = card(CardType::Guts, 104, &[15_000, 5]);
        let mut fixture = Fixture::new(std::slice::from_ref(&top_road));
        fixture.context.fan_count = 44_999;
        let (values, _) = fixture.eval(&top_road, FacilityType::Guts, 1);
        approx(values.get(NormalEffect::TrainingEffectiveness), 2.0);

        fixture.context.fan_count = 1_000_000;
        let (values, _) = fixture.eval(&top_road, FacilityType::Guts, 1);
        approx(values.get(NormalEffect::TrainingEffectiveness), 5.0);
    }

    #[test]
    fn less_energy_bonus_uses_floor_and_cap() {
        let bamboo = card(CardType::Guts, 107, &[8, 4, 30, 15, 5]);
        let mut fixture = Fixture::new(std::slice::from_ref(&bamboo));
        fixture.context.max_energy = 104;
        fixture.context.energy = 70;
        // min(15, 5 + (104 - 70) / 4)
        let (values, _) = fixture.eval(&bamboo, FacilityType::Guts, 1);
        approx(values.get(NormalEffect::TrainingEffectiveness), 13.0);

        fixture.context.energy = 10;
        // energy below the floor counts as the floor: min(15, 5 + 74 / 4)
        let (values, _) = fixture.eval(&bamboo, FacilityType::Guts, 1);
        approx(values.get(NormalEffect::TrainingEffectiveness), 15.0);
    }

    #[test]
    fn combined_bond_and_facility_aggregates() {
        let flower = card(CardType::Speed, 109, &[8, 40]);
        let scarlet = card(CardType::Power, 117, &[1, 25, 15]);
        let deck = vec![flower.clone(), scarlet.clone()];
        let fixture = Fixture::new(&deck);
        assert_eq!(fixture.profile.combined_bond(), 160);
        // 20 + 160 / 40
        let (values, _) = fixture.eval(&flower, FacilityType::Speed, 1);
        approx(values.get(NormalEffect::TrainingEffectiveness), 24.0);
        // min(15, 15 * 15 / 25)
        let (values, _) = fixture.eval(&scarlet, FacilityType::Power, 1);
        approx(values.get(NormalEffect::FriendshipBonus), 9.0);
    }

    #[test]
    fn per_card_and_per_level_kinds_scale_with_scope() {
        let condor = card(CardType::Power, 110, &[8, 5]);
        let maruzensky = card(CardType::Speed, 111, &[1, 4]);
        let mut fixture = Fixture::new(&[condor.clone(), maruzensky.clone()]);
        let (values, _) = fixture.eval(&condor, FacilityType::Power, 3);
        approx(values.get(NormalEffect::TrainingEffectiveness), 10.0);
        fixture.context.set_facility_level(FacilityType::Speed, 5);
        let (values, _) = fixture.eval(&maruzensky, FacilityType::Speed, 1);
        approx(values.get(NormalEffect::FriendshipBonus), 20.0);
    }

    #[test]
    fn stat_bonus_per_card_type_counts_deck_composition() {
        let orfevre = card(CardType::Stamina, 120, &[2, 80, 1, 2]);
        let deck = vec![
            orfevre.clone(),
            card(CardType::Stamina, 101, &[100, 8, 10]),
            card(CardType::Stamina, 102, &[80, 10]),
            card(CardType::Pal, 103, &[3, 10]),
        ];
        let fixture = Fixture::new(&deck);
        let (values, _) = fixture.eval(&orfevre, FacilityType::Stamina, 1);
        approx(values.get(NormalEffect::StaminaBonus), 2.0);
        approx(values.get(NormalEffect::SpeedBonus), 0.0);
        approx(values.get(NormalEffect::SkillPointBonus), 2.0);
    }

    #[test]
    fn zero_divisor_or_missing_param_is_recorded_not_fatal() {
        let broken = card(CardType::Wit, 114, &[8, 0, 10]);
        let fixture = Fixture::new(std::slice::from_ref(&broken));
        let (values, warnings) = fixture.eval(&broken, FacilityType::Wit, 1);
        assert!(values.is_empty());
        assert_eq!(
            warnings,
            vec![CalcWarning::InvalidDynamicParams {
                card_id: broken.id,
                effect_id: 114
            }]
        );

        let short = card(CardType::Wit, 116, &[3]);
        let (_, warnings) = fixture.eval(&short, FacilityType::Wit, 1);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn unknown_target_effect_is_recorded() {
        let odd = card(CardType::Wit, 113, &[29, 10]);
        let fixture = Fixture::new(std::slice::from_ref(&odd));
        let (values, warnings) = fixture.eval(&odd, FacilityType::Wit, 1);
        assert!(values.is_empty());
        assert!(matches!(
            warnings.as_slice(),
            [CalcWarning::UnknownEffect { effect_id: 29, .. }]
        ));
    }

    #[test]
    fn advisory_kinds_warn_once_at_resolve_time() {
        let pearl = card(CardType::Speed, 108, &[8, 0, 0, 5, 20]);
        let resolved = resolve(&pearl, 50).unwrap();
        assert_eq!(
            resolved.warnings,
            vec![CalcWarning::UnverifiedDynamicEffect {
                card_id: pearl.id,
                effect_id: 108
            }]
        );
        let fixture = Fixture::new(std::slice::from_ref(&pearl));
        let (values, _) = fixture.eval(&pearl, FacilityType::Speed, 1);
        approx(values.get(NormalEffect::TrainingEffectiveness), 20.0);

        let tucker = card(CardType::Wit, 122, &[8, 10]);
        let (values, warnings) = fixture.eval(&tucker, FacilityType::Wit, 1);
        assert!(values.is_empty());
        assert!(warnings.is_empty());
        assert!(matches!(
            resolve(&tucker, 50).unwrap().warnings.as_slice(),
            [CalcWarning::UnsupportedDynamicEffect { effect_id: 122, .. }]
        ));
    }

    #[test]
    fn level_scaled_grant_replaces_flat_parameter() {
        let mut tamamo = card(CardType::Stamina, 113, &[8, 10]);
        if let Some(block) = tamamo.unique.as_mut() {
            block.effects[0].milestones = Some(crate::effects::Milestones::new(vec![
                5, -1, -1, -1, -1, -1, -1, -1, -1, -1, 15,
            ]));
        }
        let fixture = Fixture::new(std::slice::from_ref(&tamamo));
        let (values, _) = fixture.eval(&tamamo, FacilityType::Stamina, 1);
        approx(values.get(NormalEffect::TrainingEffectiveness), 15.0);
    }
}
