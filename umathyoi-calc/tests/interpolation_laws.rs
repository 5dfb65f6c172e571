use umathyoi_calc::card::EffectEntry;
use umathyoi_calc::constants::MILESTONE_LEVELS;
use umathyoi_calc::effects::resolver::resolve;
use umathyoi_calc::{Card, CardId, CardType, DataError, Milestones, NormalEffect, Rarity};

fn card(rarity: Rarity, milestones: Vec<i32>) -> Card {
    Card {
        id: CardId(20_001),
        name: "Ramp".to_string(),
        rarity,
        kind: CardType::Stamina,
        effects: vec![EffectEntry {
            id: NormalEffect::TrainingEffectiveness.id(),
            milestones: Milestones::new(milestones),
        }],
        unique: None,
    }
}

fn te_at(card: &Card, level: u8) -> f64 {
    resolve(card, level)
        .unwrap()
        .normal
        .get(NormalEffect::TrainingEffectiveness)
}

#[test]
fn every_level_lies_on_the_segment_between_its_milestones() {
    let milestones = vec![5, -1, 8, -1, -1, 12, -1, -1, -1, -1, 20];
    let ssr = card(Rarity::SSR, milestones.clone());
    let defined: Vec<(u8, f64)> = MILESTONE_LEVELS
        .iter()
        .zip(&milestones)
        .filter(|(_, value)| **value >= 0)
        .map(|(level, value)| (*level, f64::from(*value)))
        .collect();

    for level in 1..=50u8 {
        let value = te_at(&ssr, level);
        let upper = defined
            .iter()
            .position(|(l, _)| *l >= level)
            .unwrap();
        let (l1, v1) = defined[upper];
        if l1 == level {
            assert!((value - v1).abs() < f64::EPSILON, "level {level}");
            continue;
        }
        let (l0, v0) = defined[upper - 1];
        let expected = v0 + (v1 - v0) * (f64::from(level) - f64::from(l0)) / (f64::from(l1) - f64::from(l0));
        assert!((value - expected).abs() < 1e-9, "level {level}: {value} vs {expected}");
    }
}

#[test]
fn non_decreasing_tables_stay_non_decreasing() {
    let ssr = card(Rarity::SSR, vec![5, -1, 8, -1, -1, 12, -1, -1, -1, -1, 20]);
    let values: Vec<f64> = (1..=50).map(|level| te_at(&ssr, level)).collect();
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn sr_cards_stop_at_forty_five() {
    let sr = card(Rarity::SR, vec![5, -1, -1, -1, -1, -1, -1, -1, -1, 14, -1]);
    assert!((te_at(&sr, 45) - 14.0).abs() < f64::EPSILON);
    assert!(matches!(
        resolve(&sr, 46),
        Err(DataError::LevelOutOfRange { max_level: 45, .. })
    ));
    assert!(matches!(
        resolve(&sr, 0),
        Err(DataError::LevelOutOfRange { level: 0, .. })
    ));
}

#[test]
fn negative_non_sentinel_values_are_rejected() {
    let broken = card(Rarity::SSR, vec![5, -2, -1, -1, -1, -1, -1, -1, -1, -1, 20]);
    assert!(matches!(
        resolve(&broken, 3),
        Err(DataError::InvalidMilestone { value: -2, level: 5, .. })
    ));
}
