//! Per-card effect resolution with an explicit (card, level) cache.
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{EffectValues, NormalEffect};
use crate::card::{Card, CardId, UniqueEffect, UniqueParams};
use crate::dynamic::DynamicKind;
use crate::error::{CalcWarning, DataError};

/// A unique effect whose realized value needs live training state.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicDescriptor {
    pub kind: DynamicKind,
    pub params: UniqueParams,
    /// Interpolated per-level magnitude when the descriptor carries milestones.
    pub static_magnitude: Option<f64>,
}

impl DynamicDescriptor {
    /// Parameter at `index`, if present.
    #[must_use]
    pub fn param(&self, index: usize) -> Option<i64> {
        self.params.get(index).map(|value| i64::from(*value))
    }
}

/// Everything a card grants at one effective level.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEffects {
    pub card_id: CardId,
    pub level: u8,
    /// Normal level-scaled effects.
    pub normal: EffectValues,
    /// Unlocked unique effects with a static value (ids below 100).
    pub unique: EffectValues,
    pub dynamic: SmallVec<[DynamicDescriptor; 2]>,
    pub warnings: Vec<CalcWarning>,
}

impl ResolvedEffects {
    /// Normal and unique static values summed; friendship callers should
    /// use the split accessors instead.
    #[must_use]
    pub fn static_total(&self, effect: NormalEffect) -> f64 {
        self.normal.get(effect) + self.unique.get(effect)
    }

    #[must_use]
    pub fn specialty_priority(&self) -> f64 {
        self.static_total(NormalEffect::SpecialtyPriority)
    }
}

/// Resolve a card at `level` without caching.
///
/// # Errors
///
/// Returns a [`DataError`] when the level is out of range or any milestone
/// array the card carries is malformed.
pub fn resolve(card: &Card, level: u8) -> Result<ResolvedEffects, DataError> {
    let max_level = card.max_level();
    if level == 0 || level > max_level {
        return Err(DataError::LevelOutOfRange {
            card_id: card.id,
            level,
            max_level,
        });
    }

    let mut resolved = ResolvedEffects {
        card_id: card.id,
        level,
        normal: EffectValues::default(),
        unique: EffectValues::default(),
        dynamic: SmallVec::new(),
        warnings: Vec::new(),
    };

    for entry in &card.effects {
        let value = entry.milestones.value_at(card.id, entry.id, level, max_level)?;
        match NormalEffect::from_id(entry.id) {
            Some(effect) => resolved.normal.add(effect, value),
            None => push_warning(
                &mut resolved.warnings,
                CalcWarning::UnknownEffect {
                    card_id: card.id,
                    effect_id: entry.id,
                },
            ),
        }
    }

    let Some(block) = &card.unique else {
        return Ok(resolved);
    };
    if level < block.level {
        return Ok(resolved);
    }
    for effect in &block.effects {
        resolve_unique(card, effect, level, &mut resolved)?;
    }
    Ok(resolved)
}

fn resolve_unique(
    card: &Card,
    effect: &UniqueEffect,
    level: u8,
    resolved: &mut ResolvedEffects,
) -> Result<(), DataError> {
    let max_level = card.max_level();
    let magnitude = match &effect.milestones {
        Some(milestones) => Some(milestones.value_at(card.id, effect.id, level, max_level)?),
        None => None,
    };

    if effect.is_dynamic() {
        match DynamicKind::from_id(effect.id) {
            Some(kind) => {
                if let Some(advisory) = kind.advisory(card.id) {
                    push_warning(&mut resolved.warnings, advisory);
                }
                resolved.dynamic.push(DynamicDescriptor {
                    kind,
                    params: effect.values.clone(),
                    static_magnitude: magnitude,
                });
            }
            None => push_warning(
                &mut resolved.warnings,
                CalcWarning::UnknownDynamicEffect {
                    card_id: card.id,
                    effect_id: effect.id,
                },
            ),
        }
        return Ok(());
    }

    let Some(target) = NormalEffect::from_id(effect.id) else {
        push_warning(
            &mut resolved.warnings,
            CalcWarning::UnknownEffect {
                card_id: card.id,
                effect_id: effect.id,
            },
        );
        return Ok(());
    };
    let value = magnitude.or_else(|| effect.values.first().map(|v| f64::from(*v)));
    match value {
        Some(value) => resolved.unique.add(target, value),
        None => log::debug!(
            "card {}: unique effect {} carries no value",
            card.id,
            effect.id
        ),
    }
    Ok(())
}

fn push_warning(warnings: &mut Vec<CalcWarning>, warning: CalcWarning) {
    warning.record_into(warnings);
}

type CacheKey = (CardId, u8);

/// Caching front for [`resolve`].
///
/// Entries are filled on first observation of a (card, level) pair and are
/// shared read-only across runs.
#[derive(Debug, Default)]
pub struct EffectResolver {
    cache: RwLock<HashMap<CacheKey, Arc<ResolvedEffects>>>,
}

impl EffectResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve through the cache.
    ///
    /// # Errors
    ///
    /// Propagates [`DataError`]s from [`resolve`]; failures are not cached.
    pub fn resolve(&self, card: &Card, level: u8) -> Result<Arc<ResolvedEffects>, DataError> {
        let key = (card.id, level);
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(hit));
        }

        log::debug!("resolving card {} at level {level}", card.id);
        let resolved = Arc::new(resolve(card, level)?);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.entry(key).or_insert(resolved);
        Ok(Arc::clone(entry))
    }

    /// Number of (card, level) pairs resolved so far.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop every cached entry, e.g. after the card catalog is reloaded.
    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
