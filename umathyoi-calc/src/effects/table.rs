//! Milestone tables and piecewise-linear interpolation.
use serde::{Deserialize, Serialize};

use crate::card::CardId;
use crate::constants::{MILESTONE_LEVELS, MILESTONE_SENTINEL};
use crate::error::DataError;

/// Effect values recorded at the fixed milestone levels.
///
/// Entry `i` belongs to `MILESTONE_LEVELS[i]`; `-1` means "no milestone".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Milestones(Vec<i32>);

impl Milestones {
    #[must_use]
    pub const fn new(values: Vec<i32>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn values(&self) -> &[i32] {
        &self.0
    }

    /// Milestone defined exactly at `level`, if any.
    #[must_use]
    pub fn defined_at(&self, level: u8) -> Option<i32> {
        let index = MILESTONE_LEVELS.iter().position(|&l| l == level)?;
        self.0
            .get(index)
            .copied()
            .filter(|&value| value != MILESTONE_SENTINEL)
    }

    /// Check shape and the mandatory milestones at level 1 and `max_level`.
    ///
    /// # Errors
    ///
    /// Returns a [`DataError`] naming the card and effect on any violation.
    pub fn validate(&self, card_id: CardId, effect_id: u16, max_level: u8) -> Result<(), DataError> {
        if self.0.len() != MILESTONE_LEVELS.len() {
            return Err(DataError::MilestoneLength {
                card_id,
                effect_id,
                len: self.0.len(),
                expected: MILESTONE_LEVELS.len(),
            });
        }
        for (&level, &value) in MILESTONE_LEVELS.iter().zip(&self.0) {
            if value < MILESTONE_SENTINEL {
                return Err(DataError::InvalidMilestone {
                    card_id,
                    effect_id,
                    level,
                    value,
                });
            }
        }
        for level in [1, max_level] {
            if self.defined_at(level).is_none() {
                return Err(DataError::MissingMilestone {
                    card_id,
                    effect_id,
                    level,
                });
            }
        }
        Ok(())
    }

    /// Interpolated value at `level` for a card whose rarity cap is `max_level`.
    ///
    /// Exact at milestones; linear between the nearest defined neighbours.
    /// Never truncated here.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::LevelOutOfRange`] outside `1..=max_level`, or a
    /// shape error from [`Milestones::validate`].
    pub fn value_at(
        &self,
        card_id: CardId,
        effect_id: u16,
        level: u8,
        max_level: u8,
    ) -> Result<f64, DataError> {
        if level == 0 || level > max_level {
            return Err(DataError::LevelOutOfRange {
                card_id,
                level,
                max_level,
            });
        }
        self.validate(card_id, effect_id, max_level)?;

        if let Some(value) = self.defined_at(level) {
            return Ok(f64::from(value));
        }

        let mut lower = None;
        let mut upper = None;
        for (&milestone_level, &value) in MILESTONE_LEVELS.iter().zip(&self.0) {
            if value == MILESTONE_SENTINEL || milestone_level > max_level {
                continue;
            }
            if milestone_level < level {
                lower = Some((milestone_level, value));
            } else if upper.is_none() {
                upper = Some((milestone_level, value));
            }
        }

        // validate() guarantees both ends exist around any in-range level.
        let ((l0, v0), (l1, v1)) = match (lower, upper) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => {
                return Err(DataError::MissingMilestone {
                    card_id,
                    effect_id,
                    level,
                });
            }
        };
        let span = f64::from(l1) - f64::from(l0);
        let offset = f64::from(level) - f64::from(l0);
        Ok(f64::from(v0) + (f64::from(v1) - f64::from(v0)) * offset / span)
    }
}
