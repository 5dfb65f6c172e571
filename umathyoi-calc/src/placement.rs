//! Weighted per-turn assignment of deck cards to facilities.
use rand::Rng;
use smallvec::SmallVec;

use crate::card::CardType;
use crate::constants::{DECK_SIZE, FACILITY_BASE_WEIGHT, NO_SHOW_WEIGHT};
use crate::scenario::FacilityType;

/// What the sampler needs to know about one active card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementCard {
    pub kind: CardType,
    pub specialty_priority: f64,
}

impl PlacementCard {
    #[must_use]
    pub fn new(kind: CardType, specialty_priority: f64) -> Self {
        Self {
            kind,
            specialty_priority: specialty_priority.max(0.0),
        }
    }

    /// Outcome weights for this card.
    #[must_use]
    pub fn weights(&self) -> PlacementWeights {
        let mut facilities = [FACILITY_BASE_WEIGHT; FacilityType::COUNT];
        if let Some(preferred) = self.kind.preferred_facility() {
            facilities[preferred.index()] += self.specialty_priority.max(0.0);
        }
        PlacementWeights {
            facilities,
            no_show: NO_SHOW_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementWeights {
    /// Indexed by `FacilityType::index()`.
    pub facilities: [f64; FacilityType::COUNT],
    pub no_show: f64,
}

impl PlacementWeights {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.facilities.iter().sum::<f64>() + self.no_show
    }

    /// Map a draw in `[0, total)` onto an outcome; `None` is a no-show.
    #[must_use]
    pub fn pick(&self, draw: f64) -> Option<FacilityType> {
        let mut threshold = 0.0;
        for facility in FacilityType::ALL {
            threshold += self.facilities[facility.index()];
            if draw < threshold {
                return Some(facility);
            }
        }
        None
    }
}

/// Landed card indices, grouped by facility in deck order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    landed: [SmallVec<[usize; DECK_SIZE]>; FacilityType::COUNT],
}

impl Placement {
    #[must_use]
    pub fn on(&self, facility: FacilityType) -> &[usize] {
        &self.landed[facility.index()]
    }

    #[must_use]
    pub fn count(&self, facility: FacilityType) -> usize {
        self.landed[facility.index()].len()
    }

    /// Cards that showed up anywhere this turn.
    #[must_use]
    pub fn landed_total(&self) -> usize {
        self.landed.iter().map(SmallVec::len).sum()
    }
}

/// One placement draw per card, independent across cards.
pub fn sample_turn<R: Rng + ?Sized>(cards: &[PlacementCard], rng: &mut R) -> Placement {
    let mut placement = Placement::default();
    for (index, card) in cards.iter().enumerate() {
        let weights = card.weights();
        let draw = rng.gen_range(0.0..weights.total());
        if let Some(facility) = weights.pick(draw) {
            placement.landed[facility.index()].push(index);
        }
    }
    placement
}
