//! Six-slot support decks.
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::card::{Card, CardId};
use crate::constants::{DECK_SIZE, MAX_LIMIT_BREAK};
use crate::data::CardCatalog;
use crate::error::{CalcError, DataError, DeckError};

/// An occupied deck slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckSlot {
    pub card: Arc<Card>,
    pub limit_break: u8,
    pub muted: bool,
    /// Raw card level; `None` means the limit break cap.
    pub level: Option<u8>,
}

impl DeckSlot {
    #[must_use]
    pub const fn new(card: Arc<Card>, limit_break: u8) -> Self {
        Self {
            card,
            limit_break,
            muted: false,
            level: None,
        }
    }

    /// Level used for interpolation, always within `1..=limit break cap`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidLimitBreak`] for a tier above 4.
    pub fn effective_level(&self) -> Result<u8, DataError> {
        let cap = self.card.max_level_at(self.limit_break)?;
        Ok(self.level.map_or(cap, |level| level.clamp(1, cap)))
    }
}

/// Exactly [`DECK_SIZE`] slots, each optionally occupied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub name: String,
    slots: [Option<DeckSlot>; DECK_SIZE],
}

impl Default for Deck {
    fn default() -> Self {
        Self::new("New Deck")
    }
}

impl Deck {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Default::default(),
        }
    }

    fn check_index(index: usize) -> Result<(), DeckError> {
        if index < DECK_SIZE {
            Ok(())
        } else {
            Err(DeckError::SlotOutOfRange {
                index,
                size: DECK_SIZE,
            })
        }
    }

    const fn check_limit_break(limit_break: u8) -> Result<(), DeckError> {
        if limit_break > MAX_LIMIT_BREAK {
            return Err(DeckError::LimitBreak {
                limit_break,
                max: MAX_LIMIT_BREAK,
            });
        }
        Ok(())
    }

    /// Place `card` in the first empty slot and return its index.
    ///
    /// # Errors
    ///
    /// Fails when the card is already present, the deck is full, or the
    /// limit break is out of range.
    pub fn add_card(&mut self, card: Arc<Card>, limit_break: u8) -> Result<usize, DeckError> {
        let index = self.first_empty_slot().ok_or(DeckError::Full)?;
        self.add_card_at_slot(index, card, limit_break)?;
        Ok(index)
    }

    /// Place `card` at `index`.
    ///
    /// # Errors
    ///
    /// Fails when the slot is out of range or occupied, the card is already
    /// present, or the limit break is out of range.
    pub fn add_card_at_slot(
        &mut self,
        index: usize,
        card: Arc<Card>,
        limit_break: u8,
    ) -> Result<(), DeckError> {
        Self::check_index(index)?;
        Self::check_limit_break(limit_break)?;
        if self.contains(card.id) {
            return Err(DeckError::AlreadyInDeck { card_id: card.id });
        }
        if self.slots[index].is_some() {
            return Err(DeckError::SlotOccupied { index });
        }
        self.slots[index] = Some(DeckSlot::new(card, limit_break));
        Ok(())
    }

    pub fn remove_card_at_slot(&mut self, index: usize) -> Option<DeckSlot> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Remove the card with `card_id`, returning the slot it occupied.
    pub fn remove_card_by_id(&mut self, card_id: CardId) -> Option<usize> {
        let index = self.position(card_id)?;
        self.slots[index] = None;
        Some(index)
    }

    fn occupied_mut(&mut self, index: usize) -> Result<&mut DeckSlot, DeckError> {
        Self::check_index(index)?;
        self.slots[index]
            .as_mut()
            .ok_or(DeckError::SlotEmpty { index })
    }

    /// # Errors
    ///
    /// Fails on empty or out-of-range slots and tiers above 4.
    pub fn set_limit_break_at_slot(&mut self, index: usize, limit_break: u8) -> Result<(), DeckError> {
        Self::check_limit_break(limit_break)?;
        self.occupied_mut(index)?.limit_break = limit_break;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails on empty or out-of-range slots.
    pub fn set_muted(&mut self, index: usize, muted: bool) -> Result<(), DeckError> {
        self.occupied_mut(index)?.muted = muted;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails on empty or out-of-range slots.
    pub fn set_level(&mut self, index: usize, level: Option<u8>) -> Result<(), DeckError> {
        self.occupied_mut(index)?.level = level;
        Ok(())
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&DeckSlot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn first_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    #[must_use]
    pub fn position(&self, card_id: CardId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|slot| slot.card.id == card_id))
    }

    #[must_use]
    pub fn contains(&self, card_id: CardId) -> bool {
        self.position(card_id).is_some()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
    }

    /// Occupied slots with their index, in slot order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &DeckSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|slot| (index, slot)))
    }

    /// Occupied, unmuted slots: the cards that take part in a calculation.
    pub fn active_slots(&self) -> impl Iterator<Item = &DeckSlot> {
        self.occupied()
            .map(|(_, slot)| slot)
            .filter(|slot| !slot.muted)
    }
}

/// Serialized deck: card ids plus per-slot settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSpec {
    #[serde(default = "DeckSpec::default_name")]
    pub name: String,
    #[serde(default)]
    pub slots: Vec<SlotSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub card: CardId,
    #[serde(default = "SlotSpec::default_limit_break")]
    pub limit_break: u8,
    #[serde(default)]
    pub muted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
}

impl SlotSpec {
    const fn default_limit_break() -> u8 {
        MAX_LIMIT_BREAK
    }
}

impl DeckSpec {
    fn default_name() -> String {
        "New Deck".to_string()
    }

    /// Resolve card ids against `catalog` and fill slots in order.
    ///
    /// # Errors
    ///
    /// Returns a data error for unknown ids and a deck error for invalid
    /// edits (duplicates, more than six cards, bad limit breaks).
    pub fn build(&self, catalog: &CardCatalog) -> Result<Deck, CalcError> {
        let mut deck = Deck::new(self.name.clone());
        for spec in &self.slots {
            let card = catalog.require(spec.card)?;
            let index = deck.add_card(card, spec.limit_break)?;
            deck.set_muted(index, spec.muted)?;
            deck.set_level(index, spec.level)?;
        }
        Ok(deck)
    }
}

impl From<&Deck> for DeckSpec {
    fn from(deck: &Deck) -> Self {
        Self {
            name: deck.name.clone(),
            slots: deck
                .occupied()
                .map(|(_, slot)| SlotSpec {
                    card: slot.card.id,
                    limit_break: slot.limit_break,
                    muted: slot.muted,
                    level: slot.level,
                })
                .collect(),
        }
    }
}
