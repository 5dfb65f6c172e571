//! Validated card catalog built from JSON card records.
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::card::{Card, CardId};
use crate::error::DataError;

/// Failure to turn raw JSON into validated data.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Data(#[from] DataError),
}

/// Validated, immutable card records keyed by id.
#[derive(Debug, Clone, Default)]
pub struct CardCatalog {
    cards: BTreeMap<CardId, Arc<Card>>,
}

impl CardCatalog {
    /// Create an empty catalog (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON array of card records
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or any card fails
    /// validation.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let cards: Vec<Card> = serde_json::from_str(json)?;
        Ok(Self::from_cards(cards)?)
    }

    /// Build a catalog from pre-parsed cards, validating each one
    ///
    /// # Errors
    ///
    /// Returns the first invalid card's [`DataError`], or
    /// [`DataError::DuplicateCard`] when an id repeats.
    pub fn from_cards(cards: Vec<Card>) -> Result<Self, DataError> {
        let mut catalog = Self::empty();
        for card in cards {
            card.validate()?;
            let card_id = card.id;
            if catalog.cards.insert(card_id, Arc::new(card)).is_some() {
                return Err(DataError::DuplicateCard { card_id });
            }
        }
        log::debug!("card catalog holds {} records", catalog.cards.len());
        Ok(catalog)
    }

    #[must_use]
    pub fn get(&self, card_id: CardId) -> Option<Arc<Card>> {
        self.cards.get(&card_id).cloned()
    }

    /// Like [`CardCatalog::get`] but reports a missing id as a data error.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnknownCard`] when the id is absent.
    pub fn require(&self, card_id: CardId) -> Result<Arc<Card>, DataError> {
        self.get(card_id).ok_or(DataError::UnknownCard { card_id })
    }

    /// Cards whose name contains `needle`, case-insensitive, in id order.
    pub fn search<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = &'a Arc<Card>> + 'a {
        let needle = needle.to_lowercase();
        self.cards
            .values()
            .filter(move |card| card.name.to_lowercase().contains(&needle))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Card>> {
        self.cards.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARDS: &str = r#"[
        {"id": 30028, "name": "Kitasan Black", "rarity": "SSR", "type": "speed",
         "effects": [[1, 20, -1, -1, -1, -1, -1, -1, -1, -1, -1, 35]]},
        {"id": 10001, "name": "Special Week", "rarity": "R", "type": "guts",
         "effects": [[8, 5, -1, -1, -1, -1, -1, -1, -1, 10, -1, -1]]}
    ]"#;

    #[test]
    fn loads_and_indexes_cards() {
        let catalog = CardCatalog::from_json(CARDS).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(CardId(10001)).unwrap().name, "Special Week");
        let ids: Vec<_> = catalog.iter().map(|card| card.id).collect();
        assert_eq!(ids, vec![CardId(10001), CardId(30028)]);
        assert_eq!(catalog.search("kitasan").count(), 1);
        assert!(matches!(
            catalog.require(CardId(1)),
            Err(DataError::UnknownCard { .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut cards: Vec<Card> = serde_json::from_str(CARDS).unwrap();
        cards.push(cards[0].clone());
        assert_eq!(
            CardCatalog::from_cards(cards).unwrap_err(),
            DataError::DuplicateCard {
                card_id: CardId(30028)
            }
        );
    }

    #[test]
    fn invalid_cards_fail_the_whole_load() {
        let json = r#"[{"id": 5, "name": "Broken", "rarity": "SR", "type": "wit",
            "effects": [[1, 5, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1]]}]"#;
        assert!(matches!(
            CardCatalog::from_json(json),
            Err(LoadError::Data(DataError::MissingMilestone { level: 45, .. }))
        ));
        assert!(matches!(
            CardCatalog::from_json("{"),
            Err(LoadError::Parse(_))
        ));
    }
}
