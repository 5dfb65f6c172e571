//! Umathyoi efficiency calculator
//!
//! Platform-agnostic simulation core estimating the stat and skill-point
//! yield of a six-card support deck. This crate never touches files,
//! threads of a UI toolkit, or the network; callers hand data in through
//! [`DataLoader`].

pub mod card;
pub mod constants;
pub mod context;
pub mod data;
pub mod deck;
pub mod dispatch;
pub mod dynamic;
pub mod effects;
pub mod error;
pub mod gains;
pub mod numbers;
pub mod placement;
pub mod scenario;
pub mod simulation;

// Re-export commonly used types
pub use card::{Card, CardId, CardType, EffectEntry, Rarity, UniqueBlock, UniqueEffect};
pub use context::{Growth, Mood, TrainingContext};
pub use data::{CardCatalog, LoadError};
pub use deck::{Deck, DeckSlot, DeckSpec, SlotSpec};
pub use dispatch::{
    CalculationEvent, CalculationHandle, CalculationRequest, spawn_calculation,
    spawn_calculation_with_token,
};
#[cfg(feature = "async")]
pub use dispatch::{AsyncCalculationHandle, spawn_calculation_async};
pub use dynamic::{DeckProfile, DynamicKind};
pub use effects::{EffectResolver, EffectValues, Milestones, NormalEffect, ResolvedEffects};
pub use error::{CalcError, CalcWarning, ConfigError, ContextError, DataError, DeckError};
pub use gains::{FacilityGain, Modifier, compute_gain};
pub use placement::{Placement, PlacementCard, sample_turn};
pub use scenario::{FacilityType, Scenario, StatKind, StatLine};
pub use simulation::{
    CancellationToken, FacilityResult, Progress, SimulationConfig, SimulationOutcome,
    SimulationResult, Simulator, StatSummary,
};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the validated support card catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the card data cannot be loaded or fails validation.
    fn load_cards(&self) -> Result<CardCatalog, Self::Error>;

    /// Load a scenario by name
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario is unknown or malformed.
    fn load_scenario(&self, name: &str) -> Result<Scenario, Self::Error>;

    /// Load a caller-side document such as a deck or training context
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Ties a [`DataLoader`] to simulators and deck construction
pub struct CalculatorEngine<L>
where
    L: DataLoader,
{
    data_loader: L,
}

impl<L> CalculatorEngine<L>
where
    L: DataLoader,
{
    /// Create a new engine with the provided data loader
    pub const fn new(data_loader: L) -> Self {
        Self { data_loader }
    }

    #[must_use]
    pub const fn loader(&self) -> &L {
        &self.data_loader
    }

    /// Build a simulator for the named scenario
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario cannot be loaded.
    pub fn simulator(&self, scenario_name: &str) -> Result<Simulator, L::Error> {
        let scenario = self.data_loader.load_scenario(scenario_name)?;
        Ok(Simulator::new(scenario))
    }

    /// Load the catalog and build the deck described by `deck_name`
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the deck references unknown
    /// cards or breaks deck rules.
    pub fn load_deck(&self, deck_name: &str) -> Result<(CardCatalog, Deck), anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
    {
        let catalog = self.data_loader.load_cards().map_err(Into::into)?;
        let spec: DeckSpec = self.data_loader.load_config(deck_name).map_err(Into::into)?;
        let deck = spec.build(&catalog)?;
        Ok((catalog, deck))
    }

    /// Run one calculation end to end on the calling thread
    ///
    /// # Errors
    ///
    /// Returns an error if any input cannot be loaded or the run fails.
    pub fn calculate<F>(
        &self,
        scenario_name: &str,
        deck: &Deck,
        context: &TrainingContext,
        config: &SimulationConfig,
        on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<SimulationOutcome, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
        F: FnMut(Progress),
    {
        let simulator = self.simulator(scenario_name).map_err(Into::into)?;
        Ok(simulator.run(deck, context, config, on_progress, cancel)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;
    use std::collections::HashMap;

    #[derive(Debug, thiserror::Error)]
    enum FixtureError {
        #[error("no document named {0}")]
        Missing(String),
        #[error(transparent)]
        Load(#[from] LoadError),
        #[error(transparent)]
        Json(#[from] serde_json::Error),
    }

    #[derive(Default)]
    struct FixtureLoader {
        documents: HashMap<String, String>,
    }

    impl DataLoader for FixtureLoader {
        type Error = FixtureError;

        fn load_cards(&self) -> Result<CardCatalog, Self::Error> {
            let json = self
                .documents
                .get("cards")
                .ok_or_else(|| FixtureError::Missing("cards".to_string()))?;
            Ok(CardCatalog::from_json(json)?)
        }

        fn load_scenario(&self, name: &str) -> Result<Scenario, Self::Error> {
            if name == constants::URA_FINALS_NAME {
                return Ok(Scenario::ura_finals());
            }
            Err(FixtureError::Missing(name.to_string()))
        }

        fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
        where
            T: DeserializeOwned,
        {
            let json = self
                .documents
                .get(config_name)
                .ok_or_else(|| FixtureError::Missing(config_name.to_string()))?;
            Ok(serde_json::from_str(json)?)
        }
    }

    fn loader() -> FixtureLoader {
        let mut documents = HashMap::new();
        documents.insert(
            "cards".to_string(),
            r#"[{"id": 30016, "name": "Power Card", "rarity": "SSR", "type": "power",
                "effects": [[1, 25, -1, -1, -1, -1, -1, -1, -1, -1, -1, 35],
                            [19, 50, -1, -1, -1, -1, -1, -1, -1, -1, -1, 80]]}]"#
                .to_string(),
        );
        documents.insert(
            "deck".to_string(),
            r#"{"name": "Power", "slots": [{"card": 30016}]}"#.to_string(),
        );
        FixtureLoader { documents }
    }

    #[test]
    fn engine_builds_deck_and_runs() {
        let engine = CalculatorEngine::new(loader());
        let (catalog, deck) = engine.load_deck("deck").unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(deck.card_count(), 1);

        let config = SimulationConfig::default().with_turn_count(100);
        let outcome = engine
            .calculate(
                constants::URA_FINALS_NAME,
                &deck,
                &TrainingContext::default(),
                &config,
                |_| {},
                &CancellationToken::new(),
            )
            .unwrap();
        let result = outcome.into_result().unwrap();
        assert_eq!(result.turn_count, 100);
        assert_eq!(result.facilities.len(), 5);
    }

    #[test]
    fn unknown_scenario_surfaces_loader_error() {
        let engine = CalculatorEngine::new(loader());
        assert!(matches!(
            engine.simulator("Grand Live"),
            Err(FixtureError::Missing(_))
        ));
        assert!(engine.load_deck("missing").is_err());
    }
}
