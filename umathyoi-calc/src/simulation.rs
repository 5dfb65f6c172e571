//! Monte Carlo driver: repeated turns, aggregated per facility and stat.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use smallvec::SmallVec;
use std::hash::Hasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use twox_hash::XxHash64;

use crate::constants::{DECK_SIZE, DEFAULT_PROGRESS_STEP_PERCENT, DEFAULT_SEED, DEFAULT_TURN_COUNT};
use crate::context::TrainingContext;
use crate::deck::Deck;
use crate::dynamic::DeckProfile;
use crate::effects::EffectResolver;
use crate::error::{CalcError, CalcWarning, ConfigError};
use crate::gains::{ActiveCard, GainInputs, compute_gain};
use crate::numbers::{clamp_f64_to_f32, floor_f64_to_u32, u64_to_f64, usize_to_f64};
use crate::placement::{PlacementCard, sample_turn};
use crate::scenario::{FacilityType, Scenario, StatKind};

/// Run parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "SimulationConfig::default_turn_count")]
    pub turn_count: u32,
    #[serde(default = "SimulationConfig::default_progress_step_percent")]
    pub progress_step_percent: f32,
    #[serde(default = "SimulationConfig::default_seed")]
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            turn_count: Self::default_turn_count(),
            progress_step_percent: Self::default_progress_step_percent(),
            seed: Self::default_seed(),
        }
    }
}

impl SimulationConfig {
    const fn default_turn_count() -> u32 {
        DEFAULT_TURN_COUNT
    }

    const fn default_progress_step_percent() -> f32 {
        DEFAULT_PROGRESS_STEP_PERCENT
    }

    const fn default_seed() -> u64 {
        DEFAULT_SEED
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_turn_count(mut self, turn_count: u32) -> Self {
        self.turn_count = turn_count;
        self
    }

    /// Validate run parameters.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.turn_count == 0 {
            return Err(ConfigError::ZeroTurns);
        }
        let step = self.progress_step_percent;
        if !step.is_finite() || step <= 0.0 || step > 100.0 {
            return Err(ConfigError::ProgressStep { value: step });
        }
        Ok(())
    }

    /// Trials between two progress reports.
    fn report_interval(&self) -> u32 {
        let turns = f64::from(self.turn_count);
        let interval = (turns * f64::from(self.progress_step_percent) / 100.0).ceil();
        floor_f64_to_u32(interval).max(1)
    }
}

/// Shared cancellation flag, checked between trials.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Completed trials so far.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: u32,
    pub total: u32,
    pub percent: f32,
}

impl Progress {
    fn new(completed: u32, total: u32) -> Self {
        let percent = f64::from(completed) * 100.0 / f64::from(total.max(1));
        Self {
            completed,
            total,
            percent: clamp_f64_to_f32(percent),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulationOutcome {
    Completed(SimulationResult),
    Cancelled,
}

impl SimulationOutcome {
    #[must_use]
    pub fn into_result(self) -> Option<SimulationResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Cancelled => None,
        }
    }
}

/// Distribution summary of one stat's samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub min: u32,
    pub max: u32,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub p25: f64,
    pub p75: f64,
}

impl StatSummary {
    /// Summarize `samples`; an empty slice yields all zeros.
    #[must_use]
    pub fn from_samples(samples: &[u32]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let count = usize_to_f64(sorted.len());
        let sum: u64 = sorted.iter().map(|value| u64::from(*value)).sum();
        let mean = u64_to_f64(sum) / count;
        let variance = sorted
            .iter()
            .map(|value| {
                let delta = f64::from(*value) - mean;
                delta * delta
            })
            .sum::<f64>()
            / count;
        Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean,
            median: quantile(&sorted, 0.5),
            std_dev: variance.sqrt(),
            p25: quantile(&sorted, 0.25),
            p75: quantile(&sorted, 0.75),
        }
    }
}

/// Linear interpolation between closest ranks of sorted, non-empty data.
fn quantile(sorted: &[u32], q: f64) -> f64 {
    let rank = q * usize_to_f64(sorted.len() - 1);
    let lower = floor_f64_to_u32(rank);
    let lower_index = usize::try_from(lower).unwrap_or(0).min(sorted.len() - 1);
    let upper_index = (lower_index + 1).min(sorted.len() - 1);
    let fraction = rank - f64::from(lower);
    let low = f64::from(sorted[lower_index]);
    let high = f64::from(sorted[upper_index]);
    low + (high - low) * fraction
}

/// Samples gathered for one facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityResult {
    pub facility: FacilityType,
    /// Per-turn gains, one vector per `StatKind::ALL` entry.
    pub samples: [Vec<u32>; StatKind::COUNT],
    /// `landed[n]` counts turns on which exactly `n` cards landed here.
    pub landed: [u32; DECK_SIZE + 1],
}

impl FacilityResult {
    fn with_capacity(facility: FacilityType, turns: usize) -> Self {
        Self {
            facility,
            samples: std::array::from_fn(|_| Vec::with_capacity(turns)),
            landed: [0; DECK_SIZE + 1],
        }
    }

    #[must_use]
    pub fn samples(&self, stat: StatKind) -> &[u32] {
        &self.samples[stat.index()]
    }

    #[must_use]
    pub fn summary(&self, stat: StatKind) -> StatSummary {
        StatSummary::from_samples(self.samples(stat))
    }
}

/// Immutable output of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub seed: u64,
    pub turn_count: u32,
    /// Indexed by `FacilityType::index()`.
    pub facilities: Vec<FacilityResult>,
    pub warnings: Vec<CalcWarning>,
}

impl SimulationResult {
    #[must_use]
    pub fn facility(&self, facility: FacilityType) -> &FacilityResult {
        &self.facilities[facility.index()]
    }

    #[must_use]
    pub fn summary(&self, facility: FacilityType, stat: StatKind) -> StatSummary {
        self.facility(facility).summary(stat)
    }

    /// Stable hash of every sample, for determinism checks.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(&self.seed.to_le_bytes());
        hasher.write(&self.turn_count.to_le_bytes());
        for facility in &self.facilities {
            for samples in &facility.samples {
                for value in samples {
                    hasher.write(&value.to_le_bytes());
                }
            }
            for count in facility.landed {
                hasher.write(&count.to_le_bytes());
            }
        }
        hasher.finish()
    }
}

/// Derive an independent stream seed from the user seed and a domain tag.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        // HMAC accepts keys of any length.
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

const PLACEMENT_STREAM: &[u8] = b"placement";

/// Runs deck simulations against one scenario, sharing a resolver cache.
#[derive(Debug, Clone)]
pub struct Simulator {
    scenario: Arc<Scenario>,
    resolver: Arc<EffectResolver>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(Scenario::ura_finals())
    }
}

impl Simulator {
    #[must_use]
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario: Arc::new(scenario),
            resolver: Arc::new(EffectResolver::new()),
        }
    }

    /// Share an existing resolver cache.
    #[must_use]
    pub fn with_resolver(scenario: Arc<Scenario>, resolver: Arc<EffectResolver>) -> Self {
        Self { scenario, resolver }
    }

    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<EffectResolver> {
        &self.resolver
    }

    fn activate(&self, deck: &Deck, warnings: &mut Vec<CalcWarning>) -> Result<Vec<ActiveCard>, CalcError> {
        deck.active_slots()
            .map(|slot| -> Result<ActiveCard, CalcError> {
                let level = slot.effective_level()?;
                let resolved = self.resolver.resolve(&slot.card, level)?;
                for warning in &resolved.warnings {
                    warning.clone().record_into(warnings);
                }
                Ok(ActiveCard {
                    card: Arc::clone(&slot.card),
                    resolved,
                })
            })
            .collect()
    }

    /// Simulate `config.turn_count` independent turns.
    ///
    /// `on_progress` is called every `config.progress_step_percent` of
    /// completed trials and once at 100 %. After cancellation no further
    /// callbacks happen and partial samples are dropped.
    ///
    /// # Errors
    ///
    /// Returns a [`CalcError`] for invalid configuration, context or card
    /// data; nothing is simulated in that case.
    pub fn run<F>(
        &self,
        deck: &Deck,
        context: &TrainingContext,
        config: &SimulationConfig,
        mut on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<SimulationOutcome, CalcError>
    where
        F: FnMut(Progress),
    {
        config.validate()?;
        context.validate()?;

        let mut warnings = Vec::new();
        let active = self.activate(deck, &mut warnings)?;
        let placement_cards: Vec<PlacementCard> = active.iter().map(ActiveCard::placement).collect();
        let profile = DeckProfile::new(active.iter().map(|a| a.card.as_ref()), context);
        let inputs = GainInputs {
            scenario: &self.scenario,
            context,
            profile: &profile,
        };

        log::debug!(
            "simulating {} turns for deck '{}' ({} active cards, seed {})",
            config.turn_count,
            deck.name,
            active.len(),
            config.seed
        );

        let mut rng = ChaCha8Rng::seed_from_u64(derive_stream_seed(config.seed, PLACEMENT_STREAM));
        let turns = usize::try_from(config.turn_count).unwrap_or(usize::MAX);
        let mut facilities: Vec<FacilityResult> = FacilityType::ALL
            .into_iter()
            .map(|facility| FacilityResult::with_capacity(facility, turns))
            .collect();
        let interval = config.report_interval();

        for trial in 0..config.turn_count {
            if cancel.is_cancelled() {
                log::debug!("simulation cancelled after {trial} turns");
                return Ok(SimulationOutcome::Cancelled);
            }

            let placement = sample_turn(&placement_cards, &mut rng);
            for facility in FacilityType::ALL {
                let landed: SmallVec<[&ActiveCard; DECK_SIZE]> =
                    placement.on(facility).iter().map(|index| &active[*index]).collect();
                let gain = compute_gain(&inputs, facility, &landed, &mut warnings);
                let record = &mut facilities[facility.index()];
                for stat in StatKind::ALL {
                    record.samples[stat.index()].push(gain.gains.get(stat));
                }
                record.landed[gain.landed.min(DECK_SIZE)] += 1;
            }

            let completed = trial + 1;
            if completed % interval == 0 || completed == config.turn_count {
                on_progress(Progress::new(completed, config.turn_count));
            }
        }

        log::debug!(
            "simulation finished: {} turns, {} warnings",
            config.turn_count,
            warnings.len()
        );
        Ok(SimulationOutcome::Completed(SimulationResult {
            seed: config.seed,
            turn_count: config.turn_count,
            facilities,
            warnings,
        }))
    }
}
