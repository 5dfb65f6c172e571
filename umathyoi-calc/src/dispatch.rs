//! Off-thread calculation runs delivered as an ordered event stream.
use std::sync::mpsc;
use std::thread;

use crate::context::TrainingContext;
use crate::deck::Deck;
use crate::error::CalcError;
use crate::simulation::{
    CancellationToken, SimulationConfig, SimulationOutcome, SimulationResult, Simulator,
};

/// Owned inputs of one run.
#[derive(Debug, Clone)]
pub struct CalculationRequest {
    pub deck: Deck,
    pub context: TrainingContext,
    pub config: SimulationConfig,
}

/// Events in delivery order: `Started`, any number of `Progress`, then
/// exactly one of `Finished`, `Cancelled` or `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum CalculationEvent {
    Started,
    Progress(f32),
    Finished(SimulationResult),
    Cancelled,
    Failed(CalcError),
}

impl CalculationEvent {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_) | Self::Cancelled | Self::Failed(_))
    }
}

fn terminal_event(outcome: Result<SimulationOutcome, CalcError>) -> CalculationEvent {
    match outcome {
        Ok(SimulationOutcome::Completed(result)) => CalculationEvent::Finished(result),
        Ok(SimulationOutcome::Cancelled) => CalculationEvent::Cancelled,
        Err(err) => CalculationEvent::Failed(err),
    }
}

/// Run `request` to completion, pushing events through `emit`.
///
/// `emit` returns `false` once nobody listens; the run is then cancelled.
fn drive<E>(simulator: &Simulator, request: &CalculationRequest, cancel: &CancellationToken, mut emit: E)
where
    E: FnMut(CalculationEvent) -> bool,
{
    if !emit(CalculationEvent::Started) {
        return;
    }
    let outcome = simulator.run(
        &request.deck,
        &request.context,
        &request.config,
        |progress| {
            if !emit(CalculationEvent::Progress(progress.percent)) {
                cancel.cancel();
            }
        },
        cancel,
    );
    emit(terminal_event(outcome));
}

/// Caller side of a worker-thread run.
#[derive(Debug)]
pub struct CalculationHandle {
    events: mpsc::Receiver<CalculationEvent>,
    cancel: CancellationToken,
    worker: Option<thread::JoinHandle<()>>,
}

impl CalculationHandle {
    /// Supersede the run; the worker stops at the next trial boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub const fn events(&self) -> &mpsc::Receiver<CalculationEvent> {
        &self.events
    }

    /// Block until the terminal event and return the run outcome, dropping
    /// intermediate events.
    ///
    /// # Errors
    ///
    /// Returns the run's [`CalcError`] if it failed.
    pub fn wait(mut self) -> Result<SimulationOutcome, CalcError> {
        let mut outcome = Ok(SimulationOutcome::Cancelled);
        for event in self.events.iter() {
            match event {
                CalculationEvent::Finished(result) => {
                    outcome = Ok(SimulationOutcome::Completed(result));
                    break;
                }
                CalculationEvent::Failed(err) => {
                    outcome = Err(err);
                    break;
                }
                CalculationEvent::Cancelled => break,
                CalculationEvent::Started | CalculationEvent::Progress(_) => {}
            }
        }
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::error!("calculation worker panicked");
        }
        outcome
    }
}

/// Run `request` on a dedicated worker thread.
#[must_use]
pub fn spawn_calculation(simulator: Simulator, request: CalculationRequest) -> CalculationHandle {
    spawn_calculation_with_token(simulator, request, CancellationToken::new())
}

/// Like [`spawn_calculation`], observing a caller-owned token so one token
/// can supersede several runs.
#[must_use]
pub fn spawn_calculation_with_token(
    simulator: Simulator,
    request: CalculationRequest,
    cancel: CancellationToken,
) -> CalculationHandle {
    let (sender, events) = mpsc::channel();
    let worker_cancel = cancel.clone();
    let worker = thread::spawn(move || {
        drive(&simulator, &request, &worker_cancel, |event| {
            sender.send(event).is_ok()
        });
    });
    CalculationHandle {
        events,
        cancel,
        worker: Some(worker),
    }
}

#[cfg(feature = "async")]
pub use self::async_dispatch::{AsyncCalculationHandle, spawn_calculation_async};

#[cfg(feature = "async")]
mod async_dispatch {
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    use super::{CalculationEvent, CalculationRequest, drive};
    use crate::simulation::{CancellationToken, Simulator};

    /// Caller side of a run on tokio's blocking pool.
    #[derive(Debug)]
    pub struct AsyncCalculationHandle {
        pub events: mpsc::UnboundedReceiver<CalculationEvent>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    }

    impl AsyncCalculationHandle {
        pub fn cancel(&self) {
            self.cancel.cancel();
        }

        /// Next event, or `None` after the terminal event was taken.
        pub async fn next_event(&mut self) -> Option<CalculationEvent> {
            self.events.recv().await
        }

        /// Wait for the blocking task to exit.
        pub async fn join(self) {
            if self.task.await.is_err() {
                log::error!("calculation task panicked");
            }
        }
    }

    /// Run `request` through `tokio::task::spawn_blocking`.
    #[must_use]
    pub fn spawn_calculation_async(
        simulator: Simulator,
        request: CalculationRequest,
    ) -> AsyncCalculationHandle {
        let (sender, events) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let task = tokio::task::spawn_blocking(move || {
            drive(&simulator, &request, &worker_cancel, |event| {
                sender.send(event).is_ok()
            });
        });
        AsyncCalculationHandle {
            events,
            cancel,
            task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Card, CardId, CardType, EffectEntry, Rarity};
    use crate::effects::{EffectResolver, Milestones};
    use crate::error::ConfigError;
    use crate::scenario::Scenario;
    use std::sync::Arc;

    fn power_deck() -> Deck {
        let card = Arc::new(Card {
            id: CardId(30016),
            name: "Power Card".to_string(),
            rarity: Rarity::SSR,
            kind: CardType::Power,
            effects: vec![EffectEntry {
                id: 1,
                milestones: Milestones::new(vec![25, -1, -1, -1, -1, -1, -1, -1, -1, -1, 35]),
            }],
            unique: None,
        });
        let mut deck = Deck::new("Power");
        deck.add_card(card, 4).unwrap();
        deck
    }

    fn request(turn_count: u32) -> CalculationRequest {
        CalculationRequest {
            deck: Deck::default(),
            context: TrainingContext::default(),
            config: SimulationConfig::default().with_turn_count(turn_count),
        }
    }

    #[test]
    fn events_arrive_in_order_with_one_terminal() {
        let handle = spawn_calculation(Simulator::default(), request(100));
        let events: Vec<_> = handle.events().iter().collect();
        assert_eq!(events.first(), Some(&CalculationEvent::Started));
        assert!(matches!(events.last(), Some(CalculationEvent::Finished(_))));
        assert_eq!(events.iter().filter(|event| event.is_terminal()).count(), 1);
        let percents: Vec<f32> = events
            .iter()
            .filter_map(|event| match event {
                CalculationEvent::Progress(percent) => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents.len(), 100);
        assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn wait_returns_the_result() {
        let handle = spawn_calculation(Simulator::default(), request(50));
        let result = handle.wait().unwrap().into_result().unwrap();
        assert_eq!(result.turn_count, 50);
    }

    #[test]
    fn failures_are_delivered_as_events() {
        let handle = spawn_calculation(Simulator::default(), request(0));
        assert_eq!(
            handle.wait(),
            Err(CalcError::Config(ConfigError::ZeroTurns))
        );
    }

    #[test]
    fn cancelled_runs_end_with_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let handle = spawn_calculation_with_token(Simulator::default(), request(1000), token);
        let events: Vec<_> = handle.events().iter().collect();
        assert_eq!(
            events,
            vec![CalculationEvent::Started, CalculationEvent::Cancelled]
        );
    }

    #[test]
    fn cancelling_after_first_progress_ends_with_cancelled() {
        let mut request = request(200_000);
        request.deck = power_deck();
        request.config.progress_step_percent = 0.1;
        let handle = spawn_calculation(Simulator::default(), request);
        let mut events = Vec::new();
        let mut cancelled = false;
        for event in handle.events().iter() {
            if !cancelled && matches!(event, CalculationEvent::Progress(_)) {
                handle.cancel();
                cancelled = true;
            }
            events.push(event);
        }
        assert_eq!(events.last(), Some(&CalculationEvent::Cancelled));
        assert_eq!(events.iter().filter(|event| event.is_terminal()).count(), 1);
        let progress = events
            .iter()
            .filter(|event| matches!(event, CalculationEvent::Progress(_)))
            .count();
        assert!(progress >= 1 && progress < 1000);
    }

    #[test]
    fn concurrent_runs_share_one_resolver_cache() {
        let scenario = Arc::new(Scenario::ura_finals());
        let resolver = Arc::new(EffectResolver::new());
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let simulator = Simulator::with_resolver(Arc::clone(&scenario), Arc::clone(&resolver));
                let request = CalculationRequest {
                    deck: power_deck(),
                    context: TrainingContext::default(),
                    config: SimulationConfig::default().with_turn_count(200).with_seed(11),
                };
                spawn_calculation(simulator, request)
            })
            .collect();
        let fingerprints: Vec<u64> = handles
            .into_iter()
            .map(|handle| handle.wait().unwrap().into_result().unwrap().fingerprint())
            .collect();
        assert_eq!(fingerprints[0], fingerprints[1]);
        assert_eq!(resolver.cached_len(), 1);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn async_dispatch_streams_the_same_events() {
        let mut handle = spawn_calculation_async(Simulator::default(), request(20));
        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await {
            events.push(event);
        }
        assert_eq!(events.first(), Some(&CalculationEvent::Started));
        assert!(matches!(events.last(), Some(CalculationEvent::Finished(_))));
        handle.join().await;
    }
}
