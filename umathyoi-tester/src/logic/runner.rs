use anyhow::{Result, bail};
use serde::Serialize;
use std::time::{Duration, Instant};
use umathyoi_calc::numbers::{u64_to_f64, usize_to_f64};
use umathyoi_calc::{
    CalculationEvent, CalculationRequest, Deck, FacilityResult, FacilityType, SimulationConfig,
    SimulationResult, Simulator, StatKind, StatSummary, TrainingContext, spawn_calculation,
};

/// Summary of one stat on one facility.
#[derive(Debug, Clone, Serialize)]
pub struct StatReport {
    pub stat: StatKind,
    pub summary: StatSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacilityReport {
    pub facility: FacilityType,
    /// Turns on which exactly `n` cards landed, indexed by `n`.
    pub landed: Vec<u32>,
    pub mean_landed: f64,
    /// Stats the facility actually raised during the run.
    pub stats: Vec<StatReport>,
}

impl FacilityReport {
    fn from_result(result: &FacilityResult, turn_count: u32) -> Self {
        let weighted: u64 = result
            .landed
            .iter()
            .enumerate()
            .map(|(cards, turns)| u64::from(*turns) * u64::try_from(cards).unwrap_or(0))
            .sum();
        let mean_landed = if turn_count == 0 {
            0.0
        } else {
            u64_to_f64(weighted) / f64::from(turn_count)
        };
        let stats = StatKind::ALL
            .into_iter()
            .map(|stat| StatReport {
                stat,
                summary: result.summary(stat),
            })
            .filter(|report| report.summary.max > 0)
            .collect();
        Self {
            facility: result.facility,
            landed: result.landed.to_vec(),
            mean_landed,
            stats,
        }
    }

    #[must_use]
    pub fn mean(&self, stat: StatKind) -> f64 {
        self.stats
            .iter()
            .find(|report| report.stat == stat)
            .map_or(0.0, |report| report.summary.mean)
    }
}

/// One seed's run, flattened for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub seed: u64,
    pub deck: String,
    pub scenario: String,
    pub turn_count: u32,
    pub fingerprint: String,
    pub duration_ms: f64,
    pub facilities: Vec<FacilityReport>,
    pub warnings: Vec<String>,
}

impl RunReport {
    #[must_use]
    pub fn from_result(
        result: &SimulationResult,
        deck: &Deck,
        scenario: &str,
        duration: Duration,
    ) -> Self {
        Self {
            seed: result.seed,
            deck: deck.name.clone(),
            scenario: scenario.to_string(),
            turn_count: result.turn_count,
            fingerprint: format!("{:016x}", result.fingerprint()),
            duration_ms: duration.as_secs_f64() * 1000.0,
            facilities: result
                .facilities
                .iter()
                .map(|facility| FacilityReport::from_result(facility, result.turn_count))
                .collect(),
            warnings: result.warnings.iter().map(ToString::to_string).collect(),
        }
    }

    /// Facility with the highest mean total stat gain, skill points excluded.
    #[must_use]
    pub fn best_facility(&self) -> Option<&FacilityReport> {
        self.facilities.iter().max_by(|a, b| {
            total_mean(a)
                .partial_cmp(&total_mean(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

/// Sum of the facility's stat means, skill points excluded.
#[must_use]
pub fn total_mean(facility: &FacilityReport) -> f64 {
    facility
        .stats
        .iter()
        .filter(|report| !report.stat.is_skill_points())
        .map(|report| report.summary.mean)
        .sum()
}

/// Run the deck once per seed on a worker thread, forwarding progress.
///
/// # Errors
///
/// Returns an error if a run fails or ends cancelled.
pub fn run_seeds<P>(
    simulator: &Simulator,
    deck: &Deck,
    context: &TrainingContext,
    config: &SimulationConfig,
    seeds: &[u64],
    mut on_progress: P,
) -> Result<Vec<RunReport>>
where
    P: FnMut(u64, f32),
{
    let scenario = simulator.scenario().name().to_string();
    let mut reports = Vec::with_capacity(seeds.len());

    for &seed in seeds {
        let request = CalculationRequest {
            deck: deck.clone(),
            context: context.clone(),
            config: config.clone().with_seed(seed),
        };
        let start = Instant::now();
        let handle = spawn_calculation(simulator.clone(), request);

        let mut finished = None;
        for event in handle.events().iter() {
            match event {
                CalculationEvent::Started => log::debug!("seed {seed}: started"),
                CalculationEvent::Progress(percent) => on_progress(seed, percent),
                CalculationEvent::Finished(result) => {
                    finished = Some(result);
                    break;
                }
                CalculationEvent::Cancelled => bail!("Run for seed {seed} was cancelled"),
                CalculationEvent::Failed(err) => {
                    return Err(anyhow::Error::new(err).context(format!("Run for seed {seed} failed")));
                }
            }
        }
        let Some(result) = finished else {
            bail!("Run for seed {seed} ended without a result");
        };

        let report = RunReport::from_result(&result, deck, &scenario, start.elapsed());
        log::info!(
            "seed {seed}: {} turns in {:.1} ms",
            report.turn_count,
            report.duration_ms
        );
        reports.push(report);
    }

    Ok(reports)
}

/// Mean of `value` across runs, zero for no runs.
#[must_use]
pub fn average<F>(reports: &[RunReport], value: F) -> f64
where
    F: Fn(&RunReport) -> f64,
{
    if reports.is_empty() {
        return 0.0;
    }
    reports.iter().map(value).sum::<f64>() / usize_to_f64(reports.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(turns: u32) -> SimulationConfig {
        SimulationConfig::default().with_turn_count(turns)
    }

    #[test]
    fn empty_deck_reports_base_gains() {
        let simulator = Simulator::default();
        let reports = run_seeds(
            &simulator,
            &Deck::default(),
            &TrainingContext::default(),
            &config(20),
            &[1, 2],
            |_, _| {},
        )
        .unwrap();
        assert_eq!(reports.len(), 2);
        for report in &reports {
            assert_eq!(report.facilities.len(), FacilityType::COUNT);
            let speed = &report.facilities[FacilityType::Speed.index()];
            assert!(speed.mean_landed.abs() < f64::EPSILON);
            assert_eq!(speed.landed[0], 20);
            let expected = simulator
                .scenario()
                .base_gain(FacilityType::Speed, 3)
                .get(StatKind::Speed);
            assert!((speed.mean(StatKind::Speed) - f64::from(expected)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn progress_reaches_completion_per_seed() {
        let mut last = Vec::new();
        run_seeds(
            &Simulator::default(),
            &Deck::default(),
            &TrainingContext::default(),
            &config(10),
            &[5],
            |seed, percent| last.push((seed, percent)),
        )
        .unwrap();
        assert_eq!(last.last().map(|(seed, _)| *seed), Some(5));
        assert!(last.last().is_some_and(|(_, percent)| (*percent - 100.0).abs() < f32::EPSILON));
    }

    #[test]
    fn failures_carry_the_seed() {
        let err = run_seeds(
            &Simulator::default(),
            &Deck::default(),
            &TrainingContext::default(),
            &config(0),
            &[9],
            |_, _| {},
        )
        .unwrap_err();
        assert!(err.to_string().contains("seed 9"));
    }

    #[test]
    fn average_handles_empty_input() {
        assert!(average(&[], |report| f64::from(report.turn_count)).abs() < f64::EPSILON);
    }
}
