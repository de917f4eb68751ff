use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::borrower::Borrower;
use crate::cashflow;
use crate::config::{ExecutionMode, SimulationConfig};
use crate::error::{Result, SimError};
use crate::histogram::{BucketLabel, Buckets, Extremes, FundValueHistograms};
use crate::sampler::{DefaultSampler, TrialState};

/// Minimum and final fund value of one trial for the tracked fund value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialOutcome {
    /// 0-based trial number.
    pub trial: u64,
    pub min_value: f64,
    pub final_value: f64,
}

/// Everything a completed run hands to the report sinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub trials: u64,
    pub months: u32,
    pub buckets: Buckets,
    /// Column order shared by every histogram row.
    pub labels: Vec<BucketLabel>,
    /// One entry per configured fund value, in configured order.
    pub histograms: Vec<FundValueHistograms>,
    /// Fund value whose per-trial outcomes were kept, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracked_fund_value: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<TrialOutcome>,
}

impl SimulationResult {
    pub fn for_fund_value(&self, fund_value: f64) -> Option<&FundValueHistograms> {
        self.histograms.iter().find(|h| h.fund_value == fund_value)
    }
}

/// Partial results of a run of consecutive trials.
#[derive(Debug, Clone)]
struct Tally {
    trials: u64,
    histograms: Vec<FundValueHistograms>,
    outcomes: Vec<TrialOutcome>,
}

impl Tally {
    fn merge(mut self, other: Tally) -> Tally {
        self.trials += other.trials;
        for (mine, theirs) in self.histograms.iter_mut().zip(&other.histograms) {
            mine.merge(theirs);
        }
        self.outcomes.extend(other.outcomes);
        self
    }
}

/// Monte Carlo driver: samples defaults, projects monthly cashflows, and
/// buckets minimum and final fund values for every candidate starting
/// balance.
///
/// Borrowers are shared read-only. Every trial sequence owns its
/// [`TrialState`], generator and partial histograms, so trials never observe
/// each other's defaults.
pub struct Simulation {
    borrowers: Vec<Borrower>,
    config: SimulationConfig,
    sampler: DefaultSampler,
    buckets: Buckets,
    tracked: Option<usize>,
}

impl Simulation {
    pub fn new(config: SimulationConfig, borrowers: Vec<Borrower>) -> Result<Self> {
        config.validate()?;
        let sampler = DefaultSampler::new(config.months)?;
        let buckets = Buckets::new(config.bucket_width, config.bucket_bound);
        Ok(Simulation { borrowers, config, sampler, buckets, tracked: None })
    }

    /// Keep the per-trial outcome of the fund value at `index` in
    /// `config.fund_values`.
    pub fn with_trial_outcomes(mut self, index: usize) -> Result<Self> {
        if index >= self.config.fund_values.len() {
            return Err(SimError::InvalidConfig(format!(
                "fund value index {index} out of range (have {})",
                self.config.fund_values.len()
            )));
        }
        self.tracked = Some(index);
        Ok(self)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn borrowers(&self) -> &[Borrower] {
        &self.borrowers
    }

    /// Run every configured trial in the configured execution mode.
    pub fn run(&self) -> SimulationResult {
        info!(
            trials = self.config.trials,
            months = self.config.months,
            borrowers = self.borrowers.len(),
            fund_values = self.config.fund_values.len(),
            mode = ?self.config.mode,
            seed = self.config.seed,
            "starting simulation"
        );
        let tally = match self.config.mode {
            ExecutionMode::Sequential => {
                let mut rng = ChaCha20Rng::seed_from_u64(self.config.seed);
                self.run_chunk(0, self.config.trials, &mut rng)
            }
            ExecutionMode::Parallel => self.run_parallel(),
        };
        let result = self.finish(tally);
        info!(trials = result.trials, "simulation complete");
        result
    }

    /// Run every configured trial sequentially on a caller-supplied generator.
    pub fn run_with_rng(&self, rng: &mut impl Rng) -> SimulationResult {
        let tally = self.run_chunk(0, self.config.trials, rng);
        self.finish(tally)
    }

    /// Project one trial's cumulative net result series for a scripted
    /// `state`, which must hold one slot per borrower.
    pub fn project(&self, state: &TrialState) -> Result<Vec<f64>> {
        if state.len() != self.borrowers.len() {
            return Err(SimError::TrialStateMismatch {
                borrowers: self.borrowers.len(),
                state: state.len(),
            });
        }
        Ok(self.cumulative(state))
    }

    fn cumulative(&self, state: &TrialState) -> Vec<f64> {
        cashflow::cumulative(&cashflow::net_results(&self.borrowers, state, self.config.months))
    }

    fn run_parallel(&self) -> Tally {
        let chunk_size = self.config.chunk_size;
        let chunks = self.config.trials.div_ceil(chunk_size);
        (0..chunks)
            .into_par_iter()
            .map(|k| {
                let first = k * chunk_size;
                let count = chunk_size.min(self.config.trials - first);
                let mut rng = ChaCha20Rng::seed_from_u64(self.config.seed.wrapping_add(k));
                let tally = self.run_chunk(first, count, &mut rng);
                debug!(chunk = k, first_trial = first, trials = count, "chunk complete");
                tally
            })
            .reduce(|| self.empty_tally(), Tally::merge)
    }

    fn empty_tally(&self) -> Tally {
        Tally {
            trials: 0,
            histograms: self
                .config
                .fund_values
                .iter()
                .map(|&f| FundValueHistograms::new(f, &self.buckets))
                .collect(),
            outcomes: Vec::new(),
        }
    }

    /// SAMPLE → PROJECT → AGGREGATE → EVALUATE → COUNT for trials
    /// `first..first + count`.
    fn run_chunk(&self, first: u64, count: u64, rng: &mut impl Rng) -> Tally {
        let mut tally = self.empty_tally();
        let mut state = TrialState::new(self.borrowers.len());

        for trial in first..first + count {
            self.sampler.sample(&self.borrowers, rng, &mut state);
            let cumulative = self.cumulative(&state);

            for (i, histograms) in tally.histograms.iter_mut().enumerate() {
                let extremes = histograms.record_series(&self.buckets, &cumulative);
                if self.tracked == Some(i)
                    && let Some(Extremes { min_value, final_value }) = extremes
                {
                    tally.outcomes.push(TrialOutcome { trial, min_value, final_value });
                }
            }
            tally.trials += 1;
        }
        tally
    }

    fn finish(&self, mut tally: Tally) -> SimulationResult {
        tally.outcomes.sort_by_key(|o| o.trial);
        SimulationResult {
            trials: tally.trials,
            months: self.config.months,
            buckets: self.buckets,
            labels: self.buckets.labels(),
            histograms: tally.histograms,
            tracked_fund_value: self.tracked.map(|i| self.config.fund_values[i]),
            outcomes: tally.outcomes,
        }
    }
}
