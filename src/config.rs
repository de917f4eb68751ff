use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::histogram::Buckets;

/// Terms applied to every borrower loaded from the record source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LendingTerms {
    /// Multiplicative uplift on PD: default iff draw ≤ pd × (1 + pd_buffer).
    pub pd_buffer: f64,
    /// Multiplicative uplift on monthly risk-rate income.
    pub risk_rate_buffer: f64,
    /// Months over which post-default recovery is spread.
    pub recovery_period: u32,
    /// Exposure-at-default multiplier. Carried on every borrower; no derived
    /// quantity reads it yet.
    pub exposure_at_default: f64,
}

impl Default for LendingTerms {
    fn default() -> Self {
        LendingTerms {
            pd_buffer: 0.0,
            risk_rate_buffer: 0.0,
            recovery_period: 6,
            exposure_at_default: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One generator seeded from `seed`, trials run back to back.
    Sequential,
    /// Fixed-size trial chunks on the rayon pool; chunk `k` draws from its own
    /// generator seeded with `seed + k`.
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub trials: u64,
    /// Horizon length in months.
    pub months: u32,
    /// Candidate starting fund values, in report order.
    pub fund_values: Vec<f64>,
    /// Histogram bucket width (currency units).
    pub bucket_width: f64,
    /// Upper bound of the pre-sized bucket range; there are
    /// `floor(bucket_bound / bucket_width)` non-negative buckets.
    pub bucket_bound: f64,
    pub terms: LendingTerms,
    pub mode: ExecutionMode,
    /// Trials per parallel work unit. Part of the reproducibility contract:
    /// the same seed and chunk size give the same histograms on any pool size.
    pub chunk_size: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl SimulationConfig {
    pub const DEFAULT_STARTING_FUND_VALUE: f64 = 1_000_000.0;
    pub const DEFAULT_FUND_VALUE_STEP: f64 = 100_000.0;

    pub fn canonical() -> Self {
        // Ten candidate balances: 1.0M, 1.1M, … 1.9M.
        let fund_values = (0..10)
            .map(|i| Self::DEFAULT_STARTING_FUND_VALUE + i as f64 * Self::DEFAULT_FUND_VALUE_STEP)
            .collect();

        SimulationConfig {
            seed: 42,
            trials: 6_000,
            months: 12,
            fund_values,
            bucket_width: 100_000.0,
            bucket_bound: 6_000_000.0,
            terms: LendingTerms::default(),
            mode: ExecutionMode::Parallel,
            chunk_size: 500,
        }
    }

    /// Load a JSON config file. Missing fields take their canonical values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: SimulationConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of non-negative histogram buckets.
    pub fn bucket_count(&self) -> usize {
        (self.bucket_bound / self.bucket_width).floor() as usize
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SimError::InvalidConfig(msg));

        if self.trials == 0 {
            return invalid("trials must be positive".into());
        }
        if self.months == 0 {
            return invalid("months must be positive".into());
        }
        if self.fund_values.is_empty() {
            return invalid("at least one starting fund value is required".into());
        }
        if let Some(f) = self.fund_values.iter().find(|f| !f.is_finite()) {
            return invalid(format!("fund value {f} is not finite"));
        }
        if !(self.bucket_width.is_finite() && self.bucket_width > 0.0) {
            return invalid(format!("bucket_width must be positive, got {}", self.bucket_width));
        }
        if !self.bucket_bound.is_finite() || self.bucket_bound < self.bucket_width {
            return invalid(format!(
                "bucket_bound {} must be at least bucket_width {}",
                self.bucket_bound, self.bucket_width
            ));
        }
        if self.bucket_bound / self.bucket_width > Buckets::MAX_COUNT as f64 {
            return invalid(format!(
                "bucket_bound / bucket_width = {} exceeds the {} bucket limit",
                self.bucket_bound / self.bucket_width,
                Buckets::MAX_COUNT
            ));
        }
        if self.chunk_size == 0 {
            return invalid("chunk_size must be positive".into());
        }
        if self.terms.recovery_period == 0 {
            return invalid("recovery_period must be at least one month".into());
        }
        if !self.terms.pd_buffer.is_finite() || !self.terms.risk_rate_buffer.is_finite() {
            return invalid("buffers must be finite".into());
        }
        if !self.terms.exposure_at_default.is_finite() {
            return invalid("exposure_at_default must be finite".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_matches_documented_defaults() {
        let c = SimulationConfig::canonical();
        assert_eq!(c.trials, 6_000);
        assert_eq!(c.months, 12);
        assert_eq!(c.terms.recovery_period, 6);
        assert_eq!(c.terms.pd_buffer, 0.0);
        assert_eq!(c.terms.risk_rate_buffer, 0.0);
        assert_eq!(c.terms.exposure_at_default, 2.0);
        assert_eq!(c.bucket_width, 100_000.0);
        assert_eq!(c.bucket_bound, 6_000_000.0);
        assert_eq!(c.bucket_count(), 60);
        assert_eq!(c.fund_values.len(), 10);
        assert_eq!(c.fund_values[0], 1_000_000.0);
        assert_eq!(c.fund_values[9], 1_900_000.0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_canonical_values() {
        let c: SimulationConfig =
            serde_json::from_str(r#"{ "trials": 10, "terms": { "pd_buffer": 0.5 } }"#).unwrap();
        assert_eq!(c.trials, 10);
        assert_eq!(c.months, 12);
        assert_eq!(c.terms.pd_buffer, 0.5);
        assert_eq!(c.terms.recovery_period, 6);
        assert_eq!(c.mode, ExecutionMode::Parallel);
    }

    #[test]
    fn mode_parses_snake_case() {
        let c: SimulationConfig = serde_json::from_str(r#"{ "mode": "sequential" }"#).unwrap();
        assert_eq!(c.mode, ExecutionMode::Sequential);
    }

    #[test]
    fn validate_rejects_degenerate_values() {
        let cases: Vec<(&str, Box<dyn Fn(&mut SimulationConfig)>)> = vec![
            ("zero trials", Box::new(|c| c.trials = 0)),
            ("zero months", Box::new(|c| c.months = 0)),
            ("no fund values", Box::new(|c| c.fund_values.clear())),
            ("nan fund value", Box::new(|c| c.fund_values.push(f64::NAN))),
            ("zero width", Box::new(|c| c.bucket_width = 0.0)),
            ("bound below width", Box::new(|c| c.bucket_bound = 50_000.0)),
            ("too many buckets", Box::new(|c| c.bucket_width = 1e-300)),
            ("just over bucket limit", Box::new(|c| c.bucket_width = c.bucket_bound / 1_000_001.0)),
            ("zero chunk", Box::new(|c| c.chunk_size = 0)),
            ("zero recovery", Box::new(|c| c.terms.recovery_period = 0)),
            ("infinite buffer", Box::new(|c| c.terms.pd_buffer = f64::INFINITY)),
        ];
        for (name, mutate) in cases {
            let mut c = SimulationConfig::canonical();
            mutate(&mut c);
            assert!(
                matches!(c.validate(), Err(SimError::InvalidConfig(_))),
                "{name}: expected InvalidConfig"
            );
        }
    }

    #[test]
    fn bucket_limit_is_inclusive() {
        let c = SimulationConfig { bucket_width: 6.0, ..SimulationConfig::canonical() };
        assert_eq!(c.bucket_count(), Buckets::MAX_COUNT);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let err = SimulationConfig::from_json_file("/nonexistent/lendsim.json").unwrap_err();
        assert!(matches!(err, SimError::Io(_)), "got {err:?}");
    }
}
