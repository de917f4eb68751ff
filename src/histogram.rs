use std::fmt;

use serde::{Serialize, Serializer};

/// Column label of a histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketLabel {
    /// Any outcome below zero.
    Negative,
    /// Non-negative outcome `v` with `floor(v / width) == n`.
    Index(usize),
}

impl fmt::Display for BucketLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketLabel::Negative => f.write_str("<0"),
            BucketLabel::Index(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for BucketLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Bucket geometry shared by every histogram of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Buckets {
    pub width: f64,
    pub count: usize,
}

impl Buckets {
    /// Largest non-negative bucket count a run may pre-size.
    pub const MAX_COUNT: usize = 1_000_000;

    pub fn new(width: f64, bound: f64) -> Self {
        Buckets { width, count: ((bound / width).floor() as usize).max(1) }
    }

    /// Bucket for `value`. Values past the pre-sized range clamp into the last
    /// bucket.
    pub fn label_for(&self, value: f64) -> BucketLabel {
        if value < 0.0 {
            BucketLabel::Negative
        } else {
            let index = (value / self.width).floor() as usize;
            BucketLabel::Index(index.min(self.count - 1))
        }
    }

    /// Canonical column order: `"<0"`, then `0..count`.
    pub fn labels(&self) -> Vec<BucketLabel> {
        std::iter::once(BucketLabel::Negative)
            .chain((0..self.count).map(BucketLabel::Index))
            .collect()
    }
}

/// Trial counts per bucket, `"<0"` held apart from the dense non-negative
/// range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    negative: u64,
    counts: Vec<u64>,
}

impl Histogram {
    pub fn new(buckets: &Buckets) -> Self {
        Histogram { negative: 0, counts: vec![0; buckets.count] }
    }

    pub fn record(&mut self, label: BucketLabel) {
        match label {
            BucketLabel::Negative => self.negative += 1,
            BucketLabel::Index(i) => self.counts[i] += 1,
        }
    }

    pub fn count(&self, label: BucketLabel) -> u64 {
        match label {
            BucketLabel::Negative => self.negative,
            BucketLabel::Index(i) => self.counts.get(i).copied().unwrap_or(0),
        }
    }

    pub fn negative(&self) -> u64 {
        self.negative
    }

    pub fn non_negative(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn total(&self) -> u64 {
        self.negative + self.non_negative()
    }

    /// Counts in [`Buckets::labels`] order.
    pub fn row(&self) -> impl Iterator<Item = u64> + '_ {
        std::iter::once(self.negative).chain(self.counts.iter().copied())
    }

    /// Element-wise sum. Both histograms must share the same geometry.
    pub fn merge(&mut self, other: &Histogram) {
        debug_assert_eq!(self.counts.len(), other.counts.len(), "bucket geometry mismatch");
        self.negative += other.negative;
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
    }
}

/// `cumulative[i] + fund_value` for every month.
pub fn fund_value_series(cumulative: &[f64], fund_value: f64) -> Vec<f64> {
    cumulative.iter().map(|c| c + fund_value).collect()
}

/// Lowest and last value of a fund-value series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extremes {
    pub min_value: f64,
    pub final_value: f64,
}

impl Extremes {
    /// `None` for an empty series.
    pub fn of(series: &[f64]) -> Option<Self> {
        let final_value = *series.last()?;
        let min_value = series.iter().copied().fold(f64::INFINITY, f64::min);
        Some(Extremes { min_value, final_value })
    }
}

/// Minimum-value and final-value histograms for one starting fund value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundValueHistograms {
    pub fund_value: f64,
    pub min_value: Histogram,
    pub final_value: Histogram,
}

impl FundValueHistograms {
    pub fn new(fund_value: f64, buckets: &Buckets) -> Self {
        FundValueHistograms {
            fund_value,
            min_value: Histogram::new(buckets),
            final_value: Histogram::new(buckets),
        }
    }

    /// Count one trial: exactly one increment in each histogram.
    pub fn record(&mut self, buckets: &Buckets, extremes: Extremes) {
        self.min_value.record(buckets.label_for(extremes.min_value));
        self.final_value.record(buckets.label_for(extremes.final_value));
    }

    /// Broadcast a trial's cumulative series onto this fund value and count it.
    pub fn record_series(&mut self, buckets: &Buckets, cumulative: &[f64]) -> Option<Extremes> {
        let extremes = Extremes::of(&fund_value_series(cumulative, self.fund_value))?;
        self.record(buckets, extremes);
        Some(extremes)
    }

    pub fn merge(&mut self, other: &FundValueHistograms) {
        self.min_value.merge(&other.min_value);
        self.final_value.merge(&other.final_value);
    }
}
