//! Output sinks: the plain-text summary and the CSV histogram tables.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::histogram::{FundValueHistograms, Histogram};
use crate::simulation::SimulationResult;

pub const SUMMARY_FILE: &str = "simulation_summary.txt";
pub const MIN_FREQUENCY_FILE: &str = "simulation_min_frequency.csv";
pub const FINAL_FREQUENCY_FILE: &str = "simulation_final_frequency.csv";
pub const TRIAL_OUTCOMES_FILE: &str = "simulation_trial_outcomes.csv";

/// "1 in N" odds of a negative outcome, `N = floor(trials / negatives)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Odds {
    OneIn(u64),
    /// No trial went negative, so the odds are undefined.
    NoNegatives,
}

impl Odds {
    pub fn of(negatives: u64, trials: u64) -> Self {
        match negatives {
            0 => Odds::NoNegatives,
            n => Odds::OneIn(trials / n),
        }
    }
}

/// Sign split of one histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignSummary {
    pub non_negative: u64,
    pub negative: u64,
    pub odds: Odds,
}

impl SignSummary {
    pub fn of(histogram: &Histogram, trials: u64) -> Self {
        let negative = histogram.negative();
        SignSummary { non_negative: trials - negative, negative, odds: Odds::of(negative, trials) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundValueSummary {
    pub fund_value: f64,
    pub min_value: SignSummary,
    pub final_value: SignSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub trials: u64,
    pub fund_values: Vec<FundValueSummary>,
}

impl Summary {
    pub fn of(result: &SimulationResult) -> Self {
        let fund_values = result
            .histograms
            .iter()
            .map(|h| FundValueSummary {
                fund_value: h.fund_value,
                min_value: SignSummary::of(&h.min_value, result.trials),
                final_value: SignSummary::of(&h.final_value, result.trials),
            })
            .collect();
        Summary { trials: result.trials, fund_values }
    }

    /// Human-readable rendering, one paragraph per fund value.
    pub fn render(&self) -> String {
        let mut out = format!("{} trials completed in simulation", thousands(self.trials));
        for fv in &self.fund_values {
            let _ = write!(out, "\n\nStarting fund value ${}", amount(fv.fund_value));
            let _ = write!(out, "\nMinimum value returned: {}", sign_line(&fv.min_value));
            let _ = write!(out, "\nFinal value returned: {}", sign_line(&fv.final_value));
        }
        out
    }
}

fn sign_line(s: &SignSummary) -> String {
    let odds = match s.odds {
        Odds::OneIn(n) => format!("1 in {} odds", thousands(n)),
        Odds::NoNegatives => "no negative outcomes observed".to_string(),
    };
    format!(
        "positive {} times and negative {} times -- {odds}",
        thousands(s.non_negative),
        thousands(s.negative)
    )
}

/// `1234567` → `"1,234,567"`.
fn thousands(n: u64) -> String {
    group_digits(&n.to_string())
}

/// Thousands-separated amount keeping sign and fraction:
/// `-1250000.5` → `"-1,250,000.5"`.
fn amount(value: f64) -> String {
    let text = value.to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    match unsigned.split_once('.') {
        Some((whole, fraction)) => format!("{sign}{}.{fraction}", group_digits(whole)),
        None => format!("{sign}{}", group_digits(unsigned)),
    }
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// One row per fund value, one column per bucket label, preceded by a
/// `fund_value` column. Every row uses `result.labels` as its column order.
pub fn write_frequency_table<W: Write>(
    writer: W,
    result: &SimulationResult,
    histogram: impl Fn(&FundValueHistograms) -> &Histogram,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    let header = std::iter::once("fund_value".to_string()).chain(result.labels.iter().map(|l| l.to_string()));
    csv.write_record(header)?;
    for h in &result.histograms {
        let row = std::iter::once(h.fund_value.to_string())
            .chain(histogram(h).row().map(|c| c.to_string()));
        csv.write_record(row)?;
    }
    csv.flush()?;
    Ok(())
}

/// `trial,min_value,final_value` for the tracked fund value.
pub fn write_trial_outcomes<W: Write>(writer: W, result: &SimulationResult) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for outcome in &result.outcomes {
        csv.serialize(outcome)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the summary and both frequency tables (plus trial outcomes when the
/// run kept them) into `dir`. Returns the paths written.
///
/// Every file is first written under a hidden `.<name>.tmp` path and only
/// renamed into place once all of them were written, so a failed write leaves
/// no report files behind.
pub fn write_all(dir: impl AsRef<Path>, result: &SimulationResult) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut staged = Vec::new();
    if let Err(e) = stage_all(dir, result, &mut staged) {
        for (tmp, _) in &staged {
            let _ = fs::remove_file(tmp);
        }
        return Err(e);
    }

    let mut written = Vec::with_capacity(staged.len());
    for (tmp, path) in staged {
        fs::rename(&tmp, &path)?;
        info!(path = %path.display(), "wrote report");
        written.push(path);
    }
    Ok(written)
}

/// Write each report to its temporary path, pushing `(tmp, final)` pairs as
/// files are created.
fn stage_all(dir: &Path, result: &SimulationResult, staged: &mut Vec<(PathBuf, PathBuf)>) -> Result<()> {
    let mut stage = |name: &str| -> Result<BufWriter<File>> {
        let tmp = dir.join(format!(".{name}.tmp"));
        let file = File::create(&tmp)?;
        staged.push((tmp, dir.join(name)));
        Ok(BufWriter::new(file))
    };

    let mut summary = stage(SUMMARY_FILE)?;
    summary.write_all(Summary::of(result).render().as_bytes())?;
    summary.flush()?;

    write_frequency_table(stage(MIN_FREQUENCY_FILE)?, result, |h| &h.min_value)?;
    write_frequency_table(stage(FINAL_FREQUENCY_FILE)?, result, |h| &h.final_value)?;

    if !result.outcomes.is_empty() {
        write_trial_outcomes(stage(TRIAL_OUTCOMES_FILE)?, result)?;
    }
    Ok(())
}
