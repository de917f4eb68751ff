//! Month-by-month cashflows of a portfolio under one trial's default outcome.
//!
//! All functions are pure in `(borrowers, state, month)`; months are
//! 1-indexed. A borrower earns income up to and including its default month,
//! is written off in full in that month, then recovers
//! `gross_write_off × (1 − LGD)` in equal instalments over the
//! `recovery_period` months that follow.
//!
//! Every function panics if `state` does not hold exactly one slot per
//! borrower.

use crate::borrower::Borrower;
use crate::sampler::TrialState;
use crate::types::Month;

fn outcomes<'a>(
    borrowers: &'a [Borrower],
    state: &'a TrialState,
) -> impl Iterator<Item = (&'a Borrower, Option<Month>)> + 'a {
    assert_eq!(
        borrowers.len(),
        state.len(),
        "trial state has {} slots for {} borrowers",
        state.len(),
        borrowers.len()
    );
    borrowers.iter().zip(state.defaults().iter().copied())
}

/// Risk-rate income across borrowers still performing in `month`.
pub fn income(borrowers: &[Borrower], state: &TrialState, month: Month) -> f64 {
    outcomes(borrowers, state)
        .filter(|(_, default)| default.is_none_or(|d| d >= month))
        .map(|(b, _)| b.monthly_income())
        .sum()
}

/// Gross write-off of borrowers defaulting in exactly `month`.
pub fn write_off(borrowers: &[Borrower], state: &TrialState, month: Month) -> f64 {
    outcomes(borrowers, state)
        .filter(|(_, default)| *default == Some(month))
        .map(|(b, _)| b.gross_write_off())
        .sum()
}

/// Recovery instalments falling in `month`.
pub fn recovery(borrowers: &[Borrower], state: &TrialState, month: Month) -> f64 {
    outcomes(borrowers, state)
        .filter_map(|(b, default)| {
            let d = default?;
            (d < month && month <= d.offset(b.recovery_period())).then(|| b.monthly_recovery())
        })
        .sum()
}

/// Income + recovery − write-off for one month.
pub fn net_result(borrowers: &[Borrower], state: &TrialState, month: Month) -> f64 {
    income(borrowers, state, month) + recovery(borrowers, state, month)
        - write_off(borrowers, state, month)
}

/// Net result for every month `1..=horizon`.
pub fn net_results(borrowers: &[Borrower], state: &TrialState, horizon: u32) -> Vec<f64> {
    Month::horizon(horizon).map(|m| net_result(borrowers, state, m)).collect()
}

/// Running total: `out[i] = results[0] + … + results[i]`.
pub fn cumulative(results: &[f64]) -> Vec<f64> {
    results
        .iter()
        .scan(0.0, |total, r| {
            *total += r;
            Some(*total)
        })
        .collect()
}
