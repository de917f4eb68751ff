//! Monte Carlo solvency simulation for a lending fund.
//!
//! A portfolio of borrowers is loaded from a record source, each trial draws
//! independent defaults, and the cumulative monthly net result is added to a
//! range of candidate starting fund values. Minimum and final fund values are
//! bucketed into histograms so the odds of the fund going negative can be
//! read off per starting balance.

pub mod borrower;
pub mod cashflow;
pub mod config;
pub mod error;
pub mod histogram;
pub mod report;
pub mod sampler;
pub mod simulation;
pub mod source;
pub mod types;

pub use error::{Result, SimError};
