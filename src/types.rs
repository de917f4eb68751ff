use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a borrower within the loaded portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BorrowerId(pub usize);

/// Simulation time in months, 1-indexed: `Month(1)` is the first month of the
/// horizon and `Month(horizon)` the last. There is no month zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Month(pub u32);

impl Month {
    pub const MONTHS_PER_YEAR: u32 = 12;

    /// Advance by a number of months, saturating at `u32::MAX`.
    pub fn offset(self, months: u32) -> Self {
        Month(self.0.saturating_add(months))
    }

    /// Iterate `Month(1)..=Month(horizon)`.
    pub fn horizon(horizon: u32) -> impl Iterator<Item = Month> {
        (1..=horizon).map(Month)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}
