use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::borrower::Borrower;
use crate::error::{Result, SimError};
use crate::types::{BorrowerId, Month};

/// Default outcomes of one trial, one slot per borrower in portfolio order.
///
/// `Some(month)` means the borrower defaulted in that month of the horizon;
/// `None` means it performed throughout. Encoding the month inside the flag
/// makes "month set iff defaulted" hold by construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrialState {
    defaults: Vec<Option<Month>>,
}

impl TrialState {
    /// All borrowers performing.
    pub fn new(borrowers: usize) -> Self {
        TrialState { defaults: vec![None; borrowers] }
    }

    /// A fixed outcome, for scripted scenarios and tests.
    pub fn from_defaults(defaults: Vec<Option<Month>>) -> Self {
        TrialState { defaults }
    }

    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }

    pub fn has_defaulted(&self, id: BorrowerId) -> bool {
        self.defaults[id.0].is_some()
    }

    pub fn default_month(&self, id: BorrowerId) -> Option<Month> {
        self.defaults[id.0]
    }

    pub fn defaults(&self) -> &[Option<Month>] {
        &self.defaults
    }

    pub fn default_count(&self) -> usize {
        self.defaults.iter().filter(|d| d.is_some()).count()
    }
}

/// Draws independent default outcomes for a portfolio.
///
/// The default test draws `k / RESOLUTION` with `k` uniform in
/// `1..=RESOLUTION`, i.e. a uniform value in (0, 1] on a 1/10000 grid, and
/// defaults iff the draw is at most the borrower's buffered PD. A PD of 0
/// therefore never defaults and a PD of 1 always does.
#[derive(Debug, Clone)]
pub struct DefaultSampler {
    draw: Uniform<u32>,
    month: Uniform<u32>,
    horizon: u32,
}

impl DefaultSampler {
    pub const RESOLUTION: u32 = 10_000;

    pub fn new(horizon: u32) -> Result<Self> {
        let draw = Uniform::new_inclusive(1, Self::RESOLUTION)
            .map_err(|e| SimError::InvalidConfig(format!("default draw: {e}")))?;
        let month = Uniform::new_inclusive(1, horizon)
            .map_err(|e| SimError::InvalidConfig(format!("horizon {horizon}: {e}")))?;
        Ok(DefaultSampler { draw, month, horizon })
    }

    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    /// One uniform draw in (0, 1].
    pub fn draw(&self, rng: &mut impl Rng) -> f64 {
        self.draw.sample(rng) as f64 / Self::RESOLUTION as f64
    }

    /// Overwrite `state` with a fresh outcome for every borrower. Nothing from
    /// the previous trial survives.
    pub fn sample(&self, borrowers: &[Borrower], rng: &mut impl Rng, state: &mut TrialState) {
        state.defaults.clear();
        state.defaults.extend(borrowers.iter().map(|b| {
            if self.draw(rng) <= b.buffered_pd() {
                Some(Month(self.month.sample(rng)))
            } else {
                None
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::config::LendingTerms;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    fn borrower(pd: f64) -> Borrower {
        Borrower::new("b", 100_000.0, 100_000.0, 0.4, pd, 0.05, &LendingTerms::default()).unwrap()
    }

    #[test]
    fn zero_horizon_is_rejected() {
        assert!(matches!(DefaultSampler::new(0), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn draws_lie_in_half_open_unit_interval() {
        let sampler = DefaultSampler::new(12).unwrap();
        let mut rng = rng();
        for _ in 0..100_000 {
            let u = sampler.draw(&mut rng);
            assert!(u > 0.0 && u <= 1.0, "draw {u} outside (0, 1]");
        }
    }

    #[test]
    fn pd_zero_never_defaults_and_pd_one_always_does() {
        let sampler = DefaultSampler::new(12).unwrap();
        let borrowers = vec![borrower(0.0), borrower(1.0)];
        let mut state = TrialState::new(2);
        let mut rng = rng();
        for _ in 0..10_000 {
            sampler.sample(&borrowers, &mut rng, &mut state);
            assert!(!state.has_defaulted(BorrowerId(0)), "PD=0 defaulted");
            assert!(state.has_defaulted(BorrowerId(1)), "PD=1 did not default");
        }
    }

    #[test]
    fn buffer_above_one_makes_default_certain() {
        let t = LendingTerms { pd_buffer: 2.0, ..LendingTerms::default() };
        let b = Borrower::new("b", 1.0, 1.0, 0.4, 0.5, 0.05, &t).unwrap();
        let sampler = DefaultSampler::new(12).unwrap();
        let mut state = TrialState::new(1);
        let mut rng = rng();
        for _ in 0..1_000 {
            sampler.sample(std::slice::from_ref(&b), &mut rng, &mut state);
            assert!(state.has_defaulted(BorrowerId(0)));
        }
    }

    #[test]
    fn default_rate_tracks_pd() {
        let sampler = DefaultSampler::new(12).unwrap();
        let borrowers = vec![borrower(0.1); 100];
        let mut state = TrialState::new(0);
        let mut rng = rng();
        let trials = 1_000;
        let mut defaults = 0usize;
        for _ in 0..trials {
            sampler.sample(&borrowers, &mut rng, &mut state);
            defaults += state.default_count();
        }
        let rate = defaults as f64 / (trials * borrowers.len()) as f64;
        assert!((0.09..=0.11).contains(&rate), "default rate {rate:.4} outside [0.09, 0.11]");
    }

    #[test]
    fn default_months_cover_the_horizon_uniformly() {
        let sampler = DefaultSampler::new(12).unwrap();
        let borrowers = vec![borrower(1.0); 10];
        let mut state = TrialState::new(0);
        let mut rng = rng();
        let mut counts = [0usize; 12];
        for _ in 0..1_200 {
            sampler.sample(&borrowers, &mut rng, &mut state);
            for m in state.defaults().iter().flatten() {
                counts[m.0 as usize - 1] += 1;
            }
        }
        // 12_000 draws over 12 months: ~1_000 each.
        for (i, &c) in counts.iter().enumerate() {
            assert!((850..=1_150).contains(&c), "month {} drawn {c} times", i + 1);
        }
    }

    #[test]
    fn resampling_overwrites_previous_trial() {
        let sampler = DefaultSampler::new(12).unwrap();
        let mut state = TrialState::from_defaults(vec![Some(Month(4)); 3]);
        let mut rng = rng();
        sampler.sample(&[borrower(0.0)], &mut rng, &mut state);
        assert_eq!(state.defaults(), &[None]);
    }

    #[test]
    fn same_seed_same_outcome() {
        let sampler = DefaultSampler::new(12).unwrap();
        let borrowers: Vec<Borrower> = (1..=20).map(|i| borrower(i as f64 / 40.0)).collect();
        let run = || {
            let mut state = TrialState::default();
            sampler.sample(&borrowers, &mut rng(), &mut state);
            state
        };
        assert_eq!(run(), run());
    }

    proptest! {
        #[test]
        fn month_set_iff_defaulted_and_within_horizon(
            seed in any::<u64>(),
            horizon in 1u32..48,
            pds in prop::collection::vec(0.0f64..=1.0, 1..30),
        ) {
            let sampler = DefaultSampler::new(horizon).unwrap();
            let borrowers: Vec<Borrower> = pds.iter().map(|&pd| borrower(pd)).collect();
            let mut state = TrialState::default();
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            sampler.sample(&borrowers, &mut rng, &mut state);
            prop_assert_eq!(state.len(), borrowers.len());
            for i in 0..state.len() {
                let id = BorrowerId(i);
                prop_assert_eq!(state.has_defaulted(id), state.default_month(id).is_some());
                if let Some(m) = state.default_month(id) {
                    prop_assert!(m.0 >= 1 && m.0 <= horizon, "month {} outside [1, {}]", m.0, horizon);
                }
            }
        }
    }
}
