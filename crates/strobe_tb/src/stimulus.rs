//! Transaction stimulus generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strobe_config::RunConfig;

use crate::transaction::Transaction;

/// Produces the transactions a driver is loaded with at the start of a run.
pub trait StimulusGenerator {
    /// Generates the full transaction list for one run.
    fn generate(&mut self, config: &RunConfig) -> Vec<Transaction>;
}

impl<F> StimulusGenerator for F
where
    F: FnMut(&RunConfig) -> Vec<Transaction>,
{
    fn generate(&mut self, config: &RunConfig) -> Vec<Transaction> {
        self(config)
    }
}

/// Random payloads with lengths drawn uniformly from a byte range.
///
/// Count and length range come from `[stimulus]` in the run configuration
/// unless overridden.
#[derive(Debug)]
pub struct RandomStimulus {
    rng: StdRng,
    count: Option<u64>,
    lengths: Option<(usize, usize)>,
    multiple_of: usize,
}

impl RandomStimulus {
    /// Creates a generator seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            count: None,
            lengths: None,
            multiple_of: 1,
        }
    }

    /// Overrides the number of transactions.
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Overrides the inclusive length range, in bytes.
    pub fn with_lengths(mut self, min: usize, max: usize) -> Self {
        self.lengths = Some((min, max.max(min)));
        self
    }

    /// Rounds every length up to a multiple of `bytes`, for buses without
    /// byte enables.
    pub fn aligned_to(mut self, bytes: usize) -> Self {
        self.multiple_of = bytes.max(1);
        self
    }
}

impl StimulusGenerator for RandomStimulus {
    fn generate(&mut self, config: &RunConfig) -> Vec<Transaction> {
        let count = self.count.unwrap_or(config.stimulus.transactions);
        let (min, max) = self
            .lengths
            .unwrap_or((config.stimulus.min_length, config.stimulus.max_length));
        let min = min.max(1);
        let max = max.max(min);
        (0..count)
            .map(|_| {
                let len = self.rng.gen_range(min..=max).next_multiple_of(self.multiple_of);
                let mut bytes = vec![0u8; len];
                self.rng.fill(bytes.as_mut_slice());
                Transaction::new(bytes)
            })
            .collect()
    }
}
