//! Boundary-skewed generation.
//!
//! Edge values (the shrink target, the minimum, the maximum) are
//! disproportionately likely to expose boundary bugs, so this distribution
//! visits them deterministically before paying for random search: one
//! un-forced reference run captures the generator's trace shape, then the
//! shrink-target, minimum and maximum traces are replayed once each. After
//! the queue drains, every call is a fresh random generation.

use std::collections::VecDeque;

use tracing::debug;

use crate::error::GenError;
use crate::gen::Gen;
use crate::precursor::Precursor;
use crate::rng::XorShiftRng;
use crate::source::ShapedDataSource;

/// One generated example: the value, its decision trace, and how many
/// assumptions failed on the way.
#[derive(Debug)]
pub struct Sample<T> {
    pub value: T,
    pub precursor: Precursor,
    pub failed_assumptions: u32,
}

/// Generation strategy that visits boundary traces before random ones.
pub struct BoundarySkewedDistribution<T> {
    gen: Gen<T>,
    rng: XorShiftRng,
    max_attempts: u32,
    queued: VecDeque<Vec<i64>>,
}

impl<T: 'static> BoundarySkewedDistribution<T> {
    /// Runs one reference generation to learn the trace shape, then queues
    /// the shrink-target, minimum and maximum traces for the first calls to
    /// `generate`.
    pub fn new(gen: Gen<T>, mut rng: XorShiftRng, max_attempts: u32) -> Result<Self, GenError> {
        let reference = {
            let mut source = ShapedDataSource::new(&mut rng, Vec::new(), max_attempts);
            gen.generate(&mut source)?;
            source.into_precursor()
        };
        let entries = reference.entries();
        let mut queued = VecDeque::with_capacity(3);
        queued.push_back(
            entries
                .iter()
                .map(|(c, _)| c.effective_shrink_target())
                .collect(),
        );
        queued.push_back(entries.iter().map(|(c, _)| c.min()).collect());
        queued.push_back(entries.iter().map(|(c, _)| c.max()).collect());
        debug!(
            trace_len = entries.len(),
            "queued boundary traces from reference generation"
        );
        Ok(BoundarySkewedDistribution {
            gen,
            rng,
            max_attempts,
            queued,
        })
    }

    /// Queues an externally supplied forced trace (guidance suggestions).
    /// Queued traces are always consumed before pure-random generation.
    pub fn enqueue(&mut self, forced: Vec<i64>) {
        self.queued.push_back(forced);
    }

    /// Produces one example, replaying the next queued forced trace if any.
    pub fn generate(&mut self) -> Result<Sample<T>, GenError> {
        let forced = self.queued.pop_front().unwrap_or_default();
        let mut source = ShapedDataSource::new(&mut self.rng, forced, self.max_attempts);
        let value = self.gen.generate(&mut source)?;
        let failed_assumptions = source.failed_assumptions();
        Ok(Sample {
            value,
            precursor: source.into_precursor(),
            failed_assumptions,
        })
    }

    pub fn gen(&self) -> &Gen<T> {
        &self.gen
    }

    /// Replays an arbitrary forced trace outside the queue. The shrinker
    /// uses this to evaluate candidate traces against the same PRNG state.
    pub fn replay(&mut self, forced: Vec<i64>) -> Result<Sample<T>, GenError> {
        let mut source = ShapedDataSource::new(&mut self.rng, forced, self.max_attempts);
        let value = self.gen.generate(&mut source)?;
        let failed_assumptions = source.failed_assumptions();
        Ok(Sample {
            value,
            precursor: source.into_precursor(),
            failed_assumptions,
        })
    }
}
