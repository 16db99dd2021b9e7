//! Replay-capable randomness source.
//!
//! `ShapedDataSource` is where generation, replay, and shrinking meet: it
//! serves forced values first (replaying a mutated trace), falls back to the
//! seeded PRNG, and records every draw into a `Precursor`. Failed filter
//! predicates roll the trace back to a checkpoint so rejected attempts leave
//! no record, and a failed-assumption counter enforces the generate-attempts
//! budget.

use tracing::trace;

use crate::constraint::Constraint;
use crate::error::GenError;
use crate::precursor::Precursor;
use crate::rng::XorShiftRng;

/// Saved trace position. Rolling back truncates everything drawn since.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    len: usize,
}

/// A randomness source that can be pre-loaded with forced values and records
/// the decision trace of one generation.
#[derive(Debug)]
pub struct ShapedDataSource<'a> {
    rng: &'a mut XorShiftRng,
    forced: Vec<i64>,
    forced_pos: usize,
    precursor: Precursor,
    failed_assumptions: u32,
    max_attempts: u32,
}

impl<'a> ShapedDataSource<'a> {
    /// Wraps `rng` with `forced` values consumed positionally before any
    /// random draw. `max_attempts` bounds failed-assumption retries.
    pub fn new(rng: &'a mut XorShiftRng, forced: Vec<i64>, max_attempts: u32) -> Self {
        ShapedDataSource {
            rng,
            forced,
            forced_pos: 0,
            precursor: Precursor::new(),
            failed_assumptions: 0,
            max_attempts,
        }
    }

    /// Draws one value within `constraint`.
    ///
    /// Remaining forced values win over randomness and are NOT re-validated
    /// against the constraint: the caller supplying a forced trace is
    /// responsible for pairing it with the generator structure it was
    /// recorded from. Every draw, forced or random, lands in the trace.
    pub fn next(&mut self, constraint: Constraint) -> i64 {
        let value = if self.forced_pos < self.forced.len() {
            let v = self.forced[self.forced_pos];
            self.forced_pos += 1;
            v
        } else {
            self.rng.next_in_range(constraint.min(), constraint.max())
        };
        self.precursor.store(constraint, value);
        value
    }

    /// Checkpoints the trace. A later `rollback` discards everything drawn
    /// since; `commit` keeps it. The buffer grows in place, so commit is
    /// free and rollback is a truncation.
    pub fn mark(&self) -> Checkpoint {
        Checkpoint {
            len: self.precursor.len(),
        }
    }

    /// Keeps the draws made since `checkpoint`. No-op by construction.
    pub fn commit(&mut self, _checkpoint: Checkpoint) {}

    /// Discards the draws made since `checkpoint` so a rejected attempt does
    /// not pollute the permanent trace.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.precursor.truncate(checkpoint.len);
    }

    /// Records one failed filter/precondition attempt. Exceeding the budget
    /// aborts the generation.
    pub fn register_failed_assumption(&mut self) -> Result<(), GenError> {
        self.failed_assumptions += 1;
        if self.failed_assumptions > self.max_attempts {
            trace!(
                attempts = self.max_attempts,
                "assumption budget exhausted, aborting generation"
            );
            return Err(GenError::AttemptsExhausted {
                attempts: self.max_attempts,
            });
        }
        Ok(())
    }

    pub fn failed_assumptions(&self) -> u32 {
        self.failed_assumptions
    }

    pub fn precursor(&self) -> &Precursor {
        &self.precursor
    }

    pub fn into_precursor(self) -> Precursor {
        self.precursor
    }
}
