//! Theory execution.
//!
//! `TheoryRunner` drives the whole pipeline: pull values from a generator
//! through the boundary-skewed distribution and the configured guidance,
//! short-circuit on the first falsification, shrink it, and report. Running
//! out of generatable values is a distinct explicit outcome, not an error.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, info};

use crate::distribution::BoundarySkewedDistribution;
use crate::gen::Gen;
use crate::rng::XorShiftRng;
use crate::shrinker::{shrink, PropertyOutcome};
use crate::stateful::{StatefulRunResult, StatefulTheory};
use crate::strategy::Strategy;

/// Result of one theory check.
#[derive(Debug)]
pub enum CheckOutcome<T> {
    /// Every generated example satisfied the property.
    Passed { examples_executed: u32 },
    /// A counterexample was found and shrunk.
    Falsified {
        /// Seed that reproduces this exact run.
        seed: u64,
        /// Examples examined before (and including) the falsifying one.
        examples_executed: u32,
        /// Smallest-known falsifying value.
        smallest: T,
        /// Panic message, when the property panicked instead of returning
        /// false.
        error: Option<String>,
        /// Intermediate falsifying values visited while shrinking.
        shrinks: Vec<T>,
    },
    /// Fewer valid examples than requested could be generated.
    Exhausted {
        valid_examples: u32,
        requested: u32,
    },
}

impl<T> CheckOutcome<T> {
    pub fn is_falsified(&self) -> bool {
        matches!(self, CheckOutcome::Falsified { .. })
    }
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Evaluates the property once, treating a panic like a returned `false`
/// while keeping the message for the report.
fn evaluate<T, P>(property: &P, value: &T) -> PropertyOutcome
where
    P: Fn(&T) -> bool,
{
    match catch_unwind(AssertUnwindSafe(|| property(value))) {
        Ok(true) => PropertyOutcome::Passed,
        Ok(false) => PropertyOutcome::Falsified { error: None },
        Err(payload) => PropertyOutcome::Falsified {
            error: Some(panic_message(payload)),
        },
    }
}

/// Orchestrates example generation, property execution, shrinking and
/// reporting for one strategy.
#[derive(Debug, Clone)]
pub struct TheoryRunner {
    strategy: Strategy,
}

impl TheoryRunner {
    pub fn new(strategy: Strategy) -> TheoryRunner {
        TheoryRunner { strategy }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Checks `property` against up to `examples` generated values.
    pub fn check<T, P>(&self, gen: Gen<T>, property: P) -> CheckOutcome<T>
    where
        T: 'static,
        P: Fn(&T) -> bool,
    {
        let requested = self.strategy.examples();
        let rng = XorShiftRng::new(self.strategy.seed());
        let seed = rng.initial_seed();
        let mut guidance = self.strategy.new_guidance();

        let mut distribution =
            match BoundarySkewedDistribution::new(gen, rng, self.strategy.generate_attempts()) {
                Ok(distribution) => distribution,
                Err(_) => {
                    self.strategy.reporter().value_exhausted(0, requested);
                    return CheckOutcome::Exhausted {
                        valid_examples: 0,
                        requested,
                    };
                }
            };

        let mut valid_examples = 0u32;
        let mut examples_executed = 0u32;
        for _ in 0..requested {
            let sample = match distribution.generate() {
                Ok(sample) => sample,
                Err(_) => {
                    debug!(valid_examples, requested, "example generation exhausted");
                    self.strategy
                        .reporter()
                        .value_exhausted(valid_examples, requested);
                    return CheckOutcome::Exhausted {
                        valid_examples,
                        requested,
                    };
                }
            };
            valid_examples += 1;
            guidance.new_example(&sample.precursor);
            let outcome = evaluate(&property, &sample.value);
            examples_executed += 1;
            guidance.example_executed();
            for forced in guidance.suggest_values(examples_executed as usize, &sample.precursor)
            {
                distribution.enqueue(forced);
            }
            guidance.example_complete();

            if let PropertyOutcome::Falsified { error } = outcome {
                debug!(examples_executed, "falsified, shrinking");
                let result = shrink(
                    &mut distribution,
                    self.strategy.shrink_cycles(),
                    sample,
                    error,
                    |value| evaluate(&property, value),
                );
                let gen = distribution.gen();
                let smallest_display = gen.as_string(&result.smallest);
                let shrink_displays: Vec<String> = result
                    .intermediate
                    .iter()
                    .map(|v| gen.as_string(v))
                    .collect();
                self.strategy.reporter().falsification(
                    seed,
                    examples_executed,
                    &smallest_display,
                    result.error.as_deref(),
                    &shrink_displays,
                );
                return CheckOutcome::Falsified {
                    seed,
                    examples_executed,
                    smallest: result.smallest,
                    error: result.error,
                    shrinks: result.intermediate,
                };
            }
        }

        info!(examples_executed, "property held");
        CheckOutcome::Passed { examples_executed }
    }

    /// Checks a stateful theory: each example is one full setup/steps/teardown
    /// run, falsified when a step panics or a postcondition fails. Step
    /// bounds come from the strategy.
    pub fn check_stateful<M>(&self, theory: StatefulTheory<M>) -> CheckOutcome<StatefulRunResult>
    where
        M: 'static,
    {
        let gen = theory.into_gen(
            self.strategy.min_stateful_steps(),
            self.strategy.max_stateful_steps(),
        );
        self.check(gen, |result| result.passed)
    }
}
