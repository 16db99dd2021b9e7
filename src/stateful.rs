//! Stateful theory execution.
//!
//! A stateful theory runs a state machine over one model instance: setup
//! steps in insertion order exactly once, then N generated steps with N drawn
//! from `[min_steps, max_steps]`, then teardown on every exit path. Steps are
//! picked by weighted choice among registered step generators; a generator
//! may yield no step (its precondition failed), which is rolled back and
//! retried under the attempts budget.
//!
//! Because N and every selection flow through the same bounded draws as any
//! other generator, a falsifying step sequence shrinks like any other value.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use tracing::debug;

use crate::constraint::Constraint;
use crate::error::GenError;
use crate::gen::Gen;
use crate::runner::panic_message;
use crate::source::ShapedDataSource;

/// One executable step against a model. The description is captured at
/// generation time so argument values appear in failure reports.
pub struct Step<M> {
    description: String,
    precondition: Option<Rc<dyn Fn(&M) -> bool>>,
    action: Rc<dyn Fn(&mut M)>,
    postcondition: Option<Rc<dyn Fn(&M) -> bool>>,
}

impl<M> Clone for Step<M> {
    fn clone(&self) -> Self {
        Step {
            description: self.description.clone(),
            precondition: self.precondition.clone(),
            action: Rc::clone(&self.action),
            postcondition: self.postcondition.clone(),
        }
    }
}

impl<M> fmt::Debug for Step<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("description", &self.description)
            .finish()
    }
}

impl<M> Step<M> {
    pub fn new<A>(description: impl Into<String>, action: A) -> Step<M>
    where
        A: Fn(&mut M) + 'static,
    {
        Step {
            description: description.into(),
            precondition: None,
            action: Rc::new(action),
            postcondition: None,
        }
    }

    /// Guards selection: a step whose precondition rejects the current model
    /// counts as "no step" and another is drawn.
    pub fn with_precondition<P>(mut self, precondition: P) -> Step<M>
    where
        P: Fn(&M) -> bool + 'static,
    {
        self.precondition = Some(Rc::new(precondition));
        self
    }

    /// Checked after the action; absent means always true.
    pub fn with_postcondition<P>(mut self, postcondition: P) -> Step<M>
    where
        P: Fn(&M) -> bool + 'static,
    {
        self.postcondition = Some(Rc::new(postcondition));
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// How a stateful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatefulRunResult {
    /// True only if setup and every executed step's postcondition held.
    pub passed: bool,
    /// Descriptions of executed steps, in execution order.
    pub history: Vec<String>,
    /// What went wrong, when something did.
    pub failure: Option<String>,
}

impl StatefulRunResult {
    /// Renders the executed steps as `S1 = desc`, `S2 = desc`, ... for
    /// failure reports.
    pub fn format_history(&self) -> String {
        self.history
            .iter()
            .enumerate()
            .map(|(i, desc)| format!("S{} = {}", i + 1, desc))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Declarative description of a stateful theory over model `M`.
pub struct StatefulTheory<M> {
    model: Rc<dyn Fn() -> M>,
    setup: Vec<Step<M>>,
    steps: Vec<(u32, Gen<Option<Step<M>>>)>,
    teardown: Option<Rc<dyn Fn(&mut M)>>,
}

impl<M: 'static> StatefulTheory<M> {
    /// A theory whose runs each start from a fresh model instance.
    pub fn new<F>(model_factory: F) -> StatefulTheory<M>
    where
        F: Fn() -> M + 'static,
    {
        StatefulTheory {
            model: Rc::new(model_factory),
            setup: Vec::new(),
            steps: Vec::new(),
            teardown: None,
        }
    }

    /// Adds a setup step. Setup steps run in insertion order, exactly once.
    pub fn with_setup_step(mut self, step: Step<M>) -> Self {
        self.setup.push(step);
        self
    }

    /// Registers a step generator with a proportional selection weight.
    pub fn with_step(mut self, weight: u32, step: Gen<Option<Step<M>>>) -> Self {
        assert!(weight > 0, "step weight must be positive");
        self.steps.push((weight, step));
        self
    }

    /// Teardown runs on every exit path from the step loop.
    pub fn with_teardown<F>(mut self, teardown: F) -> Self
    where
        F: Fn(&mut M) + 'static,
    {
        self.teardown = Some(Rc::new(teardown));
        self
    }

    /// Compiles the theory into a generator of run results. The step count
    /// and every step selection are bounded draws, so runs shrink.
    pub fn into_gen(self, min_steps: u32, max_steps: u32) -> Gen<StatefulRunResult> {
        assert!(
            min_steps >= 1 && min_steps <= max_steps,
            "step bounds must satisfy 1 <= min <= max"
        );
        assert!(!self.steps.is_empty(), "at least one step generator required");
        let StatefulTheory {
            model,
            setup,
            steps,
            teardown,
        } = self;
        let count_constraint =
            Constraint::between(min_steps as i64, max_steps as i64).with_shrink_point(min_steps as i64);

        Gen::from_fn(move |source| {
            let mut instance = (model)();
            let mut history = Vec::new();
            let mut failure: Option<String> = None;
            let mut gen_error: Option<GenError> = None;

            for step in &setup {
                history.push(step.description().to_string());
                if let Some(reason) = execute_step(&mut instance, step) {
                    failure = Some(reason);
                    break;
                }
            }

            if failure.is_none() {
                let n = source.next(count_constraint);
                debug!(steps = n, "starting stateful run");
                for _ in 0..n {
                    let step = match select_step(source, &steps, &instance) {
                        Ok(step) => step,
                        Err(e) => {
                            gen_error = Some(e);
                            break;
                        }
                    };
                    history.push(step.description().to_string());
                    if let Some(reason) = execute_step(&mut instance, &step) {
                        failure = Some(reason);
                        break;
                    }
                }
            }

            // Teardown is unconditional: step failure, generation failure and
            // success all pass through here.
            if let Some(teardown) = &teardown {
                teardown(&mut instance);
            }
            if let Some(e) = gen_error {
                return Err(e);
            }
            Ok(StatefulRunResult {
                passed: failure.is_none(),
                history,
                failure,
            })
        })
        .described_as(|result| {
            if result.passed {
                format!("passing run of {} steps", result.history.len())
            } else {
                format!(
                    "{}\n{}",
                    result.failure.as_deref().unwrap_or("failed run"),
                    result.format_history()
                )
            }
        })
    }
}

/// Runs one step. Returns the failure reason, if any. A panicking action
/// fails the run without consulting the postcondition.
fn execute_step<M>(model: &mut M, step: &Step<M>) -> Option<String> {
    let outcome = catch_unwind(AssertUnwindSafe(|| (step.action)(model)));
    if let Err(payload) = outcome {
        return Some(format!(
            "step {} panicked: {}",
            step.description(),
            panic_message(payload)
        ));
    }
    match &step.postcondition {
        Some(post) if !post(model) => Some(format!(
            "postcondition of step {} did not hold",
            step.description()
        )),
        _ => None,
    }
}

/// Weighted choice among step generators, retrying "no step" results under
/// the attempts budget. Rejected selections leave no trace.
fn select_step<M: 'static>(
    source: &mut ShapedDataSource<'_>,
    steps: &[(u32, Gen<Option<Step<M>>>)],
    model: &M,
) -> Result<Step<M>, GenError> {
    let total: u32 = steps.iter().map(|(w, _)| *w).sum();
    loop {
        let checkpoint = source.mark();
        let mut pick = source.next(
            Constraint::between(0, total as i64 - 1).with_shrink_point(0),
        );
        let gen = steps
            .iter()
            .find_map(|(w, gen)| {
                if pick < *w as i64 {
                    Some(gen)
                } else {
                    pick -= *w as i64;
                    None
                }
            })
            .expect("weighted pick within total");
        match gen.generate(source)? {
            Some(step)
                if step
                    .precondition
                    .as_ref()
                    .map_or(true, |pre| pre(model)) =>
            {
                source.commit(checkpoint);
                return Ok(step);
            }
            _ => {
                source.rollback(checkpoint);
                source.register_failed_assumption()?;
            }
        }
    }
}
