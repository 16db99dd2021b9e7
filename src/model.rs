//! Command-based model checking, sequential and parallel.
//!
//! A `Command` couples an effect on the live system under test with a pure
//! transition on the model. The sequential check walks both in lockstep and
//! compares after every step. The parallel check is a linearizability test:
//! the system's final state after truly concurrent execution must match one
//! reachable by *some* serial ordering of the same commands.
//!
//! Enumerating serial orderings is factorial in the command count; keep
//! parallel command sequences short (ten or fewer).

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::ModelCheckError;
use crate::runner::panic_message;

/// A named action on the system under test paired with its pure model
/// transition.
pub struct Command<S, Sut> {
    name: String,
    action: Arc<dyn Fn(&Sut) + Send + Sync>,
    transition: Arc<dyn Fn(&S) -> S + Send + Sync>,
}

impl<S, Sut> Clone for Command<S, Sut> {
    fn clone(&self) -> Self {
        Command {
            name: self.name.clone(),
            action: Arc::clone(&self.action),
            transition: Arc::clone(&self.transition),
        }
    }
}

impl<S, Sut> fmt::Debug for Command<S, Sut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command").field("name", &self.name).finish()
    }
}

impl<S, Sut> Command<S, Sut> {
    pub fn new<A, T>(name: impl Into<String>, action: A, transition: T) -> Command<S, Sut>
    where
        A: Fn(&Sut) + Send + Sync + 'static,
        T: Fn(&S) -> S + Send + Sync + 'static,
    {
        Command {
            name: name.into(),
            action: Arc::new(action),
            transition: Arc::new(transition),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies the effect to the live system.
    pub fn run(&self, sut: &Sut) {
        (self.action)(sut);
    }

    /// Computes the model's next state without touching the system.
    pub fn next_state(&self, state: &S) -> S {
        (self.transition)(state)
    }
}

/// Outcome of a sequential lockstep check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialResult<S> {
    pub passed: bool,
    /// Steps whose post-state matched the model before any divergence.
    pub steps_succeeded: usize,
    /// Model state at the end (or at the diverging step).
    pub expected: S,
    /// System state observed at the same point.
    pub observed: S,
}

/// Sequential command/model lockstep checking.
pub struct Sequential;

impl Sequential {
    /// Applies each command to a live system and, independently, to the
    /// model; asserts the externally observed state equals the model state
    /// after every step.
    pub fn model_check<S, Sut, ToSut, ToModel>(
        initial: S,
        commands: &[Command<S, Sut>],
        model_to_sut: ToSut,
        sut_to_model: ToModel,
    ) -> SequentialResult<S>
    where
        S: Clone + Eq + fmt::Debug,
        ToSut: Fn(&S) -> Sut,
        ToModel: Fn(&Sut) -> S,
    {
        let sut = model_to_sut(&initial);
        let mut state = initial;
        for (i, command) in commands.iter().enumerate() {
            command.run(&sut);
            state = command.next_state(&state);
            let observed = sut_to_model(&sut);
            if observed != state {
                warn!(
                    command = command.name(),
                    step = i,
                    expected = ?state,
                    observed = ?observed,
                    "sequential divergence"
                );
                return SequentialResult {
                    passed: false,
                    steps_succeeded: i,
                    expected: state,
                    observed,
                };
            }
        }
        let observed = sut_to_model(&sut);
        SequentialResult {
            passed: true,
            steps_succeeded: commands.len(),
            expected: state,
            observed,
        }
    }
}

/// Outcome of a parallel linearizability check.
#[derive(Debug, Clone)]
pub struct ParallelResult<S> {
    pub passed: bool,
    /// The cheap sequential pre-pass.
    pub sequential: SequentialResult<S>,
    /// Final system state after concurrent execution.
    pub observed: S,
    /// Every end state a correct linearizable execution could produce,
    /// reported in full for diagnosis on violation.
    pub valid_end_states: HashSet<S>,
}

/// Linearizability checking under real thread interleaving.
pub struct Parallel;

impl Parallel {
    /// The set of end states reachable by any serial ordering of the
    /// commands' pure transitions. Cost is `|commands|!`; callers must keep
    /// sequences short (ten or fewer commands).
    pub fn calculate_possible_end_states<S, Sut>(
        initial: S,
        commands: &[Command<S, Sut>],
    ) -> HashSet<S>
    where
        S: Clone + Eq + Hash,
    {
        commands
            .iter()
            .permutations(commands.len())
            .map(|ordering| {
                ordering
                    .into_iter()
                    .fold(initial.clone(), |state, command| command.next_state(&state))
            })
            .collect()
    }

    /// Runs the sequential check, then executes the same commands
    /// concurrently (one worker per command, no ordering guarantee) against
    /// a shared system instance and asserts the final observed state belongs
    /// to the valid linearizable end-state set.
    ///
    /// The system instance is mutated concurrently; making it thread-safe,
    /// or deliberately not, is the caller's choice. A worker timeout or
    /// panic is an infrastructure failure, not a property failure.
    pub fn parallel_check<S, Sut, ToSut, ToModel>(
        initial: S,
        commands: &[Command<S, Sut>],
        model_to_sut: ToSut,
        sut_to_model: ToModel,
        task_timeout: Duration,
    ) -> Result<ParallelResult<S>, ModelCheckError>
    where
        S: Clone + Eq + Hash + fmt::Debug,
        Sut: Send + Sync + 'static,
        ToSut: Fn(&S) -> Sut,
        ToModel: Fn(&Sut) -> S,
    {
        // Ordinary bugs are cheaper to find without threads.
        let sequential =
            Sequential::model_check(initial.clone(), commands, &model_to_sut, &sut_to_model);
        if !sequential.passed {
            let observed = sequential.observed.clone();
            return Ok(ParallelResult {
                passed: false,
                sequential,
                observed,
                valid_end_states: HashSet::new(),
            });
        }

        let valid_end_states = Self::calculate_possible_end_states(initial.clone(), commands);
        debug!(
            commands = commands.len(),
            valid_end_states = valid_end_states.len(),
            "starting concurrent phase"
        );

        let sut = Arc::new(model_to_sut(&initial));
        let (tx, rx) = mpsc::channel();
        for command in commands {
            let tx = tx.clone();
            let action = Arc::clone(&command.action);
            let name = command.name.clone();
            let shared = Arc::clone(&sut);
            thread::spawn(move || {
                let outcome = catch_unwind(AssertUnwindSafe(|| action(&shared)));
                let _ = tx.send((name, outcome.map_err(panic_message)));
            });
        }
        drop(tx);

        let mut outstanding: Vec<String> =
            commands.iter().map(|c| c.name.clone()).collect();
        for _ in 0..commands.len() {
            match rx.recv_timeout(task_timeout) {
                Ok((name, Ok(()))) => outstanding.retain(|n| n != &name),
                Ok((name, Err(message))) => {
                    return Err(ModelCheckError::WorkerPanic {
                        command: name,
                        message,
                    })
                }
                Err(_) => {
                    return Err(ModelCheckError::Timeout {
                        command: outstanding.join(", "),
                        timeout_ms: task_timeout.as_millis() as u64,
                    })
                }
            }
        }

        let observed = sut_to_model(&sut);
        let passed = valid_end_states.contains(&observed);
        if !passed {
            warn!(observed = ?observed, "final state not linearizable");
        }
        Ok(ParallelResult {
            passed,
            sequential,
            observed,
            valid_end_states,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    type IntCommand = Command<i64, AtomicI64>;

    fn set_42() -> IntCommand {
        Command::new(
            "SET_42",
            |sut: &AtomicI64| sut.store(42, Ordering::SeqCst),
            |_| 42,
        )
    }

    fn set_0() -> IntCommand {
        Command::new(
            "SET_0",
            |sut: &AtomicI64| sut.store(0, Ordering::SeqCst),
            |_| 0,
        )
    }

    fn times_2() -> IntCommand {
        Command::new(
            "TIMES_2",
            |sut: &AtomicI64| {
                let v = sut.load(Ordering::SeqCst);
                sut.store(v * 2, Ordering::SeqCst);
            },
            |s| s * 2,
        )
    }

    fn plus_1() -> IntCommand {
        Command::new(
            "PLUS_1",
            |sut: &AtomicI64| {
                let v = sut.load(Ordering::SeqCst);
                sut.store(v + 1, Ordering::SeqCst);
            },
            |s| s + 1,
        )
    }

    fn to_sut(s: &i64) -> AtomicI64 {
        AtomicI64::new(*s)
    }

    fn to_model(sut: &AtomicI64) -> i64 {
        sut.load(Ordering::SeqCst)
    }

    #[test]
    fn sequential_set_42_ends_at_42() {
        let result = Sequential::model_check(0, &[set_42()], to_sut, to_model);
        assert!(result.passed);
        assert_eq!(result.steps_succeeded, 1);
        assert_eq!(result.expected, 42);
        assert_eq!(result.observed, 42);
    }

    #[test]
    fn sequential_divergence_reports_succeeded_steps() {
        // Broken system: PLUS_1's effect adds 2.
        let broken = Command::new(
            "PLUS_1",
            |sut: &AtomicI64| {
                let v = sut.load(Ordering::SeqCst);
                sut.store(v + 2, Ordering::SeqCst);
            },
            |s: &i64| s + 1,
        );
        let result =
            Sequential::model_check(0, &[set_42(), broken], to_sut, to_model);
        assert!(!result.passed);
        assert_eq!(result.steps_succeeded, 1);
        assert_eq!(result.expected, 43);
        assert_eq!(result.observed, 44);
    }

    #[test]
    fn possible_end_states_match_the_permutation_fixture() {
        let states = Parallel::calculate_possible_end_states(
            0,
            &[set_42(), set_0(), times_2(), plus_1()],
        );
        let expected: HashSet<i64> = [0, 42, 84, 85, 86, 43, 1, 2].into_iter().collect();
        assert_eq!(states, expected);
    }

    #[test]
    fn parallel_check_accepts_linearizable_executions() {
        let result = Parallel::parallel_check(
            0,
            &[set_42(), plus_1()],
            to_sut,
            to_model,
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(result.sequential.passed);
        assert!(
            result.valid_end_states.contains(&result.observed),
            "observed {} not in {:?}",
            result.observed,
            result.valid_end_states
        );
        assert!(result.passed);
    }

    #[test]
    fn worker_panic_is_an_infrastructure_error() {
        // Behaves in the sequential pre-pass, panics in the concurrent phase.
        let calls = Arc::new(AtomicI64::new(0));
        let exploding: IntCommand = Command::new(
            "EXPLODE",
            move |_: &AtomicI64| {
                if calls.fetch_add(1, Ordering::SeqCst) > 0 {
                    panic!("worker died");
                }
            },
            |s| *s,
        );
        let err = Parallel::parallel_check(
            0,
            &[exploding],
            to_sut,
            to_model,
            Duration::from_secs(5),
        )
        .unwrap_err();
        match err {
            ModelCheckError::WorkerPanic { command, message } => {
                assert_eq!(command, "EXPLODE");
                assert!(message.contains("worker died"));
            }
            other => panic!("expected worker panic, got {:?}", other),
        }
    }

    #[test]
    fn worker_timeout_is_an_infrastructure_error() {
        // Fast in the sequential pre-pass, stuck in the concurrent phase.
        let calls = Arc::new(AtomicI64::new(0));
        let stuck: IntCommand = Command::new(
            "SLEEP",
            move |_: &AtomicI64| {
                if calls.fetch_add(1, Ordering::SeqCst) > 0 {
                    thread::sleep(Duration::from_secs(60));
                }
            },
            |s| *s,
        );
        let err = Parallel::parallel_check(
            0,
            &[stuck],
            to_sut,
            to_model,
            Duration::from_millis(50),
        )
        .unwrap_err();
        match err {
            ModelCheckError::Timeout { command, .. } => assert_eq!(command, "SLEEP"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn sequential_failure_short_circuits_the_parallel_phase() {
        let broken = Command::new(
            "BROKEN_SET",
            |sut: &AtomicI64| sut.store(7, Ordering::SeqCst),
            |_: &i64| 42,
        );
        let result = Parallel::parallel_check(
            0,
            &[broken],
            to_sut,
            to_model,
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!result.passed);
        assert!(!result.sequential.passed);
        assert!(result.valid_end_states.is_empty());
    }
}
