//! Error taxonomy for the engine.
//!
//! Three distinct failure families: generation giving up (assumption
//! exhaustion), invalid configuration (caught synchronously at construction
//! time), and infrastructure faults during parallel model checking. Property
//! falsification is deliberately *not* an error type; it is the
//! `CheckOutcome::Falsified` result of a run.

use thiserror::Error;

/// A generation attempt could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    /// A filter or step precondition rejected every candidate within the
    /// generate-attempts budget.
    #[error(
        "gave up generating a value after {attempts} failed assumptions; \
         weaken the assumption or raise the attempts budget"
    )]
    AttemptsExhausted { attempts: u32 },
}

/// Invalid strategy or constraint parameters. Raised when the configuration
/// is built, never deferred to generation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("examples must be at least 1, got {0}")]
    InvalidExamples(u32),

    #[error("shrink cycles must be at least 1, got {0}")]
    InvalidShrinkCycles(u32),

    #[error("generate attempts must be at least 1, got {0}")]
    InvalidAttempts(u32),

    #[error("stateful step bounds must satisfy 1 <= min <= max, got [{min}, {max}]")]
    InvalidStepBounds { min: u32, max: u32 },

    #[error("environment variable {name} holds unparseable value {value:?}")]
    InvalidEnvVar { name: &'static str, value: String },
}

/// The parallel model-checking harness itself mis-executed. Always fatal:
/// never retried, never shrunk, and distinct from a detected race (which is a
/// property failure, not an error).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelCheckError {
    #[error("worker task running {command:?} did not finish within {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    #[error("worker task running {command:?} panicked: {message}")]
    WorkerPanic { command: String, message: String },
}
