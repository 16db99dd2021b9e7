//! Run configuration and the reporting boundary.
//!
//! `Strategy` is an immutable bundle: every `with_*` mutator returns a new
//! value. Numeric parameters are validated when set, never at generation
//! time, so a bad configuration fails the moment it is built. The default
//! strategy reads the `QT_*` environment variables once.

use std::rc::Rc;

use tracing::{error, warn};

use crate::error::ConfigError;
use crate::guidance::{Guidance, NoGuidance};

/// Receives the outcome of a falsified or exhausted theory check and turns
/// it into something human-readable. The engine only defines the boundary.
pub trait Reporter {
    /// A property was falsified. `smallest` is the display form of the
    /// minimal counterexample, `other_shrunks` the intermediate falsifying
    /// values visited on the way there.
    fn falsification(
        &self,
        seed: u64,
        examples_used: u32,
        smallest: &str,
        error: Option<&str>,
        other_shrunks: &[String],
    );

    /// Fewer valid examples than requested could be generated.
    fn value_exhausted(&self, valid_examples: u32, requested: u32);
}

/// Default reporter: structured log events via `tracing`.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn falsification(
        &self,
        seed: u64,
        examples_used: u32,
        smallest: &str,
        error: Option<&str>,
        other_shrunks: &[String],
    ) {
        error!(
            seed,
            examples_used,
            smallest,
            error = error.unwrap_or("<property returned false>"),
            shrink_chain = ?other_shrunks,
            "property falsified"
        );
    }

    fn value_exhausted(&self, valid_examples: u32, requested: u32) {
        warn!(
            valid_examples,
            requested, "gave up generating examples before reaching the requested count"
        );
    }
}

/// Immutable configuration for one theory check.
pub struct Strategy {
    seed: u64,
    examples: u32,
    shrink_cycles: u32,
    generate_attempts: u32,
    min_stateful_steps: u32,
    max_stateful_steps: u32,
    guidance: Rc<dyn Fn() -> Box<dyn Guidance>>,
    reporter: Rc<dyn Reporter>,
}

impl Clone for Strategy {
    fn clone(&self) -> Self {
        Strategy {
            seed: self.seed,
            examples: self.examples,
            shrink_cycles: self.shrink_cycles,
            generate_attempts: self.generate_attempts,
            min_stateful_steps: self.min_stateful_steps,
            max_stateful_steps: self.max_stateful_steps,
            guidance: Rc::clone(&self.guidance),
            reporter: Rc::clone(&self.reporter),
        }
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("seed", &self.seed)
            .field("examples", &self.examples)
            .field("shrink_cycles", &self.shrink_cycles)
            .field("generate_attempts", &self.generate_attempts)
            .field("min_stateful_steps", &self.min_stateful_steps)
            .field("max_stateful_steps", &self.max_stateful_steps)
            .finish()
    }
}

const DEFAULT_EXAMPLES: u32 = 1000;
const DEFAULT_ATTEMPTS: u32 = 10;
const DEFAULT_MIN_STEPS: u32 = 1;
const DEFAULT_MAX_STEPS: u32 = 32;

impl Default for Strategy {
    fn default() -> Self {
        Strategy::with_time_seed()
    }
}

impl Strategy {
    /// Fresh strategy with library defaults and a time-derived seed.
    pub fn with_time_seed() -> Strategy {
        Strategy::with_seed(crate::rng::XorShiftRng::from_time().initial_seed())
    }

    /// Fresh strategy with library defaults and an explicit seed.
    pub fn with_seed(seed: u64) -> Strategy {
        Strategy {
            seed,
            examples: DEFAULT_EXAMPLES,
            shrink_cycles: DEFAULT_EXAMPLES * 100,
            generate_attempts: DEFAULT_ATTEMPTS,
            min_stateful_steps: DEFAULT_MIN_STEPS,
            max_stateful_steps: DEFAULT_MAX_STEPS,
            guidance: Rc::new(|| Box::new(NoGuidance)),
            reporter: Rc::new(TracingReporter),
        }
    }

    /// Builds the default strategy from the environment, read once:
    /// `QT_SEED` (time-derived if absent), `QT_EXAMPLES` (1000),
    /// `QT_SHRINKS` (examples x 100), `QT_ATTEMPTS` (10).
    pub fn from_env() -> Result<Strategy, ConfigError> {
        fn read<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
            match std::env::var(name) {
                Ok(raw) => raw
                    .parse::<T>()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidEnvVar { name, value: raw }),
                Err(_) => Ok(None),
            }
        }

        let mut strategy = match read::<i64>("QT_SEED")? {
            Some(seed) => Strategy::with_seed(seed as u64),
            None => Strategy::with_time_seed(),
        };
        if let Some(examples) = read::<u32>("QT_EXAMPLES")? {
            strategy = strategy.with_examples(examples)?;
        }
        if let Some(shrinks) = read::<u32>("QT_SHRINKS")? {
            strategy = strategy.with_shrink_cycles(shrinks)?;
        }
        if let Some(attempts) = read::<u32>("QT_ATTEMPTS")? {
            strategy = strategy.with_generate_attempts(attempts)?;
        }
        Ok(strategy)
    }

    pub fn with_fixed_seed(mut self, seed: u64) -> Strategy {
        self.seed = seed;
        self
    }

    /// Sets the example budget; also scales the shrink-cycle default.
    pub fn with_examples(mut self, examples: u32) -> Result<Strategy, ConfigError> {
        if examples == 0 {
            return Err(ConfigError::InvalidExamples(examples));
        }
        self.examples = examples;
        self.shrink_cycles = examples.saturating_mul(100);
        Ok(self)
    }

    pub fn with_shrink_cycles(mut self, cycles: u32) -> Result<Strategy, ConfigError> {
        if cycles == 0 {
            return Err(ConfigError::InvalidShrinkCycles(cycles));
        }
        self.shrink_cycles = cycles;
        Ok(self)
    }

    pub fn with_generate_attempts(mut self, attempts: u32) -> Result<Strategy, ConfigError> {
        if attempts == 0 {
            return Err(ConfigError::InvalidAttempts(attempts));
        }
        self.generate_attempts = attempts;
        Ok(self)
    }

    pub fn with_min_stateful_steps(mut self, min: u32) -> Result<Strategy, ConfigError> {
        if min == 0 || min > self.max_stateful_steps {
            return Err(ConfigError::InvalidStepBounds {
                min,
                max: self.max_stateful_steps,
            });
        }
        self.min_stateful_steps = min;
        Ok(self)
    }

    pub fn with_max_stateful_steps(mut self, max: u32) -> Result<Strategy, ConfigError> {
        if max < self.min_stateful_steps {
            return Err(ConfigError::InvalidStepBounds {
                min: self.min_stateful_steps,
                max,
            });
        }
        self.max_stateful_steps = max;
        Ok(self)
    }

    /// Injects a guidance factory, called once per theory check.
    pub fn with_guidance<F>(mut self, factory: F) -> Strategy
    where
        F: Fn() -> Box<dyn Guidance> + 'static,
    {
        self.guidance = Rc::new(factory);
        self
    }

    pub fn with_reporter<R: Reporter + 'static>(mut self, reporter: R) -> Strategy {
        self.reporter = Rc::new(reporter);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn examples(&self) -> u32 {
        self.examples
    }

    pub fn shrink_cycles(&self) -> u32 {
        self.shrink_cycles
    }

    pub fn generate_attempts(&self) -> u32 {
        self.generate_attempts
    }

    pub fn min_stateful_steps(&self) -> u32 {
        self.min_stateful_steps
    }

    pub fn max_stateful_steps(&self) -> u32 {
        self.max_stateful_steps
    }

    /// Fresh guidance instance for one check.
    pub fn new_guidance(&self) -> Box<dyn Guidance> {
        (self.guidance)()
    }

    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }
}
