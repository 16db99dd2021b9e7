//! quicktheory: a property-based testing engine.
//!
//! Values are produced by [`Gen`] combinators drawing bounded random values
//! through a [`ShapedDataSource`], which records every draw as a decision
//! trace ([`Precursor`]). When a property is falsified, the [`shrinker`]
//! mutates that trace and replays the same generator to search for a smaller
//! counterexample, so generators never hand-author shrink strategies.
//! [`TheoryRunner`] orchestrates generation, execution, shrinking and
//! reporting; [`stateful`] and [`model`] add model-based and linearizability
//! checking on top of the same machinery.
//!
//! Reproducibility contract: the same seed, with the same generator
//! composition, replays the identical example stream.

pub mod constraint;
pub mod distribution;
pub mod error;
pub mod gen;
pub mod guidance;
pub mod model;
pub mod precursor;
pub mod rng;
pub mod runner;
pub mod shrinker;
pub mod source;
pub mod stateful;
pub mod strategy;

pub use constraint::Constraint;
pub use distribution::{BoundarySkewedDistribution, Sample};
pub use error::{ConfigError, GenError, ModelCheckError};
pub use gen::Gen;
pub use guidance::{ForcedTrace, Guidance, NoGuidance};
pub use model::{Command, Parallel, ParallelResult, Sequential, SequentialResult};
pub use precursor::Precursor;
pub use rng::XorShiftRng;
pub use runner::{CheckOutcome, TheoryRunner};
pub use shrinker::{shrink, PropertyOutcome, ShrinkResult};
pub use source::{Checkpoint, ShapedDataSource};
pub use stateful::{StatefulRunResult, StatefulTheory, Step};
pub use strategy::{Reporter, Strategy, TracingReporter};
