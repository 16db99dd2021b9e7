//! Pluggable search guidance.
//!
//! A `Guidance` observes each executed example and may propose forced traces
//! for subsequent generations (a coverage-feedback implementation would steer
//! toward unexplored branches; its instrumentation lives outside this crate
//! and talks to the engine only through this trait). State is scoped to one
//! theory check and never persisted across runs.
//!
//! Selection is explicit: a factory injected through the `Strategy`, with the
//! no-op default used when nothing is configured.

use crate::precursor::Precursor;

/// A forced trace proposed by guidance, consumed positionally ahead of
/// randomness during one replay.
pub type ForcedTrace = Vec<i64>;

/// Observer/advisor protocol invoked around every example of a theory check.
pub trait Guidance {
    /// A new example's decision trace has been captured, before execution.
    fn new_example(&mut self, precursor: &Precursor);

    /// The property ran (outcome not yet known to guidance).
    fn example_executed(&mut self);

    /// Propose forced traces to try in addition to pure-random generation.
    /// `examples_executed` is how many examples have run so far.
    fn suggest_values(
        &mut self,
        examples_executed: usize,
        precursor: &Precursor,
    ) -> Vec<ForcedTrace>;

    /// The example's full outcome, including guidance bookkeeping, is final.
    fn example_complete(&mut self);
}

/// Default guidance: pure random search, proposes nothing.
#[derive(Debug, Default)]
pub struct NoGuidance;

impl Guidance for NoGuidance {
    fn new_example(&mut self, _precursor: &Precursor) {}

    fn example_executed(&mut self) {}

    fn suggest_values(
        &mut self,
        _examples_executed: usize,
        _precursor: &Precursor,
    ) -> Vec<ForcedTrace> {
        Vec::new()
    }

    fn example_complete(&mut self) {}
}
