//! Decision traces.
//!
//! A `Precursor` records, in draw order, every `(constraint, value)` pair of
//! one generation run. Replaying the same generator with the recorded values
//! forced reproduces the same output, which is what makes generic shrinking
//! possible: the shrinker mutates the trace, not the produced value.

use byteorder::{BigEndian, WriteBytesExt};

use crate::constraint::Constraint;

/// Ordered record of every bounded draw made during one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Precursor {
    entries: Vec<(Constraint, i64)>,
}

impl Precursor {
    pub fn new() -> Precursor {
        Precursor::default()
    }

    /// Appends one draw. Called once per draw, in draw order.
    pub fn store(&mut self, constraint: Constraint, value: i64) {
        self.entries.push((constraint, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The drawn values in draw order.
    pub fn current(&self) -> Vec<i64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn entries(&self) -> &[(Constraint, i64)] {
        &self.entries
    }

    /// Lower bound of the constraint at position `i`.
    pub fn min(&self, i: usize) -> i64 {
        self.entries[i].0.min()
    }

    /// Upper bound of the constraint at position `i`.
    pub fn max(&self, i: usize) -> i64 {
        self.entries[i].0.max()
    }

    /// Shrink target of the constraint at position `i`, if declared.
    pub fn shrink_target(&self, i: usize) -> Option<i64> {
        self.entries[i].0.shrink_target()
    }

    /// Appends another trace's entries, preserving both orders. Used when a
    /// property spans multiple generators.
    pub fn combine(&mut self, other: &Precursor) {
        self.entries.extend_from_slice(&other.entries);
    }

    /// Drops entries past `len`. This is the rollback primitive behind the
    /// detach/commit checkpointing in the data source.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Opaque fingerprint for feedback consumers: the 8-byte big-endian
    /// encoding of each drawn value, concatenated without length prefixes.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * 8);
        for (_, v) in &self.entries {
            // Writing to a Vec cannot fail.
            out.write_i64::<BigEndian>(*v).expect("vec write");
        }
        out
    }
}
