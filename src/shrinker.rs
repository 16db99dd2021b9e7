//! Trace-based shrinking.
//!
//! The shrinker never sees the generated type: it mutates the falsifying
//! decision trace (step positions toward their shrink targets, drop trailing
//! positions) and replays the same generator with the mutated trace forced.
//! A candidate is kept only when the replay still satisfies all assumptions,
//! the property still fails, and the trace got strictly smaller under the
//! (length, distance-from-target) ordering. Greedy: the first improving
//! candidate of a cycle wins the cycle.
//!
//! The result is locally minimal with respect to these moves, not globally
//! minimal.

use tracing::debug;

use crate::constraint::Constraint;
use crate::distribution::{BoundarySkewedDistribution, Sample};

/// Outcome of evaluating the property against one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyOutcome {
    Passed,
    Falsified { error: Option<String> },
}

/// What the shrink search found.
#[derive(Debug)]
pub struct ShrinkResult<T> {
    /// Smallest-known falsifying value.
    pub smallest: T,
    /// Error carried by the smallest value's falsification, if the property
    /// panicked rather than returning false.
    pub error: Option<String>,
    /// Earlier falsifying values accepted on the way down, in visit order.
    pub intermediate: Vec<T>,
    /// Shrink cycles actually spent.
    pub cycles_used: u32,
}

/// Sort key for traces: shorter first, then lexicographic distance from each
/// position's shrink target.
fn sort_key(entries: &[(Constraint, i64)]) -> (usize, Vec<u128>) {
    let distances = entries
        .iter()
        .map(|(c, v)| (*v as i128 - c.effective_shrink_target() as i128).unsigned_abs())
        .collect();
    (entries.len(), distances)
}

/// Candidate forced traces derived from the current one, most aggressive
/// moves first.
fn candidates(entries: &[(Constraint, i64)]) -> Vec<Vec<i64>> {
    let values: Vec<i64> = entries.iter().map(|(_, v)| *v).collect();
    let mut out = Vec::new();

    // Jump a position straight to its shrink target.
    for (i, (c, v)) in entries.iter().enumerate() {
        let target = c.effective_shrink_target();
        if *v != target {
            let mut candidate = values.clone();
            candidate[i] = target;
            out.push(candidate);
        }
    }
    // Halve the distance to the target.
    for (i, (c, v)) in entries.iter().enumerate() {
        let target = c.effective_shrink_target();
        let delta = *v as i128 - target as i128;
        let halved = (*v as i128 - delta / 2) as i64;
        if delta / 2 != 0 {
            let mut candidate = values.clone();
            candidate[i] = halved;
            out.push(candidate);
        }
    }
    // Single step toward the target.
    for (i, (c, v)) in entries.iter().enumerate() {
        let target = c.effective_shrink_target();
        if *v != target {
            let step = if *v > target { *v - 1 } else { *v + 1 };
            let mut candidate = values.clone();
            candidate[i] = step;
            out.push(candidate);
        }
    }
    // Drop the trailing position to shorten variable-length structures.
    if !values.is_empty() {
        out.push(values[..values.len() - 1].to_vec());
    }
    out
}

/// Searches for a smaller falsifying value, bounded by `cycles`.
///
/// `original` must already falsify; `original_error` is its captured error.
/// `evaluate` re-runs the property against a replayed value.
pub fn shrink<T, F>(
    distribution: &mut BoundarySkewedDistribution<T>,
    cycles: u32,
    original: Sample<T>,
    original_error: Option<String>,
    evaluate: F,
) -> ShrinkResult<T>
where
    T: 'static,
    F: Fn(&T) -> PropertyOutcome,
{
    let mut current_entries: Vec<(Constraint, i64)> = original.precursor.entries().to_vec();
    let mut current_value = original.value;
    let mut current_error = original_error;
    let mut accepted: Vec<T> = Vec::new();
    let mut cycles_used = 0;

    while cycles_used < cycles {
        cycles_used += 1;
        let current_key = sort_key(&current_entries);
        let mut improved = false;

        for forced in candidates(&current_entries) {
            let sample = match distribution.replay(forced) {
                Ok(sample) => sample,
                // Replay itself exhausted the attempts budget: discard.
                Err(_) => continue,
            };
            // A rejected assumption during replay disqualifies the candidate.
            if sample.failed_assumptions > 0 {
                continue;
            }
            let candidate_key = sort_key(sample.precursor.entries());
            if candidate_key >= current_key {
                continue;
            }
            if let PropertyOutcome::Falsified { error } = evaluate(&sample.value) {
                debug!(
                    cycle = cycles_used,
                    trace_len = sample.precursor.len(),
                    "accepted smaller falsifying trace"
                );
                accepted.push(std::mem::replace(&mut current_value, sample.value));
                current_entries = sample.precursor.entries().to_vec();
                current_error = error;
                improved = true;
                break;
            }
        }

        if !improved {
            break;
        }
    }

    ShrinkResult {
        smallest: current_value,
        error: current_error,
        intermediate: accepted,
        cycles_used,
    }
}
