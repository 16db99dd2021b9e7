//! Constraints describe the legal domain of one random draw: an inclusive
//! `i64` range plus an optional shrink target the shrinker steers toward.
//!
//! Constraints are small immutable values. Two constraints with equal bounds
//! but different shrink targets compare unequal, but only the bounds decide
//! whether a drawn value is legal.

/// Inclusive numeric range with an optional shrink target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constraint {
    min: i64,
    max: i64,
    shrink_target: Option<i64>,
}

/// Canonical constraint for the common single-bit `[0, 1]` draw.
pub const ZERO_TO_ONE: Constraint = Constraint {
    min: 0,
    max: 1,
    shrink_target: None,
};

impl Constraint {
    /// A constraint over `[min, max]` inclusive. `min` must not exceed `max`.
    pub fn between(min: i64, max: i64) -> Constraint {
        assert!(min <= max, "invalid constraint: min {} > max {}", min, max);
        Constraint {
            min,
            max,
            shrink_target: None,
        }
    }

    /// The full `i64` domain.
    pub fn none() -> Constraint {
        Constraint::between(i64::MIN, i64::MAX)
    }

    /// The canonical `[0, 1]` constraint.
    pub fn zero_to_one() -> Constraint {
        ZERO_TO_ONE
    }

    /// Attaches a shrink target, clamped into the range. Returns `self`
    /// unchanged when `point` already equals the current target, so repeated
    /// application is an identity and costs nothing.
    pub fn with_shrink_point(self, point: i64) -> Constraint {
        let clamped = point.clamp(self.min, self.max);
        if self.shrink_target == Some(clamped) {
            return self;
        }
        Constraint {
            shrink_target: Some(clamped),
            ..self
        }
    }

    /// Removes any shrink target.
    pub fn with_no_shrink_point(self) -> Constraint {
        if self.shrink_target.is_none() {
            return self;
        }
        Constraint {
            shrink_target: None,
            ..self
        }
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn shrink_target(&self) -> Option<i64> {
        self.shrink_target
    }

    /// The value shrinking steers toward: the declared target, else zero
    /// clamped into the range.
    pub fn effective_shrink_target(&self) -> i64 {
        self.shrink_target
            .unwrap_or_else(|| 0i64.clamp(self.min, self.max))
    }
}
