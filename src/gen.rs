//! Generator combinators.
//!
//! A `Gen<T>` is a pure function from a randomness source to a value, closed
//! under mapping, zipping, filtering and mixing. All randomness flows through
//! the source's bounded draws, so every generated value has a decision trace
//! and is therefore shrinkable without generator-specific shrink code.
//!
//! Only the primitive constructors the engine itself needs live here; typed
//! generator DSLs are built on top of `from_fn` and `in_constraint`.

use std::fmt::Debug;
use std::rc::Rc;

use crate::constraint::Constraint;
use crate::error::GenError;
use crate::source::ShapedDataSource;

type RunFn<T> = dyn Fn(&mut ShapedDataSource<'_>) -> Result<T, GenError>;
type DescribeFn<T> = dyn Fn(&T) -> String;

/// A generation function plus a display formatter for failure reports.
pub struct Gen<T> {
    run: Rc<RunFn<T>>,
    describe: Rc<DescribeFn<T>>,
}

impl<T> Clone for Gen<T> {
    fn clone(&self) -> Self {
        Gen {
            run: Rc::clone(&self.run),
            describe: Rc::clone(&self.describe),
        }
    }
}

impl<T: Debug + 'static> Gen<T> {
    /// Wraps a raw generation function. The display form defaults to the
    /// value's `Debug` rendering.
    pub fn from_fn<F>(f: F) -> Gen<T>
    where
        F: Fn(&mut ShapedDataSource<'_>) -> Result<T, GenError> + 'static,
    {
        Gen {
            run: Rc::new(f),
            describe: Rc::new(|v: &T| format!("{:?}", v)),
        }
    }

    /// Always produces `value`, consuming no randomness.
    pub fn constant(value: T) -> Gen<T>
    where
        T: Clone,
    {
        Gen::from_fn(move |_| Ok(value.clone()))
    }
}

impl Gen<i64> {
    /// One bounded draw over `[lo, hi]` inclusive.
    pub fn in_range(lo: i64, hi: i64) -> Gen<i64> {
        Gen::in_constraint(Constraint::between(lo, hi))
    }

    /// One draw within an explicit constraint, shrink target included.
    pub fn in_constraint(constraint: Constraint) -> Gen<i64> {
        Gen::from_fn(move |source| Ok(source.next(constraint)))
    }
}

impl<T: 'static> Gen<T> {
    /// Runs the generator against a source.
    pub fn generate(&self, source: &mut ShapedDataSource<'_>) -> Result<T, GenError> {
        (self.run)(source)
    }

    /// Formats a produced value for display.
    pub fn as_string(&self, value: &T) -> String {
        (self.describe)(value)
    }

    /// Maps the produced value.
    pub fn map<U, F>(self, f: F) -> Gen<U>
    where
        U: Debug + 'static,
        F: Fn(T) -> U + 'static,
    {
        let run = self.run;
        Gen::from_fn(move |source| Ok(f(run(source)?)))
    }

    /// Combines two independent draws of this generator.
    pub fn map2<U, F>(self, f: F) -> Gen<U>
    where
        U: Debug + 'static,
        F: Fn(T, T) -> U + 'static,
    {
        let run = self.run;
        Gen::from_fn(move |source| {
            let a = run(source)?;
            let b = run(source)?;
            Ok(f(a, b))
        })
    }

    /// Combines three independent draws of this generator.
    pub fn map3<U, F>(self, f: F) -> Gen<U>
    where
        U: Debug + 'static,
        F: Fn(T, T, T) -> U + 'static,
    {
        let run = self.run;
        Gen::from_fn(move |source| {
            let a = run(source)?;
            let b = run(source)?;
            let c = run(source)?;
            Ok(f(a, b, c))
        })
    }

    /// Maps with access to fresh randomness.
    pub fn mutate<U, F>(self, f: F) -> Gen<U>
    where
        U: Debug + 'static,
        F: Fn(T, &mut ShapedDataSource<'_>) -> U + 'static,
    {
        let run = self.run;
        Gen::from_fn(move |source| {
            let value = run(source)?;
            Ok(f(value, source))
        })
    }

    /// Pairs this generator with an independent one.
    pub fn zip<U, V, F>(self, other: Gen<U>, f: F) -> Gen<V>
    where
        U: 'static,
        V: Debug + 'static,
        F: Fn(T, U) -> V + 'static,
    {
        let a = self.run;
        let b = other.run;
        Gen::from_fn(move |source| {
            let x = a(source)?;
            let y = b(source)?;
            Ok(f(x, y))
        })
    }

    /// Triples this generator with two independent ones.
    pub fn zip3<U, V, W, F>(self, second: Gen<U>, third: Gen<V>, f: F) -> Gen<W>
    where
        U: 'static,
        V: 'static,
        W: Debug + 'static,
        F: Fn(T, U, V) -> W + 'static,
    {
        let a = self.run;
        let b = second.run;
        let c = third.run;
        Gen::from_fn(move |source| {
            let x = a(source)?;
            let y = b(source)?;
            let z = c(source)?;
            Ok(f(x, y, z))
        })
    }

    /// Filters generated values. Rejected attempts are rolled back so they
    /// leave no decision trace, then retried until the predicate passes or
    /// the source's attempts budget runs out.
    pub fn assuming<P>(self, predicate: P) -> Gen<T>
    where
        P: Fn(&T) -> bool + 'static,
    {
        let run = self.run;
        let describe = self.describe;
        Gen {
            run: Rc::new(move |source: &mut ShapedDataSource<'_>| loop {
                let checkpoint = source.mark();
                let value = run(source)?;
                if predicate(&value) {
                    source.commit(checkpoint);
                    return Ok(value);
                }
                source.rollback(checkpoint);
                source.register_failed_assumption()?;
            }),
            describe,
        }
    }

    /// 50/50 choice between this generator and another, decided by exactly
    /// one extra `[0, 1]` draw that shrinks toward this generator.
    pub fn mix(self, other: Gen<T>) -> Gen<T> {
        let a = self.run;
        let b = other.run;
        let describe = self.describe;
        let coin = Constraint::zero_to_one().with_shrink_point(0);
        Gen {
            run: Rc::new(move |source: &mut ShapedDataSource<'_>| {
                if source.next(coin) == 0 {
                    a(source)
                } else {
                    b(source)
                }
            }),
            describe,
        }
    }

    /// Replaces the display formatter without altering generation.
    pub fn described_as<F>(self, formatter: F) -> Gen<T>
    where
        F: Fn(&T) -> String + 'static,
    {
        Gen {
            run: self.run,
            describe: Rc::new(formatter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::XorShiftRng;

    fn sample<T: 'static>(gen: &Gen<T>, seed: u64) -> Result<T, GenError> {
        let mut rng = XorShiftRng::new(seed);
        let mut source = ShapedDataSource::new(&mut rng, Vec::new(), 100);
        gen.generate(&mut source)
    }

    #[test]
    fn in_range_draws_within_bounds() {
        let gen = Gen::in_range(5, 9);
        for seed in 1..500 {
            let v = sample(&gen, seed).unwrap();
            assert!((5..=9).contains(&v));
        }
    }

    #[test]
    fn map_transforms_values() {
        let gen = Gen::in_range(0, 10).map(|v| v * 2);
        for seed in 1..100 {
            let v = sample(&gen, seed).unwrap();
            assert_eq!(v % 2, 0);
            assert!(v <= 20);
        }
    }

    #[test]
    fn map2_draws_twice_from_self() {
        let gen = Gen::in_range(0, 100).map2(|a, b| (a, b));
        let mut rng = XorShiftRng::new(17);
        let mut source = ShapedDataSource::new(&mut rng, Vec::new(), 10);
        gen.generate(&mut source).unwrap();
        assert_eq!(source.precursor().len(), 2);
    }

    #[test]
    fn zip_combines_independent_generators() {
        let gen = Gen::in_range(0, 4).zip(Gen::in_range(10, 14), |a, b| a + b);
        for seed in 1..200 {
            let v = sample(&gen, seed).unwrap();
            assert!((10..=18).contains(&v));
        }
    }

    #[test]
    fn zip3_combines_three() {
        let gen = Gen::in_range(1, 1).zip3(
            Gen::in_range(2, 2),
            Gen::in_range(3, 3),
            |a, b, c| (a, b, c),
        );
        assert_eq!(sample(&gen, 1).unwrap(), (1, 2, 3));
    }

    #[test]
    fn assuming_never_yields_filtered_values() {
        let gen = Gen::in_range(0, 100).assuming(|v| v % 2 == 0);
        for seed in 1..=1000 {
            let v = sample(&gen, seed).unwrap();
            assert_eq!(v % 2, 0, "filter let through {}", v);
        }
    }

    #[test]
    fn assuming_rejections_leave_no_trace() {
        let gen = Gen::in_range(0, 100).assuming(|v| v % 2 == 0);
        let mut rng = XorShiftRng::new(23);
        let mut source = ShapedDataSource::new(&mut rng, Vec::new(), 50);
        gen.generate(&mut source).unwrap();
        // Only the accepted draw remains in the trace.
        assert_eq!(source.precursor().len(), 1);
        assert_eq!(source.precursor().current()[0] % 2, 0);
    }

    #[test]
    fn impossible_assumption_exhausts_the_budget() {
        let gen = Gen::in_range(0, 100).assuming(|_| false);
        let mut rng = XorShiftRng::new(29);
        let mut source = ShapedDataSource::new(&mut rng, Vec::new(), 7);
        assert_eq!(
            gen.generate(&mut source),
            Err(GenError::AttemptsExhausted { attempts: 7 })
        );
        assert_eq!(source.failed_assumptions(), 8);
    }

    #[test]
    fn mix_consumes_exactly_one_extra_draw() {
        let gen = Gen::in_range(0, 9).mix(Gen::in_range(10, 19));
        let mut rng = XorShiftRng::new(31);
        let mut source = ShapedDataSource::new(&mut rng, Vec::new(), 10);
        let v = gen.generate(&mut source).unwrap();
        assert_eq!(source.precursor().len(), 2);
        let coin = source.precursor().current()[0];
        if coin == 0 {
            assert!((0..=9).contains(&v));
        } else {
            assert!((10..=19).contains(&v));
        }
    }

    #[test]
    fn mix_visits_both_branches() {
        let gen = Gen::in_range(0, 0).mix(Gen::in_range(1, 1));
        let mut seen = [false, false];
        for seed in 1..200 {
            seen[sample(&gen, seed).unwrap() as usize] = true;
        }
        assert!(seen[0] && seen[1], "mix never took one of its branches");
    }

    #[test]
    fn described_as_changes_display_only() {
        let gen = Gen::in_range(0, 5).described_as(|v| format!("<{}>", v));
        assert_eq!(gen.as_string(&3), "<3>");
    }

    #[test]
    fn as_string_defaults_to_debug_form() {
        let gen = Gen::in_range(0, 5);
        assert_eq!(gen.as_string(&3), "3");
    }

    #[test]
    fn constant_consumes_no_randomness() {
        let gen = Gen::constant(99u8);
        let mut rng = XorShiftRng::new(1);
        let mut source = ShapedDataSource::new(&mut rng, Vec::new(), 10);
        assert_eq!(gen.generate(&mut source).unwrap(), 99);
        assert!(source.precursor().is_empty());
    }

    #[test]
    fn mutate_sees_fresh_randomness() {
        let gen = Gen::in_range(0, 0)
            .mutate(|v, source| v + source.next(Constraint::between(1, 1)));
        assert_eq!(sample(&gen, 1).unwrap(), 1);
    }
}
