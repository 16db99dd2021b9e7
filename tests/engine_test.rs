//! End-to-end checks of the generation/replay/shrink pipeline.

use quicktheory::{CheckOutcome, Constraint, Gen, Strategy, TheoryRunner};

fn runner(seed: u64, examples: u32) -> TheoryRunner {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    TheoryRunner::new(Strategy::with_seed(seed).with_examples(examples).unwrap())
}

#[test]
fn holds_for_a_true_property() {
    let gen = Gen::in_range(0, 1000).map(|v| v * 2);
    let outcome = runner(1, 500).check(gen, |v| v % 2 == 0);
    assert!(matches!(outcome, CheckOutcome::Passed { examples_executed: 500 }));
}

#[test]
fn finds_and_shrinks_the_minimal_counterexample() {
    // Fails for all n > 3 over [0, 100]: the locally minimal value is 4.
    for seed in [1u64, 99, 424242, 8675309] {
        match runner(seed, 1000).check(Gen::in_range(0, 100), |v| *v <= 3) {
            CheckOutcome::Falsified { smallest, .. } => {
                assert_eq!(smallest, 4, "seed {}", seed)
            }
            other => panic!("seed {}: expected falsification, got {:?}", seed, other),
        }
    }
}

#[test]
fn shrinks_pairs_toward_both_targets() {
    let gen = Gen::in_range(0, 1000).zip(Gen::in_range(0, 1000), |a, b| (a, b));
    match runner(5, 2000).check(gen, |(a, b)| a + b <= 100) {
        CheckOutcome::Falsified { smallest, shrinks, .. } => {
            let (a, b) = smallest;
            assert!(a + b == 101, "not locally minimal: ({}, {})", a, b);
            for (a, b) in shrinks {
                assert!(a + b > 100);
            }
        }
        other => panic!("expected falsification, got {:?}", other),
    }
}

#[test]
fn boundary_values_are_tried_before_random_search() {
    // The maximum is visited within the first three examples, so even a tiny
    // example budget catches a max-boundary bug.
    let constraint = Constraint::between(0, 1_000_000_000);
    match runner(77, 3).check(Gen::in_constraint(constraint), |v| *v < 1_000_000_000) {
        CheckOutcome::Falsified { examples_executed, .. } => {
            assert!(examples_executed <= 3);
        }
        other => panic!("expected falsification, got {:?}", other),
    }
}

#[test]
fn assumptions_filter_without_false_positives() {
    // A 1-in-7 filter needs headroom beyond the default attempts budget.
    let strategy = Strategy::with_seed(13)
        .with_examples(1000)
        .unwrap()
        .with_generate_attempts(200)
        .unwrap();
    let gen = Gen::in_range(0, 10_000).assuming(|v| v % 7 == 0);
    let outcome = TheoryRunner::new(strategy).check(gen, |v| v % 7 == 0);
    assert!(matches!(outcome, CheckOutcome::Passed { .. }));
}

#[test]
fn impossible_assumption_reports_exhaustion_with_zero_valid() {
    let gen = Gen::in_range(0, 10).assuming(|_| false);
    match runner(13, 100).check(gen, |_| true) {
        CheckOutcome::Exhausted { valid_examples, requested } => {
            assert_eq!(valid_examples, 0);
            assert_eq!(requested, 100);
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

#[test]
fn mixed_generators_shrink_through_the_simpler_branch() {
    let gen = Gen::in_range(0, 100).mix(Gen::in_range(1000, 2000));
    match runner(3, 2000).check(gen, |v| *v < 50) {
        CheckOutcome::Falsified { smallest, .. } => {
            // The coin shrinks toward the first branch; its minimum failing
            // value is 50.
            assert_eq!(smallest, 50);
        }
        other => panic!("expected falsification, got {:?}", other),
    }
}

#[test]
fn combined_traces_report_total_byte_length() {
    use quicktheory::Precursor;
    let mut a = Precursor::new();
    let mut b = Precursor::new();
    for i in 0..4 {
        a.store(Constraint::between(0, 100), i);
    }
    for i in 0..3 {
        b.store(Constraint::zero_to_one(), i % 2);
    }
    a.combine(&b);
    assert_eq!(a.len(), 7);
    assert_eq!(a.bytes().len(), 56);
    assert_eq!(a.current(), vec![0, 1, 2, 3, 0, 1, 0]);
}

#[test]
fn env_variables_configure_the_default_strategy() {
    // One test owns all QT_* variables to keep env mutation race-free.
    std::env::set_var("QT_SEED", "12345");
    std::env::set_var("QT_EXAMPLES", "250");
    std::env::set_var("QT_SHRINKS", "500");
    std::env::set_var("QT_ATTEMPTS", "4");
    let strategy = Strategy::from_env().unwrap();
    assert_eq!(strategy.seed(), 12345);
    assert_eq!(strategy.examples(), 250);
    assert_eq!(strategy.shrink_cycles(), 500);
    assert_eq!(strategy.generate_attempts(), 4);

    std::env::set_var("QT_EXAMPLES", "not-a-number");
    assert!(Strategy::from_env().is_err());
    std::env::remove_var("QT_SEED");
    std::env::remove_var("QT_EXAMPLES");
    std::env::remove_var("QT_SHRINKS");
    std::env::remove_var("QT_ATTEMPTS");
}
