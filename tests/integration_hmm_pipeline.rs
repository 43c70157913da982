//! Integration tests for the hidden Markov model pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end flow through the public `markov` API: model
//!   construction, training with each learner, and inference on the fitted
//!   model.
//! - Pin the classic reference behaviors: the 3-state worked example, the
//!   supervised closed form, the never-visited-state guard, and agreement
//!   between Baum-Welch and Viterbi training on zero-entropy data.
//!
//! Coverage
//! --------
//! - `markov::learning`: Baum-Welch, Viterbi training, supervised MLE,
//!   parallel restarts and cross-thread cancellation.
//! - `markov::core`: decode determinism, sampling, row-stochastic
//!   invariant after every training call.
//!
//! Exclusions
//! ----------
//! - Per-distribution fitting details and guard arithmetic; those are
//!   covered by unit tests.
//! - Python bindings.
use std::{thread, time::Duration};

use ndarray::array;
use rand::{SeedableRng, rngs::StdRng};
use rust_hmm::markov::prelude::*;

const STOCHASTIC_TOL: f64 = 1e-6;

/// Every probability vector of `model` sums to one and holds no NaN.
fn assert_row_stochastic<E: EmissionModel>(model: &HiddenMarkovModel<E>) {
    let pi = model.initial_probabilities();
    assert!((pi.sum() - 1.0).abs() < STOCHASTIC_TOL, "initial sums to {}", pi.sum());
    for (i, row) in model.transition_probabilities().rows().into_iter().enumerate() {
        assert!(row.iter().all(|p| p.is_finite()), "row {i} has non-finite entries");
        assert!((row.sum() - 1.0).abs() < STOCHASTIC_TOL, "row {i} sums to {}", row.sum());
    }
}

/// The sequences of the 3-state, 2-symbol worked example: every sequence
/// opens with symbol 0 and is followed mostly by 1s.
fn worked_example_sequences() -> Vec<Vec<usize>> {
    vec![
        vec![0, 1, 1, 1, 1, 0, 1, 1, 1, 1],
        vec![0, 1, 1, 1, 0, 1, 1, 1, 1, 1],
        vec![0, 1, 1, 1, 1, 1, 1, 1, 1, 1],
        vec![0, 1, 1, 1, 1, 1],
        vec![0, 1, 1, 1, 1, 1, 1],
        vec![0, 1, 1, 1, 1, 1, 1, 1, 1, 1],
        vec![0, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    ]
}

fn uniform_discrete(states: usize, symbols: usize) -> HiddenMarkovModel<DiscreteEmission> {
    let topo = Topology::ergodic(states).expect("ergodic topology with states > 0");
    let emissions = vec![DiscreteEmission::uniform(symbols).expect("symbols > 0"); states];
    HiddenMarkovModel::from_topology(&topo, emissions).expect("topology model is valid")
}

#[test]
// Purpose
// -------
// Reproduce the classic worked example end to end.
//
// Given
// -----
// - A 3-state ergodic model with uniform 2-symbol emissions.
// - The seven worked-example sequences; Baum-Welch with tolerance 1e-4.
//
// Expect
// ------
// - `Converged`, non-decreasing history, row-stochastic model.
// - `exp(evaluate([0, 1])) ≈ 1` (> 0.99) and `exp(evaluate([1, 1])) ≈ 0`
//   (< 1e-3).
fn baum_welch_reproduces_worked_example() {
    // Arrange
    let mut model = uniform_discrete(3, 2);
    let seqs = worked_example_sequences();
    let opts = TrainOptions::new(1e-4, 0).expect("valid tolerance");

    // Act
    let outcome = BaumWelchLearning::new(opts).fit(&mut model, &seqs, None).expect("training");

    // Assert
    assert_eq!(outcome.status, LearningStatus::Converged);
    assert!(outcome.history.windows(2).all(|w| w[1] >= w[0] - 1e-10));
    assert_row_stochastic(&model);
    let p01 = model.evaluate(&[0, 1]).expect("valid sequence").exp();
    let p11 = model.evaluate(&[1, 1]).expect("valid sequence").exp();
    assert!(p01 > 0.99, "P([0, 1]) = {p01}");
    assert!(p11 < 1e-3, "P([1, 1]) = {p11}");
}

#[test]
// Purpose
// -------
// Decoding and evaluation have no hidden randomness.
//
// Given
// -----
// - The trained worked-example model and a fixed sequence.
//
// Expect
// ------
// - Two `decode` calls return identical paths and log-probabilities; the
//   path starts in state 0 and never returns to it.
fn decode_is_deterministic_after_training() {
    // Arrange
    let mut model = uniform_discrete(3, 2);
    let opts = TrainOptions::new(1e-4, 0).expect("valid tolerance");
    BaumWelchLearning::new(opts)
        .fit(&mut model, &worked_example_sequences(), None)
        .expect("training");
    let obs = [0, 1, 1, 1, 1, 1];

    // Act
    let first = model.decode(&obs).expect("decodable");
    let second = model.decode(&obs).expect("decodable");

    // Assert
    assert_eq!(first, second);
    assert_eq!(first.0[0], 0);
    assert!(first.0[1..].iter().all(|&s| s != 0));
    assert!(first.1 <= model.evaluate(&obs).expect("valid") + 1e-12);
}

#[test]
// Purpose
// -------
// Supervised estimation without smoothing equals raw frequencies.
//
// Given
// -----
// - Observations (0, 0, 1, 0) labelled (0, 0, 1, 0); Laplace disabled.
//
// Expect
// ------
// - A[0][0] = A[0][1] = ½ (one self-loop out of two departures from 0),
//   A[1][0] = 1, and the fitted model remains row-stochastic.
fn supervised_fit_matches_raw_frequencies() {
    // Arrange
    let mut model = uniform_discrete(2, 2);
    let mle = MaximumLikelihoodLearning::new(TrainOptions::default().with_laplace(false));

    // Act
    let ll = mle
        .fit(&mut model, &[vec![0, 0, 1, 0]], &[vec![0, 0, 1, 0]], None)
        .expect("labelled fit");

    // Assert
    let a = model.transition_probabilities();
    assert!((a[[0, 0]] - 0.5).abs() < 1e-12);
    assert!((a[[0, 1]] - 0.5).abs() < 1e-12);
    assert!((a[[1, 0]] - 1.0).abs() < 1e-12);
    assert!(ll.is_finite());
    assert_row_stochastic(&model);
}

#[test]
// Purpose
// -------
// A state that never receives posterior mass keeps a valid row.
//
// Given
// -----
// - Three ergodic states; state 2 emits only symbol 0; training data are
//   all 1s, so state 2 has zero posterior everywhere.
//
// Expect
// ------
// - Training succeeds; row 2 is finite and sums to one; no NaN anywhere;
//   state 2's emission is unchanged.
fn never_visited_state_keeps_valid_row() {
    // Arrange
    let emissions = vec![
        DiscreteEmission::new(&[0.5, 0.5]).expect("valid"),
        DiscreteEmission::new(&[0.3, 0.7]).expect("valid"),
        DiscreteEmission::new(&[1.0, 0.0]).expect("valid"),
    ];
    let topo = Topology::ergodic(3).expect("valid");
    let mut model = HiddenMarkovModel::from_topology(&topo, emissions).expect("valid");
    let seqs: Vec<Vec<usize>> = vec![vec![1, 1, 1, 1], vec![1, 1, 1]];
    let opts = TrainOptions::new(1e-8, 25).expect("valid");

    // Act
    BaumWelchLearning::new(opts).fit(&mut model, &seqs, None).expect("training");

    // Assert
    assert_row_stochastic(&model);
    assert!(model.log_transitions().iter().all(|v| !v.is_nan()));
    assert_eq!(model.emissions()[2].probabilities().to_vec(), vec![1.0, 0.0]);
}

#[test]
// Purpose
// -------
// On zero-entropy data both unsupervised learners see the same single
// path and agree on the parameters.
//
// Given
// -----
// - Two states with deterministic emissions (state i emits symbol i), so
//   each sequence admits exactly one state path.
// - Baum-Welch and Viterbi training (Laplace off) from the same start.
//
// Expect
// ------
// - Initial, transition and emission probabilities agree within 1e-9.
fn baum_welch_and_viterbi_agree_on_zero_entropy_data() {
    // Arrange
    let emissions = vec![
        DiscreteEmission::new(&[1.0, 0.0]).expect("valid"),
        DiscreteEmission::new(&[0.0, 1.0]).expect("valid"),
    ];
    let start = HiddenMarkovModel::from_probabilities(
        &array![0.5, 0.5],
        &array![[0.5, 0.5], [0.5, 0.5]],
        emissions,
    )
    .expect("valid");
    let seqs: Vec<Vec<usize>> = vec![vec![0, 0, 1, 1, 0, 1], vec![0, 1, 1, 1, 0, 0]];
    let opts = TrainOptions::new(1e-10, 50).expect("valid").with_laplace(false);
    let mut bw_model = start.clone();
    let mut vt_model = start;

    // Act
    BaumWelchLearning::new(opts.clone()).fit(&mut bw_model, &seqs, None).expect("bw");
    ViterbiLearning::new(opts).fit(&mut vt_model, &seqs, None).expect("viterbi");

    // Assert
    let close = |a: &ndarray::Array2<f64>, b: &ndarray::Array2<f64>| {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-9)
    };
    assert!(close(&bw_model.transition_probabilities(), &vt_model.transition_probabilities()));
    let pi_diff = &bw_model.initial_probabilities() - &vt_model.initial_probabilities();
    assert!(pi_diff.iter().all(|d| d.abs() < 1e-9));
    for (b, v) in bw_model.emissions().iter().zip(vt_model.emissions()) {
        let diff = &b.probabilities() - &v.probabilities();
        assert!(diff.iter().all(|d| d.abs() < 1e-9));
    }
    // 0→0: 2, 0→1: 3 departures-from-0 total 5; 1→1: 3, 1→0: 2.
    let a = bw_model.transition_probabilities();
    assert!((a[[0, 0]] - 0.4).abs() < 1e-9);
    assert!((a[[1, 1]] - 0.6).abs() < 1e-9);
}

#[test]
// Purpose
// -------
// Continuous emissions recover a sampled regime structure.
//
// Given
// -----
// - A sticky 2-state Normal model (means -2 and 3, unit variance) sampled
//   for 1500 steps with a fixed seed.
// - Baum-Welch from means -1 and 1 with standard deviation 2.
//
// Expect
// ------
// - Recovered means within 0.25 of the truth; self-transitions above 0.85.
fn normal_hmm_recovers_sampled_means() {
    // Arrange
    let truth = HiddenMarkovModel::from_probabilities(
        &array![0.5, 0.5],
        &array![[0.95, 0.05], [0.05, 0.95]],
        vec![
            NormalEmission::new(-2.0, 1.0).expect("valid"),
            NormalEmission::new(3.0, 1.0).expect("valid"),
        ],
    )
    .expect("valid");
    let mut rng = StdRng::seed_from_u64(42);
    let (_, obs) = truth.generate(1500, &mut rng).expect("length > 0");
    let mut model = HiddenMarkovModel::from_probabilities(
        &array![0.5, 0.5],
        &array![[0.5, 0.5], [0.5, 0.5]],
        vec![
            NormalEmission::new(-1.0, 2.0).expect("valid"),
            NormalEmission::new(1.0, 2.0).expect("valid"),
        ],
    )
    .expect("valid");
    let opts = TrainOptions::new(1e-8, 200).expect("valid");

    // Act
    BaumWelchLearning::new(opts).fit(&mut model, &[obs], None).expect("training");

    // Assert
    let means: Vec<f64> = model.emissions().iter().map(NormalEmission::mean).collect();
    assert!((means[0] + 2.0).abs() < 0.25, "means = {means:?}");
    assert!((means[1] - 3.0).abs() < 0.25, "means = {means:?}");
    let a = model.transition_probabilities();
    assert!(a[[0, 0]] > 0.85 && a[[1, 1]] > 0.85);
    assert_row_stochastic(&model);
}

#[test]
// Purpose
// -------
// Parallel restarts return a model at least as good as the plain run.
//
// Given
// -----
// - The worked example; six Baum-Welch attempts, seed 3, cap 200.
//
// Expect
// ------
// - Winner's log-likelihood ≥ single run; valid model; equal results on a
//   second identical call.
fn restarts_improve_or_match_single_run() {
    // Arrange
    let start = uniform_discrete(3, 2);
    let seqs = worked_example_sequences();
    let opts = TrainOptions::new(1e-6, 200).expect("valid");
    let ro = RestartOptions::new(6, 3).expect("restarts > 0");
    let mut single = start.clone();
    let single_out =
        BaumWelchLearning::new(opts.clone()).fit(&mut single, &seqs, None).expect("training");

    // Act
    let (best, outcome) =
        fit_with_restarts(&start, &seqs, None, RestartLearner::BaumWelch, &opts, &ro)
            .expect("restarts");
    let (again, _) = fit_with_restarts(&start, &seqs, None, RestartLearner::BaumWelch, &opts, &ro)
        .expect("restarts");

    // Assert
    assert!(outcome.log_likelihood >= single_out.log_likelihood - 1e-12);
    assert_row_stochastic(&best);
    assert_eq!(best, again);
}

#[test]
// Purpose
// -------
// An unbounded training loop is stopped from another thread.
//
// Given
// -----
// - Tolerance 0 and no cap (never converges on its own) with a token that
//   a second thread raises after 50 ms.
//
// Expect
// ------
// - `Cancelled`; the reported log-likelihood is the last history entry and
//   matches the returned model; the model is row-stochastic.
fn cancellation_stops_unbounded_training() {
    // Arrange
    let mut model = uniform_discrete(3, 2);
    let seqs = worked_example_sequences();
    let token = CancellationToken::new();
    let opts = TrainOptions::default().with_cancellation(token.clone());
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        token.cancel();
    });

    // Act
    let outcome = BaumWelchLearning::new(opts).fit(&mut model, &seqs, None).expect("training");
    canceller.join().expect("canceller thread");

    // Assert
    assert_eq!(outcome.status, LearningStatus::Cancelled);
    assert_eq!(outcome.history.last().copied(), Some(outcome.log_likelihood));
    let mean_ll: f64 = seqs.iter().map(|s| model.evaluate(s).expect("valid")).sum::<f64>()
        / seqs.len() as f64;
    assert!((mean_ll - outcome.log_likelihood).abs() < 1e-9);
    assert_row_stochastic(&model);
}
