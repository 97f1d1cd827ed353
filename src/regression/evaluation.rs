//! Score-to-decision conversion and model evaluation.
//!
//! Free functions with no hidden state: argmax and probability conversion,
//! the per-observation log-likelihood under either link, binary threshold
//! tuning, confusion-table writers, and [`test_model`], which drives scoring,
//! thresholding, and reporting over an entire row set.
//!
//! All of these are pure given valid inputs; validation happens at the
//! matrix-access boundary (`DimensionConflict`) or upstream in the row-set
//! layer.
use crate::optimization::numerical_stability::{log_sum_exp, safe_softplus};
use crate::regression::{
    core::{
        design::{NameResolver, RowSet},
        model_type::{Link, ModelType, ResultFormat, ThresholdCriterion},
        params::ParamMatrix,
        sparse::{dot_sparse, dot_sparse_by_dense},
    },
    errors::{RegressionError, RegressionResult},
};
use ndarray::Array2;
use statrs::function::logistic::logistic;
use std::io::Write;

/// Index of the maximum score; ties broken by first occurrence (lowest
/// index), deterministically. Returns 0 for an empty slice.
pub fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (k, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = k;
        }
    }
    best
}

/// Convert per-class linear scores into a probability distribution.
///
/// Softmax with the maximum subtracted before exponentiating, so
/// large-magnitude inputs stay finite. Callers observe a valid probability
/// vector summing to 1.
pub fn estprob(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut probs: Vec<f64> = scores.iter().map(|&s| (s - max).exp()).collect();
    let total: f64 = probs.iter().sum();
    for p in &mut probs {
        *p /= total;
    }
    probs
}

/// Per-observation log-likelihood contribution given the vector of per-class
/// linear scores and the true label `y`, under the link implied by
/// `model_type`.
///
/// - Binary logistic: on the class-1 vs class-0 score difference `s`,
///   `ln σ(s)` for `y = 1` and `ln σ(-s)` for `y = 0`, evaluated stably as
///   `-softplus(∓s)`.
/// - Multinomial: `lin[y] - ln Σ exp(lin)`.
///
/// Used both to score tuning candidates and for held-out evaluation.
pub fn point_log_likelihood(linscores: &[f64], y: usize, model_type: &ModelType) -> f64 {
    match model_type.link {
        Link::Logistic => {
            let s = linscores[1] - linscores[0];
            if y == 1 { -safe_softplus(-s) } else { -safe_softplus(s) }
        }
        Link::Multinomial => linscores[y] - log_sum_exp(linscores),
    }
}

/// Linear predictors for every row of `rows` against every class's
/// coefficients: an (n_rows x C) score matrix.
///
/// Uses the bulk dense row view when the matrix is dense and the generic
/// merge otherwise.
///
/// # Errors
/// - [`RegressionError::FeatureCountMismatch`] /
///   [`RegressionError::ClassCountMismatch`] when the matrix disagrees with
///   the row set's dimensions.
pub fn score(beta: &ParamMatrix, rows: &dyn RowSet) -> RegressionResult<Array2<f64>> {
    if beta.d() != rows.n_features() {
        return Err(RegressionError::FeatureCountMismatch {
            expected: rows.n_features(),
            actual: beta.d(),
        });
    }
    if beta.c() != rows.n_classes() {
        return Err(RegressionError::ClassCountMismatch {
            expected: rows.n_classes(),
            actual: beta.c(),
        });
    }
    let n = rows.n_rows();
    let c = beta.c();
    let mut scores = Array2::zeros((n, c));
    for i in 0..n {
        let (entries, _) = rows.row(i);
        for k in 0..c {
            scores[[i, k]] = match beta.as_dense() {
                Some(store) => dot_sparse_by_dense(entries, store.class_params(k)),
                None => dot_sparse(entries, beta.class_cursor(k)?),
            };
        }
    }
    Ok(scores)
}

/// For binary model types, search over the observed score values for the
/// decision threshold optimizing the model type's criterion against the true
/// labels.
///
/// The decision rule is `score >= threshold` predicts positive. Candidates
/// are the observed scores in ascending order; ties on the criterion keep
/// the lowest threshold, so the result is reproducible. Non-binary model
/// types (or an empty score vector) return the default threshold 0.0.
pub fn tune_threshold(scores: &[f64], y: &[bool], model_type: &ModelType) -> f64 {
    let criterion = match (model_type.is_binary(), model_type.tune) {
        (true, Some(criterion)) => criterion,
        _ => return 0.0,
    };
    if scores.is_empty() {
        return 0.0;
    }
    let mut candidates: Vec<f64> = scores.to_vec();
    candidates.sort_by(|a, b| a.total_cmp(b));
    candidates.dedup();

    let mut best_thr = candidates[0];
    let mut best_val = f64::NEG_INFINITY;
    for &thr in &candidates {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fne = 0usize;
        for (&s, &pos) in scores.iter().zip(y) {
            match (s >= thr, pos) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, true) => fne += 1,
                (false, false) => {}
            }
        }
        let val = match criterion {
            ThresholdCriterion::ErrorCount => -((fp + fne) as f64),
            ThresholdCriterion::F1 => {
                let denom = 2 * tp + fp + fne;
                if denom == 0 { 0.0 } else { 2.0 * tp as f64 / denom as f64 }
            }
        };
        if val > best_val {
            best_val = val;
            best_thr = thr;
        }
    }
    best_thr
}

/// Tabulate predicted vs. actual class counts.
///
/// Rows are actual classes, columns predicted classes, both labeled through
/// `names`. Pure function of its arguments.
pub fn make_confusion_table<N: NameResolver + ?Sized>(
    o: &mut dyn Write, names: &N, y: &[usize], prediction: &[usize],
) -> std::io::Result<()> {
    let c = names.n_classes();
    let mut counts = vec![vec![0usize; c]; c];
    for (&actual, &pred) in y.iter().zip(prediction) {
        counts[actual][pred] += 1;
    }
    write!(o, "actual \\ predicted")?;
    for k in 0..c {
        write!(o, "\t{}", names.class_name(k))?;
    }
    writeln!(o)?;
    for (actual, row) in counts.iter().enumerate() {
        write!(o, "{}", names.class_name(actual))?;
        for count in row {
            write!(o, "\t{count}")?;
        }
        writeln!(o)?;
    }
    Ok(())
}

/// 2x2 confusion table for binary models, with score-weighted expected
/// counts alongside the hard counts.
///
/// `all_scores` holds each row's per-class linear scores; the expected
/// counts weight each row by its estimated positive-class probability
/// (logistic of the score difference) instead of its hard decision.
pub fn make_ct_2by2<N: NameResolver + ?Sized>(
    o: &mut dyn Write, names: &N, y: &[usize], all_scores: &[Vec<f64>],
    prediction: &[usize],
) -> std::io::Result<()> {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fne = 0usize;
    let mut tn = 0usize;
    let mut exp_tp = 0.0;
    let mut exp_fp = 0.0;
    for ((&actual, &pred), scores) in y.iter().zip(prediction).zip(all_scores) {
        match (pred == 1, actual == 1) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fne += 1,
            (false, false) => tn += 1,
        }
        let p_pos = logistic(scores[1] - scores[0]);
        if actual == 1 {
            exp_tp += p_pos;
        } else {
            exp_fp += p_pos;
        }
    }
    writeln!(o, "positive class: {}", names.class_name(1))?;
    writeln!(o, "TP {tp}  FP {fp}  FN {fne}  TN {tn}")?;
    writeln!(o, "expected TP {exp_tp:.3}  expected FP {exp_fp:.3}")?;
    Ok(())
}

/// Drive scoring, thresholding/argmax, and reporting over an entire test
/// set, writing per-row probabilities or raw scores to `result`.
///
/// Per-row output: `topic`, row index, predicted class name, then the C
/// per-class values in the requested [`ResultFormat`]. A confusion table
/// (the 2x2 score-weighted variant for binary models) and the mean held-out
/// log-likelihood follow.
///
/// # Errors
/// - Dimension mismatches from [`score`].
/// - [`RegressionError::Io`] on output failures.
pub fn test_model(
    topic: &str, model_type: &ModelType, beta: &ParamMatrix, threshold: f64,
    test_data: &dyn RowSet, result: &mut dyn Write, result_format: ResultFormat,
) -> RegressionResult<()> {
    let scores = score(beta, test_data)?;
    let n = test_data.n_rows();
    let c = test_data.n_classes();

    let mut labels = Vec::with_capacity(n);
    let mut predictions = Vec::with_capacity(n);
    let mut all_scores = Vec::with_capacity(n);
    let mut loglik = 0.0;
    for i in 0..n {
        let (_, y) = test_data.row(i);
        let lin: Vec<f64> = (0..c).map(|k| scores[[i, k]]).collect();
        let pred = if model_type.is_binary() {
            usize::from(lin[1] - lin[0] >= threshold)
        } else {
            argmax(&lin)
        };
        loglik += point_log_likelihood(&lin, y, model_type);

        write!(result, "{topic} {i} {}", test_data.class_name(pred))?;
        match result_format {
            ResultFormat::Probabilities => {
                for p in estprob(&lin) {
                    write!(result, " {p}")?;
                }
            }
            ResultFormat::Scores => {
                for s in &lin {
                    write!(result, " {s}")?;
                }
            }
        }
        writeln!(result)?;

        labels.push(y);
        predictions.push(pred);
        all_scores.push(lin);
    }

    if model_type.is_binary() && c == 2 {
        make_ct_2by2(result, test_data, &labels, &all_scores, &predictions)?;
    } else {
        make_confusion_table(result, test_data, &labels, &predictions)?;
    }
    let mean = if n > 0 { loglik / n as f64 } else { 0.0 };
    writeln!(result, "mean held-out log-likelihood {mean}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::core::{
        design::RowSetMem,
        sparse::{SparseEntry, SparseVector},
    };

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Tie-breaking of `argmax` and normalization of `estprob`.
    // - Agreement of the binary and multinomial log-likelihoods on two-class
    //   scores.
    // - Deterministic threshold tuning on a small labeled score set.
    // - Confusion-table contents and the `test_model` driver end to end on a
    //   tiny in-memory row set.
    // -------------------------------------------------------------------------

    fn sv(pairs: &[(usize, f64)]) -> SparseVector {
        pairs.iter().map(|&(var, value)| SparseEntry::new(var, value)).collect()
    }

    fn two_class_rows() -> RowSetMem {
        RowSetMem::new(
            vec![sv(&[(0, 1.0)]), sv(&[(1, 1.0)]), sv(&[(0, 1.0), (1, 1.0)])],
            vec![0, 1, 1],
            2,
            vec!["neg".to_string(), "pos".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn argmax_breaks_ties_by_first_occurrence() {
        assert_eq!(argmax(&[0.2, 0.9, 0.9]), 1);
        assert_eq!(argmax(&[1.0, 1.0]), 0);
        assert_eq!(argmax(&[-2.0]), 0);
    }

    #[test]
    fn estprob_normalizes_and_survives_large_scores() {
        let p = estprob(&[1.0, 1.0]);
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!((p[1] - 0.5).abs() < 1e-12);

        let p = estprob(&[0.0, 0.0, 0.0]);
        for &x in &p {
            assert!((x - 1.0 / 3.0).abs() < 1e-12);
        }

        let p = estprob(&[1000.0, 999.0]);
        assert!(p.iter().all(|x| x.is_finite()));
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn binary_and_multinomial_log_likelihoods_agree_on_two_classes() {
        let lin = [0.3, -1.2];
        for y in 0..2 {
            let b = point_log_likelihood(&lin, y, &ModelType::binary(None));
            let m = point_log_likelihood(&lin, y, &ModelType::multinomial());
            assert!((b - m).abs() < 1e-12, "links disagree for y={y}: {b} vs {m}");
        }
    }

    #[test]
    fn tune_threshold_separates_a_separable_sample() {
        // Scores: negatives below 0.5, positives above.
        let scores = [-1.0, 0.0, 1.0, 2.0];
        let y = [false, false, true, true];
        let mt = ModelType::binary(Some(ThresholdCriterion::ErrorCount));

        let thr = tune_threshold(&scores, &y, &mt);

        // The lowest candidate achieving zero errors is 1.0 (rule: >=).
        assert_eq!(thr, 1.0);
    }

    #[test]
    fn tune_threshold_is_inert_for_multinomial_models() {
        assert_eq!(tune_threshold(&[1.0, 2.0], &[false, true], &ModelType::multinomial()), 0.0);
    }

    #[test]
    fn confusion_table_counts_predictions_per_actual_class() {
        let rows = two_class_rows();
        let mut out = Vec::new();

        make_confusion_table(&mut out, &rows, &[0, 1, 1], &[0, 1, 0]).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("neg\t1\t0"));
        assert!(text.contains("pos\t1\t1"));
    }

    #[test]
    fn test_model_writes_one_line_per_row_plus_summaries() {
        let rows = two_class_rows();
        // Coefficients that score class 1 through feature 1.
        let mut beta = ParamMatrix::dense(2, 2, 0.0);
        beta.set(1, 1, 2.0).unwrap();
        let mt = ModelType::multinomial();
        let mut out = Vec::new();

        test_model("topic", &mt, &beta, 0.0, &rows, &mut out, ResultFormat::Probabilities)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("topic 0 "));
        assert!(lines[2].starts_with("topic 2 pos"));
        assert!(text.contains("mean held-out log-likelihood"));
    }

    #[test]
    fn score_rejects_mismatched_dimensions() {
        let rows = two_class_rows();
        let beta = ParamMatrix::dense(3, 2, 0.0);

        let err = score(&beta, &rows).unwrap_err();

        assert_eq!(err, RegressionError::FeatureCountMismatch { expected: 2, actual: 3 });
    }
}
