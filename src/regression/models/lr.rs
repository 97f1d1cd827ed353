//! The polytomous regression model object: training, restoration, and
//! testing.
//!
//! [`LRModel`] is a two-state machine. It starts untrained; [`LRModel::train`]
//! or [`LRModel::restore`] moves it to the trained state, which is terminal
//! until destruction. [`LRModel::test`] requires the trained state.
//!
//! Training orchestrates the full pipeline:
//! 1. build and own a [`Design`] from the design parameter, selecting
//!    observed features and projecting the rows into the contiguous selected
//!    space;
//! 2. assemble prior mean/scale matrices from the topic's individual prior
//!    terms;
//! 3. tune the prior-strength hyperparameter by deterministic k-fold
//!    cross-validated held-out log-likelihood ([`TuneStats`] records the
//!    sweep; ties go to the earlier candidate);
//! 4. fit final coefficients at the selected strength;
//! 5. optionally squeeze the active feature set down to a target size,
//!    each reduction step re-fitting against the previous step's
//!    coefficients as prior means (elimination policy: smallest maximum
//!    absolute coefficient across classes first, ties to the lower feature
//!    index; the intercept is never eliminated);
//! 6. tune the binary decision threshold when the model type asks for it;
//! 7. persist the snapshot through the `WriteModel` collaborator and emit
//!    evaluation output via `test_model`.
//!
//! The trained flag flips only after the fitted matrix is complete and
//! persisted; a failed training leaves the model untrained with no partial
//! coefficients.
use crate::optimization::map_optimizer::MapOptions;
use crate::regression::{
    core::{
        design::{Design, DesignParameter, NameResolver, RowSet, RowSetMem},
        fixed::FixedParams,
        model_type::{ModelType, ResultFormat},
        params::ParamMatrix,
        prior::{BayesParameter, HyperParamPlan, PriorTermsByTopic},
        sparse::dot_sparse_by_dense,
    },
    errors::{RegressionError, RegressionResult},
    evaluation::{point_log_likelihood, score, test_model, tune_threshold},
    io::{ModelSnapshot, ReadModel, WriteModel},
    models::objective::{FoldFilter, fit_coefficients},
};
use std::io::Write;

/// Outcome of the hyperparameter sweep.
///
/// `cv_loglik[i]` is the total held-out log-likelihood of candidate `i`
/// across all folds; empty when the plan had a single fixed value and the
/// sweep was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct TuneStats {
    pub best_variance: f64,
    pub best_index: usize,
    pub cv_loglik: Vec<f64>,
}

/// Trained or trainable polytomous logistic regression model.
///
/// Owns its [`Design`] and fitted coefficients exclusively; nothing is shared
/// across model instances. Untrained until `train` or `restore` succeeds.
#[derive(Debug)]
pub struct LRModel {
    trained: bool,
    topic: String,
    design: Option<Design>,
    beta: ParamMatrix,
    threshold: f64,
    model_type: ModelType,
    bayes: Option<BayesParameter>,
    opts: MapOptions,
}

impl LRModel {
    /// An untrained model using the given optimizer options for its fits.
    pub fn new(opts: MapOptions) -> Self {
        LRModel {
            trained: false,
            topic: String::new(),
            design: None,
            beta: ParamMatrix::dense(0, 0, 0.0),
            threshold: 0.0,
            model_type: ModelType::multinomial(),
            bayes: None,
            opts,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The fitted coefficient matrix, once trained.
    pub fn beta(&self) -> Option<&ParamMatrix> {
        self.trained.then_some(&self.beta)
    }

    /// The prior configuration selected by tuning, once trained.
    pub fn bayes_param(&self) -> Option<&BayesParameter> {
        self.bayes.as_ref()
    }

    /// Train on `train_data`: tune, fit, optionally squeeze, persist, and
    /// emit evaluation output.
    ///
    /// # Errors
    /// Configuration errors (empty training set, bad plan, reference class
    /// out of range, binary link on a non-binary class count), fitting
    /// failures, and persistence failures all abort training and leave the
    /// model untrained.
    #[allow(clippy::too_many_arguments)]
    pub fn train(
        &mut self, topic: &str, train_data: &RowSetMem, hyper_param_plan: &HyperParamPlan,
        prior_terms_by_topic: &PriorTermsByTopic, design_parameter: &DesignParameter,
        model_type: &ModelType, model_file: &mut dyn WriteModel, result: &mut dyn Write,
        result_format: ResultFormat,
    ) -> RegressionResult<()> {
        if train_data.n_rows() == 0 {
            return Err(RegressionError::EmptyRowSet);
        }
        let c = train_data.n_classes();
        if let Some(rc) = model_type.reference_class {
            if rc >= c {
                return Err(RegressionError::InvalidReferenceClass { class: rc, classes: c });
            }
        }
        if model_type.is_binary() && c != 2 {
            return Err(RegressionError::ClassCountMismatch { expected: 2, actual: c });
        }

        let design = Design::build(train_data, design_parameter);
        let projected = design.project(train_data)?;
        let d = design.n_selected();

        let (prior_mean, prior_scale) =
            build_prior_matrices(topic, &design, d, c, prior_terms_by_topic)?;

        let mask = if design_parameter.zero_unseen {
            design.unseen_zero_mask(&projected)
        } else {
            Vec::new()
        };
        let fixed = FixedParams::new(mask, model_type.reference_class);

        let stats = self.tune_model(
            &projected,
            hyper_param_plan,
            &prior_mean,
            &prior_scale,
            &fixed,
            model_type,
        )?;
        let bayes = BayesParameter::new(hyper_param_plan.shape(), stats.best_variance)?;

        let fit = fit_coefficients(
            &projected,
            &prior_mean,
            &prior_scale,
            &bayes,
            &fixed,
            FoldFilter::All,
            None,
            &self.opts,
        )?;
        let mut beta = fit.beta;

        if let Some(target) = design_parameter.squeeze_to {
            beta = self.squeezer_model(
                &projected,
                &bayes,
                target,
                stats.best_variance,
                &prior_mean,
                &prior_scale,
                &fixed,
                &design,
                beta,
            )?;
        }

        let threshold = if model_type.is_binary() && model_type.tune.is_some() {
            let scores = score(&beta, &projected)?;
            let diffs: Vec<f64> =
                (0..projected.n_rows()).map(|i| scores[[i, 1]] - scores[[i, 0]]).collect();
            let positives: Vec<bool> = projected.labels().iter().map(|&y| y == 1).collect();
            tune_threshold(&diffs, &positives, model_type)
        } else {
            0.0
        };

        let snapshot = ModelSnapshot {
            topic: topic.to_string(),
            link: model_type.link,
            feat_select: design.feat_select().to_vec(),
            add_intercept: design.intercept_index().is_some(),
            threshold,
            beta: beta.clone(),
        };
        model_file.write_model(&snapshot)?;

        self.topic = topic.to_string();
        self.design = Some(design);
        self.beta = beta;
        self.threshold = threshold;
        self.model_type = *model_type;
        self.bayes = Some(bayes);
        self.trained = true;

        test_model(
            topic,
            model_type,
            &self.beta,
            self.threshold,
            &projected,
            result,
            result_format,
        )?;
        Ok(())
    }

    /// Load a previously persisted model; no tuning is re-run.
    ///
    /// # Errors
    /// - Parse/I/O errors from the `ReadModel` collaborator.
    /// - [`RegressionError::ClassCountMismatch`] if the stored matrix
    ///   disagrees with `names`'s class count.
    pub fn restore(
        &mut self, model_file: &mut dyn ReadModel, names: &dyn NameResolver,
    ) -> RegressionResult<()> {
        let snapshot = model_file.read_model()?;
        if snapshot.beta.c() != names.n_classes() {
            return Err(RegressionError::ClassCountMismatch {
                expected: names.n_classes(),
                actual: snapshot.beta.c(),
            });
        }
        self.topic = snapshot.topic;
        self.design = Some(Design::from_selection(snapshot.feat_select, snapshot.add_intercept));
        self.beta = snapshot.beta;
        self.threshold = snapshot.threshold;
        self.model_type = ModelType::new(snapshot.link, None, None);
        self.trained = true;
        Ok(())
    }

    /// Apply the trained model to `test_row_set`, writing per-row output and
    /// summaries to `result`.
    ///
    /// # Errors
    /// - [`RegressionError::ModelNotTrained`] before `train`/`restore`.
    /// - Dimension mismatches between the stored coefficients and the
    ///   projected test rows.
    pub fn test(
        &self, test_row_set: &dyn RowSet, result: &mut dyn Write, result_format: ResultFormat,
    ) -> RegressionResult<()> {
        if !self.trained {
            return Err(RegressionError::ModelNotTrained);
        }
        let design = self.design.as_ref().ok_or(RegressionError::ModelNotTrained)?;
        let projected = design.project(test_row_set)?;
        test_model(
            &self.topic,
            &self.model_type,
            &self.beta,
            self.threshold,
            &projected,
            result,
            result_format,
        )
    }

    /// Sweep the hyperparameter candidates by k-fold cross-validation.
    ///
    /// Fold assignment is `row % folds`, so the sweep is reproducible. Each
    /// candidate's score is the total held-out `point_log_likelihood` across
    /// folds; the best candidate wins, ties broken by candidate order. Fits
    /// warm-start from the previous fit to cut iterations.
    fn tune_model(
        &self, drs: &RowSetMem, plan: &HyperParamPlan, prior_mean: &ParamMatrix,
        prior_scale: &ParamMatrix, fixed: &FixedParams, model_type: &ModelType,
    ) -> RegressionResult<TuneStats> {
        if !plan.needs_search() {
            return Ok(TuneStats {
                best_variance: plan.candidates()[0],
                best_index: 0,
                cv_loglik: Vec::new(),
            });
        }
        let folds = plan.folds();
        let rows = drs.n_rows();
        if folds > rows {
            return Err(RegressionError::InvalidFoldCount { folds, rows });
        }

        let c = drs.n_classes();
        let mut cv_loglik = Vec::with_capacity(plan.candidates().len());
        let mut warm: Option<ParamMatrix> = None;
        for &variance in plan.candidates() {
            let bayes = BayesParameter::new(plan.shape(), variance)?;
            let mut total = 0.0;
            for fold in 0..folds {
                let fit = fit_coefficients(
                    drs,
                    prior_mean,
                    prior_scale,
                    &bayes,
                    fixed,
                    FoldFilter::Exclude { fold, of: folds },
                    warm.as_ref(),
                    &self.opts,
                )?;
                let store = match fit.beta.as_dense() {
                    Some(store) => store,
                    None => unreachable!("fit_coefficients returns dense matrices"),
                };
                for i in (0..rows).filter(|i| i % folds == fold) {
                    let (entries, y) = drs.row(i);
                    let lin: Vec<f64> = (0..c)
                        .map(|k| dot_sparse_by_dense(entries, store.class_params(k)))
                        .collect();
                    total += point_log_likelihood(&lin, y, model_type);
                }
                warm = Some(fit.beta);
            }
            cv_loglik.push(total);
        }

        let mut best_index = 0;
        for (i, &ll) in cv_loglik.iter().enumerate() {
            if ll > cv_loglik[best_index] {
                best_index = i;
            }
        }
        Ok(TuneStats { best_variance: plan.candidates()[best_index], best_index, cv_loglik })
    }

    /// Progressively shrink the active feature set to `squeeze_to` features.
    ///
    /// Each step halves the active set (never below the target), eliminating
    /// the features whose largest absolute coefficient across classes is
    /// smallest, then re-fits with the previous step's coefficients as prior
    /// means so squeezing refines rather than restarts. The intercept is
    /// outside the maskable range and survives every step.
    #[allow(clippy::too_many_arguments)]
    fn squeezer_model(
        &self, drs: &RowSetMem, bayes: &BayesParameter, squeeze_to: usize, hp_start: f64,
        prior_mean: &ParamMatrix, prior_scale: &ParamMatrix, fixed: &FixedParams,
        design: &Design, start: ParamMatrix,
    ) -> RegressionResult<ParamMatrix> {
        let c = drs.n_classes();
        let n_maskable = design.feat_select().len();
        if squeeze_to == 0 || squeeze_to > n_maskable {
            return Err(RegressionError::InvalidSqueezeTarget {
                target: squeeze_to,
                active: n_maskable,
            });
        }

        let step_bayes = bayes.with_variance(hp_start)?;
        let mut beta = start;
        // The first reduction step keeps the training prior as its anchor;
        // afterwards each step anchors on the previous step's coefficients.
        let mut anchor = prior_mean.clone();
        let mut active: Vec<usize> = (0..n_maskable).collect();
        while active.len() > squeeze_to {
            let next_size = squeeze_to.max(active.len() / 2);

            let mut ranked: Vec<(f64, usize)> = Vec::with_capacity(active.len());
            for &j in &active {
                let mut magnitude = 0.0f64;
                for k in 0..c {
                    magnitude = magnitude.max(beta.get(j, k)?.abs());
                }
                ranked.push((magnitude, j));
            }
            ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            let eliminated: Vec<usize> =
                ranked.iter().take(active.len() - next_size).map(|&(_, j)| j).collect();
            active.retain(|j| !eliminated.contains(j));

            let mut mask = vec![vec![false; c]; n_maskable];
            for (j, row) in mask.iter_mut().enumerate() {
                let gone = !active.contains(&j);
                for (k, cell) in row.iter_mut().enumerate() {
                    *cell = gone || fixed.is_fixed(j, k);
                }
            }
            let step_fixed = FixedParams::new(mask, fixed.ref_class_id());

            let fit = fit_coefficients(
                drs,
                &anchor,
                prior_scale,
                &step_bayes,
                &step_fixed,
                FoldFilter::All,
                Some(&beta),
                &self.opts,
            )?;
            beta = fit.beta;
            anchor = beta.clone();
        }
        Ok(beta)
    }
}

impl Default for LRModel {
    fn default() -> Self {
        LRModel::new(MapOptions::default())
    }
}

/// Prior mean/scale matrices for a topic: flat zero mean and unit scale,
/// overridden per selected feature by the topic's individual prior terms
/// (applied to every class of that feature's row).
fn build_prior_matrices(
    topic: &str, design: &Design, d: usize, c: usize, prior_terms: &PriorTermsByTopic,
) -> RegressionResult<(ParamMatrix, ParamMatrix)> {
    let mut mean = ParamMatrix::dense(d, c, 0.0);
    let mut scale = ParamMatrix::dense(d, c, 1.0);
    if let Some(table) = prior_terms.terms_for(topic) {
        for (&feature, term) in table {
            if let Ok(pos) = design.feat_select().binary_search(&feature) {
                for k in 0..c {
                    mean.set(pos, k, term.mean)?;
                    if let Some(s) = term.scale {
                        scale.set(pos, k, s)?;
                    }
                }
            }
        }
    }
    Ok((mean, scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::map_optimizer::{LineSearcher, Tolerances};
    use crate::regression::core::{
        model_type::ThresholdCriterion,
        prior::{PriorShape, PriorTerm},
        sparse::{SparseEntry, SparseVector},
    };
    use crate::regression::io::{TextModelReader, TextModelWriter};
    use std::io::BufReader;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The untrained-state precondition of `test`.
    // - Training on a small synthetic three-class problem, including the
    //   reference-class constraint and prior-term overrides.
    // - Determinism of the tuning sweep.
    // - Squeezing down to a target feature count.
    // - Binary threshold tuning through the full `train` path.
    //
    // The full train -> persist -> restore -> test pipeline is exercised in
    // the integration tests.
    // -------------------------------------------------------------------------

    fn sv(pairs: &[(usize, f64)]) -> SparseVector {
        pairs.iter().map(|&(var, value)| SparseEntry::new(var, value)).collect()
    }

    fn opts() -> MapOptions {
        MapOptions::new(
            Tolerances::new(Some(1e-7), None, Some(200)).unwrap(),
            LineSearcher::MoreThuente,
            false,
            None,
        )
        .unwrap()
    }

    fn three_class_rows() -> RowSetMem {
        // Features 0/1/2 each mark one class; features 3/4 are noise shared
        // across classes.
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for rep in 0..4 {
            let noise = 3 + (rep % 2);
            rows.push(sv(&[(0, 1.0), (noise, 0.5)]));
            labels.push(0);
            rows.push(sv(&[(1, 1.0), (noise, 0.5)]));
            labels.push(1);
            rows.push(sv(&[(2, 1.0), (noise, 0.5)]));
            labels.push(2);
        }
        RowSetMem::new(rows, labels, 5, vec!["a".into(), "b".into(), "c".into()]).unwrap()
    }

    fn binary_rows() -> RowSetMem {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for rep in 0..6 {
            rows.push(sv(&[(0, 1.0 + 0.1 * rep as f64)]));
            labels.push(0);
            rows.push(sv(&[(1, 1.0 + 0.1 * rep as f64)]));
            labels.push(1);
        }
        RowSetMem::new(rows, labels, 2, vec!["neg".into(), "pos".into()]).unwrap()
    }

    #[test]
    fn test_requires_a_trained_model() {
        let model = LRModel::new(opts());
        let rows = three_class_rows();
        let mut out = Vec::new();

        let err = model.test(&rows, &mut out, ResultFormat::Scores).unwrap_err();

        assert_eq!(err, RegressionError::ModelNotTrained);
    }

    #[test]
    fn train_fits_a_three_class_model_with_a_reference_class() {
        let rows = three_class_rows();
        let plan = HyperParamPlan::fixed(PriorShape::Normal, 4.0).unwrap();
        let mt = ModelType::new(crate::regression::core::model_type::Link::Multinomial, None, Some(2));
        let mut model = LRModel::new(opts());
        let mut sink = Vec::new();
        let mut writer = TextModelWriter::new(Vec::new());

        model
            .train(
                "toy",
                &rows,
                &plan,
                &PriorTermsByTopic::new(),
                &DesignParameter::default(),
                &mt,
                &mut writer,
                &mut sink,
                ResultFormat::Probabilities,
            )
            .unwrap();

        assert!(model.is_trained());
        let beta = model.beta().unwrap();
        // Reference class 2 stays pinned at zero.
        for j in 0..beta.d() {
            assert_eq!(beta.get(j, 2).unwrap(), 0.0);
        }
        // Class-marking features separate their classes.
        assert!(beta.get(0, 0).unwrap() > beta.get(0, 1).unwrap());
        assert!(beta.get(1, 1).unwrap() > beta.get(1, 0).unwrap());
    }

    #[test]
    fn tuning_sweep_is_deterministic_and_scores_every_candidate() {
        let rows = three_class_rows();
        let plan = HyperParamPlan::grid(PriorShape::Normal, vec![0.1, 1.0, 10.0], 3).unwrap();
        let model = LRModel::new(opts());
        let d = 6; // 5 features + intercept
        let design = Design::build(&rows, &DesignParameter::default());
        let projected = design.project(&rows).unwrap();
        let mean = ParamMatrix::dense(d, 3, 0.0);
        let scale = ParamMatrix::dense(d, 3, 1.0);
        let fixed = FixedParams::none();
        let mt = ModelType::multinomial();

        let first =
            model.tune_model(&projected, &plan, &mean, &scale, &fixed, &mt).unwrap();
        let second =
            model.tune_model(&projected, &plan, &mean, &scale, &fixed, &mt).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.cv_loglik.len(), 3);
        assert_eq!(first.best_variance, plan.candidates()[first.best_index]);
    }

    #[test]
    fn squeezing_zeroes_all_but_the_requested_features() {
        let rows = three_class_rows();
        let plan = HyperParamPlan::fixed(PriorShape::Normal, 4.0).unwrap();
        let design_param = DesignParameter::new(true, false, Some(3));
        let mut model = LRModel::new(opts());
        let mut sink = Vec::new();
        let mut writer = TextModelWriter::new(Vec::new());

        model
            .train(
                "toy",
                &rows,
                &plan,
                &PriorTermsByTopic::new(),
                &design_param,
                &ModelType::multinomial(),
                &mut writer,
                &mut sink,
                ResultFormat::Scores,
            )
            .unwrap();

        let beta = model.beta().unwrap();
        let survivors = (0..5)
            .filter(|&j| (0..3).any(|k| beta.get(j, k).unwrap() != 0.0))
            .count();
        assert!(survivors <= 3, "expected at most 3 surviving features, got {survivors}");
        // The class-marking features should be the ones that survive.
        for j in 0..3 {
            assert!(
                (0..3).any(|k| beta.get(j, k).unwrap() != 0.0),
                "class-marking feature {j} was squeezed away"
            );
        }
    }

    #[test]
    fn binary_training_tunes_a_threshold_and_restores_it() {
        let rows = binary_rows();
        let plan = HyperParamPlan::fixed(PriorShape::Normal, 4.0).unwrap();
        let mt = ModelType::binary(Some(ThresholdCriterion::ErrorCount));
        let mut model = LRModel::new(opts());
        let mut sink = Vec::new();
        let mut writer = TextModelWriter::new(Vec::new());

        model
            .train(
                "bin",
                &rows,
                &plan,
                &PriorTermsByTopic::new(),
                &DesignParameter::default(),
                &mt,
                &mut writer,
                &mut sink,
                ResultFormat::Probabilities,
            )
            .unwrap();

        let bytes = writer.into_inner();
        let mut restored = LRModel::default();
        restored
            .restore(&mut TextModelReader::new(BufReader::new(bytes.as_slice())), &rows)
            .unwrap();

        assert!(restored.is_trained());
        assert_eq!(restored.threshold(), model.threshold());

        let mut out = Vec::new();
        restored.test(&rows, &mut out, ResultFormat::Scores).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("positive class: pos"));
    }

    #[test]
    fn prior_term_overrides_pull_a_feature_toward_its_mode() {
        let rows = binary_rows();
        let plan = HyperParamPlan::fixed(PriorShape::Normal, 0.01).unwrap();
        let mut terms = PriorTermsByTopic::new();
        // Tight prior centered at 2.0 on original feature 0, positive class.
        terms.set("bin", 0, PriorTerm::new(2.0, Some(1.0)).unwrap());
        let mut model = LRModel::new(opts());
        let mut sink = Vec::new();
        let mut writer = TextModelWriter::new(Vec::new());

        model
            .train(
                "bin",
                &rows,
                &plan,
                &terms,
                &DesignParameter::default(),
                &ModelType::binary(None),
                &mut writer,
                &mut sink,
                ResultFormat::Scores,
            )
            .unwrap();

        let beta = model.beta().unwrap();
        // With variance 0.01 the prior dominates: feature 0 sits near its
        // 2.0 mode in every class column.
        assert!((beta.get(0, 0).unwrap() - 2.0).abs() < 0.5);
        assert!((beta.get(0, 1).unwrap() - 2.0).abs() < 0.5);
    }
}
