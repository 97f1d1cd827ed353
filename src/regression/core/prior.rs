//! Prior configuration for MAP fitting: prior family and strength, the
//! hyperparameter search plan, and per-topic individual prior terms.
use crate::regression::errors::{RegressionError, RegressionResult};
use std::collections::HashMap;

/// Prior family placed on each free coefficient.
///
/// - `Normal`: Gaussian prior, quadratic (ridge) penalty.
/// - `Laplace`: double-exponential prior, absolute-value (lasso) penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorShape {
    Normal,
    Laplace,
}

/// Prior family plus its strength hyperparameter.
///
/// `variance` is the prior variance of a coefficient with unit prior scale;
/// per-coefficient scales multiply it. For the Laplace family the variance is
/// mapped to the rate as `lambda = sqrt(2 / variance)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BayesParameter {
    pub shape: PriorShape,
    pub variance: f64,
}

impl BayesParameter {
    /// Construct a validated prior configuration.
    ///
    /// # Errors
    /// Returns [`RegressionError::InvalidHyperParam`] if `variance` is not
    /// finite or not strictly positive.
    pub fn new(shape: PriorShape, variance: f64) -> RegressionResult<Self> {
        verify_variance(variance)?;
        Ok(BayesParameter { shape, variance })
    }

    /// Gaussian prior with the given variance.
    pub fn normal(variance: f64) -> RegressionResult<Self> {
        BayesParameter::new(PriorShape::Normal, variance)
    }

    /// Laplace prior with the given variance.
    pub fn laplace(variance: f64) -> RegressionResult<Self> {
        BayesParameter::new(PriorShape::Laplace, variance)
    }

    /// Same family at a different strength. Used by the tuning sweep, which
    /// re-fits the same prior shape at each candidate variance.
    ///
    /// # Errors
    /// Returns [`RegressionError::InvalidHyperParam`] for a non-finite or
    /// non-positive variance.
    pub fn with_variance(&self, variance: f64) -> RegressionResult<Self> {
        BayesParameter::new(self.shape, variance)
    }
}

/// Prior family plus the candidate strength values to evaluate during
/// tuning.
///
/// A plan is either a single fixed value (no search) or a grid searched by
/// k-fold cross-validated held-out log-likelihood. Fold counts are validated
/// against the row count at train time; construction only enforces
/// `folds >= 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperParamPlan {
    shape: PriorShape,
    candidates: Vec<f64>,
    folds: usize,
}

impl HyperParamPlan {
    /// A single fixed prior variance; tuning is skipped.
    ///
    /// # Errors
    /// Returns [`RegressionError::InvalidHyperParam`] for a non-finite or
    /// non-positive value.
    pub fn fixed(shape: PriorShape, value: f64) -> RegressionResult<Self> {
        verify_variance(value)?;
        Ok(HyperParamPlan { shape, candidates: vec![value], folds: 2 })
    }

    /// A grid of candidate prior variances searched with `folds`-fold
    /// cross-validation.
    ///
    /// # Errors
    /// - [`RegressionError::EmptyHyperParamPlan`] for an empty grid.
    /// - [`RegressionError::InvalidHyperParam`] for a non-finite or
    ///   non-positive candidate.
    /// - [`RegressionError::InvalidFoldCount`] if `folds < 2`.
    pub fn grid(shape: PriorShape, candidates: Vec<f64>, folds: usize) -> RegressionResult<Self> {
        if candidates.is_empty() {
            return Err(RegressionError::EmptyHyperParamPlan);
        }
        for &value in &candidates {
            verify_variance(value)?;
        }
        if folds < 2 {
            return Err(RegressionError::InvalidFoldCount { folds, rows: 0 });
        }
        Ok(HyperParamPlan { shape, candidates, folds })
    }

    pub fn shape(&self) -> PriorShape {
        self.shape
    }

    pub fn candidates(&self) -> &[f64] {
        &self.candidates
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    /// Whether a cross-validated search is needed (more than one candidate).
    pub fn needs_search(&self) -> bool {
        self.candidates.len() > 1
    }
}

/// One individual prior override for a feature: a prior mean (mode) and an
/// optional scale multiplier on the prior standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorTerm {
    pub mean: f64,
    pub scale: Option<f64>,
}

impl PriorTerm {
    /// Construct a validated prior term.
    ///
    /// # Errors
    /// - [`RegressionError::InvalidPriorMean`] if `mean` is not finite.
    /// - [`RegressionError::InvalidPriorScale`] if a provided scale is not
    ///   finite or not strictly positive.
    pub fn new(mean: f64, scale: Option<f64>) -> RegressionResult<Self> {
        if !mean.is_finite() {
            return Err(RegressionError::InvalidPriorMean { feature: 0, value: mean });
        }
        if let Some(s) = scale {
            if !s.is_finite() || s <= 0.0 {
                return Err(RegressionError::InvalidPriorScale {
                    feature: 0,
                    class: 0,
                    value: s,
                });
            }
        }
        Ok(PriorTerm { mean, scale })
    }
}

/// Individual prior terms keyed by topic and original feature id.
///
/// Topics whose models should pull selected features toward nonzero modes (or
/// hold them looser/tighter than the shared hyperparameter) register terms
/// here; training looks up its topic and applies the overrides to the prior
/// mean/scale matrices for every class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorTermsByTopic {
    by_topic: HashMap<String, HashMap<usize, PriorTerm>>,
}

impl PriorTermsByTopic {
    pub fn new() -> Self {
        PriorTermsByTopic::default()
    }

    /// Register an override for `feature` (an original, pre-selection feature
    /// id) under `topic`.
    pub fn set(&mut self, topic: &str, feature: usize, term: PriorTerm) {
        self.by_topic.entry(topic.to_string()).or_default().insert(feature, term);
    }

    /// The override table for `topic`, if any.
    pub fn terms_for(&self, topic: &str) -> Option<&HashMap<usize, PriorTerm>> {
        self.by_topic.get(topic)
    }
}

fn verify_variance(value: f64) -> RegressionResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(RegressionError::InvalidHyperParam { value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bayes_parameter_rejects_non_positive_variance() {
        assert!(BayesParameter::normal(0.0).is_err());
        assert!(BayesParameter::laplace(f64::NAN).is_err());
        assert!(BayesParameter::normal(2.5).is_ok());
    }

    #[test]
    fn hyper_param_plan_grid_validates_candidates_and_folds() {
        assert_eq!(
            HyperParamPlan::grid(PriorShape::Normal, vec![], 5).unwrap_err(),
            RegressionError::EmptyHyperParamPlan
        );
        assert!(HyperParamPlan::grid(PriorShape::Normal, vec![1.0, -1.0], 5).is_err());
        assert!(HyperParamPlan::grid(PriorShape::Normal, vec![1.0, 2.0], 1).is_err());

        let plan = HyperParamPlan::grid(PriorShape::Laplace, vec![0.5, 1.0, 2.0], 4).unwrap();
        assert!(plan.needs_search());
        assert_eq!(plan.folds(), 4);
        assert_eq!(plan.shape(), PriorShape::Laplace);
    }

    #[test]
    fn fixed_plan_skips_the_search() {
        let plan = HyperParamPlan::fixed(PriorShape::Normal, 1.0).unwrap();
        assert!(!plan.needs_search());
        assert_eq!(plan.candidates(), &[1.0]);
    }

    #[test]
    fn prior_terms_are_looked_up_by_topic_and_feature() {
        let mut terms = PriorTermsByTopic::new();
        terms.set("earn", 17, PriorTerm::new(0.5, Some(2.0)).unwrap());

        let table = terms.terms_for("earn").unwrap();
        assert_eq!(table[&17].mean, 0.5);
        assert!(terms.terms_for("acq").is_none());
    }
}
