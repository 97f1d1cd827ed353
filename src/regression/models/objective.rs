//! Penalized multinomial objective: the constrained fitting routine behind
//! training.
//!
//! This module wires the regression data model to the [`PosteriorDensity`]
//! trait. The objective is the multinomial log-likelihood over sparse rows
//! plus the log-prior over free coefficients; [`maximize`] runs L-BFGS on it
//! and [`fit_coefficients`] packages the result back into a [`ParamMatrix`]
//! with the achieved penalized log-likelihood as the fit statistic.
//!
//! Key ideas:
//! - Coefficients live in the optimizer's flat class-major layout
//!   (`theta[k*d + j]`), matching the dense store.
//! - Fixed coefficients are handled by projection: they read as 0.0 inside
//!   `value`, their gradient entries are zeroed, and the starting point puts
//!   them at zero, so L-BFGS never moves them.
//! - The Gaussian prior contributes `-(β-μ)²/(2v)` per free coefficient and
//!   the Laplace prior `-λ|β-μ|` with `λ = sqrt(2/v)` and the subgradient
//!   convention `sign(0) = 0`, where `v` is the hyperparameter variance
//!   times the squared per-coefficient prior scale. Additive normalizing
//!   constants are dropped; they cancel in every comparison the pipeline
//!   makes.
//! - A two-class problem is fitted with the same softmax likelihood; it
//!   coincides with the binary logistic likelihood on the score difference.
//! - Cross-validation reuses the same objective through a [`FoldFilter`]
//!   that includes or excludes one deterministic fold (`row % folds`).
use crate::optimization::{
    errors::{OptError, OptResult},
    map_optimizer::{Cost, Grad, MapOptions, PosteriorDensity, Theta, maximize},
    numerical_stability::log_sum_exp,
};
use crate::regression::{
    core::{
        design::{NameResolver, RowSet, RowSetMem},
        fixed::FixedParams,
        params::{DenseStore, ParamMatrix},
        prior::{BayesParameter, PriorShape},
    },
    errors::{RegressionError, RegressionResult},
};
use ndarray::Array1;
use std::cell::RefCell;

/// Deterministic row filter for cross-validation.
///
/// Rows are assigned to folds by `row_index % folds`; the filter either keeps
/// everything, excludes one fold (training side), or keeps only one fold
/// (held-out side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldFilter {
    All,
    Exclude { fold: usize, of: usize },
    Only { fold: usize, of: usize },
}

impl FoldFilter {
    pub fn keeps(&self, row: usize) -> bool {
        match *self {
            FoldFilter::All => true,
            FoldFilter::Exclude { fold, of } => row % of != fold,
            FoldFilter::Only { fold, of } => row % of == fold,
        }
    }
}

/// The posterior objective of a polytomous model: multinomial log-likelihood
/// plus log-prior, with fixed coefficients projected to zero.
///
/// Prior mean and scale are flattened into the optimizer layout at
/// construction, which also validates them (means finite, scales finite and
/// strictly positive). The per-evaluation scratch buffer for linear scores is
/// a `RefCell`, so an instance is single-threaded like the rest of the core.
#[derive(Debug)]
pub struct PenalizedMultinomial<'a> {
    d: usize,
    c: usize,
    /// Prior mean per coefficient, flat class-major layout.
    mean: Vec<f64>,
    /// Effective prior variance per coefficient: hyperparameter variance
    /// times squared prior scale, flat class-major layout.
    variance: Vec<f64>,
    shape: PriorShape,
    fixed: &'a FixedParams,
    fold: FoldFilter,
    lin_buf: RefCell<Vec<f64>>,
}

impl<'a> PenalizedMultinomial<'a> {
    /// Build the objective for a `d x c` coefficient space.
    ///
    /// `d` and `c` must match the feature and class counts of the row set
    /// later passed to `value`/`grad`; rows referencing features at or above
    /// `d` are a programming error.
    ///
    /// # Errors
    /// - [`RegressionError::FeatureCountMismatch`] /
    ///   [`RegressionError::ClassCountMismatch`] if the prior matrices
    ///   disagree with `d x c`.
    /// - [`RegressionError::InvalidPriorMean`] /
    ///   [`RegressionError::InvalidPriorScale`] for non-finite means or
    ///   non-positive scales.
    pub fn new(
        d: usize, c: usize, prior_mean: &ParamMatrix, prior_scale: &ParamMatrix,
        bayes: &BayesParameter, fixed: &'a FixedParams, fold: FoldFilter,
    ) -> RegressionResult<Self> {
        for m in [prior_mean, prior_scale] {
            if m.d() != d {
                return Err(RegressionError::FeatureCountMismatch { expected: d, actual: m.d() });
            }
            if m.c() != c {
                return Err(RegressionError::ClassCountMismatch { expected: c, actual: m.c() });
            }
        }
        let mut mean = vec![0.0; d * c];
        let mut variance = vec![0.0; d * c];
        for k in 0..c {
            for j in 0..d {
                let mu = prior_mean.get(j, k)?;
                if !mu.is_finite() {
                    return Err(RegressionError::InvalidPriorMean { feature: j, value: mu });
                }
                let scale = prior_scale.get(j, k)?;
                if !scale.is_finite() || scale <= 0.0 {
                    return Err(RegressionError::InvalidPriorScale {
                        feature: j,
                        class: k,
                        value: scale,
                    });
                }
                mean[k * d + j] = mu;
                variance[k * d + j] = bayes.variance * scale * scale;
            }
        }
        Ok(PenalizedMultinomial {
            d,
            c,
            mean,
            variance,
            shape: bayes.shape,
            fixed,
            fold,
            lin_buf: RefCell::new(vec![0.0; c]),
        })
    }

    fn coefficient(&self, theta: &Theta, j: usize, k: usize) -> f64 {
        if self.fixed.is_fixed(j, k) { 0.0 } else { theta[k * self.d + j] }
    }

    fn log_prior(&self, theta: &Theta) -> f64 {
        let mut lp = 0.0;
        for k in 0..self.c {
            for j in 0..self.d {
                if self.fixed.is_fixed(j, k) {
                    continue;
                }
                let idx = k * self.d + j;
                let dev = theta[idx] - self.mean[idx];
                lp -= match self.shape {
                    PriorShape::Normal => dev * dev / (2.0 * self.variance[idx]),
                    PriorShape::Laplace => (2.0 / self.variance[idx]).sqrt() * dev.abs(),
                };
            }
        }
        lp
    }
}

impl PosteriorDensity for PenalizedMultinomial<'_> {
    type Data = RowSetMem;

    /// Penalized log-likelihood at `θ`: per kept row, the class-`y` score
    /// minus the softmax normalizer, plus the log-prior over free
    /// coefficients.
    fn value(&self, theta: &Theta, rows: &Self::Data) -> OptResult<Cost> {
        let mut lin = self.lin_buf.borrow_mut();
        let mut ll = 0.0;
        for i in 0..rows.n_rows() {
            if !self.fold.keeps(i) {
                continue;
            }
            let (entries, y) = rows.row(i);
            for k in 0..self.c {
                let mut s = 0.0;
                for e in entries {
                    s += e.value * self.coefficient(theta, e.var, k);
                }
                lin[k] = s;
            }
            ll += lin[y] - log_sum_exp(&lin);
        }
        Ok(ll + self.log_prior(theta))
    }

    /// Validate an unconstrained coefficient vector `θ`.
    ///
    /// - Checks `θ.len() == d * c`.
    /// - Ensures all entries are finite.
    fn check(&self, theta: &Theta, _rows: &Self::Data) -> OptResult<()> {
        if theta.len() != self.d * self.c {
            return Err(OptError::ThetaLengthMismatch {
                expected: self.d * self.c,
                actual: theta.len(),
            });
        }
        for (index, &value) in theta.iter().enumerate() {
            if !value.is_finite() {
                return Err(OptError::InvalidThetaInput { index, value });
            }
        }
        Ok(())
    }

    /// Analytic gradient: per kept row and class, `(1[y=k] - p_k)` times the
    /// row's feature values, plus the prior derivative; fixed coordinates are
    /// zeroed last.
    fn grad(&self, theta: &Theta, rows: &Self::Data) -> OptResult<Grad> {
        let mut grad = Array1::zeros(self.d * self.c);
        let mut lin = self.lin_buf.borrow_mut();
        for i in 0..rows.n_rows() {
            if !self.fold.keeps(i) {
                continue;
            }
            let (entries, y) = rows.row(i);
            for k in 0..self.c {
                let mut s = 0.0;
                for e in entries {
                    s += e.value * self.coefficient(theta, e.var, k);
                }
                lin[k] = s;
            }
            let norm = log_sum_exp(&lin);
            for k in 0..self.c {
                let p = (lin[k] - norm).exp();
                let coeff = if y == k { 1.0 - p } else { -p };
                for e in entries {
                    grad[k * self.d + e.var] += coeff * e.value;
                }
            }
        }
        for k in 0..self.c {
            for j in 0..self.d {
                let idx = k * self.d + j;
                if self.fixed.is_fixed(j, k) {
                    grad[idx] = 0.0;
                    continue;
                }
                let dev = theta[idx] - self.mean[idx];
                grad[idx] -= match self.shape {
                    PriorShape::Normal => dev / self.variance[idx],
                    PriorShape::Laplace => (2.0 / self.variance[idx]).sqrt() * dev.signum(),
                };
            }
        }
        Ok(grad)
    }
}

/// Result of one constrained fit: the coefficients and the fit statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    pub beta: ParamMatrix,
    /// Achieved penalized log-likelihood at the fitted coefficients.
    pub penalized_loglik: f64,
    pub converged: bool,
    pub iterations: usize,
}

/// Fit coefficients for `rows` under the given prior and constraint mask.
///
/// The black-box fitting routine the training pipeline calls: builds the
/// [`PenalizedMultinomial`] objective, starts from `warm_start` (or zeros)
/// with fixed coordinates pinned to zero, maximizes, and returns the fitted
/// matrix plus the achieved penalized log-likelihood.
///
/// # Errors
/// - [`RegressionError::EmptyRowSet`] if the filter keeps no rows.
/// - Prior/dimension validation errors from the objective constructor.
/// - [`RegressionError::OptimizationFailed`] for solver failures.
#[allow(clippy::too_many_arguments)]
pub fn fit_coefficients(
    rows: &RowSetMem, prior_mean: &ParamMatrix, prior_scale: &ParamMatrix,
    bayes: &BayesParameter, fixed: &FixedParams, fold: FoldFilter,
    warm_start: Option<&ParamMatrix>, opts: &MapOptions,
) -> RegressionResult<FitOutcome> {
    let d = rows.n_features();
    let c = rows.n_classes();
    if !(0..rows.n_rows()).any(|i| fold.keeps(i)) {
        return Err(RegressionError::EmptyRowSet);
    }
    let objective = PenalizedMultinomial::new(d, c, prior_mean, prior_scale, bayes, fixed, fold)?;

    let mut theta0 = match warm_start {
        Some(ws) if ws.d() == d && ws.c() == c => match ws.as_dense() {
            Some(store) => store.to_theta(),
            None => Array1::zeros(d * c),
        },
        _ => Array1::zeros(d * c),
    };
    for k in 0..c {
        for j in 0..d {
            if fixed.is_fixed(j, k) {
                theta0[k * d + j] = 0.0;
            }
        }
    }

    let outcome = maximize(&objective, theta0, rows, opts)?;

    let mut beta = ParamMatrix::Dense(DenseStore::from_theta(d, c, &outcome.theta_hat));
    for k in 0..c {
        for j in 0..d {
            if fixed.is_fixed(j, k) {
                beta.set(j, k, 0.0)?;
            }
        }
    }

    Ok(FitOutcome {
        beta,
        penalized_loglik: outcome.value,
        converged: outcome.converged,
        iterations: outcome.iterations,
    })
}
