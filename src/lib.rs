//! polytomous — Bayesian polytomous (multi-class) logistic regression core.
//!
//! Purpose
//! -------
//! Serve as the numeric core of a statistical text-classification toolkit:
//! given sparse feature rows and class labels, represent per-feature-per-class
//! coefficients, evaluate linear scores against sparse vectors, apply
//! fixed-to-zero / reference-class constraints, and orchestrate a training
//! pipeline that tunes the prior strength before fitting final coefficients,
//! optionally squeezing the model down to fewer active features.
//!
//! Key behaviors
//! -------------
//! - Expose the regression stack ([`regression`]): parameter matrices with
//!   selectable dense or sparse-row storage, the fixed-coefficient mask,
//!   merge-based sparse scoring, evaluation and reporting helpers, model
//!   persistence, and the [`regression::LRModel`] train/restore/test
//!   pipeline.
//! - Expose the optimization stack ([`optimization`]): an Argmin-backed
//!   L-BFGS maximizer for penalized log-likelihoods behind the
//!   `PosteriorDensity` trait, with validated configuration and a unified
//!   error surface.
//!
//! Invariants & assumptions
//! ------------------------
//! - All heavy numerical work is single-threaded, synchronous, and CPU-bound;
//!   the crate performs no I/O beyond the writer/reader collaborators callers
//!   hand it.
//! - Sparse rows are strictly increasing by feature index in the
//!   selected-feature space; the row-set layer validates this once at
//!   construction and the scoring core assumes it.
//! - Error conditions surface as `RegressionResult` / `OptResult` values;
//!   panics indicate programming errors such as exhausted-cursor access.
//!
//! Downstream usage
//! ----------------
//! - Most callers depend on `regression::prelude::*` for training and
//!   scoring, and only touch `optimization` directly to configure solver
//!   tolerances via `MapOptions`.
//!
//! Testing notes
//! -------------
//! - Unit tests live in `#[cfg(test)]` modules next to the code they cover;
//!   the end-to-end train -> persist -> restore -> test pipeline is covered
//!   by the integration tests under `tests/`.

pub mod optimization;
pub mod regression;
