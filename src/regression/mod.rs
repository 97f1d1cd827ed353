//! regression — polytomous logistic regression stack: core numerics, models,
//! evaluation, persistence, and errors.
//!
//! Purpose
//! -------
//! Provide a cohesive regularized multi-class logistic regression layer that
//! bundles coefficient storage, constraint masks, sparse scoring, evaluation
//! helpers, the `LRModel` training pipeline, and model persistence under a
//! single namespace. This is the main entry point for text-classification
//! model training in the crate and the surface most consumers should depend
//! on.
//!
//! Key behaviors
//! -------------
//! - Collect core numerical and structural building blocks in [`core`]:
//!   parameter matrices with selectable dense/sparse-row storage, the
//!   fixed-coefficient mask, sparse vectors and the merge-based dot product,
//!   and the configuration value objects (model type, prior, hyperparameter
//!   plan, design).
//! - Expose the user-facing model API in [`models`] via [`LRModel`]: train
//!   (tune, fit, optionally squeeze, persist, evaluate), restore, and test.
//! - Turn linear scores into decisions and reports in [`evaluation`]:
//!   argmax, probabilities, threshold tuning, confusion tables, and the
//!   held-out log-likelihood.
//! - Round-trip fitted models through the text format in [`io`].
//! - Centralize errors in [`errors`] (`RegressionError`, `RegressionResult`)
//!   so callers see a uniform error surface across the stack.
//!
//! Invariants & assumptions
//! ------------------------
//! - Sparse rows are strictly increasing by feature index, 0-based and
//!   contiguous with the design's feature selection; [`core::RowSetMem`]
//!   validates this once and the numeric core assumes it thereafter.
//! - Out-of-range parameter-matrix access always fails with
//!   `DimensionConflict` and is never clamped.
//! - [`core::FixedParams`] is immutable after construction; its memoized
//!   count makes it `!Sync` until the cache is warmed.
//! - Everything here is single-threaded, synchronous, CPU-bound code with no
//!   suspension points; long fits are bounded by the optimizer's own
//!   iteration limits, not by cancellation.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based throughout (features, classes, rows).
//! - Coefficient matrices are (features D x classes C); the optimizer's flat
//!   layout is class-major (`theta[k*d + j]`).
//! - The persisted matrix layout is one header line `D C` followed by one
//!   line per feature index with all C coefficients in class order.
//! - Fallible public entrypoints return `RegressionResult<T>`; optimizer and
//!   I/O errors are converted at the module boundary.
//!
//! Downstream usage
//! ----------------
//! - Typical end-to-end flow:
//!   1. Build a [`core::RowSetMem`] of training rows.
//!   2. Choose a [`core::HyperParamPlan`], [`core::DesignParameter`], and
//!      [`core::ModelType`]; optionally register [`core::PriorTermsByTopic`]
//!      overrides.
//!   3. Train an [`LRModel`] with a `WriteModel` sink and an output stream.
//!   4. Later, `restore` from a `ReadModel` source and `test` new row sets.
//! - Import the everyday surface via [`prelude`].

pub mod core;
pub mod errors;
pub mod evaluation;
pub mod io;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------
//
// These are the everyday types most users need. More specialized items
// (cursors, the objective, low-level helpers) remain under their respective
// submodules.

pub use self::core::{
    BayesParameter, Design, DesignParameter, FixedParams, HyperParamPlan, Link, ModelType,
    NameResolver, ParamMatrix, PriorShape, PriorTerm, PriorTermsByTopic, ResultFormat, RowSet,
    RowSetMem, SparseEntry, SparseVector, ThresholdCriterion,
};

pub use self::errors::{RegressionError, RegressionResult};

pub use self::io::{ModelSnapshot, ReadModel, TextModelReader, TextModelWriter, WriteModel};

pub use self::models::{LRModel, TuneStats};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use polytomous::regression::prelude::*;
//
// to import the main regression surface in a single line, without pulling in
// lower-level internals.

pub mod prelude {
    pub use super::{
        BayesParameter, Design, DesignParameter, FixedParams, HyperParamPlan, LRModel, Link,
        ModelSnapshot, ModelType, NameResolver, ParamMatrix, PriorShape, PriorTerm,
        PriorTermsByTopic, ReadModel, RegressionError, RegressionResult, ResultFormat, RowSet,
        RowSetMem, SparseEntry, SparseVector, TextModelReader, TextModelWriter,
        ThresholdCriterion, TuneStats, WriteModel,
    };
}
