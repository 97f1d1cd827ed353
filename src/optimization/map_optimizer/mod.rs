//! map_optimizer — argmin-powered maximizer for penalized log-likelihoods.
//!
//! Purpose
//! -------
//! Provide a high-level, Argmin-backed optimization layer for **maximizing
//! penalized log-likelihoods** `ℓ(θ)` (log-likelihood plus log-prior). Callers
//! implement a single trait, [`PosteriorDensity`], and invoke [`maximize`] to
//! run L-BFGS with a configurable line search, tolerances, and
//! finite-difference fallbacks.
//!
//! Key behaviors
//! -------------
//! - Convert user-supplied objectives `ℓ(θ)` into Argmin-compatible cost
//!   functions `c(θ) = -ℓ(θ)` via [`adapter::ArgMinAdapter`].
//! - Expose a single, user-facing entrypoint [`maximize`] that:
//!   - validates the initial guess with [`PosteriorDensity::check`],
//!   - selects an L-BFGS solver via [`builders`] based on [`traits::LineSearcher`],
//!   - executes the solver via [`run::run_lbfgs`], and
//!   - normalizes results into an [`OptimOutcome`].
//! - Fall back to robust finite differences inside the adapter for gradients
//!   when analytic derivatives are missing, with post-hoc validation and
//!   error capture.
//! - Centralize optimizer configuration ([`Tolerances`], [`MapOptions`]) and
//!   validation logic ([`validation`]) so downstream code can assume sane,
//!   finite inputs.
//!
//! Invariants & assumptions
//! ------------------------
//! - The optimizer **always maximizes** an objective `ℓ(θ)` by minimizing
//!   a cost `c(θ) = -ℓ(θ)`; user code must implement `ℓ(θ)` and `∇ℓ(θ)`
//!   (when available), **never** the cost directly.
//! - [`PosteriorDensity::value`] and [`PosteriorDensity::grad`] must treat
//!   invalid inputs as recoverable [`OptError`](crate::optimization::errors::OptError)
//!   values, not panics.
//! - Vectors use the canonical aliases [`Theta`] and [`Grad`]; all are assumed
//!   finite whenever optimization proceeds.
//! - Configuration types ([`Tolerances`], [`MapOptions`]) are validated on
//!   construction and are treated as internally consistent by the solver
//!   layer.
//!
//! Conventions
//! -----------
//! - Parameters live in a flat coefficient space as [`Theta`]
//!   (`Array1<f64>`). Any mapping from structured coefficient matrices to the
//!   flat layout happens in the model layer.
//! - Errors bubble up as `OptResult<T>` / `OptError`; this module and its
//!   children never intentionally panic or use `unsafe`.
//!
//! Downstream usage
//! ----------------
//! - Model code implements [`PosteriorDensity`] for its objective, then calls
//!   [`maximize`] with an objective instance, an initial parameter vector, a
//!   data payload, and a [`MapOptions`] configuration.
//! - Higher-level front-ends are expected to interact only with the
//!   re-exported surface: [`maximize`], [`PosteriorDensity`], [`MapOptions`],
//!   [`Tolerances`], [`OptimOutcome`], plus numeric aliases from [`types`].
//!
//! Testing notes
//! -------------
//! - Unit tests in submodules cover sign conventions and gradient handling in
//!   [`adapter`], solver construction and tolerance wiring in [`builders`],
//!   configuration and outcome invariants in [`traits`], and recovery of a
//!   known optimum in [`api`].
//! - Integration tests exercise [`maximize`] implicitly by fitting regression
//!   models end to end.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LineSearcher, MapOptions, OptimOutcome, PosteriorDensity, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use polytomous::optimization::map_optimizer::prelude::*;
//
// to import the main optimizer surface in a single line.

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, MapOptions, OptimOutcome, PosteriorDensity, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
