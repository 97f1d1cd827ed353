//! optimization — MAP fitting stack, numerical helpers, and unified error
//! surface.
//!
//! Purpose
//! -------
//! Provide a cohesive optimization layer for coefficient fitting, combining an
//! Argmin-backed penalized log-likelihood maximizer, numerically stable
//! transforms, and a single error/result surface. Callers implement an
//! objective, choose tolerances, and obtain fitted parameters and diagnostics
//! without touching backend solver details.
//!
//! Key behaviors
//! -------------
//! - Expose a high-level API for **maximizing penalized log-likelihoods**
//!   `ℓ(θ)` (`map_optimizer`), including configuration of solvers and
//!   stopping criteria.
//! - Supply shared numerical primitives (`numerical_stability`) for stable
//!   link-function evaluation.
//! - Normalize configuration issues, numerical failures, and backend solver
//!   errors into a single enum (`errors::OptError`) with a common result
//!   alias (`OptResult<T>`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Optimizers operate on a flat coefficient vector `θ` and assume that
//!   inputs are finite once validation has passed; invalid states are
//!   reported as `OptError`, not panics.
//! - Objective implementations are expected to treat domain violations
//!   (e.g., out-of-range class labels, non-positive prior scales) as
//!   recoverable errors surfaced through the optimization layer.
//!
//! Conventions
//! -----------
//! - All solvers conceptually maximize an objective `ℓ(θ)` by minimizing
//!   an internal cost `c(θ) = -ℓ(θ)`; user-facing APIs and outcomes are
//!   expressed in terms of `ℓ`.
//! - Public optimization entrypoints that can fail return `OptResult<T>`;
//!   callers never see raw Argmin errors.
//! - This module and its submodules avoid I/O; the only output is the
//!   optional solver observer behind the `obs_slog` feature.
//!
//! Downstream usage
//! ----------------
//! - Model code implements `PosteriorDensity` for its objective and calls
//!   `maximize` with a parameter guess, data payload, and `MapOptions` to
//!   obtain an `OptimOutcome` (via `map_optimizer`).
//! - Front-ends typically import the curated surface via
//!   `optimization::prelude::*`, which forwards the submodule preludes and
//!   the core error types.

pub mod errors;
pub mod map_optimizer;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use polytomous::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::map_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
