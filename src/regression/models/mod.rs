//! Model-level API: the [`LRModel`] training/restoration/testing pipeline
//! and the penalized objective it fits with.
//!
//! [`objective`] supplies the constrained fitting routine (the multinomial
//! posterior wired into the MAP optimizer); [`lr`] orchestrates it into the
//! tune, fit, squeeze, persist, evaluate pipeline.

pub mod lr;
pub mod objective;

pub use self::lr::{LRModel, TuneStats};
pub use self::objective::{FitOutcome, FoldFilter, PenalizedMultinomial, fit_coefficients};
