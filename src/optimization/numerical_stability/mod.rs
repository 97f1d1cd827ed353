//! Numerically stable building blocks shared across the fitting and
//! evaluation code.
//!
//! The transforms here exist so that likelihood evaluation never produces
//! avoidable overflow: the binary logistic log-likelihood goes through
//! [`transformations::safe_softplus`] and the multinomial normalizer through
//! [`transformations::log_sum_exp`]. Both are pure functions of their inputs.

pub mod transformations;

pub use self::transformations::{log_sum_exp, safe_softplus};

pub mod prelude {
    pub use super::transformations::{log_sum_exp, safe_softplus};
}
