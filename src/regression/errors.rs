//! Errors for the regression stack (parameter-matrix access, configuration
//! checks, training-pipeline failures, and model persistence).
//!
//! This module defines the model error type, [`RegressionError`], used across
//! the regression core and the `LRModel` pipeline. It implements
//! `Display`/`Error` and converts from the optimizer and I/O layers.
//!
//! ## Conventions
//! - **Indices are 0-based** throughout (features, classes, rows).
//! - Out-of-range access into a parameter matrix is always fatal to the
//!   current operation ([`RegressionError::DimensionConflict`]); it is never
//!   clamped or silently tolerated.
//! - Optimizer/backend errors are normalized to
//!   [`RegressionError::OptimizationFailed`] with a human-readable status.
use crate::optimization::errors::OptError;

/// Crate-wide result alias for regression operations that may produce
/// [`RegressionError`].
pub type RegressionResult<T> = Result<T, RegressionError>;

/// Unified error type for the regression stack.
///
/// Covers parameter-matrix access, input/data validation, configuration
/// checks, estimation failures, and persistence. Implements
/// `Display`/`Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum RegressionError {
    // ---- Parameter matrix access ----
    /// Access into a parameter matrix with an out-of-range (feature, class)
    /// pair.
    DimensionConflict { feature: usize, class: usize, d: usize, c: usize },

    /// A stored/loaded coefficient matrix disagrees with a design's feature
    /// count.
    FeatureCountMismatch { expected: usize, actual: usize },

    /// A stored/loaded coefficient matrix disagrees with the class count of a
    /// row set.
    ClassCountMismatch { expected: usize, actual: usize },

    // ---- Input/data validation ----
    /// Training or test set contains no rows.
    EmptyRowSet,

    /// A row carries a class label outside the model's class range.
    ClassLabelOutOfRange { row: usize, label: usize, classes: usize },

    /// A sparse row references a feature outside the design's feature space.
    FeatureIndexOutOfRange { row: usize, feature: usize, features: usize },

    // ---- Configuration validation ----
    /// Hyperparameter plan contains no candidate values.
    EmptyHyperParamPlan,

    /// Hyperparameter candidates must be finite and strictly positive.
    InvalidHyperParam { value: f64 },

    /// Cross-validation fold counts must be at least 2 and no larger than the
    /// number of rows.
    InvalidFoldCount { folds: usize, rows: usize },

    /// Prior scale entries must be finite and strictly positive.
    InvalidPriorScale { feature: usize, class: usize, value: f64 },

    /// Prior mean entries must be finite.
    InvalidPriorMean { feature: usize, value: f64 },

    /// Squeeze target must be at least 1 and no larger than the active
    /// feature count.
    InvalidSqueezeTarget { target: usize, active: usize },

    /// Reference class id must name an existing class.
    InvalidReferenceClass { class: usize, classes: usize },

    // ---- Estimation ----
    /// Optimizer failed; include a human-readable status/reason.
    OptimizationFailed { status: String },

    /// Model hasn't been trained or restored yet.
    ModelNotTrained,

    // ---- Persistence ----
    /// Underlying I/O failure while writing or reading a model.
    Io { message: String },

    /// A persisted model could not be parsed.
    ModelParse { line: usize, message: String },
}

impl std::error::Error for RegressionError {}

impl std::fmt::Display for RegressionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Parameter matrix access ----
            RegressionError::DimensionConflict { feature, class, d, c } => {
                write!(
                    f,
                    "Dimension conflict: coefficient ({feature}, {class}) requested from a \
                     {d} x {c} parameter matrix"
                )
            }
            RegressionError::FeatureCountMismatch { expected, actual } => {
                write!(f, "Feature count mismatch: design has {expected}, model has {actual}")
            }
            RegressionError::ClassCountMismatch { expected, actual } => {
                write!(f, "Class count mismatch: data has {expected}, model has {actual}")
            }
            // ---- Input/data validation ----
            RegressionError::EmptyRowSet => {
                write!(f, "Row set is empty.")
            }
            RegressionError::ClassLabelOutOfRange { row, label, classes } => {
                write!(f, "Row {row} carries class label {label}, outside 0..{classes}")
            }
            RegressionError::FeatureIndexOutOfRange { row, feature, features } => {
                write!(f, "Row {row} references feature {feature}, outside 0..{features}")
            }
            // ---- Configuration validation ----
            RegressionError::EmptyHyperParamPlan => {
                write!(f, "Hyperparameter plan contains no candidate values.")
            }
            RegressionError::InvalidHyperParam { value } => {
                write!(f, "Hyperparameter candidate must be finite and > 0; got: {value}")
            }
            RegressionError::InvalidFoldCount { folds, rows } => {
                write!(f, "Fold count {folds} is invalid for {rows} rows (need 2 <= folds <= rows)")
            }
            RegressionError::InvalidPriorScale { feature, class, value } => {
                write!(
                    f,
                    "Prior scale for coefficient ({feature}, {class}) is {value}, \
                     must be finite and > 0"
                )
            }
            RegressionError::InvalidPriorMean { feature, value } => {
                write!(f, "Prior mean for feature {feature} is {value}, must be finite")
            }
            RegressionError::InvalidSqueezeTarget { target, active } => {
                write!(
                    f,
                    "Squeeze target {target} is invalid for {active} active features \
                     (need 1 <= target <= active)"
                )
            }
            RegressionError::InvalidReferenceClass { class, classes } => {
                write!(f, "Reference class {class} is outside 0..{classes}")
            }
            // ---- Estimation ----
            RegressionError::OptimizationFailed { status } => {
                write!(f, "Optimizer failed with status: {status}")
            }
            RegressionError::ModelNotTrained => {
                write!(f, "Model hasn't been trained or restored yet.")
            }
            // ---- Persistence ----
            RegressionError::Io { message } => {
                write!(f, "I/O failure: {message}")
            }
            RegressionError::ModelParse { line, message } => {
                write!(f, "Malformed model file at line {line}: {message}")
            }
        }
    }
}

/// Normalize optimizer failures into the regression error surface.
///
/// Fitting callers see a single `OptimizationFailed` variant carrying the
/// optimizer's own description; the distinction between configuration,
/// numerical, and backend failures stays visible in the message.
impl From<OptError> for RegressionError {
    fn from(err: OptError) -> RegressionError {
        match err {
            OptError::ClassLabelOutOfRange { row, label, classes } => {
                RegressionError::ClassLabelOutOfRange { row, label, classes }
            }
            OptError::InvalidPriorScale { feature, class, value } => {
                RegressionError::InvalidPriorScale { feature, class, value }
            }
            other => RegressionError::OptimizationFailed { status: other.to_string() },
        }
    }
}

impl From<std::io::Error> for RegressionError {
    fn from(err: std::io::Error) -> RegressionError {
        RegressionError::Io { message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_conflict_display_names_the_offending_access() {
        let err = RegressionError::DimensionConflict { feature: 7, class: 2, d: 5, c: 3 };
        let text = err.to_string();
        assert!(text.contains("(7, 2)"));
        assert!(text.contains("5 x 3"));
    }

    #[test]
    fn opt_errors_round_trip_shared_variants() {
        let err: RegressionError =
            OptError::ClassLabelOutOfRange { row: 3, label: 9, classes: 4 }.into();
        assert_eq!(err, RegressionError::ClassLabelOutOfRange { row: 3, label: 9, classes: 4 });
    }

    #[test]
    fn opt_errors_fall_back_to_optimization_failed() {
        let err: RegressionError = OptError::MissingThetaHat.into();
        match err {
            RegressionError::OptimizationFailed { status } => {
                assert!(status.contains("theta hat"));
            }
            other => panic!("expected OptimizationFailed, got {other:?}"),
        }
    }
}
