//! Model-type configuration: link function, threshold tuning policy, and the
//! reference-class choice.
use crate::optimization::errors::OptError;
use std::str::FromStr;

/// Link function relating linear scores to class probabilities.
///
/// - `Logistic`: binary logistic link on the class-1 vs class-0 score
///   difference. Valid only for two-class problems.
/// - `Multinomial`: softmax over all class scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Logistic,
    Multinomial,
}

/// Criterion optimized by binary threshold tuning.
///
/// - `ErrorCount`: minimize misclassifications.
/// - `F1`: maximize the F1 score of the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdCriterion {
    ErrorCount,
    F1,
}

impl FromStr for ThresholdCriterion {
    type Err = OptError;

    /// Parse a criterion name (case-insensitive: `"errorcount"`, `"f1"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "errorcount" => Ok(ThresholdCriterion::ErrorCount),
            "f1" => Ok(ThresholdCriterion::F1),
            _ => Err(OptError::InvalidParameter {
                text: format!("unknown threshold criterion '{s}'"),
            }),
        }
    }
}

/// Configuration of the model family being trained.
///
/// Carries the link function, the optional binary threshold-tuning criterion
/// (`None` keeps the default decision threshold of 0.0), and the optional
/// reference class whose coefficient column is fixed during fitting. The
/// reference id is validated against the class count at train time, not here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelType {
    pub link: Link,
    pub tune: Option<ThresholdCriterion>,
    pub reference_class: Option<usize>,
}

impl ModelType {
    pub fn new(link: Link, tune: Option<ThresholdCriterion>, reference_class: Option<usize>) -> Self {
        ModelType { link, tune, reference_class }
    }

    /// Softmax model, no threshold tuning, no reference class.
    pub fn multinomial() -> Self {
        ModelType::new(Link::Multinomial, None, None)
    }

    /// Binary logistic model with an optional tuning criterion.
    pub fn binary(tune: Option<ThresholdCriterion>) -> Self {
        ModelType::new(Link::Logistic, tune, None)
    }

    pub fn is_binary(&self) -> bool {
        self.link == Link::Logistic
    }
}

/// Per-row output written by model evaluation.
///
/// - `Probabilities`: estimated class probabilities (`estprob` output).
/// - `Scores`: raw linear predictors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    Probabilities,
    Scores,
}

impl FromStr for ResultFormat {
    type Err = OptError;

    /// Parse a format name (case-insensitive: `"prob"`, `"score"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prob" => Ok(ResultFormat::Probabilities),
            "score" => Ok(ResultFormat::Scores),
            _ => Err(OptError::InvalidParameter { text: format!("unknown result format '{s}'") }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convenience_constructors_pick_the_expected_link() {
        assert_eq!(ModelType::multinomial().link, Link::Multinomial);
        assert!(ModelType::binary(Some(ThresholdCriterion::F1)).is_binary());
    }

    #[test]
    fn result_format_parses_known_names_only() {
        assert_eq!("prob".parse::<ResultFormat>().unwrap(), ResultFormat::Probabilities);
        assert_eq!("SCORE".parse::<ResultFormat>().unwrap(), ResultFormat::Scores);
        assert!("csv".parse::<ResultFormat>().is_err());
    }
}
