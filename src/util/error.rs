//! Error types for detsift.

use std::fmt;
use thiserror::Error;

/// Result alias for detsift operations.
pub type DetSiftResult<T> = std::result::Result<T, DetSiftError>;

/// Pipeline stage that detected a violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Prediction tensor construction.
    Tensor,
    /// Candidate decoding (box conversion, anchor priors).
    Decode,
    /// Score thresholding.
    Filter,
    /// Non-max suppression.
    Suppress,
    /// Evaluator composition and rescaling.
    Evaluate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Tensor => "tensor",
            Stage::Decode => "decode",
            Stage::Filter => "filter",
            Stage::Suppress => "suppress",
            Stage::Evaluate => "evaluate",
        };
        f.write_str(name)
    }
}

/// Errors that can occur when running the detection pipeline.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DetSiftError {
    /// The prediction tensor does not have the configured shape.
    #[error("{stage}: shape mismatch in {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        stage: Stage,
        what: &'static str,
        expected: usize,
        got: usize,
    },
    /// A threshold, count or dimension is outside its valid range.
    #[error("{stage}: invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        stage: Stage,
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

impl DetSiftError {
    /// Returns the stage that raised the error.
    pub fn stage(&self) -> Stage {
        match self {
            DetSiftError::ShapeMismatch { stage, .. } => *stage,
            DetSiftError::InvalidParameter { stage, .. } => *stage,
        }
    }
}

/// Checks that `value` is a probability-like threshold in `[0, 1]`.
pub(crate) fn check_unit_interval(
    stage: Stage,
    name: &'static str,
    value: f32,
) -> DetSiftResult<()> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(DetSiftError::InvalidParameter {
            stage,
            name,
            value: value as f64,
            reason: "must be within [0, 1]",
        });
    }
    Ok(())
}

/// Checks that `value` is finite and strictly positive.
pub(crate) fn check_positive(stage: Stage, name: &'static str, value: f32) -> DetSiftResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DetSiftError::InvalidParameter {
            stage,
            name,
            value: value as f64,
            reason: "must be finite and > 0",
        });
    }
    Ok(())
}
