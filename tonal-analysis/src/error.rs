//! Errors raised by the estimators

use thiserror::Error;

/// Errors that can occur while running an estimator
///
/// Silence and very short input are not errors: estimators return trivial
/// values for them. These variants cover structural failures only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimatorError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Non-finite value produced by {0}")]
    NonFinite(&'static str),
}

/// Validate the common sample rate / frame / hop triple
pub(crate) fn check_framing(
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
) -> Result<(), EstimatorError> {
    if sample_rate == 0 {
        return Err(EstimatorError::InvalidParameters(
            "sample rate must be positive".into(),
        ));
    }
    if frame_size < 2 {
        return Err(EstimatorError::InvalidParameters(format!(
            "frame size {frame_size} is too small"
        )));
    }
    if hop_size == 0 {
        return Err(EstimatorError::InvalidParameters(
            "hop size must be positive".into(),
        ));
    }
    Ok(())
}
