use thiserror::Error;

use crate::CardError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("threshold must be a positive integer")]
    ZeroThreshold,
    #[error("max_failures must be a positive integer")]
    ZeroMaxFailures,
    #[error("consecutive_failures {consecutive_failures} exceeds max_failures {max_failures}")]
    FailuresAboveLimit {
        consecutive_failures: u32,
        max_failures: u32,
    },
    #[error("cursor {cursor} cannot be advanced")]
    CursorOverflow { cursor: u64 },
    #[error("invalid card: {0}")]
    InvalidCard(#[from] CardError),
}
