//! Typed errors for the scoring pass.
//!
//! Only malformed statistical arguments surface as failures; degenerate
//! inputs (near-zero spread, tiny samples) resolve to neutral values in
//! `stats` instead of erroring, so one bad field never aborts a batch.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Trim percentage for the trimmed mean must lie in `[0, 50]`.
    #[error("trim percentage must be between 0 and 50, got {0}")]
    InvalidTrimPercent(f64),

    /// Spearman correlation needs two rank sequences of equal length.
    #[error("rank sequences must have the same length ({left} vs {right})")]
    RankLengthMismatch { left: usize, right: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
