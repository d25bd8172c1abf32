//! Validation errors raised by the scheduler and the achievement engine.

/// Input rejected before any state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid quality rating {0}: expected a value between 0 and 5")]
    InvalidQuality(i64),
    #[error("invalid achievement stats: {0}")]
    InvalidStatsInput(String),
    #[error("invalid exam score {0}: expected a value between 0 and 100")]
    InvalidScore(i64),
}
