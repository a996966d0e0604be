use thiserror::Error;

/// Errors raised for invalid bucketing configuration.
///
/// These are fail-fast errors: a run that hits one should abort before any
/// entity is processed. They are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// `bucket_total` is zero.
    #[error("bucket_total must be a positive integer, got {bucket_total}")]
    InvalidBucketTotal { bucket_total: u32 },

    /// `bucket_id` lies outside `[1, bucket_total]`.
    #[error("bucket_id must be between 1 and {bucket_total}, got {bucket_id}")]
    BucketIdOutOfRange { bucket_id: u32, bucket_total: u32 },

    /// The range specification contained no tokens.
    #[error("bucket_ranges must not be empty")]
    EmptyRanges,

    /// A token was neither `n` nor `n-m`.
    #[error("Invalid bucket range '{token}': expected a number or 'start-end'")]
    MalformedRange { token: String },

    /// A range bound did not parse as a number.
    #[error("Invalid bucket range '{token}': '{bound}' is not a number")]
    NonNumericBound { token: String, bound: String },

    /// A range bound lies outside `[1, bucket_total]`.
    #[error("Invalid bucket range '{token}': {bound} is outside 1..={bucket_total}")]
    BoundOutOfRange {
        token: String,
        bound: u64,
        bucket_total: u32,
    },

    /// A range whose end is less than its start.
    #[error("Invalid bucket range '{token}': end {end} is less than start {start}")]
    DescendingRange { token: String, start: u32, end: u32 },

    /// Round-robin is enabled but no bucket has been scheduled yet.
    #[error("No bucket has been scheduled for round robin execution")]
    NotScheduled,
}

impl ConfigurationError {
    /// Create a malformed-range error.
    #[inline]
    pub fn malformed(token: impl Into<String>) -> Self {
        Self::MalformedRange {
            token: token.into(),
        }
    }
}

/// Result type for bucketing configuration.
pub type Result<T> = std::result::Result<T, ConfigurationError>;
