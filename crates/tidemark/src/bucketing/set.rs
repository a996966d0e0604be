//! Validated sets of bucket ids built from range expressions.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{ConfigurationError, Result};

/// A bucket range specification.
///
/// Accepts either a single comma-delimited string (`"1-3,5,7-8"`) or a list
/// of tokens (`["1-3", "5", "7-8"]`). Each token is a single bucket id or an
/// inclusive `start-end` span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BucketRanges {
    /// Comma-delimited form.
    Spec(String),
    /// Pre-split token list.
    Tokens(Vec<String>),
}

impl BucketRanges {
    /// Trimmed, non-empty tokens in declaration order.
    pub fn tokens(&self) -> Vec<&str> {
        let raw: Vec<&str> = match self {
            Self::Spec(spec) => spec.split(',').collect(),
            Self::Tokens(tokens) => tokens.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect()
    }
}

impl fmt::Display for BucketRanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens().join(","))
    }
}

impl From<&str> for BucketRanges {
    fn from(spec: &str) -> Self {
        Self::Spec(spec.to_string())
    }
}

impl From<String> for BucketRanges {
    fn from(spec: String) -> Self {
        Self::Spec(spec)
    }
}

impl From<Vec<String>> for BucketRanges {
    fn from(tokens: Vec<String>) -> Self {
        Self::Tokens(tokens)
    }
}

impl From<&[&str]> for BucketRanges {
    fn from(tokens: &[&str]) -> Self {
        Self::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}

/// The concrete, sorted set of bucket ids in scope for a run.
///
/// Always non-empty, deduplicated, and bounded by `[1, total]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSet {
    total: u32,
    members: Vec<u32>,
}

impl BucketSet {
    /// Build a bucket set from a total bucket count and a range specification.
    pub fn new(bucket_total: u32, ranges: &BucketRanges) -> Result<Self> {
        if bucket_total < 1 {
            return Err(ConfigurationError::InvalidBucketTotal { bucket_total });
        }

        let tokens = ranges.tokens();
        if tokens.is_empty() {
            return Err(ConfigurationError::EmptyRanges);
        }

        let mut members = BTreeSet::new();
        for token in tokens {
            let (start, end) = parse_token(token, bucket_total)?;
            members.extend(start..=end);
        }

        Ok(Self {
            total: bucket_total,
            members: members.into_iter().collect(),
        })
    }

    /// Parse a comma-delimited specification such as `"1-3,5"`.
    pub fn parse(bucket_total: u32, spec: &str) -> Result<Self> {
        Self::new(bucket_total, &BucketRanges::from(spec))
    }

    /// The smallest member strictly greater than `bucket_id`, wrapping to
    /// the smallest member when none exists.
    ///
    /// `bucket_id` need not be a member itself.
    pub fn next(&self, bucket_id: u32) -> u32 {
        let idx = self.members.partition_point(|&member| member <= bucket_id);
        self.members.get(idx).copied().unwrap_or_else(|| self.min())
    }

    /// Whether `bucket_id` is in scope.
    pub fn contains(&self, bucket_id: u32) -> bool {
        self.members.binary_search(&bucket_id).is_ok()
    }

    /// The smallest member.
    pub fn min(&self) -> u32 {
        self.members[0]
    }

    /// The total bucket count this set was scoped to.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.members.iter().copied()
    }

    /// Members as a sorted slice.
    pub fn as_slice(&self) -> &[u32] {
        &self.members
    }
}

fn parse_token(token: &str, bucket_total: u32) -> Result<(u32, u32)> {
    let bounds: Vec<&str> = token.split('-').map(str::trim).collect();
    let (start, end) = match bounds.as_slice() {
        [single] => {
            let id = parse_bound(token, single, bucket_total)?;
            (id, id)
        }
        [start, end] => (
            parse_bound(token, start, bucket_total)?,
            parse_bound(token, end, bucket_total)?,
        ),
        _ => return Err(ConfigurationError::malformed(token)),
    };

    if end < start {
        return Err(ConfigurationError::DescendingRange {
            token: token.to_string(),
            start,
            end,
        });
    }

    Ok((start, end))
}

fn parse_bound(token: &str, bound: &str, bucket_total: u32) -> Result<u32> {
    if bound.is_empty() || !bound.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigurationError::NonNumericBound {
            token: token.to_string(),
            bound: bound.to_string(),
        });
    }

    // Digits-only strings can still overflow u64; saturate so they report as out of range.
    let value = bound.parse::<u64>().unwrap_or(u64::MAX);
    if value < 1 || value > u64::from(bucket_total) {
        return Err(ConfigurationError::BoundOutOfRange {
            token: token.to_string(),
            bound: value,
            bucket_total,
        });
    }

    Ok(value as u32)
}
