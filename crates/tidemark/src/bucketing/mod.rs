//! Deterministic bucket assignment.
//!
//! Entities are spread across `bucket_total` numbered buckets by a keyed
//! digest of their identifier, so independent runs agree on which bucket an
//! entity belongs to without talking to each other.
//!
//! # Compatibility
//!
//! The assignment is HMAC-SHA256 keyed by the namespace key, truncated to the
//! first [`DIGEST_PREFIX_HEX_LEN`] hex characters of the digest, read as an
//! unsigned integer, reduced modulo `bucket_total` and shifted to be
//! 1-indexed. Changing either the algorithm or the prefix width reassigns
//! every entity and must be treated as a breaking change to persisted data.
//!
//! # Module Structure
//!
//! - [`set`] - `BucketSet` and `BucketRanges`
//! - [`filter`] - `BucketFilter` for selecting a run's entities
//! - [`errors`] - `ConfigurationError`

pub mod errors;
pub mod filter;
pub mod set;

use hmac::{Hmac, Mac};
use sha2::Sha256;

pub use errors::ConfigurationError;
pub use filter::BucketFilter;
pub use set::{BucketRanges, BucketSet};

type HmacSha256 = Hmac<Sha256>;

/// Number of leading hex characters of the digest used for assignment.
pub const DIGEST_PREFIX_HEX_LEN: usize = 8;

const DIGEST_PREFIX_BYTES: usize = DIGEST_PREFIX_HEX_LEN / 2;

fn keyed_digest(namespace_key: &str, entity: &str) -> Vec<u8> {
    // `Hmac<D>` hashes keys longer than the block size and pads shorter ones
    // (RFC 2104), so `new_from_slice` only errors for fixed-key MACs.
    let mut mac = HmacSha256::new_from_slice(namespace_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(entity.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Hex prefix of the keyed digest for an entity identifier.
///
/// Exposed for diagnostics; [`bucket`] is this value modulo the bucket total.
pub fn digest_prefix(namespace_key: &str, entity: &str) -> String {
    hex::encode(&keyed_digest(namespace_key, entity)[..DIGEST_PREFIX_BYTES])
}

/// Map an entity identifier to a bucket id in `[1, bucket_total]`.
///
/// Pure: identical inputs always yield the same bucket. A `bucket_total` of
/// zero is treated as one.
pub fn bucket(namespace_key: &str, entity: &str, bucket_total: u32) -> u32 {
    let prefix = digest_value(namespace_key, entity);
    let total = u64::from(bucket_total.max(1));
    (prefix % total) as u32 + 1
}

/// The digest prefix read as a big-endian integer.
fn digest_value(namespace_key: &str, entity: &str) -> u64 {
    keyed_digest(namespace_key, entity)[..DIGEST_PREFIX_BYTES]
        .iter()
        .fold(0, |acc, byte| (acc << 8) | u64::from(*byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_value_matches_hex_prefix() {
        for i in 0..100 {
            let entity = format!("acme/repo-{i}");
            let prefix = digest_prefix("tidemark-sources", &entity);

            assert_eq!(prefix.len(), DIGEST_PREFIX_HEX_LEN);
            assert_eq!(
                digest_value("tidemark-sources", &entity),
                u64::from_str_radix(&prefix, 16).unwrap()
            );
        }
    }

    #[test]
    fn test_bucket_is_deterministic() {
        let first = bucket("tidemark-sources", "myrepo", 10);
        let second = bucket("tidemark-sources", "myrepo", 10);

        assert_eq!(first, second);
    }

    #[test]
    fn test_bucket_is_within_bounds() {
        for total in [1, 2, 3, 7, 10, 64] {
            for i in 0..200 {
                let id = bucket("ns", &format!("entity-{i}"), total);
                assert!((1..=total).contains(&id), "{id} not in 1..={total}");
            }
        }
    }

    #[test]
    fn test_total_only_changes_modulus() {
        let prefix = digest_prefix("ns", "myrepo");
        let value = u64::from_str_radix(&prefix, 16).unwrap();

        assert_eq!(prefix.len(), DIGEST_PREFIX_HEX_LEN);
        for total in [1u32, 2, 5, 10, 97] {
            assert_eq!(
                u64::from(bucket("ns", "myrepo", total)),
                value % u64::from(total) + 1
            );
        }
    }

    #[test]
    fn test_namespace_key_changes_digest() {
        assert_ne!(digest_prefix("ns-a", "myrepo"), digest_prefix("ns-b", "myrepo"));
    }

    #[test]
    fn test_single_bucket_always_one() {
        assert_eq!(bucket("ns", "anything", 1), 1);
        assert_eq!(bucket("ns", "anything", 0), 1);
    }

    #[test]
    fn test_spreads_across_buckets() {
        let mut counts = [0usize; 4];
        for i in 0..400 {
            counts[(bucket("ns", &format!("org/repo-{i}"), 4) - 1) as usize] += 1;
        }
        assert!(counts.iter().all(|&c| c > 0), "uneven spread: {counts:?}");
    }
}
