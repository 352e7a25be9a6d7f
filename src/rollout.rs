//! Deterministic rollout bucketing.
//!
//! The same `(flag key, target id)` pair must land in the same bucket on every call, on every
//! platform, and in every SDK implementation, so flags roll out consistently for a given user.
use sha2::{Digest, Sha256};

/// Hash `input` to a bucket index in `[0, 100000]`.
///
/// Computes the SHA-256 digest of the input, reads the first four bytes as a little-endian
/// integer, and keeps 20 bits (2^20 = 1048576, enough entropy for 100000 distinct buckets). The
/// 20-bit value is normalized by `2^20 - 1` and scaled to the bucket space.
pub fn hash_int(input: &str) -> u32 {
    let digest = Sha256::digest(input.as_bytes());
    let value = u32::from_le_bytes(digest[0..4].try_into().unwrap()) & 0xfffff;
    ((value as f64 / 0xfffff as f64) * 100_000.0).floor() as u32
}

/// Decide whether `target_id` is inside the rollout for `flag_key` at `rollout_percentage`.
///
/// Raising the percentage for a fixed key/target pair can only flip the result from `false` to
/// `true`, never the reverse, which is what makes gradual rollouts possible.
///
/// An empty `target_id` is a valid input: identity-less contexts get a deterministic,
/// context-free bucket. This is intentional degraded behavior, not an error.
pub fn is_in_rollout(flag_key: &str, target_id: &str, rollout_percentage: f64) -> bool {
    if rollout_percentage >= 100.0 {
        return true;
    }
    if rollout_percentage <= 0.0 {
        return false;
    }

    let hash_value = hash_int(&format!("{}.{}", flag_key, target_id));

    // rollout_percentage is 0-100 while buckets are 0-100000, so scale before comparing.
    (hash_value as f64) < rollout_percentage * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        for input in ["flag.user-1", "flag.user-2", "another-flag.", ""] {
            assert_eq!(hash_int(input), hash_int(input), "input: {input:?}");
        }
    }

    #[test]
    fn hash_stays_in_bucket_range() {
        for i in 0..1000 {
            let value = hash_int(&format!("flag.user-{i}"));
            assert!(value <= 100_000, "hash_int out of range: {value}");
        }
    }

    #[test]
    fn distinct_inputs_spread_across_buckets() {
        let buckets: Vec<u32> = (0..100)
            .map(|i| hash_int(&format!("flag.user-{i}")))
            .collect();
        let first = buckets[0];
        assert!(
            buckets.iter().any(|&b| b != first),
            "100 distinct inputs all landed in bucket {first}"
        );
    }

    #[test]
    fn rollout_boundaries() {
        assert!(!is_in_rollout("flag", "user-1", 0.0));
        assert!(is_in_rollout("flag", "user-1", 100.0));
        // Out-of-range values behave like the boundaries.
        assert!(!is_in_rollout("flag", "user-1", -5.0));
        assert!(is_in_rollout("flag", "user-1", 250.0));
    }

    #[test]
    fn rollout_is_monotonic_in_percentage() {
        for i in 0..100 {
            let target = format!("user-{i}");
            let mut seen_true = false;
            for percentage in [1.0, 10.0, 25.0, 50.0, 75.0, 99.0, 100.0] {
                let included = is_in_rollout("flag", &target, percentage);
                assert!(
                    !seen_true || included,
                    "target {target} dropped out when percentage rose to {percentage}"
                );
                seen_true = seen_true || included;
            }
        }
    }

    #[test]
    fn rollout_is_stable_across_calls() {
        let first = is_in_rollout("flag", "user-1", 50.0);
        for _ in 0..10 {
            assert_eq!(is_in_rollout("flag", "user-1", 50.0), first);
        }
    }

    #[test]
    fn empty_target_id_is_a_valid_input() {
        // Identity-less contexts still get a deterministic verdict.
        let first = is_in_rollout("flag", "", 50.0);
        assert_eq!(is_in_rollout("flag", "", 50.0), first);
    }
}
