const HASH_LENGTH: usize = 8;

/// Short token that keeps preview URLs and release names for a pull request unique.
///
/// The first eight characters of the hex-encoded SHA256 sum of the pull request id
/// concatenated with `salt`. Lowercase hex, so it is always a valid DNS label fragment.
/// Not a security boundary.
pub fn generate_hash(pull_request_id: u64, salt: &str) -> String {
    let digest = sha256::digest(format!("{pull_request_id}{salt}"));
    digest[..HASH_LENGTH].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(generate_hash(42, "pepper"), generate_hash(42, "pepper"));
    }

    #[test]
    fn hash_is_dns_label_safe() {
        for pr in [0, 1, 42, 9999, u64::MAX] {
            let hash = generate_hash(pr, "salt");
            assert_eq!(hash.len(), HASH_LENGTH);
            assert!(hash.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()), "{hash}");
        }
    }

    #[test]
    fn hash_depends_on_salt_and_pull_request() {
        assert_ne!(generate_hash(42, "a"), generate_hash(42, "b"));
        assert_ne!(generate_hash(42, "a"), generate_hash(43, "a"));
    }

    #[test]
    fn hash_matches_sha256_prefix() {
        // sha256("42") = 73475cb4...
        assert_eq!(generate_hash(42, ""), "73475cb4");
    }
}
