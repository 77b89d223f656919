//! Password hashing and strength policy.

use anyhow::{Context, Result};

/// bcrypt work factor, high enough to resist offline brute force.
pub const BCRYPT_COST: u32 = 12;

/// Special characters accepted by the strength policy.
const SPECIAL_CHARS: &str = "@$!%*?&";

/// Hash a password with a per-hash random salt.
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, BCRYPT_COST).context("failed to hash password")
}

/// Compare a candidate password against a stored hash.
///
/// bcrypt compares digests in constant time; any malformed hash is treated
/// as a mismatch rather than an error so callers cannot distinguish the two.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    bcrypt::verify(password, password_hash).unwrap_or(false)
}

/// Strength policy: at least 8 characters with lowercase, uppercase, a digit
/// and one of `@$!%*?&`.
pub fn is_password_strong(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| SPECIAL_CHARS.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_strength() {
        assert!(is_password_strong("Abc1234!"));
        assert!(!is_password_strong("abcdefgh")); // no uppercase/digit/special
        assert!(!is_password_strong("ABCDEFG1")); // no lowercase/special
        assert!(!is_password_strong("Ab1!")); // too short
        assert!(!is_password_strong("Abcdefg1")); // no special
        assert!(is_password_strong("longer-Passw0rd?"));
    }

    #[test]
    fn test_verify_password_roundtrip() {
        // Low cost keeps the test fast; verification is cost-agnostic.
        let hash = bcrypt::hash("Abc1234!", 4).unwrap();
        assert!(verify_password("Abc1234!", &hash));
        assert!(!verify_password("Abc1234?", &hash));
    }

    #[test]
    fn test_verify_password_malformed_hash() {
        assert!(!verify_password("Abc1234!", "not-a-bcrypt-hash"));
        assert!(!verify_password("Abc1234!", ""));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = bcrypt::hash("Abc1234!", 4).unwrap();
        let second = bcrypt::hash("Abc1234!", 4).unwrap();
        assert_ne!(first, second);
    }
}
