//! Account number generation.

use rand::Rng;
use sha2::{Digest, Sha256};
use tally_shared::{
    AccountNumber,
    types::{ACCOUNT_NUMBER_MODULUS, UserId},
};

/// Produces candidate account numbers.
///
/// Candidates are not guaranteed to be unused; the caller checks them
/// against the store and asks again on collision.
pub trait AccountNumberGenerator: Send + Sync {
    /// Returns a candidate number for an account owned by `user_id`.
    fn generate(&self, user_id: UserId) -> AccountNumber;
}

/// Upper bound (exclusive) of the salt mixed into each hash.
const SALT_BOUND: u32 = 100_000;

/// Hashes the user id with a random salt and keeps the last ten digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashAccountNumberGenerator;

impl HashAccountNumberGenerator {
    /// Derives the number for a given user and salt.
    #[must_use]
    pub fn derive(user_id: UserId, salt: u32) -> AccountNumber {
        let digest = Sha256::digest(format!("{user_id}{salt}").as_bytes());
        let modulus = u128::from(ACCOUNT_NUMBER_MODULUS);
        let reduced = digest
            .iter()
            .fold(0u128, |acc, byte| (acc * 256 + u128::from(*byte)) % modulus);
        // reduced < 10^10, always fits
        AccountNumber::from_u64(u64::try_from(reduced).unwrap_or_default())
    }
}

impl AccountNumberGenerator for HashAccountNumberGenerator {
    fn generate(&self, user_id: UserId) -> AccountNumber {
        let salt = rand::rng().random_range(0..SALT_BOUND);
        Self::derive(user_id, salt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let a = HashAccountNumberGenerator::derive(UserId::new(1), 42);
        let b = HashAccountNumberGenerator::derive(UserId::new(1), 42);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 10);
    }

    #[test]
    fn test_salt_changes_number() {
        let a = HashAccountNumberGenerator::derive(UserId::new(1), 1);
        let b = HashAccountNumberGenerator::derive(UserId::new(1), 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_generated_numbers_are_digits() {
        let generator = HashAccountNumberGenerator;
        for user in 1..50 {
            let number = generator.generate(UserId::new(user));
            assert!(number.as_str().bytes().all(|b| b.is_ascii_digit()));
        }
    }
}
