//! Credential checking against a salted password store
//!
//! A [`Checker`] owns its store and its [`PasswordEncoder`]; nothing is
//! process-global. An unknown user is an ordinary `Ok(None)` / `Ok(false)`
//! outcome, while store failures surface as errors.

mod scheme;
mod sha512_crypt;
mod sqlite;

pub use scheme::{DEFAULT_SALT, PasswordEncoder, PasswordScheme, encode};
pub use sha512_crypt::{CryptError, ROUNDS_DEFAULT, ROUNDS_MAX, ROUNDS_MIN, sha512_crypt};
pub use sqlite::SqliteStore;

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Users written by `profkit seed`
pub const DEMO_USERS: &[(&str, &str)] = &[("daffy", "rabbit season")];

/// Lookup of encoded passwords by exact user name
pub trait CredentialStore {
    /// Stored encoded password for `user`, or `None` if there is no such user
    fn lookup(&self, user: &str) -> Result<Option<String>>;
}

impl<S: CredentialStore + ?Sized> CredentialStore for &S {
    fn lookup(&self, user: &str) -> Result<Option<String>> {
        (**self).lookup(user)
    }
}

/// In-memory store, used by tests and benchmarks
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    users: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Records are immutable, so an existing user is an error.
    pub fn insert(&mut self, user: &str, encoded: &str) -> Result<()> {
        if self.users.contains_key(user) {
            return Err(Error::DuplicateUser(user.to_string()));
        }
        self.users.insert(user.to_string(), encoded.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialStore for MemoryStore {
    fn lookup(&self, user: &str) -> Result<Option<String>> {
        Ok(self.users.get(user).cloned())
    }
}

/// Verifies login attempts against a store
pub struct Checker<S> {
    store: S,
    encoder: PasswordEncoder,
}

impl<S: CredentialStore> Checker<S> {
    pub fn new(store: S, encoder: PasswordEncoder) -> Self {
        Self { store, encoder }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn encoder(&self) -> &PasswordEncoder {
        &self.encoder
    }

    /// Stored encoded password for `user`
    pub fn lookup(&self, user: &str) -> Result<Option<String>> {
        self.store.lookup(user)
    }

    /// Encode a plaintext password with the configured scheme and salt
    pub fn encode(&self, plaintext: &str) -> Result<String> {
        Ok(self.encoder.encode(plaintext)?)
    }

    /// True if `plaintext` encodes to the stored password for `user`.
    /// Unknown users are rejected without encoding anything.
    pub fn verify(&self, user: &str, plaintext: &str) -> Result<bool> {
        let Some(stored) = self.lookup(user)? else {
            return Ok(false);
        };
        Ok(self.encode(plaintext)? == stored)
    }
}

/// Encode and insert every demo user
pub fn seed_demo_users(store: &SqliteStore, encoder: &PasswordEncoder) -> Result<usize> {
    for (user, password) in DEMO_USERS {
        store.insert(user, &encoder.encode(password)?)?;
        tracing::debug!(user, scheme = %encoder.scheme(), "seeded user");
    }
    Ok(DEMO_USERS.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(scheme: PasswordScheme) -> Checker<MemoryStore> {
        let encoder = PasswordEncoder::new(scheme, DEFAULT_SALT);
        let mut store = MemoryStore::new();
        store
            .insert("daffy", &encoder.encode("rabbit season").unwrap())
            .unwrap();
        Checker::new(store, encoder)
    }

    #[test]
    fn test_verify_matching_password() {
        for scheme in [PasswordScheme::Sha512Crypt, PasswordScheme::Sha256] {
            assert!(checker(scheme).verify("daffy", "rabbit season").unwrap());
        }
    }

    #[test]
    fn test_verify_wrong_password() {
        let checker = checker(PasswordScheme::Sha256);
        assert!(!checker.verify("daffy", "duck season").unwrap());
    }

    #[test]
    fn test_verify_unknown_user_is_false() {
        let checker = checker(PasswordScheme::Sha256);
        assert!(!checker.verify("tweety", "puddy tat").unwrap());
        assert!(!checker.verify("tweety", "rabbit season").unwrap());
        assert_eq!(checker.lookup("tweety").unwrap(), None);
    }

    #[test]
    fn test_verify_agrees_with_encode() {
        let checker = checker(PasswordScheme::Sha512Crypt);
        let stored = checker.lookup("daffy").unwrap().unwrap();
        for password in ["rabbit season", "duck season", ""] {
            assert_eq!(
                checker.verify("daffy", password).unwrap(),
                checker.encode(password).unwrap() == stored
            );
        }
    }

    #[test]
    fn test_verify_under_other_salt_fails() {
        let checker = checker(PasswordScheme::Sha256);
        let other = Checker::new(
            checker.store().clone(),
            PasswordEncoder::new(PasswordScheme::Sha256, "$6$someOtherSalt"),
        );
        assert!(!other.verify("daffy", "rabbit season").unwrap());
    }

    #[test]
    fn test_memory_store_rejects_duplicate() {
        let mut store = MemoryStore::new();
        store.insert("daffy", "x").unwrap();
        assert!(matches!(
            store.insert("daffy", "y"),
            Err(Error::DuplicateUser(_))
        ));
        assert_eq!(store.lookup("daffy").unwrap().as_deref(), Some("x"));
    }

    struct OfflineStore;

    impl CredentialStore for OfflineStore {
        fn lookup(&self, _user: &str) -> Result<Option<String>> {
            Err(Error::Io(std::io::Error::other("store offline")))
        }
    }

    #[test]
    fn test_store_failure_reaches_caller() {
        let checker = Checker::new(OfflineStore, PasswordEncoder::default());
        // Known and unknown users alike: a failed lookup is never a rejection
        for (user, password) in [("daffy", "rabbit season"), ("tweety", "puddy tat")] {
            assert!(matches!(
                checker.verify(user, password),
                Err(Error::Io(e)) if e.to_string() == "store offline"
            ));
        }
        assert!(matches!(checker.lookup("daffy"), Err(Error::Io(_))));
    }

    #[test]
    fn test_store_by_reference() {
        let checker = checker(PasswordScheme::Sha256);
        let borrowed = Checker::new(checker.store(), checker.encoder().clone());
        assert!(borrowed.verify("daffy", "rabbit season").unwrap());
    }
}
