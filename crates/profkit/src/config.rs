use std::path::PathBuf;

use crate::credentials::{Checker, DEFAULT_SALT, PasswordEncoder, PasswordScheme, SqliteStore};
use crate::error::{Error, Result};

/// Default credential store path
pub const DEFAULT_DB: &str = "passwords.db";

/// Everything needed to build a [`Checker`] over a SQLite store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerConfig {
    pub db_path: PathBuf,
    pub scheme: PasswordScheme,
    pub salt: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            db_path: PathBuf::from(DEFAULT_DB),
            scheme: PasswordScheme::default(),
            salt: DEFAULT_SALT.to_string(),
        }
    }
}

impl CheckerConfig {
    pub fn encoder(&self) -> PasswordEncoder {
        PasswordEncoder::new(self.scheme, self.salt.clone())
    }

    /// Open the existing store and pair it with the configured encoder
    pub fn open_checker(&self) -> Result<Checker<SqliteStore>> {
        if self.salt.is_empty() {
            return Err(Error::InvalidArgument("salt must not be empty".to_string()));
        }
        let store = SqliteStore::open(&self.db_path)?;
        tracing::info!(
            db = %self.db_path.display(),
            scheme = %self.scheme,
            "credential checker ready"
        );
        Ok(Checker::new(store, self.encoder()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::seed_demo_users;

    #[test]
    fn test_defaults() {
        let config = CheckerConfig::default();
        assert_eq!(config.db_path, PathBuf::from("passwords.db"));
        assert_eq!(config.salt, "$6$ZmBkxkRFj03LQOvr");
        assert_eq!(config.encoder().scheme(), PasswordScheme::Sha512Crypt);
    }

    #[test]
    fn test_open_checker_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = CheckerConfig {
            db_path: dir.path().join("missing.db"),
            ..Default::default()
        };
        assert!(matches!(
            config.open_checker(),
            Err(Error::StoreNotFound(_))
        ));
    }

    #[test]
    fn test_open_checker_verifies_seeded_user() {
        let dir = tempfile::tempdir().unwrap();
        let config = CheckerConfig {
            db_path: dir.path().join("passwords.db"),
            scheme: PasswordScheme::Sha256,
            salt: "pepper".to_string(),
        };
        let store = SqliteStore::create(&config.db_path).unwrap();
        seed_demo_users(&store, &config.encoder()).unwrap();
        drop(store);

        let checker = config.open_checker().unwrap();
        assert!(checker.verify("daffy", "rabbit season").unwrap());
        assert!(!checker.verify("daffy", "duck season").unwrap());
        assert!(!checker.verify("tweety", "puddy tat").unwrap());
    }

    #[test]
    fn test_open_checker_rejects_empty_salt() {
        let config = CheckerConfig {
            salt: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.open_checker(),
            Err(Error::InvalidArgument(_))
        ));
    }
}
