use rusqlite::{Connection, OptionalExtension, ffi};
use std::path::Path;

use super::CredentialStore;
use crate::error::{Error, Result};

/// Credential store backed by a SQLite `users` table
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing store
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::StoreNotFound(path.display().to_string()));
        }
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened credential store");
        Ok(Self { conn })
    }

    /// Open or create a store and make sure the schema exists
    pub fn create(path: &Path) -> Result<Self> {
        let store = Self {
            conn: Connection::open(path)?,
        };
        store.create_schema()?;
        tracing::debug!(path = %path.display(), "created credential store");
        Ok(store)
    }

    /// Fresh store that lives only as long as this value
    pub fn in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user TEXT PRIMARY KEY,
                passwd TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Add a record. Records are immutable, so an existing user is an error.
    pub fn insert(&self, user: &str, encoded: &str) -> Result<()> {
        match self.conn.execute(
            "INSERT INTO users (user, passwd) VALUES (?1, ?2)",
            [user, encoded],
        ) {
            Ok(_) => Ok(()),
            Err(e) => Err(insert_error(user, e)),
        }
    }

    /// Number of stored users
    pub fn user_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Only a primary key clash means the user exists; other constraint
/// failures (triggers, NOT NULL) stay database errors.
fn insert_error(user: &str, err: rusqlite::Error) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Error::DuplicateUser(user.to_string())
        }
        e => e.into(),
    }
}

impl CredentialStore for SqliteStore {
    fn lookup(&self, user: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT passwd FROM users WHERE user = ?1")?;
        let passwd = stmt
            .query_row([user], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(passwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Checker, PasswordEncoder, seed_demo_users};

    #[test]
    fn test_lookup_present_and_absent() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert("daffy", "encoded").unwrap();
        assert_eq!(store.lookup("daffy").unwrap().as_deref(), Some("encoded"));
        assert_eq!(store.lookup("tweety").unwrap(), None);
        // Exact match only
        assert_eq!(store.lookup("Daffy").unwrap(), None);
        assert_eq!(store.lookup("daff").unwrap(), None);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert("daffy", "first").unwrap();
        assert!(matches!(
            store.insert("daffy", "second"),
            Err(Error::DuplicateUser(u)) if u == "daffy"
        ));
        assert_eq!(store.lookup("daffy").unwrap().as_deref(), Some("first"));
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[test]
    fn test_open_missing_file() {
        let result = SqliteStore::open(Path::new("/nonexistent/dir/passwords.db"));
        assert!(matches!(result, Err(Error::StoreNotFound(_))));
    }

    #[test]
    fn test_other_constraint_is_not_a_duplicate() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER no_tweety BEFORE INSERT ON users WHEN NEW.user = 'tweety' \
                 BEGIN SELECT RAISE(ABORT, 'tweety is not welcome'); END;",
            )
            .unwrap();
        assert!(matches!(
            store.insert("tweety", "encoded"),
            Err(Error::Database(_))
        ));
        assert_eq!(store.user_count().unwrap(), 0);

        let not_null = rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_CONSTRAINT_NOTNULL),
            None,
        );
        assert!(matches!(insert_error("daffy", not_null), Error::Database(_)));

        let primary_key = rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_CONSTRAINT_PRIMARYKEY),
            None,
        );
        assert!(matches!(
            insert_error("daffy", primary_key),
            Error::DuplicateUser(u) if u == "daffy"
        ));
    }

    #[test]
    fn test_file_without_users_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passwords.db");
        std::fs::write(&path, b"").unwrap();

        let checker = Checker::new(SqliteStore::open(&path).unwrap(), PasswordEncoder::default());
        assert!(matches!(
            checker.verify("daffy", "rabbit season"),
            Err(Error::Database(_))
        ));
        assert!(matches!(checker.lookup("tweety"), Err(Error::Database(_))));
    }

    #[test]
    fn test_seeded_store_verifies() {
        let store = SqliteStore::in_memory().unwrap();
        let encoder = PasswordEncoder::default();
        assert_eq!(seed_demo_users(&store, &encoder).unwrap(), 1);

        let checker = Checker::new(store, encoder);
        assert!(checker.verify("daffy", "rabbit season").unwrap());
        assert!(!checker.verify("daffy", "duck season").unwrap());
        assert!(!checker.verify("tweety", "puddy tat").unwrap());
    }
}
