use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use std::path::Path;

#[derive(Debug, Error)]
pub enum DbCreationError {
    #[error("failed to open sqlite db")]
    OpenDb(#[source] rusqlite::Error),
    #[error("failed to get current version")]
    GetVersion(#[source] rusqlite::Error),
    #[error("failed to start transaction")]
    StartTransaction(#[source] rusqlite::Error),
    #[error("failed to commit transaction")]
    CommitTransaction(#[source] rusqlite::Error),
    #[error("failed to create entries table")]
    CreateEntriesTable(#[source] rusqlite::Error),
    #[error("db version {0} is newer than supported")]
    UnsupportedVersion(usize),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read entry {key}")]
    Get {
        key: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to write entry {key}")]
    Set {
        key: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to remove entry {key}")]
    Remove {
        key: String,
        #[source]
        source: rusqlite::Error,
    },
}

/// Durable string key-value storage. Values written with `set` must survive a
/// process restart
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Key-value store backed by a single sqlite table. Every entry belongs to a
/// scope so several consumers can share one file
pub struct SqliteStore {
    connection: Connection,
    scope: String,
}

impl SqliteStore {
    pub fn new(path: &Path, scope: &str) -> Result<SqliteStore, DbCreationError> {
        let mut connection = Connection::open(path).map_err(DbCreationError::OpenDb)?;

        initialize_connection(&mut connection)?;

        Ok(SqliteStore {
            connection,
            scope: scope.to_string(),
        })
    }

    #[cfg(test)]
    pub fn new_in_memory(scope: &str) -> Result<SqliteStore, DbCreationError> {
        let mut connection = Connection::open_in_memory().map_err(DbCreationError::OpenDb)?;

        initialize_connection(&mut connection)?;

        Ok(SqliteStore {
            connection,
            scope: scope.to_string(),
        })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.connection
            .query_row(
                "SELECT value FROM entries WHERE scope = ?1 AND key = ?2",
                params![self.scope, key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|source| StorageError::Get {
                key: key.to_string(),
                source,
            })
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.connection
            .execute(
                "
                INSERT INTO entries(scope, key, value)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(scope, key) DO UPDATE SET value = excluded.value
                ",
                params![self.scope, key, value],
            )
            .map_err(|source| StorageError::Set {
                key: key.to_string(),
                source,
            })?;

        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.connection
            .execute(
                "DELETE FROM entries WHERE scope = ?1 AND key = ?2",
                params![self.scope, key],
            )
            .map_err(|source| StorageError::Remove {
                key: key.to_string(),
                source,
            })?;

        Ok(())
    }
}

fn initialize_v1_db(connection: &mut Connection) -> Result<(), DbCreationError> {
    let transaction = connection
        .transaction()
        .map_err(DbCreationError::StartTransaction)?;

    transaction
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS entries(
                scope TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY(scope, key)
            );
            PRAGMA user_version = 1;
            ",
        )
        .map_err(DbCreationError::CreateEntriesTable)?;

    transaction
        .commit()
        .map_err(DbCreationError::CommitTransaction)?;

    Ok(())
}

fn current_version(connection: &Connection) -> Result<usize, DbCreationError> {
    connection
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(DbCreationError::GetVersion)
}

fn initialize_connection(connection: &mut Connection) -> Result<(), DbCreationError> {
    let upgrade_functions = [initialize_v1_db];

    let version = current_version(connection)?;
    if version > upgrade_functions.len() {
        return Err(DbCreationError::UnsupportedVersion(version));
    }

    for f in upgrade_functions.iter().skip(version) {
        f(connection)?;
    }

    let version = current_version(connection)?;
    assert_eq!(version, upgrade_functions.len());

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut store = SqliteStore::new_in_memory("app").expect("Failed to create db");

        assert_eq!(store.get("app-storage").expect("Failed to get"), None);

        store.set("app-storage", "first").expect("Failed to set");
        assert_eq!(
            store.get("app-storage").expect("Failed to get").as_deref(),
            Some("first")
        );

        store.set("app-storage", "second").expect("Failed to set");
        assert_eq!(
            store.get("app-storage").expect("Failed to get").as_deref(),
            Some("second")
        );

        store.remove("app-storage").expect("Failed to remove");
        assert_eq!(store.get("app-storage").expect("Failed to get"), None);

        // Removing a missing key is not an error
        store.remove("app-storage").expect("Failed to remove");
    }

    #[test]
    fn test_scopes_are_isolated() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("tracker.db");

        let mut first = SqliteStore::new(&path, "first").expect("Failed to create db");
        let mut second = SqliteStore::new(&path, "second").expect("Failed to create db");

        first.set("key", "a").expect("Failed to set");
        second.set("key", "b").expect("Failed to set");

        assert_eq!(first.get("key").expect("Failed to get").as_deref(), Some("a"));
        assert_eq!(second.get("key").expect("Failed to get").as_deref(), Some("b"));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("tracker.db");

        {
            let mut store = SqliteStore::new(&path, "app").expect("Failed to create db");
            store.set("app-storage", "persisted").expect("Failed to set");
        }

        let store = SqliteStore::new(&path, "app").expect("Failed to reopen db");
        assert_eq!(
            store.get("app-storage").expect("Failed to get").as_deref(),
            Some("persisted")
        );
    }

    #[test]
    fn test_rejects_newer_schema() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("tracker.db");

        {
            let connection = Connection::open(&path).expect("Failed to open db");
            connection
                .execute_batch("PRAGMA user_version = 9;")
                .expect("Failed to set version");
        }

        match SqliteStore::new(&path, "app") {
            Err(DbCreationError::UnsupportedVersion(9)) => {}
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("newer schema was accepted"),
        }
    }
}
