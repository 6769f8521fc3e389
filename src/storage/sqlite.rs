//! SQLite-backed substrate. Each write is its own statement, so it is durable
//! by the time the call returns.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use sqlite::{Connection, State};
use std::sync::{Mutex, MutexGuard};

use super::KeyValueStore;

pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the `kv` table exists
    pub fn open(path: &str) -> Result<Self> {
        let connection = sqlite::open(path)?;
        connection.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )",
        )?;
        debug!("Opened key-value store at {path}");
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| anyhow!("SQLite connection mutex poisoned"))
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let connection = self.connection()?;
        let mut statement = connection.prepare("SELECT value FROM kv WHERE key = ?")?;
        statement.bind((1, key))?;

        if let State::Row = statement.next()? {
            Ok(Some(statement.read::<String, _>(0)?))
        } else {
            Ok(None)
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let connection = self.connection()?;
        let mut statement = connection.prepare(
            "INSERT INTO kv (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )?;
        statement.bind((1, key))?;
        statement.bind((2, value))?;
        while statement.next()? != State::Done {}
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let connection = self.connection()?;
        let mut statement = connection.prepare("DELETE FROM kv WHERE key = ?")?;
        statement.bind((1, key))?;
        while statement.next()? != State::Done {}
        Ok(())
    }
}
