// SQLite persistence for client-side state.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde_json::Value;

use crate::session::model::MapPool;

const AUTH_TOKEN_KEY: &str = "auth_token";
const PROFILE_KEY: &str = "profile";

/// Default database location under the platform data directory.
pub fn default_db_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "mapban")
        .map(|dirs| dirs.data_dir().join("mapban.db"))
}

/// SQLite-backed persistence for the auth token, the cached user profile
/// and locally owned custom map pools. The veto core never reads this;
/// profiles in particular are stored as opaque JSON.
pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Open (or create) the store at `path` and ensure all tables exist.
    /// Pass `":memory:"` for an ephemeral in-memory store (useful for
    /// tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set store pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS client_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS custom_pools (
                id      INTEGER PRIMARY KEY,
                game_id INTEGER NOT NULL,
                payload TEXT NOT NULL
            );
            ",
        )
        .context("failed to create store schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open the store at its default platform location, creating the data
    /// directory on first use.
    pub fn open_default() -> Result<Self> {
        let path =
            default_db_path().context("no usable data directory for the local store")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let path = path
            .to_str()
            .context("store path is not valid UTF-8")?
            .to_string();
        Self::open(&path)
    }

    /// Acquire the store connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Auth token and profile
    // ------------------------------------------------------------------

    pub fn save_auth_token(&self, token: &str) -> Result<()> {
        self.set_value(AUTH_TOKEN_KEY, &Value::String(token.to_string()))
    }

    pub fn load_auth_token(&self) -> Result<Option<String>> {
        Ok(self
            .get_value(AUTH_TOKEN_KEY)?
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    pub fn clear_auth_token(&self) -> Result<()> {
        self.delete_value(AUTH_TOKEN_KEY)
    }

    /// Persist the signed-in user's profile exactly as the backend sent it.
    pub fn save_profile(&self, profile: &Value) -> Result<()> {
        self.set_value(PROFILE_KEY, profile)
    }

    pub fn load_profile(&self) -> Result<Option<Value>> {
        self.get_value(PROFILE_KEY)
    }

    pub fn clear_profile(&self) -> Result<()> {
        self.delete_value(PROFILE_KEY)
    }

    // ------------------------------------------------------------------
    // Custom map pools
    // ------------------------------------------------------------------

    /// Persist a custom pool under its own id. Uses INSERT OR REPLACE so
    /// re-saving an edited pool overwrites the previous version.
    pub fn save_custom_pool(&self, pool: &MapPool) -> Result<()> {
        let conn = self.conn();
        let payload =
            serde_json::to_string(pool).context("failed to serialize map pool")?;
        conn.execute(
            "INSERT OR REPLACE INTO custom_pools (id, game_id, payload) VALUES (?1, ?2, ?3)",
            params![pool.id, pool.game_id, payload],
        )
        .context("failed to save custom pool")?;
        Ok(())
    }

    /// Load the custom pools stored for one game, ordered by id.
    pub fn custom_pools(&self, game_id: u64) -> Result<Vec<MapPool>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT payload FROM custom_pools WHERE game_id = ?1 ORDER BY id")
            .context("failed to prepare custom pool query")?;

        let payloads = stmt
            .query_map(params![game_id], |row| {
                let payload: String = row.get(0)?;
                Ok(payload)
            })
            .context("failed to query custom pools")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map custom pool rows")?;

        payloads
            .into_iter()
            .map(|payload| {
                serde_json::from_str(&payload).context("failed to deserialize map pool")
            })
            .collect()
    }

    /// Delete a stored pool. Returns whether a row was actually removed.
    pub fn delete_custom_pool(&self, pool_id: u64) -> Result<bool> {
        let conn = self.conn();
        let deleted = conn
            .execute("DELETE FROM custom_pools WHERE id = ?1", params![pool_id])
            .context("failed to delete custom pool")?;
        Ok(deleted > 0)
    }

    // ------------------------------------------------------------------
    // Key-value internals
    // ------------------------------------------------------------------

    fn set_value(&self, key: &str, value: &Value) -> Result<()> {
        let conn = self.conn();
        let json_str =
            serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO client_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .with_context(|| format!("failed to save {key}"))?;
        Ok(())
    }

    fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM client_state WHERE key = ?1")
            .context("failed to prepare state query")?;

        let mut rows = stmt
            .query_map(params![key], |row| {
                let json_str: String = row.get(0)?;
                Ok(json_str)
            })
            .with_context(|| format!("failed to query {key}"))?;

        match rows.next() {
            Some(row_result) => {
                let json_str = row_result.context("failed to read state row")?;
                let value: Value = serde_json::from_str(&json_str)
                    .context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn delete_value(&self, key: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM client_state WHERE key = ?1", params![key])
            .with_context(|| format!("failed to clear {key}"))?;
        Ok(())
    }
}
