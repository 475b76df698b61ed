//! SQLite persistence for the archive folder handle and the preferred path.
//!
//! Uses sqlx for async database access with Tokio. Both values live in a
//! small key/value table under fixed keys; saving always overwrites.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use gensave_config::AppConfig;
use gensave_core::{AccessProbe, Capability, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use tracing::{info, warn};

pub const ARCHIVE_DIR_KEY: &str = "archive-dir";
pub const PREFERRED_PATH_KEY: &str = "preferred-path";

/// Persisted reference to the folder the user granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirHandle {
    pub path: PathBuf,
    pub granted_at_ms: i64,
}

impl DirHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            granted_at_ms: time_ms(),
        }
    }
}

/// Single-slot store for the archive folder handle.
#[async_trait]
pub trait HandleStore: Send + Sync {
    async fn save(&self, handle: &DirHandle) -> Result<()>;
    async fn get(&self) -> Result<Option<DirHandle>>;
    async fn clear(&self) -> Result<()>;
}

/// Re-checks a stored handle without upgrading it. On anything but a grant
/// the slot is cleared and `None` is returned, so callers fall back to asking
/// again. A folder that vanished is never recreated here.
pub async fn validate(
    store: &dyn HandleStore,
    probe: &dyn AccessProbe,
) -> Result<Option<DirHandle>> {
    let Some(handle) = store.get().await? else {
        return Ok(None);
    };

    let capability = probe.query(&handle.path);

    if capability == Capability::Granted {
        return Ok(Some(handle));
    }

    warn!(path = %handle.path.display(), ?capability, "stored folder no longer accessible");
    store.clear().await?;
    Ok(None)
}

/// Concrete SQLite-backed store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(storage_err)?
            .create_if_missing(true);
        // Every connection to an in-memory database is a separate database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(storage_err)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn from_app_config(config: &AppConfig) -> Result<Self> {
        Self::connect(&config.database_url).await
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at_ms INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO settings (key, value, updated_at_ms) VALUES (?, ?, ?)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                              updated_at_ms = excluded.updated_at_ms"#,
        )
        .bind(key)
        .bind(value)
        .bind(time_ms())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(|row| row.try_get::<String, _>("value"))
            .transpose()
            .map_err(storage_err)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Preferred folder hint, falling back to the configured default.
    pub async fn preferred_path(&self, default: &std::path::Path) -> Result<PathBuf> {
        Ok(self
            .fetch(PREFERRED_PATH_KEY)
            .await?
            .map(PathBuf::from)
            .unwrap_or_else(|| default.to_path_buf()))
    }

    pub async fn set_preferred_path(&self, path: &std::path::Path) -> Result<()> {
        self.put(PREFERRED_PATH_KEY, &path.to_string_lossy()).await
    }
}

#[async_trait]
impl HandleStore for SqliteStore {
    async fn save(&self, handle: &DirHandle) -> Result<()> {
        let encoded = serde_json::to_string(handle)
            .map_err(|err| Error::Storage(format!("encoding handle: {err}")))?;
        self.put(ARCHIVE_DIR_KEY, &encoded).await?;
        info!(path = %handle.path.display(), "saved archive folder");
        Ok(())
    }

    async fn get(&self) -> Result<Option<DirHandle>> {
        let Some(raw) = self.fetch(ARCHIVE_DIR_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(handle) => Ok(Some(handle)),
            Err(err) => {
                warn!("discarding unreadable folder handle: {err}");
                self.remove(ARCHIVE_DIR_KEY).await?;
                Ok(None)
            }
        }
    }

    async fn clear(&self) -> Result<()> {
        self.remove(ARCHIVE_DIR_KEY).await
    }
}

fn storage_err(err: sqlx::Error) -> Error {
    Error::Storage(err.to_string())
}

fn time_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
