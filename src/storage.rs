use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

use crate::error::{ClientError, Result};
use crate::models::User;
use crate::session::AuthSession;

pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const USER_DATA_KEY: &str = "user_data";

/// Key/value storage that survives restarts.
#[allow(async_fn_in_trait)]
pub trait SecureStore {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store, for tests and the demo path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ClientError::Storage("memory store lock poisoned".into()))?;
        Ok(f(&mut entries))
    }
}

impl SecureStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with(|m| m.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with(|m| {
            m.insert(key.to_string(), value.to_string());
        })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.with(|m| {
            m.remove(key);
        })
    }
}

pub type Db = Pool<Sqlite>;

/// SQLite-backed store, one row per key.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Db,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // a single connection keeps `sqlite::memory:` databases alive and shared
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&db).await?;
        tracing::debug!(url, "secure store ready");
        Ok(Self { db })
    }
}

impl SecureStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM secure_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO secure_store (key, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM secure_store WHERE key = ?")
            .bind(key)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

pub async fn persist_session<S: SecureStore>(store: &S, session: &AuthSession) -> Result<()> {
    store.set(AUTH_TOKEN_KEY, &session.token).await?;
    store
        .set(USER_DATA_KEY, &serde_json::to_string(&session.user)?)
        .await
}

/// Reads back a persisted session. Both keys must be present; a user blob
/// that no longer parses is discarded.
pub async fn load_session<S: SecureStore>(store: &S) -> Result<Option<AuthSession>> {
    let (Some(token), Some(user)) = (
        store.get(AUTH_TOKEN_KEY).await?,
        store.get(USER_DATA_KEY).await?,
    ) else {
        return Ok(None);
    };
    match serde_json::from_str::<User>(&user) {
        Ok(user) => Ok(Some(AuthSession { token, user })),
        Err(err) => {
            tracing::warn!(error = %err, "discarding unreadable user data");
            clear_session(store).await?;
            Ok(None)
        }
    }
}

pub async fn clear_session<S: SecureStore>(store: &S) -> Result<()> {
    store.remove(AUTH_TOKEN_KEY).await?;
    store.remove(USER_DATA_KEY).await
}
