use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

pub const TOKEN_KEY: &str = "discord_access_token";
pub const USER_KEY: &str = "discord_user";

/// Durable key-value store backing the persisted session.
#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

/// Both session entries as they were last written together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    pub user_json: String,
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub path: Option<PathBuf>,
}

impl Store {
    pub fn open(opts: Options) -> Result<Self> {
        let path = if let Some(path) = opts.path {
            path
        } else {
            default_path().context("storage: resolve default path")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("storage: create directory {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("storage: open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("storage: set WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .context("storage: set busy timeout")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("storage: open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn close(self) -> Result<()> {
        let conn = Arc::try_unwrap(self.conn)
            .map_err(|_| anyhow!("storage: connection still in use"))?
            .into_inner();
        conn.close()
            .map_err(|(_, err)| err)
            .context("storage: close connection")
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM kv WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("storage: read {key}"))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            bail!("storage: key required");
        }
        let conn = self.conn.lock();
        upsert(&conn, key, value)?;
        Ok(())
    }

    /// Writes the token and the identity snapshot in one transaction.
    pub fn write_session(&self, token: &str, user_json: &str) -> Result<()> {
        if token.is_empty() {
            bail!("storage: session token required");
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("storage: begin session write")?;
        upsert(&tx, TOKEN_KEY, token)?;
        upsert(&tx, USER_KEY, user_json)?;
        tx.commit().context("storage: commit session write")
    }

    /// Returns the session only when both entries exist. A user entry left
    /// without its token is deleted.
    pub fn read_session(&self) -> Result<Option<StoredSession>> {
        let token = self.get(TOKEN_KEY)?;
        let user_json = self.get(USER_KEY)?;
        match (token, user_json) {
            (Some(token), Some(user_json)) if !token.is_empty() => {
                Ok(Some(StoredSession { token, user_json }))
            }
            (None, None) => Ok(None),
            _ => {
                self.clear_session()?;
                Ok(None)
            }
        }
    }

    pub fn clear_session(&self) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("storage: begin session clear")?;
        tx.execute(
            "DELETE FROM kv WHERE key IN (?1, ?2)",
            params![TOKEN_KEY, USER_KEY],
        )
        .context("storage: clear session")?;
        tx.commit().context("storage: commit session clear")
    }
}

fn upsert(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO kv (key, value, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
  value = excluded.value,
  updated_at = excluded.updated_at
"#,
        params![key, value, Utc::now().timestamp()],
    )
    .with_context(|| format!("storage: write {key}"))?;
    Ok(())
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at INTEGER NOT NULL
)
"#,
        [],
    )?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let migrations = migrations();
    for (idx, sql) in migrations.iter().enumerate() {
        let version = (idx + 1) as i64;
        if version <= current {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![
                version,
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or(Duration::from_secs(0))
                    .as_secs() as i64,
            ],
        )?;
    }
    Ok(())
}

fn migrations() -> Vec<&'static str> {
    vec![
        r#"
CREATE TABLE IF NOT EXISTS kv (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);
"#,
    ]
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("blog-feed").join("state.db"))
}
