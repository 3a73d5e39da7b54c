//! SQLite-backed follow graph (persistence across restarts).

use async_trait::async_trait;
use social_types::{
    FollowEdge, GraphSnapshot, GraphStore, GraphStoreError, WeightChange, WeightFn,
};
use std::collections::HashSet;
use std::path::Path;

/// SQLite-backed graph store for persistence.
pub struct SqliteGraphStore {
    conn: std::sync::Mutex<rusqlite::Connection>,
}

fn map_err(e: rusqlite::Error) -> GraphStoreError {
    match e {
        rusqlite::Error::SqliteFailure(ref code, _)
            if matches!(
                code.code,
                rusqlite::ErrorCode::CannotOpen
                    | rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::SystemIoFailure
            ) =>
        {
            GraphStoreError::Unavailable(e.to_string())
        }
        other => GraphStoreError::Query(other.to_string()),
    }
}

impl SqliteGraphStore {
    /// Open (or create) a SQLite graph store at the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, GraphStoreError> {
        let conn = rusqlite::Connection::open(path).map_err(map_err)?;
        Self::init(conn)
    }

    /// In-memory SQLite database (tests).
    pub fn open_in_memory() -> Result<Self, GraphStoreError> {
        let conn = rusqlite::Connection::open_in_memory().map_err(map_err)?;
        Self::init(conn)
    }

    fn init(conn: rusqlite::Connection) -> Result<Self, GraphStoreError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS follows (
                from_user TEXT NOT NULL,
                to_user TEXT NOT NULL,
                weight REAL NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (from_user, to_user),
                FOREIGN KEY (from_user) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (to_user) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_follows_to ON follows(to_user);
            "#,
        )
        .map_err(map_err)?;

        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, GraphStoreError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| GraphStoreError::Other(format!("failed to acquire lock: {}", e)))?;
        f(&conn).map_err(map_err)
    }

    fn insert_user(conn: &rusqlite::Connection, id: &str, now: &str) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT OR IGNORE INTO users (id, created_at) VALUES (?1, ?2)",
            rusqlite::params![id, now],
        )?;
        Ok(())
    }

    fn upsert_edge(
        conn: &rusqlite::Connection,
        from: &str,
        to: &str,
        weight: f64,
        now: &str,
    ) -> Result<(), rusqlite::Error> {
        Self::insert_user(conn, from, now)?;
        Self::insert_user(conn, to, now)?;
        conn.execute(
            "INSERT INTO follows (from_user, to_user, weight, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(from_user, to_user) DO UPDATE SET weight = excluded.weight, updated_at = excluded.updated_at",
            rusqlite::params![from, to, weight, now],
        )?;
        Ok(())
    }

    fn read_weight(conn: &rusqlite::Connection, from: &str, to: &str) -> Result<f64, rusqlite::Error> {
        let result = conn.query_row(
            "SELECT weight FROM follows WHERE from_user = ?1 AND to_user = ?2",
            rusqlite::params![from, to],
            |row| row.get::<_, f64>(0),
        );
        match result {
            Ok(w) => Ok(w),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0.0),
            Err(e) => Err(e),
        }
    }

    fn read_ids(
        conn: &rusqlite::Connection,
        sql: &str,
        user: &str,
    ) -> Result<HashSet<String>, rusqlite::Error> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([user], |row| row.get::<_, String>(0))?;
        rows.collect()
    }

    fn read_edges(conn: &rusqlite::Connection) -> Result<Vec<FollowEdge>, rusqlite::Error> {
        let mut stmt = conn.prepare(
            "SELECT from_user, to_user, weight FROM follows ORDER BY from_user, to_user",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FollowEdge {
                from: row.get(0)?,
                to: row.get(1)?,
                weight: row.get(2)?,
            })
        })?;
        rows.collect()
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn add_user(&self, id: &str) -> Result<(), GraphStoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| Self::insert_user(conn, id, &now))
    }

    async fn add_or_update_edge(
        &self,
        from: &str,
        to: &str,
        weight: f64,
    ) -> Result<(), GraphStoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            Self::upsert_edge(&tx, from, to, weight, &now)?;
            tx.commit()
        })
    }

    async fn get_following(&self, user: &str) -> Result<HashSet<String>, GraphStoreError> {
        self.with_conn(|conn| {
            Self::read_ids(conn, "SELECT to_user FROM follows WHERE from_user = ?1", user)
        })
    }

    async fn get_followers(&self, user: &str) -> Result<HashSet<String>, GraphStoreError> {
        self.with_conn(|conn| {
            Self::read_ids(conn, "SELECT from_user FROM follows WHERE to_user = ?1", user)
        })
    }

    async fn get_connection_weight(&self, from: &str, to: &str) -> Result<f64, GraphStoreError> {
        self.with_conn(|conn| Self::read_weight(conn, from, to))
    }

    async fn modify_connection_weight(
        &self,
        from: &str,
        to: &str,
        f: WeightFn<'_>,
    ) -> Result<WeightChange, GraphStoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        // The connection mutex serializes the whole read-modify-write.
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let previous = Self::read_weight(&tx, from, to)?;
            let current = f(previous);
            Self::upsert_edge(&tx, from, to, current, &now)?;
            tx.commit()?;
            Ok(WeightChange { previous, current })
        })
    }

    async fn scale_all_weights(&self, factor: f64) -> Result<usize, GraphStoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE follows SET weight = weight * ?1, updated_at = ?2",
                rusqlite::params![factor, now],
            )
        })
    }

    async fn snapshot(&self) -> Result<GraphSnapshot, GraphStoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let vertices: Vec<String> = {
                let mut stmt = tx.prepare("SELECT id FROM users")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                rows.collect::<Result<_, _>>()?
            };
            let edges = Self::read_edges(&tx)?;
            tx.commit()?;
            Ok(GraphSnapshot::from_parts(vertices, edges))
        })
    }

    async fn is_empty(&self) -> Result<bool, GraphStoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count == 0)
        })
    }

    async fn clear(&self) -> Result<(), GraphStoreError> {
        self.with_conn(|conn| conn.execute_batch("DELETE FROM follows; DELETE FROM users;"))
    }

    async fn export_edges(&self) -> Result<Vec<FollowEdge>, GraphStoreError> {
        self.with_conn(Self::read_edges)
    }
}
