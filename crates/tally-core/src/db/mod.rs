//! Local SQLite store with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `recurring` - Saved recurring expenses

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod recurring;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) a database file and run migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        info!("Opened database at {}", db.db_path);
        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because every pooled
    /// connection to `:memory:` would see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "tally_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path.to_string_lossy())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Recurring expenses saved from detection (or edited by the user)
            CREATE TABLE IF NOT EXISTS recurring_expenses (
                id INTEGER PRIMARY KEY,
                merchant TEXT NOT NULL,
                merchant_key TEXT NOT NULL UNIQUE,
                category TEXT NOT NULL,
                frequency TEXT NOT NULL,                   -- weekly, biweekly, monthly, quarterly
                interval_days INTEGER NOT NULL,
                amount REAL NOT NULL,
                currency TEXT NOT NULL,
                next_due DATE NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',     -- active, paused, cancelled
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_recurring_status ON recurring_expenses(status);
            CREATE INDEX IF NOT EXISTS idx_recurring_next_due ON recurring_expenses(next_due);
            "#,
        )?;

        info!("Database migrations complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        let columns: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('recurring_expenses')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(columns, 11);
    }

    #[test]
    fn test_in_memory_dbs_are_isolated() {
        let a = Database::in_memory().unwrap();
        let b = Database::in_memory().unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = Database::in_memory().unwrap();
        let reopened = Database::new(db.path()).unwrap();
        assert_eq!(reopened.path(), db.path());
    }

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("2024-03-01 12:30:00");
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-03-01 12:30");
    }
}
