//! Local SQLite database layer for Gato POS.
//!
//! Uses rusqlite with WAL mode. Storage is document-shaped: orders keep
//! their line items as a JSON column, and each monthly aggregate is a single
//! JSON document in its own row. Provides schema migrations, settings
//! helpers, and shared connection state for the command layer.

use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::error::{PosError, PosResult};

/// Shared state holding the database connection.
pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

impl DbState {
    /// Lock the connection, converting a poisoned lock into a persistence error.
    pub fn lock(&self) -> PosResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PosError::persistence(format!("database lock: {e}")))
    }
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Initialize the database at `{data_dir}/gato-pos.db`.
///
/// Creates the directory if needed, opens the connection, sets pragmas,
/// and runs any pending migrations. On corruption or open failure,
/// deletes the file and retries once.
pub fn init(data_dir: &Path) -> PosResult<DbState> {
    fs::create_dir_all(data_dir)
        .map_err(|e| PosError::persistence(format!("Failed to create data dir: {e}")))?;

    let db_path = data_dir.join("gato-pos.db");
    info!("Opening database at {}", db_path.display());

    let conn = match open_and_configure(&db_path) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Database open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                // Also remove WAL/SHM files if present
                let wal = db_path.with_extension("db-wal");
                let shm = db_path.with_extension("db-shm");
                let _ = fs::remove_file(&wal);
                let _ = fs::remove_file(&shm);
            }
            open_and_configure(&db_path).map_err(|e| {
                PosError::persistence(format!("Database open failed after retry: {e}"))
            })?
        }
    };

    run_migrations(&conn)?;

    info!("Database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(DbState {
        conn: Mutex::new(conn),
        db_path,
    })
}

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> PosResult<Connection> {
    let conn =
        Connection::open(path).map_err(|e| PosError::persistence(format!("sqlite open: {e}")))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| PosError::persistence(format!("pragma setup: {e}")))?;

    Ok(conn)
}

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> PosResult<()> {
    // Ensure schema_version table exists first
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| PosError::persistence(format!("create schema_version: {e}")))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        info!("Database schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating database from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Migration v1: core tables.
fn migrate_v1(conn: &Connection) -> PosResult<()> {
    conn.execute_batch(
        "
        -- local_settings (category/key/value store: session flags, credentials)
        CREATE TABLE IF NOT EXISTS local_settings (
            id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
            setting_category TEXT NOT NULL,
            setting_key TEXT NOT NULL,
            setting_value TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            UNIQUE(setting_category, setting_key)
        );

        -- orders (line items as a JSON document column)
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            items TEXT NOT NULL DEFAULT '[]',
            total REAL NOT NULL DEFAULT 0,
            payment_method TEXT NOT NULL,
            date TEXT NOT NULL,
            note TEXT,
            created_at TEXT NOT NULL
        );

        -- monthly_aggregates (one JSON document per YYYY-MM)
        CREATE TABLE IF NOT EXISTS monthly_aggregates (
            month TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            last_updated TEXT NOT NULL
        );

        -- Indexes
        CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at);
        CREATE INDEX IF NOT EXISTS idx_orders_date ON orders(date);

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| PosError::persistence(format!("migration v1: {e}")))?;

    Ok(())
}

/// Migration v2: seed the default credential table so the trust boundary is
/// data, not source. Existing entries are never overwritten.
fn migrate_v2(conn: &Connection) -> PosResult<()> {
    conn.execute_batch(
        "
        INSERT OR IGNORE INTO local_settings (setting_category, setting_key, setting_value)
        VALUES ('auth', 'admin', '123456'),
               ('auth', 'manager', '654321');

        INSERT INTO schema_version (version) VALUES (2);
        ",
    )
    .map_err(|e| PosError::persistence(format!("migration v2: {e}")))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Settings helpers
// ---------------------------------------------------------------------------

/// Read a single setting value, or `None` when absent.
pub fn get_setting(conn: &Connection, category: &str, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT setting_value FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
        |row| row.get(0),
    )
    .ok()
}

/// Upsert a setting value.
pub fn set_setting(conn: &Connection, category: &str, key: &str, value: &str) -> PosResult<()> {
    conn.execute(
        "INSERT INTO local_settings (setting_category, setting_key, setting_value, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(setting_category, setting_key) DO UPDATE SET
            setting_value = excluded.setting_value,
            updated_at = excluded.updated_at",
        params![category, key, value],
    )
    .map_err(|e| PosError::persistence(format!("set_setting: {e}")))?;
    Ok(())
}

/// Delete a setting. Silently succeeds when the key does not exist.
pub fn delete_setting(conn: &Connection, category: &str, key: &str) -> PosResult<()> {
    conn.execute(
        "DELETE FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
    )
    .map_err(|e| PosError::persistence(format!("delete_setting: {e}")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// Run migrations on an arbitrary connection (in-memory DBs in tests).
pub fn run_migrations_for_test(conn: &Connection) {
    run_migrations(conn).expect("run_migrations should succeed in test");
}

/// A fully migrated in-memory database for tests.
#[cfg(test)]
pub fn test_db_state() -> DbState {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    run_migrations_for_test(&conn);
    DbState {
        conn: Mutex::new(conn),
        db_path: PathBuf::from(":memory:"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_roundtrip() {
        let db = test_db_state();
        let conn = db.lock().unwrap();

        assert!(get_setting(&conn, "session", "auth_token").is_none());
        set_setting(&conn, "session", "auth_token", "true").unwrap();
        assert_eq!(
            get_setting(&conn, "session", "auth_token").as_deref(),
            Some("true")
        );

        set_setting(&conn, "session", "auth_token", "false").unwrap();
        assert_eq!(
            get_setting(&conn, "session", "auth_token").as_deref(),
            Some("false")
        );

        delete_setting(&conn, "session", "auth_token").unwrap();
        assert!(get_setting(&conn, "session", "auth_token").is_none());
    }

    #[test]
    fn migrations_seed_default_credentials() {
        let db = test_db_state();
        let conn = db.lock().unwrap();

        assert_eq!(
            get_setting(&conn, "auth", "admin").as_deref(),
            Some("123456")
        );
        assert_eq!(
            get_setting(&conn, "auth", "manager").as_deref(),
            Some("654321")
        );
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations_for_test(&conn);
        run_migrations_for_test(&conn);

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn seeded_credentials_are_not_overwritten_on_rerun() {
        let db = test_db_state();
        let conn = db.lock().unwrap();

        set_setting(&conn, "auth", "admin", "999999").unwrap();
        run_migrations_for_test(&conn);
        assert_eq!(
            get_setting(&conn, "auth", "admin").as_deref(),
            Some("999999")
        );
    }
}
