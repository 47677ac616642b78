use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::config::Config;
use crate::error::{Result, TrackitError};
use crate::models::Category;

pub const DB_FILE_NAME: &str = "trackit.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    currency TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS currencies (
    id INTEGER PRIMARY KEY,
    symbol TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS rates (
    id INTEGER PRIMARY KEY,
    from_symbol TEXT NOT NULL,
    month TEXT NOT NULL,
    rate TEXT NOT NULL,
    UNIQUE (from_symbol, month),
    FOREIGN KEY (from_symbol) REFERENCES currencies(symbol) ON DELETE CASCADE ON UPDATE CASCADE
);

CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    hash TEXT NOT NULL,
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    category_id INTEGER,
    file_id INTEGER,
    date TEXT NOT NULL,
    amount REAL NOT NULL,
    counter_party TEXT NOT NULL,
    ignore_when_summing INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (file_id) REFERENCES files(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_file ON transactions(file_id);
CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Registers every configured account and category that is not in the ledger
/// yet. Existing rows are left alone.
pub fn sync_config(conn: &Connection, config: &Config) -> Result<()> {
    for account in &config.accounts {
        conn.execute(
            "INSERT OR IGNORE INTO accounts (name, currency) VALUES (?1, ?2)",
            rusqlite::params![account.key, account.currency],
        )?;
    }
    ensure_categories(conn, &config.categories.names())?;
    Ok(())
}

pub fn ensure_categories(conn: &Connection, names: &[&str]) -> Result<()> {
    let mut stmt = conn.prepare_cached("INSERT OR IGNORE INTO categories (name) VALUES (?1)")?;
    for name in names {
        stmt.execute([name])?;
    }
    Ok(())
}

pub fn account_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row("SELECT id FROM accounts WHERE name = ?1", [name], |r| r.get(0))
        .optional()?;
    Ok(id)
}

/// Looks the account up by name, creating it with `currency` when absent.
/// Returns the id and whether it was created.
pub fn ensure_account(conn: &Connection, name: &str, currency: &str) -> Result<(i64, bool)> {
    if let Some(id) = account_id(conn, name)? {
        return Ok((id, false));
    }
    conn.execute(
        "INSERT INTO accounts (name, currency) VALUES (?1, ?2)",
        rusqlite::params![name, currency],
    )?;
    Ok((conn.last_insert_rowid(), true))
}

pub fn category_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row("SELECT id FROM categories WHERE name = ?1", [name], |r| r.get(0))
        .optional()?;
    Ok(id)
}

pub fn ensure_category(conn: &Connection, name: &str) -> Result<i64> {
    if let Some(id) = category_id(conn, name)? {
        return Ok(id);
    }
    conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn create_category(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TrackitError::Other("category name must not be empty".to_string()));
    }
    if category_id(conn, name)?.is_some() {
        return Err(TrackitError::Other(format!("category '{name}' already exists")));
    }
    conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn rename_category(conn: &Connection, id: i64, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TrackitError::Other("category name must not be empty".to_string()));
    }
    let n = conn.execute("UPDATE categories SET name = ?1 WHERE id = ?2", rusqlite::params![name, id])?;
    if n == 0 {
        return Err(TrackitError::Other(format!("category {id} not found")));
    }
    Ok(())
}

/// Deletes a category. Its transactions become uncategorized.
pub fn delete_category(conn: &mut Connection, id: i64) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("UPDATE transactions SET category_id = NULL WHERE category_id = ?1", [id])?;
    if tx.execute("DELETE FROM categories WHERE id = ?1", [id])? == 0 {
        return Err(TrackitError::Other(format!("category {id} not found")));
    }
    tx.commit()?;
    Ok(())
}
