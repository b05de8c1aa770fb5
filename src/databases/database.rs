
use rusqlite::{params, Connection};
use tokio::sync::Mutex;
use strum_macros::EnumIter;

use std::sync::Arc;
use std::fmt;

use crate::utility::error::Result;


#[derive(EnumIter, Clone, Copy)]
pub enum DB {
    Config,
    Users,
    Tickets,
    Deferred,
    Warnings,
    Mutes,
    Notes,
}

impl fmt::Display for DB {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DB::Config => write!(f, "config"),
            DB::Users => write!(f, "users"),
            DB::Tickets => write!(f, "tickets"),
            DB::Deferred => write!(f, "deferred"),
            DB::Warnings => write!(f, "warnings"),
            DB::Mutes => write!(f, "mutes"),
            DB::Notes => write!(f, "notes"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DBEntry {
    pub id: i64,
    pub key: String,
    pub value: String,
    pub timestamp: i64,
}

impl fmt::Display for DBEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// One sqlite file per logical table, rows are (id, key, value, timestamp).
/// Structured records serialize their fields into `value`, see the wrappers.
/// The connection mutex is what gives per-key read-modify-write atomicity.
#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
    pub identifier: DB,
}

impl Database {

    pub fn new(identifier: DB) -> Self {
        let path = format!("src/databases/{}.db", identifier.to_string());
        let connection = Connection::open(path).expect("Failed to open database");
        connection.execute(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id        INTEGER PRIMARY KEY,
                key       TEXT    NOT NULL,
                value     TEXT    NOT NULL,
                timestamp INTEGER
            )", identifier.to_string()),
            [],
        ).expect("Failed to create table");
        Database { connection: Arc::new(Mutex::new(connection)), identifier: identifier }
    }

    pub async fn query(&self, key: &str, query_string: &str) -> Result<Vec<DBEntry>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(&format!(
            "SELECT id, key, value, timestamp FROM {} WHERE key = ? {}",
            self.identifier.to_string(),
            query_string
        ))?;
        let entry_iter = statement.query_map([key], |entry| {
            Ok(DBEntry {
                id: entry.get(0)?,
                key: entry.get(1)?,
                value: entry.get(2)?,
                timestamp: entry.get(3)?,
            })
        })?;
        let mut entries = Vec::new();
        for entry in entry_iter {
            entries.push(entry?);
        }
        Ok(entries)
    }

    /// All entries whose key starts with `prefix`, oldest first. Composite
    /// keys are "<guild>" or "<guild>:<user>", so this is the per-guild scan.
    pub async fn query_prefix(&self, prefix: &str) -> Result<Vec<DBEntry>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(&format!(
            "SELECT id, key, value, timestamp FROM {} WHERE key LIKE ? ORDER BY id ASC",
            self.identifier.to_string()
        ))?;
        let pattern = format!("{}%", prefix);
        let entry_iter = statement.query_map([pattern], |entry| {
            Ok(DBEntry {
                id: entry.get(0)?,
                key: entry.get(1)?,
                value: entry.get(2)?,
                timestamp: entry.get(3)?,
            })
        })?;
        let mut entries = Vec::new();
        for entry in entry_iter {
            entries.push(entry?);
        }
        Ok(entries)
    }

    pub async fn get(&self, key: &str) -> Result<Option<DBEntry>> {
        Ok(self.query(key, "ORDER BY id DESC LIMIT 1").await?.pop())
    }

    pub async fn get_all(&self, key: &str) -> Result<Vec<DBEntry>> {
        self.query(key, "ORDER BY id ASC").await
    }

    pub async fn get_last(&self, key: &str, limit: u8) -> Result<Vec<DBEntry>> {
        self.query(key, &format!("ORDER BY id DESC LIMIT {}", limit)).await
    }

    /// Replaces whatever is stored under `key` with a single row.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let connection = self.connection.lock().await;
        connection.execute(
            &format!("DELETE FROM {} WHERE key = ?", self.identifier.to_string()),
            params![key],
        )?;
        connection.execute(
            &format!("INSERT INTO {} (key, value, timestamp) VALUES (?, ?, ?)", self.identifier.to_string()),
            params![key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    pub async fn append(&self, key: &str, value: &str) -> Result<()> {
        let connection = self.connection.lock().await;
        connection.execute(
            &format!("INSERT INTO {} (key, value, timestamp) VALUES (?, ?, ?)", self.identifier.to_string()),
            params![key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let connection = self.connection.lock().await;
        connection.execute(
            &format!("DELETE FROM {} WHERE key = ?", self.identifier.to_string()),
            params![key],
        )?;
        Ok(())
    }

    pub async fn delete_by_id(&self, id: i64) -> Result<()> {
        let connection = self.connection.lock().await;
        connection.execute(
            &format!("DELETE FROM {} WHERE id = ?", self.identifier.to_string()),
            params![id],
        )?;
        Ok(())
    }

}
