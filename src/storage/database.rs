// Odin Bookstore Inventory - storage core
// Copyright (C) 2025 Odin Bookstore Inventory contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Database connection and transactions
//!
//! This module owns the connection pool and the transaction boundaries.
//!
//! # Lifecycle
//! A [`Database`] is created once at process start and handed to every
//! operation; cloning it is cheap and shares the pool. Each logical operation
//! borrows one connection for the duration of one transaction:
//! - [`Database::run_transaction`] wraps a single statement in BEGIN/COMMIT
//! - [`Database::begin`] opens a [`UnitOfWork`] for multi-statement writes
//!
//! On failure the transaction is rolled back (a failed rollback is logged,
//! never raised) and the connection goes back to the pool in every case.
//!
//! # SQLite Configuration
//! - WAL mode for better concurrency
//! - Foreign keys enabled
//! - Normal synchronous mode (balance safety/speed)

use crate::config::{StoreConfig, TableLimits};
use crate::error::{Result, StoreError};
use crate::storage::executor::{self, StatementRunner};
use crate::storage::models::RowSet;
use crate::storage::sql::Statement;
use sqlx::{
    sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    ConnectOptions, Transaction,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Database handle - connection pool plus per-table ceilings
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    path: Option<PathBuf>, // None for in-memory databases
    limits: TableLimits,
}

impl Database {
    /// Open (or create) the database described by `config` and run migrations
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let db = match &config.database_path {
            Some(path) => {
                Self::open_file(
                    path,
                    config.max_connections,
                    Duration::from_secs(config.acquire_timeout_secs),
                )
                .await?
            }
            None => Self::new_in_memory().await?,
        };
        Ok(db.with_limits(config.limits))
    }

    /// Create new database connection with migrations and default limits
    ///
    /// # Arguments
    /// * `database_path` - Path to SQLite database file (will be created if doesn't exist)
    ///
    /// # Errors
    /// Returns error if:
    /// - Parent directory doesn't exist and can't be created
    /// - Database file can't be opened
    /// - Migrations fail
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let defaults = StoreConfig::default();
        Self::open_file(
            database_path.as_ref(),
            defaults.max_connections,
            Duration::from_secs(defaults.acquire_timeout_secs),
        )
        .await
    }

    async fn open_file(path: &Path, max_connections: u32, acquire_timeout: Duration) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::FileIoError(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let connection_string = format!("sqlite://{}?mode=rwc", path.display());
        let connect_opts = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30))
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(connect_opts)
            .await?;

        let db = Self {
            pool,
            path: Some(path.to_path_buf()),
            limits: TableLimits::default(),
        };
        db.migrate().await?;

        info!(path = %path.display(), "database ready");
        Ok(db)
    }

    /// Create in-memory database for testing
    ///
    /// # Errors
    /// Returns error if database creation or migration fails
    pub async fn new_in_memory() -> Result<Self> {
        let connect_opts = SqliteConnectOptions::from_str("sqlite::memory:")?
            .foreign_keys(true)
            .disable_statement_logging();

        // One connection that never expires: the data lives in it
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_opts)
            .await?;

        let db = Self {
            pool,
            path: None,
            limits: TableLimits::default(),
        };
        db.migrate().await?;

        Ok(db)
    }

    /// Replace the per-table row ceilings
    pub fn with_limits(mut self, limits: TableLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        crate::storage::migrations::run_migrations(&self.pool).await
    }

    /// Get reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get database file path
    ///
    /// Returns `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn limits(&self) -> &TableLimits {
        &self.limits
    }

    /// Run one statement in its own transaction
    ///
    /// BEGIN, execute, COMMIT. On failure the transaction is rolled back and
    /// the error is classified; the pooled connection is released either way.
    pub async fn run_transaction(&self, statement: &Statement) -> Result<RowSet> {
        let mut tx = self.pool.begin().await?;

        match executor::run_on(&mut tx, statement).await {
            Ok(set) => {
                tx.commit().await?;
                Ok(set)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(executor::classify(&err))
            }
        }
    }

    /// Open a unit of work spanning several statements
    pub async fn begin(&self) -> Result<UnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(UnitOfWork {
            tx: Mutex::new(Some(tx)),
            limits: self.limits,
        })
    }

    /// Close database and release all connections
    pub async fn close(self) {
        self.pool.close().await;
    }
}

impl StatementRunner for Database {
    async fn run(&self, statement: &Statement) -> Result<RowSet> {
        self.run_transaction(statement).await
    }

    fn limits(&self) -> &TableLimits {
        &self.limits
    }
}

/// An open transaction holding one pooled connection
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] rolls it
/// back and returns the connection to the pool.
pub struct UnitOfWork {
    tx: Mutex<Option<Transaction<'static, Sqlite>>>,
    limits: TableLimits,
}

impl UnitOfWork {
    pub async fn commit(self) -> Result<()> {
        match self.tx.into_inner() {
            Some(tx) => {
                tx.commit().await?;
                Ok(())
            }
            None => Err(StoreError::fatal("Unit of work already finished")),
        }
    }

    pub async fn rollback(self) -> Result<()> {
        if let Some(tx) = self.tx.into_inner() {
            if let Err(err) = tx.rollback().await {
                warn!(error = %err, "rollback failed");
            }
        }
        Ok(())
    }
}

impl StatementRunner for UnitOfWork {
    async fn run(&self, statement: &Statement) -> Result<RowSet> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| StoreError::fatal("Unit of work already finished"))?;

        executor::run_on(tx, statement)
            .await
            .map_err(|err| executor::classify(&err))
    }

    fn limits(&self) -> &TableLimits {
        &self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sql::SqlValue;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new_in_memory().await.expect("Failed to create in-memory database");

        let result: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(db.pool())
            .await
            .expect("Failed to query database");

        assert_eq!(result, 1);
    }

    #[tokio::test]
    async fn test_file_database_creates_parent_directory() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("inventory.db");

        let db = Database::new(&path).await.expect("Failed to create database");
        assert_eq!(db.path(), Some(path.as_path()));
        assert!(path.exists());
        db.close().await;
    }

    #[tokio::test]
    async fn test_failed_statement_rolls_back() {
        let db = Database::new_in_memory().await.expect("Failed to create database");

        let mut insert = Statement::new("INSERT INTO authors (author) VALUES (");
        let p = insert.push_param("Dup");
        insert.push_sql(&format!("{}), ({})", p, p));

        let err = db.run_transaction(&insert).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueConflict { .. }));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
            .fetch_one(db.pool())
            .await
            .expect("Failed to count");
        assert_eq!(count, 0, "Partial insert should have been rolled back");
    }

    #[tokio::test]
    async fn test_unit_of_work_dropped_without_commit_rolls_back() {
        let db = Database::new_in_memory().await.expect("Failed to create database");

        {
            let uow = db.begin().await.expect("Failed to begin");
            let mut stmt = Statement::new("INSERT INTO genres (genre) VALUES (");
            let p = stmt.push_param(SqlValue::from("Poetry"));
            stmt.push_sql(&format!("{})", p));
            uow.run(&stmt).await.expect("Failed to insert");
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genres")
            .fetch_one(db.pool())
            .await
            .expect("Failed to count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_unit_of_work_commit_persists() {
        let db = Database::new_in_memory().await.expect("Failed to create database");

        let uow = db.begin().await.expect("Failed to begin");
        let mut stmt = Statement::new("INSERT INTO genres (genre) VALUES (");
        let p = stmt.push_param("Poetry");
        stmt.push_sql(&format!("{})", p));
        let set = uow.run(&stmt).await.expect("Failed to insert");
        assert_eq!(set.rows_affected, 1);
        uow.commit().await.expect("Failed to commit");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genres")
            .fetch_one(db.pool())
            .await
            .expect("Failed to count");
        assert_eq!(count, 1);
    }
}
