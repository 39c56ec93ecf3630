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


//! Query executor
//!
//! Runs a [`Statement`] against a connection, decodes the rows into untyped
//! [`Row`]s, and translates driver failures into [`StoreError`]s.
//!
//! # Error translation
//! This is the only module that inspects driver error codes. The
//! [`CONSTRAINT_CODES`] table maps a driver code to a conflict kind; anything
//! it does not recognise becomes [`StoreError::Fatal`] after the full driver
//! error has been logged. Swapping the storage engine means extending that
//! table and nothing else.

use crate::config::TableLimits;
use crate::error::{Result, StoreError};
use crate::storage::models::{Row, RowSet};
use crate::storage::sql::{SqlValue, Statement};
use futures_util::TryStreamExt;
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Column, Either, Row as _, TypeInfo, ValueRef};
use tracing::{debug, error};

const FATAL_MESSAGE: &str = "Mission failed! Try again later.";
const UNIQUE_FALLBACK_MESSAGE: &str = "This value is already in use";
const REFERENTIAL_MESSAGE: &str =
    "Cannot delete or modify this entry, it is still referenced by other records";

/// Conflict classes a driver error code can map to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
}

/// Driver error code -> conflict kind
pub const CONSTRAINT_CODES: &[(&str, ConstraintKind)] = &[
    // SQLite extended result codes
    ("2067", ConstraintKind::Unique),    // SQLITE_CONSTRAINT_UNIQUE
    ("1555", ConstraintKind::Unique),    // SQLITE_CONSTRAINT_PRIMARYKEY
    ("787", ConstraintKind::ForeignKey), // SQLITE_CONSTRAINT_FOREIGNKEY
    // PostgreSQL SQLSTATE codes
    ("23505", ConstraintKind::Unique),
    ("23503", ConstraintKind::ForeignKey),
];

lazy_static! {
    /// `UNIQUE constraint failed: authors.author` (SQLite)
    static ref SQLITE_UNIQUE_DETAIL: Regex =
        Regex::new(r"constraint failed: ([\w.]+(?:, [\w.]+)*)").expect("valid regex");
    /// `Key (author)=(W. Chan Kim) already exists.` (PostgreSQL)
    static ref PG_UNIQUE_DETAIL: Regex =
        Regex::new(r"Key \((.+?)\)=\((.*)\) already exists").expect("valid regex");
}

/// Anything that can run a statement: the database itself (one transaction
/// per statement) or an open [`UnitOfWork`](crate::storage::UnitOfWork)
#[allow(async_fn_in_trait)]
pub trait StatementRunner {
    /// Run one statement and return its rows
    async fn run(&self, statement: &Statement) -> Result<RowSet>;

    /// Ceilings to enforce before inserts
    fn limits(&self) -> &TableLimits;
}

/// Execute a statement on a connection without classifying failures
///
/// The caller owns the transaction and decides when to classify.
pub(crate) async fn run_on(
    conn: &mut SqliteConnection,
    statement: &Statement,
) -> std::result::Result<RowSet, sqlx::Error> {
    debug!(
        sql = statement.sql(),
        params = statement.param_count(),
        "executing statement"
    );

    let mut stream = statement.to_query().fetch_many(conn);
    let mut set = RowSet::default();

    while let Some(item) = stream.try_next().await? {
        match item {
            Either::Left(result) => set.rows_affected += result.rows_affected(),
            Either::Right(row) => set.rows.push(decode_row(&row)?),
        }
    }

    Ok(set)
}

/// Translate a driver error into a [`StoreError`]
///
/// This is the single point of logging for storage failures.
pub fn classify(err: &sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = err {
        let kind = db_err
            .code()
            .and_then(|code| lookup_code(&code))
            .or_else(|| match db_err.kind() {
                sqlx::error::ErrorKind::UniqueViolation => Some(ConstraintKind::Unique),
                sqlx::error::ErrorKind::ForeignKeyViolation => Some(ConstraintKind::ForeignKey),
                _ => None,
            });

        match kind {
            Some(ConstraintKind::Unique) => {
                let (message, columns) = unique_message(db_err.message());
                debug!(driver_message = db_err.message(), "unique constraint conflict");
                return StoreError::UniqueConflict { message, columns };
            }
            Some(ConstraintKind::ForeignKey) => {
                debug!(driver_message = db_err.message(), "foreign key conflict");
                return StoreError::ReferentialConflict {
                    message: REFERENTIAL_MESSAGE.to_string(),
                };
            }
            None => {}
        }
    }

    error!(error = ?err, "unclassified storage failure");
    StoreError::fatal(FATAL_MESSAGE)
}

fn lookup_code(code: &str) -> Option<ConstraintKind> {
    CONSTRAINT_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, kind)| *kind)
}

/// Build the client-facing message for a unique violation from the driver text
pub(crate) fn unique_message(driver_message: &str) -> (String, Vec<String>) {
    if let Some(caps) = PG_UNIQUE_DETAIL.captures(driver_message) {
        let column = caps[1].to_string();
        return (
            format!("'{}' is already in use", &caps[2]),
            vec![column],
        );
    }

    if let Some(caps) = SQLITE_UNIQUE_DETAIL.captures(driver_message) {
        let columns: Vec<String> = caps[1]
            .split(", ")
            .map(|qualified| {
                qualified
                    .rsplit_once('.')
                    .map_or(qualified, |(_, column)| column)
                    .to_string()
            })
            .collect();
        return (
            format!("This {} is already in use", columns.join(" & ")),
            columns,
        );
    }

    (UNIQUE_FALLBACK_MESSAGE.to_string(), Vec::new())
}

/// Decode a row using each value's storage class
fn decode_row(row: &SqliteRow) -> std::result::Result<Row, sqlx::Error> {
    let mut decoded = Row::new();

    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" => SqlValue::Integer(row.try_get::<i64, _>(index)?),
                "REAL" => SqlValue::Real(row.try_get::<f64, _>(index)?),
                "BLOB" => SqlValue::Blob(row.try_get::<Vec<u8>, _>(index)?),
                _ => SqlValue::Text(row.try_get::<String, _>(index)?),
            }
        };
        decoded.insert(column.name(), value);
    }

    Ok(decoded)
}
