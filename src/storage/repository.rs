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


//! Generic row repository
//!
//! Table-agnostic CRUD primitives. Every function takes a [`Table`] from the
//! allow-list and validates column names against it; values are always bound
//! as positional parameters.
//!
//! # Query Patterns
//! - `*_statement` functions build the SQL and are pure
//! - the async functions run those statements through any [`StatementRunner`],
//!   so the same code works on the pool or inside a [`UnitOfWork`](crate::storage::UnitOfWork)
//! - writes use `RETURNING *` so callers see the stored rows

use crate::error::{Result, StoreError};
use crate::storage::executor::StatementRunner;
use crate::storage::models::{InsertOutcome, Row, RowSet};
use crate::storage::sql::{OrderBy, SqlValue, Statement, Table};
use tracing::debug;

// ============================================================================
// STATEMENT BUILDERS
// ============================================================================

/// `SELECT * FROM table [ORDER BY ...]`
///
/// Every ORDER BY column must belong to `table`.
pub fn select_all_statement(table: Table, order_by: Option<&OrderBy>) -> Result<Statement> {
    if let Some(foreign) = order_by
        .into_iter()
        .flat_map(OrderBy::terms)
        .find(|term| term.column.table() != table)
    {
        return Err(StoreError::invalid_input(format!(
            "Cannot order '{}' by '{}'",
            table.name(),
            foreign.column
        )));
    }

    let order = order_by.map(OrderBy::to_clause).unwrap_or_default();
    Ok(Statement::new(format!("SELECT * FROM {}{}", table.name(), order)))
}

/// `SELECT * FROM table WHERE c1 = ?1 AND c2 = ?2`
pub fn select_where_statement(table: Table, clause: &[(&str, SqlValue)]) -> Result<Statement> {
    if clause.is_empty() {
        return Err(StoreError::invalid_input("A WHERE clause needs at least one column"));
    }

    let mut stmt = Statement::new(format!("SELECT * FROM {} WHERE ", table.name()));
    let mut conditions = Vec::with_capacity(clause.len());
    for (column, value) in clause {
        let column = table.column(column)?;
        let placeholder = stmt.push_param(value.clone());
        conditions.push(format!("{} = {}", column.name(), placeholder));
    }
    stmt.push_sql(&conditions.join(" AND "));
    Ok(stmt)
}

pub fn count_statement(table: Table) -> Statement {
    Statement::new(format!("SELECT COUNT(*) AS count FROM {}", table.name()))
}

/// `INSERT INTO table (c1, c2) VALUES (?1, ?2) RETURNING *`
pub fn insert_statement(table: Table, columns: &[&str], values: Vec<SqlValue>) -> Result<Statement> {
    check_columns(table, columns, &values)?;

    let mut stmt = Statement::new(String::new());
    let placeholders: Vec<String> = values.into_iter().map(|v| stmt.push_param(v)).collect();
    stmt.push_sql(&format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        table.name(),
        columns.join(", "),
        placeholders.join(", ")
    ));
    Ok(stmt)
}

/// `UPDATE table SET c1 = ?1, c2 = ?2 WHERE key = ?3 RETURNING *`
///
/// The key is always the last parameter.
pub fn update_statement(
    table: Table,
    key_column: &str,
    key: SqlValue,
    columns: &[&str],
    values: Vec<SqlValue>,
) -> Result<Statement> {
    check_columns(table, columns, &values)?;
    let key_column = table.column(key_column)?;

    let mut stmt = Statement::new(String::new());
    let assignments: Vec<String> = columns
        .iter()
        .zip(values)
        .map(|(column, value)| format!("{} = {}", column, stmt.push_param(value)))
        .collect();
    let key_placeholder = stmt.push_param(key);

    stmt.push_sql(&format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING *",
        table.name(),
        assignments.join(", "),
        key_column.name(),
        key_placeholder
    ));
    Ok(stmt)
}

/// `DELETE FROM table WHERE key = ?1 RETURNING *`
pub fn delete_statement(table: Table, key_column: &str, key: SqlValue) -> Result<Statement> {
    let key_column = table.column(key_column)?;
    let mut stmt = Statement::new(String::new());
    let placeholder = stmt.push_param(key);
    stmt.push_sql(&format!(
        "DELETE FROM {} WHERE {} = {} RETURNING *",
        table.name(),
        key_column.name(),
        placeholder
    ));
    Ok(stmt)
}

fn check_columns(table: Table, columns: &[&str], values: &[SqlValue]) -> Result<()> {
    if columns.is_empty() {
        return Err(StoreError::invalid_input("At least one column is required"));
    }
    if columns.len() != values.len() {
        return Err(StoreError::invalid_input(format!(
            "{} columns but {} values for table '{}'",
            columns.len(),
            values.len(),
            table.name()
        )));
    }
    for column in columns {
        table.column(column)?;
    }
    Ok(())
}

// ============================================================================
// OPERATIONS
// ============================================================================

/// Read every row of a table, optionally ordered
pub async fn read_all<R: StatementRunner>(
    runner: &R,
    table: Table,
    order_by: Option<&OrderBy>,
) -> Result<Vec<Row>> {
    let set = runner.run(&select_all_statement(table, order_by)?).await?;
    Ok(set.rows)
}

/// Read the row whose `key_column` equals `key`
pub async fn read_one_by_key<R, V>(
    runner: &R,
    table: Table,
    key_column: &str,
    key: V,
) -> Result<Option<Row>>
where
    R: StatementRunner,
    V: Into<SqlValue>,
{
    let stmt = select_where_statement(table, &[(key_column, key.into())])?;
    Ok(runner.run(&stmt).await?.into_first())
}

/// Read rows matching every `(column, value)` equality
pub async fn read_where<R: StatementRunner>(
    runner: &R,
    table: Table,
    clause: &[(&str, SqlValue)],
) -> Result<Vec<Row>> {
    let stmt = select_where_statement(table, clause)?;
    Ok(runner.run(&stmt).await?.rows)
}

pub async fn count_rows<R: StatementRunner>(runner: &R, table: Table) -> Result<u64> {
    let set = runner.run(&count_statement(table)).await?;
    let count = set
        .first()
        .and_then(|row| row.get_i64("count"))
        .ok_or_else(|| StoreError::fatal("Could not count rows"))?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Fail with `CapacityExceeded` when `table` already holds its ceiling
pub async fn ensure_capacity<R: StatementRunner>(runner: &R, table: Table, adding: u64) -> Result<()> {
    let ceiling = runner.limits().ceiling_for(table);
    let current = count_rows(runner, table).await?;
    if current + adding > ceiling {
        debug!(table = table.name(), current, ceiling, "table at capacity");
        return Err(StoreError::CapacityExceeded {
            table: table.name().to_string(),
            ceiling,
        });
    }
    Ok(())
}

/// Insert one row after checking the table's ceiling
pub async fn insert<R: StatementRunner>(
    runner: &R,
    table: Table,
    columns: &[&str],
    values: Vec<SqlValue>,
) -> Result<InsertOutcome> {
    let stmt = insert_statement(table, columns, values)?;
    ensure_capacity(runner, table, 1).await?;

    let row = runner
        .run(&stmt)
        .await?
        .into_first()
        .ok_or_else(|| StoreError::fatal("Insert returned no row"))?;
    let id = row.get_i64(table.key_column());
    Ok(InsertOutcome { row, id })
}

/// Replace the given columns of the row whose `key_column` equals `key`
pub async fn update_by_key<R, V>(
    runner: &R,
    table: Table,
    key_column: &str,
    key: V,
    columns: &[&str],
    values: Vec<SqlValue>,
) -> Result<RowSet>
where
    R: StatementRunner,
    V: Into<SqlValue>,
{
    let stmt = update_statement(table, key_column, key.into(), columns, values)?;
    runner.run(&stmt).await
}

/// Delete the rows whose `key_column` equals `key`; the deleted rows are returned
pub async fn delete_by_key<R, V>(runner: &R, table: Table, key_column: &str, key: V) -> Result<RowSet>
where
    R: StatementRunner,
    V: Into<SqlValue>,
{
    let stmt = delete_statement(table, key_column, key.into())?;
    runner.run(&stmt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableLimits;
    use crate::storage::database::Database;

    fn values(n: usize) -> Vec<SqlValue> {
        (0..n as i64).map(SqlValue::Integer).collect()
    }

    #[test]
    fn test_insert_binds_one_param_per_column() {
        let columns = ["book", "isbn", "price", "pages", "stock_count", "language_id"];
        for n in 1..=columns.len() {
            let stmt = insert_statement(Table::Books, &columns[..n], values(n)).unwrap();
            assert_eq!(stmt.param_count(), n);
            let placeholders: Vec<String> = (1..=n).map(|i| format!("?{}", i)).collect();
            assert!(stmt.sql().contains(&format!(
                "({}) VALUES ({})",
                columns[..n].join(", "),
                placeholders.join(", ")
            )));
        }
    }

    #[test]
    fn test_insert_rejects_misaligned_lists() {
        assert!(insert_statement(Table::Authors, &["author"], values(2)).is_err());
        assert!(insert_statement(Table::Authors, &[], vec![]).is_err());
        assert!(insert_statement(Table::Authors, &["nickname"], values(1)).is_err());
    }

    #[test]
    fn test_update_binds_key_last() {
        for n in 1..=3 {
            let columns = &["book", "isbn", "pages"][..n];
            let stmt = update_statement(
                Table::Books,
                "book_id",
                SqlValue::Integer(99),
                columns,
                values(n),
            )
            .unwrap();

            assert_eq!(stmt.param_count(), n + 1);
            assert_eq!(stmt.params().last(), Some(&SqlValue::Integer(99)));
            assert!(stmt.sql().contains(&format!("WHERE book_id = ?{}", n + 1)));
        }
    }

    #[test]
    fn test_select_all_with_order() {
        let order = OrderBy::parse("author ASC", Table::Authors).unwrap();
        let stmt = select_all_statement(Table::Authors, Some(&order)).unwrap();
        assert_eq!(stmt.sql(), "SELECT * FROM authors ORDER BY authors.author ASC");
        assert_eq!(stmt.param_count(), 0);
    }

    #[tokio::test]
    async fn test_read_all_rejects_column_of_other_table() {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        let order = OrderBy::parse("books.book", Table::Authors).unwrap();

        let err = read_all(&db, Table::Authors, Some(&order)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let db = Database::new_in_memory().await.expect("Failed to create database");

        let outcome = insert(&db, Table::Genres, &["genre"], vec!["Fantasy".into()])
            .await
            .expect("Failed to insert");
        let id = outcome.id.expect("integer key");
        assert_eq!(outcome.row.get_str("genre"), Some("Fantasy"));

        let found = read_one_by_key(&db, Table::Genres, "genre_id", id)
            .await
            .expect("Failed to read")
            .expect("row exists");
        assert_eq!(found.get_str("genre"), Some("Fantasy"));

        let updated = update_by_key(&db, Table::Genres, "genre_id", id, &["genre"], vec!["Epic Fantasy".into()])
            .await
            .expect("Failed to update");
        assert_eq!(updated.first().and_then(|r| r.get_str("genre")), Some("Epic Fantasy"));

        let deleted = delete_by_key(&db, Table::Genres, "genre_id", id)
            .await
            .expect("Failed to delete");
        assert_eq!(deleted.rows.len(), 1);

        let missing = read_one_by_key(&db, Table::Genres, "genre_id", id)
            .await
            .expect("Failed to read");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_read_all_ordered_and_where() {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        for name in ["Zulu", "Alpha", "Mike"] {
            insert(&db, Table::Languages, &["language"], vec![name.into()])
                .await
                .expect("Failed to insert");
        }

        let order = OrderBy::parse("language DESC", Table::Languages).unwrap();
        let rows = read_all(&db, Table::Languages, Some(&order)).await.unwrap();
        let names: Vec<&str> = rows.iter().filter_map(|r| r.get_str("language")).collect();
        assert_eq!(names, vec!["Zulu", "Mike", "Alpha"]);

        let rows = read_where(&db, Table::Languages, &[("language", "Mike".into())])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_at_ceiling_is_rejected() {
        let db = Database::new_in_memory()
            .await
            .expect("Failed to create database")
            .with_limits(TableLimits {
                primary: 10,
                auxiliary: 2,
            });

        insert(&db, Table::Authors, &["author"], vec!["A".into()]).await.unwrap();
        insert(&db, Table::Authors, &["author"], vec!["B".into()]).await.unwrap();

        let err = insert(&db, Table::Authors, &["author"], vec!["C".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded { ceiling: 2, .. }));
        assert_eq!(count_rows(&db, Table::Authors).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_unique_conflict() {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        insert(&db, Table::Authors, &["author"], vec!["W. Chan Kim".into()])
            .await
            .unwrap();

        let err = insert(&db, Table::Authors, &["author"], vec!["W. Chan Kim".into()])
            .await
            .unwrap_err();
        match err {
            StoreError::UniqueConflict { ref columns, .. } => {
                assert_eq!(columns, &vec!["author".to_string()]);
            }
            other => panic!("expected UniqueConflict, got {:?}", other),
        }
        assert_eq!(count_rows(&db, Table::Authors).await.unwrap(), 1);
    }
}
