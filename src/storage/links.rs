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


//! Book link tables
//!
//! A book's authors and genres live in `books_authors` / `books_genres`.
//! Replacing them is delete-then-insert, run inside the caller's
//! [`UnitOfWork`](crate::storage::UnitOfWork) so the new set commits or rolls
//! back together with the book row it belongs to.

use crate::error::{Result, StoreError};
use crate::storage::database::UnitOfWork;
use crate::storage::executor::StatementRunner;
use crate::storage::sql::{SqlValue, Statement, Table};
use tracing::debug;

/// A many-to-many table between books and one info entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTable {
    BooksAuthors,
    BooksGenres,
}

impl LinkTable {
    pub fn table(self) -> Table {
        match self {
            LinkTable::BooksAuthors => Table::BooksAuthors,
            LinkTable::BooksGenres => Table::BooksGenres,
        }
    }

    /// Column holding the info entity's id
    pub fn info_column(self) -> &'static str {
        match self {
            LinkTable::BooksAuthors => "author_id",
            LinkTable::BooksGenres => "genre_id",
        }
    }

    /// Singular name used in error messages
    pub fn relation(self) -> &'static str {
        match self {
            LinkTable::BooksAuthors => "author",
            LinkTable::BooksGenres => "genre",
        }
    }
}

/// `INSERT INTO link (book_id, info_id) VALUES (?1, ?2), (?1, ?3) ...`
///
/// Repeated ids are linked once.
pub fn insert_links_statement(book_id: i64, link: LinkTable, ids: &[i64]) -> Result<Statement> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Err(StoreError::empty_link_set(link.relation()));
    }

    let mut stmt = Statement::new(String::new());
    let book = stmt.push_param(book_id);
    let rows: Vec<String> = ids
        .iter()
        .map(|id| format!("({}, {})", book, stmt.push_param(SqlValue::Integer(*id))))
        .collect();
    stmt.push_sql(&format!(
        "INSERT INTO {} (book_id, {}) VALUES {}",
        link.table().name(),
        link.info_column(),
        rows.join(", ")
    ));
    Ok(stmt)
}

/// Link a book to every id in `ids`
pub async fn insert_links<R: StatementRunner>(
    runner: &R,
    book_id: i64,
    link: LinkTable,
    ids: &[i64],
) -> Result<u64> {
    let stmt = insert_links_statement(book_id, link, ids)?;
    Ok(runner.run(&stmt).await?.rows_affected)
}

/// Replace a book's links with exactly `ids`
///
/// An empty set is rejected before anything is deleted. On any error the
/// caller's unit of work must be rolled back (or dropped) to restore the old
/// links.
pub async fn replace_links(
    uow: &UnitOfWork,
    book_id: i64,
    link: LinkTable,
    ids: &[i64],
) -> Result<()> {
    let insert = insert_links_statement(book_id, link, ids)?;

    let mut delete = Statement::new(format!("DELETE FROM {} WHERE book_id = ", link.table().name()));
    let placeholder = delete.push_param(book_id);
    delete.push_sql(&placeholder);

    let removed = uow.run(&delete).await?.rows_affected;
    let added = uow.run(&insert).await?.rows_affected;
    debug!(book_id, table = link.table().name(), removed, added, "links replaced");
    Ok(())
}
