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


//! Book operations
//!
//! Writes touch the `books` row and both link tables, so each one runs in a
//! single [`UnitOfWork`]: either the book and all of its links change, or
//! nothing does. Dropping the unit of work on an early `?` rolls it back.

use crate::error::{Result, StoreError};
use crate::storage::book_query::{self, query_books, BookQuery};
use crate::storage::catalog::InfoKind;
use crate::storage::database::{Database, UnitOfWork};
use crate::storage::executor::StatementRunner;
use crate::storage::links::{self, LinkTable};
use crate::storage::models::{Book, NewBook};
use crate::storage::repository;
use crate::storage::sql::{Column, Table};
use tracing::info;

/// Create a book with its author and genre links
pub async fn create_book(db: &Database, new_book: &NewBook) -> Result<Book> {
    let (author_ids, genre_ids) = checked_links(new_book)?;

    let uow = db.begin().await?;
    let (columns, values) = new_book.book_columns();
    let outcome = repository::insert(&uow, Table::Books, &columns, values).await?;
    let book_id = outcome
        .id
        .ok_or_else(|| StoreError::fatal("Book insert returned no id"))?;

    links::insert_links(&uow, book_id, LinkTable::BooksAuthors, &author_ids).await?;
    links::insert_links(&uow, book_id, LinkTable::BooksGenres, &genre_ids).await?;

    let book = finish(uow, book_id).await?;
    info!(book_id, isbn = %book.isbn, "book created");
    Ok(book)
}

/// Replace every column and both link sets of an existing book
pub async fn update_book(db: &Database, book_id: i64, new_book: &NewBook) -> Result<Book> {
    let (author_ids, genre_ids) = checked_links(new_book)?;

    let uow = db.begin().await?;
    let (columns, values) = new_book.book_columns();
    let updated =
        repository::update_by_key(&uow, Table::Books, "book_id", book_id, &columns, values).await?;
    if updated.is_empty() {
        return Err(book_not_found(book_id));
    }

    links::replace_links(&uow, book_id, LinkTable::BooksAuthors, &author_ids).await?;
    links::replace_links(&uow, book_id, LinkTable::BooksGenres, &genre_ids).await?;

    let book = finish(uow, book_id).await?;
    info!(book_id, "book updated");
    Ok(book)
}

/// Delete a book and its links, returning it as it was
pub async fn delete_book(db: &Database, book_id: i64) -> Result<Book> {
    let uow = db.begin().await?;
    let book = read_book(&uow, book_id).await?;
    repository::delete_by_key(&uow, Table::Books, "book_id", book_id).await?;
    uow.commit().await?;

    info!(book_id, "book deleted");
    Ok(book)
}

pub async fn read_book<R: StatementRunner>(runner: &R, book_id: i64) -> Result<Book> {
    book_query::read_book(runner, book_id)
        .await?
        .ok_or_else(|| book_not_found(book_id))
}

/// Books whose title or ISBN contains `text`, ordered by title
pub async fn search_books<R: StatementRunner>(runner: &R, text: &str) -> Result<Vec<Book>> {
    let query = BookQuery::new()
        .search(text)
        .order_by(Column::known(Table::Books, "book"));
    query_books(runner, &query).await
}

/// Books of one author, genre or language, optionally searched and ordered
pub async fn books_for<R: StatementRunner>(
    runner: &R,
    kind: InfoKind,
    id: i64,
    search: Option<&str>,
    order_by: Option<Column>,
    descending: bool,
) -> Result<Vec<Book>> {
    let mut query = BookQuery::new()
        .scope(kind.book_scope_column(), id)
        .descending(descending);
    if let Some(text) = search.map(str::trim).filter(|t| !t.is_empty()) {
        query = query.search(text);
    }
    if let Some(column) = order_by {
        query = query.order_by(column);
    }
    query_books(runner, &query).await
}

/// Validate a book and return its deduplicated link ids
fn checked_links(new_book: &NewBook) -> Result<(Vec<i64>, Vec<i64>)> {
    new_book.validate()?;
    let author_ids = dedup(&new_book.author_ids);
    let genre_ids = dedup(&new_book.genre_ids);
    if author_ids.is_empty() {
        return Err(StoreError::empty_link_set(LinkTable::BooksAuthors.relation()));
    }
    if genre_ids.is_empty() {
        return Err(StoreError::empty_link_set(LinkTable::BooksGenres.relation()));
    }
    Ok((author_ids, genre_ids))
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Read the book back inside the unit of work, then commit
async fn finish(uow: UnitOfWork, book_id: i64) -> Result<Book> {
    let book = read_book(&uow, book_id).await?;
    uow.commit().await?;
    Ok(book)
}

fn book_not_found(book_id: i64) -> StoreError {
    StoreError::not_found(format!("book {}", book_id))
}
