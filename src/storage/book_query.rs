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


//! Filtered, aggregated book queries
//!
//! Every book listing goes through [`BookQuery`]: books joined with their
//! language and both link tables, grouped per book, with authors and genres
//! folded into id -> name maps.
//!
//! # Clause combination
//! ```text
//! WHERE (scope_1 AND scope_2 ...) AND (filter_1 OR filter_2 ...)
//! ```
//! Scope clauses narrow to a known context (one book, one author's books),
//! filter clauses implement free-text search. Conditions on author or genre
//! columns are evaluated through a sub-select on the link table so the
//! aggregated maps of a matching book stay complete.

use crate::error::Result;
use crate::storage::executor::StatementRunner;
use crate::storage::models::Book;
use crate::storage::sql::{escape_like, Column, Direction, SqlValue, Statement, Table};

const SELECT_BOOKS: &str = "\
SELECT books.book_id,
       books.book,
       books.isbn,
       books.language_id,
       languages.language,
       json_group_array(DISTINCT authors.author_id || ':' || authors.author) AS authors,
       json_group_array(DISTINCT genres.genre_id || ':' || genres.genre) AS genres,
       books.pages,
       books.price,
       books.stock_count,
       books.created_at,
       books.updated_at
  FROM books
  JOIN languages
    ON books.language_id = languages.language_id
  JOIN books_authors
    ON books.book_id = books_authors.book_id
  JOIN authors
    ON books_authors.author_id = authors.author_id
  JOIN books_genres
    ON books.book_id = books_genres.book_id
  JOIN genres
    ON books_genres.genre_id = genres.genre_id";

const GROUP_BY_BOOK: &str = " GROUP BY books.book_id, languages.language";

/// Builder for the aggregated book listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookQuery {
    scope: Vec<(Column, SqlValue)>,
    filter: Vec<(Column, String)>,
    order_by: Vec<Column>,
    descending: bool,
    limit: Option<u32>,
}

impl BookQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to rows where `column = value` (AND-ed with other scopes)
    pub fn scope<V: Into<SqlValue>>(mut self, column: Column, value: V) -> Self {
        self.scope.push((column, value.into()));
        self
    }

    /// Match rows where `column` contains `text` (OR-ed with other filters)
    ///
    /// Matching uses SQLite `LIKE`, which folds ASCII letters only: `"OCEAN"`
    /// finds "Blue Ocean" but `"É"` does not find "é".
    pub fn filter<S: Into<String>>(mut self, column: Column, text: S) -> Self {
        self.filter.push((column, text.into()));
        self
    }

    /// Search title and ISBN for `text`
    ///
    /// Case folding is ASCII-only, as in [`BookQuery::filter`].
    pub fn search<S: AsRef<str>>(self, text: S) -> Self {
        let text = text.as_ref();
        self.filter(book_column("book"), text)
            .filter(book_column("isbn"), text)
    }

    pub fn order_by(mut self, column: Column) -> Self {
        self.order_by.push(column);
        self
    }

    /// Suffix every ORDER BY column with DESC
    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn to_statement(&self) -> Statement {
        let mut stmt = Statement::new(SELECT_BOOKS);

        let mut groups = Vec::new();
        if !self.scope.is_empty() {
            let scope: Vec<String> = self
                .scope
                .iter()
                .map(|(column, value)| {
                    let placeholder = stmt.push_param(value.clone());
                    condition(column, &format!("= {}", placeholder))
                })
                .collect();
            groups.push(format!("({})", scope.join(" AND ")));
        }
        if !self.filter.is_empty() {
            let filter: Vec<String> = self
                .filter
                .iter()
                .map(|(column, text)| {
                    let pattern = format!("%{}%", escape_like(text));
                    let placeholder = stmt.push_param(pattern);
                    condition(column, &format!("LIKE {} ESCAPE '\\'", placeholder))
                })
                .collect();
            groups.push(format!("({})", filter.join(" OR ")));
        }
        if !groups.is_empty() {
            stmt.push_sql(&format!(" WHERE {}", groups.join(" AND ")));
        }

        stmt.push_sql(GROUP_BY_BOOK);

        if !self.order_by.is_empty() {
            let direction = if self.descending {
                format!(" {}", Direction::Desc.as_sql())
            } else {
                String::new()
            };
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|column| format!("{}{}", column.qualified(), direction))
                .collect();
            stmt.push_sql(&format!(" ORDER BY {}", terms.join(", ")));
        }

        if let Some(limit) = self.limit {
            let placeholder = stmt.push_param(limit);
            stmt.push_sql(&format!(" LIMIT {}", placeholder));
        }

        stmt
    }
}

fn book_column(name: &'static str) -> Column {
    Column::known(Table::Books, name)
}

/// Render `<column> <predicate>`, routing author/genre columns through their link table
fn condition(column: &Column, predicate: &str) -> String {
    let link = match column.table() {
        Table::Authors | Table::BooksAuthors => Some((Table::BooksAuthors, Table::Authors, "author_id")),
        Table::Genres | Table::BooksGenres => Some((Table::BooksGenres, Table::Genres, "genre_id")),
        Table::Books | Table::Languages => None,
    };

    match link {
        None => format!("{} {}", column.qualified(), predicate),
        Some((link_table, info_table, info_key)) => format!(
            "books.book_id IN (SELECT {link}.book_id FROM {link} JOIN {info} ON {link}.{key} = {info}.{key} WHERE {column} {predicate})",
            link = link_table.name(),
            info = info_table.name(),
            key = info_key,
            column = column.qualified(),
            predicate = predicate,
        ),
    }
}

/// Run a book query; an empty result is not an error
pub async fn query_books<R: StatementRunner>(runner: &R, query: &BookQuery) -> Result<Vec<Book>> {
    let set = runner.run(&query.to_statement()).await?;
    set.rows.iter().map(Book::from_row).collect()
}

/// Read one book with its authors and genres
pub async fn read_book<R: StatementRunner>(runner: &R, book_id: i64) -> Result<Option<Book>> {
    let query = BookQuery::new()
        .scope(book_column("book_id"), book_id)
        .limit(1);
    Ok(query_books(runner, &query).await?.into_iter().next())
}
