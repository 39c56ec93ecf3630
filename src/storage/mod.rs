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


//! Database storage
//!
//! This module handles all database operations using SQLite through sqlx.
//!
//! # Layers
//! - [`sql`]: allow-listed tables/columns and bound values
//! - [`executor`]: statement execution and driver error translation
//! - [`database`]: connection pool, per-statement transactions, [`UnitOfWork`]
//! - [`repository`]: table-agnostic CRUD with row ceilings
//! - [`book_query`]: the aggregated, filterable book listing
//! - [`links`]: author/genre link replacement
//! - [`books`], [`catalog`]: book and author/genre/language operations
//! - [`seeding`]: sample data and the self-healing read path
//!
//! # Database Schema
//! - Books: title, ISBN, price, pages, stock, language
//! - Authors, Genres, Languages: unique names
//! - books_authors, books_genres: many-to-many link tables
//!
//! # Usage Example
//! ```no_run
//! use inventory_core::storage::{books, catalog, Database, InfoKind, NewBook};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new("./inventory.db").await?;
//!
//! let language = catalog::create(&db, InfoKind::Language, "English").await?;
//! let author = catalog::create(&db, InfoKind::Author, "W. Chan Kim").await?;
//! let genre = catalog::create(&db, InfoKind::Genre, "Business Management").await?;
//!
//! let book = books::create_book(&db, &NewBook {
//!     book: "Blue Ocean Strategy".to_string(),
//!     isbn: "1591396190".to_string(),
//!     price: 23.91,
//!     pages: 240,
//!     stock_count: 7,
//!     language_id: language.id,
//!     author_ids: vec![author.id],
//!     genre_ids: vec![genre.id],
//! }).await?;
//! println!("{} by {}", book.book, book.author_list());
//! # Ok(())
//! # }
//! ```

pub mod book_query;
pub mod books;
pub mod catalog;
pub mod database;
pub mod executor;
pub mod links;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod seeding;
pub mod sql;

// Re-export commonly used types
pub use book_query::{query_books, BookQuery};
pub use catalog::InfoKind;
pub use database::{Database, UnitOfWork};
pub use executor::StatementRunner;
pub use links::LinkTable;
pub use models::{Book, InfoItem, InsertOutcome, NewBook, Row, RowSet};
pub use seeding::{populate, read_all_books, SampleDataSeeder, Seeder};
pub use sql::{Column, Direction, OrderBy, OrderTerm, SqlValue, Statement, Table};
