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


//! Database migrations
//!
//! This module handles database schema creation and migrations.
//!
//! # Schema
//! - `languages`, `authors`, `genres`: unique-named info tables
//! - `books`: inventory rows referencing one language
//! - `books_authors`, `books_genres`: composite-key link tables, cascading
//!   deletes from the book side and updates from the info side
//!
//! # Migration Strategy
//! Since sqlx's compile-time migration system requires build-time database connection,
//! we implement migrations as runtime SQL execution tracked in `_migrations`.

use crate::error::Result;
use sqlx::{Executor, SqlitePool};
use tracing::info;

/// Run all database migrations
///
/// This function creates the database schema and applies any pending migrations.
/// Migrations are tracked in the `_migrations` table.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Create migrations tracking table
    create_migrations_table(pool).await?;

    // Run all migrations in order
    run_migration(pool, 1, "initial_schema", create_initial_schema(pool)).await?;
    run_migration(pool, 2, "book_lookup_indexes", create_lookup_indexes(pool)).await?;

    Ok(())
}

/// Create migrations tracking table
async fn create_migrations_table(pool: &SqlitePool) -> Result<()> {
    pool.execute(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .await?;

    Ok(())
}

/// Run a single migration if it hasn't been applied yet
async fn run_migration(
    pool: &SqlitePool,
    id: i32,
    name: &str,
    migration_fn: impl std::future::Future<Output = Result<()>>,
) -> Result<()> {
    let applied: Option<i32> = sqlx::query_scalar("SELECT id FROM _migrations WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    if applied.is_some() {
        return Ok(());
    }

    migration_fn.await?;

    sqlx::query("INSERT INTO _migrations (id, name) VALUES (?, ?)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;

    info!(migration = name, id, "applied database migration");
    Ok(())
}

/// Create initial database schema
async fn create_initial_schema(pool: &SqlitePool) -> Result<()> {
    pool.execute(
        r#"
-- ============================================================================
-- INFO TABLES
-- ============================================================================

CREATE TABLE IF NOT EXISTS languages (
    language_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    language     VARCHAR(127) UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS authors (
    author_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    author     VARCHAR(255) UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS genres (
    genre_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    genre     VARCHAR(255) UNIQUE NOT NULL
);

-- ============================================================================
-- BOOKS
-- ============================================================================

CREATE TABLE IF NOT EXISTS books (
    book_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    book         VARCHAR(255) NOT NULL,
    isbn         VARCHAR(13) UNIQUE NOT NULL,
    price        NUMERIC(10, 2) NOT NULL,
    pages        INTEGER NOT NULL,
    stock_count  INTEGER NOT NULL,
    created_at   TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at   TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    language_id  INTEGER REFERENCES languages (language_id) ON UPDATE CASCADE
);

-- ============================================================================
-- LINK TABLES (Many-to-Many Relationships)
-- ============================================================================

CREATE TABLE IF NOT EXISTS books_authors (
    book_id   INTEGER REFERENCES books (book_id) ON UPDATE CASCADE ON DELETE CASCADE,
    author_id INTEGER REFERENCES authors (author_id) ON UPDATE CASCADE,
    CONSTRAINT book_author_pk PRIMARY KEY (book_id, author_id)
);

CREATE TABLE IF NOT EXISTS books_genres (
    book_id  INTEGER REFERENCES books (book_id) ON UPDATE CASCADE ON DELETE CASCADE,
    genre_id INTEGER REFERENCES genres (genre_id) ON UPDATE CASCADE,
    CONSTRAINT book_genre_pk PRIMARY KEY (book_id, genre_id)
);

-- Keep updated_at current whenever a book's content changes
CREATE TRIGGER IF NOT EXISTS update_books_timestamp
AFTER UPDATE OF book, isbn, price, pages, stock_count, language_id ON books
FOR EACH ROW
BEGIN
    UPDATE books SET updated_at = CURRENT_TIMESTAMP WHERE book_id = NEW.book_id;
END;
        "#,
    )
    .await?;

    Ok(())
}

/// Indexes for the "books by author/genre/language" lookups
async fn create_lookup_indexes(pool: &SqlitePool) -> Result<()> {
    pool.execute(
        r#"
CREATE INDEX IF NOT EXISTS idx_books_language ON books(language_id);
CREATE INDEX IF NOT EXISTS idx_books_title ON books(book);
CREATE INDEX IF NOT EXISTS idx_books_authors_author ON books_authors(author_id);
CREATE INDEX IF NOT EXISTS idx_books_genres_genre ON books_genres(genre_id);
        "#,
    )
    .await?;

    Ok(())
}
