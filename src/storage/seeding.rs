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


//! Sample data and the self-healing read path
//!
//! [`populate`] inserts a small idempotent sample inventory. Every insert is
//! `ON CONFLICT DO NOTHING` and links look their rows up by name, so running
//! it against a partly or fully populated database changes nothing.
//!
//! [`read_all_books`] seeds an empty database on first read when the
//! [`SelfHealingPolicy`] allows it. The seeding routine is a [`Seeder`] so
//! tests can substitute one that counts calls or fails.

use crate::config::SelfHealingPolicy;
use crate::error::Result;
use crate::storage::book_query::{query_books, BookQuery};
use crate::storage::database::Database;
use crate::storage::models::Book;
use crate::storage::sql::Statement;
use tracing::{info, warn};

const POPULATE_SQL: &str = r#"
INSERT INTO languages (language)
     VALUES ('English')
ON CONFLICT DO NOTHING;

INSERT INTO books (book, isbn, pages, price, stock_count, language_id)
     VALUES ('Blue Ocean Strategy', '1591396190', 240, 23.91, 7,
             (SELECT language_id FROM languages WHERE language = 'English' LIMIT 1))
ON CONFLICT DO NOTHING;

INSERT INTO authors (author)
     VALUES ('W. Chan Kim'), ('Renée Mauborgne')
ON CONFLICT DO NOTHING;

INSERT INTO genres (genre)
     VALUES ('Business Management')
ON CONFLICT DO NOTHING;

INSERT INTO books_authors (book_id, author_id)
     VALUES ((SELECT book_id FROM books WHERE isbn = '1591396190' LIMIT 1),
             (SELECT author_id FROM authors WHERE author = 'W. Chan Kim' LIMIT 1)),
            ((SELECT book_id FROM books WHERE isbn = '1591396190' LIMIT 1),
             (SELECT author_id FROM authors WHERE author = 'Renée Mauborgne' LIMIT 1))
ON CONFLICT DO NOTHING;

INSERT INTO books_genres (book_id, genre_id)
     VALUES ((SELECT book_id FROM books WHERE isbn = '1591396190' LIMIT 1),
             (SELECT genre_id FROM genres WHERE genre = 'Business Management' LIMIT 1))
ON CONFLICT DO NOTHING;
"#;

/// Something that can fill an empty database
#[allow(async_fn_in_trait)]
pub trait Seeder {
    async fn seed(&self, db: &Database) -> Result<()>;
}

/// Seeds the built-in sample inventory
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleDataSeeder;

impl Seeder for SampleDataSeeder {
    async fn seed(&self, db: &Database) -> Result<()> {
        populate(db).await
    }
}

/// Insert the sample inventory in one transaction
pub async fn populate(db: &Database) -> Result<()> {
    let set = db.run_transaction(&Statement::new(POPULATE_SQL)).await?;
    info!(rows_inserted = set.rows_affected, "sample data populated");
    Ok(())
}

/// Read every book, seeding an empty database first when the policy allows
///
/// Seeding runs at most once per call. A seeding failure is logged and
/// yields an empty list; a query failure is returned as is.
pub async fn read_all_books<S: Seeder>(
    db: &Database,
    policy: &SelfHealingPolicy,
    seeder: &S,
) -> Result<Vec<Book>> {
    let query = BookQuery::new();
    let mut seeded = false;

    for attempt in 1..=policy.max_attempts.max(1) {
        let books = query_books(db, &query).await?;
        if !books.is_empty() || !policy.enabled {
            return Ok(books);
        }

        if !seeded {
            info!(attempt, "no books found, seeding database");
            if let Err(err) = seeder.seed(db).await {
                warn!(error = %err, "seeding failed, returning empty inventory");
                return Ok(Vec::new());
            }
            seeded = true;
        }
    }

    warn!(max_attempts = policy.max_attempts, "database still empty after seeding");
    Ok(Vec::new())
}
