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


//! Authors, genres and languages
//!
//! The three info tables share one shape (`<kind>_id`, `<kind>`), so a single
//! set of operations serves all of them through [`InfoKind`].

use crate::error::{Result, StoreError};
use crate::storage::executor::StatementRunner;
use crate::storage::models::{InfoItem, Row};
use crate::storage::repository;
use crate::storage::sql::{Column, Direction, OrderBy, OrderTerm, SqlValue, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the info entities a book refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoKind {
    Author,
    Genre,
    Language,
}

impl InfoKind {
    pub const ALL: [InfoKind; 3] = [InfoKind::Author, InfoKind::Genre, InfoKind::Language];

    pub fn table(self) -> Table {
        match self {
            InfoKind::Author => Table::Authors,
            InfoKind::Genre => Table::Genres,
            InfoKind::Language => Table::Languages,
        }
    }

    pub fn key_column(self) -> &'static str {
        self.table().key_column()
    }

    pub fn name_column(self) -> &'static str {
        match self {
            InfoKind::Author => "author",
            InfoKind::Genre => "genre",
            InfoKind::Language => "language",
        }
    }

    /// Longest accepted name, matching the column width
    pub fn max_name_len(self) -> usize {
        match self {
            InfoKind::Language => 127,
            InfoKind::Author | InfoKind::Genre => 255,
        }
    }

    /// Column a book listing is scoped by to get "books of this entity"
    pub fn book_scope_column(self) -> Column {
        match self {
            InfoKind::Author => Column::known(Table::Authors, "author_id"),
            InfoKind::Genre => Column::known(Table::Genres, "genre_id"),
            InfoKind::Language => Column::known(Table::Books, "language_id"),
        }
    }

    /// Trimmed name, or `InvalidInput` when empty or too long
    pub fn normalize_name(self, name: &str) -> Result<String> {
        let name = name.trim();
        let len = name.chars().count();
        if len == 0 {
            return Err(StoreError::invalid_input(format!(
                "A {} name is required!",
                self.name_column()
            )));
        }
        if len > self.max_name_len() {
            return Err(StoreError::invalid_input(format!(
                "A {} name can't contain more than {} characters!",
                self.name_column(),
                self.max_name_len()
            )));
        }
        Ok(name.to_string())
    }

    fn item_from_row(self, row: &Row) -> Result<InfoItem> {
        let id = row.get_i64(self.key_column());
        let name = row.get_str(self.name_column());
        match (id, name) {
            (Some(id), Some(name)) => Ok(InfoItem {
                id,
                name: name.to_string(),
            }),
            _ => {
                tracing::error!(table = %self.table(), "malformed info row");
                Err(StoreError::fatal("Mission failed! Try again later."))
            }
        }
    }
}

impl fmt::Display for InfoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name_column())
    }
}

impl FromStr for InfoKind {
    type Err = StoreError;

    /// Accepts the singular or plural form: `author`, `authors`, ...
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        let singular = s.strip_suffix('s').unwrap_or(&s);
        InfoKind::ALL
            .into_iter()
            .find(|kind| kind.name_column() == singular)
            .ok_or_else(|| StoreError::invalid_input(format!("Unknown entity '{}'", s)))
    }
}

/// Every row of `kind`, ordered by name
pub async fn list<R: StatementRunner>(runner: &R, kind: InfoKind) -> Result<Vec<InfoItem>> {
    let order = OrderBy::from(vec![OrderTerm::new(
        Column::known(kind.table(), kind.name_column()),
        Some(Direction::Asc),
    )]);
    repository::read_all(runner, kind.table(), Some(&order))
        .await?
        .iter()
        .map(|row| kind.item_from_row(row))
        .collect()
}

pub async fn get<R: StatementRunner>(runner: &R, kind: InfoKind, id: i64) -> Result<InfoItem> {
    match repository::read_one_by_key(runner, kind.table(), kind.key_column(), id).await? {
        Some(row) => kind.item_from_row(&row),
        None => Err(StoreError::not_found(format!("{} {}", kind, id))),
    }
}

/// Insert a new entry; duplicates fail with `UniqueConflict`
pub async fn create<R: StatementRunner>(runner: &R, kind: InfoKind, name: &str) -> Result<InfoItem> {
    let name = kind.normalize_name(name)?;
    let outcome = repository::insert(
        runner,
        kind.table(),
        &[kind.name_column()],
        vec![SqlValue::Text(name)],
    )
    .await?;
    kind.item_from_row(&outcome.row)
}

pub async fn rename<R: StatementRunner>(
    runner: &R,
    kind: InfoKind,
    id: i64,
    name: &str,
) -> Result<InfoItem> {
    let name = kind.normalize_name(name)?;
    let set = repository::update_by_key(
        runner,
        kind.table(),
        kind.key_column(),
        id,
        &[kind.name_column()],
        vec![SqlValue::Text(name)],
    )
    .await?;
    match set.into_first() {
        Some(row) => kind.item_from_row(&row),
        None => Err(StoreError::not_found(format!("{} {}", kind, id))),
    }
}

/// Delete an entry; one still referenced by a book fails with `ReferentialConflict`
pub async fn delete<R: StatementRunner>(runner: &R, kind: InfoKind, id: i64) -> Result<InfoItem> {
    let set = repository::delete_by_key(runner, kind.table(), kind.key_column(), id).await?;
    match set.into_first() {
        Some(row) => kind.item_from_row(&row),
        None => Err(StoreError::not_found(format!("{} {}", kind, id))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableLimits;
    use crate::storage::database::Database;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("authors".parse::<InfoKind>().unwrap(), InfoKind::Author);
        assert_eq!(" Genre ".parse::<InfoKind>().unwrap(), InfoKind::Genre);
        assert_eq!("language".parse::<InfoKind>().unwrap(), InfoKind::Language);
        assert!("publisher".parse::<InfoKind>().is_err());
    }

    #[test]
    fn test_name_normalization() {
        assert_eq!(InfoKind::Author.normalize_name("  Ursula  ").unwrap(), "Ursula");
        assert!(InfoKind::Genre.normalize_name("   ").is_err());
        assert!(InfoKind::Language.normalize_name(&"x".repeat(128)).is_err());
        assert!(InfoKind::Author.normalize_name(&"x".repeat(128)).is_ok());
    }

    #[tokio::test]
    async fn test_create_list_rename_delete() {
        let db = Database::new_in_memory().await.unwrap();

        let b = create(&db, InfoKind::Genre, "Horror").await.unwrap();
        let a = create(&db, InfoKind::Genre, " Drama ").await.unwrap();
        assert_eq!(a.name, "Drama");

        let names: Vec<String> = list(&db, InfoKind::Genre)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, vec!["Drama", "Horror"]);

        let renamed = rename(&db, InfoKind::Genre, b.id, "Gothic Horror").await.unwrap();
        assert_eq!(renamed.name, "Gothic Horror");
        assert_eq!(get(&db, InfoKind::Genre, b.id).await.unwrap().name, "Gothic Horror");

        let deleted = delete(&db, InfoKind::Genre, a.id).await.unwrap();
        assert_eq!(deleted, a);
        assert!(matches!(
            get(&db, InfoKind::Genre, a.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_entries_are_not_found() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(matches!(
            delete(&db, InfoKind::Author, 42).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            rename(&db, InfoKind::Author, 42, "Nobody").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let db = Database::new_in_memory().await.unwrap();
        create(&db, InfoKind::Language, "English").await.unwrap();

        let err = create(&db, InfoKind::Language, "English").await.unwrap_err();
        assert!(err.is_constraint_conflict());
        assert_eq!(err.to_string(), "This language is already in use");
        assert_eq!(list(&db, InfoKind::Language).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_language_in_use_cannot_be_deleted() {
        let db = Database::new_in_memory().await.unwrap();
        crate::storage::seeding::populate(&db).await.unwrap();

        let english = list(&db, InfoKind::Language).await.unwrap().remove(0);
        let err = delete(&db, InfoKind::Language, english.id).await.unwrap_err();
        assert!(matches!(err, StoreError::ReferentialConflict { .. }));
    }

    #[tokio::test]
    async fn test_create_respects_auxiliary_ceiling() {
        let db = Database::new_in_memory().await.unwrap().with_limits(TableLimits {
            primary: 5,
            auxiliary: 1,
        });
        create(&db, InfoKind::Author, "One").await.unwrap();
        let err = create(&db, InfoKind::Author, "Two").await.unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded { ceiling: 1, .. }));
    }
}
