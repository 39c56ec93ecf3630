//! Database models for the inventory
//!
//! Two families of types live here:
//! - untyped rows ([`Row`], [`RowSet`], [`InsertOutcome`]) returned by the
//!   table-agnostic repository
//! - typed inventory entities ([`Book`], [`NewBook`], [`InfoItem`]) built from
//!   those rows
//!
//! # SQLite Adaptations
//! - Prices use NUMERIC affinity, so whole prices come back as integers
//! - Timestamps are TEXT in `YYYY-MM-DD HH:MM:SS` (CURRENT_TIMESTAMP format)
//! - Aggregated authors/genres arrive as a JSON array of `"id:name"` strings

use crate::error::{Result, StoreError};
use crate::storage::sql::SqlValue;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const BOOK_TITLE_MAX: usize = 255;
pub const ISBN_MIN: usize = 9;
pub const ISBN_MAX: usize = 13;

// ============================================================================
// UNTYPED ROWS
// ============================================================================

/// One result row keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, SqlValue>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, column: S, value: SqlValue) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.0.get(column)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(SqlValue::as_i64)
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(SqlValue::as_f64)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(SqlValue::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Row(iter.into_iter().collect())
    }
}

/// Rows returned by a statement plus the number of rows it changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowSet {
    pub rows: Vec<Row>,
    pub rows_affected: u64,
}

impl RowSet {
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn into_first(self) -> Option<Row> {
        self.rows.into_iter().next()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Result of a successful insert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertOutcome {
    /// The stored row, as returned by `RETURNING *`
    pub row: Row,
    /// Value of the table's key column, when it is an integer
    pub id: Option<i64>,
}

// ============================================================================
// BOOKS
// ============================================================================

/// A book with its language and aggregated authors/genres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: i64,
    /// Title
    pub book: String,
    pub isbn: String,
    pub language_id: Option<i64>,
    pub language: String,
    /// author_id -> author
    pub authors: BTreeMap<i64, String>,
    /// genre_id -> genre
    pub genres: BTreeMap<i64, String>,
    pub pages: u32,
    pub price: f64,
    pub stock_count: u32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Book {
    /// Build a book from one row of the aggregated book query
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            book_id: required_i64(row, "book_id")?,
            book: required_str(row, "book")?.to_string(),
            isbn: required_str(row, "isbn")?.to_string(),
            language_id: row.get_i64("language_id"),
            language: required_str(row, "language")?.to_string(),
            authors: parse_aggregate(required_str(row, "authors")?)?,
            genres: parse_aggregate(required_str(row, "genres")?)?,
            pages: required_u32(row, "pages")?,
            price: row
                .get_f64("price")
                .ok_or_else(|| invalid_book("price", "missing or not numeric"))?,
            stock_count: required_u32(row, "stock_count")?,
            created_at: required_timestamp(row, "created_at")?,
            updated_at: required_timestamp(row, "updated_at")?,
        })
    }

    /// "A", "A & B" or "A, B & C"
    pub fn author_list(&self) -> String {
        comma_separated_list(self.authors.values().map(String::as_str))
    }

    pub fn genre_list(&self) -> String {
        comma_separated_list(self.genres.values().map(String::as_str))
    }
}

/// Values for creating or fully replacing a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub book: String,
    pub isbn: String,
    pub price: f64,
    pub pages: u32,
    pub stock_count: u32,
    pub language_id: i64,
    pub author_ids: Vec<i64>,
    pub genre_ids: Vec<i64>,
}

impl NewBook {
    /// Reject values the store would otherwise have to coerce
    pub fn validate(&self) -> Result<()> {
        let title_len = self.book.trim().chars().count();
        if title_len == 0 || title_len > BOOK_TITLE_MAX {
            return Err(StoreError::invalid_input(format!(
                "A book title is required & can only contain {} characters at most!",
                BOOK_TITLE_MAX
            )));
        }

        let isbn_ok = (ISBN_MIN..=ISBN_MAX).contains(&self.isbn.len())
            && self.isbn.bytes().all(|b| b.is_ascii_digit());
        if !isbn_ok {
            return Err(StoreError::invalid_input(format!(
                "ISBN must contain from {} to {} digits",
                ISBN_MIN, ISBN_MAX
            )));
        }

        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(StoreError::invalid_input("A price must be a positive number!"));
        }
        let cents = self.price * 100.0;
        if (cents - cents.round()).abs() > 1e-6 {
            return Err(StoreError::invalid_input(
                "A price can have at most two decimal places",
            ));
        }

        Ok(())
    }

    /// Columns and values for the `books` row, in matching order
    pub(crate) fn book_columns(&self) -> (Vec<&'static str>, Vec<SqlValue>) {
        (
            vec!["book", "isbn", "price", "pages", "stock_count", "language_id"],
            vec![
                SqlValue::from(self.book.trim()),
                SqlValue::from(self.isbn.as_str()),
                SqlValue::from(self.price),
                SqlValue::from(self.pages),
                SqlValue::from(self.stock_count),
                SqlValue::from(self.language_id),
            ],
        )
    }
}

// ============================================================================
// INFO ENTITIES (authors, genres, languages)
// ============================================================================

/// An author, genre or language row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoItem {
    pub id: i64,
    pub name: String,
}

// ============================================================================
// HELPERS
// ============================================================================

/// Join names the way listings show them: "A", "A & B", "A, B & C"
pub fn comma_separated_list<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&str> = names.into_iter().collect();
    match names.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        [first, second] => format!("{} & {}", first, second),
        [init @ .., last] => format!("{} & {}", init.join(", "), last),
    }
}

/// Parse `["1:W. Chan Kim","2:Renée Mauborgne"]` into an id -> name map
fn parse_aggregate(text: &str) -> Result<BTreeMap<i64, String>> {
    let entries: Vec<String> = serde_json::from_str(text)
        .map_err(|e| invalid_book("aggregate", &e.to_string()))?;

    entries
        .into_iter()
        .map(|entry| {
            let (id, name) = entry
                .split_once(':')
                .ok_or_else(|| invalid_book("aggregate", "entry without id"))?;
            let id = id
                .parse::<i64>()
                .map_err(|_| invalid_book("aggregate", "non-numeric id"))?;
            Ok((id, name.to_string()))
        })
        .collect()
}

fn required_i64(row: &Row, column: &str) -> Result<i64> {
    row.get_i64(column)
        .ok_or_else(|| invalid_book(column, "missing or not an integer"))
}

fn required_u32(row: &Row, column: &str) -> Result<u32> {
    let value = required_i64(row, column)?;
    u32::try_from(value).map_err(|_| invalid_book(column, "out of range"))
}

fn required_str<'r>(row: &'r Row, column: &str) -> Result<&'r str> {
    row.get_str(column)
        .ok_or_else(|| invalid_book(column, "missing or not text"))
}

fn required_timestamp(row: &Row, column: &str) -> Result<NaiveDateTime> {
    let text = required_str(row, column)?;
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map_err(|_| invalid_book(column, "malformed timestamp"))
}

fn invalid_book(column: &str, detail: &str) -> StoreError {
    tracing::error!(column, detail, "could not load a valid book from database");
    StoreError::fatal("Could not load a valid book from database")
}
