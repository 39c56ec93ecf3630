//! Typed building blocks for dynamic SQL
//!
//! Identifiers and values never travel the same way:
//! - table and column names come from the closed [`Table`] allow-list and are
//!   the only text ever interpolated into a statement
//! - every value is a [`SqlValue`] bound to a positional `?N` placeholder
//!
//! Caller-supplied identifier text (an `orderby` query parameter, say) has to
//! be parsed through [`Column::parse`] or [`OrderTerm::parse`] first, which
//! rejects anything that is not a known column.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{Sqlite, SqliteArguments};
use std::fmt;

// ============================================================================
// TABLES AND COLUMNS
// ============================================================================

/// Every table the storage core is allowed to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Books,
    Languages,
    Authors,
    Genres,
    BooksAuthors,
    BooksGenres,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Books,
        Table::Languages,
        Table::Authors,
        Table::Genres,
        Table::BooksAuthors,
        Table::BooksGenres,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Table::Books => "books",
            Table::Languages => "languages",
            Table::Authors => "authors",
            Table::Genres => "genres",
            Table::BooksAuthors => "books_authors",
            Table::BooksGenres => "books_genres",
        }
    }

    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Books => &[
                "book_id",
                "book",
                "isbn",
                "price",
                "pages",
                "stock_count",
                "created_at",
                "updated_at",
                "language_id",
            ],
            Table::Languages => &["language_id", "language"],
            Table::Authors => &["author_id", "author"],
            Table::Genres => &["genre_id", "genre"],
            Table::BooksAuthors => &["book_id", "author_id"],
            Table::BooksGenres => &["book_id", "genre_id"],
        }
    }

    /// Column used by the by-key operations; link tables are keyed by book
    pub const fn key_column(self) -> &'static str {
        match self {
            Table::Books | Table::BooksAuthors | Table::BooksGenres => "book_id",
            Table::Languages => "language_id",
            Table::Authors => "author_id",
            Table::Genres => "genre_id",
        }
    }

    /// The books table gets its own row ceiling
    pub const fn is_primary(self) -> bool {
        matches!(self, Table::Books)
    }

    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn has_column(self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    /// Look up a column of this table, returning its `'static` spelling
    pub fn column(self, name: &str) -> Result<Column> {
        self.columns()
            .iter()
            .find(|c| **c == name)
            .map(|c| Column {
                table: self,
                name: *c,
            })
            .ok_or_else(|| {
                StoreError::invalid_input(format!(
                    "Unknown column '{}' for table '{}'",
                    name,
                    self.name()
                ))
            })
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A column known to belong to an allow-listed table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column {
    table: Table,
    name: &'static str,
}

impl Column {
    /// Parse `table.column`, or a bare `column` resolved against `default_table`
    pub fn parse(text: &str, default_table: Table) -> Result<Column> {
        let text = text.trim();
        match text.split_once('.') {
            Some((table, column)) => {
                let table = Table::from_name(table).ok_or_else(|| {
                    StoreError::invalid_input(format!("Unknown table '{}'", table))
                })?;
                table.column(column)
            }
            None => default_table.column(text),
        }
    }

    /// Column from a name literal that is part of `table`'s column list
    pub(crate) const fn known(table: Table, name: &'static str) -> Column {
        Column { table, name }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn qualified(&self) -> String {
        format!("{}.{}", self.table.name(), self.name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table.name(), self.name)
    }
}

// ============================================================================
// ORDERING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One ORDER BY term: a column with an optional direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: Column,
    pub direction: Option<Direction>,
}

impl OrderTerm {
    pub fn new(column: Column, direction: Option<Direction>) -> Self {
        Self { column, direction }
    }

    /// Parse `"column"`, `"column DESC"` or `"table.column ASC"`
    pub fn parse(text: &str, default_table: Table) -> Result<OrderTerm> {
        let mut parts = text.split_whitespace();
        let column = parts
            .next()
            .ok_or_else(|| StoreError::invalid_input("Empty ORDER BY term"))?;
        let column = Column::parse(column, default_table)?;
        let direction = match parts.next() {
            None => None,
            Some(d) if d.eq_ignore_ascii_case("asc") => Some(Direction::Asc),
            Some(d) if d.eq_ignore_ascii_case("desc") => Some(Direction::Desc),
            Some(d) => {
                return Err(StoreError::invalid_input(format!(
                    "Unknown sort direction '{}'",
                    d
                )))
            }
        };
        if parts.next().is_some() {
            return Err(StoreError::invalid_input(format!(
                "Malformed ORDER BY term '{}'",
                text
            )));
        }
        Ok(OrderTerm { column, direction })
    }

    pub fn to_sql(&self) -> String {
        match self.direction {
            Some(direction) => format!("{} {}", self.column, direction.as_sql()),
            None => self.column.qualified(),
        }
    }
}

/// An ordered list of ORDER BY terms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBy(Vec<OrderTerm>);

impl OrderBy {
    /// Single column or `"column DIRECTION"` string
    pub fn parse(text: &str, default_table: Table) -> Result<OrderBy> {
        Ok(OrderBy(vec![OrderTerm::parse(text, default_table)?]))
    }

    /// List of columns or `"column DIRECTION"` strings, in priority order
    pub fn parse_all<S: AsRef<str>>(terms: &[S], default_table: Table) -> Result<OrderBy> {
        terms
            .iter()
            .map(|t| OrderTerm::parse(t.as_ref(), default_table))
            .collect::<Result<Vec<_>>>()
            .map(OrderBy)
    }

    pub fn terms(&self) -> &[OrderTerm] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// ` ORDER BY a, b DESC`, or an empty string when there are no terms
    pub fn to_clause(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let terms: Vec<String> = self.0.iter().map(OrderTerm::to_sql).collect();
        format!(" ORDER BY {}", terms.join(", "))
    }
}

impl From<Vec<OrderTerm>> for OrderBy {
    fn from(terms: Vec<OrderTerm>) -> Self {
        OrderBy(terms)
    }
}

// ============================================================================
// VALUES
// ============================================================================

/// A value bound to a statement parameter or read back from a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            SqlValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Numeric affinity stores whole prices as integers, so accept both
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Integer(v) => Some(*v as f64),
            SqlValue::Real(v) => Some(*v),
            SqlValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn bind_to<'q>(
        &'q self,
        query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            SqlValue::Null => query.bind(None::<i64>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Blob(b) => query.bind(b.as_slice()),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

// ============================================================================
// STATEMENTS
// ============================================================================

/// SQL text plus its positional parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<SqlValue>,
}

impl Statement {
    pub fn new<S: Into<String>>(sql: S) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Register a parameter and return its placeholder (`?1`, `?2`, ...)
    pub fn push_param<V: Into<SqlValue>>(&mut self, value: V) -> String {
        self.params.push(value.into());
        format!("?{}", self.params.len())
    }

    pub fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn to_query(&self) -> sqlx::query::Query<'_, Sqlite, SqliteArguments<'_>> {
        self.params
            .iter()
            .fold(sqlx::query(&self.sql), |query, param| param.bind_to(query))
    }
}

/// Escape LIKE wildcards so user text matches literally (`ESCAPE '\'`)
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_parse_qualified_and_bare() {
        let qualified = Column::parse("genres.genre", Table::Books).unwrap();
        assert_eq!(qualified.table(), Table::Genres);
        assert_eq!(qualified.qualified(), "genres.genre");

        let bare = Column::parse("isbn", Table::Books).unwrap();
        assert_eq!(bare.qualified(), "books.isbn");
    }

    #[test]
    fn test_column_parse_rejects_unknown_identifiers() {
        assert!(Column::parse("books.password", Table::Books).is_err());
        assert!(Column::parse("users.name", Table::Books).is_err());
        assert!(Column::parse("book; DROP TABLE books", Table::Books).is_err());
    }

    #[test]
    fn test_order_term_parse() {
        let term = OrderTerm::parse("author desc", Table::Authors).unwrap();
        assert_eq!(term.to_sql(), "authors.author DESC");

        let plain = OrderTerm::parse("books.price", Table::Books).unwrap();
        assert_eq!(plain.direction, None);

        assert!(OrderTerm::parse("author sideways", Table::Authors).is_err());
        assert!(OrderTerm::parse("author ASC extra", Table::Authors).is_err());
    }

    #[test]
    fn test_order_by_clause_keeps_order() {
        let order = OrderBy::parse_all(&["book ASC", "price DESC"], Table::Books).unwrap();
        assert_eq!(order.to_clause(), " ORDER BY books.book ASC, books.price DESC");
        assert_eq!(OrderBy::default().to_clause(), "");
    }

    #[test]
    fn test_statement_placeholders_are_positional() {
        let mut stmt = Statement::new("SELECT 1");
        assert_eq!(stmt.push_param(7i64), "?1");
        assert_eq!(stmt.push_param("x"), "?2");
        assert_eq!(stmt.param_count(), 2);
        assert_eq!(stmt.params()[1], SqlValue::Text("x".to_string()));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("ocean"), "ocean");
    }

    #[test]
    fn test_numeric_affinity_reads_back_as_f64() {
        assert_eq!(SqlValue::Integer(24).as_f64(), Some(24.0));
        assert_eq!(SqlValue::Real(23.91).as_f64(), Some(23.91));
        assert_eq!(SqlValue::Null.as_f64(), None);
    }
}
