//! Integration tests for the inventory storage core
//!
//! Runs the end-to-end scenarios against a real SQLite file in a temporary
//! directory: seeding, aggregation, filtering, ceilings and conflicts.

use inventory_core::storage::{
    books, catalog, populate, query_books, read_all_books, repository, BookQuery, Column,
    InfoKind, NewBook, SampleDataSeeder, Table,
};
use inventory_core::{Database, SelfHealingPolicy, StoreConfig, StoreError, TableLimits};

const BLUE_OCEAN_ISBN: &str = "1591396190";

/// Open a migrated database file inside `dir`
async fn open_db(dir: &tempfile::TempDir, limits: TableLimits) -> Result<Database, StoreError> {
    let config = StoreConfig {
        database_path: Some(dir.path().join("inventory.db")),
        limits,
        ..StoreConfig::default()
    };
    Database::connect(&config).await
}

fn col(text: &str) -> Column {
    Column::parse(text, Table::Books).expect("known column")
}

#[tokio::test]
async fn test_seeded_book_is_aggregated() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_db(&dir, TableLimits::default()).await?;

    let all = read_all_books(&db, &SelfHealingPolicy::default(), &SampleDataSeeder).await?;
    assert_eq!(all.len(), 1, "two authors must still produce one book row");

    let book = &all[0];
    assert_eq!(book.book, "Blue Ocean Strategy");
    assert_eq!(book.isbn, BLUE_OCEAN_ISBN);
    assert_eq!(book.language, "English");
    assert_eq!(book.pages, 240);
    assert_eq!(book.stock_count, 7);
    assert!((book.price - 23.91).abs() < 1e-9);
    assert_eq!(book.authors.len(), 2);
    assert_eq!(book.genres.len(), 1);
    assert_eq!(book.author_list(), "W. Chan Kim & Renée Mauborgne");
    assert_eq!(book.genre_list(), "Business Management");

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn test_filter_is_or_and_scope_is_and() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_db(&dir, TableLimits::default()).await?;
    populate(&db).await?;

    let english = catalog::list(&db, InfoKind::Language).await?.remove(0);
    let french = catalog::create(&db, InfoKind::Language, "French").await?;
    let author = catalog::create(&db, InfoKind::Author, "Albert Camus").await?;
    let genre = catalog::create(&db, InfoKind::Genre, "Philosophy").await?;

    books::create_book(
        &db,
        &NewBook {
            book: "L'Etranger Ocean".to_string(),
            isbn: "2070360024".to_string(),
            price: 9.5,
            pages: 186,
            stock_count: 3,
            language_id: french.id,
            author_ids: vec![author.id],
            genre_ids: vec![genre.id],
        },
    )
    .await?;

    // Title matches one book, ISBN matches the other: OR inside the filter group
    let either = query_books(
        &db,
        &BookQuery::new()
            .filter(col("books.book"), "etranger")
            .filter(col("books.isbn"), BLUE_OCEAN_ISBN)
            .order_by(col("books.book")),
    )
    .await?;
    let titles: Vec<&str> = either.iter().map(|b| b.book.as_str()).collect();
    assert_eq!(titles, vec!["Blue Ocean Strategy", "L'Etranger Ocean"]);

    // Both titles contain "ocean", the scope keeps only the English one
    let scoped = query_books(
        &db,
        &BookQuery::new()
            .scope(col("books.language_id"), english.id)
            .filter(col("books.book"), "OCEAN"),
    )
    .await?;
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].isbn, BLUE_OCEAN_ISBN);

    let none = query_books(&db, &BookQuery::new().filter(col("books.book"), "no such title")).await?;
    assert!(none.is_empty());

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn test_duplicate_author_is_unique_conflict() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_db(&dir, TableLimits::default()).await?;
    populate(&db).await?;

    let before = repository::count_rows(&db, Table::Authors).await?;
    let err = catalog::create(&db, InfoKind::Author, "W. Chan Kim")
        .await
        .expect_err("duplicate author must be rejected");

    assert!(matches!(err, StoreError::UniqueConflict { .. }));
    assert_eq!(err.status_code(), 409);
    assert_eq!(repository::count_rows(&db, Table::Authors).await?, before);

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn test_book_ceiling_leaves_count_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_db(
        &dir,
        TableLimits {
            primary: 1,
            auxiliary: 500,
        },
    )
    .await?;
    populate(&db).await?;

    let english = catalog::list(&db, InfoKind::Language).await?.remove(0);
    let authors = catalog::list(&db, InfoKind::Author).await?;
    let genres = catalog::list(&db, InfoKind::Genre).await?;

    let err = books::create_book(
        &db,
        &NewBook {
            book: "Blue Ocean Shift".to_string(),
            isbn: "1250115779".to_string(),
            price: 18.99,
            pages: 336,
            stock_count: 2,
            language_id: english.id,
            author_ids: authors.iter().map(|a| a.id).collect(),
            genre_ids: genres.iter().map(|g| g.id).collect(),
        },
    )
    .await
    .expect_err("ceiling reached");

    assert!(matches!(err, StoreError::CapacityExceeded { ceiling: 1, .. }));
    assert_eq!(repository::count_rows(&db, Table::Books).await?, 1);
    assert_eq!(repository::count_rows(&db, Table::BooksAuthors).await?, 2);

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn test_data_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    let db = open_db(&dir, TableLimits::default()).await?;
    populate(&db).await?;
    db.close().await;

    let db = open_db(&dir, TableLimits::default()).await?;
    let all = read_all_books(&db, &SelfHealingPolicy::disabled(), &SampleDataSeeder).await?;
    assert_eq!(all.len(), 1);

    let deleted = books::delete_book(&db, all[0].book_id).await?;
    assert_eq!(deleted.isbn, BLUE_OCEAN_ISBN);
    let all = read_all_books(&db, &SelfHealingPolicy::disabled(), &SampleDataSeeder).await?;
    assert!(all.is_empty());

    db.close().await;
    Ok(())
}
