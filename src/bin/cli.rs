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


use anyhow::Context;
use clap::{Parser, Subcommand};
use inventory_core::storage::{
    books, catalog, populate, query_books, read_all_books, BookQuery, Column, InfoKind,
    SampleDataSeeder, Table,
};
use inventory_core::{Database, StoreConfig, StoreError};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_PATH: &str = "inventory.db";

#[derive(Parser)]
#[command(name = "inventory-cli")]
#[command(about = "Bookstore inventory CLI - inspect and edit the inventory database", long_about = None)]
struct Cli {
    /// SQLite database file (overrides BOOKSTORE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert the sample inventory (safe to run twice)
    Seed,
    /// List books, seeding an empty database first
    Books {
        /// Only books whose title or ISBN contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Column to order by, e.g. `price` or `books.book`
        #[arg(short, long)]
        order: Option<String>,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        /// Maximum number of books
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show one book
    Book { id: i64 },
    /// Add an author, genre or language
    Add { kind: String, name: String },
    /// List authors, genres or languages
    List { kind: String },
    /// Delete a book, author, genre or language
    Delete { kind: String, id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = StoreConfig::from_env().context("Failed to load configuration")?;
    if let Some(path) = cli.db {
        config.database_path = Some(path);
    } else if config.database_path.is_none() {
        config.database_path = Some(PathBuf::from(DEFAULT_DB_PATH));
    }

    let db = Database::connect(&config)
        .await
        .context("Failed to open inventory database")?;
    let result = run(&db, &config, cli.command).await;
    db.close().await;

    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(err) => match err.downcast_ref::<StoreError>() {
            Some(store_err) => {
                eprintln!("Error ({}): {}", store_err.status_code(), store_err.user_message());
                std::process::exit(1);
            }
            None => Err(err),
        },
    }
}

async fn run(db: &Database, config: &StoreConfig, command: Commands) -> anyhow::Result<Value> {
    let value = match command {
        Commands::Seed => {
            populate(db).await?;
            json!({ "seeded": true })
        }
        Commands::Books {
            search,
            order,
            desc,
            limit,
        } => {
            let list = if search.is_none() && order.is_none() && limit.is_none() {
                read_all_books(db, &config.self_healing, &SampleDataSeeder).await?
            } else {
                let mut query = BookQuery::new().descending(desc);
                if let Some(text) = search {
                    query = query.search(text);
                }
                if let Some(order) = order {
                    query = query.order_by(Column::parse(&order, Table::Books)?);
                }
                if let Some(limit) = limit {
                    query = query.limit(limit);
                }
                query_books(db, &query).await?
            };
            serde_json::to_value(list)?
        }
        Commands::Book { id } => serde_json::to_value(books::read_book(db, id).await?)?,
        Commands::Add { kind, name } => {
            let kind: InfoKind = kind.parse()?;
            serde_json::to_value(catalog::create(db, kind, &name).await?)?
        }
        Commands::List { kind } => {
            let kind: InfoKind = kind.parse()?;
            serde_json::to_value(catalog::list(db, kind).await?)?
        }
        Commands::Delete { kind, id } => {
            if matches!(kind.trim().to_ascii_lowercase().as_str(), "book" | "books") {
                serde_json::to_value(books::delete_book(db, id).await?)?
            } else {
                let kind: InfoKind = kind.parse()?;
                serde_json::to_value(catalog::delete(db, kind, id).await?)?
            }
        }
    };
    Ok(value)
}
