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


//! Storage core for a small bookstore inventory
//!
//! Books, their authors, genres and language live in SQLite. Everything the
//! rest of an application needs goes through [`storage`]; failures come back
//! as [`StoreError`] values already classified into conflict, not-found,
//! invalid and fatal kinds.
//!
//! The library never installs a tracing subscriber; the `cli` binary does.

pub mod config;
pub mod error;
pub mod storage;

pub use config::{SelfHealingPolicy, StoreConfig, TableLimits};
pub use error::{ErrorKind, Result, StoreError};
pub use storage::Database;
