//! Typed data store for records fetched from the remote API.
//!
//! This module provides:
//! - A single `DataStore` contract with `has_all`, `get_all`, `iterate`, `get`, `store`
//! - An in-memory backend (latest write wins)
//! - A SQLite backend with one table per bound type (first write wins)
//! - A per-type completeness ledger: "every instance that exists has been stored"
//! - A cache layer that fetches only what the store is missing

mod any;
mod batch;
mod error;
mod layer;
mod memory;
mod records;
mod schema;
mod sqlite;
mod traits;

pub use any::AnyStore;
pub use error::{Result, StoreError};
pub use layer::{CacheLayer, CacheResult, CacheSource};
pub use memory::MemoryStore;
pub use records::Records;
pub use schema::{Schema, TableBinding};
pub use sqlite::SqliteStore;
pub use traits::{DataStore, Key, OneOrMany, Record, RecordType};
