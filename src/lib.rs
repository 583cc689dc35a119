//! # apicache
//!
//! Typed cache and persistent store for objects fetched from a remote game
//! API, so repeated lookups avoid redundant remote calls.
//!
//! - `store`: the `DataStore` contract, its memory and SQLite backends, and
//!   a cache-first fetch layer
//! - `riot`: API record types and their table bindings
//! - `config`, `logging`: setup for the CLI

pub mod config;
pub mod logging;
pub mod riot;
pub mod store;

pub use store::{
  AnyStore, CacheLayer, DataStore, Key, MemoryStore, OneOrMany, Record, RecordType, Schema,
  SqliteStore, StoreError,
};
