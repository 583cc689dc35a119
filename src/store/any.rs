//! Store selected at runtime from configuration.

use color_eyre::Result as EyreResult;

use crate::config::{Backend, StoreConfig};

use super::error::Result;
use super::memory::MemoryStore;
use super::records::Records;
use super::schema::Schema;
use super::sqlite::SqliteStore;
use super::traits::{DataStore, Key, OneOrMany, Record, RecordType};

/// Either backend, chosen by `store.backend` in the config file.
///
/// Callers hold an `AnyStore` and never need to know which backend is behind
/// it.
#[derive(Debug)]
pub enum AnyStore {
  Memory(MemoryStore),
  Sqlite(SqliteStore),
}

impl AnyStore {
  /// Open the configured backend. The schema is only used by SQLite.
  pub fn from_config(config: &StoreConfig, schema: Schema) -> EyreResult<Self> {
    let store = match config.backend {
      Backend::Memory => AnyStore::Memory(MemoryStore::new()),
      Backend::Sqlite => {
        let path = config.resolved_path()?;
        AnyStore::Sqlite(SqliteStore::open(&path, schema)?)
      }
    };
    Ok(store)
  }

  pub fn backend(&self) -> Backend {
    match self {
      AnyStore::Memory(_) => Backend::Memory,
      AnyStore::Sqlite(_) => Backend::Sqlite,
    }
  }
}

impl DataStore for AnyStore {
  fn has_all<T: Record>(&self) -> Result<bool> {
    match self {
      AnyStore::Memory(store) => store.has_all::<T>(),
      AnyStore::Sqlite(store) => store.has_all::<T>(),
    }
  }

  fn get_all<T: Record>(&self) -> Result<Vec<T>> {
    match self {
      AnyStore::Memory(store) => store.get_all(),
      AnyStore::Sqlite(store) => store.get_all(),
    }
  }

  fn iterate<T: Record>(&self) -> Result<Records<T>> {
    match self {
      AnyStore::Memory(store) => store.iterate(),
      AnyStore::Sqlite(store) => store.iterate(),
    }
  }

  fn get<T: Record>(&self, keys: OneOrMany<Key>, key_field: &str) -> Result<OneOrMany<Option<T>>> {
    match self {
      AnyStore::Memory(store) => store.get(keys, key_field),
      AnyStore::Sqlite(store) => store.get(keys, key_field),
    }
  }

  fn store<T: Record>(
    &mut self,
    objs: OneOrMany<T>,
    keys: OneOrMany<Key>,
    complete_sets: &[RecordType],
  ) -> Result<()> {
    match self {
      AnyStore::Memory(store) => store.store(objs, keys, complete_sets),
      AnyStore::Sqlite(store) => store.store(objs, keys, complete_sets),
    }
  }

  fn close(self) -> Result<()> {
    match self {
      AnyStore::Memory(store) => store.close(),
      AnyStore::Sqlite(store) => store.close(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::riot::{schema, Summoner};
  use std::path::PathBuf;

  fn summoner(id: i64, name: &str) -> Summoner {
    Summoner {
      id,
      name: name.to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn test_memory_from_config() {
    let config = StoreConfig {
      backend: Backend::Memory,
      path: None,
    };
    let store = AnyStore::from_config(&config, schema().unwrap()).unwrap();
    assert_eq!(store.backend(), Backend::Memory);
  }

  #[test]
  fn test_sqlite_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
      backend: Backend::Sqlite,
      path: Some(dir.path().join("cache.db")),
    };
    let mut store = AnyStore::from_config(&config, schema().unwrap()).unwrap();
    assert_eq!(store.backend(), Backend::Sqlite);

    store.store_one(summoner(1, "a"), Key::from(1)).unwrap();
    store.close().unwrap();
    assert!(dir.path().join("cache.db").exists());
  }

  /// Behaviour both backends must agree on.
  fn exercise_contract(mut store: AnyStore) {
    assert!(!store.has_all::<Summoner>().unwrap());
    assert!(store.get_all::<Summoner>().unwrap().is_empty());
    assert_eq!(store.get_one::<Summoner>(Key::from(1), "id").unwrap(), None);

    let objs = vec![summoner(1, "a"), summoner(2, "b"), summoner(3, "c")];
    let keys: Vec<Key> = objs.iter().map(Record::cache_key).collect();
    store.store_many(objs.clone(), keys.clone(), &[]).unwrap();

    let found = store.get_many::<Summoner>(keys, "id").unwrap();
    assert_eq!(found, objs.into_iter().map(Some).collect::<Vec<_>>());

    let err = store
      .store_many(vec![summoner(4, "d")], vec![], &[])
      .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(store.get_all::<Summoner>().unwrap().len(), 3);

    store
      .store_many(Vec::<Summoner>::new(), vec![], &[RecordType::of::<Summoner>()])
      .unwrap();
    assert!(store.has_all::<Summoner>().unwrap());
    store.store_one(summoner(5, "e"), Key::from(5)).unwrap();
    assert!(store.has_all::<Summoner>().unwrap());
    assert_eq!(store.iterate::<Summoner>().unwrap().count(), 4);

    store.close().unwrap();
  }

  #[test]
  fn test_backends_share_contract() {
    exercise_contract(AnyStore::Memory(MemoryStore::new()));
    exercise_contract(AnyStore::Sqlite(
      SqliteStore::open_in_memory(schema().unwrap()).unwrap(),
    ));
  }

  #[test]
  fn test_overwrite_asymmetry() {
    let mut memory = AnyStore::Memory(MemoryStore::new());
    let mut sqlite = AnyStore::Sqlite(SqliteStore::open_in_memory(schema().unwrap()).unwrap());

    for store in [&mut memory, &mut sqlite] {
      store.store_one(summoner(1, "first"), Key::from(1)).unwrap();
      store.store_one(summoner(1, "second"), Key::from(1)).unwrap();
    }

    let latest = memory.get_one::<Summoner>(Key::from(1), "id").unwrap().unwrap();
    let kept = sqlite.get_one::<Summoner>(Key::from(1), "id").unwrap().unwrap();
    assert_eq!(latest.name, "second");
    assert_eq!(kept.name, "first");
  }

  #[test]
  fn test_missing_sqlite_parent_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("a").join("b").join("cache.db");
    let config = StoreConfig {
      backend: Backend::Sqlite,
      path: Some(path.clone()),
    };
    AnyStore::from_config(&config, schema().unwrap()).unwrap();
    assert!(path.exists());
  }
}
