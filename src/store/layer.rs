//! Cache layer that puts a store in front of network fetching.

use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use tracing::debug;

use super::traits::{DataStore, Key, OneOrMany, Record, RecordType};

/// Cache-first access to a store.
///
/// Every lookup consults the store first and only calls the fetcher for what
/// is missing, then writes the fetched records back. Nothing ever goes stale.
pub struct CacheLayer<S: DataStore> {
  store: S,
}

impl<S: DataStore> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(store: S) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn store_mut(&mut self) -> &mut S {
    &mut self.store
  }

  pub fn into_inner(self) -> S {
    self.store
  }

  /// Fetch a single record with caching.
  ///
  /// A fetcher that returns `None` (the record does not exist upstream)
  /// leaves the store untouched.
  pub async fn fetch_one<T, F, Fut>(&mut self, key: Key, fetcher: F) -> Result<CacheResult<Option<T>>>
  where
    T: Record,
    F: FnOnce(Key) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
  {
    if let Some(cached) = self.store.get_one::<T>(key.clone(), T::key_field())? {
      return Ok(CacheResult::from_cache(Some(cached)));
    }

    let fetched = fetcher(key.clone()).await?;
    if let Some(record) = &fetched {
      self.store.store_one(record.clone(), key)?;
    }
    Ok(CacheResult::from_network(fetched))
  }

  /// Fetch several records, only going to the network for cache misses.
  ///
  /// The fetcher receives the missing keys and must return one entry per key,
  /// in the same order. Results line up with `keys`.
  pub async fn fetch_many<T, F, Fut>(
    &mut self,
    keys: Vec<Key>,
    fetcher: F,
  ) -> Result<CacheResult<Vec<Option<T>>>>
  where
    T: Record,
    F: FnOnce(Vec<Key>) -> Fut,
    Fut: Future<Output = Result<Vec<Option<T>>>>,
  {
    let mut results = self.store.get_many::<T>(keys.clone(), T::key_field())?;

    let missing: Vec<usize> = results
      .iter()
      .enumerate()
      .filter(|(_, found)| found.is_none())
      .map(|(i, _)| i)
      .collect();
    if missing.is_empty() {
      return Ok(CacheResult::from_cache(results));
    }

    let missing_keys: Vec<Key> = missing.iter().map(|&i| keys[i].clone()).collect();
    let fetched = fetcher(missing_keys.clone()).await?;
    if fetched.len() != missing_keys.len() {
      return Err(eyre!(
        "Fetcher returned {} results for {} keys",
        fetched.len(),
        missing_keys.len()
      ));
    }

    let mut objs = Vec::new();
    let mut obj_keys = Vec::new();
    for ((&index, key), record) in missing.iter().zip(missing_keys).zip(fetched) {
      if let Some(record) = record {
        objs.push(record.clone());
        obj_keys.push(key);
        results[index] = Some(record);
      }
    }

    debug!(
      type_name = T::type_name(),
      requested = keys.len(),
      missing = missing.len(),
      fetched = objs.len(),
      "fetched cache misses"
    );
    if !objs.is_empty() {
      self.store.store_many(objs, obj_keys, &[])?;
    }

    let source = if missing.len() == keys.len() {
      CacheSource::Network
    } else {
      CacheSource::Partial
    };
    Ok(CacheResult { data: results, source })
  }

  /// Fetch every record of `T`.
  ///
  /// Once a full fetch has been stored the type is marked complete and later
  /// calls are served from the store alone.
  pub async fn fetch_all<T, F, Fut>(&mut self, fetcher: F) -> Result<CacheResult<Vec<T>>>
  where
    T: Record,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
  {
    if self.store.has_all::<T>()? {
      return Ok(CacheResult::from_cache(self.store.get_all::<T>()?));
    }

    let data = fetcher().await?;
    let keys = data.iter().map(Record::cache_key).collect();
    self.store.store(
      OneOrMany::Many(data.clone()),
      OneOrMany::Many(keys),
      &[RecordType::of::<T>()],
    )?;
    Ok(CacheResult::from_network(data))
  }
}

/// Result from a cache operation, including data and where it came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Everything came from the network
  Network,
  /// Everything came from the store
  Cache,
  /// Some from the store, the rest from the network
  Partial,
}
