//! In-process store backed by nested `HashMap`s.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::batch::pair_up;
use super::error::Result;
use super::records::Records;
use super::traits::{DataStore, Key, OneOrMany, Record, RecordType};

type Partition = HashMap<Key, Box<dyn Any + Send + Sync>>;

/// Volatile cache of records, partitioned by record type.
///
/// Keys are whatever the caller passes to `store`; `key_field` is ignored on
/// lookup. Storing under an existing key replaces the previous record.
#[derive(Default)]
pub struct MemoryStore {
  partitions: HashMap<TypeId, Partition>,
  complete: HashMap<TypeId, bool>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn partition<T: Record>(&self) -> Option<&Partition> {
    self.partitions.get(&TypeId::of::<T>())
  }

  fn lookup<T: Record>(partition: Option<&Partition>, key: &Key) -> Option<T> {
    partition?.get(key)?.downcast_ref::<T>().cloned()
  }

  fn snapshot<T: Record>(&self) -> Vec<T> {
    self
      .partition::<T>()
      .map(|partition| {
        partition
          .values()
          .filter_map(|obj| obj.downcast_ref::<T>().cloned())
          .collect()
      })
      .unwrap_or_default()
  }
}

impl std::fmt::Debug for MemoryStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MemoryStore")
      .field("partitions", &self.partitions.len())
      .field("records", &self.partitions.values().map(HashMap::len).sum::<usize>())
      .finish()
  }
}

impl DataStore for MemoryStore {
  fn has_all<T: Record>(&self) -> Result<bool> {
    Ok(
      self
        .complete
        .get(&TypeId::of::<T>())
        .copied()
        .unwrap_or(false),
    )
  }

  fn get_all<T: Record>(&self) -> Result<Vec<T>> {
    Ok(self.snapshot())
  }

  fn iterate<T: Record>(&self) -> Result<Records<T>> {
    Ok(Records::loaded(self.snapshot()))
  }

  fn get<T: Record>(&self, keys: OneOrMany<Key>, _key_field: &str) -> Result<OneOrMany<Option<T>>> {
    let partition = self.partition::<T>();
    Ok(keys.map(|key| Self::lookup(partition, &key)))
  }

  fn store<T: Record>(
    &mut self,
    objs: OneOrMany<T>,
    keys: OneOrMany<Key>,
    complete_sets: &[RecordType],
  ) -> Result<()> {
    let pairs = pair_up(objs, keys)?;

    if !pairs.is_empty() {
      let partition = self.partitions.entry(TypeId::of::<T>()).or_default();
      for (obj, key) in pairs {
        partition.insert(key, Box::new(obj));
      }
    }

    for record_type in complete_sets {
      self.complete.insert(record_type.id(), true);
    }

    Ok(())
  }

  fn close(self) -> Result<()> {
    Ok(())
  }
}
