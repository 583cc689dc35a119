//! Core traits and types for the data store.

use std::any::TypeId;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::error::Result;
use super::records::Records;

/// Lookup key for a stored record.
///
/// API identifiers are either numeric ids or strings, and the two never
/// compare equal to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
  Int(i64),
  Text(String),
}

impl Key {
  /// Read a key out of a JSON value. Only integers and strings qualify.
  pub fn from_json(value: &serde_json::Value) -> Option<Self> {
    match value {
      serde_json::Value::Number(n) => n.as_i64().map(Key::Int),
      serde_json::Value::String(s) => Some(Key::Text(s.clone())),
      _ => None,
    }
  }
}

impl fmt::Display for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Key::Int(i) => write!(f, "{}", i),
      Key::Text(s) => f.write_str(s),
    }
  }
}

/// Parses digits as an integer key, anything else as a text key.
impl FromStr for Key {
  type Err = Infallible;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    Ok(match s.parse::<i64>() {
      Ok(i) => Key::Int(i),
      Err(_) => Key::Text(s.to_string()),
    })
  }
}

impl From<i64> for Key {
  fn from(value: i64) -> Self {
    Key::Int(value)
  }
}

impl From<&str> for Key {
  fn from(value: &str) -> Self {
    Key::Text(value.to_string())
  }
}

impl From<String> for Key {
  fn from(value: String) -> Self {
    Key::Text(value)
  }
}

impl ToSql for Key {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    match self {
      Key::Int(i) => i.to_sql(),
      Key::Text(s) => s.to_sql(),
    }
  }
}

impl FromSql for Key {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    match value {
      ValueRef::Integer(i) => Ok(Key::Int(i)),
      ValueRef::Text(_) => String::column_result(value).map(Key::Text),
      _ => Err(FromSqlError::InvalidType),
    }
  }
}

/// Either a single value or a sequence of values.
///
/// `store` and `get` accept both shapes; the shape of a `get` result always
/// mirrors the shape of the keys it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOrMany<T> {
  One(T),
  Many(Vec<T>),
}

impl<T> OneOrMany<T> {
  pub fn len(&self) -> usize {
    match self {
      OneOrMany::One(_) => 1,
      OneOrMany::Many(items) => items.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn into_vec(self) -> Vec<T> {
    match self {
      OneOrMany::One(item) => vec![item],
      OneOrMany::Many(items) => items,
    }
  }

  pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> OneOrMany<U> {
    match self {
      OneOrMany::One(item) => OneOrMany::One(f(item)),
      OneOrMany::Many(items) => OneOrMany::Many(items.into_iter().map(f).collect()),
    }
  }
}

/// Trait for domain objects that can be stored.
///
/// Every implementor is its own partition: records of different types never
/// share a key space.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Stable identifier for the type (e.g. "riot.summoner"). Used as the
  /// completeness ledger's row key, so it must not change between releases.
  fn type_name() -> &'static str;

  /// Serialized attribute that `cache_key` reads.
  fn key_field() -> &'static str;

  /// The key this record is looked up by.
  fn cache_key(&self) -> Key;
}

/// Runtime handle for a record type, used to name types in complete-set
/// arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordType {
  id: TypeId,
  name: &'static str,
}

impl RecordType {
  pub fn of<T: Record>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: T::type_name(),
    }
  }

  pub fn id(&self) -> TypeId {
    self.id
  }

  pub fn name(&self) -> &'static str {
    self.name
  }
}

/// Operations every store backend provides.
///
/// Lookups never fail for missing data: an unknown key comes back as `None`
/// and an unknown type as an empty result. `store` takes `&mut self`, so a
/// backend shared between threads needs an outer lock.
pub trait DataStore {
  /// Whether every instance of `T` that exists upstream has been stored.
  fn has_all<T: Record>(&self) -> Result<bool>;

  /// All stored records of `T`, in no particular order.
  fn get_all<T: Record>(&self) -> Result<Vec<T>>;

  /// Lazy iterator over a snapshot of the stored records of `T`.
  ///
  /// Each call takes a fresh snapshot. Records stored after the call may or
  /// may not be observed.
  fn iterate<T: Record>(&self) -> Result<Records<T>>;

  /// Look up one or more records.
  ///
  /// The result has the same shape as `keys`, with `None` in every position
  /// whose key was not found. `key_field` names the attribute matched by
  /// backends that extract keys from stored records.
  fn get<T: Record>(&self, keys: OneOrMany<Key>, key_field: &str) -> Result<OneOrMany<Option<T>>>;

  /// Store records under the given keys and mark `complete_sets` complete.
  ///
  /// `objs` and `keys` must have the same shape (and length, for sequences)
  /// or a validation error is returned and nothing is written.
  fn store<T: Record>(
    &mut self,
    objs: OneOrMany<T>,
    keys: OneOrMany<Key>,
    complete_sets: &[RecordType],
  ) -> Result<()>;

  /// Release the backend's resources.
  fn close(self) -> Result<()>
  where
    Self: Sized;

  fn get_one<T: Record>(&self, key: Key, key_field: &str) -> Result<Option<T>> {
    match self.get::<T>(OneOrMany::One(key), key_field)? {
      OneOrMany::One(found) => Ok(found),
      OneOrMany::Many(mut found) => Ok(found.pop().flatten()),
    }
  }

  fn get_many<T: Record>(&self, keys: Vec<Key>, key_field: &str) -> Result<Vec<Option<T>>> {
    Ok(self.get::<T>(OneOrMany::Many(keys), key_field)?.into_vec())
  }

  fn store_one<T: Record>(&mut self, obj: T, key: Key) -> Result<()> {
    self.store(OneOrMany::One(obj), OneOrMany::One(key), &[])
  }

  fn store_many<T: Record>(
    &mut self,
    objs: Vec<T>,
    keys: Vec<Key>,
    complete_sets: &[RecordType],
  ) -> Result<()> {
    self.store(OneOrMany::Many(objs), OneOrMany::Many(keys), complete_sets)
  }

  /// Mark `T` complete without storing anything.
  fn mark_complete<T: Record>(&mut self) -> Result<()> {
    self.store::<T>(
      OneOrMany::Many(Vec::new()),
      OneOrMany::Many(Vec::new()),
      &[RecordType::of::<T>()],
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_key_parse() {
    assert_eq!("42".parse::<Key>().unwrap(), Key::Int(42));
    assert_eq!("-7".parse::<Key>().unwrap(), Key::Int(-7));
    assert_eq!("abc".parse::<Key>().unwrap(), Key::Text("abc".into()));
  }

  #[test]
  fn test_key_from_json() {
    assert_eq!(Key::from_json(&serde_json::json!(5)), Some(Key::Int(5)));
    assert_eq!(Key::from_json(&serde_json::json!("x")), Some(Key::from("x")));
    assert_eq!(Key::from_json(&serde_json::json!(1.5)), None);
    assert_eq!(Key::from_json(&serde_json::json!(null)), None);
  }

  #[test]
  fn test_int_and_text_keys_differ() {
    assert_ne!(Key::from(1), Key::from("1"));
  }

  #[test]
  fn test_one_or_many_map_keeps_shape() {
    assert_eq!(OneOrMany::One(2).map(|x| x * 2), OneOrMany::One(4));
    assert_eq!(
      OneOrMany::Many(vec![1, 2]).map(|x| x + 1),
      OneOrMany::Many(vec![2, 3])
    );
    assert!(OneOrMany::Many(Vec::<i32>::new()).is_empty());
    assert!(!OneOrMany::One(0).is_empty());
  }
}
