//! SQLite-backed store implementation.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info};

use super::batch::pair_up;
use super::error::{Result, StoreError};
use super::records::Records;
use super::schema::{is_identifier, Schema, TableBinding, DATA_COLUMN};
use super::traits::{DataStore, Key, OneOrMany, Record, RecordType};

/// Upper bound on bound parameters in a single `IN (...)` list. This is
/// SQLite's default `SQLITE_MAX_VARIABLE_NUMBER` since 3.32, so any batch
/// below it is checked with exactly one query.
const MAX_PARAMS_PER_QUERY: usize = 32766;

/// Durable store with one table per bound record type.
///
/// Records are written once: storing a record whose primary key already
/// exists leaves the stored row untouched and drops the incoming record.
/// Each `store` call commits in a single transaction.
#[derive(Debug)]
pub struct SqliteStore {
  conn: Connection,
  schema: Schema,
}

impl SqliteStore {
  /// Open (or create) a database file and create every bound table.
  pub fn open(path: &Path, schema: Schema) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
      }
    }

    let conn = Connection::open(path)?;
    info!(path = %path.display(), "opened sqlite store");
    Self::with_connection(conn, schema)
  }

  /// Open a private in-memory database.
  pub fn open_in_memory(schema: Schema) -> Result<Self> {
    Self::with_connection(Connection::open_in_memory()?, schema)
  }

  fn with_connection(conn: Connection, schema: Schema) -> Result<Self> {
    conn.execute_batch(&schema.ddl())?;
    Ok(Self { conn, schema })
  }

  /// Every stored row of `T`, still encoded.
  fn load_rows<T: Record>(&self) -> Result<Vec<String>> {
    let binding = self.schema.binding::<T>()?;
    let mut stmt = self.conn.prepare(&format!(
      "SELECT {} FROM {}",
      DATA_COLUMN,
      binding.quoted_table()
    ))?;
    let rows = stmt
      .query_map([], |row| row.get::<_, String>(0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
  }

  /// Records of `T` whose `key_field` matches one of `keys`, by key.
  fn find_matching<T: Record>(
    &self,
    binding: &TableBinding,
    key_field: &str,
    keys: &[Key],
  ) -> Result<HashMap<Key, T>> {
    let column = match_expression(binding, key_field)?;
    let mut found = HashMap::new();

    for chunk in batches(&distinct(keys)) {
      let sql = format!(
        "SELECT {column}, {data} FROM {table} WHERE {column} IN ({params})",
        column = column,
        data = DATA_COLUMN,
        table = binding.quoted_table(),
        params = placeholders(chunk.len()),
      );
      let mut stmt = self.conn.prepare_cached(&sql)?;
      let rows = stmt
        .query_map(params_from_iter(chunk.iter()), |row| {
          Ok((row.get::<_, Value>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

      for (value, data) in rows {
        // A stored value may equal a key without being one (2.0 vs 2).
        let Some(key) = key_from_value(value) else {
          continue;
        };
        // First match wins when a non-unique field matches several rows.
        if !found.contains_key(&key) {
          found.insert(key, serde_json::from_str(&data)?);
        }
      }
    }

    Ok(found)
  }
}

impl DataStore for SqliteStore {
  fn has_all<T: Record>(&self) -> Result<bool> {
    let complete: Option<bool> = self
      .conn
      .query_row(
        "SELECT complete FROM has_all WHERE type_name = ?1",
        params![T::type_name()],
        |row| row.get(0),
      )
      .optional()?;

    Ok(complete.unwrap_or(false))
  }

  fn get_all<T: Record>(&self) -> Result<Vec<T>> {
    self
      .load_rows::<T>()?
      .iter()
      .map(|data| serde_json::from_str(data).map_err(StoreError::from))
      .collect()
  }

  fn iterate<T: Record>(&self) -> Result<Records<T>> {
    Ok(Records::encoded(self.load_rows::<T>()?))
  }

  fn get<T: Record>(&self, keys: OneOrMany<Key>, key_field: &str) -> Result<OneOrMany<Option<T>>> {
    let binding = self.schema.binding::<T>()?;

    match keys {
      OneOrMany::One(key) => {
        let mut found = self.find_matching::<T>(binding, key_field, std::slice::from_ref(&key))?;
        Ok(OneOrMany::One(found.remove(&key)))
      }
      OneOrMany::Many(keys) => {
        let found = self.find_matching::<T>(binding, key_field, &keys)?;
        Ok(OneOrMany::Many(
          keys.iter().map(|key| found.get(key).cloned()).collect(),
        ))
      }
    }
  }

  fn store<T: Record>(
    &mut self,
    objs: OneOrMany<T>,
    keys: OneOrMany<Key>,
    complete_sets: &[RecordType],
  ) -> Result<()> {
    // Rows are keyed by the bound primary-key attribute, not by `keys`.
    let pairs = pair_up(objs, keys)?;

    let mut candidates = Vec::with_capacity(pairs.len());
    let binding = if pairs.is_empty() {
      None
    } else {
      let binding = self.schema.binding::<T>()?;
      for (obj, _) in pairs {
        let value = serde_json::to_value(&obj)?;
        let key = extract_key(&value, binding)?;
        candidates.push((key, value.to_string()));
      }
      Some(binding)
    };

    let tx = self.conn.transaction()?;
    if let Some(binding) = binding {
      insert_new(&tx, binding, candidates)?;
    }
    if !complete_sets.is_empty() {
      mark_complete(&tx, complete_sets)?;
    }
    tx.commit()?;

    Ok(())
  }

  fn close(self) -> Result<()> {
    self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
    info!("closed sqlite store");
    Ok(())
  }
}

/// Insert every candidate whose key is not already stored.
///
/// Existing keys are found with one `IN (...)` query for the whole batch
/// rather than a lookup per record. Duplicate keys within the batch collapse to the last
/// occurrence.
fn insert_new(
  conn: &Connection,
  binding: &TableBinding,
  candidates: Vec<(Key, String)>,
) -> Result<usize> {
  let total = candidates.len();
  let mut order = Vec::with_capacity(total);
  let mut pending: HashMap<Key, String> = HashMap::with_capacity(total);
  for (key, data) in candidates {
    if pending.insert(key.clone(), data).is_none() {
      order.push(key);
    }
  }

  let existing = existing_keys(conn, binding, &order)?;

  let mut stmt = conn.prepare_cached(&format!(
    "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
    binding.quoted_table(),
    binding.quoted_key(),
    DATA_COLUMN
  ))?;

  let mut inserted = 0;
  for key in order {
    if existing.contains(&key) {
      continue;
    }
    if let Some(data) = pending.remove(&key) {
      stmt.execute(params![key, data])?;
      inserted += 1;
    }
  }

  debug!(
    table = binding.table(),
    candidates = total,
    existing = existing.len(),
    inserted,
    "stored batch"
  );
  Ok(inserted)
}

/// Which of `keys` already have a row in the bound table.
fn existing_keys(conn: &Connection, binding: &TableBinding, keys: &[Key]) -> Result<HashSet<Key>> {
  let mut existing = HashSet::new();

  for chunk in batches(keys) {
    let sql = format!(
      "SELECT {key} FROM {table} WHERE {key} IN ({params})",
      key = binding.quoted_key(),
      table = binding.quoted_table(),
      params = placeholders(chunk.len()),
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let found = stmt.query_map(params_from_iter(chunk.iter()), |row| row.get::<_, Key>(0))?;
    for key in found {
      existing.insert(key?);
    }
  }

  Ok(existing)
}

/// Set the ledger flag for every requested type.
fn mark_complete(conn: &Connection, complete_sets: &[RecordType]) -> Result<()> {
  let names: Vec<&str> = complete_sets
    .iter()
    .map(RecordType::name)
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect();

  let mut current: HashMap<String, bool> = HashMap::new();
  for chunk in batches(&names) {
    let sql = format!(
      "SELECT type_name, complete FROM has_all WHERE type_name IN ({})",
      placeholders(chunk.len())
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
      Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
    })?;
    for row in rows {
      let (name, complete) = row?;
      current.insert(name, complete);
    }
  }

  for name in names {
    match current.get(name) {
      Some(true) => {}
      Some(false) => {
        conn.execute(
          "UPDATE has_all SET complete = 1 WHERE type_name = ?1",
          params![name],
        )?;
        debug!(type_name = name, "marked complete");
      }
      None => {
        conn.execute(
          "INSERT INTO has_all (type_name, complete) VALUES (?1, 1)",
          params![name],
        )?;
        debug!(type_name = name, "marked complete");
      }
    }
  }

  Ok(())
}

/// SQL expression that yields `key_field` for each row of the bound table.
///
/// The primary key has its own column; any other attribute is read out of
/// the stored JSON.
fn match_expression(binding: &TableBinding, key_field: &str) -> Result<String> {
  if key_field == binding.key_field() {
    Ok(binding.quoted_key())
  } else if is_identifier(key_field) {
    Ok(format!("json_extract({}, '$.{}')", DATA_COLUMN, key_field))
  } else {
    Err(StoreError::Validation(format!(
      "invalid key field '{}'",
      key_field
    )))
  }
}

fn extract_key(value: &serde_json::Value, binding: &TableBinding) -> Result<Key> {
  value
    .get(binding.key_field())
    .and_then(Key::from_json)
    .ok_or_else(|| {
      StoreError::Binding(format!(
        "{} record has no integer or string '{}' field",
        binding.type_name(),
        binding.key_field()
      ))
    })
}

/// Read a matched column value back as a key. Integral reals come back as
/// integer keys; anything else that is not an integer or text is no key.
fn key_from_value(value: Value) -> Option<Key> {
  match value {
    Value::Integer(i) => Some(Key::Int(i)),
    Value::Text(s) => Some(Key::Text(s)),
    Value::Real(r) if r.fract() == 0.0 && r >= i64::MIN as f64 && r < i64::MAX as f64 => {
      Some(Key::Int(r as i64))
    }
    _ => None,
  }
}

/// Split parameters into `IN (...)` lists SQLite accepts in one statement.
fn batches<T>(items: &[T]) -> std::slice::Chunks<'_, T> {
  items.chunks(MAX_PARAMS_PER_QUERY)
}

fn distinct(keys: &[Key]) -> Vec<&Key> {
  let mut seen = HashSet::with_capacity(keys.len());
  keys.iter().filter(|key| seen.insert(*key)).collect()
}

fn placeholders(n: usize) -> String {
  vec!["?"; n].join(", ")
}
