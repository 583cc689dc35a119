//! Static binding of record types to SQLite tables.
//!
//! The composition root builds one [`Schema`] at startup and hands it to the
//! SQLite store, which creates every bound table when it opens.

use std::any::TypeId;
use std::collections::HashMap;

use super::error::{Result, StoreError};
use super::traits::Record;

/// Column holding the record as JSON text.
pub const DATA_COLUMN: &str = "data";

/// Name of the completeness ledger table.
pub const LEDGER_TABLE: &str = "has_all";

/// Schema for the completeness ledger.
const LEDGER_SCHEMA: &str = r#"
-- One row per record type that has been declared complete
CREATE TABLE IF NOT EXISTS has_all (
    type_name TEXT PRIMARY KEY,
    complete INTEGER NOT NULL DEFAULT 0
);
"#;

/// Association of one record type with its table.
#[derive(Debug, Clone)]
pub struct TableBinding {
  type_name: &'static str,
  table: String,
  key_field: String,
}

impl TableBinding {
  /// Stable type identifier, used as the ledger row key.
  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  pub fn table(&self) -> &str {
    &self.table
  }

  /// Primary-key attribute; also the name of the key column.
  pub fn key_field(&self) -> &str {
    &self.key_field
  }

  pub(crate) fn quoted_table(&self) -> String {
    quote(&self.table)
  }

  pub(crate) fn quoted_key(&self) -> String {
    quote(&self.key_field)
  }

  fn create_statement(&self) -> String {
    format!(
      "CREATE TABLE IF NOT EXISTS {} ({} PRIMARY KEY, {} TEXT NOT NULL);",
      self.quoted_table(),
      self.quoted_key(),
      DATA_COLUMN
    )
  }
}

/// Registry of table bindings, keyed by record type.
#[derive(Debug, Clone, Default)]
pub struct Schema {
  bindings: HashMap<TypeId, TableBinding>,
}

impl Schema {
  pub fn new() -> Self {
    Self::default()
  }

  /// Bind `T` to `table`, keyed by its serialized attribute `T::key_field()`.
  ///
  /// Table and field names must be plain identifiers. Binding the same type
  /// twice, reusing a table, or reusing a type name is rejected. SQLite
  /// compares identifiers case-insensitively, so these checks do too.
  pub fn bind<T: Record>(mut self, table: &str) -> Result<Self> {
    let key_field = T::key_field();
    if !is_identifier(table) || table.eq_ignore_ascii_case(LEDGER_TABLE) {
      return Err(StoreError::Binding(format!(
        "invalid table name '{}' for {}",
        table,
        T::type_name()
      )));
    }
    if !is_identifier(key_field) || key_field.eq_ignore_ascii_case(DATA_COLUMN) {
      return Err(StoreError::Binding(format!(
        "invalid key field '{}' for {}",
        key_field,
        T::type_name()
      )));
    }

    for existing in self.bindings.values() {
      if existing.table.eq_ignore_ascii_case(table) {
        return Err(StoreError::Binding(format!(
          "table '{}' is already bound to {}",
          table, existing.type_name
        )));
      }
      if existing.type_name == T::type_name() {
        return Err(StoreError::Binding(format!(
          "type name '{}' is already bound",
          T::type_name()
        )));
      }
    }

    self.bindings.insert(
      TypeId::of::<T>(),
      TableBinding {
        type_name: T::type_name(),
        table: table.to_string(),
        key_field: key_field.to_string(),
      },
    );
    Ok(self)
  }

  /// Binding for `T`, or [`StoreError::Unbound`].
  pub fn binding<T: Record>(&self) -> Result<&TableBinding> {
    self
      .bindings
      .get(&TypeId::of::<T>())
      .ok_or(StoreError::Unbound(T::type_name()))
  }

  pub fn bindings(&self) -> impl Iterator<Item = &TableBinding> {
    self.bindings.values()
  }

  /// DDL for the ledger and every bound table.
  pub fn ddl(&self) -> String {
    let mut ddl = String::from(LEDGER_SCHEMA);
    for binding in self.bindings.values() {
      ddl.push_str(&binding.create_statement());
      ddl.push('\n');
    }
    ddl
  }
}

/// True for ASCII identifiers safe to splice into SQL and JSON paths.
pub(crate) fn is_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
    _ => return false,
  }
  chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote(identifier: &str) -> String {
  format!("\"{}\"", identifier)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::traits::Key;
  use serde::{Deserialize, Serialize};

  #[derive(Debug, Clone, Serialize, Deserialize)]
  struct Widget {
    id: i64,
  }

  impl Record for Widget {
    fn type_name() -> &'static str {
      "test.widget"
    }

    fn key_field() -> &'static str {
      "id"
    }

    fn cache_key(&self) -> Key {
      Key::Int(self.id)
    }
  }

  #[derive(Debug, Clone, Serialize, Deserialize)]
  struct Gadget {
    name: String,
  }

  impl Record for Gadget {
    fn type_name() -> &'static str {
      "test.gadget"
    }

    fn key_field() -> &'static str {
      "name"
    }

    fn cache_key(&self) -> Key {
      Key::Text(self.name.clone())
    }
  }

  #[derive(Debug, Clone, Serialize, Deserialize)]
  struct Shadow {
    #[serde(rename = "Data")]
    data: i64,
  }

  impl Record for Shadow {
    fn type_name() -> &'static str {
      "test.shadow"
    }

    fn key_field() -> &'static str {
      "Data"
    }

    fn cache_key(&self) -> Key {
      Key::Int(self.data)
    }
  }

  #[derive(Debug, Clone, Serialize, Deserialize)]
  struct Injected {
    id: i64,
  }

  impl Record for Injected {
    fn type_name() -> &'static str {
      "test.injected"
    }

    fn key_field() -> &'static str {
      "id; DROP"
    }

    fn cache_key(&self) -> Key {
      Key::Int(self.id)
    }
  }

  #[test]
  fn test_bind_and_lookup() {
    let schema = Schema::new().bind::<Widget>("widget").unwrap();
    let binding = schema.binding::<Widget>().unwrap();
    assert_eq!(binding.table(), "widget");
    assert_eq!(binding.key_field(), "id");
    assert_eq!(binding.type_name(), "test.widget");
  }

  #[test]
  fn test_unbound_type() {
    let schema = Schema::new().bind::<Widget>("widget").unwrap();
    match schema.binding::<Gadget>() {
      Err(StoreError::Unbound(name)) => assert_eq!(name, "test.gadget"),
      other => panic!("expected unbound error, got {:?}", other),
    }
  }

  #[test]
  fn test_rejects_bad_identifiers() {
    assert!(Schema::new().bind::<Widget>("wid get").is_err());
    assert!(Schema::new().bind::<Injected>("injected").is_err());
    assert!(Schema::new().bind::<Widget>("1widget").is_err());
  }

  #[test]
  fn test_rejects_reserved_names_in_any_case() {
    assert!(Schema::new().bind::<Widget>("has_all").is_err());
    assert!(Schema::new().bind::<Widget>("HAS_ALL").is_err());
    assert!(Schema::new().bind::<Widget>("Has_All").is_err());
    assert!(Schema::new().bind::<Shadow>("shadow").is_err());
  }

  #[test]
  fn test_key_field_comes_from_record() {
    let schema = Schema::new()
      .bind::<Widget>("widget")
      .unwrap()
      .bind::<Gadget>("gadget")
      .unwrap();
    assert_eq!(schema.binding::<Widget>().unwrap().key_field(), Widget::key_field());
    assert_eq!(schema.binding::<Gadget>().unwrap().key_field(), "name");
  }

  #[test]
  fn test_rejects_shared_table() {
    let result = Schema::new()
      .bind::<Widget>("things")
      .unwrap()
      .bind::<Gadget>("Things");
    assert!(result.is_err());
  }

  #[test]
  fn test_ddl_covers_every_table() {
    let schema = Schema::new()
      .bind::<Widget>("widget")
      .unwrap()
      .bind::<Gadget>("gadget")
      .unwrap();
    let ddl = schema.ddl();
    assert!(ddl.contains("CREATE TABLE IF NOT EXISTS has_all"));
    assert!(ddl.contains("CREATE TABLE IF NOT EXISTS \"widget\" (\"id\" PRIMARY KEY"));
    assert!(ddl.contains("CREATE TABLE IF NOT EXISTS \"gadget\" (\"name\" PRIMARY KEY"));
  }
}
