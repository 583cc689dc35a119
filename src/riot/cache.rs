//! Store bindings for the API record types.

use crate::store::{Key, Record, Result, Schema};

use super::types::{MatchDetail, Summoner};

// ============================================================================
// Record implementations
// ============================================================================

impl Record for Summoner {
  fn type_name() -> &'static str {
    "riot.summoner"
  }

  fn key_field() -> &'static str {
    "id"
  }

  fn cache_key(&self) -> Key {
    Key::Int(self.id)
  }
}

impl Record for MatchDetail {
  fn type_name() -> &'static str {
    "riot.match_detail"
  }

  fn key_field() -> &'static str {
    "matchId"
  }

  fn cache_key(&self) -> Key {
    Key::Int(self.match_id)
  }
}

// ============================================================================
// Schema
// ============================================================================

/// Table bindings for every record type. Built once at startup, before the
/// SQLite store is opened.
pub fn schema() -> Result<Schema> {
  Schema::new()
    .bind::<Summoner>("summoner")?
    .bind::<MatchDetail>("match_detail")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{DataStore, RecordType, SqliteStore};

  #[test]
  fn test_schema_binds_all_types() {
    let schema = schema().unwrap();
    assert_eq!(schema.binding::<Summoner>().unwrap().table(), "summoner");
    assert_eq!(schema.binding::<MatchDetail>().unwrap().key_field(), "matchId");
    assert_eq!(schema.bindings().count(), 2);
  }

  #[test]
  fn test_matches_stored_by_match_id() {
    let mut store = SqliteStore::open_in_memory(schema().unwrap()).unwrap();
    let detail = MatchDetail {
      match_id: 42,
      region: "EUW".into(),
      ..Default::default()
    };
    store
      .store_many(
        vec![detail.clone()],
        vec![detail.cache_key()],
        &[RecordType::of::<MatchDetail>()],
      )
      .unwrap();

    assert_eq!(
      store.get_one::<MatchDetail>(Key::from(42), "matchId").unwrap(),
      Some(detail.clone())
    );
    assert_eq!(
      store
        .get_many::<MatchDetail>(vec![Key::from("EUW")], "region")
        .unwrap(),
      vec![Some(detail)]
    );
    assert!(store.has_all::<MatchDetail>().unwrap());
    assert!(!store.has_all::<Summoner>().unwrap());
  }
}
