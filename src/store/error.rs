//! Error type shared by both store backends.

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by a [`DataStore`](super::DataStore).
///
/// A missing key or an unknown type is never an error; lookups report those
/// as `None` or an empty result.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The arguments to `store` do not line up (single vs sequence, or lengths).
  #[error("validation error: {0}")]
  Validation(String),

  /// The record type was never registered with the schema.
  #[error("record type '{0}' has no schema binding")]
  Unbound(&'static str),

  /// A binding or a record does not fit its table definition.
  #[error("binding error: {0}")]
  Binding(String),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl StoreError {
  /// True for argument errors the caller must fix before retrying.
  pub fn is_validation(&self) -> bool {
    matches!(self, Self::Validation(_))
  }
}
