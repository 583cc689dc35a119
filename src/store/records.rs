//! Lazy, snapshot-based iteration over stored records.

use super::error::Result;

/// Iterator over a snapshot of one partition.
///
/// The memory backend hands over already-cloned records; the SQLite backend
/// hands over raw rows which are decoded one at a time as the cursor moves.
/// Running past the end returns `None`, never an error.
pub struct Records<T> {
  source: Source<T>,
}

enum Source<T> {
  Loaded(std::vec::IntoIter<T>),
  Encoded { rows: Vec<String>, cursor: usize },
}

impl<T> Records<T> {
  pub(crate) fn loaded(records: Vec<T>) -> Self {
    Self {
      source: Source::Loaded(records.into_iter()),
    }
  }

  pub(crate) fn encoded(rows: Vec<String>) -> Self {
    Self {
      source: Source::Encoded { rows, cursor: 0 },
    }
  }
}

impl<T: serde::de::DeserializeOwned> Iterator for Records<T> {
  type Item = Result<T>;

  fn next(&mut self) -> Option<Self::Item> {
    match &mut self.source {
      Source::Loaded(records) => records.next().map(Ok),
      Source::Encoded { rows, cursor } => {
        let data = rows.get(*cursor)?;
        *cursor += 1;
        Some(serde_json::from_str(data).map_err(Into::into))
      }
    }
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let remaining = match &self.source {
      Source::Loaded(records) => records.len(),
      Source::Encoded { rows, cursor } => rows.len().saturating_sub(*cursor),
    };
    (remaining, Some(remaining))
  }
}

impl<T: serde::de::DeserializeOwned> ExactSizeIterator for Records<T> {}
