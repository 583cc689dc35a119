//! Argument checks shared by every backend's `store`.

use super::error::{Result, StoreError};
use super::traits::{Key, OneOrMany};

/// Pair each object with its key.
///
/// Fails without side effects if one argument is a single value and the other
/// a sequence, or if two sequences differ in length.
pub fn pair_up<T>(objs: OneOrMany<T>, keys: OneOrMany<Key>) -> Result<Vec<(T, Key)>> {
  match (objs, keys) {
    (OneOrMany::One(obj), OneOrMany::One(key)) => Ok(vec![(obj, key)]),
    (OneOrMany::Many(objs), OneOrMany::Many(keys)) => {
      if objs.len() != keys.len() {
        return Err(StoreError::Validation(format!(
          "objects and keys must be the same length (got {} objects, {} keys)",
          objs.len(),
          keys.len()
        )));
      }
      Ok(objs.into_iter().zip(keys).collect())
    }
    _ => Err(StoreError::Validation(
      "objects and keys must both be single values or both be sequences".to_string(),
    )),
  }
}
