//! Two ways to read a map key with a fallback, for the timing demo
//!
//! `use_catch` goes through an error value and recovers from it;
//! `use_get` asks the map directly. The results are identical.

use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

pub const DEFAULT: i64 = -1;

static ITEMS: LazyLock<HashMap<&'static str, i64>> =
    LazyLock::new(|| HashMap::from([("a", 1), ("b", 2)]));

#[derive(Error, Debug, PartialEq, Eq)]
#[error("missing key: {0}")]
pub struct KeyMissing(String);

fn item(key: &str) -> Result<i64, KeyMissing> {
    ITEMS
        .get(key)
        .copied()
        .ok_or_else(|| KeyMissing(key.to_string()))
}

/// Look up through the error path, falling back to [`DEFAULT`]
#[inline(never)]
pub fn use_catch(key: &str) -> i64 {
    match item(key) {
        Ok(value) => value,
        Err(_) => DEFAULT,
    }
}

/// Look up with `get`, falling back to [`DEFAULT`]
#[inline(never)]
pub fn use_get(key: &str) -> i64 {
    ITEMS.get(key).copied().unwrap_or(DEFAULT)
}
