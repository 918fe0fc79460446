// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Versioned cache keys.

use std::fmt;

use xxhash_rust::xxh3::xxh3_128;

use crate::value::{Value, encode_str};

/// A deterministic backend key for one fully resolved object.
///
/// The key has a readable prefix, `"{symbol}_{key}:v{version}:"`, followed by
/// a 128-bit xxh3 digest over the length-prefixed symbol, key, version and
/// every parameter in order. Identical inputs always give identical keys;
/// changing the version or any parameter gives a different one, which is how
/// a version bump retires old records without deleting them.
///
/// # Examples
///
/// ```
/// use stowage::{CacheKey, Value};
///
/// let v1 = CacheKey::build("gld", "dummyparams", 1, &[Value::from("a")]);
/// let v2 = CacheKey::build("gld", "dummyparams", 2, &[Value::from("a")]);
///
/// assert!(v1.as_str().starts_with("gld_dummyparams:v1:"));
/// assert_ne!(v1, v2);
/// assert_eq!(v1, CacheKey::build("gld", "dummyparams", 1, &[Value::from("a")]));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for `symbol`/`key` at `version` with `params`.
    #[must_use]
    pub fn build(symbol: &str, key: &str, version: u32, params: &[Value]) -> Self {
        let mut encoded = Vec::with_capacity(32 + 16 * params.len());
        encode_str(symbol, &mut encoded);
        encode_str(key, &mut encoded);
        encoded.extend_from_slice(&version.to_le_bytes());
        encoded.extend_from_slice(&(params.len() as u64).to_le_bytes());
        for param in params {
            param.encode_into(&mut encoded);
        }

        Self(format!("{symbol}_{key}:v{version}:{:032x}", xxh3_128(&encoded)))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
