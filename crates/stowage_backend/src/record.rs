// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

use crate::Error;

/// A serialized object together with the descriptor version it was built for.
///
/// Records are what the registry writes to a backend. A record read back is
/// only trusted when its stored version equals the descriptor's current
/// version; anything else is handled exactly like a miss.
///
/// The payload is the object's JSON and is stored as a JSON string, so it
/// must be UTF-8.
///
/// # Examples
///
/// ```
/// use stowage_backend::CacheRecord;
///
/// let record = CacheRecord::new(b"{}".to_vec(), 3);
/// let bytes = record.encode()?;
///
/// let decoded = CacheRecord::decode(&bytes)?;
/// assert!(decoded.is_current(3));
/// assert!(!decoded.is_current(4));
/// # Ok::<(), stowage_backend::Error>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(rename = "v")]
    stored_version: u32,
    #[serde(rename = "p", with = "utf8_payload")]
    payload: Vec<u8>,
}

impl CacheRecord {
    /// Creates a record for `payload` built at descriptor `version`.
    #[must_use]
    pub fn new(payload: Vec<u8>, version: u32) -> Self {
        Self {
            stored_version: version,
            payload,
        }
    }

    /// The descriptor version this record was stored under.
    #[must_use]
    pub fn stored_version(&self) -> u32 {
        self.stored_version
    }

    /// Returns `true` if the record was built for `version`.
    #[must_use]
    pub fn is_current(&self, version: u32) -> bool {
        self.stored_version == version
    }

    /// Returns a reference to the serialized object.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes the record and returns the serialized object.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Encodes the record into the bytes stored in a backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not UTF-8.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(Error::from_message)
    }

    /// Decodes bytes previously produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not a valid record.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(Error::from_message)
    }
}

mod utf8_payload {
    use serde::de::Deserialize;
    use serde::ser::Error as _;
    use serde::{Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let text = std::str::from_utf8(payload).map_err(S::Error::custom)?;
        serializer.serialize_str(text)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}
