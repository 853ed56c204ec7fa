use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StorageError;

/// Opaque, collision-resistant name under which a blob is stored.
///
/// Names are 32 lowercase hex characters (a simple-formatted UUIDv4) and are
/// never derived from client input, so they are safe to use as path
/// components and are never reused.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BlobName(String);

impl BlobName {
    const LEN: usize = 32;

    /// Generate a fresh random name.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse a stored name, rejecting anything that was not produced by
    /// [`BlobName::generate`].
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        let reason = if s.len() != Self::LEN {
            Some("must be 32 characters")
        } else if !s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)) {
            Some("must be lowercase hex")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(StorageError::MalformedName {
                input: s.to_owned(),
                reason,
            });
        }
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the first 2 characters (shard prefix for filesystem layout).
    pub fn shard_prefix(&self) -> &str {
        &self.0[..2]
    }

    /// Return the remaining 30 characters (filename within shard).
    pub fn shard_suffix(&self) -> &str {
        &self.0[2..]
    }
}

impl fmt::Debug for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobName({})", self.0)
    }
}

impl fmt::Display for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for BlobName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlobName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
