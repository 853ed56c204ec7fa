use std::fmt;

use super::name::BlobName;

/// Failure of a blob store operation.
#[derive(Debug)]
pub enum StorageError {
    /// Nothing is stored under this name.
    Missing(BlobName),
    /// A string that [`BlobName::generate`] could not have produced.
    MalformedName { input: String, reason: &'static str },
    /// A write larger than the store accepts. `written` counts the bytes
    /// seen before the write was abandoned.
    TooLarge { written: u64, limit: u64 },
    Io(std::io::Error),
}

impl StorageError {
    /// The blob does not exist, or the name could never address one.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Missing(_) | Self::MalformedName { .. })
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "no blob named {name}"),
            Self::MalformedName { input, reason } => {
                write!(f, "{input:?} is not a blob name: {reason}")
            }
            Self::TooLarge { written, limit } => {
                write!(f, "blob of at least {written} bytes is over the {limit} byte limit")
            }
            Self::Io(err) => write!(f, "blob backend failed: {err}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Self::Io(err) = self {
            Some(err)
        } else {
            None
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
