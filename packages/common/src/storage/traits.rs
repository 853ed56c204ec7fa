use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::name::BlobName;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Flat, name-addressed blob storage.
///
/// Names are generated by the caller and never reused, so implementations
/// need no locking between concurrent writers.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `name` and return the number of bytes written.
    async fn write(&self, name: &BlobName, data: &[u8]) -> Result<u64, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.write_stream(name, reader).await
    }

    /// Store data from an async reader under `name`.
    async fn write_stream(&self, name: &BlobName, reader: BoxReader)
    -> Result<u64, StorageError>;

    /// Retrieve all bytes for a blob.
    async fn read(&self, name: &BlobName) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.read_stream(name).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn read_stream(&self, name: &BlobName) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, name: &BlobName) -> Result<bool, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, name: &BlobName) -> Result<bool, StorageError>;

    /// Get the size of a blob in bytes.
    async fn size(&self, name: &BlobName) -> Result<u64, StorageError>;
}
