pub mod media;
pub mod storage;

pub use media::{
    ATTACHMENT_IMAGE_TYPES, MagicBytesDetector, OCTET_STREAM, PROFILE_IMAGE_TYPES, TypeDetector,
};
pub use storage::{BlobName, BlobStore, StorageError};
