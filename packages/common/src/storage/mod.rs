mod error;
mod name;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use name::BlobName;
pub use traits::{BlobStore, BoxReader};
