use std::sync::Arc;

use common::{BlobStore, TypeDetector};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    /// Discussion attachment bytes, keyed by stored name.
    pub attachments: Arc<dyn BlobStore>,
    /// Profile image bytes, keyed by stored name.
    pub profile_images: Arc<dyn BlobStore>,
    pub detector: Arc<dyn TypeDetector>,
}
