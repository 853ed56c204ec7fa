use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use common::MagicBytesDetector;
use common::storage::filesystem::FilesystemBlobStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use forum_server::attachment::run_reclaimer;
use forum_server::config::AppConfig;
use forum_server::state::AppState;
use forum_server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;
    if config.database.seed_dev_users {
        seed::seed_dev_users(&db)
            .await
            .context("Failed to seed development users")?;
    }

    let attachments = Arc::new(
        FilesystemBlobStore::new(
            config.storage.attachments_path(),
            config.storage.max_attachment_size,
        )
        .await
        .context("Failed to open attachment storage")?,
    );
    let profile_images = Arc::new(
        FilesystemBlobStore::new(
            config.storage.profile_images_path(),
            config.storage.max_profile_image_size,
        )
        .await
        .context("Failed to open profile image storage")?,
    );

    if config.reclaim.enabled {
        tokio::spawn(run_reclaimer(
            db.clone(),
            attachments.clone(),
            config.reclaim.clone(),
        ));
    } else {
        info!("Orphan attachment reclaimer disabled");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        db,
        config,
        attachments,
        profile_images,
        detector: Arc::new(MagicBytesDetector),
    };

    let app = build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
