use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use vfs_files::config::{
    flag_from_env_value, max_file_size_from_env_value, namespaces_from_env_value,
    root_dir_from_env_value, web_path_from_env_value,
};
use vfs_files::{
    FileStore, InMemoryRepository, RandomNames, UploadService, VfsConfig, VfsFolder,
};

/// Main entry point for the VFS upload server
///
/// Loads configuration from the environment (and `.env`), wires the storage core to an
/// in-memory repository holding a single root folder, and serves the REST API.
///
/// # Environment Variables
/// - `VFS_ROOT_DIR`: Storage root, must exist (default: "vfs_data")
/// - `VFS_WEB_PATH`: Public URL prefix for stored files (default: "/media")
/// - `VFS_MAX_FILE_SIZE`: Maximum upload size in bytes (default: 32 MiB)
/// - `VFS_NAMESPACES`: Comma-separated allow-list of non-public namespaces
/// - `VFS_UPLOAD_FORM_NAME`: Multipart field holding the file (default: "file")
/// - `VFS_SALTED_FILENAMES`: Append a random salt to foldered filenames
/// - `VFS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - a configuration value is invalid or the storage root is missing,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vfs=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let root_dir = root_dir_from_env_value(std::env::var("VFS_ROOT_DIR").ok());
    if !root_dir.exists() {
        anyhow::bail!("Storage root does not exist: {}", root_dir.display());
    }

    let cfg = Arc::new(VfsConfig::new(
        &root_dir,
        web_path_from_env_value(std::env::var("VFS_WEB_PATH").ok()),
        max_file_size_from_env_value(std::env::var("VFS_MAX_FILE_SIZE").ok())?,
        namespaces_from_env_value(std::env::var("VFS_NAMESPACES").ok())?,
        std::env::var("VFS_UPLOAD_FORM_NAME").unwrap_or_default(),
        flag_from_env_value(std::env::var("VFS_SALTED_FILENAMES").ok())?,
    )?);

    let repository = Arc::new(InMemoryRepository::new());
    repository.insert_folder(VfsFolder {
        id: 1,
        parent_id: None,
        title: "root".into(),
    })?;

    let uploads = UploadService::new(FileStore::new(cfg.clone()), repository, Arc::new(RandomNames));
    let app = api_rest::router(AppState::new(uploads));

    let rest_addr = std::env::var("VFS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    tracing::info!(
        "++ Starting VFS REST on {} (root {}, max {} bytes)",
        rest_addr,
        cfg.root_dir().display(),
        cfg.max_file_size()
    );
    tracing::info!("++ Namespaces: {:?}", cfg.namespaces().as_slice());

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
