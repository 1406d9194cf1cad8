#[macro_use]
extern crate tracing;

mod config;
mod controller;
mod error;
mod processor;
mod routes;
mod storage;

#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mimalloc::MiMalloc;
use poem::endpoint::StaticFilesEndpoint;
use poem::listener::TcpListener;
use poem::middleware::Tracing;
use poem::{EndpointExt, Route, Server};
use poem_openapi::OpenApiService;
use tracing::Level;

use crate::config::RuntimeConfig;
use crate::controller::PhotoController;
use crate::processor::JpegThumbnailer;
use crate::routes::PhotoApi;
use crate::storage::backends::filesystem::FileSystemBackend;
use crate::storage::template::FileStore;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[clap(author, version, about)]
pub struct ServerConfig {
    #[clap(long, default_value = "127.0.0.1", env = "PHOTO_HOST")]
    /// The binding host address of the server.
    host: String,

    #[clap(long, default_value = "8000", env = "PHOTO_PORT")]
    /// The port to bind the server to.
    port: u16,

    #[clap(long, default_value = "config.yaml", env = "PHOTO_CONFIG_FILE")]
    /// The file path to the runtime YAML config.
    config_file: PathBuf,

    #[clap(long, default_value = "info", env = "PHOTO_LOG_LEVEL")]
    /// The most verbose log level to emit.
    log_level: Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: ServerConfig = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let cfg = RuntimeConfig::from_file(&args.config_file).await?;
    let controller = build_controller(&cfg).await?;

    let bind = format!("{}:{}", args.host, args.port);
    let app = app(controller, &cfg, &format!("http://{}", bind)).with(Tracing);

    info!("Serving photos from {:?} on {}", &cfg.storage.directory, &bind);
    Server::new(TcpListener::bind(bind))
        .run_with_graceful_shutdown(
            app,
            async move {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutting down...");
            },
            Some(Duration::from_secs(2)),
        )
        .await?;

    Ok(())
}

/// Connects the record store and prepares the storage directories.
pub async fn build_controller(cfg: &RuntimeConfig) -> anyhow::Result<Arc<PhotoController>> {
    let records = cfg.database.connect().await?;

    let thumbnailer = Arc::new(JpegThumbnailer::from_config(&cfg.thumbnails));
    let files = FileSystemBackend::new(cfg.storage.directory.clone(), thumbnailer);
    files.ensure_directories().await?;

    Ok(Arc::new(PhotoController::new(records, Arc::new(files))))
}

/// Constructs all the routes for the server.
pub fn app(controller: Arc<PhotoController>, cfg: &RuntimeConfig, server: &str) -> Route {
    let api_service = OpenApiService::new(
        PhotoApi::new(controller, cfg.uploads.clone()),
        "Photo API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(server.to_string());

    let ui = api_service.redoc();

    Route::new()
        .nest("/static", StaticFilesEndpoint::new(cfg.storage.directory.clone()))
        .nest("/ui", ui)
        .nest("/", api_service)
}
