mod api;
mod config;
mod illustration;
mod lyrics;
mod state;
mod tasks;
mod utils;

use std::sync::Arc;

use api::api_router;
use config::{config_path_from_env, load_or_create_config, resolve_library_path, resolve_path};
use illustration::IllustrationWriter;
use library::{Catalog, LocalFileSystem, Synchronizer};
use lyrics::LyricsImporter;
use metadata::MetadataParser;
use state::AppState;
use tasks::TaskRunner;
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = config_path_from_env();
    let (config, created) = load_or_create_config(&config_path)?;

    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }

    let bind_addr = format!("0.0.0.0:{}", config.port);

    let index_path = resolve_path(&config_path, &config.index_path);
    if let Some(parent) = index_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let catalog = Arc::new(Catalog::open(&index_path)?);
    info!("Opened index at {:?}", index_path);

    for entry in &config.libraries {
        let path = resolve_library_path(&config_path, &config, &entry.path);
        if !path.is_dir() {
            warn!("Library {} points to missing folder {:?}", entry.name, path);
        }
        match catalog.get_or_create_library(&entry.name, &path.to_string_lossy()) {
            Ok(library) => info!("Library '{}' at {:?}", library.slug, path),
            Err(err) => warn!("Failed to register library {}: {}", entry.name, err),
        }
    }

    let parser = Arc::new(MetadataParser::new(config.parser.clone())?);
    let handle = tokio::runtime::Handle::current();
    let metadata_root = resolve_path(&config_path, &config.metadata_path);
    let illustrations = IllustrationWriter::new(
        metadata_root,
        config.ffmpeg_path.clone(),
        handle.clone(),
    );
    let lyrics = LyricsImporter::new(Arc::clone(&catalog), handle);
    let sync = Synchronizer::new(
        Arc::clone(&catalog),
        parser,
        Arc::new(LocalFileSystem),
        Arc::new(illustrations),
        Arc::new(lyrics),
    );

    let state = AppState {
        catalog,
        sync,
        tasks: TaskRunner::new(config.max_concurrent_tasks, config.task_history),
    };

    let app = api_router(state)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                warn!("Failed to install terminate signal handler: {}", err);
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", err);
        }
    }

    info!("Shutdown signal received.");
}
