//! softmention-hub - Software mention ingestion and COAR Notify exchange
//!
//! Stores software mentions extracted from scholarly documents, offers them
//! to the hosting repository for author review, and records the verdicts
//! coming back through the COAR inbox.

use anyhow::{Context, Result};
use clap::Parser;
use softmention_common::config::{
    ensure_root_folder, find_config_file, load_toml_config, resolve_root_folder, ROOT_FOLDER_ENV,
};
use softmention_common::db::init_database;
use std::path::PathBuf;
use tracing::{info, warn};

use softmention_hub::config::{HubConfig, MODULE_NAME};
use softmention_hub::notify::{NotificationDispatcher, ProviderDirectory, VisualizationClient};
use softmention_hub::{build_router, AppState, Blacklist};

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "softmention-hub", version, about)]
struct Args {
    /// Root folder holding the database and blacklist
    #[arg(long)]
    root_folder: Option<String>,

    /// TOML config file (default: ~/.config/softmention/softmention-hub.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:5500
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Build identification first, before any slow startup step
    info!(
        "Starting softmention-hub v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config_path = args.config.clone().or_else(|| find_config_file(MODULE_NAME));
    let root_folder = resolve_root_folder(
        args.root_folder.as_deref(),
        ROOT_FOLDER_ENV,
        config_path.as_deref(),
    );
    ensure_root_folder(&root_folder)
        .with_context(|| format!("Failed to initialize root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    // A config file inside the root folder is picked up when none was found elsewhere
    let config_path = config_path.or_else(|| {
        let local = root_folder.join(format!("{}.toml", MODULE_NAME));
        local.exists().then_some(local)
    });
    let mut config: HubConfig = load_toml_config::<HubConfig>(config_path.as_deref())?.apply_env();
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }

    let db_path = config.database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let pool = init_database(&db_path).await?;
    info!("Database connection established");

    let blacklist = Blacklist::load(config.blacklist_path(&root_folder)).await?;
    info!(
        "Blacklist loaded: {} terms from {}",
        blacklist.len().await,
        blacklist.path().display()
    );

    let providers = ProviderDirectory::resolve(&config.providers);
    let dispatcher =
        NotificationDispatcher::new(config.identity(), providers, config.notify_timeout())?;
    let visualization =
        VisualizationClient::new(config.visualization_url.as_deref(), config.notify_timeout())?;
    if !visualization.is_enabled() {
        warn!("No visualization URL configured, verdicts will not be forwarded");
    }

    let api_key = config.effective_api_key();
    if api_key.is_none() {
        info!("API key not configured, authentication disabled");
    }

    let state = AppState::new(pool, blacklist, dispatcher, visualization)
        .with_api_key(api_key)
        .with_default_provider(config.default_provider);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
