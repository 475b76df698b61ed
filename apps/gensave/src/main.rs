use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gensave_archive::{scan_archive, GallerySession, NormalizedIndex};
use gensave_config::{load_file_config_into_env, AppConfig};
use tokio::signal;
use tokio::sync::RwLock;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod api;
mod cli;
mod flows;

use cli::{Cli, Command, FolderAction};
use flows::App;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = err
                .downcast_ref::<gensave_core::Error>()
                .map(|e| e.kind())
                .unwrap_or("error");
            eprintln!("[{kind}] {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gensave_extract=debug"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    load_file_config_into_env()?;
    let app_config = AppConfig::from_env()?;
    info!(?app_config, "loaded configuration");

    let app = App::init(app_config, cli.index).await?;

    match cli.command {
        Command::Grab { url, html, force } => flows::grab_one(&app, &url, html, force).await,
        Command::Missing { json } => flows::missing(&app, json).await,
        Command::Harvest { download } => flows::harvest(&app, download).await,
        Command::Folder { action } => match action {
            FolderAction::Show => flows::folder_show(&app).await,
            FolderAction::Set { path } => flows::folder_set(&app, &path).await,
            FolderAction::Pick => flows::folder_pick(&app).await,
            FolderAction::Clear => flows::folder_clear(&app).await,
            FolderAction::Prefer { path } => flows::folder_prefer(&app, &path).await,
        },
        Command::Serve { addr } => serve(app, addr).await,
    }
}

async fn serve(app: App, addr: Option<String>) -> Result<()> {
    let archive_dir = app.archive_dir().await?;
    let index = if app.index_source.is_some() {
        app.load_index().await?
    } else {
        warn!("no index configured; gallery starts empty");
        NormalizedIndex::default()
    };
    let scan = scan_archive(archive_dir.clone()).await?;

    let state = api::AppState {
        session: Arc::new(RwLock::new(GallerySession::new(index, scan))),
        archive_dir,
        index_source: app.index_source.clone(),
        site_base_url: app.config.site_base_url.clone(),
    };
    let router = api::build_router(state, app.config.api_key.clone());

    let addr: SocketAddr = addr
        .unwrap_or_else(|| app.config.api_addr.clone())
        .parse()
        .context("invalid gallery listen address")?;
    info!(%addr, "starting gallery api");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await
        .context("gallery server error")?;

    Ok(())
}
