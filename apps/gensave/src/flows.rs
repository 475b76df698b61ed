//! Command implementations. Each flow either completes or fails as a whole;
//! per-item failures inside batch flows are reported and skipped.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gensave_archive::{load_index, scan_archive, GallerySession, NormalizedIndex};
use gensave_config::AppConfig;
use gensave_core::{ensure_read_access, extract_gen_id, AccessProbe, Error, FsProbe, GrantedDir};
use gensave_extract::{
    grab, DocumentSource, ExtractSettings, Fetcher, HttpDocument, StaticDocument,
};
use gensave_storage::{validate, DirHandle, HandleStore, SqliteStore};
use tracing::{info, warn};

pub struct App {
    pub config: AppConfig,
    pub store: SqliteStore,
    pub probe: FsProbe,
    pub fetcher: Fetcher,
    pub settings: ExtractSettings,
    pub index_source: Option<String>,
}

impl App {
    pub async fn init(config: AppConfig, index_override: Option<String>) -> Result<Self> {
        let store = SqliteStore::from_app_config(&config)
            .await
            .context("opening settings database")?;
        let fetcher = Fetcher::from_app_config(&config)?;
        let settings = ExtractSettings::from_app_config(&config);
        let index_source = index_override.or_else(|| config.index_source.clone());
        Ok(Self {
            config,
            store,
            probe: FsProbe,
            fetcher,
            settings,
            index_source,
        })
    }

    /// Stored folder if still accessible, otherwise the preferred path is
    /// requested silently and stored.
    pub async fn archive_dir(&self) -> Result<GrantedDir> {
        resolve_archive_dir(&self.store, &self.probe, &self.config.preferred_dir).await
    }

    pub async fn load_index(&self) -> Result<NormalizedIndex> {
        let source = self.index_source.as_deref().ok_or_else(|| {
            Error::NotFound("no index configured (use --index or GENSAVE_INDEX)".into())
        })?;
        Ok(load_index(source, &self.config.site_base_url).await?)
    }

    pub async fn session(&self) -> Result<GallerySession> {
        let index = self.load_index().await?;
        let scan = scan_archive(self.archive_dir().await?).await?;
        Ok(GallerySession::new(index, scan))
    }
}

pub async fn resolve_archive_dir(
    store: &SqliteStore,
    probe: &dyn AccessProbe,
    default_preferred: &Path,
) -> Result<GrantedDir> {
    if let Some(handle) = validate(store, probe).await? {
        return Ok(ensure_read_access(probe, &handle.path)?);
    }

    let preferred = store.preferred_path(default_preferred).await?;
    let granted = ensure_read_access(probe, &preferred)?;
    store.save(&DirHandle::new(granted.path())).await?;
    info!(path = %granted.path().display(), "using preferred folder");
    Ok(granted)
}

pub async fn grab_one(app: &App, url: &str, html: Option<PathBuf>, force: bool) -> Result<()> {
    let id = extract_gen_id(url)
        .ok_or_else(|| Error::NotFound(format!("no generation id in {url}")))?;
    let dir = app.archive_dir().await?;

    if !force {
        let scan = scan_archive(dir.clone()).await?;
        if scan.has_media(&id) {
            println!("{id} is already archived (use --force to download again)");
            return Ok(());
        }
    }

    let source: Box<dyn DocumentSource> = match html {
        Some(path) => {
            let html = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            Box::new(StaticDocument::new(url, html))
        }
        None => Box::new(HttpDocument::new(app.fetcher.clone(), url)),
    };

    let report = grab(url, source.as_ref(), &app.fetcher, &dir, &app.settings).await?;
    println!(
        "saved {} ({:?}, {} bytes) -> {}",
        report.id,
        report.media.kind,
        report.saved.bytes,
        report.saved.media_path.display()
    );
    Ok(())
}

pub async fn missing(app: &App, json: bool) -> Result<()> {
    let session = app.session().await?;
    let missing = session.missing();
    if json {
        println!("{}", serde_json::to_string_pretty(&missing)?);
        return Ok(());
    }
    for record in &missing {
        println!("{}\t{}", record.id, record.page_url);
    }
    eprintln!(
        "{} missing of {} ({} skipped index entries)",
        missing.len(),
        session.index().records.len(),
        session.index().skipped
    );
    Ok(())
}

/// Downloads are strictly sequential.
pub async fn harvest(app: &App, download: bool) -> Result<()> {
    let session = app.session().await?;
    let missing = session.missing();
    if !download {
        for record in &missing {
            println!("{}", record.page_url);
        }
        return Ok(());
    }

    let dir = app.archive_dir().await?;
    let mut saved = 0usize;
    let mut failed = Vec::new();
    for record in &missing {
        let source = HttpDocument::new(app.fetcher.clone(), record.page_url.clone());
        match grab(&record.page_url, &source, &app.fetcher, &dir, &app.settings).await {
            Ok(report) => {
                saved += 1;
                println!("saved {} -> {}", report.id, report.saved.media_path.display());
            }
            Err(err) => {
                warn!(id = %record.id, "harvest item failed: {err}");
                failed.push((record.id.clone(), err));
            }
        }
    }

    println!("harvest: {saved} saved, {} failed", failed.len());
    for (id, err) in &failed {
        println!("  {id}: [{}] {err}", err.kind());
    }
    Ok(())
}

pub async fn folder_show(app: &App) -> Result<()> {
    match app.store.get().await? {
        Some(handle) => {
            let state = app.probe.query(&handle.path);
            println!("{} ({state:?})", handle.path.display());
        }
        None => println!("no folder stored"),
    }
    let preferred = app.store.preferred_path(&app.config.preferred_dir).await?;
    println!("preferred: {}", preferred.display());
    Ok(())
}

pub async fn folder_set(app: &App, path: &Path) -> Result<()> {
    let granted = ensure_read_access(&app.probe, path)?;
    app.store.save(&DirHandle::new(granted.path())).await?;
    println!("archive folder set to {}", granted.path().display());
    Ok(())
}

pub async fn folder_pick(app: &App) -> Result<()> {
    let stdin = std::io::stdin();
    let path = prompt_for_folder(stdin.lock(), std::io::stderr())?;
    folder_set(app, &path).await
}

pub async fn folder_clear(app: &App) -> Result<()> {
    app.store.clear().await?;
    println!("archive folder cleared");
    Ok(())
}

pub async fn folder_prefer(app: &App, path: &Path) -> Result<()> {
    app.store.set_preferred_path(path).await?;
    println!("preferred folder set to {}", path.display());
    Ok(())
}

/// Reads one folder path; a blank answer or closed input cancels.
pub fn prompt_for_folder<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
) -> Result<PathBuf, Error> {
    write!(output, "Archive folder: ")
        .and_then(|_| output.flush())
        .map_err(|err| Error::io("stderr", err))?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|err| Error::io("stdin", err))?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(Error::AbortedByUser);
    }
    Ok(PathBuf::from(trimmed))
}
