//! Archive folder scan.
//!
//! Every file whose name yields a generation id is classified as either a
//! media file or a JSON sidecar. The result is always rebuilt from scratch.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use gensave_core::{
    extract_gen_id_from_filename, is_media_extension, is_sidecar_name, Error, GenId, GrantedDir,
    Result,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveEntry {
    /// Media files in traversal order.
    pub files: Vec<PathBuf>,
    /// Most recently parsed sidecar.
    pub meta: Option<Value>,
    /// Last sidecar parse failure.
    pub meta_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanError {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveScan {
    pub entries: HashMap<GenId, ArchiveEntry>,
    pub media_count: usize,
    pub meta_count: usize,
    pub errors: Vec<ScanError>,
}

impl ArchiveScan {
    pub fn get(&self, id: &GenId) -> Option<&ArchiveEntry> {
        self.entries.get(id)
    }

    /// True when at least one media file is archived for `id`.
    pub fn has_media(&self, id: &GenId) -> bool {
        self.get(id).is_some_and(|entry| !entry.files.is_empty())
    }
}

/// Lazy depth-first listing of regular files under `root`, in file-name order.
pub fn archive_files(root: &Path) -> impl Iterator<Item = Result<PathBuf, ScanError>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(err) => Some(Err(ScanError {
                path: err.path().map(Path::to_path_buf).unwrap_or_default(),
                message: err.to_string(),
            })),
        })
}

pub fn scan_archive_blocking(dir: &GrantedDir) -> ArchiveScan {
    let mut scan = ArchiveScan::default();

    for file in archive_files(dir.path()) {
        let path = match file {
            Ok(path) => path,
            Err(err) => {
                warn!(path = %err.path.display(), "walk error: {}", err.message);
                scan.errors.push(err);
                continue;
            }
        };
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let Some(id) = extract_gen_id_from_filename(&name) else {
            continue;
        };

        if is_sidecar_name(&name) {
            match read_sidecar(&path) {
                Ok(meta) => {
                    scan.meta_count += 1;
                    scan.entries.entry(id).or_default().meta = Some(meta);
                }
                Err(message) => {
                    warn!(path = %path.display(), "bad sidecar: {message}");
                    scan.entries.entry(id).or_default().meta_error = Some(message.clone());
                    scan.errors.push(ScanError { path, message });
                }
            }
        } else if has_media_extension(&path) {
            debug!(%id, path = %path.display(), "media file");
            scan.media_count += 1;
            scan.entries.entry(id).or_default().files.push(path);
        }
    }

    info!(
        ids = scan.entries.len(),
        media = scan.media_count,
        meta = scan.meta_count,
        errors = scan.errors.len(),
        "archive scan complete"
    );
    scan
}

/// Runs the scan on the blocking pool.
pub async fn scan_archive(dir: GrantedDir) -> Result<ArchiveScan> {
    let root = dir.path().to_path_buf();
    tokio::task::spawn_blocking(move || scan_archive_blocking(&dir))
        .await
        .map_err(|err| Error::io(root, std::io::Error::other(err)))
}

fn read_sidecar(path: &Path) -> Result<Value, String> {
    let bytes = fs::read(path).map_err(|err| err.to_string())?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err("sidecar is not a JSON object".to_string()),
        Err(err) => Err(err.to_string()),
    }
}

fn has_media_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(is_media_extension)
}
