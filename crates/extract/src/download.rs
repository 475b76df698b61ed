use std::io::Write;
use std::path::{Path, PathBuf};

use gensave_core::{
    sanitize_for_filename, Error, GenId, GrantedDir, MediaKind, Result, Sidecar, SIDECAR_SUFFIX,
};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{info, warn};
use url::Url;

use crate::media::MediaCandidate;

const TITLE_MAX_CHARS: usize = 80;
const MAX_EXTENSION_LEN: usize = 5;

/// File names and sidecar content for one download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadPlan {
    pub base_name: String,
    pub media_file_name: String,
    pub sidecar_file_name: String,
    pub sidecar: Sidecar,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedArtifacts {
    pub media_path: PathBuf,
    pub sidecar_path: PathBuf,
    pub bytes: usize,
}

pub fn plan_download(
    id: &GenId,
    page_url: &str,
    media: &MediaCandidate,
    prompt: &str,
) -> DownloadPlan {
    let prompt_part = sanitize_for_filename(prompt);
    let base_name = if prompt_part.is_empty() {
        id.to_string()
    } else {
        format!("{id}--{prompt_part}")
    };
    let extension = infer_extension(&media.url, media.kind);
    let title = {
        let trimmed: String = prompt.trim().chars().take(TITLE_MAX_CHARS).collect();
        if trimmed.is_empty() {
            id.to_string()
        } else {
            trimmed
        }
    };

    DownloadPlan {
        media_file_name: format!("{base_name}.{extension}"),
        sidecar_file_name: format!("{id}{SIDECAR_SUFFIX}"),
        sidecar: Sidecar {
            source_url: page_url.to_string(),
            asset_url: media.url.clone(),
            prompt: prompt.to_string(),
            title,
            kind: media.kind,
            suggested_base_name: base_name.clone(),
        },
        base_name,
    }
}

/// Extension from the URL's last path segment when it looks like one,
/// otherwise the kind's default container.
pub fn infer_extension(url: &str, kind: MediaKind) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            let segment = parsed.path_segments()?.last()?.to_string();
            let (_, ext) = segment.rsplit_once('.')?;
            let plausible = (1..=MAX_EXTENSION_LEN).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric());
            plausible.then(|| ext.to_ascii_lowercase())
        })
        .unwrap_or_else(|| kind.default_extension().to_string())
}

/// Writes the media file and its sidecar; each file is replaced atomically.
/// If the sidecar cannot be written the media file is removed again.
pub fn write_artifacts(
    dir: &GrantedDir,
    plan: &DownloadPlan,
    bytes: &[u8],
) -> Result<SavedArtifacts> {
    let media_path = dir.path().join(&plan.media_file_name);
    let sidecar_path = dir.path().join(&plan.sidecar_file_name);

    let sidecar_json = serde_json::to_vec_pretty(&plan.sidecar)
        .map_err(|err| Error::Format(format!("serializing sidecar: {err}")))?;

    write_atomic(dir, &media_path, bytes)?;
    if let Err(err) = write_atomic(dir, &sidecar_path, &sidecar_json) {
        if let Err(cleanup) = std::fs::remove_file(&media_path) {
            warn!(media = %media_path.display(), "could not remove orphaned media: {cleanup}");
        }
        return Err(err);
    }

    info!(media = %media_path.display(), bytes = bytes.len(), "saved generation");
    Ok(SavedArtifacts {
        media_path,
        sidecar_path,
        bytes: bytes.len(),
    })
}

fn write_atomic(dir: &GrantedDir, target: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir.path()).map_err(|err| Error::io(dir.path(), err))?;
    tmp.write_all(contents).map_err(|err| Error::io(tmp.path(), err))?;
    tmp.persist(target)
        .map_err(|err| Error::io(target, err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gensave_core::{ensure_read_access, extract_gen_id, FsProbe};

    fn video(url: &str) -> MediaCandidate {
        MediaCandidate {
            url: url.into(),
            kind: MediaKind::Video,
        }
    }

    #[test]
    fn extension_inference() {
        assert_eq!(infer_extension("https://cdn.x/o/gen_a1.WEBM?sig=1", MediaKind::Video), "webm");
        assert_eq!(infer_extension("https://cdn.x/o/gen_a1", MediaKind::Video), "mp4");
        assert_eq!(infer_extension("https://cdn.x/o/file.longext", MediaKind::Image), "png");
        assert_eq!(infer_extension("not a url", MediaKind::Image), "png");
    }

    #[test]
    fn plan_uses_id_and_sanitized_prompt() {
        let id = extract_gen_id("gen_a1").unwrap();
        let plan = plan_download(
            &id,
            "https://site.com/g/gen_a1",
            &video("https://cdn.x/o/gen_a1.mp4"),
            "A café at night!",
        );
        assert_eq!(plan.base_name, "gen_a1--A_cafe_at_night");
        assert_eq!(plan.media_file_name, "gen_a1--A_cafe_at_night.mp4");
        assert_eq!(plan.sidecar_file_name, "gen_a1.meta.json");
        assert_eq!(plan.sidecar.title, "A café at night!");
        assert_eq!(plan.sidecar.suggested_base_name, plan.base_name);
    }

    #[test]
    fn empty_prompt_falls_back_to_id() {
        let id = extract_gen_id("gen_b2").unwrap();
        let plan = plan_download(&id, "https://site.com/g/gen_b2", &video("https://cdn.x/v"), "  ");
        assert_eq!(plan.media_file_name, "gen_b2.mp4");
        assert_eq!(plan.sidecar.title, "gen_b2");
    }

    #[test]
    fn writes_media_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let granted = ensure_read_access(&FsProbe, dir.path()).unwrap();
        let id = extract_gen_id("gen_c3").unwrap();
        let plan = plan_download(&id, "https://site.com/g/gen_c3", &video("https://cdn.x/gen_c3.mp4"), "waves");

        let saved = write_artifacts(&granted, &plan, b"\x00\x01media").unwrap();
        assert_eq!(std::fs::read(&saved.media_path).unwrap(), b"\x00\x01media");
        let sidecar: Sidecar =
            serde_json::from_slice(&std::fs::read(&saved.sidecar_path).unwrap()).unwrap();
        assert_eq!(sidecar, plan.sidecar);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn failed_sidecar_write_leaves_no_media_behind() {
        let dir = tempfile::tempdir().unwrap();
        let granted = ensure_read_access(&FsProbe, dir.path()).unwrap();
        let id = extract_gen_id("gen_d4").unwrap();
        let plan = plan_download(&id, "https://site.com/g/gen_d4", &video("https://cdn.x/gen_d4.mp4"), "rain");
        std::fs::create_dir(dir.path().join(&plan.sidecar_file_name)).unwrap();

        assert!(matches!(write_artifacts(&granted, &plan, b"media"), Err(Error::Io { .. })));
        assert!(!dir.path().join(&plan.media_file_name).exists());
    }
}
