use gensave_core::{extract_gen_id, Error, GenId, GrantedDir, Result};
use serde::Serialize;
use tracing::info;

use crate::download::{plan_download, write_artifacts, SavedArtifacts};
use crate::http::Fetcher;
use crate::media::MediaCandidate;
use crate::poller::poll_for_media;
use crate::prompt::extract_prompt_from_html;
use crate::source::DocumentSource;
use crate::ExtractSettings;

#[derive(Debug, Clone, Serialize)]
pub struct GrabReport {
    pub id: GenId,
    pub media: MediaCandidate,
    pub prompt: String,
    pub attempts: u32,
    pub saved: SavedArtifacts,
}

/// Full download flow for one generation page.
///
/// Any failure aborts the flow as a whole; nothing is written unless the
/// asset was fetched successfully.
pub async fn grab(
    page_url: &str,
    source: &dyn DocumentSource,
    fetcher: &Fetcher,
    dir: &GrantedDir,
    settings: &ExtractSettings,
) -> Result<GrabReport> {
    let id = extract_gen_id(page_url)
        .ok_or_else(|| Error::NotFound(format!("no generation id in {page_url}")))?;

    let extraction = poll_for_media(source, settings).await?;
    let prompt = extract_prompt_from_html(&extraction.snapshot.html);
    info!(%id, kind = ?extraction.media.kind, "extracted media");

    let bytes = fetcher
        .fetch_bytes(&extraction.media.url, Some(page_url))
        .await?;
    let plan = plan_download(&id, page_url, &extraction.media, &prompt);
    let saved = write_artifacts(dir, &plan, &bytes)?;

    Ok(GrabReport {
        id,
        media: extraction.media,
        prompt,
        attempts: extraction.attempts,
        saved,
    })
}
