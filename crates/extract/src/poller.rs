use gensave_core::{Error, Result};
use tracing::{debug, info, warn};

use crate::media::{scan_document, MediaCandidate};
use crate::source::{DocumentSource, PageSnapshot};
use crate::ExtractSettings;

/// Result of a successful polling run.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub media: MediaCandidate,
    /// The snapshot the media was found in (or the last one, for image fallback).
    pub snapshot: PageSnapshot,
    pub attempts: u32,
}

/// Samples `source` until a video appears or the attempt budget runs out.
///
/// Video is preferred unconditionally. The first acceptable image is held
/// back and only returned once every attempt has failed to produce a video.
pub async fn poll_for_media(
    source: &dyn DocumentSource,
    settings: &ExtractSettings,
) -> Result<Extraction> {
    let max_attempts = settings.max_attempts.max(1);
    let mut fallback: Option<(MediaCandidate, PageSnapshot)> = None;
    let mut last_snapshot: Option<PageSnapshot> = None;
    let mut last_error: Option<Error> = None;

    info!(source = source.name(), max_attempts, "polling for media");
    for attempt in 1..=max_attempts {
        if attempt > 1 {
            tokio::time::sleep(settings.interval).await;
        }

        let snapshot = match source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(attempt, "snapshot failed: {err}");
                last_error = Some(err);
                continue;
            }
        };

        let scan = scan_document(&snapshot.html, &snapshot.url, &settings.rules);
        debug!(
            attempt,
            video = scan.video.is_some(),
            image = scan.image.is_some(),
            "poll tick"
        );

        if let Some(media) = scan.video {
            info!(attempt, url = %media.url, "found video");
            return Ok(Extraction {
                media,
                snapshot,
                attempts: attempt,
            });
        }
        if fallback.is_none() {
            if let Some(image) = scan.image {
                debug!(attempt, url = %image.url, "holding image as fallback");
                fallback = Some((image, snapshot.clone()));
            }
        }
        last_snapshot = Some(snapshot);
    }

    if let Some((media, snapshot)) = fallback {
        info!(url = %media.url, "no video found, using image");
        // Prompt is read from the latest view.
        let snapshot = last_snapshot.unwrap_or(snapshot);
        return Ok(Extraction {
            media,
            snapshot,
            attempts: max_attempts,
        });
    }

    match (last_snapshot, last_error) {
        (None, Some(err)) => Err(err),
        _ => Err(Error::NotFound(format!(
            "no media found after {max_attempts} attempts"
        ))),
    }
}
