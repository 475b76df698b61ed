//! In-page extraction and download pipeline.
//!
//! A page is sampled repeatedly through a [`DocumentSource`] until an
//! acceptable media element shows up; the prompt is read from the same
//! snapshot, and the asset is fetched and written next to a JSON sidecar.

mod download;
mod grab;
mod http;
mod media;
mod poller;
mod prompt;
mod source;
#[cfg(test)]
mod test_server;

use std::time::Duration;

use gensave_config::AppConfig;

pub use download::{infer_extension, plan_download, write_artifacts, DownloadPlan, SavedArtifacts};
pub use grab::{grab, GrabReport};
pub use http::Fetcher;
pub use media::{scan_document, MediaCandidate, MediaRules, TickScan};
pub use poller::{poll_for_media, Extraction};
pub use prompt::{extract_prompt, extract_prompt_from_html};
pub use source::{DocumentSource, HttpDocument, PageSnapshot, StaticDocument};

/// Tunables for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractSettings {
    pub interval: Duration,
    pub max_attempts: u32,
    pub rules: MediaRules,
}

impl ExtractSettings {
    pub fn from_app_config(app: &AppConfig) -> Self {
        Self {
            interval: app.poll_interval(),
            max_attempts: app.poll_max_attempts.max(1),
            rules: MediaRules::new(app.cdn_hosts.clone(), app.min_image_px),
        }
    }
}
