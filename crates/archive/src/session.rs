//! Join of the normalized index with an archive scan.

use std::path::PathBuf;

use gensave_core::GenId;
use serde::Serialize;
use serde_json::Value;

use crate::index::{IndexRecord, NormalizedIndex};
use crate::scan::ArchiveScan;

const META_PROMPT_KEYS: &[&str] = &["Prompt", "prompt"];

/// Rendering-ready view of one index record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    pub id: GenId,
    pub page_url: String,
    pub thumb_url: Option<String>,
    pub prompt: String,
    pub offline: bool,
    pub files: Vec<PathBuf>,
    pub meta: Option<Value>,
    pub meta_error: Option<String>,
}

/// Owns the current index and archive state for a gallery or harvest run.
///
/// Both halves are replaced wholesale; nothing is patched incrementally.
#[derive(Debug, Clone, Default)]
pub struct GallerySession {
    index: NormalizedIndex,
    scan: ArchiveScan,
}

impl GallerySession {
    pub fn new(index: NormalizedIndex, scan: ArchiveScan) -> Self {
        Self { index, scan }
    }

    pub fn index(&self) -> &NormalizedIndex {
        &self.index
    }

    pub fn scan(&self) -> &ArchiveScan {
        &self.scan
    }

    pub fn replace_index(&mut self, index: NormalizedIndex) {
        self.index = index;
    }

    pub fn replace_scan(&mut self, scan: ArchiveScan) {
        self.scan = scan;
    }

    pub fn is_offline(&self, id: &GenId) -> bool {
        self.scan.has_media(id)
    }

    /// Sidecar prompt, then the record's own prompt, then a prompt nested in
    /// the raw entry, then empty.
    pub fn resolve_prompt(&self, record: &IndexRecord) -> String {
        self.scan
            .get(&record.id)
            .and_then(|entry| entry.meta.as_ref())
            .and_then(|meta| string_field(meta, META_PROMPT_KEYS))
            .or_else(|| record.prompt.clone().filter(|p| !p.trim().is_empty()))
            .or_else(|| nested_prompt(&record.original))
            .unwrap_or_default()
    }

    /// Index records with no archived media file.
    pub fn missing(&self) -> Vec<&IndexRecord> {
        self.index
            .records
            .iter()
            .filter(|record| !self.is_offline(&record.id))
            .collect()
    }

    pub fn view(&self, record: &IndexRecord) -> RecordView {
        let entry = self.scan.get(&record.id);
        RecordView {
            id: record.id.clone(),
            page_url: record.page_url.clone(),
            thumb_url: record.thumb_url.clone(),
            prompt: self.resolve_prompt(record),
            offline: self.is_offline(&record.id),
            files: entry.map(|e| e.files.clone()).unwrap_or_default(),
            meta: entry.and_then(|e| e.meta.clone()),
            meta_error: entry.and_then(|e| e.meta_error.clone()),
        }
    }

    pub fn find(&self, id: &GenId) -> Option<RecordView> {
        self.index.get(id).map(|record| self.view(record))
    }

    /// Case-insensitive substring match over id, URLs, resolved prompt and
    /// serialized metadata. A blank query matches everything.
    pub fn search(&self, query: &str) -> Vec<RecordView> {
        let needle = query.trim().to_lowercase();
        self.index
            .records
            .iter()
            .map(|record| self.view(record))
            .filter(|view| needle.is_empty() || haystack(view).contains(&needle))
            .collect()
    }
}

fn haystack(view: &RecordView) -> String {
    let meta = view
        .meta
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_default();
    [
        view.id.as_str(),
        view.page_url.as_str(),
        view.thumb_url.as_deref().unwrap_or_default(),
        view.prompt.as_str(),
        meta.as_str(),
    ]
    .join("\n")
    .to_lowercase()
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn nested_prompt(original: &Value) -> Option<String> {
    match original {
        Value::Object(map) => string_field(original, META_PROMPT_KEYS)
            .or_else(|| map.values().find_map(nested_prompt)),
        Value::Array(items) => items.iter().find_map(nested_prompt),
        _ => None,
    }
}
