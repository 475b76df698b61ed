//! Normalization of loosely-shaped gallery indexes.

use std::collections::HashSet;
use std::path::Path;

use gensave_core::{extract_gen_id, Error, GenId, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

const LIST_KEYS: &[&str] = &["items", "generations", "data", "results", "entries"];
const ID_KEYS: &[&str] = &["id", "genId", "gen_id", "generationId", "generation_id"];
const URL_KEYS: &[&str] = &["pageUrl", "page_url", "url", "href", "link", "sourceUrl", "SourceURL"];
const THUMB_KEYS: &[&str] = &[
    "thumbUrl",
    "thumb_url",
    "thumbnail",
    "thumbnailUrl",
    "thumbnail_url",
    "image",
    "imageUrl",
    "image_url",
    "poster",
    "preview",
];
const PROMPT_KEYS: &[&str] = &["prompt", "Prompt", "text", "caption", "description"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecord {
    pub id: GenId,
    pub page_url: String,
    pub thumb_url: Option<String>,
    pub prompt: Option<String>,
    /// The raw entry as it appeared in the index.
    pub original: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedIndex {
    pub records: Vec<IndexRecord>,
    /// Entries that yielded no generation id.
    pub skipped: usize,
    /// Entries whose id was already taken by an earlier entry.
    pub duplicates: usize,
}

impl NormalizedIndex {
    pub fn get(&self, id: &GenId) -> Option<&IndexRecord> {
        self.records.iter().find(|record| &record.id == id)
    }
}

/// `<base><id>`, inserting a slash when the base lacks one.
pub fn canonical_page_url(site_base_url: &str, id: &GenId) -> String {
    if site_base_url.ends_with('/') {
        format!("{site_base_url}{id}")
    } else {
        format!("{site_base_url}/{id}")
    }
}

pub fn parse_index(text: &str, site_base_url: &str) -> Result<NormalizedIndex> {
    let raw: Value = serde_json::from_str(text)
        .map_err(|err| Error::Format(format!("index is not valid JSON: {err}")))?;
    normalize_index(&raw, site_base_url)
}

/// Accepts a top-level array or an object holding one; each entry is
/// normalized on its own and dropped (counted) if it has no id.
pub fn normalize_index(raw: &Value, site_base_url: &str) -> Result<NormalizedIndex> {
    let entries = list_of(raw).ok_or_else(|| {
        Error::Format("index must be an array or an object containing an array".into())
    })?;

    let mut seen = HashSet::new();
    let mut index = NormalizedIndex::default();
    for entry in entries {
        match normalize_entry(entry, site_base_url) {
            Some(record) if seen.insert(record.id.clone()) => index.records.push(record),
            Some(record) => {
                debug!(id = %record.id, "duplicate index entry");
                index.duplicates += 1;
            }
            None => index.skipped += 1,
        }
    }

    info!(
        records = index.records.len(),
        skipped = index.skipped,
        duplicates = index.duplicates,
        "normalized index"
    );
    Ok(index)
}

/// Reads an index from a local path or an http(s) URL.
pub async fn load_index(source: &str, site_base_url: &str) -> Result<NormalizedIndex> {
    let text = if source.starts_with("http://") || source.starts_with("https://") {
        let response = reqwest::get(source)
            .await
            .map_err(|err| Error::Network(format!("GET {source}: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("GET {source}: HTTP {status}")));
        }
        response
            .text()
            .await
            .map_err(|err| Error::Network(format!("reading {source}: {err}")))?
    } else {
        tokio::fs::read_to_string(source)
            .await
            .map_err(|err| Error::io(Path::new(source), err))?
    };
    parse_index(&text, site_base_url)
}

fn list_of(raw: &Value) -> Option<&Vec<Value>> {
    match raw {
        Value::Array(items) => Some(items),
        Value::Object(map) => LIST_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .or_else(|| map.values().find_map(Value::as_array)),
        _ => None,
    }
}

fn normalize_entry(entry: &Value, site_base_url: &str) -> Option<IndexRecord> {
    match entry {
        Value::String(raw) => {
            let id = extract_gen_id(raw)?;
            let page_url = if is_http_url(raw) {
                raw.clone()
            } else {
                canonical_page_url(site_base_url, &id)
            };
            Some(IndexRecord {
                id,
                page_url,
                thumb_url: None,
                prompt: None,
                original: entry.clone(),
            })
        }
        Value::Object(map) => {
            let id = id_of(map)?;
            let page_url = first_string(map, URL_KEYS)
                .filter(|url| extract_gen_id(url).as_ref() == Some(&id))
                .map(str::to_string)
                .unwrap_or_else(|| canonical_page_url(site_base_url, &id));
            Some(IndexRecord {
                page_url,
                thumb_url: first_string(map, THUMB_KEYS).map(str::to_string),
                prompt: first_string(map, PROMPT_KEYS).map(str::to_string),
                original: entry.clone(),
                id,
            })
        }
        _ => None,
    }
}

fn id_of(map: &Map<String, Value>) -> Option<GenId> {
    ID_KEYS
        .iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .find_map(extract_gen_id)
        .or_else(|| {
            let serialized = serde_json::to_string(map).ok()?;
            extract_gen_id(&serialized)
        })
}

fn first_string<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .find(|value| !value.trim().is_empty())
}

fn is_http_url(raw: &str) -> bool {
    let lower = raw.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://site.com/g/";

    #[test]
    fn bare_id_string_gets_canonical_url() {
        let index = normalize_index(&json!(["gen_abc123"]), BASE).unwrap();
        assert_eq!(index.records.len(), 1);
        let record = &index.records[0];
        assert_eq!(record.id.as_str(), "gen_abc123");
        assert_eq!(record.page_url, "https://site.com/g/gen_abc123");
        assert!(record.thumb_url.is_none());
    }

    #[test]
    fn url_string_keeps_its_url() {
        let index = normalize_index(&json!(["https://other.site/p/gen_q9?ref=x"]), BASE).unwrap();
        assert_eq!(index.records[0].page_url, "https://other.site/p/gen_q9?ref=x");
    }

    #[test]
    fn nested_items_with_prompt() {
        let index = normalize_index(
            &json!({"items": [{"id": "gen_x1", "prompt": "a cat"}]}),
            BASE,
        )
        .unwrap();
        assert_eq!(index.records.len(), 1);
        assert_eq!(index.records[0].prompt.as_deref(), Some("a cat"));
    }

    #[test]
    fn object_without_array_is_a_format_error() {
        assert!(matches!(normalize_index(&json!({}), BASE), Err(Error::Format(_))));
        assert!(matches!(normalize_index(&json!(42), BASE), Err(Error::Format(_))));
        assert!(matches!(parse_index("{not json", BASE), Err(Error::Format(_))));
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let index = normalize_index(&json!([null, "gen_ok"]), BASE).unwrap();
        assert_eq!(index.records.len(), 1);
        assert_eq!(index.skipped, 1);
    }

    #[test]
    fn id_falls_back_to_serialized_scan() {
        let index = normalize_index(
            &json!([{"thumbnail": "https://cdn.site.com/t/gen_t7.jpg", "caption": "fog"}]),
            BASE,
        )
        .unwrap();
        let record = &index.records[0];
        assert_eq!(record.id.as_str(), "gen_t7");
        assert_eq!(record.page_url, "https://site.com/g/gen_t7");
        assert_eq!(record.thumb_url.as_deref(), Some("https://cdn.site.com/t/gen_t7.jpg"));
        assert_eq!(record.prompt.as_deref(), Some("fog"));
    }

    #[test]
    fn serialized_scan_follows_entry_key_order() {
        let index = parse_index(
            r#"[{"url":"https://site.com/g/gen_first","thumbnail":"https://cdn.site.com/t/gen_second.jpg"}]"#,
            BASE,
        )
        .unwrap();
        let record = &index.records[0];
        assert_eq!(record.id.as_str(), "gen_first");
        assert_eq!(record.page_url, "https://site.com/g/gen_first");
        let keys: Vec<&str> = record.original.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["url", "thumbnail"]);
    }

    #[test]
    fn mismatched_url_is_replaced_by_canonical() {
        let index = normalize_index(
            &json!({"generations": [
                {"genId": "gen_a1", "url": "https://site.com/g/gen_zz"},
                {"genId": "gen_b2", "href": "https://site.com/g/GEN_B2"}
            ]}),
            BASE,
        )
        .unwrap();
        assert_eq!(index.records[0].page_url, "https://site.com/g/gen_a1");
        assert_eq!(index.records[1].page_url, "https://site.com/g/GEN_B2");
    }

    #[test]
    fn duplicates_keep_first_entry() {
        let index = normalize_index(
            &json!([{"id": "gen_d1", "prompt": "first"}, {"id": "GEN_D1", "prompt": "second"}]),
            BASE,
        )
        .unwrap();
        assert_eq!(index.records.len(), 1);
        assert_eq!(index.records[0].prompt.as_deref(), Some("first"));
        assert_eq!(index.duplicates, 1);
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw = json!({"data": ["gen_a", {"id": "gen_b", "text": "t"}, 7]});
        assert_eq!(normalize_index(&raw, BASE).unwrap(), normalize_index(&raw, BASE).unwrap());
    }

    #[test]
    fn base_without_trailing_slash() {
        let id = extract_gen_id("gen_z").unwrap();
        assert_eq!(canonical_page_url("https://s/g", &id), "https://s/g/gen_z");
    }

    #[tokio::test]
    async fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, r#"{"items": ["gen_f1", "gen_f2"]}"#).unwrap();
        let index = load_index(path.to_str().unwrap(), BASE).await.unwrap();
        assert_eq!(index.records.len(), 2);
    }
}
