//! Generation identifier extraction.
//!
//! Ids are found by a case-insensitive regex search; the first match in
//! left-to-right order wins. The matched text is kept verbatim, but two ids
//! that differ only in ASCII case compare equal.

use std::fmt;
use std::hash::{Hash, Hasher};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Suffix of the metadata sidecar written next to each media file.
pub const SIDECAR_SUFFIX: &str = ".meta.json";

static GEN_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)gen_[a-z0-9]+").expect("generation id regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenId(String);

impl GenId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased form used for equality and hashing.
    pub fn key(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl PartialEq for GenId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for GenId {}

impl Hash for GenId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl PartialOrd for GenId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GenId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for GenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns the first generation id found anywhere in `input`.
pub fn extract_gen_id(input: &str) -> Option<GenId> {
    GEN_ID_RE
        .find(input)
        .map(|found| GenId(found.as_str().to_string()))
}

/// Like [`extract_gen_id`], retried with the sidecar suffix stripped.
pub fn extract_gen_id_from_filename(name: &str) -> Option<GenId> {
    extract_gen_id(name).or_else(|| strip_sidecar_suffix(name).and_then(extract_gen_id))
}

/// True for any `*.json` file name; `*.meta.json` is the canonical sidecar form.
pub fn is_sidecar_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".json")
}

fn strip_sidecar_suffix(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(SIDECAR_SUFFIX.len())?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (stem, suffix) = name.split_at(split);
    suffix.eq_ignore_ascii_case(SIDECAR_SUFFIX).then_some(stem)
}
