//! Media candidate discovery and the placeholder / real-media heuristics.

use gensave_core::{is_media_extension, MediaKind};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::trace;
use url::Url;

const PLACEHOLDER_TOKENS: &[&str] = &[
    "placeholder",
    "avatar",
    "thumb",
    "icon",
    "logo",
    "sprite",
    "blank",
    "default",
];
const OUTPUT_TOKENS: &[&str] = &["generation", "output", "result", "gen_"];

static SOURCE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("source").expect("source selector"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaCandidate {
    pub url: String,
    pub kind: MediaKind,
}

/// Best candidates seen in a single document pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickScan {
    pub video: Option<MediaCandidate>,
    pub image: Option<MediaCandidate>,
}

#[derive(Debug, Clone)]
pub struct MediaRules {
    cdn_hosts: Vec<String>,
    min_image_px: u32,
}

impl MediaRules {
    pub fn new(cdn_hosts: Vec<String>, min_image_px: u32) -> Self {
        Self {
            cdn_hosts: cdn_hosts.into_iter().map(|h| h.to_lowercase()).collect(),
            min_image_px,
        }
    }

    /// Inline payloads, and icon-like file names that do not also look like outputs.
    pub fn is_placeholder(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        if lower.starts_with("data:") {
            return true;
        }
        let path = Url::parse(&lower)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| lower.clone());
        let file_name = path.rsplit('/').next().unwrap_or_default();
        PLACEHOLDER_TOKENS.iter().any(|t| file_name.contains(t))
            && !OUTPUT_TOKENS.iter().any(|t| path.contains(t))
    }

    /// Known CDN host, or a media file extension.
    pub fn looks_like_media(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let host_match = parsed
            .host_str()
            .map(|host| {
                let host = host.to_lowercase();
                self.cdn_hosts.iter().any(|pattern| host.contains(pattern))
            })
            .unwrap_or(false);

        host_match || path_extension(&parsed).is_some_and(is_media_extension)
    }

    pub fn accepts(&self, url: &str) -> bool {
        !self.is_placeholder(url) && self.looks_like_media(url)
    }

    fn is_too_small(&self, element: &ElementRef<'_>) -> bool {
        ["width", "height"]
            .iter()
            .filter_map(|attr| element.value().attr(attr).and_then(parse_pixels))
            .any(|px| px < self.min_image_px)
    }
}

/// Walks the whole document, shadow-root templates included, and returns
/// the first acceptable video and image.
pub fn scan_document(html: &str, base_url: &str, rules: &MediaRules) -> TickScan {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();
    let mut scan = TickScan::default();

    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let kind = match element.value().name() {
            "video" => MediaKind::Video,
            "img" => MediaKind::Image,
            _ => continue,
        };
        match kind {
            MediaKind::Video if scan.video.is_some() => continue,
            MediaKind::Image if scan.image.is_some() => continue,
            MediaKind::Image if rules.is_too_small(&element) => {
                trace!("skipping undersized image");
                continue;
            }
            _ => {}
        }

        let accepted = candidate_urls(&element, kind)
            .into_iter()
            .filter_map(|raw| resolve(base.as_ref(), &raw))
            .find(|url| rules.accepts(url));

        if let Some(url) = accepted {
            let candidate = MediaCandidate { url, kind };
            match kind {
                MediaKind::Video => scan.video = Some(candidate),
                MediaKind::Image => scan.image = Some(candidate),
            }
        }
        if scan.video.is_some() {
            break;
        }
    }

    scan
}

fn candidate_urls(element: &ElementRef<'_>, kind: MediaKind) -> Vec<String> {
    let mut urls: Vec<String> = ["src", "data-src"]
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .map(str::to_string)
        .collect();

    match kind {
        MediaKind::Video => {
            urls.extend(
                element
                    .select(&SOURCE_SELECTOR)
                    .filter_map(|source| source.value().attr("src"))
                    .map(str::to_string),
            );
        }
        MediaKind::Image => {
            if let Some(srcset) = element.value().attr("srcset") {
                urls.extend(parse_srcset(srcset));
            }
            let picture_sources = element
                .parent()
                .and_then(ElementRef::wrap)
                .filter(|parent| parent.value().name() == "picture")
                .into_iter()
                .flat_map(|picture| picture.select(&SOURCE_SELECTOR))
                .filter_map(|source| source.value().attr("srcset"))
                .flat_map(parse_srcset);
            urls.extend(picture_sources);
        }
    }

    urls.retain(|u| !u.trim().is_empty());
    urls
}

/// Splits `url descriptor, url descriptor` pairs, keeping the URLs.
fn parse_srcset(srcset: &str) -> Vec<String> {
    srcset
        .split(',')
        .filter_map(|entry| entry.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

fn resolve(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.starts_with("data:") {
        return Some(raw.to_string());
    }
    match base {
        Some(base) => base.join(raw).ok().map(String::from),
        None => Url::parse(raw).ok().map(String::from),
    }
}

fn path_extension(url: &Url) -> Option<&str> {
    let segment = url.path_segments()?.last()?;
    let (_, ext) = segment.rsplit_once('.')?;
    (!ext.is_empty()).then_some(ext)
}

fn parse_pixels(raw: &str) -> Option<u32> {
    raw.trim().trim_end_matches("px").trim().parse::<f32>().ok().map(|v| v as u32)
}
