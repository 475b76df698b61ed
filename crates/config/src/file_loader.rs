use std::{env, fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Configuration loaded from `gensave-config.toml` (or `gensave.config.toml`) at repo root.
/// All fields are optional; present values are exported as environment variables
/// unless the variable is already set.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub archive: ArchiveSection,
    #[serde(default)]
    pub api: ApiSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct SiteSection {
    pub base_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub poll_max_attempts: Option<u32>,
    pub min_image_px: Option<u32>,
    pub cdn_hosts: Option<Vec<String>>,
    pub cookie: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArchiveSection {
    pub preferred_dir: Option<String>,
    pub database_url: Option<String>,
    pub index: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiSection {
    pub addr: Option<String>,
    pub key: Option<String>,
}

const CANDIDATES: &[&str] = &[
    "gensave-config.toml",
    "gensave.config.toml",
    "config/gensave-config.toml",
];

pub fn load_file_config_into_env() -> Result<()> {
    if let Some(cfg) = read_first_config()? {
        export(cfg);
    }
    Ok(())
}

fn export(cfg: FileConfig) {
    set_if_missing("GENSAVE_SITE_BASE_URL", cfg.site.base_url);
    set_if_missing(
        "GENSAVE_POLL_INTERVAL_MS",
        cfg.site.poll_interval_ms.map(|v| v.to_string()),
    );
    set_if_missing(
        "GENSAVE_POLL_MAX_ATTEMPTS",
        cfg.site.poll_max_attempts.map(|v| v.to_string()),
    );
    set_if_missing(
        "GENSAVE_MIN_IMAGE_PX",
        cfg.site.min_image_px.map(|v| v.to_string()),
    );
    set_if_missing("GENSAVE_CDN_HOSTS", cfg.site.cdn_hosts.map(|v| v.join(",")));
    set_if_missing("GENSAVE_COOKIE", cfg.site.cookie);
    set_if_missing("GENSAVE_USER_AGENT", cfg.site.user_agent);

    set_if_missing("GENSAVE_PREFERRED_DIR", cfg.archive.preferred_dir);
    set_if_missing("GENSAVE_DATABASE_URL", cfg.archive.database_url);
    set_if_missing("GENSAVE_INDEX", cfg.archive.index);

    set_if_missing("GENSAVE_API_ADDR", cfg.api.addr);
    set_if_missing("GENSAVE_API_KEY", cfg.api.key);
}

fn read_first_config() -> Result<Option<FileConfig>> {
    for candidate in CANDIDATES {
        let path = Path::new(candidate);
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let cfg: FileConfig = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            return Ok(Some(cfg));
        }
    }
    Ok(None)
}

fn set_if_missing(key: &str, val: Option<String>) {
    if let Some(val) = val {
        let trimmed = val.trim();
        if trimmed.is_empty() {
            return;
        }
        if env::var(key).is_err() {
            env::set_var(key, trimmed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_sections() {
        let cfg: FileConfig = toml::from_str(
            r#"
            [site]
            poll_max_attempts = 10
            cdn_hosts = ["cdn.", "r2.dev"]

            [archive]
            index = "index.json"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.site.poll_max_attempts, Some(10));
        assert_eq!(cfg.site.cdn_hosts.unwrap().len(), 2);
        assert_eq!(cfg.archive.index.as_deref(), Some("index.json"));
        assert!(cfg.api.addr.is_none());
    }
}
