//! Application-wide configuration helpers.
//!
//! Reads environment variables (with optional `.env`) and provides strongly
//! typed config structs consumed by other crates.

mod file_loader;

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub use file_loader::{load_file_config_into_env, FileConfig};

pub const DEFAULT_SITE_BASE_URL: &str = "https://genstudio.example/g/";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://gensave.db";
pub const DEFAULT_API_ADDR: &str = "127.0.0.1:8787";
pub const DEFAULT_USER_AGENT: &str = "gensave/0.1";
pub const DEFAULT_CDN_HOSTS: &str =
    "cdn.,cloudfront.net,storage.googleapis.com,r2.dev,blob.core.windows.net";

#[derive(Clone)]
pub struct AppConfig {
    /// Prefix used to build a canonical page URL from a generation id.
    pub site_base_url: String,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
    /// Images smaller than this in either dimension are treated as icons.
    pub min_image_px: u32,
    pub cdn_hosts: Vec<String>,
    /// Folder hint used when access has to be re-requested silently.
    pub preferred_dir: PathBuf,
    pub database_url: String,
    /// Index file path or http(s) URL.
    pub index_source: Option<String>,
    pub cookie: Option<String>,
    pub user_agent: String,
    pub api_addr: String,
    pub api_key: Option<String>,
}

// Credentials are never printed.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("site_base_url", &self.site_base_url)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("poll_max_attempts", &self.poll_max_attempts)
            .field("min_image_px", &self.min_image_px)
            .field("cdn_hosts", &self.cdn_hosts)
            .field("preferred_dir", &self.preferred_dir)
            .field("database_url", &self.database_url)
            .field("index_source", &self.index_source)
            .field("cookie", &redacted(&self.cookie))
            .field("user_agent", &self.user_agent)
            .field("api_addr", &self.api_addr)
            .field("api_key", &redacted(&self.api_key))
            .finish()
    }
}

fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "<redacted>")
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let site_base_url = env::var("GENSAVE_SITE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_SITE_BASE_URL.to_string());
        let poll_interval_ms = read_env_u64("GENSAVE_POLL_INTERVAL_MS", 500)?;
        let poll_max_attempts = read_env_u32("GENSAVE_POLL_MAX_ATTEMPTS", 40)?;
        let min_image_px = read_env_u32("GENSAVE_MIN_IMAGE_PX", 64)?;
        let cdn_hosts = read_env_list("GENSAVE_CDN_HOSTS", DEFAULT_CDN_HOSTS);
        let preferred_dir = env::var("GENSAVE_PREFERRED_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_preferred_dir());
        let database_url =
            env::var("GENSAVE_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let index_source = read_env_opt("GENSAVE_INDEX");
        let cookie = read_env_opt("GENSAVE_COOKIE");
        let user_agent =
            env::var("GENSAVE_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());
        let api_addr = env::var("GENSAVE_API_ADDR").unwrap_or_else(|_| DEFAULT_API_ADDR.to_string());
        let api_key = read_env_opt("GENSAVE_API_KEY");

        Ok(Self {
            site_base_url,
            poll_interval_ms,
            poll_max_attempts,
            min_image_px,
            cdn_hosts,
            preferred_dir,
            database_url,
            index_source,
            cookie,
            user_agent,
            api_addr,
            api_key,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site_base_url: DEFAULT_SITE_BASE_URL.to_string(),
            poll_interval_ms: 500,
            poll_max_attempts: 40,
            min_image_px: 64,
            cdn_hosts: split_list(DEFAULT_CDN_HOSTS),
            preferred_dir: default_preferred_dir(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            index_source: None,
            cookie: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            api_addr: DEFAULT_API_ADDR.to_string(),
            api_key: None,
        }
    }
}

fn default_preferred_dir() -> PathBuf {
    dirs_next::download_dir()
        .map(|dir| dir.join("gensave"))
        .unwrap_or_else(|| PathBuf::from("gensave-archive"))
}

fn read_env_u32(key: &str, default: u32) -> Result<u32> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u32>()
            .with_context(|| format!("Failed to parse {key} as u32")),
        Err(_) => Ok(default),
    }
}

fn read_env_u64(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {key} as u64")),
        Err(_) => Ok(default),
    }
}

fn read_env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_env_list(key: &str, default: &str) -> Vec<String> {
    split_list(&env::var(key).unwrap_or_else(|_| default.to_string()))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_drops_blank_items() {
        assert_eq!(split_list(" cdn. , ,r2.dev"), vec!["cdn.", "r2.dev"]);
    }

    #[test]
    fn debug_output_hides_credentials() {
        let cfg = AppConfig {
            cookie: Some("session=abc".into()),
            api_key: Some("k3y".into()),
            ..AppConfig::default()
        };
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("session=abc"));
        assert!(!printed.contains("k3y"));
        assert!(printed.contains("cookie: Some(\"<redacted>\")"));
        assert!(printed.contains("site_base_url"));
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.poll_max_attempts, 40);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(500));
        assert_eq!(cfg.min_image_px, 64);
        assert!(cfg.cdn_hosts.iter().any(|h| h == "cloudfront.net"));
    }
}
