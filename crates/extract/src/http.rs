use bytes::Bytes;
use gensave_config::AppConfig;
use gensave_core::{Error, Result};
use reqwest::header::{COOKIE, ORIGIN, REFERER};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, warn};
use url::Url;

/// HTTP access with the single-fallback policy.
///
/// The first attempt carries the page's credentials (cookie, referer, origin).
/// If it fails at the transport level, one bare request is sent instead.
/// Non-success statuses are never retried.
#[derive(Clone)]
pub struct Fetcher {
    http: Client,
    cookie: Option<String>,
}

impl Fetcher {
    pub fn new(user_agent: &str, cookie: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|err| Error::Network(format!("failed to build http client: {err}")))?;
        Ok(Self { http, cookie })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.user_agent, config.cookie.clone())
    }

    pub async fn fetch_bytes(&self, url: &str, referer: Option<&str>) -> Result<Bytes> {
        let response = self.send_with_fallback(url, referer).await?;
        response
            .bytes()
            .await
            .map_err(|err| Error::Network(format!("reading body of {url}: {err}")))
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.send_with_fallback(url, None).await?;
        response
            .text()
            .await
            .map_err(|err| Error::Network(format!("reading body of {url}: {err}")))
    }

    async fn send_with_fallback(&self, url: &str, referer: Option<&str>) -> Result<Response> {
        let response = match self.credentialed(url, referer).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(%url, "fetch failed, retrying without credentials: {err}");
                self.http
                    .get(url)
                    .send()
                    .await
                    .map_err(|err| Error::Network(format!("GET {url}: {err}")))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("GET {url}: HTTP {status}")));
        }
        debug!(%url, %status, "fetched");
        Ok(response)
    }

    fn credentialed(&self, url: &str, referer: Option<&str>) -> RequestBuilder {
        let mut request = self.http.get(url);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
            if let Some(origin) = origin_of(referer) {
                request = request.header(ORIGIN, origin);
            }
        }
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie);
        }
        request
    }
}

fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.origin() {
        origin @ url::Origin::Tuple(..) => Some(origin.ascii_serialization()),
        url::Origin::Opaque(_) => None,
    }
}
