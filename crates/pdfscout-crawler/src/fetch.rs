use std::io::prelude::*;
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, USER_AGENT};
use url::Url;

use crate::config::CrawlConfig;

/// How a single page fetch can fail. Every variant is mapped to the same
/// policy by callers: log a warning and treat the page as having no links.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed")]
    Connect,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("couldn't decode body: {0}")]
    Decode(String),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Decode(e.to_string())
        }
    }
}

/// The seam between traversal logic and the network. Traversal code only
/// sees this trait, so tests can drive it with a fixed in-memory graph.
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;

    /// Raw body download, used for PDF documents.
    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        Ok(self.fetch(url).await?.into_bytes())
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(conf: &CrawlConfig) -> anyhow::Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .gzip(true)
            .deflate(true)
            .timeout(Duration::from_secs(conf.timeout))
            .build()?;
        Ok(Self {
            client,
            user_agent: conf.user_agent.clone(),
        })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        // Some sitemap archives are served as gzip files rather than with
        // gzip transfer encoding, so reqwest won't decompress them.
        let page = match resp.headers().get(CONTENT_TYPE) {
            Some(c) if c == "application/x-gzip" || c == "application/gzip" => {
                let compressed = resp.bytes().await?;
                let mut gz = GzDecoder::new(&compressed[..]);
                let mut page = String::new();
                gz.read_to_string(&mut page)
                    .map_err(|e| FetchError::Decode(e.to_string()))?;
                page
            }
            _ => resp.text().await?,
        };

        Ok(page)
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let resp = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            // Some document servers only serve the file when asked for an
            // inline PDF.
            .header(CONTENT_TYPE, "application/pdf")
            .header(CONTENT_DISPOSITION, "inline")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(resp.bytes().await?.to_vec())
    }
}
