use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Run-wide crawl settings, independent of any particular site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Politeness delay in seconds between page fetches.
    #[serde(default)]
    pub delay: f32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            delay: 0.0,
            timeout: default_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    String::from("pdfscout")
}

fn default_timeout() -> u64 {
    90
}

impl CrawlConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.delay >= 0.0 && self.delay.is_finite(),
            "delay must be a non-negative number of seconds"
        );
        Ok(())
    }
}

/// Crawl settings for one seed URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Domains (or URLs) considered in-scope for traversal.
    pub allow_list: Vec<String>,

    /// When set, only links on these exact subdomains are followed.
    #[serde(default)]
    pub allow_subdomains: Option<Vec<String>>,

    /// Maximum number of hops from the seed.
    #[serde(default = "default_depth")]
    pub depth: usize,

    /// Sweep the pages listed in the site's sitemap instead of
    /// doing a breadth-first walk.
    #[serde(default)]
    pub use_sitemap: bool,
}

fn default_depth() -> usize {
    7
}

impl SiteConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.depth >= 1, "depth must be at least 1");
        ensure!(!self.allow_list.is_empty(), "allow_list must not be empty");
        Ok(())
    }
}

/// The per-site configuration file, keyed by seed URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRegistry(HashMap<String, SiteConfig>);

impl SiteRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("couldn't open site config {}", path.display()))?;
        let registry: Self = serde_json::from_reader(file)
            .with_context(|| format!("couldn't parse site config {}", path.display()))?;
        Ok(registry)
    }

    /// Fails when the seed URL has no entry, before any traversal starts.
    pub fn site(&self, seed_url: &str) -> Result<&SiteConfig> {
        self.0
            .get(seed_url)
            .ok_or_else(|| anyhow!("seed URL {seed_url} not present in site config"))
    }
}
