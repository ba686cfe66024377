mod config;
mod fetch;
mod links;
mod robots;
mod scope;
mod sitemap;
mod walker;

pub use config::{CrawlConfig, SiteConfig, SiteRegistry};
pub use fetch::{FetchError, HttpFetcher, PageFetcher};
pub use links::{extract_links, is_pdf_link, normalized, Link};
pub use robots::{probe_robots, RobotsInfo};
pub use scope::{registered_domain, subdomain, DomainScope};
pub use sitemap::{collect_pages, sweep_pages};
pub use walker::{crawl, CrawlOutcome, PdfHit, PdfRegistry};

pub use anyhow;
