use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::PageFetcher;
use crate::links;
use crate::scope::DomainScope;

/// One discovery of a PDF: the page that referenced it and the anchor text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfHit {
    pub source: String,
    pub text: String,
}

/// PDF URL mapped to every (referrer, anchor text) pair that pointed at it.
/// Duplicate discoveries accumulate, they are never deduplicated here.
pub type PdfRegistry = BTreeMap<String, Vec<PdfHit>>;

#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub pdfs: PdfRegistry,
    pub visited: HashSet<String>,
}

/// Breadth-first walk over same-domain hyperlinks starting from `seed`,
/// recording every link that matches the PDF heuristic along the way.
///
/// Fetches are strictly sequential with `delay` between them, as a
/// politeness constraint. A failed page fetch contributes zero links and
/// the walk continues; only configuration problems (bad seed, seed outside
/// the allow-set, zero depth) are fatal.
pub async fn crawl<F: PageFetcher>(
    fetcher: &F,
    scope: &DomainScope,
    seed: &str,
    max_depth: usize,
    delay: Duration,
) -> Result<CrawlOutcome> {
    ensure!(max_depth >= 1, "max depth must be at least 1");
    let seed = Url::parse(seed).with_context(|| format!("invalid seed URL {seed}"))?;
    ensure!(
        scope.allows(&seed),
        "seed URL {seed} is not covered by the allow list"
    );

    let mut frontier = VecDeque::new();
    let mut queued = HashSet::new();
    let mut visited = HashSet::new();
    let mut pdfs = PdfRegistry::new();

    queued.insert(links::normalized(&seed));
    frontier.push_back((seed, max_depth));

    while let Some((page_url, depth)) = frontier.pop_front() {
        let page_key = links::normalized(&page_url);
        if visited.contains(&page_key) {
            continue;
        }
        visited.insert(page_key.clone());

        tokio::time::sleep(delay).await;
        let page = match fetcher.fetch(&page_url).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Skipping page {page_url}: {e}");
                continue;
            }
        };

        for link in links::extract_links(&page, &page_url) {
            let key = links::normalized(&link.url);
            if links::is_pdf_link(&link.url) {
                // PDFs are terminal, never enqueued for traversal.
                pdfs.entry(key).or_default().push(PdfHit {
                    source: page_key.clone(),
                    text: link.text,
                });
            } else if !queued.contains(&key) && scope.allows(&link.url) && depth - 1 > 0 {
                queued.insert(key);
                frontier.push_back((link.url, depth - 1));
            }
        }
        log::debug!("Visited {page_url}, frontier size {}", frontier.len());
    }

    log::info!("Crawl done, visited {} pages", visited.len());
    Ok(CrawlOutcome { pdfs, visited })
}
