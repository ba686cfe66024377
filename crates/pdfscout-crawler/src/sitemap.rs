use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use lazy_static::lazy_static;
use sxd_document::{dom, parser};
use url::Url;

use crate::fetch::{FetchError, PageFetcher};
use crate::links;
use crate::walker::{PdfHit, PdfRegistry};

lazy_static! {
    static ref XP_FACTORY: sxd_xpath::Factory = sxd_xpath::Factory::new();
}

#[derive(Debug, Clone, Copy)]
enum SitemapKind {
    Index,
    Urlset,
}

fn sitemap_kind(root: dom::Root) -> Option<SitemapKind> {
    let elem = root.children().into_iter().find_map(|c| c.element())?;
    match elem.name().local_part() {
        "sitemapindex" => Some(SitemapKind::Index),
        "urlset" => Some(SitemapKind::Urlset),
        _ => None,
    }
}

fn loc_values(root: dom::Root) -> anyhow::Result<Vec<String>> {
    let mut context = sxd_xpath::Context::new();
    context.set_namespace("sm", "http://www.sitemaps.org/schemas/sitemap/0.9");
    let xpath = XP_FACTORY
        .build("//sm:loc")?
        .ok_or_else(|| anyhow::anyhow!("missing XPath"))?;
    let value = xpath.evaluate(&context, root)?;

    let mut locs = Vec::new();
    if let sxd_xpath::Value::Nodeset(nodes) = value {
        for node in nodes.document_order() {
            locs.push(node.string_value());
        }
    }
    Ok(locs)
}

/// Collects the page URLs reachable from a sitemap, recursing into sitemap
/// indexes. Sub-sitemaps are fetched sequentially with the politeness
/// delay. A sitemap that can't be fetched or parsed contributes zero pages.
pub async fn collect_pages<F: PageFetcher>(
    fetcher: &F,
    sitemap_url: &str,
    delay: Duration,
) -> BTreeSet<String> {
    let mut pages = BTreeSet::new();
    gather(fetcher, sitemap_url.to_string(), delay, &mut pages).await;
    pages
}

fn gather<'a, F>(
    fetcher: &'a F,
    sitemap_url: String,
    delay: Duration,
    pages: &'a mut BTreeSet<String>,
) -> Pin<Box<dyn Future<Output = ()> + 'a>>
where
    F: PageFetcher,
{
    Box::pin(async move {
        let url = match Url::parse(&sitemap_url).map_err(FetchError::Url) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Skipping sitemap {sitemap_url}: {e}");
                return;
            }
        };
        let xml = match fetcher.fetch(&url).await {
            Ok(xml) => xml,
            Err(e) => {
                log::warn!("Skipping sitemap {sitemap_url}: {e}");
                return;
            }
        };
        let package = match parser::parse(&xml) {
            Ok(package) => package,
            Err(e) => {
                log::warn!("Skipping XML: {sitemap_url} got: {e}");
                return;
            }
        };
        let document = package.as_document();

        let Some(kind) = sitemap_kind(document.root()) else {
            log::warn!("Skipping XML: {sitemap_url} has an unknown root node");
            return;
        };
        let locs = match loc_values(document.root()) {
            Ok(locs) => locs,
            Err(e) => {
                log::warn!("Skipping XML: {sitemap_url} got: {e}");
                return;
            }
        };

        match kind {
            SitemapKind::Index => {
                for sm_url in locs {
                    tokio::time::sleep(delay).await;
                    gather(fetcher, sm_url, delay, &mut *pages).await;
                }
            }
            SitemapKind::Urlset => pages.extend(locs),
        }
    })
}

/// The degenerate no-frontier traversal: visit a fixed page list once,
/// recording PDF-heuristic matches. No depth or domain filtering.
pub async fn sweep_pages<F: PageFetcher>(
    fetcher: &F,
    pages: &BTreeSet<String>,
    delay: Duration,
) -> PdfRegistry {
    let mut pdfs = PdfRegistry::new();

    for page_url in pages {
        let url = match Url::parse(page_url).map_err(FetchError::Url) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Skipping page {page_url}: {e}");
                continue;
            }
        };

        tokio::time::sleep(delay).await;
        let page = match fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Skipping page {page_url}: {e}");
                continue;
            }
        };

        for link in links::extract_links(&page, &url) {
            if links::is_pdf_link(&link.url) {
                pdfs.entry(links::normalized(&link.url))
                    .or_default()
                    .push(PdfHit {
                        source: page_url.clone(),
                        text: link.text,
                    });
            }
        }
    }

    pdfs
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::fetch::FetchError;

    struct FakeFetcher(HashMap<String, String>);

    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
            self.0
                .get(url.as_str())
                .cloned()
                .ok_or(FetchError::Status(404))
        }
    }

    const SM_NS: &str = r#"xmlns="http://www.sitemaps.org/schemas/sitemap/0.9""#;

    #[tokio::test]
    async fn index_recursion_collects_urlset_pages() {
        let index = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <sitemapindex {SM_NS}>
                <sitemap><loc>https://example.gov/sm-a.xml</loc></sitemap>
                <sitemap><loc>https://example.gov/sm-b.xml</loc></sitemap>
            </sitemapindex>"#
        );
        let sm_a = format!(
            r#"<urlset {SM_NS}>
                <url><loc>https://example.gov/page1</loc></url>
                <url><loc>https://example.gov/page2</loc></url>
            </urlset>"#
        );
        let sm_b = format!(
            r#"<urlset {SM_NS}>
                <url><loc>https://example.gov/page3</loc></url>
            </urlset>"#
        );
        let fetcher = FakeFetcher(HashMap::from([
            ("https://example.gov/sitemap.xml".to_string(), index),
            ("https://example.gov/sm-a.xml".to_string(), sm_a),
            ("https://example.gov/sm-b.xml".to_string(), sm_b),
        ]));

        let pages = collect_pages(
            &fetcher,
            "https://example.gov/sitemap.xml",
            Duration::ZERO,
        )
        .await;

        assert_eq!(
            pages.into_iter().collect::<Vec<_>>(),
            vec![
                "https://example.gov/page1",
                "https://example.gov/page2",
                "https://example.gov/page3",
            ]
        );
    }

    #[tokio::test]
    async fn malformed_sitemap_contributes_nothing() {
        let fetcher = FakeFetcher(HashMap::from([(
            "https://example.gov/sitemap.xml".to_string(),
            "<not really xml".to_string(),
        )]));
        let pages = collect_pages(
            &fetcher,
            "https://example.gov/sitemap.xml",
            Duration::ZERO,
        )
        .await;
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn invalid_page_urls_are_skipped() {
        let fetcher = FakeFetcher(HashMap::from([(
            "https://example.gov/page1".to_string(),
            r#"<a href="/minutes.pdf">Minutes</a>"#.to_string(),
        )]));
        let pages: BTreeSet<String> = [
            "not a url".to_string(),
            "https://example.gov/page1".to_string(),
        ]
        .into();

        let pdfs = sweep_pages(&fetcher, &pages, Duration::ZERO).await;
        assert_eq!(pdfs.len(), 1);
        assert!(pdfs.contains_key("https://example.gov/minutes.pdf"));
    }

    #[tokio::test]
    async fn sweep_records_pdf_hits_without_traversal() {
        let fetcher = FakeFetcher(HashMap::from([
            (
                "https://example.gov/page1".to_string(),
                r#"<a href="/minutes.pdf">Minutes</a><a href="/page2">Next</a>"#.to_string(),
            ),
            (
                "https://example.gov/page2".to_string(),
                r#"<a href="/minutes.pdf">Meeting minutes</a>"#.to_string(),
            ),
        ]));
        let pages: BTreeSet<String> = [
            "https://example.gov/page1".to_string(),
            "https://example.gov/page2".to_string(),
        ]
        .into();

        let pdfs = sweep_pages(&fetcher, &pages, Duration::ZERO).await;
        let hits = &pdfs["https://example.gov/minutes.pdf"];
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "https://example.gov/page1");
        assert_eq!(hits[0].text, "Minutes");
        assert_eq!(hits[1].text, "Meeting minutes");
    }
}
