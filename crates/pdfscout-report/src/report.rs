use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use pdfscout_crawler::{FetchError, PageFetcher, PdfHit, PdfRegistry};
use serde::Serialize;
use url::Url;

use crate::metadata::{human_size, PdfProperties};

/// One row of the tabular report.
#[derive(Debug, Clone, Serialize)]
pub struct PdfRecord {
    pub file_name: String,
    pub url: String,
    pub file_size: String,
    pub file_size_kilobytes: f64,
    pub last_modified_date: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
    pub creation_date: String,
    pub producer: String,
    pub number_of_pages: usize,
    pub number_of_images: usize,
    pub version: String,
    pub source: String,
    pub text_around_link: String,
}

impl PdfRecord {
    fn build(pdf_url: &str, hits: &[PdfHit], bytes: &[u8], props: PdfProperties) -> Self {
        let file_name = props
            .title
            .clone()
            .unwrap_or_else(|| default_file_name(pdf_url));

        Self {
            file_name,
            url: pdf_url.to_string(),
            file_size: human_size(bytes.len() as u64),
            file_size_kilobytes: bytes.len() as f64 / 1024.0,
            last_modified_date: format_date(props.modified),
            author: props.author.unwrap_or_default(),
            subject: props.subject.unwrap_or_default(),
            keywords: props.keywords.unwrap_or_default(),
            creation_date: format_date(props.created),
            producer: props.producer.unwrap_or_default(),
            number_of_pages: props.pages,
            number_of_images: props.images,
            version: props.version,
            source: distinct_join(hits.iter().map(|hit| hit.source.as_str())),
            text_around_link: distinct_join(hits.iter().map(|hit| hit.text.as_str())),
        }
    }
}

fn format_date(date: Option<chrono::NaiveDateTime>) -> String {
    date.map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Last path segment of the PDF URL, falling back to its host.
fn default_file_name(pdf_url: &str) -> String {
    let Ok(url) = Url::parse(pdf_url) else {
        return pdf_url.to_string();
    };
    url.path_segments()
        .and_then(|segments| segments.last().map(str::to_string))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| url.host_str().unwrap_or_default().to_string())
}

/// Joins distinct values in first-seen order; multiple referrers collapse
/// into one cell.
fn distinct_join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut seen = BTreeSet::new();
    let mut parts = Vec::new();
    for value in values {
        if seen.insert(value) {
            parts.push(value);
        }
    }
    parts.join("; ")
}

/// Downloads every discovered PDF and writes its document properties as
/// one CSV row. A PDF that can't be downloaded or parsed is logged and
/// skipped, the report is never aborted.
pub async fn write_report<F: PageFetcher>(
    fetcher: &F,
    registry: &PdfRegistry,
    csv_path: &Path,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(csv_path)
        .with_context(|| format!("couldn't create report {}", csv_path.display()))?;

    for (pdf_url, hits) in registry {
        let url = match Url::parse(pdf_url).map_err(FetchError::Url) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Error reading {pdf_url}: {e}");
                continue;
            }
        };
        let bytes = match fetcher.fetch_bytes(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Error reading {pdf_url}: {e}");
                continue;
            }
        };
        match PdfProperties::parse(&bytes) {
            Ok(props) => {
                log::info!("Reading: {pdf_url}");
                writer.serialize(PdfRecord::build(pdf_url, hits, &bytes, props))?;
            }
            Err(e) => {
                log::warn!("Document isn't a PDF: {pdf_url} ({e})");
            }
        }
    }

    writer.flush()?;
    Ok(())
}

/// Writes the raw PDF registry (URL -> referrer/anchor-text pairs) as
/// pretty JSON next to the CSV report.
pub fn dump_registry(registry: &PdfRegistry, json_path: &Path) -> Result<()> {
    let file = File::create(json_path)
        .with_context(|| format!("couldn't create {}", json_path.display()))?;
    serde_json::to_writer_pretty(file, registry)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn hit(source: &str, text: &str) -> PdfHit {
        PdfHit {
            source: source.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn default_file_names() {
        assert_eq!(
            default_file_name("https://example.gov/docs/budget.pdf"),
            "budget.pdf"
        );
        assert_eq!(default_file_name("https://example.gov"), "example.gov");
    }

    #[test]
    fn distinct_join_keeps_first_seen_order() {
        let values = ["b", "a", "b", "c", "a"];
        assert_eq!(distinct_join(values.into_iter()), "b; a; c");
    }

    #[test]
    fn record_prefers_pdf_title() {
        let props = PdfProperties {
            title: Some("Annual Budget".to_string()),
            pages: 3,
            version: "1.4".to_string(),
            ..Default::default()
        };
        let hits = vec![
            hit("https://example.gov/a", "Budget"),
            hit("https://example.gov/b", "Budget"),
        ];
        let record = PdfRecord::build(
            "https://example.gov/docs/budget.pdf",
            &hits,
            &[0u8; 2048],
            props,
        );
        assert_eq!(record.file_name, "Annual Budget");
        assert_eq!(record.file_size, "2.0KB");
        assert_eq!(record.file_size_kilobytes, 2.0);
        assert_eq!(record.source, "https://example.gov/a; https://example.gov/b");
        assert_eq!(record.text_around_link, "Budget");
        assert_eq!(record.last_modified_date, "");
    }

    /// Serves PDF bodies from memory; everything else is a 404.
    struct FakeDocs(HashMap<String, Vec<u8>>);

    impl PageFetcher for FakeDocs {
        async fn fetch(&self, _url: &Url) -> Result<String, FetchError> {
            Err(FetchError::Status(404))
        }

        async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
            self.0
                .get(url.as_str())
                .cloned()
                .ok_or(FetchError::Status(404))
        }
    }

    #[tokio::test]
    async fn report_skips_failed_downloads_and_bad_documents() {
        let fetcher = FakeDocs(HashMap::from([
            (
                "https://example.gov/good.pdf".to_string(),
                crate::metadata::sample_pdf("Annual Budget"),
            ),
            (
                "https://example.gov/garbage.pdf".to_string(),
                b"<html>not a pdf</html>".to_vec(),
            ),
        ]));

        let mut registry = PdfRegistry::new();
        for url in [
            "https://example.gov/good.pdf",
            "https://example.gov/missing.pdf",
            "https://example.gov/garbage.pdf",
            "not a url",
        ] {
            registry.insert(
                url.to_string(),
                vec![hit("https://example.gov/documents", "Budget")],
            );
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_report(&fetcher, &registry, &path).await.unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "file_name");
        assert_eq!(&headers[1], "url");

        let rows: Vec<csv::StringRecord> =
            reader.records().map(|row| row.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "Annual Budget");
        assert_eq!(&rows[0][1], "https://example.gov/good.pdf");
    }

    #[test]
    fn registry_dump_round_trips() {
        let mut registry = PdfRegistry::new();
        registry.insert(
            "https://example.gov/budget.pdf".to_string(),
            vec![hit("https://example.gov/a", "Budget")],
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pdfs.json");
        dump_registry(&registry, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: PdfRegistry = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, registry);
    }
}
