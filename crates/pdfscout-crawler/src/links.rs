use scraper::{Html, Selector};
use url::{Position, Url};

lazy_static::lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a[href]").unwrap();
}

/// An extracted hyperlink together with its visible anchor text.
#[derive(Debug, Clone)]
pub struct Link {
    pub url: Url,
    pub text: String,
}

/// Extracts all http(s) anchor links from a page, resolved against the
/// page URL and normalized.
pub fn extract_links(html: &str, base: &Url) -> Vec<Link> {
    let document = Html::parse_document(html);

    let mut links = Vec::new();
    for element in document.select(&ANCHOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Some(url) = resolve(base, href) {
            let text = element.text().collect::<String>().trim().to_string();
            links.push(Link { url, text });
        }
    }
    links
}

/// Resolves a possibly-relative href against the current page and
/// normalizes it. Non-http(s) schemes (mailto:, javascript:, ...) and
/// unparseable hrefs yield `None`.
fn resolve(base: &Url, href: &str) -> Option<Url> {
    let joined = match Url::parse(href) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(href).ok()?,
        Err(_) => return None,
    };
    match joined.scheme() {
        "http" | "https" => Url::parse(&normalized(&joined)).ok(),
        _ => None,
    }
}

/// Canonical string form of a URL: the trailing slash is stripped from the
/// path while query and fragment survive. Idempotent.
pub fn normalized(url: &Url) -> String {
    let mut out = String::with_capacity(url.as_str().len());
    out.push_str(&url[..Position::BeforePath]);
    out.push_str(url.path().trim_end_matches('/'));
    out.push_str(&url[Position::AfterPath..]);
    out
}

/// The PDF heuristic: a `.pdf` path, a `.cfm?id=` query-id pattern, or a
/// `/download` endpoint. Matching links are recorded but never traversed.
pub fn is_pdf_link(url: &Url) -> bool {
    let path = url.path();
    path.to_ascii_lowercase().ends_with(".pdf")
        || url.as_str().contains(".cfm?id=")
        || path.ends_with("/download")
}
