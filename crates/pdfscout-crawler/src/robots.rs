use texting_robots::Robot;
use url::Url;

use crate::fetch::PageFetcher;

/// What a site's robots.txt contributes to a crawl run.
#[derive(Debug, Clone)]
pub struct RobotsInfo {
    /// First sitemap listed in robots.txt, or `<origin>/sitemap.xml`.
    pub sitemap: String,
    /// Manual delay plus any crawl-delay the site declares.
    pub delay: f32,
}

/// Reads `<origin>/robots.txt` for the seed. Never fatal: when the file is
/// missing or unreadable the defaults apply.
pub async fn probe_robots<F: PageFetcher>(fetcher: &F, seed: &Url, manual_delay: f32) -> RobotsInfo {
    let default_sitemap = seed
        .join("/sitemap.xml")
        .map(String::from)
        .unwrap_or_else(|_| format!("{seed}sitemap.xml"));
    let mut info = RobotsInfo {
        sitemap: default_sitemap,
        delay: manual_delay,
    };

    let robots_url = match seed.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            log::warn!("No robots.txt location for {seed}: {e}");
            return info;
        }
    };
    let body = match fetcher.fetch(&robots_url).await {
        Ok(body) => body,
        Err(e) => {
            log::warn!("Couldn't read {robots_url}: {e}");
            return info;
        }
    };
    let robot = match Robot::new("*", body.as_bytes()) {
        Ok(robot) => robot,
        Err(e) => {
            log::warn!("Couldn't parse {robots_url}: {e}");
            return info;
        }
    };

    if let Some(sitemap) = robot.sitemaps.first() {
        info.sitemap = sitemap.clone();
    }
    if let Some(crawl_delay) = robot.delay {
        info.delay += crawl_delay as f32;
    }
    info
}
