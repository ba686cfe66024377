use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use pdfscout_crawler::{
    collect_pages, crawl, probe_robots, sweep_pages, CrawlConfig, DomainScope, HttpFetcher,
    SiteRegistry,
};
use pdfscout_report::{dump_registry, write_report};
use tokio::runtime;
use url::Url;

/// Crawl a government site for PDFs and report their document properties
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Args {
    /// Starting URL, must have an entry in the sites config
    pub url: String,
    /// Path where the CSV report will be written
    pub output_path: PathBuf,
    /// Path to the JSON file mapping seed URLs to per-site crawl settings
    #[clap(long, default_value = "config.json")]
    pub sites: PathBuf,
    /// Delay in seconds between page fetches
    #[clap(long)]
    pub delay: Option<f32>,
    /// Per-request timeout in seconds
    #[clap(long)]
    pub timeout: Option<u64>,
    /// Override the crawler user agent
    #[clap(long)]
    pub user_agent: Option<String>,
    /// When quiet no logs are outputted
    #[clap(long, short)]
    pub quiet: bool,
}

impl From<&Args> for CrawlConfig {
    fn from(args: &Args) -> Self {
        let mut conf = CrawlConfig::default();
        if let Some(delay) = args.delay {
            conf.delay = delay;
        }
        if let Some(timeout) = args.timeout {
            conf.timeout = timeout;
        }
        if let Some(user_agent) = &args.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        conf
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let conf = CrawlConfig::from(&args);
    conf.validate()?;

    let sites = SiteRegistry::load(&args.sites)?;
    let site = sites.site(&args.url)?;
    site.validate()?;

    let seed = Url::parse(&args.url)?;
    let fetcher = HttpFetcher::new(&conf)?;

    let robots = probe_robots(&fetcher, &seed, conf.delay).await;
    let delay = Duration::from_secs_f32(robots.delay);

    let pdfs = if site.use_sitemap {
        let pages = collect_pages(&fetcher, &robots.sitemap, delay).await;
        log::info!("Pages found from sitemap: {}", pages.len());
        sweep_pages(&fetcher, &pages, delay).await
    } else {
        log::info!("Doing recursive search instead");
        let scope = DomainScope::from_site(site)?;
        let outcome = crawl(&fetcher, &scope, &args.url, site.depth, delay).await?;
        outcome.pdfs
    };
    log::info!("PDFs found: {}", pdfs.len());

    dump_registry(&pdfs, &args.output_path.with_extension("json"))?;

    write_report(&fetcher, &pdfs, &args.output_path).await
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if !args.quiet {
        if env::var("RUST_LOG").is_err() {
            env::set_var(
                "RUST_LOG",
                "pdfscout=info,pdfscout_crawler=info,pdfscout_report=info",
            );
        }
        env_logger::init();
    }

    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(run(args))
}
