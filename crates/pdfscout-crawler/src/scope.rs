use std::collections::HashSet;

use anyhow::{anyhow, ensure, Result};
use url::Url;

use crate::config::SiteConfig;

/// Public-suffix-aware root domain of a host, e.g. `example.co.uk` for
/// `www.example.co.uk`.
pub fn registered_domain(host: &str) -> Option<String> {
    psl::domain_str(host).map(|d| d.to_ascii_lowercase())
}

/// Host prefix left of the registered domain, empty when the host is the
/// registered domain itself.
pub fn subdomain(host: &str) -> Option<String> {
    let host = host.to_ascii_lowercase();
    let domain = registered_domain(&host)?;
    let prefix = host.strip_suffix(domain.as_str())?;
    Some(prefix.strip_suffix('.').unwrap_or(prefix).to_string())
}

/// The immutable allow-set derived once per run from a site's
/// configuration. Traversal never follows a link outside of it.
#[derive(Debug, Clone)]
pub struct DomainScope {
    domains: HashSet<String>,
    subdomains: Option<HashSet<String>>,
}

impl DomainScope {
    pub fn from_site(site: &SiteConfig) -> Result<Self> {
        let mut domains = HashSet::new();
        for entry in &site.allow_list {
            let host = match Url::parse(entry) {
                Ok(url) => url
                    .host_str()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("allow list entry {entry} has no host"))?,
                Err(_) => entry.trim().trim_start_matches('.').to_string(),
            };
            let domain = registered_domain(&host)
                .ok_or_else(|| anyhow!("no registered domain in allow list entry {entry}"))?;
            domains.insert(domain);
        }
        ensure!(!domains.is_empty(), "allow list is empty");

        let subdomains = site
            .allow_subdomains
            .as_ref()
            .map(|subs| subs.iter().map(|s| s.to_ascii_lowercase()).collect());

        Ok(Self {
            domains,
            subdomains,
        })
    }

    pub fn allows(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let Some(domain) = registered_domain(host) else {
            return false;
        };
        if !self.domains.contains(&domain) {
            return false;
        }
        match &self.subdomains {
            Some(allowed) => subdomain(host).is_some_and(|sub| allowed.contains(&sub)),
            None => true,
        }
    }
}
