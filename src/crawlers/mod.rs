//! Bounded-depth, same-origin site discovery.

pub mod site_map;
pub mod web;

use crate::browser::Browser;
use crate::config::DiscoveryConfig;
use crate::error::DiscoveryError;
use crate::filter::UrlFilter;
use crate::results::{CrawlReport, SiteDiscovery};
use crate::utils::Deadline;
use url::Url;

pub use site_map::SiteMap;
pub use web::{DiscoveredLink, PageCrawler, PageVisit};

/// A link waiting to be followed; the root job has no referrer
#[derive(Debug)]
struct CrawlJob {
    url: Url,
    depth: usize,
    referrer: Option<(Url, String)>,
}

/// Crawl the site at `config.start_url` up to `config.max_depth` link hops.
///
/// Pages are visited depth-first from an explicit worklist, each URL at most
/// once. A link is recorded as a navigation edge when it is followed, after
/// the subtrees of the links before it on the same page, and the first edge
/// to a target wins. Links past the depth limit still get their edge. If the
/// deadline passes, the pages collected so far are returned with
/// `cancelled` set in the report.
pub async fn discover_site(
    config: &DiscoveryConfig,
    browser: &dyn Browser,
    deadline: Deadline,
) -> Result<(SiteDiscovery, CrawlReport), DiscoveryError> {
    let start_url = Url::parse(&config.start_url).map_err(|source| DiscoveryError::InvalidUrl {
        url: config.start_url.clone(),
        source,
    })?;
    let start_url = UrlFilter::normalize_url(&start_url);
    let filter = UrlFilter::for_site(&start_url, &config.include_patterns, &config.exclude_patterns)?;
    let crawler = PageCrawler::new(
        browser,
        &filter,
        &config.limits,
        config.page_load_timeout(),
        config.analysis_timeout(),
    );

    ::log::info!(
        "Starting discovery at {} (max depth {})",
        start_url,
        config.max_depth
    );

    let mut site = SiteMap::new(start_url.as_str());
    let mut report = CrawlReport::default();
    let mut worklist = vec![CrawlJob {
        url: start_url.clone(),
        depth: 0,
        referrer: None,
    }];

    while let Some(job) = worklist.pop() {
        if deadline.expired() {
            ::log::warn!(
                "Time budget exhausted, stopping discovery with {} pending pages",
                worklist.len() + 1
            );
            report.cancelled = true;
            break;
        }
        if let Some((from, via)) = &job.referrer {
            if site.record_edge(job.url.as_str(), from.as_str(), via) {
                ::log::debug!("Navigation edge: {} -> {} via {:?}", from, job.url, via);
            }
        }
        if job.depth > config.max_depth || !site.claim(job.url.as_str()) {
            ::log::trace!("Not crawling {} (depth {} or already visited)", job.url, job.depth);
            continue;
        }

        ::log::info!("Crawling page: {} (depth {})", job.url, job.depth);
        report.pages_visited += 1;

        let visit = match crawler.visit(&job.url).await {
            Ok(visit) => visit,
            Err(e) => {
                ::log::warn!("Error crawling {}: {}", job.url, e);
                report.load_failures.push(job.url.to_string());
                continue;
            }
        };
        report.analysis_failures += visit.analysis_failures;

        site.populate(visit.record);

        // Reversed so the first link on the page is popped first
        worklist.extend(visit.links.into_iter().rev().map(|link| CrawlJob {
            url: link.url,
            depth: job.depth + 1,
            referrer: Some((job.url.clone(), link.text)),
        }));
    }

    let root_failed = report.load_failures.iter().any(|u| u == start_url.as_str());
    if root_failed || site.is_empty() {
        return Err(DiscoveryError::Empty {
            url: start_url.to_string(),
        });
    }

    ::log::info!(
        "Discovery finished: {} pages, {} load failures, {} analysis failures",
        site.len(),
        report.load_failures.len(),
        report.analysis_failures
    );

    Ok((site.into_discovery(), report))
}
