use crate::results::{NavigationEdge, PageRecord, SiteDiscovery};
use std::collections::{HashMap, HashSet};

/// Page registry and navigation graph of one discovery run.
///
/// Owned by the crawl loop; the only mutations are claim-if-absent for pages
/// and insert-if-absent for edges.
#[derive(Debug, Default)]
pub struct SiteMap {
    start_url: String,
    pages: Vec<PageRecord>,
    index: HashMap<String, usize>,
    populated: HashSet<String>,
    navigation: Vec<NavigationEdge>,
    edge_targets: HashSet<String>,
}

impl SiteMap {
    pub fn new(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            ..Self::default()
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Register `url` with an empty placeholder record.
    ///
    /// Returns `false` if the URL was already registered; a URL is crawled
    /// only by whoever claims it first.
    pub fn claim(&mut self, url: &str) -> bool {
        if self.contains(url) {
            return false;
        }
        self.index.insert(url.to_string(), self.pages.len());
        self.pages.push(PageRecord::placeholder(url));
        true
    }

    /// Replace the placeholder of a claimed URL with its analyzed record, once
    pub fn populate(&mut self, record: PageRecord) -> bool {
        let Some(&slot) = self.index.get(&record.url) else {
            ::log::warn!("Ignoring record for unclaimed page {}", record.url);
            return false;
        };
        if !self.populated.insert(record.url.clone()) {
            ::log::warn!("Ignoring second record for page {}", record.url);
            return false;
        }
        self.pages[slot] = record;
        true
    }

    /// Record how `target` was reached unless an edge to it already exists
    pub fn record_edge(&mut self, target: &str, from: &str, via: &str) -> bool {
        if !self.edge_targets.insert(target.to_string()) {
            return false;
        }
        self.navigation.push(NavigationEdge {
            target: target.to_string(),
            from: from.to_string(),
            via: via.to_string(),
        });
        true
    }

    pub fn into_discovery(self) -> SiteDiscovery {
        SiteDiscovery {
            start_url: self.start_url,
            pages: self.pages,
            navigation: self.navigation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_idempotent() {
        let mut site = SiteMap::new("https://a.test/");
        assert!(site.claim("https://a.test/"));
        assert!(!site.claim("https://a.test/"));
        assert_eq!(site.len(), 1);

        let discovery = site.into_discovery();
        assert_eq!(discovery.pages[0], PageRecord::placeholder("https://a.test/"));
    }

    #[test]
    fn test_populate_once_and_only_when_claimed() {
        let mut site = SiteMap::new("https://a.test/");
        let mut record = PageRecord::placeholder("https://a.test/");
        record.title = "Home".into();

        assert!(!site.populate(record.clone()));
        assert!(site.claim("https://a.test/"));
        assert!(site.populate(record.clone()));

        let mut again = record.clone();
        again.title = "Changed".into();
        assert!(!site.populate(again));

        assert_eq!(site.into_discovery().pages[0].title, "Home");
    }

    #[test]
    fn test_first_edge_wins() {
        let mut site = SiteMap::new("https://a.test/");
        assert!(site.record_edge("https://a.test/c", "https://a.test/", "C"));
        assert!(!site.record_edge("https://a.test/c", "https://a.test/b", "See C"));

        let discovery = site.into_discovery();
        assert_eq!(discovery.navigation.len(), 1);
        assert_eq!(discovery.navigation[0].from, "https://a.test/");
        assert_eq!(discovery.navigation[0].via, "C");
    }

    #[test]
    fn test_pages_keep_claim_order() {
        let mut site = SiteMap::new("https://a.test/");
        for url in ["https://a.test/", "https://a.test/z", "https://a.test/b"] {
            site.claim(url);
        }
        let urls: Vec<_> = site
            .into_discovery()
            .pages
            .into_iter()
            .map(|p| p.url)
            .collect();
        assert_eq!(urls, vec!["https://a.test/", "https://a.test/z", "https://a.test/b"]);
    }
}
