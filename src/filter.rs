use regex::Regex;
use url::Url;

/// Static assets that never describe a page worth analyzing
const ASSET_PATTERN: &str = r"\.(jpg|jpeg|png|gif|css|js|ico|svg|woff|woff2|ttf|eot|pdf|zip|mp4|mp3)$";

/// Configuration for URL filtering during discovery
#[derive(Debug, Clone)]
pub struct UrlFilterConfig {
    /// Origin (`scheme://host[:port]`) every crawled URL must share.
    /// `None` admits any http(s) origin.
    pub required_origin: Option<String>,

    /// Regex patterns for URLs to include (if empty, all URLs are included unless excluded)
    pub include_patterns: Vec<String>,

    /// Regex patterns for URLs to exclude (these take precedence over include patterns)
    pub exclude_patterns: Vec<String>,
}

impl Default for UrlFilterConfig {
    fn default() -> Self {
        Self {
            required_origin: None,
            include_patterns: Vec::new(),
            exclude_patterns: vec![ASSET_PATTERN.to_string()],
        }
    }
}

/// Decides which discovered links belong to the site being crawled
#[derive(Debug)]
pub struct UrlFilter {
    config: UrlFilterConfig,
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl UrlFilter {
    /// Create a new URL filter from configuration
    pub fn new(config: UrlFilterConfig) -> Result<Self, regex::Error> {
        let include_regexes = config
            .include_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = config
            .exclude_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            include_regexes,
            exclude_regexes,
        })
    }

    /// Filter scoped to the origin of `root`, with asset exclusions plus any extra patterns
    pub fn for_site(
        root: &Url,
        include_patterns: &[String],
        exclude_patterns: &[String],
    ) -> Result<Self, regex::Error> {
        let mut config = UrlFilterConfig {
            required_origin: Some(root.origin().ascii_serialization()),
            include_patterns: include_patterns.to_vec(),
            ..UrlFilterConfig::default()
        };
        config.exclude_patterns.extend(exclude_patterns.iter().cloned());
        Self::new(config)
    }

    /// Determine if a URL should be crawled based on all filtering rules
    pub fn should_crawl(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        if !self.is_in_origin_scope(url) {
            return false;
        }

        // Check regex exclusions (these take precedence)
        let url_str = url.as_str();
        if self.exclude_regexes.iter().any(|re| re.is_match(url_str)) {
            return false;
        }

        // If include patterns are specified, at least one must match
        self.include_regexes.is_empty() || self.include_regexes.iter().any(|re| re.is_match(url_str))
    }

    /// Resolve an `href` found on `page_url` to the normalized URL to crawl, if in scope
    pub fn resolve_link(&self, page_url: &Url, href: &str) -> Option<Url> {
        let href = href.trim();
        // In-page anchors never lead to another page
        if href.is_empty() || href.starts_with('#') {
            return None;
        }

        let resolved = page_url.join(href).ok()?;
        if !self.should_crawl(&resolved) {
            ::log::debug!("URL filter rejected: {}", resolved);
            return None;
        }
        ::log::debug!("URL filter accepted: {}", resolved);

        Some(Self::normalize_url(&resolved))
    }

    fn is_in_origin_scope(&self, url: &Url) -> bool {
        match &self.config.required_origin {
            Some(origin) => url.origin().ascii_serialization() == *origin,
            None => true,
        }
    }

    /// Create a normalized version of the URL (e.g., removing fragments)
    pub fn normalize_url(url: &Url) -> Url {
        let mut normalized = url.clone();
        normalized.set_fragment(None);
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site_filter() -> UrlFilter {
        let root = Url::parse("https://example.com/index.html").unwrap();
        UrlFilter::for_site(&root, &[], &[]).unwrap()
    }

    #[test]
    fn test_unscoped_filter() {
        let filter = UrlFilter::new(UrlFilterConfig::default()).unwrap();

        // Common file types should be excluded
        let image_url = Url::parse("https://example.com/image.jpg").unwrap();
        assert!(!filter.should_crawl(&image_url));

        // Without an origin restriction any http(s) page passes
        let html_url = Url::parse("https://other.org/page.html").unwrap();
        assert!(filter.should_crawl(&html_url));

        let mail = Url::parse("mailto:someone@example.com").unwrap();
        assert!(!filter.should_crawl(&mail));
    }

    #[test]
    fn test_origin_restriction() {
        let filter = site_filter();

        let same = Url::parse("https://example.com/about").unwrap();
        assert!(filter.should_crawl(&same));

        let other_host = Url::parse("https://other.com/page").unwrap();
        assert!(!filter.should_crawl(&other_host));

        // Scheme and port are part of the origin
        let http = Url::parse("http://example.com/about").unwrap();
        assert!(!filter.should_crawl(&http));
        let port = Url::parse("https://example.com:8443/about").unwrap();
        assert!(!filter.should_crawl(&port));
    }

    #[test]
    fn test_resolve_root_relative_and_relative_links() {
        let filter = site_filter();
        let page = Url::parse("https://example.com/docs/intro").unwrap();

        assert_eq!(
            filter.resolve_link(&page, "/pricing").map(String::from),
            Some("https://example.com/pricing".to_string())
        );
        assert_eq!(
            filter.resolve_link(&page, "setup#step-2").map(String::from),
            Some("https://example.com/docs/setup".to_string())
        );
        assert_eq!(
            filter
                .resolve_link(&page, "https://example.com/contact")
                .map(String::from),
            Some("https://example.com/contact".to_string())
        );
    }

    #[test]
    fn test_resolve_rejects_noise() {
        let filter = site_filter();
        let page = Url::parse("https://example.com/").unwrap();

        assert!(filter.resolve_link(&page, "").is_none());
        assert!(filter.resolve_link(&page, "#top").is_none());
        assert!(filter.resolve_link(&page, "javascript:void(0)").is_none());
        assert!(filter.resolve_link(&page, "mailto:hi@example.com").is_none());
        assert!(filter.resolve_link(&page, "https://cdn.other.net/app").is_none());
        assert!(filter.resolve_link(&page, "/static/logo.png").is_none());
    }

    #[test]
    fn test_regex_patterns() {
        let root = Url::parse("https://example.com/").unwrap();
        let filter = UrlFilter::for_site(
            &root,
            &[r"/docs/".to_string()],
            &[r"/docs/draft/".to_string()],
        )
        .unwrap();

        let included = Url::parse("https://example.com/docs/page").unwrap();
        assert!(filter.should_crawl(&included));

        let not_included = Url::parse("https://example.com/blog/post").unwrap();
        assert!(!filter.should_crawl(&not_included));

        // Matching exclude pattern should be excluded even if it matches include
        let excluded = Url::parse("https://example.com/docs/draft/page").unwrap();
        assert!(!filter.should_crawl(&excluded));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let root = Url::parse("https://example.com/").unwrap();
        assert!(UrlFilter::for_site(&root, &["(".to_string()], &[]).is_err());
    }
}
