use crate::analyzers::{analyze_element, analyze_form};
use crate::browser::{Browser, INTERACTIVE_SELECTOR, PageHandle};
use crate::config::CrawlLimits;
use crate::error::{AnalysisError, LoadError};
use crate::filter::UrlFilter;
use crate::results::{ElementTag, PageRecord};
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

/// A same-site link found on a page
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredLink {
    pub url: Url,
    /// Display text of the anchor
    pub text: String,
}

/// Result of loading and analyzing one page
#[derive(Debug)]
pub struct PageVisit {
    pub record: PageRecord,
    /// Crawlable links in document order, excluding links back to the page itself
    pub links: Vec<DiscoveredLink>,
    pub analysis_failures: usize,
}

/// Loads single pages through a [`Browser`] and turns them into page records
pub struct PageCrawler<'a> {
    browser: &'a dyn Browser,
    filter: &'a UrlFilter,
    limits: &'a CrawlLimits,
    load_timeout: Duration,
    analysis_timeout: Duration,
}

impl<'a> PageCrawler<'a> {
    pub fn new(
        browser: &'a dyn Browser,
        filter: &'a UrlFilter,
        limits: &'a CrawlLimits,
        load_timeout: Duration,
        analysis_timeout: Duration,
    ) -> Self {
        Self {
            browser,
            filter,
            limits,
            load_timeout,
            analysis_timeout,
        }
    }

    /// Load and analyze `url`.
    ///
    /// Only a load failure is an error. Analysis problems degrade the record
    /// and are counted in [`PageVisit::analysis_failures`].
    pub async fn visit(&self, url: &Url) -> Result<PageVisit, LoadError> {
        let page = self.browser.open(url.as_str(), self.load_timeout).await?;

        let visit = match timeout(self.analysis_timeout, self.analyze(page.as_ref(), url)).await {
            Ok(visit) => visit,
            Err(_) => {
                let error = AnalysisError::Timeout {
                    url: url.to_string(),
                };
                ::log::warn!("{}", error);
                PageVisit {
                    record: PageRecord::placeholder(url.as_str()),
                    links: Vec::new(),
                    analysis_failures: 1,
                }
            }
        };

        page.close().await;
        Ok(visit)
    }

    async fn analyze(&self, page: &dyn PageHandle, url: &Url) -> PageVisit {
        let mut record = PageRecord::placeholder(url.as_str());
        let mut links = Vec::new();
        let mut analysis_failures = 0;

        match page.title().await {
            Ok(title) => record.title = title,
            Err(e) => {
                ::log::warn!("Failed to read title of {}: {}", url, e);
                analysis_failures += 1;
            }
        }

        let handles = page.query_all(INTERACTIVE_SELECTOR).await.unwrap_or_else(|e| {
            ::log::warn!("Failed to query elements on {}: {}", url, e);
            analysis_failures += 1;
            Vec::new()
        });
        ::log::info!(
            "Processing {} out of {} elements on {}",
            handles.len().min(self.limits.max_elements_per_page),
            handles.len(),
            url
        );

        for handle in handles.iter().take(self.limits.max_elements_per_page) {
            let analysis = analyze_element(handle.as_ref(), self.limits.max_text_length).await;
            if analysis.is_degraded() {
                analysis_failures += 1;
            }
            let element = analysis.record;

            if element.tag == ElementTag::Anchor {
                if let Some(link) = element
                    .href
                    .as_deref()
                    .and_then(|href| self.filter.resolve_link(url, href))
                    .filter(|link| link != url)
                {
                    links.push(DiscoveredLink {
                        url: link,
                        text: element.text.clone(),
                    });
                }
            }
            record.elements.push(element);
        }

        let forms = page.query_all("form").await.unwrap_or_else(|e| {
            ::log::warn!("Failed to query forms on {}: {}", url, e);
            analysis_failures += 1;
            Vec::new()
        });
        for (i, form) in forms.iter().take(self.limits.max_forms_per_page).enumerate() {
            match analyze_form(form.as_ref(), self.limits).await {
                Ok(analysis) => {
                    analysis_failures += analysis.degraded_elements;
                    let mut form = analysis.record;
                    form.action = resolve_action(url, &form.action);
                    record.forms.push(form);
                }
                Err(e) => {
                    ::log::warn!("Error analyzing form {} on {}: {}", i, url, e);
                    analysis_failures += 1;
                }
            }
        }

        ::log::info!(
            "Found {} elements, {} forms and {} links in {}",
            record.elements.len(),
            record.forms.len(),
            links.len(),
            url
        );

        PageVisit {
            record,
            links,
            analysis_failures,
        }
    }
}

/// Absolute submission target of a form, as a browser resolves `action`;
/// an empty action submits to the page itself
fn resolve_action(page_url: &Url, action: &str) -> String {
    page_url
        .join(action.trim())
        .map(String::from)
        .unwrap_or_else(|_| action.to_string())
}
