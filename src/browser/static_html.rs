//! Browser backend that fetches pages over plain HTTP and answers DOM
//! queries from the parsed HTML. No JavaScript runs.

use super::{Browser, ElementHandle, PageHandle};
use crate::error::{AnalysisError, LoadError};
use crate::utils::normalize_whitespace;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::timeout;

pub struct StaticBrowser {
    client: reqwest::Client,
}

impl StaticBrowser {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, url: &str) -> Result<String, LoadError> {
        let navigation_error = |e: reqwest::Error| LoadError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(navigation_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();
        if !content_type.contains("html") {
            return Err(LoadError::UnsupportedContent {
                url: url.to_string(),
                content_type,
            });
        }

        response.text().await.map_err(navigation_error)
    }
}

impl Default for StaticBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Browser for StaticBrowser {
    async fn open(&self, url: &str, load_timeout: Duration) -> Result<Box<dyn PageHandle>, LoadError> {
        let html = match timeout(load_timeout, self.fetch(url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(LoadError::Timeout {
                    url: url.to_string(),
                    secs: load_timeout.as_secs(),
                });
            }
        };

        ::log::debug!("Fetched {} bytes of HTML from {}", html.len(), url);
        Ok(Box::new(StaticPage::new(html)))
    }
}

/// A page held as its HTML source
#[derive(Debug, Clone)]
pub struct StaticPage {
    html: String,
}

impl StaticPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

#[async_trait]
impl PageHandle for StaticPage {
    async fn title(&self) -> Result<String, AnalysisError> {
        Ok(document_title(&self.html))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, AnalysisError> {
        select(&self.html, selector, Source::Document).map(boxed)
    }

    async fn close(self: Box<Self>) {}
}

/// An element snapshot taken from the parsed document
#[derive(Debug, Clone)]
pub struct StaticElement {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    inner_html: String,
}

impl StaticElement {
    fn from_element(element: ElementRef<'_>) -> Self {
        let value = element.value();
        Self {
            tag: value.name().to_ascii_lowercase(),
            attributes: value
                .attrs()
                .map(|(name, val)| (name.to_string(), val.to_string()))
                .collect(),
            text: element.text().collect::<String>().trim().to_string(),
            inner_html: element.inner_html(),
        }
    }
}

#[async_trait]
impl ElementHandle for StaticElement {
    async fn tag_name(&self) -> Result<String, AnalysisError> {
        Ok(self.tag.clone())
    }

    async fn attributes(&self) -> Result<BTreeMap<String, String>, AnalysisError> {
        Ok(self.attributes.clone())
    }

    async fn text_content(&self) -> Result<String, AnalysisError> {
        Ok(self.text.clone())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, AnalysisError> {
        select(&self.inner_html, selector, Source::Fragment).map(boxed)
    }
}

enum Source {
    Document,
    Fragment,
}

fn select(html: &str, selector: &str, source: Source) -> Result<Vec<StaticElement>, AnalysisError> {
    let parsed = Selector::parse(selector).map_err(|e| AnalysisError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })?;

    let document = match source {
        Source::Document => Html::parse_document(html),
        Source::Fragment => Html::parse_fragment(html),
    };

    Ok(document
        .select(&parsed)
        .map(StaticElement::from_element)
        .collect())
}

fn boxed(elements: Vec<StaticElement>) -> Vec<Box<dyn ElementHandle>> {
    elements
        .into_iter()
        .map(|e| Box::new(e) as Box<dyn ElementHandle>)
        .collect()
}

fn document_title(html: &str) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    Html::parse_document(html)
        .select(&selector)
        .next()
        .map(|title| normalize_whitespace(&title.text().collect::<String>()))
        .unwrap_or_default()
}
