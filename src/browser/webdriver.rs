use super::{Browser, ElementHandle, PageHandle};
use crate::error::{AnalysisError, DiscoveryError, LoadError};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::timeout;

/// Common WebDriver endpoints tried when the configured one is unreachable
const FALLBACK_WEBDRIVER_URLS: [&str; 4] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

const ATTRIBUTES_SCRIPT: &str = r#"
const el = arguments[0];
const attributes = {};
for (let i = 0; i < el.attributes.length; i++) {
    attributes[el.attributes[i].name] = el.attributes[i].value;
}
return attributes;
"#;

const TEXT_CONTENT_SCRIPT: &str = "return (arguments[0].textContent || '').trim();";

/// One WebDriver session, shared by every page of a crawl run
pub struct WebDriverBrowser {
    client: Client,
}

impl WebDriverBrowser {
    /// Connect to the WebDriver at `webdriver_url`, falling back to common local ports
    pub async fn connect(webdriver_url: &str, headless: bool) -> Result<Self, DiscoveryError> {
        let capabilities = session_capabilities(headless);

        match new_session(webdriver_url, &capabilities).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", webdriver_url);
                return Ok(Self { client });
            }
            Err(e) => {
                ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            }
        }

        for url in FALLBACK_WEBDRIVER_URLS {
            if url == webdriver_url {
                continue;
            }
            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = new_session(url, &capabilities).await {
                ::log::debug!("Connected to fallback WebDriver at {}", url);
                return Ok(Self { client });
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(DiscoveryError::Browser(format!(
            "no WebDriver server reachable at {} or common local ports",
            webdriver_url
        )))
    }
}

async fn new_session(
    webdriver_url: &str,
    capabilities: &Map<String, Value>,
) -> Result<Client, fantoccini::error::NewSessionError> {
    ClientBuilder::native()
        .capabilities(capabilities.clone())
        .connect(webdriver_url)
        .await
}

fn session_capabilities(headless: bool) -> Map<String, Value> {
    let mut capabilities = Map::new();
    if headless {
        capabilities.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": ["--headless=new", "--disable-gpu", "--no-sandbox"] }),
        );
        capabilities.insert(
            "moz:firefoxOptions".to_string(),
            json!({ "args": ["-headless"] }),
        );
    }
    capabilities
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn open(&self, url: &str, load_timeout: Duration) -> Result<Box<dyn PageHandle>, LoadError> {
        match timeout(load_timeout, self.client.goto(url)).await {
            Ok(Ok(())) => Ok(Box::new(WebDriverPage {
                client: self.client.clone(),
            })),
            Ok(Err(e)) => Err(navigation_error(e, url)),
            Err(_) => Err(LoadError::Timeout {
                url: url.to_string(),
                secs: load_timeout.as_secs(),
            }),
        }
    }

    async fn shutdown(&self) {
        if let Err(e) = self.client.clone().close().await {
            ::log::warn!("Failed to close WebDriver session: {}", e);
        }
    }
}

fn navigation_error(error: CmdError, url: &str) -> LoadError {
    let message = error.to_string();
    if message.contains("Unable to find session") {
        ::log::warn!("Lost WebDriver session while accessing {}", url);
    }
    LoadError::Navigation {
        url: url.to_string(),
        message,
    }
}

fn script_error(error: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Script(error.to_string())
}

fn selector_error(selector: &str, error: CmdError) -> AnalysisError {
    AnalysisError::Selector {
        selector: selector.to_string(),
        message: error.to_string(),
    }
}

struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    fn wrap(&self, elements: Vec<Element>) -> Vec<Box<dyn ElementHandle>> {
        elements
            .into_iter()
            .map(|element| {
                Box::new(WebDriverElement {
                    client: self.client.clone(),
                    element,
                }) as Box<dyn ElementHandle>
            })
            .collect()
    }
}

#[async_trait]
impl PageHandle for WebDriverPage {
    async fn title(&self) -> Result<String, AnalysisError> {
        self.client.title().await.map_err(script_error)
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, AnalysisError> {
        let elements = self
            .client
            .find_all(Locator::Css(selector))
            .await
            .map_err(|e| selector_error(selector, e))?;
        Ok(self.wrap(elements))
    }

    async fn close(self: Box<Self>) {
        // Stop any background activity of the page before the next navigation
        if let Err(e) = self.client.goto("about:blank").await {
            ::log::debug!("Failed to release page: {}", e);
        }
    }
}

struct WebDriverElement {
    client: Client,
    element: Element,
}

impl WebDriverElement {
    async fn evaluate(&self, script: &str) -> Result<Value, AnalysisError> {
        let argument = serde_json::to_value(&self.element).map_err(script_error)?;
        self.client
            .execute(script, vec![argument])
            .await
            .map_err(script_error)
    }
}

#[async_trait]
impl ElementHandle for WebDriverElement {
    async fn tag_name(&self) -> Result<String, AnalysisError> {
        self.element
            .tag_name()
            .await
            .map(|tag| tag.to_ascii_lowercase())
            .map_err(script_error)
    }

    async fn attributes(&self) -> Result<BTreeMap<String, String>, AnalysisError> {
        let value = self.evaluate(ATTRIBUTES_SCRIPT).await?;
        serde_json::from_value(value).map_err(script_error)
    }

    async fn text_content(&self) -> Result<String, AnalysisError> {
        match self.evaluate(TEXT_CONTENT_SCRIPT).await? {
            Value::String(text) => Ok(text),
            Value::Null => Ok(String::new()),
            other => Err(AnalysisError::Script(format!(
                "textContent evaluated to {}",
                other
            ))),
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, AnalysisError> {
        let elements = self
            .element
            .find_all(Locator::Css(selector))
            .await
            .map_err(|e| selector_error(selector, e))?;
        Ok(elements
            .into_iter()
            .map(|element| {
                Box::new(WebDriverElement {
                    client: self.client.clone(),
                    element,
                }) as Box<dyn ElementHandle>
            })
            .collect())
    }
}
