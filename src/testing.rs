//! In-memory browser and completion service used by the unit tests.

use crate::browser::static_html::StaticPage;
use crate::browser::{Browser, ElementHandle, PageHandle};
use crate::completion::CompletionService;
use crate::config::CallSettings;
use crate::error::{AnalysisError, LoadError, ServiceError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serves HTML strings keyed by URL; unknown URLs fail to load
#[derive(Default)]
pub struct FixtureBrowser {
    pages: HashMap<String, String>,
    opened: Mutex<Vec<String>>,
    closed: Arc<AtomicUsize>,
    shutdowns: AtomicUsize,
}

impl FixtureBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// URLs passed to `open`, in call order
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn open_count(&self, url: &str) -> usize {
        self.opened().iter().filter(|u| *u == url).count()
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn open(&self, url: &str, _timeout: Duration) -> Result<Box<dyn PageHandle>, LoadError> {
        self.opened.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(html) => Ok(Box::new(FixturePage {
                inner: StaticPage::new(html.as_str()),
                closed: Arc::clone(&self.closed),
            })),
            None => Err(LoadError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }),
        }
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

struct FixturePage {
    inner: StaticPage,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl PageHandle for FixturePage {
    async fn title(&self) -> Result<String, AnalysisError> {
        self.inner.title().await
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, AnalysisError> {
        self.inner.query_all(selector).await
    }

    async fn close(self: Box<Self>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// An element whose every introspection fails
pub struct BrokenElement;

#[async_trait]
impl ElementHandle for BrokenElement {
    async fn tag_name(&self) -> Result<String, AnalysisError> {
        Err(AnalysisError::Script("stale element reference".to_string()))
    }

    async fn attributes(&self) -> Result<BTreeMap<String, String>, AnalysisError> {
        Err(AnalysisError::Script("stale element reference".to_string()))
    }

    async fn text_content(&self) -> Result<String, AnalysisError> {
        Err(AnalysisError::Script("stale element reference".to_string()))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, AnalysisError> {
        Err(AnalysisError::Selector {
            selector: selector.to_string(),
            message: "stale element reference".to_string(),
        })
    }
}

type Responder = dyn Fn(&str) -> Result<String, ServiceError> + Send + Sync;

/// Completion service answering through a closure and recording every prompt
pub struct ScriptedCompletion {
    responder: Box<Responder>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new(responder: impl Fn(&str) -> Result<String, ServiceError> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always fails with a request error
    pub fn failing() -> Self {
        Self::new(|_| Err(ServiceError::Request("connection refused".to_string())))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, prompt: &str, _settings: CallSettings) -> Result<String, ServiceError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.responder)(prompt)
    }
}
