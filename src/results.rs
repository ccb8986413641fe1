use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tag of an interactive element, read verbatim from the DOM
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementTag {
    Anchor,
    Button,
    Input,
    Select,
    Textarea,
    Other(String),
}

impl ElementTag {
    pub fn as_str(&self) -> &str {
        match self {
            ElementTag::Anchor => "a",
            ElementTag::Button => "button",
            ElementTag::Input => "input",
            ElementTag::Select => "select",
            ElementTag::Textarea => "textarea",
            ElementTag::Other(tag) => tag,
        }
    }
}

impl From<String> for ElementTag {
    fn from(tag: String) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "a" => ElementTag::Anchor,
            "button" => ElementTag::Button,
            "input" => ElementTag::Input,
            "select" => ElementTag::Select,
            "textarea" => ElementTag::Textarea,
            _ => ElementTag::Other(tag),
        }
    }
}

impl From<ElementTag> for String {
    fn from(tag: ElementTag) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for ElementTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded structural record of one interactive element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub tag: ElementTag,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_button: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_submit: bool,
}

impl ElementRecord {
    /// A record carrying only a tag, used when introspection fails
    pub fn empty(tag: ElementTag) -> Self {
        Self {
            tag,
            attributes: BTreeMap::new(),
            text: String::new(),
            href: None,
            input_type: None,
            name: None,
            placeholder: None,
            is_button: false,
            is_submit: false,
        }
    }

    /// Short human label: visible text, else placeholder, else name, else tag
    pub fn label(&self) -> &str {
        if !self.text.is_empty() {
            return &self.text;
        }
        [&self.placeholder, &self.name]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| self.tag.as_str())
    }

    pub fn is_hidden_input(&self) -> bool {
        self.input_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
    }
}

/// Likely purpose of a form, from its surface text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormPurpose {
    Login,
    Registration,
    Contact,
    Search,
    Generic,
}

impl FormPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormPurpose::Login => "login",
            FormPurpose::Registration => "registration",
            FormPurpose::Contact => "contact",
            FormPurpose::Search => "search",
            FormPurpose::Generic => "generic",
        }
    }
}

impl fmt::Display for FormPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRecord {
    pub inputs: Vec<ElementRecord>,
    pub submit: Option<ElementRecord>,
    pub action: String,
    pub method: String,
    pub likely_purpose: FormPurpose,
}

/// Structural summary of one visited page, keyed by normalized URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub elements: Vec<ElementRecord>,
    pub forms: Vec<FormRecord>,
}

impl PageRecord {
    /// Record claimed before the page is loaded; final if loading fails
    pub fn placeholder(url: &str) -> Self {
        Self {
            url: url.to_string(),
            title: String::new(),
            elements: Vec::new(),
            forms: Vec::new(),
        }
    }
}

/// How one page was first reached during the crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEdge {
    /// The page the edge leads to
    pub target: String,
    /// The page the link was found on
    pub from: String,
    /// Display text of the link
    pub via: String,
}

/// Everything the crawl stage produced: page registry and navigation graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteDiscovery {
    pub start_url: String,
    /// Pages in the order they were claimed
    pub pages: Vec<PageRecord>,
    /// At most one edge per target, in the order they were recorded
    pub navigation: Vec<NavigationEdge>,
}

impl SiteDiscovery {
    pub fn page(&self, url: &str) -> Option<&PageRecord> {
        self.pages.iter().find(|p| p.url == url)
    }

    /// The edge through which `url` was first discovered
    pub fn edge_to(&self, url: &str) -> Option<&NavigationEdge> {
        self.navigation.iter().find(|e| e.target == url)
    }

    /// Edges where `url` is either the source or the target
    pub fn edges_touching<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a NavigationEdge> {
        self.navigation
            .iter()
            .filter(move |e| e.from == url || e.target == url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Navigation,
    Form,
    Interaction,
    Validation,
    #[default]
    #[serde(other)]
    Content,
}

impl FeatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Navigation => "navigation",
            FeatureKind::Form => "form",
            FeatureKind::Interaction => "interaction",
            FeatureKind::Validation => "validation",
            FeatureKind::Content => "content",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural payload carried by locally derived features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum FeatureDetails {
    Navigation {
        from_page: String,
        via_element: String,
    },
    Form {
        purpose: FormPurpose,
        inputs: Vec<ElementRecord>,
        submit_button: Option<ElementRecord>,
    },
    Interaction {
        element: ElementRecord,
    },
}

/// A candidate test-relevant behaviour of one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edge_cases: Vec<String>,
    pub page_url: String,
    pub page_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<FeatureDetails>,
}

/// Failure counts of the crawl stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlReport {
    pub pages_visited: usize,
    /// URLs whose page failed to load
    pub load_failures: Vec<String>,
    /// Elements or forms that could not be introspected
    pub analysis_failures: usize,
    pub cancelled: bool,
}

/// Failure counts of the feature identification stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentifyReport {
    pub pages_analyzed: usize,
    pub pages_without_features: usize,
    pub service_failures: usize,
    pub malformed_responses: usize,
    pub features: usize,
    pub cancelled: bool,
}

/// Failure counts of the scenario synthesis stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub pages: usize,
    pub sections: usize,
    pub placeholder_sections: usize,
    pub scenarios: usize,
    pub cancelled: bool,
}

/// Best-effort outcome of a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub crawl: CrawlReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identify: Option<IdentifyReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<SynthesisReport>,
    pub elapsed_secs: f64,
}

impl RunReport {
    pub fn cancelled(&self) -> bool {
        self.crawl.cancelled
            || self.identify.as_ref().is_some_and(|r| r.cancelled)
            || self.synthesis.as_ref().is_some_and(|r| r.cancelled)
    }
}
