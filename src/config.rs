use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Smallest and largest crawl depth the discovery stage accepts.
pub const MIN_DEPTH: usize = 1;
pub const MAX_DEPTH: usize = 3;

/// Which automation backend renders pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrowserBackend {
    /// A WebDriver server (chromedriver, geckodriver, ...)
    #[default]
    Webdriver,
    /// Plain HTTP fetch and HTML parsing, no JavaScript
    Static,
}

/// Configuration for a discovery-to-scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// URL to start crawling from
    pub start_url: String,

    /// Maximum number of link hops from the start URL
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Automation backend used to load pages
    #[serde(default)]
    pub backend: BrowserBackend,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Ask the WebDriver browser to run without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Seconds a single page may take to load
    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout_secs: u64,

    /// Seconds the element and form analysis of a loaded page may take
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_secs: u64,

    /// Wall-clock budget for the whole run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_timeout_secs: Option<u64>,

    /// Regex patterns for URLs to include
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Regex patterns for URLs to exclude
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    #[serde(default)]
    pub limits: CrawlLimits,

    #[serde(default)]
    pub completion: CompletionConfig,
}

/// Bounds that keep page summaries and prompts within service limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlLimits {
    #[serde(default = "default_max_elements_per_page")]
    pub max_elements_per_page: usize,

    /// Characters of element and form text kept per element
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    #[serde(default = "default_max_forms_per_page")]
    pub max_forms_per_page: usize,

    #[serde(default = "default_max_form_inputs")]
    pub max_form_inputs: usize,

    /// Inputs carried into a form feature
    #[serde(default = "default_max_form_feature_inputs")]
    pub max_form_feature_inputs: usize,

    /// Interaction features derived per page
    #[serde(default = "default_max_interaction_features")]
    pub max_interaction_features: usize,

    /// Features embedded in a single scenario-synthesis prompt
    #[serde(default = "default_max_features_per_chunk")]
    pub max_features_per_chunk: usize,

    /// Word limit requested from the compaction call
    #[serde(default = "default_summary_word_limit")]
    pub summary_word_limit: usize,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_elements_per_page: default_max_elements_per_page(),
            max_text_length: default_max_text_length(),
            max_forms_per_page: default_max_forms_per_page(),
            max_form_inputs: default_max_form_inputs(),
            max_form_feature_inputs: default_max_form_feature_inputs(),
            max_interaction_features: default_max_interaction_features(),
            max_features_per_chunk: default_max_features_per_chunk(),
            summary_word_limit: default_summary_word_limit(),
        }
    }
}

/// Token and sampling settings for one kind of completion call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CallSettings {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CallSettings {
    pub const fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }
}

/// Configuration for the text-generation completion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Chat-completions endpoint of an OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Extra attempts for rate-limited or failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pages whose completion calls may be in flight at once
    #[serde(default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: usize,

    #[serde(default = "default_summary_settings")]
    pub summary: CallSettings,

    #[serde(default = "default_refinement_settings")]
    pub refinement: CallSettings,

    #[serde(default = "default_scenario_settings")]
    pub scenarios: CallSettings,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            max_concurrent_pages: default_max_concurrent_pages(),
            summary: default_summary_settings(),
            refinement: default_refinement_settings(),
            scenarios: default_scenario_settings(),
        }
    }
}

fn default_max_depth() -> usize {
    1
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_page_load_timeout() -> u64 {
    30
}

fn default_analysis_timeout() -> u64 {
    45
}

fn default_max_elements_per_page() -> usize {
    30
}

fn default_max_text_length() -> usize {
    150
}

fn default_max_forms_per_page() -> usize {
    5
}

fn default_max_form_inputs() -> usize {
    8
}

fn default_max_form_feature_inputs() -> usize {
    5
}

fn default_max_interaction_features() -> usize {
    15
}

fn default_max_features_per_chunk() -> usize {
    8
}

fn default_summary_word_limit() -> usize {
    150
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

fn default_max_concurrent_pages() -> usize {
    1
}

fn default_summary_settings() -> CallSettings {
    CallSettings::new(300, 0.3)
}

fn default_refinement_settings() -> CallSettings {
    CallSettings::new(800, 0.3)
}

fn default_scenario_settings() -> CallSettings {
    CallSettings::new(2500, 0.5)
}

impl DiscoveryConfig {
    /// Create a new configuration with default values
    pub fn new(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            max_depth: default_max_depth(),
            backend: BrowserBackend::default(),
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            page_load_timeout_secs: default_page_load_timeout(),
            analysis_timeout_secs: default_analysis_timeout(),
            total_timeout_secs: None,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            limits: CrawlLimits::default(),
            completion: CompletionConfig::default(),
        }
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_DEPTH..=MAX_DEPTH).contains(&self.max_depth) {
            return Err(ConfigError::Invalid(format!(
                "max_depth must be between {} and {}, got {}",
                MIN_DEPTH, MAX_DEPTH, self.max_depth
            )));
        }
        if self.start_url.trim().is_empty() {
            return Err(ConfigError::Invalid("start_url is empty".to_string()));
        }
        if self.limits.max_features_per_chunk == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_features_per_chunk must be at least 1".to_string(),
            ));
        }
        if self.completion.max_concurrent_pages == 0 {
            return Err(ConfigError::Invalid(
                "completion.max_concurrent_pages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn total_timeout(&self) -> Option<Duration> {
        self.total_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config = DiscoveryConfig::from_json(r#"{"start_url": "https://example.com"}"#).unwrap();
        assert_eq!(config.max_depth, 1);
        assert_eq!(config.backend, BrowserBackend::Webdriver);
        assert_eq!(config.page_load_timeout_secs, 30);
        assert_eq!(config.limits.max_elements_per_page, 30);
        assert_eq!(config.limits.max_text_length, 150);
        assert_eq!(config.limits.max_forms_per_page, 5);
        assert_eq!(config.limits.max_form_inputs, 8);
        assert_eq!(config.completion.model, "gpt-4o-mini");
        assert!(config.total_timeout_secs.is_none());
    }

    #[test]
    fn test_nested_overrides() {
        let json = r#"{
            "start_url": "https://example.com",
            "max_depth": 3,
            "backend": "static",
            "limits": { "max_elements_per_page": 10 },
            "completion": { "scenarios": { "max_tokens": 100, "temperature": 0.0 } }
        }"#;
        let config = DiscoveryConfig::from_json(json).unwrap();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.backend, BrowserBackend::Static);
        assert_eq!(config.limits.max_elements_per_page, 10);
        // Untouched siblings keep their defaults
        assert_eq!(config.limits.max_forms_per_page, 5);
        assert_eq!(config.completion.scenarios.max_tokens, 100);
        assert_eq!(config.completion.summary, CallSettings::new(300, 0.3));
    }

    #[test]
    fn test_validate_depth_range() {
        let mut config = DiscoveryConfig::new("https://example.com");
        for depth in MIN_DEPTH..=MAX_DEPTH {
            config.max_depth = depth;
            assert!(config.validate().is_ok());
        }

        config.max_depth = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.max_depth = 4;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_start_url_is_an_error() {
        assert!(matches!(
            DiscoveryConfig::from_json(r#"{"max_depth": 2}"#),
            Err(ConfigError::Json(_))
        ));
    }
}
