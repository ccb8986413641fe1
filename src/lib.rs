pub mod analyzers;
pub mod browser;
pub mod completion;
pub mod config;
pub mod crawlers;
pub mod error;
pub mod features;
pub mod filter;
pub mod output;
pub mod prompts;
pub mod results;
pub mod scenarios;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use browser::{Browser, StaticBrowser, WebDriverBrowser};
pub use completion::{CompletionService, OpenAiCompletion};
pub use config::{BrowserBackend, DiscoveryConfig};
pub use error::{ConfigError, DiscoveryError, ServiceError};
pub use results::{Feature, PageRecord, RunReport, SiteDiscovery};
pub use scenarios::ScenarioBundle;

use features::FeatureIdentifier;
use scenarios::ScenarioSynthesizer;
use std::time::Instant;
use utils::Deadline;

/// Runs the three stages (discover, identify, synthesize) under one time
/// budget and collects their reports.
pub struct Pipeline {
    config: DiscoveryConfig,
    deadline: Deadline,
    started: Instant,
    report: RunReport,
}

impl Pipeline {
    /// Create a pipeline; the run budget starts now
    pub fn new(config: DiscoveryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            deadline: Deadline::from_budget(config.total_timeout()),
            config,
            started: Instant::now(),
            report: RunReport::default(),
        })
    }

    /// Replace the deadline derived from `total_timeout_secs`
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Crawl the site, then release the browser whatever the outcome
    pub async fn discover(&mut self, browser: &dyn Browser) -> Result<SiteDiscovery, DiscoveryError> {
        let result = crawlers::discover_site(&self.config, browser, self.deadline).await;
        browser.shutdown().await;

        let (discovery, crawl) = result?;
        self.report.crawl = crawl;
        Ok(discovery)
    }

    pub async fn identify(&mut self, service: &dyn CompletionService, discovery: &SiteDiscovery) -> Vec<Feature> {
        let (features, report) = FeatureIdentifier::new(service, &self.config.limits, &self.config.completion)
            .with_deadline(self.deadline)
            .identify(discovery)
            .await;
        self.report.identify = Some(report);
        features
    }

    pub async fn synthesize(
        &mut self,
        service: &dyn CompletionService,
        features: &[Feature],
        discovery: &SiteDiscovery,
    ) -> ScenarioBundle {
        let (bundle, report) = ScenarioSynthesizer::new(service, &self.config.limits, &self.config.completion)
            .with_deadline(self.deadline)
            .synthesize(features, discovery)
            .await;
        self.report.synthesis = Some(report);
        bundle
    }

    /// Report of the stages run so far, with elapsed time since creation
    pub fn report(&self) -> RunReport {
        RunReport {
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            ..self.report.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{FeatureKind, FormPurpose};
    use crate::testing::{FixtureBrowser, ScriptedCompletion};

    const LOGIN_PAGE: &str = r#"<html><head><title>Member login</title></head><body>
        <form action="/session" method="post">
            <h2>Log in to your account</h2>
            <input type="text" name="username" placeholder="Username">
            <input type="text" name="email" placeholder="Email">
            <input type="submit" value="Submit">
        </form>
    </body></html>"#;

    fn scripted_service() -> ScriptedCompletion {
        ScriptedCompletion::new(|prompt| {
            if prompt.starts_with("Summarize") {
                Ok("A login page with a username and email form.".to_string())
            } else if prompt.starts_with("Given this summary") {
                Ok(r#"[
                    {"name": "Log in", "type": "form", "description": "Sign into the account", "edge_cases": ["Unknown user"]},
                    {"name": "Required username", "type": "validation", "description": "Username must be present"}
                ]"#
                .to_string())
            } else {
                Ok("Feature: Login\n  Scenario: Valid login\n    Given I am on the login page\n    When I submit valid details\n    Then I am signed in".to_string())
            }
        })
    }

    #[test]
    fn test_new_rejects_invalid_depth() {
        let config = DiscoveryConfig {
            max_depth: 4,
            ..DiscoveryConfig::new("https://a.test/")
        };
        assert!(matches!(Pipeline::new(config), Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_huge_total_timeout_runs_unbounded() {
        let browser = FixtureBrowser::new().with_page("https://a.test/", LOGIN_PAGE);
        let config = DiscoveryConfig {
            total_timeout_secs: Some(u64::MAX),
            ..DiscoveryConfig::new("https://a.test/")
        };
        let mut pipeline = Pipeline::new(config).unwrap();

        pipeline.discover(&browser).await.unwrap();
        assert!(!pipeline.report().cancelled());
    }

    #[tokio::test]
    async fn test_single_login_page_end_to_end() {
        let browser = FixtureBrowser::new().with_page("https://a.test/", LOGIN_PAGE);
        let service = scripted_service();
        let mut pipeline = Pipeline::new(DiscoveryConfig::new("https://a.test/")).unwrap();

        let discovery = pipeline.discover(&browser).await.unwrap();
        assert_eq!(discovery.pages.len(), 1);
        assert!(discovery.navigation.is_empty());
        let form = &discovery.pages[0].forms[0];
        assert_eq!(discovery.pages[0].forms.len(), 1);
        assert_eq!(form.likely_purpose, FormPurpose::Login);
        assert_eq!(form.inputs.len(), 3);
        // The submit input is resolved as the form's submit control
        assert_eq!(form.submit.as_ref(), Some(&form.inputs[2]));
        assert_eq!(browser.shutdowns(), 1);

        let features = pipeline.identify(&service, &discovery).await;
        assert!(features.iter().any(|f| f.kind == FeatureKind::Form));
        assert!(features.iter().all(|f| f.page_url == "https://a.test/" && f.page_title == "Member login"));

        let bundle = pipeline.synthesize(&service, &features, &discovery).await;
        assert!(bundle.combined().starts_with("Feature: Login"));

        let report = pipeline.report();
        assert_eq!(report.crawl.pages_visited, 1);
        assert_eq!(report.identify.as_ref().map(|r| r.features), Some(2));
        assert_eq!(report.synthesis.as_ref().map(|r| r.scenarios), Some(1));
        assert!(!report.cancelled());
    }

    #[tokio::test]
    async fn test_unavailable_service_still_yields_scenario_text() {
        let browser = FixtureBrowser::new().with_page("https://a.test/", LOGIN_PAGE);
        let service = ScriptedCompletion::failing();
        let mut pipeline = Pipeline::new(DiscoveryConfig::new("https://a.test/")).unwrap();

        let discovery = pipeline.discover(&browser).await.unwrap();
        let features = pipeline.identify(&service, &discovery).await;
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].name, "Page: Member login");

        let bundle = pipeline.synthesize(&service, &features, &discovery).await;
        let text = bundle.combined();
        assert!(!text.is_empty());
        assert!(text.contains("https://a.test/"));
        assert_eq!(pipeline.report().synthesis.map(|r| r.placeholder_sections), Some(1));
    }

    #[tokio::test]
    async fn test_empty_discovery_releases_browser() {
        let browser = FixtureBrowser::new();
        let mut pipeline = Pipeline::new(DiscoveryConfig::new("https://down.test/")).unwrap();

        let result = pipeline.discover(&browser).await;
        assert!(matches!(result, Err(DiscoveryError::Empty { .. })));
        assert_eq!(browser.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_cycle_end_to_end() {
        let browser = FixtureBrowser::new()
            .with_page("https://a.test/", r#"<title>A</title><a href="/b">Go to B</a>"#)
            .with_page("https://a.test/b", r#"<title>B</title><a href="/">Back to A</a>"#);
        let config = DiscoveryConfig {
            max_depth: 2,
            ..DiscoveryConfig::new("https://a.test/")
        };
        let mut pipeline = Pipeline::new(config).unwrap();

        let discovery = pipeline.discover(&browser).await.unwrap();
        assert_eq!(discovery.pages.len(), 2);
        assert_eq!(browser.opened(), vec!["https://a.test/", "https://a.test/b"]);
        assert_eq!(discovery.navigation.len(), 2);
        assert_eq!(discovery.edge_to("https://a.test/").map(|e| e.via.as_str()), Some("Back to A"));
    }
}
