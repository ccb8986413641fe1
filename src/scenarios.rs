//! Gherkin scenario synthesis, one page at a time.

use crate::completion::CompletionService;
use crate::config::{CompletionConfig, CrawlLimits};
use crate::error::ServiceError;
use crate::prompts;
use crate::results::{Feature, NavigationEdge, SiteDiscovery, SynthesisReport};
use crate::utils::{Deadline, strip_code_fences};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

/// Scenario text generated for one page (or one chunk of its features)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSection {
    pub page_url: String,
    pub page_title: String,
    pub text: String,
    /// True when `text` is the error stand-in rather than generated scenarios
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

/// Scenario text of a whole run, partitioned per page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioBundle {
    sections: Vec<ScenarioSection>,
}

impl ScenarioBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, section: ScenarioSection) {
        self.sections.push(section);
    }

    pub fn sections(&self) -> &[ScenarioSection] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn placeholder_count(&self) -> usize {
        self.sections.iter().filter(|s| s.placeholder).count()
    }

    /// All sections joined by blank lines
    pub fn combined(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Generated scenarios, not counting error stand-ins
    pub fn scenario_count(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| !s.placeholder)
            .map(|s| count_scenarios(&s.text))
            .sum()
    }
}

/// Number of `Scenario:` and `Scenario Outline:` lines in Gherkin text
pub fn count_scenarios(text: &str) -> usize {
    text.lines()
        .map(str::trim_start)
        .filter(|line| line.starts_with("Scenario:") || line.starts_with("Scenario Outline:"))
        .count()
}

/// Features of one page in their original order
#[derive(Debug)]
struct PageGroup<'f> {
    page_url: &'f str,
    page_title: &'f str,
    features: Vec<&'f Feature>,
}

/// Group features by page, keeping first-seen page order
fn group_by_page(features: &[Feature]) -> Vec<PageGroup<'_>> {
    let mut groups: Vec<PageGroup<'_>> = Vec::new();
    for feature in features {
        match groups.iter_mut().find(|g| g.page_url == feature.page_url) {
            Some(group) => group.features.push(feature),
            None => groups.push(PageGroup {
                page_url: &feature.page_url,
                page_title: &feature.page_title,
                features: vec![feature],
            }),
        }
    }
    groups
}

enum PageSections {
    Done(Vec<ScenarioSection>),
    Cancelled(Vec<ScenarioSection>),
}

/// Turns identified features into Gherkin scenario text
pub struct ScenarioSynthesizer<'a> {
    service: &'a dyn CompletionService,
    limits: &'a CrawlLimits,
    completion: &'a CompletionConfig,
    deadline: Deadline,
}

impl<'a> ScenarioSynthesizer<'a> {
    pub fn new(service: &'a dyn CompletionService, limits: &'a CrawlLimits, completion: &'a CompletionConfig) -> Self {
        Self {
            service,
            limits,
            completion,
            deadline: Deadline::unbounded(),
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Generate scenarios for every page that has features.
    ///
    /// A page whose call fails gets a placeholder section naming its URL;
    /// other pages are unaffected.
    pub async fn synthesize(&self, features: &[Feature], discovery: &SiteDiscovery) -> (ScenarioBundle, SynthesisReport) {
        let groups = group_by_page(features);
        ::log::info!("Generating Gherkin scenarios for {} pages", groups.len());

        let total = groups.len();
        let results: Vec<PageSections> = stream::iter(groups.iter().enumerate())
            .map(|(i, group)| self.synthesize_page(i, total, group, discovery))
            .buffered(self.completion.max_concurrent_pages.max(1))
            .collect()
            .await;

        let mut bundle = ScenarioBundle::new();
        let mut report = SynthesisReport {
            pages: total,
            ..SynthesisReport::default()
        };
        for result in results {
            let sections = match result {
                PageSections::Done(sections) => sections,
                PageSections::Cancelled(sections) => {
                    report.cancelled = true;
                    sections
                }
            };
            for section in sections {
                bundle.push(section);
            }
        }

        report.sections = bundle.sections().len();
        report.placeholder_sections = bundle.placeholder_count();
        report.scenarios = bundle.scenario_count();
        ::log::info!(
            "Generated {} scenarios in {} sections ({} placeholders)",
            report.scenarios,
            report.sections,
            report.placeholder_sections
        );
        (bundle, report)
    }

    async fn synthesize_page(
        &self,
        index: usize,
        total: usize,
        group: &PageGroup<'_>,
        discovery: &SiteDiscovery,
    ) -> PageSections {
        let navigation: Vec<&NavigationEdge> = discovery.edges_touching(group.page_url).collect();
        let mut sections = Vec::new();

        for chunk in group.features.chunks(self.limits.max_features_per_chunk.max(1)) {
            if self.deadline.expired() {
                ::log::warn!(
                    "Time budget exhausted, not generating scenarios for {}",
                    group.page_url
                );
                return PageSections::Cancelled(sections);
            }
            ::log::info!(
                "Generating scenarios for page {} of {}: {}",
                index + 1,
                total,
                group.page_url
            );

            let section = match self.generate(group, chunk, &navigation).await {
                Ok(text) => ScenarioSection {
                    page_url: group.page_url.to_string(),
                    page_title: group.page_title.to_string(),
                    text,
                    placeholder: false,
                },
                Err(e) => {
                    ::log::warn!("Error generating scenarios for page {}: {}", group.page_url, e);
                    ScenarioSection {
                        page_url: group.page_url.to_string(),
                        page_title: group.page_title.to_string(),
                        text: prompts::placeholder_scenario(group.page_url, &e),
                        placeholder: true,
                    }
                }
            };
            sections.push(section);
        }

        PageSections::Done(sections)
    }

    async fn generate(
        &self,
        group: &PageGroup<'_>,
        features: &[&Feature],
        navigation: &[&NavigationEdge],
    ) -> Result<String, ServiceError> {
        let prompt = prompts::scenario_prompt(group.page_url, group.page_title, features, navigation)
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let response = self.service.complete(&prompt, self.completion.scenarios).await?;

        let text = strip_code_fences(&response);
        if text.is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
