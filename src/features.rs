//! Feature identification: local raw-feature derivation followed by a
//! two-stage (summarize, then refine) pass through the completion service.

use crate::completion::CompletionService;
use crate::config::{CompletionConfig, CrawlLimits};
use crate::error::ServiceError;
use crate::prompts::{self, page_name};
use crate::results::{
    ElementTag, Feature, FeatureDetails, FeatureKind, IdentifyReport, PageRecord, SiteDiscovery,
};
use crate::utils::{Deadline, strip_code_fences};
use futures::stream::{self, StreamExt};
use serde::Deserialize;

/// Edge cases attached to the stand-in feature of a page whose refinement was unusable
const FALLBACK_EDGE_CASES: [&str; 2] = [
    "Page loads with missing content",
    "Page loads with network issues",
];

/// Output of the compaction stage, input to the refinement stage
#[derive(Debug, Clone, PartialEq)]
pub struct PageSummary {
    pub text: String,
}

/// One entry of the refinement stage's JSON array
#[derive(Debug, Clone, Deserialize)]
struct RefinedFeature {
    name: String,
    #[serde(rename = "type", default)]
    kind: FeatureKind,
    #[serde(default)]
    description: String,
    #[serde(default)]
    edge_cases: Vec<String>,
}

/// Derive the deterministic candidate features of one page.
///
/// One navigation feature if the page is a navigation target, one feature
/// per form, and interaction features for visible buttons and inputs.
pub fn derive_raw_features(page: &PageRecord, discovery: &SiteDiscovery, limits: &CrawlLimits) -> Vec<Feature> {
    let name = page_name(page);
    let mut features = Vec::new();

    if let Some(edge) = discovery.edge_to(&page.url) {
        features.push(raw_feature(
            page,
            FeatureKind::Navigation,
            format!("Navigate to {} page", name),
            FeatureDetails::Navigation {
                from_page: edge.from.clone(),
                via_element: edge.via.clone(),
            },
        ));
    }

    for form in page.forms.iter().take(limits.max_forms_per_page) {
        features.push(raw_feature(
            page,
            FeatureKind::Form,
            format!("Submit {} form", form.likely_purpose),
            FeatureDetails::Form {
                purpose: form.likely_purpose,
                inputs: form
                    .inputs
                    .iter()
                    .take(limits.max_form_feature_inputs)
                    .cloned()
                    .collect(),
                submit_button: form.submit.clone(),
            },
        ));
    }

    let interactive = page
        .elements
        .iter()
        .filter(|e| matches!(e.tag, ElementTag::Button | ElementTag::Input) && !e.is_hidden_input())
        .take(limits.max_interaction_features);
    for element in interactive {
        features.push(raw_feature(
            page,
            FeatureKind::Interaction,
            format!("Interact with {}", element.label()),
            FeatureDetails::Interaction {
                element: element.clone(),
            },
        ));
    }

    features
}

fn raw_feature(page: &PageRecord, kind: FeatureKind, description: String, details: FeatureDetails) -> Feature {
    Feature {
        name: description.clone(),
        kind,
        description,
        edge_cases: Vec::new(),
        page_url: page.url.clone(),
        page_title: page.title.clone(),
        details: Some(details),
    }
}

/// Parse the refinement response into features stamped with their page.
///
/// Tolerates surrounding prose and Markdown fences; an empty list is malformed.
pub fn parse_feature_list(response: &str, page: &PageRecord) -> Result<Vec<Feature>, ServiceError> {
    let body = strip_code_fences(response);
    let json = match (body.find('['), body.rfind(']')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => return Err(ServiceError::Malformed("no JSON array in response".to_string())),
    };

    let refined: Vec<RefinedFeature> =
        serde_json::from_str(json).map_err(|e| ServiceError::Malformed(e.to_string()))?;
    if refined.is_empty() {
        return Err(ServiceError::Malformed("empty feature list".to_string()));
    }

    Ok(refined
        .into_iter()
        .map(|f| Feature {
            name: f.name,
            kind: f.kind,
            description: f.description,
            edge_cases: f.edge_cases,
            page_url: page.url.clone(),
            page_title: page.title.clone(),
            details: None,
        })
        .collect())
}

/// Single generic feature standing in for an unusable refinement
pub fn fallback_feature(page: &PageRecord) -> Feature {
    let name = page_name(page);
    Feature {
        name: format!("Page: {}", name),
        kind: FeatureKind::Content,
        description: format!("View and interact with {}", name),
        edge_cases: FALLBACK_EDGE_CASES.iter().map(|s| s.to_string()).collect(),
        page_url: page.url.clone(),
        page_title: page.title.clone(),
        details: None,
    }
}

enum PageOutcome {
    Skipped,
    Cancelled,
    Identified {
        features: Vec<Feature>,
        service_failure: bool,
        malformed: bool,
    },
}

/// Turns discovered pages into test-relevant features
pub struct FeatureIdentifier<'a> {
    service: &'a dyn CompletionService,
    limits: &'a CrawlLimits,
    completion: &'a CompletionConfig,
    deadline: Deadline,
}

impl<'a> FeatureIdentifier<'a> {
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

    /// Identify features for every page, in registry order.
    ///
    /// Pages run through a bounded, order-preserving stream; calls for one
    /// page stay sequential.
    pub async fn identify(&self, discovery: &SiteDiscovery) -> (Vec<Feature>, IdentifyReport) {
        ::log::info!("Identifying features from {} discovered pages", discovery.pages.len());

        let outcomes: Vec<PageOutcome> = stream::iter(&discovery.pages)
            .map(|page| self.identify_page(page, discovery))
            .buffered(self.completion.max_concurrent_pages.max(1))
            .collect()
            .await;

        let mut report = IdentifyReport::default();
        let mut all_features = Vec::new();
        for outcome in outcomes {
            match outcome {
                PageOutcome::Skipped => report.pages_without_features += 1,
                PageOutcome::Cancelled => report.cancelled = true,
                PageOutcome::Identified {
                    features,
                    service_failure,
                    malformed,
                } => {
                    report.pages_analyzed += 1;
                    report.service_failures += usize::from(service_failure);
                    report.malformed_responses += usize::from(malformed);
                    all_features.extend(features);
                }
            }
        }
        report.features = all_features.len();

        ::log::info!(
            "Identified {} features across {} pages ({} skipped, {} service failures)",
            report.features,
            report.pages_analyzed,
            report.pages_without_features,
            report.service_failures
        );
        (all_features, report)
    }

    /// Compaction stage: a short natural-language summary of the raw features
    pub async fn summarize(&self, page: &PageRecord, raw_features: &[Feature]) -> Result<PageSummary, ServiceError> {
        let prompt = prompts::summary_prompt(page, raw_features, self.limits.summary_word_limit);
        let text = self.service.complete(&prompt, self.completion.summary).await?;
        Ok(PageSummary {
            text: text.trim().to_string(),
        })
    }

    /// Refinement stage: named, typed features parsed from a JSON array
    pub async fn refine(&self, page: &PageRecord, summary: &PageSummary) -> Result<Vec<Feature>, ServiceError> {
        let prompt = prompts::refinement_prompt(page, &summary.text);
        let response = self.service.complete(&prompt, self.completion.refinement).await?;
        parse_feature_list(&response, page)
    }

    async fn identify_page(&self, page: &PageRecord, discovery: &SiteDiscovery) -> PageOutcome {
        if self.deadline.expired() {
            ::log::debug!("Time budget exhausted, not identifying features for {}", page.url);
            return PageOutcome::Cancelled;
        }

        let raw_features = derive_raw_features(page, discovery, self.limits);
        if raw_features.is_empty() {
            ::log::debug!("No raw features on {}, skipping", page.url);
            return PageOutcome::Skipped;
        }
        ::log::info!(
            "Refining {} raw features for page: {}",
            raw_features.len(),
            page.url
        );

        let refined = match self.summarize(page, &raw_features).await {
            Ok(summary) => self.refine(page, &summary).await,
            Err(e) => Err(e),
        };

        match refined {
            Ok(features) => PageOutcome::Identified {
                features,
                service_failure: false,
                malformed: false,
            },
            Err(ServiceError::Malformed(reason)) => {
                ::log::warn!("Could not parse feature list for {}: {}", page.url, reason);
                PageOutcome::Identified {
                    features: vec![fallback_feature(page)],
                    service_failure: false,
                    malformed: true,
                }
            }
            Err(e) => {
                ::log::warn!("Completion service failed for {}: {}", page.url, e);
                PageOutcome::Identified {
                    features: vec![fallback_feature(page)],
                    service_failure: true,
                    malformed: false,
                }
            }
        }
    }
}
