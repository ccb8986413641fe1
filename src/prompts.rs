//! Prompt text for the completion service.

use crate::results::{Feature, FeatureDetails, NavigationEdge, PageRecord};
use crate::utils::normalize_whitespace;
use std::fmt::{self, Write};

/// Display name for a page, falling back to its URL when untitled
pub fn page_name(page: &PageRecord) -> &str {
    if page.title.trim().is_empty() {
        &page.url
    } else {
        &page.title
    }
}

/// Compaction prompt: shrink a page's raw features into a short summary
pub fn summary_prompt(page: &PageRecord, raw_features: &[Feature], word_limit: usize) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Summarize these raw page features in a compact format:");
    let _ = writeln!(prompt, "Page title: \"{}\"", page.title);
    let _ = writeln!(prompt, "URL: \"{}\"", page.url);
    let _ = writeln!(prompt, "Feature count: {}", raw_features.len());
    let _ = writeln!(prompt);
    for feature in raw_features {
        let _ = writeln!(prompt, "- {}", RawFeatureLine(feature));
    }
    let _ = writeln!(prompt);
    let _ = write!(prompt, "Return a brief summary in {} words or less.", word_limit);
    prompt
}

/// Refinement prompt: ask for named, typed features as a JSON array
pub fn refinement_prompt(page: &PageRecord, summary: &str) -> String {
    let mut prompt = format!(
        "Given this summary of the page \"{}\" ({}):\n\"{}\"\n\n\
         Identify 5-8 main features for testing on this page. \
         Be comprehensive and include edge cases.\n\n\
         Return only a JSON array where each item has:\n\
         1. \"name\": A descriptive name for the feature (max 10 words)\n\
         2. \"type\": Either \"navigation\", \"form\", \"interaction\", \"validation\", or \"content\"\n\
         3. \"description\": What user goal this feature serves (max 15 words)\n\
         4. \"edge_cases\": Array of 1-3 potential edge cases to test (optional)\n",
        page_name(page),
        page.url,
        summary.trim()
    );
    if !page.forms.is_empty() {
        prompt.push_str("\nInclude at least one validation feature because the page has forms.\n");
    }
    prompt
}

/// Scenario prompt for one page's features and its navigation context
pub fn scenario_prompt(
    page_url: &str,
    page_title: &str,
    features: &[&Feature],
    navigation: &[&NavigationEdge],
) -> Result<String, serde_json::Error> {
    let features = serde_json::to_string_pretty(features)?;
    let navigation = serde_json::to_string_pretty(navigation)?;

    Ok(format!(
        "Generate comprehensive Gherkin scenarios for this page of a website:\n\n\
         PAGE URL: {page_url}\n\
         PAGE TITLE: {page_title}\n\n\
         FEATURES:\n{features}\n\n\
         NAVIGATION PATHS (how users reach this page and where it leads):\n{navigation}\n\n\
         Requirements:\n\
         1. Create 3-5 scenarios per feature including edge cases\n\
         2. For forms, include:\n\
         \x20  - Happy path with valid data\n\
         \x20  - Negative tests with invalid data\n\
         \x20  - Required field validation\n\
         \x20  - Format validation (where applicable)\n\
         \x20  - Boundary values testing\n\
         3. For navigation, include:\n\
         \x20  - Proper navigation steps\n\
         \x20  - URL verification\n\
         \x20  - Page content verification\n\
         4. For interactions, include:\n\
         \x20  - Expected state changes\n\
         \x20  - Visual feedback verification\n\
         5. Use appropriate tags to organize scenarios\n\
         6. Format: valid Gherkin with Feature, Scenario, Given, When, Then lines only\n\
         7. Each scenario should include detailed steps with specific test data\n"
    ))
}

/// Stand-in section for a page whose scenarios could not be generated
pub fn placeholder_scenario(page_url: &str, error: &dyn fmt::Display) -> String {
    format!(
        "Feature: Error in scenario generation for {page_url}\n\n\
         \x20 Scenario: Error generating scenarios for page\n\
         \x20   Given I encountered an error\n\
         \x20   When generating scenarios\n\
         \x20   Then manual review is needed\n\n\
         \x20 # Error: {}",
        normalize_whitespace(&error.to_string())
    )
}

struct RawFeatureLine<'a>(&'a Feature);

impl fmt::Display for RawFeatureLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let feature = self.0;
        write!(f, "[{}] {}", feature.kind, feature.description)?;
        match &feature.details {
            Some(FeatureDetails::Navigation {
                from_page,
                via_element,
            }) => write!(f, " (from {} via \"{}\")", from_page, via_element),
            Some(FeatureDetails::Form {
                inputs,
                submit_button,
                ..
            }) => {
                let labels: Vec<_> = inputs.iter().map(|input| input.label()).collect();
                write!(f, " (inputs: {}", labels.join(", "))?;
                if let Some(submit) = submit_button {
                    write!(f, "; submit: {}", submit.label())?;
                }
                write!(f, ")")
            }
            Some(FeatureDetails::Interaction { element }) => write!(f, " ({})", element.tag),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{ElementRecord, ElementTag, FeatureKind, FormPurpose, FormRecord};

    fn login_page() -> PageRecord {
        let mut page = PageRecord::placeholder("https://a.test/login");
        page.title = "Sign in".into();
        page.forms.push(FormRecord {
            inputs: vec![],
            submit: None,
            action: "/session".into(),
            method: "post".into(),
            likely_purpose: FormPurpose::Login,
        });
        page
    }

    fn form_feature() -> Feature {
        let mut user = ElementRecord::empty(ElementTag::Input);
        user.name = Some("user".into());
        let mut submit = ElementRecord::empty(ElementTag::Button);
        submit.text = "Log in".into();
        Feature {
            name: "Submit login form".into(),
            kind: FeatureKind::Form,
            description: "Submit login form".into(),
            edge_cases: vec![],
            page_url: "https://a.test/login".into(),
            page_title: "Sign in".into(),
            details: Some(FeatureDetails::Form {
                purpose: FormPurpose::Login,
                inputs: vec![user],
                submit_button: Some(submit),
            }),
        }
    }

    #[test]
    fn test_summary_prompt_lists_raw_features() {
        let prompt = summary_prompt(&login_page(), &[form_feature()], 150);
        assert!(prompt.contains("URL: \"https://a.test/login\""));
        assert!(prompt.contains("Feature count: 1"));
        assert!(prompt.contains("- [form] Submit login form (inputs: user; submit: Log in)"));
        assert!(prompt.ends_with("150 words or less."));
    }

    #[test]
    fn test_refinement_prompt_asks_for_validation_only_with_forms() {
        let page = login_page();
        assert!(refinement_prompt(&page, "A login page").contains("validation feature"));

        let mut plain = page.clone();
        plain.forms.clear();
        let prompt = refinement_prompt(&plain, "A plain page");
        assert!(!prompt.contains("at least one validation feature"));
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn test_page_name_falls_back_to_url() {
        let page = PageRecord::placeholder("https://a.test/empty");
        assert_eq!(page_name(&page), "https://a.test/empty");
    }

    #[test]
    fn test_scenario_prompt_embeds_features_and_navigation() {
        let feature = form_feature();
        let edge = NavigationEdge {
            target: "https://a.test/login".into(),
            from: "https://a.test/".into(),
            via: "Sign in".into(),
        };
        let prompt = scenario_prompt("https://a.test/login", "Sign in", &[&feature], &[&edge]).unwrap();
        assert!(prompt.contains("PAGE URL: https://a.test/login"));
        assert!(prompt.contains("\"name\": \"Submit login form\""));
        assert!(prompt.contains("\"from\": \"https://a.test/\""));
        assert!(prompt.contains("Boundary values testing"));
    }

    #[test]
    fn test_placeholder_names_page_and_error() {
        let text = placeholder_scenario("https://a.test/x", &"API error (500):\n boom");
        assert!(text.starts_with("Feature: Error in scenario generation for https://a.test/x"));
        assert!(text.contains("Scenario: Error generating scenarios for page"));
        assert!(text.contains("# Error: API error (500): boom"));
    }
}
