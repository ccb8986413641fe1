use super::element::analyze_element;
use crate::browser::{ElementHandle, FORM_INPUT_SELECTOR};
use crate::config::CrawlLimits;
use crate::error::AnalysisError;
use crate::results::{ElementRecord, FormPurpose, FormRecord};
use crate::utils::normalize_whitespace;

/// Keyword sets in priority order; the first set with a hit wins
const PURPOSE_KEYWORDS: [(FormPurpose, &[&str]); 4] = [
    (FormPurpose::Login, &["login", "sign in", "log in"]),
    (FormPurpose::Registration, &["register", "sign up", "create account"]),
    (FormPurpose::Contact, &["contact", "message", "feedback"]),
    (FormPurpose::Search, &["search", "find"]),
];

#[derive(Debug)]
pub struct FormAnalysis {
    pub record: FormRecord,
    /// Inputs or buttons recorded with defaulted fields
    pub degraded_elements: usize,
}

/// Classify a form from its surface text
pub fn classify_purpose(text: &str) -> FormPurpose {
    let text = text.to_lowercase();
    PURPOSE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(purpose, _)| *purpose)
        .unwrap_or(FormPurpose::Generic)
}

/// Analyze one form: its bounded inputs, submit control and likely purpose
pub async fn analyze_form(
    form: &dyn ElementHandle,
    limits: &CrawlLimits,
) -> Result<FormAnalysis, AnalysisError> {
    let attributes = form.attributes().await?;
    let action = attributes.get("action").cloned().unwrap_or_default();
    let method = attributes
        .get("method")
        .map(|m| m.to_ascii_lowercase())
        .unwrap_or_else(|| "get".to_string());

    let mut degraded_elements = 0;

    // Extra inputs beyond the cap are dropped
    let handles = form.query_all(FORM_INPUT_SELECTOR).await?;
    let mut inputs = Vec::with_capacity(handles.len().min(limits.max_form_inputs));
    for handle in handles.iter().take(limits.max_form_inputs) {
        let analysis = analyze_element(handle.as_ref(), limits.max_text_length).await;
        if analysis.is_degraded() {
            degraded_elements += 1;
        }
        inputs.push(analysis.record);
    }

    let mut submit = inputs.iter().find(|input| input.is_submit).cloned();
    if submit.is_none() {
        let (button, degraded) = find_submit_button(form, limits.max_text_length).await?;
        submit = button;
        degraded_elements += degraded;
    }

    let text = normalize_whitespace(&form.text_content().await?);
    let likely_purpose = classify_purpose(&text);

    Ok(FormAnalysis {
        record: FormRecord {
            inputs,
            submit,
            action,
            method,
            likely_purpose,
        },
        degraded_elements,
    })
}

/// First button flagged as submit or labelled "submit", in document order
async fn find_submit_button(
    form: &dyn ElementHandle,
    max_text_length: usize,
) -> Result<(Option<ElementRecord>, usize), AnalysisError> {
    let mut degraded = 0;
    for handle in form.query_all("button").await? {
        let analysis = analyze_element(handle.as_ref(), max_text_length).await;
        if analysis.is_degraded() {
            degraded += 1;
        }
        let record = analysis.record;
        if record.is_submit || record.text.to_lowercase().contains("submit") {
            return Ok((Some(record), degraded));
        }
    }
    Ok((None, degraded))
}
