use crate::browser::ElementHandle;
use crate::error::AnalysisError;
use crate::results::{ElementRecord, ElementTag};
use crate::utils::{normalize_whitespace, truncate_chars};

/// An element record plus the per-field errors that were replaced by defaults
#[derive(Debug)]
pub struct ElementAnalysis {
    pub record: ElementRecord,
    pub field_errors: Vec<AnalysisError>,
}

impl ElementAnalysis {
    pub fn is_degraded(&self) -> bool {
        !self.field_errors.is_empty()
    }
}

/// Extract a bounded record from one interactive element.
///
/// Never fails: a field that cannot be read falls back to an empty value and
/// the error is reported alongside the record.
pub async fn analyze_element(element: &dyn ElementHandle, max_text_length: usize) -> ElementAnalysis {
    let mut field_errors = Vec::new();

    let tag = element.tag_name().await.unwrap_or_else(|e| {
        field_errors.push(e);
        String::new()
    });
    let attributes = element.attributes().await.unwrap_or_else(|e| {
        field_errors.push(e);
        Default::default()
    });
    let text = element.text_content().await.unwrap_or_else(|e| {
        field_errors.push(e);
        String::new()
    });

    for error in &field_errors {
        ::log::debug!("Degraded element field: {}", error);
    }

    let mut record = ElementRecord::empty(ElementTag::from(tag));
    record.text = truncate_chars(&normalize_whitespace(&text), max_text_length);

    if record.tag == ElementTag::Anchor {
        record.href = attributes.get("href").cloned();
    }

    let type_attr = attributes.get("type").map(|t| t.to_ascii_lowercase());
    if record.tag == ElementTag::Input {
        record.input_type = Some(type_attr.clone().unwrap_or_else(|| "text".to_string()));
        record.name = attributes.get("name").cloned();
        record.placeholder = attributes.get("placeholder").cloned();
    }

    let type_attr = type_attr.as_deref();
    record.is_button = record.tag == ElementTag::Button
        || (record.tag == ElementTag::Input && matches!(type_attr, Some("submit" | "button")));
    record.is_submit = record.is_button
        && (type_attr == Some("submit") || record.text.to_lowercase().contains("submit"));

    record.attributes = attributes;

    ElementAnalysis {
        record,
        field_errors,
    }
}
