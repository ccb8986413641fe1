//! Turn rendered elements and forms into bounded structural records.

pub mod element;
pub mod form;

#[cfg(test)]
mod tests;

pub use element::{ElementAnalysis, analyze_element};
pub use form::{FormAnalysis, analyze_form, classify_purpose};
