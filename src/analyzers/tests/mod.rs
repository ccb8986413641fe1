
use crate::browser::static_html::StaticPage;
use crate::browser::{ElementHandle, PageHandle};

/// Elements matching `selector` in an HTML snippet
async fn select(html: &str, selector: &str) -> Vec<Box<dyn ElementHandle>> {
    StaticPage::new(html)
        .query_all(selector)
        .await
        .unwrap()
}
