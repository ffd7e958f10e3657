//! Offline extraction from saved profile markup.

use scraper::{Html, Selector};

use crate::site::profile;

/// Profile fields recoverable from a saved page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileMarkup {
    pub articles: Vec<String>,
    pub tags: Vec<String>,
}

impl ProfileMarkup {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        Self {
            articles: select_texts(&document, profile::ARTICLE_TITLES),
            tags: select_texts(&document, profile::TAGS),
        }
    }
}

/// Full text content of every element matching `selector`, in document order.
fn select_texts(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .collect()
}
