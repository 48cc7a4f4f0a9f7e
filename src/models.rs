use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The article a keyword resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleReference {
    pub title: String,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
}

/// A fetched article page, as returned by an `ArticleSource`.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub article: ArticleReference,
    pub markup: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoboxField {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub alt: String,
}

/// Everything pulled out of one article page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub summary: String,
    /// Document order, first occurrence of a label wins.
    pub infobox: Vec<InfoboxField>,
    pub sections: Vec<Section>,
    pub references: Vec<String>,
    pub links: Vec<Link>,
    pub images: Vec<Image>,
}

/// One row of the run summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub keyword: String,
    pub resolved_title: String,
    pub url: String,
    pub summary_excerpt: String,
    pub infobox_field_count: usize,
    pub section_count: usize,
    pub reference_count: usize,
}

impl SummaryRow {
    pub const HEADERS: [&'static str; 7] = [
        "keyword",
        "resolved_title",
        "url",
        "summary_excerpt",
        "infobox_field_count",
        "section_count",
        "reference_count",
    ];

    pub fn new(
        keyword: &str,
        article: &ArticleReference,
        extraction: &ExtractionResult,
        excerpt_chars: usize,
    ) -> Self {
        SummaryRow {
            keyword: keyword.to_string(),
            resolved_title: article.title.clone(),
            url: article.url.clone(),
            summary_excerpt: excerpt(&extraction.summary, excerpt_chars),
            infobox_field_count: extraction.infobox.len(),
            section_count: extraction.sections.len(),
            reference_count: extraction.references.len(),
        }
    }
}

/// Cuts `text` to `max_chars` characters, marking the cut with `...`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
