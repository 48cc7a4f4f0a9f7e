//! Turns raw article markup into an [`ExtractionResult`].
//!
//! The content root is `#mw-content-text .mw-parser-output`. Its direct
//! children form a flat sequence of blocks; headings are either bare `h2`..`h6`
//! elements or `div.mw-heading` wrappers around one.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{ExtractionResult, Image, InfoboxField, Link, Section};

// Create static selectors to avoid recompiling them each time
static CONTENT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#mw-content-text .mw-parser-output").expect("Failed to parse content selector")
});

static CONTENT_FALLBACK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#mw-content-text").expect("Failed to parse content fallback selector")
});

static INFOBOX_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("table.infobox").expect("Failed to parse infobox selector")
});

static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("tr").expect("Failed to parse row selector")
});

static LABEL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("th").expect("Failed to parse label selector")
});

static VALUE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("td").expect("Failed to parse value selector")
});

static REFLIST_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("ol.references").expect("Failed to parse reflist selector")
});

static REFERENCE_TEXT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".reference-text").expect("Failed to parse reference text selector")
});

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a[href]").expect("Failed to parse link selector")
});

static IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("img[src]").expect("Failed to parse image selector")
});

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#firstHeading").expect("Failed to parse title selector")
});

static DOCUMENT_TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("title").expect("Failed to parse document title selector")
});

static DISAMBIGUATION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#disambigbox, .dmbox-disambig, #disambig").expect("Failed to parse disambiguation selector")
});

const SKIPPED_CLASSES: [&str; 3] = ["reference", "mw-editsection", "mw-cite-backlink"];
const SKIPPED_TAGS: [&str; 2] = ["style", "script"];
const BLOCK_TAGS: [&str; 18] = [
    "p", "div", "br", "li", "ul", "ol", "dl", "dd", "dt", "tr", "td", "th",
    "table", "blockquote", "h2", "h3", "h4", "h5",
];
const PROSE_TAGS: [&str; 5] = ["p", "ul", "ol", "dl", "blockquote"];

/// Deepest heading level that opens a section of its own.
const SECTION_MAX_LEVEL: u8 = 3;

const REFERENCE_HEADINGS: [&str; 9] = [
    "references",
    "notes",
    "notes and references",
    "references and notes",
    "citations",
    "footnotes",
    "sources",
    "works cited",
    "bibliography",
];
const NAVIGATION_HEADINGS: [&str; 3] = ["see also", "external links", "further reading"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    References,
    Navigation,
}

#[derive(Debug)]
struct Heading {
    level: u8,
    text: String,
}

enum Block<'a> {
    Heading(Heading),
    Content(ElementRef<'a>),
}

pub struct Extractor {
    base_url: Url,
}

impl Extractor {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn extract(&self, markup: &str) -> Result<ExtractionResult> {
        let document = Html::parse_document(markup);
        let root = content_root(&document)
            .ok_or_else(|| AppError::ParseError("No article body (#mw-content-text) found in the page".to_string()))?;

        let blocks = blocks(root);
        let (sections, references) = sections_and_references(&blocks);

        let result = ExtractionResult {
            summary: summary(&blocks),
            infobox: infobox(root),
            sections,
            references,
            links: self.links(root),
            images: self.images(root),
        };
        debug!(
            "Extracted {} infobox fields, {} sections, {} references",
            result.infobox.len(),
            result.sections.len(),
            result.references.len()
        );
        Ok(result)
    }

    fn links(&self, root: ElementRef<'_>) -> Vec<Link> {
        root.select(&LINK_SELECTOR)
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?;
                if !href.starts_with("/wiki/") || href.contains(':') {
                    return None;
                }
                let text = element_text(anchor);
                if text.is_empty() {
                    return None;
                }
                let url = self.base_url.join(href).ok()?;
                Some(Link { text, url: url.to_string() })
            })
            .collect()
    }

    fn images(&self, root: ElementRef<'_>) -> Vec<Image> {
        root.select(&IMAGE_SELECTOR)
            .filter_map(|img| {
                let src = img.value().attr("src")?;
                let src = if src.starts_with("//") {
                    format!("https:{}", src)
                } else if src.starts_with("http") {
                    src.to_string()
                } else {
                    self.base_url.join(src).ok()?.to_string()
                };
                Some(Image {
                    src,
                    alt: img.value().attr("alt").unwrap_or_default().to_string(),
                })
            })
            .collect()
    }
}

/// Collapses whitespace runs into single spaces and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(word);
    }
    result
}

/// Resolved article title: `#firstHeading`, then `<title>` without the site suffix.
pub fn page_title(document: &Html) -> Option<String> {
    if let Some(heading) = document.select(&TITLE_SELECTOR).next() {
        let text = element_text(heading);
        if !text.is_empty() {
            return Some(text);
        }
    }
    document
        .select(&DOCUMENT_TITLE_SELECTOR)
        .next()
        .map(|title| {
            let text = normalize_whitespace(&title.text().collect::<String>());
            text.strip_suffix(" - Wikipedia").map(str::to_string).unwrap_or(text)
        })
        .filter(|title| !title.is_empty())
}

pub fn is_disambiguation(document: &Html) -> bool {
    document.select(&DISAMBIGUATION_SELECTOR).next().is_some()
}

fn content_root(document: &Html) -> Option<ElementRef<'_>> {
    document
        .select(&CONTENT_SELECTOR)
        .next()
        .or_else(|| document.select(&CONTENT_FALLBACK_SELECTOR).next())
}

fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    normalize_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else { continue };
                let name = child.value().name();
                if SKIPPED_TAGS.contains(&name)
                    || child.value().classes().any(|class| SKIPPED_CLASSES.contains(&class))
                {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push(' ');
                }
                collect_text(child, out);
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn heading_of(element: ElementRef<'_>) -> Option<Heading> {
    if let Some(level) = heading_level(element.value().name()) {
        return Some(Heading { level, text: element_text(element) });
    }
    if element.value().name() != "div" || !element.value().classes().any(|class| class == "mw-heading") {
        return None;
    }
    element
        .children()
        .filter_map(ElementRef::wrap)
        .find_map(|child| {
            heading_level(child.value().name()).map(|level| Heading { level, text: element_text(child) })
        })
}

fn blocks(root: ElementRef<'_>) -> Vec<Block<'_>> {
    root.children()
        .filter_map(ElementRef::wrap)
        .map(|element| match heading_of(element) {
            Some(heading) => Block::Heading(heading),
            None => Block::Content(element),
        })
        .collect()
}

fn reserved_region(heading: &str) -> Option<Region> {
    let heading = heading.to_lowercase();
    if REFERENCE_HEADINGS.contains(&heading.as_str()) {
        Some(Region::References)
    } else if NAVIGATION_HEADINGS.contains(&heading.as_str()) {
        Some(Region::Navigation)
    } else {
        None
    }
}

fn summary(blocks: &[Block<'_>]) -> String {
    let paragraphs: Vec<String> = blocks
        .iter()
        .take_while(|block| !matches!(block, Block::Heading(_)))
        .filter_map(|block| match block {
            Block::Content(element) if element.value().name() == "p" => Some(element_text(*element)),
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .collect();
    paragraphs.join(" ")
}

fn infobox(root: ElementRef<'_>) -> Vec<InfoboxField> {
    let Some(table) = root.select(&INFOBOX_SELECTOR).next() else {
        return Vec::new();
    };

    let mut fields: Vec<InfoboxField> = Vec::new();
    for row in table.select(&ROW_SELECTOR) {
        let (Some(label), Some(value)) = (row.select(&LABEL_SELECTOR).next(), row.select(&VALUE_SELECTOR).next()) else {
            continue;
        };
        let label = element_text(label);
        let value = element_text(value);
        if label.is_empty() || value.is_empty() || fields.iter().any(|field| field.label == label) {
            continue;
        }
        fields.push(InfoboxField { label, value });
    }
    fields
}

fn sections_and_references(blocks: &[Block<'_>]) -> (Vec<Section>, Vec<String>) {
    let mut sections = Vec::new();
    let mut bodies: Vec<Vec<String>> = Vec::new();
    let mut references = Vec::new();
    // (level, index into sections) of every section still collecting text
    let mut open: Vec<(u8, usize)> = Vec::new();
    let mut region: Option<(u8, Region)> = None;

    for block in blocks {
        match block {
            Block::Heading(heading) if heading.level <= SECTION_MAX_LEVEL => {
                open.retain(|(level, _)| *level < heading.level);
                if matches!(region, Some((level, _)) if heading.level <= level) {
                    region = None;
                }
                if region.is_some() {
                    continue;
                }
                if let Some(kind) = reserved_region(&heading.text) {
                    region = Some((heading.level, kind));
                    continue;
                }
                open.push((heading.level, sections.len()));
                sections.push(Section { heading: heading.text.clone(), body: String::new() });
                bodies.push(Vec::new());
            }
            Block::Heading(_) => {}
            Block::Content(element) => match region {
                Some((_, Region::References)) => references.extend(reference_entries(*element)),
                Some((_, Region::Navigation)) => {}
                None => {
                    if open.is_empty() || !PROSE_TAGS.contains(&element.value().name()) {
                        continue;
                    }
                    let text = element_text(*element);
                    if text.is_empty() {
                        continue;
                    }
                    for (_, index) in &open {
                        bodies[*index].push(text.clone());
                    }
                }
            },
        }
    }

    for (section, parts) in sections.iter_mut().zip(bodies) {
        section.body = parts.join("\n\n");
    }
    (sections, references)
}

fn reference_entries(block: ElementRef<'_>) -> Vec<String> {
    let mut lists: Vec<ElementRef<'_>> = Vec::new();
    if REFLIST_SELECTOR.matches(&block) {
        lists.push(block);
    }
    lists.extend(block.select(&REFLIST_SELECTOR));

    lists
        .into_iter()
        .flat_map(|list| list.children().filter_map(ElementRef::wrap))
        .filter(|item| item.value().name() == "li")
        .map(|item| match item.select(&REFERENCE_TEXT_SELECTOR).next() {
            Some(text) => element_text(text),
            None => element_text(item),
        })
        .filter(|text| !text.is_empty())
        .collect()
}
