//! section extraction for explanation pages (pool B)
//! a section is a level 1-2 heading plus every element sibling that follows it up to the
//! next level 1-2 heading.
use super::{PageRecord, PageResponse};
use crate::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::error;

static CONTENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#mw-content-text").expect("content selector"));
static HEADINGS: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2").expect("heading selector"));

pub static EXPLANATION: Lazy<Regex> = Lazy::new(|| label_pattern("Explanations?"));
pub static TRANSCRIPT: Lazy<Regex> = Lazy::new(|| label_pattern("Transcript"));

/// Anchors `label` at the start of the heading text, the way the wiki prints
/// "Explanation[edit]".
fn label_pattern(label: &str) -> Regex {
    Regex::new(&format!("^(?:{label})")).expect("label pattern")
}

fn is_heading(element: &ElementRef) -> bool {
    matches!(element.value().name(), "h1" | "h2")
}

/// newer MediaWiki wraps headings in `<div class="mw-heading mw-heading2">`
fn is_heading_wrapper(element: &ElementRef) -> bool {
    element.value().name() == "div"
        && element
            .value()
            .classes()
            .any(|c| c == "mw-heading1" || c == "mw-heading2")
}

fn is_section_break(element: &ElementRef) -> bool {
    is_heading(element) || is_heading_wrapper(element)
}

/// First h1/h2 under `root` whose text matches `pattern`.
pub fn find_heading<'a>(root: ElementRef<'a>, pattern: &Regex) -> Option<ElementRef<'a>> {
    root.select(&HEADINGS)
        .find(|heading| pattern.is_match(&heading.text().collect::<String>()))
}

/// Text of each element sibling after `heading`, stopping before the next section heading.
///
/// The iterator is lazy and can be cloned to walk the section again.
pub fn collect_until_next_heading<'a>(
    heading: ElementRef<'a>,
) -> impl Iterator<Item = String> + Clone + 'a {
    let anchor = heading
        .parent()
        .and_then(ElementRef::wrap)
        .filter(is_heading_wrapper)
        .unwrap_or(heading);
    anchor
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|sibling| !is_section_break(sibling))
        .map(|sibling| sibling.text().collect::<String>())
}

/// Concatenated section text, or an empty string when no heading matches.
pub fn extract_section(root: ElementRef, pattern: &Regex) -> String {
    find_heading(root, pattern)
        .map(|heading| collect_until_next_heading(heading).collect())
        .unwrap_or_default()
}

/// Pulls the explanation and transcript out of one fetched page.
pub fn process_page_contents(page: &PageResponse) -> Result<PageRecord, ExtractError> {
    if !page.is_success() {
        return Ok(PageRecord::empty(page.get_url()));
    }
    let document = Html::parse_document(page.get_raw_page());
    let Some(content) = document.select(&CONTENT).next() else {
        error!(url = %page.get_url(), "page has no content container");
        return Err(ExtractError::MissingSectionContainer {
            url: page.get_url().to_string(),
        });
    };
    Ok(PageRecord {
        title: page.get_url().to_string(),
        explanation: extract_section(content, &EXPLANATION),
        transcript: extract_section(content, &TRANSCRIPT),
    })
}
