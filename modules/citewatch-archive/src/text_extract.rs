// Main-content text extraction for drift comparison. Boilerplate is pruned so
// that navigation or ad churn does not register as a change in the cited source.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Elements dropped wholesale, wherever they appear.
const PRUNED_TAGS: &[&str] = &[
    "nav",
    "header",
    "footer",
    "aside",
    "sidebar",
    "script",
    "style",
    "noscript",
    "iframe",
    "advertisement",
    "ads",
    "social",
    "share",
];

/// Tried in order; the first one present (outside pruned regions) becomes the container.
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    r#"[role="main"]"#,
    ".content",
    ".main-content",
    "#content",
    "#main-content",
    ".post-content",
    ".entry-content",
];

static BOILERPLATE_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)nav|header|footer|sidebar|advertisement|comment|cookie").expect("valid regex")
});

static CONTENT_SELECTORS_PARSED: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    CONTENT_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});

static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

fn is_pruned(el: &ElementRef) -> bool {
    let element = el.value();
    let name = element.name();
    if PRUNED_TAGS.contains(&name) {
        return true;
    }
    // The document shell carries site-wide classes ("has-sidebar") that say nothing about content.
    if name == "html" || name == "body" {
        return false;
    }
    let attr_matches = |value: Option<&str>| value.is_some_and(|v| BOILERPLATE_ATTR_RE.is_match(v));
    attr_matches(element.attr("class")) || attr_matches(element.id())
}

fn is_pruned_or_within(el: &ElementRef) -> bool {
    is_pruned(el) || el.ancestors().filter_map(ElementRef::wrap).any(|a| is_pruned(&a))
}

/// Extract the main readable text of an HTML document, whitespace-collapsed.
/// Returns an empty string when nothing usable is found.
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let container = CONTENT_SELECTORS_PARSED
        .iter()
        .find_map(|sel| document.select(sel).find(|el| !is_pruned_or_within(el)))
        .or_else(|| document.select(&BODY_SELECTOR).find(|el| !is_pruned_or_within(el)));

    let Some(container) = container else {
        return String::new();
    };

    let root_id = container.id();
    let mut text = String::new();
    for node in container.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let skipped = node
            .ancestors()
            .take_while(|a| a.id() != root_id)
            .filter_map(ElementRef::wrap)
            .any(|a| is_pruned(&a));
        if !skipped {
            text.push_str(fragment);
            text.push(' ');
        }
    }

    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
