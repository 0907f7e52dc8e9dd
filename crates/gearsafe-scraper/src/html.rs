//! Small DOM helpers shared by the HTML adapters.

use scraper::ElementRef;

/// Text content of an element with runs of whitespace collapsed to one space.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `content` attribute of the first `meta[itemprop=<prop>]` under `element`.
pub(crate) fn meta_content(element: ElementRef<'_>, prop: &str) -> Option<String> {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "meta" && el.value().attr("itemprop") == Some(prop))
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
