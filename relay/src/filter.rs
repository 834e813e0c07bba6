//! Keyword block-list applied per source before anything is relayed.

/// True when `text` contains any of `keywords` (case-insensitive substring).
/// No text or no keywords never filters.
pub fn is_filtered(text: Option<&str>, keywords: &[String]) -> bool {
    let Some(text) = text else {
        return false;
    };
    if keywords.is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    keywords
        .iter()
        .filter(|kw| !kw.is_empty())
        .any(|kw| text.contains(&kw.to_lowercase()))
}
