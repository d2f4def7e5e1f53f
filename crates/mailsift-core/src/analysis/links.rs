//! Link extraction from email bodies.
//!
//! Links are always taken from the email itself, never from the model reply.

use std::sync::LazyLock;

use regex::Regex;

/// Longest display form of a link, in characters, including the ellipsis.
pub const LINK_DISPLAY_MAX: usize = 60;

const ELLIPSIS: &str = "...";

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // literal pattern
    Regex::new(r#"https?://[^\s<>"'()\[\]{}]+"#).expect("valid URL pattern")
});

/// Find all distinct URLs in `body`, in order of first appearance.
#[must_use]
pub fn extract_links(body: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for m in URL_PATTERN.find_iter(body) {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
        if url.ends_with("://") {
            continue;
        }
        if !links.iter().any(|existing| existing == url) {
            links.push(url.to_string());
        }
    }
    links
}

/// Shorten a URL for display.
///
/// URLs longer than [`LINK_DISPLAY_MAX`] characters keep their first
/// characters and end in `...`.
#[must_use]
pub fn display_link(url: &str) -> String {
    if url.chars().count() <= LINK_DISPLAY_MAX {
        return url.to_string();
    }
    let keep = LINK_DISPLAY_MAX - ELLIPSIS.len();
    let mut display: String = url.chars().take(keep).collect();
    display.push_str(ELLIPSIS);
    display
}

/// Extract links and their display forms, index-aligned.
#[must_use]
pub fn derive_links(body: &str) -> (Vec<String>, Vec<String>) {
    let found = extract_links(body);
    let display = found.iter().map(|url| display_link(url)).collect();
    (found, display)
}
