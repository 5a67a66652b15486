//! Label sanitizer shared by node ids and display labels

use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^<>]*>").expect("tag pattern is a valid regex"))
}

/// Unescapes HTML entities, strips markup tags and trims whitespace
///
/// Entities that decode to markup (`&lt;b&gt;`) are stripped as well, so the
/// result never contains a tag.
pub fn sanitize_label(raw: &str) -> String {
    if !raw.contains(['<', '&']) {
        return raw.trim().to_string();
    }
    let fragment = Html::parse_fragment(raw);
    let text: String = fragment.root_element().text().collect();
    tag_pattern().replace_all(&text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_trimmed() {
        assert_eq!(sanitize_label("  Brake control \n"), "Brake control");
        assert_eq!(sanitize_label("42"), "42");
    }

    #[test]
    fn test_tags_are_stripped() {
        assert_eq!(sanitize_label("<b>Brake</b> <i>control</i>"), "Brake control");
        assert_eq!(sanitize_label("<span class=\"x\"></span>"), "");
    }

    #[test]
    fn test_entities_are_unescaped() {
        assert_eq!(sanitize_label("Fuel &amp; air"), "Fuel & air");
        assert_eq!(sanitize_label("a &lt;b&gt;bold&lt;/b&gt; z"), "a bold z");
    }
}
