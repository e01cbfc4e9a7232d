//! Plain-text previews of post HTML for list cards and page metadata.

use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_PREVIEW_CHARS: usize = 150;
pub const META_DESCRIPTION_CHARS: usize = 150;
pub const FALLBACK_META_DESCRIPTION: &str =
    "Read our latest insights about solar energy and sustainable living.";

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern compiles"));

/// Remove anything that looks like a tag. Entities are left as written.
pub fn strip_tags(html: &str) -> String {
    TAG_PATTERN.replace_all(html, "").into_owned()
}

/// Tag-stripped text, cut to `budget` characters with a trailing `...` when longer.
pub fn truncate_preview(html: &str, budget: usize) -> String {
    let text = strip_tags(html);
    if text.chars().count() <= budget {
        return text;
    }
    let mut cut: String = text.chars().take(budget).collect();
    cut.push_str("...");
    cut
}

/// Description for `<meta name="description">`. Suffixed with `...` unless the post has no content.
pub fn meta_description(html: &str) -> String {
    if html.is_empty() {
        return FALLBACK_META_DESCRIPTION.to_string();
    }
    let mut text: String = strip_tags(html)
        .chars()
        .take(META_DESCRIPTION_CHARS)
        .collect();
    text.push_str("...");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "<p>Hello <b>World</b></p>";

    #[test]
    fn strips_nested_markup() {
        assert_eq!(strip_tags(SAMPLE), "Hello World");
        assert_eq!(strip_tags("<img src=\"x\"/>caption"), "caption");
    }

    #[test]
    fn truncation_counts_characters_after_stripping() {
        assert_eq!(truncate_preview(SAMPLE, 5), "Hello...");
        assert_eq!(truncate_preview(SAMPLE, 10), "Hello Worl...");
        assert_eq!(truncate_preview(SAMPLE, 11), "Hello World");
        assert_eq!(truncate_preview(SAMPLE, 12), "Hello World");
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        assert_eq!(truncate_preview("<p>héllo wörld</p>", 7), "héllo w...");
    }

    #[test]
    fn meta_description_is_always_suffixed() {
        assert_eq!(meta_description(SAMPLE), "Hello World...");
        let long = format!("<p>{}</p>", "a".repeat(200));
        assert_eq!(meta_description(&long).chars().count(), 153);
    }

    #[test]
    fn empty_content_uses_the_fallback_description() {
        assert_eq!(meta_description(""), FALLBACK_META_DESCRIPTION);
    }
}
