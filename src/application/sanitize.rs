//! HTML allow-list applied to editor output before it is stored and again before it is rendered.

use std::collections::{HashMap, HashSet};

use ammonia::Builder as AmmoniaBuilder;
use once_cell::sync::Lazy;

use super::editor::VOCABULARY;

static POST_SANITIZER: Lazy<AmmoniaBuilder<'static>> = Lazy::new(build_post_sanitizer);

/// Clean untrusted post HTML down to the editor vocabulary plus a few legacy block tags.
pub fn sanitize_post_html(html: &str) -> String {
    POST_SANITIZER.clean(html).to_string()
}

fn build_post_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let mut tags: HashSet<&'static str> = VOCABULARY.iter().map(|(tag, _)| *tag).collect();
    // Older posts were authored with a wider toolbar.
    tags.extend(["b", "i", "s", "h1", "h2", "h3", "code", "pre", "hr"]);
    builder.tags(tags);

    let mut attributes: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();
    for (tag, attrs) in VOCABULARY {
        if !attrs.is_empty() {
            attributes.insert(*tag, attrs.iter().copied().collect());
        }
    }
    attributes.entry("img").or_default().insert("title");
    builder.tag_attributes(attributes);
    builder.generic_attributes(HashSet::new());

    builder.url_schemes(HashSet::from(["http", "https", "mailto"]));
    builder.link_rel(Some("noopener noreferrer"));

    builder
}
