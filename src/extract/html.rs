//! HTML normalization: tag stripping and title lookup on a full parse.

use scraper::{Html, Node};

/// Turns captured markup into plain text and finds its title.
pub trait TextNormalizer: Send + Sync {
    /// Visible text with tags removed and whitespace collapsed. Not escaped.
    fn strip(&self, html: &str) -> String;

    /// Decoded, whitespace-collapsed content of the first `<title>`. None when absent or empty.
    fn title(&self, html: &str) -> Option<String>;
}

/// Elements whose text is never indexed.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// [`TextNormalizer`] backed by the html5ever parser in `scraper`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlStripper;

impl TextNormalizer for HtmlStripper {
    fn strip(&self, html: &str) -> String {
        let doc = Html::parse_document(html);
        let mut out = String::with_capacity(html.len() / 2);
        for node in doc.tree.root().descendants() {
            let Node::Text(text) = node.value() else {
                continue;
            };
            let hidden = node.ancestors().any(|a| match a.value() {
                Node::Element(e) => SKIPPED_ELEMENTS.contains(&e.name()),
                _ => false,
            });
            if !hidden {
                out.push_str(text);
                out.push(' ');
            }
        }
        collapse_whitespace(&out)
    }

    fn title(&self, html: &str) -> Option<String> {
        let doc = Html::parse_document(html);
        let title = doc.tree.root().descendants().find(|n| match n.value() {
            Node::Element(e) => e.name() == "title",
            _ => false,
        })?;
        let text: String = title
            .descendants()
            .filter_map(|n| match n.value() {
                Node::Text(t) => Some(&**t),
                _ => None,
            })
            .collect();
        let text = collapse_whitespace(&text);
        (!text.is_empty()).then_some(text)
    }
}

/// Collapse runs of whitespace to one space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
