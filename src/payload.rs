//! Index payload rendering: `<add><doc>` documents and the `<commit/>` control message.

use quick_xml::escape::escape;
use std::fmt::Write;

use crate::engine::tools::{cache_path, path_to_db_string};
use crate::types::{FieldMapping, SubmissionDocument};

/// Control payload making buffered submissions visible.
pub const COMMIT_PAYLOAD: &str = "<commit/>";

/// Extra index fields for a document, returned as a ready-made XML fragment
/// (`<field name="...">...</field>` elements). An empty string adds nothing.
pub trait CustomFields: Send + Sync {
    fn fields(&self, doc: &SubmissionDocument) -> String;
}

/// Default hook: no extra fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCustomFields;

impl CustomFields for NoCustomFields {
    fn fields(&self, _doc: &SubmissionDocument) -> String {
        String::new()
    }
}

/// Renders field-mapped payloads. Holds only read-only settings, so one instance is shared by all workers.
#[derive(Clone, Debug)]
pub struct DocumentBuilder {
    mapping: FieldMapping,
    scan_root: String,
    cache_prefix: String,
}

impl DocumentBuilder {
    pub fn new(mapping: FieldMapping, scan_root: &str, cache_prefix: &str) -> Self {
        DocumentBuilder {
            mapping,
            scan_root: scan_root.to_string(),
            cache_prefix: cache_prefix.to_string(),
        }
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// Render `doc` in fixed field order: url, cache, offset, text, type, then title if present,
    /// then `custom` verbatim. `doc.text` and `doc.title` are expected to be escaped already.
    pub fn render(&self, doc: &SubmissionDocument, custom: &str) -> String {
        let m = &self.mapping;
        let container = path_to_db_string(&doc.container);
        let cache = cache_path(&container, &self.scan_root, &self.cache_prefix);

        let mut out = String::with_capacity(doc.text.len() + 512);
        out.push_str("<add>\n<doc>");
        push_field(&mut out, &m.url, &escape(doc.url.as_str()));
        push_field(&mut out, &m.cache, &escape(cache.as_str()));
        if !m.offset.is_empty() {
            push_field(&mut out, &m.offset, &doc.offset.to_string());
        }
        push_field(&mut out, &m.text, &doc.text);
        push_field(&mut out, &m.mime_type, &escape(doc.mime_type.as_str()));
        if let Some(title) = &doc.title
            && !m.title.is_empty()
        {
            push_field(&mut out, &m.title, title);
        }
        if !custom.is_empty() {
            out.push_str(custom);
        }
        out.push_str("</doc>\n</add>\n");
        out
    }
}

fn push_field(out: &mut String, name: &str, value: &str) {
    let _ = writeln!(
        out,
        "<field name=\"{}\">{}</field>",
        escape(name),
        value
    );
}
