//! Text extraction for non-`text/*` payloads: PDF, DOCX and UTF-8 structured text.

use log::debug;
use std::panic::{AssertUnwindSafe, catch_unwind};

use super::html::{HtmlStripper, TextNormalizer, collapse_whitespace};

/// Plain text and optional embedded title pulled out of a binary payload. Not escaped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    pub title: Option<String>,
}

/// Byte-to-text service for non-text MIME types.
pub trait BinaryExtractor: Send + Sync {
    fn extract(&self, mime_type: &str, bytes: &[u8]) -> Result<Extracted, String>;
}

/// Payload families with a dedicated parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    Docx,
    Markup,
    StructuredText,
}

impl DocumentKind {
    fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.to_ascii_lowercase();
        if mime.contains("pdf") {
            Some(DocumentKind::Pdf)
        } else if mime.contains("wordprocessingml") || mime.contains("msword") {
            Some(DocumentKind::Docx)
        } else if mime.contains("html") {
            Some(DocumentKind::Markup)
        } else if ["xml", "json", "javascript", "ecmascript", "x-sh", "csv"]
            .iter()
            .any(|t| mime.contains(t))
        {
            Some(DocumentKind::StructuredText)
        } else {
            None
        }
    }
}

/// Default extractor: PDF (pdf-extract, lopdf fallback), Word documents (docx-rs) and UTF-8
/// XML/XHTML/JSON-like payloads. Anything else is rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentExtractor;

impl BinaryExtractor for DocumentExtractor {
    fn extract(&self, mime_type: &str, bytes: &[u8]) -> Result<Extracted, String> {
        let kind = DocumentKind::from_mime(mime_type)
            .ok_or_else(|| format!("no text extractor for {mime_type}"))?;
        let out = match kind {
            DocumentKind::Pdf => parse_pdf(bytes)?,
            DocumentKind::Docx => parse_docx(bytes)?,
            DocumentKind::Markup | DocumentKind::StructuredText => {
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| format!("{mime_type} payload is not UTF-8: {e}"))?;
                let s = s.replace('\0', "");
                if kind == DocumentKind::Markup {
                    Extracted {
                        text: HtmlStripper.strip(&s),
                        title: HtmlStripper.title(&s),
                    }
                } else {
                    Extracted {
                        text: collapse_whitespace(&s),
                        title: None,
                    }
                }
            }
        };
        Ok(out)
    }
}

fn parse_pdf(bytes: &[u8]) -> Result<Extracted, String> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| format!("unreadable PDF: {e}"))?;
    // pdf-extract panics on some font tables; treat that like any other failure.
    let primary = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }));
    let text = match primary {
        Ok(Ok(text)) if !text.trim().is_empty() => text,
        Ok(Ok(_)) => pdf_text_fallback(&doc)?,
        Ok(Err(e)) => {
            debug!("pdf-extract failed: {e}, trying lopdf");
            pdf_text_fallback(&doc)?
        }
        Err(_) => {
            debug!("pdf-extract panicked, trying lopdf");
            pdf_text_fallback(&doc)?
        }
    };
    let text = collapse_whitespace(&text.replace('\0', ""));
    if text.is_empty() {
        return Err("no text content could be extracted from PDF".to_string());
    }
    Ok(Extracted {
        text,
        title: pdf_title(&doc),
    })
}

fn pdf_text_fallback(doc: &lopdf::Document) -> Result<String, String> {
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages)
        .map_err(|e| format!("PDF text extraction failed: {e}"))
}

/// `/Title` from the trailer's `/Info` dictionary.
fn pdf_title(doc: &lopdf::Document) -> Option<String> {
    let info = doc.trailer.get(b"Info").ok()?;
    let info = match info.as_reference() {
        Ok(id) => doc.get_object(id).ok()?,
        Err(_) => info,
    };
    let raw = info.as_dict().ok()?.get(b"Title").ok()?.as_str().ok()?;
    let title = collapse_whitespace(&decode_pdf_text(raw));
    (!title.is_empty()).then_some(title)
}

/// PDF text strings are UTF-16BE with a BOM, or a Latin-1 superset otherwise.
fn decode_pdf_text(raw: &[u8]) -> String {
    match raw.strip_prefix(&[0xfe, 0xff]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => raw.iter().map(|&b| b as char).collect(),
    }
}

fn parse_docx(bytes: &[u8]) -> Result<Extracted, String> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| format!("unreadable DOCX: {e}"))?;
    let mut text = String::new();
    let mut title = None;
    for child in &docx.document.children {
        let docx_rs::DocumentChild::Paragraph(p) = child else {
            continue;
        };
        let mut para = String::new();
        for pc in &p.children {
            if let docx_rs::ParagraphChild::Run(run) = pc {
                for rc in &run.children {
                    if let docx_rs::RunChild::Text(t) = rc {
                        para.push_str(&t.text);
                    }
                }
            }
        }
        let is_title = p
            .property
            .style
            .as_ref()
            .is_some_and(|s| s.val.eq_ignore_ascii_case("title"));
        if title.is_none() && is_title && !para.trim().is_empty() {
            title = Some(collapse_whitespace(&para));
        }
        text.push_str(&para);
        text.push('\n');
    }
    let text = collapse_whitespace(&text);
    if text.is_empty() && title.is_none() {
        return Err("no text content could be extracted from DOCX".to_string());
    }
    Ok(Extracted { text, title })
}
