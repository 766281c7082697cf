//! Record filter, HTML normalizer and document extractor tests (HTML, PDF, DOCX, structured text).

use arcsubmit::error::RecordError;
use arcsubmit::extract::{
    BinaryExtractor, ContentExtractor, DocumentExtractor, HtmlStripper, RecordFilter,
    TextNormalizer, Verdict, collapse_whitespace,
};
use arcsubmit::{Outcome, RawRecord, SubmissionDocument};
use std::io::Cursor;
use std::path::PathBuf;

const PAGE: &str = r#"<html><head><title>
    Fish &amp;   Chips
</title><style>body { color: red }</style></head>
<body><h1>Menu</h1><script>var x = 1;</script><p>Cod,
haddock   and &lt;plaice&gt;</p></body></html>"#;

fn rec(mime: &str, status: u16, body: &[u8]) -> RawRecord {
    RawRecord {
        url: "http://x/y".to_string(),
        mime_type: mime.to_string(),
        status,
        length: body.len() as u64,
        content: body.to_vec(),
        body_offset: 0,
        container: PathBuf::from("/arcs/a.arc"),
        index: 3,
    }
}

fn filter() -> RecordFilter {
    RecordFilter::new(["text/html".to_string(), "application/pdf".to_string()].into())
}

/// One-page PDF in a standard font with `title` in the document info dictionary.
fn pdf_fixture(text: &str, title: Option<&str>) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
        });
        doc.trailer.set("Info", info_id);
    }
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn docx_fixture(title: &str, body: &[&str]) -> Vec<u8> {
    use docx_rs::{Docx, Paragraph, Run};

    let mut docx = Docx::new()
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text(title)).style("Title"));
    for line in body {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*line)));
    }
    let mut out = Cursor::new(Vec::new());
    docx.build().pack(&mut out).unwrap();
    out.into_inner()
}

#[test]
fn test_filter_admits_allowed_ok_records() {
    assert_eq!(filter().check(&rec("text/html", 200, b"")), Verdict::Admit);
    assert_eq!(filter().check(&rec("text/html", 0, b"")), Verdict::Admit);
    assert_eq!(filter().check(&rec("text/html", 399, b"")), Verdict::Admit);
}

#[test]
fn test_filter_rejects_mime_and_error_status() {
    assert_eq!(
        filter().check(&rec("image/png", 200, b"")),
        Verdict::MimeNotAllowed
    );
    assert_eq!(filter().check(&rec("text/html", 400, b"")), Verdict::ErrorStatus);
    assert_eq!(filter().check(&rec("text/html", 503, b"")), Verdict::ErrorStatus);
    assert!(!filter().admits(&rec("image/png", 500, b"")));
}

#[test]
fn test_strip_drops_tags_scripts_and_styles() {
    let text = HtmlStripper.strip(PAGE);
    assert!(text.contains("Menu Cod, haddock and <plaice>"), "{text}");
    assert!(!text.contains("var x"));
    assert!(!text.contains("color"));
}

#[test]
fn test_html_title_is_decoded_and_collapsed() {
    assert_eq!(HtmlStripper.title(PAGE).as_deref(), Some("Fish & Chips"));
    assert_eq!(HtmlStripper.title("<p>no head here</p>"), None);
    assert_eq!(HtmlStripper.title("<title>   </title>"), None);
    assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
}

#[test]
fn test_text_document_is_stripped_and_escaped() {
    let mut doc = SubmissionDocument::from_record(rec(
        "text/html",
        200,
        b"<title>A &amp; B</title><p>1 &lt; 2</p>",
    ));
    ContentExtractor::default().extract(&mut doc).unwrap();
    assert_eq!(doc.title.as_deref(), Some("A &amp; B"));
    assert!(doc.text.ends_with("1 &lt; 2"), "{}", doc.text);
    assert_eq!(doc.offset, 3);

    let mut plain = SubmissionDocument::from_record(rec("text/plain", 200, b"just text"));
    ContentExtractor::default().extract(&mut plain).unwrap();
    assert_eq!(plain.title, None);
    assert_eq!(plain.text, "just text");
}

#[test]
fn test_pdf_text_and_info_title() {
    let pdf = pdf_fixture("Hello World!", Some("Quarterly Report"));
    let out = DocumentExtractor.extract("application/pdf", &pdf).unwrap();
    assert!(out.text.contains("Hello World"), "{}", out.text);
    assert_eq!(out.title.as_deref(), Some("Quarterly Report"));

    let untitled = pdf_fixture("Hello World!", None);
    assert_eq!(DocumentExtractor.extract("application/pdf", &untitled).unwrap().title, None);
}

#[test]
fn test_pdf_title_reaches_document_escaped() {
    let pdf = pdf_fixture("Fish and chips", Some("Fish & Chips"));
    let mut doc = SubmissionDocument::from_record(rec("application/pdf", 200, &pdf));
    ContentExtractor::default().extract(&mut doc).unwrap();
    assert_eq!(doc.title.as_deref(), Some("Fish &amp; Chips"));
    assert!(doc.text.contains("Fish and chips"), "{}", doc.text);
}

#[test]
fn test_docx_paragraphs_and_title_style() {
    let docx = docx_fixture("Annual Plan", &["Revenue grew.", "Costs   fell."]);
    let mime = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
    let out = DocumentExtractor.extract(mime, &docx).unwrap();
    assert_eq!(out.title.as_deref(), Some("Annual Plan"));
    assert_eq!(out.text, "Annual Plan Revenue grew. Costs fell.");
}

#[test]
fn test_structured_text_is_collapsed() {
    let out = DocumentExtractor
        .extract("application/json", b"{ \"a\":\n  1 }")
        .unwrap();
    assert_eq!(out.text, "{ \"a\": 1 }");
    assert_eq!(out.title, None);

    let xhtml = DocumentExtractor
        .extract("application/xhtml+xml", b"<html><title>T</title><p>x</p></html>")
        .unwrap();
    assert_eq!(xhtml.title.as_deref(), Some("T"));
}

#[test]
fn test_unknown_or_corrupt_binary_is_an_error() {
    assert!(DocumentExtractor.extract("image/png", b"\x89PNG").is_err());
    assert!(DocumentExtractor.extract("application/pdf", b"%PDF-1.4 truncated").is_err());
    assert!(DocumentExtractor.extract("application/msword", b"not a zip").is_err());

    let mut doc = SubmissionDocument::from_record(rec("application/pdf", 200, b"%PDF"));
    let err = ContentExtractor::default().extract(&mut doc).unwrap_err();
    assert!(matches!(err, RecordError::Extraction(_)));
    assert!(matches!(doc.outcome, Outcome::Error(_)));
}
