// crates/core/src/pdf.rs
//! PDF to text.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use crate::error::PdfError;

/// First bytes of every PDF file.
pub const PDF_MAGIC: &[u8] = b"%PDF";

/// Text pulled out of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
    /// Pages actually appended to `text`; less than `page_count` when the
    /// caller cancelled part way or a page could not be read.
    pub pages_read: usize,
}

/// Anything that can turn a file into raw text, page by page.
pub trait TextExtractor: Send + Sync {
    /// `should_stop` is polled between pages; once it returns true the
    /// text gathered so far is returned.
    fn extract(&self, path: &Path, should_stop: &dyn Fn() -> bool)
        -> Result<ExtractedText, PdfError>;
}

/// Extractor backed by the `pdf-extract` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(
        &self,
        path: &Path,
        should_stop: &dyn Fn() -> bool,
    ) -> Result<ExtractedText, PdfError> {
        let bytes = std::fs::read(path).map_err(|e| PdfError::io(path, e))?;
        if !is_pdf_bytes(&bytes) {
            return Err(PdfError::Extract {
                path: path.to_path_buf(),
                message: "missing %PDF header".into(),
            });
        }

        // pdf-extract panics on some malformed inputs; keep that inside
        // this document.
        let parser_panicked = || PdfError::Extract {
            path: path.to_path_buf(),
            message: "PDF parser panicked".into(),
        };
        let mut doc = catch_unwind(AssertUnwindSafe(|| pdf_extract::Document::load_mem(&bytes)))
            .map_err(|_| parser_panicked())?
            .map_err(|e| PdfError::Extract {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if doc.is_encrypted() {
            doc.decrypt("").map_err(|e| PdfError::Extract {
                path: path.to_path_buf(),
                message: format!("encrypted PDF: {e}"),
            })?;
        }

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let mut out = ExtractedText {
            page_count: page_numbers.len(),
            ..ExtractedText::default()
        };
        for page_num in page_numbers {
            if should_stop() {
                tracing::info!(path = %path.display(), pages_read = out.pages_read, "PDF parsing stopped early");
                break;
            }
            match page_text(&doc, page_num) {
                Ok(page) => {
                    out.text.push_str(&page);
                    if !page.ends_with('\n') {
                        out.text.push('\n');
                    }
                    out.pages_read += 1;
                }
                Err(message) => {
                    tracing::warn!(path = %path.display(), page = page_num, %message, "skipping unreadable page");
                }
            }
        }
        Ok(out)
    }
}

/// Text of one page. Errors and parser panics come back as a message.
fn page_text(doc: &pdf_extract::Document, page_num: u32) -> Result<String, String> {
    let rendered = catch_unwind(AssertUnwindSafe(|| {
        let mut text = String::new();
        let mut output = pdf_extract::PlainTextOutput::new(&mut text);
        let result = pdf_extract::output_doc_page(doc, &mut output, page_num);
        drop(output);
        result.map(|_| text)
    }));
    match rendered {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("PDF parser panicked".to_string()),
    }
}

pub fn is_pdf_bytes(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Check a file's magic bytes without reading all of it.
pub fn is_pdf_file(path: &Path) -> bool {
    use std::io::Read;
    let mut header = [0u8; 4];
    std::fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut header))
        .map(|_| is_pdf_bytes(&header))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a.pdf");
        let html = dir.path().join("b.pdf");
        let tiny = dir.path().join("c.pdf");
        std::fs::write(&pdf, b"%PDF-1.7\n...").unwrap();
        std::fs::write(&html, b"<!DOCTYPE html>").unwrap();
        std::fs::write(&tiny, b"%P").unwrap();

        assert!(is_pdf_file(&pdf));
        assert!(!is_pdf_file(&html));
        assert!(!is_pdf_file(&tiny));
        assert!(!is_pdf_file(&dir.path().join("missing.pdf")));
    }

    #[test]
    fn test_extract_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PdfTextExtractor
            .extract(&dir.path().join("missing.pdf"), &|| false)
            .unwrap_err();
        assert!(matches!(err, PdfError::NotFound { .. }));
    }

    #[test]
    fn test_extract_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"<html>not a pdf</html>").unwrap();
        let err = PdfTextExtractor.extract(&path, &|| false).unwrap_err();
        assert!(matches!(err, PdfError::Extract { .. }));
    }

    #[test]
    fn test_extract_garbage_pdf_is_error_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\nthis is not really a pdf body").unwrap();
        assert!(PdfTextExtractor.extract(&path, &|| false).is_err());
    }

    /// Small PDF, one text line per page, using the built-in Helvetica font. A `None` entry
    /// produces a page without a MediaBox, which the parser cannot render.
    fn write_pdf(path: &Path, pages: &[Option<&str>]) {
        use pdf_extract::content::{Content, Operation};
        use pdf_extract::{Dictionary, Document, Object, Stream};

        fn name(n: &str) -> Object {
            Object::Name(n.as_bytes().to_vec())
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut font = Dictionary::new();
        font.set("Type", name("Font"));
        font.set("Subtype", name("Type1"));
        font.set("BaseFont", name("Helvetica"));
        let font_id = doc.add_object(font);
        let mut fonts = Dictionary::new();
        fonts.set("F1", font_id);
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        let resources_id = doc.add_object(resources);

        let mut kids = Vec::new();
        for page in pages {
            let text = page.unwrap_or("unreadable");
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec![name("F1"), Object::Integer(24)]),
                    Operation::new("Td", vec![Object::Integer(100), Object::Integer(600)]),
                    Operation::new("Tj", vec![Object::string_literal(text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
            let mut dict = Dictionary::new();
            dict.set("Type", name("Page"));
            dict.set("Parent", pages_id);
            dict.set("Contents", content_id);
            dict.set("Resources", resources_id);
            if page.is_some() {
                dict.set(
                    "MediaBox",
                    Object::Array([0, 0, 595, 842].map(Object::Integer).to_vec()),
                );
            }
            kids.push(Object::Reference(doc.add_object(dict)));
        }

        let mut tree = Dictionary::new();
        tree.set("Type", name("Pages"));
        tree.set("Count", Object::Integer(kids.len() as i64));
        tree.set("Kids", Object::Array(kids));
        doc.objects.insert(pages_id, Object::Dictionary(tree));

        let mut catalog = Dictionary::new();
        catalog.set("Type", name("Catalog"));
        catalog.set("Pages", pages_id);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_unreadable_page_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.pdf");
        write_pdf(&path, &[Some("Alpha"), None, Some("Charlie")]);

        let out = PdfTextExtractor.extract(&path, &|| false).unwrap();
        assert_eq!(out.page_count, 3);
        assert_eq!(out.pages_read, 2);
        assert!(out.text.contains("Alpha"));
        assert!(out.text.contains("Charlie"));
    }

    #[test]
    fn test_stop_is_checked_before_each_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("three.pdf");
        write_pdf(&path, &[Some("Alpha"), Some("Bravo"), Some("Charlie")]);

        let calls = std::cell::Cell::new(0);
        let stop = || {
            calls.set(calls.get() + 1);
            calls.get() > 1
        };
        let out = PdfTextExtractor.extract(&path, &stop).unwrap();
        assert_eq!(out.page_count, 3);
        assert_eq!(out.pages_read, 1);
        assert!(out.text.contains("Alpha"));
        assert!(!out.text.contains("Bravo"));
        assert_eq!(calls.get(), 2);
    }
}
