//! PDF text extraction
//!
//! Extracts text content from PDF bytes using lopdf. Output is one
//! cleaned text block per page that yielded text, in page order.

use crate::errors::IngestionError;
use std::path::Path;
use tracing::{debug, warn};

/// Extract the text blocks of a PDF held in memory.
///
/// Returns one block per page with extractable text, in page order.
/// A document whose pages yield no text at all is an error rather than
/// an empty block list.
pub fn extract_document(bytes: &[u8]) -> Result<Vec<String>, IngestionError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| IngestionError::PdfParse {
        message: format!("Failed to load PDF: {}", e),
    })?;

    let mut blocks = Vec::new();

    for (page_index, page_id) in doc.page_iter().enumerate() {
        match doc.get_page_content(page_id) {
            Ok(content) => {
                let raw = text_from_content_stream(&content);
                let cleaned = normalize_block(&raw);
                if !cleaned.is_empty() {
                    blocks.push(cleaned);
                }
            }
            Err(e) => {
                warn!(page = page_index + 1, error = %e, "Failed to read page content, skipping");
            }
        }
    }

    if blocks.iter().all(|b| b.trim().is_empty()) {
        return Err(IngestionError::EmptyDocument);
    }

    debug!(page_count = blocks.len(), "Text extraction complete");

    Ok(blocks)
}

/// Extract the text blocks of a PDF file on disk.
pub fn extract_document_from_path(path: &Path) -> Result<Vec<String>, IngestionError> {
    let bytes = std::fs::read(path)?;
    extract_document(&bytes)
}

/// Walk a page content stream and collect the text shown by its
/// text-showing operators (between BT and ET).
fn text_from_content_stream(content: &[u8]) -> String {
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current = String::new();

    for line in content_str.lines() {
        let trimmed = line.trim();

        if trimmed == "BT" {
            in_text_block = true;
            continue;
        }

        if trimmed == "ET" {
            in_text_block = false;
            if !current.is_empty() {
                text.push_str(&current);
                text.push(' ');
                current.clear();
            }
            continue;
        }

        if in_text_block {
            if let Some(shown) = text_from_operator(trimmed) {
                current.push_str(&shown);
            }
        }
    }

    text
}

/// Pull the shown text out of a single Tj / TJ / ' / " operator line.
fn text_from_operator(line: &str) -> Option<String> {
    // (text) Tj and the quote forms
    if line.ends_with("Tj") || line.ends_with('\'') || line.ends_with('"') {
        if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
            if start < end {
                return Some(unescape_pdf_string(&line[start + 1..end]));
            }
        }
    }

    // [(text) num (text) num] TJ
    if line.ends_with("TJ") {
        let mut result = String::new();
        let mut in_paren = false;
        let mut current = String::new();

        for ch in line.chars() {
            match ch {
                '(' => in_paren = true,
                ')' => {
                    in_paren = false;
                    result.push_str(&unescape_pdf_string(&current));
                    current.clear();
                }
                _ if in_paren => current.push(ch),
                _ => {}
            }
        }

        if !result.is_empty() {
            return Some(result);
        }
    }

    None
}

/// Decode the backslash escapes of a PDF literal string.
fn unescape_pdf_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some('(') => result.push('('),
            Some(')') => result.push(')'),
            Some(c) => result.push(c),
            None => {}
        }
    }

    result
}

/// Collapse whitespace runs and strip common PDF artifacts.
fn normalize_block(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{FEFF}', "")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Build a minimal single-font PDF with one page per text block.
    fn build_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![50.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode content"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let kids_len = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => kids_len,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save pdf");
        bytes
    }

    #[test]
    fn extracts_one_block_per_page() {
        let bytes = build_pdf(&["first page text", "second page text"]);
        let blocks = extract_document(&bytes).unwrap();
        assert_eq!(blocks, vec!["first page text", "second page text"]);
    }

    #[test]
    fn rejects_invalid_pdf() {
        let err = extract_document(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, IngestionError::PdfParse { .. }));
    }

    #[test]
    fn rejects_document_without_text() {
        let bytes = build_pdf(&[]);
        let err = extract_document(&bytes).unwrap_err();
        assert!(matches!(err, IngestionError::EmptyDocument));
    }

    #[test]
    fn unescapes_pdf_strings() {
        assert_eq!(unescape_pdf_string("Hello\\nWorld"), "Hello\nWorld");
        assert_eq!(unescape_pdf_string("Test\\(paren\\)"), "Test(paren)");
    }

    #[test]
    fn normalizes_whitespace() {
        assert_eq!(normalize_block("Hello   World\n\nTest"), "Hello World Test");
    }
}
