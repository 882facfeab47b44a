//! PDF parser with page-level extraction

use sha2::{Digest, Sha256};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::FileType;

/// How long whole-document fallback extraction may run
const FALLBACK_TIMEOUT: Duration = Duration::from_secs(60);

/// Typographic characters replaced with ASCII equivalents
const REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Clean up extracted PDF text.
///
/// Drops NUL characters, maps ligatures and typographic punctuation to
/// ASCII, trims each line and collapses runs of blank lines into a single
/// paragraph break.
pub fn cleanup_pdf_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\0' {
            continue;
        }
        match REPLACEMENTS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => result.push_str(to),
            None => result.push(c),
        }
    }

    let mut lines: Vec<&str> = Vec::new();
    for line in result.lines().map(str::trim) {
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

/// SHA-256 hex digest of extracted text
pub fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Parsed document with extracted text and metadata
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Extracted text of all pages, separated by blank lines
    pub content: String,
    /// Content hash for identification
    pub content_hash: String,
    /// Total pages
    pub total_pages: Option<u32>,
    /// Page-level content; pages without text are skipped
    pub pages: Vec<PageContent>,
}

/// Content from a single page
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Text content of the page
    pub content: String,
    /// Character offset in full document
    pub char_offset: usize,
}

/// PDF file parser
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        match FileType::from_filename(filename) {
            FileType::Pdf => Self::parse_pdf(filename, data),
            FileType::Unknown => Err(Error::UnsupportedFileType(format!(
                "{} - only PDF files are accepted",
                filename
            ))),
        }
    }

    /// Parse a PDF document page by page
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let (raw_pages, total_pages) = match lopdf::Document::load_mem(data) {
            Ok(doc) => {
                let pages = Self::extract_pages(&doc);
                let total = doc.get_pages().len() as u32;
                (pages, Some(total))
            }
            Err(e) => {
                tracing::warn!("lopdf could not load '{}': {}, trying fallback", filename, e);
                (Vec::new(), None)
            }
        };

        let mut pages: Vec<(u32, String)> = raw_pages
            .into_iter()
            .map(|(number, text)| (number, cleanup_pdf_text(&text)))
            .filter(|(_, text)| !text.is_empty())
            .collect();

        if pages.is_empty() {
            tracing::debug!("No page-level text in '{}', extracting whole document", filename);
            let text = cleanup_pdf_text(&Self::extract_with_timeout(filename, data)?);
            if !text.is_empty() {
                pages.push((1, text));
            }
        }

        if pages.is_empty() {
            return Err(Error::file_parse(
                filename,
                "No text content could be extracted from PDF (it may be scanned or encrypted)",
            ));
        }

        let mut content = String::new();
        let mut page_contents = Vec::with_capacity(pages.len());
        for (page_number, text) in pages {
            if !content.is_empty() {
                content.push_str("\n\n");
            }
            let char_offset = content.chars().count();
            content.push_str(&text);
            page_contents.push(PageContent {
                page_number,
                content: text,
                char_offset,
            });
        }

        tracing::debug!(
            "Parsed '{}': {} pages with text out of {:?}",
            filename,
            page_contents.len(),
            total_pages
        );

        Ok(ParsedDocument {
            file_type: FileType::Pdf,
            content_hash: hash_content(&content),
            content,
            total_pages: total_pages.or(Some(page_contents.len() as u32)),
            pages: page_contents,
        })
    }

    /// Extract the text of each page with lopdf
    fn extract_pages(doc: &lopdf::Document) -> Vec<(u32, String)> {
        doc.get_pages()
            .keys()
            .filter_map(|&page_number| match doc.extract_text(&[page_number]) {
                Ok(text) => Some((page_number, text)),
                Err(e) => {
                    tracing::debug!("Could not extract text from page {}: {}", page_number, e);
                    None
                }
            })
            .collect()
    }

    /// Whole-document extraction with pdf-extract, bounded by a timeout so
    /// pathological fonts cannot hang an upload
    fn extract_with_timeout(filename: &str, data: &[u8]) -> Result<String> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result.map_err(|e| e.to_string()));
        });

        match rx.recv_timeout(FALLBACK_TIMEOUT) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(Error::file_parse(filename, format!("Failed to load PDF: {}", e))),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!("PDF extraction timeout after {:?} for '{}'", FALLBACK_TIMEOUT, filename);
                Err(Error::file_parse(filename, "PDF text extraction timed out"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("PDF extraction thread crashed for '{}'", filename);
                Err(Error::file_parse(filename, "PDF text extraction crashed"))
            }
        }
    }
}

/// Build a small PDF with one text line per page
#[cfg(test)]
pub(crate) fn sample_pdf(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
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
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Count" => kids.len() as i64,
        "Kids" => kids,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_pdf_text() {
        let cleaned = cleanup_pdf_text("  \u{FB01}rst line\0  \n\n\n\u{201C}quoted\u{201D} \u{2014} end\n\n");
        assert_eq!(cleaned, "first line\n\n\"quoted\" -- end");
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_content("abc"), hash_content("abc"));
        assert_ne!(hash_content("abc"), hash_content("abd"));
        assert_eq!(hash_content("abc").len(), 64);
    }

    #[test]
    fn test_rejects_non_pdf() {
        let err = FileParser::parse("notes.txt", b"hello").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn test_garbage_pdf_fails_to_parse() {
        let err = FileParser::parse("broken.pdf", b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }

    #[test]
    fn test_parse_pages() {
        let data = sample_pdf(&["The reactor runs at 300 kelvin.", "Maintenance happens on Mondays."]);
        let parsed = FileParser::parse("plant.pdf", &data).unwrap();

        assert_eq!(parsed.file_type, FileType::Pdf);
        assert_eq!(parsed.total_pages, Some(2));
        assert_eq!(parsed.pages.len(), 2);
        assert_eq!(parsed.pages[0].page_number, 1);
        assert!(parsed.pages[0].content.contains("300 kelvin"));
        assert_eq!(parsed.pages[1].page_number, 2);
        assert!(parsed.pages[1].content.contains("Mondays"));
        assert!(parsed.pages[1].char_offset > parsed.pages[0].char_offset);
        assert_eq!(parsed.content_hash, hash_content(&parsed.content));
    }
}
