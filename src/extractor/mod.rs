
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use tracing::{debug, warn};

use crate::{RagError, Result};

const DOCX_BODY_PART: &str = "word/document.xml";

/// Document formats the pipeline can turn into text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Doc,
    Txt,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::Pdf,
        DocumentKind::Txt,
        DocumentKind::Doc,
        DocumentKind::Docx,
    ];

    /// Resolve from a bare extension, case-insensitively
    #[inline]
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" => Ok(DocumentKind::Docx),
            "doc" => Ok(DocumentKind::Doc),
            "txt" => Ok(DocumentKind::Txt),
            other => Err(RagError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Resolve from the extension of a blob key or file path
    #[inline]
    pub fn from_key(key: &str) -> Result<Self> {
        let extension = Path::new(key)
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| RagError::UnsupportedFormat(key.to_string()))?;
        Self::from_extension(extension)
    }

    #[inline]
    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Doc => "doc",
            DocumentKind::Txt => "txt",
        }
    }

    #[inline]
    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentKind::Doc => "application/msword",
            DocumentKind::Txt => "text/plain",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Extract plain text from raw document bytes
#[inline]
pub fn extract(bytes: &[u8], kind: DocumentKind) -> Result<String> {
    debug!("Extracting text from {} bytes of {}", bytes.len(), kind);

    let text = match kind {
        DocumentKind::Txt => decode_text(bytes),
        DocumentKind::Pdf => extract_pdf(bytes)?,
        DocumentKind::Docx | DocumentKind::Doc => extract_docx(bytes)?,
    };

    debug!("Extracted {} characters", text.chars().count());
    Ok(text)
}

/// UTF-8, falling back to Latin-1 which maps every byte to a char
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("Text is not valid UTF-8, decoding as Latin-1");
            bytes.iter().copied().map(char::from).collect()
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    // The PDF parser panics on some malformed inputs
    let raw = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)))
        .map_err(|_| RagError::Extraction("PDF parser aborted on malformed input".to_string()))?
        .map_err(|e| RagError::Extraction(format!("Failed to read PDF: {e}")))?;

    if raw.trim().is_empty() {
        warn!("PDF contains no extractable text");
        return Ok(String::new());
    }

    let mut text = String::with_capacity(raw.len() + 1);
    for page in raw.split('\u{c}') {
        text.push_str(page);
        text.push('\n');
    }
    Ok(text)
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| RagError::Extraction(format!("Not a Word document package: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| RagError::Extraction(format!("Missing {DOCX_BODY_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| RagError::Extraction(format!("Failed to read {DOCX_BODY_PART}: {e}")))?;

    let (paragraphs, cells) = parse_document_xml(&xml)?;

    Ok(paragraphs
        .into_iter()
        .chain(cells)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Body paragraphs in order, then the text of every table cell
fn parse_document_xml(xml: &str) -> Result<(Vec<String>, Vec<String>)> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs = Vec::new();
    let mut cells = Vec::new();
    let mut open_cells: Vec<Vec<String>> = Vec::new();
    // Text boxes nest whole paragraphs inside a run of the enclosing one
    let mut open_paragraphs: Vec<String> = Vec::new();
    let mut in_text = false;

    let mut finish_paragraph = |text: String, open_cells: &mut Vec<Vec<String>>| {
        match open_cells.last_mut() {
            Some(cell) => cell.push(text),
            None => paragraphs.push(text),
        }
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => match element.name().as_ref() {
                b"w:p" => open_paragraphs.push(String::new()),
                b"w:t" => in_text = true,
                b"w:tc" => open_cells.push(Vec::new()),
                b"w:tab" => push_to_open(&mut open_paragraphs, "\t"),
                b"w:br" | b"w:cr" => push_to_open(&mut open_paragraphs, "\n"),
                _ => {}
            },
            Ok(Event::Empty(element)) => match element.name().as_ref() {
                b"w:p" => finish_paragraph(String::new(), &mut open_cells),
                b"w:tab" => push_to_open(&mut open_paragraphs, "\t"),
                b"w:br" | b"w:cr" => push_to_open(&mut open_paragraphs, "\n"),
                _ => {}
            },
            Ok(Event::Text(text)) if in_text => {
                let text = text
                    .unescape()
                    .map_err(|e| RagError::Extraction(format!("Malformed document text: {e}")))?;
                push_to_open(&mut open_paragraphs, &text);
            }
            Ok(Event::End(element)) => match element.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if let Some(text) = open_paragraphs.pop() {
                        finish_paragraph(text, &mut open_cells);
                    }
                }
                b"w:tc" => {
                    if let Some(cell) = open_cells.pop() {
                        cells.push(cell.join("\n"));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(RagError::Extraction(format!(
                    "Malformed document XML at position {}: {e}",
                    reader.error_position()
                )));
            }
            Ok(_) => {}
        }
    }

    Ok((paragraphs, cells))
}

/// Appends to the innermost open paragraph; text outside any paragraph is dropped
fn push_to_open(open_paragraphs: &mut [String], text: &str) {
    if let Some(paragraph) = open_paragraphs.last_mut() {
        paragraph.push_str(text);
    }
}
