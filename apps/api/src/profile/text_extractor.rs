//! CV document → plain text. PDF, DOCX and plain text, detected by file
//! extension first and magic bytes second.

use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, Run, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};
use pdf_extract::extract_text_from_mem;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unable to extract text from the PDF document: {0}")]
    Pdf(String),

    #[error("Unable to read the DOCX document: {0}")]
    Docx(String),

    #[error("Unsupported document format '{0}'. Provide a PDF, DOCX or plain text file.")]
    Unsupported(String),

    #[error("The document contains no extractable text")]
    Empty,
}

/// Extracted text plus non-fatal decoding warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

fn detect_format(data: &[u8], file_name: Option<&str>) -> Result<DocumentFormat, ExtractionError> {
    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => return Ok(DocumentFormat::Pdf),
        Some("docx") => return Ok(DocumentFormat::Docx),
        Some("txt") | Some("text") | Some("md") => return Ok(DocumentFormat::PlainText),
        _ => {}
    }

    if looks_like_pdf(data) {
        Ok(DocumentFormat::Pdf)
    } else if looks_like_docx(data) {
        Ok(DocumentFormat::Docx)
    } else if std::str::from_utf8(data).is_ok() {
        Ok(DocumentFormat::PlainText)
    } else {
        Err(ExtractionError::Unsupported(
            extension.unwrap_or_else(|| "unknown".to_string()),
        ))
    }
}

/// Converts an uploaded CV into normalized plain text.
///
/// CPU-bound for PDF and DOCX; async callers should run it on a blocking thread.
pub fn extract_text(data: &[u8], file_name: Option<&str>) -> Result<ExtractedText, ExtractionError> {
    let format = detect_format(data, file_name)?;
    let mut warnings = Vec::new();

    let raw = match format {
        DocumentFormat::Pdf => extract_pdf_text(data)?,
        DocumentFormat::Docx => extract_docx_text(data)?,
        DocumentFormat::PlainText => decode_text_bytes(data, &mut warnings),
    };

    let text = normalize_document_text(&raw);
    if text.is_empty() {
        return Err(ExtractionError::Empty);
    }
    debug!(?format, chars = text.len(), "Extracted CV text");
    Ok(ExtractedText { text, warnings })
}

fn extract_pdf_text(data: &[u8]) -> Result<String, ExtractionError> {
    extract_text_from_mem(data)
        .map(|text| text.trim().to_string())
        .map_err(|err| ExtractionError::Pdf(err.to_string()))
}

fn extract_docx_text(data: &[u8]) -> Result<String, ExtractionError> {
    let package = read_docx(data).map_err(|err| ExtractionError::Docx(err.to_string()))?;
    let mut lines = Vec::new();
    for child in &package.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => push_paragraph(paragraph, &mut lines),
            DocumentChild::Table(table) => push_table(table, &mut lines),
            _ => {}
        }
    }
    Ok(lines.join("\n"))
}

fn push_paragraph(paragraph: &Paragraph, lines: &mut Vec<String>) {
    let mut buffer = String::new();
    for child in &paragraph.children {
        append_paragraph_child(child, &mut buffer);
    }
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        lines.push(trimmed.to_string());
    }
}

fn append_paragraph_child(child: &ParagraphChild, buffer: &mut String) {
    match child {
        ParagraphChild::Run(run) => append_run(run, buffer),
        ParagraphChild::Hyperlink(link) => {
            for inner in &link.children {
                append_paragraph_child(inner, buffer);
            }
        }
        _ => {}
    }
}

fn append_run(run: &Run, buffer: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(text) => buffer.push_str(&text.text),
            RunChild::Tab(_) => buffer.push('\t'),
            RunChild::Break(_) => buffer.push('\n'),
            _ => {}
        }
    }
}

// Each table cell becomes its own line so CV layouts built from tables keep their rows.
#[allow(irrefutable_let_patterns)]
fn push_table(table: &Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row else {
            continue;
        };
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell else {
                continue;
            };
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(paragraph) => push_paragraph(paragraph, lines),
                    TableCellContent::Table(inner) => push_table(inner, lines),
                    _ => {}
                }
            }
        }
    }
}

fn decode_text_bytes(data: &[u8], warnings: &mut Vec<String>) -> String {
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => {
            warnings.push(
                "The document contained invalid UTF-8 characters. Some characters were replaced during decoding.".into(),
            );
            String::from_utf8_lossy(data).into_owned()
        }
    }
}

fn normalize_document_text(text: &str) -> String {
    let normalized = text
        .replace('\u{0000}', "")
        .trim_start_matches('\u{FEFF}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let lines: Vec<&str> = normalized.lines().map(str::trim_end).collect();
    lines.join("\n").trim().to_string()
}

fn looks_like_pdf(data: &[u8]) -> bool {
    data.starts_with(b"%PDF-")
}

fn looks_like_docx(data: &[u8]) -> bool {
    data.len() > 4 && data.starts_with(b"PK")
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const PLAIN_CV: &str = "\u{FEFF}Jane Doe\r\nEDUCATION\r\nMaster in Computer Science   \r\n";

    fn make_docx(paragraphs: &[&str]) -> Vec<u8> {
        let mut docx = docx_rs::Docx::new();
        for text in paragraphs {
            docx = docx.add_paragraph(
                docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*text)),
            );
        }
        let mut cursor = Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_plain_text_is_normalized() {
        let out = extract_text(PLAIN_CV.as_bytes(), Some("cv.txt")).unwrap();
        assert_eq!(out.text, "Jane Doe\nEDUCATION\nMaster in Computer Science");
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_invalid_utf8_decoded_with_warning() {
        let mut bytes = b"Skills: Python ".to_vec();
        bytes.push(0xFF);
        let out = extract_text(&bytes, Some("cv.txt")).unwrap();
        assert!(out.text.starts_with("Skills: Python"));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_format_sniffed_without_file_name() {
        assert_eq!(detect_format(b"%PDF-1.7 ...", None).unwrap(), DocumentFormat::Pdf);
        assert_eq!(detect_format(b"PK\x03\x04rest", None).unwrap(), DocumentFormat::Docx);
        assert_eq!(detect_format(b"hello", None).unwrap(), DocumentFormat::PlainText);
    }

    #[test]
    fn test_binary_with_unknown_extension_unsupported() {
        let err = extract_text(&[0x89, 0x50, 0x4E, 0x47, 0xFF, 0x00], Some("photo.png")).unwrap_err();
        assert!(matches!(err, ExtractionError::Unsupported(ext) if ext == "png"));
    }

    #[test]
    fn test_whitespace_only_document_is_empty() {
        let err = extract_text(b"  \r\n \n", Some("cv.txt")).unwrap_err();
        assert!(matches!(err, ExtractionError::Empty));
    }

    #[test]
    fn test_corrupt_pdf_is_an_error() {
        let err = extract_text(b"%PDF-1.4 not really a pdf", Some("cv.pdf")).unwrap_err();
        assert!(matches!(err, ExtractionError::Pdf(_)));
    }

    #[test]
    fn test_docx_paragraphs_become_lines() {
        let bytes = make_docx(&["Skills", "Python, SQL"]);
        let out = extract_text(&bytes, Some("cv.docx")).unwrap();
        assert_eq!(out.text, "Skills\nPython, SQL");
    }
}
