//! Document loading and text extraction.
//!
//! Parses a supported file (PDF, Word, plain text) into an ordered sequence
//! of text segments with page metadata. No side effects beyond reading the
//! input.

use crate::types::{Document, DocumentFormat, Segment};
use lexrag_core::config::MAX_FILE_SIZE_BYTES;
use lexrag_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Extensions accepted for ingestion.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "docx", "txt"];

/// Validate a file before ingestion: existence, format, size limit.
pub fn validate_file(path: &Path, declared: Option<DocumentFormat>) -> AppResult<u64> {
    let metadata = fs::metadata(path)?;

    resolve_format(path, declared)?;

    if metadata.len() > MAX_FILE_SIZE_BYTES {
        return Err(AppError::Parse {
            file: display_name(path),
            reason: format!(
                "file is {} bytes, exceeding the {} byte ingest limit",
                metadata.len(),
                MAX_FILE_SIZE_BYTES
            ),
        });
    }

    Ok(metadata.len())
}

/// Resolve the document format from a declared tag or the file extension.
pub fn resolve_format(path: &Path, declared: Option<DocumentFormat>) -> AppResult<DocumentFormat> {
    if let Some(format) = declared {
        return Ok(format);
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    DocumentFormat::from_extension(ext).ok_or_else(|| {
        AppError::UnsupportedFormat(format!(
            "'{}' (supported: {})",
            ext,
            SUPPORTED_EXTENSIONS.join(", ")
        ))
    })
}

/// Load a document from a file, extracting text segments with page metadata.
pub fn load_document(
    path: &Path,
    declared: Option<DocumentFormat>,
    batch_id: &str,
) -> AppResult<Document> {
    let format = resolve_format(path, declared)?;
    let source_id = display_name(path);

    tracing::debug!("Loading {:?} as {}", path, format.as_str());

    let segments = match format {
        DocumentFormat::Pdf => load_pdf(path)?,
        DocumentFormat::Docx => load_docx(path)?,
        DocumentFormat::PlainText => load_text(path)?,
    };

    if segments.iter().all(|s| s.text.trim().is_empty()) {
        return Err(AppError::EmptyDocument(source_id));
    }

    let content_hash = hash_segments(&segments);

    tracing::info!(
        "Loaded {} segments from {} (hash {})",
        segments.len(),
        source_id,
        &content_hash[..12]
    );

    Ok(Document {
        source_id,
        batch_id: batch_id.to_string(),
        content_hash,
        segments,
    })
}

/// Extract text from a PDF.
///
/// Page-by-page text positions are not reliably recoverable from the
/// extraction library, so the whole body is treated as a single segment;
/// the page count from the PDF catalog is logged for diagnostics.
fn load_pdf(path: &Path) -> AppResult<Vec<Segment>> {
    let content = pdf_extract::extract_text(path).map_err(|e| AppError::Parse {
        file: display_name(path),
        reason: format!("PDF text extraction failed: {}", e),
    })?;

    let content = clean_extracted_text(&content);

    if content.trim().is_empty() {
        return Err(AppError::Parse {
            file: display_name(path),
            reason: "no text content could be extracted; PDF may be image-based".to_string(),
        });
    }

    if let Ok(doc) = lopdf::Document::load(path) {
        tracing::debug!("PDF {:?} has {} pages", path, doc.get_pages().len());
    }

    Ok(segment_pages(&content))
}

/// Extract paragraph text from a Word document.
fn load_docx(path: &Path) -> AppResult<Vec<Segment>> {
    let data = fs::read(path)?;

    let doc = docx_rs::read_docx(&data).map_err(|e| AppError::Parse {
        file: display_name(path),
        reason: format!("DOCX parsing failed: {}", e),
    })?;

    let mut content = String::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            for child in p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            content.push_str(&t.text);
                        }
                    }
                }
            }
            content.push('\n');
        }
    }

    Ok(segment_pages(&content))
}

/// Read a plain-text file, tolerating non-UTF-8 bytes.
fn load_text(path: &Path) -> AppResult<Vec<Segment>> {
    let data = fs::read(path)?;
    let content = String::from_utf8_lossy(&data).to_string();
    Ok(segment_pages(&content))
}

/// Split extracted text into page segments on form-feed characters.
///
/// Text without form feeds becomes a single page-1 segment.
fn segment_pages(content: &str) -> Vec<Segment> {
    content
        .split('\u{0c}')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| Segment {
            text: page.to_string(),
            page_number: i as u32 + 1,
        })
        .collect()
}

/// Strip null bytes and collapse blank lines left behind by PDF extraction.
fn clean_extracted_text(content: &str) -> String {
    content
        .replace('\0', "")
        .lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// SHA-256 over all segment text.
fn hash_segments(segments: &[Segment]) -> String {
    let mut hasher = Sha256::new();
    for segment in segments {
        hasher.update(segment.text.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolve_format_from_extension() {
        let format = resolve_format(Path::new("contract.PDF"), None).unwrap();
        assert_eq!(format, DocumentFormat::Pdf);
    }

    #[test]
    fn test_resolve_format_declared_wins() {
        let format =
            resolve_format(Path::new("upload.bin"), Some(DocumentFormat::PlainText)).unwrap();
        assert_eq!(format, DocumentFormat::PlainText);
    }

    #[test]
    fn test_resolve_format_unsupported() {
        let result = resolve_format(Path::new("malware.exe"), None);
        assert!(matches!(result, Err(AppError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_load_text_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "Section 302 of the Penal Code.").unwrap();

        let doc = load_document(file.path(), None, "batch-1").unwrap();
        assert_eq!(doc.segments.len(), 1);
        assert_eq!(doc.segments[0].page_number, 1);
        assert!(doc.segments[0].text.contains("Section 302"));
        assert_eq!(doc.content_hash.len(), 64);
    }

    #[test]
    fn test_load_text_with_page_breaks() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "Page one.\u{0c}Page two.\u{0c}Page three.").unwrap();

        let doc = load_document(file.path(), None, "batch-1").unwrap();
        assert_eq!(doc.segments.len(), 3);
        assert_eq!(doc.segments[0].page_number, 1);
        assert_eq!(doc.segments[2].page_number, 3);
        assert_eq!(doc.segments[2].text, "Page three.");
    }

    #[test]
    fn test_empty_document_rejected() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "   \n\n  ").unwrap();

        let result = load_document(file.path(), None, "batch-1");
        assert!(matches!(result, Err(AppError::EmptyDocument(_))));
    }

    #[test]
    fn test_validate_missing_file() {
        let result = validate_file(Path::new("/nonexistent/file.txt"), None);
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn test_validate_returns_size() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "hello").unwrap();

        let size = validate_file(file.path(), None).unwrap();
        assert_eq!(size, 5);
    }

    #[test]
    fn test_validate_declared_format_overrides_extension() {
        let mut file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        write!(file, "plain text payload").unwrap();

        assert!(validate_file(file.path(), None).is_err());
        assert!(validate_file(file.path(), Some(DocumentFormat::PlainText)).is_ok());
    }

    #[test]
    fn test_segment_pages_skips_blank_pages() {
        let segments = segment_pages("one\u{0c}  \u{0c}three");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].page_number, 1);
        // Page numbering follows the original position, not the filtered list
        assert_eq!(segments[1].page_number, 3);
    }
}
