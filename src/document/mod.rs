//! Text extraction from local documents.
//!
//! [`read`] never fails: every outcome, including a missing file or an
//! extraction error, is rendered as text for the agent to observe.

mod extract;

use std::path::Path;
use tracing::debug;

/// Hard cap on the number of characters handed back to the agent.
pub const MAX_CHARS: usize = 30_000;

/// Returned when a file exists but yields no text.
pub const EMPTY_CONTENT_WARNING: &str = "Warning: the file is empty, or no text could be extracted from it (it may be a scanned image PDF).";

/// Errors raised while extracting text from a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid PDF: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("invalid DOCX archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("invalid DOCX content: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("text is neither valid UTF-8 nor GBK")]
    Undecodable,
}

/// Supported document formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    /// Anything else is read as plain text.
    Text,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("pdf") => DocumentFormat::Pdf,
            Some("docx") => DocumentFormat::Docx,
            _ => DocumentFormat::Text,
        }
    }
}

/// Removes whitespace and quote characters around a pasted path.
pub fn clean_path(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim_matches('\'')
}

/// Extracts the raw text of a document, dispatching on its extension.
pub fn extract(path: &Path) -> Result<String, DocumentError> {
    if !path.is_file() {
        return Err(DocumentError::FileNotFound(path.display().to_string()));
    }

    let format = DocumentFormat::from_path(path);
    debug!(path = %path.display(), ?format, "Extracting document text");
    match format {
        DocumentFormat::Pdf => extract::pdf(path),
        DocumentFormat::Docx => extract::docx(path),
        DocumentFormat::Text => extract::text(path),
    }
}

/// Reads a document for the agent.
///
/// Missing files and extraction failures come back as `Error: ...` text,
/// content without any visible characters as [`EMPTY_CONTENT_WARNING`], and
/// content over [`MAX_CHARS`] characters is cut with a notice stating the
/// original length.
pub fn read(raw_path: &str) -> String {
    try_read(raw_path).unwrap_or_else(|message| message)
}

/// Like [`read`], but keeps failures and empty content apart from text.
pub fn try_read(raw_path: &str) -> Result<String, String> {
    let path = Path::new(clean_path(raw_path));

    let content = match extract(path) {
        Ok(content) => content,
        Err(err @ DocumentError::FileNotFound(_)) => return Err(format!("Error: {}", err)),
        Err(err) => return Err(format!("Error reading file: {}", err)),
    };

    if content.trim().is_empty() {
        return Err(EMPTY_CONTENT_WARNING.to_string());
    }

    let length = content.chars().count();
    if length > MAX_CHARS {
        let head: String = content.chars().take(MAX_CHARS).collect();
        return Ok(format!(
            "File is too long ({} characters); returning only the first {} characters:\n{}...",
            length, MAX_CHARS, head
        ));
    }

    Ok(content)
}
