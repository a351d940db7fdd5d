//! Resume upload handling: file validation and PDF text extraction.

pub mod analyzer;

use std::path::Path;

use thiserror::Error;
use tracing::info;

/// 5 MB upload ceiling, matching the platform's limit.
const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

const VALID_EXTENSIONS: &[&str] = &["pdf", "docx"];

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("No file selected")]
    Missing,

    #[error("File size exceeds maximum limit of 5MB. Current size: {0}")]
    TooLarge(String),

    #[error("Invalid file type. Please upload a PDF or DOCX file.")]
    InvalidType,

    #[error("Failed to extract text: {0}")]
    Extraction(String),

    #[error("No text could be extracted from the file")]
    Empty,
}

/// Validates a resume file before it is read: it must exist, stay under the
/// size ceiling, and carry a supported extension.
pub fn validate_resume_file(path: &Path) -> Result<(), ResumeError> {
    let metadata = std::fs::metadata(path).map_err(|_| ResumeError::Missing)?;
    if metadata.len() > MAX_FILE_BYTES {
        return Err(ResumeError::TooLarge(readable_size(metadata.len())));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some(ext) if VALID_EXTENSIONS.contains(&ext) => Ok(()),
        _ => Err(ResumeError::InvalidType),
    }
}

/// Extracts text from a PDF resume and collapses the layout whitespace the
/// extractor leaves behind. An empty extraction is an error, not a success
/// with an empty string, so the analyzer never scores a blank document.
pub fn extract_text(path: &Path) -> Result<String, ResumeError> {
    validate_resume_file(path)?;
    let raw =
        pdf_extract::extract_text(path).map_err(|e| ResumeError::Extraction(e.to_string()))?;
    let text = normalize_whitespace(&raw);
    if text.is_empty() {
        return Err(ResumeError::Empty);
    }
    info!(chars = text.len(), "extracted resume text");
    Ok(text)
}

/// Collapses runs of spaces and keeps at most one blank line between blocks.
fn normalize_whitespace(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = true;
    for line in raw.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if !previous_blank {
                lines.push(String::new());
                previous_blank = true;
            }
        } else {
            lines.push(collapsed);
            previous_blank = false;
        }
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines.join("\n")
}

/// Formats a byte count with appropriate units for error messages.
pub fn readable_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let exponent = (bytes as f64).log(1024.0).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    format!("{:.2} {}", value, UNITS[exponent])
}
