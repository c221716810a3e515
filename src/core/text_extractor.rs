use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::errors::CoreError;
use super::models::{UploadedFile, PDF_MIME, TEXT_MIME};

static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*(?:\n[ \t]*){2,}").unwrap());
static TRAILING_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+\n").unwrap());

const UTF8_BOM: &str = "\u{feff}";

/// Turns an uploaded résumé into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, file: &UploadedFile) -> Result<String, CoreError>;
}

/// Dispatches on MIME type: `pdf-extract` for PDFs, strict UTF-8 for plain text.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentTextExtractor;

impl DocumentTextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Parses on the blocking pool. A `pdf-extract` panic is reported as an extraction error
    /// for this file only.
    async fn extract_pdf_text(&self, file: &UploadedFile) -> Result<String, CoreError> {
        let bytes = file.bytes.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|err| err.to_string())
        })
        .await
        .map_err(|err| CoreError::TextExtraction {
            file_name: file.file_name.clone(),
            reason: format!("PDF parser aborted: {err}"),
        })?;

        let text = extracted.map_err(|reason| CoreError::TextExtraction {
            file_name: file.file_name.clone(),
            reason,
        })?;

        if text.trim().is_empty() {
            return Err(CoreError::TextExtraction {
                file_name: file.file_name.clone(),
                reason: "PDF contains no extractable text".to_string(),
            });
        }

        Ok(normalize_whitespace(&text))
    }

    fn extract_plain_text(&self, file: &UploadedFile) -> Result<String, CoreError> {
        let text = std::str::from_utf8(&file.bytes).map_err(|err| CoreError::TextExtraction {
            file_name: file.file_name.clone(),
            reason: format!("file is not valid UTF-8: {err}"),
        })?;

        Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text).to_string())
    }
}

#[async_trait]
impl TextExtractor for DocumentTextExtractor {
    async fn extract_text(&self, file: &UploadedFile) -> Result<String, CoreError> {
        match file.mime_type.as_str() {
            PDF_MIME => self.extract_pdf_text(file).await,
            TEXT_MIME => self.extract_plain_text(file),
            other => Err(CoreError::UnsupportedFileType {
                file_name: file.file_name.clone(),
                mime_type: other.to_string(),
            }),
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    let text = TRAILING_SPACE_RE.replace_all(text, "\n");
    BLANK_RUN_RE.replace_all(&text, "\n\n").trim().to_string()
}


#[cfg(test)]
mod tests {
    use super::fixtures::pdf_without_resources;
    use super::*;
    use crate::core::models::DOCX_MIME;

    #[tokio::test]
    async fn plain_text_is_returned_verbatim_without_bom() {
        let file = UploadedFile::new(
            "resume.txt",
            TEXT_MIME,
            "\u{feff}Priya Sharma\nNEBOSH IGC".as_bytes().to_vec(),
        );

        let text = DocumentTextExtractor::new().extract_text(&file).await.unwrap();
        assert_eq!(text, "Priya Sharma\nNEBOSH IGC");
    }

    #[tokio::test]
    async fn invalid_utf8_fails_extraction() {
        let file = UploadedFile::new("resume.txt", TEXT_MIME, vec![0xff, 0xfe, 0x00, 0xc3]);

        let err = DocumentTextExtractor::new()
            .extract_text(&file)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::TextExtraction { .. }));
    }

    #[tokio::test]
    async fn malformed_pdf_fails_extraction() {
        let file = UploadedFile::new("resume.pdf", PDF_MIME, b"not really a pdf".to_vec());

        let err = DocumentTextExtractor::new()
            .extract_text(&file)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::TextExtraction { ref file_name, .. } if file_name == "resume.pdf"));
    }

    #[tokio::test]
    async fn pdf_without_page_resources_fails_without_panicking() {
        let file = UploadedFile::new("no-resources.pdf", PDF_MIME, pdf_without_resources());

        let err = DocumentTextExtractor::new()
            .extract_text(&file)
            .await
            .unwrap_err();
        assert!(
            matches!(err, CoreError::TextExtraction { ref file_name, .. } if file_name == "no-resources.pdf")
        );
    }

    #[tokio::test]
    async fn other_mime_types_are_unsupported() {
        let file = UploadedFile::new("resume.docx", DOCX_MIME, vec![1, 2, 3]);

        let err = DocumentTextExtractor::new()
            .extract_text(&file)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedFileType { .. }));
    }

    #[test]
    fn normalize_whitespace_collapses_blank_runs() {
        assert_eq!(
            normalize_whitespace("Name  \n\n\n\nSkills\t\nRail"),
            "Name\n\nSkills\nRail"
        );
    }
}
