use thiserror::Error;

pub const NO_ELIGIBLE_FILES_MESSAGE: &str = "Please upload PDF or TXT files only.";

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Please upload PDF or TXT files only.")]
    NoEligibleFiles,
    #[error("A screening batch is already running.")]
    BatchInProgress,
    #[error("Unsupported file type for {file_name}: {mime_type}")]
    UnsupportedFileType { file_name: String, mime_type: String },
    #[error("Text extraction failed for {file_name}: {reason}")]
    TextExtraction { file_name: String, reason: String },
    #[error("Gemini API key is not configured. Run `set-api-key` or set GEMINI_API_KEY.")]
    MissingApiKey,
    #[error("Gemini API request failed with status {status}: {body}")]
    GeminiApi { status: u16, body: String },
    #[error("Gemini returned no text content")]
    EmptyModelResponse,
    #[error("Could not parse resume data. Ensure the document is a valid resume. ({0})")]
    ResponseShape(String),
    #[error("Unexpected value for {field}: {value}")]
    UnexpectedValue { field: &'static str, value: String },
}

impl CoreError {
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::GeminiApi { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
