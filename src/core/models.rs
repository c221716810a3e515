use std::fmt;
use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PDF_MIME: &str = "application/pdf";
pub const TEXT_MIME: &str = "text/plain";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const OCTET_STREAM_MIME: &str = "application/octet-stream";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
pub const MIN_RETRY_DELAY_SECONDS: f64 = 0.1;
pub const MAX_RETRY_DELAY_SECONDS: f64 = 60.0;
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Hiring criteria every résumé in the session is screened against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRequirements {
    pub min_experience: u32,
    pub required_skills: Vec<String>,
    pub certifications: CertificationRequirements,
    pub nature_of_experience: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationRequirements {
    pub nebosh: bool,
    pub level6: bool,
    pub adosh: bool,
}

impl Default for JobRequirements {
    fn default() -> Self {
        Self {
            min_experience: 5,
            required_skills: [
                "Safety Management",
                "Risk Assessment",
                "HSE Auditing",
                "Site Supervision",
            ]
            .iter()
            .map(|v| v.to_string())
            .collect(),
            certifications: CertificationRequirements {
                nebosh: true,
                level6: true,
                adosh: true,
            },
            nature_of_experience: [
                "Rail",
                "Infrastructure",
                "Bridges",
                "Villa",
                "Building",
                "Offshore",
                "Onshore",
                "Facility Management",
            ]
            .iter()
            .map(|v| v.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HseDesignation {
    #[serde(rename = "HSE/Safety Manager")]
    Manager,
    #[serde(rename = "HSE/Safety Engineer")]
    Engineer,
    #[serde(rename = "HSE/Safety Officer")]
    Officer,
    #[serde(rename = "HSE/Safety Inspector")]
    Inspector,
    /// Only assigned by manual review; the designation calculator never returns it.
    #[serde(rename = "Not Qualified")]
    NotQualified,
}

impl HseDesignation {
    pub const ALL: [HseDesignation; 5] = [
        HseDesignation::Manager,
        HseDesignation::Engineer,
        HseDesignation::Officer,
        HseDesignation::Inspector,
        HseDesignation::NotQualified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HseDesignation::Manager => "HSE/Safety Manager",
            HseDesignation::Engineer => "HSE/Safety Engineer",
            HseDesignation::Officer => "HSE/Safety Officer",
            HseDesignation::Inspector => "HSE/Safety Inspector",
            HseDesignation::NotQualified => "Not Qualified",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|designation| designation.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for HseDesignation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Highly Recommended")]
    HighlyRecommended,
    #[serde(rename = "Recommended")]
    Recommended,
    #[serde(rename = "Review Required")]
    ReviewRequired,
    #[serde(rename = "Not Suitable")]
    NotSuitable,
}

impl Recommendation {
    pub const ALL: [Recommendation; 4] = [
        Recommendation::HighlyRecommended,
        Recommendation::Recommended,
        Recommendation::ReviewRequired,
        Recommendation::NotSuitable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::HighlyRecommended => "Highly Recommended",
            Recommendation::Recommended => "Recommended",
            Recommendation::ReviewRequired => "Review Required",
            Recommendation::NotSuitable => "Not Suitable",
        }
    }

    /// Case-insensitive match against the fixed vocabulary.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|recommendation| recommendation.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub technical_skills: Vec<String>,
    pub years_of_experience: f64,
    pub highest_degree: String,
    pub has_nebosh: bool,
    /// Also covers NVQ/OTHM Level 6 and the NEBOSH International Diploma.
    pub has_level6: bool,
    pub has_adosh: bool,
    pub nature_of_experience_found: Vec<String>,
    pub summary: String,
    pub recommendation: Recommendation,
    pub key_strengths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    #[serde(flatten)]
    pub extraction: ExtractionResult,
    pub id: String,
    pub file_name: String,
    pub match_score: u8,
    pub designation: HseDesignation,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub status: CandidateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CandidateResult {
    pub fn completed(
        extraction: ExtractionResult,
        file_name: String,
        match_score: u8,
        designation: HseDesignation,
    ) -> Self {
        Self {
            extraction,
            id: Uuid::new_v4().to_string(),
            file_name,
            match_score,
            designation,
            timestamp: Utc::now().timestamp_millis(),
            status: CandidateStatus::Completed,
            error: None,
        }
    }
}

/// A résumé handed to the batch processor, as picked or dropped by the user.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            mime_type: mime_type_for_path(path).to_string(),
            file_name,
            bytes,
        })
    }

    pub fn is_screenable(&self) -> bool {
        is_screenable_mime(&self.mime_type)
    }
}

pub fn is_screenable_mime(mime_type: &str) -> bool {
    mime_type == PDF_MIME || mime_type == TEXT_MIME
}

pub fn mime_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|v| v.to_str())
        .map(|v| v.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => PDF_MIME,
        "txt" => TEXT_MIME,
        "docx" => DOCX_MIME,
        _ => OCTET_STREAM_MIME,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    pub is_processing: bool,
    pub progress: u8,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub added_ids: Vec<String>,
    pub attempted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningStats {
    pub total: usize,
    pub high_score: usize,
    pub average_experience: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub max_retries: usize,
    pub retry_delay_seconds: f64,
    pub request_timeout_seconds: Option<u64>,
    pub job_requirements: JobRequirements,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            max_retries: 3,
            retry_delay_seconds: 1.0,
            request_timeout_seconds: None,
            job_requirements: JobRequirements::default(),
        }
    }
}

impl RuntimeSettings {
    pub fn sanitized(mut self) -> Self {
        if self.gemini_model.trim().is_empty() {
            self.gemini_model = DEFAULT_GEMINI_MODEL.to_string();
        }
        if self.gemini_base_url.trim().is_empty() {
            self.gemini_base_url = DEFAULT_GEMINI_BASE_URL.to_string();
        }
        self.gemini_base_url = self.gemini_base_url.trim_end_matches('/').to_string();
        self.max_retries = self.max_retries.max(1);
        self.retry_delay_seconds = self
            .retry_delay_seconds
            .min(MAX_RETRY_DELAY_SECONDS)
            .max(MIN_RETRY_DELAY_SECONDS);
        self.request_timeout_seconds = self.request_timeout_seconds.filter(|secs| *secs > 0);
        self
    }

    pub fn to_view(&self, api_key_configured: bool) -> RuntimeSettingsView {
        RuntimeSettingsView {
            gemini_model: self.gemini_model.clone(),
            gemini_base_url: self.gemini_base_url.clone(),
            max_retries: self.max_retries,
            retry_delay_seconds: self.retry_delay_seconds,
            request_timeout_seconds: self.request_timeout_seconds,
            job_requirements: self.job_requirements.clone(),
            api_key_configured,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettingsView {
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub max_retries: usize,
    pub retry_delay_seconds: f64,
    pub request_timeout_seconds: Option<u64>,
    pub job_requirements: JobRequirements,
    pub api_key_configured: bool,
}
