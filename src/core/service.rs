use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::candidate_store::CandidateStore;
use super::errors::{CoreError, NO_ELIGIBLE_FILES_MESSAGE};
use super::extraction_client::ExtractionClient;
use super::gemini::GeminiExtractionClient;
use super::models::{
    BatchOutcome, BatchStatus, CandidateResult, JobRequirements, RuntimeSettings, ScreeningStats,
    UploadedFile,
};
use super::scoring::{designation, match_score};
use super::text_extractor::{DocumentTextExtractor, TextExtractor};

/// Runs screening batches and owns the session's candidate store.
///
/// Only one batch may run at a time; a second `process_files` call while one is in flight is
/// rejected with [`CoreError::BatchInProgress`].
pub struct ScreeningService {
    job_requirements: Arc<JobRequirements>,
    text_extractor: Arc<dyn TextExtractor>,
    extraction_client: Arc<dyn ExtractionClient>,
    store: Arc<CandidateStore>,
    status_tx: watch::Sender<BatchStatus>,
    busy: AtomicBool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ScreeningService {
    pub fn new(
        job_requirements: Arc<JobRequirements>,
        text_extractor: Arc<dyn TextExtractor>,
        extraction_client: Arc<dyn ExtractionClient>,
    ) -> Self {
        let (status_tx, _) = watch::channel(BatchStatus::default());
        Self {
            job_requirements,
            text_extractor,
            extraction_client,
            store: Arc::new(CandidateStore::new()),
            status_tx,
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_gemini(settings: &RuntimeSettings, api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("TgcHseScreening/1.0")
            .build()
            .context("failed to build HTTP client")?;

        let gemini = GeminiExtractionClient::new(client, api_key, settings);
        Ok(Self::new(
            Arc::new(settings.job_requirements.clone()),
            Arc::new(DocumentTextExtractor::new()),
            Arc::new(gemini),
        ))
    }

    pub fn job_requirements(&self) -> &JobRequirements {
        &self.job_requirements
    }

    pub fn store(&self) -> &Arc<CandidateStore> {
        &self.store
    }

    pub async fn candidates(&self) -> Vec<CandidateResult> {
        self.store.all().await
    }

    pub async fn stats(&self) -> ScreeningStats {
        self.store.stats().await
    }

    pub fn status(&self) -> BatchStatus {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchStatus> {
        self.status_tx.subscribe()
    }

    /// Screens `files` one at a time and prepends every success to the store as one batch.
    ///
    /// Files that fail extraction or screening are dropped from the batch and only logged.
    pub async fn process_files(&self, files: Vec<UploadedFile>) -> Result<BatchOutcome, CoreError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CoreError::BatchInProgress);
        }
        let _guard = BusyGuard(&self.busy);

        self.publish(true, 0, None);

        let submitted = files.len();
        let eligible: Vec<UploadedFile> = files
            .into_iter()
            .filter(UploadedFile::is_screenable)
            .collect();

        if eligible.is_empty() {
            warn!(submitted, "no PDF or TXT files in upload");
            self.publish(false, 0, Some(NO_ELIGIBLE_FILES_MESSAGE.to_string()));
            return Err(CoreError::NoEligibleFiles);
        }

        let total = eligible.len();
        info!(total, skipped = submitted - total, "screening batch started");

        let mut batch: Vec<CandidateResult> = Vec::with_capacity(total);
        let mut failed = 0_usize;

        for (index, file) in eligible.iter().enumerate() {
            match self.screen_file(file).await {
                Ok(candidate) => {
                    debug!(
                        file_name = %file.file_name,
                        score = candidate.match_score,
                        designation = %candidate.designation,
                        "candidate screened"
                    );
                    batch.push(candidate);
                }
                Err(err) => {
                    failed += 1;
                    warn!(file_name = %file.file_name, error = %err, "processing failed, file skipped");
                }
            }

            self.publish(true, progress_percent(index + 1, total), None);
        }

        let added_ids: Vec<String> = batch.iter().map(|c| c.id.clone()).collect();
        self.store.prepend(batch).await;
        self.publish(false, 100, None);

        info!(
            attempted = total,
            added = added_ids.len(),
            failed,
            "screening batch finished"
        );

        Ok(BatchOutcome {
            added_ids,
            attempted: total,
            failed,
        })
    }

    async fn screen_file(&self, file: &UploadedFile) -> Result<CandidateResult, CoreError> {
        let text = self.text_extractor.extract_text(file).await?;
        let extraction = self
            .extraction_client
            .screen_resume(&text, &self.job_requirements)
            .await?;

        let score = match_score(&extraction);
        let tier = designation(extraction.years_of_experience);
        Ok(CandidateResult::completed(
            extraction,
            file.file_name.clone(),
            score,
            tier,
        ))
    }

    fn publish(&self, is_processing: bool, progress: u8, error_message: Option<String>) {
        self.status_tx.send_replace(BatchStatus {
            is_processing,
            progress,
            error_message,
        });
    }
}

fn progress_percent(attempted: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }

    ((attempted as f64) * 100.0 / total as f64).round().min(100.0) as u8
}
