use async_trait::async_trait;

use super::errors::CoreError;
use super::models::{ExtractionResult, JobRequirements};

/// Structured-field extraction over raw résumé text.
///
/// Implementations must return a fully validated `ExtractionResult`; the batch processor
/// scores whatever comes back without further checks.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    async fn screen_resume(
        &self,
        resume_text: &str,
        job_requirements: &JobRequirements,
    ) -> Result<ExtractionResult, CoreError>;
}
