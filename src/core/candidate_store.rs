use tokio::sync::RwLock;

use super::models::{CandidateResult, ScreeningStats};

pub const HIGH_SCORE_THRESHOLD: u8 = 80;

/// Session-lifetime collection of completed candidates, newest batch first.
///
/// Records are never edited or removed; each batch is prepended as a whole.
#[derive(Default)]
pub struct CandidateStore {
    candidates: RwLock<Vec<CandidateResult>>,
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn prepend(&self, batch: Vec<CandidateResult>) {
        if batch.is_empty() {
            return;
        }

        let mut candidates = self.candidates.write().await;
        let previous = std::mem::take(&mut *candidates);
        *candidates = batch;
        candidates.extend(previous);
    }

    pub async fn all(&self) -> Vec<CandidateResult> {
        self.candidates.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<CandidateResult> {
        self.candidates
            .read()
            .await
            .iter()
            .find(|candidate| candidate.id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.candidates.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.candidates.read().await.is_empty()
    }

    pub async fn high_score_count(&self) -> usize {
        self.candidates
            .read()
            .await
            .iter()
            .filter(|candidate| candidate.match_score >= HIGH_SCORE_THRESHOLD)
            .count()
    }

    pub async fn average_experience(&self) -> f64 {
        average_experience(&self.candidates.read().await)
    }

    /// `"0"` for an empty store, otherwise the mean with one decimal place.
    pub async fn average_experience_label(&self) -> String {
        average_experience_label(&self.candidates.read().await)
    }

    pub async fn stats(&self) -> ScreeningStats {
        let candidates = self.candidates.read().await;
        ScreeningStats {
            total: candidates.len(),
            high_score: candidates
                .iter()
                .filter(|candidate| candidate.match_score >= HIGH_SCORE_THRESHOLD)
                .count(),
            average_experience: average_experience_label(&candidates),
        }
    }
}

fn average_experience(candidates: &[CandidateResult]) -> f64 {
    if candidates.is_empty() {
        return 0.0;
    }

    let total: f64 = candidates
        .iter()
        .map(|candidate| candidate.extraction.years_of_experience)
        .sum();
    total / candidates.len() as f64
}

fn average_experience_label(candidates: &[CandidateResult]) -> String {
    if candidates.is_empty() {
        return "0".to_string();
    }

    format!("{:.1}", average_experience(candidates))
}
