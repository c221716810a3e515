use super::models::{ExtractionResult, HseDesignation};

const NEBOSH_POINTS: u32 = 20;
const LEVEL6_POINTS: u32 = 25;
const ADOSH_POINTS: u32 = 15;
const NATURE_POINTS_EACH: u32 = 5;
const NATURE_POINTS_CAP: u32 = 20;
const EXPERIENCE_POINTS: u32 = 20;
const EXPERIENCE_THRESHOLD_YEARS: f64 = 5.0;
const MAX_SCORE: u32 = 100;

/// Maps years of experience to a seniority tier, highest threshold first.
///
/// Negative and NaN inputs fall through to `Inspector`. `NotQualified` is never produced here.
pub fn designation(years: f64) -> HseDesignation {
    if years >= 15.0 {
        HseDesignation::Manager
    } else if years >= 10.0 {
        HseDesignation::Engineer
    } else if years >= 5.0 {
        HseDesignation::Officer
    } else {
        HseDesignation::Inspector
    }
}

/// Additive 0-100 fit score over certifications, matched experience categories and tenure.
pub fn match_score(extraction: &ExtractionResult) -> u8 {
    let mut score: u32 = 0;

    if extraction.has_nebosh {
        score += NEBOSH_POINTS;
    }
    if extraction.has_level6 {
        score += LEVEL6_POINTS;
    }
    if extraction.has_adosh {
        score += ADOSH_POINTS;
    }

    let nature_count = u32::try_from(extraction.nature_of_experience_found.len()).unwrap_or(u32::MAX);
    score += nature_count
        .saturating_mul(NATURE_POINTS_EACH)
        .min(NATURE_POINTS_CAP);

    if extraction.years_of_experience >= EXPERIENCE_THRESHOLD_YEARS {
        score += EXPERIENCE_POINTS;
    }

    score.min(MAX_SCORE) as u8
}
