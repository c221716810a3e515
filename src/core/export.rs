use std::path::Path;

use anyhow::Context;

use super::models::CandidateResult;

pub const DEFAULT_REPORT_FILE_NAME: &str = "TGC_HSE_Screening.csv";

const HEADER_COLUMNS: [&str; 6] = [
    "Name",
    "Email",
    "Designation",
    "Exp",
    "Score",
    "Recommendation",
];

fn candidate_row(candidate: &CandidateResult) -> [String; 6] {
    [
        candidate.extraction.full_name.clone(),
        candidate.extraction.email.clone(),
        candidate.designation.to_string(),
        candidate.extraction.years_of_experience.to_string(),
        candidate.match_score.to_string(),
        candidate.extraction.recommendation.to_string(),
    ]
}

pub fn write_report<W: std::io::Write>(
    writer: W,
    candidates: &[CandidateResult],
) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADER_COLUMNS)?;
    for candidate in candidates {
        csv_writer.write_record(candidate_row(candidate))?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_string(candidates: &[CandidateResult]) -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    write_report(&mut buffer, candidates)?;
    String::from_utf8(buffer).context("CSV report is not valid UTF-8")
}

pub async fn write_csv(path: &Path, candidates: &[CandidateResult]) -> anyhow::Result<()> {
    let content = to_csv_string(candidates)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("failed to write report {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ExtractionResult, HseDesignation, Recommendation};

    fn candidate(name: &str, years: f64, score: u8) -> CandidateResult {
        CandidateResult::completed(
            ExtractionResult {
                full_name: name.to_string(),
                email: "hse@example.com".to_string(),
                phone: String::new(),
                technical_skills: Vec::new(),
                years_of_experience: years,
                highest_degree: String::new(),
                has_nebosh: true,
                has_level6: true,
                has_adosh: true,
                nature_of_experience_found: Vec::new(),
                summary: String::new(),
                recommendation: Recommendation::HighlyRecommended,
                key_strengths: Vec::new(),
            },
            "cv.pdf".to_string(),
            score,
            HseDesignation::Manager,
        )
    }

    #[test]
    fn report_has_header_and_rows_in_store_order() {
        let csv = to_csv_string(&[candidate("Omar Farooq", 16.0, 80), candidate("Li Wei", 12.5, 60)])
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Name,Email,Designation,Exp,Score,Recommendation");
        assert_eq!(
            lines[1],
            "Omar Farooq,hse@example.com,HSE/Safety Manager,16,80,Highly Recommended"
        );
        assert!(lines[2].starts_with("Li Wei,"));
        assert!(lines[2].contains(",12.5,60,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn names_with_commas_are_quoted() {
        let csv = to_csv_string(&[candidate("Khan, Imran", 6.0, 40)]).unwrap();
        assert!(csv.lines().nth(1).unwrap().starts_with("\"Khan, Imran\","));
    }

    #[tokio::test]
    async fn write_csv_creates_parent_directories() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("reports").join(DEFAULT_REPORT_FILE_NAME);

        write_csv(&path, &[candidate("Anita Rao", 9.0, 55)]).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.starts_with("Name,Email"));
        assert!(written.contains("Anita Rao"));
    }
}
