use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tgc_hse_screening_lib::core::models::{CandidateResult, UploadedFile};
use tgc_hse_screening_lib::core::response_parser::parse_extraction;
use tgc_hse_screening_lib::core::scoring::{designation, match_score};
use tgc_hse_screening_lib::core::text_extractor::{DocumentTextExtractor, TextExtractor};

/// Offline harness: dumps extracted resume text, or scores a saved model response
/// without calling Gemini.
#[derive(Debug, Parser)]
struct Args {
    /// PDF or TXT resume to extract.
    resume: PathBuf,

    /// Saved Gemini JSON response for this resume; when given, prints the scored record.
    #[arg(long)]
    response: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let file = UploadedFile::from_path(&args.resume).await?;
    let text = DocumentTextExtractor::new().extract_text(&file).await?;

    let Some(response_path) = args.response else {
        println!("{text}");
        return Ok(());
    };

    let raw = tokio::fs::read_to_string(&response_path)
        .await
        .with_context(|| format!("failed to read {}", response_path.display()))?;
    let extraction = parse_extraction(&raw)?;
    let score = match_score(&extraction);
    let tier = designation(extraction.years_of_experience);
    let candidate = CandidateResult::completed(extraction, file.file_name, score, tier);

    eprintln!("extracted {} characters", text.chars().count());
    println!("{}", serde_json::to_string_pretty(&candidate)?);
    Ok(())
}
