use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use super::errors::CoreError;
use super::export::{write_csv, DEFAULT_REPORT_FILE_NAME};
use super::models::{
    is_screenable_mime, mime_type_for_path, BatchOutcome, CandidateResult, ScreeningStats, UploadedFile,
};
use super::secret_store::{mask_api_key, GeminiApiKeyStore};
use super::service::ScreeningService;
use super::settings_store::SettingsStore;

#[derive(Debug, Parser)]
#[command(name = "tgc-hse-screening", version, about = "Screen HSE resumes with Gemini")]
pub struct Cli {
    /// Settings file (defaults to the per-user app data directory).
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Screen one batch of PDF/TXT resumes.
    Screen {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write the CSV report to this path.
        #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = DEFAULT_REPORT_FILE_NAME)]
        csv: Option<PathBuf>,

        /// Print the full candidate records as JSON instead of a summary table.
        #[arg(long)]
        json: bool,
    },
    /// Store the Gemini API key in the OS keychain.
    SetApiKey { api_key: String },
    /// Remove the stored Gemini API key.
    ClearApiKey,
    /// Show effective settings and job requirements.
    Settings,
    /// Write the effective settings to the settings file so they can be edited.
    InitSettings {
        /// Overwrite an existing settings file.
        #[arg(long)]
        force: bool,
    },
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let settings_store = match cli.settings {
        Some(path) => SettingsStore::with_path(path),
        None => SettingsStore::new(),
    };

    match cli.command {
        Command::Screen { files, csv, json } => {
            screen(&settings_store, &files, csv.as_deref(), json).await
        }
        Command::SetApiKey { api_key } => {
            GeminiApiKeyStore::new().save(&api_key)?;
            println!("Gemini API key saved ({})", mask_api_key(api_key.trim()));
            Ok(())
        }
        Command::ClearApiKey => {
            GeminiApiKeyStore::new().clear()?;
            println!("Gemini API key removed");
            Ok(())
        }
        Command::Settings => show_settings(&settings_store).await,
        Command::InitSettings { force } => init_settings(&settings_store, force).await,
    }
}

async fn screen(
    settings_store: &SettingsStore,
    paths: &[PathBuf],
    csv_path: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let screenable = screenable_paths(paths);
    if screenable.is_empty() {
        return Err(CoreError::NoEligibleFiles.into());
    }

    let settings = settings_store.load().await?;
    let api_key = GeminiApiKeyStore::new()
        .resolve()?
        .ok_or(CoreError::MissingApiKey)?;

    let files = read_uploads(&screenable).await;
    let unreadable = screenable.len() - files.len();

    let service = ScreeningService::with_gemini(&settings, api_key)?;
    let mut progress_rx = service.subscribe();
    let progress_task = tokio::spawn(async move {
        while progress_rx.changed().await.is_ok() {
            let status = progress_rx.borrow_and_update().clone();
            if status.is_processing {
                eprintln!("Analyzing candidates... {}%", status.progress);
            }
        }
    });

    let outcome = if files.is_empty() {
        Ok(BatchOutcome {
            added_ids: Vec::new(),
            attempted: 0,
            failed: 0,
        })
    } else {
        service.process_files(files).await
    };
    let candidates = service.candidates().await;
    let stats = service.stats().await;
    drop(service);
    let _ = progress_task.await;

    let outcome = outcome?;
    info!(
        added = outcome.added_ids.len(),
        failed = outcome.failed + unreadable,
        "batch complete"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    } else {
        print_summary(&candidates, &stats);
    }

    if let Some(path) = csv_path {
        write_csv(path, &candidates).await?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

/// Paths whose extension maps to a PDF or plain-text upload.
fn screenable_paths(paths: &[PathBuf]) -> Vec<&Path> {
    paths
        .iter()
        .map(PathBuf::as_path)
        .filter(|path| is_screenable_mime(mime_type_for_path(path)))
        .collect()
}

/// Reads every upload; a file that cannot be read is logged and left out of the batch.
async fn read_uploads(paths: &[&Path]) -> Vec<UploadedFile> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match UploadedFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(err) => warn!(path = %path.display(), error = %err, "could not read file, skipped"),
        }
    }
    files
}

async fn show_settings(settings_store: &SettingsStore) -> anyhow::Result<()> {
    let settings = settings_store.load().await?;
    let api_key = GeminiApiKeyStore::new()
        .resolve()
        .context("failed to read Gemini API key")?;

    let view = settings.to_view(api_key.is_some());
    println!("Settings file: {}", settings_store.path().display());
    println!("{}", serde_json::to_string_pretty(&view)?);
    if let Some(key) = api_key {
        println!("Gemini API key: {}", mask_api_key(&key));
    }
    Ok(())
}

async fn init_settings(settings_store: &SettingsStore, force: bool) -> anyhow::Result<()> {
    let path = settings_store.path();
    if !force && tokio::fs::try_exists(path).await.unwrap_or(false) {
        anyhow::bail!(
            "settings file {} already exists (use --force to rewrite it)",
            path.display()
        );
    }

    let settings = settings_store.load().await?;
    settings_store.save(&settings).await?;
    println!("Settings written to {}", path.display());
    Ok(())
}

fn print_summary(candidates: &[CandidateResult], stats: &ScreeningStats) {
    for candidate in candidates {
        println!(
            "{:>3}%  {:<22} {:<28} {}  <{}>  [{}]",
            candidate.match_score,
            candidate.designation.as_str(),
            candidate.extraction.full_name,
            candidate.extraction.recommendation,
            candidate.extraction.email,
            candidate.file_name
        );
    }

    println!();
    println!("Total Screened:      {}", stats.total);
    println!("Highly Recommended:  {}", stats.high_score);
    println!("Avg. Experience:     {} yrs", stats.average_experience);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::JobRequirements;

    #[test]
    fn screen_parses_files_and_report_flag() {
        let cli = Cli::try_parse_from([
            "tgc-hse-screening",
            "screen",
            "a.pdf",
            "b.txt",
            "--csv",
            "out/report.csv",
        ])
        .unwrap();

        match cli.command {
            Command::Screen { files, csv, json } => {
                assert_eq!(files, vec![PathBuf::from("a.pdf"), PathBuf::from("b.txt")]);
                assert_eq!(csv, Some(PathBuf::from("out/report.csv")));
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn bare_csv_flag_uses_default_report_name() {
        let cli = Cli::try_parse_from(["tgc-hse-screening", "screen", "a.pdf", "--csv"]).unwrap();

        match cli.command {
            Command::Screen { csv, .. } => {
                assert_eq!(csv, Some(PathBuf::from(DEFAULT_REPORT_FILE_NAME)));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn only_pdf_and_txt_paths_are_screenable() {
        let paths = vec![
            PathBuf::from("cv.docx"),
            PathBuf::from("a.PDF"),
            PathBuf::from("notes.txt"),
            PathBuf::from("photo.png"),
        ];

        assert_eq!(
            screenable_paths(&paths),
            vec![Path::new("a.PDF"), Path::new("notes.txt")]
        );
        assert!(screenable_paths(&[PathBuf::from("cv.docx")]).is_empty());
    }

    #[tokio::test]
    async fn docx_only_upload_reports_eligibility_before_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::with_path(dir.path().join("settings.json"));

        let err = screen(&store, &[PathBuf::from("cv.docx")], None, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::NoEligibleFiles)
        ));
        assert_eq!(err.to_string(), "Please upload PDF or TXT files only.");
    }

    #[tokio::test]
    async fn unreadable_upload_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let readable = dir.path().join("one.txt");
        tokio::fs::write(&readable, "One").await.unwrap();
        let missing = dir.path().join("missing.pdf");

        let files = read_uploads(&[readable.as_path(), missing.as_path()]).await;

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "one.txt");
        assert_eq!(files[0].bytes, b"One".to_vec());
    }

    #[tokio::test]
    async fn init_settings_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::with_path(dir.path().join("nested").join("settings.json"));

        init_settings(&store, false).await.unwrap();
        let written = store.load().await.unwrap();
        assert_eq!(
            written.job_requirements.nature_of_experience,
            JobRequirements::default().nature_of_experience
        );

        assert!(init_settings(&store, false).await.is_err());
        init_settings(&store, true).await.unwrap();
    }

    #[test]
    fn init_settings_parses_force_flag() {
        let cli =
            Cli::try_parse_from(["tgc-hse-screening", "init-settings", "--force"]).unwrap();
        assert!(matches!(cli.command, Command::InitSettings { force: true }));
    }

    #[test]
    fn screen_requires_at_least_one_file() {
        assert!(Cli::try_parse_from(["tgc-hse-screening", "screen"]).is_err());
    }
}
