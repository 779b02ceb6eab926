//! CLI handlers for recording and uploading sessions.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{error, info};

use crate::capture::{CaptureSettings, SessionRecorder};
use crate::cli::args::{RecordCliArgs, UploadCliArgs};
use crate::cli::saved::{read_pair, save_for_retry, write_pair};
use crate::config::Config;
use crate::terminal::TerminalDimensions;
use crate::timing::CanonicalSession;
use crate::upload::{UploadClient, UploadConfig};

/// Handle `ttycast record` (and bare `ttycast`).
pub async fn handle_record_command(args: RecordCliArgs) -> Result<()> {
    let config = Config::load()?;

    // 1. Resolve the upload target before recording so a bad config fails fast
    let upload_config = if args.no_upload {
        None
    } else {
        Some(UploadConfig::resolve(&config).context("Invalid upload configuration")?)
    };

    // 2. Record
    let recorder = SessionRecorder::new(CaptureSettings::from_config(&config.capture));
    let command = (!args.command.is_empty()).then_some(args.command.as_slice());
    let recording = match args.strategy.forced() {
        Some(strategy) => recorder.record_with(strategy, command),
        None => recorder.record(command),
    }
    .context("Recording failed")?;
    let session = recording.session;
    let dims = TerminalDimensions::query();

    eprintln!("ttycast recording finished");

    // 3. Optional local copy
    if let Some(prefix) = &args.output {
        let saved = write_pair(prefix, &session)?;
        eprintln!(
            "Saved to {} and {}",
            saved.script.display(),
            saved.timing.display()
        );
    }

    // 4. Upload, or keep it for later
    let Some(upload_config) = upload_config else {
        if args.output.is_none() {
            let saved = save_for_retry(&session)?;
            eprintln!("Recording kept. Upload it later with:");
            eprintln!("  {}", saved.upload_command(dims));
        }
        return Ok(());
    };

    match upload_with_progress(&upload_config, &session, dims).await {
        Ok(url) => {
            println!("{}", url);
            Ok(())
        }
        Err(err) => {
            if config.behavior.save_on_failure {
                match save_for_retry(&session) {
                    Ok(saved) => {
                        eprintln!("Upload failed; your recording was kept. Retry with:");
                        eprintln!("  {}", saved.upload_command(dims));
                    }
                    Err(save_err) => error!("Could not keep the recording: {save_err:#}"),
                }
            }
            Err(err)
        }
    }
}

/// Handle `ttycast upload <script> <timing>`.
pub async fn handle_upload_command(args: UploadCliArgs) -> Result<()> {
    let config = Config::load()?;
    let session = read_pair(&args.script, &args.timing)?;

    let current = TerminalDimensions::query();
    let dims = TerminalDimensions::from_raw(
        args.cols.unwrap_or(current.columns),
        args.rows.unwrap_or(current.rows),
    );

    let upload_config = UploadConfig::resolve(&config).context("Invalid upload configuration")?;
    let url = upload_with_progress(&upload_config, &session, dims).await?;
    println!("{}", url);
    Ok(())
}

async fn upload_with_progress(
    upload_config: &UploadConfig,
    session: &CanonicalSession,
    dims: TerminalDimensions,
) -> Result<String> {
    let client = UploadClient::new(upload_config)?;
    info!(
        "Uploading {} frames ({}x{}) to {}",
        session.frame_count(),
        dims.columns,
        dims.rows,
        client.endpoint()
    );

    let pb = create_spinner();
    pb.set_message("Uploading...");
    let result = client.upload(session, dims).await;
    pb.finish_and_clear();

    result.context("Upload failed")
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
