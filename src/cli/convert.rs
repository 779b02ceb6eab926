use anyhow::{Context, Result};
use tracing::info;

use crate::cli::args::ConvertCliArgs;
use crate::timing::{self, CONVERTED_BANNER};

/// Handle `ttycast convert <ttyrec> <script> <timing>`.
pub fn handle_convert_command(args: ConvertCliArgs) -> Result<()> {
    let raw = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let session = timing::convert(&raw)
        .with_context(|| format!("{} is not a valid ttyrec file", args.input.display()))?;

    std::fs::write(&args.script, &session.script)
        .with_context(|| format!("Failed to write {}", args.script.display()))?;
    std::fs::write(&args.timing, &session.timing)
        .with_context(|| format!("Failed to write {}", args.timing.display()))?;

    info!("Converted {}", args.input.display());
    println!(
        "{} frames, {} bytes of output",
        session.frame_count(),
        session.script.len() - CONVERTED_BANNER.len()
    );
    Ok(())
}
