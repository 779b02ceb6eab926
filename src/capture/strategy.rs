//! Runtime choice between `script` and `ttyrec`.
//!
//! `script` differs wildly between platforms (BSD `script` has no timing
//! output, old util-linux lacks `-c`), so rather than guessing from the OS
//! we run it once on a throwaway command and look at what it wrote.

use regex::Regex;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use tracing::{debug, info};

use super::{scratch_file, CaptureCommand, CaptureError, CaptureSettings};

/// Printed by the probe command; must show up in the probe's script file.
pub const PROBE_MARKER: &str = "ttycast-probe-ok";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStrategy {
    /// util-linux `script` with `-t` timing.
    Primary,
    /// `ttyrec`, converted afterwards.
    Fallback,
}

impl CaptureStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureStrategy::Primary => "primary",
            CaptureStrategy::Fallback => "fallback",
        }
    }
}

/// First line of a `script -t` timing stream: `<seconds> <bytes>`.
static TIMING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?\s+\d+").expect("Invalid timing line regex"));

/// True if the probe wrote the marker and a plausible timing header.
pub fn probe_output_accepted(script: &[u8], timing: &str) -> bool {
    let marker_found = String::from_utf8_lossy(script).contains(PROBE_MARKER);
    let first_line = timing.lines().next().unwrap_or_default();
    marker_found && TIMING_LINE.is_match(first_line.trim())
}

/// Probe the primary utility and pick a strategy. Runs the probe every time
/// it is called.
pub fn select_strategy(settings: &CaptureSettings) -> CaptureStrategy {
    match probe_primary(&settings.primary_utility) {
        Ok(true) => {
            info!(
                "Using {} for capture",
                settings.primary_utility.display()
            );
            CaptureStrategy::Primary
        }
        Ok(false) => {
            info!(
                "{} did not produce usable timing output; falling back to ttyrec",
                settings.primary_utility.display()
            );
            CaptureStrategy::Fallback
        }
        Err(err) => {
            debug!("Primary capture probe failed: {err}");
            info!(
                "{} unavailable; falling back to ttyrec",
                settings.primary_utility.display()
            );
            CaptureStrategy::Fallback
        }
    }
}

fn probe_primary(utility: &Path) -> Result<bool, CaptureError> {
    let script_file = scratch_file("probe", ".script")?;
    let timing_file = scratch_file("probe", ".timing")?;

    let probe = vec!["echo".to_string(), PROBE_MARKER.to_string()];
    let command = CaptureCommand::new(Some(probe.as_slice()));

    let status = Command::new(utility)
        .args(command.script_args(script_file.path()))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(timing_file.reopen()?))
        .status()
        .map_err(|source| CaptureError::Spawn {
            utility: utility.display().to_string(),
            source,
        })?;
    debug!("Probe of {} exited with {}", utility.display(), status);

    let script = fs::read(script_file.path())?;
    let timing = String::from_utf8_lossy(&fs::read(timing_file.path())?).into_owned();
    debug!(
        "Probe wrote {} script bytes, timing head {:?}",
        script.len(),
        timing.lines().next().unwrap_or_default()
    );

    Ok(probe_output_accepted(&script, &timing))
}
