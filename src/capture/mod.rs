//! Terminal capture through external recording utilities.
//!
//! The primary utility is util-linux `script`, which already writes the
//! canonical script/timing pair. Where it is missing or lacks timing
//! support, `ttyrec` is used and its binary output converted with
//! [`crate::timing`].

use std::io;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use thiserror::Error;
use which::which;

use crate::config::CaptureConfig;
use crate::timing::{CanonicalSession, MalformedRecording};

pub mod backend;
pub mod command;
pub mod recorder;
pub mod strategy;

pub use backend::{ScriptBackend, TtyrecBackend};
pub use command::CaptureCommand;
pub use recorder::SessionRecorder;
pub use strategy::{select_strategy, CaptureStrategy};

pub const DEFAULT_PRIMARY_UTILITY: &str = "script";
pub const DEFAULT_FALLBACK_UTILITY: &str = "ttyrec";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to run {utility}: {source}")]
    Spawn {
        utility: String,
        #[source]
        source: io::Error,
    },

    #[error("{utility} produced no output")]
    NoOutput { utility: String },

    #[error("capture utility `{0}` not found; install it or set capture.fallback_utility")]
    UtilityNotFound(String),

    #[error("recording is malformed: {0}")]
    Malformed(#[from] MalformedRecording),

    #[error("capture I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Which utilities to use, resolved from the config file.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub primary_utility: PathBuf,
    pub fallback_utility: Option<PathBuf>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            primary_utility: PathBuf::from(DEFAULT_PRIMARY_UTILITY),
            fallback_utility: None,
        }
    }
}

impl CaptureSettings {
    pub fn from_config(config: &CaptureConfig) -> Self {
        let primary_utility = if config.primary_utility.trim().is_empty() {
            PathBuf::from(DEFAULT_PRIMARY_UTILITY)
        } else {
            PathBuf::from(config.primary_utility.trim())
        };
        let fallback_utility = Some(config.fallback_utility.trim())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Self {
            primary_utility,
            fallback_utility,
        }
    }

    /// Explicit fallback path, else `ttyrec` from `PATH`.
    pub fn resolve_fallback(&self) -> Result<PathBuf, CaptureError> {
        if let Some(path) = &self.fallback_utility {
            return Ok(path.clone());
        }
        which(DEFAULT_FALLBACK_UTILITY)
            .map_err(|_| CaptureError::UtilityNotFound(DEFAULT_FALLBACK_UTILITY.to_string()))
    }
}

/// What a backend left behind once the child exited.
#[derive(Debug)]
pub enum CapturedOutput {
    /// Already in script/timing form.
    Canonical(CanonicalSession),
    /// Raw ttyrec frames, still to be converted.
    Ttyrec(Vec<u8>),
}

/// A recording mechanism driven as a child process on the current terminal.
pub trait CaptureBackend {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    fn capture(&self, command: &CaptureCommand) -> Result<CapturedOutput, CaptureError>;
}

/// Scratch file deleted when the returned handle drops.
pub(crate) fn scratch_file(label: &str, suffix: &str) -> Result<NamedTempFile, CaptureError> {
    let file = tempfile::Builder::new()
        .prefix(&format!("ttycast-{label}-"))
        .suffix(suffix)
        .tempfile()?;
    Ok(file)
}
