use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info};

use super::{scratch_file, CaptureBackend, CaptureCommand, CaptureError, CapturedOutput};
use crate::timing::CanonicalSession;

/// util-linux `script`, which writes the canonical pair itself.
pub struct ScriptBackend {
    utility: PathBuf,
}

impl ScriptBackend {
    pub fn new(utility: impl Into<PathBuf>) -> Self {
        Self {
            utility: utility.into(),
        }
    }
}

impl CaptureBackend for ScriptBackend {
    fn name(&self) -> &'static str {
        "script"
    }

    fn is_available(&self) -> bool {
        which::which(&self.utility).is_ok()
    }

    fn capture(&self, command: &CaptureCommand) -> Result<CapturedOutput, CaptureError> {
        let script_file = scratch_file("session", ".script")?;
        let timing_file = scratch_file("session", ".timing")?;
        let utility = self.utility.display().to_string();

        info!("Recording with {} (exit the shell to finish)", utility);

        // stdin/stdout stay attached to the controlling terminal
        let status = Command::new(&self.utility)
            .args(command.script_args(script_file.path()))
            .stderr(Stdio::from(timing_file.reopen()?))
            .status()
            .map_err(|source| CaptureError::Spawn {
                utility: utility.clone(),
                source,
            })?;
        debug!("{} exited with {} (ignored)", utility, status);

        let script = fs::read(script_file.path())?;
        if script.is_empty() {
            return Err(CaptureError::NoOutput { utility });
        }
        let timing = String::from_utf8_lossy(&fs::read(timing_file.path())?).into_owned();

        Ok(CapturedOutput::Canonical(CanonicalSession::new(script, timing)))
    }
}

/// `ttyrec`, whose single binary file is converted afterwards.
pub struct TtyrecBackend {
    utility: PathBuf,
}

impl TtyrecBackend {
    pub fn new(utility: impl Into<PathBuf>) -> Self {
        Self {
            utility: utility.into(),
        }
    }

    pub fn utility_name(&self) -> String {
        self.utility.display().to_string()
    }
}

impl CaptureBackend for TtyrecBackend {
    fn name(&self) -> &'static str {
        "ttyrec"
    }

    fn is_available(&self) -> bool {
        self.utility.is_file() || which::which(&self.utility).is_ok()
    }

    fn capture(&self, command: &CaptureCommand) -> Result<CapturedOutput, CaptureError> {
        let record_file = scratch_file("session", ".ttyrec")?;
        let utility = self.utility_name();

        info!("Recording with {} (exit the shell to finish)", utility);

        let status = Command::new(&self.utility)
            .args(command.ttyrec_args(record_file.path()))
            .status()
            .map_err(|source| CaptureError::Spawn {
                utility: utility.clone(),
                source,
            })?;
        debug!("{} exited with {}", utility, status);

        let raw = fs::read(record_file.path())?;
        if raw.is_empty() {
            return Err(CaptureError::NoOutput { utility });
        }
        debug!("{} wrote {} bytes", utility, raw.len());

        Ok(CapturedOutput::Ttyrec(raw))
    }
}
