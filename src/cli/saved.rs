//! Script/timing pairs on disk: explicit `--output`, failed uploads, and
//! input to `ttycast upload`.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::global;
use crate::terminal::TerminalDimensions;
use crate::timing::{parse_timing, CanonicalSession};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRecording {
    pub script: PathBuf,
    pub timing: PathBuf,
}

impl SavedRecording {
    pub fn from_prefix(prefix: &Path) -> Self {
        let mut script = prefix.as_os_str().to_owned();
        script.push(".script");
        let mut timing = prefix.as_os_str().to_owned();
        timing.push(".timing");
        Self {
            script: PathBuf::from(script),
            timing: PathBuf::from(timing),
        }
    }

    /// Command line that re-uploads this recording.
    pub fn upload_command(&self, dims: TerminalDimensions) -> String {
        format!(
            "ttycast upload {} {} --cols {} --rows {}",
            shell_path(&self.script),
            shell_path(&self.timing),
            dims.columns,
            dims.rows
        )
    }
}

fn shell_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    shlex::try_quote(&raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

pub fn write_pair(prefix: &Path, session: &CanonicalSession) -> Result<SavedRecording> {
    let saved = SavedRecording::from_prefix(prefix);
    if let Some(parent) = saved.script.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&saved.script, &session.script)
        .with_context(|| format!("Failed to write {}", saved.script.display()))?;
    std::fs::write(&saved.timing, &session.timing)
        .with_context(|| format!("Failed to write {}", saved.timing.display()))?;
    Ok(saved)
}

/// Keep a recording under the data directory, named by local time.
pub fn save_for_retry(session: &CanonicalSession) -> Result<SavedRecording> {
    let dir = global::recordings_dir()?;
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    write_pair(&dir.join(format!("ttycast-{timestamp}")), session)
}

/// Read a saved pair back, rejecting timing files that do not describe the
/// script.
pub fn read_pair(script: &Path, timing: &Path) -> Result<CanonicalSession> {
    let script_bytes =
        std::fs::read(script).with_context(|| format!("Failed to read {}", script.display()))?;
    let timing_text = std::fs::read_to_string(timing)
        .with_context(|| format!("Failed to read {}", timing.display()))?;

    let lines = parse_timing(&timing_text)
        .with_context(|| format!("{} is not a timing file", timing.display()))?;
    if lines.is_empty() {
        bail!("{} contains no timing lines", timing.display());
    }

    let described: usize = lines.iter().map(|l| l.byte_count).sum();
    if described > script_bytes.len() {
        bail!(
            "{} describes {} bytes but {} only has {}",
            timing.display(),
            described,
            script.display(),
            script_bytes.len()
        );
    }

    Ok(CanonicalSession::new(script_bytes, timing_text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn session() -> CanonicalSession {
        CanonicalSession::new(b"header\nhello".to_vec(), "0.0 2\n0.25 3\n".to_string())
    }

    #[test]
    fn test_prefix_naming() {
        let saved = SavedRecording::from_prefix(Path::new("/tmp/demo"));
        assert_eq!(saved.script, PathBuf::from("/tmp/demo.script"));
        assert_eq!(saved.timing, PathBuf::from("/tmp/demo.timing"));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let saved = write_pair(&dir.path().join("nested/demo"), &session()).unwrap();
        let loaded = read_pair(&saved.script, &saved.timing).unwrap();
        assert_eq!(loaded, session());
    }

    #[test]
    fn test_read_rejects_oversized_timing() {
        let dir = tempdir().unwrap();
        let bad = CanonicalSession::new(b"hi".to_vec(), "0.0 50\n".to_string());
        let saved = write_pair(&dir.path().join("bad"), &bad).unwrap();
        let err = read_pair(&saved.script, &saved.timing).unwrap_err();
        assert!(err.to_string().contains("describes 50 bytes"));
    }

    #[test]
    fn test_read_rejects_non_timing_file() {
        let dir = tempdir().unwrap();
        let bad = CanonicalSession::new(b"hi".to_vec(), "script: invalid option -- 't'\n".to_string());
        let saved = write_pair(&dir.path().join("bad"), &bad).unwrap();
        assert!(read_pair(&saved.script, &saved.timing).is_err());
    }

    #[test]
    fn test_upload_command_quotes_paths() {
        let saved = SavedRecording::from_prefix(Path::new("/tmp/my demo"));
        let cmd = saved.upload_command(TerminalDimensions::default());
        assert_eq!(
            shlex::split(&cmd).unwrap(),
            vec![
                "ttycast",
                "upload",
                "/tmp/my demo.script",
                "/tmp/my demo.timing",
                "--cols",
                "80",
                "--rows",
                "25"
            ]
        );
    }
}
