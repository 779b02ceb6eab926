use tracing::{debug, info};

use super::{
    select_strategy, CaptureBackend, CaptureCommand, CaptureError, CaptureSettings,
    CaptureStrategy, CapturedOutput, ScriptBackend, TtyrecBackend,
};
use crate::timing::{self, CanonicalSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderPhase {
    SelectStrategy,
    Invoke,
    Normalize,
    Done,
}

impl RecorderPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderPhase::SelectStrategy => "select-strategy",
            RecorderPhase::Invoke => "invoke",
            RecorderPhase::Normalize => "normalize",
            RecorderPhase::Done => "done",
        }
    }
}

/// Finished recording plus the mechanism that produced it.
#[derive(Debug, Clone)]
pub struct Recording {
    pub strategy: CaptureStrategy,
    pub session: CanonicalSession,
}

/// Runs one capture from strategy selection to canonical streams.
///
/// Nothing is retried here; every failure is returned to the caller and the
/// scratch files are gone by the time `record` returns.
pub struct SessionRecorder {
    settings: CaptureSettings,
}

impl SessionRecorder {
    pub fn new(settings: CaptureSettings) -> Self {
        Self { settings }
    }

    pub fn record(&self, command: Option<&[String]>) -> Result<Recording, CaptureError> {
        enter(RecorderPhase::SelectStrategy);
        let strategy = select_strategy(&self.settings);
        self.record_with(strategy, command)
    }

    /// Record with a fixed strategy, skipping the probe.
    pub fn record_with(
        &self,
        strategy: CaptureStrategy,
        command: Option<&[String]>,
    ) -> Result<Recording, CaptureError> {
        let command = CaptureCommand::new(command);
        let backend = self.backend_for(strategy)?;
        if command.is_shell() {
            debug!("No command given; {} will start the login shell", backend.name());
        }

        enter(RecorderPhase::Invoke);
        let session = match backend.capture(&command)? {
            CapturedOutput::Canonical(session) => session,
            CapturedOutput::Ttyrec(raw) => {
                enter(RecorderPhase::Normalize);
                timing::convert(&raw)?
            }
        };

        enter(RecorderPhase::Done);
        info!(
            "Recorded {} frames ({} bytes) via {}",
            session.frame_count(),
            session.script.len(),
            backend.name()
        );

        Ok(Recording { strategy, session })
    }

    fn backend_for(
        &self,
        strategy: CaptureStrategy,
    ) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        match strategy {
            CaptureStrategy::Primary => Ok(Box::new(ScriptBackend::new(
                self.settings.primary_utility.clone(),
            ))),
            CaptureStrategy::Fallback => {
                let utility = self.settings.resolve_fallback()?;
                let backend = TtyrecBackend::new(utility);
                if !backend.is_available() {
                    return Err(CaptureError::UtilityNotFound(backend.utility_name()));
                }
                Ok(Box::new(backend))
            }
        }
    }
}

fn enter(phase: RecorderPhase) {
    debug!("Recorder phase: {}", phase.as_str());
}
