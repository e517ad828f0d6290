//! Transition cues.
//!
//! The controller calls [`FeedbackSink::signal_transition`] on every step
//! boundary and moves on immediately; sinks do their work in the background.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Terminal bell, used whenever the configured cue cannot be loaded.
const BELL: &[u8] = b"\x07";

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("cue file {path} could not be read: {source}")]
    CueUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cue file {0} is empty")]
    EmptyCue(PathBuf),
    #[error("failed to write cue: {0}")]
    Write(#[from] std::io::Error),
}

pub trait FeedbackSink: Send + Sync {
    /// Signal a step transition. Must return without waiting for playback.
    fn signal_transition(&self);
}

/// No cue at all (`--no-sound`).
#[derive(Debug, Default)]
pub struct SilentFeedback;

impl FeedbackSink for SilentFeedback {
    fn signal_transition(&self) {}
}

/// Writes a cue to the terminal. The payload is loaded from `cue_path` the
/// first time it is needed and shared by every later cue; without a path, or
/// when loading fails, the terminal bell is used.
pub struct TerminalCue {
    cue_path: Option<PathBuf>,
    payload: Arc<OnceCell<Arc<[u8]>>>,
}

impl TerminalCue {
    pub fn new(cue_path: Option<PathBuf>) -> Self {
        Self {
            cue_path,
            payload: Arc::new(OnceCell::new()),
        }
    }

    async fn load(path: Option<PathBuf>) -> Arc<[u8]> {
        let Some(path) = path else {
            return Arc::from(BELL);
        };
        match read_cue(path).await {
            Ok(bytes) => Arc::from(bytes),
            Err(e) => {
                tracing::warn!("falling back to terminal bell: {e}");
                Arc::from(BELL)
            }
        }
    }
}

async fn read_cue(path: PathBuf) -> Result<Vec<u8>, FeedbackError> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| FeedbackError::CueUnavailable {
            path: path.clone(),
            source,
        })?;
    if bytes.is_empty() {
        return Err(FeedbackError::EmptyCue(path));
    }
    Ok(bytes)
}

fn emit(payload: &[u8]) -> Result<(), FeedbackError> {
    // stderr: stdout belongs to the terminal UI backend.
    let mut err = std::io::stderr().lock();
    err.write_all(payload)?;
    err.flush()?;
    Ok(())
}

impl FeedbackSink for TerminalCue {
    fn signal_transition(&self) {
        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            // Outside a runtime there is nothing to defer onto; ring directly.
            if let Err(e) = emit(BELL) {
                tracing::warn!("cue failed: {e}");
            }
            return;
        };
        let payload = self.payload.clone();
        let path = self.cue_path.clone();
        rt.spawn(async move {
            let bytes = payload.get_or_init(|| Self::load(path)).await.clone();
            if let Err(e) = emit(&bytes) {
                tracing::warn!("cue failed: {e}");
            }
        });
    }
}

/// Build the sink matching the run configuration.
pub fn from_config(cfg: &crate::model::RunConfig) -> Arc<dyn FeedbackSink> {
    if cfg.sound {
        Arc::new(TerminalCue::new(cfg.cue_path.clone()))
    } else {
        Arc::new(SilentFeedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_cue_file_falls_back_to_bell() {
        let bytes = TerminalCue::load(Some(PathBuf::from("/nonexistent/cue.bin"))).await;
        assert_eq!(&*bytes, BELL);
    }

    #[tokio::test]
    async fn empty_cue_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = read_cue(file.path().to_path_buf()).await.unwrap_err();
        assert!(matches!(err, FeedbackError::EmptyCue(_)));
    }

    #[tokio::test]
    async fn cue_file_contents_are_used() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x07\x07").unwrap();
        let bytes = TerminalCue::load(Some(file.path().to_path_buf())).await;
        assert_eq!(&*bytes, b"\x07\x07");
    }
}
