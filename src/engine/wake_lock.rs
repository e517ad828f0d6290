//! Keep-awake side channel held while a run is counting down.

use std::process::{Child, Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WakeLockError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("wake lock is not supported on this platform")]
    Unsupported,
}

pub trait WakeLock: Send {
    /// Request the lock. Acquiring while held is a no-op.
    fn acquire(&mut self) -> Result<(), WakeLockError>;
    /// Release the lock if held.
    fn release(&mut self);
}

/// Used with `--no-wake-lock`.
#[derive(Debug, Default)]
pub struct NoWakeLock;

impl WakeLock for NoWakeLock {
    fn acquire(&mut self) -> Result<(), WakeLockError> {
        Ok(())
    }

    fn release(&mut self) {}
}

const INHIBIT: &str = "systemd-inhibit";

/// Holds a `systemd-inhibit` child blocking idle and sleep for as long as
/// the lock is held.
#[derive(Debug, Default)]
pub struct InhibitWakeLock {
    child: Option<Child>,
}

impl InhibitWakeLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WakeLock for InhibitWakeLock {
    fn acquire(&mut self) -> Result<(), WakeLockError> {
        if !cfg!(target_os = "linux") {
            return Err(WakeLockError::Unsupported);
        }
        // A child that already exited (inhibitor refused) is replaced.
        if let Some(child) = self.child.as_mut() {
            match child.try_wait() {
                Ok(None) => return Ok(()),
                _ => self.child = None,
            }
        }
        let child = Command::new(INHIBIT)
            .args([
                "--what=idle:sleep",
                "--who=workout-timer",
                "--why=Workout in progress",
                "--mode=block",
                "sleep",
                "infinity",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| WakeLockError::Spawn {
                program: INHIBIT,
                source,
            })?;
        tracing::debug!(pid = child.id(), "wake lock acquired");
        self.child = Some(child);
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            tracing::debug!("wake lock released");
        }
    }
}

impl Drop for InhibitWakeLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Build a fresh wake lock for one run.
pub fn from_config(cfg: &crate::model::RunConfig) -> Box<dyn WakeLock> {
    if cfg.wake_lock {
        Box::new(InhibitWakeLock::new())
    } else {
        Box::new(NoWakeLock)
    }
}
