//! Run lifecycle loop.
//!
//! Owns the active [`RunController`] and its countdown clock, applies UI
//! commands and forwards run events to presentation layers.

use crate::engine::feedback::FeedbackSink;
use crate::engine::ticker::Ticker;
use crate::engine::wake_lock::{self, WakeLock};
use crate::engine::RunController;
use crate::flatten::PlanCache;
use crate::model::{InfoEvent, RunConfig, RunEvent, Workout};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers to control the active run.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    /// Tear down any active run and prepare a new one for this workout.
    Begin(Box<Workout>),
    Play,
    TogglePause,
    Next,
    Previous,
    /// User-confirmed abort.
    End,
    #[cfg(feature = "tui")]
    FocusGained,
    Quit,
}

/// Collaborators handed to every run.
#[derive(Clone)]
pub(crate) struct Ports {
    pub feedback: Arc<dyn FeedbackSink>,
    pub wake_lock: Arc<dyn Fn() -> Box<dyn WakeLock> + Send + Sync>,
}

impl Ports {
    pub fn from_config(cfg: &RunConfig) -> Self {
        let cfg2 = cfg.clone();
        Self {
            feedback: crate::engine::feedback::from_config(cfg),
            wake_lock: Arc::new(move || wake_lock::from_config(&cfg2)),
        }
    }
}

/// Process commands until `Quit` or until the command channel closes.
/// Exactly one run exists at a time; its ticker is re-synced after every
/// command or tick so no tick outlives the running stretch it belongs to.
pub(crate) async fn run_controller(
    cfg: &RunConfig,
    ports: Ports,
    event_tx: UnboundedSender<RunEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut plans = PlanCache::default();
    let mut run: Option<RunController> = None;
    let mut ticker = Ticker::new(cfg.tick_interval);

    loop {
        // Closed runs are torn down before anything else can reach them.
        if run.as_ref().is_some_and(RunController::is_closed) {
            run = None;
        }
        ticker.sync(run.as_ref().is_some_and(RunController::is_running));

        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                match cmd {
                    UiCommand::Begin(workout) => {
                        // Drop the previous run (and its wake lock) first.
                        if let Some(prev) = run.take() {
                            let _ = event_tx.send(RunEvent::Info(InfoEvent::Message(format!(
                                "Stopped {}",
                                prev.plan().workout_name
                            ))));
                        }
                        ticker.disarm();
                        let plan = plans.get(&workout);
                        if plan.is_empty() {
                            tracing::warn!(workout = %workout.id, "workout has no steps");
                        }
                        let _ = event_tx.send(RunEvent::Info(InfoEvent::RunStarted {
                            workout: plan.workout_name.clone(),
                            steps: plan.len(),
                        }));
                        tracing::info!(workout = %plan.workout_name, steps = plan.len(), total_secs = plan.total_secs, "run prepared");
                        let ctl = RunController::new(
                            plan,
                            ports.feedback.clone(),
                            (ports.wake_lock)(),
                            event_tx.clone(),
                        );
                        let _ = event_tx.send(RunEvent::Snapshot(Box::new(ctl.snapshot())));
                        run = Some(ctl);
                        if cfg.autostart {
                            if let Some(ctl) = run.as_mut() {
                                ctl.start();
                            }
                        }
                    }
                    UiCommand::Quit => break,
                    other => {
                        if let Some(ctl) = run.as_mut() {
                            apply(ctl, other);
                        }
                    }
                }
            }
            _ = ticker.tick() => {
                if let Some(ctl) = run.as_mut() {
                    ctl.tick();
                }
            }
        }
    }

    // Teardown: stop the clock before releasing the run.
    ticker.disarm();
    drop(run);
    Ok(())
}

fn apply(ctl: &mut RunController, cmd: UiCommand) {
    tracing::debug!(?cmd, phase = ?ctl.phase(), index = ctl.index(), countdown = ctl.countdown(), "command");
    match cmd {
        UiCommand::Play => ctl.start(),
        UiCommand::TogglePause => ctl.toggle(),
        UiCommand::Next => ctl.next(),
        UiCommand::Previous => ctl.previous(),
        UiCommand::End => ctl.end(),
        #[cfg(feature = "tui")]
        UiCommand::FocusGained => ctl.regain_focus(),
        UiCommand::Begin(_) | UiCommand::Quit => {}
    }
}
