//! Run controller.
//!
//! Walks a flattened plan one step at a time: owns the countdown, pause and
//! resume, manual navigation and progress, and reports completion or abort
//! to the host through [`RunEvent`]s. The controller is synchronous; the
//! caller delivers [`RunController::tick`] once per elapsed period while
//! [`RunController::is_running`] holds.

pub mod feedback;
pub mod ticker;
pub mod wake_lock;

use crate::flatten::Plan;
use crate::metrics::compute_progress;
use crate::model::{InfoEvent, RunEvent, RunOutcome, RunPhase, RunSnapshot, RunSummary};
use feedback::FeedbackSink;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use wake_lock::WakeLock;

pub struct RunController {
    plan: Arc<Plan>,
    index: usize,
    countdown: u64,
    phase: RunPhase,
    feedback: Arc<dyn FeedbackSink>,
    wake_lock: Box<dyn WakeLock>,
    event_tx: UnboundedSender<RunEvent>,
    finish_sent: bool,
    wake_lock_warned: bool,
}

impl RunController {
    /// A new run starts paused on the first step, or already complete when
    /// the plan is empty.
    pub fn new(
        plan: Arc<Plan>,
        feedback: Arc<dyn FeedbackSink>,
        wake_lock: Box<dyn WakeLock>,
        event_tx: UnboundedSender<RunEvent>,
    ) -> Self {
        let (phase, countdown) = match plan.steps.first() {
            Some(first) => (RunPhase::Idle, first.step.duration()),
            None => (RunPhase::Complete, 0),
        };
        Self {
            plan,
            index: 0,
            countdown,
            phase,
            feedback,
            wake_lock,
            event_tx,
            finish_sent: false,
            wake_lock_warned: false,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn countdown(&self) -> u64 {
        self.countdown
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    /// True once the host has been told the run finished or ended.
    pub fn is_closed(&self) -> bool {
        self.finish_sent || self.phase == RunPhase::Ended
    }

    /// Start or resume counting down. Does not itself play a cue.
    pub fn start(&mut self) {
        match self.phase {
            RunPhase::Idle | RunPhase::Paused => {
                self.phase = RunPhase::Running;
                tracing::debug!(index = self.index, countdown = self.countdown, "running");
                self.acquire_wake_lock();
                self.settle();
                self.publish();
            }
            // Only reachable with an empty plan: let the host leave.
            RunPhase::Complete => {
                self.finish();
                self.publish();
            }
            RunPhase::Running | RunPhase::Ended => {}
        }
    }

    pub fn pause(&mut self) {
        if self.phase == RunPhase::Running {
            self.enter_paused();
            tracing::debug!(index = self.index, countdown = self.countdown, "paused");
            self.publish();
        }
    }

    pub fn toggle(&mut self) {
        if self.is_running() {
            self.pause();
        } else {
            self.start();
        }
    }

    /// One elapsed period. Ignored unless running.
    pub fn tick(&mut self) {
        if self.phase != RunPhase::Running {
            return;
        }
        self.countdown = self.countdown.saturating_sub(1);
        self.settle();
        self.publish();
    }

    /// Skip to the following step and pause; on the last step this finishes
    /// the run instead.
    pub fn next(&mut self) {
        if self.is_closed() {
            return;
        }
        if self.index + 1 < self.plan.len() {
            self.move_to(self.index + 1);
        } else {
            self.finish();
        }
        self.publish();
    }

    /// Go back one step and pause. No-op on the first step.
    pub fn previous(&mut self) {
        if self.phase.is_terminal() || self.index == 0 {
            return;
        }
        self.move_to(self.index - 1);
        self.publish();
    }

    /// Abort the run. Confirmation is the caller's job.
    pub fn end(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = RunPhase::Ended;
        self.wake_lock.release();
        tracing::info!(workout = %self.plan.workout_name, index = self.index, "run ended");
        let _ = self
            .event_tx
            .send(RunEvent::Ended(Box::new(self.summary(RunOutcome::Ended))));
        self.publish();
    }

    /// The terminal came back into focus: re-request the wake lock if the
    /// run is still counting.
    #[cfg_attr(not(feature = "tui"), allow(dead_code))]
    pub fn regain_focus(&mut self) {
        if self.is_running() {
            self.acquire_wake_lock();
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            workout_name: self.plan.workout_name.clone(),
            phase: self.phase,
            index: self.index,
            step_count: self.plan.len(),
            countdown: self.countdown,
            current: self.plan.steps.get(self.index).cloned(),
            next: self.plan.steps.get(self.index + 1).cloned(),
            progress: compute_progress(&self.plan, self.index),
        }
    }

    pub fn summary(&self, outcome: RunOutcome) -> RunSummary {
        let progress = compute_progress(&self.plan, self.index);
        RunSummary {
            workout_id: self.plan.workout_id.clone(),
            workout_name: self.plan.workout_name.clone(),
            outcome,
            steps_completed: self.index.min(self.plan.len()),
            step_count: self.plan.len(),
            elapsed_secs: progress.elapsed_secs,
            total_secs: progress.total_secs,
            completed_at_utc: String::new(),
        }
    }

    fn move_to(&mut self, index: usize) {
        self.index = index;
        self.countdown = self.plan.steps[index].step.duration();
        self.enter_paused();
        tracing::debug!(index, countdown = self.countdown, "navigated");
    }

    fn enter_paused(&mut self) {
        self.phase = RunPhase::Paused;
        self.wake_lock.release();
    }

    /// Cross every boundary that is already due. Zero-length steps are
    /// passed through here without waiting for a tick.
    fn settle(&mut self) {
        while self.phase == RunPhase::Running && self.countdown == 0 {
            self.feedback.signal_transition();
            let _ = self.event_tx.send(RunEvent::Cue);
            if self.index + 1 < self.plan.len() {
                self.index += 1;
                self.countdown = self.plan.steps[self.index].step.duration();
                tracing::debug!(index = self.index, countdown = self.countdown, "advanced");
            } else {
                self.index = self.plan.len();
                self.finish();
            }
        }
    }

    fn finish(&mut self) {
        self.phase = RunPhase::Complete;
        self.wake_lock.release();
        if !self.finish_sent {
            self.finish_sent = true;
            tracing::info!(workout = %self.plan.workout_name, "run finished");
            let _ = self
                .event_tx
                .send(RunEvent::Finished(Box::new(self.summary(RunOutcome::Finished))));
        }
    }

    fn acquire_wake_lock(&mut self) {
        if let Err(e) = self.wake_lock.acquire() {
            tracing::warn!("wake lock unavailable: {e}");
            if !self.wake_lock_warned {
                self.wake_lock_warned = true;
                let _ = self
                    .event_tx
                    .send(RunEvent::Info(InfoEvent::WakeLockUnavailable {
                        reason: e.to_string(),
                    }));
            }
        }
    }

    fn publish(&self) {
        let _ = self
            .event_tx
            .send(RunEvent::Snapshot(Box::new(self.snapshot())));
    }
}

impl Drop for RunController {
    fn drop(&mut self) {
        self.wake_lock.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Workout, WorkoutStep};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
    use wake_lock::WakeLockError;

    #[derive(Default)]
    struct CountingSink(AtomicUsize);

    impl FeedbackSink for CountingSink {
        fn signal_transition(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct LockLog {
        held: bool,
        acquires: usize,
        fail: bool,
    }

    struct FakeLock(Arc<Mutex<LockLog>>);

    impl WakeLock for FakeLock {
        fn acquire(&mut self) -> Result<(), WakeLockError> {
            let mut log = self.0.lock().unwrap();
            if log.fail {
                return Err(WakeLockError::Unsupported);
            }
            log.acquires += 1;
            log.held = true;
            Ok(())
        }

        fn release(&mut self) {
            self.0.lock().unwrap().held = false;
        }
    }

    struct Harness {
        ctl: RunController,
        sink: Arc<CountingSink>,
        lock: Arc<Mutex<LockLog>>,
        rx: UnboundedReceiver<RunEvent>,
    }

    impl Harness {
        fn cues(&self) -> usize {
            self.sink.0.load(Ordering::SeqCst)
        }

        fn held(&self) -> bool {
            self.lock.lock().unwrap().held
        }

        /// Drain events and count (finished, ended, cue) notifications.
        fn drain(&mut self) -> (usize, usize, usize) {
            let mut counts = (0, 0, 0);
            while let Ok(ev) = self.rx.try_recv() {
                match ev {
                    RunEvent::Finished(_) => counts.0 += 1,
                    RunEvent::Ended(_) => counts.1 += 1,
                    RunEvent::Cue => counts.2 += 1,
                    _ => {}
                }
            }
            counts
        }
    }

    fn harness(durations: &[u64]) -> Harness {
        let steps = durations
            .iter()
            .enumerate()
            .map(|(i, d)| WorkoutStep::Exercise {
                name: format!("Step {i}"),
                duration: *d,
                description: None,
            })
            .collect();
        let workout = Workout {
            id: "t".into(),
            name: "Test".into(),
            steps: Some(steps),
            sections: None,
        };
        let sink = Arc::new(CountingSink::default());
        let lock = Arc::new(Mutex::new(LockLog::default()));
        let (tx, rx) = unbounded_channel();
        let ctl = RunController::new(
            Arc::new(Plan::for_workout(&workout)),
            sink.clone(),
            Box::new(FakeLock(lock.clone())),
            tx,
        );
        Harness {
            ctl,
            sink,
            lock,
            rx,
        }
    }

    #[test]
    fn single_exercise_runs_to_completion() {
        let mut h = harness(&[5]);
        assert_eq!(h.ctl.phase(), RunPhase::Idle);
        assert_eq!(h.ctl.countdown(), 5);
        h.ctl.start();
        for _ in 0..5 {
            h.ctl.tick();
        }
        assert_eq!(h.ctl.phase(), RunPhase::Complete);
        assert_eq!(h.cues(), 1);
        assert_eq!(h.drain(), (1, 0, 1));
        assert!(!h.held());
    }

    #[test]
    fn ticks_advance_through_steps_and_stay_running() {
        let mut h = harness(&[2, 3]);
        h.ctl.start();
        h.ctl.tick();
        h.ctl.tick();
        assert_eq!(h.ctl.index(), 1);
        assert_eq!(h.ctl.countdown(), 3);
        assert!(h.ctl.is_running());
        assert_eq!(h.cues(), 1);
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let mut h = harness(&[5]);
        h.ctl.start();
        h.ctl.tick();
        h.ctl.tick();
        assert_eq!(h.ctl.countdown(), 3);
        h.ctl.pause();
        assert!(!h.held());
        h.ctl.tick();
        assert_eq!(h.ctl.countdown(), 3);
        h.ctl.start();
        assert_eq!(h.ctl.countdown(), 3);
        h.ctl.tick();
        assert_eq!(h.ctl.countdown(), 2);
        assert_eq!(h.lock.lock().unwrap().acquires, 2);
    }

    #[test]
    fn previous_on_first_step_is_noop() {
        let mut h = harness(&[4, 4]);
        h.ctl.previous();
        assert_eq!(h.ctl.phase(), RunPhase::Idle);
        assert_eq!(h.ctl.index(), 0);
        assert!(h.rx.try_recv().is_err());
    }

    #[test]
    fn navigation_pauses_and_resets_countdown() {
        let mut h = harness(&[4, 6, 8]);
        h.ctl.start();
        h.ctl.tick();
        h.ctl.next();
        assert_eq!((h.ctl.index(), h.ctl.countdown()), (1, 6));
        assert_eq!(h.ctl.phase(), RunPhase::Paused);
        assert!(!h.held());
        h.ctl.previous();
        assert_eq!((h.ctl.index(), h.ctl.countdown()), (0, 4));
        assert_eq!(h.ctl.phase(), RunPhase::Paused);
        assert_eq!(h.cues(), 0);
    }

    #[test]
    fn repeated_next_finishes_exactly_once() {
        let mut h = harness(&[3, 3, 3]);
        for _ in 0..10 {
            h.ctl.next();
        }
        assert_eq!(h.ctl.index(), 2);
        assert_eq!(h.ctl.phase(), RunPhase::Complete);
        assert_eq!(h.drain(), (1, 0, 0));
        h.ctl.start();
        h.ctl.tick();
        assert_eq!(h.drain(), (0, 0, 0));
    }

    #[test]
    fn zero_length_first_step_advances_on_start() {
        let mut h = harness(&[0, 3]);
        h.ctl.start();
        assert_eq!(h.cues(), 1);
        assert_eq!((h.ctl.index(), h.ctl.countdown()), (1, 3));
        assert!(h.ctl.is_running());
    }

    #[test]
    fn zero_length_last_step_finishes_without_tick() {
        let mut h = harness(&[1, 0]);
        h.ctl.start();
        h.ctl.tick();
        assert_eq!(h.cues(), 2);
        assert_eq!(h.ctl.phase(), RunPhase::Complete);
        assert_eq!(h.drain(), (1, 0, 2));
    }

    #[test]
    fn all_zero_plan_completes_on_start() {
        let mut h = harness(&[0, 0, 0]);
        h.ctl.start();
        assert_eq!(h.cues(), 3);
        assert_eq!(h.ctl.index(), 3);
        assert_eq!(h.drain(), (1, 0, 3));
    }

    #[test]
    fn navigating_onto_zero_length_step_waits_for_resume() {
        let mut h = harness(&[5, 0, 5]);
        h.ctl.next();
        assert_eq!((h.ctl.index(), h.ctl.countdown()), (1, 0));
        assert_eq!(h.cues(), 0);
        h.ctl.start();
        assert_eq!(h.cues(), 1);
        assert_eq!((h.ctl.index(), h.ctl.countdown()), (2, 5));
    }

    #[test]
    fn empty_plan_is_complete_and_finishes_once() {
        let mut h = harness(&[]);
        assert_eq!(h.ctl.phase(), RunPhase::Complete);
        assert!(h.ctl.snapshot().current.is_none());
        h.ctl.start();
        h.ctl.start();
        h.ctl.next();
        assert_eq!(h.drain(), (1, 0, 0));
        assert_eq!(h.cues(), 0);
    }

    #[test]
    fn end_aborts_once_and_stops_everything() {
        let mut h = harness(&[5, 5]);
        h.ctl.start();
        assert!(h.held());
        h.ctl.end();
        assert_eq!(h.ctl.phase(), RunPhase::Ended);
        assert!(!h.held());
        h.ctl.end();
        h.ctl.tick();
        h.ctl.next();
        h.ctl.start();
        assert_eq!(h.ctl.countdown(), 5);
        assert_eq!(h.drain(), (0, 1, 0));
    }

    #[test]
    fn end_after_completion_is_ignored() {
        let mut h = harness(&[1]);
        h.ctl.start();
        h.ctl.tick();
        h.ctl.end();
        assert_eq!(h.drain(), (1, 0, 1));
    }

    #[test]
    fn focus_reacquires_only_while_running() {
        let mut h = harness(&[5]);
        h.ctl.regain_focus();
        assert_eq!(h.lock.lock().unwrap().acquires, 0);
        h.ctl.start();
        h.lock.lock().unwrap().held = false;
        h.ctl.regain_focus();
        assert!(h.held());
        assert_eq!(h.lock.lock().unwrap().acquires, 2);
    }

    #[test]
    fn failing_wake_lock_does_not_stop_the_run() {
        let mut h = harness(&[2]);
        h.lock.lock().unwrap().fail = true;
        h.ctl.start();
        h.ctl.pause();
        h.ctl.start();
        h.ctl.tick();
        h.ctl.tick();
        assert_eq!(h.ctl.phase(), RunPhase::Complete);
        let mut warnings = 0;
        while let Ok(ev) = h.rx.try_recv() {
            if matches!(ev, RunEvent::Info(InfoEvent::WakeLockUnavailable { .. })) {
                warnings += 1;
            }
        }
        assert_eq!(warnings, 1);
    }

    #[test]
    fn elapsed_plus_remaining_matches_total_during_run() {
        let mut h = harness(&[2, 0, 3, 1]);
        let total = h.ctl.plan().total_secs;
        h.ctl.start();
        for _ in 0..8 {
            let p = h.ctl.snapshot().progress;
            assert_eq!(p.elapsed_secs + p.remaining_secs, total);
            h.ctl.tick();
        }
        assert_eq!(h.ctl.phase(), RunPhase::Complete);
        let p = h.ctl.snapshot().progress;
        assert_eq!((p.elapsed_secs, p.remaining_secs), (total, 0));
    }

    #[test]
    fn next_preview_is_absent_on_last_step() {
        let mut h = harness(&[1, 2]);
        assert_eq!(
            h.ctl.snapshot().next.map(|s| s.step.duration()),
            Some(2)
        );
        h.ctl.next();
        assert!(h.ctl.snapshot().next.is_none());
    }

    #[test]
    fn drop_releases_wake_lock() {
        let mut h = harness(&[5]);
        h.ctl.start();
        assert!(h.held());
        let lock = h.lock.clone();
        drop(h);
        assert!(!lock.lock().unwrap().held);
    }
}
