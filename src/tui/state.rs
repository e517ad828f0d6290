use crate::model::{RunEvent, RunSnapshot, RunSummary, Workout};
use std::time::{Duration, Instant};

/// How long the countdown stays highlighted after a transition cue.
const CUE_FLASH: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Select,
    Overview,
    Runner,
    Finished,
}

pub struct UiState {
    pub screen: Screen,
    pub workouts: Vec<Workout>,
    pub selected: usize,
    pub overview_scroll: u16,
    pub show_help: bool,
    pub info: String,

    // Runner
    pub snapshot: Option<RunSnapshot>,
    pub confirm_end: bool,
    pub cue_flash_until: Option<Instant>,

    // Finished
    pub summary: Option<RunSummary>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            screen: Screen::Select,
            workouts: Vec::new(),
            selected: 0,
            overview_scroll: 0,
            show_help: false,
            info: String::new(),
            snapshot: None,
            confirm_end: false,
            cue_flash_until: None,
            summary: None,
        }
    }
}

impl UiState {
    pub fn selected_workout(&self) -> Option<&Workout> {
        self.workouts.get(self.selected)
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.workouts.len() {
            self.selected += 1;
        }
    }

    /// Jump straight to a workout's overview, if it exists.
    pub fn open_workout(&mut self, id: &str) -> bool {
        match self.workouts.iter().position(|w| w.id == id) {
            Some(i) => {
                self.selected = i;
                self.overview_scroll = 0;
                self.screen = Screen::Overview;
                true
            }
            None => false,
        }
    }

    pub fn back_to_selection(&mut self) {
        self.screen = Screen::Select;
        self.snapshot = None;
        self.summary = None;
        self.confirm_end = false;
        self.cue_flash_until = None;
    }

    pub fn is_flashing(&self) -> bool {
        self.cue_flash_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// Fold one run event into the UI state.
    pub fn apply_event(&mut self, ev: RunEvent) {
        match ev {
            RunEvent::Snapshot(s) => {
                self.snapshot = Some(*s);
            }
            RunEvent::Cue => {
                self.cue_flash_until = Some(Instant::now() + CUE_FLASH);
            }
            RunEvent::Finished(summary) => {
                self.summary = Some(crate::orchestrator::process_run_completion(&summary));
                self.confirm_end = false;
                self.screen = Screen::Finished;
            }
            RunEvent::Ended(summary) => {
                self.info = format!("Ended {}", summary.workout_name);
                self.back_to_selection();
            }
            RunEvent::Info(info) => {
                self.info = info.to_message();
            }
        }
    }
}
