use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub workouts_location: String,
    #[serde(default)]
    pub workout_id: Option<String>,
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    pub sound: bool,
    #[serde(default)]
    pub cue_path: Option<PathBuf>,
    pub wake_lock: bool,
    pub autostart: bool,
    pub user_agent: String,
}

/// One node of a workout's step tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkoutStep {
    Exercise {
        name: String,
        duration: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Rest {
        duration: u64,
    },
    Repetition {
        count: u32,
        #[serde(default)]
        steps: Vec<WorkoutStep>,
        #[serde(
            default,
            rename = "restBetweenReps",
            skip_serializing_if = "Option::is_none"
        )]
        rest_between_reps: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<WorkoutStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<WorkoutStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<Section>>,
}

/// Borrowed view of whichever form a workout's body takes.
#[derive(Debug, Clone, Copy)]
pub enum WorkoutBody<'a> {
    Sections(&'a [Section]),
    Steps(&'a [WorkoutStep]),
    Empty,
}

impl Workout {
    /// Sections take precedence when a malformed workout carries both forms.
    pub fn body(&self) -> WorkoutBody<'_> {
        match (&self.sections, &self.steps) {
            (Some(sections), _) => WorkoutBody::Sections(sections),
            (None, Some(steps)) => WorkoutBody::Steps(steps),
            (None, None) => WorkoutBody::Empty,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkoutData {
    #[serde(default)]
    pub workouts: Vec<Workout>,
}

/// An executable step: repetitions never survive flattening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AtomicStep {
    Exercise {
        name: String,
        duration: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Rest {
        duration: u64,
    },
}

impl AtomicStep {
    pub fn duration(&self) -> u64 {
        match self {
            AtomicStep::Exercise { duration, .. } | AtomicStep::Rest { duration } => *duration,
        }
    }

    /// Display title: the exercise name, or "Rest".
    pub fn title(&self) -> &str {
        match self {
            AtomicStep::Exercise { name, .. } => name,
            AtomicStep::Rest { .. } => "Rest",
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            AtomicStep::Exercise { description, .. } => description.as_deref(),
            AtomicStep::Rest { .. } => None,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, AtomicStep::Rest { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenedStep {
    pub step: AtomicStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// Not started yet; the countdown shows the first step's duration.
    Idle,
    Running,
    Paused,
    /// Index advanced past the final step, or `next` pressed on it.
    Complete,
    /// Aborted by a confirmed end.
    Ended,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Complete | RunPhase::Ended)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub total_secs: u64,
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
    pub percent: f64,
}

/// Observable state of a run, rebuilt on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub workout_name: String,
    pub phase: RunPhase,
    pub index: usize,
    pub step_count: usize,
    pub countdown: u64,
    pub current: Option<FlattenedStep>,
    pub next: Option<FlattenedStep>,
    pub progress: Progress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Finished,
    Ended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub workout_id: String,
    pub workout_name: String,
    pub outcome: RunOutcome,
    pub steps_completed: usize,
    pub step_count: usize,
    pub elapsed_secs: u64,
    pub total_secs: u64,
    #[serde(default)]
    pub completed_at_utc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    Snapshot(Box<RunSnapshot>),
    /// A step boundary was crossed.
    Cue,
    Finished(Box<RunSummary>),
    Ended(Box<RunSummary>),
    Info(InfoEvent),
}

/// Structured info events emitted by the run loop and consumed by UI/CLI layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InfoEvent {
    Message(String),
    RunStarted { workout: String, steps: usize },
    WakeLockUnavailable { reason: String },
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::RunStarted { workout, steps } => {
                format!("Starting {} ({} steps)", workout, steps)
            }
            InfoEvent::WakeLockUnavailable { reason } => {
                format!("Screen may sleep: {}", reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_steps_and_ignores_legacy_fields() {
        let raw = r#"{
            "workouts": [{
                "id": "w1",
                "name": "Core",
                "steps": [
                    {"type": "exercise", "name": "Plank", "duration": 30, "description": "Hold"},
                    {"type": "rest", "duration": 10},
                    {"type": "repetition", "count": 2, "duration": 0, "restBetweenReps": 5,
                     "steps": [{"type": "exercise", "name": "Crunch", "duration": 20}]}
                ]
            }]
        }"#;
        let data: WorkoutData = serde_json::from_str(raw).unwrap();
        let w = &data.workouts[0];
        assert!(matches!(w.body(), WorkoutBody::Steps(s) if s.len() == 3));
        match &w.steps.as_ref().unwrap()[2] {
            WorkoutStep::Repetition {
                count,
                steps,
                rest_between_reps,
            } => {
                assert_eq!(*count, 2);
                assert_eq!(steps.len(), 1);
                assert_eq!(*rest_between_reps, Some(5));
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn sections_win_over_steps() {
        let w = Workout {
            id: "x".into(),
            name: "x".into(),
            steps: Some(vec![WorkoutStep::Rest { duration: 1 }]),
            sections: Some(vec![]),
        };
        assert!(matches!(w.body(), WorkoutBody::Sections(_)));

        let empty = Workout {
            steps: None,
            sections: None,
            ..w
        };
        assert!(matches!(empty.body(), WorkoutBody::Empty));
    }

    #[test]
    fn atomic_step_accessors() {
        let ex = AtomicStep::Exercise {
            name: "Squat".into(),
            duration: 40,
            description: Some("Slow".into()),
        };
        assert_eq!(ex.title(), "Squat");
        assert_eq!(ex.duration(), 40);
        assert_eq!(ex.description(), Some("Slow"));
        let rest = AtomicStep::Rest { duration: 15 };
        assert_eq!(rest.title(), "Rest");
        assert!(rest.is_rest());
        assert_eq!(rest.description(), None);
    }
}
