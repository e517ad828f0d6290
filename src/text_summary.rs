//! Text builders for CLI output.
//!
//! Formats workout listings, step-tree overviews and run summaries as plain
//! lines; the TUI reuses the same wording.

use crate::flatten::steps_duration;
use crate::model::{RunOutcome, RunSnapshot, RunSummary, Workout, WorkoutBody, WorkoutStep};

/// `m:ss`, minutes unbounded.
pub fn format_duration(total_secs: u64) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

pub fn workout_total(workout: &Workout) -> u64 {
    match workout.body() {
        WorkoutBody::Sections(sections) => sections
            .iter()
            .map(|s| steps_duration(&s.steps))
            .fold(0, u64::saturating_add),
        WorkoutBody::Steps(steps) => steps_duration(steps),
        WorkoutBody::Empty => 0,
    }
}

/// One line per workout: id, name and total duration.
pub(crate) fn build_listing(workouts: &[Workout]) -> Vec<String> {
    let id_width = workouts.iter().map(|w| w.id.len()).max().unwrap_or(0);
    workouts
        .iter()
        .map(|w| {
            format!(
                "{:<id_width$}  {}  ({})",
                w.id,
                w.name,
                format_duration(workout_total(w))
            )
        })
        .collect()
}

/// Indented rendering of a workout's step tree.
pub(crate) fn build_overview(workout: &Workout) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({})",
        workout.name,
        format_duration(workout_total(workout))
    )];
    match workout.body() {
        WorkoutBody::Sections(sections) => {
            for s in sections {
                lines.push(format!(
                    "  {} ({})",
                    s.name,
                    format_duration(steps_duration(&s.steps))
                ));
                push_steps(&s.steps, 2, &mut lines);
            }
        }
        WorkoutBody::Steps(steps) => push_steps(steps, 1, &mut lines),
        WorkoutBody::Empty => lines.push("  (no steps)".into()),
    }
    lines
}

fn push_steps(steps: &[WorkoutStep], depth: usize, lines: &mut Vec<String>) {
    let pad = "  ".repeat(depth);
    for step in steps {
        match step {
            WorkoutStep::Exercise {
                name,
                duration,
                description,
            } => {
                lines.push(format!("{pad}{name}  {}", format_duration(*duration)));
                if let Some(d) = description {
                    lines.push(format!("{pad}  {d}"));
                }
            }
            WorkoutStep::Rest { duration } => {
                lines.push(format!("{pad}Rest  {}", format_duration(*duration)))
            }
            WorkoutStep::Repetition {
                count,
                steps,
                rest_between_reps,
            } => {
                lines.push(format!("{pad}Repeat {count} times"));
                push_steps(steps, depth + 1, lines);
                if let Some(r) = rest_between_reps.filter(|r| *r > 0) {
                    lines.push(format!("{pad}  Rest between reps: {}", format_duration(r)));
                }
            }
        }
    }
}

/// One line describing the step a run is on.
pub(crate) fn step_line(snapshot: &RunSnapshot) -> Option<String> {
    let current = snapshot.current.as_ref()?;
    let section = current
        .section
        .as_deref()
        .map(|s| format!("[{s}] "))
        .unwrap_or_default();
    let mut line = format!(
        "{}/{} {}{} {}",
        snapshot.index + 1,
        snapshot.step_count,
        section,
        current.step.title(),
        format_duration(current.step.duration())
    );
    if current.step.is_rest() {
        if let Some(next) = snapshot.next.as_ref() {
            line.push_str(&format!("  (next: {})", next.step.title()));
        }
    } else if let Some(desc) = current.step.description() {
        line.push_str(&format!("  {desc}"));
    }
    Some(line)
}

pub(crate) fn build_run_summary(summary: &RunSummary) -> Vec<String> {
    let headline = match summary.outcome {
        RunOutcome::Finished => "Workout Complete!",
        RunOutcome::Ended => "Workout ended",
    };
    let mut lines = vec![
        format!("{headline} {}", summary.workout_name),
        format!(
            "Steps: {}/{}  Time: {} of {}",
            summary.steps_completed,
            summary.step_count,
            format_duration(summary.elapsed_secs),
            format_duration(summary.total_secs)
        ),
    ];
    if !summary.completed_at_utc.is_empty() {
        lines.push(format!("At: {}", summary.completed_at_utc));
    }
    lines
}
