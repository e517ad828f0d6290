//! Workout source.
//!
//! Loads `{ "workouts": [...] }` from a local file or an `http(s)://` URL.
//! Structurally odd workouts are kept and reported; they flatten to whatever
//! steps they do have.

use crate::model::{Workout, WorkoutBody, WorkoutData, WorkoutStep};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Default location: `<config dir>/workout-timer/workouts.json`.
pub fn default_location() -> String {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("workout-timer")
        .join("workouts.json")
        .display()
        .to_string()
}

pub async fn load_workouts(location: &str, user_agent: &str) -> Result<WorkoutData> {
    let raw = if is_url(location) {
        fetch(location, user_agent).await?
    } else {
        tokio::fs::read_to_string(location)
            .await
            .with_context(|| format!("read workouts from {location}"))?
    };
    let data = parse_workouts(&raw).with_context(|| format!("parse workouts from {location}"))?;
    for warning in validate(&data) {
        tracing::warn!("{warning}");
    }
    tracing::debug!(count = data.workouts.len(), location, "workouts loaded");
    Ok(data)
}

async fn fetch(url: &str, user_agent: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(15))
        .build()
        .context("build http client")?;
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url}"))?;
    resp.text().await.context("read response body")
}

pub fn parse_workouts(raw: &str) -> Result<WorkoutData> {
    Ok(serde_json::from_str(raw)?)
}

pub fn find_workout<'a>(data: &'a WorkoutData, id: &str) -> Option<&'a Workout> {
    data.workouts.iter().find(|w| w.id == id)
}

/// Describe every structural problem found; none of them is fatal.
pub fn validate(data: &WorkoutData) -> Vec<String> {
    let mut out = Vec::new();
    for w in &data.workouts {
        if w.steps.is_some() && w.sections.is_some() {
            out.push(format!(
                "workout {}: has both steps and sections; using sections",
                w.id
            ));
        }
        match w.body() {
            WorkoutBody::Empty => {
                out.push(format!("workout {}: has neither steps nor sections", w.id))
            }
            WorkoutBody::Steps(steps) => check_steps(&w.id, steps, &mut out),
            WorkoutBody::Sections(sections) => {
                for s in sections {
                    check_steps(&w.id, &s.steps, &mut out);
                }
            }
        }
    }
    out
}

fn check_steps(id: &str, steps: &[WorkoutStep], out: &mut Vec<String>) {
    for step in steps {
        if let WorkoutStep::Repetition { count, steps, .. } = step {
            if steps.is_empty() {
                out.push(format!("workout {id}: repetition x{count} has no steps"));
            }
            check_steps(id, steps, out);
        }
    }
}
