use crate::model::{RunConfig, RunEvent, RunPhase, Workout, WorkoutData};
use crate::orchestrator::{self, Ports, UiCommand};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "workout-timer",
    version,
    about = "Guided interval workouts in the terminal"
)]
pub struct Cli {
    /// Workout definitions: a JSON file path or an http(s) URL
    #[arg(long)]
    pub workouts: Option<String>,

    /// Workout id to open directly (required for --text and --json)
    #[arg(long)]
    pub workout: Option<String>,

    /// Print the available workouts and exit
    #[arg(long)]
    pub list: bool,

    /// Print the flattened step sequence of --workout as JSON and exit
    #[arg(long)]
    pub json: bool,

    /// Run --workout without the TUI, printing each step
    #[arg(long)]
    pub text: bool,

    /// Start counting down as soon as a workout is opened
    #[arg(long)]
    pub autostart: bool,

    /// Disable transition cues
    #[arg(long)]
    pub no_sound: bool,

    /// File whose bytes are written to the terminal as the transition cue (default: bell)
    #[arg(long)]
    pub cue: Option<std::path::PathBuf>,

    /// Do not inhibit idle/sleep while a workout is running
    #[arg(long)]
    pub no_wake_lock: bool,

    /// Countdown period; shorten it to rehearse a workout quickly
    #[arg(long, default_value = "1s")]
    pub tick_interval: humantime::Duration,

    /// Write logs to this file (the TUI otherwise logs nothing)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,

    /// Debug-level logging
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.list || self.json || self.text
    }
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        workouts_location: args
            .workouts
            .clone()
            .unwrap_or_else(crate::source::default_location),
        workout_id: args.workout.clone(),
        tick_interval: Duration::from(args.tick_interval),
        sound: !args.no_sound,
        cue_path: args.cue.clone(),
        wake_lock: !args.no_wake_lock,
        autostart: args.autostart,
        user_agent: format!("workout-timer/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Install the tracing subscriber. Headless modes log to stderr; the TUI
/// only logs when a log file was given.
pub fn init_tracing(args: &Cli) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if args.verbose { "debug" } else { "info" };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());

    if let Some(path) = args.log_file.as_deref() {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        tracing_subscriber::registry()
            .with(filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
            .init();
    } else if args.is_headless() || cfg!(not(feature = "tui")) {
        tracing_subscriber::registry()
            .with(filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
    Ok(())
}

pub async fn run(args: Cli) -> Result<()> {
    let modes = [args.list, args.json, args.text]
        .iter()
        .filter(|m| **m)
        .count();
    if modes > 1 {
        return Err(anyhow::anyhow!(
            "--list, --json and --text are mutually exclusive"
        ));
    }

    let cfg = build_config(&args);
    tracing::debug!(config = ?cfg, "resolved configuration");
    let data = crate::source::load_workouts(&cfg.workouts_location, &cfg.user_agent).await?;

    if args.list {
        return run_list(&data).await;
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(cfg, data).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            let workout = select_workout(&cfg, &data)?.clone();
            return run_text(cfg, workout).await;
        }
    }

    let workout = select_workout(&cfg, &data)?.clone();
    if args.json {
        return run_json(&workout).await;
    }
    run_text(cfg, workout).await
}

fn select_workout<'a>(cfg: &RunConfig, data: &'a WorkoutData) -> Result<&'a Workout> {
    let id = cfg
        .workout_id
        .as_deref()
        .context("--workout <ID> is required in this mode (see --list)")?;
    crate::source::find_workout(data, id).with_context(|| format!("no workout with id {id:?}"))
}

async fn run_list(data: &WorkoutData) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    if data.workouts.is_empty() {
        let _ = out_tx.send(OutputLine::Stderr("No workouts found".into()));
    }
    for line in crate::text_summary::build_listing(&data.workouts) {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

async fn run_json(workout: &Workout) -> Result<()> {
    let plan = crate::flatten::Plan::for_workout(workout);
    let out = serde_json::json!({
        "id": plan.workout_id,
        "name": plan.workout_name,
        "total_secs": plan.total_secs,
        "steps": plan.steps,
    });
    let (out_tx, out_handle) = spawn_output_writer();
    let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&out)?));
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// Map one line typed on stdin during a `--text` run to a command.
fn parse_text_command(line: &str) -> Option<UiCommand> {
    match line.trim() {
        "" | "p" | "pause" => Some(UiCommand::TogglePause),
        "n" | "next" => Some(UiCommand::Next),
        "b" | "prev" | "previous" => Some(UiCommand::Previous),
        "e" | "end" => Some(UiCommand::End),
        _ => None,
    }
}

/// Headless run: start immediately, print each step, print the summary.
/// Lines on stdin control the run (Enter pauses/resumes, `n`/`b` skip
/// forward/back, `e` ends); Ctrl-C ends it too.
async fn run_text(cfg: RunConfig, workout: Workout) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<RunEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    for line in crate::text_summary::build_overview(&workout) {
        let _ = out_tx.send(OutputLine::Stderr(line));
    }

    let ports = Ports::from_config(&cfg);
    let loop_cfg = cfg.clone();
    let handle = tokio::spawn(async move {
        orchestrator::run_controller(&loop_cfg, ports, evt_tx, cmd_rx).await
    });
    let _ = cmd_tx.send(UiCommand::Begin(Box::new(workout)));
    let _ = cmd_tx.send(UiCommand::Play);
    let _ = out_tx.send(OutputLine::Stderr(
        "Enter: pause/resume  n: next  b: previous  e: end".into(),
    ));

    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut last_index = None;
    let mut last_phase = None;
    let mut summary = None;
    loop {
        tokio::select! {
            ev = evt_rx.recv() => {
                let Some(ev) = ev else { break };
                match ev {
                    RunEvent::Snapshot(s) => {
                        if last_index != Some(s.index) {
                            last_index = Some(s.index);
                            if let Some(line) = crate::text_summary::step_line(&s) {
                                let _ = out_tx.send(OutputLine::Stderr(line));
                            }
                        }
                        if last_phase.replace(s.phase) != Some(s.phase) {
                            match s.phase {
                                RunPhase::Paused => {
                                    let _ = out_tx.send(OutputLine::Stderr("paused (Enter to resume)".into()));
                                }
                                RunPhase::Running => {
                                    let _ = out_tx.send(OutputLine::Stderr("running".into()));
                                }
                                _ => {}
                            }
                        }
                    }
                    RunEvent::Cue => {}
                    RunEvent::Info(info) => {
                        let _ = out_tx.send(OutputLine::Stderr(info.to_message()));
                    }
                    RunEvent::Finished(s) | RunEvent::Ended(s) => {
                        summary = Some(orchestrator::process_run_completion(&s));
                        let _ = cmd_tx.send(UiCommand::Quit);
                    }
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match parse_text_command(&line) {
                        Some(cmd) => {
                            let _ = cmd_tx.send(cmd);
                        }
                        None => {
                            let _ = out_tx.send(OutputLine::Stderr(format!("unknown command {:?}", line.trim())));
                        }
                    },
                    // EOF (e.g. stdin redirected from /dev/null): keep running untouched.
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        tracing::warn!("stdin closed: {e}");
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let _ = cmd_tx.send(UiCommand::End);
            }
        }
    }

    handle.await.context("run loop task failed")??;

    if let Some(summary) = summary {
        for line in crate::text_summary::build_run_summary(&summary) {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_mode_lines_map_to_run_commands() {
        assert!(matches!(parse_text_command(""), Some(UiCommand::TogglePause)));
        assert!(matches!(parse_text_command(" n "), Some(UiCommand::Next)));
        assert!(matches!(parse_text_command("b"), Some(UiCommand::Previous)));
        assert!(matches!(parse_text_command("end"), Some(UiCommand::End)));
        assert!(parse_text_command("jump").is_none());
    }

    #[test]
    fn output_modes_are_headless() {
        let args = Cli::parse_from(["workout-timer", "--text", "--workout", "hiit"]);
        assert!(args.is_headless());
        let cfg = build_config(&args);
        assert_eq!(cfg.workout_id.as_deref(), Some("hiit"));
        assert_eq!(cfg.tick_interval, Duration::from_secs(1));
        assert!(!Cli::parse_from(["workout-timer"]).is_headless());
    }
}
