mod help;
mod screens;
mod state;

use crate::model::{RunConfig, RunEvent, WorkoutData};
use crate::orchestrator::{self, Ports, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use state::{Screen, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(cfg: RunConfig, data: WorkoutData) -> Result<()> {
    // Unbounded channels avoid backpressure and task switching in the hot path.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<RunEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_cfg = cfg.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_cfg, data, event_rx, cmd_tx));

    let ports = Ports::from_config(&cfg);
    let res = orchestrator::run_controller(&cfg, ports, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// What a key press asks of the loop.
#[derive(Debug)]
enum KeyAction {
    None,
    Send(UiCommand),
    Quit,
}

/// Map a key press to state changes and, possibly, a run command.
fn handle_key(state: &mut UiState, modifiers: KeyModifiers, code: KeyCode) -> KeyAction {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }
    if code == KeyCode::Char('?') {
        state.show_help = !state.show_help;
        return KeyAction::None;
    }
    if state.show_help && code == KeyCode::Esc {
        state.show_help = false;
        return KeyAction::None;
    }

    match state.screen {
        Screen::Select => match code {
            KeyCode::Char('q') => KeyAction::Quit,
            KeyCode::Up | KeyCode::Char('k') => {
                state.select_prev();
                KeyAction::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                state.select_next();
                KeyAction::None
            }
            KeyCode::Enter if state.selected_workout().is_some() => {
                state.overview_scroll = 0;
                state.screen = Screen::Overview;
                KeyAction::None
            }
            _ => KeyAction::None,
        },
        Screen::Overview => match code {
            KeyCode::Char('q') => KeyAction::Quit,
            KeyCode::Esc | KeyCode::Backspace => {
                state.back_to_selection();
                KeyAction::None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                state.overview_scroll = state.overview_scroll.saturating_sub(1);
                KeyAction::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                state.overview_scroll = state.overview_scroll.saturating_add(1);
                KeyAction::None
            }
            KeyCode::Enter | KeyCode::Char('s') => match state.selected_workout() {
                Some(w) => {
                    let cmd = UiCommand::Begin(Box::new(w.clone()));
                    state.snapshot = None;
                    state.info.clear();
                    state.screen = Screen::Runner;
                    KeyAction::Send(cmd)
                }
                None => KeyAction::None,
            },
            _ => KeyAction::None,
        },
        Screen::Runner if state.confirm_end => match code {
            KeyCode::Char('y') | KeyCode::Enter => {
                state.confirm_end = false;
                KeyAction::Send(UiCommand::End)
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                state.confirm_end = false;
                KeyAction::None
            }
            _ => KeyAction::None,
        },
        Screen::Runner => match code {
            KeyCode::Left => KeyAction::Send(UiCommand::Previous),
            KeyCode::Right => KeyAction::Send(UiCommand::Next),
            KeyCode::Char(' ') => KeyAction::Send(UiCommand::TogglePause),
            KeyCode::Esc | KeyCode::Char('q') => {
                state.confirm_end = true;
                KeyAction::None
            }
            _ => KeyAction::None,
        },
        Screen::Finished => match code {
            KeyCode::Char('q') => KeyAction::Quit,
            KeyCode::Enter | KeyCode::Esc | KeyCode::Backspace => {
                state.back_to_selection();
                KeyAction::None
            }
            _ => KeyAction::None,
        },
    }
}

/// Run the TUI loop on a dedicated thread.
pub(crate) fn run_threaded(
    cfg: RunConfig,
    data: WorkoutData,
    mut event_rx: UnboundedReceiver<RunEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        workouts: data.workouts,
        ..Default::default()
    };
    if let Some(id) = cfg.workout_id.as_deref() {
        if !state.open_workout(id) {
            state.info = format!("No workout with id {id:?}");
        } else if cfg.autostart {
            if let Some(w) = state.selected_workout() {
                let _ = cmd_tx.send(UiCommand::Begin(Box::new(w.clone())));
                state.screen = Screen::Runner;
            }
        }
    }

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now() - tick_rate;

    let res = loop {
        // Drain events without blocking to keep UI responsive; unbounded channel avoids backpressure.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| screens::draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(k)) => {
                    if k.kind != KeyEventKind::Press {
                        continue;
                    }
                    match handle_key(&mut state, k.modifiers, k.code) {
                        KeyAction::None => {}
                        KeyAction::Send(cmd) => {
                            let _ = cmd_tx.send(cmd);
                        }
                        KeyAction::Quit => {
                            let _ = cmd_tx.send(UiCommand::Quit);
                            break Ok(());
                        }
                    }
                    // Redraw right away so navigation feels immediate.
                    last_tick = Instant::now() - tick_rate;
                }
                Ok(Event::FocusGained) => {
                    let _ = cmd_tx.send(UiCommand::FocusGained);
                }
                _ => {}
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, DisableFocusChange, LeaveAlternateScreen).ok();
    res
}
