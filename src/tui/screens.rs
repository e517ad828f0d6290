use super::state::{Screen, UiState};
use crate::model::RunPhase;
use crate::text_summary::{build_overview, build_run_summary, format_duration, workout_total};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

pub fn draw(area: Rect, f: &mut Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);

    match state.screen {
        Screen::Select => draw_select(chunks[0], f, state),
        Screen::Overview => draw_overview(chunks[0], f, state),
        Screen::Runner => draw_runner(chunks[0], f, state),
        Screen::Finished => draw_finished(chunks[0], f, state),
    }
    draw_status(chunks[1], f, state);

    if state.show_help {
        super::help::draw_help(centered(chunks[0], 60, 22), f);
    }
    if state.confirm_end {
        draw_confirm(centered(chunks[0], 44, 5), f);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_select(area: Rect, f: &mut Frame, state: &UiState) {
    let mut lines: Vec<Line> = Vec::new();
    if state.workouts.is_empty() {
        lines.push(Line::from("No workouts found"));
    }
    for (i, w) in state.workouts.iter().enumerate() {
        let style = if i == state.selected {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", w.name), style),
            Span::styled(
                format!("  {}", format_duration(workout_total(w))),
                Style::default().fg(Color::Gray),
            ),
        ]));
    }
    // Keep the selection visible on short terminals.
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = state.selected.saturating_sub(visible.saturating_sub(1)) as u16;
    let p = Paragraph::new(lines)
        .scroll((scroll, 0))
        .block(Block::default().borders(Borders::ALL).title("Select a Workout"));
    f.render_widget(p, area);
}

fn draw_overview(area: Rect, f: &mut Frame, state: &UiState) {
    let Some(workout) = state.selected_workout() else {
        return;
    };
    let lines: Vec<Line> = build_overview(workout)
        .into_iter()
        .skip(1)
        .map(Line::from)
        .collect();
    let title = format!(
        "{} ({})",
        workout.name,
        format_duration(workout_total(workout))
    );
    let p = Paragraph::new(lines)
        .scroll((state.overview_scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_runner(area: Rect, f: &mut Frame, state: &UiState) {
    let Some(snap) = state.snapshot.as_ref() else {
        f.render_widget(
            Paragraph::new("Preparing…").block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Progress
                Constraint::Min(7),    // Current step
                Constraint::Length(3), // Next step preview
            ]
            .as_ref(),
        )
        .split(area);

    let progress = snap.progress;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(snap.workout_name.clone()),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .ratio((progress.percent / 100.0).clamp(0.0, 1.0))
        .label(format!(
            "{} / {}  ({} left)",
            format_duration(progress.elapsed_secs),
            format_duration(progress.total_secs),
            format_duration(progress.remaining_secs)
        ));
    f.render_widget(gauge, rows[0]);

    let mut body: Vec<Line> = Vec::new();
    match snap.current.as_ref() {
        Some(current) => {
            if let Some(section) = current.section.as_deref() {
                body.push(Line::from(Span::styled(
                    section.to_string(),
                    Style::default().fg(Color::Gray),
                )));
            }
            let title_color = if current.step.is_rest() {
                Color::Cyan
            } else {
                Color::Yellow
            };
            body.push(Line::from(Span::styled(
                current.step.title().to_string(),
                Style::default()
                    .fg(title_color)
                    .add_modifier(Modifier::BOLD),
            )));
            body.push(Line::from(""));
            let countdown_style = if state.is_flashing() {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            body.push(Line::from(Span::styled(
                format!(" {} ", format_duration(snap.countdown)),
                countdown_style,
            )));
            if let Some(desc) = current.step.description() {
                body.push(Line::from(""));
                body.push(Line::from(desc.to_string()));
            }
        }
        None if snap.step_count == 0 => {
            body.push(Line::from("This workout has no steps."));
        }
        None => {
            body.push(Line::from("Workout Complete!"));
        }
    }
    body.push(Line::from(""));
    body.push(Line::from(Span::styled(
        phase_hint(snap.phase),
        Style::default().fg(Color::Magenta),
    )));

    let step_title = if snap.step_count == 0 {
        "Step".to_string()
    } else {
        format!(
            "Step {}/{}",
            (snap.index + 1).min(snap.step_count),
            snap.step_count
        )
    };
    let p = Paragraph::new(body)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(step_title));
    f.render_widget(p, rows[1]);

    let next = match snap.next.as_ref() {
        Some(n) => format!(
            "{}  {}",
            n.step.title(),
            format_duration(n.step.duration())
        ),
        None => "Finish".to_string(),
    };
    let p = Paragraph::new(next).block(Block::default().borders(Borders::ALL).title("Next"));
    f.render_widget(p, rows[2]);
}

fn phase_hint(phase: RunPhase) -> &'static str {
    match phase {
        RunPhase::Idle => "Press space to start",
        RunPhase::Paused => "Paused, press space to resume",
        RunPhase::Running => "",
        RunPhase::Complete => "Press space to finish",
        RunPhase::Ended => "Ended",
    }
}

fn draw_finished(area: Rect, f: &mut Frame, state: &UiState) {
    let mut lines: Vec<Line> = vec![Line::from("")];
    match state.summary.as_ref() {
        Some(summary) => {
            let mut summary_lines = build_run_summary(summary).into_iter();
            if let Some(headline) = summary_lines.next() {
                lines.push(Line::from(Span::styled(
                    headline,
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                )));
            }
            lines.extend(summary_lines.map(Line::from));
        }
        None => lines.push(Line::from("Workout Complete!")),
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press Enter to go back to workouts",
        Style::default().fg(Color::Magenta),
    )));
    let p = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Finished"));
    f.render_widget(p, area);
}

fn draw_confirm(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("End this workout?"),
        Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Magenta)),
            Span::raw(" end   "),
            Span::styled("n", Style::default().fg(Color::Magenta)),
            Span::raw(" keep going"),
        ]),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Confirm"));
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut Frame, state: &UiState) {
    let keys = match state.screen {
        Screen::Select => "↑/↓ choose  Enter open  ? help  q quit",
        Screen::Overview => "Enter start  Esc back  ↑/↓ scroll  ? help",
        Screen::Runner => "Space play/pause  ←/→ prev/next  Esc end  ? help",
        Screen::Finished => "Enter back  q quit",
    };
    let mut spans = vec![Span::styled(keys, Style::default().fg(Color::Gray))];
    if !state.info.is_empty() {
        spans.push(Span::raw("  |  "));
        spans.push(Span::raw(state.info.clone()));
    }
    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("workout-timer"));
    f.render_widget(p, area);
}
