use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Workout list:"),
        key_line("↑/↓ j/k", 5, "Choose workout"),
        key_line("Enter", 7, "Show overview"),
        Line::from(""),
        Line::from("Overview:"),
        key_line("Enter", 7, "Start workout"),
        key_line("Esc", 9, "Back to list"),
        Line::from(""),
        Line::from("Running:"),
        key_line("Space", 7, "Play/Pause"),
        key_line("←", 11, "Previous step"),
        key_line("→", 11, "Next step"),
        key_line("Esc / q", 5, "End workout (asks to confirm)"),
        Line::from(""),
        key_line("?", 11, "Toggle this help"),
        key_line("q", 11, "Quit (outside a running workout)"),
        key_line("Ctrl-C", 6, "Quit"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}
