use crate::app::App;
use pairsync::sync::RunStatus;
use ratatui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn draw_log<B: Backend>(f: &mut Frame, app: &App, area: Rect) {
    let run = app.executor.current();

    let (title, title_color) = match run {
        Some(run) => {
            let color = match run.status {
                RunStatus::Running => Color::Cyan,
                RunStatus::Succeeded => Color::Green,
                RunStatus::Failed { .. } => Color::Red,
            };
            (format!(" Sync log · {} · {} ", run.direction, run.progress), color)
        }
        None => (format!(" Sync log · {} ", app.direction), Color::Gray),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(
            Style::default()
                .fg(title_color)
                .add_modifier(Modifier::BOLD),
        );

    // Follow the tail of the log
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = match run {
        Some(run) => run
            .log
            .iter()
            .skip(run.log.len().saturating_sub(visible))
            .map(|line| {
                Line::from(vec![
                    Span::styled(
                        format!("[{}] ", line.formatted_time()),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(
                        line.text.as_str(),
                        Style::default().fg(if line.is_error {
                            Color::Red
                        } else {
                            Color::White
                        }),
                    ),
                ])
            })
            .collect(),
        None => vec![Line::from(Span::styled(
            "No sync yet. Select items and press [f] Force or [s] Slurp.",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    f.render_widget(Paragraph::new(lines).block(block), area);
}
