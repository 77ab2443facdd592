pub mod footer;
pub mod log_panel;
pub mod panes;
pub mod status_bar;

use crate::app::{App, InputMode};
use pairsync::models::{PaneId, SyncMode};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

pub fn draw<B: Backend>(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage(60), // Panes
                Constraint::Min(6),         // Sync log
                Constraint::Length(1),      // Status bar
                Constraint::Length(2),      // Footer
            ]
            .as_ref(),
        )
        .split(f.size());

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    for (id, area) in [(PaneId::Left, panels[0]), (PaneId::Right, panels[1])] {
        panes::draw_file_panel::<B>(
            f,
            area,
            app.pane(id),
            app.active == id,
            app.direction.source() == id,
        );
    }

    log_panel::draw_log::<B>(f, app, chunks[1]);
    status_bar::draw_status_bar::<B>(f, app, chunks[2]);
    footer::draw_footer::<B>(f, app, chunks[3]);

    match app.input_mode {
        InputMode::Connect => draw_input_popup::<B>(f, " Connect to host ", &app.input),
        InputMode::GoTo => draw_input_popup::<B>(f, " Go to directory ", &app.input),
        InputMode::ConfirmSync(mode) => draw_confirm_sync::<B>(f, app, mode),
        InputMode::ConfirmDelete => {
            let count = app.pane(app.active).selection().len();
            draw_confirm::<B>(
                f,
                " Delete ",
                vec![Line::from(format!(
                    "Delete {} selected item(s) from the {} pane?",
                    count, app.active
                ))],
            );
        }
        InputMode::Normal => {}
    }
}

/// Helper function to center a rectangle with given width and height
fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((r.height.saturating_sub(height)) / 2),
                Constraint::Length(height),
                Constraint::Length((r.height.saturating_sub(height)) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn draw_input_popup<B: Backend>(f: &mut Frame, title: &str, input: &str) {
    let area = centered_rect(60, 3, f.size());

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .border_style(Style::default().fg(Color::Yellow));

    let paragraph = Paragraph::new(Line::from(vec![
        Span::raw(input),
        Span::styled("█", Style::default().fg(Color::Yellow)),
    ]))
    .block(block);

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

fn draw_confirm_sync<B: Backend>(f: &mut Frame, app: &App, mode: SyncMode) {
    let source = app.pane(app.direction.source());
    let destination = app.pane(app.direction.destination());
    let lines = vec![
        Line::from(Span::styled(
            format!("{} sync the entire directory?", mode),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("Source: {}", source.directory_name())),
        Line::from(format!("Destination: {}", destination.endpoint())),
        Line::from(Span::styled(
            mode.description(),
            Style::default().fg(if mode == SyncMode::Force {
                Color::Red
            } else {
                Color::Gray
            }),
        )),
    ];
    draw_confirm::<B>(f, " Confirm sync ", lines);
}

fn draw_confirm<B: Backend>(f: &mut Frame, title: &str, mut lines: Vec<Line>) {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[y] Yes  [n] No",
        Style::default().fg(Color::Gray),
    )));

    let area = centered_rect(60, lines.len() as u16 + 2, f.size());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .border_style(Style::default().fg(Color::Yellow));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(ratatui::layout::Alignment::Center);

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}
