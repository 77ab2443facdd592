use crate::app::{App, InputMode};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

pub fn draw_footer<B: Backend>(f: &mut Frame, app: &App, area: Rect) {
    let footer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let running = app.executor.is_running();
    let (nav_text, action_text) = match app.input_mode {
        InputMode::Normal if running => (
            "↑/↓: Move  [Tab] Switch  [Enter] Open  [Backspace] Up  [Space] Select",
            "Syncing...  [K] Cancel  [q] Quit",
        ),
        InputMode::Normal => (
            "↑/↓: Move  [Tab] Switch  [Enter] Open  [Backspace] Up  [Space] Select  [a] Clear  [g] Go to  [r] Refresh",
            "[c] Connect  [x] Disconnect  [R] Retry  [t] Direction  [f] Force  [s] Slurp  [L] Clear log  [D] Delete  [q] Quit",
        ),
        InputMode::Connect => ("Type a host (alias or user@host)", "[Enter] Connect  [Esc] Cancel"),
        InputMode::GoTo => ("Type an absolute path", "[Enter] Go  [Esc] Cancel"),
        InputMode::ConfirmSync(_) | InputMode::ConfirmDelete => ("", "[y] Yes  [n] No"),
    };

    let nav_help = Paragraph::new(nav_text).style(Style::default().fg(Color::Gray));
    let action_help = Paragraph::new(action_text).style(Style::default().fg(if running {
        Color::Yellow
    } else {
        Color::Gray
    }));

    f.render_widget(nav_help, footer[0]);
    f.render_widget(action_help, footer[1]);
}
