use crate::app::App;
use ratatui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

pub fn draw_status_bar<B: Backend>(f: &mut Frame, app: &mut App, area: Rect) {
    if let Some((message, timestamp)) = &app.status_message {
        // Clear messages older than 5 seconds (except while syncing)
        let should_show = app.executor.is_running() || timestamp.elapsed().as_secs() < 5;

        if should_show {
            let lower = message.to_lowercase();
            let style = if lower.contains("error") || lower.contains("failed") {
                Style::default().fg(Color::Red)
            } else if lower.contains("success") || lower.contains("connected") {
                Style::default().fg(Color::Green)
            } else if lower.contains("connecting") || lower.contains("started") {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::Yellow)
            };

            let paragraph = Paragraph::new(message.as_str())
                .style(style)
                .alignment(ratatui::layout::Alignment::Center);
            f.render_widget(paragraph, area);
        } else {
            // Clear the status message if it's expired
            app.clear_status_message();
        }
    }
}
