use pairsync::connection::ConnectionState;
use pairsync::models::DirectoryEntry;
use pairsync::pane::Pane;
use pairsync::ssh_service::SshShell;
use ratatui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

pub fn draw_file_panel<B: Backend>(
    f: &mut Frame,
    area: Rect,
    pane: &Pane<SshShell>,
    is_active: bool,
    is_source: bool,
) {
    let border_style = if is_active {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Gray)
    };

    let title_style = if is_active {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::BOLD)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(panel_title(pane, is_source))
        .title_style(title_style);

    let list_items: Vec<ListItem> = pane
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let is_cursor = i == pane.cursor() && is_active;
            entry_item(entry, is_cursor, pane.is_selected(entry))
        })
        .collect();

    let mut state = ListState::default();
    if !pane.entries().is_empty() {
        state.select(Some(pane.cursor()));
    }

    let list = List::new(list_items).block(block);
    f.render_stateful_widget(list, area, &mut state);
}

fn panel_title(pane: &Pane<SshShell>, is_source: bool) -> String {
    let role = if is_source { "source" } else { "destination" };
    let mut title = format!(" {} ({}): {} ", pane.id, role, pane.endpoint());

    match pane.connection_state() {
        ConnectionState::Connecting => {
            title.push_str(&format!("[connecting to {}] ", pane.remote_host().unwrap_or("?")))
        }
        ConnectionState::Failed(reason) => title.push_str(&format!("[{}] ", reason)),
        _ if pane.is_loading() => title.push_str("[loading] "),
        _ => {}
    }
    if !pane.selection().is_empty() {
        title.push_str(&format!("[{} selected] ", pane.selection().len()));
    }
    title
}

fn entry_item(entry: &DirectoryEntry, is_cursor: bool, is_selected: bool) -> ListItem<'static> {
    let mut spans = vec![];

    // Cursor indicator
    spans.push(Span::styled(
        if is_cursor { "> " } else { "  " },
        Style::default().fg(Color::Yellow),
    ));

    spans.push(Span::styled(
        if is_selected { "[x] " } else { "[ ] " },
        Style::default().fg(if is_selected { Color::Magenta } else { Color::DarkGray }),
    ));

    let (icon, name_color) = if entry.is_directory {
        ("📁 ", Color::Blue)
    } else {
        ("📄 ", Color::White)
    };
    spans.push(Span::styled(icon, Style::default().fg(Color::Yellow)));

    spans.push(Span::styled(
        entry.name.clone(),
        Style::default().fg(if is_cursor { Color::Black } else { name_color }),
    ));

    let detail_color = if is_cursor { Color::Black } else { Color::Gray };
    if !entry.is_directory {
        spans.push(Span::styled(
            format!(" ({})", format_file_size(entry.size_bytes)),
            Style::default().fg(detail_color),
        ));
    }
    if let Some(modified) = entry.modified_at {
        spans.push(Span::styled(
            format!("  {}", modified.format("%Y-%m-%d %H:%M")),
            Style::default()
                .fg(detail_color)
                .add_modifier(Modifier::DIM),
        ));
    }

    let style = if is_cursor {
        Style::default()
            .bg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    ListItem::new(Line::from(spans)).style(style)
}

fn format_file_size(size: i64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size.max(0) as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes_are_human_readable() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(-1), "0 B");
    }
}
