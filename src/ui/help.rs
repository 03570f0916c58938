use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};

use crate::ui::theme::Theme;

/// Centered overlay listing every keybind with its action. Sized to the
/// entries, clamped to the terminal.
pub fn render(frame: &mut Frame, area: Rect, entries: &[(String, &str)], theme: &Theme) {
    let widest = entries
        .iter()
        .map(|(key, desc)| key.len() + desc.len())
        .max()
        .unwrap_or(0);
    // key column + gap + description + borders and padding
    let width = ((widest + 14) as u16)
        .max(30)
        .min(area.width.saturating_sub(4));
    let height = (entries.len() as u16 + 2).min(area.height.saturating_sub(2));

    let overlay = center(width, height, area);
    frame.render_widget(Clear, overlay);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
        .title(Span::styled(
            " Keybinds ",
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let lines: Vec<Line> = entries.iter().map(|(key, desc)| entry_line(key, desc, theme)).collect();
    frame.render_widget(
        Paragraph::new(lines).style(Style::default().bg(theme.surface_bg)),
        inner,
    );
}

fn entry_line<'a>(key: &str, desc: &'a str, theme: &Theme) -> Line<'a> {
    Line::from(vec![
        Span::styled(
            format!(" {key:>8} "),
            Style::default()
                .fg(theme.pill_key_fg)
                .bg(theme.pill_key_bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {desc}"), Style::default().fg(theme.pill_desc_fg)),
    ])
}

fn center(width: u16, height: u16, area: Rect) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    cell
}
