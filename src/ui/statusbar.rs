use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::ResolvedKeybinds;
use crate::metrics::model::MetricsModel;
use crate::ui::theme::Theme;

pub fn render(
    frame: &mut Frame,
    area: Rect,
    status_message: Option<&(String, std::time::Instant)>,
    keybinds: &ResolvedKeybinds,
    model: &MetricsModel,
    theme: &Theme,
) {
    let bg_style = Style::default().bg(theme.statusbar_bg);

    // Ephemeral feedback first, then persistent problems, then the pills
    if let Some((msg, _)) = status_message {
        let line = Line::from(Span::styled(
            format!(" {msg}"),
            Style::default().fg(theme.ok).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(line).style(bg_style), area);
        return;
    }

    if let Some(problem) = model.status_line() {
        let line = Line::from(Span::styled(
            format!(" {problem}"),
            Style::default().fg(theme.err).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(line).style(bg_style), area);
        return;
    }

    let mut spans = Vec::new();
    for (key, desc) in keybinds.pill_entries() {
        spans.extend(pill_spans(key, desc, theme));
    }

    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!(
            "gpu:{} ane:{}",
            model.gpu.health.badge(),
            model.power.health.badge()
        ),
        Style::default().fg(theme.text_secondary),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)).style(bg_style), area);
}

fn pill_spans<'a>(key: String, desc: &'a str, theme: &Theme) -> Vec<Span<'a>> {
    vec![
        Span::raw(" "),
        Span::styled(
            format!(" {key} "),
            Style::default()
                .fg(theme.pill_key_fg)
                .bg(theme.pill_key_bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {desc}"),
            Style::default().fg(theme.pill_desc_fg).bg(theme.surface_bg),
        ),
    ]
}
