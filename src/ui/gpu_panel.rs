use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph, Sparkline};

use crate::format::format_bytes;
use crate::metrics::model::{GpuState, SourceHealth};
use crate::ui::health_color;
use crate::ui::theme::Theme;

pub fn render(frame: &mut Frame, area: Rect, state: &GpuState, theme: &Theme) {
    let title = Line::from(vec![
        Span::styled(
            " GPU ",
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("[{}] ", state.health.badge()),
            Style::default().fg(health_color(&state.health, theme)),
        ),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
        .title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(sample) = &state.sample else {
        render_absence(frame, inner, &state.health, theme);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    utilization_gauge(frame, rows[0], "device  ", sample.device_utilization, theme);
    utilization_gauge(frame, rows[1], "renderer", sample.renderer_utilization, theme);
    utilization_gauge(frame, rows[2], "tiler   ", sample.tiler_utilization, theme);

    let memory_line = Line::from(vec![
        Span::styled(" memory   ", Style::default().fg(theme.text_secondary)),
        Span::styled(
            format!(
                "{} / {}",
                format_bytes(sample.memory_in_use_bytes),
                format_bytes(sample.memory_allocated_bytes)
            ),
            Style::default().fg(theme.text_primary),
        ),
    ]);
    frame.render_widget(Paragraph::new(memory_line), rows[3]);

    let data: Vec<u64> = state.history.device.iter().map(|v| *v as u64).collect();
    let sparkline = Sparkline::default()
        .data(&data)
        .max(100)
        .style(Style::default().fg(theme.sparkline));
    frame.render_widget(sparkline, rows[4]);
}

fn utilization_gauge(frame: &mut Frame, area: Rect, label: &str, pct: f64, theme: &Theme) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(10), Constraint::Min(1)])
        .split(area);

    frame.render_widget(
        Paragraph::new(Span::styled(
            format!(" {label}"),
            Style::default().fg(theme.text_secondary),
        )),
        columns[0],
    );

    let gauge = Gauge::default()
        .gauge_style(
            Style::default()
                .fg(theme.gauge_filled)
                .bg(theme.gauge_unfilled),
        )
        .ratio((pct / 100.0).clamp(0.0, 1.0))
        .label(format!("{pct:.1}%"));
    frame.render_widget(gauge, columns[1]);
}

fn render_absence(frame: &mut Frame, area: Rect, health: &SourceHealth, theme: &Theme) {
    let (message, color) = match health {
        SourceHealth::Waiting => ("waiting for first sample".to_string(), theme.text_secondary),
        SourceHealth::Down(err) | SourceHealth::Stale(err) => (err.to_string(), theme.err),
        _ => ("no data".to_string(), theme.text_secondary),
    };
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!(" {message}"),
            Style::default().fg(color),
        )),
        area,
    );
}
