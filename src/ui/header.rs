use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph, Sparkline};

use crate::format::{format_bytes, truncate_unicode};
use crate::metrics::model::MetricsModel;
use crate::ui::theme::Theme;

pub fn render(frame: &mut Frame, area: Rect, model: &MetricsModel, theme: &Theme, paused: bool) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(area);

    render_branding(frame, chunks[0], model, theme, paused);
    render_ram_gauge(frame, chunks[1], model, theme);
    render_gpu_memory_sparkline(frame, chunks[2], model, theme);
}

fn render_branding(
    frame: &mut Frame,
    area: Rect,
    model: &MetricsModel,
    theme: &Theme,
    paused: bool,
) {
    let block = bordered_block(theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let sys = &model.system;
    let mut spans = vec![Span::styled(
        " agxtop ",
        Style::default()
            .fg(theme.accent_fg)
            .bg(theme.accent_bg)
            .add_modifier(Modifier::BOLD),
    )];

    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        truncate_unicode(&sys.chip_name, 24),
        Style::default()
            .fg(theme.text_primary)
            .add_modifier(Modifier::BOLD),
    ));

    let mut facts = format!("  {} CPU", sys.cpu_cores);
    if let Some(cores) = sys.gpu_cores {
        facts.push_str(&format!(" / {cores} GPU"));
    }
    spans.push(Span::styled(
        facts,
        Style::default().fg(theme.text_secondary),
    ));

    let mut second = Vec::new();
    if let Some(hostname) = &sys.hostname {
        second.push(Span::styled(
            format!(" {}", truncate_unicode(hostname, 30)),
            Style::default().fg(theme.text_secondary),
        ));
    }
    if paused {
        second.push(Span::raw("  "));
        second.push(Span::styled(
            " PAUSED ",
            Style::default()
                .fg(theme.accent_fg)
                .bg(theme.warn)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let mut lines = vec![Line::from(spans)];
    if !second.is_empty() {
        lines.push(Line::from(second));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_ram_gauge(frame: &mut Frame, area: Rect, model: &MetricsModel, theme: &Theme) {
    let block = bordered_block(theme).title(Span::styled(
        " RAM ",
        Style::default()
            .fg(theme.text_secondary)
            .add_modifier(Modifier::BOLD),
    ));

    let Some(memory) = &model.gpu.memory else {
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {} total", format_bytes(model.system.memory_total_bytes)),
                Style::default().fg(theme.text_secondary),
            )),
            inner,
        );
        return;
    };

    let gauge = Gauge::default()
        .block(block)
        .gauge_style(
            Style::default()
                .fg(theme.gauge_filled)
                .bg(theme.gauge_unfilled),
        )
        .ratio(memory.usage_ratio())
        .label(format!(
            "{} / {} ({:.0}%)",
            format_bytes(memory.used_bytes),
            format_bytes(memory.total_bytes),
            memory.usage_ratio() * 100.0
        ));

    frame.render_widget(gauge, area);
}

fn render_gpu_memory_sparkline(frame: &mut Frame, area: Rect, model: &MetricsModel, theme: &Theme) {
    let title = match &model.gpu.sample {
        Some(gpu) => format!(" GPU MEM {} ", format_bytes(gpu.memory_in_use_bytes)),
        None => " GPU MEM ".to_string(),
    };
    let block = bordered_block(theme).title(Span::styled(
        title,
        Style::default()
            .fg(theme.text_secondary)
            .add_modifier(Modifier::BOLD),
    ));

    let data: Vec<u64> = model
        .gpu
        .history
        .memory_used
        .iter()
        .map(|v| *v as u64)
        .collect();
    let max = model
        .gpu
        .sample
        .map(|gpu| gpu.memory_allocated_bytes)
        .filter(|allocated| *allocated > 0);

    let mut sparkline = Sparkline::default()
        .block(block)
        .data(&data)
        .style(Style::default().fg(theme.sparkline));
    if let Some(max) = max {
        sparkline = sparkline.max(max);
    }

    frame.render_widget(sparkline, area);
}

fn bordered_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
}
