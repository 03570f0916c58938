use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph, Sparkline};

use crate::format::{format_freq_mhz, format_pct, format_power_mw};
use crate::metrics::model::{PowerState, SourceHealth};
use crate::ui::health_color;
use crate::ui::theme::Theme;

pub fn render(frame: &mut Frame, area: Rect, state: &PowerState, theme: &Theme) {
    let title = Line::from(vec![
        Span::styled(
            " ANE / POWER ",
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

    if state.needs_elevation() {
        let lines = vec![
            Line::from(Span::styled(
                " ANE metrics need elevated privileges",
                Style::default().fg(theme.warn).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                " restart with: sudo agxtop",
                Style::default().fg(theme.text_secondary),
            )),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
        return;
    }

    if state.health == SourceHealth::Disabled {
        frame.render_widget(
            Paragraph::new(Span::styled(
                " power sampling disabled",
                Style::default().fg(theme.text_secondary),
            )),
            inner,
        );
        return;
    }

    if state.ane.is_none() && state.cpu.is_none() {
        render_absence(frame, inner, &state.health, theme);
        return;
    }

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

    if let Some(ane) = &state.ane {
        ane_gauge(frame, rows[0], ane.power_mw, ane.utilization_pct, theme);
    }

    if let Some(cpu) = &state.cpu {
        cluster_line(
            frame,
            rows[1],
            "E-cores",
            cpu.e_cluster_active_pct,
            cpu.e_cluster_freq_mhz,
            theme,
        );
        cluster_line(
            frame,
            rows[2],
            "P-cores",
            cpu.p_cluster_active_pct,
            cpu.p_cluster_freq_mhz,
            theme,
        );
        if let Some(mw) = cpu.cpu_power_mw {
            let line = Line::from(vec![
                Span::styled(" cpu power ", Style::default().fg(theme.text_secondary)),
                Span::styled(format_power_mw(mw), Style::default().fg(theme.text_primary)),
            ]);
            frame.render_widget(Paragraph::new(line), rows[3]);
        }
    }

    let data: Vec<u64> = state.history.ane_power.iter().map(|v| *v as u64).collect();
    let sparkline = Sparkline::default()
        .data(&data)
        .style(Style::default().fg(theme.sparkline));
    frame.render_widget(sparkline, rows[4]);
}

/// The utilization bar when the chip's rated power is known; just the
/// wattage when it is not.
fn ane_gauge(frame: &mut Frame, area: Rect, power_mw: f64, pct: Option<f64>, theme: &Theme) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(10), Constraint::Min(1)])
        .split(area);

    frame.render_widget(
        Paragraph::new(Span::styled(
            " ane     ",
            Style::default().fg(theme.text_secondary),
        )),
        columns[0],
    );

    match pct {
        Some(pct) => {
            let gauge = Gauge::default()
                .gauge_style(
                    Style::default()
                        .fg(theme.gauge_filled)
                        .bg(theme.gauge_unfilled),
                )
                .ratio((pct / 100.0).clamp(0.0, 1.0))
                .label(format!("{} ({})", format_power_mw(power_mw), format_pct(pct)));
            frame.render_widget(gauge, columns[1]);
        }
        None => {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!("{} (utilization unknown)", format_power_mw(power_mw)),
                    Style::default().fg(theme.text_primary),
                )),
                columns[1],
            );
        }
    }
}

fn cluster_line(frame: &mut Frame, area: Rect, label: &str, pct: f64, mhz: u32, theme: &Theme) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {label}   "),
            Style::default().fg(theme.text_secondary),
        ),
        Span::styled(format_pct(pct), Style::default().fg(theme.text_primary)),
        Span::styled(
            format!(" @ {}", format_freq_mhz(mhz)),
            Style::default().fg(theme.text_secondary),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
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
