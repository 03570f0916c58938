pub mod gpu_panel;
pub mod header;
pub mod help;
pub mod power_panel;
pub mod statusbar;
pub mod theme;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Color;

use crate::app::App;
use crate::metrics::model::SourceHealth;
use crate::ui::theme::Theme;

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    header::render(frame, chunks[0], &app.model, &app.theme, app.paused);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    gpu_panel::render(frame, panels[0], &app.model.gpu, &app.theme);
    power_panel::render(frame, panels[1], &app.model.power, &app.theme);

    statusbar::render(
        frame,
        chunks[2],
        app.status_message.as_ref(),
        &app.keybinds,
        &app.model,
        &app.theme,
    );

    // Help overlay last so it sits on top of everything
    if app.show_help {
        help::render(frame, frame.area(), &app.help_entries(), &app.theme);
    }
}

pub(crate) fn health_color(health: &SourceHealth, theme: &Theme) -> Color {
    match health {
        SourceHealth::Ok => theme.ok,
        SourceHealth::Waiting | SourceHealth::Disabled => theme.text_secondary,
        SourceHealth::Stale(_) => theme.warn,
        SourceHealth::Down(_) => theme.err,
    }
}

#[cfg(test)]
mod tests;
