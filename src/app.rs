use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::action::Action;
use crate::config::{Config, KeybindsConfig, parse_key};
use crate::metrics::model::MetricsModel;
use crate::metrics::sampler::HistoryReset;
use crate::ui::theme::Theme;

const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct ResolvedKeybinds {
    pub quit: KeyCode,
    pub help: KeyCode,
    pub cycle_theme: KeyCode,
    pub pause: KeyCode,
    pub clear_history: KeyCode,
}

impl ResolvedKeybinds {
    pub fn from_config(kb: &KeybindsConfig) -> Self {
        Self {
            quit: parse_key(&kb.quit).unwrap_or(KeyCode::Char('q')),
            help: parse_key(&kb.help).unwrap_or(KeyCode::Char('?')),
            cycle_theme: parse_key(&kb.cycle_theme).unwrap_or(KeyCode::Char('t')),
            pause: parse_key(&kb.pause).unwrap_or(KeyCode::Char('p')),
            clear_history: parse_key(&kb.clear_history).unwrap_or(KeyCode::Char('c')),
        }
    }

    /// Short (key_label, description) pairs for the status bar pills.
    pub fn pill_entries(&self) -> Vec<(String, &'static str)> {
        vec![
            (key_label(self.quit), "Quit"),
            (key_label(self.help), "Help"),
            (key_label(self.cycle_theme), "Theme"),
            (key_label(self.pause), "Pause"),
            (key_label(self.clear_history), "Clear"),
        ]
    }

    /// Returns (key_label, description) pairs for the help overlay.
    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        vec![
            (key_label(self.quit), "Quit"),
            (key_label(self.help), "Toggle help"),
            (key_label(self.cycle_theme), "Cycle theme"),
            (key_label(self.pause), "Pause display"),
            (key_label(self.clear_history), "Clear sparklines"),
            ("Ctrl+C".to_string(), "Quit (always)"),
        ]
    }
}

fn key_label(code: KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Backspace => "Bksp".to_string(),
        KeyCode::Delete => "Del".to_string(),
        _ => "?".to_string(),
    }
}

pub struct App {
    pub running: bool,
    /// Freezes what the screen shows; the samplers keep running and the
    /// next sync catches up.
    pub paused: bool,
    pub show_help: bool,
    pub model: MetricsModel,
    pub theme: Theme,
    pub status_message: Option<(String, Instant)>,
    pub keybinds: ResolvedKeybinds,
    reset: HistoryReset,
}

impl App {
    pub fn new(config: &Config, model: MetricsModel, reset: HistoryReset) -> Self {
        App {
            running: true,
            paused: false,
            show_help: false,
            model,
            theme: Theme::from_name(&config.colors.theme),
            status_message: None,
            keybinds: ResolvedKeybinds::from_config(&config.keybinds),
            reset,
        }
    }

    pub fn map_key(&self, key: KeyEvent) -> Action {
        // Ctrl+C always quits (hardwired safety)
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }

        if self.show_help {
            // Only the help key and Esc dismiss; everything else is ignored
            if key.code == self.keybinds.help || key.code == KeyCode::Esc {
                return Action::ToggleHelp;
            }
            return Action::None;
        }

        let code = key.code;
        let kb = &self.keybinds;
        if code == kb.quit {
            return Action::Quit;
        }
        if code == kb.help {
            return Action::ToggleHelp;
        }
        if code == kb.cycle_theme {
            return Action::CycleTheme;
        }
        if code == kb.pause {
            return Action::TogglePause;
        }
        if code == kb.clear_history {
            return Action::ClearHistory;
        }
        Action::None
    }

    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::TogglePause => {
                self.paused = !self.paused;
                let message = if self.paused {
                    "Display paused"
                } else {
                    "Display resumed"
                };
                self.set_status(message);
            }
            Action::CycleTheme => {
                self.theme = self.theme.next();
                self.set_status(format!("Theme: {}", self.theme.name));
            }
            Action::ClearHistory => {
                self.reset.clear_all();
                self.set_status("Sparkline history cleared");
            }
            Action::None => {}
        }
    }

    /// Runs on the render cadence: pull the samplers' latest states
    /// unless paused, and expire old status messages.
    pub fn on_render_tick(&mut self) {
        if !self.paused {
            self.model.sync();
        }
        if let Some((_, created)) = &self.status_message
            && created.elapsed() >= STATUS_MESSAGE_TTL
        {
            self.status_message = None;
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        self.keybinds.help_entries()
    }
}
