use std::time::Instant;

use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;
use tokio::sync::watch;

use crate::app::{App, ResolvedKeybinds};
use crate::config::{Config, KeybindsConfig};
use crossterm::event::KeyCode;
use crate::metrics::error::SampleError;
use crate::metrics::history::{GpuHistoryView, PowerHistoryView};
use crate::metrics::info::{ChipFamily, SystemInfo};
use crate::metrics::model::{GpuState, MetricsModel, PowerState, SourceHealth};
use crate::metrics::sample::{AneSample, CpuSample, GpuSample, MemorySample};
use crate::metrics::sampler::HistoryReset;
use crate::ui::theme::Theme;
use crate::ui::{self, gpu_panel, header, help, power_panel, statusbar};

fn buffer_to_string(buf: &ratatui::buffer::Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in 0..area.height {
        for x in 0..area.width {
            let cell = buf.cell((x, y)).unwrap();
            out.push_str(cell.symbol());
        }
        if y + 1 < area.height {
            out.push('\n');
        }
    }
    out
}

fn render_to_string<F>(width: u16, height: u16, draw: F) -> String
where
    F: FnOnce(&mut ratatui::Frame),
{
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(draw).unwrap();
    let buf = terminal.backend().buffer();
    buffer_to_string(buf)
}

fn make_system() -> SystemInfo {
    SystemInfo {
        chip_name: "Apple M2".to_string(),
        chip_family: ChipFamily::M2,
        cpu_cores: 8,
        gpu_cores: Some(10),
        ane_present: true,
        memory_total_bytes: 17_179_869_184,
        hostname: Some("studio.local".to_string()),
    }
}

fn make_gpu_sample() -> GpuSample {
    GpuSample {
        device_utilization: 42.0,
        renderer_utilization: 10.0,
        tiler_utilization: 5.0,
        memory_in_use_bytes: 1_073_741_824,
        memory_allocated_bytes: 2_147_483_648,
        recovery_count: Some(0),
        split_scene_count: None,
        tiled_scene_bytes: None,
        sampled_at: Instant::now(),
    }
}

fn make_gpu_state() -> GpuState {
    GpuState {
        sample: Some(make_gpu_sample()),
        memory: Some(MemorySample {
            total_bytes: 17_179_869_184,
            used_bytes: 8_589_934_592,
            swap_total_bytes: 0,
            swap_used_bytes: 0,
        }),
        history: GpuHistoryView {
            device: vec![10.0, 42.0],
            renderer: vec![5.0, 10.0],
            tiler: vec![1.0, 5.0],
            memory_used: vec![900_000_000.0, 1_073_741_824.0],
        },
        health: SourceHealth::Ok,
        consecutive_failures: 0,
        ..GpuState::default()
    }
}

fn make_power_state() -> PowerState {
    PowerState {
        ane: Some(AneSample::new(2500.0, Some(10000.0))),
        cpu: Some(CpuSample {
            e_cluster_active_pct: 40.7,
            p_cluster_active_pct: 22.1,
            e_cluster_freq_mhz: 1187,
            p_cluster_freq_mhz: 2064,
            cpu_power_mw: Some(240.0),
            sampled_at: Instant::now(),
        }),
        history: PowerHistoryView {
            ane_power: vec![1000.0, 2500.0],
            ane_utilization: vec![10.0, 25.0],
            e_cluster: vec![30.0, 40.7],
            p_cluster: vec![18.0, 22.1],
        },
        health: SourceHealth::Ok,
        ..PowerState::default()
    }
}

fn make_model(gpu: GpuState, power: PowerState) -> MetricsModel {
    let (_gpu_tx, gpu_rx) = watch::channel(GpuState::default());
    let (_power_tx, power_rx) = watch::channel(PowerState::default());
    let mut model = MetricsModel::new(make_system(), gpu_rx, power_rx);
    model.gpu = gpu;
    model.power = power;
    model
}

fn theme() -> Theme {
    Theme::from_name("dark")
}

fn default_keybinds() -> ResolvedKeybinds {
    ResolvedKeybinds::from_config(&KeybindsConfig::default())
}

#[test]
fn header_shows_chip_ram_and_hostname() {
    let model = make_model(make_gpu_state(), make_power_state());
    let output = render_to_string(100, 4, |frame| {
        header::render(frame, Rect::new(0, 0, 100, 4), &model, &theme(), false);
    });

    assert!(output.contains("agxtop"));
    assert!(output.contains("Apple M2"));
    assert!(output.contains("8 CPU / 10 GPU"));
    assert!(output.contains("studio.local"));
    assert!(output.contains("8.0 GB / 16.0 GB (50%)"));
    assert!(output.contains("GPU MEM 1.0 GB"));
}

#[test]
fn header_marks_a_paused_display() {
    let model = make_model(make_gpu_state(), make_power_state());
    let output = render_to_string(100, 4, |frame| {
        header::render(frame, Rect::new(0, 0, 100, 4), &model, &theme(), true);
    });
    assert!(output.contains("PAUSED"));
}

#[test]
fn gpu_panel_renders_gauges_and_memory() {
    let state = make_gpu_state();
    let output = render_to_string(60, 10, |frame| {
        gpu_panel::render(frame, Rect::new(0, 0, 60, 10), &state, &theme());
    });

    assert!(output.contains("GPU"));
    assert!(output.contains("[ok]"));
    assert!(output.contains("device"));
    assert!(output.contains("42.0%"));
    assert!(output.contains("renderer"));
    assert!(output.contains("10.0%"));
    assert!(output.contains("tiler"));
    assert!(output.contains("5.0%"));
    assert!(output.contains("1.0 GB / 2.0 GB"));
}

#[test]
fn gpu_panel_waiting_state_before_first_sample() {
    let state = GpuState::default();
    let output = render_to_string(60, 8, |frame| {
        gpu_panel::render(frame, Rect::new(0, 0, 60, 8), &state, &theme());
    });
    assert!(output.contains("[wait]"));
    assert!(output.contains("waiting for first sample"));
}

#[test]
fn gpu_panel_down_state_names_the_problem() {
    let state = GpuState {
        health: SourceHealth::Down(SampleError::SourceUnavailable {
            tool: "ioreg".into(),
        }),
        ..GpuState::default()
    };
    let output = render_to_string(60, 8, |frame| {
        gpu_panel::render(frame, Rect::new(0, 0, 60, 8), &state, &theme());
    });
    assert!(output.contains("[down]"));
    assert!(output.contains("ioreg not found"));
}

#[test]
fn power_panel_renders_ane_and_clusters() {
    let state = make_power_state();
    let output = render_to_string(60, 10, |frame| {
        power_panel::render(frame, Rect::new(0, 0, 60, 10), &state, &theme());
    });

    assert!(output.contains("ANE / POWER"));
    assert!(output.contains("2.50 W (25.0%)"));
    assert!(output.contains("E-cores"));
    assert!(output.contains("40.7% @ 1.19 GHz"));
    assert!(output.contains("P-cores"));
    assert!(output.contains("22.1% @ 2.06 GHz"));
    assert!(output.contains("240 mW"));
}

#[test]
fn power_panel_without_rated_power_shows_wattage_only() {
    let state = PowerState {
        ane: Some(AneSample::new(1234.0, None)),
        health: SourceHealth::Ok,
        ..PowerState::default()
    };
    let output = render_to_string(70, 8, |frame| {
        power_panel::render(frame, Rect::new(0, 0, 70, 8), &state, &theme());
    });
    assert!(output.contains("1.23 W (utilization unknown)"));
}

#[test]
fn power_panel_permission_denied_asks_for_sudo() {
    let state = PowerState {
        health: SourceHealth::Down(SampleError::PermissionDenied {
            tool: "powermetrics".into(),
        }),
        ..PowerState::default()
    };
    let output = render_to_string(60, 8, |frame| {
        power_panel::render(frame, Rect::new(0, 0, 60, 8), &state, &theme());
    });
    assert!(output.contains("[sudo]"));
    assert!(output.contains("elevated privileges"));
    assert!(output.contains("sudo agxtop"));
}

#[test]
fn power_panel_disabled_state() {
    let state = PowerState::disabled();
    let output = render_to_string(60, 8, |frame| {
        power_panel::render(frame, Rect::new(0, 0, 60, 8), &state, &theme());
    });
    assert!(output.contains("[off]"));
    assert!(output.contains("power sampling disabled"));
}

#[test]
fn statusbar_shows_pills_and_health_badges() {
    let model = make_model(make_gpu_state(), make_power_state());
    let output = render_to_string(100, 1, |frame| {
        statusbar::render(
            frame,
            Rect::new(0, 0, 100, 1),
            None,
            &default_keybinds(),
            &model,
            &theme(),
        );
    });
    assert!(output.contains(" q "));
    assert!(output.contains("Quit"));
    assert!(output.contains("Pause"));
    assert!(output.contains("gpu:ok ane:ok"));
}

#[test]
fn statusbar_pills_follow_remapped_keybinds() {
    let model = make_model(make_gpu_state(), make_power_state());
    let mut keybinds = default_keybinds();
    keybinds.quit = KeyCode::Char('x');
    let output = render_to_string(100, 1, |frame| {
        statusbar::render(
            frame,
            Rect::new(0, 0, 100, 1),
            None,
            &keybinds,
            &model,
            &theme(),
        );
    });
    assert!(output.contains(" x "));
    assert!(!output.contains(" q "));
    assert!(output.contains("Quit"));
}

#[test]
fn statusbar_surfaces_a_persistent_problem() {
    let power = PowerState {
        health: SourceHealth::Down(SampleError::PermissionDenied {
            tool: "powermetrics".into(),
        }),
        ..PowerState::default()
    };
    let model = make_model(make_gpu_state(), power);
    let output = render_to_string(100, 1, |frame| {
        statusbar::render(
            frame,
            Rect::new(0, 0, 100, 1),
            None,
            &default_keybinds(),
            &model,
            &theme(),
        );
    });
    assert!(output.contains("restart with sudo"));
}

#[test]
fn statusbar_ephemeral_message_wins() {
    let power = PowerState {
        health: SourceHealth::Down(SampleError::PermissionDenied {
            tool: "powermetrics".into(),
        }),
        ..PowerState::default()
    };
    let model = make_model(make_gpu_state(), power);
    let message = ("Display paused".to_string(), Instant::now());
    let output = render_to_string(100, 1, |frame| {
        statusbar::render(
            frame,
            Rect::new(0, 0, 100, 1),
            Some(&message),
            &default_keybinds(),
            &model,
            &theme(),
        );
    });
    assert!(output.contains("Display paused"));
    assert!(!output.contains("sudo"));
}

#[test]
fn help_overlay_lists_entries() {
    let entries = vec![
        ("q".to_string(), "Quit"),
        ("?".to_string(), "Toggle help"),
    ];
    let output = render_to_string(60, 12, |frame| {
        help::render(frame, Rect::new(0, 0, 60, 12), &entries, &theme());
    });
    assert!(output.contains("Keybinds"));
    assert!(output.contains("Quit"));
    assert!(output.contains("Toggle help"));
}

#[test]
fn full_draw_smoke_with_populated_model() {
    let model = make_model(make_gpu_state(), make_power_state());
    let app = App::new(&Config::default(), model, HistoryReset::detached());
    let output = render_to_string(120, 30, |frame| {
        ui::draw(frame, &app);
    });
    assert!(output.contains("agxtop"));
    assert!(output.contains("GPU"));
    assert!(output.contains("ANE / POWER"));
    assert!(output.contains("Quit"));
}

#[test]
fn full_draw_survives_a_tiny_terminal() {
    let model = make_model(GpuState::default(), PowerState::default());
    let app = App::new(&Config::default(), model, HistoryReset::detached());
    // Must not panic on degenerate areas
    let _ = render_to_string(20, 6, |frame| {
        ui::draw(frame, &app);
    });
}
