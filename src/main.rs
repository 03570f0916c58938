use std::path::PathBuf;
use std::time::Duration;

use agxtop::app::App;
use agxtop::config::{self, load_config, load_config_from_path};
use agxtop::event::{Event, EventHandler, RENDER_INTERVAL};
use agxtop::metrics::gpu;
use agxtop::metrics::info::SystemInfo;
use agxtop::metrics::model::{MetricsModel, SourceHealth};
use agxtop::metrics::sampler::{self, GPU_FETCH_TIMEOUT, SamplerOptions};
use agxtop::metrics::source::CommandSource;
use agxtop::{report, ui};
use clap::Parser;
use color_eyre::Result;
use sysinfo::System;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "agxtop",
    about = "Terminal dashboard for Apple Silicon GPU and Neural Engine utilization"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// GPU sampling interval in milliseconds
    #[arg(long)]
    refresh_rate: Option<u64>,

    /// Power profiler sampling window in milliseconds
    #[arg(long)]
    powermetrics_rate: Option<u64>,

    /// Skip the power profiler entirely (no ANE or CPU cluster data)
    #[arg(long, default_value_t = false)]
    no_powermetrics: bool,

    /// Color theme (dark, light, mono)
    #[arg(long)]
    theme: Option<String>,

    /// Take one sample, print raw values, and exit
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Append tracing diagnostics to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(&cli)?;
    let config = load_config_for_cli(&cli);

    let system = capture_system_info().await;
    let options = SamplerOptions {
        gpu_interval: Duration::from_millis(config.general.refresh_rate_ms),
        power_window: Duration::from_millis(config.general.powermetrics_rate_ms),
        history_capacity: config.general.sparkline_length,
        power_enabled: !config.general.disable_powermetrics,
    };
    let handles = sampler::spawn(&system, options);
    let reset = handles.reset_handle();
    let model = MetricsModel::new(system, handles.gpu_rx.clone(), handles.power_rx.clone());

    if cli.once {
        let result = run_once(model, &options).await;
        handles.shutdown().await;
        return result;
    }

    let mut terminal = ratatui::init();
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let app = App::new(&config, model, reset);
    let result = run(&mut terminal, app).await;

    ratatui::restore();
    handles.shutdown().await;

    result
}

async fn run(terminal: &mut ratatui::DefaultTerminal, mut app: App) -> Result<()> {
    let mut events = EventHandler::new(RENDER_INTERVAL);

    terminal.draw(|frame| ui::draw(frame, &app))?;

    while app.running {
        if let Some(event) = events.next().await {
            match event {
                Event::Key(key) => {
                    if key.kind == crossterm::event::KeyEventKind::Press {
                        let action = app.map_key(key);
                        app.dispatch(action);
                        terminal.draw(|frame| ui::draw(frame, &app))?;
                    }
                }
                Event::Render => {
                    app.on_render_tick();
                    terminal.draw(|frame| ui::draw(frame, &app))?;
                }
                Event::Resize => {
                    terminal.draw(|frame| ui::draw(frame, &app))?;
                }
            }
        }
    }

    Ok(())
}

/// Waits for each sampler's first verdict, then prints the raw values.
async fn run_once(mut model: MetricsModel, options: &SamplerOptions) -> Result<()> {
    let mut gpu_rx = model.gpu_receiver();
    let gpu_budget = GPU_FETCH_TIMEOUT + Duration::from_secs(1);
    let _ = tokio::time::timeout(
        gpu_budget,
        gpu_rx.wait_for(|state| state.health != SourceHealth::Waiting),
    )
    .await;

    if options.power_enabled {
        let mut power_rx = model.power_receiver();
        let power_budget = options.power_window + Duration::from_secs(4);
        let _ = tokio::time::timeout(
            power_budget,
            power_rx.wait_for(|state| state.health != SourceHealth::Waiting),
        )
        .await;
    }

    model.sync();
    print!("{}", report::render(&model));
    Ok(())
}

/// Captures the immutable facts once; the GPU core count comes from a
/// single registry probe and is simply absent when the probe fails.
async fn capture_system_info() -> SystemInfo {
    let mut sys = System::new();
    sys.refresh_cpu_all();
    sys.refresh_memory();

    let probe = CommandSource::gpu_registry();
    let gpu_cores = match probe.fetch(GPU_FETCH_TIMEOUT).await {
        Ok(raw) => gpu::gpu_core_count(&raw.stdout),
        Err(err) => {
            debug!(error = %err, "gpu core count probe failed");
            None
        }
    };

    SystemInfo::capture(&sys, gpu_cores)
}

fn load_config_for_cli(cli: &Cli) -> config::Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(rate) = cli.refresh_rate {
        config.general.refresh_rate_ms = rate;
    }
    if let Some(rate) = cli.powermetrics_rate {
        config.general.powermetrics_rate_ms = rate;
    }
    if cli.no_powermetrics {
        config.general.disable_powermetrics = true;
    }
    if let Some(theme) = &cli.theme {
        config.colors.theme = theme.clone();
    }

    config
}

fn init_tracing(cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.log_file {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::options().create(true).append(true).open(path)?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();
    } else if cli.once {
        // Diagnostics may share the terminal with the report output only
        // because there is no dashboard to corrupt.
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .init();
    }
    Ok(())
}
