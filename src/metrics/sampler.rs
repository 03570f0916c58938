use std::time::Duration;

use sysinfo::System;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::metrics::error::SampleError;
use crate::metrics::gpu;
use crate::metrics::history::{GpuHistory, PowerHistory};
use crate::metrics::info::SystemInfo;
use crate::metrics::model::{
    DOWN_AFTER_FAILURES, GpuState, PowerState, SamplerPhase, SourceHealth,
};
use crate::metrics::platform;
use crate::metrics::power::{self, PowerTick};
use crate::metrics::sample::{GpuSample, MemorySample};
use crate::metrics::source::CommandSource;

/// Hard floor on sampling cadence, keeping a misconfigured refresh rate
/// from hammering the host.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Registry queries are local and quick; a query this slow is wedged.
pub const GPU_FETCH_TIMEOUT: Duration = Duration::from_secs(2);

/// The profiler legitimately blocks for its whole sampling window, so
/// its timeout is the window plus this grace.
pub const POWER_TIMEOUT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct SamplerTiming {
    pub interval: Duration,
    pub timeout: Duration,
}

impl SamplerTiming {
    pub fn gpu(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_SAMPLE_INTERVAL),
            timeout: GPU_FETCH_TIMEOUT,
        }
    }

    pub fn power(window: Duration) -> Self {
        let window = window.max(MIN_SAMPLE_INTERVAL);
        Self {
            interval: window,
            timeout: window + POWER_TIMEOUT_GRACE,
        }
    }
}

/// Cadences and switches for one sampler pair.
#[derive(Debug, Clone, Copy)]
pub struct SamplerOptions {
    pub gpu_interval: Duration,
    pub power_window: Duration,
    pub history_capacity: usize,
    pub power_enabled: bool,
}

/// Out-of-band requests a running sampler honors between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerCommand {
    ClearHistory,
}

/// Cheap handle for poking both samplers from the UI thread.
#[derive(Debug, Clone)]
pub struct HistoryReset {
    gpu: mpsc::UnboundedSender<SamplerCommand>,
    power: mpsc::UnboundedSender<SamplerCommand>,
}

impl HistoryReset {
    /// Handle with no listeners; sends vanish. For paths that run
    /// without live samplers.
    pub fn detached() -> Self {
        let (gpu, _) = mpsc::unbounded_channel();
        let (power, _) = mpsc::unbounded_channel();
        Self { gpu, power }
    }

    pub fn clear_all(&self) {
        let _ = self.gpu.send(SamplerCommand::ClearHistory);
        let _ = self.power.send(SamplerCommand::ClearHistory);
    }
}

/// Running sampler tasks plus the channels they publish on.
pub struct SamplerHandles {
    pub gpu_rx: watch::Receiver<GpuState>,
    pub power_rx: watch::Receiver<PowerState>,
    reset: HistoryReset,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SamplerHandles {
    pub fn reset_handle(&self) -> HistoryReset {
        self.reset.clone()
    }

    /// Signals both tasks and waits for them to finish. An in-flight
    /// child process is killed rather than awaited.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Starts the GPU sampler and, unless disabled, the power sampler. Each
/// task owns its history and publishes whole states; nothing here is
/// shared mutably.
pub fn spawn(system: &SystemInfo, options: SamplerOptions) -> SamplerHandles {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (gpu_tx, gpu_rx) = watch::channel(GpuState::default());
    let (gpu_cmd_tx, gpu_cmd_rx) = mpsc::unbounded_channel();
    let (power_cmd_tx, power_cmd_rx) = mpsc::unbounded_channel();
    let initial_power = if options.power_enabled {
        PowerState::default()
    } else {
        PowerState::disabled()
    };
    let (power_tx, power_rx) = watch::channel(initial_power);

    let mut tasks = Vec::new();

    let gpu_sampler = GpuSampler {
        source: CommandSource::gpu_registry(),
        timing: SamplerTiming::gpu(options.gpu_interval),
        history: GpuHistory::new(options.history_capacity),
        state: GpuState::default(),
        sys: System::new(),
        tx: gpu_tx,
    };
    tasks.push(tokio::spawn(run_gpu(
        gpu_sampler,
        shutdown_rx.clone(),
        gpu_cmd_rx,
    )));

    if options.power_enabled {
        let timing = SamplerTiming::power(options.power_window);
        let power_sampler = PowerSampler {
            source: CommandSource::power_profiler(timing.interval),
            timing,
            history: PowerHistory::new(options.history_capacity),
            state: PowerState::default(),
            max_ane_power_mw: system.max_ane_power_mw(),
            permitted: !platform::needs_elevation(),
            tx: power_tx,
        };
        tasks.push(tokio::spawn(run_power(
            power_sampler,
            shutdown_rx,
            power_cmd_rx,
        )));
    }

    SamplerHandles {
        gpu_rx,
        power_rx,
        reset: HistoryReset {
            gpu: gpu_cmd_tx,
            power: power_cmd_tx,
        },
        shutdown_tx,
        tasks,
    }
}

struct GpuSampler {
    source: CommandSource,
    timing: SamplerTiming,
    history: GpuHistory,
    state: GpuState,
    sys: System,
    tx: watch::Sender<GpuState>,
}

impl GpuSampler {
    fn publish(&self) {
        let _ = self.tx.send(self.state.clone());
    }

    async fn tick(&mut self) {
        // Host memory is a local read; it stays live even when the
        // registry query is failing.
        self.state.memory = Some(MemorySample::read(&mut self.sys));
        self.state.phase = SamplerPhase::Fetching;
        self.publish();

        let outcome = match self.source.fetch(self.timing.timeout).await {
            Ok(raw) => {
                self.state.phase = SamplerPhase::Parsing;
                self.publish();
                gpu::parse_gpu(&raw.stdout).map_err(SampleError::from)
            }
            Err(err) => Err(err),
        };

        apply_gpu_outcome(&mut self.state, &mut self.history, outcome);
        self.publish();
    }

    fn handle_command(&mut self, command: SamplerCommand) {
        match command {
            SamplerCommand::ClearHistory => {
                self.history.clear();
                self.state.history = self.history.view();
                self.publish();
            }
        }
    }
}

struct PowerSampler {
    source: CommandSource,
    timing: SamplerTiming,
    history: PowerHistory,
    state: PowerState,
    max_ane_power_mw: Option<f64>,
    permitted: bool,
    tx: watch::Sender<PowerState>,
}

impl PowerSampler {
    fn publish(&self) {
        let _ = self.tx.send(self.state.clone());
    }

    async fn tick(&mut self) {
        if !self.permitted {
            // The refusal is known up front; spawning just to read the
            // same stderr every tick is wasted work.
            let err = SampleError::PermissionDenied {
                tool: self.source.tool().to_string(),
            };
            apply_power_outcome(&mut self.state, &mut self.history, Err(err));
            self.publish();
            return;
        }

        self.state.phase = SamplerPhase::Fetching;
        self.publish();

        let outcome = match self.source.fetch(self.timing.timeout).await {
            Ok(raw) => {
                self.state.phase = SamplerPhase::Parsing;
                self.publish();
                power::parse_power(&raw.stdout, self.max_ane_power_mw).map_err(SampleError::from)
            }
            Err(err) => Err(err),
        };

        apply_power_outcome(&mut self.state, &mut self.history, outcome);
        self.publish();
    }

    fn handle_command(&mut self, command: SamplerCommand) {
        match command {
            SamplerCommand::ClearHistory => {
                self.history.clear();
                self.state.history = self.history.view();
                self.publish();
            }
        }
    }
}

async fn run_gpu(
    mut sampler: GpuSampler,
    mut shutdown: watch::Receiver<bool>,
    mut commands: mpsc::UnboundedReceiver<SamplerCommand>,
) {
    let mut ticker = tokio::time::interval(sampler.timing.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            maybe_command = commands.recv() => {
                match maybe_command {
                    Some(command) => sampler.handle_command(command),
                    None => break,
                }
                continue;
            }
            _ = ticker.tick() => {}
        }
        // Cancelling the tick drops the fetch future, which drops the
        // child handle and kills the process.
        tokio::select! {
            _ = shutdown.changed() => break,
            () = sampler.tick() => {}
        }
    }
    debug!("gpu sampler stopped");
}

async fn run_power(
    mut sampler: PowerSampler,
    mut shutdown: watch::Receiver<bool>,
    mut commands: mpsc::UnboundedReceiver<SamplerCommand>,
) {
    let mut ticker = tokio::time::interval(sampler.timing.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            maybe_command = commands.recv() => {
                match maybe_command {
                    Some(command) => sampler.handle_command(command),
                    None => break,
                }
                continue;
            }
            _ = ticker.tick() => {}
        }
        tokio::select! {
            _ = shutdown.changed() => break,
            () = sampler.tick() => {}
        }
    }
    debug!("power sampler stopped");
}

fn apply_gpu_outcome(
    state: &mut GpuState,
    history: &mut GpuHistory,
    outcome: Result<GpuSample, SampleError>,
) {
    match outcome {
        Ok(sample) => {
            history.record(&sample);
            state.sample = Some(sample);
            state.history = history.view();
            state.health = SourceHealth::Ok;
            state.consecutive_failures = 0;
            state.phase = SamplerPhase::Published;
        }
        Err(err) => {
            warn!(source = "gpu", error = %err, "sampling tick failed");
            state.consecutive_failures += 1;
            state.health = classify_failure(state.consecutive_failures, err);
            state.phase = SamplerPhase::Idle;
        }
    }
}

fn apply_power_outcome(
    state: &mut PowerState,
    history: &mut PowerHistory,
    outcome: Result<PowerTick, SampleError>,
) {
    match outcome {
        Ok(tick) => {
            // A tick without an ANE line keeps the previous reading; a
            // window can simply be too short to carry one.
            if let Some(ane) = tick.ane {
                history.record_ane(&ane);
                state.ane = Some(ane);
            }
            if let Some(cpu) = tick.cpu {
                history.record_cpu(&cpu);
                state.cpu = Some(cpu);
            }
            state.history = history.view();
            state.health = SourceHealth::Ok;
            state.consecutive_failures = 0;
            state.phase = SamplerPhase::Published;
        }
        Err(err) => {
            warn!(source = "power", error = %err, "sampling tick failed");
            state.consecutive_failures += 1;
            state.health = classify_failure(state.consecutive_failures, err);
            state.phase = SamplerPhase::Idle;
        }
    }
}

/// Values on screen stay trustworthy through a blip; a denied privilege
/// or a run of failures is reported as down.
fn classify_failure(consecutive_failures: u32, err: SampleError) -> SourceHealth {
    if err.is_permission_denied() || consecutive_failures >= DOWN_AFTER_FAILURES {
        SourceHealth::Down(err)
    } else {
        SourceHealth::Stale(err)
    }
}
