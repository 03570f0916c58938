use tokio::sync::watch;

use crate::metrics::error::SampleError;
use crate::metrics::history::{GpuHistoryView, PowerHistoryView};
use crate::metrics::info::SystemInfo;
use crate::metrics::sample::{AneSample, CpuSample, GpuSample, MemorySample};

/// Where a sampler currently is in its tick. Published alongside the
/// values so the UI can show in-flight activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerPhase {
    #[default]
    Idle,
    Fetching,
    Parsing,
    Published,
}

/// Consecutive failures before a source is considered down rather than
/// merely stale.
pub const DOWN_AFTER_FAILURES: u32 = 3;

/// Health of one source as seen by readers. A single failed tick keeps
/// the last good values on screen; only a run of failures (or a denied
/// privilege) escalates.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SourceHealth {
    /// No tick has completed yet.
    #[default]
    Waiting,
    Ok,
    /// Recent failure; displayed values are the last good ones.
    Stale(SampleError),
    /// Persistent failure, or a denied privilege that will not heal.
    Down(SampleError),
    /// Sampling was turned off for this source.
    Disabled,
}

impl SourceHealth {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn error(&self) -> Option<&SampleError> {
        match self {
            Self::Stale(err) | Self::Down(err) => Some(err),
            _ => None,
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            Self::Waiting => "wait",
            Self::Ok => "ok",
            Self::Stale(_) => "stale",
            Self::Down(err) if err.is_permission_denied() => "sudo",
            Self::Down(_) => "down",
            Self::Disabled => "off",
        }
    }
}

/// Everything the GPU sampler publishes per tick, cloned wholesale into
/// the watch channel so readers always see one coherent tick.
#[derive(Debug, Clone, Default)]
pub struct GpuState {
    pub sample: Option<GpuSample>,
    pub memory: Option<MemorySample>,
    pub history: GpuHistoryView,
    pub health: SourceHealth,
    pub consecutive_failures: u32,
    pub phase: SamplerPhase,
}

/// Counterpart for the power sampler. `ane` survives ticks whose window
/// carried no ANE line; it is only replaced by a newer reading.
#[derive(Debug, Clone, Default)]
pub struct PowerState {
    pub ane: Option<AneSample>,
    pub cpu: Option<CpuSample>,
    pub history: PowerHistoryView,
    pub health: SourceHealth,
    pub consecutive_failures: u32,
    pub phase: SamplerPhase,
}

impl PowerState {
    pub fn disabled() -> Self {
        Self {
            health: SourceHealth::Disabled,
            ..Self::default()
        }
    }

    pub fn needs_elevation(&self) -> bool {
        matches!(&self.health, SourceHealth::Down(err) if err.is_permission_denied())
    }
}

/// Aggregate the renderer reads. `sync` pulls whatever the samplers last
/// published; it never blocks and never tears a tick apart.
#[derive(Debug)]
pub struct MetricsModel {
    pub system: SystemInfo,
    pub gpu: GpuState,
    pub power: PowerState,
    gpu_rx: watch::Receiver<GpuState>,
    power_rx: watch::Receiver<PowerState>,
}

impl MetricsModel {
    pub fn new(
        system: SystemInfo,
        gpu_rx: watch::Receiver<GpuState>,
        power_rx: watch::Receiver<PowerState>,
    ) -> Self {
        let gpu = gpu_rx.borrow().clone();
        let power = power_rx.borrow().clone();
        Self {
            system,
            gpu,
            power,
            gpu_rx,
            power_rx,
        }
    }

    /// Refreshes the local copies from the samplers' channels. Called on
    /// the render cadence, which is independent of both sampling rates.
    pub fn sync(&mut self) {
        self.gpu = self.gpu_rx.borrow().clone();
        self.power = self.power_rx.borrow().clone();
    }

    /// Fresh receiver for callers that want to await a publication
    /// instead of polling through `sync`.
    pub fn gpu_receiver(&self) -> watch::Receiver<GpuState> {
        self.gpu_rx.clone()
    }

    pub fn power_receiver(&self) -> watch::Receiver<PowerState> {
        self.power_rx.clone()
    }

    /// One line for the status bar, worst problem first. `None` when
    /// everything is healthy enough to speak for itself.
    pub fn status_line(&self) -> Option<String> {
        if self.power.needs_elevation() {
            return Some("ANE metrics need elevated privileges, restart with sudo".to_string());
        }
        if let SourceHealth::Down(err) = &self.gpu.health {
            return Some(format!("gpu source down: {err}"));
        }
        if let SourceHealth::Down(err) = &self.power.health {
            return Some(format!("power source down: {err}"));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> (
        watch::Sender<GpuState>,
        watch::Sender<PowerState>,
        MetricsModel,
    ) {
        let (gpu_tx, gpu_rx) = watch::channel(GpuState::default());
        let (power_tx, power_rx) = watch::channel(PowerState::default());
        let sys = sysinfo::System::new();
        let model = MetricsModel::new(SystemInfo::capture(&sys, None), gpu_rx, power_rx);
        (gpu_tx, power_tx, model)
    }

    #[test]
    fn sync_picks_up_published_state() {
        let (gpu_tx, _power_tx, mut model) = channels();
        assert_eq!(model.gpu.health, SourceHealth::Waiting);

        let next = GpuState {
            health: SourceHealth::Ok,
            ..GpuState::default()
        };
        gpu_tx.send(next).unwrap();

        model.sync();
        assert!(model.gpu.health.is_ok());
    }

    #[test]
    fn permission_denied_wins_the_status_line() {
        let (gpu_tx, power_tx, mut model) = channels();
        let gpu = GpuState {
            health: SourceHealth::Down(SampleError::SourceUnavailable {
                tool: "ioreg".into(),
            }),
            ..GpuState::default()
        };
        gpu_tx.send(gpu).unwrap();
        let power = PowerState {
            health: SourceHealth::Down(SampleError::PermissionDenied {
                tool: "powermetrics".into(),
            }),
            ..PowerState::default()
        };
        power_tx.send(power).unwrap();

        model.sync();
        let line = model.status_line().unwrap();
        assert!(line.contains("sudo"));
    }

    #[test]
    fn stale_sources_do_not_raise_a_banner() {
        let (gpu_tx, _power_tx, mut model) = channels();
        let gpu = GpuState {
            health: SourceHealth::Stale(SampleError::SourceTimeout {
                tool: "ioreg".into(),
                waited: std::time::Duration::from_secs(2),
            }),
            ..GpuState::default()
        };
        gpu_tx.send(gpu).unwrap();
        model.sync();
        assert_eq!(model.status_line(), None);
    }

    #[test]
    fn health_badges_are_stable_labels() {
        assert_eq!(SourceHealth::Waiting.badge(), "wait");
        assert_eq!(SourceHealth::Ok.badge(), "ok");
        assert_eq!(
            SourceHealth::Down(SampleError::PermissionDenied {
                tool: "powermetrics".into()
            })
            .badge(),
            "sudo"
        );
        assert_eq!(SourceHealth::Disabled.badge(), "off");
    }
}
