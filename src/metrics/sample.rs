use std::time::Instant;

use sysinfo::System;

/// One GPU reading taken from the accelerator's performance statistics.
///
/// Snapshots are immutable: a new sampling tick produces a new value, the
/// previous one is replaced wholesale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuSample {
    /// Overall busy percentage, 0-100.
    pub device_utilization: f64,
    /// Shading work busy percentage, 0-100.
    pub renderer_utilization: f64,
    /// Geometry/tiling work busy percentage, 0-100.
    pub tiler_utilization: f64,
    pub memory_in_use_bytes: u64,
    /// Always >= `memory_in_use_bytes`; enforced at parse time.
    pub memory_allocated_bytes: u64,
    pub recovery_count: Option<u64>,
    pub split_scene_count: Option<u64>,
    pub tiled_scene_bytes: Option<u64>,
    pub sampled_at: Instant,
}

/// One Neural Engine reading derived from powermetrics.
///
/// Utilization is estimated from power draw; it is `None` when the chip
/// family (and therefore its rated power) is unknown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AneSample {
    pub power_mw: f64,
    /// 0-100, clamped; `None` when no rated power is known for the chip.
    pub utilization_pct: Option<f64>,
    pub sampled_at: Instant,
}

impl AneSample {
    pub fn new(power_mw: f64, max_rated_power_mw: Option<f64>) -> Self {
        let utilization_pct = max_rated_power_mw
            .filter(|max| *max > 0.0)
            .map(|max| (power_mw / max * 100.0).clamp(0.0, 100.0));
        Self {
            power_mw,
            utilization_pct,
            sampled_at: Instant::now(),
        }
    }
}

/// CPU cluster activity reported by the same powermetrics invocation that
/// carries the ANE line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSample {
    pub e_cluster_active_pct: f64,
    pub p_cluster_active_pct: f64,
    pub e_cluster_freq_mhz: u32,
    pub p_cluster_freq_mhz: u32,
    pub cpu_power_mw: Option<f64>,
    pub sampled_at: Instant,
}

/// Host memory usage, refreshed on the GPU sampler's tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySample {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub swap_total_bytes: u64,
    pub swap_used_bytes: u64,
}

impl MemorySample {
    pub fn read(sys: &mut System) -> Self {
        sys.refresh_memory();
        Self {
            total_bytes: sys.total_memory(),
            used_bytes: sys.used_memory(),
            swap_total_bytes: sys.total_swap(),
            swap_used_bytes: sys.used_swap(),
        }
    }

    pub fn usage_ratio(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.used_bytes as f64 / self.total_bytes as f64).clamp(0.0, 1.0)
    }
}
