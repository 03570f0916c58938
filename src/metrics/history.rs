use std::collections::VecDeque;

use crate::metrics::sample::{AneSample, CpuSample, GpuSample};

/// Fixed-capacity rolling window of one scalar metric, oldest first.
///
/// Pushing past capacity evicts the oldest value. Each buffer is owned by
/// exactly one sampler task; readers only ever see detached snapshots.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Copies the contents oldest-to-newest. The copy never changes when
    /// the buffer is pushed to afterwards.
    pub fn snapshot(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Rolling windows for the GPU family, advanced once per successful tick.
#[derive(Debug, Clone)]
pub struct GpuHistory {
    pub device: HistoryBuffer,
    pub renderer: HistoryBuffer,
    pub tiler: HistoryBuffer,
    pub memory_used: HistoryBuffer,
}

impl GpuHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            device: HistoryBuffer::new(capacity),
            renderer: HistoryBuffer::new(capacity),
            tiler: HistoryBuffer::new(capacity),
            memory_used: HistoryBuffer::new(capacity),
        }
    }

    pub fn record(&mut self, sample: &GpuSample) {
        self.device.push(sample.device_utilization);
        self.renderer.push(sample.renderer_utilization);
        self.tiler.push(sample.tiler_utilization);
        self.memory_used.push(sample.memory_in_use_bytes as f64);
    }

    pub fn view(&self) -> GpuHistoryView {
        GpuHistoryView {
            device: self.device.snapshot(),
            renderer: self.renderer.snapshot(),
            tiler: self.tiler.snapshot(),
            memory_used: self.memory_used.snapshot(),
        }
    }

    pub fn clear(&mut self) {
        self.device.clear();
        self.renderer.clear();
        self.tiler.clear();
        self.memory_used.clear();
    }
}

/// Detached copy of [`GpuHistory`] handed to readers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuHistoryView {
    pub device: Vec<f64>,
    pub renderer: Vec<f64>,
    pub tiler: Vec<f64>,
    pub memory_used: Vec<f64>,
}

/// Rolling windows for the power family. The ANE buffers advance only on
/// ticks that actually carried an ANE line; the cluster buffers only on
/// ticks that carried cluster residencies.
#[derive(Debug, Clone)]
pub struct PowerHistory {
    pub ane_power: HistoryBuffer,
    pub ane_utilization: HistoryBuffer,
    pub e_cluster: HistoryBuffer,
    pub p_cluster: HistoryBuffer,
}

impl PowerHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            ane_power: HistoryBuffer::new(capacity),
            ane_utilization: HistoryBuffer::new(capacity),
            e_cluster: HistoryBuffer::new(capacity),
            p_cluster: HistoryBuffer::new(capacity),
        }
    }

    pub fn record_ane(&mut self, sample: &AneSample) {
        self.ane_power.push(sample.power_mw);
        if let Some(pct) = sample.utilization_pct {
            self.ane_utilization.push(pct);
        }
    }

    pub fn record_cpu(&mut self, sample: &CpuSample) {
        self.e_cluster.push(sample.e_cluster_active_pct);
        self.p_cluster.push(sample.p_cluster_active_pct);
    }

    pub fn view(&self) -> PowerHistoryView {
        PowerHistoryView {
            ane_power: self.ane_power.snapshot(),
            ane_utilization: self.ane_utilization.snapshot(),
            e_cluster: self.e_cluster.snapshot(),
            p_cluster: self.p_cluster.snapshot(),
        }
    }

    pub fn clear(&mut self) {
        self.ane_power.clear();
        self.ane_utilization.clear();
        self.e_cluster.clear();
        self.p_cluster.clear();
    }
}

/// Detached copy of [`PowerHistory`] handed to readers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerHistoryView {
    pub ane_power: Vec<f64>,
    pub ane_utilization: Vec<f64>,
    pub e_cluster: Vec<f64>,
    pub p_cluster: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn push_keeps_insertion_order_below_capacity() {
        let mut buf = HistoryBuffer::new(8);
        for v in [1.0, 2.0, 3.0] {
            buf.push(v);
        }
        assert_eq!(buf.snapshot(), vec![1.0, 2.0, 3.0]);
        assert_eq!(buf.latest(), Some(3.0));
    }

    #[test]
    fn push_past_capacity_evicts_oldest_first() {
        let mut buf = HistoryBuffer::new(3);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            buf.push(v);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.snapshot(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn zero_capacity_is_bumped_to_one() {
        let mut buf = HistoryBuffer::new(0);
        buf.push(7.0);
        buf.push(8.0);
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.snapshot(), vec![8.0]);
    }

    #[test]
    fn snapshot_is_detached_from_later_pushes() {
        let mut buf = HistoryBuffer::new(4);
        buf.push(1.0);
        let snap = buf.snapshot();
        buf.push(2.0);
        assert_eq!(snap, vec![1.0]);
        assert_eq!(buf.snapshot(), vec![1.0, 2.0]);
    }

    #[test]
    fn clear_empties_but_keeps_capacity() {
        let mut buf = HistoryBuffer::new(2);
        buf.push(1.0);
        buf.push(2.0);
        buf.clear();
        assert!(buf.is_empty());
        buf.push(9.0);
        assert_eq!(buf.snapshot(), vec![9.0]);
    }

    fn gpu_sample(device: f64, mem: u64) -> GpuSample {
        GpuSample {
            device_utilization: device,
            renderer_utilization: device / 2.0,
            tiler_utilization: device / 4.0,
            memory_in_use_bytes: mem,
            memory_allocated_bytes: mem * 2,
            recovery_count: None,
            split_scene_count: None,
            tiled_scene_bytes: None,
            sampled_at: Instant::now(),
        }
    }

    #[test]
    fn gpu_family_buffers_advance_in_lockstep() {
        let mut hist = GpuHistory::new(4);
        hist.record(&gpu_sample(40.0, 1024));
        hist.record(&gpu_sample(80.0, 2048));
        let view = hist.view();
        assert_eq!(view.device, vec![40.0, 80.0]);
        assert_eq!(view.renderer, vec![20.0, 40.0]);
        assert_eq!(view.tiler, vec![10.0, 20.0]);
        assert_eq!(view.memory_used, vec![1024.0, 2048.0]);
    }

    #[test]
    fn ane_utilization_buffer_skips_unknown_readings() {
        let mut hist = PowerHistory::new(4);
        hist.record_ane(&AneSample::new(1000.0, Some(8000.0)));
        hist.record_ane(&AneSample::new(2000.0, None));
        let view = hist.view();
        assert_eq!(view.ane_power, vec![1000.0, 2000.0]);
        assert_eq!(view.ane_utilization, vec![12.5]);
    }
}
