//! Plain-text rendition of the latest readings, printed by `--once` runs
//! instead of entering the dashboard loop.

use crate::format::{format_bytes, format_freq_mhz, format_pct, format_power_mw};
use crate::metrics::model::{MetricsModel, SourceHealth};

pub fn render(model: &MetricsModel) -> String {
    let mut out = String::new();
    let sys = &model.system;

    let gpu_cores = match sys.gpu_cores {
        Some(cores) => format!(", {cores} GPU cores"),
        None => String::new(),
    };
    out.push_str(&format!(
        "chip: {} ({} CPU cores{})\n",
        sys.chip_name, sys.cpu_cores, gpu_cores
    ));

    match &model.gpu.memory {
        Some(mem) => out.push_str(&format!(
            "host memory: {} / {}\n",
            format_bytes(mem.used_bytes),
            format_bytes(mem.total_bytes)
        )),
        None => out.push_str(&format!(
            "host memory: {} total\n",
            format_bytes(sys.memory_total_bytes)
        )),
    }

    match &model.gpu.sample {
        Some(gpu) => {
            out.push_str(&format!(
                "gpu: device {}, renderer {}, tiler {}\n",
                format_pct(gpu.device_utilization),
                format_pct(gpu.renderer_utilization),
                format_pct(gpu.tiler_utilization)
            ));
            out.push_str(&format!(
                "gpu memory: {} in use / {} allocated\n",
                format_bytes(gpu.memory_in_use_bytes),
                format_bytes(gpu.memory_allocated_bytes)
            ));
        }
        None => out.push_str(&format!("gpu: {}\n", absence(&model.gpu.health))),
    }

    if !sys.ane_present {
        out.push_str("ane: no neural engine detected on this chip\n");
    } else if model.power.needs_elevation() {
        out.push_str("ane: requires elevated privileges, restart with sudo\n");
    } else {
        match &model.power.ane {
            Some(ane) => {
                let estimate = match ane.utilization_pct {
                    Some(pct) => format!(" ({} of rated power)", format_pct(pct)),
                    None => " (utilization unknown for this chip)".to_string(),
                };
                out.push_str(&format!(
                    "ane: {}{}\n",
                    format_power_mw(ane.power_mw),
                    estimate
                ));
            }
            None => out.push_str(&format!("ane: {}\n", absence(&model.power.health))),
        }
    }

    if let Some(cpu) = &model.power.cpu {
        out.push_str(&format!(
            "clusters: E {} @ {}, P {} @ {}\n",
            format_pct(cpu.e_cluster_active_pct),
            format_freq_mhz(cpu.e_cluster_freq_mhz),
            format_pct(cpu.p_cluster_active_pct),
            format_freq_mhz(cpu.p_cluster_freq_mhz)
        ));
        if let Some(mw) = cpu.cpu_power_mw {
            out.push_str(&format!("cpu power: {}\n", format_power_mw(mw)));
        }
    }

    out
}

fn absence(health: &SourceHealth) -> String {
    match health {
        SourceHealth::Waiting => "no sample yet".to_string(),
        SourceHealth::Disabled => "sampling disabled".to_string(),
        SourceHealth::Stale(err) | SourceHealth::Down(err) => format!("unavailable ({err})"),
        SourceHealth::Ok => "no sample this tick".to_string(),
    }
}
