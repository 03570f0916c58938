use sysinfo::System;

/// Apple Silicon generation, recovered from the CPU brand string.
///
/// Variants within a generation (Pro, Max, Ultra) share the base family;
/// the rated ANE power is per generation, not per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipFamily {
    M1,
    M2,
    M3,
    M4,
    Unknown,
}

impl ChipFamily {
    /// Matches on whole tokens so "M1" never fires on an unrelated "M14".
    pub fn from_brand(brand: &str) -> Self {
        for token in brand.split_whitespace() {
            match token {
                "M1" => return Self::M1,
                "M2" => return Self::M2,
                "M3" => return Self::M3,
                "M4" => return Self::M4,
                _ => {}
            }
        }
        Self::Unknown
    }

    /// Approximate peak ANE package power, used to turn a power reading
    /// into a utilization estimate. Unknown chips get no estimate.
    pub fn max_ane_power_mw(self) -> Option<f64> {
        match self {
            Self::M1 => Some(8000.0),
            Self::M2 => Some(10000.0),
            Self::M3 => Some(11000.0),
            Self::M4 => Some(12000.0),
            Self::Unknown => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::M1 => "M1",
            Self::M2 => "M2",
            Self::M3 => "M3",
            Self::M4 => "M4",
            Self::Unknown => "unknown",
        }
    }
}

/// Facts about the host captured once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemInfo {
    pub chip_name: String,
    pub chip_family: ChipFamily,
    pub cpu_cores: usize,
    /// From the accelerator's registry entry; `None` when the startup
    /// probe failed or the key was absent.
    pub gpu_cores: Option<u64>,
    /// Every recognized Apple Silicon generation carries a Neural Engine;
    /// an unrecognized chip gets no ANE claims in the UI.
    pub ane_present: bool,
    pub memory_total_bytes: u64,
    pub hostname: Option<String>,
}

impl SystemInfo {
    pub fn capture(sys: &System, gpu_cores: Option<u64>) -> Self {
        let chip_name = sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(|| "unknown CPU".to_string());
        let chip_family = ChipFamily::from_brand(&chip_name);
        Self {
            chip_family,
            cpu_cores: sys.cpus().len(),
            gpu_cores,
            ane_present: chip_family != ChipFamily::Unknown,
            memory_total_bytes: sys.total_memory(),
            hostname: System::host_name(),
            chip_name,
        }
    }

    pub fn max_ane_power_mw(&self) -> Option<f64> {
        self.chip_family.max_ane_power_mw()
    }
}
