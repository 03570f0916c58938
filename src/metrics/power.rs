use std::time::Instant;

use crate::metrics::error::ParseError;
use crate::metrics::sample::{AneSample, CpuSample};

/// What one power-profiler window yielded. Either side can be absent on a
/// perfectly healthy tick: a very short window sometimes prints no ANE
/// line at all, and that is not the same thing as zero milliwatts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PowerTick {
    pub ane: Option<AneSample>,
    pub cpu: Option<CpuSample>,
}

const ANE_LINE: &str = "ANE Power:";
const CPU_LINE: &str = "CPU Power:";
const RESIDENCY_MARK: &str = "-Cluster HW active residency:";
const FREQUENCY_MARK: &str = "-Cluster HW active frequency:";

/// Parses one profiler window. `max_ane_power_mw` is the chip's rated ANE
/// power; without it the ANE reading keeps its wattage but gets no
/// utilization estimate.
pub fn parse_power(raw: &str, max_ane_power_mw: Option<f64>) -> Result<PowerTick, ParseError> {
    let mut ane_power: Option<f64> = None;
    let mut cpu_power: Option<f64> = None;
    let mut e_residency: Vec<f64> = Vec::new();
    let mut p_residency: Vec<f64> = Vec::new();
    let mut e_frequency: Vec<f64> = Vec::new();
    let mut p_frequency: Vec<f64> = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(ANE_LINE) {
            let value = parse_milliwatts("ANE Power", rest)?;
            if value < 0.0 {
                return Err(ParseError::OutOfRange {
                    key: "ANE Power",
                    value,
                });
            }
            ane_power = Some(value);
        } else if let Some(rest) = line.strip_prefix(CPU_LINE) {
            cpu_power = Some(parse_milliwatts("CPU Power", rest)?);
        } else if let Some((cluster, rest)) = line.split_once(RESIDENCY_MARK) {
            if let Some(pct) = leading_percent(rest) {
                match cluster.as_bytes().first() {
                    Some(b'E') => e_residency.push(pct),
                    Some(b'P') => p_residency.push(pct),
                    _ => {}
                }
            }
        } else if let Some((cluster, rest)) = line.split_once(FREQUENCY_MARK) {
            if let Some(mhz) = leading_number(rest) {
                match cluster.as_bytes().first() {
                    Some(b'E') => e_frequency.push(mhz),
                    Some(b'P') => p_frequency.push(mhz),
                    _ => {}
                }
            }
        }
    }

    let cpu = if e_residency.is_empty() && p_residency.is_empty() {
        None
    } else {
        // Pro/Max chips report several P-clusters; the busiest one is the
        // number worth watching.
        Some(CpuSample {
            e_cluster_active_pct: fold_max(&e_residency),
            p_cluster_active_pct: fold_max(&p_residency),
            e_cluster_freq_mhz: fold_max(&e_frequency) as u32,
            p_cluster_freq_mhz: fold_max(&p_frequency) as u32,
            cpu_power_mw: cpu_power,
            sampled_at: Instant::now(),
        })
    };

    let ane = ane_power.map(|mw| AneSample::new(mw, max_ane_power_mw));

    if ane.is_none() && cpu.is_none() && !looks_like_profiler_output(raw) {
        return Err(ParseError::MissingStats);
    }

    Ok(PowerTick { ane, cpu })
}

/// "2500 mW" or "0.5 W"; a bare number is taken as milliwatts.
fn parse_milliwatts(key: &'static str, rest: &str) -> Result<f64, ParseError> {
    let mut tokens = rest.split_whitespace();
    let number = tokens.next().ok_or(ParseError::MissingKey(key))?;
    let value: f64 = number.parse().map_err(|_| ParseError::BadNumber {
        key,
        value: number.to_string(),
    })?;
    if !value.is_finite() {
        return Err(ParseError::BadNumber {
            key,
            value: number.to_string(),
        });
    }
    let scaled = match tokens.next() {
        Some("W") => value * 1000.0,
        _ => value,
    };
    Ok(scaled)
}

/// "  40.74% (600 MHz: .12% ...)" -> 40.74. The parenthesized frequency
/// spread after the first percent sign is deliberately ignored.
fn leading_percent(rest: &str) -> Option<f64> {
    let head = rest.split('%').next()?;
    head.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn leading_number(rest: &str) -> Option<f64> {
    rest.split_whitespace()
        .next()?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn fold_max(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

/// Section banners that survive even when every metric line is missing.
fn looks_like_profiler_output(raw: &str) -> bool {
    raw.contains("Sampled system activity")
        || raw.contains("Processor usage")
        || raw.contains("Machine model")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = "\
Machine model: Mac14,6
OS version: 23A344

*** Sampled system activity (Tue Aug 12 09:15:01 2025 +0200) (1002.54ms elapsed) ***

**** Processor usage ****

E-Cluster Power: 46 mW
E-Cluster HW active frequency: 1187 MHz
E-Cluster HW active residency:  40.74% (600 MHz: .12% 912 MHz: 9.07% 1187 MHz: 31.55%)
E-Cluster idle residency:  59.26%

P0-Cluster Power: 112 mW
P0-Cluster HW active frequency: 1712 MHz
P0-Cluster HW active residency:  15.63% (660 MHz: 1.93% 1356 MHz: 4.59% 1712 MHz: 9.11%)
P0-Cluster idle residency:  84.37%

P1-Cluster Power: 82 mW
P1-Cluster HW active frequency: 2064 MHz
P1-Cluster HW active residency:  22.10% (660 MHz: 0.41% 2064 MHz: 21.69%)
P1-Cluster idle residency:  77.90%

CPU Power: 240 mW
GPU Power: 19 mW
ANE Power: 2500 mW
Combined Power (CPU + GPU + ANE): 2759 mW
";

    #[test]
    fn full_profile_yields_ane_and_cpu() {
        let tick = parse_power(PROFILE, Some(5000.0)).unwrap();
        let ane = tick.ane.unwrap();
        assert_eq!(ane.power_mw, 2500.0);
        assert_eq!(ane.utilization_pct, Some(50.0));

        let cpu = tick.cpu.unwrap();
        assert_eq!(cpu.e_cluster_active_pct, 40.74);
        assert_eq!(cpu.p_cluster_active_pct, 22.10);
        assert_eq!(cpu.e_cluster_freq_mhz, 1187);
        assert_eq!(cpu.p_cluster_freq_mhz, 2064);
        assert_eq!(cpu.cpu_power_mw, Some(240.0));
    }

    #[test]
    fn combined_power_line_is_not_mistaken_for_the_ane_line() {
        let raw = "Combined Power (CPU + GPU + ANE): 240 mW\nProcessor usage\n";
        let tick = parse_power(raw, Some(5000.0)).unwrap();
        assert_eq!(tick.ane, None);
    }

    #[test]
    fn zero_power_is_a_reading_not_an_absence() {
        let raw = "**** Processor usage ****\nANE Power: 0 mW\n";
        let tick = parse_power(raw, Some(5000.0)).unwrap();
        let ane = tick.ane.unwrap();
        assert_eq!(ane.power_mw, 0.0);
        assert_eq!(ane.utilization_pct, Some(0.0));
    }

    #[test]
    fn missing_ane_line_with_valid_banner_is_an_empty_tick() {
        let raw = "*** Sampled system activity (...) (12.01ms elapsed) ***\n";
        let tick = parse_power(raw, Some(5000.0)).unwrap();
        assert_eq!(tick.ane, None);
        assert_eq!(tick.cpu, None);
    }

    #[test]
    fn unrecognizable_text_is_an_error() {
        assert_eq!(parse_power("zsh: command not found\n", None), Err(ParseError::MissingStats));
        assert_eq!(parse_power("", None), Err(ParseError::MissingStats));
    }

    #[test]
    fn garbled_ane_value_is_a_bad_number() {
        let raw = "ANE Power: lots mW\n";
        assert_eq!(
            parse_power(raw, None),
            Err(ParseError::BadNumber {
                key: "ANE Power",
                value: "lots".to_string()
            })
        );
    }

    #[test]
    fn negative_ane_power_is_out_of_range() {
        let raw = "ANE Power: -3 mW\n";
        assert_eq!(
            parse_power(raw, None),
            Err(ParseError::OutOfRange {
                key: "ANE Power",
                value: -3.0
            })
        );
    }

    #[test]
    fn watt_unit_scales_to_milliwatts() {
        let raw = "ANE Power: 0.5 W\n";
        let tick = parse_power(raw, Some(10000.0)).unwrap();
        assert_eq!(tick.ane.unwrap().power_mw, 500.0);
    }

    #[test]
    fn unknown_chip_keeps_power_but_not_utilization() {
        let raw = "ANE Power: 1234 mW\n";
        let ane = parse_power(raw, None).unwrap().ane.unwrap();
        assert_eq!(ane.power_mw, 1234.0);
        assert_eq!(ane.utilization_pct, None);
    }

    #[test]
    fn single_cluster_chip_reports_zero_for_the_missing_side() {
        let raw = "\
**** Processor usage ****
E-Cluster HW active frequency: 912 MHz
E-Cluster HW active residency:  12.50%
";
        let cpu = parse_power(raw, None).unwrap().cpu.unwrap();
        assert_eq!(cpu.e_cluster_active_pct, 12.5);
        assert_eq!(cpu.p_cluster_active_pct, 0.0);
        assert_eq!(cpu.p_cluster_freq_mhz, 0);
    }
}
