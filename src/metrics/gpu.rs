use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;

use crate::metrics::error::ParseError;
use crate::metrics::sample::GpuSample;

const KEY_DEVICE: &str = "Device Utilization %";
const KEY_RENDERER: &str = "Renderer Utilization %";
const KEY_TILER: &str = "Tiler Utilization %";
const KEY_MEM_IN_USE: &str = "In use system memory";
const KEY_MEM_ALLOC: &str = "Alloc system memory";
const KEY_GPU_CORES: &str = "gpu-core-count";

const STATS_KEY: &str = "\"PerformanceStatistics\"";

const REQUIRED_KEYS: [&str; 5] = [
    KEY_DEVICE,
    KEY_RENDERER,
    KEY_TILER,
    KEY_MEM_IN_USE,
    KEY_MEM_ALLOC,
];

/// Parses one registry query into a GPU snapshot.
///
/// The registry prints `"key" = value` pairs; the same statistics can also
/// arrive as plain JSON. Both shapes go through the same field table, so
/// the sample is identical either way. Key order is never assumed.
pub fn parse_gpu(raw: &str) -> Result<GpuSample, ParseError> {
    let candidate = stats_block(raw).unwrap_or(raw);
    let fields = extract_fields(candidate);
    if REQUIRED_KEYS.iter().all(|key| !fields.contains_key(*key)) {
        return Err(ParseError::MissingStats);
    }

    let device_utilization = field_pct(&fields, KEY_DEVICE)?;
    let renderer_utilization = field_pct(&fields, KEY_RENDERER)?;
    let tiler_utilization = field_pct(&fields, KEY_TILER)?;
    let memory_in_use_bytes = field_bytes(&fields, KEY_MEM_IN_USE)?;
    let memory_allocated_bytes = field_bytes(&fields, KEY_MEM_ALLOC)?;
    if memory_allocated_bytes < memory_in_use_bytes {
        return Err(ParseError::AllocBelowInUse {
            allocated: memory_allocated_bytes,
            in_use: memory_in_use_bytes,
        });
    }

    Ok(GpuSample {
        device_utilization,
        renderer_utilization,
        tiler_utilization,
        memory_in_use_bytes,
        memory_allocated_bytes,
        recovery_count: field_count(&fields, "recoveryCount"),
        split_scene_count: field_count(&fields, "splitSceneCount"),
        tiled_scene_bytes: field_count(&fields, "tiledSceneBytes"),
        sampled_at: Instant::now(),
    })
}

/// Core count sits on the accelerator entry itself, outside the
/// statistics dictionary, so this scans the whole dump.
pub fn gpu_core_count(raw: &str) -> Option<u64> {
    let fields = extract_fields(raw);
    let value = fields.get(KEY_GPU_CORES)?;
    value
        .parse::<u64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
}

/// Finds the statistics dictionary and returns it braces included. `None`
/// when the key is absent, in which case the caller treats the whole text
/// as the candidate block.
fn stats_block(raw: &str) -> Option<&str> {
    let key_pos = raw.find(STATS_KEY)?;
    let after = &raw[key_pos + STATS_KEY.len()..];
    let open = after.find('{')?;
    balanced_braces(&after[open..])
}

/// `body` starts at '{'. Braces inside quoted strings do not count.
fn balanced_braces(body: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&body[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Field table for a candidate block: strict JSON when it is JSON, the
/// tolerant pair scanner otherwise. Values stay raw strings; typing
/// happens per field so errors can name the key.
fn extract_fields(candidate: &str) -> HashMap<String, String> {
    json_fields(candidate).unwrap_or_else(|| scan_fields(candidate))
}

fn json_fields(candidate: &str) -> Option<HashMap<String, String>> {
    let value: Value = serde_json::from_str(candidate.trim()).ok()?;
    let object = value.as_object()?;
    let mut fields = HashMap::new();
    for (key, val) in object {
        let rendered = match val {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        fields.entry(key.clone()).or_insert(rendered);
    }
    Some(fields)
}

/// Walks `"key" = value` / `"key": value` pairs, ignoring anything else.
/// The first occurrence of a key wins. Nested dictionaries are scanned
/// through, so an entry-level key and its statistics both land here.
fn scan_fields(text: &str) -> HashMap<String, String> {
    let bytes = text.as_bytes();
    let mut fields = HashMap::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'"' {
            i += 1;
            continue;
        }
        let key_start = i + 1;
        let Some(rel) = text[key_start..].find('"') else {
            break;
        };
        let key_end = key_start + rel;
        let key = &text[key_start..key_end];
        i = key_end + 1;
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        if bytes[i] != b'=' && bytes[i] != b':' {
            continue;
        }
        i += 1;
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        match bytes[i] {
            b'"' => {
                let val_start = i + 1;
                let Some(rel) = text[val_start..].find('"') else {
                    break;
                };
                let val_end = val_start + rel;
                fields
                    .entry(key.to_string())
                    .or_insert_with(|| text[val_start..val_end].to_string());
                i = val_end + 1;
            }
            // Container values: step inside and keep scanning.
            b'{' | b'(' | b'[' => i += 1,
            _ => {
                let val_start = i;
                while i < bytes.len()
                    && !matches!(
                        bytes[i],
                        b',' | b'}' | b')' | b']' | b'\n' | b'\r' | b'"' | b' ' | b'\t'
                    )
                {
                    i += 1;
                }
                if i > val_start {
                    fields
                        .entry(key.to_string())
                        .or_insert_with(|| text[val_start..i].to_string());
                }
            }
        }
    }
    fields
}

fn field_f64(fields: &HashMap<String, String>, key: &'static str) -> Result<f64, ParseError> {
    let raw = fields.get(key).ok_or(ParseError::MissingKey(key))?;
    let value: f64 = raw.parse().map_err(|_| ParseError::BadNumber {
        key,
        value: raw.clone(),
    })?;
    if !value.is_finite() {
        return Err(ParseError::BadNumber {
            key,
            value: raw.clone(),
        });
    }
    Ok(value)
}

fn field_pct(fields: &HashMap<String, String>, key: &'static str) -> Result<f64, ParseError> {
    let value = field_f64(fields, key)?;
    if !(0.0..=100.0).contains(&value) {
        return Err(ParseError::OutOfRange { key, value });
    }
    Ok(value)
}

fn field_bytes(fields: &HashMap<String, String>, key: &'static str) -> Result<u64, ParseError> {
    let value = field_f64(fields, key)?;
    if value < 0.0 {
        return Err(ParseError::OutOfRange { key, value });
    }
    Ok(value as u64)
}

fn field_count(fields: &HashMap<String, String>, key: &'static str) -> Option<u64> {
    fields.get(key).and_then(|raw| raw.parse::<u64>().ok())
}
