use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn truncate_unicode(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            result.push('\u{2026}');
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.0} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Milliwatts below one watt stay in mW; anything larger reads better in
/// watts.
pub fn format_power_mw(mw: f64) -> String {
    if mw >= 1000.0 {
        format!("{:.2} W", mw / 1000.0)
    } else {
        format!("{:.0} mW", mw)
    }
}

pub fn format_pct(pct: f64) -> String {
    format!("{pct:.1}%")
}

pub fn format_freq_mhz(mhz: u32) -> String {
    if mhz >= 1000 {
        format!("{:.2} GHz", mhz as f64 / 1000.0)
    } else {
        format!("{mhz} MHz")
    }
}
