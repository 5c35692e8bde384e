//! Display formatting shared by the detail tables and graphs.

use chrono::{DateTime, Utc};

/// Human-friendly byte count using binary units.
#[must_use]
pub fn format_bytes(value: i64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    const GIB: u64 = 1024 * 1024 * 1024;
    const TIB: u64 = 1024 * 1024 * 1024 * 1024;
    let value = u64::try_from(value).unwrap_or(0);
    let scaled = |unit: u64, label: &str| {
        let whole = value / unit;
        let tenths = (value % unit) * 10 / unit;
        format!("{whole}.{tenths} {label}")
    };
    if value >= TIB {
        scaled(TIB, "TiB")
    } else if value >= GIB {
        scaled(GIB, "GiB")
    } else if value >= MIB {
        scaled(MIB, "MiB")
    } else if value >= KIB {
        scaled(KIB, "KiB")
    } else {
        format!("{value} B")
    }
}

/// Integer with thousands separators, e.g. `12,345`.
#[must_use]
pub fn format_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

/// Fraction in `0.0..=1.0` rendered as a percentage with one decimal.
#[must_use]
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Chart axis value: integers stay exact, everything else gets two decimals.
#[must_use]
pub fn format_axis(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// UTC timestamp, or a dash when unknown.
#[must_use]
pub fn format_time(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(
        || "-".to_string(),
        |time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
