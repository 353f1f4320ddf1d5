//! Display helpers for sizes, counts, dates and file names.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Utc};

use crate::model::Timestamp;

const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Human-readable byte count using 1024-based units.
///
/// One decimal place with trailing zeros dropped: `1536` is `"1.5 KB"`,
/// `2048` is `"2 KB"`, and `0` is `"0 B"`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut unit = 0;
    let mut divisor = 1u64;
    while unit + 1 < SIZE_UNITS.len() && bytes / divisor >= 1024 {
        divisor *= 1024;
        unit += 1;
    }
    let value = bytes as f64 / divisor as f64;
    format!("{} {}", trim_decimal(format!("{value:.1}")), SIZE_UNITS[unit])
}

fn trim_decimal(text: String) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Insert `,` every three digits.
pub fn format_number(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `value / total` as a percentage; `"0%"` when `total` is zero.
pub fn format_percentage(value: f64, total: f64, decimals: usize) -> String {
    if total == 0.0 {
        return "0%".to_string();
    }
    format!("{:.*}%", decimals, value / total * 100.0)
}

/// Shown for a missing or unreadable date.
pub const NO_DATE: &str = "-";

/// Default `strftime` pattern for [`format_date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render `value` in `offset` using a `strftime` pattern.
///
/// Blank values, unparseable text and invalid patterns give [`NO_DATE`].
pub fn format_date(value: Option<&Timestamp>, offset: FixedOffset, pattern: &str) -> String {
    let Some(at) = value.filter(|v| !v.is_blank()).and_then(Timestamp::instant) else {
        return NO_DATE.to_string();
    };
    let items = StrftimeItems::new(pattern);
    if items.clone().any(|item| matches!(item, Item::Error)) {
        return NO_DATE.to_string();
    }
    at.with_timezone(&offset).format_with_items(items).to_string()
}

/// Distance between `value` and `now` in words, e.g. `"5 minutes ago"`,
/// `"about 2 hours ago"` or `"in 3 days"`.
pub fn format_relative_time(value: Option<&Timestamp>, now: DateTime<Utc>) -> String {
    let Some(at) = value.filter(|v| !v.is_blank()).and_then(Timestamp::instant) else {
        return NO_DATE.to_string();
    };
    let seconds = (now - at).num_seconds();
    let distance = distance_in_words(seconds.unsigned_abs());
    if seconds >= 0 {
        format!("{distance} ago")
    } else {
        format!("in {distance}")
    }
}

const MINUTES_IN_DAY: u64 = 1440;
const MINUTES_IN_MONTH: u64 = 43_200;

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

fn distance_in_words(seconds: u64) -> String {
    let minutes = (seconds + 30) / 60;
    match minutes {
        0 => "less than a minute".to_string(),
        1..=44 => plural(minutes, "minute"),
        45..=89 => "about 1 hour".to_string(),
        90..=1439 => format!("about {} hours", (minutes + 30) / 60),
        1440..=2519 => "1 day".to_string(),
        2520..=43_199 => plural((minutes + MINUTES_IN_DAY / 2) / MINUTES_IN_DAY, "day"),
        43_200..=86_399 => {
            let months = (minutes + MINUTES_IN_MONTH / 2) / MINUTES_IN_MONTH;
            format!("about {}", plural(months, "month"))
        }
        _ => {
            let months = (minutes + MINUTES_IN_MONTH / 2) / MINUTES_IN_MONTH;
            if months < 12 {
                return plural(months, "month");
            }
            let (years, rest) = (months / 12, months % 12);
            match rest {
                0..=2 => format!("about {}", plural(years, "year")),
                3..=8 => format!("over {}", plural(years, "year")),
                _ => format!("almost {}", plural(years + 1, "year")),
            }
        }
    }
}

/// Cut `text` to `max_chars` characters and append `suffix` if anything
/// was removed.
pub fn truncate_text(text: &str, max_chars: usize, suffix: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], suffix),
        None => text.to_string(),
    }
}

/// Lower-cased text after the last `.`, or empty.
pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// File name without its last extension.
pub fn file_stem(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem)
}
