use crate::ast::Value;
use crate::tool::DisplayFormat;
use chrono::{DateTime, NaiveDate};

/// What a missing mapped key renders as. A hole in the data is a display
/// concern, never an error.
pub const MISSING_PLACEHOLDER: &str = "\u{2014}";

/// Coerces one value into its declared display format. Coercion never
/// fails: a value that does not fit falls back to its plain string form.
pub(super) fn coerce(value: &Value, format: DisplayFormat) -> String {
    match format {
        DisplayFormat::Currency => match value.as_number() {
            Some(n) if n < 0.0 => format!("-${}", grouped(-n, Some(2))),
            Some(n) => format!("${}", grouped(n, Some(2))),
            None => value.to_display_string(),
        },
        DisplayFormat::Percentage => match value.as_number() {
            Some(n) => format!("{}%", trimmed(n)),
            None => value.to_display_string(),
        },
        DisplayFormat::Number => match value.as_number() {
            Some(n) if n < 0.0 => format!("-{}", grouped(-n, None)),
            Some(n) => grouped(n, None),
            None => value.to_display_string(),
        },
        DisplayFormat::Boolean => match value.as_bool() {
            Some(true) => "Yes".to_string(),
            Some(false) => "No".to_string(),
            None => value.to_display_string(),
        },
        DisplayFormat::Date => format_date(value).unwrap_or_else(|| value.to_display_string()),
        DisplayFormat::Text => value.to_display_string(),
    }
}

/// `Mon D, YYYY` from a `YYYY-MM-DD` string, an RFC 3339 timestamp or epoch
/// milliseconds.
fn format_date(value: &Value) -> Option<String> {
    const STYLE: &str = "%b %-d, %Y";
    match value {
        Value::String(text) => {
            if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                return Some(date.format(STYLE).to_string());
            }
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive().format(STYLE).to_string())
        }
        Value::Number(millis) => DateTime::from_timestamp_millis(*millis as i64)
            .map(|dt| dt.date_naive().format(STYLE).to_string()),
        _ => None,
    }
}

/// Integer-trimmed plain rendering: `10` not `10.0`.
fn trimmed(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Thousands-grouped rendering of a non-negative number. `decimals` forces a
/// fixed fraction width; `None` keeps the value's own (integer-trimmed).
fn grouped(n: f64, decimals: Option<usize>) -> String {
    let rendered = match decimals {
        Some(width) => format!("{:.*}", width, n),
        None => trimmed(n),
    };
    let (integer, fraction) = match rendered.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (rendered, None),
    };

    let mut out = String::new();
    let digits: Vec<char> = integer.chars().collect();
    for (position, digit) in digits.iter().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            out.push(',');
        }
        out.push(*digit);
    }
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(&fraction);
    }
    out
}
