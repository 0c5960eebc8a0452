use serde_json::Value;

use crate::event::lenient_int;

pub const PLACEHOLDER: &str = "-";

#[allow(clippy::cast_precision_loss)]
pub fn format_elapsed(ms: Option<i64>) -> String {
    let Some(ms) = ms else {
        return PLACEHOLDER.to_string();
    };
    if ms < 1000 {
        return format!("{ms}ms");
    }

    let seconds = ms as f64 / 1000.0;
    if seconds < 60.0 {
        return format!("{seconds:.1}s");
    }
    let minutes = seconds / 60.0;
    if minutes < 60.0 {
        return format!("{minutes:.1}m");
    }
    format!("{:.1}h", minutes / 60.0)
}

/// Formats a raw JSON duration; anything non-numeric renders as the placeholder.
pub fn format_elapsed_value(value: Option<&Value>) -> String {
    format_elapsed(value.and_then(lenient_int))
}
