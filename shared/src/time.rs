//! Human readable uptime formatting used by periodic count logs

use std::time::Duration;

/// Render an elapsed duration as `D days, H hours, M minutes`.
///
/// Days and hours are omitted when zero; minutes are always present.
pub fn time_difference(elapsed: Duration) -> String {
    let total_minutes = elapsed.as_secs() / 60;
    let days = total_minutes / (60 * 24);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    let mut result = String::new();
    if days > 0 {
        result.push_str(&format!("{days} days, "));
    }
    if hours > 0 {
        result.push_str(&format!("{hours} hours, "));
    }
    result.push_str(&format!("{minutes} minutes"));
    result
}
