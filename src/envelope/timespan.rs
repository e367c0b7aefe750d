//! Millisecond durations in the ingestion schema's time-span text form.

const MS_PER_SECOND: f64 = 1_000.0;
const MS_PER_MINUTE: f64 = 60.0 * MS_PER_SECOND;
const MS_PER_HOUR: f64 = 60.0 * MS_PER_MINUTE;
const MS_PER_DAY: f64 = 24.0 * MS_PER_HOUR;

/// Format milliseconds as `[d.]hh:mm:ss.fffffff`.
///
/// Seconds carry seven fractional digits with up to four trailing zeros
/// removed, so whole milliseconds render as three digits. The day prefix is
/// present only when non-zero. Negative or non-finite input renders as zero.
pub fn ms_to_time_span(total_ms: f64) -> String {
    let total_ms = if total_ms.is_finite() && total_ms > 0.0 {
        total_ms
    } else {
        0.0
    };

    let mut seconds = format!("{:.7}", (total_ms / MS_PER_SECOND) % 60.0);
    for _ in 0..4 {
        if !seconds.ends_with('0') {
            break;
        }
        seconds.pop();
    }
    if seconds.find('.').map_or(true, |dot| dot < 2) {
        seconds.insert(0, '0');
    }

    let minutes = (total_ms / MS_PER_MINUTE).floor() as u64 % 60;
    let hours = (total_ms / MS_PER_HOUR).floor() as u64 % 24;
    let days = (total_ms / MS_PER_DAY).floor() as u64;

    if days > 0 {
        format!("{days}.{hours:02}:{minutes:02}:{seconds}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds}")
    }
}
