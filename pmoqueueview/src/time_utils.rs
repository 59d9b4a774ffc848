//! Duration formatting for display items.
//!
//! Durations coming from the media session are expressed in milliseconds.
//! Labels drop the hour field when it is zero, the way track lengths are
//! usually shown in a queue.

/// Formats a duration in seconds as H:MM:SS, or M:SS below one hour.
///
/// # Examples
/// ```
/// # use pmoqueueview::time_utils::format_track_time;
/// assert_eq!(format_track_time(0), "0:00");
/// assert_eq!(format_track_time(61), "1:01");
/// assert_eq!(format_track_time(3661), "1:01:01");
/// ```
pub fn format_track_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Formats a millisecond duration, rounding down to the second.
///
/// Negative or zero durations mean "unknown" and yield `None`.
pub fn format_duration_ms(duration_ms: i64) -> Option<String> {
    if duration_ms <= 0 {
        return None;
    }
    Some(format_track_time(duration_ms as u64 / 1000))
}
