//! Human-readable time formatting
//!
//! Playback positions and countdown values are displayed by UI
//! collaborators; these helpers keep the formats consistent.

/// Format a playback position as `M:SS` (or `H:MM:SS` past one hour).
///
/// Negative and non-finite values render as `0:00`.
///
/// # Examples
///
/// ```
/// use lofi_common::human_time::format_clock;
///
/// assert_eq!(format_clock(0.0), "0:00");
/// assert_eq!(format_clock(65.9), "1:05");
/// assert_eq!(format_clock(3725.0), "1:02:05");
/// ```
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Format a countdown as zero-padded `MM:SS`.
///
/// # Examples
///
/// ```
/// use lofi_common::human_time::format_countdown;
///
/// assert_eq!(format_countdown(25 * 60), "25:00");
/// assert_eq!(format_countdown(61), "01:01");
/// ```
pub fn format_countdown(remaining_secs: u32) -> String {
    format!("{:02}:{:02}", remaining_secs / 60, remaining_secs % 60)
}
