use chrono::{DateTime, TimeZone};

/// Timestamp layout used in the position log (24-hour, zero-padded).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp in its own zone as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Expands a leading `~` in a path to the user's home directory.
/// Also normalizes path separators for the current OS.
pub fn expand_tilde(path: &str) -> String {
    let result = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home
                .join(rest.trim_start_matches('/'))
                .to_string_lossy()
                .to_string(),
            None => path.to_string(),
        },
        _ => path.to_string(),
    };
    if cfg!(windows) {
        result.replace('/', "\\")
    } else {
        result
    }
}
