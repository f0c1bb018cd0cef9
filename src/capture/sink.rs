use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};

use crate::capture::extract::Position;
use crate::error::Result;
use crate::util::format_timestamp;

/// One line of the position log: `timestamp;x;y;z`.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub captured_at: DateTime<Local>,
    pub position: Position,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Position { x, y, z } = self.position;
        write!(f, "{};{x};{y};{z}", format_timestamp(&self.captured_at))
    }
}

/// Destination for log records. Implemented by [`CsvLog`]; tests supply
/// in-memory sinks.
pub trait RecordSink: Send + Sync {
    fn append(&self, record: &LogRecord) -> Result<()>;
}

impl<T: RecordSink + ?Sized> RecordSink for Arc<T> {
    fn append(&self, record: &LogRecord) -> Result<()> {
        (**self).append(record)
    }
}

/// Append exactly one record to `path`, creating the file and its parent
/// directory when missing. The line goes out in a single write and is
/// synced before returning.
pub fn append_record(path: &Path, record: &LogRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line = format!("{record}\n");
    file.write_all(line.as_bytes())?;
    file.sync_data()?;
    Ok(())
}

/// Append-only `.csv` log for one world/player pair.
///
/// Calls are serialized so concurrent writers never interleave and lines
/// land in call order.
pub struct CsvLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvLog {
    fn append(&self, record: &LogRecord) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        append_record(&self.path, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(x: f64, y: f64, z: f64) -> LogRecord {
        LogRecord {
            captured_at: Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap(),
            position: Position { x, y, z },
        }
    }

    #[test]
    fn test_record_format() {
        assert_eq!(
            format!("{}", record(12.5, 64.0, -8.25)),
            "2024-03-07 09:05:02;12.5;64;-8.25"
        );
        assert_eq!(
            format!("{}", record(-0.30000000000000004, 1e-7, 123456789.0)),
            "2024-03-07 09:05:02;-0.30000000000000004;0.0000001;123456789"
        );
    }

    #[test]
    fn test_append_creates_parent_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("userlog").join("World_abc.csv");

        append_record(&path, &record(1.0, 2.0, 3.0)).unwrap();
        append_record(&path, &record(4.0, 5.0, 6.0)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "2024-03-07 09:05:02;1;2;3\n2024-03-07 09:05:02;4;5;6\n"
        );
    }

    #[test]
    fn test_append_never_truncates_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        std::fs::write(&path, "older line\n").unwrap();

        CsvLog::new(&path).append(&record(1.0, 1.0, 1.0)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("older line\n"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_append_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let result = append_record(&blocker.join("log.csv"), &record(1.0, 1.0, 1.0));
        assert!(matches!(result, Err(crate::error::CaptureError::Io(_))));
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(CsvLog::new(dir.path().join("log.csv")));

        let handles: Vec<_> = (0..8)
            .map(|writer| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.append(&record(writer as f64, i as f64, 0.5)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 8 * 50);
        for line in &lines {
            let fields: Vec<&str> = line.split(';').collect();
            assert_eq!(fields.len(), 4, "torn line: {line}");
            assert_eq!(fields[3], "0.5");
        }

        // Each writer's own lines stay in the order it appended them.
        for writer in 0..8 {
            let ys: Vec<f64> = lines
                .iter()
                .filter(|l| l.split(';').nth(1) == Some(writer.to_string().as_str()))
                .map(|l| l.split(';').nth(2).unwrap().parse().unwrap())
                .collect();
            let expected: Vec<f64> = (0..50).map(f64::from).collect();
            assert_eq!(ys, expected);
        }
    }
}
