use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Errors raised while recording an alert
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Failed to write alert log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persists alert messages with a timestamp
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Recorder: Send + Sync {
    async fn record(&self, message: &str) -> Result<(), RecordError>;
}

/// Appends one line per alert to a plain-text log file
///
/// Lines look like `2024-05-01 14:03:27,512 - Bin is over 80% full. Please empty it!`.
pub struct FileRecorder {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Format a log line for the given time
pub fn format_line(at: DateTime<Local>, message: &str) -> String {
    format!("{} - {}\n", at.format("%Y-%m-%d %H:%M:%S,%3f"), message)
}

#[async_trait]
impl Recorder for FileRecorder {
    async fn record(&self, message: &str) -> Result<(), RecordError> {
        let line = format_line(Local::now(), message);
        let io_err = |source| RecordError::Io {
            path: self.path.clone(),
            source,
        };

        let _guard = self.write_lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        debug!(path = %self.path.display(), "Alert recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn temp_log_path() -> PathBuf {
        std::env::temp_dir().join(format!("binwatch-alerts-{}.log", Uuid::new_v4()))
    }

    #[test]
    fn test_line_format() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 14, 3, 27).unwrap();
        assert_eq!(
            format_line(at, "Bin is over 80% full. Please empty it!"),
            "2024-05-01 14:03:27,000 - Bin is over 80% full. Please empty it!\n"
        );
    }

    #[tokio::test]
    async fn test_record_appends_lines() {
        let path = temp_log_path();
        let recorder = FileRecorder::new(&path);

        recorder.record("first").await.unwrap();
        recorder.record("second").await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - first"));
        assert!(lines[1].ends_with(" - second"));

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_unwritable_path_is_reported() {
        let path = temp_log_path().join("missing-dir").join("alerts.log");
        let recorder = FileRecorder::new(&path);

        let err = recorder.record("lost").await.unwrap_err();
        assert!(err.to_string().contains("alerts.log"));
    }
}
