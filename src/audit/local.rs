// src/audit/local.rs — Append-only JSONL audit file

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{AuditError, AuditRecord, AuditSink};

/// One JSON object per line. Each record is flushed and synced before
/// `write` returns; existing lines are never touched.
pub struct LocalJsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalJsonlSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sink_err(&self, e: impl std::fmt::Display) -> AuditError {
        AuditError::Sink {
            sink: "local".into(),
            message: format!("{}: {}", self.path.display(), e),
        }
    }
}

#[async_trait]
impl AuditSink for LocalJsonlSink {
    fn name(&self) -> &str {
        "local"
    }

    async fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line =
            serde_json::to_string(record).map_err(|e| AuditError::Encode(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| self.sink_err(e))?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.sink_err(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.sink_err(e))?;
        file.flush().await.map_err(|e| self.sink_err(e))?;
        file.sync_data().await.map_err(|e| self.sink_err(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record(turn: u32) -> AuditRecord {
        AuditRecord::new(Utc::now(), "s", "velle_query", turn, "/context", "injected")
    }

    #[tokio::test]
    async fn test_appends_one_line_per_record() {
        let dir = TempDir::new().unwrap();
        let sink = LocalJsonlSink::new(dir.path().join("nested/audit.jsonl"));
        sink.write(&record(1)).await.unwrap();
        sink.write(&record(2)).await.unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: AuditRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.turn, 1);
        assert_eq!(first.payload, "/context");
    }

    #[tokio::test]
    async fn test_existing_lines_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        std::fs::write(&path, "{\"pre\":\"existing\"}\n").unwrap();

        let sink = LocalJsonlSink::new(path.clone());
        sink.write(&record(1)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\"pre\":\"existing\"}\n"));
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_writes_do_not_interleave() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(LocalJsonlSink::new(dir.path().join("audit.jsonl")));
        let mut tasks = Vec::new();
        for turn in 0..20 {
            let sink = sink.clone();
            tasks.push(tokio::spawn(async move { sink.write(&record(turn)).await }));
        }
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content.lines().count(), 20);
        for line in content.lines() {
            serde_json::from_str::<AuditRecord>(line).unwrap();
        }
    }

    #[tokio::test]
    async fn test_unwritable_path_is_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be.
        let sink = LocalJsonlSink::new(dir.path().to_path_buf());
        let err = sink.write(&record(1)).await.unwrap_err();
        assert!(matches!(err, AuditError::Sink { .. }));
    }
}
