//! Destinations for completed submissions.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use survey_spec::Submission;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to encode submission: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write submission to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("sink rejected submission: {0}")]
    Rejected(String),
}

/// Receives one flattened record per completed session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn submit(&self, submission: &Submission) -> Result<(), SinkError>;
}

/// Appends each submission as one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl ExportSink for JsonLinesSink {
    async fn submit(&self, submission: &Submission) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(submission)?;
        line.push('\n');

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| self.write_error(err))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|err| self.write_error(err))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|err| self.write_error(err))?;
        file.flush().await.map_err(|err| self.write_error(err))?;

        tracing::debug!(
            path = %self.path.display(),
            sheet = %submission.sheet_name,
            "submission appended"
        );
        Ok(())
    }
}

/// Keeps submissions in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    submissions: Arc<Mutex<Vec<Submission>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ExportSink for MemorySink {
    async fn submit(&self, submission: &Submission) -> Result<(), SinkError> {
        let mut guard = self
            .submissions
            .lock()
            .map_err(|_| SinkError::Rejected("memory sink poisoned".into()))?;
        guard.push(submission.clone());
        Ok(())
    }
}
