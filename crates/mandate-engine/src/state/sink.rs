use std::sync::Mutex;
use std::time::Duration;

use mandate_core::errors::AuditError;
use mandate_core::traits::{AuditEntry, AuditSink};

use super::atomic::AdvisoryLock;
use super::audit_log::append_audit;

/// Persistent audit sink writing a hash-chained JSONL file.
///
/// Writers in this process serialize on a mutex; other processes are kept
/// out by an advisory lock held for the duration of each append.
pub struct JsonlAuditSink {
    path: String,
    writer: Mutex<()>,
}

impl JsonlAuditSink {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn log(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let _guard = self
            .writer
            .lock()
            .map_err(|_| AuditError::WriteFailure(format!("{}: writer poisoned", self.path)))?;
        let lock = AdvisoryLock::acquire_with_retry(&self.path, 50, Duration::from_millis(10))
            .map_err(|e| AuditError::WriteFailure(format!("{e:#}")))?;
        append_audit(&self.path, entry).map_err(|e| AuditError::WriteFailure(format!("{e:#}")))?;
        lock.release()
            .map_err(|e| AuditError::WriteFailure(format!("{e:#}")))
    }
}
