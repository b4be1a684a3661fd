//! Outcome of a single task execution attempt.

use crate::time::now_millis;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Resources opened during an execution attempt: open file handles and
/// temp-file paths. Released explicitly by the owner; the `Drop` impl is a
/// best-effort backstop only and must not be relied on for timing.
#[derive(Debug, Default)]
pub(crate) struct ResourceSet {
    file_handles: Vec<File>,
    temp_files: Vec<PathBuf>,
    released: bool,
}

impl ResourceSet {
    pub(crate) fn register_file_handle(&mut self, handle: File) {
        self.file_handles.push(handle);
    }

    pub(crate) fn register_temp_file(&mut self, path: PathBuf) {
        self.temp_files.push(path);
    }

    /// Release everything. Idempotent; individual failures are logged and
    /// skipped so one bad handle never blocks the rest.
    pub(crate) fn release(&mut self) {
        for handle in self.file_handles.drain(..) {
            drop(handle);
        }
        for path in self.temp_files.drain(..) {
            if let Err(e) = std::fs::remove_file(&path) {
                debug!(path = %path.display(), error = %e, "Failed to remove temp file");
            }
        }
        self.released = true;
    }

    pub(crate) fn released(&self) -> bool {
        self.released
    }
}

impl Drop for ResourceSet {
    fn drop(&mut self) {
        if !self.released {
            self.release();
        }
    }
}

/// The terminal record of one execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Whether the attempt succeeded.
    pub success: bool,

    /// Agent-produced payload (step records, tool output, ...).
    pub output: serde_json::Value,

    /// Failure reason; present iff `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Elapsed seconds for the attempt, always >= 0.
    pub execution_time: f64,

    /// Free-form execution metadata (analysis, tools used, iterations).
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Completion stamp (unix millis); drives retention cleanup.
    pub completed_at: u64,

    /// Resources owned by this attempt. Shared across clones so release
    /// happens exactly once even when the result is recorded in several maps.
    #[serde(skip)]
    resources: Arc<Mutex<ResourceSet>>,
}

impl TaskResult {
    pub fn ok(output: serde_json::Value, execution_time: f64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            execution_time: execution_time.max(0.0),
            metadata: serde_json::Map::new(),
            completed_at: now_millis(),
            resources: Arc::default(),
        }
    }

    pub fn err(error: impl Into<String>, execution_time: f64) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error.into()),
            execution_time: execution_time.max(0.0),
            metadata: serde_json::Map::new(),
            completed_at: now_millis(),
            resources: Arc::default(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Register an open file handle to be closed on release.
    pub fn register_file_handle(&self, handle: File) {
        self.resources.lock().unwrap().register_file_handle(handle);
    }

    /// Register a temp file to be removed on release.
    pub fn register_temp_file(&self, path: impl Into<PathBuf>) {
        self.resources.lock().unwrap().register_temp_file(path.into());
    }

    /// Release all tracked resources. Idempotent and infallible: per-resource
    /// failures are logged and skipped.
    pub fn release_resources(&self) {
        self.resources.lock().unwrap().release();
    }

    /// Whether an explicit release has already happened.
    pub fn resources_released(&self) -> bool {
        self.resources.lock().unwrap().released()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn error_present_iff_failure() {
        let ok = TaskResult::ok(serde_json::json!({"steps": []}), 1.5);
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = TaskResult::err("tool exploded", 0.2);
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("tool exploded"));
    }

    #[test]
    fn execution_time_clamped_to_zero() {
        let result = TaskResult::ok(serde_json::Value::Null, -3.0);
        assert_eq!(result.execution_time, 0.0);
    }

    #[test]
    fn release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.txt");
        std::fs::write(&path, b"scratch").unwrap();

        let result = TaskResult::ok(serde_json::Value::Null, 0.1);
        result.register_temp_file(&path);

        result.release_resources();
        assert!(!path.exists());
        assert!(result.resources_released());

        // Second release: no error, no double-free.
        result.release_resources();
        assert!(result.resources_released());
    }

    #[test]
    fn drop_backstop_releases_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leftover.txt");

        {
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(b"leftover").unwrap();
            let result = TaskResult::err("died before cleanup", 0.0);
            result.register_temp_file(&path);
            result.register_file_handle(file);
            // No explicit release before the result goes out of scope.
        }

        assert!(!path.exists());
    }

    #[test]
    fn clones_share_one_resource_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.txt");
        std::fs::write(&path, b"shared").unwrap();

        let result = TaskResult::ok(serde_json::Value::Null, 0.1);
        result.register_temp_file(&path);
        let copy = result.clone();

        copy.release_resources();
        assert!(!path.exists());
        assert!(result.resources_released());
    }

    #[test]
    fn serialization_roundtrip_preserves_timestamps() {
        let result = TaskResult::ok(serde_json::json!("done"), 2.25)
            .with_metadata("iterations", serde_json::json!(3));
        let json = serde_json::to_string(&result).unwrap();
        let back: TaskResult = serde_json::from_str(&json).unwrap();

        assert!(back.success);
        assert_eq!(back.execution_time, 2.25);
        assert_eq!(back.completed_at, result.completed_at);
        assert_eq!(back.metadata["iterations"], serde_json::json!(3));
    }
}
