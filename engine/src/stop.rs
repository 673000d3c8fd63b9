//! Stop signal.
//!
//! Sampled once per recipient boundary. Two sources request a stop:
//! a JSON file `{"stop": true}` re-read on every check, and an in-process
//! flag set by the interrupt handler.

use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
struct StopFile {
    #[serde(default)]
    stop: bool,
}

/// Cooperative stop request shared between the driver and the interrupt handler.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    file: Option<PathBuf>,
    interrupted: Arc<AtomicBool>,
}

impl StopSignal {
    /// Watch `file` for `{"stop": true}`.
    pub fn with_file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Record an in-process stop request (e.g. from Ctrl-C).
    pub fn request_stop(&self) {
        if !self.interrupted.swap(true, Ordering::SeqCst) {
            info!("stop requested, finishing current recipient");
        }
    }

    /// Whether an in-process stop was requested.
    pub fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Whether any source asks to stop. A missing or unreadable stop file
    /// means "keep going".
    pub fn stop_requested(&self) -> bool {
        self.interrupted() || self.file_requests_stop()
    }

    fn file_requests_stop(&self) -> bool {
        let Some(path) = &self.file else {
            return false;
        };
        std::fs::read_to_string(path)
            .ok()
            .and_then(|text| serde_json::from_str::<StopFile>(&text).ok())
            .is_some_and(|f| f.stop)
    }
}
