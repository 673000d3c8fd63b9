//! Audit sinks.
//!
//! Two append-only records are kept for every run:
//! - the text log: human-readable progress fragments, echoed to stdout
//! - the CSV: one row per processed recipient with both transaction references

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;
use vestdrop_types::{Amount, BlockHash};

use crate::error::EngineError;

/// Column header of the audit CSV.
pub const CSV_HEADER: &str = "KSM Address,QTZ Address,QTZ Total Amount,Transferrable Amount,TGE Block,Lock blocks,Vesting Blocks,Amount per block,Transfer tx hash,Vesting tx hash";

// ── Text log ────────────────────────────────────────────────────────────

/// Append-only progress log.
///
/// Fragments are written verbatim (callers include their own newlines), so a
/// line like `3: Transfer 1 to ... OK in block 0x..` is built from two writes.
pub struct AuditLog {
    file: Option<File>,
    path: Option<PathBuf>,
    echo: bool,
}

impl AuditLog {
    /// Open (or create) the log at `path` for appending.
    pub fn open(path: impl AsRef<Path>, echo: bool) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| EngineError::persistence(path, e))?;
        Ok(Self {
            file: Some(file),
            path: Some(path.to_path_buf()),
            echo,
        })
    }

    /// A log that only echoes to stdout.
    pub fn stdout_only() -> Self {
        Self {
            file: None,
            path: None,
            echo: true,
        }
    }

    /// Append a fragment to the log file and echo it.
    ///
    /// Write failures are reported through tracing and otherwise ignored:
    /// losing a progress line never aborts a transfer.
    pub fn write(&mut self, fragment: &str) {
        self.echo(fragment);
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.write_all(fragment.as_bytes()) {
                let path = self.path.as_deref().unwrap_or(Path::new("?"));
                warn!(path = %path.display(), "audit log write failed: {e}");
            }
        }
    }

    /// Echo to stdout without touching the log file.
    pub fn echo(&self, fragment: &str) {
        if self.echo {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(fragment.as_bytes());
            let _ = stdout.flush();
        }
    }
}

// ── CSV ─────────────────────────────────────────────────────────────────

/// One recipient's audit record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditRow {
    /// Recipient in the audit (source network) address format.
    pub display_address: String,
    /// Recipient in the chain's canonical address format.
    pub chain_address: String,
    pub total: Amount,
    pub transferable: Amount,
    pub tge_block: u64,
    pub lock_blocks: u64,
    pub vesting_blocks: u64,
    /// Per-period vesting amount, in base units.
    pub per_period: Amount,
    pub transfer_block: Option<BlockHash>,
    pub vesting_block: Option<BlockHash>,
}

impl AuditRow {
    pub fn to_csv_line(&self) -> String {
        let reference = |b: &Option<BlockHash>| b.map(|h| h.to_string()).unwrap_or_default();
        format!(
            "{},{},{},{},{},{},{},{},{},{}",
            self.display_address,
            self.chain_address,
            self.total,
            self.transferable,
            self.tge_block,
            self.lock_blocks,
            self.vesting_blocks,
            self.per_period.raw(),
            reference(&self.transfer_block),
            reference(&self.vesting_block),
        )
    }
}

/// Append-only CSV of [`AuditRow`]s.
///
/// The header is written whenever the file is absent or empty, so a resumed
/// run never repeats it.
#[derive(Clone, Debug)]
pub struct AuditCsv {
    path: PathBuf,
}

impl AuditCsv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row and flush it to disk.
    pub fn append(&self, row: &AuditRow) -> Result<(), EngineError> {
        let err = |e: std::io::Error| EngineError::persistence(&self.path, e);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(err)?;
        let mut text = String::new();
        if file.metadata().map_err(err)?.len() == 0 {
            text.push_str(CSV_HEADER);
            text.push('\n');
        }
        text.push_str(&row.to_csv_line());
        text.push('\n');
        file.write_all(text.as_bytes()).map_err(err)?;
        file.sync_data().map_err(err)
    }
}
