//! Distributor configuration with TOML file support.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use vestdrop_crypto::MAX_FORMAT;
use vestdrop_engine::{DistributionMode, RunConfig, DEFAULT_TGE_BLOCK};
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    Parse(String),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Shortest interval between transaction status polls.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

/// Key reference handed to the node-side signer. Wiped on drop, never printed.
#[derive(Clone, Default)]
pub struct SignerRef(Zeroizing<String>);

impl SignerRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SignerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<'de> Deserialize<'de> for SignerRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Configuration for one distribution.
///
/// Loaded from a TOML file via [`DistributorConfig::from_toml_file`]; every
/// field can be overridden from the command line or a `VESTDROP_*` variable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistributorConfig {
    /// JSON-RPC endpoint of the node.
    #[serde(default = "default_node_url")]
    pub node_url: String,

    /// Address of the paying account.
    #[serde(default)]
    pub sender: Option<String>,

    /// Signer key reference. Never written back out.
    #[serde(default, skip_serializing)]
    pub signer: SignerRef,

    #[serde(default)]
    pub allocation_file: Option<PathBuf>,

    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    #[serde(default = "default_stop_file")]
    pub stop_file: PathBuf,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default = "default_csv_file")]
    pub csv_file: PathBuf,

    #[serde(default = "default_tge_block")]
    pub tge_block: u64,

    /// SS58 format recipients are paid in.
    #[serde(default = "default_chain_ss58_format")]
    pub chain_ss58_format: u16,

    /// SS58 format of the audit CSV's first column.
    #[serde(default = "default_audit_ss58_format")]
    pub audit_ss58_format: u16,

    /// "vested" or "transfer-only".
    #[serde(default)]
    pub mode: DistributionMode,

    #[serde(default = "default_tx_timeout_secs")]
    pub tx_timeout_secs: u64,

    #[serde(default = "default_confirmation_delay_secs")]
    pub confirmation_delay_secs: u64,

    /// Interval between transaction status polls, at least 100.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Write the audit trail without submitting anything or advancing
    /// the run state.
    #[serde(default)]
    pub dry_run: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_node_url() -> String {
    "http://127.0.0.1:9933".to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("run_state.json")
}

fn default_stop_file() -> PathBuf {
    PathBuf::from("stop.json")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("send_log.txt")
}

fn default_csv_file() -> PathBuf {
    PathBuf::from("send_log.csv")
}

fn default_tge_block() -> u64 {
    DEFAULT_TGE_BLOCK
}

fn default_chain_ss58_format() -> u16 {
    255
}

fn default_audit_ss58_format() -> u16 {
    2
}

fn default_tx_timeout_secs() -> u64 {
    120
}

fn default_confirmation_delay_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DistributorConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize to TOML, without the signer.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Engine parameters for a run. Rejects address formats outside the
    /// two-byte SS58 range and polling faster than [`MIN_POLL_INTERVAL_MS`].
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        check_format("chain_ss58_format", self.chain_ss58_format)?;
        check_format("audit_ss58_format", self.audit_ss58_format)?;
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                reason: format!(
                    "{} is below the minimum of {MIN_POLL_INTERVAL_MS}",
                    self.poll_interval_ms
                ),
            });
        }
        Ok(RunConfig {
            tge_block: self.tge_block,
            chain_format: self.chain_ss58_format,
            audit_format: self.audit_ss58_format,
            mode: self.mode,
            tx_timeout: Duration::from_secs(self.tx_timeout_secs),
            confirmation_delay: Duration::from_secs(self.confirmation_delay_secs),
            dry_run: self.dry_run,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn sender(&self) -> Result<&str, ConfigError> {
        self.sender
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("sender"))
    }

    pub fn signer(&self) -> Result<&str, ConfigError> {
        if self.signer.is_empty() {
            return Err(ConfigError::Missing("signer"));
        }
        Ok(self.signer.expose())
    }

    pub fn allocation_file(&self) -> Result<&Path, ConfigError> {
        self.allocation_file
            .as_deref()
            .ok_or(ConfigError::Missing("allocation_file"))
    }
}

fn check_format(field: &'static str, format: u16) -> Result<(), ConfigError> {
    if format > MAX_FORMAT {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{format} exceeds {MAX_FORMAT}"),
        });
    }
    Ok(())
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            node_url: default_node_url(),
            sender: None,
            signer: SignerRef::default(),
            allocation_file: None,
            state_file: default_state_file(),
            stop_file: default_stop_file(),
            log_file: default_log_file(),
            csv_file: default_csv_file(),
            tge_block: default_tge_block(),
            chain_ss58_format: default_chain_ss58_format(),
            audit_ss58_format: default_audit_ss58_format(),
            mode: DistributionMode::default(),
            tx_timeout_secs: default_tx_timeout_secs(),
            confirmation_delay_secs: default_confirmation_delay_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            dry_run: false,
        }
    }
}
