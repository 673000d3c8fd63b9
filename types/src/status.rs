//! Transaction lifecycle events emitted by the chain after submission.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::block::BlockHash;

/// A runtime event raised while executing an extrinsic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub section: String,
    pub method: String,
}

impl ExecutionEvent {
    pub fn new(section: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            method: method.into(),
        }
    }

    pub fn extrinsic_success() -> Self {
        Self::new("system", "ExtrinsicSuccess")
    }

    pub fn extrinsic_failed() -> Self {
        Self::new("system", "ExtrinsicFailed")
    }

    pub fn is_extrinsic_success(&self) -> bool {
        self.method == "ExtrinsicSuccess"
    }

    pub fn is_extrinsic_failed(&self) -> bool {
        self.method == "ExtrinsicFailed"
    }
}

/// One step in a submitted transaction's lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TxStatus {
    Ready,
    Broadcast,
    Retracted {
        block: BlockHash,
    },
    InBlock {
        block: BlockHash,
        #[serde(default)]
        events: Vec<ExecutionEvent>,
    },
    Finalized {
        block: BlockHash,
        #[serde(default)]
        events: Vec<ExecutionEvent>,
    },
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("Ready"),
            Self::Broadcast => f.write_str("Broadcast"),
            Self::Retracted { block } => write!(f, "Retracted({block})"),
            Self::InBlock { block, .. } => write!(f, "InBlock({block})"),
            Self::Finalized { block, .. } => write!(f, "Finalized({block})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tagged_events() {
        let hash = "0x".to_string() + &"00".repeat(31) + "07";
        let json = format!(
            r#"[{{"status":"ready"}},{{"status":"inBlock","block":"{hash}","events":[{{"section":"system","method":"ExtrinsicSuccess"}}]}}]"#
        );
        let events: Vec<TxStatus> = serde_json::from_str(&json).unwrap();
        assert_eq!(events[0], TxStatus::Ready);
        match &events[1] {
            TxStatus::InBlock { events, .. } => assert!(events[0].is_extrinsic_success()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_events_default_to_empty() {
        let hash = "0x".to_string() + &"00".repeat(32);
        let json = format!(r#"{{"status":"finalized","block":"{hash}"}}"#);
        let status: TxStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(
            status,
            TxStatus::Finalized { block: BlockHash::ZERO, events: vec![] }
        );
    }
}
