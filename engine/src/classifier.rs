//! Transaction outcome classifier.
//!
//! Maps lifecycle events for one transaction to a verdict. `Ready`,
//! `Broadcast` and `Retracted` keep the transaction pending. Inclusion or
//! finality is terminal: `ExtrinsicFailed` wins over `ExtrinsicSuccess`,
//! and a payload carrying neither marker counts as a failure.

use vestdrop_types::{BlockHash, TxStatus};

/// Classification of a single lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Pending,
    Succeeded(BlockHash),
    Failed,
}

impl Verdict {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Stateless classification of one event.
pub fn classify(status: &TxStatus) -> Verdict {
    match status {
        TxStatus::Ready | TxStatus::Broadcast | TxStatus::Retracted { .. } => Verdict::Pending,
        TxStatus::InBlock { block, events } | TxStatus::Finalized { block, events } => {
            if events.iter().any(|e| e.is_extrinsic_failed()) {
                Verdict::Failed
            } else if events.iter().any(|e| e.is_extrinsic_success()) {
                Verdict::Succeeded(*block)
            } else {
                Verdict::Failed
            }
        }
    }
}

/// Per-transaction classifier that latches the first terminal verdict.
///
/// Once terminal, every later event yields the same verdict again.
#[derive(Debug, Default)]
pub struct Classifier {
    terminal: Option<Verdict>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, status: &TxStatus) -> Verdict {
        if let Some(verdict) = &self.terminal {
            return verdict.clone();
        }
        let verdict = classify(status);
        if verdict.is_terminal() {
            self.terminal = Some(verdict.clone());
        }
        verdict
    }

    pub fn terminal(&self) -> Option<&Verdict> {
        self.terminal.as_ref()
    }
}
