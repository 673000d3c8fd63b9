//! Nullable chain: scripted submissions, recorded calls.

use futures_util::stream::{self, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use vestdrop_chain::{ChainClient, ChainError, SenderAccount, TxStatusStream};
use vestdrop_types::{Amount, BlockHash, Call, ExecutionEvent, TxStatus};

/// What the chain does with the next submitted transaction.
#[derive(Clone, Debug)]
pub enum Script {
    /// Emit these events, then close the stream.
    Events(Vec<TxStatus>),
    /// Emit these events, then go silent forever.
    Hang(Vec<TxStatus>),
    /// Fail while setting up the subscription.
    SetupError(String),
}

impl Script {
    /// Ready → InBlock(success) → Finalized(success) in `block`.
    pub fn success(block: BlockHash) -> Self {
        let events = vec![ExecutionEvent::extrinsic_success()];
        Self::Events(vec![
            TxStatus::Ready,
            TxStatus::InBlock { block, events: events.clone() },
            TxStatus::Finalized { block, events },
        ])
    }

    /// Ready → InBlock(ExtrinsicFailed).
    pub fn failure(block: BlockHash) -> Self {
        Self::Events(vec![
            TxStatus::Ready,
            TxStatus::InBlock {
                block,
                events: vec![ExecutionEvent::extrinsic_failed()],
            },
        ])
    }

    /// Ready → Broadcast, then nothing.
    pub fn hang() -> Self {
        Self::Hang(vec![TxStatus::Ready, TxStatus::Broadcast])
    }
}

/// A test chain that scripts transaction outcomes instead of submitting them.
///
/// Submissions consume scripts in order; once the queue is empty every
/// further submission succeeds in a block derived from its sequence number.
pub struct NullChain {
    scripts: Mutex<VecDeque<Script>>,
    submitted: Mutex<Vec<Call>>,
    balances: Mutex<HashMap<String, Amount>>,
    unreachable: Mutex<bool>,
}

impl NullChain {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            balances: Mutex::new(HashMap::new()),
            unreachable: Mutex::new(false),
        }
    }

    /// Queue the behaviour for the next unscripted submission.
    pub fn enqueue(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Set the free balance reported for `account`.
    pub fn set_balance(&self, account: &str, amount: Amount) {
        self.balances
            .lock()
            .unwrap()
            .insert(account.to_string(), amount);
    }

    /// Make every query fail with a connection error.
    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().unwrap() = unreachable;
    }

    /// All calls submitted so far (for assertions).
    pub fn submitted(&self) -> Vec<Call> {
        self.submitted.lock().unwrap().clone()
    }

    /// Deterministic block hash for the n-th submission (1-based).
    pub fn block_for(n: usize) -> BlockHash {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&(n as u64).to_be_bytes());
        BlockHash::new(bytes)
    }

    fn check_reachable(&self) -> Result<(), ChainError> {
        if *self.unreachable.lock().unwrap() {
            return Err(ChainError::Connection("null chain is unreachable".into()));
        }
        Ok(())
    }
}

impl Default for NullChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainClient for NullChain {
    async fn free_balance(&self, account: &str) -> Result<Amount, ChainError> {
        self.check_reachable()?;
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(account)
            .copied()
            .unwrap_or(Amount::ZERO))
    }

    async fn submit_and_watch(
        &self,
        _sender: &SenderAccount,
        call: &Call,
    ) -> Result<TxStatusStream, ChainError> {
        self.check_reachable()?;
        let sequence = {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(call.clone());
            submitted.len()
        };
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::success(Self::block_for(sequence)));

        match script {
            Script::Events(events) => Ok(stream::iter(events).boxed()),
            Script::Hang(events) => Ok(stream::iter(events).chain(stream::pending()).boxed()),
            Script::SetupError(reason) => Err(ChainError::Connection(reason)),
        }
    }
}
