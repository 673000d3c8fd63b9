//! Transaction submitter.
//!
//! Drives one transaction from submission to a single terminal outcome by
//! folding its lifecycle events through a [`Classifier`]. The whole wait is
//! bounded by a timeout; an abandoned transaction is never retried here.

use futures_util::StreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};
use vestdrop_chain::{ChainClient, ChainError, SenderAccount};
use vestdrop_types::{BlockHash, Call, TxStatus};

use crate::audit::AuditLog;
use crate::classifier::{Classifier, Verdict};

/// Terminal outcome of one submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxOutcome {
    Succeeded(BlockHash),
    Failed,
    TimedOut,
    /// Not submitted: the run is a dry run.
    DryRun,
}

impl TxOutcome {
    pub fn block(&self) -> Option<BlockHash> {
        match self {
            Self::Succeeded(block) => Some(*block),
            Self::Failed | Self::TimedOut | Self::DryRun => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut)
    }
}

enum WatchEnd {
    Terminal(Verdict, TxStatus),
    Closed,
}

/// Submit `call` and wait for its terminal outcome, for at most `timeout`.
///
/// Never fails: setup errors, rejected transactions, closed subscriptions
/// and timeouts all resolve to a non-success outcome and a log line.
pub async fn submit_transaction<C: ChainClient>(
    chain: &C,
    sender: &SenderAccount,
    call: &Call,
    timeout: Duration,
    log: &mut AuditLog,
) -> TxOutcome {
    let watch = async {
        let mut events = chain.submit_and_watch(sender, call).await?;
        let mut classifier = Classifier::new();
        while let Some(status) = events.next().await {
            debug!(call = call.name(), %status, "transaction status");
            if let TxStatus::Retracted { block } = &status {
                warn!(call = call.name(), %block, "block retracted, still waiting");
                log.write("Retracted ... ");
            }
            let verdict = classifier.observe(&status);
            if verdict.is_terminal() {
                return Ok(WatchEnd::Terminal(verdict, status));
            }
        }
        Ok::<_, ChainError>(WatchEnd::Closed)
    };

    let result = tokio::time::timeout(timeout, watch).await;
    match result {
        Ok(Ok(WatchEnd::Terminal(Verdict::Succeeded(block), _))) => {
            info!(call = call.name(), dest = call.dest(), %block, "transaction succeeded");
            log.write(&format!("OK in block {block}\n"));
            TxOutcome::Succeeded(block)
        }
        Ok(Ok(WatchEnd::Terminal(_, status))) => {
            warn!(call = call.name(), dest = call.dest(), %status, "transaction failed");
            log.write(&format!("Tx failed. Status: {status}\n"));
            TxOutcome::Failed
        }
        Ok(Ok(WatchEnd::Closed)) => {
            warn!(call = call.name(), dest = call.dest(), "subscription closed before a terminal status");
            log.write("Tx failed. Status: subscription closed\n");
            TxOutcome::Failed
        }
        Ok(Err(e)) => {
            warn!(call = call.name(), dest = call.dest(), "submission error: {e}");
            log.write(&format!("Error: {e}\n"));
            TxOutcome::Failed
        }
        Err(_) => {
            warn!(call = call.name(), dest = call.dest(), ?timeout, "transaction timed out");
            log.write("Transaction timeout\n");
            TxOutcome::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vestdrop_nullables::{NullChain, Script};
    use vestdrop_types::{Amount, ExecutionEvent};

    const TIMEOUT: Duration = Duration::from_millis(200);

    fn sender() -> SenderAccount {
        SenderAccount::new("5Sender", "//Alice")
    }

    fn transfer() -> Call {
        Call::Transfer {
            dest: "5Dest".into(),
            value: Amount::ONE_UNIT,
        }
    }

    fn logged(dir: &tempfile::TempDir) -> String {
        std::fs::read_to_string(dir.path().join("log.txt")).unwrap()
    }

    fn open_log(dir: &tempfile::TempDir) -> AuditLog {
        AuditLog::open(dir.path().join("log.txt"), false).unwrap()
    }

    #[tokio::test]
    async fn success_resolves_with_block() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = open_log(&dir);
        let chain = NullChain::new();
        let block = BlockHash::new([9; 32]);
        chain.enqueue(Script::success(block));

        let outcome = submit_transaction(&chain, &sender(), &transfer(), TIMEOUT, &mut log).await;
        assert_eq!(outcome, TxOutcome::Succeeded(block));
        assert_eq!(logged(&dir), format!("OK in block {block}\n"));
    }

    #[tokio::test]
    async fn extrinsic_failure_resolves_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = open_log(&dir);
        let chain = NullChain::new();
        chain.enqueue(Script::failure(BlockHash::ZERO));

        let outcome = submit_transaction(&chain, &sender(), &transfer(), TIMEOUT, &mut log).await;
        assert_eq!(outcome, TxOutcome::Failed);
        assert!(logged(&dir).starts_with("Tx failed. Status: InBlock("));
    }

    #[tokio::test]
    async fn retraction_keeps_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = open_log(&dir);
        let chain = NullChain::new();
        let block = BlockHash::new([3; 32]);
        chain.enqueue(Script::Events(vec![
            TxStatus::Ready,
            TxStatus::Retracted { block: BlockHash::ZERO },
            TxStatus::Finalized {
                block,
                events: vec![ExecutionEvent::extrinsic_success()],
            },
        ]));

        let outcome = submit_transaction(&chain, &sender(), &transfer(), TIMEOUT, &mut log).await;
        assert_eq!(outcome, TxOutcome::Succeeded(block));
        assert_eq!(logged(&dir), format!("Retracted ... OK in block {block}\n"));
    }

    #[tokio::test]
    async fn silence_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = open_log(&dir);
        let chain = NullChain::new();
        chain.enqueue(Script::hang());

        let outcome = submit_transaction(
            &chain,
            &sender(),
            &transfer(),
            Duration::from_millis(50),
            &mut log,
        )
        .await;
        assert_eq!(outcome, TxOutcome::TimedOut);
        assert_eq!(logged(&dir), "Transaction timeout\n");
    }

    #[tokio::test]
    async fn setup_error_is_not_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = open_log(&dir);
        let chain = NullChain::new();
        chain.enqueue(Script::SetupError("connection dropped".into()));

        let outcome = submit_transaction(&chain, &sender(), &transfer(), TIMEOUT, &mut log).await;
        assert_eq!(outcome, TxOutcome::Failed);
        assert!(logged(&dir).starts_with("Error: "));
        assert!(logged(&dir).contains("connection dropped"));
    }

    #[tokio::test]
    async fn closed_stream_without_verdict_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = open_log(&dir);
        let chain = NullChain::new();
        chain.enqueue(Script::Events(vec![TxStatus::Ready, TxStatus::Broadcast]));

        let outcome = submit_transaction(&chain, &sender(), &transfer(), TIMEOUT, &mut log).await;
        assert_eq!(outcome, TxOutcome::Failed);
        assert!(outcome.block().is_none());
    }
}
