//! Batch driver.
//!
//! `Connecting → Loading → ConfirmationDelay → Processing(i) → Stopped | Done`
//!
//! Recipients are processed strictly one at a time against a single sender.
//! After each recipient the resume pointer is persisted and the stop signal
//! sampled; any error while processing a recipient halts the whole run
//! without advancing the pointer.

use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use vestdrop_chain::{ChainClient, SenderAccount};
use vestdrop_utils::format_duration;

use crate::allocations::AllocationList;
use crate::amounts::DistributionMode;
use crate::audit::{AuditCsv, AuditLog};
use crate::error::EngineError;
use crate::processor::{Payment, RecipientReport};
use crate::run_state::{RunState, RunStateStore};
use crate::stop::StopSignal;

/// Default TGE block of the Quartz distribution.
pub const DEFAULT_TGE_BLOCK: u64 = 10_457_457;

/// Parameters shared by every recipient of a run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Block from which lock and vesting periods are counted.
    pub tge_block: u64,
    /// SS58 format of the chain being paid on.
    pub chain_format: u16,
    /// SS58 format of the first audit column.
    pub audit_format: u16,
    pub mode: DistributionMode,
    pub tx_timeout: Duration,
    /// Operator cancellation window before the first payment.
    pub confirmation_delay: Duration,
    /// Walk the list writing the audit log and CSV, but submit nothing and
    /// leave the run state untouched.
    pub dry_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tge_block: DEFAULT_TGE_BLOCK,
            chain_format: 255,
            audit_format: 2,
            mode: DistributionMode::Vested,
            tx_timeout: Duration::from_secs(120),
            confirmation_delay: Duration::from_secs(30),
            dry_run: false,
        }
    }
}

/// Where the driver goes after a processed recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stopped,
    Done,
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The list is exhausted.
    Done { processed: usize },
    /// A stop was requested; the next run resumes at `next_index`.
    Stopped { processed: usize, next_index: usize },
    /// Interrupted during the confirmation countdown; nothing was sent.
    Cancelled,
}

#[derive(Debug)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub state: RunState,
    pub reports: Vec<RecipientReport>,
}

/// Drives one allocation list from its resume point.
pub struct Distributor<'a, C> {
    chain: &'a C,
    sender: &'a SenderAccount,
    config: RunConfig,
    state_store: RunStateStore,
    stop: StopSignal,
    log: AuditLog,
    csv: AuditCsv,
}

impl<'a, C: ChainClient> Distributor<'a, C> {
    pub fn new(
        chain: &'a C,
        sender: &'a SenderAccount,
        config: RunConfig,
        state_store: RunStateStore,
        stop: StopSignal,
        log: AuditLog,
        csv: AuditCsv,
    ) -> Self {
        Self {
            chain,
            sender,
            config,
            state_store,
            stop,
            log,
            csv,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run `list` from its persisted resume point until done or stopped.
    pub async fn run(&mut self, list: &AllocationList) -> Result<RunSummary, EngineError> {
        let started = Instant::now();

        // Loading
        list.validate(self.config.mode)?;
        let balance = self.chain.free_balance(&self.sender.address).await?;
        let state = self.state_store.load(list.id())?;
        let start = state.next_index(list.id());
        let remaining = list.remaining_total(start);
        info!(
            list = list.id(),
            entries = list.len(),
            sender = %self.sender.address,
            %balance,
            mode = %self.config.mode,
            dry_run = self.config.dry_run,
            "allocation list loaded"
        );
        info!(start, %remaining, "resume point");
        self.log.echo(&format!(
            "Number of addresses: {}\nSender address: {}\nSender initial balance: {balance}\nStarting at: {start}\nRemaining to distribute: {remaining}\n",
            list.len(),
            self.sender.address,
        ));
        if balance < remaining {
            warn!(%balance, %remaining, "sender balance is below the remaining total");
        }

        if list.get(start).is_none() {
            info!(list = list.id(), "nothing left to distribute");
            return Ok(RunSummary {
                outcome: RunOutcome::Done { processed: 0 },
                state,
                reports: Vec::new(),
            });
        }

        // ConfirmationDelay, skipped on a dry run
        if !self.config.dry_run && !self.countdown(list, start).await {
            warn!("run cancelled before any transfer");
            return Ok(RunSummary {
                outcome: RunOutcome::Cancelled,
                state,
                reports: Vec::new(),
            });
        }

        // Processing
        let mut state = state;
        let mut index = start;
        let mut reports = Vec::new();
        let outcome = loop {
            let (next_state, step, report) = self.step(list, state, index).await?;
            state = next_state;
            reports.push(report);
            match step {
                Step::Continue => index += 1,
                Step::Done => break RunOutcome::Done { processed: reports.len() },
                Step::Stopped => {
                    break RunOutcome::Stopped {
                        processed: reports.len(),
                        next_index: index + 1,
                    }
                }
            }
        };

        let failed = reports.iter().filter(|r| !r.all_succeeded()).count();
        info!(
            ?outcome,
            failed,
            elapsed = %format_duration(started.elapsed()),
            "run finished"
        );
        Ok(RunSummary {
            outcome,
            state,
            reports,
        })
    }

    /// Process recipient `index`, persist the advanced pointer, and decide
    /// what comes next.
    pub async fn step(
        &mut self,
        list: &AllocationList,
        state: RunState,
        index: usize,
    ) -> Result<(RunState, Step, RecipientReport), EngineError> {
        let allocation = list.get(index).ok_or_else(|| EngineError::InvalidList {
            path: list.id().to_string(),
            reason: format!("no recipient at index {index}"),
        })?;
        let payment = Payment {
            chain: self.chain,
            sender: self.sender,
            config: &self.config,
        };
        let report = match payment.process(index, allocation, &mut self.log, &self.csv).await {
            Ok(report) => report,
            Err(e) => {
                error!(index, "halting run: {e}");
                self.log.write(&format!("Error: {e}\n"));
                return Err(e);
            }
        };

        let state = state.with_next_index(list.id(), index + 1);
        if !self.config.dry_run {
            self.state_store.save(&state)?;
        }

        let step = if index >= list.len() {
            Step::Done
        } else if self.stop.stop_requested() {
            info!(next = index + 1, "stop requested, run paused");
            Step::Stopped
        } else {
            Step::Continue
        };
        Ok((state, step, report))
    }

    /// Count down the confirmation delay. Returns `false` if interrupted.
    async fn countdown(&self, list: &AllocationList, start: usize) -> bool {
        let first = list
            .get(start)
            .map(|a| a.recipient.as_str())
            .unwrap_or_default();
        let mut left = self.config.confirmation_delay.as_secs();
        while left > 0 {
            if self.stop.interrupted() {
                return false;
            }
            self.log.echo(&format!(
                "WARNING: Will start with recipient {start} ({first}) in {left} seconds ...        \r"
            ));
            tokio::time::sleep(Duration::from_secs(1)).await;
            left -= 1;
        }
        if self.config.confirmation_delay.as_secs() > 0 {
            self.log.echo("\n");
        }
        !self.stop.interrupted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vestdrop_crypto::encode_address;
    use crate::submitter::TxOutcome;
    use vestdrop_nullables::NullChain;
    use vestdrop_types::{Allocation, Amount};

    struct Fixture {
        dir: tempfile::TempDir,
        chain: NullChain,
        sender: SenderAccount,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                chain: NullChain::new(),
                sender: SenderAccount::new("5Sender", "//Alice"),
            }
        }

        fn distributor(&self, stop: StopSignal) -> Distributor<'_, NullChain> {
            let config = RunConfig {
                tx_timeout: Duration::from_millis(50),
                confirmation_delay: Duration::ZERO,
                ..RunConfig::default()
            };
            Distributor::new(
                &self.chain,
                &self.sender,
                config,
                RunStateStore::new(self.dir.path().join("state.json")),
                stop,
                AuditLog::open(self.dir.path().join("log.txt"), false).unwrap(),
                AuditCsv::new(self.dir.path().join("audit.csv")),
            )
        }
    }

    fn list(n: u8) -> AllocationList {
        let entries = (1..=n)
            .map(|i| Allocation {
                recipient: encode_address(&[i; 32], 42).unwrap(),
                amount: Amount::from_units(10),
                lock_blocks: 0,
                vesting_blocks: 3,
            })
            .collect();
        AllocationList::new("list.json", entries)
    }

    #[tokio::test]
    async fn runs_to_completion() {
        let f = Fixture::new();
        let summary = f.distributor(StopSignal::default()).run(&list(3)).await.unwrap();
        assert_eq!(summary.outcome, RunOutcome::Done { processed: 3 });
        assert_eq!(summary.state.next_index("list.json"), 4);
        assert_eq!(f.chain.submitted().len(), 6);
    }

    #[tokio::test]
    async fn finished_list_does_nothing() {
        let f = Fixture::new();
        RunStateStore::new(f.dir.path().join("state.json"))
            .save(&RunState::default().with_next_index("list.json", 4))
            .unwrap();
        let summary = f.distributor(StopSignal::default()).run(&list(3)).await.unwrap();
        assert_eq!(summary.outcome, RunOutcome::Done { processed: 0 });
        assert!(f.chain.submitted().is_empty());
    }

    #[tokio::test]
    async fn unreachable_chain_fails_before_processing() {
        let f = Fixture::new();
        f.chain.set_unreachable(true);
        let err = f
            .distributor(StopSignal::default())
            .run(&list(2))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Connection(_)));
        assert!(!f.dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn interrupt_during_countdown_cancels() {
        let f = Fixture::new();
        let stop = StopSignal::default();
        stop.request_stop();
        let mut distributor = f.distributor(stop);
        distributor.config.confirmation_delay = Duration::from_secs(5);

        let summary = distributor.run(&list(2)).await.unwrap();
        assert_eq!(summary.outcome, RunOutcome::Cancelled);
        assert!(f.chain.submitted().is_empty());
    }

    #[tokio::test]
    async fn dry_run_writes_audit_but_moves_nothing() {
        let f = Fixture::new();
        let mut distributor = f.distributor(StopSignal::default());
        distributor.config.dry_run = true;
        distributor.config.confirmation_delay = Duration::from_secs(30);

        let started = Instant::now();
        let summary = distributor.run(&list(3)).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5), "countdown was not skipped");
        assert_eq!(summary.outcome, RunOutcome::Done { processed: 3 });
        assert!(summary.reports.iter().all(|r| r.all_succeeded()));
        assert!(summary
            .reports
            .iter()
            .all(|r| r.transfer == TxOutcome::DryRun && r.vesting == Some(TxOutcome::DryRun)));
        assert!(f.chain.submitted().is_empty());
        assert!(!f.dir.path().join("state.json").exists());

        let csv = std::fs::read_to_string(f.dir.path().join("audit.csv")).unwrap();
        let rows: Vec<_> = csv.lines().collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], crate::audit::CSV_HEADER);
        assert!(rows[1..].iter().all(|r| r.ends_with(",,")));

        let log = std::fs::read_to_string(f.dir.path().join("log.txt")).unwrap();
        assert_eq!(log.matches("OK (dry run)").count(), 6);
    }

    #[tokio::test]
    async fn interrupt_stops_at_recipient_boundary() {
        let f = Fixture::new();
        let stop = StopSignal::default();
        let mut distributor = f.distributor(stop.clone());
        let list = list(3);
        let state = RunStateStore::new(f.dir.path().join("state.json"))
            .load(list.id())
            .unwrap();

        let (state, step, _) = distributor.step(&list, state, 1).await.unwrap();
        assert_eq!(step, Step::Continue);
        stop.request_stop();
        let (state, step, _) = distributor.step(&list, state, 2).await.unwrap();
        assert_eq!(step, Step::Stopped);
        assert_eq!(state.next_index(list.id()), 3);
    }
}
