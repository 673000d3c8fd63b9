//! Recipient processor.
//!
//! Pays one recipient: the immediate transfer, then (in vested mode) the
//! vested transfer, then one audit row. The second transaction is attempted
//! whatever became of the first.

use tracing::{debug, info};
use vestdrop_chain::{ChainClient, SenderAccount};
use vestdrop_crypto::reencode_address;
use vestdrop_types::{Allocation, Call, VestingSchedule};

use crate::amounts::DistributionMode;
use crate::audit::{AuditCsv, AuditLog, AuditRow};
use crate::driver::RunConfig;
use crate::error::EngineError;
use crate::submitter::{submit_transaction, TxOutcome};

/// What happened to one recipient's transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipientReport {
    pub index: usize,
    pub recipient: String,
    pub transfer: TxOutcome,
    /// `None` in transfer-only mode.
    pub vesting: Option<TxOutcome>,
}

impl RecipientReport {
    /// No transaction failed or timed out. Dry-run outcomes count as succeeded.
    pub fn all_succeeded(&self) -> bool {
        !self.transfer.is_failure() && !self.vesting.is_some_and(|v| v.is_failure())
    }
}

/// The chain-side half of a recipient's payment.
pub(crate) struct Payment<'a, C> {
    pub chain: &'a C,
    pub sender: &'a SenderAccount,
    pub config: &'a RunConfig,
}

impl<C: ChainClient> Payment<'_, C> {
    /// Submit `call`, or only log it on a dry run.
    async fn send(&self, call: &Call, log: &mut AuditLog) -> TxOutcome {
        if self.config.dry_run {
            debug!(call = call.name(), dest = call.dest(), "dry run, not submitted");
            log.write("OK (dry run)\n");
            return TxOutcome::DryRun;
        }
        submit_transaction(self.chain, self.sender, call, self.config.tx_timeout, log).await
    }

    /// Process the recipient at 1-based `index`.
    ///
    /// Address and amount problems are returned as errors before anything is
    /// submitted. Transaction failures are not errors; they are recorded in
    /// the report and the audit row.
    pub async fn process(
        &self,
        index: usize,
        allocation: &Allocation,
        log: &mut AuditLog,
        csv: &AuditCsv,
    ) -> Result<RecipientReport, EngineError> {
        let config = self.config;
        let reencode = |format: u16| {
            reencode_address(&allocation.recipient, format).map_err(|source| {
                EngineError::InvalidAddress {
                    index,
                    address: allocation.recipient.clone(),
                    source,
                }
            })
        };
        let chain_address = reencode(config.chain_format)?;
        let display_address = reencode(config.audit_format)?;
        let split = config
            .mode
            .split(allocation)
            .map_err(|reason| EngineError::InvalidAmount { index, reason })?;

        log.write(&format!(
            "{index}: Transfer {} to {chain_address} ... ",
            split.immediate
        ));
        let transfer_call = Call::Transfer {
            dest: chain_address.clone(),
            value: split.immediate,
        };
        let transfer = self.send(&transfer_call, log).await;

        let vesting = match config.mode {
            DistributionMode::Vested => {
                log.write(&format!(
                    "{index}: Vesting {} to {chain_address} ... ",
                    split.vested_total
                ));
                let vested_call = Call::VestedTransfer {
                    dest: chain_address.clone(),
                    schedule: VestingSchedule {
                        start: config.tge_block.saturating_add(allocation.lock_blocks),
                        period: 1,
                        period_count: allocation.vesting_blocks,
                        per_period: split.per_period,
                    },
                };
                Some(self.send(&vested_call, log).await)
            }
            DistributionMode::TransferOnly => None,
        };

        let (lock_blocks, vesting_blocks) = match config.mode {
            DistributionMode::Vested => (allocation.lock_blocks, allocation.vesting_blocks),
            DistributionMode::TransferOnly => (0, 0),
        };
        csv.append(&AuditRow {
            display_address,
            chain_address: chain_address.clone(),
            total: allocation.amount,
            transferable: split.immediate,
            tge_block: config.tge_block,
            lock_blocks,
            vesting_blocks,
            per_period: split.per_period,
            transfer_block: transfer.block(),
            vesting_block: vesting.and_then(|v| v.block()),
        })?;

        let report = RecipientReport {
            index,
            recipient: chain_address,
            transfer,
            vesting,
        };
        info!(
            index,
            recipient = %report.recipient,
            ok = report.all_succeeded(),
            "recipient processed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vestdrop_crypto::encode_address;
    use vestdrop_nullables::{NullChain, Script};
    use vestdrop_types::Amount;

    fn recipient() -> String {
        encode_address(&[7; 32], 42).unwrap()
    }

    fn allocation(units: u64) -> Allocation {
        Allocation {
            recipient: recipient(),
            amount: Amount::from_units(units),
            lock_blocks: 10,
            vesting_blocks: 9,
        }
    }

    fn config(mode: DistributionMode) -> RunConfig {
        RunConfig {
            mode,
            tx_timeout: Duration::from_millis(50),
            confirmation_delay: Duration::ZERO,
            ..RunConfig::default()
        }
    }

    struct Sinks {
        dir: tempfile::TempDir,
        log: AuditLog,
        csv: AuditCsv,
    }

    fn sinks() -> Sinks {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::open(dir.path().join("log.txt"), false).unwrap();
        let csv = AuditCsv::new(dir.path().join("audit.csv"));
        Sinks { dir, log, csv }
    }

    #[tokio::test]
    async fn vested_recipient_gets_two_calls() {
        let chain = NullChain::new();
        let sender = SenderAccount::new("5Sender", "//Alice");
        let config = config(DistributionMode::Vested);
        let mut s = sinks();
        let payment = Payment { chain: &chain, sender: &sender, config: &config };

        let report = payment.process(1, &allocation(100), &mut s.log, &s.csv).await.unwrap();
        assert!(report.all_succeeded());

        let chain_address = encode_address(&[7; 32], 255).unwrap();
        let calls = chain.submitted();
        assert_eq!(
            calls[0],
            Call::Transfer { dest: chain_address.clone(), value: Amount::ONE_UNIT }
        );
        assert_eq!(
            calls[1],
            Call::VestedTransfer {
                dest: chain_address.clone(),
                schedule: VestingSchedule {
                    start: 10_457_467,
                    period: 1,
                    period_count: 9,
                    per_period: Amount::from_units(11),
                },
            }
        );

        let text = std::fs::read_to_string(s.dir.path().join("log.txt")).unwrap();
        assert!(text.starts_with(&format!("1: Transfer 1 to {chain_address} ... OK in block")));
        assert!(text.contains(&format!("1: Vesting 99 to {chain_address} ... OK in block")));

        let csv = std::fs::read_to_string(s.csv.path()).unwrap();
        let row = csv.lines().nth(1).unwrap();
        let kusama = encode_address(&[7; 32], 2).unwrap();
        assert!(row.starts_with(&format!("{kusama},{chain_address},100,1,10457457,10,9,11000000000000000000,")));
        assert!(row.ends_with(&NullChain::block_for(2).to_string()));
    }

    #[tokio::test]
    async fn failed_transfer_still_attempts_vesting() {
        let chain = NullChain::new();
        chain.enqueue(Script::hang());
        let sender = SenderAccount::new("5Sender", "//Alice");
        let config = config(DistributionMode::Vested);
        let mut s = sinks();
        let payment = Payment { chain: &chain, sender: &sender, config: &config };

        let report = payment.process(4, &allocation(100), &mut s.log, &s.csv).await.unwrap();
        assert_eq!(report.transfer, TxOutcome::TimedOut);
        assert_eq!(report.vesting, Some(TxOutcome::Succeeded(NullChain::block_for(2))));
        assert_eq!(chain.submitted().len(), 2);

        let csv = std::fs::read_to_string(s.csv.path()).unwrap();
        let row = csv.lines().nth(1).unwrap();
        let fields: Vec<_> = row.split(',').collect();
        assert_eq!(fields[8], "");
        assert_eq!(fields[9], NullChain::block_for(2).to_string());
    }

    #[tokio::test]
    async fn transfer_only_sends_full_amount_once() {
        let chain = NullChain::new();
        let sender = SenderAccount::new("5Sender", "//Alice");
        let config = config(DistributionMode::TransferOnly);
        let mut s = sinks();
        let payment = Payment { chain: &chain, sender: &sender, config: &config };

        let report = payment.process(1, &allocation(100), &mut s.log, &s.csv).await.unwrap();
        assert_eq!(report.vesting, None);
        assert_eq!(chain.submitted().len(), 1);
        assert!(matches!(
            &chain.submitted()[0],
            Call::Transfer { value, .. } if *value == Amount::from_units(100)
        ));

        let csv = std::fs::read_to_string(s.csv.path()).unwrap();
        let fields: Vec<_> = csv.lines().nth(1).unwrap().split(',').collect();
        assert_eq!(&fields[2..8], &["100", "100", "10457457", "0", "0", "0"]);
        assert_eq!(fields[9], "");
    }

    #[tokio::test]
    async fn bad_address_submits_nothing() {
        let chain = NullChain::new();
        let sender = SenderAccount::new("5Sender", "//Alice");
        let config = config(DistributionMode::Vested);
        let mut s = sinks();
        let payment = Payment { chain: &chain, sender: &sender, config: &config };
        let mut bad = allocation(100);
        bad.recipient = "not-an-address".into();

        let err = payment.process(3, &bad, &mut s.log, &s.csv).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidAddress { index: 3, .. }));
        assert!(chain.submitted().is_empty());
        assert!(!s.csv.path().exists());
    }

    #[tokio::test]
    async fn one_unit_allocation_is_rejected_in_vested_mode() {
        let chain = NullChain::new();
        let sender = SenderAccount::new("5Sender", "//Alice");
        let config = config(DistributionMode::Vested);
        let mut s = sinks();
        let payment = Payment { chain: &chain, sender: &sender, config: &config };

        let err = payment.process(1, &allocation(1), &mut s.log, &s.csv).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount { index: 1, .. }));
        assert!(chain.submitted().is_empty());
    }
}
