//! Resumable batch-distribution engine.
//!
//! Pays a fixed allocation list from one sender account, one recipient at a
//! time, persisting a resume pointer after every recipient so that a run can
//! be stopped and restarted without paying anyone twice.

pub mod allocations;
pub mod amounts;
pub mod audit;
pub mod classifier;
pub mod driver;
pub mod error;
pub mod processor;
pub mod run_state;
pub mod stop;
pub mod submitter;

pub use allocations::{squash, write_list, AllocationList, ListSummary};
pub use amounts::{split_transfer_only, split_vested, AmountSplit, DistributionMode, InvalidAmount};
pub use audit::{AuditCsv, AuditLog, AuditRow, CSV_HEADER};
pub use classifier::{classify, Classifier, Verdict};
pub use driver::{Distributor, RunConfig, RunOutcome, RunSummary, Step, DEFAULT_TGE_BLOCK};
pub use error::EngineError;
pub use processor::RecipientReport;
pub use run_state::{RunState, RunStateStore};
pub use stop::StopSignal;
pub use submitter::{submit_transaction, TxOutcome};
