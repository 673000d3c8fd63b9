//! Fundamental types for vestdrop.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! fixed-point amounts, allocation records, block hashes, the calls submitted to
//! the chain, and the transaction lifecycle events the chain reports back.

pub mod allocation;
pub mod amount;
pub mod block;
pub mod call;
pub mod error;
pub mod status;

pub use allocation::Allocation;
pub use amount::{Amount, DECIMALS, UNIT};
pub use block::BlockHash;
pub use call::{Call, VestingSchedule};
pub use error::TypesError;
pub use status::{ExecutionEvent, TxStatus};
