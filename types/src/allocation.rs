//! A single recipient's allocation.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// One recipient's total entitlement plus its lock and vesting parameters.
///
/// `amount` is held in base units; in JSON it is a human-readable decimal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub recipient: String,
    pub amount: Amount,
    #[serde(default)]
    pub lock_blocks: u64,
    #[serde(default)]
    pub vesting_blocks: u64,
}
