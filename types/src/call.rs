//! Calls the distributor submits on behalf of the sender account.

use serde::{Deserialize, Serialize};

use crate::amount::{self, Amount};

/// A linear vesting schedule: `period_count` releases of `per_period`,
/// one every `period` blocks, starting at block `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VestingSchedule {
    pub start: u64,
    pub period: u64,
    pub period_count: u64,
    #[serde(with = "amount::as_raw")]
    pub per_period: Amount,
}

/// An extrinsic to sign and submit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum Call {
    /// `balances.transfer`
    #[serde(rename_all = "camelCase")]
    Transfer {
        dest: String,
        #[serde(with = "amount::as_raw")]
        value: Amount,
    },
    /// `vesting.vestedTransfer`
    #[serde(rename_all = "camelCase")]
    VestedTransfer {
        dest: String,
        schedule: VestingSchedule,
    },
}

impl Call {
    pub fn dest(&self) -> &str {
        match self {
            Self::Transfer { dest, .. } | Self::VestedTransfer { dest, .. } => dest,
        }
    }

    /// Pallet-qualified name, as it appears in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "balances.transfer",
            Self::VestedTransfer { .. } => "vesting.vestedTransfer",
        }
    }
}
