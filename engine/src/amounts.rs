//! Amount calculator: splits a recipient's allocation into the immediate
//! transfer and the vested remainder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use vestdrop_types::{Allocation, Amount};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidAmount {
    #[error("total {0} is below one unit")]
    BelowOneUnit(Amount),

    #[error("vesting period count must be positive")]
    NoVestingPeriods,

    #[error("vested remainder {vested} truncates to zero per period over {periods} periods")]
    ZeroPerPeriod { vested: Amount, periods: u64 },

    #[error("transfer amount must be positive")]
    Zero,

    #[error("{0}")]
    Malformed(String),

    #[error("merged total for {0} overflows")]
    Overflow(String),
}

/// How each recipient is paid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistributionMode {
    /// One unit immediately, the remainder as a vested transfer.
    #[default]
    Vested,
    /// The whole amount as a single plain transfer.
    TransferOnly,
}

impl DistributionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vested => "vested",
            Self::TransferOnly => "transfer-only",
        }
    }

    /// Split `allocation` according to this mode.
    pub fn split(&self, allocation: &Allocation) -> Result<AmountSplit, InvalidAmount> {
        match self {
            Self::Vested => split_vested(allocation.amount, allocation.vesting_blocks),
            Self::TransferOnly => split_transfer_only(allocation.amount),
        }
    }
}

impl fmt::Display for DistributionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vested" => Ok(Self::Vested),
            "transfer-only" | "transfer_only" => Ok(Self::TransferOnly),
            other => Err(format!("unknown distribution mode {other:?}")),
        }
    }
}

/// A recipient's payment, in base units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmountSplit {
    /// Sent as a plain transfer.
    pub immediate: Amount,
    /// Total released by the vesting schedule.
    pub vested_total: Amount,
    /// Released each vesting period.
    pub per_period: Amount,
}

/// One unit now, `(total - 1) / periods` per period afterwards.
///
/// The truncation remainder of the per-period division is not redistributed.
pub fn split_vested(total: Amount, periods: u64) -> Result<AmountSplit, InvalidAmount> {
    if periods == 0 {
        return Err(InvalidAmount::NoVestingPeriods);
    }
    let vested_total = total
        .checked_sub(Amount::ONE_UNIT)
        .ok_or(InvalidAmount::BelowOneUnit(total))?;
    let per_period = vested_total
        .checked_div(periods)
        .ok_or(InvalidAmount::NoVestingPeriods)?;
    if per_period.is_zero() {
        return Err(InvalidAmount::ZeroPerPeriod {
            vested: vested_total,
            periods,
        });
    }
    Ok(AmountSplit {
        immediate: Amount::ONE_UNIT,
        vested_total,
        per_period,
    })
}

/// The whole amount as one transfer.
pub fn split_transfer_only(total: Amount) -> Result<AmountSplit, InvalidAmount> {
    if total.is_zero() {
        return Err(InvalidAmount::Zero);
    }
    Ok(AmountSplit {
        immediate: total,
        vested_total: Amount::ZERO,
        per_period: Amount::ZERO,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vestdrop_types::UNIT;

    #[test]
    fn hundred_over_nine_periods() {
        let split = split_vested(Amount::from_units(100), 9).unwrap();
        assert_eq!(split.immediate, Amount::from_units(1));
        assert_eq!(split.vested_total, Amount::from_units(99));
        assert_eq!(split.per_period, Amount::from_units(11));
    }

    #[test]
    fn truncation_remainder_is_dropped() {
        let split = split_vested(Amount::from_units(101), 3).unwrap();
        assert_eq!(split.vested_total, Amount::from_units(100));
        assert_eq!(split.per_period.raw(), 100 * UNIT / 3);
        assert_eq!(split.vested_total.raw() - split.per_period.raw() * 3, 1);
    }

    #[test]
    fn below_one_unit_rejected() {
        let total = Amount::new(UNIT - 1);
        assert_eq!(
            split_vested(total, 4),
            Err(InvalidAmount::BelowOneUnit(total))
        );
    }

    #[test]
    fn zero_periods_rejected() {
        assert_eq!(
            split_vested(Amount::from_units(10), 0),
            Err(InvalidAmount::NoVestingPeriods)
        );
    }

    #[test]
    fn exactly_one_unit_rejected() {
        assert!(matches!(
            split_vested(Amount::ONE_UNIT, 5),
            Err(InvalidAmount::ZeroPerPeriod { .. })
        ));
    }

    #[test]
    fn transfer_only_sends_everything() {
        let split = split_transfer_only(Amount::new(UNIT / 2)).unwrap();
        assert_eq!(split.immediate, Amount::new(UNIT / 2));
        assert!(split.vested_total.is_zero());
        assert_eq!(split_transfer_only(Amount::ZERO), Err(InvalidAmount::Zero));
    }

    #[test]
    fn mode_parses_and_displays() {
        assert_eq!("transfer-only".parse::<DistributionMode>().unwrap(), DistributionMode::TransferOnly);
        assert_eq!("VESTED".parse::<DistributionMode>().unwrap(), DistributionMode::Vested);
        assert!("airdrop".parse::<DistributionMode>().is_err());
        assert_eq!(DistributionMode::TransferOnly.to_string(), "transfer-only");
    }

    proptest! {
        #[test]
        fn split_conserves_total(
            raw in (UNIT + UNIT / 1000)..(1u128 << 100),
            periods in 1u64..1_000_000,
        ) {
            let total = Amount::new(raw);
            let split = split_vested(total, periods).unwrap();
            prop_assert_eq!(split.immediate + split.vested_total, total);

            let released = split.per_period.raw() * periods as u128;
            prop_assert!(released <= split.vested_total.raw());
            prop_assert!(split.vested_total.raw() - released < periods as u128);
            prop_assert!(split.vested_total.raw() < split.per_period.raw() * (periods as u128 + 1));
        }
    }
}
