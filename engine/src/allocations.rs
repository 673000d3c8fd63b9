//! Allocation lists.
//!
//! An allocation list is a JSON array of
//! `{recipient, amount, lockBlocks, vestingBlocks}` objects, identified by the
//! path it was loaded from. Entries are validated into typed [`Allocation`]s
//! when loaded so bad amounts surface before any funds move.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;
use vestdrop_types::{Allocation, Amount};

use crate::amounts::{DistributionMode, InvalidAmount};
use crate::error::EngineError;

/// Untyped record as it appears on disk.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAllocation {
    recipient: String,
    amount: Value,
    #[serde(default)]
    lock_blocks: i64,
    #[serde(default)]
    vesting_blocks: i64,
}

impl RawAllocation {
    fn into_allocation(self) -> Result<Allocation, InvalidAmount> {
        let amount = serde_json::from_value::<Amount>(self.amount.clone())
            .map_err(|_| InvalidAmount::Malformed(format!("amount {}", self.amount)))?;
        let blocks = |name: &str, v: i64| {
            u64::try_from(v).map_err(|_| InvalidAmount::Malformed(format!("{name} {v} is negative")))
        };
        Ok(Allocation {
            recipient: self.recipient.trim().to_string(),
            amount,
            lock_blocks: blocks("lockBlocks", self.lock_blocks)?,
            vesting_blocks: blocks("vestingBlocks", self.vesting_blocks)?,
        })
    }
}

/// An ordered, validated allocation list.
#[derive(Clone, Debug)]
pub struct AllocationList {
    id: String,
    entries: Vec<Allocation>,
}

impl AllocationList {
    pub fn new(id: impl Into<String>, entries: Vec<Allocation>) -> Self {
        Self {
            id: id.into(),
            entries,
        }
    }

    /// Read and type-check the list at `path`. Its identity is the path as given.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let invalid = |reason: String| EngineError::InvalidList {
            path: path.display().to_string(),
            reason,
        };
        let text = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let raw: Vec<RawAllocation> =
            serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;

        let entries = raw
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                r.into_allocation()
                    .map_err(|reason| EngineError::InvalidAmount { index: i + 1, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(path = %path.display(), entries = entries.len(), "allocation list loaded");
        Ok(Self::new(path.display().to_string(), entries))
    }

    /// Check every entry can be paid under `mode`.
    pub fn validate(&self, mode: DistributionMode) -> Result<(), EngineError> {
        for (i, entry) in self.entries.iter().enumerate() {
            mode.split(entry)
                .map_err(|reason| EngineError::InvalidAmount { index: i + 1, reason })?;
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at a 1-based index.
    pub fn get(&self, index: usize) -> Option<&Allocation> {
        index.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn entries(&self) -> &[Allocation] {
        &self.entries
    }

    /// Sum of the entries from 1-based `from_index` to the end.
    pub fn remaining_total(&self, from_index: usize) -> Amount {
        let skip = from_index.saturating_sub(1);
        self.entries.iter().skip(skip).map(|a| a.amount).sum()
    }

    pub fn total(&self) -> Amount {
        self.remaining_total(1)
    }

    pub fn summary(&self) -> ListSummary {
        ListSummary::of(&self.entries)
    }
}

/// Entry count, distinct recipients and total of a list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListSummary {
    pub entries: usize,
    pub unique_recipients: usize,
    pub total: Amount,
}

impl ListSummary {
    pub fn of(entries: &[Allocation]) -> Self {
        let unique: HashSet<&str> = entries.iter().map(|a| a.recipient.as_str()).collect();
        Self {
            entries: entries.len(),
            unique_recipients: unique.len(),
            total: entries.iter().map(|a| a.amount).sum(),
        }
    }
}

/// Merge duplicate recipients by summing their amounts.
///
/// The first entry for a recipient keeps its position and its lock and
/// vesting parameters. A merged total that does not fit is an error,
/// reported against the 1-based index of the entry that overflowed it.
pub fn squash(entries: &[Allocation]) -> Result<Vec<Allocation>, EngineError> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut squashed: Vec<Allocation> = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        match positions.get(entry.recipient.as_str()) {
            Some(&pos) => {
                let merged = &mut squashed[pos];
                merged.amount = merged.amount.checked_add(entry.amount).ok_or_else(|| {
                    EngineError::InvalidAmount {
                        index: i + 1,
                        reason: InvalidAmount::Overflow(entry.recipient.clone()),
                    }
                })?;
            }
            None => {
                positions.insert(entry.recipient.as_str(), squashed.len());
                squashed.push(entry.clone());
            }
        }
    }
    Ok(squashed)
}

/// Write `entries` as a JSON array with one compact object per line.
pub fn write_list(path: impl AsRef<Path>, entries: &[Allocation]) -> Result<(), EngineError> {
    let path = path.as_ref();
    let err = |e: &dyn std::fmt::Display| EngineError::persistence(path, e);
    let lines = entries
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| err(&e))?;
    let text = if lines.is_empty() {
        "[\n]\n".to_string()
    } else {
        format!("[\n{}\n]\n", lines.join(",\n"))
    };
    let mut file = fs::File::create(path).map_err(|e| err(&e))?;
    file.write_all(text.as_bytes()).map_err(|e| err(&e))?;
    file.sync_all().map_err(|e| err(&e))
}
