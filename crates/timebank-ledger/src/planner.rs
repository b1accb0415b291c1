// SPDX-License-Identifier: Apache-2.0

use crate::LedgerError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use timebank_model::{Hours, TimebankId};

/// Balance view of one allocatable bank at planning time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BankSnapshot {
    pub id: TimebankId,
    pub remaining: Hours,
    pub purchased_at: NaiveDate,
}

/// One draw against one bank. `remaining_before` is carried so the write
/// path can detect that a bank moved underneath the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllocationSlice {
    pub bank_id: TimebankId,
    pub hours: Hours,
    pub remaining_before: Hours,
    pub remaining_after: Hours,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllocationPlan {
    pub requested: Hours,
    pub slices: Vec<AllocationSlice>,
}

impl AllocationPlan {
    #[must_use]
    pub fn total(&self) -> Hours {
        self.slices
            .iter()
            .fold(Hours::ZERO, |acc, s| acc + s.hours)
    }
}

/// Distributes `requested` across the given banks.
///
/// Banks are ordered by ascending remaining balance (ties: older purchase
/// first, then id) and each contributes `min(remaining, left)`, clamped at
/// zero for all but the last bank. The last bank absorbs whatever is left,
/// going negative if it must, so a log is never rejected for lack of hours.
///
/// Emitted slices have strictly positive hours, at most one per bank, and
/// sum exactly to `requested`.
pub fn plan_allocation(
    requested: Hours,
    banks: &[BankSnapshot],
) -> Result<AllocationPlan, LedgerError> {
    if !requested.is_positive() {
        return Err(LedgerError::NonPositiveHours(requested));
    }
    if banks.is_empty() {
        return Err(LedgerError::NoAllocatableBanks);
    }
    let mut seen: BTreeSet<TimebankId> = BTreeSet::new();
    for bank in banks {
        if !seen.insert(bank.id) {
            return Err(LedgerError::DuplicateBank(bank.id));
        }
    }

    let mut ordered: Vec<&BankSnapshot> = banks.iter().collect();
    ordered.sort_by(|a, b| {
        a.remaining
            .cmp(&b.remaining)
            .then_with(|| a.purchased_at.cmp(&b.purchased_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut slices = Vec::new();
    let mut left = requested;
    let last_index = ordered.len() - 1;
    for (index, bank) in ordered.iter().enumerate() {
        if left.is_zero() {
            break;
        }
        let take = if index == last_index {
            left
        } else {
            bank.remaining.max(Hours::ZERO).min(left)
        };
        if !take.is_positive() {
            continue;
        }
        slices.push(AllocationSlice {
            bank_id: bank.id,
            hours: take,
            remaining_before: bank.remaining,
            remaining_after: bank.remaining - take,
        });
        left -= take;
    }

    debug_assert!(left.is_zero());
    Ok(AllocationPlan { requested, slices })
}
