#![forbid(unsafe_code)]
//! Hour allocation across a client's timebanks.
//!
//! Pure planning: callers snapshot bank balances, ask for a plan, and hand
//! the plan to the store to apply in one transaction. Nothing here touches
//! storage or the clock.

use std::fmt::{Display, Formatter};
use timebank_model::{Hours, TimebankId};

mod depletion;
mod planner;

pub use depletion::{crossed_signal, next_status, standing_signal, warn_line, DepletionSignal};
pub use planner::{plan_allocation, AllocationPlan, AllocationSlice, BankSnapshot};

pub const CRATE_NAME: &str = "timebank-ledger";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    /// The client has no bank that could absorb the entry.
    NoAllocatableBanks,
    /// Logged amounts must be strictly positive.
    NonPositiveHours(Hours),
    /// The snapshot listed the same bank twice.
    DuplicateBank(TimebankId),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAllocatableBanks => write!(f, "client has no allocatable timebanks"),
            Self::NonPositiveHours(hours) => {
                write!(f, "logged hours must be positive, got {hours}")
            }
            Self::DuplicateBank(id) => write!(f, "bank {id} appears twice in the snapshot"),
        }
    }
}

impl std::error::Error for LedgerError {}
