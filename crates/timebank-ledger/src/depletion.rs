use serde::{Deserialize, Serialize};
use timebank_model::{Hours, TimebankStatus};

/// Balance conditions stakeholders are told about, strongest last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepletionSignal {
    Warning,
    Exhausted,
    Overdrawn,
}

impl DepletionSignal {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Exhausted => "exhausted",
            Self::Overdrawn => "overdrawn",
        }
    }
}

/// Remaining hours at which the warning fires: `warn_threshold_pct` percent
/// of the purchased pool, rounded down to a centihour.
#[must_use]
pub fn warn_line(purchased: Hours, warn_threshold_pct: u8) -> Hours {
    Hours::from_centihours(purchased.centihours() * i64::from(warn_threshold_pct) / 100)
}

/// Signal the balance is in right now, independent of how it got there.
/// Used by the periodic re-scan to catch anything the write path missed.
#[must_use]
pub fn standing_signal(
    purchased: Hours,
    remaining: Hours,
    warn_threshold_pct: u8,
) -> Option<DepletionSignal> {
    if remaining.is_negative() {
        return Some(DepletionSignal::Overdrawn);
    }
    if remaining.is_zero() {
        return Some(DepletionSignal::Exhausted);
    }
    if purchased.is_positive() && remaining < warn_line(purchased, warn_threshold_pct) {
        return Some(DepletionSignal::Warning);
    }
    None
}

/// Strongest threshold crossed by a balance change, if any. Only downward
/// crossings fire; refills never produce a signal.
#[must_use]
pub fn crossed_signal(
    purchased: Hours,
    remaining_before: Hours,
    remaining_after: Hours,
    warn_threshold_pct: u8,
) -> Option<DepletionSignal> {
    if remaining_after >= remaining_before {
        return None;
    }
    if remaining_after.is_negative() && !remaining_before.is_negative() {
        return Some(DepletionSignal::Overdrawn);
    }
    if !remaining_after.is_positive() && remaining_before.is_positive() {
        return Some(DepletionSignal::Exhausted);
    }
    let line = warn_line(purchased, warn_threshold_pct);
    if purchased.is_positive() && remaining_after < line && remaining_before >= line {
        return Some(DepletionSignal::Warning);
    }
    None
}

/// Status follows the balance, except that closed is terminal.
#[must_use]
pub fn next_status(current: TimebankStatus, remaining_after: Hours) -> TimebankStatus {
    match current {
        TimebankStatus::Closed => TimebankStatus::Closed,
        TimebankStatus::Active | TimebankStatus::Exhausted => {
            if remaining_after.is_positive() {
                TimebankStatus::Active
            } else {
                TimebankStatus::Exhausted
            }
        }
    }
}
