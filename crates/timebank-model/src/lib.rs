#![forbid(unsafe_code)]
//! Timebank model SSOT.
//!
//! Every record and validated scalar the service persists or exchanges lives
//! here. Scalars are parsed, never constructed from raw input; records are
//! plain data with serde derives.

use std::fmt::{Display, Formatter};

mod bank;
mod client;
mod entry;
mod hours;
mod ids;
mod invite;
mod notification;
mod user;

pub use bank::{Timebank, TimebankName, TimebankStatus, BANK_NAME_MAX_LEN};
pub use client::{
    parse_warn_threshold_pct, Client, ClientName, Project, ProjectName,
    DEFAULT_WARN_THRESHOLD_PCT, LABEL_MAX_LEN,
};
pub use entry::{
    check_work_date, parse_note, parse_work_date, TimeEntry, NOTE_MAX_LEN, WORK_DATE_MAX,
    WORK_DATE_MIN,
};
pub use hours::{Hours, MAX_ABS_CENTIHOURS};
pub use ids::{ClientId, EntryId, InviteId, ProjectId, TimebankId, UserId};
pub use invite::{Invitation, InviteStatus};
pub use notification::{
    Notification, NotificationDraft, NotificationId, NotificationKind, NotificationStatus,
};
pub use user::{
    check_role_scope, EmailAddress, PersonName, Role, User, EMAIL_MAX_LEN, EMAIL_MIN_LEN,
    PERSON_NAME_MAX_LEN,
};

pub const CRATE_NAME: &str = "timebank-model";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}
