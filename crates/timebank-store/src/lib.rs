#![forbid(unsafe_code)]
//! SQLite persistence for the timebank service.
//!
//! One connection behind a mutex, WAL journal, schema created with
//! `execute_batch` and versioned through `PRAGMA user_version`. Repositories
//! hang off [`Store`] as `impl` blocks per collection; the allocation write
//! path applies a whole ledger plan in a single transaction.

mod banks;
mod clients;
mod cursor;
mod entries;
mod error;
mod invites;
mod notifications;
mod schema;
mod sessions;
mod store;
mod summary;
mod users;

pub use banks::{NewTimebank, TimebankPatch};
pub use clients::{ClientPatch, NewClient};
pub use cursor::{
    decode_entry_cursor, encode_entry_cursor, CursorError, CursorErrorCode, EntryCursor,
    MAX_CURSOR_TOKEN_LEN,
};
pub use entries::{AllocationApplied, EntryDraft, EntryFilter, EntryPage};
pub use error::{StoreError, StoreErrorCode};
pub use invites::NewInvitation;
pub use schema::SQLITE_SCHEMA_VERSION;
pub use sessions::Session;
pub use store::Store;
pub use summary::{BankBreakdown, ClientSummary, DepletionScanRow, StatementRow};
pub use users::{NewUser, UserPatch};

pub const CRATE_NAME: &str = "timebank-store";
