use crate::{ClientId, EntryId, Hours, ProjectId, TimebankId, UserId, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const NOTE_MAX_LEN: usize = 2_000;
pub const WORK_DATE_MIN: NaiveDate = match NaiveDate::from_ymd_opt(2000, 1, 1) {
    Some(d) => d,
    None => panic!("valid calendar date"),
};
pub const WORK_DATE_MAX: NaiveDate = match NaiveDate::from_ymd_opt(2100, 1, 1) {
    Some(d) => d,
    None => panic!("valid calendar date"),
};

/// Calendar date the work happened, as opposed to when it was logged.
pub fn parse_work_date(input: &str) -> Result<NaiveDate, ValidationError> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError(format!("work date must be YYYY-MM-DD, got {input:?}")))?;
    check_work_date(date)?;
    Ok(date)
}

pub fn check_work_date(date: NaiveDate) -> Result<(), ValidationError> {
    if date < WORK_DATE_MIN || date > WORK_DATE_MAX {
        return Err(ValidationError(format!(
            "work date {date} outside {WORK_DATE_MIN}..{WORK_DATE_MAX}"
        )));
    }
    Ok(())
}

pub fn parse_note(input: &str) -> Result<String, ValidationError> {
    let s = input.trim();
    if s.len() > NOTE_MAX_LEN {
        return Err(ValidationError(format!(
            "note exceeds max length {NOTE_MAX_LEN}"
        )));
    }
    Ok(s.to_string())
}

/// One allocation slice: the hours a single log operation drew from a single
/// timebank. A log that spans several banks produces several entries sharing
/// `work_date`, `user_id`, and `note`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeEntry {
    pub id: EntryId,
    pub client_id: ClientId,
    pub project_id: ProjectId,
    pub timebank_id: TimebankId,
    pub user_id: UserId,
    pub work_date: NaiveDate,
    pub hours: Hours,
    pub note: Option<String>,
    pub logged_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_date_parses_iso_form() {
        let date = parse_work_date(" 2026-02-14 ").expect("parse");
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 2, 14).expect("date"));
    }

    #[test]
    fn work_date_rejects_out_of_window() {
        assert!(parse_work_date("1999-12-31").is_err());
        assert!(parse_work_date("2100-01-02").is_err());
        assert!(parse_work_date("02/14/2026").is_err());
    }

    #[test]
    fn note_is_trimmed_and_bounded() {
        assert_eq!(parse_note("  did things  ").expect("ok"), "did things");
        assert!(parse_note(&"n".repeat(NOTE_MAX_LEN + 1)).is_err());
    }
}
