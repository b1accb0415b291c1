// SPDX-License-Identifier: Apache-2.0

//! Query-parameter parsing. Handlers hand the raw query map here and get a
//! bounds-checked struct or an [`ApiError`] naming the offending parameter.

use crate::errors::ApiError;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use timebank_model::{ClientId, NotificationStatus, ProjectId, TimebankId, UserId};

pub const DEFAULT_PAGE_LIMIT: u32 = 100;
pub const MAX_PAGE_LIMIT: u32 = 500;
pub const MAX_CURSOR_BYTES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParams {
    pub limit: u32,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntriesParams {
    pub client: Option<ClientId>,
    pub project: Option<ProjectId>,
    pub user: Option<UserId>,
    pub bank: Option<TimebankId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: u32,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListNotificationsParams {
    pub status: Option<NotificationStatus>,
    pub limit: u32,
}

fn parse_limit(query: &BTreeMap<String, String>) -> Result<u32, ApiError> {
    let Some(raw) = query.get("limit") else {
        return Ok(DEFAULT_PAGE_LIMIT);
    };
    let value = raw
        .parse::<u32>()
        .map_err(|_| ApiError::invalid_param("limit", "must be an integer"))?;
    if value == 0 || value > MAX_PAGE_LIMIT {
        return Err(ApiError::invalid_param(
            "limit",
            "must be between 1 and 500",
        ));
    }
    Ok(value)
}

fn parse_cursor(query: &BTreeMap<String, String>) -> Result<Option<String>, ApiError> {
    let Some(raw) = query.get("cursor") else {
        return Ok(None);
    };
    if raw.is_empty() || raw.len() > MAX_CURSOR_BYTES {
        return Err(ApiError::invalid_param("cursor", "malformed cursor token"));
    }
    Ok(Some(raw.clone()))
}

pub fn parse_date_param(
    query: &BTreeMap<String, String>,
    name: &str,
) -> Result<Option<NaiveDate>, ApiError> {
    let Some(raw) = query.get(name) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ApiError::invalid_param(name, "expected YYYY-MM-DD"))
}

fn parse_id<T>(
    query: &BTreeMap<String, String>,
    name: &str,
    parse: impl Fn(&str) -> Result<T, timebank_model::ValidationError>,
) -> Result<Option<T>, ApiError> {
    match query.get(name) {
        None => Ok(None),
        Some(raw) => parse(raw)
            .map(Some)
            .map_err(|_| ApiError::invalid_param(name, "must be a uuid")),
    }
}

pub fn parse_page_params(query: &BTreeMap<String, String>) -> Result<PageParams, ApiError> {
    Ok(PageParams {
        limit: parse_limit(query)?,
        cursor: parse_cursor(query)?,
    })
}

pub fn parse_list_entries_params(
    query: &BTreeMap<String, String>,
) -> Result<ListEntriesParams, ApiError> {
    let from = parse_date_param(query, "from")?;
    let to = parse_date_param(query, "to")?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ApiError::invalid_param("from", "must not be after `to`"));
        }
    }
    Ok(ListEntriesParams {
        client: parse_id(query, "client", ClientId::parse)?,
        project: parse_id(query, "project", ProjectId::parse)?,
        user: parse_id(query, "user", UserId::parse)?,
        bank: parse_id(query, "bank", TimebankId::parse)?,
        from,
        to,
        limit: parse_limit(query)?,
        cursor: parse_cursor(query)?,
    })
}

pub fn parse_statement_params(
    query: &BTreeMap<String, String>,
) -> Result<StatementParams, ApiError> {
    let from = parse_date_param(query, "from")?;
    let to = parse_date_param(query, "to")?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ApiError::invalid_param("from", "must not be after `to`"));
        }
    }
    Ok(StatementParams { from, to })
}

pub fn parse_list_notifications_params(
    query: &BTreeMap<String, String>,
) -> Result<ListNotificationsParams, ApiError> {
    let status = match query.get("status") {
        None => None,
        Some(raw) => Some(
            NotificationStatus::parse(raw)
                .map_err(|_| ApiError::invalid_param("status", "unknown status"))?,
        ),
    };
    Ok(ListNotificationsParams {
        status,
        limit: parse_limit(query)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApiErrorCode;

    fn q(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn page_params_default_and_bound() {
        let parsed = parse_page_params(&q(&[])).expect("defaults");
        assert_eq!(parsed.limit, DEFAULT_PAGE_LIMIT);
        assert!(parsed.cursor.is_none());

        let err = parse_page_params(&q(&[("limit", "0")])).expect_err("zero limit");
        assert_eq!(err.code, ApiErrorCode::InvalidParameter);
        let err = parse_page_params(&q(&[("limit", "501")])).expect_err("over max");
        assert_eq!(err.details["parameter"], "limit");
    }

    #[test]
    fn oversize_cursor_is_rejected() {
        let long = "x".repeat(MAX_CURSOR_BYTES + 1);
        let err = parse_page_params(&q(&[("cursor", &long)])).expect_err("oversize cursor");
        assert_eq!(err.details["parameter"], "cursor");
    }

    #[test]
    fn entry_filter_parses_ids_and_dates() {
        let client = ClientId::new();
        let parsed = parse_list_entries_params(&q(&[
            ("client", &client.to_string()),
            ("from", "2026-01-01"),
            ("to", "2026-03-31"),
            ("limit", "25"),
        ]))
        .expect("parse");
        assert_eq!(parsed.client, Some(client));
        assert_eq!(parsed.limit, 25);
        assert_eq!(
            parsed.from,
            NaiveDate::from_ymd_opt(2026, 1, 1)
        );
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let err = parse_list_entries_params(&q(&[("from", "2026-03-31"), ("to", "2026-01-01")]))
            .expect_err("inverted range");
        assert_eq!(err.details["parameter"], "from");
    }

    #[test]
    fn bad_uuid_names_the_parameter() {
        let err =
            parse_list_entries_params(&q(&[("project", "not-a-uuid")])).expect_err("bad uuid");
        assert_eq!(err.details["parameter"], "project");
    }

    #[test]
    fn notification_status_filter() {
        let parsed =
            parse_list_notifications_params(&q(&[("status", "failed")])).expect("parse");
        assert_eq!(parsed.status, Some(NotificationStatus::Failed));
        assert!(parse_list_notifications_params(&q(&[("status", "bogus")])).is_err());
    }
}
