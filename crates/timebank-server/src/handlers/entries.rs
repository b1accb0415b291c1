// SPDX-License-Identifier: Apache-2.0

//! Work logging. A logged entry is planned against the client's open banks
//! first, then the plan, its entry slices, bank debits and any notification
//! drafts are committed in one store transaction.

use crate::auth::{authenticate, require_client_role};
use crate::failure::ApiFailure;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use std::collections::BTreeMap;
use timebank_api::{
    parse_list_entries_params, ApiError, EntryLoggedResponse, ListResponse, LogEntryRequest,
};
use timebank_ledger::{next_status, plan_allocation, AllocationPlan};
use timebank_model::{check_work_date, parse_note, EntryId, Role, TimeEntry, Timebank, User};
use timebank_notify::{entry_logged_draft, slice_drafts_for_allocation};
use timebank_store::{EntryDraft, EntryFilter};

fn parse_entry_id(raw: &str) -> Result<EntryId, ApiFailure> {
    EntryId::parse(raw).map_err(|_| ApiError::invalid_param("id", "must be a uuid").into())
}

/// Banks as they will look after the plan commits, derived from the planned
/// slices so depletion drafts can be composed inside the same transaction.
fn predict_banks_after(
    state: &AppState,
    plan: &AllocationPlan,
) -> Result<Vec<Timebank>, ApiFailure> {
    let mut banks = Vec::with_capacity(plan.slices.len());
    for slice in &plan.slices {
        let mut bank = state.store.get_timebank(&slice.bank_id)?;
        bank.used_hours += slice.hours;
        bank.remaining_hours = slice.remaining_after;
        bank.status = next_status(bank.status, slice.remaining_after);
        banks.push(bank);
    }
    Ok(banks)
}

pub(crate) async fn log_entry_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LogEntryRequest>,
) -> Result<(StatusCode, Json<EntryLoggedResponse>), ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    require_client_role(&ctx.user, &body.client_id, Role::Member)?;

    // Members log their own hours; managers and admins may log for others.
    let target: User = match body.user_id {
        Some(id) if id != ctx.user.id => {
            if ctx.user.role == Role::Member {
                return Err(ApiError::forbidden("log hours for another member").into());
            }
            let target = state.store.get_user(&id)?;
            if ctx.user.role == Role::Manager && target.client_id != Some(body.client_id) {
                return Err(ApiError::forbidden("target outside your client scope").into());
            }
            target
        }
        _ => ctx.user.clone(),
    };
    if !target.active {
        return Err(ApiError::conflict("user is deactivated").into());
    }

    check_work_date(body.work_date)
        .map_err(|e| ApiError::invalid_param("work_date", &e.0))?;
    let note = match &body.note {
        Some(raw) => {
            let parsed = parse_note(raw).map_err(|e| ApiError::invalid_param("note", &e.0))?;
            (!parsed.is_empty()).then_some(parsed)
        }
        None => None,
    };

    let client = state.store.get_client(&body.client_id)?;
    if !client.active {
        return Err(ApiError::conflict("client is deactivated").into());
    }
    let project = state.store.get_project(&body.project_id)?;
    if project.client_id != body.client_id {
        return Err(ApiError::invalid_param("project_id", "project belongs to another client").into());
    }
    if !project.active {
        return Err(ApiError::conflict("project is archived").into());
    }

    let snapshots = state.store.bank_snapshots(&body.client_id)?;
    let plan = plan_allocation(body.hours, &snapshots)?;

    let banks_after = predict_banks_after(&state, &plan)?;
    let mut drafts = slice_drafts_for_allocation(&client, &plan, &banks_after);
    if client.notify_on_entry {
        drafts.push(entry_logged_draft(
            &client,
            project.name.as_str(),
            target.name.as_str(),
            body.work_date,
            plan.total(),
        ));
    }

    let applied = state.store.apply_allocation(
        &body.client_id,
        &EntryDraft {
            project_id: body.project_id,
            user_id: target.id,
            work_date: body.work_date,
            note,
        },
        &plan,
        &drafts,
        Utc::now(),
    )?;
    tracing::info!(
        client_id = %body.client_id,
        user_id = %target.id,
        hours = %body.hours,
        slices = applied.entries.len(),
        "entry logged"
    );
    Ok((
        StatusCode::CREATED,
        Json(EntryLoggedResponse {
            entries: applied.entries,
            banks: applied.banks,
        }),
    ))
}

pub(crate) async fn list_entries_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<ListResponse<TimeEntry>>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let params = parse_list_entries_params(&query)?;

    // Scoped callers get their filters clamped rather than rejected.
    let mut filter = EntryFilter {
        client: params.client,
        project: params.project,
        user: params.user,
        bank: params.bank,
        from: params.from,
        to: params.to,
    };
    match ctx.user.role {
        Role::Admin => {}
        Role::Manager => {
            filter.client = Some(
                ctx.user
                    .client_id
                    .ok_or_else(|| ApiError::forbidden("no client scope"))?,
            );
        }
        Role::Member => {
            filter.client = Some(
                ctx.user
                    .client_id
                    .ok_or_else(|| ApiError::forbidden("no client scope"))?,
            );
            filter.user = Some(ctx.user.id);
        }
    }

    let page = state.store.list_entries(
        &filter,
        params.limit,
        params.cursor.as_deref(),
        &state.config.cursor_secret,
    )?;
    Ok(Json(ListResponse {
        items: page.items,
        next_cursor: page.next_cursor,
    }))
}

pub(crate) async fn get_entry_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<TimeEntry>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let id = parse_entry_id(&id)?;
    let entry = state.store.get_entry(&id)?;
    require_client_role(&ctx.user, &entry.client_id, Role::Member)?;
    if ctx.user.role == Role::Member && entry.user_id != ctx.user.id {
        return Err(ApiError::forbidden("read another member's entry").into());
    }
    Ok(Json(entry))
}

/// Deleting an entry credits its hours back to the bank it drew from.
pub(crate) async fn delete_entry_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Timebank>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let id = parse_entry_id(&id)?;
    let entry = state.store.get_entry(&id)?;
    let own_entry = entry.user_id == ctx.user.id;
    if own_entry {
        require_client_role(&ctx.user, &entry.client_id, Role::Member)?;
    } else {
        require_client_role(&ctx.user, &entry.client_id, Role::Manager)?;
    }
    let bank = state.store.delete_entry(&id)?;
    tracing::info!(entry_id = %id, bank_id = %bank.id, "entry deleted");
    Ok(Json(bank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{seed_client, seed_user, session_headers};
    use chrono::NaiveDate;
    use timebank_model::{Hours, ProjectName, TimebankName, TimebankStatus};
    use timebank_store::NewTimebank;

    fn seed_bank(state: &AppState, client: &timebank_model::Client, name: &str, centihours: i64) {
        state
            .store
            .create_timebank(
                &NewTimebank {
                    client_id: client.id,
                    name: TimebankName::parse(name).expect("name"),
                    purchased_hours: Hours::from_centihours(centihours),
                    purchased_at: NaiveDate::from_ymd_opt(2026, 1, 5).expect("date"),
                },
                Utc::now(),
            )
            .expect("bank");
    }

    fn seed_project(
        state: &AppState,
        client: &timebank_model::Client,
    ) -> timebank_model::Project {
        state
            .store
            .create_project(
                &client.id,
                &ProjectName::parse("Platform").expect("name"),
                Utc::now(),
            )
            .expect("project")
    }

    #[tokio::test]
    async fn logging_splits_across_banks_smallest_first() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let member = seed_user(&state, "m@acme.example", Role::Member, Some(client.id));
        let project = seed_project(&state, &client);
        seed_bank(&state, &client, "Small", 200);
        seed_bank(&state, &client, "Large", 4_000);

        let response = log_entry_handler(
            State(state.clone()),
            session_headers(&state, &member),
            Json(LogEntryRequest {
                client_id: client.id,
                project_id: project.id,
                hours: Hours::from_centihours(300),
                work_date: NaiveDate::from_ymd_opt(2026, 2, 3).expect("date"),
                note: Some("pairing".to_string()),
                user_id: None,
            }),
        )
        .await
        .expect("log");
        let (status, Json(body)) = response;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.entries.len(), 2);
        assert_eq!(body.entries[0].hours, Hours::from_centihours(200));
        assert_eq!(body.entries[1].hours, Hours::from_centihours(100));
        assert!(body
            .banks
            .iter()
            .any(|b| b.status == TimebankStatus::Exhausted));
    }

    #[tokio::test]
    async fn member_cannot_log_for_someone_else() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let member = seed_user(&state, "m@acme.example", Role::Member, Some(client.id));
        let other = seed_user(&state, "o@acme.example", Role::Member, Some(client.id));
        let project = seed_project(&state, &client);
        seed_bank(&state, &client, "Bank", 1_000);

        let err = log_entry_handler(
            State(state.clone()),
            session_headers(&state, &member),
            Json(LogEntryRequest {
                client_id: client.id,
                project_id: project.id,
                hours: Hours::from_centihours(100),
                work_date: NaiveDate::from_ymd_opt(2026, 2, 3).expect("date"),
                note: None,
                user_id: Some(other.id),
            }),
        )
        .await
        .expect_err("proxy log");
        assert_eq!(err.0.code, timebank_api::ApiErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn member_listing_is_clamped_to_their_own_entries() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let manager = seed_user(&state, "mgr@acme.example", Role::Manager, Some(client.id));
        let member = seed_user(&state, "m@acme.example", Role::Member, Some(client.id));
        let project = seed_project(&state, &client);
        seed_bank(&state, &client, "Bank", 10_000);

        for user in [&manager, &member] {
            log_entry_handler(
                State(state.clone()),
                session_headers(&state, user),
                Json(LogEntryRequest {
                    client_id: client.id,
                    project_id: project.id,
                    hours: Hours::from_centihours(100),
                    work_date: NaiveDate::from_ymd_opt(2026, 2, 3).expect("date"),
                    note: None,
                    user_id: None,
                }),
            )
            .await
            .expect("log");
        }

        let Json(page) = list_entries_handler(
            State(state.clone()),
            session_headers(&state, &member),
            Query(BTreeMap::new()),
        )
        .await
        .expect("list");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].user_id, member.id);
    }

    #[tokio::test]
    async fn deleting_an_entry_credits_the_bank_back() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let manager = seed_user(&state, "mgr@acme.example", Role::Manager, Some(client.id));
        let project = seed_project(&state, &client);
        seed_bank(&state, &client, "Bank", 1_000);

        let (_, Json(logged)) = log_entry_handler(
            State(state.clone()),
            session_headers(&state, &manager),
            Json(LogEntryRequest {
                client_id: client.id,
                project_id: project.id,
                hours: Hours::from_centihours(250),
                work_date: NaiveDate::from_ymd_opt(2026, 2, 3).expect("date"),
                note: None,
                user_id: None,
            }),
        )
        .await
        .expect("log");

        let Json(bank) = delete_entry_handler(
            State(state.clone()),
            session_headers(&state, &manager),
            Path(logged.entries[0].id.to_string()),
        )
        .await
        .expect("delete");
        assert_eq!(bank.remaining_hours, Hours::from_centihours(1_000));
        assert_eq!(bank.used_hours, Hours::ZERO);
    }
}
