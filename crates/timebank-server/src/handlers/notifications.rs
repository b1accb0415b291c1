// SPDX-License-Identifier: Apache-2.0

use crate::auth::authenticate;
use crate::failure::ApiFailure;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use std::collections::BTreeMap;
use timebank_api::{parse_list_notifications_params, ApiError, ListResponse};
use timebank_model::{Notification, Role};

pub(crate) async fn list_notifications_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<ListResponse<Notification>>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let params = parse_list_notifications_params(&query)?;

    match ctx.user.role {
        Role::Admin => {
            let rows = state.store.list_notifications(params.status, params.limit)?;
            Ok(Json(ListResponse::without_cursor(rows)))
        }
        // Managers see only mail addressed to their client's contact.
        Role::Manager => {
            let scope = ctx
                .user
                .client_id
                .ok_or_else(|| ApiError::forbidden("no client scope"))?;
            let contact = state.store.get_client(&scope)?.contact_email;
            let rows = state
                .store
                .list_notifications(params.status, params.limit)?
                .into_iter()
                .filter(|n| n.recipient == contact)
                .collect();
            Ok(Json(ListResponse::without_cursor(rows)))
        }
        Role::Member => Err(ApiError::forbidden("list notifications").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{seed_client, seed_user, session_headers};
    use chrono::Utc;
    use timebank_model::{EmailAddress, NotificationDraft, NotificationKind};

    fn draft(recipient: &str, dedupe: &str) -> NotificationDraft {
        NotificationDraft {
            kind: NotificationKind::DepletionWarning,
            dedupe_key: dedupe.to_string(),
            recipient: EmailAddress::parse(recipient).expect("email"),
            subject: "subject".to_string(),
            body: "body".to_string(),
        }
    }

    #[tokio::test]
    async fn manager_listing_is_filtered_to_their_contact_address() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let manager = seed_user(&state, "mgr@acme.example", Role::Manager, Some(client.id));
        state
            .store
            .enqueue_notification(
                &draft(client.contact_email.as_str(), "depletion:a:warning"),
                Utc::now(),
            )
            .expect("enqueue");
        state
            .store
            .enqueue_notification(&draft("ops@other.example", "depletion:b:warning"), Utc::now())
            .expect("enqueue");

        let Json(page) = list_notifications_handler(
            State(state.clone()),
            session_headers(&state, &manager),
            Query(BTreeMap::new()),
        )
        .await
        .expect("list");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].recipient, client.contact_email);
    }

    #[tokio::test]
    async fn member_is_rejected() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let member = seed_user(&state, "m@acme.example", Role::Member, Some(client.id));

        let err = list_notifications_handler(
            State(state.clone()),
            session_headers(&state, &member),
            Query(BTreeMap::new()),
        )
        .await
        .expect_err("member list");
        assert_eq!(err.0.code, timebank_api::ApiErrorCode::Forbidden);
    }
}
