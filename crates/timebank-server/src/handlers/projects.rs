// SPDX-License-Identifier: Apache-2.0

use crate::auth::{authenticate, require_client_role};
use crate::failure::ApiFailure;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use std::collections::BTreeMap;
use timebank_api::{
    parse_page_params, ApiError, CreateProjectRequest, ListResponse, UpdateProjectRequest,
};
use timebank_model::{ClientId, Project, ProjectId, ProjectName, Role};

fn parse_project_id(raw: &str) -> Result<ProjectId, ApiFailure> {
    ProjectId::parse(raw).map_err(|_| ApiError::invalid_param("id", "must be a uuid").into())
}

pub(crate) async fn list_projects_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<ListResponse<Project>>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let page = parse_page_params(&query)?;
    let scope = match ctx.user.role {
        Role::Admin => match query.get("client") {
            Some(raw) => Some(
                ClientId::parse(raw)
                    .map_err(|_| ApiError::invalid_param("client", "must be a uuid"))?,
            ),
            None => None,
        },
        _ => Some(
            ctx.user
                .client_id
                .ok_or_else(|| ApiError::forbidden("no client scope"))?,
        ),
    };
    let include_inactive = ctx.user.role != Role::Member
        && query.get("include_inactive").map(String::as_str) == Some("true");
    let projects = state
        .store
        .list_projects(scope.as_ref(), include_inactive, page.limit)?;
    Ok(Json(ListResponse::without_cursor(projects)))
}

pub(crate) async fn create_project_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    require_client_role(&ctx.user, &body.client_id, Role::Manager)?;
    let name =
        ProjectName::parse(&body.name).map_err(|e| ApiError::invalid_param("name", &e.0))?;
    let project = state
        .store
        .create_project(&body.client_id, &name, Utc::now())?;
    tracing::info!(project_id = %project.id, client_id = %body.client_id, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

pub(crate) async fn get_project_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let id = parse_project_id(&id)?;
    let project = state.store.get_project(&id)?;
    require_client_role(&ctx.user, &project.client_id, Role::Member)?;
    Ok(Json(project))
}

pub(crate) async fn update_project_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let id = parse_project_id(&id)?;
    let current = state.store.get_project(&id)?;
    require_client_role(&ctx.user, &current.client_id, Role::Manager)?;

    let name = match &body.name {
        Some(raw) => {
            Some(ProjectName::parse(raw).map_err(|e| ApiError::invalid_param("name", &e.0))?)
        }
        None => None,
    };
    let project = state
        .store
        .update_project(&id, name.as_ref(), body.active)?;
    Ok(Json(project))
}

pub(crate) async fn delete_project_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let id = parse_project_id(&id)?;
    let current = state.store.get_project(&id)?;
    require_client_role(&ctx.user, &current.client_id, Role::Manager)?;
    state.store.deactivate_project(&id)?;
    tracing::info!(project_id = %id, "project deactivated");
    Ok(StatusCode::NO_CONTENT)
}
