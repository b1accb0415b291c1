// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! Wire contracts for the timebank HTTP API: DTOs, query-parameter parsing,
//! the error envelope with its status mapping, and the OpenAPI document.
//! This crate is transport-free; the server owns routing and handlers.

mod dto;
mod error_mapping;
mod errors;
mod openapi;
mod params;

pub use dto::{
    AcceptInviteRequest, CreateClientRequest, CreateInvitationRequest, CreateProjectRequest,
    CreateTimebankRequest, CreateUserRequest, EntryLoggedResponse, InvitationCreatedResponse,
    ListResponse, LogEntryRequest, LoginRequest, MeResponse, TokenResponse, UpdateClientRequest,
    UpdateProjectRequest, UpdateTimebankRequest, UpdateUserRequest, VersionResponse,
};
pub use error_mapping::{map_error, ApiErrorMapping, API_ERROR_SCHEMA_REF};
pub use errors::{ApiError, ApiErrorCode};
pub use openapi::openapi_v1_spec;
pub use params::{
    parse_date_param, parse_list_entries_params, parse_list_notifications_params,
    parse_page_params, parse_statement_params, ListEntriesParams, ListNotificationsParams,
    PageParams, StatementParams, DEFAULT_PAGE_LIMIT, MAX_CURSOR_BYTES, MAX_PAGE_LIMIT,
};

pub const CRATE_NAME: &str = "timebank-api";
pub const API_VERSION: &str = "v1";
