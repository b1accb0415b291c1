// SPDX-License-Identifier: Apache-2.0

use serde_json::{json, Value};

fn error_ref() -> Value {
    json!({"content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}})
}

fn err(description: &str) -> Value {
    let mut body = error_ref();
    body["description"] = json!(description);
    body
}

#[must_use]
pub fn openapi_v1_spec() -> Value {
    json!({
      "openapi": "3.0.3",
      "info": {
        "title": "timebank API",
        "version": "v1"
      },
      "paths": {
        "/healthz": {"get": {"responses": {"200": {"description": "ok"}}}},
        "/readyz": {"get": {"responses": {
          "200": {"description": "ready"},
          "503": err("not ready")
        }}},
        "/version": {"get": {"responses": {"200": {"description": "service and schema version"}}}},
        "/metrics": {"get": {"responses": {"200": {"description": "request counters, plain text"}}}},
        "/v1/openapi.json": {"get": {"responses": {"200": {"description": "this document"}}}},
        "/v1/auth/login": {"post": {"responses": {
          "200": {"description": "bearer token"},
          "401": err("bad credentials")
        }}},
        "/v1/auth/logout": {"post": {"responses": {
          "204": {"description": "session revoked"},
          "401": err("unauthenticated")
        }}},
        "/v1/me": {"get": {"responses": {
          "200": {"description": "authenticated user and session expiry"},
          "401": err("unauthenticated")
        }}},
        "/v1/invitations": {
          "get": {"responses": {"200": {"description": "invitation list"}}},
          "post": {"responses": {
            "201": {"description": "invitation with its one-time token"},
            "400": err("invalid invitation"),
            "403": err("role not allowed to invite"),
            "409": err("duplicate pending invitation or existing user")
          }}
        },
        "/v1/invitations/accept": {"post": {"responses": {
          "200": {"description": "user created, bearer token issued"},
          "404": err("unknown or spent token"),
          "409": err("email already registered")
        }}},
        "/v1/invitations/{id}/revoke": {"post": {
          "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}],
          "responses": {
            "200": {"description": "invitation revoked"},
            "404": err("not pending or unknown")
          }
        }},
        "/v1/users": {
          "get": {
            "parameters": [
              {"name": "limit", "in": "query", "schema": {"type": "integer", "minimum": 1, "maximum": 500}}
            ],
            "responses": {"200": {"description": "user list"}}
          },
          "post": {"responses": {
            "201": {"description": "user created"},
            "409": err("email already registered")
          }}
        },
        "/v1/users/{id}": {
          "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}],
          "get": {"responses": {"200": {"description": "user"}, "404": err("unknown user")}},
          "patch": {"responses": {
            "200": {"description": "updated user"},
            "409": err("would remove the last active admin")
          }},
          "delete": {"responses": {
            "204": {"description": "user deactivated"},
            "409": err("would remove the last active admin")
          }}
        },
        "/v1/clients": {
          "get": {"responses": {"200": {"description": "client list"}}},
          "post": {"responses": {"201": {"description": "client created"}, "409": err("duplicate name")}}
        },
        "/v1/clients/{id}": {
          "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}],
          "get": {"responses": {"200": {"description": "client"}, "404": err("unknown client")}},
          "patch": {"responses": {"200": {"description": "updated client"}}},
          "delete": {"responses": {"204": {"description": "client deactivated"}}}
        },
        "/v1/clients/{id}/summary": {"get": {
          "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}],
          "responses": {
            "200": {"description": "balance totals, bank breakdown, recent entries"},
            "304": {"description": "not modified"},
            "404": err("unknown client")
          }
        }},
        "/v1/clients/{id}/statement.csv": {"get": {
          "parameters": [
            {"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}},
            {"name": "from", "in": "query", "schema": {"type": "string", "format": "date"}},
            {"name": "to", "in": "query", "schema": {"type": "string", "format": "date"}}
          ],
          "responses": {
            "200": {"description": "CSV statement, one row per entry slice plus totals", "content": {"text/csv": {}}},
            "404": err("unknown client")
          }
        }},
        "/v1/projects": {
          "get": {"responses": {"200": {"description": "project list"}}},
          "post": {"responses": {"201": {"description": "project created"}}}
        },
        "/v1/projects/{id}": {
          "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}],
          "get": {"responses": {"200": {"description": "project"}, "404": err("unknown project")}},
          "patch": {"responses": {"200": {"description": "updated project"}}},
          "delete": {"responses": {"204": {"description": "project archived"}}}
        },
        "/v1/timebanks": {
          "get": {"responses": {"200": {"description": "timebank list"}}},
          "post": {"responses": {
            "201": {"description": "timebank created"},
            "400": err("non-positive purchase")
          }}
        },
        "/v1/timebanks/{id}": {
          "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}],
          "get": {"responses": {"200": {"description": "timebank"}, "404": err("unknown timebank")}},
          "patch": {"responses": {
            "200": {"description": "updated timebank"},
            "409": err("timebank closed")
          }},
          "delete": {"responses": {"200": {"description": "timebank closed"}}}
        },
        "/v1/entries": {
          "get": {
            "parameters": [
              {"name": "client", "in": "query", "schema": {"type": "string", "format": "uuid"}},
              {"name": "project", "in": "query", "schema": {"type": "string", "format": "uuid"}},
              {"name": "user", "in": "query", "schema": {"type": "string", "format": "uuid"}},
              {"name": "bank", "in": "query", "schema": {"type": "string", "format": "uuid"}},
              {"name": "from", "in": "query", "schema": {"type": "string", "format": "date"}},
              {"name": "to", "in": "query", "schema": {"type": "string", "format": "date"}},
              {"name": "limit", "in": "query", "schema": {"type": "integer", "minimum": 1, "maximum": 500}},
              {"name": "cursor", "in": "query", "schema": {"type": "string", "maxLength": 1024}}
            ],
            "responses": {
              "200": {"description": "entry page, newest first"},
              "400": err("invalid filter or cursor")
            }
          },
          "post": {"responses": {
            "201": {"description": "entry slices and post-allocation bank state"},
            "400": err("invalid entry"),
            "404": err("unknown client or project"),
            "409": err("balance changed concurrently, retry")
          }}
        },
        "/v1/entries/{id}": {
          "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}],
          "get": {"responses": {"200": {"description": "entry"}, "404": err("unknown entry")}},
          "delete": {"responses": {"200": {"description": "entry removed, hours credited back"}}}
        },
        "/v1/notifications": {"get": {
          "parameters": [
            {"name": "status", "in": "query", "schema": {"type": "string", "enum": ["queued", "sent", "failed"]}},
            {"name": "limit", "in": "query", "schema": {"type": "integer", "minimum": 1, "maximum": 500}}
          ],
          "responses": {"200": {"description": "delivery log, newest first"}}
        }}
      },
      "components": {
        "schemas": {
          "ApiErrorCode": {
            "type": "string",
            "enum": [
              "invalid_parameter",
              "unauthorized",
              "forbidden",
              "not_found",
              "conflict",
              "payload_too_large",
              "rate_limited",
              "internal",
              "unavailable"
            ]
          },
          "ApiError": {
            "type": "object",
            "required": ["code", "message", "details"],
            "additionalProperties": false,
            "properties": {
              "code": {"$ref": "#/components/schemas/ApiErrorCode"},
              "message": {"type": "string"},
              "details": {"type": "object"}
            }
          }
        }
      }
    })
}
