use super::AppState;
use crate::error::WorkflowError;
use crate::store::fragments::{list_project_fragments, record_fragment, FragmentRecord};
use crate::store::projects::load_project;
use crate::workflow::{GITHUB_SYNC_EVENT, RESTORE_COMMIT_EVENT};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let mut body = json!({ "error": message.into() });
    if status.is_server_error() {
        body["success"] = json!(false);
    }
    (status, Json(body)).into_response()
}

/// Queue an event and answer with its ID.
async fn emit(state: &AppState, name: &str, payload: Value, message: &str) -> Response {
    match state.engine.send(name, payload).await {
        Ok(id) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "inngestEventId": id,
                "message": message,
            })),
        )
            .into_response(),
        Err(e @ (WorkflowError::Validation(_) | WorkflowError::UnknownEvent(_))) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            tracing::error!(event = name, error = %e, "could not queue event");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn required(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// POST /restore-fragment: body `{projectId, fragmentId}`.
pub async fn handle_restore_fragment(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return error_response(StatusCode::BAD_REQUEST, "request body must be JSON");
    };
    let (Some(project_id), Some(fragment_id)) =
        (required(&body, "projectId"), required(&body, "fragmentId"))
    else {
        return error_response(StatusCode::BAD_REQUEST, "projectId and fragmentId are required");
    };

    emit(
        &state,
        RESTORE_COMMIT_EVENT,
        json!({ "projectId": project_id, "fragmentId": fragment_id }),
        "Restore started",
    )
    .await
}

/// POST /github-sync: body is the sync event payload.
pub async fn handle_github_sync(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return error_response(StatusCode::BAD_REQUEST, "request body must be JSON");
    };
    emit(&state, GITHUB_SYNC_EVENT, body, "Sync started").await
}

/// GET /events/{id}
pub async fn handle_event_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.event_status(&id) {
        Ok(event) => (StatusCode::OK, Json(event)).into_response(),
        Err(e @ WorkflowError::EventNotFound(_)) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// POST /fragments: body `{projectId, projectName?, message?, title, files, sandboxUrl?}`.
pub async fn handle_create_fragment(
    State(state): State<AppState>,
    body: Result<Json<FragmentRecord>, JsonRejection>,
) -> Response {
    let record = match body {
        Ok(Json(record)) => record,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    if let Err(e) = record.validate() {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    match state.store.with_conn(|conn| record_fragment(conn, &record)) {
        Ok(fragment) => {
            tracing::info!(project_id = %record.project_id, fragment_id = %fragment.id, "fragment recorded");
            (
                StatusCode::CREATED,
                Json(json!({ "success": true, "fragment": fragment })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(project_id = %record.project_id, error = %e, "could not record fragment");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /projects/{id}/fragments
pub async fn handle_list_fragments(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Response {
    let listed = state.store.with_conn(|conn| {
        if load_project(conn, &project_id)?.is_none() {
            return Ok(None);
        }
        list_project_fragments(conn, &project_id).map(Some)
    });
    match listed {
        Ok(Some(fragments)) => (
            StatusCode::OK,
            Json(json!({ "projectId": project_id, "fragments": fragments })),
        )
            .into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("project {project_id} not found")),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn handle_metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
