use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    Json as RequestJson,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::render::{render_outcome, service_document};
use crate::api::session_extractor::Session;
use crate::config::ServiceConfig;
use crate::error::{ODataError, ODataResult};
use crate::logic::{parse_resource_path, RequestRouter, ResourceOutcome};
use crate::model::UpdateMode;
use crate::store::{EntityStore, SessionHandle, SessionRegistry};

/// Everything the handlers share: the session registry and the service settings.
pub struct ServiceState {
    pub sessions: SessionRegistry,
    pub service: ServiceConfig,
}

pub type AppState = Arc<ServiceState>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Core failure mapped onto a status code and an OData error body.
#[derive(Debug)]
pub struct ApiError(pub ODataError);

impl From<ODataError> for ApiError {
    fn from(error: ODataError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = kind.status_code();
        if status.is_server_error() {
            log::error!("{}: {}", kind.as_str(), self.0);
        } else {
            log::warn!("{}: {}", kind.as_str(), self.0);
        }
        let body = json!({
            "error": {
                "code": kind.as_str(),
                "message": self.0.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

pub async fn get_service_document(
    State(state): State<AppState>,
    Session(session): Session,
) -> Response {
    let body = service_document(state.sessions.schema());
    with_session_cookie(&state, &session, Json(body).into_response())
}

pub async fn read_resource(
    State(state): State<AppState>,
    Session(session): Session,
    Path(path): Path<String>,
) -> Response {
    let result = (|| -> ODataResult<Response> {
        let store = session.store.as_ref();
        let segments = parse_resource_path(store.schema(), &path)?;
        let outcome = RequestRouter::new(store).read(&segments)?;
        log::debug!("GET {} resolved", path);

        Ok(match render_outcome(store.schema(), &outcome) {
            Some(body) => Json(body).into_response(),
            None => StatusCode::NO_CONTENT.into_response(),
        })
    })();
    respond(&state, &session, result)
}

pub async fn create_entity(
    State(state): State<AppState>,
    Session(session): Session,
    Path(path): Path<String>,
    body: Result<RequestJson<Value>, JsonRejection>,
) -> Response {
    let result = (|| -> ODataResult<Response> {
        let RequestJson(body) = body.map_err(rejected_body)?;
        let store = session.store.as_ref();
        let segments = parse_resource_path(store.schema(), &path)?;
        let outcome = RequestRouter::new(store).create(&segments, &body)?;

        let location = match &outcome {
            ResourceOutcome::Entity { entity, .. } => entity.id.clone(),
            _ => None,
        };
        let body = render_outcome(store.schema(), &outcome).unwrap_or(Value::Null);
        let mut response = (StatusCode::CREATED, Json(body)).into_response();
        if let Some(location) = location {
            let url = format!("/{}/{}", state.service.root, location);
            if let Ok(value) = HeaderValue::from_str(&url) {
                response.headers_mut().insert(header::LOCATION, value);
            }
        }
        Ok(response)
    })();
    respond(&state, &session, result)
}

pub async fn patch_entity(
    state: State<AppState>,
    session: Session,
    path: Path<String>,
    body: Result<RequestJson<Value>, JsonRejection>,
) -> Response {
    update_entity(state, session, path, body, UpdateMode::Patch).await
}

pub async fn replace_entity(
    state: State<AppState>,
    session: Session,
    path: Path<String>,
    body: Result<RequestJson<Value>, JsonRejection>,
) -> Response {
    update_entity(state, session, path, body, UpdateMode::Replace).await
}

async fn update_entity(
    State(state): State<AppState>,
    Session(session): Session,
    Path(path): Path<String>,
    body: Result<RequestJson<Value>, JsonRejection>,
    mode: UpdateMode,
) -> Response {
    let result = (|| -> ODataResult<Response> {
        let RequestJson(body) = body.map_err(rejected_body)?;
        let store = session.store.as_ref();
        let segments = parse_resource_path(store.schema(), &path)?;
        RequestRouter::new(store).update(&segments, &body, mode)?;
        log::debug!("{:?} {} applied", mode, path);
        Ok(StatusCode::NO_CONTENT.into_response())
    })();
    respond(&state, &session, result)
}

pub async fn delete_entity(
    State(state): State<AppState>,
    Session(session): Session,
    Path(path): Path<String>,
) -> Response {
    let result = (|| -> ODataResult<Response> {
        let store = session.store.as_ref();
        let segments = parse_resource_path(store.schema(), &path)?;
        RequestRouter::new(store).delete(&segments)?;
        log::debug!("DELETE {} applied", path);
        Ok(StatusCode::NO_CONTENT.into_response())
    })();
    respond(&state, &session, result)
}

/// Body that is not JSON at all, or not `application/json`.
fn rejected_body(rejection: JsonRejection) -> ODataError {
    ODataError::invalid(format!("unreadable request body: {}", rejection.body_text()))
}

/// Finishes a request: failures become OData error bodies, and a session
/// created by this request is handed to the client either way.
fn respond(state: &ServiceState, session: &SessionHandle, result: ODataResult<Response>) -> Response {
    let response = result.unwrap_or_else(|error| ApiError(error).into_response());
    with_session_cookie(state, session, response)
}

fn with_session_cookie(state: &ServiceState, session: &SessionHandle, mut response: Response) -> Response {
    if session.is_new {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            state.service.session_cookie, session.id
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}
