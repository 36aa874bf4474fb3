//! Read handlers over the status collections plus message ingest.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::AppState;
use crate::message::QueueMessage;
use crate::store::{ReadMode, StoreError};
use crate::types::{BuildSpec, Environment, PackageName};

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(StoreError),
    Busy,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(what) => {
                (StatusCode::NOT_FOUND, format!("{what} not found")).into_response()
            }
            ApiError::BadRequest(why) => (StatusCode::BAD_REQUEST, why).into_response(),
            ApiError::Internal(err) => {
                error!(error = %err, "request failed against the store");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            ApiError::Busy => (
                StatusCode::SERVICE_UNAVAILABLE,
                "ingest queue is full".to_string(),
            )
                .into_response(),
        }
    }
}

fn parse_env(env: &str) -> Result<Environment, ApiError> {
    env.parse()
        .map_err(|err: crate::types::UnknownEnvironment| ApiError::BadRequest(err.to_string()))
}

/// Resolves the version to query when the route omits it: the head pointer's
/// current version.
async fn resolve_spec(
    state: &AppState,
    pkg: &str,
    env: Environment,
) -> Result<BuildSpec, ApiError> {
    let pkg = PackageName::new(pkg);
    let head = state
        .store
        .find_head(&pkg, env, ReadMode::Eventual)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("status for {pkg} ({env})")))?;
    Ok(BuildSpec::new(pkg, env, head.version))
}

pub async fn status_head(
    State(state): State<AppState>,
    Path((pkg, env)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let env = parse_env(&env)?;
    let spec = resolve_spec(&state, &pkg, env).await?;
    status_for(&state, spec).await
}

pub async fn status(
    State(state): State<AppState>,
    Path((pkg, env, version)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let env = parse_env(&env)?;
    status_for(&state, BuildSpec::new(pkg, env, version)).await
}

async fn status_for(state: &AppState, spec: BuildSpec) -> Result<Response, ApiError> {
    let status = state
        .store
        .find_status(&spec, ReadMode::Eventual)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("status for {spec}")))?;
    Ok(Json(status).into_response())
}

pub async fn events_head(
    State(state): State<AppState>,
    Path((pkg, env)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let env = parse_env(&env)?;
    let spec = resolve_spec(&state, &pkg, env).await?;
    events_for(&state, spec).await
}

pub async fn events(
    State(state): State<AppState>,
    Path((pkg, env, version)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let env = parse_env(&env)?;
    events_for(&state, BuildSpec::new(pkg, env, version)).await
}

async fn events_for(state: &AppState, spec: BuildSpec) -> Result<Response, ApiError> {
    let events = state.store.list_events(&spec).await?;
    if events.is_empty() {
        return Err(ApiError::NotFound(format!("events for {spec}")));
    }
    Ok(Json(events).into_response())
}

pub async fn progress_head(
    State(state): State<AppState>,
    Path((pkg, env)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let env = parse_env(&env)?;
    let spec = resolve_spec(&state, &pkg, env).await?;
    let progress = state.progress.compute(&spec).await?;
    Ok(Json(progress).into_response())
}

pub async fn progress(
    State(state): State<AppState>,
    Path((pkg, env, version)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let env = parse_env(&env)?;
    let spec = BuildSpec::new(pkg, env, version);
    let progress = state.progress.compute(&spec).await?;
    Ok(Json(progress).into_response())
}

/// Accepts a queue message over HTTP and hands it to the stream. Processing
/// is asynchronous, hence 202.
pub async fn ingest(
    State(state): State<AppState>,
    Json(msg): Json<QueueMessage>,
) -> Result<StatusCode, ApiError> {
    state
        .ingest
        .try_send(msg)
        .map_err(|_| ApiError::Busy)?;
    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::server::{build_router, AppState};
    use crate::store::{InMemoryStatusStore, Status, StatusPatch, StatusStore};
    use crate::types::{BuildSpec, Environment};

    async fn seeded_app() -> (axum::Router, Arc<InMemoryStatusStore>, mpsc::Receiver<crate::message::QueueMessage>)
    {
        let store = Arc::new(InMemoryStatusStore::new());
        let (tx, rx) = mpsc::channel(4);
        let app = build_router(AppState::new(store.clone(), tx));
        (app, store, rx)
    }

    fn spec() -> BuildSpec {
        BuildSpec::new("whatever", Environment::Dev, "1.0.0")
    }

    async fn seed_status(store: &InMemoryStatusStore) {
        let mut status = Status::new(spec(), None);
        status.apply(&StatusPatch {
            total: Some(2),
            ..Default::default()
        });
        store.put_head(status.head()).await.unwrap();
        store.create_status_if_absent(status).await.unwrap();
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (app, _, _rx) = seeded_app().await;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_by_explicit_version() {
        let (app, store, _rx) = seeded_app().await;
        seed_status(&store).await;

        let response = app
            .oneshot(
                Request::get("/status/whatever/dev/1.0.0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["pkg"], "whatever");
        assert_eq!(json["version"], "1.0.0");
        assert_eq!(json["total"], 2);
    }

    #[tokio::test]
    async fn status_resolves_version_from_head() {
        let (app, store, _rx) = seeded_app().await;
        seed_status(&store).await;

        let response = app
            .oneshot(
                Request::get("/status/whatever/development")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["version"], "1.0.0");
    }

    #[tokio::test]
    async fn unknown_package_is_not_found() {
        let (app, _, _rx) = seeded_app().await;

        let response = app
            .oneshot(
                Request::get("/status/nothing/dev")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_environment_is_bad_request() {
        let (app, _, _rx) = seeded_app().await;

        let response = app
            .oneshot(
                Request::get("/status/whatever/sandbox/1.0.0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn progress_reflects_counter() {
        let (app, store, _rx) = seeded_app().await;
        seed_status(&store).await;
        store.increment_counter(&spec(), 1).await.unwrap();

        let response = app
            .oneshot(
                Request::get("/progress/whatever/dev/1.0.0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["progress"], 50.0);
        assert_eq!(json["count"], 1);
        assert_eq!(json["total"], 2);
    }

    #[tokio::test]
    async fn events_empty_log_is_not_found() {
        let (app, store, _rx) = seeded_app().await;
        seed_status(&store).await;

        let response = app
            .oneshot(
                Request::get("/status-events/whatever/dev/1.0.0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ingest_accepts_and_forwards_message() {
        let (app, _, mut rx) = seeded_app().await;

        let body = serde_json::json!({
            "eventType": "event",
            "pkg": "whatever",
            "version": "1.0.0",
            "env": "dev",
            "message": "hello"
        });
        let response = app
            .oneshot(
                Request::post("/messages")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event_type, "event");
        assert_eq!(msg.package(), Some("whatever"));
    }
}
