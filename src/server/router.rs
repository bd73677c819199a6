//! Router and request handlers
//!
//! `GET /events` admits the caller and hands the connection to a
//! streaming session; `GET /data/{id}` and `PUT /data/{id}` are the
//! plain request/response surface over the same registry.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::event::Event;
use crate::fanout::Fanout;
use crate::registry::ClientRegistry;
use crate::session::Session;
use crate::util;

use super::config::ServerConfig;

/// Response header carrying the assigned client id
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Shared state passed to the handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ClientRegistry>,
    pub fanout: Fanout,
    pub config: ServerConfig,
}

/// Build the router with all routes and the CORS layer
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/events", get(stream_events))
        .route("/data/{id}", get(get_data).put(set_data))
        .layer(cors_layer())
        .with_state(state)
}

/// Credentialed cross-origin access: the origin is mirrored back rather
/// than wildcarded, since `*` is invalid with credentials allowed.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(CLIENT_ID_HEADER)])
}

/// `GET /events`: admit the caller and stream events until it goes away
async fn stream_events(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let client_id = util::next_client_id();
    let remote = caller_identity(&headers);

    let (entry, mailbox) = match state.registry.admit(&client_id, &remote) {
        Ok(admitted) => admitted,
        Err(err) => {
            // A collision means the time-based id generator broke its
            // uniqueness assumption. Surface it, do not regenerate.
            tracing::error!(client_id = %client_id, error = %err, "Admission failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let session = Session::new(
        entry,
        mailbox,
        Arc::clone(&state.registry),
        state.fanout.clone(),
        state.config.idle_timeout,
        state.config.retry_interval,
    );

    // The session writes encoded events into this channel; hyper streams
    // each one out as its own body frame and flushes it. Dropping the
    // receiving half on disconnect is what fails the session's writes.
    let (body_tx, body_rx) = mpsc::channel::<Bytes>(16);
    tokio::spawn(session.run(body_tx));

    let body = Body::from_stream(ReceiverStream::new(body_rx).map(Ok::<_, Infallible>));
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(CLIENT_ID_HEADER, client_id.as_str())
        .body(body);

    match response {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "Failed to build stream response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /data/{id}`: current record or 404
async fn get_data(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if !util::is_client_id(&id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    match state.registry.get(&id) {
        Ok(entry) => Json(entry.data().to_value()).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// `PUT /data/{id}`: replace a record and broadcast the update
async fn set_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    if !util::is_client_id(&id) || state.registry.get(&id).is_err() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let Ok(value) = serde_json::from_slice::<Value>(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Value::Object(fields) = value else {
        // Arrays, scalars and null are not records.
        return StatusCode::BAD_REQUEST.into_response();
    };

    match state.registry.update(&id, fields) {
        Ok(data) => {
            let value = data.to_value();
            state
                .fanout
                .broadcast(Arc::new(Event::updated(value.clone())));
            Json(value).into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn caller_identity(headers: &HeaderMap) -> String {
    headers
        .get(header::ORIGIN)
        .or_else(|| headers.get("x-forwarded-for"))
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
