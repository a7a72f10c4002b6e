use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use roomcraft_engine::media::MAX_UPLOAD_BYTES;
use roomcraft_engine::{FunctionHandler, FunctionRequest, FunctionResponse, RoomFunction};
use tracing::{error, info, warn};

/// Largest accepted request body: a base64 data URL of the largest photo
/// plus room for the other JSON fields.
pub const MAX_BODY_BYTES: usize = MAX_UPLOAD_BYTES.div_ceil(3) * 4 + 64 * 1024;

/// Both functions, under their bare names and under the hosted
/// `/functions/v1/` prefix the browser client calls.
pub fn router(handler: Arc<FunctionHandler>) -> Router {
    Router::new()
        .route("/:function", post(invoke).options(invoke))
        .route("/functions/v1/:function", post(invoke).options(invoke))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(handler)
}

pub async fn serve(bind: SocketAddr, handler: Arc<FunctionHandler>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(addr = %listener.local_addr()?, "serving roomcraft functions");
    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server stopped with an error")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

async fn invoke(
    State(handler): State<Arc<FunctionHandler>>,
    Path(name): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let Some(function) = RoomFunction::from_name(&name) else {
        return into_axum(FunctionResponse::rejected(
            StatusCode::NOT_FOUND.as_u16(),
            format!("Unknown function '{name}'"),
        ));
    };
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let status = rejection.status();
            warn!(function = function.name(), status = status.as_u16(), error = %rejection.body_text(), "request body rejected");
            let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                "Request body too large".to_string()
            } else {
                rejection.body_text()
            };
            return into_axum(FunctionResponse::rejected(status.as_u16(), message));
        }
    };
    let request = FunctionRequest {
        method: method.as_str().to_string(),
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body: body.to_vec(),
    };
    match tokio::task::spawn_blocking(move || handler.handle(function, &request)).await {
        Ok(response) => into_axum(response),
        Err(err) => {
            error!(function = function.name(), error = %err, "function task panicked");
            into_axum(FunctionResponse::rejected(
                StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "Internal server error",
            ))
        }
    }
}

fn into_axum(response: FunctionResponse) -> Response {
    let mut out = Response::new(Body::from(response.body_text()));
    *out.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    for (name, value) in response.headers {
        if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
            out.headers_mut().insert(name, HeaderValue::from_static(value));
        }
    }
    out
}
