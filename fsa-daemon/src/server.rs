//! HTTP front end -- routes, status mapping, graceful serving.
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /` | fixed [`WELCOME_MESSAGE`], no executor access |
//! | `POST /analyze` | [`RequestHandler::handle`] |
//!
//! Every response body is fully buffered, so `Content-Length` always equals
//! the serialized byte length.

use std::future::Future;

use axum::Router;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use bytes::Bytes;
use metrics::counter;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use fsa_core::metrics as m;

use crate::handler::{AnalyzeReply, RequestHandler};
use crate::listener::LimitedListener;

/// Body of `GET /`.
pub const WELCOME_MESSAGE: &str = "Hello, Welcome to FSA (File System Agent) analysis service";

/// Seconds advertised in `Retry-After` when the executor is saturated.
pub const RETRY_AFTER_SECS: u64 = 5;

const ROUTE_WELCOME: &str = "/";
const ROUTE_ANALYZE: &str = "/analyze";

/// Build the service router.
///
/// Bodies above `max_body_bytes` are answered with `413`.
pub fn router(handler: RequestHandler, max_body_bytes: usize) -> Router {
    Router::new()
        .route(ROUTE_WELCOME, get(welcome))
        .route(ROUTE_ANALYZE, post(analyze))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .with_state(handler)
}

/// Serve `router` on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish after the shutdown signal.
pub async fn serve<F>(listener: LimitedListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn welcome() -> Response {
    counter!(m::HTTP_REQUESTS_TOTAL, m::LABEL_ROUTE => ROUTE_WELCOME).increment(1);
    buffered(
        StatusCode::OK,
        "text/plain; charset=utf-8",
        Bytes::from_static(WELCOME_MESSAGE.as_bytes()),
    )
}

async fn analyze(State(handler): State<RequestHandler>, body: Bytes) -> Response {
    counter!(m::HTTP_REQUESTS_TOTAL, m::LABEL_ROUTE => ROUTE_ANALYZE).increment(1);

    match handler.handle(&body).await {
        AnalyzeReply::Completed(bytes) => buffered(StatusCode::OK, "application/json", bytes),
        AnalyzeReply::InvalidInput(bytes) => {
            buffered(StatusCode::BAD_REQUEST, "application/json", bytes)
        }
        AnalyzeReply::Overloaded => {
            let mut response = buffered(
                StatusCode::SERVICE_UNAVAILABLE,
                "text/plain; charset=utf-8",
                Bytes::from_static(b"service busy, retry later"),
            );
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
            response
        }
        AnalyzeReply::Internal(message) => buffered(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/plain; charset=utf-8",
            Bytes::from(message),
        ),
    }
}

/// Response with an explicit byte-length `Content-Length`.
fn buffered(status: StatusCode, content_type: &'static str, body: Bytes) -> Response {
    let length = HeaderValue::from(body.len());
    let mut response = (status, Body::from(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, length);
    response
}
