//! warp filters for the HTTP API
//!
//! - `GET /config`: fetch a document; key in the JSON body or query string
//! - `POST /config`: merge a fragment into a document
//! - `GET /healthz`: liveness check

use std::collections::HashMap;
use std::convert::Infallible;

use vconf_document::VectorConfig;
use warp::http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use warp::http::{HeaderMap, StatusCode};
use warp::hyper::body::Bytes;
use warp::reply::{self, Reply, Response};
use warp::{Filter, Rejection};

use crate::error::{ApiError, ErrorBody};
use crate::handlers::ConfigService;
use crate::wire::{ConfigResponse, FetchRequest, UpdateRequest};

/// Default bound on `/config` request bodies
pub const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Full route tree with JSON rejection handling and request tracing
pub fn routes(
    service: ConfigService,
    max_body_bytes: u64,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    healthz()
        .or(fetch(service.clone(), max_body_bytes))
        .or(update(service, max_body_bytes))
        .recover(handle_rejection)
        .with(warp::trace::request())
}

fn healthz() -> impl Filter<Extract = (&'static str,), Error = Rejection> + Clone {
    warp::path("healthz")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| "ok")
}

fn fetch(
    service: ConfigService,
    max_body_bytes: u64,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path("config")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_service(service))
        .and(warp::query::<HashMap<String, String>>())
        .and(bounded_body(max_body_bytes))
        .and_then(handle_fetch)
}

fn update(
    service: ConfigService,
    max_body_bytes: u64,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path("config")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_service(service))
        .and(bounded_body(max_body_bytes))
        .and_then(handle_update)
}

/// Request body of at most `max_bytes`
///
/// A request with neither `Content-Length` nor `Transfer-Encoding` has no
/// body and yields empty bytes. A body of unknown length is refused with 411.
fn bounded_body(max_bytes: u64) -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::body::content_length_limit(max_bytes)
        .and(warp::body::bytes())
        .or(no_body())
        .unify()
}

fn no_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::header::headers_cloned().and_then(|headers: HeaderMap| async move {
        if headers.contains_key(CONTENT_LENGTH) || headers.contains_key(TRANSFER_ENCODING) {
            Err(warp::reject::not_found())
        } else {
            Ok(Bytes::new())
        }
    })
}

fn with_service(
    service: ConfigService,
) -> impl Filter<Extract = (ConfigService,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

async fn handle_fetch(
    service: ConfigService,
    query: HashMap<String, String>,
    body: Bytes,
) -> Result<Response, Infallible> {
    let ctx = service.context();
    let result = match FetchRequest::from_parts(&body, &query) {
        Ok(request) => service.fetch(&ctx, request).await,
        Err(err) => Err(err),
    };
    Ok(render("fetch", result))
}

async fn handle_update(service: ConfigService, body: Bytes) -> Result<Response, Infallible> {
    let ctx = service.context();
    let result = match UpdateRequest::from_body(&body) {
        Ok(request) => service.update(&ctx, request).await,
        Err(err) => Err(err),
    };
    Ok(render("update", result))
}

fn render(op: &'static str, result: Result<VectorConfig, ApiError>) -> Response {
    match result {
        Ok(doc) => reply::json(&ConfigResponse::from(doc)).into_response(),
        Err(err) => {
            if err.status_code().is_server_error() {
                tracing::error!(op, kind = err.kind(), "Request failed: {}", err);
            } else {
                tracing::debug!(op, kind = err.kind(), "Request rejected: {}", err);
            }
            err.into_response()
        }
    }
}

/// Render warp's own rejections with the same JSON error body
async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(err) = rejection.find::<warp::reject::PayloadTooLarge>() {
        (StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
    } else if let Some(err) = rejection.find::<warp::reject::LengthRequired>() {
        (StatusCode::LENGTH_REQUIRED, err.to_string())
    } else if let Some(err) = rejection.find::<warp::reject::MethodNotAllowed>() {
        (StatusCode::METHOD_NOT_ALLOWED, err.to_string())
    } else if let Some(err) = rejection.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, err.to_string())
    } else {
        tracing::error!("Unhandled rejection: {:?}", rejection);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    };

    Ok(reply::with_status(reply::json(&ErrorBody::new(message)), status).into_response())
}
