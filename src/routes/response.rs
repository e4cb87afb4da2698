//! Response construction and request plumbing shared by the routes

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error};

use crate::types::{ApiResponse, FarmError, ResponseKey};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

/// Serialize an envelope with the given status
pub fn json_response<T: Serialize>(status: StatusCode, body: &ApiResponse<T>) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|e| {
        error!("Failed to serialize response: {}", e);
        r#"{"response_key":"UNKNOWN_ERROR","data":""}"#.to_string()
    });

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// 200 with a SUCCESS envelope
pub fn success<T: Serialize>(data: T) -> Response<BoxBody> {
    json_response(StatusCode::OK, &ApiResponse::success(data))
}

/// Error envelope. Infrastructure detail is logged, never returned.
pub fn error_response(err: &FarmError) -> Response<BoxBody> {
    if err.is_internal() {
        error!("Request failed: {}", err);
    } else {
        debug!("Request rejected: {}", err);
    }
    json_response(
        err.status_code(),
        &ApiResponse::with_key(err.response_key(), err.public_message()),
    )
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ApiResponse::with_key(ResponseKey::DataNotFound, format!("no route for {}", path)),
    )
}

/// CORS preflight
pub fn preflight_response() -> Response<BoxBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response.headers_mut().insert(
        "Access-Control-Max-Age",
        HeaderValue::from_static("86400"),
    );
    response
}

/// Decode a query string into a flat map. Repeated keys keep the last value.
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    match query {
        Some(q) if !q.is_empty() => serde_urlencoded::from_str::<Vec<(String, String)>>(q)
            .map(|pairs| pairs.into_iter().collect())
            .unwrap_or_else(|e| {
                debug!("Unparseable query string: {}", e);
                HashMap::new()
            }),
        _ => HashMap::new(),
    }
}

/// Stamp CORS and request id headers on an outgoing response.
///
/// An empty allow list admits any origin.
pub fn apply_common_headers(
    response: &mut Response<BoxBody>,
    origin: Option<&str>,
    allowed_origins: &[String],
    request_id: &str,
) {
    let headers = response.headers_mut();

    let allow_origin = if allowed_origins.is_empty() {
        Some(HeaderValue::from_static("*"))
    } else {
        origin
            .filter(|o| allowed_origins.iter().any(|a| a == o))
            .and_then(|o| HeaderValue::from_str(o).ok())
    };
    if let Some(value) = allow_origin {
        headers.insert("Access-Control-Allow-Origin", value);
        headers.insert("Vary", HeaderValue::from_static("Origin"));
    }
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert("X-Request-Id", value);
    }
}
