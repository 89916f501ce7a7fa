//! Serverless function handlers.
//!
//! Every function takes a JSON body, strips `{_type, value}` wrappers from it,
//! and answers failures with `400 {"error": "..."}`.

pub mod invoices;
pub mod messages;
pub mod webhook;

use crate::error::{BookingError, Result};
use crate::metrics::FunctionMetrics;
use crate::value::unwrap_value;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use tracing::{error, info};

/// Parses a request body into `T` after unwrapping wrapped values
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(BookingError::Validation("request body is empty".to_string()));
    }
    let raw: Value = serde_json::from_slice(body)?;
    Ok(serde_json::from_value(unwrap_value(raw))?)
}

/// Failure of a function invocation, always reported as a bad request
#[derive(Debug)]
pub struct FunctionError(pub BookingError);

impl From<BookingError> for FunctionError {
    fn from(e: BookingError) -> Self {
        FunctionError(e)
    }
}

impl IntoResponse for FunctionError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Runs a function body with invocation metrics and error logging
pub async fn run_function<T, Fut>(name: &'static str, body: Fut) -> std::result::Result<Json<T>, FunctionError>
where
    T: Serialize,
    Fut: Future<Output = Result<T>>,
{
    FunctionMetrics::record_invocation(name);
    match body.await {
        Ok(value) => {
            info!("{} completed", name);
            Ok(Json(value))
        }
        Err(e) => {
            FunctionMetrics::record_failure(name);
            error!("{} failed: {}", name, e);
            Err(FunctionError(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Body {
        ids: Vec<String>,
    }

    #[test]
    fn wrapped_bodies_parse_like_plain_ones() {
        let plain: Body = parse_body(br#"{"ids": ["a"]}"#).unwrap();
        let wrapped: Body =
            parse_body(br#"{"ids": {"_type": "array", "value": [{"_type": "string", "value": "a"}]}}"#).unwrap();
        assert_eq!(plain, wrapped);
    }

    #[test]
    fn empty_and_malformed_bodies_fail() {
        assert!(matches!(parse_body::<Body>(b"  "), Err(BookingError::Validation(_))));
        assert!(matches!(parse_body::<Body>(b"{ids:"), Err(BookingError::Json(_))));
        assert!(matches!(parse_body::<Body>(b"{}"), Err(BookingError::Json(_))));
    }

    #[test]
    fn function_errors_are_bad_requests() {
        let response = FunctionError(BookingError::NotFound("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
