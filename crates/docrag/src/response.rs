//! Response envelope and error mapping for the HTTP service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docrag_core::{Error, ErrorClass};
use serde::Serialize;
use tracing::{error, warn};

/// Every response body: `{status, message, data?}`.
#[derive(Debug, Serialize)]
pub struct BaseResponse<T> {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl BaseResponse<()> {
    /// Envelope without a payload.
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> BaseResponse<T> {
    /// 200 envelope carrying `data`.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: message.into(),
            data: Some(data),
        }
    }
}

impl<T: Serialize> IntoResponse for BaseResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// A failed request, rendered as an envelope without data.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        BaseResponse::message(self.status, self.message).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        map_error(&err)
    }
}

/// Translate a pipeline error into a response.
///
/// Client and not-found errors keep their message. Server errors are logged
/// and replaced by a generic message.
pub fn map_error(err: &Error) -> ApiError {
    match err.class() {
        ErrorClass::Client => {
            warn!("Rejected request: {err}");
            ApiError::bad_request(err.to_string())
        }
        ErrorClass::NotFound => ApiError::new(StatusCode::NOT_FOUND, err.to_string()),
        ErrorClass::Server => {
            error!("Request failed: {err}");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrag_core::{DocumentId, EmbedError, ExtractError, StoreError};

    #[test]
    fn test_not_found_maps_to_404() {
        let doc = DocumentId::new();
        let api = map_error(&Error::NotFound(doc));
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert!(api.message.contains(&doc.to_string()));
    }

    #[test]
    fn test_client_errors_map_to_400() {
        let unsupported: Error = ExtractError::UnsupportedType("image/gif".to_string()).into();
        let api = map_error(&unsupported);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert!(api.message.contains("image/gif"));

        let api = map_error(&Error::InvalidQuery("query text is empty".to_string()));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let errors: Vec<Error> = vec![
            StoreError::Insert("table /var/lib/secret locked".to_string()).into(),
            EmbedError::Inference("cuda oom".to_string()).into(),
            ExtractError::Parse("bad xref".to_string()).into(),
        ];

        for err in &errors {
            let api = map_error(err);
            assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(api.message, "Internal server error");
        }
    }

    #[test]
    fn test_envelope_omits_missing_data() {
        let body = serde_json::to_value(BaseResponse::message(StatusCode::OK, "Service is healthy"))
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": 200, "message": "Service is healthy"})
        );

        let body = serde_json::to_value(BaseResponse::ok("done", vec![1, 2])).unwrap();
        assert_eq!(body["data"], serde_json::json!([1, 2]));
    }
}
