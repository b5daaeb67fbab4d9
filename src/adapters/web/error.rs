//! HTTP error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::PortsimError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &PortsimError) -> StatusCode {
    match err {
        PortsimError::Configuration { .. }
        | PortsimError::ConfigParse { .. }
        | PortsimError::ConfigMissing { .. }
        | PortsimError::ConfigInvalid { .. }
        | PortsimError::Data { .. }
        | PortsimError::Json(_) => StatusCode::BAD_REQUEST,
        PortsimError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<PortsimError> for WebError {
    fn from(err: PortsimError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16(),
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_bad_requests() {
        let err = PortsimError::configuration("min > max");
        assert_eq!(status_from_error(&err), StatusCode::BAD_REQUEST);
        let err = PortsimError::data("out of order");
        assert_eq!(status_from_error(&err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn io_errors_are_internal() {
        let err = PortsimError::Io(std::io::Error::other("disk"));
        assert_eq!(WebError::from(err).status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
