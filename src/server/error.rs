//! Mapping of domain errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use voxlink_common::Error;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Error returned from handlers; every variant is recovered here.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Catalog(_) | Error::Fetch(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError(Error::not_found("x")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError(Error::Unauthorized).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError(Error::fetch("timeout")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError(Error::invalid_input("bad")).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
