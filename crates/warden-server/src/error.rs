//! HTTP error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use warden_auth::StoreError;

#[derive(Error, Debug)]
pub enum WebError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Invalid Host header")]
    InvalidHost,

    #[error("Not found")]
    NotFound,

    /// The credential store could not answer; `detail` is only filled in debug
    #[error("Authentication backend unavailable")]
    Unavailable { detail: Option<String> },
}

impl WebError {
    pub fn unavailable(error: &StoreError, debug: bool) -> Self {
        WebError::Unavailable {
            detail: debug.then(|| error.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::InvalidHost => StatusCode::FORBIDDEN,
            WebError::NotFound => StatusCode::NOT_FOUND,
            WebError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = match &self {
            WebError::Unavailable {
                detail: Some(detail),
            } => format!("{}: {}", self, detail),
            _ => self.to_string(),
        };

        (self.status(), body).into_response()
    }
}
