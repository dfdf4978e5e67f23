use std::fmt::Debug;
use std::fmt::Display;

use axum::response::Html;
use axum::{http::StatusCode, response::IntoResponse};

pub struct AppError {
    pub status: StatusCode,
    pub inner: anyhow::Error,
}

impl AppError {
    pub fn new(status: StatusCode, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            inner: inner.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, anyhow::anyhow!("not found"))
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, anyhow::anyhow!("forbidden"))
    }

    pub fn bad_request(inner: impl Into<anyhow::Error>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, inner)
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let reason = self.status.canonical_reason().unwrap_or("Error");
        let body = match self.status {
            StatusCode::NOT_FOUND => "That page does not exist. Please try a different location.".to_owned(),
            StatusCode::FORBIDDEN => "You don't have permission to do that.".to_owned(),
            s if s.is_server_error() => {
                tracing::error!(error = ?self.inner, "request failed");
                "We're experiencing some trouble on our end. Please try again in the near future.".to_owned()
            }
            _ => format!("Something went wrong: {}", self.inner),
        };

        (
            self.status,
            Html(format!(
                "<h1>{} {}</h1><p>{}</p>",
                self.status.as_u16(),
                reason,
                body
            )),
        )
            .into_response()
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ", self.status)?;
        std::fmt::Display::fmt(&self.inner, f)
    }
}

impl Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("status", &self.status)
            .field("inner", &self.inner)
            .finish()
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>` to turn them into
// `Result<_, AppError>`. Anything that gets here unclassified is a 500.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }
}
