mod admin;
mod host;
mod middleware;
mod public;

pub use admin::build_admin_router;
pub use host::{EditorAssets, HostState, REMOTE_USER_HEADER};
pub use public::build_router;

use crate::application::error::HttpError;
use crate::application::repos::RepoError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

async fn health_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Map a repository error to a consistent HTTP error response for admin/public surfaces.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Persistence error",
            message,
        ),
    }
}
