use axum::http::Uri;

use crate::error::AppError;

pub mod health;
pub mod visitors;

/// Fallback for unknown `/api/*` paths, so API clients get a JSON error
/// instead of the static site's 404 page.
pub async fn api_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No API route for {}", uri.path()))
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
