use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

use crate::db::StoreError;
use crate::views;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_) | AppError::Store(StoreError::NotFound { .. })
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_not_found() {
            tracing::debug!(error = %self, "not found");
            return (StatusCode::NOT_FOUND, Html(views::not_found())).into_response();
        }
        tracing::error!(error = %self, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(views::server_error()),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordKind;

    #[test]
    fn missing_records_map_to_404() {
        let err = AppError::from(StoreError::NotFound {
            kind: RecordKind::Venue,
            id: 3,
        });
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::NotFound("page".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn storage_failures_map_to_500() {
        let err = AppError::from(StoreError::Sqlite(rusqlite::Error::InvalidQuery));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
